use std::time::Duration;
use thiserror::Error;

/// 名單載入失敗的原因
#[derive(Error, Debug)]
pub enum LoadError {
    #[error("Guest list provider unreachable: {0}")]
    Unreachable(String),

    #[error("Guest list has an unexpected format: {0}")]
    BadFormat(String),

    #[error("Guest list is empty or contains no usable names")]
    Empty,

    #[error("Guest list did not load within {0:?}")]
    Timeout(Duration),

    #[error("Guest list loading was cancelled")]
    Cancelled,
}

/// 留言儲存失敗的原因
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Stored guest book in slot '{key}' is corrupt: {reason}")]
    Corrupt { key: String, reason: String },

    #[error("Storage slot '{key}' is full ({size} bytes, limit {limit} bytes)")]
    PersistenceFull { key: String, size: usize, limit: usize },

    #[error("Invalid storage key '{0}'")]
    InvalidKey(String),

    #[error("Storage IO error: {0}")]
    Io(std::io::Error),
}

impl From<std::io::Error> for StoreError {
    fn from(err: std::io::Error) -> Self {
        match err.kind() {
            // 裝置已滿視同配額用盡
            std::io::ErrorKind::StorageFull => StoreError::PersistenceFull {
                key: String::new(),
                size: 0,
                limit: 0,
            },
            _ => StoreError::Io(err),
        }
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum WorkflowError {
    #[error("Action '{action}' is not allowed while {state}")]
    InvalidState { action: &'static str, state: String },

    #[error("Invalid form field '{field}': {reason}")]
    InvalidForm { field: String, reason: String },
}

#[derive(Error, Debug)]
pub enum GuestBookError {
    #[error(transparent)]
    Load(#[from] LoadError),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Workflow(#[from] WorkflowError),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("CSV export error: {0}")]
    CsvError(#[from] csv::Error),

    #[error("Configuration error in '{field}': {message}")]
    ConfigValidationError { field: String, message: String },

    #[error("Invalid value '{value}' for '{field}': {reason}")]
    InvalidConfigValueError {
        field: String,
        value: String,
        reason: String,
    },

    #[error("Access denied: {message}")]
    AccessDenied { message: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    Network,
    Data,
    Storage,
    Configuration,
    Usage,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ErrorSeverity {
    Low,
    Medium,
    High,
    Critical,
}

impl ErrorSeverity {
    /// Process exit code for a command that failed with this severity.
    /// 0 and 1 stay reserved for command results such as `check`.
    pub fn exit_code(self) -> i32 {
        match self {
            ErrorSeverity::Low => 2,
            ErrorSeverity::Medium => 3,
            ErrorSeverity::High => 4,
            ErrorSeverity::Critical => 5,
        }
    }
}

impl GuestBookError {
    pub fn category(&self) -> ErrorCategory {
        match self {
            GuestBookError::Load(LoadError::Unreachable(_))
            | GuestBookError::Load(LoadError::Timeout(_))
            | GuestBookError::Load(LoadError::Cancelled) => ErrorCategory::Network,
            GuestBookError::Load(_) | GuestBookError::SerializationError(_) => {
                ErrorCategory::Data
            }
            GuestBookError::Store(_) | GuestBookError::IoError(_) | GuestBookError::CsvError(_) => {
                ErrorCategory::Storage
            }
            GuestBookError::ConfigValidationError { .. }
            | GuestBookError::InvalidConfigValueError { .. } => ErrorCategory::Configuration,
            GuestBookError::Workflow(_) | GuestBookError::AccessDenied { .. } => {
                ErrorCategory::Usage
            }
        }
    }

    pub fn severity(&self) -> ErrorSeverity {
        match self {
            GuestBookError::Workflow(_) => ErrorSeverity::Low,
            GuestBookError::Load(LoadError::Unreachable(_))
            | GuestBookError::Load(LoadError::Timeout(_))
            | GuestBookError::Load(LoadError::Cancelled) => ErrorSeverity::Medium,
            GuestBookError::Store(StoreError::Corrupt { .. })
            | GuestBookError::Store(StoreError::PersistenceFull { .. }) => ErrorSeverity::Critical,
            _ => ErrorSeverity::High,
        }
    }

    pub fn user_friendly_message(&self) -> String {
        match self {
            GuestBookError::Load(_) => crate::core::workflow::LOAD_FAILED_MESSAGE.to_string(),
            GuestBookError::Store(StoreError::Corrupt { key, .. }) => format!(
                "Data buku tamu di slot '{}' rusak, ucapan tidak disimpan.",
                key
            ),
            GuestBookError::Store(StoreError::PersistenceFull { .. }) => {
                "Penyimpanan buku tamu penuh, ucapan tidak disimpan.".to_string()
            }
            GuestBookError::Store(_) | GuestBookError::IoError(_) => {
                "Gagal menyimpan ucapan. Silakan coba lagi.".to_string()
            }
            GuestBookError::Workflow(WorkflowError::InvalidForm { reason, .. }) => reason.clone(),
            GuestBookError::AccessDenied { .. } => "Akses admin ditolak.".to_string(),
            other => other.to_string(),
        }
    }

    pub fn recovery_suggestion(&self) -> &'static str {
        match self.category() {
            ErrorCategory::Network => {
                "Check the network connection and the guest list URL, then reload"
            }
            ErrorCategory::Data => {
                "Check that the spreadsheet exposes a 'Nama' column with at least one name"
            }
            ErrorCategory::Storage => match self {
                GuestBookError::Store(StoreError::Corrupt { .. }) => concat!(
                    "Inspect the data file, or set store.on_corrupt = \"quarantine\" ",
                    "to back it up and start fresh"
                ),
                GuestBookError::Store(StoreError::PersistenceFull { .. }) => {
                    "Raise store.quota_bytes or free disk space"
                }
                _ => "Check permissions of the data directory",
            },
            ErrorCategory::Configuration => "Fix the configuration file or command line flags",
            ErrorCategory::Usage => "Follow the prompts in order: check the name before submitting",
        }
    }
}

pub type Result<T> = std::result::Result<T, GuestBookError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_io_storage_full_maps_to_persistence_full() {
        let err: StoreError = std::io::Error::from(std::io::ErrorKind::StorageFull).into();
        assert!(matches!(err, StoreError::PersistenceFull { .. }));

        let err: StoreError = std::io::Error::from(std::io::ErrorKind::PermissionDenied).into();
        assert!(matches!(err, StoreError::Io(_)));
    }

    #[test]
    fn test_load_errors_share_one_user_message() {
        let messages: Vec<String> = vec![
            GuestBookError::from(LoadError::Empty),
            GuestBookError::from(LoadError::BadFormat("x".into())),
            GuestBookError::from(LoadError::Unreachable("y".into())),
        ]
        .iter()
        .map(|e| e.user_friendly_message())
        .collect();

        assert!(messages.iter().all(|m| m == &messages[0]));
    }

    #[test]
    fn test_severity_ordering() {
        let corrupt = GuestBookError::from(StoreError::Corrupt {
            key: "bukuTamu".into(),
            reason: "bad".into(),
        });
        let timeout = GuestBookError::from(LoadError::Timeout(Duration::from_secs(1)));
        assert_eq!(corrupt.severity(), ErrorSeverity::Critical);
        assert_eq!(timeout.severity(), ErrorSeverity::Medium);
        assert_eq!(timeout.category(), ErrorCategory::Network);
    }

    #[test]
    fn test_error_exit_codes_never_collide_with_command_results() {
        let errors = vec![
            GuestBookError::from(WorkflowError::InvalidState {
                action: "submit",
                state: "Loading".into(),
            }),
            GuestBookError::from(LoadError::Cancelled),
            GuestBookError::ConfigValidationError {
                field: "source.endpoint".into(),
                message: "bad".into(),
            },
            GuestBookError::from(StoreError::PersistenceFull {
                key: "bukuTamu".into(),
                size: 10,
                limit: 5,
            }),
        ];

        let codes: Vec<i32> = errors.iter().map(|e| e.severity().exit_code()).collect();
        assert!(codes.iter().all(|code| *code > 1), "codes: {:?}", codes);
        assert_eq!(codes, vec![2, 3, 4, 5]);
    }
}
