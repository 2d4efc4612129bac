use crate::core::store::{CorruptPolicy, DEFAULT_QUOTA_BYTES, DEFAULT_STORE_KEY};
use crate::core::verifier::DEFAULT_NAME_FIELD;
use crate::core::workflow::DEFAULT_MAX_GUESTS;
use crate::core::ConfigProvider;
use crate::utils::error::{GuestBookError, Result};
use crate::utils::validation::{self, Validate};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;
use std::time::Duration;

pub const DEFAULT_LIST_ENDPOINT: &str =
    "https://opensheet.elk.sh/1KLqnjMqhBB6P5wChU92tbjqYve0XLJv4pvcBfl-9M48/Form%20Tamu";
pub const DEFAULT_TIMEOUT_SECONDS: u64 = 10;
pub const DEFAULT_DATA_DIR: &str = "./data";

/// Full guest book configuration. Every section and field is optional in the
/// file; missing values fall back to the defaults above.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GuestBookConfig {
    pub source: SourceConfig,
    pub store: StoreConfig,
    pub form: FormConfig,
    pub admin: AdminConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SourceConfig {
    pub endpoint: String,
    pub name_field: String,
    pub timeout_seconds: u64,
    pub headers: HashMap<String, String>,
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            endpoint: DEFAULT_LIST_ENDPOINT.to_string(),
            name_field: DEFAULT_NAME_FIELD.to_string(),
            timeout_seconds: DEFAULT_TIMEOUT_SECONDS,
            headers: HashMap::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    pub data_dir: String,
    pub key: String,
    /// 0 disables the size check.
    pub quota_bytes: usize,
    pub on_corrupt: CorruptPolicy,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            data_dir: DEFAULT_DATA_DIR.to_string(),
            key: DEFAULT_STORE_KEY.to_string(),
            quota_bytes: DEFAULT_QUOTA_BYTES,
            on_corrupt: CorruptPolicy::default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FormConfig {
    pub max_guests: u32,
}

impl Default for FormConfig {
    fn default() -> Self {
        Self {
            max_guests: DEFAULT_MAX_GUESTS,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AdminConfig {
    /// When set, the admin panel asks for this token.
    pub token: Option<String>,
}

impl GuestBookConfig {
    /// 從 TOML 檔案載入配置
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(&path).map_err(GuestBookError::IoError)?;
        Self::from_toml_str(&content)
    }

    /// 從 TOML 字串解析配置
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let processed_content = Self::substitute_env_vars(content)?;

        toml::from_str(&processed_content).map_err(|e| GuestBookError::ConfigValidationError {
            field: "toml_parsing".to_string(),
            message: format!("TOML parsing error: {}", e),
        })
    }

    /// 替換環境變數 (例如 ${ADMIN_TOKEN})，未設定的變數保留原樣
    fn substitute_env_vars(content: &str) -> Result<String> {
        let re = regex::Regex::new(r"\$\{([^}]+)\}").map_err(|e| {
            GuestBookError::ConfigValidationError {
                field: "environment".to_string(),
                message: e.to_string(),
            }
        })?;

        let result = re.replace_all(content, |caps: &regex::Captures| {
            let var_name = &caps[1];
            std::env::var(var_name).unwrap_or_else(|_| format!("${{{}}}", var_name))
        });

        Ok(result.to_string())
    }

    pub fn quota_bytes(&self) -> Option<usize> {
        (self.store.quota_bytes > 0).then_some(self.store.quota_bytes)
    }

    pub fn admin_token(&self) -> Option<&str> {
        self.admin.token.as_deref().filter(|t| !t.is_empty())
    }
}

impl ConfigProvider for GuestBookConfig {
    fn list_endpoint(&self) -> &str {
        &self.source.endpoint
    }

    fn name_field(&self) -> &str {
        &self.source.name_field
    }

    fn load_timeout(&self) -> Duration {
        Duration::from_secs(self.source.timeout_seconds)
    }

    fn data_dir(&self) -> &str {
        &self.store.data_dir
    }

    fn store_key(&self) -> &str {
        &self.store.key
    }

    fn max_guests(&self) -> u32 {
        self.form.max_guests
    }
}

impl Validate for GuestBookConfig {
    fn validate(&self) -> Result<()> {
        validation::validate_url("source.endpoint", &self.source.endpoint)?;
        validation::validate_non_empty_string("source.name_field", &self.source.name_field)?;
        validation::validate_range("source.timeout_seconds", self.source.timeout_seconds, 1, 600)?;
        validation::validate_path("store.data_dir", &self.store.data_dir)?;
        validation::validate_slot_key("store.key", &self.store.key)?;
        validation::validate_range("form.max_guests", self.form.max_guests, 1, 1000)?;

        if let Some(token) = &self.admin.token {
            if !token.is_empty() && token.chars().count() < 8 {
                return Err(GuestBookError::InvalidConfigValueError {
                    field: "admin.token".to_string(),
                    value: "***".to_string(),
                    reason: "Token must be at least 8 characters".to_string(),
                });
            }
        }

        Ok(())
    }
}
