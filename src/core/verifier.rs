use crate::domain::model::{trim_name, InvitedName};
use crate::domain::ports::GuestListProvider;
use crate::utils::error::LoadError;
use serde_json::Value;
use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;

pub const DEFAULT_NAME_FIELD: &str = "Nama";

/// Cancels a pending guest list load. Cloneable, dropping it does not cancel.
#[derive(Debug, Clone)]
pub struct CancelHandle(Arc<watch::Sender<bool>>);

impl CancelHandle {
    pub fn cancel(&self) {
        self.0.send_replace(true);
    }
}

#[derive(Debug, Clone)]
pub struct CancelSignal(watch::Receiver<bool>);

impl CancelSignal {
    /// A signal that never fires.
    pub fn never() -> Self {
        let (_, signal) = cancel_pair();
        signal
    }

    pub fn is_cancelled(&self) -> bool {
        *self.0.borrow()
    }

    pub async fn cancelled(&mut self) {
        if self.0.wait_for(|cancelled| *cancelled).await.is_err() {
            // 發送端已釋放，不可能再被取消
            std::future::pending::<()>().await;
        }
    }
}

pub fn cancel_pair() -> (CancelHandle, CancelSignal) {
    let (tx, rx) = watch::channel(false);
    (CancelHandle(Arc::new(tx)), CancelSignal(rx))
}

/// The loaded invitation list. Immutable once built.
#[derive(Debug, Clone)]
pub struct GuestVerifier {
    names: Vec<InvitedName>,
    index: HashSet<String>,
}

impl GuestVerifier {
    pub async fn load<P>(provider: &P) -> Result<Self, LoadError>
    where
        P: GuestListProvider + ?Sized,
    {
        Self::load_with_field(provider, DEFAULT_NAME_FIELD).await
    }

    pub async fn load_with_field<P>(provider: &P, name_field: &str) -> Result<Self, LoadError>
    where
        P: GuestListProvider + ?Sized,
    {
        let records = provider.fetch_records().await?;
        let verifier = Self::from_records(&records, name_field)?;
        tracing::info!("Loaded {} invited names", verifier.len());
        Ok(verifier)
    }

    /// `load_with_field` bounded by `timeout` and `cancel`.
    pub async fn load_within<P>(
        provider: &P,
        name_field: &str,
        timeout: Duration,
        cancel: &mut CancelSignal,
    ) -> Result<Self, LoadError>
    where
        P: GuestListProvider + ?Sized,
    {
        if cancel.is_cancelled() {
            return Err(LoadError::Cancelled);
        }

        tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                tracing::warn!("Guest list load cancelled");
                Err(LoadError::Cancelled)
            }
            result = tokio::time::timeout(timeout, Self::load_with_field(provider, name_field)) => {
                match result {
                    Ok(loaded) => loaded,
                    Err(_) => {
                        tracing::warn!("Guest list load timed out after {:?}", timeout);
                        Err(LoadError::Timeout(timeout))
                    }
                }
            }
        }
    }

    /// Builds the name list from raw provider records.
    ///
    /// The payload must be an array of objects. A record without the name
    /// field (or with `null`) is skipped, a non-string name is a format error.
    /// Names are trimmed, blanks dropped, duplicates kept once.
    pub fn from_records(records: &Value, name_field: &str) -> Result<Self, LoadError> {
        let items = records.as_array().ok_or_else(|| {
            LoadError::BadFormat(format!("expected a JSON array, got {}", json_kind(records)))
        })?;

        let mut names = Vec::new();
        let mut index = HashSet::new();

        for (position, item) in items.iter().enumerate() {
            let record = item.as_object().ok_or_else(|| {
                LoadError::BadFormat(format!(
                    "record {} is {}, expected an object",
                    position,
                    json_kind(item)
                ))
            })?;

            let raw = match record.get(name_field) {
                None | Some(Value::Null) => continue,
                Some(Value::String(s)) => s,
                Some(other) => {
                    return Err(LoadError::BadFormat(format!(
                        "record {} has a non-string '{}' ({})",
                        position,
                        name_field,
                        json_kind(other)
                    )))
                }
            };

            if let Some(name) = InvitedName::parse(raw) {
                if index.insert(name.as_str().to_string()) {
                    names.push(name);
                }
            }
        }

        if names.is_empty() {
            return Err(LoadError::Empty);
        }

        Ok(Self { names, index })
    }

    /// Case-sensitive exact match of the trimmed candidate.
    pub fn is_invited(&self, candidate: &str) -> bool {
        self.index.contains(trim_name(candidate))
    }

    pub fn matched_name(&self, candidate: &str) -> Option<&InvitedName> {
        let candidate = trim_name(candidate);
        if !self.index.contains(candidate) {
            return None;
        }
        self.names.iter().find(|n| n.as_str() == candidate)
    }

    pub fn names(&self) -> &[InvitedName] {
        &self.names
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use serde_json::json;

    struct StaticProvider(Value);

    #[async_trait]
    impl GuestListProvider for StaticProvider {
        async fn fetch_records(&self) -> Result<Value, LoadError> {
            Ok(self.0.clone())
        }
    }

    struct HangingProvider;

    #[async_trait]
    impl GuestListProvider for HangingProvider {
        async fn fetch_records(&self) -> Result<Value, LoadError> {
            std::future::pending().await
        }
    }

    #[test]
    fn test_trims_names_and_matches_case_sensitively() {
        let records = json!([{"Nama": "Alice"}, {"Nama": " Bob "}]);
        let verifier = GuestVerifier::from_records(&records, "Nama").unwrap();

        let names: Vec<&str> = verifier.names().iter().map(|n| n.as_str()).collect();
        assert_eq!(names, vec!["Alice", "Bob"]);
        assert!(verifier.is_invited("Bob"));
        assert!(verifier.is_invited("  Bob\t"));
        assert!(!verifier.is_invited("bob"));
        assert!(!verifier.is_invited(""));
    }

    #[test]
    fn test_byte_order_mark_in_sheet_cell_still_matches() {
        let records = json!([{"Nama": "\u{FEFF}Alice"}]);
        let verifier = GuestVerifier::from_records(&records, "Nama").unwrap();

        assert_eq!(verifier.names()[0].as_str(), "Alice");
        assert!(verifier.is_invited("Alice"));
        assert!(verifier.is_invited("\u{FEFF}Alice "));
        assert_eq!(verifier.matched_name("\u{FEFF}Alice").unwrap().as_str(), "Alice");
    }

    #[test]
    fn test_empty_array_is_empty_error() {
        let err = GuestVerifier::from_records(&json!([]), "Nama").unwrap_err();
        assert!(matches!(err, LoadError::Empty));
    }

    #[test]
    fn test_only_blank_or_missing_names_is_empty_error() {
        let records = json!([{"Nama": "   "}, {"Alamat": "Jakarta"}, {"Nama": null}]);
        let err = GuestVerifier::from_records(&records, "Nama").unwrap_err();
        assert!(matches!(err, LoadError::Empty));
    }

    #[test]
    fn test_non_array_is_bad_format() {
        let err = GuestVerifier::from_records(&json!({"error": "no sheet"}), "Nama").unwrap_err();
        assert!(matches!(err, LoadError::BadFormat(_)));
    }

    #[test]
    fn test_non_object_record_and_non_string_name_are_bad_format() {
        let err = GuestVerifier::from_records(&json!(["Alice"]), "Nama").unwrap_err();
        assert!(matches!(err, LoadError::BadFormat(_)));

        let err = GuestVerifier::from_records(&json!([{"Nama": 42}]), "Nama").unwrap_err();
        assert!(matches!(err, LoadError::BadFormat(_)));
    }

    #[test]
    fn test_duplicates_kept_once_in_first_order() {
        let records = json!([{"Nama": "Citra"}, {"Nama": "Alice"}, {"Nama": "Citra "}]);
        let verifier = GuestVerifier::from_records(&records, "Nama").unwrap();
        assert_eq!(verifier.len(), 2);
        assert_eq!(verifier.names()[0].as_str(), "Citra");
        assert_eq!(verifier.matched_name(" Alice").unwrap().as_str(), "Alice");
        assert!(verifier.matched_name("alice").is_none());
    }

    #[test]
    fn test_custom_name_field() {
        let records = json!([{"Name": "Dewi"}]);
        let verifier = GuestVerifier::from_records(&records, "Name").unwrap();
        assert!(verifier.is_invited("Dewi"));
    }

    #[tokio::test]
    async fn test_load_from_provider() {
        let provider = StaticProvider(json!([{"Nama": "Alice"}]));
        let verifier = GuestVerifier::load(&provider).await.unwrap();
        assert!(verifier.is_invited("Alice"));
    }

    #[tokio::test]
    async fn test_load_within_times_out() {
        let mut signal = CancelSignal::never();
        let err = GuestVerifier::load_within(
            &HangingProvider,
            "Nama",
            Duration::from_millis(50),
            &mut signal,
        )
        .await
        .unwrap_err();

        assert!(matches!(err, LoadError::Timeout(d) if d == Duration::from_millis(50)));
    }

    #[tokio::test]
    async fn test_load_within_cancelled() {
        let (handle, mut signal) = cancel_pair();

        let task = tokio::spawn(async move {
            GuestVerifier::load_within(
                &HangingProvider,
                "Nama",
                Duration::from_secs(3600),
                &mut signal,
            )
            .await
        });

        handle.cancel();
        let err = task.await.unwrap().unwrap_err();
        assert!(matches!(err, LoadError::Cancelled));
    }

    #[tokio::test]
    async fn test_already_cancelled_signal_skips_fetch() {
        let (handle, mut signal) = cancel_pair();
        handle.cancel();

        let provider = StaticProvider(json!([{"Nama": "Alice"}]));
        let err = GuestVerifier::load_within(&provider, "Nama", Duration::from_secs(1), &mut signal)
            .await
            .unwrap_err();
        assert!(matches!(err, LoadError::Cancelled));
    }
}
