use crate::domain::model::GuestResponse;
use crate::domain::ports::{Storage, SubmissionStore};
use crate::utils::error::StoreError;
use async_trait::async_trait;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::Mutex;

pub const DEFAULT_STORE_KEY: &str = "bukuTamu";
/// Browser local storage gives each origin about 5 MiB.
pub const DEFAULT_QUOTA_BYTES: usize = 5 * 1024 * 1024;

/// What `append` does when the slot holds data it cannot parse.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CorruptPolicy {
    /// Fail the append and leave the bytes untouched.
    #[default]
    Abort,
    /// Copy the bytes to a backup slot, then start a fresh list.
    Quarantine,
}

impl std::str::FromStr for CorruptPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "abort" => Ok(CorruptPolicy::Abort),
            "quarantine" => Ok(CorruptPolicy::Quarantine),
            other => Err(format!(
                "unknown corrupt policy '{}', expected 'abort' or 'quarantine'",
                other
            )),
        }
    }
}

/// Guest book kept as one JSON array in a single storage slot.
///
/// Every append rewrites the whole array. Appends through the same store
/// (and its clones) are serialized; separate processes are not.
#[derive(Debug, Clone)]
pub struct JsonSubmissionStore<S: Storage> {
    storage: S,
    key: String,
    quota_bytes: Option<usize>,
    on_corrupt: CorruptPolicy,
    append_lock: Arc<Mutex<()>>,
}

impl<S: Storage> JsonSubmissionStore<S> {
    pub fn new(storage: S) -> Self {
        Self {
            storage,
            key: DEFAULT_STORE_KEY.to_string(),
            quota_bytes: Some(DEFAULT_QUOTA_BYTES),
            on_corrupt: CorruptPolicy::default(),
            append_lock: Arc::default(),
        }
    }

    pub fn with_key(mut self, key: impl Into<String>) -> Self {
        self.key = key.into();
        self
    }

    /// `None` disables the size check.
    pub fn with_quota(mut self, quota_bytes: Option<usize>) -> Self {
        self.quota_bytes = quota_bytes;
        self
    }

    pub fn with_corrupt_policy(mut self, policy: CorruptPolicy) -> Self {
        self.on_corrupt = policy;
        self
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn storage(&self) -> &S {
        &self.storage
    }

    fn corrupt(&self, reason: impl ToString) -> StoreError {
        StoreError::Corrupt {
            key: self.key.clone(),
            reason: reason.to_string(),
        }
    }

    async fn load_entries(&self) -> Result<Option<Vec<GuestResponse>>, (StoreError, Vec<u8>)> {
        let raw = match self.storage.read_slot(&self.key).await {
            Ok(Some(raw)) => raw,
            Ok(None) => return Ok(None),
            Err(e) => return Err((e, Vec::new())),
        };

        match serde_json::from_slice::<Vec<GuestResponse>>(&raw) {
            Ok(entries) => Ok(Some(entries)),
            Err(e) => Err((self.corrupt(e), raw)),
        }
    }

    async fn quarantine(&self, raw: &[u8]) -> Result<String, StoreError> {
        let backup_key = format!(
            "{}.corrupt-{}",
            self.key,
            Utc::now().format("%Y%m%dT%H%M%S%.3fZ")
        );
        self.storage.write_slot(&backup_key, raw).await?;
        Ok(backup_key)
    }

    fn full(&self, size: usize, limit: usize) -> StoreError {
        StoreError::PersistenceFull {
            key: self.key.clone(),
            size,
            limit,
        }
    }
}

#[async_trait]
impl<S: Storage> SubmissionStore for JsonSubmissionStore<S> {
    async fn append(&self, response: GuestResponse) -> Result<(), StoreError> {
        // 讀取、追加、寫回必須一次完成，否則並行的 append 會互相覆蓋
        let _guard = self.append_lock.lock().await;

        let mut entries = match self.load_entries().await {
            Ok(entries) => entries.unwrap_or_default(),
            Err((err @ StoreError::Corrupt { .. }, raw)) => match self.on_corrupt {
                CorruptPolicy::Abort => {
                    tracing::error!("❌ Refusing to append: {}", err);
                    return Err(err);
                }
                CorruptPolicy::Quarantine => {
                    let backup_key = self.quarantine(&raw).await?;
                    tracing::warn!(
                        "⚠️ {} ; moved {} bytes to slot '{}' and started a new guest book",
                        err,
                        raw.len(),
                        backup_key
                    );
                    Vec::new()
                }
            },
            Err((err, _)) => return Err(err),
        };

        entries.push(response);
        let data = serde_json::to_vec(&entries).map_err(|e| self.corrupt(e))?;

        if let Some(limit) = self.quota_bytes {
            if data.len() > limit {
                tracing::error!(
                    "❌ Guest book would grow to {} bytes, over the {} byte quota",
                    data.len(),
                    limit
                );
                return Err(self.full(data.len(), limit));
            }
        }

        match self.storage.write_slot(&self.key, &data).await {
            Ok(()) => {}
            // 後端只知道裝置已滿，補上槽名與大小
            Err(StoreError::PersistenceFull { key, limit, .. }) if key.is_empty() => {
                return Err(self.full(data.len(), limit));
            }
            Err(e) => return Err(e),
        }

        tracing::debug!("Guest book '{}' now has {} entries", self.key, entries.len());
        Ok(())
    }

    async fn read_all(&self) -> Result<Vec<GuestResponse>, StoreError> {
        match self.load_entries().await {
            Ok(entries) => Ok(entries.unwrap_or_default()),
            Err((err, _)) => Err(err),
        }
    }
}
