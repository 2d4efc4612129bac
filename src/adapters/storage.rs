use crate::domain::ports::Storage;
use crate::utils::error::StoreError;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::Mutex;

fn check_key(key: &str) -> Result<(), StoreError> {
    if key.trim().is_empty() || key.contains(['/', '\\', '\0']) || key == "." || key == ".." {
        return Err(StoreError::InvalidKey(key.to_string()));
    }
    Ok(())
}

/// File-backed slots: each key lives in `<base_path>/<key>.json`.
#[derive(Debug, Clone)]
pub struct LocalStorage {
    base_path: PathBuf,
}

impl LocalStorage {
    pub fn new(base_path: impl Into<PathBuf>) -> Self {
        Self {
            base_path: base_path.into(),
        }
    }

    pub fn slot_path(&self, key: &str) -> PathBuf {
        self.base_path.join(format!("{}.json", key))
    }

    pub fn base_path(&self) -> &Path {
        &self.base_path
    }
}

impl Storage for LocalStorage {
    async fn read_slot(&self, key: &str) -> Result<Option<Vec<u8>>, StoreError> {
        check_key(key)?;
        match tokio::fs::read(self.slot_path(key)).await {
            Ok(data) => Ok(Some(data)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    async fn write_slot(&self, key: &str, data: &[u8]) -> Result<(), StoreError> {
        check_key(key)?;
        tokio::fs::create_dir_all(&self.base_path).await?;

        // 先寫暫存檔再 rename，中途失敗不會留下半份資料
        let full_path = self.slot_path(key);
        let tmp_path = self.base_path.join(format!(".{}.json.tmp", key));
        let written = match tokio::fs::write(&tmp_path, data).await {
            Ok(()) => tokio::fs::rename(&tmp_path, &full_path).await,
            Err(e) => Err(e),
        };
        if let Err(e) = written {
            // 寫入或 rename 失敗都要清掉暫存檔，例如磁碟已滿時的半份檔案
            let _ = tokio::fs::remove_file(&tmp_path).await;
            return Err(e.into());
        }

        tracing::debug!("Wrote {} bytes to {}", data.len(), full_path.display());
        Ok(())
    }
}

/// In-process slots with an optional total byte quota.
#[derive(Debug, Clone, Default)]
pub struct MemoryStorage {
    slots: Arc<Mutex<HashMap<String, Vec<u8>>>>,
    quota_bytes: Option<usize>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_quota(quota_bytes: usize) -> Self {
        Self {
            slots: Arc::default(),
            quota_bytes: Some(quota_bytes),
        }
    }

    pub async fn slot_keys(&self) -> Vec<String> {
        let slots = self.slots.lock().await;
        let mut keys: Vec<String> = slots.keys().cloned().collect();
        keys.sort();
        keys
    }
}

impl Storage for MemoryStorage {
    async fn read_slot(&self, key: &str) -> Result<Option<Vec<u8>>, StoreError> {
        check_key(key)?;
        let slots = self.slots.lock().await;
        Ok(slots.get(key).cloned())
    }

    async fn write_slot(&self, key: &str, data: &[u8]) -> Result<(), StoreError> {
        check_key(key)?;
        let mut slots = self.slots.lock().await;

        if let Some(limit) = self.quota_bytes {
            let others: usize = slots
                .iter()
                .filter(|(k, _)| k.as_str() != key)
                .map(|(_, v)| v.len())
                .sum();
            if others + data.len() > limit {
                return Err(StoreError::PersistenceFull {
                    key: key.to_string(),
                    size: others + data.len(),
                    limit,
                });
            }
        }

        slots.insert(key.to_string(), data.to_vec());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_local_storage_missing_slot_reads_none() {
        let temp_dir = TempDir::new().unwrap();
        let storage = LocalStorage::new(temp_dir.path());

        assert!(storage.read_slot("bukuTamu").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_local_storage_write_then_read() {
        let temp_dir = TempDir::new().unwrap();
        let storage = LocalStorage::new(temp_dir.path().join("nested"));

        storage.write_slot("bukuTamu", b"[]").await.unwrap();
        assert_eq!(storage.read_slot("bukuTamu").await.unwrap().unwrap(), b"[]");
        assert!(storage.slot_path("bukuTamu").exists());
        assert!(!temp_dir.path().join("nested/.bukuTamu.json.tmp").exists());
    }

    #[cfg(target_os = "linux")]
    #[tokio::test]
    async fn test_disk_full_write_removes_temp_file() {
        let temp_dir = TempDir::new().unwrap();
        let storage = LocalStorage::new(temp_dir.path());
        let tmp_path = temp_dir.path().join(".bukuTamu.json.tmp");
        // 暫存檔指向 /dev/full，寫入時得到 ENOSPC
        std::os::unix::fs::symlink("/dev/full", &tmp_path).unwrap();

        let err = storage.write_slot("bukuTamu", b"[]").await.unwrap_err();

        assert!(matches!(err, StoreError::PersistenceFull { .. }));
        assert!(std::fs::symlink_metadata(&tmp_path).is_err());
        assert!(!storage.slot_path("bukuTamu").exists());
    }

    #[tokio::test]
    async fn test_failed_rename_removes_temp_file() {
        let temp_dir = TempDir::new().unwrap();
        let storage = LocalStorage::new(temp_dir.path());
        // 目標位置是非空目錄，rename 會失敗
        let blocked = storage.slot_path("bukuTamu");
        std::fs::create_dir_all(blocked.join("inner")).unwrap();

        assert!(storage.write_slot("bukuTamu", b"[]").await.is_err());
        assert!(!temp_dir.path().join(".bukuTamu.json.tmp").exists());
    }

    #[tokio::test]
    async fn test_rejects_path_like_keys() {
        let storage = MemoryStorage::new();
        assert!(matches!(
            storage.write_slot("../x", b"1").await,
            Err(StoreError::InvalidKey(_))
        ));
        assert!(matches!(
            storage.read_slot("").await,
            Err(StoreError::InvalidKey(_))
        ));
    }

    #[tokio::test]
    async fn test_memory_quota_counts_other_slots() {
        let storage = MemoryStorage::with_quota(10);
        storage.write_slot("a", b"123456").await.unwrap();

        // 覆寫同一槽只計算新內容
        storage.write_slot("a", b"1234567890").await.unwrap();

        let err = storage.write_slot("b", b"1").await.unwrap_err();
        assert!(matches!(err, StoreError::PersistenceFull { limit: 10, .. }));
        assert_eq!(storage.slot_keys().await, vec!["a".to_string()]);
    }
}
