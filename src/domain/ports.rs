use crate::domain::model::GuestResponse;
use crate::utils::error::{LoadError, StoreError};
use async_trait::async_trait;
use std::time::Duration;

/// Named-slot key-value storage, the durable medium behind the guest book.
pub trait Storage: Send + Sync {
    /// `Ok(None)` when the slot has never been written.
    fn read_slot(
        &self,
        key: &str,
    ) -> impl std::future::Future<Output = Result<Option<Vec<u8>>, StoreError>> + Send;
    fn write_slot(
        &self,
        key: &str,
        data: &[u8],
    ) -> impl std::future::Future<Output = Result<(), StoreError>> + Send;
}

pub trait ConfigProvider: Send + Sync {
    fn list_endpoint(&self) -> &str;
    fn name_field(&self) -> &str;
    fn load_timeout(&self) -> Duration;
    fn data_dir(&self) -> &str;
    fn store_key(&self) -> &str;
    fn max_guests(&self) -> u32;
}

/// Read-only source of invited names.
#[async_trait]
pub trait GuestListProvider: Send + Sync {
    /// Raw records as returned by the provider. Interpreting them is the
    /// verifier's job.
    async fn fetch_records(&self) -> Result<serde_json::Value, LoadError>;
}

/// Append-only log of guest responses.
#[async_trait]
pub trait SubmissionStore: Send + Sync {
    async fn append(&self, response: GuestResponse) -> Result<(), StoreError>;
    async fn read_all(&self) -> Result<Vec<GuestResponse>, StoreError>;
}
