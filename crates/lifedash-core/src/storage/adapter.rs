//! Key-value storage contract and platform selection

use std::sync::Arc;

use async_trait::async_trait;
use tracing::debug;

use super::{FileStorage, MemoryStorage, SecureStorage};
use crate::config::Config;
use crate::platform::{Platform, StorageCapability};

/// Async key-value persistence.
///
/// Implementations must never surface a failure to the caller: a failed
/// read is a miss, a failed write or remove is logged and dropped.
#[async_trait]
pub trait StorageAdapter: Send + Sync {
    /// Read a value; `None` when missing or unreadable
    async fn get(&self, key: &str) -> Option<String>;

    /// Store a value, replacing any previous one
    async fn set(&self, key: &str, value: &str);

    /// Remove a value; removing a missing key is not an error
    async fn remove(&self, key: &str);

    /// Short backend name for logs and status output
    fn backend(&self) -> &'static str;
}

/// Pick the storage strategy for a platform
pub fn select_adapter(platform: Platform, config: &Config) -> Arc<dyn StorageAdapter> {
    let adapter: Arc<dyn StorageAdapter> = match platform.storage_capability() {
        StorageCapability::KeyValue => Arc::new(FileStorage::new(config.storage_path())),
        StorageCapability::Secure => Arc::new(SecureStorage::new()),
    };
    debug!(%platform, backend = adapter.backend(), "Selected storage adapter");
    adapter
}

/// In-memory adapter for ephemeral sessions
pub fn ephemeral_adapter() -> Arc<dyn StorageAdapter> {
    Arc::new(MemoryStorage::new())
}
