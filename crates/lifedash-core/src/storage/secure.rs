//! Device-secure storage
//!
//! Keychain/keystore access is not wired up on any platform yet. Every call
//! resolves as a no-op with a warning, so mobile sessions behave as if
//! nothing was ever persisted.

use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use tracing::warn;

use super::StorageAdapter;

#[derive(Debug, Default)]
pub struct SecureStorage {
    warned: AtomicBool,
}

impl SecureStorage {
    pub fn new() -> Self {
        Self::default()
    }

    fn warn_unavailable(&self, operation: &str, key: &str) {
        // Full warning once, then keep the noise down
        if !self.warned.swap(true, Ordering::Relaxed) {
            warn!(
                operation,
                key, "Secure storage is not available on this platform; value not persisted"
            );
        } else {
            tracing::debug!(operation, key, "Secure storage no-op");
        }
    }
}

#[async_trait]
impl StorageAdapter for SecureStorage {
    async fn get(&self, key: &str) -> Option<String> {
        self.warn_unavailable("get", key);
        None
    }

    async fn set(&self, key: &str, _value: &str) {
        self.warn_unavailable("set", key);
    }

    async fn remove(&self, key: &str) {
        self.warn_unavailable("remove", key);
    }

    fn backend(&self) -> &'static str {
        "secure"
    }
}
