//! Storage layer
//!
//! ## Architecture
//!
//! - **StorageAdapter**: async key-value contract, one implementation per
//!   platform strategy (file, secure, memory)
//! - **PersistenceMiddleware**: writes the whitelisted state slice through
//!   the adapter and rehydrates it once at startup
//!
//! Backends swallow their own failures; nothing in this module hands an
//! error back to its caller.

mod adapter;
pub mod error;
mod file;
mod memory;
pub mod persistence;
mod secure;

pub use adapter::{ephemeral_adapter, select_adapter, StorageAdapter};
pub use error::{StorageError, StorageResult};
pub use file::FileStorage;
pub use memory::MemoryStorage;
pub use persistence::{PersistedSlice, PersistenceMiddleware, Preferences, Theme};
pub use secure::SecureStorage;
