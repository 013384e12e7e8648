//! Synchronization between the API and the entity store
//!
//! [`SyncActions`] is the only way to change a collection: every fetch,
//! create, update and delete for a domain goes through it.

mod actions;

pub use actions::SyncActions;
