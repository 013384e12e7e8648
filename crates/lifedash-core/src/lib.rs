//! Lifedash Core Library
//!
//! Session, persistence and synchronization layer for the Lifedash
//! personal-data dashboard (notes, bookmarks, passwords, wallet cards, voice
//! memos, resumes, files, photos).
//!
//! # Architecture
//!
//! ```text
//! caller -> SyncActions -> ApiClient -> envelope normalization -> EntityStore
//!                                                                    |
//!                           PersistenceMiddleware <- SessionManager -+
//! ```
//!
//! - Collections are mutated only through [`SyncActions`]; readers take
//!   snapshots or subscribe to changes
//! - Each domain's collection converges on its most recently issued fetch
//! - The session token and a small preferences slice survive restarts
//!   through a platform-selected [`StorageAdapter`]
//!
//! # Quick Start
//!
//! ```text
//! let dashboard = Dashboard::open().await?;
//! dashboard.login(&Credentials::new("me@example.com", "secret")).await?;
//!
//! let bookmarks = dashboard.bookmarks();
//! bookmarks.create(&BookmarkDraft::new("https://example.com")).await?;
//! let all = bookmarks.fetch(ListFilters::new().tag("reading")).await?;
//! ```
//!
//! # Modules
//!
//! - `dashboard`: the assembled context (main entry point)
//! - `session`: login, logout, token verification and restoration
//! - `sync`: per-domain fetch and mutation actions
//! - `store`: in-memory collections with ordered, cancellable fetches
//! - `api`: REST client, transport seam, retry and filters
//! - `envelope`: list/record response normalization
//! - `storage`: key-value adapters and the persisted slice
//! - `models`, `domain`: records, drafts and per-domain metadata
//! - `config`, `platform`: configuration and runtime platform probe

pub mod api;
pub mod config;
pub mod dashboard;
pub mod domain;
pub mod envelope;
pub mod error;
pub mod models;
pub mod platform;
pub mod session;
pub mod storage;
pub mod store;
pub mod sync;

pub use api::{ApiClient, ListFilters, SortOrder};
pub use config::Config;
pub use dashboard::Dashboard;
pub use domain::{Domain, MutationPolicy};
pub use error::{ApiError, ApiResult};
pub use models::{
    Album, AlbumDraft, Bookmark, BookmarkDraft, Card, CardDraft, Draft, Entity, EntityId,
    FileDraft, FileItem, Folder, FolderDraft, Note, NoteDraft, Password, PasswordDraft, Photo,
    PhotoDraft, Resume, ResumeDraft, UserProfile, VoiceMemo, VoiceMemoDraft,
};
pub use platform::Platform;
pub use session::{Credentials, Session, SessionManager};
pub use storage::{Preferences, StorageAdapter, StorageError, Theme};
pub use store::{Collection, CollectionSummary, EntityStore, FetchStatus};
pub use sync::SyncActions;
