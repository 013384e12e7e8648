//! Dashboard context
//!
//! Owns every component of the session and sync layer and hands them to
//! callers explicitly; nothing here is global.
//!
//! ## Startup
//!
//! 1. Probe the platform (or take the configured override)
//! 2. Select the storage strategy and API base URL for it
//! 3. Rehydrate the persisted slice
//! 4. Restore the session, verifying any stored token
//!
//! The dashboard is only handed back after step 4, so callers never observe
//! an authenticated state the server has not confirmed.
//!
//! ## Usage
//!
//! ```ignore
//! let dashboard = Dashboard::open().await?;
//! dashboard.login(&Credentials::new("me@example.com", "secret")).await?;
//! let notes = dashboard.notes().fetch(ListFilters::new().pinned(true)).await?;
//! ```

use std::sync::Arc;

use anyhow::{Context, Result};
use futures_util::future::{join_all, BoxFuture, FutureExt};
use tokio::sync::watch;
use tracing::{debug, info};

use crate::api::ApiClient;
use crate::config::Config;
use crate::domain::Domain;
use crate::error::ApiResult;
use crate::models::{
    Album, Bookmark, Card, FileItem, Folder, Note, Password, Photo, Resume, UserProfile,
    VoiceMemo,
};
use crate::platform::Platform;
use crate::session::{Credentials, Session, SessionManager};
use crate::storage::{
    select_adapter, PersistedSlice, PersistenceMiddleware, Preferences, StorageAdapter, Theme,
};
use crate::store::{EntityStore, Stored};
use crate::sync::SyncActions;

/// The assembled session and sync layer
pub struct Dashboard {
    api: Arc<ApiClient>,
    storage: Arc<dyn StorageAdapter>,
    persisted: Arc<PersistenceMiddleware>,
    store: Arc<EntityStore>,
    session: Arc<SessionManager>,
}

impl Dashboard {
    /// Open with configuration from the default location
    pub async fn open() -> Result<Self> {
        let config = Config::load().context("Failed to load configuration")?;
        Self::open_with_config(config).await
    }

    /// Open with a specific configuration
    pub async fn open_with_config(config: Config) -> Result<Self> {
        let platform = config.platform.unwrap_or_else(Platform::detect);
        let storage = select_adapter(platform, &config);
        let api = ApiClient::from_config(&config, platform)
            .context("Failed to create API client")?;
        info!(%platform, api = api.base_url(), storage = storage.backend(), "Opening dashboard");

        Ok(Self::with_parts(Arc::new(api), storage).await)
    }

    /// Assemble from an existing client and storage, then restore the session
    pub async fn with_parts(api: Arc<ApiClient>, storage: Arc<dyn StorageAdapter>) -> Self {
        let persisted = Arc::new(PersistenceMiddleware::rehydrate(storage.clone()).await);
        let store = Arc::new(EntityStore::new());
        let session = Arc::new(SessionManager::new(
            api.clone(),
            storage.clone(),
            persisted.clone(),
            store.clone(),
        ));

        match session.restore_session().await {
            Some(restored) => debug!(
                user = ?restored.user().map(|u| &u.id),
                "Session restored"
            ),
            None => debug!("Starting anonymous"),
        }

        Self {
            api,
            storage,
            persisted,
            store,
            session,
        }
    }

    pub fn api_url(&self) -> &str {
        self.api.base_url()
    }

    pub fn storage_backend(&self) -> &'static str {
        self.storage.backend()
    }

    pub fn store(&self) -> &EntityStore {
        &self.store
    }

    // ==================== Session ====================

    pub fn session_manager(&self) -> &SessionManager {
        &self.session
    }

    pub fn session(&self) -> Session {
        self.session.current()
    }

    pub fn subscribe_session(&self) -> watch::Receiver<Session> {
        self.session.subscribe()
    }

    pub fn user(&self) -> Option<UserProfile> {
        self.session.current().user().cloned()
    }

    pub async fn login(&self, credentials: &Credentials) -> ApiResult<Session> {
        self.session.login(credentials).await
    }

    pub async fn logout(&self) {
        self.session.logout().await
    }

    pub async fn request_password_reset(&self, email: &str) -> ApiResult<()> {
        self.session.request_password_reset(email).await
    }

    // ==================== Preferences ====================

    pub fn preferences(&self) -> Preferences {
        self.persisted.snapshot().preferences
    }

    pub fn subscribe_preferences(&self) -> watch::Receiver<PersistedSlice> {
        self.persisted.subscribe()
    }

    pub async fn set_theme(&self, theme: Theme) {
        self.persisted.set_theme(theme).await
    }

    pub async fn set_sidebar_collapsed(&self, collapsed: bool) {
        self.persisted.set_sidebar_collapsed(collapsed).await
    }

    // ==================== Collections ====================

    /// Actions for any stored entity type
    pub fn actions<T: Stored>(&self) -> SyncActions<T> {
        SyncActions::new(self.api.clone(), self.store.clone(), self.session.clone())
    }

    pub fn notes(&self) -> SyncActions<Note> {
        self.actions()
    }

    pub fn bookmarks(&self) -> SyncActions<Bookmark> {
        self.actions()
    }

    pub fn passwords(&self) -> SyncActions<Password> {
        self.actions()
    }

    pub fn cards(&self) -> SyncActions<Card> {
        self.actions()
    }

    pub fn voice_memos(&self) -> SyncActions<VoiceMemo> {
        self.actions()
    }

    pub fn resumes(&self) -> SyncActions<Resume> {
        self.actions()
    }

    pub fn files(&self) -> SyncActions<FileItem> {
        self.actions()
    }

    pub fn folders(&self) -> SyncActions<Folder> {
        self.actions()
    }

    pub fn photos(&self) -> SyncActions<Photo> {
        self.actions()
    }

    pub fn albums(&self) -> SyncActions<Album> {
        self.actions()
    }

    /// Refetch every collection concurrently.
    ///
    /// Returns each domain's item count or error, in domain order.
    pub async fn refresh_all(&self) -> Vec<(Domain, ApiResult<usize>)> {
        let refreshes = vec![
            self.refresh::<Note>(),
            self.refresh::<Bookmark>(),
            self.refresh::<Password>(),
            self.refresh::<Card>(),
            self.refresh::<VoiceMemo>(),
            self.refresh::<Resume>(),
            self.refresh::<FileItem>(),
            self.refresh::<Folder>(),
            self.refresh::<Photo>(),
            self.refresh::<Album>(),
        ];
        join_all(refreshes).await
    }

    fn refresh<T: Stored>(&self) -> BoxFuture<'static, (Domain, ApiResult<usize>)> {
        let actions = self.actions::<T>();
        async move {
            let result = actions.refetch().await.map(|items| items.len());
            (T::DOMAIN, result)
        }
        .boxed()
    }
}
