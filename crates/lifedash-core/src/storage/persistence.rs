//! Persisted state slice
//!
//! Only a whitelisted slice of application state survives restarts: the
//! signed-in user and UI preferences. The slice is written through the
//! [`StorageAdapter`] under a single namespaced key after every change and
//! read back exactly once at startup.
//!
//! Stored format (key `app-storage`):
//!
//! ```json
//! { "version": 1, "state": { "user": { "id": 1 }, "preferences": { "theme": "dark" } } }
//! ```
//!
//! The session token lives under its own `token` key, owned by the session
//! manager.

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tokio::sync::{watch, Mutex};
use tracing::{debug, warn};

use super::StorageAdapter;
use crate::models::UserProfile;

/// Storage key holding the serialized slice
pub const STORAGE_KEY: &str = "app-storage";

/// Format version of the stored blob; other versions are ignored
pub const STORAGE_VERSION: u32 = 1;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Theme {
    Light,
    Dark,
    #[default]
    System,
}

impl fmt::Display for Theme {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Theme::Light => "light",
            Theme::Dark => "dark",
            Theme::System => "system",
        };
        f.write_str(name)
    }
}

impl FromStr for Theme {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "light" => Ok(Theme::Light),
            "dark" => Ok(Theme::Dark),
            "system" | "auto" => Ok(Theme::System),
            other => Err(format!(
                "Unknown theme '{}'. Valid themes: light, dark, system",
                other
            )),
        }
    }
}

/// UI preferences
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Preferences {
    pub theme: Theme,
    pub sidebar_collapsed: bool,
}

/// State that survives restarts
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct PersistedSlice {
    pub user: Option<UserProfile>,
    pub preferences: Preferences,
}

#[derive(Serialize, Deserialize)]
struct Stored {
    version: u32,
    state: PersistedSlice,
}

/// Writes the persisted slice through a storage adapter
pub struct PersistenceMiddleware {
    storage: Arc<dyn StorageAdapter>,
    state: watch::Sender<PersistedSlice>,
    /// Serializes writes so the adapter sees them in update order
    write_lock: Mutex<()>,
}

impl PersistenceMiddleware {
    /// Rehydrate the slice from storage.
    ///
    /// Missing, corrupt, or version-mismatched data yields defaults.
    pub async fn rehydrate(storage: Arc<dyn StorageAdapter>) -> Self {
        let initial = match storage.get(STORAGE_KEY).await {
            None => {
                debug!("No persisted state, starting from defaults");
                PersistedSlice::default()
            }
            Some(raw) => decode(&raw).unwrap_or_else(|reason| {
                warn!(key = STORAGE_KEY, %reason, "Ignoring persisted state");
                PersistedSlice::default()
            }),
        };

        let (state, _) = watch::channel(initial);
        Self {
            storage,
            state,
            write_lock: Mutex::new(()),
        }
    }

    pub fn snapshot(&self) -> PersistedSlice {
        self.state.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<PersistedSlice> {
        self.state.subscribe()
    }

    /// Apply a change and persist the slice if anything changed
    pub async fn update<F>(&self, change: F)
    where
        F: FnOnce(&mut PersistedSlice),
    {
        let _guard = self.write_lock.lock().await;

        let changed = self.state.send_if_modified(|slice| {
            let before = slice.clone();
            change(slice);
            *slice != before
        });
        if !changed {
            return;
        }

        let stored = Stored {
            version: STORAGE_VERSION,
            state: self.snapshot(),
        };
        match serde_json::to_string(&stored) {
            Ok(json) => self.storage.set(STORAGE_KEY, &json).await,
            Err(e) => warn!(error = %e, "Failed to serialize persisted state"),
        }
    }

    pub async fn set_user(&self, user: Option<UserProfile>) {
        self.update(|slice| slice.user = user).await;
    }

    pub async fn set_theme(&self, theme: Theme) {
        self.update(|slice| slice.preferences.theme = theme).await;
    }

    pub async fn set_sidebar_collapsed(&self, collapsed: bool) {
        self.update(|slice| slice.preferences.sidebar_collapsed = collapsed)
            .await;
    }
}

fn decode(raw: &str) -> Result<PersistedSlice, String> {
    let stored: Stored = serde_json::from_str(raw).map_err(|e| e.to_string())?;
    if stored.version != STORAGE_VERSION {
        return Err(format!(
            "version {} (expected {})",
            stored.version, STORAGE_VERSION
        ));
    }
    Ok(stored.state)
}
