//! Authentication lifecycle
//!
//! ```text
//! Anonymous --login--> Authenticated --logout | failed verify | AuthError--> Anonymous
//! ```
//!
//! The token is persisted under its own storage key only after the server
//! has confirmed a login, and always together with a user. Ending a session
//! for any reason drops the persisted token, the API client's bearer token,
//! the cached user and every synchronized collection.

use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tokio::sync::watch;
use tracing::{debug, info, warn};

use crate::api::ApiClient;
use crate::error::{ApiError, ApiResult};
use crate::models::UserProfile;
use crate::storage::{PersistenceMiddleware, StorageAdapter};
use crate::store::EntityStore;

/// Storage key holding the session token
pub const TOKEN_KEY: &str = "token";

/// Current identity. Token and user are present together or not at all.
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
#[serde(tag = "state", rename_all = "lowercase")]
pub enum Session {
    #[default]
    Anonymous,
    Authenticated { token: String, user: UserProfile },
}

impl Session {
    pub fn is_authenticated(&self) -> bool {
        matches!(self, Session::Authenticated { .. })
    }

    pub fn token(&self) -> Option<&str> {
        match self {
            Session::Authenticated { token, .. } => Some(token),
            Session::Anonymous => None,
        }
    }

    pub fn user(&self) -> Option<&UserProfile> {
        match self {
            Session::Authenticated { user, .. } => Some(user),
            Session::Anonymous => None,
        }
    }
}

/// Login form
#[derive(Clone, Serialize)]
pub struct Credentials {
    pub email: String,
    pub password: String,
}

impl Credentials {
    pub fn new(email: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            email: email.into(),
            password: password.into(),
        }
    }

    fn missing_fields(&self) -> Vec<&'static str> {
        let mut missing = Vec::new();
        if self.email.trim().is_empty() {
            missing.push("email");
        }
        if self.password.is_empty() {
            missing.push("password");
        }
        missing
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("email", &self.email)
            .field("password", &"<redacted>")
            .finish()
    }
}

#[derive(Deserialize)]
struct LoginResponse {
    #[serde(default)]
    token: Option<String>,
    #[serde(default)]
    user: Option<UserProfile>,
}

#[derive(Deserialize)]
struct VerifyResponse {
    #[serde(default = "default_valid")]
    valid: bool,
    #[serde(default)]
    user: Option<UserProfile>,
}

fn default_valid() -> bool {
    true
}

/// Owns the session state machine
pub struct SessionManager {
    api: Arc<ApiClient>,
    storage: Arc<dyn StorageAdapter>,
    persisted: Arc<PersistenceMiddleware>,
    store: Arc<EntityStore>,
    state: watch::Sender<Session>,
}

impl SessionManager {
    pub fn new(
        api: Arc<ApiClient>,
        storage: Arc<dyn StorageAdapter>,
        persisted: Arc<PersistenceMiddleware>,
        store: Arc<EntityStore>,
    ) -> Self {
        let (state, _) = watch::channel(Session::Anonymous);
        Self {
            api,
            storage,
            persisted,
            store,
            state,
        }
    }

    pub fn current(&self) -> Session {
        self.state.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<Session> {
        self.state.subscribe()
    }

    pub fn is_authenticated(&self) -> bool {
        self.state.borrow().is_authenticated()
    }

    /// Sign in and persist the resulting session
    pub async fn login(&self, credentials: &Credentials) -> ApiResult<Session> {
        let missing = credentials.missing_fields();
        if !missing.is_empty() {
            return Err(ApiError::validation(missing));
        }

        let body = self.api.post("/auth/login", credentials).await?;
        let response: LoginResponse = serde_json::from_value(body)
            .map_err(|e| ApiError::Parse(format!("unexpected login response: {}", e)))?;

        let (token, user) = match (response.token, response.user) {
            (Some(token), Some(user)) if is_plausible_token(&token) => (token, user),
            _ => {
                return Err(ApiError::Parse(
                    "login response is missing a token or user".to_string(),
                ))
            }
        };

        if let Some(previous) = self.current().user() {
            debug!(previous = %previous.id, "Replacing active session");
            self.store.clear_all();
        }
        info!(user = %user.id, "Signed in");
        self.establish(token, user).await;
        Ok(self.current())
    }

    /// Sign out locally; the server is told on a best-effort basis
    pub async fn logout(&self) {
        let current = self.current();
        if let Some(token) = current.token() {
            if let Err(e) = self
                .api
                .post_with_token("/auth/logout", &json!({}), token)
                .await
            {
                debug!(error = %e, "Server logout failed, clearing locally anyway");
            }
        }
        self.clear().await;
        info!("Signed out");
    }

    /// Re-establish the persisted session at startup.
    ///
    /// Returns `None` (and clears any stored token) unless the server accepts
    /// the stored token.
    pub async fn restore_session(&self) -> Option<Session> {
        let Some(raw) = self.storage.get(TOKEN_KEY).await else {
            debug!("No stored token");
            return None;
        };

        let token = raw.trim().to_string();
        if !is_plausible_token(&token) {
            warn!("Stored token is malformed, discarding it");
            self.clear().await;
            return None;
        }

        match self.verify(&token).await {
            Ok(Some(user)) => {
                debug!(user = %user.id, "Restored session");
                self.establish(token, user).await;
                Some(self.current())
            }
            Ok(None) => {
                info!("Stored token was rejected, signing out");
                self.clear().await;
                None
            }
            Err(e) => {
                warn!(error = %e, "Could not verify stored token, signing out");
                self.clear().await;
                None
            }
        }
    }

    /// Ask the server whether `token` is still valid.
    ///
    /// `false` ends the current session. On `true` the current session's
    /// user is refreshed if `token` is its token.
    pub async fn verify_session_token(&self, token: &str) -> bool {
        match self.verify(token).await {
            Ok(Some(user)) => {
                if self.current().token() == Some(token) {
                    self.persisted.set_user(Some(user.clone())).await;
                    self.state.send_replace(Session::Authenticated {
                        token: token.to_string(),
                        user,
                    });
                }
                true
            }
            Ok(None) => {
                self.clear().await;
                false
            }
            Err(e) => {
                debug!(error = %e, "Token verification failed");
                self.clear().await;
                false
            }
        }
    }

    /// End the session after the server rejected our credentials
    pub async fn handle_auth_failure(&self, error: &ApiError) {
        if self.is_authenticated() || self.api.has_token() {
            warn!(%error, "Session rejected by server, signing out");
        }
        self.clear().await;
    }

    /// Send a password reset link to `email`
    pub async fn request_password_reset(&self, email: &str) -> ApiResult<()> {
        let email = email.trim();
        if email.is_empty() || !email.contains('@') {
            return Err(ApiError::validation(["email"]));
        }
        self.api
            .post("/auth/password-reset", &json!({ "email": email }))
            .await?;
        info!("Password reset requested");
        Ok(())
    }

    /// `Some(user)` when the server accepts `token`
    async fn verify(&self, token: &str) -> ApiResult<Option<UserProfile>> {
        let body = match self
            .api
            .post_with_token("/auth/verify-token", &json!({ "token": token }), token)
            .await
        {
            Ok(body) => body,
            Err(ApiError::Auth(_)) => return Ok(None),
            Err(e) => return Err(e),
        };

        let response: VerifyResponse = match body {
            Value::Null => VerifyResponse {
                valid: true,
                user: None,
            },
            other => serde_json::from_value(other)
                .map_err(|e| ApiError::Parse(format!("unexpected verify response: {}", e)))?,
        };
        if !response.valid {
            return Ok(None);
        }

        // Fall back to the cached user when the server only says "valid"
        Ok(response.user.or_else(|| self.persisted.snapshot().user))
    }

    async fn establish(&self, token: String, user: UserProfile) {
        self.storage.set(TOKEN_KEY, &token).await;
        self.api.set_token(Some(token.clone()));
        self.persisted.set_user(Some(user.clone())).await;
        self.state
            .send_replace(Session::Authenticated { token, user });
    }

    async fn clear(&self) {
        self.state.send_replace(Session::Anonymous);
        self.api.set_token(None);
        self.storage.remove(TOKEN_KEY).await;
        self.persisted.set_user(None).await;
        self.store.clear_all();
    }
}

/// Tokens are opaque, but never empty and never contain whitespace or
/// control characters
fn is_plausible_token(token: &str) -> bool {
    !token.is_empty()
        && token
            .chars()
            .all(|c| !c.is_whitespace() && !c.is_control())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::fake::FakeBackend;
    use crate::api::Method;
    use crate::models::Note;
    use crate::storage::MemoryStorage;
    use crate::store::Stored;
    use tokio_util::sync::CancellationToken;

    struct Harness {
        backend: Arc<FakeBackend>,
        storage: Arc<MemoryStorage>,
        store: Arc<EntityStore>,
        session: SessionManager,
    }

    async fn harness_with(storage: MemoryStorage) -> Harness {
        let backend = FakeBackend::new();
        let storage = Arc::new(storage);
        let persisted = Arc::new(PersistenceMiddleware::rehydrate(storage.clone()).await);
        let store = Arc::new(EntityStore::new());
        let session = SessionManager::new(
            backend.client(),
            storage.clone(),
            persisted,
            store.clone(),
        );
        Harness {
            backend,
            storage,
            store,
            session,
        }
    }

    async fn harness() -> Harness {
        harness_with(MemoryStorage::new()).await
    }

    fn user(id: i64) -> UserProfile {
        UserProfile::new(id)
    }

    #[tokio::test]
    async fn test_login_persists_token_and_user() {
        let h = harness().await;
        h.backend
            .add_account("a@b.c", "pw", "t1", json!({"id": 1}));

        let session = h
            .session
            .login(&Credentials::new("a@b.c", "pw"))
            .await
            .unwrap();

        assert_eq!(
            session,
            Session::Authenticated {
                token: "t1".into(),
                user: user(1)
            }
        );
        assert_eq!(h.storage.get(TOKEN_KEY).await.as_deref(), Some("t1"));
        assert!(h.session.is_authenticated());
    }

    #[tokio::test]
    async fn test_login_sends_bearer_on_later_requests() {
        let h = harness().await;
        h.backend.add_account("a@b.c", "pw", "t1", json!({"id": 1}));
        h.session
            .login(&Credentials::new("a@b.c", "pw"))
            .await
            .unwrap();

        h.backend.seed("/notes", Vec::new());
        h.session
            .api
            .get("/notes", &[], &CancellationToken::new())
            .await
            .unwrap();
        let requests = h.backend.requests();
        assert_eq!(
            requests.last().unwrap().header("authorization"),
            Some("Bearer t1")
        );
        assert!(h.session.api.has_token());
    }

    #[tokio::test]
    async fn test_failed_login_persists_nothing() {
        let h = harness().await;
        h.backend.add_account("a@b.c", "pw", "t1", json!({"id": 1}));

        let err = h
            .session
            .login(&Credentials::new("a@b.c", "wrong"))
            .await
            .unwrap_err();

        assert_eq!(err, ApiError::Auth("Invalid credentials".into()));
        assert!(h.storage.get(TOKEN_KEY).await.is_none());
        assert_eq!(h.session.current(), Session::Anonymous);
    }

    #[tokio::test]
    async fn test_login_without_user_is_rejected() {
        let h = harness().await;
        h.backend
            .respond(Method::Post, "/auth/login", 200, r#"{"token":"t1","user":null}"#);

        let err = h
            .session
            .login(&Credentials::new("a@b.c", "pw"))
            .await
            .unwrap_err();

        assert!(matches!(err, ApiError::Parse(_)));
        assert!(h.storage.get(TOKEN_KEY).await.is_none());
        assert!(!h.session.is_authenticated());
    }

    #[tokio::test]
    async fn test_login_validation_sends_nothing() {
        let h = harness().await;
        let err = h
            .session
            .login(&Credentials::new(" ", ""))
            .await
            .unwrap_err();

        assert_eq!(err, ApiError::validation(["email", "password"]));
        assert!(h.backend.requests().is_empty());
    }

    #[tokio::test]
    async fn test_logout_clears_everything() {
        let h = harness().await;
        h.backend.add_account("a@b.c", "pw", "t1", json!({"id": 1}));
        h.session
            .login(&Credentials::new("a@b.c", "pw"))
            .await
            .unwrap();
        h.store.slot::<Note>().upsert(
            serde_json::from_value(json!({"id": 1, "title": "private"})).unwrap(),
        );

        h.session.logout().await;

        assert_eq!(h.session.current(), Session::Anonymous);
        assert!(h.storage.get(TOKEN_KEY).await.is_none());
        assert!(!h.session.api.has_token());
        assert!(Note::slot(&h.store).snapshot().is_empty());
        assert_eq!(h.backend.requests_to(Method::Post, "/auth/logout"), 1);
    }

    #[tokio::test]
    async fn test_login_over_active_session_drops_previous_data() {
        let h = harness().await;
        h.backend.add_account("a@b.c", "pw", "t1", json!({"id": 1}));
        h.backend.add_account("z@b.c", "pw", "t2", json!({"id": 2}));
        h.session
            .login(&Credentials::new("a@b.c", "pw"))
            .await
            .unwrap();
        h.store.slot::<Note>().upsert(
            serde_json::from_value(json!({"id": 1, "title": "first account's note"})).unwrap(),
        );

        let session = h
            .session
            .login(&Credentials::new("z@b.c", "pw"))
            .await
            .unwrap();

        assert_eq!(session.user(), Some(&user(2)));
        assert!(Note::slot(&h.store).snapshot().is_empty());
        assert_eq!(h.storage.get(TOKEN_KEY).await.as_deref(), Some("t2"));
    }

    #[tokio::test]
    async fn test_logout_succeeds_when_server_unreachable() {
        let h = harness().await;
        h.backend.add_account("a@b.c", "pw", "t1", json!({"id": 1}));
        h.session
            .login(&Credentials::new("a@b.c", "pw"))
            .await
            .unwrap();
        h.backend.fail(Method::Post, "/auth/logout", "connection refused");

        h.session.logout().await;

        assert!(!h.session.is_authenticated());
        assert!(h.storage.get(TOKEN_KEY).await.is_none());
    }

    #[tokio::test]
    async fn test_restore_without_token_stays_anonymous() {
        let h = harness().await;
        assert!(h.session.restore_session().await.is_none());
        assert!(h.backend.requests().is_empty());
    }

    #[tokio::test]
    async fn test_restore_with_valid_token() {
        let h = harness_with(MemoryStorage::with_entries([(TOKEN_KEY, "t1")])).await;
        h.backend.accept_token("t1", json!({"id": 1, "name": "Ada"}));

        let session = h.session.restore_session().await.unwrap();

        assert_eq!(session.token(), Some("t1"));
        assert_eq!(session.user().unwrap().name.as_deref(), Some("Ada"));
        assert!(h.session.api.has_token());
    }

    #[tokio::test]
    async fn test_restore_with_expired_token_clears_it() {
        let h = harness_with(MemoryStorage::with_entries([(TOKEN_KEY, "old")])).await;

        assert!(h.session.restore_session().await.is_none());
        assert!(h.storage.get(TOKEN_KEY).await.is_none());
        assert_eq!(h.session.current(), Session::Anonymous);
    }

    #[tokio::test]
    async fn test_restore_with_corrupt_token_is_anonymous() {
        let h = harness_with(MemoryStorage::with_entries([(
            TOKEN_KEY,
            "\u{0}garbage with spaces",
        )]))
        .await;

        assert!(h.session.restore_session().await.is_none());
        assert!(h.storage.get(TOKEN_KEY).await.is_none());
        assert!(h.backend.requests().is_empty());
    }

    #[tokio::test]
    async fn test_restore_when_server_unreachable_clears_token() {
        let h = harness_with(MemoryStorage::with_entries([(TOKEN_KEY, "t1")])).await;
        h.backend
            .fail(Method::Post, "/auth/verify-token", "connection refused");

        assert!(h.session.restore_session().await.is_none());
        assert!(h.storage.get(TOKEN_KEY).await.is_none());
    }

    #[tokio::test]
    async fn test_verify_expired_token_clears_session() {
        let h = harness().await;
        h.backend.add_account("a@b.c", "pw", "t1", json!({"id": 1}));
        h.session
            .login(&Credentials::new("a@b.c", "pw"))
            .await
            .unwrap();

        assert!(!h.session.verify_session_token("expired-token").await);
        assert_eq!(h.session.current(), Session::Anonymous);
        assert!(h.storage.get(TOKEN_KEY).await.is_none());
    }

    #[tokio::test]
    async fn test_verify_valid_false_is_rejection() {
        let h = harness().await;
        h.backend.respond(
            Method::Post,
            "/auth/verify-token",
            200,
            r#"{"valid":false}"#,
        );
        assert!(!h.session.verify_session_token("t1").await);
    }

    #[tokio::test]
    async fn test_verify_live_token() {
        let h = harness().await;
        h.backend.accept_token("t1", json!({"id": 1}));
        assert!(h.session.verify_session_token("t1").await);
    }

    #[tokio::test]
    async fn test_auth_failure_forces_anonymous() {
        let h = harness().await;
        h.backend.add_account("a@b.c", "pw", "t1", json!({"id": 1}));
        h.session
            .login(&Credentials::new("a@b.c", "pw"))
            .await
            .unwrap();
        let mut rx = h.session.subscribe();

        h.session
            .handle_auth_failure(&ApiError::Auth("jwt expired".into()))
            .await;

        rx.changed().await.unwrap();
        assert_eq!(*rx.borrow(), Session::Anonymous);
        assert!(h.storage.get(TOKEN_KEY).await.is_none());
    }

    #[tokio::test]
    async fn test_password_reset() {
        let h = harness().await;
        h.session
            .request_password_reset("a@b.c")
            .await
            .unwrap();
        assert_eq!(
            h.backend.requests_to(Method::Post, "/auth/password-reset"),
            1
        );

        let err = h
            .session
            .request_password_reset("not-an-email")
            .await
            .unwrap_err();
        assert_eq!(err, ApiError::validation(["email"]));
    }

    #[test]
    fn test_credentials_debug_redacts_password() {
        let debug = format!("{:?}", Credentials::new("a@b.c", "hunter2"));
        assert!(debug.contains("a@b.c"));
        assert!(!debug.contains("hunter2"));
    }
}
