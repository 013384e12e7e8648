//! REST client for the dashboard API
//!
//! Every call resolves to [`ApiResult`]: non-2xx statuses, non-JSON bodies,
//! transport failures and timeouts all become an [`ApiError`]. Idempotent
//! reads are retried with exponential backoff; every call can be aborted
//! through a [`CancellationToken`].

use std::sync::{Arc, RwLock};
use std::time::Duration;

use serde::Serialize;
use serde_json::Value;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};
use uuid::Uuid;

use super::retry::RetryPolicy;
use super::transport::{HttpRequest, HttpResponse, Method, ReqwestTransport, Transport};
use crate::config::Config;
use crate::error::{ApiError, ApiResult};
use crate::platform::Platform;

/// Longest body excerpt quoted in error messages
const ERROR_EXCERPT_LEN: usize = 120;

/// Timing knobs for the client
#[derive(Debug, Clone, Copy)]
pub struct ClientOptions {
    pub timeout: Duration,
    pub retry: RetryPolicy,
}

impl Default for ClientOptions {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(10),
            retry: RetryPolicy::default(),
        }
    }
}

impl ClientOptions {
    pub fn from_config(config: &Config) -> Self {
        Self {
            timeout: config.request_timeout(),
            retry: RetryPolicy {
                max_retries: config.max_retries,
                base_delay: config.retry_base_delay(),
            },
        }
    }
}

/// Uniform REST client
pub struct ApiClient {
    base_url: String,
    transport: Arc<dyn Transport>,
    options: ClientOptions,
    /// Bearer token attached to every request while a session is active
    token: RwLock<Option<String>>,
}

impl ApiClient {
    pub fn new(
        base_url: impl Into<String>,
        transport: Arc<dyn Transport>,
        options: ClientOptions,
    ) -> Self {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        Self {
            base_url,
            transport,
            options,
            token: RwLock::new(None),
        }
    }

    /// Build a client for the configured (or probed) platform
    pub fn from_config(config: &Config, platform: Platform) -> ApiResult<Self> {
        let base_url = resolve_base_url(config, platform);
        let transport =
            ReqwestTransport::new().map_err(|e| ApiError::network(e.to_string()))?;
        debug!(%platform, %base_url, "API client configured");
        Ok(Self::new(
            base_url,
            Arc::new(transport),
            ClientOptions::from_config(config),
        ))
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Set or clear the bearer token
    pub fn set_token(&self, token: Option<String>) {
        *self.token.write().unwrap_or_else(|e| e.into_inner()) = token;
    }

    pub fn has_token(&self) -> bool {
        self.token
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .is_some()
    }

    /// GET with query pairs; retried on transient failures
    pub async fn get(
        &self,
        path: &str,
        query: &[(String, String)],
        cancel: &CancellationToken,
    ) -> ApiResult<Value> {
        self.execute(Method::Get, path, query, None, None, cancel)
            .await
    }

    pub async fn post<B: Serialize + ?Sized>(&self, path: &str, body: &B) -> ApiResult<Value> {
        let body = encode(body)?;
        self.execute(Method::Post, path, &[], Some(body), None, &CancellationToken::new())
            .await
    }

    pub async fn patch<B: Serialize + ?Sized>(&self, path: &str, body: &B) -> ApiResult<Value> {
        let body = encode(body)?;
        self.execute(Method::Patch, path, &[], Some(body), None, &CancellationToken::new())
            .await
    }

    pub async fn delete(&self, path: &str) -> ApiResult<Value> {
        self.execute(Method::Delete, path, &[], None, None, &CancellationToken::new())
            .await
    }

    /// POST authenticated with an explicit token instead of the session's
    pub async fn post_with_token<B: Serialize + ?Sized>(
        &self,
        path: &str,
        body: &B,
        token: &str,
    ) -> ApiResult<Value> {
        let body = encode(body)?;
        self.execute(
            Method::Post,
            path,
            &[],
            Some(body),
            Some(token),
            &CancellationToken::new(),
        )
        .await
    }

    async fn execute(
        &self,
        method: Method,
        path: &str,
        query: &[(String, String)],
        body: Option<Value>,
        token_override: Option<&str>,
        cancel: &CancellationToken,
    ) -> ApiResult<Value> {
        let url = self.url(path, query)?;
        let request_id = Uuid::new_v4().to_string();

        let mut headers = vec![
            ("Accept".to_string(), "application/json".to_string()),
            ("x-request-id".to_string(), request_id.clone()),
        ];
        let token = match token_override {
            Some(token) => Some(token.to_string()),
            None => self
                .token
                .read()
                .unwrap_or_else(|e| e.into_inner())
                .clone(),
        };
        if let Some(token) = token {
            headers.push(("Authorization".to_string(), format!("Bearer {}", token)));
        }

        let request = HttpRequest {
            method,
            url,
            headers,
            body,
        };

        let mut retry = 0;
        loop {
            debug!(%request_id, %method, path, attempt = retry + 1, "Sending request");
            let result = self.attempt(request.clone(), cancel).await;

            let err = match result {
                Ok(value) => return Ok(value),
                Err(err) => err,
            };

            let delay = match (method.is_idempotent_read() && err.is_transient())
                .then(|| self.options.retry.delay_for(retry))
                .flatten()
            {
                Some(delay) => delay,
                None => {
                    debug!(%request_id, %method, path, error = %err, "Request failed");
                    return Err(err);
                }
            };

            warn!(
                %request_id,
                path,
                error = %err,
                delay_ms = delay.as_millis() as u64,
                "Transient failure, retrying"
            );
            tokio::select! {
                _ = cancel.cancelled() => return Err(ApiError::Cancelled),
                _ = tokio::time::sleep(delay) => {}
            }
            retry += 1;
        }
    }

    /// One round trip with timeout and cancellation
    async fn attempt(&self, request: HttpRequest, cancel: &CancellationToken) -> ApiResult<Value> {
        let timeout = self.options.timeout;
        let send = tokio::time::timeout(timeout, self.transport.send(request));

        let response = tokio::select! {
            _ = cancel.cancelled() => return Err(ApiError::Cancelled),
            outcome = send => match outcome {
                Err(_) => {
                    return Err(ApiError::network(format!(
                        "request timed out after {}ms",
                        timeout.as_millis()
                    )))
                }
                Ok(Err(e)) => return Err(ApiError::network(e.to_string())),
                Ok(Ok(response)) => response,
            },
        };

        interpret(response)
    }

    fn url(&self, path: &str, query: &[(String, String)]) -> ApiResult<String> {
        let raw = format!("{}/{}", self.base_url, path.trim_start_matches('/'));
        let mut url = reqwest::Url::parse(&raw)
            .map_err(|e| ApiError::network(format!("invalid URL '{}': {}", raw, e)))?;
        if !query.is_empty() {
            url.query_pairs_mut().extend_pairs(query);
        }
        Ok(url.to_string())
    }
}

/// Base URL: explicit configuration wins over the platform default
pub fn resolve_base_url(config: &Config, platform: Platform) -> String {
    config
        .api_url
        .clone()
        .filter(|url| !url.trim().is_empty())
        .unwrap_or_else(|| platform.default_base_url())
}

fn encode<B: Serialize + ?Sized>(body: &B) -> ApiResult<Value> {
    serde_json::to_value(body)
        .map_err(|e| ApiError::Parse(format!("failed to encode request body: {}", e)))
}

/// Map a raw response onto the result taxonomy
fn interpret(response: HttpResponse) -> ApiResult<Value> {
    let status = response.status;

    if status == 401 || status == 403 {
        return Err(ApiError::Auth(
            server_message(&response.body).unwrap_or_else(|| format!("status {}", status)),
        ));
    }

    if !response.is_success() {
        return Err(ApiError::Http {
            status,
            message: server_message(&response.body)
                .unwrap_or_else(|| excerpt(&response.body).to_string()),
        });
    }

    if response.body.trim().is_empty() {
        return Ok(Value::Null);
    }

    serde_json::from_str(&response.body).map_err(|_| {
        ApiError::Parse(format!(
            "response is not JSON: {:?}",
            excerpt(&response.body)
        ))
    })
}

/// `message` or `error` field of a JSON error body
fn server_message(body: &str) -> Option<String> {
    let value: Value = serde_json::from_str(body).ok()?;
    ["message", "error"]
        .iter()
        .find_map(|key| value.get(key).and_then(Value::as_str))
        .map(str::to_string)
}

fn excerpt(body: &str) -> &str {
    let body = body.trim();
    match body.char_indices().nth(ERROR_EXCERPT_LEN) {
        Some((idx, _)) => &body[..idx],
        None => body,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::fake::FakeBackend;
    use serde_json::json;

    fn client(backend: &Arc<FakeBackend>) -> ApiClient {
        ApiClient::new(
            "http://fake.test/",
            backend.clone(),
            ClientOptions {
                timeout: Duration::from_millis(200),
                retry: RetryPolicy {
                    max_retries: 2,
                    base_delay: Duration::from_millis(5),
                },
            },
        )
    }

    #[test]
    fn test_resolve_base_url() {
        let mut config = Config::default();
        assert_eq!(
            resolve_base_url(&config, Platform::AndroidEmulator),
            "http://10.0.2.2:3001"
        );
        config.api_url = Some("https://api.example.com".into());
        assert_eq!(
            resolve_base_url(&config, Platform::AndroidEmulator),
            "https://api.example.com"
        );
    }

    #[tokio::test]
    async fn test_success_and_query_encoding() {
        let backend = FakeBackend::new();
        backend.seed("/notes", vec![json!({"id": 1, "title": "a b"})]);
        let api = client(&backend);

        let query = vec![("q".to_string(), "a b".to_string())];
        let value = api
            .get("/notes", &query, &CancellationToken::new())
            .await
            .unwrap();
        assert_eq!(value, json!([{"id": 1, "title": "a b"}]));

        let sent = backend.requests();
        assert_eq!(sent[0].url, "http://fake.test/notes?q=a+b");
        assert!(sent[0].header("x-request-id").is_some());
    }

    #[tokio::test]
    async fn test_non_2xx_becomes_http_error() {
        let backend = FakeBackend::new();
        backend.respond(Method::Get, "/notes", 404, r#"{"message":"no such thing"}"#);
        let api = client(&backend);

        let err = api
            .get("/notes", &[], &CancellationToken::new())
            .await
            .unwrap_err();
        assert_eq!(
            err,
            ApiError::Http {
                status: 404,
                message: "no such thing".into()
            }
        );
        // 404 is not transient: one attempt only
        assert_eq!(backend.requests().len(), 1);
    }

    #[tokio::test]
    async fn test_non_json_body_becomes_parse_error() {
        let backend = FakeBackend::new();
        backend.respond(Method::Get, "/notes", 200, "<html>gateway</html>");
        let api = client(&backend);

        let err = api
            .get("/notes", &[], &CancellationToken::new())
            .await
            .unwrap_err();
        assert!(matches!(err, ApiError::Parse(_)));
    }

    #[tokio::test]
    async fn test_transport_failure_becomes_network_error() {
        let backend = FakeBackend::new();
        backend.fail(Method::Post, "/notes", "connection refused");
        let api = client(&backend);

        let err = api.post("/notes", &json!({"title": "x"})).await.unwrap_err();
        assert!(matches!(err, ApiError::Network { .. }));
        // Writes are never retried
        assert_eq!(backend.requests().len(), 1);
    }

    #[tokio::test]
    async fn test_unauthorized_becomes_auth_error() {
        let backend = FakeBackend::new();
        backend.respond(Method::Get, "/passwords", 401, r#"{"error":"jwt expired"}"#);
        let api = client(&backend);

        let err = api
            .get("/passwords", &[], &CancellationToken::new())
            .await
            .unwrap_err();
        assert_eq!(err, ApiError::Auth("jwt expired".into()));
    }

    #[tokio::test]
    async fn test_get_retries_transient_failures() {
        let backend = FakeBackend::new();
        backend.seed("/notes", vec![json!({"id": 1})]);
        backend.respond(Method::Get, "/notes", 503, "");
        backend.fail(Method::Get, "/notes", "reset by peer");
        let api = client(&backend);

        let value = api
            .get("/notes", &[], &CancellationToken::new())
            .await
            .unwrap();
        assert_eq!(value, json!([{"id": 1}]));
        assert_eq!(backend.requests().len(), 3);
    }

    #[tokio::test]
    async fn test_retries_are_bounded() {
        let backend = FakeBackend::new();
        for _ in 0..5 {
            backend.respond(Method::Get, "/notes", 500, "");
        }
        let api = client(&backend);

        let err = api
            .get("/notes", &[], &CancellationToken::new())
            .await
            .unwrap_err();
        assert_eq!(err.status_code(), Some(500));
        // First attempt plus two retries
        assert_eq!(backend.requests().len(), 3);
    }

    #[tokio::test]
    async fn test_timeout() {
        let backend = FakeBackend::new();
        backend.respond_after(Method::Post, "/notes", 200, "{}", Duration::from_secs(2));
        let api = client(&backend);

        let err = api.post("/notes", &json!({})).await.unwrap_err();
        assert!(err.to_string().contains("timed out"));
    }

    #[tokio::test]
    async fn test_cancellation_aborts_request() {
        let backend = FakeBackend::new();
        backend.respond_after(Method::Get, "/notes", 200, "[]", Duration::from_secs(2));
        let api = client(&backend);

        let cancel = CancellationToken::new();
        let trigger = cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(10)).await;
            trigger.cancel();
        });

        let err = api.get("/notes", &[], &cancel).await.unwrap_err();
        assert_eq!(err, ApiError::Cancelled);
    }

    #[tokio::test]
    async fn test_bearer_token_header() {
        let backend = FakeBackend::new();
        let api = client(&backend);

        api.set_token(Some("t1".into()));
        api.delete("/notes/1").await.ok();
        api.set_token(None);
        api.delete("/notes/2").await.ok();

        let sent = backend.requests();
        assert_eq!(sent[0].header("authorization"), Some("Bearer t1"));
        assert_eq!(sent[1].header("authorization"), None);
    }

    #[test]
    fn test_empty_success_body_is_null() {
        let value = interpret(HttpResponse {
            status: 204,
            body: String::new(),
        })
        .unwrap();
        assert_eq!(value, Value::Null);
    }
}
