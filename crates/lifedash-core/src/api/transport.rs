//! HTTP transport seam
//!
//! The client speaks to the network through [`Transport`] so the outcome
//! normalization, retry and cancellation logic stay independent of the HTTP
//! library. [`ReqwestTransport`] is the production implementation.

use std::fmt;
use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;
use thiserror::Error;

/// HTTP methods the dashboard API uses
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Method {
    Get,
    Post,
    Patch,
    Put,
    Delete,
}

impl Method {
    /// Safe to repeat without side effects
    pub fn is_idempotent_read(&self) -> bool {
        matches!(self, Method::Get)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Method::Get => "GET",
            Method::Post => "POST",
            Method::Patch => "PATCH",
            Method::Put => "PUT",
            Method::Delete => "DELETE",
        }
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<Method> for reqwest::Method {
    fn from(method: Method) -> Self {
        match method {
            Method::Get => reqwest::Method::GET,
            Method::Post => reqwest::Method::POST,
            Method::Patch => reqwest::Method::PATCH,
            Method::Put => reqwest::Method::PUT,
            Method::Delete => reqwest::Method::DELETE,
        }
    }
}

/// A fully resolved request
#[derive(Debug, Clone)]
pub struct HttpRequest {
    pub method: Method,
    /// Absolute URL including the query string
    pub url: String,
    pub headers: Vec<(String, String)>,
    pub body: Option<Value>,
}

impl HttpRequest {
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }
}

/// Raw response: status plus undecoded body text
#[derive(Debug, Clone)]
pub struct HttpResponse {
    pub status: u16,
    pub body: String,
}

impl HttpResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// The request never produced a response
#[derive(Error, Debug, Clone)]
#[error("{0}")]
pub struct TransportError(pub String);

#[async_trait]
pub trait Transport: Send + Sync {
    async fn send(&self, request: HttpRequest) -> Result<HttpResponse, TransportError>;
}

/// Transport backed by a shared `reqwest::Client`
pub struct ReqwestTransport {
    client: reqwest::Client,
}

/// Connect timeout; the overall deadline is enforced by the API client
const CONNECT_TIMEOUT: Duration = Duration::from_secs(5);

impl ReqwestTransport {
    pub fn new() -> Result<Self, TransportError> {
        let client = reqwest::Client::builder()
            .connect_timeout(CONNECT_TIMEOUT)
            .user_agent(concat!("lifedash/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| TransportError(format!("failed to build HTTP client: {}", e)))?;
        Ok(Self { client })
    }
}

#[async_trait]
impl Transport for ReqwestTransport {
    async fn send(&self, request: HttpRequest) -> Result<HttpResponse, TransportError> {
        let mut builder = self.client.request(request.method.into(), &request.url);
        for (name, value) in &request.headers {
            builder = builder.header(name.as_str(), value.as_str());
        }
        if let Some(ref body) = request.body {
            builder = builder.json(body);
        }

        let response = builder.send().await.map_err(describe)?;
        let status = response.status().as_u16();
        let body = response.text().await.map_err(describe)?;
        Ok(HttpResponse { status, body })
    }
}

fn describe(error: reqwest::Error) -> TransportError {
    let kind = if error.is_connect() {
        "connection failed"
    } else if error.is_timeout() {
        "timed out"
    } else if error.is_builder() {
        "invalid request"
    } else if error.is_body() || error.is_decode() {
        "failed to read body"
    } else {
        "request failed"
    };
    TransportError(format!("{}: {}", kind, error))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_only_get_is_idempotent_read() {
        assert!(Method::Get.is_idempotent_read());
        for method in [Method::Post, Method::Patch, Method::Put, Method::Delete] {
            assert!(!method.is_idempotent_read());
        }
    }

    #[test]
    fn test_header_lookup_is_case_insensitive() {
        let request = HttpRequest {
            method: Method::Get,
            url: "http://localhost/notes".into(),
            headers: vec![("Authorization".into(), "Bearer t".into())],
            body: None,
        };
        assert_eq!(request.header("authorization"), Some("Bearer t"));
        assert_eq!(request.header("x-request-id"), None);
    }

    #[tokio::test]
    async fn test_unreachable_host_is_transport_error() {
        let transport = ReqwestTransport::new().unwrap();
        let result = transport
            .send(HttpRequest {
                method: Method::Get,
                // Port 9 (discard) on loopback is closed on test machines
                url: "http://127.0.0.1:9/notes".into(),
                headers: Vec::new(),
                body: None,
            })
            .await;
        assert!(result.is_err());
    }
}
