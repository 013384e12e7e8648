//! Dashboard API access
//!
//! - `client`: [`ApiClient`], the uniform REST entry point
//! - `transport`: the HTTP seam and its reqwest implementation
//! - `retry`: backoff policy for idempotent reads
//! - `query`: list filters

mod client;
mod query;
mod retry;
mod transport;

#[cfg(test)]
pub(crate) mod fake;

pub use client::{resolve_base_url, ApiClient, ClientOptions};
pub use query::{ListFilters, SortOrder};
pub use retry::RetryPolicy;
pub use transport::{HttpRequest, HttpResponse, Method, ReqwestTransport, Transport, TransportError};
