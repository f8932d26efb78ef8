//! Network transport: the seam between the session and the wire.
//!
//! [`StreamTransport`] is the only interface the session layer depends on,
//! so tests can drive the whole pipeline with scripted byte streams while
//! production uses [`HttpTransport`] over reqwest.

mod http;

pub use http::HttpTransport;

use bytes::Bytes;

use crate::config::Provider;
use crate::{BoxStream, Result};

/// Everything needed to issue one provider call. Built by the orchestrator
/// from the stage's [`crate::config::ProviderConfig`]; immutable per call.
#[derive(Debug, Clone)]
pub struct RequestSpec {
    pub provider: Provider,
    pub base_url: String,
    pub api_key: Option<String>,
    pub body: serde_json::Value,
}

/// Opens one streaming call and returns its raw byte stream.
///
/// An `Err` from `open_stream` is a connection-establishment failure (DNS,
/// TLS, or a non-2xx status before any body byte) and is what the session's
/// retry policy applies to. Errors surfaced later, through the stream items,
/// are mid-transfer failures and are not retried.
#[async_trait::async_trait]
pub trait StreamTransport: Send + Sync {
    async fn open_stream(&self, spec: &RequestSpec) -> Result<BoxStream<'static, Bytes>>;
}

#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Transport error: {0}")]
    Other(String),
}
