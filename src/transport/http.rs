use std::time::Duration;

use bytes::Bytes;
use futures::TryStreamExt;
use keyring::Entry;
use tracing::{debug, info};
use uuid::Uuid;

use super::{RequestSpec, StreamTransport, TransportError};
use crate::{BoxStream, Error, Result};

/// reqwest-backed transport shared by all four providers.
///
/// The client carries no overall request timeout: the session owns the
/// wall-clock budget and cancels the transfer itself.
pub struct HttpTransport {
    client: reqwest::Client,
}

impl HttpTransport {
    pub fn new() -> Result<Self> {
        let client = reqwest::Client::builder()
            .connect_timeout(Duration::from_secs(15))
            .pool_max_idle_per_host(8)
            .pool_idle_timeout(Some(Duration::from_secs(90)))
            .build()
            .map_err(|e| Error::Transport(TransportError::Other(e.to_string())))?;
        Ok(Self { client })
    }

    /// Resolve a provider's API key: the system keyring (service
    /// `roundtable`, username = provider id) first, then the
    /// `{PROVIDER}_API_KEY` environment variable.
    fn get_api_key(provider_id: &str) -> Option<String> {
        if let Ok(entry) = Entry::new("roundtable", provider_id) {
            if let Ok(key) = entry.get_password() {
                return Some(key);
            }
        }

        let env_var = format!("{}_API_KEY", provider_id.to_uppercase());
        std::env::var(env_var).ok()
    }
}

#[async_trait::async_trait]
impl StreamTransport for HttpTransport {
    async fn open_stream(&self, spec: &RequestSpec) -> Result<BoxStream<'static, Bytes>> {
        let client_request_id = Uuid::new_v4().to_string();
        let api_key = spec
            .api_key
            .clone()
            .or_else(|| Self::get_api_key(spec.provider.id()));

        let mut req = self
            .client
            .post(&spec.base_url)
            .json(&spec.body)
            .header("accept", "text/event-stream")
            .header("x-request-id", &client_request_id);
        if let Some(key) = &api_key {
            req = req.bearer_auth(key);
        }

        debug!(
            provider = spec.provider.id(),
            url = spec.base_url.as_str(),
            request_id = client_request_id.as_str(),
            "issuing streaming request"
        );

        let resp = req
            .send()
            .await
            .map_err(|e| Error::Transport(TransportError::Http(e)))?;

        let status = resp.status();
        if !status.is_success() {
            let status = status.as_u16();
            let body = resp.text().await.unwrap_or_default();
            info!(
                provider = spec.provider.id(),
                http_status = status,
                request_id = client_request_id.as_str(),
                "streaming request refused"
            );
            return Err(Error::Remote {
                status,
                message: body,
                retryable: status >= 500 || status == 429 || status == 408,
            });
        }

        let byte_stream = resp
            .bytes_stream()
            .map_err(|e| Error::Transport(TransportError::Http(e)));
        Ok(Box::pin(byte_stream))
    }
}
