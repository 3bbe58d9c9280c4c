//! The raw transport seam between the search client and the network.

use std::time::Duration;

use async_trait::async_trait;
use searchsync_core::TransportError;

/// Content type of JSON update payloads.
pub const CONTENT_TYPE_JSON: &str = "application/json";

/// A successful (2xx) response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawResponse {
    /// HTTP status
    pub status: u16,
    /// Response body
    pub body: Vec<u8>,
}

impl RawResponse {
    /// Creates a response.
    pub fn new(status: u16, body: impl Into<Vec<u8>>) -> Self {
        Self {
            status,
            body: body.into(),
        }
    }

    /// The body as lossy UTF-8.
    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }

    /// Parses the body as JSON.
    pub fn json(&self) -> Result<serde_json::Value, serde_json::Error> {
        serde_json::from_slice(&self.body)
    }
}

/// Sends raw requests to the search engine.
///
/// Every engine operation routes through these two primitives, so a test
/// double only has to implement them. Implementations must honour the
/// timeout and report non-2xx responses as [`TransportError`]s.
#[async_trait]
pub trait SearchTransport: Send + Sync {
    /// POSTs `body` to `url`.
    async fn send_raw_post(
        &self,
        url: &str,
        body: Vec<u8>,
        timeout: Duration,
        content_type: &str,
    ) -> Result<RawResponse, TransportError>;

    /// GETs `url`.
    async fn send_raw_get(&self, url: &str, timeout: Duration)
    -> Result<RawResponse, TransportError>;
}
