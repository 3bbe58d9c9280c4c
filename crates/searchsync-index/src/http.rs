//! `reqwest`-backed transport.

use std::time::Duration;

use async_trait::async_trait;
use searchsync_core::{TransportError, TransportErrorKind};

use crate::transport::{RawResponse, SearchTransport};

/// Talks HTTP to the engine with a shared `reqwest::Client`.
#[derive(Debug, Clone, Default)]
pub struct HttpTransport {
    client: reqwest::Client,
}

impl HttpTransport {
    /// Creates a transport with a default client.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a transport reusing an existing client.
    pub fn with_client(client: reqwest::Client) -> Self {
        Self { client }
    }

    async fn finish(
        url: &str,
        result: Result<reqwest::Response, reqwest::Error>,
    ) -> Result<RawResponse, TransportError> {
        let response = result.map_err(|e| map_reqwest_error(url, e))?;
        let status = response.status();
        let body = response
            .bytes()
            .await
            .map_err(|e| map_reqwest_error(url, e))?;

        if !status.is_success() {
            let snippet: String = String::from_utf8_lossy(&body).chars().take(512).collect();
            log::warn!("{url} answered HTTP {}", status.as_u16());
            return Err(TransportError::status(status.as_u16(), url, snippet));
        }
        Ok(RawResponse::new(status.as_u16(), body.to_vec()))
    }
}

fn map_reqwest_error(url: &str, err: reqwest::Error) -> TransportError {
    let kind = if err.is_timeout() {
        TransportErrorKind::Timeout
    } else if err.is_connect() {
        TransportErrorKind::Connect
    } else if let Some(status) = err.status() {
        TransportErrorKind::Status(status.as_u16())
    } else {
        TransportErrorKind::Request
    };
    log::debug!("request to {url} failed ({kind}): {err}");
    TransportError::new(kind, url, err.to_string())
}

#[async_trait]
impl SearchTransport for HttpTransport {
    async fn send_raw_post(
        &self,
        url: &str,
        body: Vec<u8>,
        timeout: Duration,
        content_type: &str,
    ) -> Result<RawResponse, TransportError> {
        log::debug!("POST {url} ({} bytes)", body.len());
        let result = self
            .client
            .post(url)
            .timeout(timeout)
            .header(reqwest::header::CONTENT_TYPE, content_type)
            .body(body)
            .send()
            .await;
        Self::finish(url, result).await
    }

    async fn send_raw_get(
        &self,
        url: &str,
        timeout: Duration,
    ) -> Result<RawResponse, TransportError> {
        log::debug!("GET {url}");
        let result = self.client.get(url).timeout(timeout).send().await;
        Self::finish(url, result).await
    }
}
