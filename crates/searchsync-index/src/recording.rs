//! An in-memory transport that records every request.

use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use searchsync_core::TransportError;

use crate::failure::FailurePlan;
use crate::transport::{RawResponse, SearchTransport};

/// HTTP method of a recorded request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    /// GET
    Get,
    /// POST
    Post,
}

/// One captured request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordedRequest {
    /// Method
    pub method: Method,
    /// Full URL including query string
    pub url: String,
    /// Request body (empty for GET)
    pub body: Vec<u8>,
    /// Content type (POST only)
    pub content_type: Option<String>,
    /// Timeout the caller asked for
    pub timeout: Duration,
}

impl RecordedRequest {
    /// Body as lossy UTF-8.
    pub fn body_text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }

    /// Body parsed as JSON, `Null` when it is not JSON.
    pub fn body_json(&self) -> serde_json::Value {
        serde_json::from_slice(&self.body).unwrap_or(serde_json::Value::Null)
    }
}

/// Captures requests and answers `200` with the request body echoed back.
///
/// GET requests answer with a configurable body (`{}` by default).
/// Scripted failures answer `503` without reaching the echo.
#[derive(Debug)]
pub struct RecordingTransport {
    requests: Mutex<Vec<RecordedRequest>>,
    get_body: Mutex<Vec<u8>>,
    failures: FailurePlan<RecordedRequest>,
}

impl RecordingTransport {
    /// Creates an empty recorder.
    pub fn new() -> Self {
        Self {
            requests: Mutex::new(Vec::new()),
            get_body: Mutex::new(b"{}".to_vec()),
            failures: FailurePlan::new(),
        }
    }

    /// Sets the body returned to GET requests.
    pub fn set_get_body(&self, body: impl Into<Vec<u8>>) {
        *self.get_body.lock().unwrap_or_else(|e| e.into_inner()) = body.into();
    }

    /// Failure script applied to incoming requests.
    pub fn failures(&self) -> &FailurePlan<RecordedRequest> {
        &self.failures
    }

    /// Every request seen so far, failed ones included.
    pub fn requests(&self) -> Vec<RecordedRequest> {
        self.requests
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    /// Number of requests seen so far.
    pub fn request_count(&self) -> usize {
        self.requests.lock().unwrap_or_else(|e| e.into_inner()).len()
    }

    /// Forgets captured requests.
    pub fn clear(&self) {
        self.requests
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clear();
    }

    fn capture(&self, request: RecordedRequest) -> Result<(), TransportError> {
        let fail = self.failures.should_fail(&request);
        let url = request.url.clone();
        self.requests
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(request);
        if fail {
            return Err(TransportError::status(503, url, "injected failure"));
        }
        Ok(())
    }
}

impl Default for RecordingTransport {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl SearchTransport for RecordingTransport {
    async fn send_raw_post(
        &self,
        url: &str,
        body: Vec<u8>,
        timeout: Duration,
        content_type: &str,
    ) -> Result<RawResponse, TransportError> {
        self.capture(RecordedRequest {
            method: Method::Post,
            url: url.to_string(),
            body: body.clone(),
            content_type: Some(content_type.to_string()),
            timeout,
        })?;
        Ok(RawResponse::new(200, body))
    }

    async fn send_raw_get(
        &self,
        url: &str,
        timeout: Duration,
    ) -> Result<RawResponse, TransportError> {
        self.capture(RecordedRequest {
            method: Method::Get,
            url: url.to_string(),
            body: Vec::new(),
            content_type: None,
            timeout,
        })?;
        let body = self
            .get_body
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone();
        Ok(RawResponse::new(200, body))
    }
}
