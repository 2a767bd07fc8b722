//! HTTP transport abstraction
//!
//! The `HttpTransport` trait separates Graph API calls from the HTTP stack so
//! the dispatcher and batch runner can be exercised without network access.

use async_trait::async_trait;
use parking_lot::Mutex;
use reqwest::Client;
use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

/// HTTP method used by Graph calls
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    Get,
    Post,
    Delete,
}

impl std::fmt::Display for Method {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Method::Get => write!(f, "GET"),
            Method::Post => write!(f, "POST"),
            Method::Delete => write!(f, "DELETE"),
        }
    }
}

/// A single request to the Graph API
#[derive(Debug, Clone, PartialEq)]
pub struct GraphRequest {
    pub method: Method,
    pub url: String,
    pub bearer_token: String,
    /// JSON body, sent with `Content-Type: application/json`
    pub body: Option<serde_json::Value>,
}

/// Raw response: status and unparsed body
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GraphResponse {
    pub status: u16,
    pub body: String,
}

impl GraphResponse {
    pub fn new(status: u16, body: impl Into<String>) -> Self {
        Self {
            status,
            body: body.into(),
        }
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// Network-level failures
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TransportError {
    #[error("Request timed out")]
    Timeout,

    #[error("Connection failed: {0}")]
    Connect(String),

    #[error("Request failed: {0}")]
    Request(String),
}

impl From<reqwest::Error> for TransportError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            TransportError::Timeout
        } else if e.is_connect() {
            TransportError::Connect(e.to_string())
        } else {
            TransportError::Request(e.to_string())
        }
    }
}

/// Executes Graph requests
#[async_trait]
pub trait HttpTransport: Send + Sync {
    async fn execute(&self, request: &GraphRequest) -> Result<GraphResponse, TransportError>;
}

// ============================================
// reqwest
// ============================================

/// Production transport backed by reqwest
#[derive(Clone)]
pub struct ReqwestTransport {
    client: Client,
}

impl ReqwestTransport {
    /// Create a transport whose requests time out after `timeout_ms`
    pub fn new(timeout_ms: u64) -> Result<Self, TransportError> {
        let client = Client::builder()
            .timeout(Duration::from_millis(timeout_ms))
            .user_agent(concat!("wacrm/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(Self { client })
    }
}

#[async_trait]
impl HttpTransport for ReqwestTransport {
    #[tracing::instrument(skip(self, request), fields(method = %request.method, url = %request.url))]
    async fn execute(&self, request: &GraphRequest) -> Result<GraphResponse, TransportError> {
        let mut builder = match request.method {
            Method::Get => self.client.get(&request.url),
            Method::Post => self.client.post(&request.url),
            Method::Delete => self.client.delete(&request.url),
        }
        .bearer_auth(&request.bearer_token);

        if let Some(body) = &request.body {
            builder = builder.json(body);
        }

        let response = builder.send().await.map_err(|e| {
            tracing::warn!(error = %e, "Graph request failed");
            TransportError::from(e)
        })?;

        let status = response.status().as_u16();
        let body = response.text().await?;

        tracing::debug!(status, response_len = body.len(), "Graph request completed");

        Ok(GraphResponse { status, body })
    }
}

// ============================================
// Mock
// ============================================

/// Scripted transport for tests
///
/// Responses are returned in the order they were queued, regardless of the
/// request. Every request is recorded.
#[derive(Clone, Default)]
pub struct MockTransport {
    responses: Arc<Mutex<VecDeque<Result<GraphResponse, TransportError>>>>,
    calls: Arc<Mutex<Vec<GraphRequest>>>,
}

impl MockTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a response
    pub fn push(&self, response: Result<GraphResponse, TransportError>) {
        self.responses.lock().push_back(response);
    }

    /// Queue a response with the given status and JSON body
    pub fn push_json(&self, status: u16, body: serde_json::Value) {
        self.push(Ok(GraphResponse::new(status, body.to_string())));
    }

    /// Queue a successful send with a generated message id
    pub fn push_accepted(&self) {
        let id = format!("wamid.{}", uuid::Uuid::new_v4().simple());
        self.push_json(
            200,
            serde_json::json!({
                "messaging_product": "whatsapp",
                "messages": [{"id": id}]
            }),
        );
    }

    /// Queue a Graph error payload
    pub fn push_error(&self, status: u16, message: &str) {
        self.push_json(
            status,
            serde_json::json!({"error": {"message": message, "code": 100}}),
        );
    }

    /// All recorded requests, in order
    pub fn calls(&self) -> Vec<GraphRequest> {
        self.calls.lock().clone()
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().len()
    }
}

#[async_trait]
impl HttpTransport for MockTransport {
    async fn execute(&self, request: &GraphRequest) -> Result<GraphResponse, TransportError> {
        self.calls.lock().push(request.clone());

        let next = self.responses.lock().pop_front();
        next.unwrap_or_else(|| {
            Err(TransportError::Request(format!(
                "No mock response configured for {} {}",
                request.method, request.url
            )))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request() -> GraphRequest {
        GraphRequest {
            method: Method::Post,
            url: "https://graph.example.com/v19.0/1/messages".to_string(),
            bearer_token: "token".to_string(),
            body: Some(serde_json::json!({})),
        }
    }

    #[tokio::test]
    async fn test_mock_returns_in_order() {
        let mock = MockTransport::new();
        mock.push(Ok(GraphResponse::new(200, "first")));
        mock.push(Ok(GraphResponse::new(500, "second")));

        let first = mock.execute(&request()).await.unwrap();
        let second = mock.execute(&request()).await.unwrap();

        assert_eq!(first.body, "first");
        assert!(first.is_success());
        assert_eq!(second.status, 500);
        assert!(!second.is_success());
        assert_eq!(mock.call_count(), 2);
    }

    #[tokio::test]
    async fn test_mock_without_response_errors() {
        let mock = MockTransport::new();
        let result = mock.execute(&request()).await;
        assert!(matches!(result, Err(TransportError::Request(_))));
        assert_eq!(mock.calls()[0].bearer_token, "token");
    }

    #[test]
    fn test_method_display() {
        assert_eq!(Method::Delete.to_string(), "DELETE");
    }
}
