//! HTTP request execution behind a narrow trait
//!
//! Everything above this module talks to the management API through
//! [`Transport::execute`]. TLS mode, credentials and retry count belong to the
//! concrete transport, not to the callers.

mod http;
pub mod mock;

pub use http::{HttpConfig, HttpTransport};
pub use mock::MockTransport;

use async_trait::async_trait;
use bytes::Bytes;
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum TransportError {
    /// The connection was never established, so nothing reached the server
    #[error("Connection failed: {0}")]
    Connect(String),

    #[error("HTTP request failed: {0}")]
    RequestFailed(String),

    #[error("Connection timeout")]
    Timeout,

    #[error("Invalid URL: {0}")]
    InvalidUrl(String),

    #[error("TLS setup failed: {0}")]
    Tls(String),

    #[error("server rejected request with HTTP {status}: {body}")]
    Rejected { status: u16, body: String },
}

impl TransportError {
    /// Only failures before the request was sent may be retried; anything
    /// later could repeat a non-idempotent call such as a clone.
    pub fn is_retryable(&self) -> bool {
        matches!(self, TransportError::Connect(_))
    }
}

pub type Result<T> = std::result::Result<T, TransportError>;

/// HTTP method, serialized the way batch payloads spell it (`"POST"`)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Method {
    Get,
    Post,
    Put,
    Patch,
    Delete,
}

impl Method {
    pub fn as_str(&self) -> &'static str {
        match self {
            Method::Get => "GET",
            Method::Post => "POST",
            Method::Put => "PUT",
            Method::Patch => "PATCH",
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
            Method::Put => reqwest::Method::PUT,
            Method::Patch => reqwest::Method::PATCH,
            Method::Delete => reqwest::Method::DELETE,
        }
    }
}

/// Basic credentials injected by the transport
#[derive(Clone)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

// Keep the password out of logs.
impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("password", &"***")
            .finish()
    }
}

/// A single request addressed relative to the transport's base URL
#[derive(Debug, Clone)]
pub struct TransportRequest {
    pub method: Method,
    pub path: String,
    pub body: Option<Bytes>,
    pub content_type: &'static str,
}

impl TransportRequest {
    pub const JSON: &'static str = "application/json";

    pub fn get(path: impl Into<String>) -> Self {
        Self {
            method: Method::Get,
            path: path.into(),
            body: None,
            content_type: Self::JSON,
        }
    }

    pub fn post_json(path: impl Into<String>, body: Vec<u8>) -> Self {
        Self {
            method: Method::Post,
            path: path.into(),
            body: Some(Bytes::from(body)),
            content_type: Self::JSON,
        }
    }
}

/// Raw outcome of a call that reached the server, whatever its status
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransportResponse {
    pub status: u16,
    pub body: Bytes,
}

impl TransportResponse {
    pub fn new(status: u16, body: impl Into<Bytes>) -> Self {
        Self {
            status,
            body: body.into(),
        }
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// Body as text, lossy on invalid UTF-8
    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }
}

#[async_trait]
pub trait Transport: Send + Sync {
    /// Execute one request. 4xx/5xx come back as `Ok`; only failures to reach
    /// the server (network, TLS, timeouts) are errors.
    async fn execute(&self, request: TransportRequest) -> Result<TransportResponse>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_method_serializes_uppercase() {
        assert_eq!(serde_json::to_string(&Method::Post).unwrap(), "\"POST\"");
        let parsed: Method = serde_json::from_str("\"DELETE\"").unwrap();
        assert_eq!(parsed, Method::Delete);
        let parsed: Method = serde_json::from_str("\"PATCH\"").unwrap();
        assert_eq!(parsed, Method::Patch);
        assert_eq!(reqwest::Method::from(Method::Patch), reqwest::Method::PATCH);
    }

    #[test]
    fn test_only_connect_failures_are_retryable() {
        assert!(TransportError::Connect("refused".to_string()).is_retryable());
        assert!(!TransportError::Timeout.is_retryable());
        assert!(!TransportError::RequestFailed("reset".to_string()).is_retryable());
        assert!(
            !TransportError::Rejected {
                status: 503,
                body: String::new()
            }
            .is_retryable()
        );
    }

    #[test]
    fn test_credentials_debug_hides_password() {
        let creds = Credentials {
            username: "admin".to_string(),
            password: "hunter2".to_string(),
        };
        let rendered = format!("{:?}", creds);
        assert!(rendered.contains("admin"));
        assert!(!rendered.contains("hunter2"));
    }

    #[test]
    fn test_response_success_range() {
        assert!(TransportResponse::new(201, "").is_success());
        assert!(!TransportResponse::new(401, "").is_success());
        assert_eq!(TransportResponse::new(500, "boom").text(), "boom");
    }
}
