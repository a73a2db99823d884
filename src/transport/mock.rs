//! Scripted transport for tests and dry runs

use super::{Method, Result, Transport, TransportError, TransportRequest, TransportResponse};
use async_trait::async_trait;
use std::sync::Mutex;

#[derive(Debug, Clone)]
enum Reply {
    Response(TransportResponse),
    Fail(String),
}

#[derive(Debug, Clone)]
struct Route {
    method: Method,
    path: String,
    body_contains: Option<String>,
    reply: Reply,
}

impl Route {
    fn matches(&self, request: &TransportRequest) -> bool {
        if self.method != request.method || self.path != request.path {
            return false;
        }
        match (&self.body_contains, &request.body) {
            (None, _) => true,
            (Some(needle), Some(body)) => String::from_utf8_lossy(body).contains(needle.as_str()),
            (Some(_), None) => false,
        }
    }
}

/// Answers requests from a fixed route table and records every call.
///
/// Routes are matched in registration order; unmatched requests get a 404.
#[derive(Debug, Default)]
pub struct MockTransport {
    routes: Vec<Route>,
    calls: Mutex<Vec<TransportRequest>>,
}

impl MockTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn on(mut self, method: Method, path: &str, status: u16, body: &str) -> Self {
        self.routes.push(Route {
            method,
            path: path.to_string(),
            body_contains: None,
            reply: Reply::Response(TransportResponse::new(status, body.to_string())),
        });
        self
    }

    /// Like [`MockTransport::on`], but only for requests whose body contains `needle`
    pub fn on_body(
        mut self,
        method: Method,
        path: &str,
        needle: &str,
        status: u16,
        body: &str,
    ) -> Self {
        self.routes.push(Route {
            method,
            path: path.to_string(),
            body_contains: Some(needle.to_string()),
            reply: Reply::Response(TransportResponse::new(status, body.to_string())),
        });
        self
    }

    /// Fail matching requests at the transport layer
    pub fn fail_on(mut self, method: Method, path: &str, needle: Option<&str>, error: &str) -> Self {
        self.routes.push(Route {
            method,
            path: path.to_string(),
            body_contains: needle.map(str::to_string),
            reply: Reply::Fail(error.to_string()),
        });
        self
    }

    /// Requests received so far, in arrival order
    pub fn calls(&self) -> Vec<TransportRequest> {
        self.calls
            .lock()
            .map(|calls| calls.clone())
            .unwrap_or_default()
    }

    pub fn call_count(&self, method: Method, path: &str) -> usize {
        self.calls()
            .iter()
            .filter(|c| c.method == method && c.path == path)
            .count()
    }
}

#[async_trait]
impl Transport for MockTransport {
    async fn execute(&self, request: TransportRequest) -> Result<TransportResponse> {
        tracing::debug!(method = %request.method, path = %request.path, "Mock execute");

        let reply = self
            .routes
            .iter()
            .find(|route| route.matches(&request))
            .map(|route| route.reply.clone());

        if let Ok(mut calls) = self.calls.lock() {
            calls.push(request);
        }

        match reply {
            Some(Reply::Response(response)) => Ok(response),
            Some(Reply::Fail(message)) => Err(TransportError::RequestFailed(message)),
            None => Ok(TransportResponse::new(404, "{\"message\":\"no route\"}")),
        }
    }
}
