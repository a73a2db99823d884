//! reqwest-backed transport for the Prism REST endpoints

use super::{Credentials, Result, Transport, TransportError, TransportRequest, TransportResponse};
use async_trait::async_trait;
use reqwest::Client;
use reqwest::header::{ACCEPT, CONTENT_TYPE};
use std::time::Duration;
use tracing::{debug, warn};

const MAX_BACKOFF: Duration = Duration::from_secs(30);

/// HTTP transport configuration
#[derive(Debug, Clone)]
pub struct HttpConfig {
    /// `scheme://host:port`, no trailing slash
    pub base_url: String,
    pub connect_timeout: Duration,
    pub request_timeout: Duration,
    pub max_retries: u32,
    pub retry_backoff: Duration,
    pub verify_tls: bool,
    pub user_agent: String,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            base_url: "https://127.0.0.1:9440".to_string(),
            connect_timeout: Duration::from_secs(10),
            request_timeout: Duration::from_secs(60),
            max_retries: 3,
            retry_backoff: Duration::from_millis(500),
            verify_tls: false,
            user_agent: concat!("prismctl/", env!("CARGO_PKG_VERSION")).to_string(),
        }
    }
}

pub struct HttpTransport {
    client: Client,
    config: HttpConfig,
    credentials: Option<Credentials>,
}

impl HttpTransport {
    pub fn new(config: HttpConfig, credentials: Option<Credentials>) -> Result<Self> {
        reqwest::Url::parse(&config.base_url)
            .map_err(|e| TransportError::InvalidUrl(format!("{}: {}", config.base_url, e)))?;

        if !config.verify_tls {
            warn!(base_url = %config.base_url, "TLS certificate verification disabled");
        }

        let client = Client::builder()
            .connect_timeout(config.connect_timeout)
            .timeout(config.request_timeout)
            .user_agent(&config.user_agent)
            .danger_accept_invalid_certs(!config.verify_tls)
            .build()
            .map_err(|e| TransportError::Tls(e.to_string()))?;

        Ok(Self {
            client,
            config,
            credentials,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.config.base_url
    }

    fn url_for(&self, path: &str) -> String {
        if path.starts_with('/') {
            format!("{}{}", self.config.base_url, path)
        } else {
            format!("{}/{}", self.config.base_url, path)
        }
    }

    /// Execute once (no retry)
    async fn execute_once(&self, request: &TransportRequest) -> Result<TransportResponse> {
        let url = self.url_for(&request.path);
        debug!(method = %request.method, url = %url, "Sending request");

        let mut builder = self
            .client
            .request(request.method.into(), &url)
            .header(ACCEPT, TransportRequest::JSON)
            .header(CONTENT_TYPE, request.content_type);

        if let Some(creds) = &self.credentials {
            builder = builder.basic_auth(&creds.username, Some(&creds.password));
        }

        if let Some(body) = &request.body {
            builder = builder.body(body.clone());
        }

        // A connect failure (including a connect timeout) means nothing was sent.
        let response = builder.send().await.map_err(|e| {
            if e.is_connect() {
                TransportError::Connect(e.to_string())
            } else if e.is_timeout() {
                TransportError::Timeout
            } else {
                TransportError::RequestFailed(e.to_string())
            }
        })?;

        let status = response.status().as_u16();
        let body = response.bytes().await.map_err(|e| {
            if e.is_timeout() {
                TransportError::Timeout
            } else {
                TransportError::RequestFailed(format!("Failed to read body: {}", e))
            }
        })?;

        debug!(url = %url, status, size = body.len(), "Response received");

        Ok(TransportResponse { status, body })
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn execute(&self, request: TransportRequest) -> Result<TransportResponse> {
        let mut attempts = 0;

        loop {
            attempts += 1;

            match self.execute_once(&request).await {
                Ok(response) => {
                    if attempts > 1 {
                        debug!(path = %request.path, attempts, "Request succeeded after retry");
                    }
                    return Ok(response);
                }
                Err(e) if !e.is_retryable() => {
                    warn!(path = %request.path, attempts, error = %e, "Request failed after reaching the server");
                    return Err(e);
                }
                Err(e) => {
                    if attempts >= self.config.max_retries {
                        warn!(path = %request.path, attempts, error = %e, "Request failed after retries");
                        return Err(e);
                    }

                    warn!(path = %request.path, attempts, error = %e, "Request failed, retrying");
                    tokio::time::sleep(backoff_for(self.config.retry_backoff, attempts)).await;
                }
            }
        }
    }
}

/// Exponential backoff after the `attempt`-th failure, capped at [`MAX_BACKOFF`]
fn backoff_for(base: Duration, attempt: u32) -> Duration {
    let factor = 2u32.saturating_pow(attempt.saturating_sub(1));
    base.saturating_mul(factor).min(MAX_BACKOFF)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_http_config_defaults() {
        let config = HttpConfig::default();
        assert_eq!(config.connect_timeout, Duration::from_secs(10));
        assert_eq!(config.request_timeout, Duration::from_secs(60));
        assert_eq!(config.max_retries, 3);
        assert!(!config.verify_tls);
        assert!(config.user_agent.starts_with("prismctl/"));
    }

    #[test]
    fn test_rejects_invalid_base_url() {
        let config = HttpConfig {
            base_url: "not a url".to_string(),
            ..HttpConfig::default()
        };
        assert!(matches!(
            HttpTransport::new(config, None),
            Err(TransportError::InvalidUrl(_))
        ));
    }

    #[test]
    fn test_url_join() {
        let transport = HttpTransport::new(
            HttpConfig {
                base_url: "https://10.0.0.1:9440".to_string(),
                ..HttpConfig::default()
            },
            None,
        )
        .unwrap();

        assert_eq!(
            transport.url_for("/api/nutanix/v3/batch"),
            "https://10.0.0.1:9440/api/nutanix/v3/batch"
        );
        assert_eq!(transport.url_for("vms"), "https://10.0.0.1:9440/vms");
    }

    #[tokio::test]
    async fn test_connection_refused_is_transport_error() {
        // Port 1 on loopback is not listening in any sane test environment.
        let transport = HttpTransport::new(
            HttpConfig {
                base_url: "http://127.0.0.1:1".to_string(),
                max_retries: 1,
                connect_timeout: Duration::from_secs(2),
                ..HttpConfig::default()
            },
            None,
        )
        .unwrap();

        let result = transport.execute(TransportRequest::get("/vms")).await;
        assert!(matches!(result, Err(TransportError::Connect(_))));
    }

    #[test]
    fn test_backoff_doubles_and_caps() {
        let base = Duration::from_millis(500);
        assert_eq!(backoff_for(base, 1), Duration::from_millis(500));
        assert_eq!(backoff_for(base, 2), Duration::from_secs(1));
        assert_eq!(backoff_for(base, 3), Duration::from_secs(2));
        assert_eq!(backoff_for(base, 40), MAX_BACKOFF);
        assert_eq!(backoff_for(base, u32::MAX), MAX_BACKOFF);
    }
}
