//! HTTP transmitter.
//!
//! One `POST` per payload with `Content-Type: text/plain`. Idle connections
//! are never pooled, so each delivery opens a fresh connection.

use std::time::Duration;

use reqwest::header::CONTENT_TYPE;
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};

use crate::transmitter::{Transmit, TransmitError};

/// Default collector host.
pub const DEFAULT_HOST: &str = "127.0.0.1";

/// Default collector port.
pub const DEFAULT_PORT: u16 = 8080;

/// Default request target.
pub const DEFAULT_PATH: &str = "/";

fn default_host() -> String {
    DEFAULT_HOST.to_string()
}

fn default_port() -> u16 {
    DEFAULT_PORT
}

fn default_path() -> String {
    DEFAULT_PATH.to_string()
}

/// Where and how payloads are delivered.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransmitterConfig {
    /// Collector host name or IP address.
    #[serde(default = "default_host")]
    pub host: String,
    /// Collector port.
    #[serde(default = "default_port")]
    pub port: u16,
    /// Request target (default: "/").
    #[serde(default = "default_path")]
    pub path: String,
    /// Upper bound on one whole exchange. Unbounded when unset.
    #[serde(default, with = "humantime_serde")]
    pub timeout: Option<Duration>,
}

impl Default for TransmitterConfig {
    fn default() -> Self {
        Self::new(DEFAULT_HOST, DEFAULT_PORT)
    }
}

impl TransmitterConfig {
    /// Create a configuration targeting `host:port` at the default path.
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
            path: default_path(),
            timeout: None,
        }
    }

    /// Set the request target.
    pub fn with_path(mut self, path: impl Into<String>) -> Self {
        self.path = path.into();
        self
    }

    /// Set the request timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Full request URL. IPv6 literals are bracketed.
    pub fn url(&self) -> String {
        let host = if self.host.contains(':') && !self.host.starts_with('[') {
            format!("[{}]", self.host)
        } else {
            self.host.clone()
        };
        format!("http://{}:{}{}", host, self.port, self.path)
    }
}

/// Delivers payloads over HTTP/1.1.
pub struct HttpTransmitter {
    client: Client,
    url: String,
}

impl HttpTransmitter {
    /// Build a transmitter for `config`.
    ///
    /// # Errors
    /// Returns `TransmitError::Client` if the HTTP client cannot be built.
    pub fn new(config: &TransmitterConfig) -> Result<Self, TransmitError> {
        let mut builder = Client::builder()
            .http1_only()
            .pool_max_idle_per_host(0)
            .user_agent(concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION")));
        if let Some(timeout) = config.timeout {
            builder = builder.timeout(timeout);
        }
        let client = builder.build().map_err(TransmitError::Client)?;

        Ok(Self {
            client,
            url: config.url(),
        })
    }

    async fn send(&self, payload: Vec<u8>) -> Result<usize, TransmitError> {
        let len = payload.len();
        let response = self
            .client
            .post(&self.url)
            .header(CONTENT_TYPE, "text/plain")
            .body(payload)
            .send()
            .await
            .map_err(TransmitError::from_send)?;

        let status = response.status();
        // Drain the body before the connection is dropped.
        response.bytes().await.map_err(TransmitError::from_send)?;

        if status != StatusCode::OK {
            return Err(TransmitError::Status(status.as_u16()));
        }
        Ok(len)
    }
}

impl std::fmt::Debug for HttpTransmitter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpTransmitter")
            .field("url", &self.url)
            .finish_non_exhaustive()
    }
}

#[async_trait::async_trait]
impl Transmit for HttpTransmitter {
    async fn transmit(&self, payload: Vec<u8>) -> bool {
        match self.send(payload).await {
            Ok(bytes) => {
                tracing::debug!(url = %self.url, bytes, "Payload delivered");
                true
            }
            Err(e) => {
                tracing::warn!(url = %self.url, error = %e, "Payload delivery failed");
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::Router;
    use axum::body::Bytes;
    use axum::http::{HeaderMap, Method, StatusCode as AxumStatus};
    use axum::routing::any;
    use std::sync::{Arc, Mutex};
    use tokio::net::TcpListener;

    #[derive(Debug, Clone)]
    struct Seen {
        method: Method,
        content_type: Option<String>,
        body: Vec<u8>,
    }

    async fn start(status: AxumStatus, delay: Duration) -> (u16, Arc<Mutex<Vec<Seen>>>) {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        let app = Router::new().route(
            "/",
            any(move |method: Method, headers: HeaderMap, body: Bytes| {
                let sink = Arc::clone(&sink);
                async move {
                    sink.lock().unwrap().push(Seen {
                        method,
                        content_type: headers
                            .get("content-type")
                            .and_then(|v| v.to_str().ok())
                            .map(str::to_string),
                        body: body.to_vec(),
                    });
                    tokio::time::sleep(delay).await;
                    (status, "ok")
                }
            }),
        );

        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        (port, seen)
    }

    #[test]
    fn test_url() {
        assert_eq!(TransmitterConfig::default().url(), "http://127.0.0.1:8080/");
        assert_eq!(
            TransmitterConfig::new("collector.local", 9000)
                .with_path("/ingest")
                .url(),
            "http://collector.local:9000/ingest"
        );
        assert_eq!(TransmitterConfig::new("::1", 80).url(), "http://[::1]:80/");
    }

    #[tokio::test]
    async fn test_transmit_posts_plain_text() {
        let (port, seen) = start(AxumStatus::OK, Duration::ZERO).await;
        let transmitter = HttpTransmitter::new(&TransmitterConfig::new("127.0.0.1", port)).unwrap();

        assert!(transmitter.transmit(b"4 100\n7 200\n".to_vec()).await);

        let seen = seen.lock().unwrap();
        assert_eq!(seen.len(), 1);
        assert_eq!(seen[0].method, Method::POST);
        assert_eq!(seen[0].content_type.as_deref(), Some("text/plain"));
        assert_eq!(seen[0].body, b"4 100\n7 200\n");
    }

    #[tokio::test]
    async fn test_non_200_is_failure() {
        for status in [AxumStatus::CREATED, AxumStatus::INTERNAL_SERVER_ERROR] {
            let (port, seen) = start(status, Duration::ZERO).await;
            let transmitter =
                HttpTransmitter::new(&TransmitterConfig::new("127.0.0.1", port)).unwrap();

            assert!(!transmitter.transmit(b"1 1\n".to_vec()).await);
            assert_eq!(seen.lock().unwrap().len(), 1);
        }
    }

    #[tokio::test]
    async fn test_connection_refused_is_failure() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        drop(listener);

        let transmitter = HttpTransmitter::new(&TransmitterConfig::new("127.0.0.1", port)).unwrap();
        assert!(!transmitter.transmit(b"1 1\n".to_vec()).await);
    }

    #[tokio::test]
    async fn test_timeout_is_failure() {
        let (port, _seen) = start(AxumStatus::OK, Duration::from_secs(2)).await;
        let config =
            TransmitterConfig::new("127.0.0.1", port).with_timeout(Duration::from_millis(100));
        let transmitter = HttpTransmitter::new(&config).unwrap();

        assert!(!transmitter.transmit(b"1 1\n".to_vec()).await);
    }

    #[tokio::test]
    async fn test_each_call_is_independent() {
        let (port, seen) = start(AxumStatus::OK, Duration::ZERO).await;
        let transmitter = HttpTransmitter::new(&TransmitterConfig::new("127.0.0.1", port)).unwrap();

        assert!(transmitter.transmit(b"a".to_vec()).await);
        assert!(transmitter.transmit(b"b".to_vec()).await);
        assert_eq!(seen.lock().unwrap().len(), 2);
    }

    #[test]
    fn test_config_from_yaml() {
        let config: TransmitterConfig =
            serde_yaml::from_str("host: collector\nport: 9000\ntimeout: 5s\n").unwrap();
        assert_eq!(config.host, "collector");
        assert_eq!(config.port, 9000);
        assert_eq!(config.path, "/");
        assert_eq!(config.timeout, Some(Duration::from_secs(5)));
    }
}
