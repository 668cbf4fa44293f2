//! Transmitter trait and error classification.

use thiserror::Error;

/// Why a delivery failed.
///
/// Never crosses the [`Transmit`] boundary; it only shapes the log line.
#[derive(Debug, Error)]
pub enum TransmitError {
    /// The HTTP client could not be constructed.
    #[error("failed to build HTTP client: {0}")]
    Client(#[source] reqwest::Error),

    /// Connecting to the collector failed.
    #[error("connection failed: {0}")]
    Connect(#[source] reqwest::Error),

    /// The exchange exceeded the configured request timeout.
    #[error("request timed out: {0}")]
    Timeout(#[source] reqwest::Error),

    /// Writing the request or reading the response failed.
    #[error("request failed: {0}")]
    Request(#[source] reqwest::Error),

    /// The collector answered with something other than `200 OK`.
    #[error("unexpected response status {0}")]
    Status(u16),
}

impl TransmitError {
    /// Classify a `reqwest` error raised while sending.
    pub(crate) fn from_send(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            Self::Timeout(e)
        } else if e.is_connect() {
            Self::Connect(e)
        } else {
            Self::Request(e)
        }
    }
}

/// Sends one payload to the collector.
#[async_trait::async_trait]
pub trait Transmit: Send + Sync + 'static {
    /// Deliver `payload` and report whether the collector accepted it.
    ///
    /// Network failures never escape as errors; each one is `false`.
    async fn transmit(&self, payload: Vec<u8>) -> bool;
}

#[async_trait::async_trait]
impl<T: Transmit + ?Sized> Transmit for std::sync::Arc<T> {
    async fn transmit(&self, payload: Vec<u8>) -> bool {
        (**self).transmit(payload).await
    }
}
