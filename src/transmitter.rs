//! Transmission Layer
//!
//! Delivers the contents of one data file to the remote collector. The
//! distributor only needs to know whether a delivery succeeded, so every
//! network failure is classified, logged, and folded into `false` here.
//!
//! # Components
//!
//! - [`Transmit`]: Async boundary used by the distributor
//! - [`HttpTransmitter`]: HTTP/1.1 POST client built on `reqwest`
//! - [`TransmitterConfig`]: Target address and request options
//! - [`TransmitError`]: Failure classification for log lines

mod http;
mod traits;

pub use http::{DEFAULT_HOST, DEFAULT_PATH, DEFAULT_PORT, HttpTransmitter, TransmitterConfig};
pub use traits::{Transmit, TransmitError};
