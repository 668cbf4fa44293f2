//! Spool Layer
//!
//! The bucketed file store shared by the producer and the distributor. The two
//! sides never talk to each other directly: the directory is the only channel.
//!
//! # Layout
//!
//! ```text
//! <spool>/
//!   29043718.data        distributable (no marker)
//!   29043719.data        being written...
//!   29043719.data.lock   ...because this marker exists
//! ```
//!
//! # Components
//!
//! - [`BucketKey`]: Minute-since-epoch key and the file names derived from it
//! - [`Spool`]: Stateless view of the directory (listing, markers, reclamation)
//! - [`BucketWriter`]: The producer's handle on the currently open bucket
//! - [`SpoolError`]: Errors raised by spool operations

mod bucket;
mod error;
mod store;
mod writer;

pub use bucket::{BucketKey, DATA_EXTENSION, LOCK_EXTENSION};
pub use error::SpoolError;
pub use store::{BucketState, Spool};
pub use writer::BucketWriter;
