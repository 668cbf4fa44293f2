//! Bucket keys and the file names derived from them.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};

/// Extension of data files (`<key>.data`).
pub const DATA_EXTENSION: &str = "data";

/// Extension layered on top of a data file name to form its lock marker
/// (`<key>.data.lock`).
pub const LOCK_EXTENSION: &str = "lock";

/// Width of one bucket in seconds.
const SECONDS_PER_BUCKET: i64 = 60;

/// Whole minutes since the UNIX epoch.
///
/// Keys are monotonic in wall-clock time, which is what makes stale lock
/// reclamation safe: a marker older than the current key cannot belong to a
/// bucket that is still being written.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct BucketKey(i64);

impl BucketKey {
    /// Create a key from a raw minute count.
    pub const fn new(minutes: i64) -> Self {
        Self(minutes)
    }

    /// Bucket containing the given instant.
    pub fn from_datetime(ts: DateTime<Utc>) -> Self {
        Self(ts.timestamp().div_euclid(SECONDS_PER_BUCKET))
    }

    /// Bucket containing the current wall-clock time.
    pub fn now() -> Self {
        Self::from_datetime(Utc::now())
    }

    /// Raw minute count.
    pub const fn minutes(self) -> i64 {
        self.0
    }

    /// File name of this bucket's data file.
    pub fn data_file_name(self) -> String {
        format!("{}.{DATA_EXTENSION}", self.0)
    }

    /// File name of this bucket's lock marker.
    pub fn lock_file_name(self) -> String {
        format!("{}.{DATA_EXTENSION}.{LOCK_EXTENSION}", self.0)
    }

    /// Recover a key from a data file name such as `1000.data`.
    pub fn from_data_file_name(name: &str) -> Option<Self> {
        let stem = name.strip_suffix(DATA_EXTENSION)?.strip_suffix('.')?;
        stem.parse().ok()
    }

    /// Recover a key from a lock marker name such as `1000.data.lock`.
    pub fn from_lock_file_name(name: &str) -> Option<Self> {
        let data_name = name.strip_suffix(LOCK_EXTENSION)?.strip_suffix('.')?;
        Self::from_data_file_name(data_name)
    }
}

impl fmt::Display for BucketKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for BucketKey {
    type Err = std::num::ParseIntError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.parse().map(Self)
    }
}
