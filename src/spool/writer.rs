//! Producer-side handle on the currently open bucket.

use std::fs::{File, OpenOptions};
use std::io::Write;

use crate::spool::{BucketKey, Spool, SpoolError};

/// An open data file and the bucket it belongs to.
#[derive(Debug)]
struct OpenBucket {
    key: BucketKey,
    file: File,
}

/// Writes records into the data file of the current bucket.
///
/// Opening a bucket claims it with a lock marker first; closing releases the
/// marker after the file handle is gone. The writer is the only party that
/// creates markers, and it holds at most one bucket open at a time.
#[derive(Debug)]
pub struct BucketWriter {
    spool: Spool,
    current: Option<OpenBucket>,
}

impl BucketWriter {
    /// Create a writer over `spool`.
    ///
    /// Lock markers left behind by a previous process for buckets older than
    /// the current minute are reclaimed here.
    pub fn new(spool: Spool) -> Self {
        match spool.reclaim_stale_locks(BucketKey::now()) {
            Ok(0) => {}
            Ok(removed) => tracing::info!(removed, "Reclaimed stale lock files at startup"),
            Err(e) => tracing::warn!(error = %e, "Failed to reclaim stale lock files at startup"),
        }

        Self {
            spool,
            current: None,
        }
    }

    /// Bucket currently open for writing, if any.
    pub fn current_bucket(&self) -> Option<BucketKey> {
        self.current.as_ref().map(|open| open.key)
    }

    /// Make `key` the open bucket. Returns whether it is writable.
    ///
    /// Re-entering the already open bucket is a no-op. Switching buckets
    /// closes the previous one and reclaims stale markers before claiming the
    /// new bucket.
    pub fn open_for_bucket(&mut self, key: BucketKey) -> bool {
        if self.current_bucket() == Some(key) {
            return true;
        }

        self.close_current();

        if let Err(e) = self.spool.reclaim_stale_locks(key) {
            tracing::warn!(bucket = %key, error = %e, "Failed to reclaim stale lock files");
        }

        if let Err(e) = self.spool.create_lock(key) {
            tracing::error!(bucket = %key, error = %e, "Failed to create lock file");
            return false;
        }

        let path = self.spool.data_path(key);
        match OpenOptions::new().create(true).append(true).open(&path) {
            Ok(file) => {
                tracing::info!(path = %path.display(), "New file opened for writing");
                self.current = Some(OpenBucket { key, file });
                true
            }
            Err(e) => {
                tracing::error!(path = %path.display(), error = %e, "Failed to open file");
                if let Err(e) = self.spool.remove_lock(key) {
                    tracing::error!(bucket = %key, error = %e, "Failed to release lock file");
                }
                false
            }
        }
    }

    /// Append raw bytes to the open bucket.
    ///
    /// # Errors
    /// Returns `SpoolError::NoOpenBucket` if nothing is open, or
    /// `SpoolError::Io` if the write fails.
    pub fn append(&mut self, bytes: &[u8]) -> Result<(), SpoolError> {
        debug_assert!(self.current.is_some(), "append called without an open bucket");
        let Some(open) = self.current.as_mut() else {
            return Err(SpoolError::NoOpenBucket);
        };

        open.file
            .write_all(bytes)
            .map_err(|e| SpoolError::io(self.spool.data_path(open.key), e))?;

        tracing::debug!(bucket = %open.key, bytes = bytes.len(), "Data has been written to file");
        Ok(())
    }

    /// Close the open bucket and release its lock marker. No-op when idle.
    pub fn close_current(&mut self) {
        let Some(OpenBucket { key, mut file }) = self.current.take() else {
            return;
        };

        tracing::debug!(path = %self.spool.data_path(key).display(), "Closing file");
        if let Err(e) = file.flush() {
            tracing::error!(bucket = %key, error = %e, "Failed to flush file");
        }
        drop(file);

        if let Err(e) = self.spool.remove_lock(key) {
            tracing::error!(bucket = %key, error = %e, "Failed to remove lock file");
        }
    }
}

impl Drop for BucketWriter {
    fn drop(&mut self) {
        self.close_current();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::spool::BucketState;
    use std::fs;
    use tempfile::tempdir;

    fn lock_count(spool: &Spool) -> usize {
        fs::read_dir(spool.dir())
            .unwrap()
            .filter(|e| {
                e.as_ref()
                    .unwrap()
                    .file_name()
                    .to_string_lossy()
                    .ends_with(".lock")
            })
            .count()
    }

    #[test]
    fn test_open_claims_bucket() {
        let dir = tempdir().unwrap();
        let spool = Spool::open(dir.path()).unwrap();
        let mut writer = BucketWriter::new(spool.clone());
        let key = BucketKey::new(1000);

        assert!(writer.open_for_bucket(key));
        assert_eq!(writer.current_bucket(), Some(key));
        assert!(spool.data_path(key).is_file());
        assert_eq!(spool.bucket_state(key), BucketState::Locked);
    }

    #[test]
    fn test_open_same_bucket_is_idempotent() {
        let dir = tempdir().unwrap();
        let spool = Spool::open(dir.path()).unwrap();
        let mut writer = BucketWriter::new(spool.clone());
        let key = BucketKey::new(1000);

        assert!(writer.open_for_bucket(key));
        writer.append(b"1 1\n").unwrap();
        assert!(writer.open_for_bucket(key));
        writer.append(b"2 2\n").unwrap();

        assert_eq!(lock_count(&spool), 1);
        assert_eq!(fs::read_to_string(spool.data_path(key)).unwrap(), "1 1\n2 2\n");
    }

    #[test]
    fn test_rotation_releases_previous_bucket() {
        let dir = tempdir().unwrap();
        let spool = Spool::open(dir.path()).unwrap();
        let mut writer = BucketWriter::new(spool.clone());
        let old = BucketKey::new(1000);
        let new = BucketKey::new(1001);

        assert!(writer.open_for_bucket(old));
        writer.append(b"3 100\n").unwrap();
        assert!(writer.open_for_bucket(new));

        assert_eq!(spool.bucket_state(old), BucketState::Distributable);
        assert_eq!(spool.bucket_state(new), BucketState::Locked);
        assert_eq!(spool.list_distributable().unwrap(), vec![spool.data_path(old)]);
    }

    #[test]
    fn test_rotation_reclaims_orphaned_markers() {
        let dir = tempdir().unwrap();
        let spool = Spool::open(dir.path()).unwrap();
        let mut writer = BucketWriter::new(spool.clone());

        // Marker left behind by a crashed process, created after startup.
        spool.create_lock(BucketKey::new(990)).unwrap();

        assert!(writer.open_for_bucket(BucketKey::new(1000)));
        assert!(!spool.lock_path(BucketKey::new(990)).exists());
        assert_eq!(lock_count(&spool), 1);
    }

    #[test]
    fn test_startup_reclaims_stale_markers() {
        let dir = tempdir().unwrap();
        let spool = Spool::open(dir.path()).unwrap();
        let stale = BucketKey::new(1000);
        let future = BucketKey::new(BucketKey::now().minutes() + 10);

        fs::write(spool.data_path(stale), "5 1\n").unwrap();
        spool.create_lock(stale).unwrap();
        spool.create_lock(future).unwrap();

        let _writer = BucketWriter::new(spool.clone());

        assert_eq!(spool.bucket_state(stale), BucketState::Distributable);
        assert!(spool.lock_path(future).exists());
    }

    #[test]
    fn test_append_appends_to_existing_file() {
        let dir = tempdir().unwrap();
        let spool = Spool::open(dir.path()).unwrap();
        let key = BucketKey::new(1000);
        fs::write(spool.data_path(key), "7 1\n").unwrap();

        let mut writer = BucketWriter::new(spool.clone());
        assert!(writer.open_for_bucket(key));
        writer.append(b"8 2\n").unwrap();
        writer.close_current();

        assert_eq!(fs::read_to_string(spool.data_path(key)).unwrap(), "7 1\n8 2\n");
    }

    #[test]
    #[cfg(not(debug_assertions))]
    fn test_append_without_open_bucket() {
        let dir = tempdir().unwrap();
        let mut writer = BucketWriter::new(Spool::open(dir.path()).unwrap());
        assert!(matches!(writer.append(b"x"), Err(SpoolError::NoOpenBucket)));
    }

    #[test]
    #[cfg(debug_assertions)]
    #[should_panic(expected = "without an open bucket")]
    fn test_append_without_open_bucket() {
        let dir = tempdir().unwrap();
        let mut writer = BucketWriter::new(Spool::open(dir.path()).unwrap());
        let _ = writer.append(b"x");
    }

    #[test]
    fn test_close_is_noop_when_idle() {
        let dir = tempdir().unwrap();
        let spool = Spool::open(dir.path()).unwrap();
        let mut writer = BucketWriter::new(spool.clone());

        writer.close_current();
        assert_eq!(writer.current_bucket(), None);
        assert_eq!(lock_count(&spool), 0);
    }

    #[test]
    fn test_drop_releases_lock() {
        let dir = tempdir().unwrap();
        let spool = Spool::open(dir.path()).unwrap();
        let key = BucketKey::new(1000);

        {
            let mut writer = BucketWriter::new(spool.clone());
            assert!(writer.open_for_bucket(key));
        }

        assert_eq!(spool.bucket_state(key), BucketState::Distributable);
    }

    #[test]
    fn test_failed_open_releases_lock() {
        let dir = tempdir().unwrap();
        let spool = Spool::open(dir.path()).unwrap();
        let key = BucketKey::new(1000);

        // A directory squatting on the data file name makes the open fail.
        fs::create_dir(spool.data_path(key)).unwrap();

        let mut writer = BucketWriter::new(spool.clone());
        assert!(!writer.open_for_bucket(key));
        assert_eq!(writer.current_bucket(), None);
        assert!(!spool.lock_path(key).exists());
    }
}
