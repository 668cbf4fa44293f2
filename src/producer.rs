//! Producer loop.
//!
//! Samples a value on a jittered timer and appends it to the bucket for the
//! current wall-clock minute. Rotation to a new bucket releases the previous
//! one for distribution.

use std::time::Duration;

use chrono::{DateTime, Utc};
use rand::Rng;

use crate::scheduler::{Counter, PeriodicTask, Schedule, TaskError};
use crate::spool::{BucketKey, BucketWriter};

/// Default lower bound of the producer interval (500 milliseconds).
pub const DEFAULT_MIN_INTERVAL: Duration = Duration::from_millis(500);

/// Default upper bound of the producer interval (15 seconds).
pub const DEFAULT_MAX_INTERVAL: Duration = Duration::from_secs(15);

const NANOS_PER_SECOND: i128 = 1_000_000_000;

/// Source of sample values.
pub trait SampleSource: Send + 'static {
    /// Next value, in `0..=9`.
    fn next_value(&mut self) -> u8;
}

/// Uniformly random decimal digits.
#[derive(Debug, Clone, Copy, Default)]
pub struct RandomDigits;

impl SampleSource for RandomDigits {
    fn next_value(&mut self) -> u8 {
        rand::rng().random_range(0..=9)
    }
}

/// Format one record: `<value> <nanoseconds since epoch>\n`.
pub fn format_record(value: u8, ts: DateTime<Utc>) -> String {
    let nanos = i128::from(ts.timestamp()) * NANOS_PER_SECOND
        + i128::from(ts.timestamp_subsec_nanos());
    format!("{value} {nanos}\n")
}

/// Periodic writer of sample records.
pub struct Producer<S = RandomDigits> {
    writer: BucketWriter,
    schedule: Schedule,
    source: S,
    writes: Counter,
}

impl Producer<RandomDigits> {
    /// Create a producer writing random digits.
    pub fn new(writer: BucketWriter, schedule: Schedule) -> Self {
        Self {
            writer,
            schedule,
            source: RandomDigits,
            writes: Counter::new(),
        }
    }
}

impl<S: SampleSource> Producer<S> {
    /// Replace the sample source.
    pub fn with_source<T: SampleSource>(self, source: T) -> Producer<T> {
        Producer {
            writer: self.writer,
            schedule: self.schedule,
            source,
            writes: self.writes,
        }
    }

    /// Number of records successfully appended so far.
    pub fn write_count(&self) -> u64 {
        self.writes.get()
    }

    /// Handle on the write counter that stays readable while the producer runs.
    pub fn counter(&self) -> Counter {
        self.writes.clone()
    }

    /// Write one sample stamped with `now` into the bucket `now` falls in.
    ///
    /// # Errors
    /// Returns `TaskError::BucketUnavailable` if the bucket could not be
    /// opened (the sample is dropped), or `TaskError::Spool` if the append
    /// fails. The write counter only moves on success.
    pub fn produce_at(&mut self, now: DateTime<Utc>) -> Result<(), TaskError> {
        let key = BucketKey::from_datetime(now);
        if !self.writer.open_for_bucket(key) {
            return Err(TaskError::BucketUnavailable(key));
        }

        let value = self.source.next_value();
        self.writer.append(format_record(value, now).as_bytes())?;
        self.writes.increment();
        Ok(())
    }

    /// Close the open bucket and return the final write count.
    pub fn finish(mut self) -> u64 {
        self.writer.close_current();
        self.writes.get()
    }
}

impl<S> std::fmt::Debug for Producer<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Producer")
            .field("writer", &self.writer)
            .field("schedule", &self.schedule)
            .field("writes", &self.writes.get())
            .finish_non_exhaustive()
    }
}

#[async_trait::async_trait]
impl<S: SampleSource> PeriodicTask for Producer<S> {
    fn name(&self) -> &str {
        "producer"
    }

    fn schedule(&self) -> &Schedule {
        &self.schedule
    }

    async fn tick(&mut self) -> Result<(), TaskError> {
        self.produce_at(Utc::now())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::spool::{BucketState, Spool};
    use chrono::TimeZone;
    use std::fs;
    use tempfile::tempdir;

    struct Sequence(std::vec::IntoIter<u8>);

    impl SampleSource for Sequence {
        fn next_value(&mut self) -> u8 {
            self.0.next().unwrap_or(0)
        }
    }

    fn at(secs: i64, nanos: u32) -> DateTime<Utc> {
        Utc.timestamp_opt(secs, nanos).unwrap()
    }

    fn producer(spool: &Spool, values: Vec<u8>) -> Producer<Sequence> {
        let schedule = Schedule::jittered(DEFAULT_MIN_INTERVAL, DEFAULT_MAX_INTERVAL).unwrap();
        Producer::new(BucketWriter::new(spool.clone()), schedule)
            .with_source(Sequence(values.into_iter()))
    }

    #[test]
    fn test_format_record() {
        assert_eq!(format_record(7, at(60_000, 5)), "7 60000000000005\n");
        assert_eq!(format_record(0, at(0, 0)), "0 0\n");
    }

    #[test]
    fn test_random_digits_range() {
        let mut source = RandomDigits;
        for _ in 0..1_000 {
            assert!(source.next_value() <= 9);
        }
    }

    #[test]
    fn test_records_land_in_minute_bucket() {
        let dir = tempdir().unwrap();
        let spool = Spool::open(dir.path()).unwrap();
        let mut producer = producer(&spool, vec![3, 4]);

        producer.produce_at(at(60_000, 0)).unwrap();
        producer.produce_at(at(60_059, 1)).unwrap();

        let key = BucketKey::new(1000);
        assert_eq!(
            fs::read_to_string(spool.data_path(key)).unwrap(),
            "3 60000000000000\n4 60059000000001\n"
        );
        assert_eq!(spool.bucket_state(key), BucketState::Locked);
        assert_eq!(producer.write_count(), 2);
    }

    #[test]
    fn test_rotation_releases_finished_minute() {
        let dir = tempdir().unwrap();
        let spool = Spool::open(dir.path()).unwrap();
        let mut producer = producer(&spool, vec![1, 2]);

        producer.produce_at(at(60_000, 0)).unwrap();
        producer.produce_at(at(60_060, 0)).unwrap();

        assert_eq!(spool.bucket_state(BucketKey::new(1000)), BucketState::Distributable);
        assert_eq!(spool.bucket_state(BucketKey::new(1001)), BucketState::Locked);
        assert_eq!(
            spool.list_distributable().unwrap(),
            vec![spool.data_path(BucketKey::new(1000))]
        );
    }

    #[test]
    fn test_unwritable_bucket_drops_sample() {
        let dir = tempdir().unwrap();
        let spool = Spool::open(dir.path()).unwrap();
        fs::create_dir(spool.data_path(BucketKey::new(1000))).unwrap();

        let mut producer = producer(&spool, vec![5]);
        let err = producer.produce_at(at(60_000, 0)).unwrap_err();

        assert!(matches!(err, TaskError::BucketUnavailable(k) if k == BucketKey::new(1000)));
        assert_eq!(producer.write_count(), 0);
    }

    #[test]
    fn test_counter_readable_after_finish() {
        let dir = tempdir().unwrap();
        let spool = Spool::open(dir.path()).unwrap();
        let mut producer = producer(&spool, vec![1, 2, 3]);
        let counter = producer.counter();

        for s in 0..3 {
            producer.produce_at(at(60_000 + s, 0)).unwrap();
        }

        assert_eq!(producer.finish(), 3);
        assert_eq!(counter.get(), 3);
        assert_eq!(spool.bucket_state(BucketKey::new(1000)), BucketState::Distributable);
    }

    #[tokio::test]
    async fn test_tick_writes_current_minute() {
        let dir = tempdir().unwrap();
        let spool = Spool::open(dir.path()).unwrap();
        let mut producer = producer(&spool, vec![9]);

        producer.tick().await.unwrap();

        let key = producer.writer.current_bucket().unwrap();
        let content = fs::read_to_string(spool.data_path(key)).unwrap();
        assert!(content.starts_with("9 "));
        assert!(content.ends_with('\n'));
        assert_eq!(producer.name(), "producer");
    }
}
