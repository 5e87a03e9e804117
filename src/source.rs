//! Sample sources feeding publisher loops

use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::time::{SystemTime, UNIX_EPOCH};

use rand::Rng;
use tracing::warn;

use crate::types::{Batch, GazeRecord, SubsecondUnit};

/// Trait for producers of gaze records
///
/// One source is shared by every publisher loop of a server, so implementations
/// must be safe to call concurrently from independent tasks.
#[async_trait::async_trait]
pub trait SampleSource: Send + Sync + 'static {
    /// Produce the next batch of `batch_size` records in production order.
    async fn next_batch(&self, batch_size: usize) -> Batch;
}

/// Random samples stamped with the wall clock.
///
/// Sequence numbers come from one counter shared by all callers, so they are
/// unique across every connection served from this source. Confidence is drawn
/// from {0.0, 1.0} only, which is what deployed trackers were observed to emit.
#[derive(Debug)]
pub struct SyntheticSource {
    next_sequence: AtomicU64,
    subsecond_unit: SubsecondUnit,
}

impl SyntheticSource {
    pub fn new(subsecond_unit: SubsecondUnit) -> Self {
        Self { next_sequence: AtomicU64::new(0), subsecond_unit }
    }

    fn sample(&self) -> GazeRecord {
        let since_epoch = SystemTime::now().duration_since(UNIX_EPOCH).unwrap_or_else(|e| {
            warn!("System clock before Unix epoch: {}", e);
            Default::default()
        });
        let (capture_time_seconds, capture_time_subsecond) = self.subsecond_unit.split(since_epoch);

        let mut rng = rand::rng();
        GazeRecord {
            sequence_number: self.next_sequence.fetch_add(1, Ordering::Relaxed),
            capture_time_seconds,
            capture_time_subsecond,
            eye_id: rng.random_bool(0.5),
            confidence: if rng.random_bool(0.5) { 1.0 } else { 0.0 },
            gaze_x: rng.random_range(0..1000u32) as f32 / 1000.0,
            gaze_y: rng.random_range(0..1000u32) as f32 / 1000.0,
            pupil_diameter: rng.random_range(0..100),
        }
    }
}

impl Default for SyntheticSource {
    fn default() -> Self {
        Self::new(SubsecondUnit::default())
    }
}

#[async_trait::async_trait]
impl SampleSource for SyntheticSource {
    async fn next_batch(&self, batch_size: usize) -> Batch {
        (0..batch_size).map(|_| self.sample()).collect()
    }
}

/// Replays a fixed list of records in a loop.
///
/// Each call continues where the previous one stopped, across all callers.
#[derive(Debug)]
pub struct FixedSource {
    records: Vec<GazeRecord>,
    cursor: AtomicUsize,
}

impl FixedSource {
    pub fn new(records: Vec<GazeRecord>) -> Self {
        Self { records, cursor: AtomicUsize::new(0) }
    }
}

#[async_trait::async_trait]
impl SampleSource for FixedSource {
    async fn next_batch(&self, batch_size: usize) -> Batch {
        if self.records.is_empty() {
            return Batch::default();
        }
        let start = self.cursor.fetch_add(batch_size, Ordering::Relaxed);
        (start..start + batch_size).map(|i| self.records[i % self.records.len()]).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[tokio::test]
    async fn synthetic_samples_stay_in_observed_ranges() {
        let source = SyntheticSource::new(SubsecondUnit::Millis);
        let batch = source.next_batch(200).await;

        assert_eq!(batch.len(), 200);
        for (i, record) in batch.iter().enumerate() {
            assert_eq!(record.sequence_number, i as u64);
            assert!(record.capture_time_subsecond < 1_000);
            assert!(record.confidence == 0.0 || record.confidence == 1.0);
            assert!((0.0..1.0).contains(&record.gaze_x));
            assert!((0.0..1.0).contains(&record.gaze_y));
            assert!(record.pupil_diameter < 100);
        }
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn shared_sequence_is_unique_across_tasks() {
        let source = Arc::new(SyntheticSource::default());

        let tasks: Vec<_> = (0..8)
            .map(|_| {
                let source = Arc::clone(&source);
                tokio::spawn(async move { source.next_batch(50).await })
            })
            .collect();

        let mut seen = Vec::new();
        for task in tasks {
            seen.extend(task.await.unwrap().iter().map(|r| r.sequence_number));
        }
        seen.sort_unstable();
        assert_eq!(seen, (0..400).collect::<Vec<u64>>());
    }

    #[tokio::test]
    async fn fixed_source_cycles() {
        let records: Vec<GazeRecord> =
            (0..3u64).map(|n| GazeRecord { sequence_number: n, ..Default::default() }).collect();
        let source = FixedSource::new(records);

        let first = source.next_batch(2).await;
        let second = source.next_batch(2).await;
        let seq: Vec<u64> = first.iter().chain(second.iter()).map(|r| r.sequence_number).collect();
        assert_eq!(seq, vec![0, 1, 2, 0]);

        assert!(FixedSource::new(Vec::new()).next_batch(4).await.is_empty());
    }
}
