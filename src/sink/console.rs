//! Human-readable console output

use std::io::Write;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, OnceLock};

use crate::error::SinkError;
use crate::types::{Batch, GazeRecord, SubsecondUnit};

use super::BatchSink;

/// Process-wide count of records printed, for display only
fn global_counter() -> Arc<AtomicU64> {
    static COUNTER: OnceLock<Arc<AtomicU64>> = OnceLock::new();
    Arc::clone(COUNTER.get_or_init(|| Arc::new(AtomicU64::new(0))))
}

/// Prints one line per record
pub struct ConsoleSink<W = std::io::Stdout> {
    out: W,
    counter: Arc<AtomicU64>,
    subsecond_unit: SubsecondUnit,
}

impl ConsoleSink {
    /// Print to stdout, numbering records with the process-wide counter
    pub fn stdout(subsecond_unit: SubsecondUnit) -> Self {
        Self { out: std::io::stdout(), counter: global_counter(), subsecond_unit }
    }
}

impl<W: Write + Send> ConsoleSink<W> {
    pub fn with_writer(out: W, counter: Arc<AtomicU64>, subsecond_unit: SubsecondUnit) -> Self {
        Self { out, counter, subsecond_unit }
    }

    pub fn into_writer(self) -> W {
        self.out
    }

    fn format_line(&self, count: u64, record: &GazeRecord) -> String {
        format!(
            "Count: {}, Time(Sec): {}, Time({}): {}, ID: {}, Confidence: {}, NormalizedPosX: {}, NormalizedPosY: {}, PupilDiameter: {}",
            count,
            record.capture_time_seconds,
            self.subsecond_unit.label(),
            record.capture_time_subsecond,
            u8::from(record.eye_id),
            record.confidence,
            record.gaze_x,
            record.gaze_y,
            record.pupil_diameter,
        )
    }
}

#[async_trait::async_trait]
impl<W: Write + Send> BatchSink for ConsoleSink<W> {
    async fn accept(&mut self, batch: Batch) -> Result<(), SinkError> {
        for record in &batch {
            let count = self.counter.fetch_add(1, Ordering::Relaxed) + 1;
            let line = self.format_line(count, record);
            writeln!(self.out, "{}", line)?;
        }
        Ok(())
    }

    async fn finish(&mut self) -> Result<(), SinkError> {
        self.out.flush()?;
        Ok(())
    }
}
