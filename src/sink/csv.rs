//! CSV persistence of decoded records
//!
//! One file per run, named after the local time it was created:
//! `eyedata_YYYYmmddHHMMSS.csv`. The header row comes first, then one row per
//! record in stream order. The sequence number is not persisted.

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use tracing::{debug, info};

use crate::error::SinkError;
use crate::types::{Batch, GazeRecord, SubsecondUnit};

use super::BatchSink;

/// Writes records as CSV rows
pub struct CsvSink {
    out: BufWriter<File>,
    path: PathBuf,
    rows: u64,
}

impl CsvSink {
    /// Create `dir` if needed and open a new timestamped file in it
    pub fn create_in(dir: impl AsRef<Path>, subsecond_unit: SubsecondUnit) -> Result<Self, SinkError> {
        let dir = dir.as_ref();
        std::fs::create_dir_all(dir)
            .map_err(|source| SinkError::Output { path: dir.to_path_buf(), source })?;

        let name = chrono::Local::now().format("eyedata_%Y%m%d%H%M%S.csv").to_string();
        Self::create(dir.join(name), subsecond_unit)
    }

    /// Create (or truncate) the file at `path` and write the header row
    pub fn create(path: impl Into<PathBuf>, subsecond_unit: SubsecondUnit) -> Result<Self, SinkError> {
        let path = path.into();
        let file = File::create(&path)
            .map_err(|source| SinkError::Output { path: path.clone(), source })?;

        let mut sink = Self { out: BufWriter::new(file), path, rows: 0 };
        let header = header_row(subsecond_unit);
        writeln!(sink.out, "{}", header)
            .map_err(|source| SinkError::Output { path: sink.path.clone(), source })?;

        info!("Recording samples to {}", sink.path.display());
        Ok(sink)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Data rows written so far
    pub fn rows(&self) -> u64 {
        self.rows
    }

    fn output_error(&self, source: std::io::Error) -> SinkError {
        SinkError::Output { path: self.path.clone(), source }
    }
}

/// Column names, in record field order
pub fn header_row(subsecond_unit: SubsecondUnit) -> String {
    format!(
        "Timestamp(Seconds),Timestamp({}),ID,Confidence,NormalizedPosX,NormalizedPosY,PupilDiameter",
        subsecond_unit.label()
    )
}

/// One CSV row; booleans as 0/1, floats in shortest round-trip form
pub fn format_row(record: &GazeRecord) -> String {
    format!(
        "{},{},{},{},{},{},{}",
        record.capture_time_seconds,
        record.capture_time_subsecond,
        u8::from(record.eye_id),
        record.confidence,
        record.gaze_x,
        record.gaze_y,
        record.pupil_diameter,
    )
}

#[async_trait::async_trait]
impl BatchSink for CsvSink {
    async fn accept(&mut self, batch: Batch) -> Result<(), SinkError> {
        for record in &batch {
            if let Err(e) = writeln!(self.out, "{}", format_row(record)) {
                return Err(self.output_error(e));
            }
            self.rows += 1;
        }
        Ok(())
    }

    async fn finish(&mut self) -> Result<(), SinkError> {
        if let Err(e) = self.out.flush() {
            return Err(self.output_error(e));
        }
        debug!(rows = self.rows, "Flushed {}", self.path.display());
        Ok(())
    }
}
