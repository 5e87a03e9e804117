//! Batch payload codec
//!
//! ## Payload Layout
//!
//! ```text
//! ┌────────────────────┬──────────────────────┬─────┬──────────────────────┐
//! │ record_count (u64) │ record 0 (37 bytes)  │ ... │ record n-1           │
//! └────────────────────┴──────────────────────┴─────┴──────────────────────┘
//! ```
//!
//! Each record is its fields in declaration order, little-endian:
//!
//! | offset | field                    | type |
//! |--------|--------------------------|------|
//! | 0      | `sequence_number`        | u64  |
//! | 8      | `capture_time_seconds`   | u64  |
//! | 16     | `capture_time_subsecond` | u32  |
//! | 20     | `eye_id`                 | u8   |
//! | 21     | `confidence`             | f32  |
//! | 25     | `gaze_x`                 | f32  |
//! | 29     | `gaze_y`                 | f32  |
//! | 33     | `pupil_diameter`         | u32  |
//!
//! Floats are carried bit-for-bit. No field is range checked.

use crate::error::CodecError;
use crate::types::{Batch, GazeRecord};

/// Size of the record count prefix
pub const COUNT_SIZE: usize = 8;

/// Encoded size of one record
pub const RECORD_SIZE: usize = 37;

/// Encoded size of a batch of `records` records
pub const fn encoded_len(records: usize) -> usize {
    COUNT_SIZE + records * RECORD_SIZE
}

/// Serialize a batch into a payload.
pub fn encode(batch: &Batch) -> Vec<u8> {
    let mut buf = Vec::with_capacity(encoded_len(batch.len()));
    encode_into(batch, &mut buf);
    buf
}

/// Serialize a batch, appending to `buf`.
pub fn encode_into(batch: &Batch, buf: &mut Vec<u8>) {
    buf.reserve(encoded_len(batch.len()));
    buf.extend_from_slice(&(batch.len() as u64).to_le_bytes());
    for record in batch {
        buf.extend_from_slice(&record.sequence_number.to_le_bytes());
        buf.extend_from_slice(&record.capture_time_seconds.to_le_bytes());
        buf.extend_from_slice(&record.capture_time_subsecond.to_le_bytes());
        buf.push(u8::from(record.eye_id));
        buf.extend_from_slice(&record.confidence.to_bits().to_le_bytes());
        buf.extend_from_slice(&record.gaze_x.to_bits().to_le_bytes());
        buf.extend_from_slice(&record.gaze_y.to_bits().to_le_bytes());
        buf.extend_from_slice(&record.pupil_diameter.to_le_bytes());
    }
}

/// Deserialize a payload into a batch.
///
/// The payload must hold exactly the records it declares.
pub fn decode(payload: &[u8]) -> Result<Batch, CodecError> {
    let mut reader = PayloadReader::new(payload);
    let declared = reader.u64()?;

    // Never trust the count for allocation; a payload can hold at most this many.
    let fits = reader.remaining() / RECORD_SIZE;
    let count = usize::try_from(declared).unwrap_or(usize::MAX);
    if count > fits {
        return Err(CodecError::Truncated {
            needed: COUNT_SIZE.saturating_add(count.saturating_mul(RECORD_SIZE)),
            available: payload.len(),
        });
    }

    let mut batch = Batch::with_capacity(count);
    for _ in 0..count {
        batch.push(reader.record()?);
    }

    match reader.remaining() {
        0 => Ok(batch),
        count => Err(CodecError::TrailingBytes { count }),
    }
}

/// Bounds-checked little-endian cursor over a payload
struct PayloadReader<'a> {
    data: &'a [u8],
    position: usize,
}

impl<'a> PayloadReader<'a> {
    fn new(data: &'a [u8]) -> Self {
        Self { data, position: 0 }
    }

    fn remaining(&self) -> usize {
        self.data.len() - self.position
    }

    fn take<const N: usize>(&mut self) -> Result<[u8; N], CodecError> {
        let end = self.position + N;
        let bytes = self
            .data
            .get(self.position..end)
            .ok_or(CodecError::Truncated { needed: end, available: self.data.len() })?;
        self.position = end;
        let mut out = [0u8; N];
        out.copy_from_slice(bytes);
        Ok(out)
    }

    fn u64(&mut self) -> Result<u64, CodecError> {
        self.take::<8>().map(u64::from_le_bytes)
    }

    fn u32(&mut self) -> Result<u32, CodecError> {
        self.take::<4>().map(u32::from_le_bytes)
    }

    fn f32(&mut self) -> Result<f32, CodecError> {
        self.u32().map(f32::from_bits)
    }

    fn bool(&mut self) -> Result<bool, CodecError> {
        self.take::<1>().map(|[b]| b != 0)
    }

    fn record(&mut self) -> Result<GazeRecord, CodecError> {
        Ok(GazeRecord {
            sequence_number: self.u64()?,
            capture_time_seconds: self.u64()?,
            capture_time_subsecond: self.u32()?,
            eye_id: self.bool()?,
            confidence: self.f32()?,
            gaze_x: self.f32()?,
            gaze_y: self.f32()?,
            pupil_diameter: self.u32()?,
        })
    }
}
