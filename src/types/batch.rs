//! Ordered batches of records

use std::ops::Index;

use serde::{Deserialize, Serialize};

use super::GazeRecord;

/// An ordered, finite sequence of records sent as exactly one frame.
///
/// Order is production order and is preserved end to end.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Batch {
    records: Vec<GazeRecord>,
}

impl Batch {
    /// Create a batch from records in production order
    pub fn new(records: Vec<GazeRecord>) -> Self {
        Self { records }
    }

    /// Create an empty batch with room for `capacity` records
    pub fn with_capacity(capacity: usize) -> Self {
        Self { records: Vec::with_capacity(capacity) }
    }

    /// Create a batch holding a single record
    pub fn single(record: GazeRecord) -> Self {
        Self { records: vec![record] }
    }

    /// Append a record at the end of the batch
    pub fn push(&mut self, record: GazeRecord) {
        self.records.push(record);
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn records(&self) -> &[GazeRecord] {
        &self.records
    }

    pub fn iter(&self) -> std::slice::Iter<'_, GazeRecord> {
        self.records.iter()
    }

    pub fn into_records(self) -> Vec<GazeRecord> {
        self.records
    }

    /// Bitwise equality of every record, see [`GazeRecord::bit_eq`]
    pub fn bit_eq(&self, other: &Self) -> bool {
        self.len() == other.len() && self.iter().zip(other.iter()).all(|(a, b)| a.bit_eq(b))
    }
}

impl From<Vec<GazeRecord>> for Batch {
    fn from(records: Vec<GazeRecord>) -> Self {
        Self::new(records)
    }
}

impl FromIterator<GazeRecord> for Batch {
    fn from_iter<I: IntoIterator<Item = GazeRecord>>(iter: I) -> Self {
        Self { records: iter.into_iter().collect() }
    }
}

impl IntoIterator for Batch {
    type Item = GazeRecord;
    type IntoIter = std::vec::IntoIter<GazeRecord>;

    fn into_iter(self) -> Self::IntoIter {
        self.records.into_iter()
    }
}

impl<'a> IntoIterator for &'a Batch {
    type Item = &'a GazeRecord;
    type IntoIter = std::slice::Iter<'a, GazeRecord>;

    fn into_iter(self) -> Self::IntoIter {
        self.records.iter()
    }
}

impl Index<usize> for Batch {
    type Output = GazeRecord;

    fn index(&self, index: usize) -> &Self::Output {
        &self.records[index]
    }
}
