//! Destinations for decoded batches on the receiving side.
//!
//! Sinks receive batches in stream order. A sink error ends the ingestion loop
//! that feeds it.

mod console;
mod csv;

pub use console::ConsoleSink;
pub use csv::{CsvSink, format_row, header_row};

use crate::error::SinkError;
use crate::types::Batch;

/// Trait for consumers of decoded batches
#[async_trait::async_trait]
pub trait BatchSink: Send {
    /// Take one batch; called in stream order.
    async fn accept(&mut self, batch: Batch) -> Result<(), SinkError>;

    /// Flush anything buffered. Called once when the stream ends.
    async fn finish(&mut self) -> Result<(), SinkError> {
        Ok(())
    }
}

#[async_trait::async_trait]
impl<T: BatchSink + ?Sized> BatchSink for Box<T> {
    async fn accept(&mut self, batch: Batch) -> Result<(), SinkError> {
        (**self).accept(batch).await
    }

    async fn finish(&mut self) -> Result<(), SinkError> {
        (**self).finish().await
    }
}

/// Feeds every batch to two sinks, first then second
#[derive(Debug)]
pub struct Tee<A, B> {
    first: A,
    second: B,
}

impl<A, B> Tee<A, B> {
    pub fn new(first: A, second: B) -> Self {
        Self { first, second }
    }

    pub fn into_inner(self) -> (A, B) {
        (self.first, self.second)
    }
}

#[async_trait::async_trait]
impl<A: BatchSink, B: BatchSink> BatchSink for Tee<A, B> {
    async fn accept(&mut self, batch: Batch) -> Result<(), SinkError> {
        self.first.accept(batch.clone()).await?;
        self.second.accept(batch).await
    }

    async fn finish(&mut self) -> Result<(), SinkError> {
        let first = self.first.finish().await;
        let second = self.second.finish().await;
        first.and(second)
    }
}

/// Keeps every batch in memory
#[derive(Debug, Default)]
pub struct MemorySink {
    batches: Vec<Batch>,
    finished: bool,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn batches(&self) -> &[Batch] {
        &self.batches
    }

    pub fn is_finished(&self) -> bool {
        self.finished
    }

    pub fn into_batches(self) -> Vec<Batch> {
        self.batches
    }
}

#[async_trait::async_trait]
impl BatchSink for MemorySink {
    async fn accept(&mut self, batch: Batch) -> Result<(), SinkError> {
        self.batches.push(batch);
        Ok(())
    }

    async fn finish(&mut self) -> Result<(), SinkError> {
        self.finished = true;
        Ok(())
    }
}
