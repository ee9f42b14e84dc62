//! Streaming CSV output.
//!
//! Same shape as the JSON writer: the header row is written once, then
//! each batch's rows are appended and flushed before the next batch is
//! fetched. CSV is an opt-in format; the JSON array stays the default
//! artifact.

use crate::errors::{ScrapeError, SinkError};
use crate::producer::BatchStream;
use serde::Serialize;
use std::fs::File;
use tracing::{info, instrument};

/// Appends record rows to a CSV file, one batch at a time.
///
/// The `csv` crate derives the header from the record's field names on the
/// first serialized row.
pub struct CsvStreamWriter {
    writer: csv::Writer<File>,
    path: String,
    records_written: usize,
}

impl CsvStreamWriter {
    pub fn create(path: &str) -> Result<Self, SinkError> {
        let writer = csv::Writer::from_path(path)?;
        Ok(Self {
            writer,
            path: path.to_string(),
            records_written: 0,
        })
    }

    pub fn write_batch<R: Serialize>(&mut self, records: &[R]) -> Result<(), SinkError> {
        for record in records {
            self.writer.serialize(record)?;
            self.records_written += 1;
        }
        self.writer.flush().map_err(SinkError::Io)?;
        Ok(())
    }

    pub fn finish(mut self) -> Result<usize, SinkError> {
        self.writer.flush().map_err(SinkError::Io)?;
        info!(path = %self.path, records = self.records_written, "Closed CSV file");
        Ok(self.records_written)
    }
}

/// Drive a batch stream into a CSV file. Returns the total record count.
#[instrument(level = "info", skip(stream), fields(path = %path))]
pub async fn stream_to_csv<B: BatchStream>(
    stream: &mut B,
    path: &str,
) -> Result<usize, ScrapeError> {
    let mut writer = CsvStreamWriter::create(path).map_err(ScrapeError::Sink)?;
    let mut batches = 0usize;

    while let Some(records) = stream.next_batch().await? {
        writer.write_batch(&records).map_err(ScrapeError::Sink)?;
        batches += 1;
        info!(batch = batches, count = records.len(), path, "Wrote batch to CSV file");
    }

    writer.finish().map_err(ScrapeError::Sink)
}
