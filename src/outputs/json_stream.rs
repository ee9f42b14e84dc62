//! Incremental JSON output.
//!
//! The default artifact is a single file containing one top-level JSON
//! array. [`JsonArrayWriter`] builds that array append-style (open bracket,
//! comma-separated records, closing bracket on stream exhaustion), so each
//! batch hits the disk before the next one is fetched. On the happy
//! path the closed file is always valid JSON; if the process dies mid-batch
//! the trailing element may be incomplete, which is documented rather than
//! engineered away.

use crate::errors::{ScrapeError, SinkError};
use crate::producer::BatchStream;
use serde::Serialize;
use tokio::fs::File;
use tokio::io::{AsyncWriteExt, BufWriter};
use tracing::{info, instrument};

/// Writes records into one JSON array, one batch at a time.
pub struct JsonArrayWriter {
    out: BufWriter<File>,
    path: String,
    records_written: usize,
}

impl JsonArrayWriter {
    /// Create (or truncate) the output file and open the array.
    pub async fn create(path: &str) -> Result<Self, SinkError> {
        let file = File::create(path).await?;
        let mut out = BufWriter::new(file);
        out.write_all(b"[").await?;
        Ok(Self {
            out,
            path: path.to_string(),
            records_written: 0,
        })
    }

    /// Append one batch of records to the array.
    pub async fn write_batch<R: Serialize>(&mut self, records: &[R]) -> Result<(), SinkError> {
        for record in records {
            let lead: &[u8] = if self.records_written == 0 {
                b"\n  "
            } else {
                b",\n  "
            };
            self.out.write_all(lead).await?;
            let json = serde_json::to_vec(record)?;
            self.out.write_all(&json).await?;
            self.records_written += 1;
        }
        // One flush per batch keeps progress observable on disk.
        self.out.flush().await?;
        Ok(())
    }

    /// Close the array and flush. Returns the total records written.
    pub async fn finish(mut self) -> Result<usize, SinkError> {
        self.out.write_all(b"\n]").await?;
        self.out.flush().await?;
        info!(path = %self.path, records = self.records_written, "Closed JSON array");
        Ok(self.records_written)
    }
}

/// Drive a batch stream into a JSON array file, one batch in memory at a
/// time. Returns the total record count.
#[instrument(level = "info", skip(stream), fields(path = %path))]
pub async fn stream_to_json<B: BatchStream>(
    stream: &mut B,
    path: &str,
) -> Result<usize, ScrapeError> {
    let mut writer = JsonArrayWriter::create(path).await.map_err(ScrapeError::Sink)?;
    let mut batches = 0usize;

    while let Some(records) = stream.next_batch().await? {
        writer
            .write_batch(&records)
            .await
            .map_err(ScrapeError::Sink)?;
        batches += 1;
        info!(batch = batches, count = records.len(), path, "Wrote batch to JSON file");
    }

    let total = writer.finish().await.map_err(ScrapeError::Sink)?;
    Ok(total)
}

/// One-shot write for eager runs: serialize the whole collection at once.
#[instrument(level = "info", skip(records), fields(path = %path, count = records.len()))]
pub async fn write_all_json<R: Serialize>(records: &[R], path: &str) -> Result<(), SinkError> {
    let json = serde_json::to_string_pretty(records)?;
    tokio::fs::write(path, json).await?;
    info!(path, count = records.len(), "Wrote JSON file");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Record;
    use std::collections::VecDeque;

    #[derive(Debug, Clone, Serialize)]
    struct Rec {
        id: String,
        title: String,
    }

    impl Record for Rec {
        fn id(&self) -> &str {
            &self.id
        }
    }

    fn rec(id: &str) -> Rec {
        Rec {
            id: id.to_string(),
            title: format!("story {id}"),
        }
    }

    /// Hands out pre-scripted batches; no fetching involved.
    struct FixedStream {
        batches: VecDeque<Vec<Rec>>,
    }

    impl FixedStream {
        fn new(batches: Vec<Vec<Rec>>) -> Self {
            Self {
                batches: batches.into(),
            }
        }
    }

    impl BatchStream for FixedStream {
        type Item = Rec;

        async fn next_batch(&mut self) -> Result<Option<Vec<Rec>>, ScrapeError> {
            Ok(self.batches.pop_front())
        }
    }

    #[tokio::test]
    async fn test_streamed_file_is_valid_json_with_exact_count() {
        // Scenario: three batches of sizes 2, 1, 3
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("articles.json");
        let path = path.to_str().unwrap();

        let mut stream = FixedStream::new(vec![
            vec![rec("a"), rec("b")],
            vec![rec("c")],
            vec![rec("d"), rec("e"), rec("f")],
        ]);
        let total = stream_to_json(&mut stream, path).await.unwrap();
        assert_eq!(total, 6);

        let raw = std::fs::read_to_string(path).unwrap();
        let parsed: Vec<serde_json::Value> = serde_json::from_str(&raw).unwrap();
        assert_eq!(parsed.len(), 6);
        assert_eq!(parsed[0]["id"], "a");
        assert_eq!(parsed[5]["id"], "f");
    }

    #[tokio::test]
    async fn test_empty_stream_produces_empty_array() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("empty.json");
        let path = path.to_str().unwrap();

        let mut stream = FixedStream::new(vec![]);
        let total = stream_to_json(&mut stream, path).await.unwrap();
        assert_eq!(total, 0);

        let raw = std::fs::read_to_string(path).unwrap();
        let parsed: Vec<serde_json::Value> = serde_json::from_str(&raw).unwrap();
        assert!(parsed.is_empty());
    }

    #[tokio::test]
    async fn test_empty_batches_do_not_break_framing() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("sparse.json");
        let path = path.to_str().unwrap();

        let mut stream = FixedStream::new(vec![vec![], vec![rec("x")], vec![]]);
        let total = stream_to_json(&mut stream, path).await.unwrap();
        assert_eq!(total, 1);

        let raw = std::fs::read_to_string(path).unwrap();
        let parsed: Vec<serde_json::Value> = serde_json::from_str(&raw).unwrap();
        assert_eq!(parsed.len(), 1);
    }

    #[tokio::test]
    async fn test_file_grows_between_batches() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("progress.json");
        let path = path.to_str().unwrap();

        let mut writer = JsonArrayWriter::create(path).await.unwrap();
        writer.write_batch(&[rec("a"), rec("b")]).await.unwrap();
        let after_first = std::fs::metadata(path).unwrap().len();

        writer.write_batch(&[rec("c")]).await.unwrap();
        let after_second = std::fs::metadata(path).unwrap().len();
        assert!(after_second > after_first);

        writer.finish().await.unwrap();
    }

    #[tokio::test]
    async fn test_one_shot_write_round_trips() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("eager.json");
        let path = path.to_str().unwrap();

        write_all_json(&[rec("a"), rec("b")], path).await.unwrap();
        let raw = std::fs::read_to_string(path).unwrap();
        let parsed: Vec<serde_json::Value> = serde_json::from_str(&raw).unwrap();
        assert_eq!(parsed.len(), 2);
    }
}
