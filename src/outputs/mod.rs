//! Streaming sinks for scraped records.
//!
//! Each sink consumes a [`crate::producer::BatchStream`] one batch at a
//! time, so a long run never holds more than the in-flight batch in
//! memory, and progress is observable while the run is still going (the
//! file grows, store rows appear).
//!
//! # Submodules
//!
//! - [`json_stream`]: incremental single-file JSON array writer, plus the
//!   one-shot eager write for small jobs
//! - [`csv_stream`]: header-once, rows-per-batch CSV writer
//! - [`store`]: keyed upsert store with per-batch inserted/updated counts
//!
//! Destination failures are fatal by design: silently losing a persisted
//! batch is worse than stopping. The one exception is a store batch write,
//! which is counted as failed while later batches proceed.

pub mod csv_stream;
pub mod json_stream;
pub mod store;
