//! Per-run counters reported when a production run completes.
//!
//! Partial success is the expected common case for a scrape, so the summary
//! always distinguishes attempted from succeeded pages and makes zero-record
//! pages visible: a page that fetched fine but matched no containers usually
//! means the site layout changed.

use serde::Serialize;
use std::fmt;

/// Counters for one production run.
///
/// Owned by the page producer and updated as pages are fetched. Single-task
/// by contract, so plain integers suffice.
#[derive(Debug, Default, Clone, Serialize)]
pub struct JobSummary {
    /// Pages the run was asked for.
    pub pages_requested: u32,
    /// Pages actually fetched (may stop short when the source runs out).
    pub pages_attempted: u32,
    pub pages_succeeded: u32,
    /// Pages that failed after retries and were recorded as empty.
    pub pages_failed: u32,
    /// Pages that succeeded but yielded zero records.
    pub pages_empty: u32,
    pub records_produced: usize,
}

impl JobSummary {
    pub fn new(pages_requested: u32) -> Self {
        Self {
            pages_requested,
            ..Default::default()
        }
    }

    pub(crate) fn record_success(&mut self, records: usize) {
        self.pages_attempted += 1;
        self.pages_succeeded += 1;
        self.records_produced += records;
        if records == 0 {
            self.pages_empty += 1;
        }
    }

    pub(crate) fn record_failure(&mut self) {
        self.pages_attempted += 1;
        self.pages_failed += 1;
    }

    /// True when any page failed or matched nothing.
    pub fn has_anomalies(&self) -> bool {
        self.pages_failed > 0 || self.pages_empty > 0
    }
}

impl fmt::Display for JobSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "\nScrape Summary")?;
        writeln!(f, "--------------")?;
        writeln!(
            f,
            "  pages   : requested: {}, attempted: {}, ok: {}, failed: {}, empty: {}",
            self.pages_requested,
            self.pages_attempted,
            self.pages_succeeded,
            self.pages_failed,
            self.pages_empty
        )?;
        writeln!(f, "  records : {}", self.records_produced)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_counters_accumulate() {
        let mut summary = JobSummary::new(3);
        summary.record_success(5);
        summary.record_failure();
        summary.record_success(0);

        assert_eq!(summary.pages_attempted, 3);
        assert_eq!(summary.pages_succeeded, 2);
        assert_eq!(summary.pages_failed, 1);
        assert_eq!(summary.pages_empty, 1);
        assert_eq!(summary.records_produced, 5);
        assert!(summary.has_anomalies());
    }

    #[test]
    fn test_clean_run_has_no_anomalies() {
        let mut summary = JobSummary::new(2);
        summary.record_success(3);
        summary.record_success(4);
        assert!(!summary.has_anomalies());
        assert_eq!(summary.records_produced, 7);
    }

    #[test]
    fn test_display_is_compact() {
        let mut summary = JobSummary::new(2);
        summary.record_success(3);
        let rendered = summary.to_string();
        assert!(rendered.contains("requested: 2"));
        assert!(rendered.contains("records : 3"));
    }
}
