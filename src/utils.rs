//! Utility functions for record hashing, numeric cleaning, logging, and
//! file system checks.

use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64;
use chrono::Local;
use once_cell::sync::Lazy;
use regex::Regex;
use sha2::{Digest, Sha256};
use std::error::Error;
use std::fs as stdfs;
use tokio::fs;
use tracing::{info, instrument};

/// Compute the stable identifier for a record from its natural-key parts.
///
/// Parts are lowercased, trimmed, and joined with `|` before hashing, so
/// `content_hash(&["Title", "date"])` equals `content_hash(&[" title ", "DATE"])`.
/// The digest is SHA-256, encoded as standard base64.
pub fn content_hash(parts: &[&str]) -> String {
    let combined = parts
        .iter()
        .map(|p| p.trim().to_lowercase())
        .collect::<Vec<_>>()
        .join("|");
    let digest = Sha256::digest(combined.as_bytes());
    BASE64.encode(digest)
}

static NUMBER_NOISE: Lazy<Regex> = Lazy::new(|| Regex::new(r"[,%₹\s]").unwrap());

/// Parse a display number like `"1,234.56"`, `"12.5%"`, or `"15.2 Cr"`.
///
/// Returns `None` for empty or placeholder values (`-`, `N/A`). `Cr` and
/// `Lac` suffixes are expanded to their absolute magnitudes.
pub fn clean_number(value: &str) -> Option<f64> {
    let trimmed = value.trim();
    if trimmed.is_empty() || matches!(trimmed, "-" | "N/A" | "NA") {
        return None;
    }

    let mut multiplier = 1.0;
    let mut body = trimmed.to_string();
    if let Some(stripped) = body.strip_suffix("Cr").or_else(|| body.strip_suffix("cr")) {
        multiplier = 10_000_000.0; // 1 crore
        body = stripped.to_string();
    } else if let Some(stripped) = body.strip_suffix("Lac").or_else(|| body.strip_suffix("lac")) {
        multiplier = 100_000.0;
        body = stripped.to_string();
    }

    let cleaned = NUMBER_NOISE.replace_all(&body, "");
    cleaned.parse::<f64>().ok().map(|n| n * multiplier)
}

/// Current local time in ISO-8601, recorded on every scraped record.
pub fn now_iso() -> String {
    Local::now().to_rfc3339()
}

/// Truncate a string for logging purposes.
///
/// Long strings are truncated to `max` characters with an ellipsis and
/// byte count indicator appended.
pub fn truncate_for_log(s: &str, max: usize) -> String {
    if s.len() <= max {
        s.to_string()
    } else {
        format!("{}…(+{} bytes)", &s[..max], s.len() - max)
    }
}

/// Ensure a directory exists and is writable.
///
/// Creates the directory if missing, then performs a write test by creating
/// and immediately deleting a probe file.
#[instrument(level = "info", skip_all, fields(path = %path))]
pub async fn ensure_writable_dir(path: &str) -> Result<(), Box<dyn Error>> {
    if let Err(e) = fs::create_dir_all(path).await {
        return Err(Box::new(e));
    }
    // Try a small sync write using std fs (simpler error surface)
    let probe_path = format!("{}/..__probe_write__", path.trim_end_matches('/'));
    match stdfs::File::create(&probe_path) {
        Ok(_) => {
            let _ = stdfs::remove_file(&probe_path);
            info!("Output directory is writable");
            Ok(())
        }
        Err(e) => Err(Box::new(e)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_content_hash_normalizes_case_and_whitespace() {
        let a = content_hash(&["Sensex rallies", "November 12, 2025"]);
        let b = content_hash(&["  sensex rallies  ", "NOVEMBER 12, 2025"]);
        assert_eq!(a, b);
    }

    #[test]
    fn test_content_hash_distinct_inputs() {
        let a = content_hash(&["title one", "date"]);
        let b = content_hash(&["title two", "date"]);
        assert_ne!(a, b);
    }

    #[test]
    fn test_content_hash_is_base64() {
        let h = content_hash(&["anything"]);
        // SHA-256 digest is 32 bytes -> 44 base64 chars including padding
        assert_eq!(h.len(), 44);
        assert!(h.ends_with('='));
    }

    #[test]
    fn test_clean_number_plain() {
        assert_eq!(clean_number("1,234.56"), Some(1234.56));
        assert_eq!(clean_number("12.5%"), Some(12.5));
        assert_eq!(clean_number("₹ 905"), Some(905.0));
    }

    #[test]
    fn test_clean_number_magnitudes() {
        assert_eq!(clean_number("15.2 Cr"), Some(152_000_000.0));
        assert_eq!(clean_number("3 Lac"), Some(300_000.0));
    }

    #[test]
    fn test_clean_number_placeholders() {
        assert_eq!(clean_number(""), None);
        assert_eq!(clean_number("-"), None);
        assert_eq!(clean_number("N/A"), None);
        assert_eq!(clean_number("garbage"), None);
    }

    #[test]
    fn test_truncate_for_log_short_string() {
        let s = "Hello, world!";
        assert_eq!(truncate_for_log(s, 100), "Hello, world!");
    }

    #[test]
    fn test_truncate_for_log_long_string() {
        let s = "a".repeat(500);
        let result = truncate_for_log(&s, 100);
        assert!(result.starts_with(&"a".repeat(100)));
        assert!(result.contains("…(+400 bytes)"));
    }

    #[tokio::test]
    async fn test_ensure_writable_dir() {
        let dir = tempfile::tempdir().unwrap();
        let nested = format!("{}/nested/out", dir.path().display());
        ensure_writable_dir(&nested).await.unwrap();
        assert!(std::path::Path::new(&nested).is_dir());
    }
}
