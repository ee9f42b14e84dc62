//! Keyed upsert store.
//!
//! Records are persisted as JSON documents keyed by their stable id, so
//! re-scraping the same story updates the existing row instead of
//! duplicating it. The store backend is SQLite; the contract the rest of
//! the crate sees is [`RecordStore`]: deliver a batch, get back
//! inserted/updated/failed counts, idempotent under repeated delivery.
//!
//! Failure policy: an unreachable or unopenable store is fatal. A batch
//! that fails to write is logged and counted; later batches still proceed.

use crate::errors::{ScrapeError, StoreError};
use crate::models::Record;
use crate::producer::BatchStream;
use crate::utils::now_iso;
use rusqlite::{Connection, params};
use std::fmt;
use tracing::{error, info, instrument, warn};

/// Per-batch (or per-run, when merged) upsert counts.
#[derive(Debug, Default, Clone, serde::Serialize)]
pub struct UpsertOutcome {
    pub inserted: usize,
    pub updated: usize,
    pub failed: usize,
}

impl UpsertOutcome {
    pub fn merge(&mut self, other: &UpsertOutcome) {
        self.inserted += other.inserted;
        self.updated += other.updated;
        self.failed += other.failed;
    }
}

impl fmt::Display for UpsertOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "inserted: {}, updated: {}, failed: {}",
            self.inserted, self.updated, self.failed
        )
    }
}

/// A destination with idempotent upsert-by-id semantics.
pub trait RecordStore {
    async fn upsert_batch<R: Record>(
        &mut self,
        records: &[R],
    ) -> Result<UpsertOutcome, StoreError>;
}

/// SQLite-backed document store.
///
/// One table holds every collection; rows are `(collection, id)` keyed with
/// the serialized record as payload. The schema is created on open.
pub struct SqliteStore {
    conn: Connection,
    collection: String,
}

impl SqliteStore {
    /// Open (or create) the database file. Unopenable paths are fatal.
    pub fn open(path: &str, collection: &str) -> Result<Self, StoreError> {
        let conn = Connection::open(path)
            .map_err(|e| StoreError::Unavailable(format!("cannot open {path}: {e}")))?;
        Self::with_connection(conn, collection)
    }

    /// In-memory store, used by tests.
    pub fn open_in_memory(collection: &str) -> Result<Self, StoreError> {
        let conn = Connection::open_in_memory()
            .map_err(|e| StoreError::Unavailable(e.to_string()))?;
        Self::with_connection(conn, collection)
    }

    fn with_connection(conn: Connection, collection: &str) -> Result<Self, StoreError> {
        conn.execute_batch(
            "CREATE TABLE IF NOT EXISTS records (
                collection  TEXT NOT NULL,
                id          TEXT NOT NULL,
                payload     TEXT NOT NULL,
                uploaded_at TEXT NOT NULL,
                PRIMARY KEY (collection, id)
            );
            CREATE INDEX IF NOT EXISTS idx_records_uploaded_at
                ON records (uploaded_at);",
        )
        .map_err(|e| StoreError::Unavailable(format!("schema init failed: {e}")))?;
        info!(collection, "Store ready");
        Ok(Self {
            conn,
            collection: collection.to_string(),
        })
    }

    /// Number of rows currently held for this collection.
    pub fn count(&self) -> Result<usize, StoreError> {
        let n: usize = self.conn.query_row(
            "SELECT COUNT(*) FROM records WHERE collection = ?1",
            params![self.collection],
            |row| row.get(0),
        )?;
        Ok(n)
    }
}

impl RecordStore for SqliteStore {
    #[instrument(level = "info", skip_all, fields(collection = %self.collection, count = records.len()))]
    async fn upsert_batch<R: Record>(
        &mut self,
        records: &[R],
    ) -> Result<UpsertOutcome, StoreError> {
        let mut outcome = UpsertOutcome::default();
        let uploaded_at = now_iso();
        let tx = self.conn.transaction()?;

        for record in records {
            let payload = match serde_json::to_string(record) {
                Ok(payload) => payload,
                Err(e) => {
                    warn!(id = record.id(), error = %e, "Record not serializable; skipping");
                    outcome.failed += 1;
                    continue;
                }
            };

            let existed: bool = tx.query_row(
                "SELECT EXISTS(SELECT 1 FROM records WHERE collection = ?1 AND id = ?2)",
                params![self.collection, record.id()],
                |row| row.get(0),
            )?;

            let written = tx.execute(
                "INSERT INTO records (collection, id, payload, uploaded_at)
                 VALUES (?1, ?2, ?3, ?4)
                 ON CONFLICT (collection, id) DO UPDATE SET
                     payload = excluded.payload,
                     uploaded_at = excluded.uploaded_at",
                params![self.collection, record.id(), payload, uploaded_at],
            );

            match written {
                Ok(_) if existed => outcome.updated += 1,
                Ok(_) => outcome.inserted += 1,
                Err(e) => {
                    warn!(id = record.id(), error = %e, "Upsert failed for record");
                    outcome.failed += 1;
                }
            }
        }

        tx.commit()?;
        info!(%outcome, "Upserted batch");
        Ok(outcome)
    }
}

/// Drive a batch stream into a store, one upsert batch at a time.
///
/// A failed batch write is reported and counted but does not stop the run;
/// an unavailable store does.
pub async fn stream_to_store<B, St>(
    stream: &mut B,
    store: &mut St,
) -> Result<UpsertOutcome, ScrapeError>
where
    B: BatchStream,
    St: RecordStore,
{
    let mut totals = UpsertOutcome::default();
    let mut batches = 0usize;

    while let Some(records) = stream.next_batch().await? {
        batches += 1;
        if records.is_empty() {
            continue;
        }
        match store.upsert_batch(&records).await {
            Ok(outcome) => totals.merge(&outcome),
            Err(e @ StoreError::Unavailable(_)) => return Err(e.into()),
            Err(e) => {
                error!(batch = batches, error = %e, "Batch write failed; continuing with next batch");
                totals.failed += records.len();
            }
        }
    }

    info!(batches, %totals, "Store upload complete");
    Ok(totals)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Serialize;
    use std::collections::VecDeque;

    #[derive(Debug, Clone, Serialize)]
    struct Rec {
        id: String,
        body: String,
    }

    impl Record for Rec {
        fn id(&self) -> &str {
            &self.id
        }
    }

    fn rec(id: &str, body: &str) -> Rec {
        Rec {
            id: id.to_string(),
            body: body.to_string(),
        }
    }

    #[tokio::test]
    async fn test_upsert_inserts_then_updates() {
        let mut store = SqliteStore::open_in_memory("articles").unwrap();

        let first = store
            .upsert_batch(&[rec("h1", "v1"), rec("h2", "v1")])
            .await
            .unwrap();
        assert_eq!(first.inserted, 2);
        assert_eq!(first.updated, 0);

        // Same ids again: updates, not duplicates
        let second = store
            .upsert_batch(&[rec("h1", "v2"), rec("h2", "v2")])
            .await
            .unwrap();
        assert_eq!(second.inserted, 0);
        assert_eq!(second.updated, 2);
        assert_eq!(store.count().unwrap(), 2);
    }

    #[tokio::test]
    async fn test_upsert_replaces_payload() {
        let mut store = SqliteStore::open_in_memory("articles").unwrap();
        store.upsert_batch(&[rec("h1", "old")]).await.unwrap();
        store.upsert_batch(&[rec("h1", "new")]).await.unwrap();

        let payload: String = store
            .conn
            .query_row(
                "SELECT payload FROM records WHERE collection = 'articles' AND id = 'h1'",
                [],
                |row| row.get(0),
            )
            .unwrap();
        assert!(payload.contains("new"));
    }

    #[tokio::test]
    async fn test_collections_are_isolated() {
        let mut articles = SqliteStore::open_in_memory("articles").unwrap();
        articles.upsert_batch(&[rec("h1", "v")]).await.unwrap();
        assert_eq!(articles.count().unwrap(), 1);

        let indicators = SqliteStore::open_in_memory("indicators").unwrap();
        assert_eq!(indicators.count().unwrap(), 0);
    }

    struct FixedStream {
        batches: VecDeque<Vec<Rec>>,
    }

    impl BatchStream for FixedStream {
        type Item = Rec;

        async fn next_batch(&mut self) -> Result<Option<Vec<Rec>>, ScrapeError> {
            Ok(self.batches.pop_front())
        }
    }

    #[tokio::test]
    async fn test_stream_to_store_totals() {
        let mut store = SqliteStore::open_in_memory("articles").unwrap();
        let mut stream = FixedStream {
            batches: VecDeque::from(vec![
                vec![rec("a", "1"), rec("b", "1")],
                vec![],
                // "a" repeats in a later batch: update, not insert
                vec![rec("a", "2"), rec("c", "1")],
            ]),
        };

        let totals = stream_to_store(&mut stream, &mut store).await.unwrap();
        assert_eq!(totals.inserted, 3);
        assert_eq!(totals.updated, 1);
        assert_eq!(totals.failed, 0);
        assert_eq!(store.count().unwrap(), 3);
    }

    /// Fails every batch with a non-fatal write error.
    struct FailingStore;

    impl RecordStore for FailingStore {
        async fn upsert_batch<R: Record>(
            &mut self,
            _records: &[R],
        ) -> Result<UpsertOutcome, StoreError> {
            Err(StoreError::Write(rusqlite::Error::InvalidQuery))
        }
    }

    #[tokio::test]
    async fn test_failed_batches_are_counted_not_fatal() {
        let mut store = FailingStore;
        let mut stream = FixedStream {
            batches: VecDeque::from(vec![vec![rec("a", "1")], vec![rec("b", "1"), rec("c", "1")]]),
        };

        let totals = stream_to_store(&mut stream, &mut store).await.unwrap();
        assert_eq!(totals.failed, 3);
        assert_eq!(totals.inserted, 0);
    }

    /// Reports the destination as gone on the second batch.
    struct VanishingStore {
        batches_seen: usize,
    }

    impl RecordStore for VanishingStore {
        async fn upsert_batch<R: Record>(
            &mut self,
            records: &[R],
        ) -> Result<UpsertOutcome, StoreError> {
            self.batches_seen += 1;
            if self.batches_seen > 1 {
                return Err(StoreError::Unavailable("connection lost".to_string()));
            }
            Ok(UpsertOutcome {
                inserted: records.len(),
                ..Default::default()
            })
        }
    }

    #[tokio::test]
    async fn test_unavailable_store_is_fatal() {
        let mut store = VanishingStore { batches_seen: 0 };
        let mut stream = FixedStream {
            batches: VecDeque::from(vec![vec![rec("a", "1")], vec![rec("b", "1")]]),
        };

        let err = stream_to_store(&mut stream, &mut store).await.unwrap_err();
        assert!(err.to_string().contains("connection lost"));
    }
}
