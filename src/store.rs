//! SQLite-backed context store.
//!
//! An append-only, time-ordered log of observations. Inserts are
//! deduplicated against a trailing window and the log is kept bounded by
//! [`ContextStore::prune`]. Reads go straight to the connection pool; writes
//! (`add_entry`, `prune`) are serialized by an async writer lock so the
//! dedup probe and the insert behave as one step.
//!
//! # Lifecycle
//!
//! ```text
//! open() ──▶ add_entry / get_recent / get_by_source / search
//!            sliced_context / prune / entry_count ──▶ close()
//! ```
//!
//! Every operation on a closed store fails with [`StoreError::NotOpen`].

use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqlitePool};
use std::path::{Path, PathBuf};
use std::sync::RwLock;
use tokio::sync::Mutex;

use crate::db;
use crate::error::StoreError;
use crate::migrate;
use crate::models::{ContextEntry, EntryType, InsertOutcome, NewEntry};
use crate::slice::{self, RECENT_LIMIT, SAME_APP_LIMIT};

/// Identical `(content, source_app)` pairs inside this window are dropped.
pub const DEDUP_WINDOW_SECS: f64 = 5.0;

const SELECT_COLUMNS: &str =
    "SELECT id, source_app, source_url, content, timestamp, entry_type FROM context_entries";

/// Current wall-clock time as fractional Unix seconds.
pub fn now_secs() -> f64 {
    chrono::Utc::now().timestamp_micros() as f64 / 1_000_000.0
}

/// Per-source row count, as reported by [`ContextStore::stats`].
#[derive(Debug, Clone)]
pub struct SourceCount {
    pub source_app: String,
    pub count: i64,
    pub newest: f64,
}

/// Summary of the store contents.
#[derive(Debug, Clone)]
pub struct StoreStats {
    pub total: i64,
    pub oldest: Option<f64>,
    pub newest: Option<f64>,
    pub by_source: Vec<SourceCount>,
}

pub struct ContextStore {
    path: PathBuf,
    pool: RwLock<Option<SqlitePool>>,
    writer: Mutex<()>,
}

impl ContextStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            pool: RwLock::new(None),
            writer: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn is_open(&self) -> bool {
        self.pool
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .is_some()
    }

    /// Open the database, creating the file and schema if absent.
    /// Calling it on an already-open store is a no-op.
    pub async fn open(&self) -> Result<(), StoreError> {
        if self.is_open() {
            return Ok(());
        }
        let pool = db::connect(&self.path).await?;
        migrate::create_schema(&pool).await?;

        let mut slot = self.pool.write().unwrap_or_else(|e| e.into_inner());
        if slot.is_none() {
            *slot = Some(pool);
        }
        tracing::debug!(path = %self.path.display(), "context store opened");
        Ok(())
    }

    /// Release the pool. Later operations fail until `open()` is called again.
    pub async fn close(&self) {
        let pool = self.pool.write().unwrap_or_else(|e| e.into_inner()).take();
        if let Some(pool) = pool {
            pool.close().await;
            tracing::debug!(path = %self.path.display(), "context store closed");
        }
    }

    fn pool(&self) -> Result<SqlitePool, StoreError> {
        self.pool
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
            .ok_or(StoreError::NotOpen)
    }

    /// Store an observation unless an identical one from the same app was
    /// recorded within the last [`DEDUP_WINDOW_SECS`].
    pub async fn add_entry(&self, entry: NewEntry) -> Result<InsertOutcome, StoreError> {
        if entry.source_app.is_empty() {
            return Err(StoreError::InvalidEntry("source_app must not be empty"));
        }
        if entry.content.is_empty() {
            return Err(StoreError::InvalidEntry("content must not be empty"));
        }
        let pool = self.pool()?;
        let timestamp = entry.timestamp.unwrap_or_else(now_secs);

        let _guard = self.writer.lock().await;

        let duplicate: Option<i64> = sqlx::query_scalar(
            r#"
            SELECT id FROM context_entries
            WHERE source_app = ? AND content = ? AND timestamp > ?
            LIMIT 1
            "#,
        )
        .bind(&entry.source_app)
        .bind(&entry.content)
        .bind(timestamp - DEDUP_WINDOW_SECS)
        .fetch_optional(&pool)
        .await?;

        if duplicate.is_some() {
            tracing::trace!(app = %entry.source_app, "duplicate observation skipped");
            return Ok(InsertOutcome::Deduplicated);
        }

        let result = sqlx::query(
            r#"
            INSERT INTO context_entries (source_app, source_url, content, timestamp, entry_type)
            VALUES (?, ?, ?, ?, ?)
            "#,
        )
        .bind(&entry.source_app)
        .bind(&entry.source_url)
        .bind(&entry.content)
        .bind(timestamp)
        .bind(entry.entry_type.as_str())
        .execute(&pool)
        .await?;

        Ok(InsertOutcome::Inserted(result.last_insert_rowid()))
    }

    /// The `limit` most recent entries across all sources, newest first.
    pub async fn get_recent(&self, limit: usize) -> Result<Vec<ContextEntry>, StoreError> {
        let pool = self.pool()?;
        let rows = sqlx::query(&format!(
            "{} ORDER BY timestamp DESC, id DESC LIMIT ?",
            SELECT_COLUMNS
        ))
        .bind(limit as i64)
        .fetch_all(&pool)
        .await?;
        entries_from_rows(&rows)
    }

    /// The `limit` most recent entries for one source, newest first.
    pub async fn get_by_source(
        &self,
        source_app: &str,
        limit: usize,
    ) -> Result<Vec<ContextEntry>, StoreError> {
        let pool = self.pool()?;
        let rows = sqlx::query(&format!(
            "{} WHERE source_app = ? ORDER BY timestamp DESC, id DESC LIMIT ?",
            SELECT_COLUMNS
        ))
        .bind(source_app)
        .bind(limit as i64)
        .fetch_all(&pool)
        .await?;
        entries_from_rows(&rows)
    }

    /// Entries whose content contains `query` (case-sensitive), newest first.
    pub async fn search(&self, query: &str, limit: usize) -> Result<Vec<ContextEntry>, StoreError> {
        let pool = self.pool()?;
        let rows = sqlx::query(&format!(
            "{} WHERE instr(content, ?) > 0 ORDER BY timestamp DESC, id DESC LIMIT ?",
            SELECT_COLUMNS
        ))
        .bind(query)
        .bind(limit as i64)
        .fetch_all(&pool)
        .await?;
        entries_from_rows(&rows)
    }

    /// Character-budgeted context for `source_app`. See [`crate::slice`].
    pub async fn sliced_context(
        &self,
        source_app: &str,
        max_chars: usize,
    ) -> Result<String, StoreError> {
        let same_app = self.get_by_source(source_app, SAME_APP_LIMIT).await?;
        let recent = self.get_recent(RECENT_LIMIT).await?;
        Ok(slice::build_slice(source_app, &same_app, &recent, max_chars))
    }

    /// Drop entries older than `max_age_hours`, then the oldest surplus over
    /// `max_entries`. Returns the total number of rows removed.
    pub async fn prune(&self, max_age_hours: u64, max_entries: usize) -> Result<u64, StoreError> {
        self.prune_at(now_secs(), max_age_hours, max_entries).await
    }

    pub(crate) async fn prune_at(
        &self,
        now: f64,
        max_age_hours: u64,
        max_entries: usize,
    ) -> Result<u64, StoreError> {
        let pool = self.pool()?;
        let cutoff = now - (max_age_hours as f64) * 3600.0;

        let _guard = self.writer.lock().await;
        let mut tx = pool.begin().await?;

        let aged = sqlx::query("DELETE FROM context_entries WHERE timestamp < ?")
            .bind(cutoff)
            .execute(&mut *tx)
            .await?
            .rows_affected();

        let remaining: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM context_entries")
            .fetch_one(&mut *tx)
            .await?;

        let mut trimmed = 0;
        let excess = remaining - max_entries as i64;
        if excess > 0 {
            trimmed = sqlx::query(
                r#"
                DELETE FROM context_entries WHERE id IN (
                    SELECT id FROM context_entries
                    ORDER BY timestamp ASC, id ASC
                    LIMIT ?
                )
                "#,
            )
            .bind(excess)
            .execute(&mut *tx)
            .await?
            .rows_affected();
        }

        tx.commit().await?;

        if aged + trimmed > 0 {
            tracing::debug!(aged, trimmed, "pruned context entries");
        }
        Ok(aged + trimmed)
    }

    pub async fn entry_count(&self) -> Result<i64, StoreError> {
        let pool = self.pool()?;
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM context_entries")
            .fetch_one(&pool)
            .await?;
        Ok(count)
    }

    pub async fn stats(&self) -> Result<StoreStats, StoreError> {
        let pool = self.pool()?;
        let row = sqlx::query(
            "SELECT COUNT(*) AS total, MIN(timestamp) AS oldest, MAX(timestamp) AS newest FROM context_entries",
        )
        .fetch_one(&pool)
        .await?;

        let source_rows = sqlx::query(
            r#"
            SELECT source_app, COUNT(*) AS count, MAX(timestamp) AS newest
            FROM context_entries
            GROUP BY source_app
            ORDER BY count DESC, source_app ASC
            "#,
        )
        .fetch_all(&pool)
        .await?;

        let by_source = source_rows
            .iter()
            .map(|r| -> Result<SourceCount, StoreError> {
                Ok(SourceCount {
                    source_app: r.try_get("source_app")?,
                    count: r.try_get("count")?,
                    newest: r.try_get("newest")?,
                })
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(StoreStats {
            total: row.try_get("total")?,
            oldest: row.try_get("oldest")?,
            newest: row.try_get("newest")?,
            by_source,
        })
    }
}

/// Decode rows, skipping any whose `entry_type` this build does not know.
fn entries_from_rows(rows: &[SqliteRow]) -> Result<Vec<ContextEntry>, StoreError> {
    let mut entries = Vec::with_capacity(rows.len());
    for row in rows {
        if let Some(entry) = entry_from_row(row)? {
            entries.push(entry);
        }
    }
    Ok(entries)
}

fn entry_from_row(row: &SqliteRow) -> Result<Option<ContextEntry>, StoreError> {
    let id: i64 = row.try_get("id")?;
    let raw_type: String = row.try_get("entry_type")?;
    let entry_type = match raw_type.parse::<EntryType>() {
        Ok(t) => t,
        Err(_) => {
            tracing::warn!(id, entry_type = %raw_type, "skipping entry with unknown type");
            return Ok(None);
        }
    };

    Ok(Some(ContextEntry {
        id,
        source_app: row.try_get("source_app")?,
        source_url: row.try_get("source_url")?,
        content: row.try_get("content")?,
        timestamp: row.try_get("timestamp")?,
        entry_type,
    }))
}
