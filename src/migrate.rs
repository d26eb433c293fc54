use sqlx::SqlitePool;

use crate::error::StoreError;

/// Create the observation table and its access paths. Idempotent.
pub async fn create_schema(pool: &SqlitePool) -> Result<(), StoreError> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS context_entries (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            source_app TEXT NOT NULL,
            source_url TEXT NOT NULL DEFAULT '',
            content TEXT NOT NULL,
            timestamp REAL NOT NULL,
            entry_type TEXT NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        "CREATE INDEX IF NOT EXISTS idx_context_timestamp ON context_entries(timestamp DESC)",
    )
    .execute(pool)
    .await?;
    sqlx::query("CREATE INDEX IF NOT EXISTS idx_context_source_app ON context_entries(source_app, timestamp DESC)")
        .execute(pool)
        .await?;
    sqlx::query("CREATE INDEX IF NOT EXISTS idx_context_entry_type ON context_entries(entry_type)")
        .execute(pool)
        .await?;
    // Dedup probe: (source_app, content) within a trailing window
    sqlx::query(
        "CREATE INDEX IF NOT EXISTS idx_context_dedup ON context_entries(source_app, content, timestamp)",
    )
    .execute(pool)
    .await?;

    Ok(())
}
