//! Read-side commands: recent entries, per-app history, substring search,
//! and the sliced context window.
//!
//! Each command opens its own store handle, prints to stdout, and closes
//! the pool before returning. Used by `ctxa recent`, `ctxa by-source`,
//! `ctxa search` and `ctxa slice`.

use anyhow::{Context, Result};

use crate::config::Config;
use crate::models::ContextEntry;
use crate::store::ContextStore;

/// Default row count for listing commands.
pub const DEFAULT_LIMIT: usize = 20;

/// Open the configured store, creating the database on first use.
pub async fn open_store(config: &Config) -> Result<ContextStore> {
    let store = ContextStore::new(&config.db.path);
    store
        .open()
        .await
        .with_context(|| format!("Failed to open context store at {}", config.db.path.display()))?;
    Ok(store)
}

pub async fn run_recent(config: &Config, limit: Option<usize>) -> Result<()> {
    let store = open_store(config).await?;
    let entries = store.get_recent(limit.unwrap_or(DEFAULT_LIMIT)).await?;
    print_entries(&entries);
    store.close().await;
    Ok(())
}

pub async fn run_by_source(config: &Config, app: &str, limit: Option<usize>) -> Result<()> {
    let store = open_store(config).await?;
    let entries = store
        .get_by_source(app, limit.unwrap_or(DEFAULT_LIMIT))
        .await?;
    print_entries(&entries);
    store.close().await;
    Ok(())
}

/// Case-sensitive substring search over entry content.
pub async fn run_search(config: &Config, query: &str, limit: Option<usize>) -> Result<()> {
    let store = open_store(config).await?;
    let entries = store.search(query, limit.unwrap_or(DEFAULT_LIMIT)).await?;
    print_entries(&entries);
    store.close().await;
    Ok(())
}

/// Print the context window the generator would receive for `app`.
pub async fn run_slice(config: &Config, app: &str, max_chars: Option<usize>) -> Result<()> {
    let store = open_store(config).await?;
    let max_chars = max_chars.unwrap_or(config.context.window_chars);
    let slice = store.sliced_context(app, max_chars).await?;

    if slice.is_empty() {
        println!("(no context)");
    } else {
        println!("{}", slice);
    }
    tracing::debug!(chars = slice.chars().count(), max_chars, "slice built");

    store.close().await;
    Ok(())
}

fn print_entries(entries: &[ContextEntry]) {
    if entries.is_empty() {
        println!("No results.");
        return;
    }

    for (i, entry) in entries.iter().enumerate() {
        println!(
            "{}. [{}] {} ({})",
            i + 1,
            entry.entry_type,
            entry.source_app,
            format_ts_iso(entry.timestamp)
        );
        if !entry.source_url.is_empty() {
            println!("    url: {}", entry.source_url);
        }
        println!("    content: \"{}\"", excerpt(&entry.content, 200));
        println!("    id: {}", entry.id);
        println!();
    }
}

/// One-line excerpt capped at `max` characters.
fn excerpt(content: &str, max: usize) -> String {
    let flat = content.replace('\n', " ");
    let flat = flat.trim();
    if flat.chars().count() <= max {
        return flat.to_string();
    }
    let mut out: String = flat.chars().take(max).collect();
    out.push('…');
    out
}

pub(crate) fn format_ts_iso(ts: f64) -> String {
    let micros = (ts * 1_000_000.0) as i64;
    chrono::DateTime::from_timestamp_micros(micros)
        .map(|dt| dt.format("%Y-%m-%d %H:%M:%S").to_string())
        .unwrap_or_else(|| ts.to_string())
}
