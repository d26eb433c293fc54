//! Write-side commands: recording an entry by hand and pruning.

use anyhow::Result;

use crate::config::Config;
use crate::models::{EntryType, InsertOutcome, NewEntry};
use crate::search::open_store;

/// Record one entry, as an observer would.
pub async fn run_add(
    config: &Config,
    app: &str,
    content: &str,
    entry_type: EntryType,
    url: Option<String>,
) -> Result<()> {
    let store = open_store(config).await?;

    let mut entry = NewEntry::new(app, content, entry_type);
    if let Some(url) = url {
        entry = entry.with_url(url);
    }

    match store.add_entry(entry).await? {
        InsertOutcome::Inserted(id) => println!("added entry {}", id),
        InsertOutcome::Deduplicated => {
            println!("duplicate within the last few seconds; skipped")
        }
    }

    store.close().await;
    Ok(())
}

/// Prune by age and count. CLI overrides fall back to the `[context]` bounds.
pub async fn run_prune(
    config: &Config,
    max_age_hours: Option<u64>,
    max_entries: Option<usize>,
) -> Result<()> {
    let max_age_hours = max_age_hours.unwrap_or(config.context.max_age_hours);
    let max_entries = max_entries.unwrap_or(config.context.max_entries);

    let store = open_store(config).await?;
    let removed = store.prune(max_age_hours, max_entries).await?;
    let remaining = store.entry_count().await?;

    println!("pruned: {}", removed);
    println!("remaining: {}", remaining);

    store.close().await;
    Ok(())
}
