//! Store statistics and health overview.
//!
//! Summarizes what has been captured: total entries, the time span they
//! cover, and a per-app breakdown. Used by `ctxa stats` to check that
//! observers are feeding the store and that pruning keeps it bounded.

use anyhow::Result;

use crate::config::Config;
use crate::search::{format_ts_iso, open_store};
use crate::store::now_secs;

/// Run the stats command: query the store and print a summary.
pub async fn run_stats(config: &Config) -> Result<()> {
    let store = open_store(config).await?;
    let stats = store.stats().await?;

    let db_size = std::fs::metadata(&config.db.path)
        .map(|m| m.len())
        .unwrap_or(0);

    println!("Context Autocomplete — Store Stats");
    println!("==================================");
    println!();
    println!("  Database:    {}", config.db.path.display());
    println!("  Size:        {}", format_bytes(db_size));
    println!();
    println!("  Entries:     {}", stats.total);
    if let (Some(oldest), Some(newest)) = (stats.oldest, stats.newest) {
        println!("  Oldest:      {}", format_ts_iso(oldest));
        println!("  Newest:      {}", format_ts_relative(newest, now_secs()));
    }
    println!(
        "  Limits:      {} entries, {} hours",
        config.context.max_entries, config.context.max_age_hours
    );

    if !stats.by_source.is_empty() {
        println!();
        println!("  By app:");
        println!("  {:<32} {:>8}   {}", "APP", "ENTRIES", "LAST SEEN");
        println!("  {}", "-".repeat(60));

        for s in &stats.by_source {
            println!(
                "  {:<32} {:>8}   {}",
                s.source_app,
                s.count,
                format_ts_relative(s.newest, now_secs())
            );
        }
    }

    println!();

    store.close().await;
    Ok(())
}

/// Format a byte count as a human-readable string.
fn format_bytes(bytes: u64) -> String {
    if bytes < 1024 {
        format!("{} B", bytes)
    } else if bytes < 1024 * 1024 {
        format!("{:.1} KB", bytes as f64 / 1024.0)
    } else if bytes < 1024 * 1024 * 1024 {
        format!("{:.1} MB", bytes as f64 / (1024.0 * 1024.0))
    } else {
        format!("{:.2} GB", bytes as f64 / (1024.0 * 1024.0 * 1024.0))
    }
}

/// Format a timestamp relative to `now` (e.g. "3 hours ago").
fn format_ts_relative(ts: f64, now: f64) -> String {
    let delta = (now - ts) as i64;

    if delta < 0 {
        return format_ts_iso(ts);
    }

    if delta < 60 {
        "just now".to_string()
    } else if delta < 3600 {
        let mins = delta / 60;
        format!("{} min{} ago", mins, if mins == 1 { "" } else { "s" })
    } else if delta < 86400 {
        let hours = delta / 3600;
        format!("{} hour{} ago", hours, if hours == 1 { "" } else { "s" })
    } else if delta < 86400 * 30 {
        let days = delta / 86400;
        format!("{} day{} ago", days, if days == 1 { "" } else { "s" })
    } else {
        format_ts_iso(ts)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_bytes() {
        assert_eq!(format_bytes(512), "512 B");
        assert_eq!(format_bytes(2048), "2.0 KB");
        assert_eq!(format_bytes(3 * 1024 * 1024), "3.0 MB");
    }

    #[test]
    fn test_format_ts_relative() {
        let now = 1_000_000.0;
        assert_eq!(format_ts_relative(now - 5.0, now), "just now");
        assert_eq!(format_ts_relative(now - 60.0, now), "1 min ago");
        assert_eq!(format_ts_relative(now - 7200.0, now), "2 hours ago");
        assert_eq!(format_ts_relative(now - 3.0 * 86400.0, now), "3 days ago");
        assert_eq!(format_ts_relative(now + 120.0, now), format_ts_iso(now + 120.0));
    }
}
