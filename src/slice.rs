//! Character-budgeted context assembly.
//!
//! A slice is built in two tiers from entries the caller has already fetched
//! newest-first:
//!
//! 1. Same-app history, each line formatted as `[entry_type] content`.
//! 2. If budget remains, recent history from other apps, formatted as
//!    `[source_app] content`. Entries from the target app are skipped here.
//!
//! Within each tier lines are appended until the next one would overflow;
//! that line and everything after it in the tier is dropped, never truncated.
//! Only line lengths count toward the budget. The joining newlines do not,
//! so the result can exceed `max_chars` by at most one character per line.

use crate::models::ContextEntry;

/// Same-app entries consulted for the first tier.
pub const SAME_APP_LIMIT: usize = 20;
/// Cross-app entries consulted for the second tier.
pub const RECENT_LIMIT: usize = 30;

struct Budget {
    lines: Vec<String>,
    used: usize,
    max_chars: usize,
}

impl Budget {
    fn new(max_chars: usize) -> Self {
        Self {
            lines: Vec::new(),
            used: 0,
            max_chars,
        }
    }

    /// Append `line` if it fits. Returns false on overflow.
    fn push(&mut self, line: String) -> bool {
        let cost = line.chars().count();
        if self.used + cost > self.max_chars {
            return false;
        }
        self.used += cost;
        self.lines.push(line);
        true
    }

    fn has_room(&self) -> bool {
        self.used < self.max_chars
    }
}

/// Assemble a slice for `source_app` from pre-fetched, newest-first entries.
pub fn build_slice(
    source_app: &str,
    same_app: &[ContextEntry],
    recent: &[ContextEntry],
    max_chars: usize,
) -> String {
    let mut budget = Budget::new(max_chars);

    for entry in same_app {
        if !budget.push(format!("[{}] {}", entry.entry_type, entry.content)) {
            break;
        }
    }

    if budget.has_room() {
        for entry in recent.iter().filter(|e| e.source_app != source_app) {
            if !budget.push(format!("[{}] {}", entry.source_app, entry.content)) {
                break;
            }
        }
    }

    budget.lines.join("\n")
}
