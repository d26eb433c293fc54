//! Core data models used throughout the autocompleter.
//!
//! These types represent the observations kept in the context store, the
//! suggestions produced by a generator, and the focus snapshot the input
//! layer hands to the pipeline on every trigger.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Kind of observation stored in the context log.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntryType {
    /// Passively observed window content.
    VisibleText,
    /// Live value of the focused field.
    UserInput,
    /// Text the user chose to inject.
    AcceptedSuggestion,
}

impl EntryType {
    pub fn as_str(&self) -> &'static str {
        match self {
            EntryType::VisibleText => "visible_text",
            EntryType::UserInput => "user_input",
            EntryType::AcceptedSuggestion => "accepted_suggestion",
        }
    }
}

impl fmt::Display for EntryType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EntryType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "visible_text" => Ok(EntryType::VisibleText),
            "user_input" => Ok(EntryType::UserInput),
            "accepted_suggestion" => Ok(EntryType::AcceptedSuggestion),
            other => Err(format!(
                "unknown entry type '{}': expected visible_text, user_input or accepted_suggestion",
                other
            )),
        }
    }
}

/// A persisted observation. Never mutated after insert.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ContextEntry {
    pub id: i64,
    pub source_app: String,
    /// Empty when the observation has no URL.
    pub source_url: String,
    pub content: String,
    /// Seconds since the Unix epoch.
    pub timestamp: f64,
    pub entry_type: EntryType,
}

/// An insert request for [`ContextStore::add_entry`](crate::store::ContextStore::add_entry).
#[derive(Debug, Clone)]
pub struct NewEntry {
    pub source_app: String,
    pub content: String,
    pub entry_type: EntryType,
    pub source_url: String,
    /// `None` means "now".
    pub timestamp: Option<f64>,
}

impl NewEntry {
    pub fn new(
        source_app: impl Into<String>,
        content: impl Into<String>,
        entry_type: EntryType,
    ) -> Self {
        Self {
            source_app: source_app.into(),
            content: content.into(),
            entry_type,
            source_url: String::new(),
            timestamp: None,
        }
    }

    pub fn with_url(mut self, url: impl Into<String>) -> Self {
        self.source_url = url.into();
        self
    }

    pub fn at(mut self, timestamp: f64) -> Self {
        self.timestamp = Some(timestamp);
        self
    }
}

/// Result of an insert: a fresh row id, or a silent drop by the dedup window.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InsertOutcome {
    Inserted(i64),
    Deduplicated,
}

impl InsertOutcome {
    pub fn id(&self) -> Option<i64> {
        match self {
            InsertOutcome::Inserted(id) => Some(*id),
            InsertOutcome::Deduplicated => None,
        }
    }
}

/// One ranked completion from a generation batch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Suggestion {
    pub text: String,
    /// 0-based rank within its batch.
    pub index: usize,
}

impl Suggestion {
    pub fn new(text: impl Into<String>, index: usize) -> Self {
        Self {
            text: text.into(),
            index,
        }
    }

    /// Build a ranked batch from texts in generator order.
    pub fn ranked<I, S>(texts: I) -> Vec<Suggestion>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        texts
            .into_iter()
            .enumerate()
            .map(|(index, text)| Suggestion::new(text, index))
            .collect()
    }
}

/// Screen position the overlay should anchor to.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Anchor {
    pub x: f64,
    pub y: f64,
}

impl Anchor {
    /// Used when the input layer cannot locate the caret or the field.
    pub const FALLBACK: Anchor = Anchor { x: 100.0, y: 100.0 };

    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

/// Synchronous snapshot of the focused text field.
#[derive(Debug, Clone, PartialEq)]
pub struct FocusInfo {
    pub app_name: String,
    pub current_text: String,
    pub anchor: Option<Anchor>,
}

impl FocusInfo {
    pub fn new(app_name: impl Into<String>, current_text: impl Into<String>) -> Self {
        Self {
            app_name: app_name.into(),
            current_text: current_text.into(),
            anchor: None,
        }
    }

    pub fn with_anchor(mut self, anchor: Anchor) -> Self {
        self.anchor = Some(anchor);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_entry_type_string_forms() {
        for ty in [
            EntryType::VisibleText,
            EntryType::UserInput,
            EntryType::AcceptedSuggestion,
        ] {
            assert_eq!(ty.as_str().parse::<EntryType>().unwrap(), ty);
        }
        assert!("conversation".parse::<EntryType>().is_err());
    }

    #[test]
    fn test_ranked_preserves_generator_order() {
        let batch = Suggestion::ranked(["b", "a", "b"]);
        let texts: Vec<&str> = batch.iter().map(|s| s.text.as_str()).collect();
        assert_eq!(texts, vec!["b", "a", "b"]);
        assert_eq!(batch[2].index, 2);
    }

    #[test]
    fn test_insert_outcome_id() {
        assert_eq!(InsertOutcome::Inserted(7).id(), Some(7));
        assert_eq!(InsertOutcome::Deduplicated.id(), None);
    }
}
