//! Collaborator contracts the suggestion pipeline depends on.
//!
//! The pipeline owns no platform code. Reading the focused field, drawing
//! the overlay, injecting text and calling a language model all sit behind
//! these traits:
//!
//! ```text
//!  FocusSource ──▶ ┌─────────────────────┐ ──▶ Overlay
//!                  │ PipelineCoordinator │
//!  Generator  ◀──▶ └─────────────────────┘ ──▶ TextInjector
//! ```
//!
//! `FocusSource`, `Overlay` and `TextInjector` are synchronous and must be
//! cheap: they are called from the event context or the serialized
//! application task. [`SuggestionGenerator`] is async and may be slow; it
//! only ever runs on a worker task.

use async_trait::async_trait;

use crate::error::GenerationError;
use crate::models::{Anchor, FocusInfo, Suggestion};

/// Snapshot of the focused text field, read on each trigger.
pub trait FocusSource: Send + Sync {
    /// `None` when no text element has focus.
    fn focused(&self) -> Option<FocusInfo>;
}

/// Produces ranked completions for the text in progress.
#[async_trait]
pub trait SuggestionGenerator: Send + Sync {
    async fn generate(
        &self,
        current_input: &str,
        context: &str,
        app_name: &str,
    ) -> Result<Vec<Suggestion>, GenerationError>;
}

/// Writes accepted text into the focused field.
pub trait TextInjector: Send + Sync {
    /// Returns whether the text landed. Failures are not retried.
    fn inject(&self, text: &str) -> bool;
}

/// Renders the suggestion list. Positioning and clamping are its own concern.
pub trait Overlay: Send + Sync {
    fn show(&self, suggestions: &[Suggestion], anchor: Anchor);
    fn hide(&self);
    fn set_selected_index(&self, index: usize);
}
