//! Terminal stand-ins for the platform collaborators.
//!
//! `ctxa run` drives the real pipeline without any accessibility or window
//! APIs: stdin plays the focused text field, the overlay is printed to
//! stdout, and injection appends to the simulated field.

use std::io::Write;
use std::sync::Mutex;

use crate::models::{Anchor, FocusInfo, Suggestion};
use crate::traits::{FocusSource, Overlay, TextInjector};

/// The simulated text field.
pub struct ConsoleField {
    state: Mutex<FocusInfo>,
}

impl ConsoleField {
    pub fn new(app_name: impl Into<String>) -> Self {
        Self {
            state: Mutex::new(FocusInfo::new(app_name, "")),
        }
    }

    pub fn set_text(&self, text: impl Into<String>) {
        self.lock().current_text = text.into();
    }

    pub fn set_app(&self, app_name: impl Into<String>) {
        self.lock().app_name = app_name.into();
    }

    pub fn snapshot(&self) -> FocusInfo {
        self.lock().clone()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, FocusInfo> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }
}

impl FocusSource for ConsoleField {
    fn focused(&self) -> Option<FocusInfo> {
        Some(self.snapshot())
    }
}

impl TextInjector for ConsoleField {
    fn inject(&self, text: &str) -> bool {
        let mut field = self.lock();
        if !field.current_text.is_empty() && !field.current_text.ends_with(char::is_whitespace) {
            field.current_text.push(' ');
        }
        field.current_text.push_str(text);
        println!("  ✓ {}", field.current_text);
        true
    }
}

/// Prints the list, redrawing it when the selection moves.
#[derive(Default)]
pub struct ConsoleOverlay {
    shown: Mutex<Vec<Suggestion>>,
}

impl ConsoleOverlay {
    pub fn new() -> Self {
        Self::default()
    }

    fn render(&self, suggestions: &[Suggestion], selected: usize) {
        let mut out = std::io::stdout().lock();
        for s in suggestions {
            let marker = if s.index == selected { '>' } else { ' ' };
            let _ = writeln!(out, "  {} {}. {}", marker, s.index + 1, s.text);
        }
        let _ = out.flush();
    }
}

impl Overlay for ConsoleOverlay {
    fn show(&self, suggestions: &[Suggestion], _anchor: Anchor) {
        let mut shown = self.shown.lock().unwrap_or_else(|e| e.into_inner());
        *shown = suggestions.to_vec();
        self.render(&shown, 0);
    }

    fn hide(&self) {
        let mut shown = self.shown.lock().unwrap_or_else(|e| e.into_inner());
        if !shown.is_empty() {
            println!("  (suggestions hidden)");
        }
        shown.clear();
    }

    fn set_selected_index(&self, index: usize) {
        let shown = self.shown.lock().unwrap_or_else(|e| e.into_inner());
        self.render(&shown, index);
    }
}
