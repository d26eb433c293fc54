//! The suggestion state machine, free of I/O.
//!
//! Every transition consumes one input and returns the [`Effect`]s the
//! caller must carry out, in order. The coordinator runs this on a single
//! task; tests drive it directly with deterministic input sequences.

use std::fmt;
use std::time::Instant;

use crate::debounce::Debouncer;
use crate::models::{Anchor, FocusInfo, Suggestion};

/// Identifies one dispatched generation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Token(u64);

impl Token {
    pub fn value(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum PipelineState {
    Idle,
    AwaitingGeneration {
        token: Token,
        anchor: Anchor,
    },
    Showing {
        suggestions: Vec<Suggestion>,
        selected_index: usize,
        anchor: Anchor,
    },
}

impl PipelineState {
    pub fn is_showing(&self) -> bool {
        matches!(self, PipelineState::Showing { .. })
    }
}

/// Work handed to a generation worker.
#[derive(Debug, Clone, PartialEq)]
pub struct GenerationRequest {
    pub token: Token,
    pub current_input: String,
    pub app_name: String,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Effect {
    Show {
        suggestions: Vec<Suggestion>,
        anchor: Anchor,
    },
    Hide,
    Select(usize),
    Dispatch(GenerationRequest),
    Inject(Suggestion),
}

pub struct PipelineMachine {
    state: PipelineState,
    debouncer: Debouncer,
    next_token: u64,
    latest_token: Option<Token>,
}

impl PipelineMachine {
    pub fn new(debouncer: Debouncer) -> Self {
        Self {
            state: PipelineState::Idle,
            debouncer,
            next_token: 1,
            latest_token: None,
        }
    }

    pub fn state(&self) -> &PipelineState {
        &self.state
    }

    pub fn latest_token(&self) -> Option<Token> {
        self.latest_token
    }

    /// A trigger toggles a visible overlay off; otherwise it may start a
    /// new generation, superseding any in flight.
    pub fn trigger(&mut self, focus: Option<FocusInfo>, at: Instant) -> Vec<Effect> {
        if self.state.is_showing() {
            tracing::debug!("trigger while showing: hiding overlay");
            self.state = PipelineState::Idle;
            return vec![Effect::Hide];
        }

        let focus = match focus {
            Some(f) => f,
            None => {
                tracing::debug!("trigger ignored: no focused text element");
                return Vec::new();
            }
        };
        if focus.current_text.trim().is_empty() {
            tracing::debug!(app = %focus.app_name, "trigger ignored: input is empty");
            return Vec::new();
        }
        if !self.debouncer.try_acquire(at) {
            tracing::debug!("trigger dropped by debounce");
            return Vec::new();
        }

        let token = Token(self.next_token);
        self.next_token += 1;
        self.latest_token = Some(token);
        self.state = PipelineState::AwaitingGeneration {
            token,
            anchor: focus.anchor.unwrap_or(Anchor::FALLBACK),
        };

        vec![Effect::Dispatch(GenerationRequest {
            token,
            current_input: focus.current_text,
            app_name: focus.app_name,
        })]
    }

    /// Resolve a finished generation. Results for anything but the latest
    /// token are discarded without touching the state.
    pub fn deliver(&mut self, token: Token, suggestions: Vec<Suggestion>) -> Vec<Effect> {
        let anchor = match &self.state {
            PipelineState::AwaitingGeneration { token: current, anchor }
                if Some(token) == self.latest_token && *current == token =>
            {
                *anchor
            }
            _ => {
                tracing::debug!(%token, "discarding superseded generation result");
                return Vec::new();
            }
        };

        if suggestions.is_empty() {
            self.state = PipelineState::Idle;
            return Vec::new();
        }

        self.state = PipelineState::Showing {
            suggestions: suggestions.clone(),
            selected_index: 0,
            anchor,
        };
        vec![Effect::Show {
            suggestions,
            anchor,
        }]
    }

    /// Move the selection by `delta`, wrapping in both directions.
    pub fn navigate(&mut self, delta: isize) -> Vec<Effect> {
        match &mut self.state {
            PipelineState::Showing {
                suggestions,
                selected_index,
                ..
            } => {
                let len = suggestions.len() as isize;
                *selected_index = (*selected_index as isize + delta).rem_euclid(len) as usize;
                vec![Effect::Select(*selected_index)]
            }
            _ => Vec::new(),
        }
    }

    /// Take the selected suggestion and return to idle.
    pub fn accept(&mut self) -> (Option<Suggestion>, Vec<Effect>) {
        match std::mem::replace(&mut self.state, PipelineState::Idle) {
            PipelineState::Showing {
                mut suggestions,
                selected_index,
                ..
            } => {
                let chosen = suggestions.swap_remove(selected_index);
                (
                    Some(chosen.clone()),
                    vec![Effect::Hide, Effect::Inject(chosen)],
                )
            }
            other => {
                self.state = other;
                (None, Vec::new())
            }
        }
    }

    pub fn dismiss(&mut self) -> Vec<Effect> {
        if self.state.is_showing() {
            self.state = PipelineState::Idle;
            vec![Effect::Hide]
        } else {
            Vec::new()
        }
    }
}
