//! The pipeline actor.
//!
//! One tokio task owns the [`PipelineMachine`] and is the only writer of
//! [`PipelineState`]. Everything else talks to it through an unbounded
//! queue:
//!
//! ```text
//!  event context          application task            worker tasks
//!  ─────────────          ────────────────            ────────────
//!  on_trigger  ──┐
//!  on_navigate ──┼──▶ queue ──▶ machine ──▶ overlay / injector / store
//!  on_accept   ──┤                 │
//!  on_dismiss  ──┘                 └──▶ spawn ──▶ slice + generate
//!                       ▲                              │
//!                       └────────── Deliver(token) ◀───┘
//! ```
//!
//! Entry points never block: they take a focus snapshot (triggers only) and
//! enqueue. Workers are never cancelled; a superseded result is discarded
//! by the token check when it arrives. A worker always delivers exactly one
//! result, even when the generator panics.

use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;

use crate::config::Config;
use crate::debounce::Debouncer;
use crate::models::{EntryType, FocusInfo, NewEntry, Suggestion};
use crate::store::ContextStore;
use crate::traits::{FocusSource, Overlay, SuggestionGenerator, TextInjector};

use super::machine::{Effect, GenerationRequest, PipelineMachine, PipelineState, Token};

/// App name recorded for accepted text when focus cannot be read back.
const UNKNOWN_APP: &str = "Unknown";

#[derive(Debug, Clone)]
pub struct PipelineSettings {
    pub debounce: Duration,
    pub context_window_chars: usize,
}

impl PipelineSettings {
    pub fn from_config(config: &Config) -> Self {
        Self {
            debounce: Duration::from_millis(config.suggestions.debounce_ms),
            context_window_chars: config.context.window_chars,
        }
    }
}

/// The external pieces the pipeline drives.
#[derive(Clone)]
pub struct Collaborators {
    pub focus: Arc<dyn FocusSource>,
    pub generator: Arc<dyn SuggestionGenerator>,
    pub injector: Arc<dyn TextInjector>,
    pub overlay: Arc<dyn Overlay>,
    pub store: Arc<ContextStore>,
}

enum Task {
    Trigger {
        focus: Option<FocusInfo>,
        /// False when the event context skipped the read because the overlay
        /// looked visible.
        focus_read: bool,
        at: Instant,
    },
    Deliver {
        token: Token,
        suggestions: Vec<Suggestion>,
    },
    Navigate(isize),
    Accept {
        reply: Option<oneshot::Sender<Option<Suggestion>>>,
    },
    Dismiss,
    Snapshot(oneshot::Sender<PipelineState>),
}

/// Handle used by the event source. Cheap to clone.
#[derive(Clone)]
pub struct PipelineCoordinator {
    tx: mpsc::UnboundedSender<Task>,
    focus: Arc<dyn FocusSource>,
    visible: Arc<AtomicBool>,
}

impl PipelineCoordinator {
    /// Start the application task. It runs until every handle is dropped.
    pub fn spawn(collaborators: Collaborators, settings: PipelineSettings) -> (Self, JoinHandle<()>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let visible = Arc::new(AtomicBool::new(false));

        let actor = Actor {
            machine: PipelineMachine::new(Debouncer::new(settings.debounce)),
            rx,
            tx: tx.downgrade(),
            collaborators: collaborators.clone(),
            settings,
            visible: visible.clone(),
        };
        let handle = tokio::spawn(actor.run());

        (
            Self {
                tx,
                focus: collaborators.focus,
                visible,
            },
            handle,
        )
    }

    /// Whether the overlay is currently shown, as last applied.
    pub fn is_overlay_visible(&self) -> bool {
        self.visible.load(Ordering::Acquire)
    }

    /// Trigger key. Always consumes the key event.
    pub fn on_trigger(&self) -> bool {
        let at = Instant::now();
        // The toggle-off path needs no focus read. If the overlay closes
        // before this task is applied, the application task reads it instead.
        let focus_read = !self.is_overlay_visible();
        let focus = if focus_read { self.focus.focused() } else { None };
        self.send(Task::Trigger {
            focus,
            focus_read,
            at,
        });
        true
    }

    /// Arrow keys. Passed through when the overlay is hidden.
    pub fn on_navigate(&self, delta: isize) -> bool {
        if !self.is_overlay_visible() {
            return false;
        }
        self.send(Task::Navigate(delta));
        true
    }

    /// Accept key. Passed through when the overlay is hidden.
    pub fn on_accept(&self) -> bool {
        if !self.is_overlay_visible() {
            return false;
        }
        self.send(Task::Accept { reply: None });
        true
    }

    /// Dismiss key. Passed through when the overlay is hidden.
    pub fn on_dismiss(&self) -> bool {
        if !self.is_overlay_visible() {
            return false;
        }
        self.send(Task::Dismiss);
        true
    }

    /// Accept the current selection and wait for the outcome. Returns
    /// `None` when nothing was showing.
    pub async fn accept(&self) -> Option<Suggestion> {
        let (reply, rx) = oneshot::channel();
        self.send(Task::Accept { reply: Some(reply) });
        rx.await.ok().flatten()
    }

    /// Move the selection without checking visibility first.
    pub fn navigate(&self, delta: isize) {
        self.send(Task::Navigate(delta));
    }

    /// Dismiss without checking visibility first.
    pub fn dismiss(&self) {
        self.send(Task::Dismiss);
    }

    /// State after every task queued before this call has been applied.
    pub async fn snapshot(&self) -> Option<PipelineState> {
        let (reply, rx) = oneshot::channel();
        self.send(Task::Snapshot(reply));
        rx.await.ok()
    }

    fn send(&self, task: Task) {
        if self.tx.send(task).is_err() {
            tracing::warn!("pipeline task queue is closed; event dropped");
        }
    }
}

struct Actor {
    machine: PipelineMachine,
    rx: mpsc::UnboundedReceiver<Task>,
    tx: mpsc::WeakUnboundedSender<Task>,
    collaborators: Collaborators,
    settings: PipelineSettings,
    visible: Arc<AtomicBool>,
}

impl Actor {
    async fn run(mut self) {
        while let Some(task) = self.rx.recv().await {
            self.handle(task).await;
            self.visible
                .store(self.machine.state().is_showing(), Ordering::Release);
        }
        tracing::debug!("pipeline task queue closed; application task exiting");
    }

    async fn handle(&mut self, task: Task) {
        match task {
            Task::Trigger {
                focus,
                focus_read,
                at,
            } => {
                let focus = if !focus_read && !self.machine.state().is_showing() {
                    let source = &self.collaborators.focus;
                    isolate("focus.focused", || source.focused()).flatten()
                } else {
                    focus
                };
                let effects = self.machine.trigger(focus, at);
                self.apply(effects).await;
            }
            Task::Deliver { token, suggestions } => {
                let effects = self.machine.deliver(token, suggestions);
                self.apply(effects).await;
            }
            Task::Navigate(delta) => {
                let effects = self.machine.navigate(delta);
                self.apply(effects).await;
            }
            Task::Accept { reply } => {
                let (chosen, effects) = self.machine.accept();
                self.apply(effects).await;
                if let Some(reply) = reply {
                    let _ = reply.send(chosen);
                }
            }
            Task::Dismiss => {
                let effects = self.machine.dismiss();
                self.apply(effects).await;
            }
            Task::Snapshot(reply) => {
                let _ = reply.send(self.machine.state().clone());
            }
        }
    }

    async fn apply(&self, effects: Vec<Effect>) {
        for effect in effects {
            match effect {
                Effect::Show {
                    suggestions,
                    anchor,
                } => {
                    for s in &suggestions {
                        tracing::debug!(index = s.index, text = %preview(&s.text, 80), "suggestion");
                    }
                    let overlay = &self.collaborators.overlay;
                    isolate("overlay.show", || overlay.show(&suggestions, anchor));
                }
                Effect::Hide => {
                    let overlay = &self.collaborators.overlay;
                    isolate("overlay.hide", || overlay.hide());
                }
                Effect::Select(index) => {
                    let overlay = &self.collaborators.overlay;
                    isolate("overlay.set_selected_index", || {
                        overlay.set_selected_index(index)
                    });
                }
                Effect::Dispatch(request) => self.dispatch(request),
                Effect::Inject(suggestion) => self.inject(suggestion).await,
            }
        }
    }

    fn dispatch(&self, request: GenerationRequest) {
        let Some(tx) = self.tx.upgrade() else {
            tracing::warn!(token = %request.token, "pipeline shutting down; generation not dispatched");
            return;
        };
        let store = self.collaborators.store.clone();
        let generator = self.collaborators.generator.clone();
        let max_chars = self.settings.context_window_chars;

        tokio::spawn(async move {
            let token = request.token;
            // A generator panic surfaces here as a JoinError
            let job = tokio::spawn(async move {
                generate(&store, generator.as_ref(), &request, max_chars).await
            });
            let suggestions = match job.await {
                Ok(suggestions) => suggestions,
                Err(e) => {
                    tracing::error!(%token, error = %e, "generation task failed; treating as empty");
                    Vec::new()
                }
            };
            // The application task may already be gone at shutdown
            let _ = tx.send(Task::Deliver { token, suggestions });
        });
    }

    async fn inject(&self, suggestion: Suggestion) {
        let injector = &self.collaborators.injector;
        let injected =
            isolate("injector.inject", || injector.inject(&suggestion.text)).unwrap_or(false);
        if !injected {
            tracing::warn!("failed to inject suggestion");
            return;
        }
        tracing::info!(text = %preview(&suggestion.text, 60), "injected suggestion");

        let focus = &self.collaborators.focus;
        let app_name = isolate("focus.focused", || focus.focused())
            .flatten()
            .map(|f| f.app_name)
            .filter(|name| !name.is_empty())
            .unwrap_or_else(|| UNKNOWN_APP.to_string());

        let entry = NewEntry::new(app_name, suggestion.text, EntryType::AcceptedSuggestion);
        if let Err(e) = self.collaborators.store.add_entry(entry).await {
            tracing::warn!(error = %e, "failed to record accepted suggestion");
        }
    }
}

/// Run one generation. Every failure becomes an empty list.
async fn generate(
    store: &ContextStore,
    generator: &dyn SuggestionGenerator,
    request: &GenerationRequest,
    max_chars: usize,
) -> Vec<Suggestion> {
    let context = match store.sliced_context(&request.app_name, max_chars).await {
        Ok(context) => context,
        Err(e) => {
            tracing::warn!(error = %e, "could not read context; generating without it");
            String::new()
        }
    };
    tracing::debug!(token = %request.token, context_chars = context.chars().count(), "generating");

    let started = Instant::now();
    match generator
        .generate(&request.current_input, &context, &request.app_name)
        .await
    {
        Ok(suggestions) => {
            tracing::info!(
                token = %request.token,
                elapsed_ms = started.elapsed().as_millis() as u64,
                count = suggestions.len(),
                "generation finished"
            );
            suggestions
        }
        Err(e) => {
            tracing::warn!(token = %request.token, error = %e, "generation failed");
            Vec::new()
        }
    }
}

/// Call a collaborator, turning a panic into a logged `None`.
fn isolate<T>(what: &str, f: impl FnOnce() -> T) -> Option<T> {
    match catch_unwind(AssertUnwindSafe(f)) {
        Ok(value) => Some(value),
        Err(_) => {
            tracing::error!(collaborator = what, "collaborator panicked; task isolated");
            None
        }
    }
}

fn preview(text: &str, max: usize) -> String {
    text.chars().take(max).collect()
}
