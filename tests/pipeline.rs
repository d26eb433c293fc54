//! Coordinator tests with scripted collaborators.
//!
//! Each test drives a real `PipelineCoordinator` and `ContextStore` (in a
//! temp directory) through the public entry points, then observes the
//! result through `snapshot()` and the recording collaborators.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};
use tempfile::TempDir;
use tokio::sync::oneshot;

use context_autocomplete::error::GenerationError;
use context_autocomplete::models::{Anchor, EntryType, FocusInfo, NewEntry, Suggestion};
use context_autocomplete::pipeline::{
    Collaborators, PipelineCoordinator, PipelineSettings, PipelineState,
};
use context_autocomplete::store::ContextStore;
use context_autocomplete::traits::{FocusSource, Overlay, SuggestionGenerator, TextInjector};

// ============ Scripted collaborators ============

struct FixedFocus {
    focus: Mutex<Option<FocusInfo>>,
}

impl FixedFocus {
    fn set_text(&self, text: &str) {
        let mut focus = self.focus.lock().unwrap();
        if let Some(f) = focus.as_mut() {
            f.current_text = text.to_string();
        }
    }
}

impl FocusSource for FixedFocus {
    fn focused(&self) -> Option<FocusInfo> {
        self.focus.lock().unwrap().clone()
    }
}

enum Reply {
    Ready(Vec<&'static str>),
    Fail,
    Panic,
    Gated(oneshot::Receiver<Vec<&'static str>>),
}

/// Replies are keyed by the current input text.
struct ScriptedGenerator {
    replies: Mutex<HashMap<String, Reply>>,
    calls: AtomicUsize,
    contexts: Mutex<Vec<String>>,
}

#[async_trait]
impl SuggestionGenerator for ScriptedGenerator {
    async fn generate(
        &self,
        current_input: &str,
        context: &str,
        _app_name: &str,
    ) -> Result<Vec<Suggestion>, GenerationError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.contexts.lock().unwrap().push(context.to_string());

        let reply = self.replies.lock().unwrap().remove(current_input);
        match reply {
            Some(Reply::Ready(texts)) => {
                self.replies
                    .lock()
                    .unwrap()
                    .insert(current_input.to_string(), Reply::Ready(texts.clone()));
                Ok(Suggestion::ranked(texts))
            }
            Some(Reply::Gated(gate)) => {
                let texts = gate.await.unwrap_or_default();
                Ok(Suggestion::ranked(texts))
            }
            Some(Reply::Panic) => panic!("generator crashed"),
            Some(Reply::Fail) | None => {
                Err(GenerationError::MalformedResponse("scripted".to_string()))
            }
        }
    }
}

struct RecordingInjector {
    succeed: bool,
    injected: Mutex<Vec<String>>,
}

impl TextInjector for RecordingInjector {
    fn inject(&self, text: &str) -> bool {
        self.injected.lock().unwrap().push(text.to_string());
        self.succeed
    }
}

#[derive(Debug, Clone, PartialEq)]
enum OverlayEvent {
    Show(Vec<String>, Anchor),
    Hide,
    Select(usize),
}

#[derive(Default)]
struct RecordingOverlay {
    events: Mutex<Vec<OverlayEvent>>,
    panic_on_show: bool,
}

impl RecordingOverlay {
    fn events(&self) -> Vec<OverlayEvent> {
        self.events.lock().unwrap().clone()
    }

    fn show_count(&self) -> usize {
        self.events()
            .iter()
            .filter(|e| matches!(e, OverlayEvent::Show(..)))
            .count()
    }
}

impl Overlay for RecordingOverlay {
    fn show(&self, suggestions: &[Suggestion], anchor: Anchor) {
        if self.panic_on_show {
            panic!("overlay window unavailable");
        }
        let texts = suggestions.iter().map(|s| s.text.clone()).collect();
        self.events
            .lock()
            .unwrap()
            .push(OverlayEvent::Show(texts, anchor));
    }

    fn hide(&self) {
        self.events.lock().unwrap().push(OverlayEvent::Hide);
    }

    fn set_selected_index(&self, index: usize) {
        self.events.lock().unwrap().push(OverlayEvent::Select(index));
    }
}

// ============ Harness ============

struct Harness {
    coordinator: PipelineCoordinator,
    store: Arc<ContextStore>,
    focus: Arc<FixedFocus>,
    generator: Arc<ScriptedGenerator>,
    injector: Arc<RecordingInjector>,
    overlay: Arc<RecordingOverlay>,
    _tmp: TempDir,
}

struct Setup {
    focus: Option<FocusInfo>,
    replies: Vec<(&'static str, Reply)>,
    debounce: Duration,
    inject_ok: bool,
    panic_on_show: bool,
}

impl Setup {
    fn typing(text: &str) -> Self {
        Self {
            focus: Some(FocusInfo::new("Notes", text)),
            replies: Vec::new(),
            debounce: Duration::ZERO,
            inject_ok: true,
            panic_on_show: false,
        }
    }

    fn reply(mut self, input: &'static str, reply: Reply) -> Self {
        self.replies.push((input, reply));
        self
    }

    async fn start(self) -> Harness {
        let tmp = TempDir::new().unwrap();
        let store = Arc::new(ContextStore::new(tmp.path().join("context.db")));
        store.open().await.unwrap();

        let focus = Arc::new(FixedFocus {
            focus: Mutex::new(self.focus),
        });
        let generator = Arc::new(ScriptedGenerator {
            replies: Mutex::new(
                self.replies
                    .into_iter()
                    .map(|(k, v)| (k.to_string(), v))
                    .collect(),
            ),
            calls: AtomicUsize::new(0),
            contexts: Mutex::new(Vec::new()),
        });
        let injector = Arc::new(RecordingInjector {
            succeed: self.inject_ok,
            injected: Mutex::new(Vec::new()),
        });
        let overlay = Arc::new(RecordingOverlay {
            panic_on_show: self.panic_on_show,
            ..Default::default()
        });

        let (coordinator, _handle) = PipelineCoordinator::spawn(
            Collaborators {
                focus: focus.clone(),
                generator: generator.clone(),
                injector: injector.clone(),
                overlay: overlay.clone(),
                store: store.clone(),
            },
            PipelineSettings {
                debounce: self.debounce,
                context_window_chars: 4000,
            },
        );

        Harness {
            coordinator,
            store,
            focus,
            generator,
            injector,
            overlay,
            _tmp: tmp,
        }
    }
}

impl Harness {
    async fn state(&self) -> PipelineState {
        self.coordinator.snapshot().await.unwrap()
    }

    async fn wait_for(&self, pred: impl Fn(&PipelineState) -> bool) -> PipelineState {
        let deadline = Instant::now() + Duration::from_secs(5);
        loop {
            let state = self.state().await;
            if pred(&state) {
                return state;
            }
            assert!(Instant::now() < deadline, "timed out; last state {:?}", state);
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    }

    async fn wait_for_showing(&self) -> PipelineState {
        self.wait_for(PipelineState::is_showing).await
    }

    fn calls(&self) -> usize {
        self.generator.calls.load(Ordering::SeqCst)
    }
}

fn texts(state: &PipelineState) -> Vec<String> {
    match state {
        PipelineState::Showing { suggestions, .. } => {
            suggestions.iter().map(|s| s.text.clone()).collect()
        }
        other => panic!("expected Showing, got {:?}", other),
    }
}

fn selected(state: &PipelineState) -> usize {
    match state {
        PipelineState::Showing { selected_index, .. } => *selected_index,
        other => panic!("expected Showing, got {:?}", other),
    }
}

// ============ Tests ============

#[tokio::test]
async fn test_trigger_show_accept_records_entry() {
    let h = Setup::typing("Hello")
        .reply("Hello", Reply::Ready(vec!["Hi there", "Hello!", "Good morning"]))
        .start()
        .await;
    h.store
        .add_entry(NewEntry::new("Notes", "meeting at noon", EntryType::VisibleText))
        .await
        .unwrap();

    assert!(h.coordinator.on_trigger());
    let state = h.wait_for_showing().await;
    assert_eq!(texts(&state), vec!["Hi there", "Hello!", "Good morning"]);
    assert_eq!(selected(&state), 0);
    assert!(h.coordinator.is_overlay_visible());
    assert_eq!(
        h.overlay.events(),
        vec![OverlayEvent::Show(
            vec![
                "Hi there".to_string(),
                "Hello!".to_string(),
                "Good morning".to_string()
            ],
            Anchor::FALLBACK
        )]
    );
    assert_eq!(
        h.generator.contexts.lock().unwrap().as_slice(),
        ["[visible_text] meeting at noon".to_string()]
    );

    let accepted = h.coordinator.accept().await.unwrap();
    assert_eq!(accepted.text, "Hi there");
    assert_eq!(h.state().await, PipelineState::Idle);
    assert!(!h.coordinator.is_overlay_visible());
    assert_eq!(h.overlay.events().last(), Some(&OverlayEvent::Hide));
    assert_eq!(
        h.injector.injected.lock().unwrap().as_slice(),
        ["Hi there".to_string()]
    );

    let entries = h.store.get_by_source("Notes", 10).await.unwrap();
    let accepted: Vec<_> = entries
        .iter()
        .filter(|e| e.entry_type == EntryType::AcceptedSuggestion)
        .collect();
    assert_eq!(accepted.len(), 1);
    assert_eq!(accepted[0].content, "Hi there");
}

#[tokio::test]
async fn test_anchor_follows_focus() {
    let mut setup = Setup::typing("Hello").reply("Hello", Reply::Ready(vec!["Hi"]));
    setup.focus = Some(FocusInfo::new("Notes", "Hello").with_anchor(Anchor::new(320.0, 48.0)));
    let h = setup.start().await;

    h.coordinator.on_trigger();
    match h.wait_for_showing().await {
        PipelineState::Showing { anchor, .. } => assert_eq!(anchor, Anchor::new(320.0, 48.0)),
        other => panic!("expected Showing, got {:?}", other),
    }
}

#[tokio::test]
async fn test_navigate_wraps_both_ways() {
    let h = Setup::typing("Hello")
        .reply("Hello", Reply::Ready(vec!["a", "b", "c"]))
        .start()
        .await;

    h.coordinator.on_trigger();
    h.wait_for_showing().await;

    assert!(h.coordinator.on_navigate(-1));
    assert_eq!(selected(&h.state().await), 2);
    assert!(h.coordinator.on_navigate(1));
    assert_eq!(selected(&h.state().await), 0);
    assert!(h.coordinator.on_navigate(1));
    assert_eq!(selected(&h.state().await), 1);

    let events = h.overlay.events();
    assert_eq!(
        &events[1..],
        &[
            OverlayEvent::Select(2),
            OverlayEvent::Select(0),
            OverlayEvent::Select(1)
        ]
    );

    let accepted = h.coordinator.accept().await.unwrap();
    assert_eq!(accepted.text, "b");
    assert_eq!(accepted.index, 1);
}

#[tokio::test]
async fn test_stale_result_is_discarded() {
    let (release_first, gate) = oneshot::channel();
    let h = Setup::typing("first")
        .reply("first", Reply::Gated(gate))
        .reply("second", Reply::Ready(vec!["fresh"]))
        .start()
        .await;

    h.coordinator.on_trigger();
    h.focus.set_text("second");
    h.coordinator.on_trigger();

    let state = h.wait_for_showing().await;
    assert_eq!(texts(&state), vec!["fresh"]);

    // The first request finishes late; its result must not replace the list
    release_first.send(vec!["stale"]).unwrap();
    tokio::time::sleep(Duration::from_millis(100)).await;

    let state = h.state().await;
    assert_eq!(texts(&state), vec!["fresh"]);
    assert_eq!(h.overlay.show_count(), 1);
    assert_eq!(h.calls(), 2);
}

#[tokio::test]
async fn test_debounce_drops_rapid_triggers() {
    let mut setup = Setup::typing("Hello").reply("Hello", Reply::Ready(vec!["Hi"]));
    setup.debounce = Duration::from_secs(60);
    let h = setup.start().await;

    assert!(h.coordinator.on_trigger());
    assert!(h.coordinator.on_trigger());
    assert!(h.coordinator.on_trigger());

    h.wait_for_showing().await;
    assert_eq!(h.calls(), 1);
}

#[tokio::test]
async fn test_generation_failure_returns_to_idle() {
    let h = Setup::typing("Hello")
        .reply("Hello", Reply::Fail)
        .start()
        .await;

    h.coordinator.on_trigger();
    assert!(matches!(
        h.state().await,
        PipelineState::AwaitingGeneration { .. }
    ));

    h.wait_for(|s| *s == PipelineState::Idle).await;
    assert_eq!(h.calls(), 1);
    assert!(h.overlay.events().is_empty());
    assert!(!h.coordinator.is_overlay_visible());
}

#[tokio::test]
async fn test_generator_panic_returns_to_idle() {
    let h = Setup::typing("Hello")
        .reply("Hello", Reply::Panic)
        .reply("Again", Reply::Ready(vec!["recovered"]))
        .start()
        .await;

    h.coordinator.on_trigger();
    h.wait_for(|s| *s == PipelineState::Idle).await;
    assert_eq!(h.calls(), 1);
    assert_eq!(h.overlay.show_count(), 0);

    // The next trigger still works
    h.focus.set_text("Again");
    h.coordinator.on_trigger();
    let state = h.wait_for_showing().await;
    assert_eq!(texts(&state), vec!["recovered"]);
}

#[tokio::test]
async fn test_trigger_queued_behind_dismiss_reads_focus() {
    let h = Setup::typing("Hello")
        .reply("Hello", Reply::Ready(vec!["Hi"]))
        .start()
        .await;

    h.coordinator.on_trigger();
    h.wait_for_showing().await;

    // Both are queued before the dismiss is applied, so the trigger sees
    // a visible overlay and skips its own focus read
    assert!(h.coordinator.on_dismiss());
    assert!(h.coordinator.on_trigger());

    let state = h.wait_for_showing().await;
    assert_eq!(texts(&state), vec!["Hi"]);
    assert_eq!(h.calls(), 2);
    assert_eq!(h.overlay.show_count(), 2);
}

#[tokio::test]
async fn test_empty_result_returns_to_idle() {
    let h = Setup::typing("Hello")
        .reply("Hello", Reply::Ready(vec![]))
        .start()
        .await;

    h.coordinator.on_trigger();
    h.wait_for(|s| *s == PipelineState::Idle).await;
    assert_eq!(h.overlay.show_count(), 0);
}

#[tokio::test]
async fn test_trigger_while_showing_toggles_off() {
    let h = Setup::typing("Hello")
        .reply("Hello", Reply::Ready(vec!["Hi"]))
        .start()
        .await;

    h.coordinator.on_trigger();
    h.wait_for_showing().await;

    assert!(h.coordinator.on_trigger());
    assert_eq!(h.state().await, PipelineState::Idle);
    assert_eq!(h.overlay.events().last(), Some(&OverlayEvent::Hide));
    assert_eq!(h.calls(), 1);
}

#[tokio::test]
async fn test_dismiss_hides_without_injecting() {
    let h = Setup::typing("Hello")
        .reply("Hello", Reply::Ready(vec!["Hi"]))
        .start()
        .await;

    h.coordinator.on_trigger();
    h.wait_for_showing().await;

    assert!(h.coordinator.on_dismiss());
    assert_eq!(h.state().await, PipelineState::Idle);
    assert_eq!(h.overlay.events().last(), Some(&OverlayEvent::Hide));
    assert!(h.injector.injected.lock().unwrap().is_empty());
}

#[tokio::test]
async fn test_keys_pass_through_when_hidden() {
    let h = Setup::typing("Hello").start().await;

    assert!(!h.coordinator.on_navigate(1));
    assert!(!h.coordinator.on_accept());
    assert!(!h.coordinator.on_dismiss());
    assert!(h.coordinator.accept().await.is_none());
    assert_eq!(h.state().await, PipelineState::Idle);
    assert!(h.overlay.events().is_empty());
}

#[tokio::test]
async fn test_blank_input_never_dispatches() {
    let h = Setup::typing("   \n").start().await;

    assert!(h.coordinator.on_trigger());
    assert_eq!(h.state().await, PipelineState::Idle);
    assert_eq!(h.calls(), 0);
}

#[tokio::test]
async fn test_no_focus_never_dispatches() {
    let mut setup = Setup::typing("Hello");
    setup.focus = None;
    let h = setup.start().await;

    assert!(h.coordinator.on_trigger());
    assert_eq!(h.state().await, PipelineState::Idle);
    assert_eq!(h.calls(), 0);
}

#[tokio::test]
async fn test_failed_injection_is_not_recorded() {
    let mut setup = Setup::typing("Hello").reply("Hello", Reply::Ready(vec!["Hi"]));
    setup.inject_ok = false;
    let h = setup.start().await;

    h.coordinator.on_trigger();
    h.wait_for_showing().await;
    h.coordinator.accept().await;

    assert_eq!(h.state().await, PipelineState::Idle);
    assert_eq!(h.injector.injected.lock().unwrap().len(), 1);
    let entries = h.store.get_recent(10).await.unwrap();
    assert!(entries
        .iter()
        .all(|e| e.entry_type != EntryType::AcceptedSuggestion));
}

#[tokio::test]
async fn test_overlay_panic_does_not_stop_pipeline() {
    let mut setup = Setup::typing("Hello").reply("Hello", Reply::Ready(vec!["Hi"]));
    setup.panic_on_show = true;
    let h = setup.start().await;

    h.coordinator.on_trigger();
    h.wait_for_showing().await;

    // The queue keeps serving requests after the panic
    let accepted = h.coordinator.accept().await.unwrap();
    assert_eq!(accepted.text, "Hi");
    assert_eq!(h.state().await, PipelineState::Idle);
}
