//! End-to-end session behavior against an in-memory composer, a scripted
//! transport, and a paused clock.

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use core_check::{CheckForm, CheckTransport, TransportReply};
use core_config::Config;
use core_offsets::NodeTree;
use core_offsets::layout::LayoutMetrics;
use core_session::{ComposerHost, Session, SessionEvent, SurfaceKind};
use core_suppress::KvStore;
use tokio::sync::mpsc;

const MISPELLED: &str = "Teh cat sat.";

/// Oracle reply for [`MISPELLED`]: one spelling match over chars 0..3.
const TEH_BODY: &str = r#"{
  "matches": [{
    "offset": 0,
    "length": 3,
    "message": "Possible spelling mistake found.",
    "replacements": [{"value": "The"}, {"value": "Tech"}],
    "rule": {
      "id": "MORFOLOGIK_RULE_EN_US",
      "issueType": "misspelling",
      "category": {"id": "TYPOS", "name": "Possible Typo"}
    },
    "sentence": "Teh cat sat."
  }]
}"#;

struct ScriptedTransport {
    texts: Mutex<Vec<String>>,
}

impl ScriptedTransport {
    fn new() -> Arc<Self> {
        Arc::new(Self {
            texts: Mutex::new(Vec::new()),
        })
    }

    fn texts(&self) -> Vec<String> {
        self.texts.lock().unwrap().clone()
    }
}

#[async_trait]
impl CheckTransport for ScriptedTransport {
    async fn post_check(&self, _endpoint: &str, form: &CheckForm) -> anyhow::Result<TransportReply> {
        self.texts.lock().unwrap().push(form.text.clone());
        let body = if form.text == MISPELLED {
            TEH_BODY.to_string()
        } else {
            r#"{"matches": []}"#.to_string()
        };
        Ok(TransportReply { status: 200, body })
    }
}

#[derive(Default)]
struct MemoryKv {
    map: Mutex<std::collections::HashMap<String, String>>,
}

#[async_trait]
impl KvStore for MemoryKv {
    async fn get(&self, key: &str) -> anyhow::Result<Option<String>> {
        Ok(self.map.lock().unwrap().get(key).cloned())
    }
    async fn set(&self, key: &str, value: &str) -> anyhow::Result<()> {
        self.map
            .lock()
            .unwrap()
            .insert(key.to_string(), value.to_string());
        Ok(())
    }
}

struct ComposerState {
    text: String,
    caret: usize,
    native_spellcheck: bool,
}

/// Test double for the composer: the handle given to the session and the
/// handle kept by the test share one state cell.
#[derive(Clone)]
struct FakeComposer {
    id: Arc<str>,
    state: Arc<Mutex<ComposerState>>,
}

impl FakeComposer {
    fn new(text: &str) -> Self {
        Self::with_id("composer-0", text)
    }

    fn with_id(id: &str, text: &str) -> Self {
        Self {
            id: Arc::from(id),
            state: Arc::new(Mutex::new(ComposerState {
                text: text.to_string(),
                caret: text.chars().count(),
                native_spellcheck: true,
            })),
        }
    }

    fn set_text(&self, text: &str) {
        self.state.lock().unwrap().text = text.to_string();
    }

    fn text(&self) -> String {
        self.state.lock().unwrap().text.clone()
    }

    fn caret(&self) -> usize {
        self.state.lock().unwrap().caret
    }

    fn native_spellcheck(&self) -> bool {
        self.state.lock().unwrap().native_spellcheck
    }
}

impl ComposerHost for FakeComposer {
    fn id(&self) -> &str {
        &self.id
    }
    fn kind(&self) -> SurfaceKind {
        SurfaceKind::Server
    }
    fn tree(&self) -> NodeTree {
        NodeTree::from_text(self.state.lock().unwrap().text.clone())
    }
    fn caret(&self) -> usize {
        self.state.lock().unwrap().caret
    }
    fn set_caret(&mut self, offset: usize) {
        self.state.lock().unwrap().caret = offset;
    }
    fn replace_all(&mut self, text: &str) {
        self.state.lock().unwrap().text = text.to_string();
    }
    fn set_native_spellcheck(&mut self, enabled: bool) {
        self.state.lock().unwrap().native_spellcheck = enabled;
    }
    fn metrics(&self) -> LayoutMetrics {
        LayoutMetrics::unscrolled(8.0, 16.0, 80)
    }
}

struct Harness {
    session: Session,
    rx: mpsc::Receiver<SessionEvent>,
    transport: Arc<ScriptedTransport>,
    composer: FakeComposer,
}

async fn harness(config: Config, text: &str) -> Harness {
    let (tx, rx) = mpsc::channel(16);
    let transport = ScriptedTransport::new();
    let kv = Arc::new(MemoryKv::default());
    let session = Session::new(config, transport.clone(), kv, tx).await;
    Harness {
        session,
        rx,
        transport,
        composer: FakeComposer::new(text),
    }
}

impl Harness {
    async fn attach(&mut self) {
        let composer = Box::new(self.composer.clone());
        self.session
            .handle_event(SessionEvent::SurfaceDiscovered(composer))
            .await;
    }

    /// Wait for the next queued event (debounce timers included; the paused
    /// clock auto-advances through their sleeps) and feed it to the session.
    async fn pump(&mut self) {
        let event = self.rx.recv().await.expect("event channel open");
        self.session.handle_event(event).await;
    }
}

#[tokio::test(start_paused = true)]
async fn full_pipeline_flags_clicks_and_corrects() {
    let mut h = harness(Config::default(), MISPELLED).await;
    h.attach().await;
    assert!(!h.composer.native_spellcheck(), "platform spellcheck off");

    h.pump().await; // debounce fires, check runs
    assert_eq!(h.session.issues().len(), 1);
    assert_eq!(h.session.issues()[0].word(h.session.text()), Some("Teh"));
    assert_eq!(h.session.markers().len(), 1);

    // Click inside "Teh" (cols 0..3 at 8px cells).
    h.session
        .handle_event(SessionEvent::PointerDown { x: 4.0, y: 4.0 })
        .await;
    let popup = h.session.popup().expect("popup over flagged span");
    assert_eq!(popup.category_label, "Spelling");
    assert_eq!(popup.candidates.len(), 2);
    assert_eq!(popup.candidates[0].value, "The");
    assert_eq!(popup.candidates[0].diff.prefix, "T");

    h.session.apply_replacement(0);
    assert_eq!(h.composer.text(), "The cat sat.");
    assert_eq!(h.composer.caret(), 12, "caret after the span keeps its place");
    assert!(h.session.popup().is_none());
    assert!(h.session.issues().is_empty());

    h.pump().await; // re-check of the corrected text
    assert!(h.session.issues().is_empty());
    assert_eq!(
        h.transport.texts(),
        vec![MISPELLED.to_string(), "The cat sat.".to_string()]
    );
}

#[tokio::test(start_paused = true)]
async fn click_outside_any_issue_closes_the_popup() {
    let mut h = harness(Config::default(), MISPELLED).await;
    h.attach().await;
    h.pump().await;

    h.session
        .handle_event(SessionEvent::PointerDown { x: 4.0, y: 4.0 })
        .await;
    assert!(h.session.popup().is_some());

    // "cat" is clean; popup closes.
    h.session
        .handle_event(SessionEvent::PointerDown { x: 36.0, y: 4.0 })
        .await;
    assert!(h.session.popup().is_none());
}

#[tokio::test(start_paused = true)]
async fn ignore_once_is_cleared_by_the_send_transition() {
    let mut h = harness(Config::default(), MISPELLED).await;
    h.attach().await;
    h.pump().await;

    h.session
        .handle_event(SessionEvent::PointerDown { x: 4.0, y: 4.0 })
        .await;
    h.session.ignore_once();
    assert!(h.session.issues().is_empty(), "ignored for this message");
    assert!(h.session.suppression().is_suppressed("teh"));

    // Message sent: composer collapses to empty.
    h.composer.set_text("");
    h.session.handle_event(SessionEvent::Edit).await;
    assert!(h.session.suppression().volatile_is_empty());

    // Retyping the same text flags it again (served from cache).
    h.composer.set_text(MISPELLED);
    h.session.handle_event(SessionEvent::Edit).await;
    h.pump().await;
    assert_eq!(h.session.issues().len(), 1);
    assert_eq!(h.transport.texts().len(), 1, "second pass was a cache hit");
}

#[tokio::test(start_paused = true)]
async fn add_to_dictionary_persists_across_sessions() {
    let (tx, mut rx) = mpsc::channel(16);
    let transport = ScriptedTransport::new();
    let kv = Arc::new(MemoryKv::default());
    let composer = FakeComposer::new(MISPELLED);

    let mut session = Session::new(Config::default(), transport.clone(), kv.clone(), tx).await;
    session
        .handle_event(SessionEvent::SurfaceDiscovered(Box::new(composer.clone())))
        .await;
    let event = rx.recv().await.unwrap();
    session.handle_event(event).await;
    session
        .handle_event(SessionEvent::PointerDown { x: 4.0, y: 4.0 })
        .await;
    session.add_to_dictionary().await;
    assert!(session.issues().is_empty());

    // A brand-new session against the same store already knows the word.
    let (tx2, _rx2) = mpsc::channel(16);
    let session2 = Session::new(Config::default(), transport, kv, tx2).await;
    assert!(session2.suppression().is_suppressed("Teh"));
}

#[tokio::test(start_paused = true)]
async fn stale_response_for_changed_text_is_discarded() {
    let mut h = harness(Config::default(), MISPELLED).await;
    h.attach().await;

    let event = h.rx.recv().await.unwrap();
    // The composer moves on while the check is conceptually in flight.
    h.composer.set_text("Teh cat sat!!");
    h.session.handle_event(event).await;

    assert!(h.session.issues().is_empty(), "response no longer applies");
    assert!(h.session.markers().is_empty());
}

#[tokio::test(start_paused = true)]
async fn over_budget_text_skips_the_check_and_keeps_old_markers() {
    let config = Config {
        max_characters: 20,
        ..Config::default()
    };
    let mut h = harness(config, MISPELLED).await;
    h.attach().await;
    h.pump().await;
    assert_eq!(h.session.markers().len(), 1);

    h.composer.set_text("Teh cat sat on teh very long mat.");
    h.session.handle_event(SessionEvent::Edit).await;

    // No timer was armed, and the stale annotations stand.
    tokio::time::sleep(std::time::Duration::from_secs(2)).await;
    assert!(h.rx.try_recv().is_err());
    assert_eq!(h.session.issues().len(), 1);
    assert_eq!(h.session.markers().len(), 1);
    assert_eq!(h.transport.texts().len(), 1);
}

#[tokio::test(start_paused = true)]
async fn rapid_edits_check_only_the_final_text() {
    let mut h = harness(Config::default(), "").await;
    h.attach().await; // empty: no initial timer

    h.composer.set_text(MISPELLED);
    h.session.handle_event(SessionEvent::Edit).await;
    h.composer.set_text("The cat sat.");
    h.session.handle_event(SessionEvent::Edit).await;

    h.pump().await; // first timer: stale generation, dropped
    h.pump().await; // second timer: checks the final text
    assert_eq!(h.transport.texts(), vec!["The cat sat.".to_string()]);
    assert!(h.session.issues().is_empty());
}

#[tokio::test(start_paused = true)]
async fn emptied_composer_clears_annotations_without_a_request() {
    let mut h = harness(Config::default(), MISPELLED).await;
    h.attach().await;
    h.pump().await;
    assert_eq!(h.session.markers().len(), 1);

    h.composer.set_text("\u{200B}");
    h.session.handle_event(SessionEvent::Edit).await;
    assert!(h.session.issues().is_empty());
    assert!(h.session.markers().is_empty());
    assert_eq!(h.transport.texts().len(), 1, "no check for empty text");
}

#[tokio::test(start_paused = true)]
async fn ignore_list_editor_round_trip() {
    let mut h = harness(Config::default(), MISPELLED).await;
    h.attach().await;
    h.pump().await;
    assert_eq!(h.session.issues().len(), 1);

    h.session.open_ignore_editor();
    for c in "teh".chars() {
        h.session.ignore_editor_char(c);
    }
    h.session.close_ignore_editor().await;

    assert!(h.session.suppression().is_suppressed("Teh"));
    assert!(h.session.issues().is_empty(), "live issues re-filtered");
}

#[tokio::test(start_paused = true)]
async fn teardown_restores_the_platform_and_drops_state() {
    let mut h = harness(Config::default(), MISPELLED).await;
    h.attach().await;
    h.pump().await;
    assert!(h.session.is_attached());
    assert_eq!(h.session.markers().len(), 1);

    h.session.handle_event(SessionEvent::Teardown).await;
    assert!(!h.session.is_attached());
    assert!(h.session.markers().is_empty());
    assert!(h.session.issues().is_empty());
    assert!(h.composer.native_spellcheck(), "platform spellcheck restored");
}

#[tokio::test(start_paused = true)]
async fn discovering_a_different_surface_rebinds() {
    let mut h = harness(Config::default(), MISPELLED).await;
    h.attach().await;
    h.pump().await;
    assert_eq!(h.session.markers().len(), 1);

    let other = FakeComposer::with_id("composer-1", "");
    h.session
        .handle_event(SessionEvent::SurfaceDiscovered(Box::new(other.clone())))
        .await;
    assert!(h.session.is_attached());
    assert!(h.session.markers().is_empty(), "old surface state dropped");
    assert!(h.composer.native_spellcheck(), "old surface restored");
    assert!(!other.native_spellcheck(), "new surface suppressed");
    assert_eq!(h.session.text(), "");
}

#[tokio::test(start_paused = true)]
async fn disabled_surfaces_never_attach() {
    let config = Config {
        enable_in_servers: false,
        ..Config::default()
    };
    let mut h = harness(config, MISPELLED).await;
    h.attach().await;
    assert!(!h.session.is_attached());
    assert!(h.composer.native_spellcheck(), "platform spellcheck untouched");
}
