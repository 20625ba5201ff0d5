//! Interaction controller: one session per composer surface, driving the
//! whole annotation pipeline off host events.
//!
//! The host discovers a composer, forwards edits, pointer input, scrolls and
//! resizes as [`SessionEvent`]s, and drains the channel back into
//! [`Session::handle_event`]. Everything time-based goes through the same
//! channel: a debounce task sleeps and sends [`SessionEvent::DebounceFired`]
//! carrying its generation, and the session drops any generation that is no
//! longer newest. Last write wins; there is no queue of pending checks.
//!
//! The annotation state here (issue list, markers, popup) is always derived
//! from a specific text snapshot. Any evidence the snapshot is stale — an
//! edit, a superseded debounce, a check response for text the composer no
//! longer holds — invalidates the derived state instead of patching it.

pub mod ignore_editor;
pub mod popup;

use std::sync::Arc;
use std::time::Duration;

use core_check::{CheckClient, CheckTransport};
use core_classify::{CategoryToggles, Issue, parse_matches};
use core_config::Config;
use core_offsets::layout::{LayoutMetrics, offset_at_point};
use core_offsets::{NodeTree, char_len, replace_span};
use core_suppress::{KvStore, SuppressionStore};
use core_underline::{Marker, UnderlineRenderer};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

pub use ignore_editor::IgnoreListEditor;
pub use popup::{Candidate, CorrectionPopup, DiffSegments, MAX_CANDIDATES, minimal_diff};

/// What kind of conversation the composer belongs to; the config can enable
/// checking per kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SurfaceKind {
    DirectMessage,
    Server,
}

/// The composer surface as the host exposes it. Implementations wrap the
/// real text widget; tests substitute an in-memory fake.
pub trait ComposerHost: Send {
    fn id(&self) -> &str;
    fn kind(&self) -> SurfaceKind;
    /// Snapshot of the inline content tree.
    fn tree(&self) -> NodeTree;
    /// Caret position as a char offset into the flattened text.
    fn caret(&self) -> usize;
    fn set_caret(&mut self, offset: usize);
    /// Replace the entire content with plain text.
    fn replace_all(&mut self, text: &str);
    /// Toggle the platform's own spellcheck underlines.
    fn set_native_spellcheck(&mut self, enabled: bool);
    /// Current layout geometry of the surface.
    fn metrics(&self) -> LayoutMetrics;
}

/// Everything the host forwards into the session.
pub enum SessionEvent {
    SurfaceDiscovered(Box<dyn ComposerHost>),
    /// The composer's content changed (any cause).
    Edit,
    /// A debounce timer of the given generation elapsed.
    DebounceFired(u64),
    PointerDown { x: f32, y: f32 },
    Scroll,
    Resize,
    Teardown,
}

/// Sentinel the composer holds when visually empty.
const ZERO_WIDTH_SPACE: &str = "\u{200B}";

pub struct Session {
    config: Config,
    check: CheckClient,
    suppression: SuppressionStore,
    kv: Arc<dyn KvStore>,
    renderer: UnderlineRenderer,
    composer: Option<Box<dyn ComposerHost>>,
    /// The flattened text the current issues and markers were derived from.
    text: String,
    issues: Vec<Issue>,
    popup: Option<CorrectionPopup>,
    ignore_editor: Option<IgnoreListEditor>,
    /// Newest debounce generation; a fired timer with an older one is stale.
    debounce_gen: u64,
    events: mpsc::Sender<SessionEvent>,
    /// Whether we turned the platform spellcheck off and owe a restore.
    spellcheck_suppressed: bool,
}

impl Session {
    /// Build a session: construct the check client from config and load the
    /// durable suppression list from the host's store.
    pub async fn new(
        config: Config,
        transport: Arc<dyn CheckTransport>,
        kv: Arc<dyn KvStore>,
        events: mpsc::Sender<SessionEvent>,
    ) -> Self {
        let check = CheckClient::new(&config, transport);
        let suppression = SuppressionStore::load(kv.as_ref()).await;
        Self {
            config,
            check,
            suppression,
            kv,
            renderer: UnderlineRenderer::new(),
            composer: None,
            text: String::new(),
            issues: Vec::new(),
            popup: None,
            ignore_editor: None,
            debounce_gen: 0,
            events,
            spellcheck_suppressed: false,
        }
    }

    pub async fn handle_event(&mut self, event: SessionEvent) {
        match event {
            SessionEvent::SurfaceDiscovered(composer) => self.attach(composer),
            SessionEvent::Edit => self.note_edit(),
            SessionEvent::DebounceFired(generation) => {
                if generation != self.debounce_gen {
                    debug!(target: "session", generation, "stale_debounce_dropped");
                    return;
                }
                self.run_check_cycle().await;
            }
            SessionEvent::PointerDown { x, y } => self.resolve_click(x, y),
            SessionEvent::Scroll | SessionEvent::Resize => self.repaint(),
            SessionEvent::Teardown => self.teardown(),
        }
    }

    fn attach(&mut self, mut composer: Box<dyn ComposerHost>) {
        if !self.config.enabled || !self.surface_enabled(composer.kind()) {
            debug!(target: "session", id = composer.id(), "surface_not_enabled");
            return;
        }
        let already_bound = self
            .composer
            .as_ref()
            .is_some_and(|current| current.id() == composer.id());
        if already_bound {
            return;
        }
        if self.composer.is_some() {
            // A different surface: release the old binding first.
            self.teardown();
        }
        info!(target: "session", id = composer.id(), "composer_attached");
        if self.config.disable_native_spellcheck {
            composer.set_native_spellcheck(false);
            self.spellcheck_suppressed = true;
        }
        self.text = composer.tree().flatten();
        self.composer = Some(composer);
        if !self.text.trim().is_empty() {
            self.schedule_debounce();
        }
    }

    fn surface_enabled(&self, kind: SurfaceKind) -> bool {
        match kind {
            SurfaceKind::DirectMessage => self.config.enable_in_dms,
            SurfaceKind::Server => self.config.enable_in_servers,
        }
    }

    /// React to a content change: detect message sends, invalidate derived
    /// state, and arm (or cancel) the debounce.
    fn note_edit(&mut self) {
        let Some(composer) = &self.composer else {
            return;
        };
        let new_text = composer.tree().flatten();

        // Send heuristic: non-trivial content collapsing to empty (or the
        // composer's zero-width placeholder) means the message went out, and
        // per-message ignores go with it.
        let emptied = new_text.is_empty() || new_text == ZERO_WIDTH_SPACE;
        if emptied && char_len(&self.text) > 2 && !self.suppression.volatile_is_empty() {
            debug!(target: "session", "send_detected_clearing_volatile_ignores");
            self.suppression.clear_volatile();
        }

        self.text = new_text;
        self.popup = None;

        // The zero-width placeholder is not `char::is_whitespace`, hence the
        // explicit flag.
        if emptied || self.text.trim().is_empty() {
            self.debounce_gen += 1; // cancel any pending timer
            self.issues.clear();
            self.renderer.clear();
            return;
        }
        if char_len(&self.text) > self.config.max_characters {
            // Over budget: no check fires, and annotations from the last
            // in-budget text are left standing until the text shrinks back.
            self.debounce_gen += 1;
            debug!(
                target: "session",
                len = char_len(&self.text),
                max = self.config.max_characters,
                "over_budget_check_skipped"
            );
            return;
        }
        self.schedule_debounce();
    }

    fn schedule_debounce(&mut self) {
        self.debounce_gen += 1;
        let generation = self.debounce_gen;
        let delay = Duration::from_millis(self.config.debounce_ms);
        let events = self.events.clone();
        tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            let _ = events.send(SessionEvent::DebounceFired(generation)).await;
        });
    }

    /// Submit the current snapshot and, if the composer still holds the same
    /// text when the response lands, rebuild issues and markers from it.
    async fn run_check_cycle(&mut self) {
        let submitted = self.text.clone();
        let Some(response) = self.check.check(&submitted).await else {
            // No result this cycle (failure or supersession): nothing to
            // annotate. A winning newer cycle repaints right after.
            self.issues.clear();
            self.renderer.clear();
            return;
        };
        // The response is only valid for the exact text it was computed
        // from; the composer may have moved on while the request was in
        // flight.
        let live = match &self.composer {
            Some(composer) => composer.tree().flatten(),
            None => return,
        };
        if live != submitted {
            debug!(target: "session", "stale_response_discarded");
            return;
        }
        let toggles = CategoryToggles::from(&self.config);
        self.issues = parse_matches(&response, &submitted, &toggles, &self.suppression);
        debug!(target: "session", issues = self.issues.len(), "check_cycle_complete");
        self.repaint();
    }

    /// Rebuild markers from the current issues against the live geometry.
    fn repaint(&mut self) {
        let Some(composer) = &self.composer else {
            return;
        };
        let tree = composer.tree();
        let metrics = composer.metrics();
        self.renderer.render(
            &self.issues,
            &self.text,
            &tree,
            &metrics,
            self.config.underline_style,
        );
    }

    /// Hit-test a pointer press: a press on a flagged span opens the
    /// correction popup, anywhere else closes it.
    fn resolve_click(&mut self, x: f32, y: f32) {
        let hit = self.composer.as_ref().and_then(|composer| {
            let offset = offset_at_point(&self.text, &composer.metrics(), x, y)?;
            self.issues
                .iter()
                .position(|issue| issue.start <= offset && offset < issue.end)
        });
        self.popup = hit.map(|index| {
            CorrectionPopup::build(index, &self.issues[index], &self.text, (x, y))
        });
    }

    /// Apply the popup's `candidate`-th replacement: splice the text, keep
    /// the caret where the user would expect it, and re-arm the checker.
    pub fn apply_replacement(&mut self, candidate: usize) {
        let Some(popup) = self.popup.take() else {
            return;
        };
        let Some(issue) = self.issues.get(popup.issue).cloned() else {
            return;
        };
        let Some(replacement) = popup.candidates.get(candidate).map(|c| c.value.clone()) else {
            return;
        };
        let Some(composer) = self.composer.as_mut() else {
            return;
        };
        let caret = composer.caret();
        let Some(new_text) = replace_span(&self.text, issue.start, issue.end, &replacement) else {
            warn!(
                target: "session",
                start = issue.start,
                end = issue.end,
                "replacement_span_no_longer_resolves"
            );
            return;
        };
        let old_len = issue.end - issue.start;
        let new_len = char_len(&replacement);
        // Caret before the span is untouched, after it shifts by the length
        // delta, inside it lands at the end of the replacement.
        let new_caret = if caret >= issue.end {
            caret - old_len + new_len
        } else if caret > issue.start {
            issue.start + new_len
        } else {
            caret
        };
        composer.replace_all(&new_text);
        composer.set_caret(new_caret);
        self.text = new_text;

        // Surviving issues keep their underlines while the re-check is in
        // flight: spans after the splice shift, overlapping ones are gone.
        let delta = new_len as isize - old_len as isize;
        self.issues = std::mem::take(&mut self.issues)
            .into_iter()
            .enumerate()
            .filter(|(index, other)| {
                *index != popup.issue && (other.end <= issue.start || other.start >= issue.end)
            })
            .map(|(_, mut other)| {
                if other.start >= issue.end {
                    other.start = (other.start as isize + delta) as usize;
                    other.end = (other.end as isize + delta) as usize;
                }
                other
            })
            .collect();
        self.repaint();
        self.schedule_debounce();
    }

    /// Silence the popup's word for the current message only.
    pub fn ignore_once(&mut self) {
        let Some(popup) = self.popup.take() else {
            return;
        };
        let Some(word) = self
            .issues
            .get(popup.issue)
            .and_then(|issue| issue.word(&self.text))
            .map(str::to_string)
        else {
            return;
        };
        self.suppression.add_volatile(&word);
        self.refilter_suppressed();
    }

    /// Add the popup's word to the personal dictionary and persist it.
    pub async fn add_to_dictionary(&mut self) {
        let Some(popup) = self.popup.take() else {
            return;
        };
        let Some(word) = self
            .issues
            .get(popup.issue)
            .and_then(|issue| issue.word(&self.text))
            .map(str::to_string)
        else {
            return;
        };
        if self.suppression.add_durable(&word) {
            if let Err(e) = self.suppression.save(self.kv.as_ref()).await {
                // In-memory state already holds the word for this session.
                warn!(target: "session", error = %e, "dictionary_save_failed");
            }
        }
        self.refilter_suppressed();
    }

    /// Drop issues whose word became suppressed since the last check, then
    /// repaint what remains.
    fn refilter_suppressed(&mut self) {
        let suppression = &self.suppression;
        let text = &self.text;
        self.issues.retain(|issue| {
            issue
                .word(text)
                .map(|word| !suppression.is_suppressed(word))
                .unwrap_or(false)
        });
        self.repaint();
    }

    pub fn open_ignore_editor(&mut self) {
        self.ignore_editor = Some(IgnoreListEditor::new());
    }

    pub fn ignore_editor_char(&mut self, c: char) {
        if let Some(editor) = self.ignore_editor.as_mut() {
            editor.handle_char(c, &mut self.suppression);
        }
    }

    pub fn ignore_editor_backspace(&mut self) {
        if let Some(editor) = self.ignore_editor.as_mut() {
            editor.handle_backspace(&mut self.suppression);
        }
    }

    pub fn ignore_editor_copy_all(&self) -> Option<String> {
        self.ignore_editor
            .as_ref()
            .map(|editor| editor.copy_all(&self.suppression))
    }

    pub fn ignore_editor_clear_all(&mut self) {
        if let Some(editor) = self.ignore_editor.take() {
            editor.clear_all(&mut self.suppression);
            self.ignore_editor = Some(editor);
        }
    }

    /// Close the editor: commit pending input, persist, and re-filter the
    /// live issues against the edited list.
    pub async fn close_ignore_editor(&mut self) {
        let Some(mut editor) = self.ignore_editor.take() else {
            return;
        };
        editor.flush(&mut self.suppression);
        if let Err(e) = self.suppression.save(self.kv.as_ref()).await {
            warn!(target: "session", error = %e, "ignore_list_save_failed");
        }
        self.refilter_suppressed();
    }

    /// The composer went away: cancel timers, restore what we borrowed from
    /// the platform, and drop every piece of derived state.
    fn teardown(&mut self) {
        info!(target: "session", "composer_teardown");
        self.debounce_gen += 1;
        if let Some(composer) = self.composer.as_mut() {
            if self.spellcheck_suppressed {
                composer.set_native_spellcheck(true);
            }
        }
        self.spellcheck_suppressed = false;
        self.composer = None;
        self.popup = None;
        self.ignore_editor = None;
        self.issues.clear();
        self.renderer.clear();
        self.text.clear();
        self.check.flush();
    }

    pub fn issues(&self) -> &[Issue] {
        &self.issues
    }

    pub fn markers(&self) -> &[Marker] {
        self.renderer.markers()
    }

    pub fn popup(&self) -> Option<&CorrectionPopup> {
        self.popup.as_ref()
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn is_attached(&self) -> bool {
        self.composer.is_some()
    }

    pub fn suppression(&self) -> &SuppressionStore {
        &self.suppression
    }
}
