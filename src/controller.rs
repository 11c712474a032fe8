//! Top-level key routing: script mode, shift state, homophone-lookup
//! priority, and commit coordination with the association learner.
//!
//! The controller is the single entry point for the host: key events come in
//! as either a decoded [`Key`] or a (row, column) index into the active
//! [`KeyLayout`], and after each event the host reads the [`EngineContext`]
//! to apply text edits and refresh its candidate display.

use std::sync::Arc;
use tracing::{debug, warn};

use crate::assoc::is_trackable;
use crate::context::EngineContext;
use crate::editor::homophone::LookupStage;
use crate::editor::{Editor, EditorResult, HomophoneEditor, RootEditor};
use crate::engine::Engine;
use crate::session::{ScriptMode, Session, ShiftState};

/// One decoded key press.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Key {
    /// A literal character key (letter, digit or symbol).
    Char(char),
    Space,
    Backspace,
    Enter,
    /// Cycles the three-state shift.
    Shift,
    /// Toggles Phonetic ↔ Alphabetic.
    ModeToggle,
    /// Toggles Symbol mode on and off.
    SymbolToggle,
}

/// Whether the engine consumed a key event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyResult {
    Handled,
    NotHandled,
}

/// Row/column grid of keys, for hosts that deliver positional events.
#[derive(Debug, Clone)]
pub struct KeyLayout {
    rows: Vec<Vec<Key>>,
}

impl KeyLayout {
    pub fn new(rows: Vec<Vec<Key>>) -> Self {
        Self { rows }
    }

    /// The key at (row, column), or None for an out-of-range index.
    pub fn key_at(&self, row: usize, col: usize) -> Option<Key> {
        self.rows.get(row)?.get(col).copied()
    }
}

impl Default for KeyLayout {
    /// The standard five-row grid: a digit row, three letter rows with
    /// backspace and enter at the row ends, and a bottom row of symbol
    /// toggle, space and mode toggle.
    fn default() -> Self {
        let mut rows = Vec::with_capacity(5);
        rows.push("1234567890".chars().map(Key::Char).collect());
        rows.push("qwertyuiop".chars().map(Key::Char).collect());

        let mut row: Vec<Key> = "asdfghjkl".chars().map(Key::Char).collect();
        row.push(Key::Backspace);
        rows.push(row);

        let mut row = vec![Key::Shift];
        row.extend("zxcvbnm".chars().map(Key::Char));
        row.push(Key::Enter);
        rows.push(row);

        rows.push(vec![Key::SymbolToggle, Key::Space, Key::ModeToggle]);
        Self::new(rows)
    }
}

/// Top-level input session controller.
pub struct InputController {
    backend: Arc<Engine>,
    session: Session,
    context: EngineContext,
    root: RootEditor,
    lookup: HomophoneEditor,
    lookup_active: bool,
    layout: KeyLayout,
    /// Character immediately before the cursor, per the host.
    preceding: Option<char>,
    /// Last recorded association pair, undone if the very next event is a
    /// bare backspace.
    last_commit: Option<(char, char)>,
    /// Script mode to restore when symbol mode is toggled off.
    symbol_return: ScriptMode,
}

impl InputController {
    pub fn new(backend: Arc<Engine>) -> Self {
        Self::with_layout(backend, KeyLayout::default())
    }

    pub fn with_layout(backend: Arc<Engine>, layout: KeyLayout) -> Self {
        let root = RootEditor::new(Arc::clone(&backend));
        let lookup = HomophoneEditor::new(Arc::clone(&backend));
        let mut controller = Self {
            backend,
            session: Session::new(),
            context: EngineContext::new(),
            root,
            lookup,
            lookup_active: false,
            layout,
            preceding: None,
            last_commit: None,
            symbol_return: ScriptMode::Phonetic,
        };
        controller.sync_context();
        controller
    }

    /// Output of the last processed event.
    pub fn context(&self) -> &EngineContext {
        &self.context
    }

    pub fn context_mut(&mut self) -> &mut EngineContext {
        &mut self.context
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    pub fn backend(&self) -> &Arc<Engine> {
        &self.backend
    }

    pub fn is_lookup_active(&self) -> bool {
        self.lookup_active
    }

    /// The host calls this when the cursor context changes (cursor moved,
    /// text replaced) so association learning sees the true preceding
    /// character. Invalidates the pending backspace-undo pair.
    pub fn sync_preceding(&mut self, preceding: Option<char>) {
        self.preceding = preceding;
        self.last_commit = None;
    }

    /// Force a final association flush; the host calls this on session
    /// teardown so no buffered pair is lost.
    pub fn teardown(&self) {
        self.backend.associations().flush_now();
    }

    /// Process a positional key event against the active layout. Out-of-range
    /// indices are discarded with a diagnostic.
    pub fn process_indexed(&mut self, row: usize, col: usize) -> KeyResult {
        match self.layout.key_at(row, col) {
            Some(key) => self.process_key(key),
            None => {
                warn!(row, col, "key index out of range for layout, discarded");
                KeyResult::NotHandled
            }
        }
    }

    /// Process one decoded key event.
    pub fn process_key(&mut self, key: Key) -> KeyResult {
        self.context.begin_event();
        let result = if self.lookup_active {
            self.process_in_lookup(key)
        } else {
            self.process_by_mode(key)
        };
        self.sync_context();
        result
    }

    /// Select the candidate at `index` (a tap on the candidate bar), or an
    /// associated character when the association list is what is displayed.
    pub fn select_candidate(&mut self, index: usize) -> KeyResult {
        self.context.begin_event();
        let result = if self.lookup_active {
            let result = self.lookup.select(index, &mut self.session);
            self.apply_lookup_result(result)
        } else if self.session.has_pending() {
            match self.root.select(index, &mut self.session) {
                EditorResult::CommitAndReset(text) => {
                    self.root.reset(&mut self.session);
                    self.emit_commit(&text);
                    KeyResult::Handled
                }
                _ => KeyResult::NotHandled,
            }
        } else if let Some(assoc) = self.context.associations.get(index).cloned() {
            self.emit_commit(&assoc);
            KeyResult::Handled
        } else {
            KeyResult::NotHandled
        };
        self.sync_context();
        result
    }

    /// Lookup-active routing: the state machine consumes everything except
    /// the explicit exit keys, which exit first and then re-dispatch.
    fn process_in_lookup(&mut self, key: Key) -> KeyResult {
        match key {
            Key::ModeToggle | Key::SymbolToggle | Key::Enter => {
                self.exit_lookup();
                return self.process_by_mode(key);
            }
            Key::Shift => {
                let shift = self.session.shift();
                self.session.set_shift(shift.cycled());
                return KeyResult::Handled;
            }
            _ => {}
        }
        let result = self.lookup.process_key(key, &mut self.session);
        self.apply_lookup_result(result)
    }

    fn apply_lookup_result(&mut self, result: EditorResult) -> KeyResult {
        match result {
            EditorResult::Handled => KeyResult::Handled,
            EditorResult::Commit(text) => {
                self.emit_commit(&text);
                KeyResult::Handled
            }
            EditorResult::CommitAndReset(text) => {
                self.exit_lookup();
                if !text.is_empty() {
                    self.emit_commit(&text);
                }
                KeyResult::Handled
            }
            EditorResult::PassThrough => KeyResult::NotHandled,
        }
    }

    fn enter_lookup(&mut self) {
        // Entering the lookup discards any pending root-accumulator spelling.
        self.root.reset(&mut self.session);
        self.lookup.reset(&mut self.session);
        self.lookup_active = true;
        debug!("homophone lookup entered");
    }

    fn exit_lookup(&mut self) {
        self.lookup.reset(&mut self.session);
        self.lookup_active = false;
        debug!("homophone lookup exited");
    }

    /// Normal mode routing.
    fn process_by_mode(&mut self, key: Key) -> KeyResult {
        match key {
            Key::ModeToggle => {
                let next = match self.session.script() {
                    ScriptMode::Phonetic => ScriptMode::Alphabetic,
                    ScriptMode::Alphabetic | ScriptMode::Symbol => ScriptMode::Phonetic,
                };
                // Mode switches always discard pending input.
                self.root.reset(&mut self.session);
                self.session.set_script(next);
                KeyResult::Handled
            }
            Key::SymbolToggle => {
                if self.session.script() == ScriptMode::Symbol {
                    let restored = self.symbol_return;
                    self.session.set_script(restored);
                } else {
                    self.symbol_return = self.session.script();
                    self.root.reset(&mut self.session);
                    self.session.set_script(ScriptMode::Symbol);
                }
                KeyResult::Handled
            }
            Key::Shift => {
                let shift = self.session.shift();
                self.session.set_shift(shift.cycled());
                KeyResult::Handled
            }
            Key::Space => self.handle_space(),
            Key::Backspace => self.handle_backspace(),
            Key::Enter => {
                // A pending spelling is discarded, never auto-committed.
                self.root.reset(&mut self.session);
                self.emit_commit("\n");
                KeyResult::Handled
            }
            Key::Char(ch) => self.handle_char(ch),
        }
    }

    fn handle_space(&mut self) -> KeyResult {
        if self.session.script() == ScriptMode::Phonetic {
            match self.root.process_key(Key::Space, &mut self.session) {
                EditorResult::CommitAndReset(text) => {
                    self.root.reset(&mut self.session);
                    if !text.is_empty() {
                        self.emit_commit(&text);
                    }
                    return KeyResult::Handled;
                }
                EditorResult::Handled | EditorResult::Commit(_) => return KeyResult::Handled,
                EditorResult::PassThrough => {}
            }
        }
        self.emit_commit(" ");
        KeyResult::Handled
    }

    fn handle_backspace(&mut self) -> KeyResult {
        if self.session.script() == ScriptMode::Phonetic && self.session.has_pending() {
            match self.root.process_key(Key::Backspace, &mut self.session) {
                EditorResult::PassThrough => {}
                _ => return KeyResult::Handled,
            }
        }
        // Nothing pending: delete from the host text and undo the learned
        // pair if this backspace erases the character just committed.
        self.context.delete_backward = true;
        if let Some((prev, curr)) = self.last_commit.take() {
            self.backend.associations().decrease(prev, curr);
        }
        self.preceding = None;
        self.context.associations.clear();
        KeyResult::Handled
    }

    fn handle_char(&mut self, ch: char) -> KeyResult {
        match self.session.script() {
            ScriptMode::Phonetic => {
                if ch == self.backend.config().reverse_lookup_key {
                    self.enter_lookup();
                    return KeyResult::Handled;
                }
                match self.root.process_key(Key::Char(ch), &mut self.session) {
                    EditorResult::Commit(text) => {
                        self.emit_commit(&text);
                        KeyResult::Handled
                    }
                    EditorResult::CommitAndReset(text) => {
                        self.root.reset(&mut self.session);
                        if !text.is_empty() {
                            self.emit_commit(&text);
                        }
                        KeyResult::Handled
                    }
                    EditorResult::Handled => KeyResult::Handled,
                    EditorResult::PassThrough => KeyResult::NotHandled,
                }
            }
            ScriptMode::Alphabetic => {
                let literal = if self.session.shift().is_active() {
                    ch.to_ascii_uppercase()
                } else {
                    ch
                };
                self.emit_commit(&literal.to_string());
                if ch.is_ascii_alphabetic() {
                    let shift = self.session.shift();
                    self.session.set_shift(shift.after_literal());
                }
                KeyResult::Handled
            }
            ScriptMode::Symbol => {
                self.emit_commit(&ch.to_string());
                KeyResult::Handled
            }
        }
    }

    /// Publish committed text and run the association side of a commit:
    /// record the (preceding, committed) pair for qualifying single
    /// characters and surface the learned follow-up suggestions.
    fn emit_commit(&mut self, text: &str) {
        if text.is_empty() {
            return;
        }
        self.context.commit_text.push_str(text);

        let mut chars = text.chars();
        let single = match (chars.next(), chars.next()) {
            (Some(ch), None) => Some(ch),
            _ => None,
        };
        match single {
            Some(ch) if is_trackable(ch) => {
                self.last_commit = self.preceding.and_then(|prev| {
                    self.backend
                        .associations()
                        .record(prev, ch)
                        .then_some((prev, ch))
                });
                let limit = self.backend.config().assoc_query_limit;
                self.context.associations = self.backend.associations().query(ch, limit);
            }
            _ => {
                self.last_commit = None;
                self.context.associations.clear();
            }
        }
        self.preceding = text.chars().last();
    }

    fn sync_context(&mut self) {
        self.context.code_text = if self.lookup_active {
            let trigger = self.backend.config().reverse_lookup_key;
            format!("{}{}", trigger, self.session.spelling().text())
        } else {
            self.session.spelling().text().to_string()
        };
        self.context.candidates = self.session.candidates().to_vec();
        self.context.mode_label = self.mode_label().to_string();
    }

    /// Short legend for the active mode, shown by the host.
    fn mode_label(&self) -> &'static str {
        if self.lookup_active {
            return match self.lookup.stage() {
                LookupStage::RootEntry => "查音",
                LookupStage::PronunciationSelection => "選音",
                LookupStage::HomophoneSelection => "同音",
            };
        }
        match (self.session.script(), self.session.shift()) {
            (ScriptMode::Phonetic, _) => "嘸蝦米",
            (ScriptMode::Alphabetic, ShiftState::Off) => "英文",
            (ScriptMode::Alphabetic, ShiftState::Temporary) => "英文↑",
            (ScriptMode::Alphabetic, ShiftState::Locked) => "英文⇪",
            (ScriptMode::Symbol, _) => "符號",
        }
    }
}

impl std::fmt::Debug for InputController {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InputController")
            .field("script", &self.session.script())
            .field("shift", &self.session.shift())
            .field("lookup_active", &self.lookup_active)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::tests::test_backend;

    fn controller() -> InputController {
        InputController::new(test_backend())
    }

    fn type_chars(c: &mut InputController, text: &str) {
        for ch in text.chars() {
            c.process_key(Key::Char(ch));
        }
    }

    #[test]
    fn phonetic_typing_publishes_code_and_candidates() {
        let mut c = controller();
        type_chars(&mut c, "ab");
        assert_eq!(c.context().code_text, "ab");
        assert_eq!(c.context().candidates, ["火"]);
        assert_eq!(c.context().mode_label, "嘸蝦米");
    }

    #[test]
    fn space_commits_first_candidate_and_clears_pending() {
        let mut c = controller();
        type_chars(&mut c, "ab");
        c.process_key(Key::Space);
        assert_eq!(c.context().commit_text, "火");
        assert!(c.context().code_text.is_empty());
        assert!(c.context().candidates.is_empty());
    }

    #[test]
    fn space_without_pending_inserts_literal_space() {
        let mut c = controller();
        c.process_key(Key::Space);
        assert_eq!(c.context().commit_text, " ");
    }

    #[test]
    fn digits_commit_immediately_and_keep_spelling() {
        let mut c = controller();
        type_chars(&mut c, "a");
        c.process_key(Key::Char('7'));
        assert_eq!(c.context().commit_text, "7");
        assert_eq!(c.context().code_text, "a");
    }

    #[test]
    fn mode_toggle_clears_pending_spelling() {
        let mut c = controller();
        type_chars(&mut c, "ab");
        c.process_key(Key::ModeToggle);
        assert_eq!(c.session().script(), ScriptMode::Alphabetic);
        assert!(c.context().code_text.is_empty());
        assert!(c.context().candidates.is_empty());
    }

    #[test]
    fn alphabetic_mode_applies_shift_casing() {
        let mut c = controller();
        c.process_key(Key::ModeToggle);

        c.process_key(Key::Char('a'));
        assert_eq!(c.context().commit_text, "a");

        // Temporary shift applies to exactly one letter.
        c.process_key(Key::Shift);
        c.process_key(Key::Char('b'));
        assert_eq!(c.context().commit_text, "B");
        c.process_key(Key::Char('c'));
        assert_eq!(c.context().commit_text, "c");

        // Locked shift persists.
        c.process_key(Key::Shift);
        c.process_key(Key::Shift);
        assert_eq!(c.session().shift(), ShiftState::Locked);
        c.process_key(Key::Char('d'));
        c.process_key(Key::Char('e'));
        assert_eq!(c.context().commit_text, "E");
    }

    #[test]
    fn symbol_toggle_round_trips_to_previous_script() {
        let mut c = controller();
        c.process_key(Key::ModeToggle);
        c.process_key(Key::SymbolToggle);
        assert_eq!(c.session().script(), ScriptMode::Symbol);
        assert_eq!(c.context().mode_label, "符號");

        c.process_key(Key::Char('@'));
        assert_eq!(c.context().commit_text, "@");

        c.process_key(Key::SymbolToggle);
        assert_eq!(c.session().script(), ScriptMode::Alphabetic);
    }

    #[test]
    fn trigger_key_enters_lookup_and_discards_pending() {
        let mut c = controller();
        type_chars(&mut c, "ab");
        c.process_key(Key::Char('\''));
        assert!(c.is_lookup_active());
        assert_eq!(c.context().code_text, "'");
        assert!(c.context().candidates.is_empty());
    }

    #[test]
    fn trigger_key_inside_lookup_is_swallowed() {
        let mut c = controller();
        c.process_key(Key::Char('\''));
        c.process_key(Key::Char('a'));
        c.process_key(Key::Char('\''));
        c.process_key(Key::Char('b'));
        assert!(c.is_lookup_active());
        assert_eq!(c.context().code_text, "'ab");
        assert!(!c.session().spelling().text().contains('\''));
        assert_eq!(c.context().candidates, ["火"]);
    }

    #[test]
    fn lookup_flow_commits_homophone_through_controller() {
        let mut c = controller();
        c.process_key(Key::Char('\''));
        type_chars(&mut c, "ab");
        c.select_candidate(0);
        assert_eq!(c.context().candidates, ["huo3"]);
        c.select_candidate(0);
        assert_eq!(c.context().candidates, ["火", "伙", "夥"]);
        c.select_candidate(2);
        assert_eq!(c.context().commit_text, "夥");
        assert!(!c.is_lookup_active());
        assert!(c.context().candidates.is_empty());
    }

    #[test]
    fn lookup_exits_on_mode_toggle_and_redispatches() {
        let mut c = controller();
        c.process_key(Key::Char('\''));
        type_chars(&mut c, "ab");
        c.process_key(Key::ModeToggle);
        assert!(!c.is_lookup_active());
        assert_eq!(c.session().script(), ScriptMode::Alphabetic);
        assert!(c.context().code_text.is_empty());
    }

    #[test]
    fn empty_lookup_select_emits_trigger_symbol() {
        let mut c = controller();
        c.process_key(Key::Char('\''));
        c.process_key(Key::Space);
        assert_eq!(c.context().commit_text, "'");
        assert!(!c.is_lookup_active());
    }

    #[test]
    fn out_of_range_index_is_discarded() {
        let mut c = controller();
        assert_eq!(c.process_indexed(9, 0), KeyResult::NotHandled);
        assert_eq!(c.process_indexed(0, 99), KeyResult::NotHandled);
    }

    #[test]
    fn indexed_events_resolve_through_layout() {
        let mut c = controller();
        // Row 1 is qwertyuiop; 'q' commits nothing but appends a root.
        assert_eq!(c.process_indexed(1, 0), KeyResult::Handled);
        assert_eq!(c.context().code_text, "q");
        // Bottom row middle key is space.
        assert_eq!(c.process_indexed(4, 1), KeyResult::Handled);
    }

    #[test]
    fn commits_record_associations_and_surface_suggestions() {
        let mut c = controller();
        type_chars(&mut c, "ab");
        c.process_key(Key::Space); // commits 火, no preceding context yet
        assert!(c.context().associations.is_empty());

        type_chars(&mut c, "abc");
        c.process_key(Key::Space); // commits 金 after 火, records (火, 金)

        type_chars(&mut c, "ab");
        c.process_key(Key::Space); // commits 火 again; 金 is a known follower
        assert_eq!(c.context().associations, ["金"]);
    }

    #[test]
    fn commit_after_latin_context_records_nothing() {
        let mut c = controller();
        c.process_key(Key::ModeToggle);
        c.process_key(Key::Char('x'));
        c.process_key(Key::ModeToggle);

        type_chars(&mut c, "ab");
        c.process_key(Key::Space); // 火 after 'x'
        assert!(c.context().associations.is_empty());
        assert_eq!(c.backend().associations().pending(), 0);
    }

    #[test]
    fn bare_backspace_deletes_and_undoes_last_pair() {
        let mut c = controller();
        type_chars(&mut c, "ab");
        c.process_key(Key::Space);
        type_chars(&mut c, "abc");
        c.process_key(Key::Space); // records (火, 金)
        c.process_key(Key::Backspace);
        assert!(c.context().delete_backward);
        assert!(c.context().associations.is_empty());

        // A second bare backspace has no recorded pair left to undo.
        c.process_key(Key::Backspace);
        assert!(c.context().delete_backward);
    }

    #[test]
    fn backspace_with_pending_edits_spelling_not_text() {
        let mut c = controller();
        type_chars(&mut c, "ab");
        c.process_key(Key::Backspace);
        assert!(!c.context().delete_backward);
        assert_eq!(c.context().code_text, "a");
    }

    #[test]
    fn enter_discards_pending_and_commits_newline() {
        let mut c = controller();
        type_chars(&mut c, "ab");
        c.process_key(Key::Enter);
        assert_eq!(c.context().commit_text, "\n");
        assert!(c.context().code_text.is_empty());
    }

    #[test]
    fn association_suggestion_is_selectable() {
        let mut c = controller();
        type_chars(&mut c, "ab");
        c.process_key(Key::Space);
        type_chars(&mut c, "abc");
        c.process_key(Key::Space); // records (火, 金)
        type_chars(&mut c, "ab");
        c.process_key(Key::Space); // 火 again, suggests 金
        assert_eq!(c.context().associations, ["金"]);

        assert_eq!(c.select_candidate(0), KeyResult::Handled);
        assert_eq!(c.context().commit_text, "金");
    }
}
