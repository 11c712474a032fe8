//! Root accumulator: ordinary Boshiamy phonetic entry.
//!
//! Letters append to the spelling and requery the dictionary; digits never
//! enter the spelling and commit immediately as literal text. The
//! reverse-lookup trigger key never reaches this editor (the controller
//! intercepts it and starts the homophone flow instead).

use std::sync::Arc;

use super::{Editor, EditorResult};
use crate::controller::Key;
use crate::engine::Engine;
use crate::session::Session;

/// Phonetic root-entry editor backed by the dictionary store.
pub struct RootEditor {
    backend: Arc<Engine>,
}

impl RootEditor {
    pub fn new(backend: Arc<Engine>) -> Self {
        Self { backend }
    }

    /// Requery the dictionary for the current spelling and republish the
    /// candidate list.
    fn refresh(&self, session: &mut Session) {
        let candidates = self.backend.lookup(session.spelling().text());
        session.set_candidates(candidates);
    }

    fn handle_char(&mut self, ch: char, session: &mut Session) -> EditorResult {
        // Digits bypass accumulation entirely and go out as literal text,
        // leaving any pending spelling untouched.
        if ch.is_ascii_digit() {
            return EditorResult::Commit(ch.to_string());
        }
        session.spelling_mut().push(ch);
        self.refresh(session);
        EditorResult::Handled
    }

    fn handle_backspace(&mut self, session: &mut Session) -> EditorResult {
        if !session.spelling_mut().drop_last() {
            return EditorResult::PassThrough;
        }
        if session.spelling().is_empty() {
            session.set_candidates(Vec::new());
        } else {
            self.refresh(session);
        }
        EditorResult::Handled
    }

    /// The neutral select action: first candidate if any, otherwise discard a
    /// non-empty spelling, otherwise let the caller treat the key literally.
    fn handle_select_first(&mut self, session: &mut Session) -> EditorResult {
        if let Some(first) = session.candidates().first() {
            return EditorResult::CommitAndReset(first.clone());
        }
        if session.has_pending() {
            return EditorResult::CommitAndReset(String::new());
        }
        EditorResult::PassThrough
    }
}

impl Editor for RootEditor {
    fn process_key(&mut self, key: Key, session: &mut Session) -> EditorResult {
        match key {
            Key::Char(ch) => self.handle_char(ch, session),
            Key::Backspace => self.handle_backspace(session),
            Key::Space => self.handle_select_first(session),
            // Mode, shift and newline handling belong to the controller.
            Key::Enter | Key::Shift | Key::ModeToggle | Key::SymbolToggle => {
                EditorResult::PassThrough
            }
        }
    }

    fn select(&mut self, index: usize, session: &mut Session) -> EditorResult {
        match session.candidates().get(index) {
            Some(candidate) => EditorResult::CommitAndReset(candidate.clone()),
            None => EditorResult::PassThrough,
        }
    }

    fn reset(&mut self, session: &mut Session) {
        session.clear_pending();
    }

    fn name(&self) -> &'static str {
        "RootEditor"
    }
}
