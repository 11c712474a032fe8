//! Homophone reverse lookup: find a character by describing a character that
//! sounds the same.
//!
//! A layered flow on top of the dictionary and the pronunciation index. The
//! user first enters roots for a character they *can* type, picks one of its
//! pronunciations, then picks the target character from the homophones of
//! that pronunciation. Backspace steps back exactly one stage; the spelling
//! is kept untouched across the later stages so each backstep restores the
//! exact candidate list the stage showed on forward entry.
//!
//! Idle is not a stage here: the controller owns entry and exit, and a
//! `CommitAndReset` result (possibly with empty text) is the exit signal.

use std::sync::Arc;

use super::{Editor, EditorResult};
use crate::controller::Key;
use crate::engine::Engine;
use crate::session::Session;

/// Active stage of the lookup flow.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LookupStage {
    /// Collecting roots for the same-sounding character.
    #[default]
    RootEntry,
    /// Choosing among the selected character's pronunciations.
    PronunciationSelection,
    /// Choosing the target among the homophones of the chosen pronunciation.
    HomophoneSelection,
}

/// Reverse-lookup state machine editor.
pub struct HomophoneEditor {
    backend: Arc<Engine>,
    stage: LookupStage,
    /// Character picked in RootEntry; needed to rebuild the pronunciation
    /// list when stepping back from HomophoneSelection.
    selected_char: Option<char>,
}

impl HomophoneEditor {
    pub fn new(backend: Arc<Engine>) -> Self {
        Self {
            backend,
            stage: LookupStage::RootEntry,
            selected_char: None,
        }
    }

    pub fn stage(&self) -> LookupStage {
        self.stage
    }

    fn refresh_dictionary(&self, session: &mut Session) {
        let candidates = self.backend.lookup(session.spelling().text());
        session.set_candidates(candidates);
    }

    /// Re-enter RootEntry with the original spelling's candidates re-shown.
    fn restore_root_entry(&mut self, session: &mut Session) {
        self.stage = LookupStage::RootEntry;
        self.selected_char = None;
        if session.spelling().is_empty() {
            session.set_candidates(Vec::new());
        } else {
            self.refresh_dictionary(session);
        }
    }

    fn restore_pronunciation_selection(&mut self, session: &mut Session) {
        if let Some(ch) = self.selected_char {
            self.stage = LookupStage::PronunciationSelection;
            session.set_candidates(self.backend.pronunciations_of(ch));
        } else {
            self.restore_root_entry(session);
        }
    }

    fn handle_char(&mut self, ch: char, session: &mut Session) -> EditorResult {
        if ch.is_ascii_digit() {
            return EditorResult::Commit(ch.to_string());
        }
        // A repeated trigger press cannot nest a lookup and must never reach
        // the spelling; swallow it like stray letters in the later stages.
        if ch == self.backend.config().reverse_lookup_key {
            return EditorResult::Handled;
        }
        match self.stage {
            LookupStage::RootEntry => {
                session.spelling_mut().push(ch);
                self.refresh_dictionary(session);
                EditorResult::Handled
            }
            // Selection stages are index-driven; stray letters are swallowed
            // so they cannot corrupt the displayed list.
            LookupStage::PronunciationSelection | LookupStage::HomophoneSelection => {
                EditorResult::Handled
            }
        }
    }

    fn handle_backspace(&mut self, session: &mut Session) -> EditorResult {
        match self.stage {
            LookupStage::HomophoneSelection => {
                self.restore_pronunciation_selection(session);
                EditorResult::Handled
            }
            LookupStage::PronunciationSelection => {
                self.restore_root_entry(session);
                EditorResult::Handled
            }
            LookupStage::RootEntry => {
                if session.spelling_mut().drop_last() {
                    if session.spelling().is_empty() {
                        session.set_candidates(Vec::new());
                    } else {
                        self.refresh_dictionary(session);
                    }
                    EditorResult::Handled
                } else {
                    // Empty spelling: leave the lookup without emitting text.
                    EditorResult::CommitAndReset(String::new())
                }
            }
        }
    }

    fn select_in_root_entry(&mut self, index: usize, session: &mut Session) -> EditorResult {
        if session.spelling().is_empty() && session.candidates().is_empty() {
            // Neutral select before any root: the user wanted the trigger
            // symbol itself, not a lookup.
            let symbol = self.backend.config().reverse_lookup_key;
            return EditorResult::CommitAndReset(symbol.to_string());
        }
        let Some(candidate) = session.candidates().get(index).cloned() else {
            return EditorResult::PassThrough;
        };
        let mut chars = candidate.chars();
        let (first, rest) = (chars.next(), chars.next());
        match (first, rest) {
            (Some(ch), None) => {
                let pronunciations = self.backend.pronunciations_of(ch);
                if pronunciations.is_empty() {
                    // Nothing catalogued for this character; commit it as-is.
                    EditorResult::CommitAndReset(candidate)
                } else {
                    self.stage = LookupStage::PronunciationSelection;
                    self.selected_char = Some(ch);
                    session.set_candidates(pronunciations);
                    EditorResult::Handled
                }
            }
            // Multi-character words have no single pronunciation to pivot on.
            _ => EditorResult::CommitAndReset(candidate),
        }
    }

    fn select_pronunciation(&mut self, index: usize, session: &mut Session) -> EditorResult {
        let Some(pronunciation) = session.candidates().get(index).cloned() else {
            return EditorResult::PassThrough;
        };
        let homophones = self.backend.homophones_of(&pronunciation);
        if homophones.is_empty() {
            // Pronunciation with no catalogued homophones: fall back to root
            // entry with the original candidates re-shown.
            self.restore_root_entry(session);
            EditorResult::Handled
        } else {
            self.stage = LookupStage::HomophoneSelection;
            session.set_candidates(homophones);
            EditorResult::Handled
        }
    }

    fn select_homophone(&mut self, index: usize, session: &mut Session) -> EditorResult {
        match session.candidates().get(index).cloned() {
            Some(target) => EditorResult::CommitAndReset(target),
            None => EditorResult::PassThrough,
        }
    }
}

impl Editor for HomophoneEditor {
    fn process_key(&mut self, key: Key, session: &mut Session) -> EditorResult {
        match key {
            Key::Char(ch) => self.handle_char(ch, session),
            Key::Backspace => self.handle_backspace(session),
            Key::Space => self.select(0, session),
            // Exit keys are intercepted by the controller before routing.
            Key::Enter | Key::Shift | Key::ModeToggle | Key::SymbolToggle => {
                EditorResult::PassThrough
            }
        }
    }

    fn select(&mut self, index: usize, session: &mut Session) -> EditorResult {
        match self.stage {
            LookupStage::RootEntry => self.select_in_root_entry(index, session),
            LookupStage::PronunciationSelection => self.select_pronunciation(index, session),
            LookupStage::HomophoneSelection => self.select_homophone(index, session),
        }
    }

    fn reset(&mut self, session: &mut Session) {
        self.stage = LookupStage::RootEntry;
        self.selected_char = None;
        session.clear_pending();
    }

    fn name(&self) -> &'static str {
        "HomophoneEditor"
    }
}
