//! Session state: script mode, shift state, and the pending input shared by
//! the editors.
//!
//! Shift and script mode are explicit enumerations with transition methods,
//! never loose boolean flags.

use crate::Spelling;

/// Which script the session currently produces.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ScriptMode {
    /// Boshiamy root input resolving to Chinese characters.
    #[default]
    Phonetic,
    /// Direct Latin-letter output with shift casing.
    Alphabetic,
    /// Symbols passed through unmodified.
    Symbol,
}

/// Three-state shift: off → temporary → locked → off.
///
/// Temporary shift reverts to off after exactly one literal alphabetic
/// character is emitted; locked shift persists until toggled again.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ShiftState {
    #[default]
    Off,
    Temporary,
    Locked,
}

impl ShiftState {
    /// The state after one press of the shift key.
    pub fn cycled(self) -> Self {
        match self {
            ShiftState::Off => ShiftState::Temporary,
            ShiftState::Temporary => ShiftState::Locked,
            ShiftState::Locked => ShiftState::Off,
        }
    }

    /// The state after emitting one literal alphabetic character.
    pub fn after_literal(self) -> Self {
        match self {
            ShiftState::Temporary => ShiftState::Off,
            other => other,
        }
    }

    /// Whether uppercase casing applies right now.
    pub fn is_active(self) -> bool {
        !matches!(self, ShiftState::Off)
    }
}

/// Mutable session state shared by the controller and the editors.
#[derive(Debug, Clone, Default)]
pub struct Session {
    spelling: Spelling,
    candidates: Vec<String>,
    script: ScriptMode,
    shift: ShiftState,
}

impl Session {
    /// Create a fresh session in phonetic mode with shift off.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn spelling(&self) -> &Spelling {
        &self.spelling
    }

    pub fn spelling_mut(&mut self) -> &mut Spelling {
        &mut self.spelling
    }

    pub fn candidates(&self) -> &[String] {
        &self.candidates
    }

    pub fn set_candidates(&mut self, candidates: Vec<String>) {
        self.candidates = candidates;
    }

    pub fn script(&self) -> ScriptMode {
        self.script
    }

    pub fn set_script(&mut self, script: ScriptMode) {
        self.script = script;
    }

    pub fn shift(&self) -> ShiftState {
        self.shift
    }

    pub fn set_shift(&mut self, shift: ShiftState) {
        self.shift = shift;
    }

    /// Whether any spelling is pending resolution.
    pub fn has_pending(&self) -> bool {
        !self.spelling.is_empty()
    }

    /// Discard the pending spelling and candidate list without emitting text.
    pub fn clear_pending(&mut self) {
        self.spelling.clear();
        self.candidates.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn shift_cycles_off_temporary_locked_off() {
        let mut shift = ShiftState::Off;
        shift = shift.cycled();
        assert_eq!(shift, ShiftState::Temporary);
        shift = shift.cycled();
        assert_eq!(shift, ShiftState::Locked);
        shift = shift.cycled();
        assert_eq!(shift, ShiftState::Off);
    }

    #[test]
    fn temporary_shift_reverts_after_one_literal() {
        assert_eq!(ShiftState::Temporary.after_literal(), ShiftState::Off);
        assert_eq!(ShiftState::Locked.after_literal(), ShiftState::Locked);
        assert_eq!(ShiftState::Off.after_literal(), ShiftState::Off);
    }

    #[test]
    fn clear_pending_discards_spelling_and_candidates() {
        let mut session = Session::new();
        session.spelling_mut().push('a');
        session.set_candidates(vec!["字".to_string()]);
        session.clear_pending();
        assert!(!session.has_pending());
        assert!(session.candidates().is_empty());
    }
}
