//! Engine context for host-platform communication.
//!
//! A plain data container with public fields: after each processed key event
//! the host reads these fields to update its UI and apply text edits. No
//! callbacks, no traits; the host owns all rendering and text insertion.

/// Data events surfaced to the host after each key event.
///
/// - `commit_text`: text to insert at the cursor (consume and clear)
/// - `delete_backward`: the host should delete one character before the cursor
/// - `code_text`: the current spelling, for on-screen echo
/// - `candidates`: dictionary or lookup candidates, in display order
/// - `associations`: learned next-character suggestions after a commit;
///   always a separate list, never merged into `candidates`
/// - `mode_label`: short legend for the active mode
#[derive(Debug, Clone, Default)]
pub struct EngineContext {
    pub commit_text: String,
    pub delete_backward: bool,
    pub code_text: String,
    pub candidates: Vec<String>,
    pub associations: Vec<String>,
    pub mode_label: String,
}

impl EngineContext {
    /// Create a new empty context.
    pub fn new() -> Self {
        Self::default()
    }

    /// Reset the per-event output fields. Called at the start of every key
    /// event; display state (code echo, candidates) is rewritten by the
    /// event itself.
    pub fn begin_event(&mut self) {
        self.commit_text.clear();
        self.delete_backward = false;
    }

    /// Take the commit text, leaving it empty.
    pub fn take_commit(&mut self) -> String {
        std::mem::take(&mut self.commit_text)
    }

    /// Whether there is text to insert.
    pub fn has_commit(&self) -> bool {
        !self.commit_text.is_empty()
    }

    /// Whether any composition state is visible (code echo or candidates).
    pub fn has_visible_state(&self) -> bool {
        !self.code_text.is_empty() || !self.candidates.is_empty()
    }
}
