//! Editor trait and implementations for the two composing flows.
//!
//! Editors are pluggable key handlers that own one composing flow each: the
//! root accumulator for ordinary phonetic entry, and the homophone editor for
//! the reverse-lookup state machine. The controller routes key events to the
//! active editor and acts on the returned result.

pub mod homophone;
pub mod root;

pub use homophone::{HomophoneEditor, LookupStage};
pub use root::RootEditor;

use crate::controller::Key;
use crate::session::Session;

/// Result of processing a key event in an editor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EditorResult {
    /// Key was handled, session state updated.
    Handled,

    /// Text should be committed; the editor keeps its pending state.
    Commit(String),

    /// Text should be committed (possibly empty) and the editor's pending
    /// state discarded.
    CommitAndReset(String),

    /// Key not handled by this editor; the controller decides.
    PassThrough,
}

/// Key handler for one composing flow.
pub trait Editor {
    /// Process a key event in this editor's context.
    fn process_key(&mut self, key: Key, session: &mut Session) -> EditorResult;

    /// Select the displayed candidate at `index` (a tap on the candidate
    /// bar).
    fn select(&mut self, index: usize, session: &mut Session) -> EditorResult;

    /// Discard this editor's pending state without emitting text.
    fn reset(&mut self, session: &mut Session);

    /// Human-readable name for diagnostics.
    fn name(&self) -> &'static str;
}
