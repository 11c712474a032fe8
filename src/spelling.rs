//! The in-progress spelling buffer.
//!
//! A `Spelling` is the ordered sequence of root codes the user has typed but
//! not yet resolved to a character. Unlike a general text buffer it is
//! append/drop-last only; there is no cursor.

/// Buffer of root codes awaiting dictionary resolution.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Spelling {
    codes: String,
}

impl Spelling {
    /// Create a new empty spelling.
    pub fn new() -> Self {
        Self::default()
    }

    /// The collected root codes, in typing order.
    pub fn text(&self) -> &str {
        &self.codes
    }

    /// Check whether any roots are pending.
    pub fn is_empty(&self) -> bool {
        self.codes.is_empty()
    }

    /// Number of collected roots.
    pub fn len(&self) -> usize {
        self.codes.chars().count()
    }

    /// Append one root code. Root codes are case-insensitive.
    pub fn push(&mut self, code: char) {
        self.codes.push(code.to_ascii_lowercase());
    }

    /// Remove the most recent root. Returns false on an empty spelling.
    pub fn drop_last(&mut self) -> bool {
        self.codes.pop().is_some()
    }

    /// Discard all pending roots.
    pub fn clear(&mut self) {
        self.codes.clear();
    }
}
