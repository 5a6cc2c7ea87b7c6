//! Common interface over the character-level scope automata.
//!
//! Every tracker consumes a file one character at a time plus an
//! explicit `line_break()` between lines, and reports boundary changes
//! through the returned [`ScopeEvent`] instead of invoking callbacks.

use super::{braced::BracedScope, counter::BracketCounter};

/// Boundary change caused by a single `push` or `line_break`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ScopeEvent {
    /// Nothing of interest changed
    #[default]
    None,
    /// An indentation block was opened by the line that just ended
    ScopeOpened,
    /// The innermost tracked class body closed
    ClassClosed,
    /// The tracked function body closed
    FunctionClosed,
}

/// Per-character lexical state machine.
pub trait ScopeTracker {
    /// Feed one character of the current line.
    fn push(&mut self, c: char) -> ScopeEvent;

    /// Signal the end of the current line.
    fn line_break(&mut self) -> ScopeEvent;

    /// Number of open scopes (brackets, quotes, comments, blocks).
    fn depth(&self) -> usize;

    /// True while inside a string or character literal.
    fn in_quote(&self) -> bool {
        false
    }

    /// True while inside a line or block comment.
    fn in_comment(&self) -> bool {
        false
    }

    /// True when the last character was ordinary code.
    fn in_code(&self) -> bool {
        !self.in_quote() && !self.in_comment()
    }
}

/// Backing used for balanced sub-scans (argument lists, bodies).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CaptureFlavor {
    /// Quote and comment aware; brackets inside literals are ignored
    #[default]
    Lexical,
    /// Plain depth counter for one bracket pair
    Counting,
}

impl CaptureFlavor {
    /// Build a fresh tracker for a sub-scan starting at `open`.
    pub fn tracker(
        self,
        open: char,
        close: char,
        quotes: &'static [char],
    ) -> Box<dyn ScopeTracker> {
        match self {
            CaptureFlavor::Lexical => Box::new(BracedScope::new(quotes)),
            CaptureFlavor::Counting => Box::new(BracketCounter::new(open, close)),
        }
    }
}
