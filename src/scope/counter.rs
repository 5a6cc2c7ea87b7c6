//! Bracket-counting flavor: depth for a single opener/closer pair.
//!
//! Knows nothing about quotes or comments, so it is only exact over text
//! free of string literals. Used for fast sub-scans when configured.

use super::tracker::{ScopeEvent, ScopeTracker};

#[derive(Debug, Clone)]
pub struct BracketCounter {
    open: char,
    close: char,
    depth: usize,
}

impl BracketCounter {
    pub fn new(open: char, close: char) -> Self {
        Self {
            open,
            close,
            depth: 0,
        }
    }
}

impl ScopeTracker for BracketCounter {
    fn push(&mut self, c: char) -> ScopeEvent {
        if c == self.open {
            self.depth += 1;
        } else if c == self.close {
            // Stray closers never drive the depth negative
            self.depth = self.depth.saturating_sub(1);
        }
        ScopeEvent::None
    }

    fn line_break(&mut self) -> ScopeEvent {
        ScopeEvent::None
    }

    fn depth(&self) -> usize {
        self.depth
    }
}
