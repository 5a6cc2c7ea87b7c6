//! Indentation scope tracking for colon/indent grammars (Python).
//!
//! Blocks are represented by indentation markers: when a logical line that
//! ended with a block-opening `:` is terminated, the header's indentation is
//! pushed and [`ScopeEvent::ScopeOpened`] is returned. The first significant
//! character of a line indented at or above a marker's level closes that
//! block. Brackets, quotes (single and triple) and `#` comments are tracked
//! so that colons and line breaks inside them are ignored.

use std::collections::BTreeMap;

use smallvec::SmallVec;

use super::tracker::{ScopeEvent, ScopeTracker};

const TAB_WIDTH: usize = 4;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Marker {
    /// Open bracket character
    Open(char),
    /// Open string literal
    Quote { quote: char, triple: bool },
    /// `#` comment up to end of line
    Comment,
    /// Indentation of a block header
    Indent(usize),
}

/// Progress through a run of quote characters right after an opener.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum QuoteRun {
    /// Inside the literal body
    Body,
    /// One quote char seen right after the opener (`""` so far)
    Doubled,
    /// Just opened; a second quote would make `""`
    Fresh,
}

#[derive(Debug, Clone)]
pub struct IndentScope {
    stack: SmallVec<[Marker; 16]>,
    indent: usize,
    measuring: bool,
    pending_scope: bool,
    escaped: bool,
    quote_run: QuoteRun,
    /// Consecutive closing quote chars seen inside a triple literal
    closing_run: usize,
    names: BTreeMap<usize, String>,
    /// (signature, stack index of the function's indentation marker)
    function: Option<(String, usize)>,
}

impl Default for IndentScope {
    fn default() -> Self {
        Self::new()
    }
}

impl IndentScope {
    pub fn new() -> Self {
        Self {
            stack: SmallVec::new(),
            indent: 0,
            measuring: true,
            pending_scope: false,
            escaped: false,
            quote_run: QuoteRun::Body,
            closing_run: 0,
            names: BTreeMap::new(),
            function: None,
        }
    }

    /// Indentation width of the current logical line.
    pub fn indent(&self) -> usize {
        self.indent
    }

    /// True when the next line starts a new logical line.
    pub fn at_statement_level(&self) -> bool {
        !matches!(
            self.stack.last(),
            Some(Marker::Open(_) | Marker::Quote { .. })
        )
    }

    /// Name the block opened by the most recent [`ScopeEvent::ScopeOpened`].
    pub fn add_named_scope(&mut self, name: impl Into<String>) {
        if let Some(Marker::Indent(level)) = self.stack.last() {
            self.names.insert(*level, name.into());
        }
    }

    /// Names of the enclosing named blocks, outermost first, joined with `.`.
    pub fn named_scope(&self) -> String {
        let names: Vec<&str> = self.names.values().map(String::as_str).collect();
        names.join(".")
    }

    /// Track the block opened by the most recent `ScopeOpened` as a function.
    pub fn mark_function(&mut self, signature: impl Into<String>) {
        if let Some(Marker::Indent(_)) = self.stack.last() {
            self.function = Some((signature.into(), self.stack.len() - 1));
        }
    }

    pub fn in_function(&self) -> bool {
        self.function.is_some()
    }

    /// Close every block still open at end of input.
    pub fn finish(&mut self) -> ScopeEvent {
        self.indent = 0;
        let mut event = ScopeEvent::None;
        while let Some(marker) = self.stack.pop() {
            if let Marker::Indent(level) = marker {
                self.names.remove(&level);
            }
            if self.closes_function() {
                event = ScopeEvent::FunctionClosed;
            }
        }
        event
    }

    fn closes_function(&mut self) -> bool {
        if self
            .function
            .as_ref()
            .is_some_and(|(_, at)| *at == self.stack.len())
        {
            self.function = None;
            return true;
        }
        false
    }

    // Pop every block whose header is indented at or beyond the current line
    fn close_dedented(&mut self) -> ScopeEvent {
        let mut event = ScopeEvent::None;
        while let Some(Marker::Indent(level)) = self.stack.last().copied() {
            if self.indent > level {
                break;
            }
            self.stack.pop();
            self.names.remove(&level);
            if self.closes_function() {
                event = ScopeEvent::FunctionClosed;
            }
        }
        event
    }

    // Character inside a string literal
    fn push_quoted(&mut self, c: char, quote: char, triple: bool) -> Option<char> {
        match self.quote_run {
            QuoteRun::Fresh if c == quote => {
                self.quote_run = QuoteRun::Doubled;
                return None;
            }
            QuoteRun::Doubled if c == quote => {
                // Third quote in a row: a triple-quoted literal
                self.stack.pop();
                self.stack.push(Marker::Quote {
                    quote,
                    triple: true,
                });
                self.quote_run = QuoteRun::Body;
                return None;
            }
            QuoteRun::Doubled => {
                // `""` was an empty literal; reprocess `c` outside it
                self.stack.pop();
                self.quote_run = QuoteRun::Body;
                return Some(c);
            }
            _ => self.quote_run = QuoteRun::Body,
        }

        if self.escaped {
            self.escaped = false;
            self.closing_run = 0;
            return None;
        }
        if c == '\\' {
            self.escaped = true;
            return None;
        }
        if c != quote {
            self.closing_run = 0;
            return None;
        }
        if !triple {
            self.stack.pop();
            return None;
        }
        self.closing_run += 1;
        if self.closing_run == 3 {
            self.closing_run = 0;
            self.stack.pop();
        }
        None
    }
}

impl ScopeTracker for IndentScope {
    fn push(&mut self, c: char) -> ScopeEvent {
        let c = match self.stack.last().copied() {
            Some(Marker::Quote { quote, triple }) => match self.push_quoted(c, quote, triple) {
                Some(c) => c,
                None => return ScopeEvent::None,
            },
            Some(Marker::Comment) => return ScopeEvent::None,
            _ => c,
        };

        if c == '#' {
            self.stack.push(Marker::Comment);
            return ScopeEvent::None;
        }

        let mut event = ScopeEvent::None;
        let bracketed = matches!(self.stack.last(), Some(Marker::Open(_)));
        if self.measuring && !bracketed {
            match c {
                ' ' => {
                    self.indent += 1;
                    return ScopeEvent::None;
                }
                '\t' => {
                    self.indent += TAB_WIDTH - self.indent % TAB_WIDTH;
                    return ScopeEvent::None;
                }
                _ => {
                    self.measuring = false;
                    event = self.close_dedented();
                }
            }
        }

        match self.stack.last().copied() {
            Some(Marker::Open(open)) => {
                let close = match open {
                    '(' => ')',
                    '[' => ']',
                    _ => '}',
                };
                if c == close {
                    self.stack.pop();
                }
            }
            _ if c == ':' => self.pending_scope = true,
            _ if c.is_alphanumeric() || c == '_' => self.pending_scope = false,
            _ => {}
        }

        match c {
            '(' | '[' | '{' => self.stack.push(Marker::Open(c)),
            '"' | '\'' => {
                self.stack.push(Marker::Quote {
                    quote: c,
                    triple: false,
                });
                self.quote_run = QuoteRun::Fresh;
                self.closing_run = 0;
                self.escaped = false;
            }
            _ => {}
        }
        event
    }

    fn line_break(&mut self) -> ScopeEvent {
        if self.stack.last() == Some(&Marker::Comment) {
            self.stack.pop();
        }
        // A literal opened as `""` and never continued was empty
        if self.quote_run == QuoteRun::Doubled {
            self.stack.pop();
            self.quote_run = QuoteRun::Body;
        }

        if !self.at_statement_level() {
            return ScopeEvent::None;
        }

        let mut event = ScopeEvent::None;
        if self.pending_scope {
            self.stack.push(Marker::Indent(self.indent));
            self.pending_scope = false;
            event = ScopeEvent::ScopeOpened;
        }
        self.indent = 0;
        self.measuring = true;
        event
    }

    fn depth(&self) -> usize {
        self.stack.len()
    }

    fn in_quote(&self) -> bool {
        matches!(self.stack.last(), Some(Marker::Quote { .. }))
    }

    fn in_comment(&self) -> bool {
        self.stack.last() == Some(&Marker::Comment)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Feed `text` line by line, collecting non-trivial events.
    fn feed(scope: &mut IndentScope, text: &str) -> Vec<ScopeEvent> {
        let mut events = Vec::new();
        for line in text.lines() {
            for c in line.chars() {
                events.push(scope.push(c));
            }
            events.push(scope.line_break());
        }
        events.retain(|e| *e != ScopeEvent::None);
        events
    }

    #[test]
    fn colon_opens_and_dedent_closes() {
        let mut scope = IndentScope::new();
        let events = feed(&mut scope, "def f():\n    return 1\n");
        assert_eq!(events, vec![ScopeEvent::ScopeOpened]);
        assert_eq!(scope.depth(), 1);

        feed(&mut scope, "x = 2\n");
        assert_eq!(scope.depth(), 0);
    }

    #[test]
    fn function_close_is_reported() {
        let mut scope = IndentScope::new();
        feed(&mut scope, "def f():");
        scope.mark_function("def f():");
        let events = feed(&mut scope, "    if x:\n        y()\n    z()\nw = 1");
        assert_eq!(
            events,
            vec![ScopeEvent::ScopeOpened, ScopeEvent::FunctionClosed]
        );
        assert!(!scope.in_function());
    }

    #[test]
    fn blank_and_comment_lines_do_not_close() {
        let mut scope = IndentScope::new();
        feed(&mut scope, "def f():");
        scope.mark_function("f");
        let events = feed(&mut scope, "    a()\n\n# note\n    b()");
        assert!(events.is_empty());
        assert!(scope.in_function());
    }

    #[test]
    fn colons_in_brackets_and_strings_are_ignored() {
        let mut scope = IndentScope::new();
        let events = feed(&mut scope, "d = {'a': 1}\ns = \"x:\"\nlam = lambda: 0\n");
        assert!(events.is_empty());
        assert_eq!(scope.depth(), 0);
    }

    #[test]
    fn multi_line_header_keeps_first_line_indent() {
        let mut scope = IndentScope::new();
        feed(&mut scope, "class A:");
        scope.add_named_scope("A");
        let events = feed(&mut scope, "    def m(self,\n          x):");
        assert_eq!(events, vec![ScopeEvent::ScopeOpened]);
        scope.add_named_scope("m");
        assert_eq!(scope.named_scope(), "A.m");

        // Back to the method's own indentation closes only the method
        feed(&mut scope, "    y = 1");
        assert_eq!(scope.named_scope(), "A");
    }

    #[test]
    fn triple_quoted_docstring_spans_lines() {
        let mut scope = IndentScope::new();
        feed(&mut scope, "def f():");
        scope.mark_function("f");
        let events = feed(&mut scope, "    \"\"\"Doc: it's\nnot code\n\"\"\"\n    return 1");
        assert!(events.is_empty());
        assert!(scope.in_function());
        assert_eq!(scope.depth(), 1);
    }

    #[test]
    fn empty_string_literal_closes() {
        let mut scope = IndentScope::new();
        feed(&mut scope, "x = \"\" + ''");
        assert_eq!(scope.depth(), 0);
    }

    #[test]
    fn finish_closes_open_function() {
        let mut scope = IndentScope::new();
        feed(&mut scope, "def f():");
        scope.mark_function("f");
        feed(&mut scope, "    pass");
        assert_eq!(scope.finish(), ScopeEvent::FunctionClosed);
        assert_eq!(scope.depth(), 0);
    }
}
