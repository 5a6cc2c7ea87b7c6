//! Full scope tracking for brace-delimited grammars.
//!
//! A stack of open tokens (brackets, braces, quotes, comments) plus an
//! escape flag and a one-character lookahead for `//`, `/*` and `*/`.
//! Named class and function boundaries are recorded against the depth of
//! the `{` that opened them; closing that brace yields the matching
//! [`ScopeEvent`].

use smallvec::SmallVec;

use super::tracker::{ScopeEvent, ScopeTracker};

/// Quote characters for C, C++ and Java.
pub const C_QUOTES: &[char] = &['"', '\''];

/// Quote characters for JavaScript and TypeScript.
pub const SCRIPT_QUOTES: &[char] = &['"', '\'', '`'];

/// One open lexical context.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScopeToken {
    Paren,
    Bracket,
    Brace,
    Quote(char),
    LineComment,
    BlockComment,
}

impl ScopeToken {
    /// Text that would close this token.
    pub fn closer(self) -> String {
        match self {
            ScopeToken::Paren => ")".into(),
            ScopeToken::Bracket => "]".into(),
            ScopeToken::Brace => "}".into(),
            ScopeToken::Quote(q) => q.to_string(),
            ScopeToken::LineComment => "end of line".into(),
            ScopeToken::BlockComment => "*/".into(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct BracedScope {
    stack: SmallVec<[ScopeToken; 16]>,
    quotes: &'static [char],
    escaped: bool,
    lookahead: Option<char>,
    /// (name, stack index of the class `{`), innermost last
    classes: Vec<(String, usize)>,
    /// (signature, stack index of the body `{`)
    function: Option<(String, usize)>,
}

impl Default for BracedScope {
    fn default() -> Self {
        Self::new(SCRIPT_QUOTES)
    }
}

impl BracedScope {
    pub fn new(quotes: &'static [char]) -> Self {
        Self {
            stack: SmallVec::new(),
            quotes,
            escaped: false,
            lookahead: None,
            classes: Vec::new(),
            function: None,
        }
    }

    /// Innermost open token.
    pub fn top(&self) -> Option<ScopeToken> {
        self.stack.last().copied()
    }

    /// Record a class whose body `{` was just pushed.
    pub fn mark_class(&mut self, name: impl Into<String>) {
        let at = self.brace_index();
        self.classes.push((name.into(), at));
    }

    /// Record a function whose body `{` was just pushed.
    pub fn mark_function(&mut self, signature: impl Into<String>) {
        let at = self.brace_index();
        self.function = Some((signature.into(), at));
    }

    /// Enclosing class names joined with `.`, outermost first.
    pub fn current_class(&self) -> Option<String> {
        if self.classes.is_empty() {
            return None;
        }
        let names: Vec<&str> = self.classes.iter().map(|(n, _)| n.as_str()).collect();
        Some(names.join("."))
    }

    pub fn in_function(&self) -> bool {
        self.function.is_some()
    }

    /// Depth reported while directly inside the innermost class body.
    pub fn class_body_depth(&self) -> Option<usize> {
        self.classes.last().map(|(_, at)| at + 1)
    }

    /// Prefix `name` with the enclosing class path.
    pub fn qualify(&self, name: &str) -> String {
        match self.current_class() {
            Some(class) => format!("{class}.{name}"),
            None => name.to_string(),
        }
    }

    // Index of the brace a boundary is being attached to
    fn brace_index(&self) -> usize {
        match self.stack.last() {
            Some(ScopeToken::Brace) => self.stack.len() - 1,
            _ => self.stack.len(),
        }
    }

    fn close_brace(&mut self) -> ScopeEvent {
        let depth = self.stack.len();
        let mut event = ScopeEvent::None;

        if self.classes.last().is_some_and(|(_, at)| *at == depth) {
            self.classes.pop();
            event = ScopeEvent::ClassClosed;
        }
        if self.function.as_ref().is_some_and(|(_, at)| *at == depth) {
            self.function = None;
            event = ScopeEvent::FunctionClosed;
        }
        event
    }
}

impl ScopeTracker for BracedScope {
    fn push(&mut self, c: char) -> ScopeEvent {
        match self.top() {
            Some(ScopeToken::Quote(q)) => {
                if self.escaped {
                    self.escaped = false;
                } else if c == '\\' {
                    self.escaped = true;
                } else if c == q {
                    self.stack.pop();
                }
                return ScopeEvent::None;
            }
            Some(ScopeToken::LineComment) => return ScopeEvent::None,
            Some(ScopeToken::BlockComment) => {
                if self.lookahead == Some('*') && c == '/' {
                    self.stack.pop();
                    self.lookahead = None;
                } else {
                    self.lookahead = Some(c);
                }
                return ScopeEvent::None;
            }
            _ => {}
        }

        if self.lookahead.take() == Some('/') {
            match c {
                '/' => {
                    self.stack.push(ScopeToken::LineComment);
                    return ScopeEvent::None;
                }
                '*' => {
                    self.stack.push(ScopeToken::BlockComment);
                    return ScopeEvent::None;
                }
                _ => {}
            }
        }

        match c {
            '/' => self.lookahead = Some('/'),
            '(' => self.stack.push(ScopeToken::Paren),
            '[' => self.stack.push(ScopeToken::Bracket),
            '{' => self.stack.push(ScopeToken::Brace),
            ')' | ']' | '}' => {
                let expected = match c {
                    ')' => ScopeToken::Paren,
                    ']' => ScopeToken::Bracket,
                    _ => ScopeToken::Brace,
                };
                // Mismatched closers are ignored
                if self.top() == Some(expected) {
                    self.stack.pop();
                    if expected == ScopeToken::Brace {
                        return self.close_brace();
                    }
                }
            }
            q if self.quotes.contains(&q) => self.stack.push(ScopeToken::Quote(q)),
            _ => {}
        }
        ScopeEvent::None
    }

    fn line_break(&mut self) -> ScopeEvent {
        if self.top() == Some(ScopeToken::LineComment) {
            self.stack.pop();
        }
        self.lookahead = None;
        ScopeEvent::None
    }

    fn depth(&self) -> usize {
        self.stack.len()
    }

    fn in_quote(&self) -> bool {
        matches!(self.top(), Some(ScopeToken::Quote(_)))
    }

    fn in_comment(&self) -> bool {
        matches!(
            self.top(),
            Some(ScopeToken::LineComment | ScopeToken::BlockComment)
        )
    }
}
