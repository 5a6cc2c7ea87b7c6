//! Backward-lookback extraction engine (C++, TypeScript).
//!
//! The main scan drives a [`BracedScope`]. Outside a function body, a `(`
//! in code after an identifier triggers a bounded backward search for the
//! start of a signature. When one is found the automaton is advanced to
//! the next `{` or `;` at the same depth and the captured span is checked
//! against the grammar's signature pattern. A match marks the function
//! boundary on the automaton; the record is finished when the automaton
//! reports [`ScopeEvent::FunctionClosed`]. Inside a body every identifier
//! directly followed by `(` is a call. Explicit type arguments between
//! the name and `(` (`make_shared<Foo>(`) are skipped.
//!
//! The main scan is always lexical; [`CaptureFlavor`] has no effect here.

use tracing::{trace, warn};

use super::{
    cursor::{ParserState, Position, Source},
    words::{WordTracker, generic_name_before, is_keyword, word_ending_at},
};
use crate::{
    core::functions::{
        ExtractOptions, FileExtraction, FunctionRecord, Language, Truncation, TruncationReason,
    },
    scope::{BracedScope, CaptureFlavor, ScopeEvent, ScopeTracker},
};

/// Grammar hooks for the backward engine.
pub trait BackwardGrammar: Send + Sync {
    fn language(&self) -> Language;

    fn quotes(&self) -> &'static [char];

    /// Names that are never calls or definitions
    fn keywords(&self) -> &'static [&'static str];

    /// Words introducing a named class body
    fn class_keywords(&self) -> &'static [&'static str];

    /// Lookback distance when none is configured
    fn default_lookback(&self) -> usize;

    /// Start of a candidate signature whose argument list opens at `open`,
    /// searching at most `limit` characters backward.
    fn signature_start(
        &self,
        src: &Source<'_>,
        open: Position,
        limit: usize,
        in_class_body: bool,
    ) -> Option<Position>;

    /// Validate `text` (signature through the opening `{`) and return the
    /// function name as written.
    fn match_signature(&self, text: &str, in_class_body: bool) -> Option<String>;

    /// Lines the scan should not look at (preprocessor directives)
    fn skip_line(&self, _line: &str) -> bool {
        false
    }

    /// Turn a matched name into graph form
    fn normalize_name(&self, name: &str) -> String {
        name.to_string()
    }

    /// True when a `{` right after `prev` (outside the argument list) starts
    /// a type literal rather than the body.
    fn opens_type_literal(&self, _prev: char) -> bool {
        false
    }
}

pub struct BackwardExtractor<G> {
    grammar: G,
    lookback: usize,
}

/// Outcome of trying to read a signature at a `(`.
enum Attempt {
    /// No signature start within the lookback bound
    NotCandidate,
    /// Captured up to a terminator that did not validate
    Rejected(Option<char>),
    /// A function body was entered
    Started(FunctionRecord),
    /// Input ended during the capture
    Eof,
}

impl<G: BackwardGrammar> BackwardExtractor<G> {
    pub fn new(grammar: G, opts: &ExtractOptions) -> Self {
        if opts.capture == CaptureFlavor::Counting {
            warn!(
                language = %grammar.language(),
                "counting capture is not supported here, scanning lexically"
            );
        }
        let lookback = opts.lookback_or(grammar.default_lookback());
        Self { grammar, lookback }
    }

    pub fn language(&self) -> Language {
        self.grammar.language()
    }

    pub fn extract(&self, lines: &[String], filename: &str) -> FileExtraction {
        let src = Source::new(lines);
        let mut state = ParserState::start(&src);
        let mut scope = BracedScope::new(self.grammar.quotes());
        let mut words = WordTracker::default();
        let mut open: Option<FunctionRecord> = None;
        let mut pending_class: Option<String> = None;
        let mut out = FileExtraction::default();
        let mut literal_line = 0;
        let mut continuation = false;

        while !state.eof {
            if state.column == 0 && scope.in_code() {
                let line = src.line(state.line);
                if continuation || self.grammar.skip_line(line) {
                    continuation = line.trim_end().ends_with('\\');
                    scope.line_break();
                    state.next_line(&src);
                    continue;
                }
            }

            let Some(c) = state.current(&src) else {
                scope.line_break();
                words.interrupt();
                state.next_line(&src);
                continue;
            };

            let pos = state.position();
            let code = scope.in_code();
            if scope.push(c) == ScopeEvent::FunctionClosed {
                if let Some(mut record) = open.take() {
                    record.definition = src.lines(record.declaration_line, pos.line);
                    trace!(name = %record.name, calls = record.calls.len(), "closed function");
                    out.functions.push(record);
                }
            }

            if !code {
                words.interrupt();
                state.step();
                continue;
            }

            if c == '(' {
                if let Some((ident, nested_def)) = callee_before(&src, &words, pos) {
                    if let Some(record) = open.as_mut() {
                        if !nested_def && !is_keyword(&ident, self.grammar.keywords()) {
                            record.add_call(&ident);
                        }
                    } else if !is_keyword(&ident, self.grammar.keywords()) {
                        match self.try_signature(&src, &mut state, &mut scope, pos, filename) {
                            Attempt::NotCandidate => {}
                            Attempt::Started(record) => {
                                trace!(name = %record.name, line = pos.line, "found definition");
                                open = Some(record);
                                pending_class = None;
                                words.reset();
                                state.step();
                                continue;
                            }
                            Attempt::Rejected(term) => {
                                if term == Some('{') {
                                    if let Some(name) = pending_class.take() {
                                        scope.mark_class(name);
                                    }
                                }
                                if term == Some(';') {
                                    pending_class = None;
                                }
                                words.reset();
                                state.step();
                                continue;
                            }
                            Attempt::Eof => {
                                out.truncated = Some(Truncation {
                                    line: pos.line,
                                    reason: TruncationReason::UnbalancedCapture { expected: '{' },
                                });
                                return out;
                            }
                        }
                    }
                }
            }

            let completed = words.feed(c);
            if completed
                && open.is_none()
                && words.previous_is_declarator(self.grammar.class_keywords())
            {
                pending_class = Some(words.current().to_string());
            }
            match c {
                '{' => {
                    if let Some(name) = pending_class.take() {
                        trace!(class = %name, "entering class body");
                        scope.mark_class(name);
                    }
                }
                ';' => pending_class = None,
                _ => {}
            }
            if !scope.in_code() {
                literal_line = pos.line;
            }
            state.step();
        }

        if let Some(record) = open {
            out.truncated = Some(Truncation {
                line: record.declaration_line,
                reason: TruncationReason::Unterminated {
                    expected: "}".into(),
                },
            });
        } else if !scope.in_code() {
            let expected = scope.top().map(|t| t.closer()).unwrap_or_default();
            out.truncated = Some(Truncation {
                line: literal_line,
                reason: TruncationReason::Unterminated { expected },
            });
        }
        out
    }

    /// Try to read a signature whose argument list opens at `open`.
    /// On anything but `NotCandidate` the cursor is left on the last
    /// consumed character.
    fn try_signature(
        &self,
        src: &Source<'_>,
        state: &mut ParserState,
        scope: &mut BracedScope,
        open: Position,
        filename: &str,
    ) -> Attempt {
        let in_class_body = scope
            .class_body_depth()
            .is_some_and(|d| scope.depth() == d + 1);
        let Some(start) = self
            .grammar
            .signature_start(src, open, self.lookback, in_class_body)
        else {
            return Attempt::NotCandidate;
        };

        // Depth outside the argument list
        let base = scope.depth().saturating_sub(1);
        // Last significant code character seen at `base`
        let mut prev: Option<char> = None;
        let terminator = loop {
            state.step();
            let c = loop {
                if let Some(c) = state.current(src) {
                    break c;
                }
                scope.line_break();
                state.next_line(src);
                if state.eof {
                    return Attempt::Eof;
                }
            };
            let code = scope.in_code();
            scope.push(c);
            if !code || !scope.in_code() {
                continue;
            }
            match c {
                '{' if scope.depth() == base + 1
                    && !prev.is_some_and(|p| self.grammar.opens_type_literal(p)) =>
                {
                    break '{';
                }
                ';' if scope.depth() == base => break ';',
                '}' if scope.depth() < base => return Attempt::Rejected(Some('}')),
                _ => {}
            }
            if scope.depth() == base && !c.is_whitespace() {
                prev = Some(c);
            }
        };

        if terminator != '{' {
            return Attempt::Rejected(Some(terminator));
        }

        let end = state.position();
        let text = src.text(start, Position::new(end.line, end.column + 1));
        let Some(name) = self.grammar.match_signature(&text, in_class_body) else {
            trace!(line = open.line, "signature did not validate");
            return Attempt::Rejected(Some('{'));
        };

        let name = self.grammar.normalize_name(&name);
        let qualified = if name.contains('.') {
            name
        } else {
            scope.qualify(&name)
        };

        let signature = text.trim_end_matches('{').trim().to_string();
        scope.mark_function(signature.clone());

        let mut record = FunctionRecord::new(qualified, filename, signature);
        record.declaration_line = start.line;
        record.definition_line = end.line;
        Attempt::Started(record)
    }
}

/// Name in front of the `(` at `open`, and whether `function` declares it.
fn callee_before(src: &Source<'_>, words: &WordTracker, open: Position) -> Option<(String, bool)> {
    if let Some(ident) = words.ident_before() {
        return Some((ident.to_string(), words.keyword_before() == Some("function")));
    }
    let chars = src.chars(open.line);
    let (name, start) = generic_name_before(chars, open.column)?;
    let declared = word_ending_at(chars, start).is_some_and(|w| w == "function");
    Some((name, declared))
}
