//! Forward (left-to-right) extraction engine for C-style grammars.
//!
//! The main scan feeds every character to a [`BracedScope`] so literals
//! and comments are skipped. On `(` in code directly after an identifier
//! the engine:
//!   1. trims backward over signature characters on the same line,
//!   2. decides whether a type/visibility keyword (or a class body)
//!      makes it a definition candidate,
//!   3. captures the argument list with a balanced sub-scan,
//!   4. looks at the first significant token after `)`: `{` makes it a
//!      definition whose body is captured with a second sub-scan.
//!
//! Sub-scans are lookahead only; the main scan continues through the body
//! so that calls inside it are attributed to the active definition.

use regex::Regex;
use tracing::trace;

use super::{
    cursor::{ParserState, Position, Source, capture_balanced},
    words::{WordTracker, is_ident_char, is_keyword},
};
use crate::{
    core::functions::{
        ExtractOptions, FileExtraction, FunctionRecord, Language, Truncation, TruncationReason,
    },
    scope::{BracedScope, CaptureFlavor, ScopeTracker},
};

/// Grammar-specific knobs for the forward engine.
pub struct ForwardGrammar {
    pub language: Language,
    pub quotes: &'static [char],
    /// Matches the signature text before the name of a definition
    pub type_keywords: Regex,
    /// Names that are never calls
    pub keywords: &'static [&'static str],
    /// Words introducing a named class body; empty disables qualification
    pub class_keywords: &'static [&'static str],
    /// Treat any `name(...) {` directly in a class body as a method
    pub class_members_are_methods: bool,
    /// Skip `#` lines and their `\` continuations
    pub skip_preprocessor: bool,
    /// Extra characters allowed in a signature besides identifiers and spaces
    pub signature_chars: &'static [char],
}

pub struct ForwardExtractor {
    grammar: ForwardGrammar,
    capture: CaptureFlavor,
}

/// What follows a captured argument list.
enum Terminator {
    Body(Position),
    Declaration,
    Neither,
}

/// Definition currently being scanned.
struct Active {
    index: usize,
    end: Position,
}

/// Mutable scan state for one file.
struct Scan<'s> {
    src: &'s Source<'s>,
    filename: &'s str,
    scope: BracedScope,
    words: WordTracker,
    line_text: String,
    active: Option<Active>,
    pending_class: Option<String>,
    literal_line: usize,
    out: FileExtraction,
}

impl ForwardExtractor {
    pub fn new(grammar: ForwardGrammar, opts: &ExtractOptions) -> Self {
        Self {
            grammar,
            capture: opts.capture,
        }
    }

    pub fn language(&self) -> Language {
        self.grammar.language
    }

    pub fn extract(&self, lines: &[String], filename: &str) -> FileExtraction {
        let src = Source::new(lines);
        let mut state = ParserState::start(&src);
        let mut scan = Scan {
            src: &src,
            filename,
            scope: BracedScope::new(self.grammar.quotes),
            words: WordTracker::default(),
            line_text: String::new(),
            active: None,
            pending_class: None,
            literal_line: 0,
            out: FileExtraction::default(),
        };
        let mut continuation = false;

        while !state.eof {
            // Preprocessor directives never hold definitions
            if state.column == 0 && self.grammar.skip_preprocessor && scan.scope.in_code() {
                let line = src.line(state.line);
                if continuation || line.trim_start().starts_with('#') {
                    continuation = line.trim_end().ends_with('\\');
                    scan.scope.line_break();
                    state.next_line(&src);
                    continue;
                }
            }

            let Some(c) = state.current(&src) else {
                scan.scope.line_break();
                scan.words.interrupt();
                scan.line_text.clear();
                state.next_line(&src);
                continue;
            };

            let pos = state.position();
            if scan.active.as_ref().is_some_and(|a| pos > a.end) {
                scan.active = None;
            }

            let code = scan.scope.in_code();
            scan.scope.push(c);

            if code {
                if c == '(' && !self.on_paren(&mut scan, pos) {
                    return scan.out;
                }
                self.on_code_char(&mut scan, c);
                if !scan.scope.in_code() {
                    scan.literal_line = pos.line;
                }
            } else {
                scan.words.interrupt();
            }
            state.step();
        }

        if !scan.scope.in_code() {
            let expected = scan
                .scope
                .top()
                .map(|t| t.closer())
                .unwrap_or_default();
            scan.out.truncated = Some(Truncation {
                line: scan.literal_line,
                reason: TruncationReason::Unterminated { expected },
            });
        }
        scan.out
    }

    fn on_code_char(&self, scan: &mut Scan<'_>, c: char) {
        let completed = scan.words.feed(c);
        if completed
            && scan.active.is_none()
            && scan.words.previous_is_declarator(self.grammar.class_keywords)
        {
            scan.pending_class = Some(scan.words.current().to_string());
        }

        match c {
            '{' => {
                if let Some(name) = scan.pending_class.take() {
                    trace!(class = %name, "entering class body");
                    scan.scope.mark_class(name);
                }
                scan.line_text.clear();
            }
            ';' => {
                scan.pending_class = None;
                scan.line_text.clear();
            }
            '}' | '(' => scan.line_text.clear(),
            _ => scan.line_text.push(c),
        }
    }

    /// Handle `(` at `pos`. Returns false when the file must be abandoned.
    fn on_paren(&self, scan: &mut Scan<'_>, pos: Position) -> bool {
        let Some(ident) = scan.words.ident_before().map(str::to_string) else {
            return true;
        };
        if is_keyword(&ident, self.grammar.keywords) {
            return true;
        }

        let prefix = trim_signature(&scan.line_text, self.grammar.signature_chars);
        let before_name = prefix.strip_suffix(ident.as_str()).unwrap_or("");
        let in_class_body = self.grammar.class_members_are_methods
            && scan
                .scope
                .class_body_depth()
                .is_some_and(|d| scan.scope.depth() == d + 1);

        if self.grammar.type_keywords.is_match(before_name) || in_class_body {
            let mut tracker = self.capture.tracker('(', ')', self.grammar.quotes);
            let Some(close) = capture_balanced(scan.src, pos, tracker.as_mut()) else {
                scan.out.truncated = Some(Truncation {
                    line: pos.line,
                    reason: TruncationReason::UnbalancedCapture { expected: ')' },
                });
                return false;
            };

            if let Terminator::Body(open) = self.find_terminator(scan.src, close) {
                let mut tracker = self.capture.tracker('{', '}', self.grammar.quotes);
                let Some(end) = capture_balanced(scan.src, open, tracker.as_mut()) else {
                    scan.out.truncated = Some(Truncation {
                        line: pos.line,
                        reason: TruncationReason::UnbalancedCapture { expected: '}' },
                    });
                    return false;
                };

                if scan.active.is_some() {
                    trace!(name = %ident, line = pos.line, "skipping nested definition");
                    return true;
                }

                let name = if self.grammar.class_keywords.is_empty() {
                    ident
                } else {
                    scan.scope.qualify(&ident)
                };
                let args = scan
                    .src
                    .text(pos, Position::new(close.line, close.column + 1));
                let signature = format!("{prefix}{args}");

                trace!(name = %name, line = pos.line, "found definition");
                let mut record = FunctionRecord::new(name, scan.filename, signature.trim());
                record.definition = scan.src.lines(pos.line, end.line);
                record.declaration_line = pos.line;
                record.definition_line = open.line;

                scan.out.functions.push(record);
                scan.active = Some(Active {
                    index: scan.out.functions.len() - 1,
                    end,
                });
                return true;
            }
        }

        // Anything else is a call site or a declaration
        match &scan.active {
            Some(active) => scan.out.functions[active.index].add_call(&ident),
            None => trace!(name = %ident, line = pos.line, "ignoring declaration"),
        }
        true
    }

    /// Classify the first significant token after the `)` at `close`.
    fn find_terminator(&self, src: &Source<'_>, close: Position) -> Terminator {
        let mut scope = BracedScope::new(self.grammar.quotes);
        let mut pos = Position::new(close.line, close.column + 1);

        while pos.line < src.line_count() {
            let chars = src.chars(pos.line);
            while pos.column < chars.len() {
                let c = chars[pos.column];
                let code = scope.in_code();
                scope.push(c);
                if code && scope.in_code() {
                    match c {
                        '{' => return Terminator::Body(pos),
                        ';' => return Terminator::Declaration,
                        // Qualifiers such as `const` or `throws A, B`
                        c if c.is_whitespace()
                            || is_ident_char(c)
                            || matches!(c, ',' | '.' | '&' | '*' | '[' | ']' | '<' | '>' | '/') => {}
                        _ => return Terminator::Neither,
                    }
                }
                pos.column += 1;
            }
            scope.line_break();
            pos = Position::new(pos.line + 1, 0);
        }
        Terminator::Neither
    }
}

/// Trailing run of `text` made of identifier chars, whitespace and `extra`,
/// with surrounding whitespace removed.
pub fn trim_signature<'t>(text: &'t str, extra: &[char]) -> &'t str {
    let start = text
        .char_indices()
        .rev()
        .take_while(|(_, c)| is_ident_char(*c) || c.is_whitespace() || extra.contains(c))
        .last()
        .map(|(i, _)| i)
        .unwrap_or(text.len());
    text[start..].trim()
}
