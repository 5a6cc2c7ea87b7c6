//! Python function extractor (indentation strategy).
//!
//! Driven by an [`IndentScope`]. When a block opens, its header line is
//! checked for `def`/`class`; named blocks qualify nested names
//! (`Outer.method`). Only the outermost `def` becomes a record. Blocks
//! nested inside it are skipped entirely, including their calls.

use aho_corasick::AhoCorasick;
use regex::Regex;
use tracing::{trace, warn};

use super::{
    cursor::{ParserState, Position, Source},
    words::{PYTHON_KEYWORDS, WordTracker, is_keyword, whole_words},
};
use crate::{
    core::functions::{
        ExtractError, ExtractOptions, FileExtraction, FunctionExtractor, FunctionRecord, Language,
        Truncation, TruncationReason,
    },
    scope::{CaptureFlavor, IndentScope, ScopeEvent, ScopeTracker},
};

pub const PYTHON_DEFAULT_LOOKBACK: usize = 1000;

const PY_DEF: &str = r"^def\s+(?P<name>[A-Za-z_]\w*)\s*\((?s:.*)\)\s*(?:->\s*[^:]+)?:\s*(?:#.*)?$";

const PY_CLASS: &str = r"^class\s+(?P<name>[A-Za-z_]\w*)\s*(?:\((?s:.*)\))?\s*:\s*(?:#.*)?$";

/// What a block header introduces.
#[derive(Debug, Clone, PartialEq, Eq)]
enum Header {
    Def(String),
    Class(String),
}

pub struct PythonExtractor {
    block_words: AhoCorasick,
    def: Regex,
    class: Regex,
    lookback: usize,
}

/// Per-file scan state.
struct Scan {
    scope: IndentScope,
    words: WordTracker,
    /// First significant character of the current logical line
    logical_start: Option<Position>,
    open: Option<FunctionRecord>,
    /// Header indentation of a block nested in the open function
    inner_indent: Option<usize>,
    last_line: usize,
    out: FileExtraction,
}

impl PythonExtractor {
    pub fn new(opts: &ExtractOptions) -> Result<Self, ExtractError> {
        if opts.capture == CaptureFlavor::Counting {
            warn!(
                language = %Language::Python,
                "counting capture is not supported here, scanning lexically"
            );
        }
        Ok(Self {
            block_words: AhoCorasick::new(["def", "class"])?,
            def: Regex::new(PY_DEF)?,
            class: Regex::new(PY_CLASS)?,
            lookback: opts.lookback_or(PYTHON_DEFAULT_LOOKBACK),
        })
    }

    /// Classify a block header's logical line.
    fn header(&self, text: &str) -> Option<Header> {
        let text = text.trim();
        let found = whole_words(&self.block_words, text).next()?;
        let lead = text[..found.start()].trim();
        if !(lead.is_empty() || lead == "async") {
            return None;
        }
        let rest = &text[found.start()..];
        if let Some(caps) = self.def.captures(rest) {
            return Some(Header::Def(caps["name"].to_string()));
        }
        self.class
            .captures(rest)
            .map(|caps| Header::Class(caps["name"].to_string()))
    }

    fn on_scope_opened(
        &self,
        scan: &mut Scan,
        src: &Source<'_>,
        header_line: usize,
        header_indent: usize,
        filename: &str,
    ) {
        let Some(start) = scan.logical_start else {
            return;
        };
        let end = Position::new(header_line, src.chars(header_line).len());
        let text = src.text(start, end);
        if text.chars().count() > self.lookback {
            trace!(line = start.line, "block header exceeds lookback");
            return;
        }
        let Some(header) = self.header(&text) else {
            return;
        };

        let (name, is_def) = match header {
            Header::Def(name) => (name, true),
            Header::Class(name) => (name, false),
        };
        scan.scope.add_named_scope(name);

        if scan.open.is_some() {
            if scan.inner_indent.is_none() {
                trace!(line = start.line, "skipping nested block");
                scan.inner_indent = Some(header_indent);
            }
            return;
        }
        if !is_def {
            return;
        }

        let signature = text.trim().to_string();
        scan.scope.mark_function(signature.clone());
        let mut record = FunctionRecord::new(scan.scope.named_scope(), filename, signature);
        record.declaration_line = start.line;
        record.definition_line = header_line + 1;
        trace!(name = %record.name, line = start.line, "found definition");
        scan.open = Some(record);
        scan.last_line = header_line;
    }

    fn close_function(scan: &mut Scan, src: &Source<'_>) {
        if let Some(mut record) = scan.open.take() {
            record.definition = src.lines(record.declaration_line, scan.last_line);
            trace!(name = %record.name, calls = record.calls.len(), "closed function");
            scan.out.functions.push(record);
        }
        scan.inner_indent = None;
    }
}

impl FunctionExtractor for PythonExtractor {
    fn language(&self) -> Language {
        Language::Python
    }

    fn extract(&self, lines: &[String], filename: &str) -> FileExtraction {
        let src = Source::new(lines);
        let mut state = ParserState::start(&src);
        let mut scan = Scan {
            scope: IndentScope::new(),
            words: WordTracker::default(),
            logical_start: None,
            open: None,
            inner_indent: None,
            last_line: 0,
            out: FileExtraction::default(),
        };
        let mut literal_line = 0;

        while !state.eof {
            let Some(c) = state.current(&src) else {
                let header_indent = scan.scope.indent();
                if scan.scope.line_break() == ScopeEvent::ScopeOpened {
                    self.on_scope_opened(&mut scan, &src, state.line, header_indent, filename);
                }
                if scan.scope.at_statement_level() {
                    scan.logical_start = None;
                }
                scan.words.interrupt();
                state.next_line(&src);
                continue;
            };

            let pos = state.position();
            let code = scan.scope.in_code();
            let starts_line = code && scan.logical_start.is_none() && !c.is_whitespace();

            if scan.scope.push(c) == ScopeEvent::FunctionClosed {
                Self::close_function(&mut scan, &src);
            }

            if starts_line {
                scan.logical_start = Some(pos);
                // A statement at or left of a nested header ends that block
                if c != '#'
                    && scan
                        .inner_indent
                        .is_some_and(|i| scan.scope.indent() <= i)
                {
                    scan.inner_indent = None;
                }
            }

            if !code || scan.scope.in_comment() {
                scan.words.interrupt();
                state.step();
                continue;
            }

            if scan.open.is_some() && !c.is_whitespace() {
                scan.last_line = pos.line;
            }

            if c == '(' && scan.inner_indent.is_none() {
                if let (Some(record), Some(ident)) = (scan.open.as_mut(), scan.words.ident_before())
                {
                    let declared = matches!(scan.words.keyword_before(), Some("def" | "class"));
                    if !declared && !is_keyword(ident, PYTHON_KEYWORDS) {
                        record.add_call(ident);
                    }
                }
            }
            scan.words.feed(c);
            if !scan.scope.in_code() {
                literal_line = pos.line;
            }
            state.step();
        }

        if !scan.scope.at_statement_level() {
            let expected = if scan.scope.in_quote() {
                "closing quote"
            } else {
                "closing bracket"
            };
            scan.out.truncated = Some(Truncation {
                line: literal_line.max(scan.logical_start.map_or(0, |p| p.line)),
                reason: TruncationReason::Unterminated {
                    expected: expected.into(),
                },
            });
            return scan.out;
        }

        if scan.scope.finish() == ScopeEvent::FunctionClosed {
            Self::close_function(&mut scan, &src);
        }
        scan.out
    }
}
