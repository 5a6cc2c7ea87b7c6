//! Cursor state and bounded scans over a file's lines.
//!
//! [`ParserState`] is the explicit position value every extractor threads
//! through its scan loop. The helpers here implement the two bounded
//! scans the strategies share: balanced forward capture and limited
//! backward lookback.

use crate::scope::ScopeTracker;

/// Zero-based (line, column) where column counts chars, not bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Position {
    pub line: usize,
    pub column: usize,
}

impl Position {
    pub fn new(line: usize, column: usize) -> Self {
        Self { line, column }
    }

    /// Position reached after walking over `text` starting here.
    pub fn advanced_by(self, text: &str) -> Position {
        text.chars().fold(self, |pos, c| {
            if c == '\n' {
                Position::new(pos.line + 1, 0)
            } else {
                Position::new(pos.line, pos.column + 1)
            }
        })
    }
}

/// Char-indexed view over a file's lines.
pub struct Source<'a> {
    lines: &'a [String],
    chars: Vec<Vec<char>>,
}

impl<'a> Source<'a> {
    pub fn new(lines: &'a [String]) -> Self {
        let chars = lines.iter().map(|l| l.chars().collect()).collect();
        Self { lines, chars }
    }

    pub fn line_count(&self) -> usize {
        self.lines.len()
    }

    pub fn line(&self, line: usize) -> &str {
        self.lines.get(line).map(String::as_str).unwrap_or("")
    }

    pub fn chars(&self, line: usize) -> &[char] {
        self.chars.get(line).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn char_at(&self, pos: Position) -> Option<char> {
        self.chars(pos.line).get(pos.column).copied()
    }

    pub fn is_blank(&self, line: usize) -> bool {
        self.line(line).trim().is_empty()
    }

    /// Text in `[from, to)`, lines joined with `\n`.
    pub fn text(&self, from: Position, to: Position) -> String {
        let mut out = String::new();
        let mut pos = from;
        while pos < to {
            let chars = self.chars(pos.line);
            if pos.line == to.line {
                let end = to.column.min(chars.len());
                out.extend(chars.iter().take(end).skip(pos.column));
                break;
            }
            out.extend(chars.iter().skip(pos.column));
            out.push('\n');
            pos = Position::new(pos.line + 1, 0);
        }
        out
    }

    /// Owned copies of lines `first..=last`.
    pub fn lines(&self, first: usize, last: usize) -> Vec<String> {
        let end = (last + 1).min(self.lines.len());
        self.lines
            .get(first..end)
            .map(<[String]>::to_vec)
            .unwrap_or_default()
    }
}

/// Explicit scan position threaded through an extractor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ParserState {
    pub line: usize,
    pub column: usize,
    pub eof: bool,
}

impl ParserState {
    pub fn start(src: &Source<'_>) -> Self {
        Self {
            line: 0,
            column: 0,
            eof: src.line_count() == 0,
        }
    }

    pub fn position(&self) -> Position {
        Position::new(self.line, self.column)
    }

    /// Character under the cursor, `None` at end of line.
    pub fn current(&self, src: &Source<'_>) -> Option<char> {
        src.char_at(self.position())
    }

    pub fn step(&mut self) {
        self.column += 1;
    }

    pub fn next_line(&mut self, src: &Source<'_>) {
        self.line += 1;
        self.column = 0;
        if self.line >= src.line_count() {
            self.eof = true;
        }
    }
}

/// Feed `tracker` from `open` (inclusive) until its depth returns to zero.
///
/// Returns the position of the closing character, or `None` when the end
/// of input is reached first.
pub fn capture_balanced(
    src: &Source<'_>,
    open: Position,
    tracker: &mut dyn ScopeTracker,
) -> Option<Position> {
    let mut pos = open;
    let mut started = false;
    loop {
        let chars = src.chars(pos.line);
        while pos.column < chars.len() {
            tracker.push(chars[pos.column]);
            if tracker.depth() > 0 {
                started = true;
            } else if started {
                return Some(pos);
            }
            pos.column += 1;
        }
        tracker.line_break();
        pos = Position::new(pos.line + 1, 0);
        if pos.line >= src.line_count() {
            return None;
        }
    }
}

/// Outcome of a bounded backward scan.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Lookback {
    /// Position of the first character of `text`
    pub start: Position,
    /// Text from `start` up to (not including) the scan origin
    pub text: String,
    /// The character budget ran out before a stop character
    pub exhausted: bool,
}

/// Walk backward from `before` (exclusive) for at most `limit` characters,
/// stopping early at any of `stops` or at the start of the file.
/// Line breaks count toward the limit.
pub fn lookback(src: &Source<'_>, before: Position, limit: usize, stops: &[char]) -> Lookback {
    let mut start = before;
    let mut taken = 0usize;
    let mut exhausted = false;

    'scan: loop {
        let chars = src.chars(start.line);
        let mut col = start.column.min(chars.len());
        while col > 0 {
            if taken >= limit {
                exhausted = true;
                break 'scan;
            }
            if stops.contains(&chars[col - 1]) {
                break 'scan;
            }
            col -= 1;
            taken += 1;
            start = Position::new(start.line, col);
        }
        if start.line == 0 {
            break;
        }
        if taken >= limit {
            exhausted = true;
            break;
        }
        // Cross into the previous line; its line break joins the text
        let prev = start.line - 1;
        start = Position::new(prev, src.chars(prev).len());
        taken += 1;
    }

    Lookback {
        text: src.text(start, before),
        start,
        exhausted,
    }
}
