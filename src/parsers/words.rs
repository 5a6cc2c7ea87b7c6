//! Identifier tracking and keyword sets shared by the extractors.

use aho_corasick::{AhoCorasick, Match};

/// Identifier characters across the supported grammars.
pub fn is_ident_char(c: char) -> bool {
    c.is_alphanumeric() || c == '_' || c == '$'
}

/// Names followed by `(` that are never calls in the C family.
pub const C_FAMILY_KEYWORDS: &[&str] = &[
    "if",
    "else",
    "for",
    "while",
    "do",
    "switch",
    "case",
    "catch",
    "return",
    "sizeof",
    "alignof",
    "typeof",
    "instanceof",
    "throw",
    "delete",
    "decltype",
    "defined",
    "function",
    "synchronized",
    "super",
    "this",
];

/// Names followed by `(` that are never calls in Python.
pub const PYTHON_KEYWORDS: &[&str] = &[
    "if", "elif", "else", "while", "for", "return", "and", "or", "not", "in", "is", "lambda",
    "assert", "with", "yield", "await", "del", "except", "raise", "def", "class", "async",
    "import", "from", "global", "nonlocal", "pass",
];

pub fn is_keyword(word: &str, set: &[&str]) -> bool {
    set.contains(&word)
}

/// Matches of `ac` in `text` that are not part of a longer identifier.
pub fn whole_words<'t>(ac: &'t AhoCorasick, text: &'t str) -> impl Iterator<Item = Match> + 't {
    ac.find_iter(text).filter(move |m| {
        let before = text[..m.start()].chars().next_back();
        let after = text[m.end()..].chars().next();
        !before.is_some_and(is_ident_char) && !after.is_some_and(is_ident_char)
    })
}

/// Punctuation allowed inside an explicit type-argument list.
const TYPE_ARGUMENT_CHARS: &[char] = &[',', '.', ':', '[', ']', '*', '&', '|', '?'];

/// Name written before an explicit type-argument list that ends right
/// before column `open` (`identity<T>(`, `make_shared<Foo>(`). Returns the
/// name and its start column. Only `chars` (one line) is searched.
pub fn generic_name_before(chars: &[char], open: usize) -> Option<(String, usize)> {
    let mut i = open.min(chars.len());
    if i == 0 || chars[i - 1] != '>' {
        return None;
    }
    let mut depth = 0usize;
    loop {
        i = i.checked_sub(1)?;
        match chars[i] {
            '>' => depth += 1,
            '<' => {
                depth -= 1;
                if depth == 0 {
                    break;
                }
            }
            c if is_ident_char(c) || c.is_whitespace() || TYPE_ARGUMENT_CHARS.contains(&c) => {}
            _ => return None,
        }
    }
    let end = i;
    while i > 0 && is_ident_char(chars[i - 1]) {
        i -= 1;
    }
    (i < end).then(|| (chars[i..end].iter().collect(), i))
}

/// Identifier ending at column `end` of `chars`, after skipping whitespace.
pub fn word_ending_at(chars: &[char], end: usize) -> Option<String> {
    let mut i = end.min(chars.len());
    while i > 0 && chars[i - 1].is_whitespace() {
        i -= 1;
    }
    let stop = i;
    while i > 0 && is_ident_char(chars[i - 1]) {
        i -= 1;
    }
    (i < stop).then(|| chars[i..stop].iter().collect())
}

/// Last identifier and the one before it, with the separators that
/// preceded each. Fed one code character at a time.
#[derive(Debug, Clone, Default)]
pub struct WordTracker {
    current: String,
    current_lead: Option<char>,
    previous: String,
    previous_lead: Option<char>,
    separator: Option<char>,
    last: Option<char>,
}

impl WordTracker {
    /// Feed one code character. Returns true when it completed a word.
    pub fn feed(&mut self, c: char) -> bool {
        let in_word = self.last.is_some_and(is_ident_char);
        self.last = Some(c);

        if is_ident_char(c) {
            if !in_word {
                // A new word begins; shift the completed one back
                self.previous = std::mem::take(&mut self.current);
                self.previous_lead = self.current_lead;
                self.current_lead = self.separator.take();
            }
            self.current.push(c);
            return false;
        }

        if !c.is_whitespace() {
            self.separator = Some(c);
        }
        in_word
    }

    /// Break the current word without recording a separator (literal and
    /// comment text).
    pub fn interrupt(&mut self) -> bool {
        self.feed(' ')
    }

    /// Forget everything.
    pub fn reset(&mut self) {
        *self = Self::default();
    }

    /// The identifier ending at the last fed character, if any.
    pub fn ident_before(&self) -> Option<&str> {
        if self.last.is_some_and(is_ident_char) {
            Some(self.current.as_str())
        } else {
            None
        }
    }

    /// Most recent identifier, complete or not.
    pub fn current(&self) -> &str {
        &self.current
    }

    /// Identifier before the current one when only whitespace separates
    /// them (`function name`, `def name`, `class Name`).
    pub fn keyword_before(&self) -> Option<&str> {
        if self.current_lead.is_none() && !self.previous.is_empty() {
            Some(self.previous.as_str())
        } else {
            None
        }
    }

    /// True when the current word is `keyword` preceded by whitespace only
    /// or a statement boundary, never by a member access dot.
    pub fn previous_is_declarator(&self, keywords: &[&str]) -> bool {
        self.current_lead.is_none()
            && self.previous_lead != Some('.')
            && keywords.contains(&self.previous.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn feed_all(words: &mut WordTracker, text: &str) {
        for c in text.chars() {
            words.feed(c);
        }
    }

    #[test]
    fn identifier_immediately_before_paren() {
        let mut words = WordTracker::default();
        feed_all(&mut words, "x = add");
        assert_eq!(words.ident_before(), Some("add"));
        feed_all(&mut words, " ");
        assert_eq!(words.ident_before(), None);
    }

    #[test]
    fn keyword_before_requires_whitespace_only() {
        let mut words = WordTracker::default();
        feed_all(&mut words, "function inner");
        assert_eq!(words.keyword_before(), Some("function"));

        let mut words = WordTracker::default();
        feed_all(&mut words, "a.inner");
        assert_eq!(words.keyword_before(), None);
    }

    #[test]
    fn class_declarator_ignores_member_access() {
        let mut words = WordTracker::default();
        feed_all(&mut words, "public class Calc");
        assert!(words.previous_is_declarator(&["class"]));

        let mut words = WordTracker::default();
        feed_all(&mut words, "Foo.class getName");
        assert!(!words.previous_is_declarator(&["class"]));
    }

    #[test]
    fn whole_words_skip_embedded_matches() {
        let ac = AhoCorasick::new(["def"]).unwrap();
        let hits: Vec<usize> = whole_words(&ac, "undef def define (def)")
            .map(|m| m.start())
            .collect();
        assert_eq!(hits, vec![6, 18]);
    }

    fn chars(text: &str) -> Vec<char> {
        text.chars().collect()
    }

    #[test]
    fn generic_names_skip_type_arguments() {
        let line = chars("return std::make_shared<Map<K, V*>>(1)");
        let open = line.len() - 3;
        assert_eq!(
            generic_name_before(&line, open),
            Some(("make_shared".to_string(), 12))
        );

        let line = chars("const [n, set] = useState<number | null>(0)");
        let open = line.len() - 3;
        assert_eq!(
            generic_name_before(&line, open).map(|(n, _)| n),
            Some("useState".to_string())
        );
    }

    #[test]
    fn comparisons_and_arrows_are_not_generics() {
        let line = chars("x =>(y)");
        assert_eq!(generic_name_before(&line, 4), None);

        let line = chars("a > (b)");
        assert_eq!(generic_name_before(&line, 4), None);

        let line = chars("f(a >= b)(c)");
        assert_eq!(generic_name_before(&line, 9), None);
    }

    #[test]
    fn word_ending_at_skips_spaces() {
        let line = chars("  function  inner<T>(");
        assert_eq!(word_ending_at(&line, 12), Some("function".to_string()));
        assert_eq!(word_ending_at(&line, 2), None);
    }

    #[test]
    fn feed_reports_completed_words() {
        let mut words = WordTracker::default();
        assert!(!words.feed('a'));
        assert!(words.feed(' '));
        assert!(!words.feed(' '));
        assert_eq!(words.current(), "a");
    }
}
