//! Java method extractor (forward strategy with class qualification).
//!
//! Methods are recognised either by a visibility/type keyword before the
//! name or by sitting directly in a class body; names are qualified with
//! the enclosing class path (`Outer.Inner.method`).

use regex::Regex;

use super::forward::{ForwardExtractor, ForwardGrammar};
use crate::{
    core::functions::{ExtractError, ExtractOptions, FileExtraction, FunctionExtractor, Language},
    parsers::words::C_FAMILY_KEYWORDS,
    scope::C_QUOTES,
};

const JAVA_MODIFIERS: &str = r"\b(?:public|private|protected|static|final|abstract|synchronized|native|default|void|int|long|short|byte|char|boolean|float|double)\b";

const JAVA_CLASS_KEYWORDS: &[&str] = &["class", "interface", "enum", "record"];

pub struct JavaExtractor {
    engine: ForwardExtractor,
}

impl JavaExtractor {
    pub fn new(opts: &ExtractOptions) -> Result<Self, ExtractError> {
        let grammar = ForwardGrammar {
            language: Language::Java,
            quotes: C_QUOTES,
            type_keywords: Regex::new(JAVA_MODIFIERS)?,
            keywords: C_FAMILY_KEYWORDS,
            class_keywords: JAVA_CLASS_KEYWORDS,
            class_members_are_methods: true,
            skip_preprocessor: false,
            signature_chars: &['<', '>', '[', ']', ',', '.', '?', '@'],
        };
        Ok(Self {
            engine: ForwardExtractor::new(grammar, opts),
        })
    }
}

impl FunctionExtractor for JavaExtractor {
    fn language(&self) -> Language {
        self.engine.language()
    }

    fn extract(&self, lines: &[String], filename: &str) -> FileExtraction {
        self.engine.extract(lines, filename)
    }
}
