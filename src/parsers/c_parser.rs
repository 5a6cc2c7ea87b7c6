//! C function extractor (forward strategy).
//!
//! A definition is `<type keywords> name(args) {`; prototypes ending in
//! `;` contribute nothing. Preprocessor lines are skipped entirely.

use regex::Regex;

use super::forward::{ForwardExtractor, ForwardGrammar};
use crate::{
    core::functions::{ExtractError, ExtractOptions, FileExtraction, FunctionExtractor, Language},
    parsers::words::C_FAMILY_KEYWORDS,
    scope::C_QUOTES,
};

const C_TYPE_KEYWORDS: &str = r"\b(?:void|unsigned|signed|char|short|int|long|float|double|bool|_Bool|static|inline|extern|const|struct|enum|union|size_t|ssize_t|[A-Za-z_]\w*_t)\b";

pub struct CExtractor {
    engine: ForwardExtractor,
}

impl CExtractor {
    pub fn new(opts: &ExtractOptions) -> Result<Self, ExtractError> {
        let grammar = ForwardGrammar {
            language: Language::C,
            quotes: C_QUOTES,
            type_keywords: Regex::new(C_TYPE_KEYWORDS)?,
            keywords: C_FAMILY_KEYWORDS,
            class_keywords: &[],
            class_members_are_methods: false,
            skip_preprocessor: true,
            signature_chars: &['*', '&'],
        };
        Ok(Self {
            engine: ForwardExtractor::new(grammar, opts),
        })
    }
}

impl FunctionExtractor for CExtractor {
    fn language(&self) -> Language {
        self.engine.language()
    }

    fn extract(&self, lines: &[String], filename: &str) -> FileExtraction {
        self.engine.extract(lines, filename)
    }
}
