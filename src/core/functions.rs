//! Function records, language detection and the extractor registry.
//!
//! Every grammar extractor turns the lines of one file into a flat list of
//! [`FunctionRecord`]s. Extractors are stateless between files: all cursor
//! and automaton state lives inside a single `extract` call, so one
//! instance per language is shared across the rayon pool.

use std::{fmt, path::Path, str::FromStr};

use indexmap::IndexSet;
use serde::{Deserialize, Serialize};

use crate::{
    embedding::Embedding,
    parsers::{CExtractor, CppExtractor, JavaExtractor, PythonExtractor, TypeScriptExtractor},
    scope::CaptureFlavor,
};

/// Errors raised while preparing extraction.
#[derive(Debug, thiserror::Error)]
pub enum ExtractError {
    #[error("Unsupported language: {0}")]
    UnsupportedLanguage(String),

    #[error("Invalid signature pattern: {0}")]
    Pattern(#[from] regex::Error),

    #[error("Invalid keyword set: {0}")]
    Keywords(#[from] aho_corasick::BuildError),
}

/// A function found in one file, before graph ingestion.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct FunctionRecord {
    /// Qualified name (`Class.method`, `Outer.inner`)
    pub name: String,

    /// Path relative to the analysed root, `/`-separated
    pub filename: String,

    /// Raw signature text as written
    pub signature: String,

    /// Source lines from the declaration through the closing scope marker
    pub definition: Vec<String>,

    /// Zero-based line of the first body line
    pub definition_line: usize,

    /// Zero-based line where the signature starts
    pub declaration_line: usize,

    /// Distinct identifiers invoked from the body, in first-seen order
    pub calls: IndexSet<String>,

    /// Semantic vector, empty until annotated
    pub embedding: Embedding,
}

impl FunctionRecord {
    pub fn new(name: impl Into<String>, filename: &str, signature: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            filename: filename.to_string(),
            signature: signature.into(),
            ..Self::default()
        }
    }

    /// Record a call; duplicates are ignored.
    pub fn add_call(&mut self, callee: &str) {
        if !self.calls.contains(callee) {
            self.calls.insert(callee.to_string());
        }
    }
}

/// Why a file's tail could not be extracted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TruncationReason {
    /// End of input reached with an open scope awaiting `expected`
    Unterminated { expected: String },
    /// A balanced capture (arguments or body) never closed
    UnbalancedCapture { expected: char },
}

impl fmt::Display for TruncationReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TruncationReason::Unterminated { expected } => {
                write!(f, "end of input while waiting for `{expected}`")
            }
            TruncationReason::UnbalancedCapture { expected } => {
                write!(f, "unbalanced capture, never found `{expected}`")
            }
        }
    }
}

/// Marks where extraction of a file gave up.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Truncation {
    /// Zero-based line where the unfinished construct started
    pub line: usize,
    pub reason: TruncationReason,
}

/// Result of extracting one file.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FileExtraction {
    pub functions: Vec<FunctionRecord>,
    pub truncated: Option<Truncation>,
}

/// Tunables shared by all extractors.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ExtractOptions {
    /// Maximum characters searched backward for a signature; `None` uses
    /// the grammar's default
    pub lookback_limit: Option<usize>,

    /// Backing for balanced sub-scans. Only the forward grammars (C, Java)
    /// have sub-scans; the others warn and scan lexically.
    pub capture: CaptureFlavor,
}

impl ExtractOptions {
    pub fn lookback_or(&self, default: usize) -> usize {
        self.lookback_limit.unwrap_or(default)
    }
}

/// Supported grammars.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Language {
    C,
    Cpp,
    Java,
    TypeScript,
    Python,
}

impl Language {
    pub const ALL: [Language; 5] = [
        Language::C,
        Language::Cpp,
        Language::Java,
        Language::TypeScript,
        Language::Python,
    ];

    /// Canonical lowercase label
    pub fn label(self) -> &'static str {
        match self {
            Language::C => "c",
            Language::Cpp => "cpp",
            Language::Java => "java",
            Language::TypeScript => "typescript",
            Language::Python => "python",
        }
    }

    /// Map a file extension (without dot, any case) to a grammar.
    pub fn from_extension(ext: &str) -> Option<Self> {
        let lang = match ext.to_ascii_lowercase().as_str() {
            "c" | "h" => Language::C,
            "cpp" | "cc" | "cxx" | "hpp" | "hh" | "hxx" => Language::Cpp,
            "java" => Language::Java,
            "ts" | "tsx" | "js" | "jsx" | "mjs" | "cjs" => Language::TypeScript,
            "py" | "pyw" => Language::Python,
            _ => return None,
        };
        Some(lang)
    }

    /// Detect the grammar of `path` from its extension.
    pub fn detect(path: &Path) -> Option<Self> {
        let ext = path.extension()?.to_str()?;
        Self::from_extension(ext)
    }
}

impl fmt::Display for Language {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for Language {
    type Err = ExtractError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let lang = match s.trim().to_ascii_lowercase().as_str() {
            "c" => Language::C,
            "cpp" | "c++" | "cxx" => Language::Cpp,
            "java" => Language::Java,
            "typescript" | "ts" | "javascript" | "js" => Language::TypeScript,
            "python" | "py" => Language::Python,
            other => return Err(ExtractError::UnsupportedLanguage(other.to_string())),
        };
        Ok(lang)
    }
}

/// Per-grammar function extractor.
pub trait FunctionExtractor: Send + Sync {
    fn language(&self) -> Language;

    /// Extract every function defined in `lines`; `filename` is recorded
    /// on each record as-is.
    fn extract(&self, lines: &[String], filename: &str) -> FileExtraction;
}

/// Extractor registry
pub fn get_extractor(
    lang: Language,
    opts: &ExtractOptions,
) -> Result<Box<dyn FunctionExtractor>, ExtractError> {
    let extractor: Box<dyn FunctionExtractor> = match lang {
        Language::C => Box::new(CExtractor::new(opts)?),
        Language::Cpp => Box::new(CppExtractor::new(opts)?),
        Language::Java => Box::new(JavaExtractor::new(opts)?),
        Language::TypeScript => Box::new(TypeScriptExtractor::new(opts)?),
        Language::Python => Box::new(PythonExtractor::new(opts)?),
    };
    Ok(extractor)
}

/// Resolve user-supplied language names, failing on the first unknown one.
pub fn resolve_languages(names: &[String]) -> Result<Vec<Language>, ExtractError> {
    if names.is_empty() {
        return Ok(Language::ALL.to_vec());
    }
    let mut out: Vec<Language> = Vec::with_capacity(names.len());
    for name in names {
        let lang = name.parse::<Language>()?;
        if !out.contains(&lang) {
            out.push(lang);
        }
    }
    Ok(out)
}
