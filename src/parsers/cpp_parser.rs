//! C++ function extractor (backward strategy).
//!
//! Accepts `ret name(args) {`, out-of-class `ret A::b(args) {` and, inside
//! a class body, members without a return type (constructors). `A::b` is
//! reported as `A.b`.

use regex::Regex;

use super::{
    backward::{BackwardExtractor, BackwardGrammar},
    cursor::{Position, Source, lookback},
    words::C_FAMILY_KEYWORDS,
};
use crate::{
    core::functions::{ExtractError, ExtractOptions, FileExtraction, FunctionExtractor, Language},
    scope::C_QUOTES,
};

pub const CPP_DEFAULT_LOOKBACK: usize = 1000;

const CPP_CLASS_KEYWORDS: &[&str] = &["class", "struct"];

/// Tail of the lookback text: optional return-type words then the name.
const CPP_SIGNATURE_TAIL: &str =
    r"(?:[\w:<>,\*&]+[\s\*&]+)*~?[A-Za-z_]\w*(?:::~?[A-Za-z_]\w*)*$";

const CPP_SIGNATURE: &str = r"^(?P<ret>(?:[\w:<>,\*&]+[\s\*&]+)*)(?P<name>~?[A-Za-z_]\w*(?:::~?[A-Za-z_]\w*)*)\s*\((?s:.*)\)\s*(?:const\b\s*)?(?:noexcept\b\s*)?(?:override\b\s*)?(?:final\b\s*)?(?:->\s*[^{;]+?\s*)?(?::(?s:[^{;]*))?\{$";

const CPP_ACCESS_LABEL: &str = r"\b(?:public|private|protected)\s*:\s";

/// Words that can precede `name(` without being a return type.
const NOT_A_RETURN_TYPE: &[&str] = &["return", "else", "new", "delete", "throw", "case", "goto"];

pub struct CppGrammar {
    tail: Regex,
    signature: Regex,
    access_label: Regex,
}

impl CppGrammar {
    pub fn new() -> Result<Self, ExtractError> {
        Ok(Self {
            tail: Regex::new(CPP_SIGNATURE_TAIL)?,
            signature: Regex::new(CPP_SIGNATURE)?,
            access_label: Regex::new(CPP_ACCESS_LABEL)?,
        })
    }

    /// Offset where code starts in a lookback text that stopped at `stop`.
    fn code_offset(&self, text: &str, stop: Option<char>, stop_prev: Option<char>) -> usize {
        // The rest of a `//` comment or a directive line
        let mut offset = match (stop, stop_prev) {
            (Some('/'), Some('*')) => 0,
            (Some('/' | '#'), _) => text.find('\n').map_or(text.len(), |i| i + 1),
            _ => 0,
        };
        if let Some(label) = self.access_label.find_iter(&text[offset..]).last() {
            offset += label.end();
        }
        offset
    }
}

impl BackwardGrammar for CppGrammar {
    fn language(&self) -> Language {
        Language::Cpp
    }

    fn quotes(&self) -> &'static [char] {
        C_QUOTES
    }

    fn keywords(&self) -> &'static [&'static str] {
        C_FAMILY_KEYWORDS
    }

    fn class_keywords(&self) -> &'static [&'static str] {
        CPP_CLASS_KEYWORDS
    }

    fn default_lookback(&self) -> usize {
        CPP_DEFAULT_LOOKBACK
    }

    fn signature_start(
        &self,
        src: &Source<'_>,
        open: Position,
        limit: usize,
        _in_class_body: bool,
    ) -> Option<Position> {
        let lb = lookback(src, open, limit, &['{', '}', ';', '/', '#']);
        if lb.exhausted {
            return None;
        }

        let stop = lb
            .start
            .column
            .checked_sub(1)
            .and_then(|c| src.char_at(Position::new(lb.start.line, c)));
        let stop_prev = lb
            .start
            .column
            .checked_sub(2)
            .and_then(|c| src.char_at(Position::new(lb.start.line, c)));

        let offset = self.code_offset(&lb.text, stop, stop_prev);
        let found = self.tail.find(&lb.text[offset..])?;
        Some(lb.start.advanced_by(&lb.text[..offset + found.start()]))
    }

    fn match_signature(&self, text: &str, in_class_body: bool) -> Option<String> {
        let caps = self.signature.captures(text)?;
        let name = caps.name("name")?.as_str();
        let ret = caps.name("ret").map_or("", |m| m.as_str().trim());

        if ret.is_empty() {
            if !in_class_body && !name.contains("::") {
                return None;
            }
        } else {
            let first = ret.split_whitespace().next().unwrap_or_default();
            if NOT_A_RETURN_TYPE.contains(&first) {
                return None;
            }
        }
        Some(name.to_string())
    }

    fn skip_line(&self, line: &str) -> bool {
        line.trim_start().starts_with('#')
    }

    fn normalize_name(&self, name: &str) -> String {
        name.replace("::", ".")
    }
}

pub struct CppExtractor {
    engine: BackwardExtractor<CppGrammar>,
}

impl CppExtractor {
    pub fn new(opts: &ExtractOptions) -> Result<Self, ExtractError> {
        Ok(Self {
            engine: BackwardExtractor::new(CppGrammar::new()?, opts),
        })
    }
}

impl FunctionExtractor for CppExtractor {
    fn language(&self) -> Language {
        self.engine.language()
    }

    fn extract(&self, lines: &[String], filename: &str) -> FileExtraction {
        self.engine.extract(lines, filename)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::functions::FunctionRecord;

    fn run(src: &str) -> FileExtraction {
        let lines: Vec<String> = src.lines().map(str::to_string).collect();
        CppExtractor::new(&ExtractOptions::default())
            .unwrap()
            .extract(&lines, "calc.cpp")
    }

    fn names(out: &FileExtraction) -> Vec<&str> {
        out.functions.iter().map(|f| f.name.as_str()).collect()
    }

    fn calls(rec: &FunctionRecord) -> Vec<&str> {
        rec.calls.iter().map(String::as_str).collect()
    }

    #[test]
    fn in_class_method_is_qualified() {
        let out = run(
            "class Calc {\npublic:\n  int sum(int a, int b) { return add(a, b); }\n};\n",
        );
        assert_eq!(names(&out), vec!["Calc.sum"]);
        let sum = &out.functions[0];
        assert_eq!(calls(sum), vec!["add"]);
        assert_eq!(sum.signature, "int sum(int a, int b)");
        assert_eq!(sum.declaration_line, 2);
        assert_eq!(sum.definition_line, 2);
    }

    #[test]
    fn out_of_class_definition_is_normalised() {
        let src = "#include \"calc.h\"\n\nint Calc::sum(int a, int b)\n{\n    return helper(a) + helper(b);\n}\n";
        let out = run(src);
        assert_eq!(names(&out), vec!["Calc.sum"]);
        let sum = &out.functions[0];
        assert_eq!(calls(sum), vec!["helper"]);
        assert_eq!(sum.declaration_line, 2);
        assert_eq!(sum.definition_line, 3);
        assert_eq!(sum.definition.len(), 4);
        assert_eq!(sum.signature, "int Calc::sum(int a, int b)");
    }

    #[test]
    fn allman_brace_keeps_following_functions() {
        let src = "int sum(int a, int b)\n{\n    return helper(a);\n}\nint after() { return 1; }\n";
        let out = run(src);
        assert_eq!(names(&out), vec!["sum", "after"]);
        assert_eq!(calls(&out.functions[0]), vec!["helper"]);
        assert_eq!(out.functions[0].definition.len(), 4);
        assert!(out.truncated.is_none());
    }

    #[test]
    fn arguments_spanning_lines() {
        let src = "int f(int a,\nint b) {\n  g(a);\n}\nvoid h(\n  int x\n) {\n  k(x);\n}\n";
        let out = run(src);
        assert_eq!(names(&out), vec!["f", "h"]);
        assert_eq!(out.functions[0].signature, "int f(int a,\nint b)");
        assert_eq!(calls(&out.functions[0]), vec!["g"]);
        assert_eq!(calls(&out.functions[1]), vec!["k"]);
    }

    #[test]
    fn calls_with_template_arguments() {
        let src = "void setup() {\n  auto p = std::make_shared<Foo>(1);\n  auto m = cast<std::map<int, int>>(p);\n  run();\n}\n";
        let out = run(src);
        assert_eq!(names(&out), vec!["setup"]);
        assert_eq!(calls(&out.functions[0]), vec!["make_shared", "cast", "run"]);
    }

    #[test]
    fn constructor_with_initialiser_list() {
        let src = "struct Point {\n  Point(int x) : x_(x), y_(zero()) {\n    check();\n  }\n  int x_, y_;\n};\n";
        let out = run(src);
        assert_eq!(names(&out), vec!["Point.Point"]);
        assert_eq!(calls(&out.functions[0]), vec!["check"]);
    }

    #[test]
    fn declarations_and_calls_at_file_scope_are_not_nodes() {
        let src = "int helper(int);\nint x = compute(3);\nMACRO(thing) {\n}\n";
        let out = run(src);
        assert!(out.functions.is_empty());
        assert!(out.truncated.is_none());
    }

    #[test]
    fn return_type_on_previous_line_and_comments() {
        let src = "// returns a count\nstatic int\ncount(const std::vector<int>& v) {\n  /* size( */ return v.size();\n}\n";
        let out = run(src);
        assert_eq!(names(&out), vec!["count"]);
        assert_eq!(out.functions[0].declaration_line, 1);
        assert_eq!(calls(&out.functions[0]), vec!["size"]);
    }

    #[test]
    fn control_flow_inside_body_is_not_a_call() {
        let src = "void run() {\n  for (int i = 0; i < 3; ++i) {\n    if (ok(i)) { step(i); }\n  }\n  while (busy()) {}\n}\n";
        let out = run(src);
        assert_eq!(names(&out), vec!["run"]);
        assert_eq!(calls(&out.functions[0]), vec!["ok", "step", "busy"]);
    }

    #[test]
    fn namespace_functions_are_unqualified() {
        let src = "namespace util {\nint twice(int v) { return v * 2; }\n}\n";
        let out = run(src);
        assert_eq!(names(&out), vec!["twice"]);
    }

    #[test]
    fn unclosed_function_truncates() {
        let out = run("int ok() { return 1; }\nint broken() {\n  work();\n");
        assert_eq!(names(&out), vec!["ok"]);
        assert_eq!(out.truncated.map(|t| t.line), Some(1));
    }

    #[test]
    fn tiny_lookback_finds_nothing() {
        let lines: Vec<String> = vec!["int compute_total(int a) { return a; }".into()];
        let opts = ExtractOptions {
            lookback_limit: Some(3),
            ..ExtractOptions::default()
        };
        let out = CppExtractor::new(&opts).unwrap().extract(&lines, "a.cpp");
        assert!(out.functions.is_empty());
    }
}
