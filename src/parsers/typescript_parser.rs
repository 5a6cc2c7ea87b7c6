//! TypeScript / JavaScript function extractor (backward strategy).
//!
//! Top-level definitions are found by looking back from `(` for the
//! `function` keyword; class members are recognised by their name sitting
//! directly in a class body. Arrow functions and function expressions
//! without a name are not nodes.

use aho_corasick::AhoCorasick;
use regex::Regex;

use super::{
    backward::{BackwardExtractor, BackwardGrammar},
    cursor::{Position, Source, lookback},
    words::{C_FAMILY_KEYWORDS, whole_words},
};
use crate::{
    core::functions::{ExtractError, ExtractOptions, FileExtraction, FunctionExtractor, Language},
    scope::SCRIPT_QUOTES,
};

pub const TS_DEFAULT_LOOKBACK: usize = 50;

const TS_CLASS_KEYWORDS: &[&str] = &["class", "interface"];

const TS_FUNCTION: &str = r"^function\s*\*?\s*(?P<name>[A-Za-z_$][\w$]*)\s*(?:<[^>]*>)?\s*\((?s:.*)\)\s*(?::(?s:.*?))?\s*\{$";

const TS_METHOD: &str = r"^(?:(?:public|private|protected|static|async|readonly|override|abstract|get|set)\s+)*\*?\s*(?P<name>[A-Za-z_$][\w$]*)\s*(?:<[^>]*>)?\s*\((?s:.*)\)\s*(?::(?s:.*?))?\s*\{$";

pub struct TypeScriptGrammar {
    function_word: AhoCorasick,
    function: Regex,
    method: Regex,
}

impl TypeScriptGrammar {
    pub fn new() -> Result<Self, ExtractError> {
        Ok(Self {
            function_word: AhoCorasick::new(["function"])?,
            function: Regex::new(TS_FUNCTION)?,
            method: Regex::new(TS_METHOD)?,
        })
    }
}

impl BackwardGrammar for TypeScriptGrammar {
    fn language(&self) -> Language {
        Language::TypeScript
    }

    fn quotes(&self) -> &'static [char] {
        SCRIPT_QUOTES
    }

    fn keywords(&self) -> &'static [&'static str] {
        C_FAMILY_KEYWORDS
    }

    fn class_keywords(&self) -> &'static [&'static str] {
        TS_CLASS_KEYWORDS
    }

    fn default_lookback(&self) -> usize {
        TS_DEFAULT_LOOKBACK
    }

    fn opens_type_literal(&self, prev: char) -> bool {
        matches!(prev, ':' | '|' | '&')
    }

    fn signature_start(
        &self,
        src: &Source<'_>,
        open: Position,
        limit: usize,
        in_class_body: bool,
    ) -> Option<Position> {
        if in_class_body {
            // Members start on the line of their argument list
            let lb = lookback(src, open, limit.min(open.column), &['{', '}', ';']);
            if lb.exhausted && lb.start.column > 0 {
                return None;
            }
            let lead = lb.text.len() - lb.text.trim_start().len();
            return Some(lb.start.advanced_by(&lb.text[..lead]));
        }

        let lb = lookback(src, open, limit, &['{', '}', ';']);
        let found = whole_words(&self.function_word, &lb.text).last()?;
        Some(lb.start.advanced_by(&lb.text[..found.start()]))
    }

    fn match_signature(&self, text: &str, in_class_body: bool) -> Option<String> {
        let pattern = if in_class_body {
            &self.method
        } else {
            &self.function
        };
        let caps = pattern.captures(text)?;
        let name = caps.name("name")?.as_str();
        if C_FAMILY_KEYWORDS.contains(&name) {
            return None;
        }
        Some(name.to_string())
    }
}

pub struct TypeScriptExtractor {
    engine: BackwardExtractor<TypeScriptGrammar>,
}

impl TypeScriptExtractor {
    pub fn new(opts: &ExtractOptions) -> Result<Self, ExtractError> {
        Ok(Self {
            engine: BackwardExtractor::new(TypeScriptGrammar::new()?, opts),
        })
    }
}

impl FunctionExtractor for TypeScriptExtractor {
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
        TypeScriptExtractor::new(&ExtractOptions::default())
            .unwrap()
            .extract(&lines, "app.ts")
    }

    fn names(out: &FileExtraction) -> Vec<&str> {
        out.functions.iter().map(|f| f.name.as_str()).collect()
    }

    fn calls(rec: &FunctionRecord) -> Vec<&str> {
        rec.calls.iter().map(String::as_str).collect()
    }

    #[test]
    fn functions_and_calls() {
        let src = "function add(a: number, b: number): number {\n  return a + b;\n}\n\nexport function main() {\n  console.log(add(1, 2));\n}\n";
        let out = run(src);
        assert_eq!(names(&out), vec!["add", "main"]);
        assert!(calls(&out.functions[0]).is_empty());
        assert_eq!(calls(&out.functions[1]), vec!["log", "add"]);
        assert_eq!(out.functions[1].declaration_line, 4);
        assert_eq!(out.functions[1].definition.len(), 3);
        assert_eq!(out.functions[0].signature, "function add(a: number, b: number): number");
    }

    #[test]
    fn class_methods_are_qualified() {
        let src = "class Cart {\n  private items: Item[] = [];\n  constructor(seed: Item[]) {\n    this.items = clone(seed);\n  }\n  async total(): Promise<number> {\n    return sum(this.items);\n  }\n}\n";
        let out = run(src);
        assert_eq!(names(&out), vec!["Cart.constructor", "Cart.total"]);
        assert_eq!(calls(&out.functions[0]), vec!["clone"]);
        assert_eq!(calls(&out.functions[1]), vec!["sum"]);
    }

    #[test]
    fn nested_functions_fold_into_outer() {
        let src = "function outer() {\n  function inner() {\n    deep();\n  }\n  inner();\n}\n";
        let out = run(src);
        assert_eq!(names(&out), vec!["outer"]);
        assert_eq!(calls(&out.functions[0]), vec!["deep", "inner"]);
    }

    #[test]
    fn template_literals_and_comments_hide_parens() {
        let src = "function greet(name) {\n  // fake(\n  return `hi ${name} (not(a call)`;\n}\n";
        let out = run(src);
        assert_eq!(names(&out), vec!["greet"]);
        assert!(calls(&out.functions[0]).is_empty());
    }

    #[test]
    fn top_level_calls_and_arrows_are_not_nodes() {
        let src = "const f = (x) => {\n  return g(x);\n};\nsetup(f);\n";
        let out = run(src);
        assert!(out.functions.is_empty());
    }

    #[test]
    fn keyword_too_far_back_is_not_a_signature() {
        let src = "function\n                                                            veryLongName() {\n}\n";
        let out = run(src);
        assert!(out.functions.is_empty());
    }

    #[test]
    fn brace_on_next_line() {
        let src = "function sum(a, b)\n{\n  return helper(a);\n}\nfunction after() { return 1; }\n";
        let out = run(src);
        assert_eq!(names(&out), vec!["sum", "after"]);
        assert_eq!(calls(&out.functions[0]), vec!["helper"]);
        assert_eq!(out.functions[0].definition_line, 1);
        assert!(out.truncated.is_none());
    }

    #[test]
    fn arguments_spanning_lines() {
        let src = "function f(a,\nb) {\n  g(a);\n}\nfunction h(\n  x\n) {\n  k(x);\n}\n";
        let out = run(src);
        assert_eq!(names(&out), vec!["f", "h"]);
        assert_eq!(calls(&out.functions[0]), vec!["g"]);
        assert_eq!(calls(&out.functions[1]), vec!["k"]);
        assert_eq!(out.functions[0].signature, "function f(a,\nb)");
    }

    #[test]
    fn generic_functions_and_methods() {
        let src = "function identity<T>(arg: T): T {\n  return wrap(arg);\n}\nclass Box {\n  map<U>(f): U { return apply(f); }\n}\n";
        let out = run(src);
        assert_eq!(names(&out), vec!["identity", "Box.map"]);
        assert_eq!(calls(&out.functions[0]), vec!["wrap"]);
        assert_eq!(calls(&out.functions[1]), vec!["apply"]);
    }

    #[test]
    fn calls_with_type_arguments() {
        let src = "function view() {\n  const [n, setN] = useState<number>(0);\n  function inner<T>(x: T) {\n  }\n  run();\n}\n";
        let out = run(src);
        assert_eq!(names(&out), vec!["view"]);
        assert_eq!(calls(&out.functions[0]), vec!["useState", "run"]);
    }

    #[test]
    fn object_literal_return_type_is_not_the_body() {
        let src = "function f(): { a: number } {\n  return build();\n}\n";
        let out = run(src);
        assert_eq!(names(&out), vec!["f"]);
        assert_eq!(calls(&out.functions[0]), vec!["build"]);
        assert_eq!(out.functions[0].signature, "function f(): { a: number }");
        assert_eq!(out.functions[0].definition.len(), 3);
    }

    #[test]
    fn counting_capture_still_scans_lexically() {
        let lines: Vec<String> = "function f() {\n  log(\"}\");\n  g();\n}\n"
            .lines()
            .map(str::to_string)
            .collect();
        let opts = ExtractOptions {
            capture: crate::scope::CaptureFlavor::Counting,
            ..ExtractOptions::default()
        };
        let out = TypeScriptExtractor::new(&opts).unwrap().extract(&lines, "app.ts");
        assert_eq!(calls(&out.functions[0]), vec!["log", "g"]);
    }

    #[test]
    fn unterminated_template_literal_truncates() {
        let out = run("function ok() { }\nconst s = `open\n");
        assert_eq!(names(&out), vec!["ok"]);
        let cut = out.truncated.expect("truncation");
        assert_eq!(cut.line, 1);
    }
}
