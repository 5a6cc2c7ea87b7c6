//! Shared test utilities for integration tests
//!
//! Provides a small polyglot source tree used across test files.

#![allow(dead_code)]

use assert_fs::prelude::*;

/// One file per grammar with calls crossing file and language boundaries.
///
/// Expected graph:
/// - nodes: `main`, `add`, `Calc.twice`, `Shape.area`, `compute`, `total`
/// - edges: `main -> add`, `Calc.twice -> add`, `Shape.area -> compute`
/// - unresolved: `helper`, `sum`
pub fn make_polyglot_fixture() -> assert_fs::TempDir
{
    let tmp = assert_fs::TempDir::new().expect("tempdir");

    tmp.child("c/main.c")
        .write_str(
            "void helper(int x);\n\
             \n\
             int main() {\n\
             \x20   helper(1);\n\
             \x20   return add(1, 2);\n\
             }\n",
        )
        .expect("write main.c");

    tmp.child("c/math.c")
        .write_str("int add(int a, int b) {\n    return a + b;\n}\n")
        .expect("write math.c");

    tmp.child("java/Calc.java")
        .write_str("class Calc {\n    int twice(int a) {\n        return add(a, a);\n    }\n}\n")
        .expect("write Calc.java");

    tmp.child("py/shapes.py")
        .write_str(
            "class Shape:\n    def area(self):\n        return compute(self)\n\n\
             def compute(s):\n    return 0\n",
        )
        .expect("write shapes.py");

    tmp.child("ts/cart.ts")
        .write_str("function total(items) {\n  return sum(items);\n}\n")
        .expect("write cart.ts");

    tmp.child("README.md")
        .write_str("# Fixture\n")
        .expect("write readme");

    tmp
}

/// Split source text into the line list extractors consume.
pub fn lines(src: &str) -> Vec<String>
{
    src.lines()
        .map(str::to_string)
        .collect()
}
