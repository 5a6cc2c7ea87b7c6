//! Gitignore-aware source discovery.
//! - Respects .gitignore, .git/info/exclude, and global gitignore
//! - Extra ignore globs (early prune + late filter)
//! - Keeps only files whose extension maps to a selected grammar
//! - Optional test-file filter (`*.test.*`, `*.spec.*`)
//! - Deterministic ordering so the graph merge is reproducible
//!
//! Backed by ripgrep's `ignore` crate and `globset`.

use std::path::{Path, PathBuf};

use anyhow::Result;
use globset::{Glob, GlobSet, GlobSetBuilder};
use ignore::{DirEntry, WalkBuilder};

use crate::core::functions::Language;

/// Glob patterns that mark test files when `skip_test_files` is on.
pub const TEST_FILE_GLOBS: [&str; 2] = ["**/*.test.*", "**/*.spec.*"];

/// Walker yielding `(path, Language)` for every extractable file.
pub struct SourceWalker
{
    /// Compiled set of additional ignore patterns
    ignore_patterns: GlobSet,

    /// Grammars to keep; files of other languages are dropped
    languages: Vec<Language>,

    /// Compiled test-file patterns, set when test files are skipped
    test_files: Option<GlobSet>,

    /// Include hidden (dot) files; default false
    include_hidden: bool,
}

fn compile(patterns: &[impl AsRef<str>]) -> Result<GlobSet>
{
    let mut builder = GlobSetBuilder::new();
    for pattern in patterns
    {
        builder.add(Glob::new(pattern.as_ref())?);
    }
    Ok(builder.build()?)
}

impl SourceWalker
{
    /// Build a walker with additional ignore patterns (e.g., "target/**",
    /// "node_modules/**"). Patterns match on paths relative to the root.
    pub fn new(
        additional_ignores: &[String],
        languages: &[Language],
    ) -> Result<Self>
    {
        Ok(Self {
            ignore_patterns: compile(additional_ignores)?,
            languages: languages.to_vec(),
            test_files: None,
            include_hidden: false,
        })
    }

    /// (Optional) Drop `*.test.*` and `*.spec.*` files.
    pub fn with_skip_test_files(
        mut self,
        skip: bool,
    ) -> Result<Self>
    {
        self.test_files = if skip { Some(compile(&TEST_FILE_GLOBS)?) } else { None };
        Ok(self)
    }

    /// (Optional) Include or exclude hidden files (dotfiles).
    pub fn with_include_hidden(
        mut self,
        include_hidden: bool,
    ) -> Self
    {
        self.include_hidden = include_hidden;
        self
    }

    fn build_walk(
        &self,
        root: &Path,
    ) -> WalkBuilder
    {
        let mut b = WalkBuilder::new(root);

        // WalkBuilder::hidden(true) skips dotfiles
        b.hidden(!self.include_hidden);
        b.git_ignore(true);
        b.git_global(true);
        b.git_exclude(true);

        // Early directory pruning on paths relative to the root
        let extra = self
            .ignore_patterns
            .clone();
        let base = root.to_path_buf();
        b.filter_entry(move |ent: &DirEntry| {
            let is_dir = ent
                .file_type()
                .is_some_and(|ft| ft.is_dir());
            if !is_dir
            {
                return true;
            }
            let rel = ent
                .path()
                .strip_prefix(&base)
                .unwrap_or(ent.path());
            !(extra.is_match(rel) || extra.is_match(rel.join("_")))
        });

        b
    }

    /// Classify one candidate file; `None` drops it.
    fn classify(
        &self,
        root: &Path,
        path: &Path,
    ) -> Option<Language>
    {
        let rel = path
            .strip_prefix(root)
            .unwrap_or(path);
        if self
            .ignore_patterns
            .is_match(rel)
        {
            return None;
        }
        if self
            .test_files
            .as_ref()
            .is_some_and(|set| set.is_match(rel))
        {
            return None;
        }
        Language::detect(path).filter(|lang| {
            self.languages
                .contains(lang)
        })
    }

    /// Traverse `root` and return extractable files, sorted by path.
    pub fn walk<P: AsRef<Path>>(
        &self,
        root: P,
    ) -> Vec<(PathBuf, Language)>
    {
        let root_path = root.as_ref();
        let mut out: Vec<(PathBuf, Language)> = self
            .build_walk(root_path)
            .build()
            .filter_map(|res| match res
            {
                Ok(entry) => Some(entry),
                Err(err) =>
                {
                    tracing::warn!(error = %err, "skipping unreadable entry");
                    None
                }
            })
            .filter(|entry| {
                entry
                    .file_type()
                    .is_some_and(|ft| ft.is_file())
            })
            .map(|entry| entry.into_path())
            .filter_map(|path| {
                self.classify(root_path, &path)
                    .map(|lang| (path, lang))
            })
            .collect();

        out.sort();
        out
    }
}

#[cfg(test)]
mod tests
{
    use std::fs;

    use tempfile::TempDir;

    use super::*;

    fn write_file(
        root: &Path,
        rel: &str,
        contents: &str,
    ) -> Result<()>
    {
        let path = root.join(rel);
        if let Some(parent) = path.parent()
        {
            fs::create_dir_all(parent)?;
        }
        fs::write(path, contents)?;
        Ok(())
    }

    fn relative(
        root: &Path,
        found: Vec<(PathBuf, Language)>,
    ) -> Vec<(String, Language)>
    {
        found
            .into_iter()
            .map(|(p, l)| {
                (
                    p.strip_prefix(root)
                        .unwrap()
                        .to_string_lossy()
                        .replace('\\', "/"),
                    l,
                )
            })
            .collect()
    }

    #[test]
    fn test_keeps_only_selected_languages_sorted() -> Result<()>
    {
        let tmp = TempDir::new()?;
        let root = tmp.path();
        write_file(root, "src/main.c", "int main() {}")?;
        write_file(root, "src/app.py", "def f(): pass")?;
        write_file(root, "README.md", "# readme")?;
        write_file(root, "lib.rs", "fn x() {}")?;

        let walker = SourceWalker::new(&[], &Language::ALL)?;
        assert_eq!(
            relative(root, walker.walk(root)),
            vec![
                ("src/app.py".to_string(), Language::Python),
                ("src/main.c".to_string(), Language::C),
            ]
        );

        let only_c = SourceWalker::new(&[], &[Language::C])?;
        assert_eq!(relative(root, only_c.walk(root)).len(), 1);
        Ok(())
    }

    #[test]
    fn test_additional_globs_prune_and_filter() -> Result<()>
    {
        let tmp = TempDir::new()?;
        let root = tmp.path();
        write_file(root, "node_modules/pkg/index.js", "function f() {}")?;
        write_file(root, "dist/app.min.js", "function g() {}")?;
        write_file(root, "src/app.ts", "function h() {}")?;

        let ignores = vec!["node_modules/**".to_string(), "*.min.js".to_string()];
        let walker = SourceWalker::new(&ignores, &Language::ALL)?;
        assert_eq!(
            relative(root, walker.walk(root)),
            vec![("src/app.ts".to_string(), Language::TypeScript)]
        );
        Ok(())
    }

    #[test]
    fn test_test_files_are_skipped_on_request() -> Result<()>
    {
        let tmp = TempDir::new()?;
        let root = tmp.path();
        write_file(root, "cart.ts", "")?;
        write_file(root, "cart.test.ts", "")?;
        write_file(root, "cart.spec.ts", "")?;

        let all = SourceWalker::new(&[], &Language::ALL)?;
        assert_eq!(all.walk(root).len(), 3);

        let skipping = SourceWalker::new(&[], &Language::ALL)?.with_skip_test_files(true)?;
        assert_eq!(
            relative(root, skipping.walk(root)),
            vec![("cart.ts".to_string(), Language::TypeScript)]
        );
        Ok(())
    }

    #[test]
    fn test_hidden_files_excluded_by_default() -> Result<()>
    {
        let tmp = TempDir::new()?;
        let root = tmp.path();
        write_file(root, ".hidden/x.c", "")?;
        write_file(root, "visible.c", "")?;

        let walker = SourceWalker::new(&[], &Language::ALL)?;
        assert_eq!(walker.walk(root).len(), 1);

        let walker = SourceWalker::new(&[], &Language::ALL)?.with_include_hidden(true);
        assert_eq!(walker.walk(root).len(), 2);
        Ok(())
    }
}
