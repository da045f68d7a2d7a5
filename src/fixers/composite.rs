use std::path::PathBuf;

use crate::core::error::Result;

use super::fix::{Fix, FixContext};

/// An ordered group of fixes applied as one unit and committed once under
/// `title`.
#[derive(Debug, Clone)]
pub struct CompositeFix {
    pub title: String,
    pub children: Vec<Fix>,
}

impl CompositeFix {
    pub fn new(title: impl Into<String>, children: Vec<Fix>) -> Self {
        Self {
            title: title.into(),
            children,
        }
    }

    pub fn describe(&self) -> String {
        let mut out = self.title.clone();
        for (idx, child) in self.children.iter().enumerate() {
            out.push_str(&format!("\n{}. {}", idx + 1, indent_block(&child.describe())));
        }
        out
    }

    /// Children run in order; the first failure stops the rest.
    pub fn run(&self, ctx: &FixContext<'_>) -> Result<()> {
        for child in &self.children {
            tracing::debug!(fix = %child.name, "running step");
            child.run(ctx)?;
        }
        Ok(())
    }

    pub fn files(&self) -> Vec<PathBuf> {
        let mut files: Vec<PathBuf> = Vec::new();
        for file in self.children.iter().flat_map(Fix::files) {
            if !files.contains(&file) {
                files.push(file);
            }
        }
        files
    }
}

/// Indents every non-blank line of a child description.
fn indent_block(text: &str) -> String {
    text.lines()
        .map(|line| {
            if line.trim().is_empty() {
                line.to_string()
            } else {
                format!("    {line}")
            }
        })
        .collect::<Vec<_>>()
        .join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::git::testing::RecordingVcs;
    use crate::fixers::files::{AddFile, DeleteFiles};
    use crate::fixers::fix::{FixKind, Stage};
    use crate::fixers::lines::LineEdit;
    use pretty_assertions::assert_eq;
    use std::fs;
    use tempfile::TempDir;

    fn gha() -> CompositeFix {
        CompositeFix::new(
            "CI: migrate from Travis CI to GitHub Actions",
            vec![
                Fix::new(
                    "delete_travis",
                    Stage::CiMigration,
                    FixKind::DeleteFiles(DeleteFiles::new(vec![PathBuf::from(".travis.yml")])),
                ),
                Fix::new(
                    "add_gha_workflow",
                    Stage::CiMigration,
                    FixKind::AddFile(AddFile::new(
                        ".github/workflows/standard.yml",
                        "name: pkg\non:\n  push:\n",
                    )),
                ),
            ],
        )
    }

    #[test]
    fn test_describe_numbers_children() {
        assert_eq!(
            gha().describe(),
            "CI: migrate from Travis CI to GitHub Actions\n\
             1.     Delete these files: .travis.yml\n\
             2.     Add .github/workflows/standard.yml with contents:\n        name: pkg\n        on:\n          push:"
        );
    }

    #[test]
    fn test_indent_block_skips_blank_lines() {
        assert_eq!(indent_block("a\n\n  b"), "    a\n\n      b");
        assert_eq!(indent_block(""), "");
    }

    #[test]
    fn test_files_are_deduplicated_in_order() {
        let composite = CompositeFix::new(
            "x",
            vec![
                Fix::new(
                    "a",
                    Stage::Versioning,
                    FixKind::PrependLines(LineEdit::new("pkg/__init__.py", &["a"])),
                ),
                Fix::new(
                    "b",
                    Stage::Versioning,
                    FixKind::AppendLines(LineEdit::new("pkg/__init__.py", &["b"])),
                ),
                Fix::new(
                    "c",
                    Stage::Versioning,
                    FixKind::AddFile(AddFile::new("pkg/version.py", "")),
                ),
            ],
        );
        assert_eq!(
            composite.files(),
            vec![PathBuf::from("pkg/__init__.py"), PathBuf::from("pkg/version.py")]
        );
    }

    #[test]
    fn test_run_stops_at_first_failure() {
        let tmp = TempDir::new().unwrap();
        let vcs = RecordingVcs::default();
        let ctx = FixContext { root: tmp.path(), vcs: &vcs };

        // .travis.yml is missing, so the delete fails before the add runs.
        assert!(gha().run(&ctx).is_err());
        assert!(!tmp.path().join(".github/workflows/standard.yml").exists());

        fs::write(tmp.path().join(".travis.yml"), "language: python\n").unwrap();
        gha().run(&ctx).unwrap();
        assert!(!tmp.path().join(".travis.yml").exists());
        assert!(tmp.path().join(".github/workflows/standard.yml").exists());
    }
}
