use std::io;
use std::path::PathBuf;

use crate::core::error::{MigrateError, Result};
use crate::utils::diff::{quoted, unified_diff};
use crate::utils::fs::{normalized_text, write_text};

use super::fix::FixContext;

/// Writes a file with fixed contents and stages it.
#[derive(Debug, Clone)]
pub struct AddFile {
    pub path: PathBuf,
    pub contents: String,
}

impl AddFile {
    pub fn new(path: impl Into<PathBuf>, contents: &str) -> Self {
        Self {
            path: path.into(),
            contents: normalized_text(contents),
        }
    }

    pub fn describe(&self) -> String {
        format!(
            "Add {} with contents:\n{}",
            self.path.display(),
            self.contents.trim_end()
        )
    }

    pub fn run(&self, ctx: &FixContext<'_>) -> Result<()> {
        write_text(&ctx.path(&self.path), &self.contents)?;
        ctx.vcs.stage(std::slice::from_ref(&self.path))
    }
}

#[derive(Debug, Clone)]
pub struct DeleteFiles {
    pub paths: Vec<PathBuf>,
    /// Treat an already-absent file as done instead of failing.
    pub missing_ok: bool,
}

impl DeleteFiles {
    pub fn new(paths: Vec<PathBuf>) -> Self {
        Self {
            paths,
            missing_ok: false,
        }
    }

    pub fn missing_ok(mut self, missing_ok: bool) -> Self {
        self.missing_ok = missing_ok;
        self
    }

    fn joined(&self, f: impl Fn(&PathBuf) -> String) -> String {
        self.paths.iter().map(f).collect::<Vec<_>>().join(", ")
    }

    pub fn describe(&self) -> String {
        format!(
            "Delete these files: {}",
            self.joined(|p| p.display().to_string())
        )
    }

    pub fn commit_message(&self) -> String {
        let names = self.joined(|p| {
            p.file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_else(|| p.display().to_string())
        });
        format!("CLN: removing {names}")
    }

    pub fn run(&self, ctx: &FixContext<'_>) -> Result<()> {
        for relative in &self.paths {
            let path = ctx.path(relative);
            match std::fs::remove_file(&path) {
                Ok(()) => {}
                Err(e) if e.kind() == io::ErrorKind::NotFound && self.missing_ok => continue,
                Err(e) => return Err(MigrateError::io(path, e)),
            }
        }
        Ok(())
    }
}

/// Rewrites an existing file whose new contents were computed up front.
#[derive(Debug, Clone)]
pub struct UpdateFile {
    pub path: PathBuf,
    pub original: String,
    pub updated: String,
    pub commit_message: String,
}

impl UpdateFile {
    pub fn new(path: impl Into<PathBuf>, original: String, updated: &str, commit_message: &str) -> Self {
        Self {
            path: path.into(),
            original,
            updated: normalized_text(updated),
            commit_message: commit_message.to_string(),
        }
    }

    pub fn changed(&self) -> bool {
        self.original != self.updated
    }

    pub fn describe(&self) -> String {
        if !self.changed() {
            return format!("No change to {}", self.path.display());
        }
        let name = self.path.display().to_string();
        let diff = unified_diff(&self.original, &self.updated, &name, &name);
        format!("Update {}:\n{}", name, quoted(&diff))
    }

    pub fn run(&self, ctx: &FixContext<'_>) -> Result<()> {
        write_text(&ctx.path(&self.path), &self.updated)
    }
}

#[derive(Debug, Clone)]
pub struct CommitFix {
    pub message: String,
}

impl CommitFix {
    pub fn describe(&self) -> String {
        format!("Create git commit with message: {}", self.message)
    }

    pub fn run(&self, ctx: &FixContext<'_>) -> Result<()> {
        ctx.vcs.commit(&self.message)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::git::testing::RecordingVcs;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_add_file_writes_and_stages() {
        let tmp = TempDir::new().unwrap();
        let vcs = RecordingVcs::default();
        let ctx = FixContext { root: tmp.path(), vcs: &vcs };
        let fix = AddFile::new(".github/workflows/standard.yml", "name: ci\n\n");

        fix.run(&ctx).unwrap();

        let content = fs::read_to_string(tmp.path().join(".github/workflows/standard.yml")).unwrap();
        assert_eq!(content, "name: ci\n");
        assert_eq!(
            *vcs.staged.borrow(),
            vec![PathBuf::from(".github/workflows/standard.yml")]
        );
        assert!(fix.describe().starts_with("Add .github/workflows/standard.yml with contents:"));
    }

    #[test]
    fn test_delete_files_missing_is_an_error_by_default() {
        let tmp = TempDir::new().unwrap();
        let vcs = RecordingVcs::default();
        let ctx = FixContext { root: tmp.path(), vcs: &vcs };
        let fix = DeleteFiles::new(vec![PathBuf::from("versioneer.py")]);
        assert!(matches!(fix.run(&ctx), Err(MigrateError::Io { .. })));
    }

    #[test]
    fn test_delete_files_missing_ok() {
        let tmp = TempDir::new().unwrap();
        fs::write(tmp.path().join("setup.py"), "").unwrap();
        let vcs = RecordingVcs::default();
        let ctx = FixContext { root: tmp.path(), vcs: &vcs };
        let fix = DeleteFiles::new(vec![PathBuf::from("setup.py"), PathBuf::from("setup.cfg")])
            .missing_ok(true);

        fix.run(&ctx).unwrap();

        assert!(!tmp.path().join("setup.py").exists());
        assert_eq!(fix.commit_message(), "CLN: removing setup.py, setup.cfg");
    }

    #[test]
    fn test_update_file_describes_diff() {
        let fix = UpdateFile::new(
            "docs/source/conf.py",
            "language = None\n".to_string(),
            "language = \"en\"\n",
            "DOC: update Sphinx configuration",
        );
        assert!(fix.changed());
        let desc = fix.describe();
        assert!(desc.starts_with("Update docs/source/conf.py:\n> --- docs/source/conf.py"));
        assert!(desc.contains("> -language = None"));
        assert!(desc.contains("> +language = \"en\""));
    }

    #[test]
    fn test_update_file_unchanged() {
        let fix = UpdateFile::new("conf.py", "x = 1\n".to_string(), "x = 1", "msg");
        assert!(!fix.changed());
        assert_eq!(fix.describe(), "No change to conf.py");
    }

    #[test]
    fn test_commit_fix_calls_vcs() {
        let tmp = TempDir::new().unwrap();
        let vcs = RecordingVcs::default();
        let ctx = FixContext { root: tmp.path(), vcs: &vcs };
        let fix = CommitFix { message: "MNT: x".to_string() };
        fix.run(&ctx).unwrap();
        assert_eq!(vcs.commit_messages(), vec!["MNT: x".to_string()]);
    }
}
