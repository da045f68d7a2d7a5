//! Version-control seam used by fixes (staging) and the runner (status, commit).

use std::path::{Path, PathBuf};
use std::process::Command;

use tracing::debug;

use crate::core::error::{MigrateError, Result};

pub trait VersionControl {
    /// Porcelain status of tracked files; empty when the tree is clean.
    fn status(&self) -> Result<String>;

    /// Stages the given paths (relative to the checkout root).
    fn stage(&self, paths: &[PathBuf]) -> Result<()>;

    /// Commits all tracked changes with `message`, skipping hooks.
    fn commit(&self, message: &str) -> Result<()>;
}

/// Runs the `git` executable inside the checkout.
pub struct GitCli {
    root: PathBuf,
}

impl GitCli {
    pub fn new(root: &Path) -> Self {
        Self {
            root: root.to_path_buf(),
        }
    }

    fn run(&self, args: &[&str]) -> Result<String> {
        let command = format!("git {}", args.join(" "));
        debug!(%command, root = %self.root.display(), "running");
        let output = Command::new("git")
            .args(args)
            .current_dir(&self.root)
            .output()
            .map_err(|e| MigrateError::io(&self.root, e))?;

        if !output.status.success() {
            return Err(MigrateError::Command {
                command,
                status: output.status.to_string(),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }
        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }
}

impl VersionControl for GitCli {
    fn status(&self) -> Result<String> {
        // Untracked files never end up in `commit -a`, so they do not count.
        self.run(&["status", "--porcelain", "--untracked-files=no"])
    }

    fn stage(&self, paths: &[PathBuf]) -> Result<()> {
        if paths.is_empty() {
            return Ok(());
        }
        let mut args = vec!["add".to_string(), "--".to_string()];
        args.extend(paths.iter().map(|p| p.to_string_lossy().into_owned()));
        let args: Vec<&str> = args.iter().map(String::as_str).collect();
        self.run(&args).map(|_| ())
    }

    fn commit(&self, message: &str) -> Result<()> {
        self.run(&["commit", "-a", "-n", "-m", message]).map(|_| ())
    }
}

#[cfg(test)]
pub mod testing {
    use super::*;
    use std::cell::RefCell;

    /// Records staging and commit calls; status is dirty after any stage call
    /// or when forced.
    #[derive(Default)]
    pub struct RecordingVcs {
        pub staged: RefCell<Vec<PathBuf>>,
        pub commits: RefCell<Vec<String>>,
        pub status_calls: RefCell<usize>,
        pub always_dirty: bool,
        pub fail_commits: bool,
    }

    impl RecordingVcs {
        pub fn dirty() -> Self {
            Self {
                always_dirty: true,
                ..Self::default()
            }
        }

        pub fn commit_messages(&self) -> Vec<String> {
            self.commits.borrow().clone()
        }
    }

    impl VersionControl for RecordingVcs {
        fn status(&self) -> Result<String> {
            *self.status_calls.borrow_mut() += 1;
            if self.always_dirty || !self.staged.borrow().is_empty() {
                Ok(" M file\n".to_string())
            } else {
                Ok(String::new())
            }
        }

        fn stage(&self, paths: &[PathBuf]) -> Result<()> {
            self.staged.borrow_mut().extend(paths.iter().cloned());
            Ok(())
        }

        fn commit(&self, message: &str) -> Result<()> {
            if self.fail_commits {
                return Err(MigrateError::Command {
                    command: "git commit".to_string(),
                    status: "exit status: 1".to_string(),
                    stderr: "nothing to commit".to_string(),
                });
            }
            self.commits.borrow_mut().push(message.to_string());
            self.staged.borrow_mut().clear();
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn run_git(root: &Path, args: &[&str]) -> bool {
        Command::new("git")
            .args(args)
            .current_dir(root)
            .output()
            .map(|o| o.status.success())
            .unwrap_or(false)
    }

    fn make_git_repo() -> Option<TempDir> {
        let dir = TempDir::new().unwrap();
        let ok = run_git(dir.path(), &["init", "-q"])
            && run_git(dir.path(), &["config", "user.name", "test-user"])
            && run_git(dir.path(), &["config", "user.email", "test@example.com"])
            && run_git(dir.path(), &["commit", "-q", "--allow-empty", "-m", "initial"]);
        ok.then_some(dir)
    }

    #[test]
    fn test_status_stage_and_commit() {
        // Skipped where git is not installed.
        let Some(repo) = make_git_repo() else { return };
        let git = GitCli::new(repo.path());
        assert_eq!(git.status().unwrap(), "");

        fs::write(repo.path().join("LICENSE"), "text\n").unwrap();
        // Untracked files are not pending changes.
        assert_eq!(git.status().unwrap(), "");

        git.stage(&[PathBuf::from("LICENSE")]).unwrap();
        assert!(!git.status().unwrap().is_empty());

        git.commit("MNT: add license").unwrap();
        assert_eq!(git.status().unwrap(), "");
    }

    #[test]
    fn test_commit_with_nothing_pending_fails() {
        let Some(repo) = make_git_repo() else { return };
        let git = GitCli::new(repo.path());
        let err = git.commit("nothing").unwrap_err();
        assert!(matches!(err, MigrateError::Command { .. }));
    }
}
