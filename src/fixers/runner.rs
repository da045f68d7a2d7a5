//! Previews, filters and applies a list of fixes, committing after each one.

use serde::Serialize;
use std::io::{BufRead, Write};
use std::path::{Path, PathBuf};
use tracing::{debug, error, info, warn};

use crate::core::git::VersionControl;

use super::files::CommitFix;
use super::fix::{Fix, FixContext, FixKind, Stage};

pub const CONTINUE_PROMPT: &str = "Continue? [Y/n]";

/// Asks the operator whether to go on after a failure.
pub trait Confirm {
    fn confirm(&mut self, question: &str) -> bool;
}

impl<F: FnMut(&str) -> bool> Confirm for F {
    fn confirm(&mut self, question: &str) -> bool {
        self(question)
    }
}

/// Reads the answer from stdin. An empty answer, or no terminal at all,
/// means yes.
pub struct StdinConfirm;

impl Confirm for StdinConfirm {
    fn confirm(&mut self, question: &str) -> bool {
        eprint!("{question} ");
        let _ = std::io::stderr().flush();
        let mut answer = String::new();
        match std::io::stdin().lock().read_line(&mut answer) {
            Ok(0) | Err(_) => true,
            Ok(_) => matches!(answer.trim().to_lowercase().as_str(), "" | "y" | "yes"),
        }
    }
}

pub struct AlwaysContinue;

impl Confirm for AlwaysContinue {
    fn confirm(&mut self, _question: &str) -> bool {
        true
    }
}

#[derive(Debug, Clone, Default)]
pub struct RunOptions {
    /// Without it the run stops after the preview.
    pub write: bool,
    pub skip: Vec<String>,
    /// When non-empty, only these fixes run.
    pub only: Vec<String>,
}

impl RunOptions {
    pub fn is_skipped(&self, name: &str) -> bool {
        self.skip.iter().any(|s| s == name)
    }

    pub fn selects(&self, name: &str) -> bool {
        !self.is_skipped(name) && (self.only.is_empty() || self.only.iter().any(|o| o == name))
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct FixPreview {
    pub name: String,
    pub stage: Stage,
    pub skipped: bool,
    /// Not computed for skipped fixes.
    pub description: Option<String>,
    pub files: Vec<PathBuf>,
    pub commit_message: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", content = "error", rename_all = "snake_case")]
pub enum FixOutcome {
    Applied,
    Failed(String),
    CommitFailed(String),
}

#[derive(Debug, Clone, Serialize)]
pub struct FixRecord {
    pub name: String,
    pub outcome: FixOutcome,
    /// The working tree had pending changes after the fix ran.
    pub changed: bool,
    pub committed: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    pub previews: Vec<FixPreview>,
    pub records: Vec<FixRecord>,
    pub dry_run: bool,
    /// The operator declined to continue after a failure.
    pub aborted: bool,
}

impl RunReport {
    pub fn failures(&self) -> usize {
        self.records
            .iter()
            .filter(|r| r.outcome != FixOutcome::Applied)
            .count()
    }

    pub fn commits(&self) -> usize {
        self.records.iter().filter(|r| r.committed).count()
    }
}

pub struct FixRunner<'a> {
    root: &'a Path,
    vcs: &'a dyn VersionControl,
    confirm: &'a mut dyn Confirm,
}

impl<'a> FixRunner<'a> {
    pub fn new(root: &'a Path, vcs: &'a dyn VersionControl, confirm: &'a mut dyn Confirm) -> Self {
        Self { root, vcs, confirm }
    }

    /// Read-only: nothing here runs a fix or touches version control.
    pub fn preview(&self, fixes: &[Fix], opts: &RunOptions) -> Vec<FixPreview> {
        fixes
            .iter()
            .map(|fix| {
                let skipped = opts.is_skipped(&fix.name);
                FixPreview {
                    name: fix.name.clone(),
                    stage: fix.stage,
                    skipped,
                    description: (!skipped).then(|| fix.describe()),
                    files: fix.files(),
                    commit_message: fix.commit_message(),
                }
            })
            .collect()
    }

    /// Previews every fix, then, in write mode, runs the selected ones in
    /// order. There is no rollback: a failed fix leaves whatever it wrote.
    pub fn run(
        &mut self,
        fixes: &[Fix],
        opts: &RunOptions,
        on_preview: impl FnOnce(&[FixPreview]),
    ) -> RunReport {
        let previews = self.preview(fixes, opts);
        on_preview(&previews);
        let mut report = RunReport {
            previews,
            records: Vec::new(),
            dry_run: !opts.write,
            aborted: false,
        };
        if !opts.write {
            debug!("dry run; nothing applied");
            return report;
        }

        let ctx = FixContext {
            root: self.root,
            vcs: self.vcs,
        };
        for fix in fixes.iter().filter(|fix| opts.selects(&fix.name)) {
            info!(fix = %fix.name, stage = %fix.stage, "running fix");
            let mut record = FixRecord {
                name: fix.name.clone(),
                outcome: FixOutcome::Applied,
                changed: false,
                committed: false,
            };

            if let Err(err) = fix.run(&ctx) {
                error!(fix = %fix.name, error = %err, "failed to run fix\n{fix}");
                record.outcome = FixOutcome::Failed(err.to_string());
                if !self.confirm.confirm(CONTINUE_PROMPT) {
                    report.records.push(record);
                    report.aborted = true;
                    break;
                }
            }

            let go_on = self.commit_after(fix, &ctx, &mut record);
            report.records.push(record);
            if !go_on {
                report.aborted = true;
                break;
            }
        }
        report
    }

    /// Commits what `fix` left in the working tree. Returns false when the
    /// operator asked to stop.
    fn commit_after(&mut self, fix: &Fix, ctx: &FixContext<'_>, record: &mut FixRecord) -> bool {
        let message = fix.commit_message();
        match self.vcs.status() {
            Ok(status) => record.changed = !status.trim().is_empty(),
            Err(err) if message.is_empty() => {
                warn!(fix = %fix.name, error = %err, "could not read working tree status");
                return true;
            }
            Err(err) => return self.commit_failed(fix, err.to_string(), record),
        }

        if message.is_empty() {
            return true;
        }
        if !record.changed {
            warn!(fix = %fix.name, "no changes in working tree; skipping commit");
            return true;
        }

        let commit = Fix::new(
            "git_commit",
            fix.stage,
            FixKind::Commit(CommitFix {
                message: format!("{message}\n\nPerformed by repomigrate ({})", fix.name),
            }),
        );
        match commit.run(ctx) {
            Ok(()) => {
                info!(fix = %fix.name, %message, "committed");
                record.committed = true;
                true
            }
            Err(err) => self.commit_failed(fix, err.to_string(), record),
        }
    }

    fn commit_failed(&mut self, fix: &Fix, err: String, record: &mut FixRecord) -> bool {
        error!(fix = %fix.name, error = %err, "failed to commit fix\n{fix}");
        if record.outcome == FixOutcome::Applied {
            record.outcome = FixOutcome::CommitFailed(err);
        }
        self.confirm.confirm(CONTINUE_PROMPT)
    }
}
