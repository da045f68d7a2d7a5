use serde::Serialize;
use std::path::{Path, PathBuf};

use crate::core::error::Result;
use crate::core::git::VersionControl;

use super::composite::CompositeFix;
use super::files::{AddFile, CommitFix, DeleteFiles, UpdateFile};
use super::lines::{LineEdit, RemoveLines, Side};
use super::style::{NormalizeStyle, StyleRules};
use super::template::TemplateFix;

/// Priority bands of the catalog. Fixes are always emitted in this order
/// because later bands read what earlier ones leave on disk.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    ObsoleteFiles = 1,
    StandardFiles = 2,
    CiMigration = 3,
    ConfigTouchUps = 4,
    StyleNormalization = 5,
    BuildMetadata = 6,
    Versioning = 7,
}

impl Stage {
    pub const ALL: [Stage; 7] = [
        Stage::ObsoleteFiles,
        Stage::StandardFiles,
        Stage::CiMigration,
        Stage::ConfigTouchUps,
        Stage::StyleNormalization,
        Stage::BuildMetadata,
        Stage::Versioning,
    ];
}

impl std::fmt::Display for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Stage::ObsoleteFiles => write!(f, "obsolete files"),
            Stage::StandardFiles => write!(f, "standard files"),
            Stage::CiMigration => write!(f, "CI migration"),
            Stage::ConfigTouchUps => write!(f, "config touch-ups"),
            Stage::StyleNormalization => write!(f, "style normalization"),
            Stage::BuildMetadata => write!(f, "build metadata"),
            Stage::Versioning => write!(f, "versioning"),
        }
    }
}

/// What a fix needs while running: the checkout and its version control.
pub struct FixContext<'a> {
    pub root: &'a Path,
    pub vcs: &'a dyn VersionControl,
}

impl FixContext<'_> {
    pub fn path(&self, relative: &Path) -> PathBuf {
        self.root.join(relative)
    }
}

#[derive(Debug, Clone)]
pub enum FixKind {
    AddFile(AddFile),
    AddFromTemplate(TemplateFix),
    UpdateFile(UpdateFile),
    DeleteFiles(DeleteFiles),
    PrependLines(LineEdit),
    AppendLines(LineEdit),
    RemoveLines(RemoveLines),
    NormalizeStyle(NormalizeStyle),
    Composite(CompositeFix),
    Commit(CommitFix),
}

/// One idempotent, describable, runnable change to a checkout.
#[derive(Debug, Clone)]
pub struct Fix {
    pub name: String,
    pub stage: Stage,
    pub kind: FixKind,
}

impl Fix {
    pub fn new(name: impl Into<String>, stage: Stage, kind: FixKind) -> Self {
        Self {
            name: name.into(),
            stage,
            kind,
        }
    }

    /// Human-readable preview. Never touches the filesystem.
    pub fn describe(&self) -> String {
        match &self.kind {
            FixKind::AddFile(fix) => fix.describe(),
            FixKind::AddFromTemplate(fix) => fix.describe(),
            FixKind::UpdateFile(fix) => fix.describe(),
            FixKind::DeleteFiles(fix) => fix.describe(),
            FixKind::PrependLines(fix) => fix.describe(Side::Start),
            FixKind::AppendLines(fix) => fix.describe(Side::End),
            FixKind::RemoveLines(fix) => fix.describe(),
            FixKind::NormalizeStyle(fix) => fix.describe(),
            FixKind::Composite(fix) => fix.describe(),
            FixKind::Commit(fix) => fix.describe(),
        }
    }

    pub fn run(&self, ctx: &FixContext<'_>) -> Result<()> {
        match &self.kind {
            FixKind::AddFile(fix) => fix.run(ctx),
            FixKind::AddFromTemplate(fix) => fix.run(ctx),
            FixKind::UpdateFile(fix) => fix.run(ctx),
            FixKind::DeleteFiles(fix) => fix.run(ctx),
            FixKind::PrependLines(fix) => fix.run(ctx, Side::Start),
            FixKind::AppendLines(fix) => fix.run(ctx, Side::End),
            FixKind::RemoveLines(fix) => fix.run(ctx),
            FixKind::NormalizeStyle(fix) => fix.run(ctx),
            FixKind::Composite(fix) => fix.run(ctx),
            FixKind::Commit(fix) => fix.run(ctx),
        }
    }

    /// Empty means "do not commit after this fix".
    pub fn commit_message(&self) -> String {
        match &self.kind {
            FixKind::AddFromTemplate(fix) => fix.commit_message(),
            FixKind::UpdateFile(fix) => fix.commit_message.clone(),
            FixKind::DeleteFiles(fix) => fix.commit_message(),
            FixKind::NormalizeStyle(fix) => fix.commit_message(),
            FixKind::Composite(fix) => fix.title.clone(),
            FixKind::AddFile(_)
            | FixKind::PrependLines(_)
            | FixKind::AppendLines(_)
            | FixKind::RemoveLines(_)
            | FixKind::Commit(_) => String::new(),
        }
    }

    /// Paths this fix may write or delete, relative to the checkout root.
    pub fn files(&self) -> Vec<PathBuf> {
        match &self.kind {
            FixKind::AddFile(fix) => vec![fix.path.clone()],
            FixKind::AddFromTemplate(fix) => vec![fix.dest.clone()],
            FixKind::UpdateFile(fix) => vec![fix.path.clone()],
            FixKind::DeleteFiles(fix) => fix.paths.clone(),
            FixKind::PrependLines(fix) | FixKind::AppendLines(fix) => vec![fix.path.clone()],
            FixKind::RemoveLines(fix) => vec![fix.path.clone()],
            FixKind::NormalizeStyle(fix) => fix.files.clone(),
            FixKind::Composite(fix) => fix.files(),
            FixKind::Commit(_) => Vec::new(),
        }
    }

    /// Has this fix apply `rules` to any in-scope source it writes, so the
    /// style pass can leave those files to it.
    pub fn adopt_style(&mut self, rules: &StyleRules, in_scope: &dyn Fn(&Path) -> bool) {
        match &mut self.kind {
            FixKind::AddFile(fix) if in_scope(&fix.path) => {
                fix.contents = rules.apply(&fix.contents);
            }
            FixKind::AddFromTemplate(fix) if in_scope(&fix.dest) => fix.restyle(rules),
            FixKind::UpdateFile(fix) if in_scope(&fix.path) => {
                fix.updated = rules.apply(&fix.updated);
            }
            FixKind::PrependLines(fix) | FixKind::AppendLines(fix) if in_scope(&fix.path) => {
                fix.style = Some(*rules);
            }
            FixKind::RemoveLines(fix) if in_scope(&fix.path) => {
                fix.style = Some(*rules);
            }
            FixKind::Composite(fix) => {
                for child in &mut fix.children {
                    child.adopt_style(rules, in_scope);
                }
            }
            _ => {}
        }
    }
}

impl std::fmt::Display for Fix {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "## {}: {}", self.name, self.describe())
    }
}

/// `setup.cfg` → `setup_cfg`, `.pre-commit-config.yaml` → `pre_commit_config_yaml`.
pub fn slug(name: &str) -> String {
    name.trim_start_matches('.')
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() {
                c.to_ascii_lowercase()
            } else {
                '_'
            }
        })
        .collect()
}
