use std::path::{Path, PathBuf};

use crate::core::error::Result;
use crate::core::repository::{Repository, TemplateVars};
use crate::templates::TemplateRenderer;
use crate::utils::diff::{quoted, unified_diff};
use crate::utils::fs::{normalized_text, read_optional, write_text};

use super::fix::{slug, Fix, FixContext, FixKind, Stage};
use super::style::StyleRules;

/// A standard file provided from a template, and when to provide it.
#[derive(Debug, Clone)]
pub struct TemplateFile {
    /// Path of the template below the profile's template root; also the
    /// default destination.
    pub template: PathBuf,
    /// Where the file may already live. The first existing one is the
    /// destination; when none exists, the first candidate is created.
    pub candidates: Vec<PathBuf>,
    pub add_if_missing: bool,
    pub update_if_existing: bool,
    pub args: TemplateVars,
    name: Option<String>,
}

impl TemplateFile {
    pub fn new(template: impl Into<PathBuf>) -> Self {
        let template = template.into();
        Self {
            candidates: vec![template.clone()],
            template,
            add_if_missing: true,
            update_if_existing: true,
            args: TemplateVars::new(),
            name: None,
        }
    }

    pub fn candidates(mut self, candidates: &[&str]) -> Self {
        self.candidates = candidates.iter().map(PathBuf::from).collect();
        self
    }

    pub fn add_if_missing(mut self, add: bool) -> Self {
        self.add_if_missing = add;
        self
    }

    pub fn update_if_existing(mut self, update: bool) -> Self {
        self.update_if_existing = update;
        self
    }

    pub fn arg(mut self, key: &str, value: &str) -> Self {
        self.args.insert(key.to_string(), value.to_string());
        self
    }

    pub fn named(mut self, name: &str) -> Self {
        self.name = Some(name.to_string());
        self
    }

    pub fn fix_name(&self) -> String {
        self.name.clone().unwrap_or_else(|| {
            let file_name = self
                .template
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_default();
            format!("add_{}", slug(&file_name))
        })
    }

    /// Config key used for policy overrides.
    pub fn key(&self) -> String {
        self.template.to_string_lossy().replace('\\', "/")
    }

    /// The destination and whether something already lives there.
    pub fn destination(&self, root: &Path) -> (PathBuf, bool) {
        self.candidates
            .iter()
            .find(|candidate| root.join(candidate).exists())
            .map(|found| (found.clone(), true))
            .unwrap_or_else(|| {
                let default = self.candidates.first().unwrap_or(&self.template);
                (default.clone(), false)
            })
    }

    /// Zero or one fix. Only existence is checked before deciding; templates
    /// are rendered just for files that will be provided.
    pub fn to_fix(
        &self,
        repo: &Repository,
        template_root: &str,
        stage: Stage,
        renderer: &dyn TemplateRenderer,
    ) -> Result<Option<Fix>> {
        let (dest, exists) = self.destination(&repo.root);
        if exists && !self.update_if_existing {
            return Ok(None);
        }
        if !exists && !self.add_if_missing {
            return Ok(None);
        }

        let mut vars = repo.template_vars();
        vars.extend(self.args.clone());
        let name = format!("{}/{}", template_root, self.key());
        let contents = renderer.render(&name, &vars)?;
        let existing = if exists {
            read_optional(&repo.path(&dest))?
        } else {
            None
        };

        let fix = TemplateFix {
            template: self.template.clone(),
            dest,
            contents: normalized_text(&contents),
            existing,
        };
        Ok(Some(Fix::new(self.fix_name(), stage, FixKind::AddFromTemplate(fix))))
    }
}

/// A file rendered from a template, compared against what is on disk.
#[derive(Debug, Clone)]
pub struct TemplateFix {
    pub template: PathBuf,
    pub dest: PathBuf,
    pub contents: String,
    /// `None` when the destination does not exist yet.
    pub existing: Option<String>,
}

impl TemplateFix {
    pub fn changed(&self) -> bool {
        self.existing.as_deref() != Some(self.contents.as_str())
    }

    pub fn restyle(&mut self, rules: &StyleRules) {
        self.contents = rules.apply(&self.contents);
    }

    pub fn describe(&self) -> String {
        let dest = self.dest.display();
        match &self.existing {
            None => format!(
                "Add *new* {} from template {}:\n{}",
                dest,
                self.template.display(),
                self.contents.trim_end()
            ),
            Some(_) if !self.changed() => {
                format!("{dest} from template is unchanged; this fix is a no-op")
            }
            Some(existing) => {
                let diff = unified_diff(
                    existing,
                    &self.contents,
                    &format!("{}", dest),
                    &format!("template/{}", self.template.display()),
                );
                format!(
                    "Modify {} from template {}:\n{}",
                    dest,
                    self.template.display(),
                    quoted(&diff)
                )
            }
        }
    }

    pub fn commit_message(&self) -> String {
        let name = self
            .template
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| self.template.display().to_string());
        format!("MNT: updating {name} from template")
    }

    pub fn run(&self, ctx: &FixContext<'_>) -> Result<()> {
        write_text(&ctx.path(&self.dest), &self.contents)?;
        ctx.vcs.stage(std::slice::from_ref(&self.dest))
    }
}
