use anyhow::{bail, Context, Result};
use clap::Args;
use colored::Colorize;
use std::path::{Path, PathBuf};
use tracing::{debug, error, info};

use crate::cli::output::OutputFormatter;
use crate::cli::progress::CatalogProgress;
use crate::core::config::Profile;
use crate::core::git::GitCli;
use crate::core::repository::{PythonVersion, Repository};
use crate::fixers::runner::{AlwaysContinue, Confirm, StdinConfirm};
use crate::fixers::{FixCatalog, FixRunner, RunOptions};
use crate::migrations::travis::TravisTranslator;
use crate::templates::TemplateSet;

#[derive(Args, Debug)]
pub struct UpdateArgs {
    /// Repository checkouts to update, one after another (defaults to current directory)
    #[arg(default_value = ".")]
    pub roots: Vec<PathBuf>,

    /// Apply the fixes and commit them; without this only a preview is printed
    #[arg(long)]
    pub write: bool,

    /// Never run this fix (repeatable; merged with `skip` from .repomigrate.yml)
    #[arg(long, value_name = "NAME")]
    pub skip: Vec<String>,

    /// Only run these fixes (repeatable)
    #[arg(long, value_name = "NAME")]
    pub only: Vec<String>,

    /// Project standard to migrate to (overrides .repomigrate.yml)
    #[arg(long, value_enum)]
    pub profile: Option<Profile>,

    /// Target Python version, e.g. 3.9 (overrides .repomigrate.yml)
    #[arg(long, value_name = "X.Y")]
    pub python_version: Option<PythonVersion>,

    /// Directory whose files shadow the bundled templates
    #[arg(long, value_name = "DIR")]
    pub templates: Option<PathBuf>,

    /// Output format (text, json)
    #[arg(long, default_value = "text")]
    pub format: String,

    /// Continue after failures without asking
    #[arg(long)]
    pub yes: bool,
}

pub fn execute(args: &UpdateArgs) -> Result<()> {
    let formatter = OutputFormatter::new(&args.format);
    let templates = match &args.templates {
        Some(dir) => TemplateSet::with_override_dir(dir),
        None => TemplateSet::builtin(),
    };

    let mut failed = Vec::new();
    for root in &args.roots {
        if let Err(err) = update_root(root, args, &templates, &formatter) {
            error!(root = %root.display(), "{err:#}");
            failed.push(root.display().to_string());
        }
    }
    if !failed.is_empty() {
        bail!("could not update: {}", failed.join(", "));
    }
    Ok(())
}

/// The repository with command-line overrides applied on top of its config file.
fn open_repository(root: &Path, args: &UpdateArgs) -> Result<Repository> {
    let mut repo =
        Repository::open(root).with_context(|| format!("cannot update {}", root.display()))?;
    if let Some(profile) = args.profile {
        repo = repo.with_profile(profile);
    }
    if let Some(version) = args.python_version {
        repo = repo.with_python_version(version);
    }
    Ok(repo)
}

fn run_options(repo: &Repository, args: &UpdateArgs) -> RunOptions {
    let mut skip = repo.config.skip.clone();
    for name in &args.skip {
        if !skip.contains(name) {
            skip.push(name.clone());
        }
    }
    RunOptions {
        write: args.write,
        skip,
        only: args.only.clone(),
    }
}

fn update_root(
    root: &Path,
    args: &UpdateArgs,
    templates: &TemplateSet,
    formatter: &OutputFormatter,
) -> Result<()> {
    let repo = open_repository(root, args)?;
    info!(root = %repo.root.display(), profile = %repo.profile, "updating repository");

    let ci = TravisTranslator::new(templates);
    let progress = CatalogProgress::new(!formatter.is_json());
    let catalog = FixCatalog::new(&repo, templates, &ci)
        .build_with_progress(|stage| progress.set_stage(stage))
        .with_context(|| format!("cannot inspect {}", repo.root.display()))?;
    progress.finish();
    debug!(fixes = ?catalog.names(), "catalog built");
    formatter.display_failures(&catalog.failures);

    let opts = run_options(&repo, args);
    for name in opts.only.iter().chain(&opts.skip) {
        if !formatter.is_json() && !catalog.fixes.iter().any(|fix| &fix.name == name) {
            println!("  {} no fix named {} is needed here", "NOTE".cyan(), name.bold());
        }
    }

    let vcs = GitCli::new(&repo.root);
    let mut stdin = StdinConfirm;
    let mut always = AlwaysContinue;
    let confirm: &mut dyn Confirm = if args.yes { &mut always } else { &mut stdin };
    let report = FixRunner::new(&repo.root, &vcs, confirm).run(&catalog.fixes, &opts, |previews| {
        formatter.display_preview(&repo, previews)
    });
    formatter.display_report(&repo, &catalog.failures, &report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::config::CONFIG_FILE;
    use std::fs;
    use tempfile::TempDir;

    fn args(root: &Path) -> UpdateArgs {
        UpdateArgs {
            roots: vec![root.to_path_buf()],
            write: false,
            skip: vec![],
            only: vec![],
            profile: None,
            python_version: None,
            templates: None,
            format: "json".to_string(),
            yes: true,
        }
    }

    #[test]
    fn test_missing_git_metadata_fails() {
        let tmp = TempDir::new().unwrap();
        assert!(execute(&args(tmp.path())).is_err());
    }

    #[test]
    fn test_dry_run_leaves_checkout_alone() {
        let tmp = TempDir::new().unwrap();
        fs::create_dir_all(tmp.path().join(".git")).unwrap();
        fs::write(tmp.path().join("run_tests.py"), "import pytest\n").unwrap();

        execute(&args(tmp.path())).unwrap();

        assert!(tmp.path().join("run_tests.py").exists());
        assert!(!tmp.path().join("LICENSE").exists());
    }

    #[test]
    fn test_cli_overrides_config() {
        let tmp = TempDir::new().unwrap();
        fs::create_dir_all(tmp.path().join(".git")).unwrap();
        fs::write(
            tmp.path().join(CONFIG_FILE),
            "profile: python\npython_version: \"3.8\"\nskip:\n  - add_license\n",
        )
        .unwrap();
        let mut args = args(tmp.path());
        args.profile = Some(Profile::Twincat);
        args.skip = vec!["add_license".to_string(), "add_gitignore".to_string()];

        let repo = open_repository(tmp.path(), &args).unwrap();
        assert_eq!(repo.profile, Profile::Twincat);
        assert_eq!(repo.python_version.to_string(), "3.8");
        assert_eq!(
            run_options(&repo, &args).skip,
            vec!["add_license".to_string(), "add_gitignore".to_string()]
        );
    }
}
