use anyhow::{Context, Result};
use clap::Args;
use colored::Colorize;
use std::path::{Path, PathBuf};

use crate::core::config::{Profile, CONFIG_FILE};
use crate::utils::fs::top_level_files_with_extension;

#[derive(Args, Debug)]
pub struct InitArgs {
    /// Path to the repository (defaults to current directory)
    #[arg(default_value = ".")]
    pub path: PathBuf,

    /// Profile to configure; detected from the checkout when omitted
    #[arg(long, value_enum)]
    pub profile: Option<Profile>,

    /// Overwrite existing .repomigrate.yml
    #[arg(long)]
    pub force: bool,
}

pub fn execute(args: &InitArgs) -> Result<()> {
    let path = args
        .path
        .canonicalize()
        .with_context(|| format!("cannot open {}", args.path.display()))?;
    let config_path = path.join(CONFIG_FILE);

    if config_path.exists() && !args.force {
        println!(
            "  {} {} already exists. Use {} to overwrite.",
            "SKIP".yellow(),
            CONFIG_FILE,
            "--force".bold()
        );
        return Ok(());
    }

    let profile = args.profile.unwrap_or_else(|| detect_profile(&path));
    std::fs::write(&config_path, generate_config(profile))
        .with_context(|| format!("cannot write {}", config_path.display()))?;
    println!(
        "  {} {} created for the {} profile",
        "DONE".green(),
        CONFIG_FILE,
        profile.to_string().cyan()
    );
    println!(
        "  Edit {} to skip fixes or change template policies.",
        config_path.display()
    );

    Ok(())
}

/// TwinCAT projects keep a Visual Studio solution at the top level.
fn detect_profile(path: &Path) -> Profile {
    if top_level_files_with_extension(path, "sln").is_empty() {
        Profile::Python
    } else {
        Profile::Twincat
    }
}

fn generate_config(profile: Profile) -> String {
    let profile_settings = match profile {
        Profile::Python => {
            "python_version: \"3.9\"\n\n# Files the style pass never rewrites\nstyle_exclude: []\n\n# Replaces the default list of obsolete files\n# obsolete_files:\n#   - run_tests.py\n"
        }
        Profile::Twincat => "",
    };

    format!(
        r#"# repomigrate configuration

profile: {profile}
{profile_settings}
# author_name: SLAC National Accelerator Laboratory
# github_repo_group: pcdshub

# Fixes never run in this repository
skip: []
  # - add_authors_rst

# Per-template policy overrides
templates: {{}}
  # AUTHORS.rst:
  #   update_if_existing: true
"#
    )
}
