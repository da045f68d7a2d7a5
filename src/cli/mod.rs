pub mod commands;
pub mod output;
pub mod progress;

use clap::{Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(
    name = "repomigrate",
    version,
    about = "Bring repositories up to the current project standard"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Preview, and with --write apply, the fixes a repository needs
    Update(commands::update::UpdateArgs),
    /// Create a .repomigrate.yml configuration file
    Init(commands::init::InitArgs),
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn test_update_args_parse() {
        let cli = Cli::try_parse_from([
            "repomigrate",
            "update",
            "a",
            "b",
            "--write",
            "--skip",
            "add_license",
            "--skip",
            "gha",
            "--only",
            "normalize_style",
            "--profile",
            "twincat",
            "--python-version",
            "3.10",
        ])
        .unwrap();
        let Commands::Update(args) = cli.command else {
            panic!("expected update");
        };
        assert_eq!(args.roots, vec![PathBuf::from("a"), PathBuf::from("b")]);
        assert!(args.write);
        assert_eq!(args.skip, vec!["add_license", "gha"]);
        assert_eq!(args.only, vec!["normalize_style"]);
        assert_eq!(args.python_version.map(|v| v.to_string()).as_deref(), Some("3.10"));
    }

    #[test]
    fn test_update_defaults_to_dry_run_in_cwd() {
        let cli = Cli::try_parse_from(["repomigrate", "update"]).unwrap();
        let Commands::Update(args) = cli.command else {
            panic!("expected update");
        };
        assert_eq!(args.roots, vec![PathBuf::from(".")]);
        assert!(!args.write);
        assert_eq!(args.format, "text");
    }

    #[test]
    fn test_rejects_bad_python_version() {
        assert!(Cli::try_parse_from(["repomigrate", "update", "--python-version", "2.7"]).is_err());
    }
}
