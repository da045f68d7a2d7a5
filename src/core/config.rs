use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;
use tracing::warn;

pub const CONFIG_FILE: &str = ".repomigrate.yml";

/// Which project standard a checkout is migrated to.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum Profile {
    #[default]
    Python,
    Twincat,
}

impl std::fmt::Display for Profile {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Profile::Python => write!(f, "python"),
            Profile::Twincat => write!(f, "twincat"),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub profile: Option<Profile>,
    pub python_version: Option<String>,
    pub author_name: Option<String>,
    pub github_repo_group: Option<String>,
    /// Replaces the profile's list of obsolete files when set.
    pub obsolete_files: Option<Vec<String>>,
    /// File names the style pass never touches, in addition to the built-in ones.
    pub style_exclude: Vec<String>,
    pub skip: Vec<String>,
    /// Per-template policy overrides keyed by template name (e.g. `AUTHORS.rst`).
    pub templates: BTreeMap<String, TemplatePolicy>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TemplatePolicy {
    pub add_if_missing: Option<bool>,
    pub update_if_existing: Option<bool>,
}

impl Config {
    pub fn load(repo_root: &Path) -> Self {
        let config_path = repo_root.join(CONFIG_FILE);
        if !config_path.exists() {
            return Config::default();
        }
        match std::fs::read_to_string(&config_path) {
            Ok(content) => match serde_yaml::from_str::<Config>(&content) {
                Ok(config) => config,
                Err(err) => {
                    warn!(path = %config_path.display(), error = %err, "ignoring unparsable config");
                    Config::default()
                }
            },
            Err(err) => {
                warn!(path = %config_path.display(), error = %err, "ignoring unreadable config");
                Config::default()
            }
        }
    }

    pub fn template_policy(&self, template: &str) -> TemplatePolicy {
        self.templates.get(template).copied().unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_default_config_when_no_file() {
        let tmp = TempDir::new().unwrap();
        let config = Config::load(tmp.path());
        assert!(config.profile.is_none());
        assert!(config.python_version.is_none());
        assert!(config.skip.is_empty());
    }

    #[test]
    fn test_load_config_from_file() {
        let tmp = TempDir::new().unwrap();
        let yaml = "profile: twincat\npython_version: \"3.10\"\nskip:\n  - add_license\ntemplates:\n  AUTHORS.rst:\n    update_if_existing: true\n";
        fs::write(tmp.path().join(CONFIG_FILE), yaml).unwrap();
        let config = Config::load(tmp.path());
        assert_eq!(config.profile, Some(Profile::Twincat));
        assert_eq!(config.python_version.as_deref(), Some("3.10"));
        assert_eq!(config.skip, vec!["add_license".to_string()]);
        let policy = config.template_policy("AUTHORS.rst");
        assert_eq!(policy.update_if_existing, Some(true));
        assert_eq!(policy.add_if_missing, None);
    }

    #[test]
    fn test_unparsable_config_falls_back_to_default() {
        let tmp = TempDir::new().unwrap();
        fs::write(tmp.path().join(CONFIG_FILE), "profile: [not, a, profile").unwrap();
        let config = Config::load(tmp.path());
        assert!(config.profile.is_none());
    }
}
