use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use crate::core::config::{Config, Profile};
use crate::core::error::{MigrateError, Result};
use crate::utils::fs;

pub type TemplateVars = BTreeMap<String, String>;

const DEFAULT_AUTHOR: &str = "SLAC National Accelerator Laboratory";
const DEFAULT_GROUP: &str = "pcdshub";

/// Target interpreter version, e.g. `3.9`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct PythonVersion {
    pub major: u32,
    pub minor: u32,
}

impl PythonVersion {
    pub const DEFAULT: PythonVersion = PythonVersion { major: 3, minor: 9 };

    /// `39` for 3.9, the form upgrader flags use.
    pub fn compact(&self) -> String {
        format!("{}{}", self.major, self.minor)
    }
}

impl Default for PythonVersion {
    fn default() -> Self {
        Self::DEFAULT
    }
}

impl FromStr for PythonVersion {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        let (major, minor) = s
            .trim()
            .split_once('.')
            .ok_or_else(|| format!("expected MAJOR.MINOR, got {s:?}"))?;
        let major = major
            .parse()
            .map_err(|_| format!("invalid major version in {s:?}"))?;
        let minor = minor
            .parse()
            .map_err(|_| format!("invalid minor version in {s:?}"))?;
        if major < 3 {
            return Err(format!("Python {s} is not supported"));
        }
        Ok(Self { major, minor })
    }
}

impl std::fmt::Display for PythonVersion {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}.{}", self.major, self.minor)
    }
}

/// Names templates may reference, derived once from the checkout's directory name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TemplateContext {
    pub author_name: String,
    pub auto_git_setup: String,
    pub git_remote_name: String,
    pub github_repo_group: String,
    pub python_interpreter: String,
    pub description: String,
    pub email: String,
    pub project_name: String,
    pub repo_name: String,
    pub import_name: String,
    pub folder_name: String,
}

impl TemplateContext {
    pub fn for_root(root: &Path, config: &Config) -> Self {
        let project_name = repo_name(root);
        let repo_name = project_name.replace('-', "_");
        Self {
            author_name: config
                .author_name
                .clone()
                .unwrap_or_else(|| DEFAULT_AUTHOR.to_string()),
            auto_git_setup: "no".to_string(),
            git_remote_name: "origin".to_string(),
            github_repo_group: config
                .github_repo_group
                .clone()
                .unwrap_or_else(|| DEFAULT_GROUP.to_string()),
            python_interpreter: "python3".to_string(),
            description: String::new(),
            email: String::new(),
            import_name: repo_name.clone(),
            folder_name: project_name.clone(),
            repo_name,
            project_name,
        }
    }

    pub fn vars(&self) -> TemplateVars {
        let fields = [
            ("author_name", &self.author_name),
            ("auto_git_setup", &self.auto_git_setup),
            ("git_remote_name", &self.git_remote_name),
            ("github_repo_group", &self.github_repo_group),
            ("python_interpreter", &self.python_interpreter),
            ("description", &self.description),
            ("email", &self.email),
            ("project_name", &self.project_name),
            ("repo_name", &self.repo_name),
            ("import_name", &self.import_name),
            ("folder_name", &self.folder_name),
        ];
        fields
            .into_iter()
            .map(|(key, value)| (format!("cookiecutter.{key}"), value.clone()))
            .collect()
    }
}

/// A checkout being migrated. Lives for one run.
#[derive(Debug, Clone)]
pub struct Repository {
    pub root: PathBuf,
    pub context: TemplateContext,
    pub python_version: PythonVersion,
    pub profile: Profile,
    pub config: Config,
}

impl Repository {
    pub fn open(path: &Path) -> Result<Self> {
        let root = path
            .canonicalize()
            .map_err(|e| MigrateError::io(path, e))?;
        if !fs::has_git_repo(&root) {
            return Err(MigrateError::NotARepository(root));
        }
        let config = Config::load(&root);
        Ok(Self::from_parts(root, config))
    }

    /// Builds a repository without the version-control precondition.
    pub fn from_parts(root: PathBuf, config: Config) -> Self {
        let context = TemplateContext::for_root(&root, &config);
        let python_version = config
            .python_version
            .as_deref()
            .and_then(|v| v.parse().ok())
            .unwrap_or_default();
        let profile = config.profile.unwrap_or_default();
        Self {
            root,
            context,
            python_version,
            profile,
            config,
        }
    }

    pub fn with_profile(mut self, profile: Profile) -> Self {
        self.profile = profile;
        self
    }

    pub fn with_python_version(mut self, version: PythonVersion) -> Self {
        self.python_version = version;
        self
    }

    pub fn import_dir(&self) -> PathBuf {
        PathBuf::from(&self.context.import_name)
    }

    pub fn path(&self, relative: impl AsRef<Path>) -> PathBuf {
        self.root.join(relative)
    }

    pub fn exists(&self, relative: impl AsRef<Path>) -> bool {
        self.root.join(relative).exists()
    }

    pub fn template_vars(&self) -> TemplateVars {
        let mut vars = self.context.vars();
        vars.insert("python_version".to_string(), self.python_version.to_string());
        vars.insert(
            "python_version_compact".to_string(),
            self.python_version.compact(),
        );
        vars
    }
}

fn repo_name(root: &Path) -> String {
    root.file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| "project".to_string())
}
