//! Travis CI configuration to GitHub Actions workflow.

use serde_yaml::Value;
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::core::repository::TemplateVars;
use crate::templates::{TemplateError, TemplateRenderer};

pub const TRAVIS_YML: &str = ".travis.yml";
pub const WORKFLOW: &str = ".github/workflows/standard.yml";

const TWINCAT_MARKER: &str = "travis/shared_configs/twincat";

#[derive(Debug, Error)]
pub enum TranslateError {
    #[error("{path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid Travis configuration: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error(transparent)]
    Template(#[from] TemplateError),
}

/// Turns a legacy CI configuration into the text of a workflow file.
pub trait CiTranslator {
    fn translate(&self, travis_yml: &Path, vars: &TemplateVars) -> Result<String, TranslateError>;
}

/// Renders the standard workflow templates from the variables a Travis
/// configuration sets in `env.global`.
pub struct TravisTranslator<'a> {
    templates: &'a dyn TemplateRenderer,
}

impl<'a> TravisTranslator<'a> {
    pub fn new(templates: &'a dyn TemplateRenderer) -> Self {
        Self { templates }
    }

    fn python_vars(&self, env: TemplateVars, vars: &TemplateVars) -> TemplateVars {
        let mut out = vars.clone();
        let default_package = vars
            .get("cookiecutter.import_name")
            .cloned()
            .unwrap_or_default();
        let package_name = env
            .get("CONDA_PACKAGE")
            .or_else(|| env.get("package_name"))
            .cloned()
            .unwrap_or(default_package);
        let conda = env.get("CONDA_EXTRAS").cloned().unwrap_or_default();
        let pip = env.get("PIP_EXTRAS").cloned().unwrap_or_default();
        let (testing, conda, pip) = simplify_extras(&conda, &pip);

        out.extend(env);
        out.insert("package_name".to_string(), package_name);
        out.insert("testing_extras".to_string(), testing);
        out.insert("conda_extras".to_string(), conda);
        out.insert("pip_extras".to_string(), pip);
        out
    }

    fn twincat_vars(&self, env: TemplateVars, vars: &TemplateVars) -> TemplateVars {
        let mut out = vars.clone();
        let package_name = env
            .get("package_name")
            .or_else(|| vars.get("cookiecutter.project_name"))
            .cloned()
            .unwrap_or_default();
        let style_exclude = env
            .get("TWINCAT_STYLE_EXCLUDE")
            .cloned()
            .unwrap_or_default();
        out.extend(env);
        out.insert("package_name".to_string(), package_name);
        out.insert("style_exclude".to_string(), style_exclude);
        out
    }
}

impl CiTranslator for TravisTranslator<'_> {
    fn translate(&self, travis_yml: &Path, vars: &TemplateVars) -> Result<String, TranslateError> {
        let contents = std::fs::read_to_string(travis_yml).map_err(|source| TranslateError::Io {
            path: travis_yml.to_path_buf(),
            source,
        })?;
        let config: Value = serde_yaml::from_str(&contents)?;
        let env = global_env(&config);

        let (template, vars) = if contents.contains(TWINCAT_MARKER) {
            ("twincat/ci/standard.yml", self.twincat_vars(env, vars))
        } else {
            ("python/ci/standard.yml", self.python_vars(env, vars))
        };
        let rendered = self.templates.render(template, &vars)?;
        Ok(rendered.trim_end().to_string())
    }
}

/// `env.global` as a flat mapping. Entries are either `VAR=VALUE` strings or
/// mappings; surrounding double quotes are dropped from values.
fn global_env(config: &Value) -> TemplateVars {
    let mut env = TemplateVars::new();
    let Some(global) = config.get("env").and_then(|e| e.get("global")) else {
        return env;
    };
    let entries = match global {
        Value::Sequence(entries) => entries.clone(),
        other => vec![other.clone()],
    };
    for entry in entries {
        match entry {
            Value::String(assignment) => {
                if let Some((var, value)) = assignment.split_once('=') {
                    env.insert(var.trim().to_string(), unquote(value));
                }
            }
            Value::Mapping(map) => {
                for (var, value) in map {
                    if let (Some(var), Some(value)) = (var.as_str(), scalar(&value)) {
                        env.insert(var.to_string(), unquote(&value));
                    }
                }
            }
            _ => {}
        }
    }
    env
}

fn scalar(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

fn unquote(value: &str) -> String {
    let value = value.strip_prefix('"').unwrap_or(value);
    value.strip_suffix('"').unwrap_or(value).to_string()
}

fn split_extras(extras: &str, remove: &[&str]) -> BTreeSet<String> {
    extras
        .split_whitespace()
        .filter(|extra| !remove.contains(extra))
        .map(str::to_string)
        .collect()
}

/// Moves requirements listed for both conda and pip into a shared list.
/// Returns `(shared, conda only, pip only)`, each space separated and sorted.
pub fn simplify_extras(conda_extras: &str, pip_extras: &str) -> (String, String, String) {
    if conda_extras.is_empty() || pip_extras.is_empty() {
        return (String::new(), conda_extras.to_string(), pip_extras.to_string());
    }
    let pip_extras = pip_extras.replace("-e ./", "");
    let conda = split_extras(conda_extras, &["pip"]);
    let pip = split_extras(&pip_extras, &["-e", ".", "./"]);
    let join = |set: BTreeSet<&String>| {
        set.into_iter().cloned().collect::<Vec<_>>().join(" ")
    };
    (
        join(conda.intersection(&pip).collect()),
        join(conda.difference(&pip).collect()),
        join(pip.difference(&conda).collect()),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::config::Config;
    use crate::core::repository::Repository;
    use crate::templates::TemplateSet;
    use std::fs;
    use tempfile::TempDir;

    fn translate(dir_name: &str, travis: &str) -> String {
        let tmp = TempDir::new().unwrap();
        let root = tmp.path().join(dir_name);
        fs::create_dir_all(&root).unwrap();
        fs::write(root.join(TRAVIS_YML), travis).unwrap();
        let repo = Repository::from_parts(root.clone(), Config::default());
        let templates = TemplateSet::builtin();
        TravisTranslator::new(&templates)
            .translate(&root.join(TRAVIS_YML), &repo.template_vars())
            .unwrap()
    }

    #[test]
    fn test_simplify_extras() {
        let (shared, conda, pip) = simplify_extras("pip ophyd pytest happi", "-e ./ pytest ophyd sphinx");
        assert_eq!(shared, "ophyd pytest");
        assert_eq!(conda, "happi");
        assert_eq!(pip, "sphinx");
    }

    #[test]
    fn test_simplify_extras_with_one_side_empty() {
        assert_eq!(
            simplify_extras("", "pytest"),
            (String::new(), String::new(), "pytest".to_string())
        );
    }

    #[test]
    fn test_python_workflow_from_env_global() {
        let travis = r#"
env:
  global:
    - CONDA_PACKAGE="pcdsdevices"
    - CONDA_EXTRAS="pip happi pytest"
    - PIP_EXTRAS="pytest sphinx"
    - DOCTR_VERSIONS_MENU=1
import:
  - pcdshub/pcds-ci-helpers:travis/shared_configs/standard-python-conda.yml
"#;
        let workflow = translate("pcdsdevices-repo", travis);
        assert!(workflow.starts_with("name: pcdsdevices\n"));
        assert!(workflow.contains("package-name: \"pcdsdevices\""));
        assert!(workflow.contains("testing-extras: \"pytest\""));
        assert!(workflow.contains("conda-testing-extras: \"happi\""));
        assert!(workflow.contains("pip-testing-extras: \"sphinx\""));
        assert!(workflow.contains("python-version: \"3.9\""));
        assert!(workflow.contains("ref: ${{ github.ref }}"));
        assert!(!workflow.ends_with('\n'));
    }

    #[test]
    fn test_python_workflow_defaults_to_import_name() {
        let workflow = translate("my-package", "language: python\n");
        assert!(workflow.contains("package-name: \"my_package\""));
        assert!(workflow.contains("testing-extras: \"\""));
    }

    #[test]
    fn test_twincat_marker_selects_twincat_workflow() {
        let travis = r#"
env:
  global:
    - TWINCAT_STYLE_EXCLUDE: "Library/*"
import:
  - pcdshub/pcds-ci-helpers:travis/shared_configs/twincat.yml
"#;
        let workflow = translate("lcls-plc-kfe", travis);
        assert!(workflow.contains("project-name: \"lcls-plc-kfe\""));
        assert!(workflow.contains("style-exclude: \"Library/*\""));
    }

    #[test]
    fn test_invalid_yaml_is_an_error() {
        let tmp = TempDir::new().unwrap();
        fs::write(tmp.path().join(TRAVIS_YML), "env: [unclosed").unwrap();
        let templates = TemplateSet::builtin();
        let result = TravisTranslator::new(&templates)
            .translate(&tmp.path().join(TRAVIS_YML), &TemplateVars::new());
        assert!(matches!(result, Err(TranslateError::Yaml(_))));
    }
}
