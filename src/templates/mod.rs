//! Template lookup and rendering.
//!
//! Templates use `{{ name }}` placeholders resolved against a flat mapping
//! (`cookiecutter.project_name`, `python_version`, ...). A placeholder
//! preceded by `$` is a workflow expression (`${{ github.ref }}`) and is
//! copied through untouched.

mod builtin;

use regex::{Captures, Regex};
use std::borrow::Cow;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;
use thiserror::Error;

use crate::core::repository::TemplateVars;

#[derive(Debug, Error)]
pub enum TemplateError {
    #[error("template not found: {0}")]
    NotFound(String),

    #[error("template {template}: unresolved variable `{variable}`")]
    Unresolved { template: String, variable: String },

    #[error("template {template}: {source}")]
    Io {
        template: String,
        #[source]
        source: std::io::Error,
    },
}

pub trait TemplateRenderer {
    fn render(&self, name: &str, vars: &TemplateVars) -> Result<String, TemplateError>;
}

/// The bundled templates, optionally shadowed by files in an override
/// directory laid out the same way (`<dir>/python/LICENSE`, ...).
#[derive(Debug, Clone, Default)]
pub struct TemplateSet {
    override_dir: Option<PathBuf>,
}

impl TemplateSet {
    pub fn builtin() -> Self {
        Self::default()
    }

    pub fn with_override_dir(dir: &Path) -> Self {
        Self {
            override_dir: Some(dir.to_path_buf()),
        }
    }

    fn source(&self, name: &str) -> Result<Cow<'static, str>, TemplateError> {
        if let Some(dir) = &self.override_dir {
            let path = dir.join(name);
            if path.is_file() {
                return std::fs::read_to_string(&path)
                    .map(Cow::Owned)
                    .map_err(|source| TemplateError::Io {
                        template: name.to_string(),
                        source,
                    });
            }
        }
        builtin::get(name)
            .map(Cow::Borrowed)
            .ok_or_else(|| TemplateError::NotFound(name.to_string()))
    }
}

impl TemplateRenderer for TemplateSet {
    fn render(&self, name: &str, vars: &TemplateVars) -> Result<String, TemplateError> {
        let source = self.source(name)?;
        render_str(name, &source, vars)
    }
}

fn placeholder() -> &'static Regex {
    static PLACEHOLDER: OnceLock<Regex> = OnceLock::new();
    PLACEHOLDER.get_or_init(|| {
        Regex::new(r"(\$)?\{\{\s*([A-Za-z_][A-Za-z0-9_.]*)\s*\}\}").expect("placeholder pattern")
    })
}

pub fn render_str(name: &str, source: &str, vars: &TemplateVars) -> Result<String, TemplateError> {
    let mut missing: Option<String> = None;
    let rendered = placeholder().replace_all(source, |caps: &Captures| {
        if caps.get(1).is_some() {
            return caps[0].to_string();
        }
        match vars.get(&caps[2]) {
            Some(value) => value.clone(),
            None => {
                missing.get_or_insert_with(|| caps[2].to_string());
                String::new()
            }
        }
    });
    match missing {
        Some(variable) => Err(TemplateError::Unresolved {
            template: name.to_string(),
            variable,
        }),
        None => Ok(rendered.into_owned()),
    }
}
