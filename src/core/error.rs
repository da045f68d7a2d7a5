use std::path::PathBuf;

use thiserror::Error;

use crate::migrations::setup_py::SetupError;
use crate::migrations::travis::TranslateError;
use crate::templates::TemplateError;

/// Errors raised while opening a checkout, building fixes or running them.
#[derive(Debug, Error)]
pub enum MigrateError {
    /// The root has no version-control metadata. Fatal before any fix runs.
    #[error("{0} is not a repository root (no .git found)")]
    NotARepository(PathBuf),

    #[error("{path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("`{command}` failed ({status}): {stderr}")]
    Command {
        command: String,
        status: String,
        stderr: String,
    },

    #[error(transparent)]
    Template(#[from] TemplateError),

    #[error(transparent)]
    Translate(#[from] TranslateError),

    #[error(transparent)]
    Setup(#[from] SetupError),
}

impl MigrateError {
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        MigrateError::Io {
            path: path.into(),
            source,
        }
    }
}

pub type Result<T, E = MigrateError> = std::result::Result<T, E>;
