use std::io;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

use crate::core::error::{MigrateError, Result};

const SKIPPED_DIRS: &[&str] = &[
    "node_modules",
    "build",
    "dist",
    "venv",
    "__pycache__",
];

/// `.git` may be a directory or, for worktrees and submodules, a file.
pub fn has_git_repo(path: &Path) -> bool {
    path.join(".git").exists()
}

/// Python sources below `root`, relative to it and sorted by path.
pub fn find_python_sources(root: &Path) -> Vec<PathBuf> {
    find_files_with_extension(root, "py")
}

pub fn find_files_with_extension(root: &Path, ext: &str) -> Vec<PathBuf> {
    let dot_ext = if ext.starts_with('.') {
        ext.to_string()
    } else {
        format!(".{}", ext)
    };
    let mut results = Vec::new();
    for entry in WalkDir::new(root)
        .sort_by_file_name()
        .into_iter()
        .filter_entry(|e| {
            if e.depth() == 0 {
                return true;
            }
            let n = e.file_name().to_string_lossy();
            !n.starts_with('.') && !SKIPPED_DIRS.contains(&n.as_ref()) && !n.ends_with(".egg-info")
        })
        .filter_map(|e| e.ok())
    {
        if entry.file_type().is_file() && entry.file_name().to_string_lossy().ends_with(&dot_ext) {
            if let Ok(relative) = entry.path().strip_prefix(root) {
                results.push(relative.to_path_buf());
            }
        }
    }
    results
}

/// Files directly in `root` with the given extension, relative and sorted.
pub fn top_level_files_with_extension(root: &Path, ext: &str) -> Vec<PathBuf> {
    let mut results: Vec<PathBuf> = WalkDir::new(root)
        .min_depth(1)
        .max_depth(1)
        .sort_by_file_name()
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_file())
        .filter(|e| e.path().extension().is_some_and(|x| x == ext))
        .filter_map(|e| e.path().strip_prefix(root).ok().map(Path::to_path_buf))
        .collect();
    results.sort();
    results
}

pub fn read_optional(path: &Path) -> Result<Option<String>> {
    match std::fs::read_to_string(path) {
        Ok(contents) => Ok(Some(contents)),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
        Err(e) => Err(MigrateError::io(path, e)),
    }
}

pub fn read_text(path: &Path) -> Result<String> {
    std::fs::read_to_string(path).map_err(|e| MigrateError::io(path, e))
}

/// Text as written to disk: trailing whitespace trimmed, one final newline.
pub fn normalized_text(contents: &str) -> String {
    let trimmed = contents.trim_end();
    if trimmed.is_empty() {
        String::new()
    } else {
        format!("{trimmed}\n")
    }
}

/// Writes `contents` in normalized form, creating parent directories.
pub fn write_text(path: &Path, contents: &str) -> Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).map_err(|e| MigrateError::io(parent, e))?;
    }
    std::fs::write(path, normalized_text(contents)).map_err(|e| MigrateError::io(path, e))
}
