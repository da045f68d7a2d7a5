use std::path::PathBuf;

use crate::core::error::Result;
use crate::utils::fs::{read_text, write_text};

use super::fix::FixContext;
use super::style::StyleRules;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Side {
    Start,
    End,
}

/// Inserts lines at one end of an existing file.
#[derive(Debug, Clone)]
pub struct LineEdit {
    pub path: PathBuf,
    pub lines: Vec<String>,
    pub skip_if_present: bool,
    pub style: Option<StyleRules>,
}

impl LineEdit {
    pub fn new(path: impl Into<PathBuf>, lines: &[&str]) -> Self {
        Self {
            path: path.into(),
            lines: lines.iter().map(|l| l.to_string()).collect(),
            skip_if_present: true,
            style: None,
        }
    }

    pub fn skip_if_present(mut self, skip: bool) -> Self {
        self.skip_if_present = skip;
        self
    }

    pub fn describe(&self, side: Side) -> String {
        let verb = match side {
            Side::Start => "Prepend lines to",
            Side::End => "Add lines to",
        };
        format!("{} {}:\n{}", verb, self.path.display(), listing(&self.lines))
    }

    /// The file with the configured lines inserted.
    pub fn apply(&self, existing: &str, side: Side) -> String {
        let current: Vec<&str> = existing.lines().collect();
        let mut inserted: Vec<&str> = Vec::new();
        for line in &self.lines {
            let present = contains(&current, line) || contains(&inserted, line);
            if !self.skip_if_present || !present {
                inserted.push(line);
            }
        }
        let joined = match side {
            Side::Start => inserted.iter().chain(current.iter()).copied().collect::<Vec<_>>(),
            Side::End => current.iter().chain(inserted.iter()).copied().collect::<Vec<_>>(),
        }
        .join("\n");
        restyle(self.style.as_ref(), joined)
    }

    pub fn run(&self, ctx: &FixContext<'_>, side: Side) -> Result<()> {
        let path = ctx.path(&self.path);
        let existing = read_text(&path)?;
        write_text(&path, &self.apply(&existing, side))
    }
}

/// Drops every line equal to one of the configured lines.
#[derive(Debug, Clone)]
pub struct RemoveLines {
    pub path: PathBuf,
    pub lines: Vec<String>,
    pub style: Option<StyleRules>,
}

impl RemoveLines {
    pub fn new(path: impl Into<PathBuf>, lines: &[&str]) -> Self {
        Self {
            path: path.into(),
            lines: lines.iter().map(|l| l.to_string()).collect(),
            style: None,
        }
    }

    pub fn describe(&self) -> String {
        format!(
            "Remove matching lines from {}:\n{}",
            self.path.display(),
            listing(&self.lines)
        )
    }

    pub fn apply(&self, existing: &str) -> String {
        let kept = existing
            .lines()
            .filter(|line| !self.lines.iter().any(|target| same_line(line, target)))
            .collect::<Vec<_>>()
            .join("\n");
        restyle(self.style.as_ref(), kept)
    }

    pub fn run(&self, ctx: &FixContext<'_>) -> Result<()> {
        let path = ctx.path(&self.path);
        let existing = read_text(&path)?;
        write_text(&path, &self.apply(&existing))
    }
}

fn same_line(line: &str, target: &str) -> bool {
    line.trim_end() == target.trim_end()
}

fn contains(lines: &[&str], target: &str) -> bool {
    lines.iter().any(|line| same_line(line, target))
}

fn listing(lines: &[String]) -> String {
    lines
        .iter()
        .map(|line| format!("    {line}"))
        .collect::<Vec<_>>()
        .join("\n")
}

fn restyle(style: Option<&StyleRules>, text: String) -> String {
    match style {
        Some(rules) => rules.apply(&text),
        None => text,
    }
}
