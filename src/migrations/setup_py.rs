//! `setup.py` + `setup.cfg` to `pyproject.toml`.
//!
//! `setup.py` is read statically: keyword arguments of the `setup(...)` call
//! whose values are string literals, lists of them, or dicts of them are
//! used; anything computed at run time is ignored and the template default
//! is kept. Module-level `NAME = "literal"` assignments are resolved when a
//! keyword refers to them by name.

use regex::Regex;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;
use thiserror::Error;
use toml::{Table, Value};

use crate::core::repository::Repository;
use crate::templates::{TemplateError, TemplateRenderer};

pub const SETUP_SCRIPTS: &[&str] = &["setup.py", "_setup.py"];
pub const SETUP_CFG: &str = "setup.cfg";
pub const PYPROJECT_TOML: &str = "pyproject.toml";

const READMES: &[&str] = &["README.md", "README.rst"];
const LICENSES: &[&str] = &["LICENSE.md", "LICENSE.txt", "LICENSE.rst", "LICENSE"];
const DEV_REQUIREMENTS: &[&str] = &["dev-requirements.txt", "requirements-dev.txt"];
const DOC_REQUIREMENTS: &[&str] = &["docs-requirements.txt", "requirements-docs.txt"];

/// `setup.cfg` sections that are either consumed above or meaningless
/// once the package is described by `pyproject.toml`.
const DROPPED_SECTIONS: &[&str] = &["versioneer", "metadata", "options"];

#[derive(Debug, Error)]
pub enum SetupError {
    #[error("no setup.py or _setup.py in {0}")]
    NotFound(PathBuf),

    #[error("{path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("{path}:{line}: {message}")]
    Parse {
        path: PathBuf,
        line: usize,
        message: String,
    },

    #[error(transparent)]
    Template(#[from] TemplateError),

    #[error("pyproject.toml template is not valid TOML: {0}")]
    TomlDe(#[from] toml::de::Error),

    #[error("cannot serialize pyproject.toml: {0}")]
    TomlSer(#[from] toml::ser::Error),
}

/// A Python expression as far as the migration cares about it.
#[derive(Debug, Clone, PartialEq)]
pub enum PyValue {
    Str(String),
    List(Vec<PyValue>),
    Dict(Vec<(PyValue, PyValue)>),
    /// Anything that needs evaluating; kept as source text.
    Expr(String),
}

impl PyValue {
    pub fn as_str(&self) -> Option<&str> {
        match self {
            PyValue::Str(s) => Some(s),
            _ => None,
        }
    }

    /// A list made only of string literals.
    pub fn strings(&self) -> Option<Vec<String>> {
        match self {
            PyValue::Str(s) => Some(vec![s.clone()]),
            PyValue::List(items) => items
                .iter()
                .map(|item| item.as_str().map(str::to_string))
                .collect(),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct SetupKwargs(pub BTreeMap<String, PyValue>);

impl SetupKwargs {
    pub fn get(&self, key: &str) -> Option<&PyValue> {
        self.0.get(key)
    }

    pub fn string(&self, key: &str) -> Option<String> {
        self.get(key).and_then(PyValue::as_str).map(str::to_string)
    }

    pub fn strings(&self, key: &str) -> Option<Vec<String>> {
        self.get(key).and_then(PyValue::strings)
    }
}

#[derive(Debug)]
struct ParseError {
    line: usize,
    message: String,
}

type ParseResult<T> = std::result::Result<T, ParseError>;

struct Parser<'s> {
    src: &'s str,
    pos: usize,
}

impl<'s> Parser<'s> {
    fn new(src: &'s str, pos: usize) -> Self {
        Self { src, pos }
    }

    fn rest(&self) -> &'s str {
        &self.src[self.pos..]
    }

    fn peek(&self) -> Option<char> {
        self.rest().chars().next()
    }

    fn peek_at(&self, n: usize) -> Option<char> {
        self.rest().chars().nth(n)
    }

    fn bump(&mut self) -> Option<char> {
        let c = self.peek()?;
        self.pos += c.len_utf8();
        Some(c)
    }

    fn error(&self, message: impl Into<String>) -> ParseError {
        ParseError {
            line: self.src[..self.pos].matches('\n').count() + 1,
            message: message.into(),
        }
    }

    /// Skips whitespace, comments and line continuations, newlines included.
    fn skip_trivia(&mut self) {
        loop {
            match self.peek() {
                Some(c) if c.is_whitespace() => {
                    self.bump();
                }
                Some('#') => self.skip_comment(),
                Some('\\') if self.peek_at(1) == Some('\n') => {
                    self.pos += 2;
                }
                _ => break,
            }
        }
    }

    /// Like [`Parser::skip_trivia`], but stops at the end of the line.
    fn skip_inline(&mut self) {
        loop {
            match self.peek() {
                Some(' ' | '\t' | '\r') => {
                    self.bump();
                }
                Some('#') => self.skip_comment(),
                Some('\\') if self.peek_at(1) == Some('\n') => {
                    self.pos += 2;
                }
                _ => break,
            }
        }
    }

    fn skip_comment(&mut self) {
        while let Some(c) = self.peek() {
            if c == '\n' {
                break;
            }
            self.bump();
        }
    }

    fn identifier(&mut self) -> Option<&'s str> {
        let src = self.src;
        let start = self.pos;
        while let Some(c) = self.peek() {
            if c == '_' || c.is_alphanumeric() {
                self.bump();
            } else {
                break;
            }
        }
        (self.pos > start).then(|| &src[start..self.pos])
    }

    fn at_string(&self) -> bool {
        let rest = self.rest();
        let prefix = rest
            .bytes()
            .take_while(|b| b"rRbBuUfF".contains(b))
            .count();
        prefix <= 2 && matches!(rest[prefix..].chars().next(), Some('"' | '\''))
    }

    /// Adjacent literals are concatenated. `None` when any part is an f-string.
    fn string(&mut self) -> ParseResult<Option<String>> {
        let mut out = String::new();
        let mut literal = true;
        loop {
            let (text, is_literal) = self.single_string()?;
            out.push_str(&text);
            literal &= is_literal;
            let before = self.pos;
            self.skip_trivia();
            if !self.at_string() {
                self.pos = before;
                break;
            }
        }
        Ok(literal.then_some(out))
    }

    fn single_string(&mut self) -> ParseResult<(String, bool)> {
        let mut raw = false;
        let mut formatted = false;
        while let Some(c) = self.peek() {
            match c {
                'r' | 'R' => raw = true,
                'f' | 'F' => formatted = true,
                'b' | 'B' | 'u' | 'U' => {}
                _ => break,
            }
            self.bump();
        }
        let quote = self.bump().ok_or_else(|| self.error("expected a string"))?;
        let triple = self.peek() == Some(quote) && self.peek_at(1) == Some(quote);
        if triple {
            self.pos += 2;
        }

        let mut out = String::new();
        loop {
            let c = self.bump().ok_or_else(|| self.error("unterminated string"))?;
            if c == quote {
                if !triple {
                    break;
                }
                if self.peek() == Some(quote) && self.peek_at(1) == Some(quote) {
                    self.pos += 2;
                    break;
                }
                out.push(c);
            } else if c == '\n' && !triple {
                self.pos -= 1;
                return Err(self.error("unterminated string"));
            } else if c == '\\' {
                let next = self.bump().ok_or_else(|| self.error("unterminated string"))?;
                if raw {
                    out.push('\\');
                    out.push(next);
                    continue;
                }
                match next {
                    'n' => out.push('\n'),
                    't' => out.push('\t'),
                    '\n' => {}
                    '\\' | '\'' | '"' => out.push(next),
                    other => {
                        out.push('\\');
                        out.push(other);
                    }
                }
            } else {
                out.push(c);
            }
        }
        Ok((out, !formatted))
    }

    fn value(&mut self) -> ParseResult<PyValue> {
        self.skip_trivia();
        let start = self.pos;
        let value = match self.peek() {
            Some('[') => {
                self.bump();
                PyValue::List(self.sequence(']')?)
            }
            Some('(') => {
                self.bump();
                let mut items = self.sequence(')')?;
                if items.len() == 1 {
                    items.remove(0)
                } else {
                    PyValue::List(items)
                }
            }
            Some('{') => {
                self.bump();
                PyValue::Dict(self.mapping()?)
            }
            Some(_) if self.at_string() => match self.string()? {
                Some(text) => PyValue::Str(text),
                None => PyValue::Expr(self.src[start..self.pos].trim().to_string()),
            },
            Some(_) => return self.expression(start),
            None => return Err(self.error("unexpected end of file")),
        };
        self.skip_inline();
        match self.peek() {
            None | Some('\n' | ',' | ')' | ']' | '}' | ':') => Ok(value),
            // `"a" + b`, `"x".strip()`, ...
            Some(_) => self.expression(start),
        }
    }

    /// Raw source up to the next top-level `,` `:` or closing bracket.
    fn expression(&mut self, start: usize) -> ParseResult<PyValue> {
        self.pos = start;
        let mut depth = 0usize;
        loop {
            if self.at_string() {
                self.single_string()?;
                continue;
            }
            match self.peek() {
                None => break,
                Some('#') => self.skip_comment(),
                Some('(' | '[' | '{') => {
                    depth += 1;
                    self.bump();
                }
                Some(')' | ']' | '}') => {
                    if depth == 0 {
                        break;
                    }
                    depth -= 1;
                    self.bump();
                }
                Some(',' | ':') if depth == 0 => break,
                Some(_) => {
                    self.bump();
                }
            }
        }
        Ok(PyValue::Expr(self.src[start..self.pos].trim().to_string()))
    }

    fn sequence(&mut self, close: char) -> ParseResult<Vec<PyValue>> {
        let mut items = Vec::new();
        loop {
            self.skip_trivia();
            if self.peek() == Some(close) {
                self.bump();
                return Ok(items);
            }
            items.push(self.value()?);
            self.skip_trivia();
            match self.bump() {
                Some(',') => continue,
                Some(c) if c == close => return Ok(items),
                _ => return Err(self.error(format!("expected `,` or `{close}`"))),
            }
        }
    }

    fn mapping(&mut self) -> ParseResult<Vec<(PyValue, PyValue)>> {
        let mut entries = Vec::new();
        loop {
            self.skip_trivia();
            if self.peek() == Some('}') {
                self.bump();
                return Ok(entries);
            }
            let key = self.value()?;
            self.skip_trivia();
            let value = if self.peek() == Some(':') {
                self.bump();
                self.value()?
            } else {
                PyValue::Expr(String::new())
            };
            entries.push((key, value));
            self.skip_trivia();
            match self.bump() {
                Some(',') => continue,
                Some('}') => return Ok(entries),
                _ => return Err(self.error("expected `,` or `}`")),
            }
        }
    }

    /// Keyword arguments of a call, positioned just after its `(`.
    fn keyword_arguments(&mut self) -> ParseResult<BTreeMap<String, PyValue>> {
        let mut kwargs = BTreeMap::new();
        loop {
            self.skip_trivia();
            if self.peek() == Some(')') {
                self.bump();
                return Ok(kwargs);
            }
            let start = self.pos;
            let keyword = self.identifier();
            self.skip_trivia();
            match keyword {
                Some(name) if self.peek() == Some('=') && self.peek_at(1) != Some('=') => {
                    self.bump();
                    kwargs.insert(name.to_string(), self.value()?);
                }
                _ => {
                    self.expression(start)?;
                }
            }
            self.skip_trivia();
            match self.bump() {
                Some(',') => continue,
                Some(')') => return Ok(kwargs),
                _ => return Err(self.error("expected `,` or `)` in setup() arguments")),
            }
        }
    }
}

fn setup_call() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(?m)^[ \t]*(?:setuptools\.)?setup\s*\(").expect("setup call pattern")
    })
}

fn module_assignment() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(?m)^([A-Za-z_][A-Za-z0-9_]*)[ \t]*=").expect("assignment pattern")
    })
}

fn module_literals(source: &str) -> BTreeMap<String, PyValue> {
    let mut literals = BTreeMap::new();
    for caps in module_assignment().captures_iter(source) {
        let (Some(whole), Some(name)) = (caps.get(0), caps.get(1)) else {
            continue;
        };
        if source[whole.end()..].starts_with('=') {
            continue;
        }
        let mut parser = Parser::new(source, whole.end());
        if let Ok(value) = parser.value() {
            if !matches!(value, PyValue::Expr(_)) {
                literals.insert(name.as_str().to_string(), value);
            }
        }
    }
    literals
}

/// The keyword arguments of the last top-level `setup(...)` call.
pub fn parse_setup_py(source: &str, path: &Path) -> Result<SetupKwargs, SetupError> {
    let call = setup_call()
        .find_iter(source)
        .last()
        .ok_or_else(|| SetupError::Parse {
            path: path.to_path_buf(),
            line: 1,
            message: "no setup() call found".to_string(),
        })?;
    let mut parser = Parser::new(source, call.end());
    let mut kwargs = parser.keyword_arguments().map_err(|e| SetupError::Parse {
        path: path.to_path_buf(),
        line: e.line,
        message: e.message,
    })?;

    let literals = module_literals(&source[..call.start()]);
    for value in kwargs.values_mut() {
        if let PyValue::Expr(name) = value {
            if let Some(literal) = literals.get(name.as_str()) {
                *value = literal.clone();
            }
        }
    }
    Ok(SetupKwargs(kwargs))
}

/// Sections of an INI-style `setup.cfg`, keys lowercased, multi-line values
/// joined with newlines.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SetupCfg {
    pub sections: BTreeMap<String, BTreeMap<String, String>>,
}

impl SetupCfg {
    pub fn parse(text: &str) -> Self {
        let mut cfg = SetupCfg::default();
        let mut section: Option<String> = None;
        let mut key: Option<String> = None;

        for raw in text.lines() {
            let line = raw.trim_end();
            let trimmed = line.trim_start();
            if trimmed.is_empty() || trimmed.starts_with('#') || trimmed.starts_with(';') {
                continue;
            }
            if line.starts_with('[') && line.ends_with(']') {
                let name = line[1..line.len() - 1].trim().to_string();
                cfg.sections.entry(name.clone()).or_default();
                section = Some(name);
                key = None;
                continue;
            }
            let Some(current) = section.as_ref() else {
                continue;
            };
            let values = cfg.sections.entry(current.clone()).or_default();
            let indented = line.starts_with(' ') || line.starts_with('\t');
            if let (true, Some(k)) = (indented, key.as_ref()) {
                if let Some(value) = values.get_mut(k) {
                    value.push('\n');
                    value.push_str(trimmed);
                }
                continue;
            }
            let split = trimmed.find(|c| c == '=' || c == ':');
            let (k, v) = match split {
                Some(idx) => (&trimmed[..idx], &trimmed[idx + 1..]),
                None => (trimmed, ""),
            };
            let k = k.trim().to_lowercase();
            values.insert(k.clone(), v.trim().to_string());
            key = Some(k);
        }

        for values in cfg.sections.values_mut() {
            for value in values.values_mut() {
                *value = value.trim().to_string();
            }
        }
        cfg
    }

    pub fn get(&self, section: &str, key: &str) -> Option<&str> {
        self.sections
            .get(section)
            .and_then(|values| values.get(key))
            .map(String::as_str)
    }
}

fn first_existing(root: &Path, options: &[&str]) -> Option<String> {
    options
        .iter()
        .find(|option| root.join(option).exists())
        .map(|option| option.to_string())
}

fn table_mut<'t>(table: &'t mut Table, key: &str) -> &'t mut Table {
    let entry = table
        .entry(key.to_string())
        .or_insert(Value::Table(Table::new()));
    if !entry.is_table() {
        *entry = Value::Table(Table::new());
    }
    match entry {
        Value::Table(inner) => inner,
        _ => unreachable!("entry was just made a table"),
    }
}

fn nested<'t>(table: &'t mut Table, path: &[&str]) -> &'t mut Table {
    path.iter().fold(table, |table, key| table_mut(table, key))
}

fn string_array(items: impl IntoIterator<Item = String>) -> Value {
    Value::Array(items.into_iter().map(Value::String).collect())
}

fn set_dynamic(project: &mut Table, field: &str, enabled: bool) {
    let dynamic = project
        .entry("dynamic".to_string())
        .or_insert(Value::Array(Vec::new()));
    if let Value::Array(items) = dynamic {
        let present = items.iter().any(|item| item.as_str() == Some(field));
        if enabled && !present {
            items.push(Value::String(field.to_string()));
        } else if !enabled {
            items.retain(|item| item.as_str() != Some(field));
        }
    }
}

fn split_keywords(keywords: &str) -> Vec<String> {
    keywords
        .split(|c: char| c == ',' || c.is_whitespace())
        .filter(|k| !k.is_empty())
        .map(str::to_string)
        .collect()
}

fn nonempty_lines(text: &str) -> Vec<String> {
    text.lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(str::to_string)
        .collect()
}

fn entry_point(line: &str) -> Option<(String, String)> {
    let (name, target) = line.split_once('=')?;
    Some((name.trim().to_string(), target.trim().to_string()))
}

/// Entry point groups from `setup(entry_points=...)`, or failing that from
/// `[options.entry_points]`.
fn entry_points(kwargs: &SetupKwargs, cfg: &SetupCfg) -> Vec<(String, Vec<(String, String)>)> {
    if let Some(PyValue::Dict(groups)) = kwargs.get("entry_points") {
        return groups
            .iter()
            .filter_map(|(group, points)| {
                let lines = match points {
                    PyValue::Str(text) => nonempty_lines(text),
                    other => other.strings()?,
                };
                Some((
                    group.as_str()?.to_string(),
                    lines.iter().filter_map(|l| entry_point(l)).collect(),
                ))
            })
            .collect();
    }
    cfg.sections
        .get("options.entry_points")
        .map(|groups| {
            groups
                .iter()
                .map(|(group, text)| {
                    let points = nonempty_lines(text)
                        .iter()
                        .filter_map(|l| entry_point(l))
                        .collect();
                    (group.clone(), points)
                })
                .collect()
        })
        .unwrap_or_default()
}

/// Fills the rendered `pyproject.toml` template from the legacy metadata.
pub fn convert(doc: &mut Table, root: &Path, kwargs: &SetupKwargs, cfg: &SetupCfg) {
    match first_existing(root, READMES) {
        Some(readme) => {
            nested(doc, &["tool", "setuptools", "dynamic", "readme"])
                .insert("file".to_string(), Value::String(readme));
        }
        None => {
            nested(doc, &["tool", "setuptools", "dynamic"]).remove("readme");
            set_dynamic(table_mut(doc, "project"), "readme", false);
        }
    }

    let project = table_mut(doc, "project");
    match first_existing(root, LICENSES) {
        Some(license) => {
            table_mut(project, "license").insert("file".to_string(), Value::String(license));
        }
        None => {
            project.remove("license");
        }
    }

    let name = kwargs
        .string("name")
        .or_else(|| cfg.get("metadata", "name").map(str::to_string));
    if let Some(name) = name {
        project.insert("name".to_string(), Value::String(name));
    }
    let description = kwargs
        .string("description")
        .or_else(|| cfg.get("metadata", "description").map(str::to_string));
    if let Some(description) = description {
        project.insert("description".to_string(), Value::String(description));
    }
    let requires = kwargs
        .string("python_requires")
        .or_else(|| cfg.get("options", "python_requires").map(str::to_string));
    if let Some(requires) = requires {
        project.insert("requires-python".to_string(), Value::String(requires));
    }
    let classifiers = kwargs
        .get("classifiers")
        .and_then(PyValue::strings)
        .or_else(|| cfg.get("metadata", "classifiers").map(nonempty_lines));
    if let Some(classifiers) = classifiers {
        project.insert("classifiers".to_string(), string_array(classifiers));
    }
    let keywords = match kwargs.get("keywords") {
        Some(PyValue::Str(text)) => Some(split_keywords(text)),
        Some(other) => other.strings(),
        None => cfg.get("metadata", "keywords").map(split_keywords),
    };
    if let Some(keywords) = keywords {
        project.insert("keywords".to_string(), string_array(keywords));
    }

    let import_name = project
        .get("name")
        .and_then(Value::as_str)
        .unwrap_or_default()
        .replace('-', "_");

    project.remove("scripts");
    for (group, points) in entry_points(kwargs, cfg) {
        if points.is_empty() {
            continue;
        }
        let table: Table = points
            .into_iter()
            .map(|(name, target)| (name, Value::String(target)))
            .collect();
        match group.as_str() {
            "console_scripts" => {
                project.insert("scripts".to_string(), Value::Table(table));
            }
            "gui_scripts" => {
                project.insert("gui-scripts".to_string(), Value::Table(table));
            }
            other => {
                table_mut(project, "entry-points").insert(other.to_string(), Value::Table(table));
            }
        }
    }

    let dev = first_existing(root, DEV_REQUIREMENTS);
    let docs = first_existing(root, DOC_REQUIREMENTS);
    set_dynamic(project, "optional-dependencies", dev.is_some() || docs.is_some());
    let dynamic = nested(doc, &["tool", "setuptools", "dynamic"]);
    if dev.is_none() && docs.is_none() {
        dynamic.remove("optional-dependencies");
    } else {
        let optional = table_mut(dynamic, "optional-dependencies");
        for (extra, file) in [("test", dev), ("doc", docs)] {
            if let Some(file) = file {
                let mut entry = Table::new();
                entry.insert("file".to_string(), string_array([file]));
                optional.insert(extra.to_string(), Value::Table(entry));
            }
        }
    }

    nested(doc, &["tool", "setuptools", "packages", "find"]).insert(
        "include".to_string(),
        string_array([format!("{import_name}*")]),
    );
    nested(doc, &["tool", "setuptools_scm"]).insert(
        "write_to".to_string(),
        Value::String(format!("{import_name}/_version.py")),
    );

    let tool = table_mut(doc, "tool");
    for (section, values) in &cfg.sections {
        let dropped = DROPPED_SECTIONS
            .iter()
            .any(|d| section == d || section.starts_with(&format!("{d}.")));
        if dropped {
            continue;
        }
        let table: Table = values
            .iter()
            .map(|(k, v)| (k.clone(), Value::String(v.clone())))
            .collect();
        tool.insert(section.clone(), Value::Table(table));
    }
}

fn read(path: &Path) -> Result<String, SetupError> {
    std::fs::read_to_string(path).map_err(|source| SetupError::Io {
        path: path.to_path_buf(),
        source,
    })
}

/// The `pyproject.toml` replacing the checkout's `setup.py` and `setup.cfg`.
pub fn migrate(repo: &Repository, templates: &dyn TemplateRenderer) -> Result<String, SetupError> {
    let setup_py = SETUP_SCRIPTS
        .iter()
        .map(|name| repo.path(name))
        .find(|path| path.exists())
        .ok_or_else(|| SetupError::NotFound(repo.root.clone()))?;
    let kwargs = parse_setup_py(&read(&setup_py)?, &setup_py)?;

    let setup_cfg = repo.path(SETUP_CFG);
    let cfg = if setup_cfg.exists() {
        SetupCfg::parse(&read(&setup_cfg)?)
    } else {
        SetupCfg::default()
    };

    let rendered = templates.render("python/pyproject.toml", &repo.template_vars())?;
    let mut doc: Table = toml::from_str(&rendered)?;
    convert(&mut doc, &repo.root, &kwargs, &cfg);
    Ok(toml::to_string(&doc)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::config::Config;
    use crate::templates::TemplateSet;
    use pretty_assertions::assert_eq;
    use std::fs;
    use tempfile::TempDir;

    const SETUP_PY: &str = r#"import sys
from os import path

from setuptools import find_packages, setup

import versioneer

min_version = (3, 9)
if sys.version_info < min_version:
    error = """
This requires Python {0}.{1} or above.
""".format(*sys.version_info[:2], *min_version)
    sys.exit(error)

here = path.abspath(path.dirname(__file__))

with open(path.join(here, "README.rst"), encoding="utf-8") as readme_file:
    readme = readme_file.read()

PACKAGE_NAME = "my-pkg"

setup(
    name=PACKAGE_NAME,
    version=versioneer.get_version(),
    cmdclass=versioneer.get_cmdclass(),
    license="BSD",
    packages=find_packages(exclude=["docs", "tests"]),
    description="Python tools " "for things",  # comment
    long_description=readme,
    python_requires=">=3.9",
    entry_points={
        "console_scripts": [
            "my-pkg=my_pkg.__main__:main",
        ],
        "happi.containers": ["my_pkg = my_pkg.happi.containers"],
    },
    include_package_data=True,
    keywords="pcds, lcls",
    classifiers=[
        "Development Status :: 2 - Pre-Alpha",
        'Programming Language :: Python :: 3',
    ],
)
"#;

    const SETUP_CFG_TEXT: &str = "[versioneer]\nVCS = git\nstyle = pep440\n\n[flake8]\nexclude =\n    .git,\n    docs\nmax-line-length = 115\n\n[metadata]\nkeywords = ignored\n";

    #[test]
    fn test_parse_setup_kwargs() {
        let kwargs = parse_setup_py(SETUP_PY, Path::new("setup.py")).unwrap();
        assert_eq!(kwargs.string("name").as_deref(), Some("my-pkg"));
        assert_eq!(kwargs.string("description").as_deref(), Some("Python tools for things"));
        assert_eq!(kwargs.string("python_requires").as_deref(), Some(">=3.9"));
        assert_eq!(
            kwargs.get("version"),
            Some(&PyValue::Expr("versioneer.get_version()".to_string()))
        );
        assert_eq!(
            kwargs.strings("classifiers").unwrap(),
            vec![
                "Development Status :: 2 - Pre-Alpha".to_string(),
                "Programming Language :: Python :: 3".to_string(),
            ]
        );
        assert!(matches!(kwargs.get("entry_points"), Some(PyValue::Dict(groups)) if groups.len() == 2));
    }

    #[test]
    fn test_parse_string_forms() {
        let source = "setup(a='x\\'y', b=r\"\\d+\", c=\"\"\"multi\nline\"\"\", d=f\"{x}\", e=(\"one\"\n   \"two\"))\n";
        let kwargs = parse_setup_py(source, Path::new("setup.py")).unwrap();
        assert_eq!(kwargs.string("a").as_deref(), Some("x'y"));
        assert_eq!(kwargs.string("b").as_deref(), Some("\\d+"));
        assert_eq!(kwargs.string("c").as_deref(), Some("multi\nline"));
        assert!(matches!(kwargs.get("d"), Some(PyValue::Expr(_))));
        assert_eq!(kwargs.string("e").as_deref(), Some("onetwo"));
    }

    #[test]
    fn test_unterminated_string_reports_line() {
        let source = "from setuptools import setup\n\nsetup(\n    name=\"oops,\n)\n";
        let err = parse_setup_py(source, Path::new("setup.py")).unwrap_err();
        assert!(matches!(err, SetupError::Parse { line: 4, .. }), "{err}");
    }

    #[test]
    fn test_missing_setup_call() {
        let err = parse_setup_py("import os\n", Path::new("setup.py")).unwrap_err();
        assert!(matches!(err, SetupError::Parse { .. }));
    }

    #[test]
    fn test_setup_cfg_parse() {
        let cfg = SetupCfg::parse(SETUP_CFG_TEXT);
        assert_eq!(cfg.get("versioneer", "vcs"), Some("git"));
        assert_eq!(cfg.get("flake8", "exclude"), Some(".git,\ndocs"));
        assert_eq!(cfg.get("flake8", "max-line-length"), Some("115"));
    }

    fn checkout(tmp: &TempDir) -> Repository {
        let root = tmp.path().join("my-pkg");
        fs::create_dir_all(root.join(".git")).unwrap();
        fs::write(root.join("setup.py"), SETUP_PY).unwrap();
        fs::write(root.join("setup.cfg"), SETUP_CFG_TEXT).unwrap();
        fs::write(root.join("README.rst"), "my-pkg\n").unwrap();
        fs::write(root.join("LICENSE"), "license\n").unwrap();
        fs::write(root.join("dev-requirements.txt"), "pytest\n").unwrap();
        Repository::from_parts(root, Config::default())
    }

    #[test]
    fn test_migrate_builds_pyproject() {
        let tmp = TempDir::new().unwrap();
        let repo = checkout(&tmp);
        let text = migrate(&repo, &TemplateSet::builtin()).unwrap();
        let doc: Table = toml::from_str(&text).unwrap();

        let project = doc["project"].as_table().unwrap();
        assert_eq!(project["name"].as_str(), Some("my-pkg"));
        assert_eq!(project["description"].as_str(), Some("Python tools for things"));
        assert_eq!(project["requires-python"].as_str(), Some(">=3.9"));
        assert_eq!(project["keywords"], string_array(["pcds".to_string(), "lcls".to_string()]));
        assert_eq!(project["scripts"]["my-pkg"].as_str(), Some("my_pkg.__main__:main"));
        assert_eq!(
            project["entry-points"]["happi.containers"]["my_pkg"].as_str(),
            Some("my_pkg.happi.containers")
        );
        assert_eq!(project["license"]["file"].as_str(), Some("LICENSE"));
        let dynamic = project["dynamic"].as_array().unwrap();
        assert!(dynamic.contains(&Value::String("optional-dependencies".to_string())));

        let tool = doc["tool"].as_table().unwrap();
        assert_eq!(tool["setuptools"]["dynamic"]["readme"]["file"].as_str(), Some("README.rst"));
        assert_eq!(
            tool["setuptools"]["dynamic"]["optional-dependencies"]["test"]["file"],
            string_array(["dev-requirements.txt".to_string()])
        );
        assert_eq!(
            tool["setuptools"]["packages"]["find"]["include"],
            string_array(["my_pkg*".to_string()])
        );
        assert_eq!(tool["setuptools_scm"]["write_to"].as_str(), Some("my_pkg/_version.py"));
        assert_eq!(tool["flake8"]["max-line-length"].as_str(), Some("115"));
        assert!(!tool.contains_key("versioneer"));
        assert!(!tool.contains_key("metadata"));
    }

    #[test]
    fn test_setup_cfg_metadata_fills_gaps() {
        let tmp = TempDir::new().unwrap();
        let root = tmp.path().join("cfg-only");
        fs::create_dir_all(&root).unwrap();
        fs::write(root.join("setup.py"), "import setuptools\nsetuptools.setup()\n").unwrap();
        fs::write(
            root.join("setup.cfg"),
            "[metadata]\nname = cfg-only\ndescription = From cfg\nclassifiers =\n    A\n    B\n\n[options.entry_points]\nconsole_scripts =\n    cfg-only = cfg_only.main:main\n",
        )
        .unwrap();
        let repo = Repository::from_parts(root, Config::default());

        let text = migrate(&repo, &TemplateSet::builtin()).unwrap();
        let doc: Table = toml::from_str(&text).unwrap();
        let project = doc["project"].as_table().unwrap();
        assert_eq!(project["description"].as_str(), Some("From cfg"));
        assert_eq!(project["classifiers"], string_array(["A".to_string(), "B".to_string()]));
        assert_eq!(project["scripts"]["cfg-only"].as_str(), Some("cfg_only.main:main"));
        assert!(!project.contains_key("license"));
        assert!(!doc["tool"]["setuptools"]["dynamic"]
            .as_table()
            .unwrap()
            .contains_key("readme"));
        assert!(!doc["tool"].as_table().unwrap().contains_key("options.entry_points"));
    }

    #[test]
    fn test_missing_setup_py() {
        let tmp = TempDir::new().unwrap();
        let repo = Repository::from_parts(tmp.path().to_path_buf(), Config::default());
        assert!(matches!(
            migrate(&repo, &TemplateSet::builtin()),
            Err(SetupError::NotFound(_))
        ));
    }
}
