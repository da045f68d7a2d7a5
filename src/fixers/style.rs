//! Source-level modernization for a target Python version.

use regex::{Captures, Regex};
use std::borrow::Cow;
use std::io;
use std::path::PathBuf;
use std::sync::OnceLock;
use tracing::debug;

use crate::core::error::{MigrateError, Result};
use crate::core::repository::PythonVersion;
use crate::utils::fs::normalized_text;

use super::fix::FixContext;

/// `__future__` features that are always on for any Python 3, and the ones
/// that became mandatory later together with the version that did it.
const MANDATORY_FUTURES: &[&str] = &[
    "nested_scopes",
    "generators",
    "division",
    "absolute_import",
    "with_statement",
    "print_function",
    "unicode_literals",
];
const LATER_FUTURES: &[(&str, PythonVersion)] = &[(
    "generator_stop",
    PythonVersion { major: 3, minor: 7 },
)];

fn coding_cookie() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?i)^[ \t\f]*#.*?coding[:=][ \t]*utf[-_]?8(?:[^\w.-]|$)").expect("coding cookie pattern"))
}

fn future_import() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^from\s+__future__\s+import\s+(.+)$").expect("future import pattern"))
}

fn object_base() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^(\s*class\s+\w+)\(\s*object\s*\)(\s*:)").expect("object base pattern"))
}

fn super_call() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"super\(\s*(\w+)\s*,\s*(?:self|cls)\s*\)").expect("super call pattern"))
}

fn class_header() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^\s*class\s+(\w+)").expect("class header pattern"))
}

fn def_header() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^\s*(?:async\s+)?def\s").expect("def header pattern"))
}

enum Scope {
    Class(String),
    Function,
}

/// Open `class` and `def` blocks, tracked by indentation.
#[derive(Default)]
struct ScopeStack {
    open: Vec<(usize, Scope)>,
}

impl ScopeStack {
    fn enter_line(&mut self, line: &str) {
        let body = line.trim_start();
        if body.is_empty() || body.starts_with('#') {
            return;
        }
        let indent = line.len() - body.len();
        while self.open.last().is_some_and(|(open, _)| *open >= indent) {
            self.open.pop();
        }
        if let Some(caps) = class_header().captures(line) {
            self.open.push((indent, Scope::Class(caps[1].to_string())));
        } else if def_header().is_match(line) {
            self.open.push((indent, Scope::Function));
        }
    }

    /// The class whose method body holds the current line. Nested functions
    /// have no owner.
    fn method_owner(&self) -> Option<&str> {
        match self.open.as_slice() {
            [.., (_, Scope::Class(name)), (_, Scope::Function)] => Some(name.as_str()),
            _ => None,
        }
    }
}

/// `super(Owner, self)` becomes `super()` only for the class that owns the method.
fn rewrite_super<'a>(line: &'a str, owner: Option<&str>) -> Cow<'a, str> {
    let Some(owner) = owner else {
        return Cow::Borrowed(line);
    };
    super_call().replace_all(line, |caps: &Captures| {
        if &caps[1] == owner {
            "super()".to_string()
        } else {
            caps[0].to_string()
        }
    })
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StyleRules {
    pub version: PythonVersion,
}

impl StyleRules {
    pub fn new(version: PythonVersion) -> Self {
        Self { version }
    }

    fn is_mandatory(&self, feature: &str) -> bool {
        MANDATORY_FUTURES.contains(&feature)
            || LATER_FUTURES
                .iter()
                .any(|(name, since)| *name == feature && self.version >= *since)
    }

    /// `None` drops the line; otherwise the line to keep.
    fn rewrite_future_import(&self, line: &str) -> Option<String> {
        let Some(caps) = future_import().captures(line) else {
            return Some(line.to_string());
        };
        let names = caps[1].trim();
        if names.contains('(') && !names.contains(')') {
            // Multi-line import; left alone.
            return Some(line.to_string());
        }
        let names = names.trim_start_matches('(').trim_end_matches(')');
        let features: Vec<&str> = names
            .split(',')
            .map(str::trim)
            .filter(|f| !f.is_empty())
            .collect();
        let kept: Vec<&str> = features
            .iter()
            .copied()
            .filter(|f| !self.is_mandatory(f.split_whitespace().next().unwrap_or(f)))
            .collect();
        if kept.is_empty() {
            None
        } else if kept.len() == features.len() {
            Some(line.to_string())
        } else {
            Some(format!("from __future__ import {}", kept.join(", ")))
        }
    }

    /// Rewrites one source file. Applying the rules twice gives the same text
    /// as applying them once.
    pub fn apply(&self, source: &str) -> String {
        let mut out: Vec<String> = Vec::new();
        let mut scopes = ScopeStack::default();
        for line in source.lines() {
            let line = line.trim_end();
            // Encoding cookies are only meaningful on the first two lines.
            if out.len() < 2 && coding_cookie().is_match(line) {
                continue;
            }
            let Some(line) = self.rewrite_future_import(line) else {
                continue;
            };
            let line = object_base().replace(&line, "${1}${2}");
            scopes.enter_line(&line);
            let line = rewrite_super(&line, scopes.method_owner());
            out.push(line.into_owned());
        }
        normalized_text(&out.join("\n"))
    }
}

/// Applies [`StyleRules`] to a fixed list of source files.
#[derive(Debug, Clone)]
pub struct NormalizeStyle {
    pub rules: StyleRules,
    pub files: Vec<PathBuf>,
}

impl NormalizeStyle {
    pub fn describe(&self) -> String {
        let listing = self
            .files
            .iter()
            .map(|f| format!("    {}", f.display()))
            .collect::<Vec<_>>()
            .join("\n");
        format!(
            "Normalize {} source file(s) to Python {}+ conventions:\n{}",
            self.files.len(),
            self.rules.version,
            listing
        )
    }

    pub fn commit_message(&self) -> String {
        format!(
            "STY: update repository to Python {}+ standards",
            self.rules.version
        )
    }

    pub fn run(&self, ctx: &FixContext<'_>) -> Result<()> {
        for relative in &self.files {
            let path = ctx.path(relative);
            let source = match std::fs::read_to_string(&path) {
                Ok(source) => source,
                Err(e) if e.kind() == io::ErrorKind::NotFound => {
                    debug!(file = %relative.display(), "gone before normalization");
                    continue;
                }
                Err(e) => return Err(MigrateError::io(path, e)),
            };
            let updated = self.rules.apply(&source);
            if updated != source {
                std::fs::write(&path, updated).map_err(|e| MigrateError::io(&path, e))?;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::git::testing::RecordingVcs;
    use pretty_assertions::assert_eq;
    use std::fs;
    use tempfile::TempDir;

    fn rules() -> StyleRules {
        StyleRules::new(PythonVersion::DEFAULT)
    }

    #[test]
    fn test_removes_coding_cookie_near_top_only() {
        let src = "#!/usr/bin/env python\n# -*- coding: utf-8 -*-\nx = 1\n";
        assert_eq!(rules().apply(src), "#!/usr/bin/env python\nx = 1\n");

        let late = "a = 1\nb = 2\n# coding: utf-8\n";
        assert_eq!(rules().apply(late), late);
    }

    #[test]
    fn test_keeps_non_utf8_coding_cookie() {
        let src = "# -*- coding: latin-1 -*-\nx = 'café'\n";
        let out = rules().apply(src);
        assert!(out.contains("latin-1"));
        assert_eq!(out, src);

        assert_eq!(rules().apply("# vim: set fileencoding=UTF8 :\nx = 1\n"), "x = 1\n");
        let sig = "# coding: utf-8-sig\nx = 1\n";
        assert_eq!(rules().apply(sig), sig);
    }

    #[test]
    fn test_future_imports() {
        let src = "from __future__ import print_function, division\nfrom __future__ import annotations, absolute_import\nx = 1\n";
        assert_eq!(
            rules().apply(src),
            "from __future__ import annotations\nx = 1\n"
        );
    }

    #[test]
    fn test_generator_stop_depends_on_version() {
        let src = "from __future__ import generator_stop\n";
        assert_eq!(rules().apply(src), "");
        let old = StyleRules::new(PythonVersion { major: 3, minor: 6 });
        assert_eq!(old.apply(src), src);
    }

    #[test]
    fn test_object_base_and_super() {
        let src = "class Foo(object):\n    def __init__(self):\n        super(Foo, self).__init__()\n";
        assert_eq!(
            rules().apply(src),
            "class Foo:\n    def __init__(self):\n        super().__init__()\n"
        );
    }

    #[test]
    fn test_super_naming_another_class_is_kept() {
        let src = "class C(B):\n    def __init__(self):\n        super(B, self).__init__()\n";
        assert_eq!(rules().apply(src), src);
    }

    #[test]
    fn test_super_outside_a_direct_method_is_kept() {
        let nested = "class C(B):\n    def run(self):\n        def inner():\n            return super(C, self).run()\n        return inner()\n";
        assert_eq!(rules().apply(nested), nested);

        let module_level = "def helper(self):\n    return super(C, self).run()\n";
        assert_eq!(rules().apply(module_level), module_level);
    }

    #[test]
    fn test_super_follows_the_innermost_class() {
        let src = "class Outer(object):\n    class Inner(Base):\n\n        # cached\n        @classmethod\n        def make(cls):\n            return super(Inner, cls).make()\n\n    def run(self):\n        super(Outer, self).run()\n        super(Inner, self).run()\n";
        assert_eq!(
            rules().apply(src),
            "class Outer:\n    class Inner(Base):\n\n        # cached\n        @classmethod\n        def make(cls):\n            return super().make()\n\n    def run(self):\n        super().run()\n        super(Inner, self).run()\n"
        );
    }

    #[test]
    fn test_trailing_whitespace_and_final_newline() {
        assert_eq!(rules().apply("x = 1   \n\n\n"), "x = 1\n");
        assert_eq!(rules().apply("x = 1"), "x = 1\n");
        assert_eq!(rules().apply(""), "");
    }

    #[test]
    fn test_rules_are_a_fixed_point() {
        let src = "# coding: utf-8\nx = 1\n# coding: utf-8\n# -*- coding: latin-1 -*-\nfrom __future__ import division\nclass A(object) :\n    pass \n";
        let once = rules().apply(src);
        assert_eq!(rules().apply(&once), once);
    }

    #[test]
    fn test_normalize_style_run_and_describe() {
        let tmp = TempDir::new().unwrap();
        fs::create_dir_all(tmp.path().join("pkg")).unwrap();
        fs::write(tmp.path().join("pkg/a.py"), "class A(object):\n    pass\n").unwrap();
        let vcs = RecordingVcs::default();
        let ctx = FixContext { root: tmp.path(), vcs: &vcs };
        let fix = NormalizeStyle {
            rules: rules(),
            files: vec![PathBuf::from("pkg/a.py"), PathBuf::from("pkg/gone.py")],
        };

        fix.run(&ctx).unwrap();

        assert_eq!(
            fs::read_to_string(tmp.path().join("pkg/a.py")).unwrap(),
            "class A:\n    pass\n"
        );
        assert!(fix.describe().starts_with("Normalize 2 source file(s) to Python 3.9+"));
        assert_eq!(
            fix.commit_message(),
            "STY: update repository to Python 3.9+ standards"
        );
    }
}
