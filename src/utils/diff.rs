use similar::TextDiff;

/// Unified diff of `old` → `new`, empty when the texts are equal.
pub fn unified_diff(old: &str, new: &str, from: &str, to: &str) -> String {
    if old == new {
        return String::new();
    }
    TextDiff::from_lines(old, new)
        .unified_diff()
        .context_radius(3)
        .header(from, to)
        .to_string()
}

/// Prefixes every line with `> ` so diffs stand out in the preview.
pub fn quoted(text: &str) -> String {
    text.lines()
        .map(|line| format!("> {line}"))
        .collect::<Vec<_>>()
        .join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_unified_diff_has_headers_and_hunks() {
        let diff = unified_diff("a\nb\n", "a\nc\n", "template/LICENSE", "LICENSE");
        assert!(diff.starts_with("--- template/LICENSE\n+++ LICENSE\n"));
        assert!(diff.contains("-b\n"));
        assert!(diff.contains("+c\n"));
    }

    #[test]
    fn test_unified_diff_of_equal_text_is_empty() {
        assert_eq!(unified_diff("same\n", "same\n", "a", "b"), "");
    }

    #[test]
    fn test_quoted_prefixes_every_line() {
        assert_eq!(quoted("one\n\ntwo"), "> one\n> \n> two");
    }
}
