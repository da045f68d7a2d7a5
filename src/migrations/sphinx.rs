pub const CONF_PY: &str = "docs/source/conf.py";
pub const COMMIT_MESSAGE: &str = "DOC: update Sphinx configuration";

const JQUERY_EXTENSION: &str = "sphinxcontrib.jquery";

/// Applies the current documentation conventions to a Sphinx `conf.py`.
pub fn touch_up(original: &str) -> String {
    let mut updated = original
        .replace("doctr_versions_menu", "docs-versions-menu")
        .replace("language = None", "language = \"en\"");
    if !updated.contains(JQUERY_EXTENSION) {
        updated = updated.replace(
            "extensions = [",
            &format!("extensions = [\n    \"{JQUERY_EXTENSION}\",\n"),
        );
    }
    updated
}
