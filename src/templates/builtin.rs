macro_rules! bundled {
    ($($name:literal),* $(,)?) => {
        &[$(($name, include_str!(concat!("../../templates/", $name)))),*]
    };
}

static BUNDLE: &[(&str, &str)] = bundled![
    "python/LICENSE",
    "python/AUTHORS.rst",
    "python/CONTRIBUTING.rst",
    "python/.pre-commit-config.yaml",
    "python/.flake8",
    "python/.coveragerc",
    "python/.git_archival.txt",
    "python/.gitattributes",
    "python/version.py",
    "python/pyproject.toml",
    "python/ci/standard.yml",
    "twincat/LICENSE",
    "twincat/.github/ISSUE_TEMPLATE.md",
    "twincat/.github/PULL_REQUEST_TEMPLATE.md",
    "twincat/.pre-commit-config.yaml",
    "twincat/.gitignore",
    "twincat/.gitattributes",
    "twincat/README.md",
    "twincat/ci/standard.yml",
];

pub fn get(name: &str) -> Option<&'static str> {
    BUNDLE
        .iter()
        .find(|(candidate, _)| *candidate == name)
        .map(|(_, source)| *source)
}

#[cfg(test)]
pub fn names() -> impl Iterator<Item = &'static str> {
    BUNDLE.iter().map(|(name, _)| *name)
}
