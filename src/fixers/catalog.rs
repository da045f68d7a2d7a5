//! Inspects a checkout and lists the fixes that bring it up to standard.

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

use crate::core::config::Profile;
use crate::core::error::{MigrateError, Result};
use crate::core::repository::Repository;
use crate::migrations::travis::{CiTranslator, TRAVIS_YML, WORKFLOW};
use crate::migrations::{setup_py, sphinx};
use crate::templates::TemplateRenderer;
use crate::utils::fs::{
    find_python_sources, has_git_repo, read_optional, read_text, top_level_files_with_extension,
};

use super::composite::CompositeFix;
use super::files::{AddFile, DeleteFiles, UpdateFile};
use super::fix::{slug, Fix, FixKind, Stage};
use super::lines::{LineEdit, RemoveLines};
use super::style::{NormalizeStyle, StyleRules};
use super::template::TemplateFile;

const PYTHON_OBSOLETE: &[&str] = &["run_tests.py"];

/// Never restyled: generated or build-time files.
const STYLE_EXCLUDED: &[&str] = &["setup.py", "versioneer.py", "_version.py"];

const VERSIONEER_LINES: &[&str] = &[
    "__version__ = _version.get_versions()['version']",
    "__version__ = get_versions()['version']",
    "del get_versions",
    "del _version",
    "from . import _version",
    "from ._version import get_versions",
];
const VERSION_IMPORT: &str = "from .version import __version__  # noqa: F401";

fn python_templates() -> Vec<TemplateFile> {
    vec![
        TemplateFile::new("LICENSE").candidates(&["LICENSE", "LICENSE.md", "LICENSE.rst"]),
        TemplateFile::new("AUTHORS.rst").update_if_existing(false),
        TemplateFile::new("CONTRIBUTING.rst"),
        TemplateFile::new(".pre-commit-config.yaml").update_if_existing(false),
        TemplateFile::new(".flake8"),
        TemplateFile::new(".coveragerc"),
        TemplateFile::new(".git_archival.txt"),
        TemplateFile::new(".gitattributes").update_if_existing(false),
    ]
}

fn twincat_templates() -> Vec<TemplateFile> {
    let locked = |name: &str| TemplateFile::new(name).update_if_existing(false);
    vec![
        TemplateFile::new("LICENSE").candidates(&["LICENSE", "LICENSE.md", "LICENSE.rst"]),
        locked(".github/ISSUE_TEMPLATE.md"),
        locked(".github/PULL_REQUEST_TEMPLATE.md"),
        locked(".pre-commit-config.yaml"),
        locked(".gitignore"),
        locked(".gitattributes"),
        locked("README.md"),
    ]
}

/// A fix that could not be built, and why.
#[derive(Debug)]
pub struct CatalogFailure {
    pub name: String,
    pub error: MigrateError,
}

#[derive(Debug, Default)]
pub struct Catalog {
    pub fixes: Vec<Fix>,
    pub failures: Vec<CatalogFailure>,
}

impl Catalog {
    fn push(&mut self, fix: Fix) {
        debug!(fix = %fix.name, stage = %fix.stage, "fix needed");
        self.fixes.push(fix);
    }

    fn record(&mut self, name: &str, result: Result<Option<Fix>>) {
        match result {
            Ok(Some(fix)) => self.push(fix),
            Ok(None) => {}
            Err(error) => {
                warn!(fix = name, %error, "could not build fix");
                self.failures.push(CatalogFailure {
                    name: name.to_string(),
                    error,
                });
            }
        }
    }

    pub fn names(&self) -> Vec<&str> {
        self.fixes.iter().map(|fix| fix.name.as_str()).collect()
    }
}

pub struct FixCatalog<'a> {
    repo: &'a Repository,
    templates: &'a dyn TemplateRenderer,
    ci: &'a dyn CiTranslator,
}

impl<'a> FixCatalog<'a> {
    pub fn new(
        repo: &'a Repository,
        templates: &'a dyn TemplateRenderer,
        ci: &'a dyn CiTranslator,
    ) -> Self {
        Self {
            repo,
            templates,
            ci,
        }
    }

    pub fn build(&self) -> Result<Catalog> {
        self.build_with_progress(|_| {})
    }

    /// Fixes come out ordered by [`Stage`]. The style pass is decided last
    /// because it must leave alone every file another fix claims.
    pub fn build_with_progress(&self, mut on_stage: impl FnMut(Stage)) -> Result<Catalog> {
        if !has_git_repo(&self.repo.root) {
            return Err(MigrateError::NotARepository(self.repo.root.clone()));
        }

        let mut catalog = Catalog::default();
        for stage in Stage::ALL {
            if stage == Stage::StyleNormalization {
                continue;
            }
            on_stage(stage);
            match stage {
                Stage::ObsoleteFiles => self.obsolete_files(&mut catalog),
                Stage::StandardFiles => self.standard_files(&mut catalog),
                Stage::CiMigration => self.ci_migration(&mut catalog),
                Stage::ConfigTouchUps => self.config_touch_ups(&mut catalog),
                Stage::BuildMetadata => self.build_metadata(&mut catalog),
                Stage::Versioning => self.versioning(&mut catalog),
                Stage::StyleNormalization => {}
            }
        }
        if self.repo.profile == Profile::Python {
            on_stage(Stage::StyleNormalization);
            self.style_pass(&mut catalog);
        }

        catalog.fixes.sort_by_key(|fix| fix.stage);
        Ok(catalog)
    }

    fn obsolete_files(&self, catalog: &mut Catalog) {
        let defaults: &[&str] = match self.repo.profile {
            Profile::Python => PYTHON_OBSOLETE,
            Profile::Twincat => &[],
        };
        let obsolete: Vec<String> = match &self.repo.config.obsolete_files {
            Some(files) => files.clone(),
            None => defaults.iter().map(|f| f.to_string()).collect(),
        };
        for file in obsolete.iter().filter(|f| self.repo.exists(f)) {
            let name = Path::new(file)
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_else(|| file.clone());
            catalog.push(Fix::new(
                format!("remove_{}", slug(&name)),
                Stage::ObsoleteFiles,
                FixKind::DeleteFiles(DeleteFiles::new(vec![PathBuf::from(file)])),
            ));
        }

        if self.repo.profile == Profile::Twincat {
            let tokens = top_level_files_with_extension(&self.repo.root, "enc");
            if !tokens.is_empty() {
                catalog.push(Fix::new(
                    "remove_docs_tokens",
                    Stage::ObsoleteFiles,
                    FixKind::DeleteFiles(DeleteFiles::new(tokens)),
                ));
            }
        }
    }

    fn with_overrides(&self, file: TemplateFile) -> TemplateFile {
        let policy = self.repo.config.template_policy(&file.key());
        let add = policy.add_if_missing.unwrap_or(file.add_if_missing);
        let update = policy.update_if_existing.unwrap_or(file.update_if_existing);
        file.add_if_missing(add).update_if_existing(update)
    }

    fn standard_files(&self, catalog: &mut Catalog) {
        let files = match self.repo.profile {
            Profile::Python => python_templates(),
            Profile::Twincat => twincat_templates(),
        };
        let root = self.repo.profile.to_string();
        for file in files.into_iter().map(|f| self.with_overrides(f)) {
            let result = file.to_fix(self.repo, &root, Stage::StandardFiles, self.templates);
            catalog.record(&file.fix_name(), result);
        }
    }

    fn ci_migration(&self, catalog: &mut Catalog) {
        if self.repo.exists(TRAVIS_YML) {
            catalog.record("gha", self.travis_migration().map(Some));
        } else if self.repo.profile == Profile::Twincat && !self.repo.exists(WORKFLOW) {
            let workflow = TemplateFile::new("ci/standard.yml")
                .candidates(&[WORKFLOW])
                .arg("package_name", &self.repo.context.project_name)
                .arg("style_exclude", "")
                .named("add_gha_workflow");
            let result = workflow.to_fix(self.repo, "twincat", Stage::CiMigration, self.templates);
            catalog.record("add_gha_workflow", result);
        }
    }

    fn travis_migration(&self) -> Result<Fix> {
        let workflow = self
            .ci
            .translate(&self.repo.path(TRAVIS_YML), &self.repo.template_vars())?;
        let children = vec![
            Fix::new(
                "delete_travis",
                Stage::CiMigration,
                FixKind::DeleteFiles(DeleteFiles::new(vec![PathBuf::from(TRAVIS_YML)])),
            ),
            Fix::new(
                "add_gha_workflow",
                Stage::CiMigration,
                FixKind::AddFile(AddFile::new(WORKFLOW, &workflow)),
            ),
        ];
        Ok(Fix::new(
            "gha",
            Stage::CiMigration,
            FixKind::Composite(CompositeFix::new("CI: migrate to GitHub actions", children)),
        ))
    }

    fn config_touch_ups(&self, catalog: &mut Catalog) {
        if self.repo.profile != Profile::Python || !self.repo.exists(sphinx::CONF_PY) {
            return;
        }
        let result = read_text(&self.repo.path(sphinx::CONF_PY)).map(|original| {
            let updated = sphinx::touch_up(&original);
            (updated != original).then(|| {
                Fix::new(
                    "update_sphinx_config",
                    Stage::ConfigTouchUps,
                    FixKind::UpdateFile(UpdateFile::new(
                        sphinx::CONF_PY,
                        original,
                        &updated,
                        sphinx::COMMIT_MESSAGE,
                    )),
                )
            })
        });
        catalog.record("update_sphinx_config", result);
    }

    fn build_metadata(&self, catalog: &mut Catalog) {
        if self.repo.profile != Profile::Python {
            return;
        }
        let Some(script) = setup_py::SETUP_SCRIPTS
            .iter()
            .find(|script| self.repo.exists(script))
        else {
            return;
        };
        let result = setup_py::migrate(self.repo, self.templates)
            .map_err(MigrateError::from)
            .map(|pyproject| {
                let children = vec![
                    Fix::new(
                        "delete_setup_py",
                        Stage::BuildMetadata,
                        FixKind::DeleteFiles(
                            DeleteFiles::new(vec![
                                PathBuf::from(*script),
                                PathBuf::from(setup_py::SETUP_CFG),
                            ])
                            .missing_ok(true),
                        ),
                    ),
                    Fix::new(
                        "add_pyproject_toml",
                        Stage::BuildMetadata,
                        FixKind::AddFile(AddFile::new(setup_py::PYPROJECT_TOML, &pyproject)),
                    ),
                ];
                Some(Fix::new(
                    "pyproject_toml",
                    Stage::BuildMetadata,
                    FixKind::Composite(CompositeFix::new("BLD: migrate to pyproject.toml", children)),
                ))
            });
        catalog.record("pyproject_toml", result);
    }

    fn versioning(&self, catalog: &mut Catalog) {
        if self.repo.profile != Profile::Python {
            return;
        }
        let import_dir = self.repo.import_dir();
        let version_py = import_dir.join("version.py");
        if !self.repo.exists("versioneer.py") && self.repo.exists(&version_py) {
            return;
        }
        catalog.record("setuptools_scm", self.setuptools_scm_migration(&import_dir).map(Some));
    }

    fn setuptools_scm_migration(&self, import_dir: &Path) -> Result<Fix> {
        let init_py = import_dir.join("__init__.py");
        let mut children = vec![Fix::new(
            "delete_versioneer",
            Stage::Versioning,
            FixKind::DeleteFiles(
                DeleteFiles::new(vec![PathBuf::from("versioneer.py"), import_dir.join("_version.py")])
                    .missing_ok(true),
            ),
        )];
        if self.repo.exists(&init_py) {
            children.push(Fix::new(
                "versioneer_lines",
                Stage::Versioning,
                FixKind::RemoveLines(RemoveLines::new(&init_py, VERSIONEER_LINES)),
            ));
            children.push(Fix::new(
                "setuptools_scm_version",
                Stage::Versioning,
                FixKind::PrependLines(LineEdit::new(&init_py, &[VERSION_IMPORT])),
            ));
        }
        let dest = import_dir.join("version.py").to_string_lossy().replace('\\', "/");
        let version_py = TemplateFile::new("version.py")
            .candidates(&[dest.as_str()])
            .named("add_setuptools_version");
        if let Some(fix) = version_py.to_fix(self.repo, "python", Stage::Versioning, self.templates)? {
            children.push(fix);
        }
        Ok(Fix::new(
            "setuptools_scm",
            Stage::Versioning,
            FixKind::Composite(CompositeFix::new("BLD: migrate to setuptools-scm", children)),
        ))
    }

    fn in_style_scope(&self, path: &Path) -> bool {
        if path.extension().map_or(true, |ext| ext != "py") {
            return false;
        }
        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        let relative = path.to_string_lossy().replace('\\', "/");
        !STYLE_EXCLUDED.contains(&file_name.as_str())
            && !self
                .repo
                .config
                .style_exclude
                .iter()
                .any(|excluded| *excluded == file_name || *excluded == relative)
    }

    /// Sources owned by another fix take on the style rules through that
    /// fix; the rest are listed here when the rules would change them.
    fn style_pass(&self, catalog: &mut Catalog) {
        let rules = StyleRules::new(self.repo.python_version);
        let in_scope = |path: &Path| self.in_style_scope(path);
        for fix in &mut catalog.fixes {
            fix.adopt_style(&rules, &in_scope);
        }

        let claimed: BTreeSet<PathBuf> = catalog.fixes.iter().flat_map(Fix::files).collect();
        let mut files = Vec::new();
        for source in find_python_sources(&self.repo.root) {
            if claimed.contains(&source) || !in_scope(source.as_path()) {
                continue;
            }
            match read_optional(&self.repo.path(&source)) {
                Ok(Some(text)) if rules.apply(&text) != text => files.push(source),
                Ok(_) => {}
                Err(error) => warn!(file = %source.display(), %error, "skipping unreadable source"),
            }
        }
        if !files.is_empty() {
            catalog.push(Fix::new(
                "normalize_style",
                Stage::StyleNormalization,
                FixKind::NormalizeStyle(NormalizeStyle { rules, files }),
            ));
        }
    }
}
