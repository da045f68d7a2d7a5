use anyhow::Result;
use colored::*;

use crate::core::repository::Repository;
use crate::fixers::catalog::CatalogFailure;
use crate::fixers::runner::{FixOutcome, FixPreview, RunReport};

pub struct OutputFormatter {
    format: String,
}

impl OutputFormatter {
    pub fn new(format: &str) -> Self {
        Self {
            format: format.to_string(),
        }
    }

    pub fn is_json(&self) -> bool {
        self.format == "json"
    }

    /// Printed before anything is applied. JSON output waits for the report.
    pub fn display_preview(&self, repo: &Repository, previews: &[FixPreview]) {
        if self.is_json() {
            return;
        }

        println!();
        println!("{}", format!("repomigrate v{}", env!("CARGO_PKG_VERSION")).bold());
        println!("{}", "─".repeat(64));
        println!();
        println!("  Repository: {}", repo.root.to_string_lossy().cyan());
        println!(
            "  Profile:    {} (Python {})",
            repo.profile.to_string().green(),
            repo.python_version
        );
        println!();
        println!("{}", "─".repeat(64));

        if previews.is_empty() {
            println!();
            println!("  {}", "Nothing to do; the repository is up to date.".green());
            println!();
            return;
        }

        for preview in previews {
            println!();
            if preview.skipped {
                println!("  {} {}", "SKIP".yellow(), preview.name);
                continue;
            }
            println!("  {}", format!("## {}", preview.name).bold());
            if let Some(description) = &preview.description {
                for line in description.lines() {
                    println!("    {}", line);
                }
            }
            if !preview.commit_message.is_empty() {
                println!("    {}", format!("Commit: {}", preview.commit_message).dimmed());
            }
        }
        println!();
    }

    pub fn display_failures(&self, failures: &[CatalogFailure]) {
        if self.is_json() {
            return;
        }
        for failure in failures {
            println!(
                "  {} [{}] could not be prepared: {}",
                "ERROR".red(),
                failure.name,
                failure.error
            );
        }
    }

    pub fn display_report(
        &self,
        repo: &Repository,
        failures: &[CatalogFailure],
        report: &RunReport,
    ) -> Result<()> {
        if self.is_json() {
            self.display_json(repo, failures, report)
        } else {
            self.display_summary(report);
            Ok(())
        }
    }

    fn display_json(
        &self,
        repo: &Repository,
        failures: &[CatalogFailure],
        report: &RunReport,
    ) -> Result<()> {
        let failures: Vec<_> = failures
            .iter()
            .map(|f| serde_json::json!({ "name": f.name, "error": f.error.to_string() }))
            .collect();
        let output = serde_json::json!({
            "repository": repo.root.to_string_lossy(),
            "profile": repo.profile,
            "python_version": repo.python_version.to_string(),
            "catalog_failures": failures,
            "dry_run": report.dry_run,
            "aborted": report.aborted,
            "fixes": report.previews,
            "results": report.records,
        });
        println!("{}", serde_json::to_string_pretty(&output)?);
        Ok(())
    }

    fn display_summary(&self, report: &RunReport) {
        println!("{}", "─".repeat(64));
        if report.dry_run {
            let pending = report.previews.iter().filter(|p| !p.skipped).count();
            println!();
            println!(
                "  {} {} fix(es) previewed. Re-run with {} to apply them.",
                "DRY-RUN".cyan(),
                pending,
                "--write".bold()
            );
            println!();
            return;
        }

        println!();
        for record in &report.records {
            let committed = if record.committed {
                " (committed)".dimmed().to_string()
            } else {
                String::new()
            };
            match &record.outcome {
                FixOutcome::Applied => {
                    println!("  {} {}{}", "FIXED".green(), record.name, committed)
                }
                FixOutcome::Failed(err) => {
                    println!("  {} {}: {}", "ERROR".red(), record.name, err)
                }
                FixOutcome::CommitFailed(err) => println!(
                    "  {} {}: commit failed: {}",
                    "WARN".yellow(),
                    record.name,
                    err
                ),
            }
        }

        println!();
        println!(
            "  {} applied, {} failed, {} commit(s) created.",
            report.records.len() - report.failures(),
            report.failures(),
            report.commits()
        );
        if report.aborted {
            println!("  {}", "Stopped by operator; remaining fixes were not run.".yellow());
        }
        println!();
    }
}
