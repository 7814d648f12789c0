//! Unused package detection
//!
//! Every central pin is checked against the solution's resolved dependency
//! graph. The checks fan out through the bounded mapper; the packages found
//! unreferenced are removed from the manifest in one pass afterwards.

mod dotnet;

pub use dotnet::DotnetCli;

use crate::apply::{ApplyReport, MutationApplier};
use crate::config::CleanOptions;
use crate::domain::{AuditResult, Mutation};
use crate::error::{AuditError, ManifestError};
use crate::manifest::{central_entries, ManifestDocument};
use crate::mapper::{BoundedMapper, CancelToken, Outcome};
use crate::report::Reporter;
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info};

/// Captured output of one dependency-graph query
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AuditOutput {
    pub stdout: String,
    pub stderr: String,
    pub exit_code: Option<i32>,
}

impl AuditOutput {
    /// Output of a query that wrote only to stdout
    pub fn stdout(text: impl Into<String>) -> Self {
        Self {
            stdout: text.into(),
            exit_code: Some(0),
            ..Self::default()
        }
    }

    /// Output of a query that wrote diagnostics
    pub fn stderr(text: impl Into<String>) -> Self {
        Self {
            stderr: text.into(),
            exit_code: Some(1),
            ..Self::default()
        }
    }

    /// True when the diagnostic channel carries any non-whitespace text
    pub fn has_diagnostics(&self) -> bool {
        !self.stderr.trim().is_empty()
    }
}

/// Answers "which dependency paths lead to this package"
#[async_trait]
pub trait DependencyAuditor: Send + Sync {
    /// Command line shown when the query reports an error
    fn command_line(&self, solution: &Path, package: &str) -> String {
        format!("dotnet nuget why {} {}", solution.display(), package)
    }

    /// Query the dependency graph of `solution` for `package`
    async fn why(
        &self,
        solution: &Path,
        package: &str,
        cancel: &CancelToken,
    ) -> Result<AuditOutput, AuditError>;
}

/// Decide from the query output whether anything depends on `package`
pub fn classify(package: &str, stdout: &str) -> AuditResult {
    let marker = format!(" has the following dependency graph(s) for '{}':", package);
    if stdout.contains(&marker) {
        AuditResult::referenced(package)
    } else {
        AuditResult::unreferenced(package)
    }
}

/// Result of a `clean` run
#[derive(Debug, Clone, Default)]
pub struct CleanSummary {
    /// Packages that were queried
    pub audited: usize,
    /// Packages nothing depends on, sorted by name
    pub unused: Vec<String>,
    /// Queries that failed, timed out or panicked
    pub errors: usize,
    /// Outcome of removing the unused pins
    pub applied: ApplyReport,
    /// Whether the run was interrupted
    pub cancelled: bool,
}

/// Audit every central pin of `doc` and remove the unreferenced ones
pub async fn run_clean(
    solution: &Path,
    doc: &mut dyn ManifestDocument,
    options: &CleanOptions,
    auditor: Arc<dyn DependencyAuditor>,
    reporter: Arc<dyn Reporter>,
    cancel: &CancelToken,
) -> Result<CleanSummary, ManifestError> {
    let packages = pinned_packages(doc);
    let mut summary = CleanSummary {
        audited: packages.len(),
        ..CleanSummary::default()
    };

    if packages.is_empty() {
        reporter.info(&format!(
            "No PackageVersion items found in {}",
            doc.path().display()
        ));
        return Ok(summary);
    }

    info!(count = packages.len(), solution = %solution.display(), "auditing packages");

    let progress = reporter.progress(packages.len(), "Auditing packages");
    let mapper = BoundedMapper::new(options.parallelism)
        .with_timeout(options.item_timeout)
        .with_progress(progress.clone());

    let solution_path = solution.to_path_buf();
    let worker_reporter = Arc::clone(&reporter);
    let report = mapper
        .run(packages, cancel, move |package: String, cancel| {
            let auditor = Arc::clone(&auditor);
            let reporter = Arc::clone(&worker_reporter);
            let solution = solution_path.clone();
            async move { audit_one(auditor, reporter, solution, package, cancel).await }
        })
        .await;
    progress.finish_and_clear();

    for failure in &report.failures {
        reporter.error(failure);
    }
    summary.errors = report.errors();
    summary.cancelled = report.cancelled;
    if report.cancelled {
        debug!(
            completed = report.completed(),
            not_started = report.not_started,
            "clean cancelled, manifest left untouched"
        );
        return Ok(summary);
    }

    let mut unused: Vec<String> = report
        .into_successes()
        .into_iter()
        .filter(|result| !result.referenced)
        .map(|result| result.package)
        .collect();
    unused.sort_by_key(|name| name.to_ascii_lowercase());

    let mutations: Vec<Mutation> = unused
        .iter()
        .map(|package| {
            reporter.info(&format!("Package '{}' is not used", package));
            Mutation::remove_pin(package)
        })
        .collect();

    summary.applied =
        MutationApplier::new(options.dry_run).apply(doc, &mutations, reporter.as_ref())?;
    summary.unused = unused;
    Ok(summary)
}

async fn audit_one(
    auditor: Arc<dyn DependencyAuditor>,
    reporter: Arc<dyn Reporter>,
    solution: PathBuf,
    package: String,
    cancel: CancelToken,
) -> Outcome<AuditResult> {
    match auditor.why(&solution, &package, &cancel).await {
        Ok(output) if output.has_diagnostics() => {
            let command = auditor.command_line(&solution, &package);
            debug!(package = %package, exit_code = ?output.exit_code, "query wrote diagnostics");
            reporter.error(&format!("Error running `{}`", command));
            reporter.error(output.stderr.trim_end());
            Outcome::Error(format!("{}: {}", package, output.stderr.trim()))
        }
        Ok(output) => {
            let result = classify(&package, &output.stdout);
            debug!(
                package = %package,
                referenced = result.referenced,
                exit_code = ?output.exit_code,
                "classified"
            );
            Outcome::Success(result)
        }
        Err(AuditError::Cancelled { .. }) => Outcome::Skip,
        Err(e) => {
            reporter.error(&e.to_string());
            Outcome::Error(e.to_string())
        }
    }
}

/// Central pin names, first spelling wins for case variants
fn pinned_packages(doc: &dyn ManifestDocument) -> Vec<String> {
    let mut names: Vec<String> = Vec::new();
    for entry in central_entries(doc) {
        if !names.iter().any(|n| n.eq_ignore_ascii_case(&entry.name)) {
            names.push(entry.name);
        }
    }
    names
}
