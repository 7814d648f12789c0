//! Outdated package detection and upgrade
//!
//! Each declared (package, version) pair is looked up in the registry through
//! the bounded mapper. Updates found are collapsed per package and written to
//! the manifest in one pass.

use crate::apply::{ApplyReport, MutationApplier};
use crate::config::UpgradeOptions;
use crate::domain::{Mutation, NuGetVersion, PackageEntry, VersionUpdate};
use crate::error::ManifestError;
use crate::manifest::{collect_entries, ManifestDocument};
use crate::mapper::{BoundedMapper, CancelToken, Outcome};
use crate::registry::RegistryClient;
use crate::report::Reporter;
use std::sync::Arc;
use tracing::{debug, info};

/// Result of an `upgrade` run
#[derive(Debug, Clone, Default)]
pub struct UpgradeSummary {
    /// Declarations that were looked up
    pub checked: usize,
    /// One update per package, sorted by name
    pub updates: Vec<VersionUpdate>,
    /// Declarations skipped (unparsable, no candidate, up to date, dry run)
    pub skipped: usize,
    /// Lookups that failed, timed out or panicked
    pub errors: usize,
    /// Outcome of writing the new versions
    pub applied: ApplyReport,
    /// Whether the run was interrupted
    pub cancelled: bool,
}

/// Per-run switches the workers need
#[derive(Debug, Clone, Copy)]
struct Policy {
    stable_only: bool,
    suppress: bool,
    dry_run: bool,
}

/// Highest version, ignoring pre-releases when `stable_only`
pub fn select_latest(versions: &[NuGetVersion], stable_only: bool) -> Option<NuGetVersion> {
    versions
        .iter()
        .filter(|v| !stable_only || !v.is_prerelease())
        .max()
        .cloned()
}

/// Keep one update per package (case-insensitive), the highest candidate wins
pub fn collapse_updates(mut updates: Vec<VersionUpdate>) -> Vec<VersionUpdate> {
    updates.sort_by(|a, b| {
        a.package
            .to_ascii_lowercase()
            .cmp(&b.package.to_ascii_lowercase())
            .then_with(|| b.candidate.cmp(&a.candidate))
    });
    updates.dedup_by(|later, earlier| later.package.eq_ignore_ascii_case(&earlier.package));
    updates
}

/// Look up every versioned declaration in `doc` and move it to the latest version
pub async fn run_upgrade(
    doc: &mut dyn ManifestDocument,
    options: &UpgradeOptions,
    registry: Arc<dyn RegistryClient>,
    reporter: Arc<dyn Reporter>,
    cancel: &CancelToken,
) -> Result<UpgradeSummary, ManifestError> {
    let entries = collect_entries(doc);
    let mut summary = UpgradeSummary {
        checked: entries.len(),
        ..UpgradeSummary::default()
    };
    let policy = Policy {
        stable_only: options.stable_only,
        suppress: options.suppress,
        dry_run: options.dry_run,
    };

    info!(
        count = entries.len(),
        registry = registry.registry_name(),
        "checking packages"
    );

    let progress = reporter.progress(entries.len(), "Checking packages");
    let mapper = BoundedMapper::new(options.parallelism)
        .with_timeout(options.item_timeout)
        .with_progress(progress.clone());

    let worker_reporter = Arc::clone(&reporter);
    let report = mapper
        .run(entries, cancel, move |entry: PackageEntry, cancel| {
            let registry = Arc::clone(&registry);
            let reporter = Arc::clone(&worker_reporter);
            async move { check_one(registry, reporter, entry, policy, cancel).await }
        })
        .await;
    progress.finish_and_clear();

    for failure in &report.failures {
        reporter.error(failure);
    }
    summary.skipped = report.skipped();
    summary.errors = report.errors();
    summary.cancelled = report.cancelled;
    if report.cancelled {
        debug!(
            completed = report.completed(),
            not_started = report.not_started,
            "upgrade cancelled, manifest left untouched"
        );
        return Ok(summary);
    }

    let updates = collapse_updates(report.into_successes());
    let mutations: Vec<Mutation> = updates.iter().map(Mutation::from).collect();

    summary.applied =
        MutationApplier::new(options.dry_run).apply(doc, &mutations, reporter.as_ref())?;
    summary.updates = updates;

    reporter.info("Done");
    Ok(summary)
}

async fn check_one(
    registry: Arc<dyn RegistryClient>,
    reporter: Arc<dyn Reporter>,
    entry: PackageEntry,
    policy: Policy,
    cancel: CancelToken,
) -> Outcome<VersionUpdate> {
    let package = entry.name;
    let Some(current) = NuGetVersion::parse(&entry.version) else {
        reporter.warn(&format!("Could not parse version for {}", package));
        return Outcome::Skip;
    };

    let lookup = tokio::select! {
        biased;
        _ = cancel.cancelled() => return Outcome::Skip,
        lookup = registry.all_versions(&package) => lookup,
    };
    let versions = match lookup {
        Ok(versions) => versions,
        Err(e) => {
            reporter.error(&format!("Failed to fetch versions for {}: {}", package, e));
            return Outcome::Error(e.to_string());
        }
    };

    let Some(candidate) = select_latest(&versions, policy.stable_only) else {
        reporter.warn(&format!("Could not find latest version for {}", package));
        return Outcome::Skip;
    };

    if current < candidate {
        if policy.dry_run {
            reporter.info(&format!(
                "Update {} from {} to {}",
                package, current, candidate
            ));
            return Outcome::Skip;
        }
        reporter.info(&format!(
            "Updating {} from {} to {}",
            package, current, candidate
        ));
        return Outcome::Success(VersionUpdate::new(package, current, candidate));
    }

    if !policy.suppress {
        reporter.info(&format!("{} is up to date", package));
    }
    Outcome::Skip
}
