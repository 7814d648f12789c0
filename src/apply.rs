//! Applying reduced mutations to the manifest document
//!
//! Runs on the calling task after every worker has finished. The document is
//! saved at most once, and only when something actually changed.

use crate::domain::{ItemKind, Mutation};
use crate::error::ManifestError;
use crate::manifest::ManifestDocument;
use crate::report::Reporter;
use tracing::{debug, warn};

/// What happened when a batch of mutations was applied
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ApplyReport {
    /// Mutations that changed the document
    pub applied: usize,
    /// Mutations whose target was missing, with the reason
    pub failed: Vec<String>,
    /// Whether the document was written
    pub saved: bool,
}

/// Applies mutations and persists the document once
#[derive(Debug, Clone, Copy)]
pub struct MutationApplier {
    dry_run: bool,
}

impl MutationApplier {
    /// Create an applier; a dry-run applier never touches the document
    pub fn new(dry_run: bool) -> Self {
        Self { dry_run }
    }

    /// Apply `mutations` in order, then save if anything was applied
    ///
    /// A mutation that fails is reported and skipped. Only a failed save is
    /// returned as an error.
    pub fn apply(
        &self,
        doc: &mut dyn ManifestDocument,
        mutations: &[Mutation],
        reporter: &dyn Reporter,
    ) -> Result<ApplyReport, ManifestError> {
        let mut report = ApplyReport::default();
        if self.dry_run {
            debug!(count = mutations.len(), "dry run, skipping mutations");
            return Ok(report);
        }

        for mutation in mutations {
            match apply_one(doc, mutation) {
                Ok(()) => {
                    debug!(%mutation, "applied");
                    report.applied += 1;
                }
                Err(e) => {
                    warn!(%mutation, error = %e, "mutation failed");
                    reporter.warn(&e.to_string());
                    report.failed.push(e.to_string());
                }
            }
        }

        if report.applied > 0 {
            doc.save()?;
            report.saved = true;
        }

        Ok(report)
    }
}

fn apply_one(doc: &mut dyn ManifestDocument, mutation: &Mutation) -> Result<(), ManifestError> {
    match mutation {
        Mutation::Remove { kind, package } => doc.remove_item(*kind, package),
        Mutation::SetVersion { package, version } => {
            let kind = if doc.contains(ItemKind::PackageVersion, package) {
                ItemKind::PackageVersion
            } else {
                ItemKind::PackageReference
            };
            doc.set_metadata(kind, package, "Version", version)
        }
    }
}
