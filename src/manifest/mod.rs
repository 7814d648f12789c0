//! Manifest document access
//!
//! This module provides:
//! - The `ManifestDocument` trait the pipeline edits through
//! - A format-preserving MSBuild implementation (`MsBuildDocument`)
//! - Solution and `Directory.Packages.props` discovery

mod discovery;
mod msbuild;

pub use discovery::{find_solution, manifest_beside, SolutionLookup, MANIFEST_FILENAME};
pub use msbuild::MsBuildDocument;

use crate::domain::{dedup_entries, ItemKind, PackageEntry};
use crate::error::ManifestError;
use std::path::Path;

/// One package item as currently present in a document
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ManifestItem {
    /// Item kind
    pub kind: ItemKind,
    /// Value of the `Include` attribute
    pub include: String,
    /// `Version` metadata, attribute or child element
    pub version: Option<String>,
}

/// Editable manifest document
///
/// Item names match ASCII case-insensitively. Edits only touch the in-memory
/// model until `save` is called.
pub trait ManifestDocument: Send {
    /// File the document was loaded from and will be saved to
    fn path(&self) -> &Path;

    /// Items of the given kind in document order
    fn items(&self, kind: ItemKind) -> Vec<ManifestItem>;

    /// Set metadata `name` on the first item of `kind` named `include`,
    /// adding it as an attribute when absent
    fn set_metadata(
        &mut self,
        kind: ItemKind,
        include: &str,
        name: &str,
        value: &str,
    ) -> Result<(), ManifestError>;

    /// Remove the first item of `kind` named `include`
    fn remove_item(&mut self, kind: ItemKind, include: &str) -> Result<(), ManifestError>;

    /// Persist the document
    fn save(&mut self) -> Result<(), ManifestError>;

    /// Returns true if an item of `kind` named `include` exists
    fn contains(&self, kind: ItemKind, include: &str) -> bool {
        self.items(kind)
            .iter()
            .any(|item| item.include.eq_ignore_ascii_case(include))
    }
}

/// Central pins with their declared versions
pub fn central_entries(doc: &dyn ManifestDocument) -> Vec<PackageEntry> {
    doc.items(ItemKind::PackageVersion)
        .into_iter()
        .map(|item| PackageEntry::central(item.include, item.version.unwrap_or_default()))
        .collect()
}

/// Every versioned package declaration, pins first, deduplicated by (name, version)
///
/// References without a `Version` take their version from a central pin and
/// are left out.
pub fn collect_entries(doc: &dyn ManifestDocument) -> Vec<PackageEntry> {
    let mut entries = central_entries(doc);
    entries.extend(
        doc.items(ItemKind::PackageReference)
            .into_iter()
            .filter_map(|item| {
                item.version
                    .map(|version| PackageEntry::reference(item.include, version))
            }),
    );
    dedup_entries(entries)
}
