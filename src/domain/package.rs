//! Package declarations read from an MSBuild manifest

use std::fmt;

/// The MSBuild item types that declare packages
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ItemKind {
    /// Central pin in Directory.Packages.props
    PackageVersion,
    /// Per-project reference, optionally carrying its own version
    PackageReference,
}

impl ItemKind {
    /// MSBuild element name for this kind
    pub fn element_name(&self) -> &'static str {
        match self {
            ItemKind::PackageVersion => "PackageVersion",
            ItemKind::PackageReference => "PackageReference",
        }
    }
}

impl fmt::Display for ItemKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.element_name())
    }
}

/// A package declared in the manifest together with its declared version text
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PackageEntry {
    /// Package id as written in the `Include` attribute
    pub name: String,
    /// Declared version string, not yet parsed
    pub version: String,
    /// Which item type declared it
    pub kind: ItemKind,
}

impl PackageEntry {
    /// Creates a new package entry
    pub fn new(name: impl Into<String>, version: impl Into<String>, kind: ItemKind) -> Self {
        Self {
            name: name.into(),
            version: version.into(),
            kind,
        }
    }

    /// Creates a central pin entry
    pub fn central(name: impl Into<String>, version: impl Into<String>) -> Self {
        Self::new(name, version, ItemKind::PackageVersion)
    }

    /// Creates a per-project reference entry
    pub fn reference(name: impl Into<String>, version: impl Into<String>) -> Self {
        Self::new(name, version, ItemKind::PackageReference)
    }
}

impl fmt::Display for PackageEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}@{} [{}]", self.name, self.version, self.kind)
    }
}

/// Removes entries that repeat an earlier (name, version) pair, keeping the first.
///
/// Central pins are expected first, so when both kinds declare the same pair the
/// pin survives.
pub fn dedup_entries(entries: Vec<PackageEntry>) -> Vec<PackageEntry> {
    let mut seen: Vec<(String, String)> = Vec::new();
    let mut result = Vec::with_capacity(entries.len());

    for entry in entries {
        let key = (entry.name.to_ascii_lowercase(), entry.version.trim().to_string());
        if seen.contains(&key) {
            continue;
        }
        seen.push(key);
        result.push(entry);
    }

    result
}
