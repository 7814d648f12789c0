//! Per-package results and the document mutations they reduce to

use super::{ItemKind, NuGetVersion};
use std::fmt;

/// Whether a declared package is consumed anywhere in the solution
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuditResult {
    /// Package id
    pub package: String,
    /// True when the dependency-graph query found at least one path to it
    pub referenced: bool,
}

impl AuditResult {
    /// Creates a result for a package that is in use
    pub fn referenced(package: impl Into<String>) -> Self {
        Self {
            package: package.into(),
            referenced: true,
        }
    }

    /// Creates a result for a package nothing depends on
    pub fn unreferenced(package: impl Into<String>) -> Self {
        Self {
            package: package.into(),
            referenced: false,
        }
    }
}

/// A package whose declared version is older than the registry candidate
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VersionUpdate {
    /// Package id
    pub package: String,
    /// Version currently declared
    pub current: NuGetVersion,
    /// Version to move to
    pub candidate: NuGetVersion,
}

impl VersionUpdate {
    /// Creates a new update record
    pub fn new(package: impl Into<String>, current: NuGetVersion, candidate: NuGetVersion) -> Self {
        Self {
            package: package.into(),
            current,
            candidate,
        }
    }
}

impl fmt::Display for VersionUpdate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {} → {}", self.package, self.current, self.candidate)
    }
}

/// A single edit to the manifest document
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Mutation {
    /// Remove the first item of `kind` whose Include matches `package`
    Remove { kind: ItemKind, package: String },
    /// Overwrite the Version metadata, preferring the central pin
    SetVersion { package: String, version: String },
}

impl Mutation {
    /// Creates a Remove mutation for a central pin
    pub fn remove_pin(package: impl Into<String>) -> Self {
        Mutation::Remove {
            kind: ItemKind::PackageVersion,
            package: package.into(),
        }
    }

    /// Creates a SetVersion mutation
    pub fn set_version(package: impl Into<String>, version: impl Into<String>) -> Self {
        Mutation::SetVersion {
            package: package.into(),
            version: version.into(),
        }
    }

    /// Returns the package name this mutation targets
    pub fn package(&self) -> &str {
        match self {
            Mutation::Remove { package, .. } => package,
            Mutation::SetVersion { package, .. } => package,
        }
    }
}

impl From<&VersionUpdate> for Mutation {
    fn from(update: &VersionUpdate) -> Self {
        Mutation::set_version(&update.package, update.candidate.to_string())
    }
}

impl fmt::Display for Mutation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Mutation::Remove { kind, package } => write!(f, "remove {} {}", kind, package),
            Mutation::SetVersion { package, version } => {
                write!(f, "set {} Version={}", package, version)
            }
        }
    }
}
