//! Core domain models for nuget-helper
//!
//! - Package item kinds and declared entries
//! - NuGet version parsing and ordering
//! - Audit/upgrade results and the document mutations they produce

mod outcome;
mod package;
mod version;

pub use outcome::{AuditResult, Mutation, VersionUpdate};
pub use package::{dedup_entries, ItemKind, PackageEntry};
pub use version::NuGetVersion;
