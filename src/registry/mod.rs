//! Package registry access
//!
//! - HTTP client shared foundation with retry logic
//! - NuGet V3 adapter (service index + flat container)

mod client;
mod nuget;

pub use client::HttpClient;
pub use nuget::NuGetRegistry;

use crate::domain::NuGetVersion;
use crate::error::RegistryError;
use async_trait::async_trait;

/// Source of published package versions
#[async_trait]
pub trait RegistryClient: Send + Sync {
    /// Get the registry name
    fn registry_name(&self) -> &str;

    /// Every published version of `package`, ascending
    ///
    /// An unknown package yields an empty list rather than an error.
    async fn all_versions(&self, package: &str) -> Result<Vec<NuGetVersion>, RegistryError>;
}
