//! NuGet V3 registry adapter
//!
//! Resolves the `PackageBaseAddress/3.0.0` resource (flat container) from the
//! service index once, then lists versions from
//! `{base}/{lowercase id}/index.json`.

use crate::domain::NuGetVersion;
use crate::error::RegistryError;
use crate::registry::{HttpClient, RegistryClient};
use async_trait::async_trait;
use serde::Deserialize;
use tokio::sync::OnceCell;
use tracing::debug;

const REGISTRY_NAME: &str = "NuGet";

const PACKAGE_BASE_ADDRESS: &str = "PackageBaseAddress/3.0.0";

/// Service index document
#[derive(Debug, Deserialize)]
struct ServiceIndex {
    #[serde(default)]
    resources: Vec<ServiceResource>,
}

#[derive(Debug, Deserialize)]
struct ServiceResource {
    #[serde(rename = "@id")]
    id: String,
    #[serde(rename = "@type")]
    kind: ResourceType,
}

/// `@type` is a string on nuget.org, an array on some private feeds
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum ResourceType {
    One(String),
    Many(Vec<String>),
}

impl ResourceType {
    fn is(&self, wanted: &str) -> bool {
        match self {
            ResourceType::One(kind) => kind == wanted,
            ResourceType::Many(kinds) => kinds.iter().any(|k| k == wanted),
        }
    }
}

/// Flat container version list
#[derive(Debug, Deserialize)]
struct VersionList {
    #[serde(default)]
    versions: Vec<String>,
}

/// NuGet V3 adapter
pub struct NuGetRegistry {
    client: HttpClient,
    source: String,
    base_address: OnceCell<String>,
}

impl NuGetRegistry {
    /// Create an adapter for the service index at `source`
    pub fn new(client: HttpClient, source: impl Into<String>) -> Self {
        Self {
            client,
            source: source.into(),
            base_address: OnceCell::new(),
        }
    }

    async fn base_address(&self) -> Result<&str, RegistryError> {
        let base = self
            .base_address
            .get_or_try_init(|| async {
                let index: ServiceIndex = self
                    .client
                    .get_json(&self.source, "", REGISTRY_NAME)
                    .await?;
                let base = package_base_address(&index).ok_or_else(|| {
                    RegistryError::MissingResource {
                        url: self.source.clone(),
                    }
                })?;
                debug!(source = %self.source, %base, "resolved package base address");
                Ok::<String, RegistryError>(base)
            })
            .await?;
        Ok(base.as_str())
    }
}

fn package_base_address(index: &ServiceIndex) -> Option<String> {
    index
        .resources
        .iter()
        .find(|r| r.kind.is(PACKAGE_BASE_ADDRESS))
        .map(|r| {
            if r.id.ends_with('/') {
                r.id.clone()
            } else {
                format!("{}/", r.id)
            }
        })
}

/// Flat container ids are lowercase
fn versions_url(base: &str, package: &str) -> String {
    format!("{}{}/index.json", base, package.to_lowercase())
}

/// Parse and sort registry versions, dropping anything unparsable
fn parse_versions(list: VersionList) -> Vec<NuGetVersion> {
    let mut versions: Vec<NuGetVersion> = list
        .versions
        .iter()
        .filter_map(|v| NuGetVersion::parse(v))
        .collect();
    versions.sort();
    versions
}

#[async_trait]
impl RegistryClient for NuGetRegistry {
    fn registry_name(&self) -> &str {
        REGISTRY_NAME
    }

    async fn all_versions(&self, package: &str) -> Result<Vec<NuGetVersion>, RegistryError> {
        let base = self.base_address().await?;
        let url = versions_url(base, package);

        match self
            .client
            .get_json::<VersionList>(&url, package, REGISTRY_NAME)
            .await
        {
            Ok(list) => Ok(parse_versions(list)),
            Err(RegistryError::PackageNotFound { .. }) => {
                debug!(package, "not in registry");
                Ok(Vec::new())
            }
            Err(e) => Err(e),
        }
    }
}
