//! Validated options for each subcommand

use crate::error::ConfigError;
use std::path::PathBuf;
use std::thread;
use std::time::Duration;

/// Default number of concurrent registry lookups
pub const DEFAULT_UPGRADE_PARALLELISM: usize = 5;

/// Default per-package timeout in seconds
pub const DEFAULT_TIMEOUT_SECS: u64 = 300;

/// Default NuGet V3 service index
pub const DEFAULT_SOURCE: &str = "https://api.nuget.org/v3/index.json";

/// Default manifest for `upgrade`
pub const DEFAULT_MANIFEST_PATH: &str = "./Directory.Packages.props";

/// Audits run one `dotnet` process each, so default to the core count
pub fn default_clean_parallelism() -> usize {
    thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1)
}

/// Options for `clean`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CleanOptions {
    /// Directory searched for the solution file
    pub directory: PathBuf,
    /// Report only; leave the manifest untouched
    pub dry_run: bool,
    /// Maximum concurrent audits
    pub parallelism: usize,
    /// Limit for a single audit
    pub item_timeout: Duration,
}

impl CleanOptions {
    /// Validate raw values
    pub fn new(
        directory: impl Into<PathBuf>,
        dry_run: bool,
        parallelism: Option<usize>,
        timeout_secs: u64,
    ) -> Result<Self, ConfigError> {
        Ok(Self {
            directory: directory.into(),
            dry_run,
            parallelism: validate_parallelism(
                parallelism.unwrap_or_else(default_clean_parallelism),
            )?,
            item_timeout: validate_timeout(timeout_secs)?,
        })
    }
}

impl Default for CleanOptions {
    fn default() -> Self {
        Self {
            directory: PathBuf::from("."),
            dry_run: false,
            parallelism: default_clean_parallelism(),
            item_timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
        }
    }
}

/// Options for `upgrade`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UpgradeOptions {
    /// Manifest or project file to update
    pub path: PathBuf,
    /// Hide "is up to date" lines
    pub suppress: bool,
    /// Ignore pre-release versions when picking the latest
    pub stable_only: bool,
    /// Report only; leave the manifest untouched
    pub dry_run: bool,
    /// Maximum concurrent registry lookups
    pub parallelism: usize,
    /// Limit for a single lookup
    pub item_timeout: Duration,
    /// NuGet V3 service index URL
    pub source: String,
}

impl UpgradeOptions {
    /// Validate raw values; the manifest path must name an existing file
    pub fn new(
        path: impl Into<PathBuf>,
        suppress: bool,
        stable_only: bool,
        dry_run: bool,
        parallelism: usize,
        timeout_secs: u64,
        source: impl Into<String>,
    ) -> Result<Self, ConfigError> {
        let source = source.into();
        if source.trim().is_empty() {
            return Err(ConfigError::invalid_value(
                "source",
                "\"\"",
                "must be a service index URL",
            ));
        }

        Ok(Self {
            path: validate_manifest_path(path.into())?,
            suppress,
            stable_only,
            dry_run,
            parallelism: validate_parallelism(parallelism)?,
            item_timeout: validate_timeout(timeout_secs)?,
            source,
        })
    }
}

fn validate_parallelism(value: usize) -> Result<usize, ConfigError> {
    if value == 0 {
        return Err(ConfigError::invalid_value(
            "parallel",
            value,
            "must be at least 1",
        ));
    }
    Ok(value)
}

fn validate_timeout(secs: u64) -> Result<Duration, ConfigError> {
    if secs == 0 {
        return Err(ConfigError::invalid_value(
            "timeout",
            secs,
            "must be greater than 0",
        ));
    }
    Ok(Duration::from_secs(secs))
}

fn validate_manifest_path(path: PathBuf) -> Result<PathBuf, ConfigError> {
    if path.as_os_str().is_empty() {
        return Err(ConfigError::invalid_path(path, "path must not be empty"));
    }
    if !path.exists() {
        return Err(ConfigError::invalid_path(path, "file does not exist"));
    }
    if !path.is_file() {
        return Err(ConfigError::invalid_path(path, "not a file"));
    }
    Ok(path)
}
