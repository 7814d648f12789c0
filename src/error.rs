//! Application error types using thiserror
//!
//! Error hierarchy:
//! - ManifestError: Issues reading, editing, or saving the MSBuild manifest
//! - RegistryError: Issues with NuGet registry communication
//! - AuditError: Issues running the dependency-graph query
//! - ConfigError: Invalid command-line configuration

use std::path::PathBuf;
use thiserror::Error;

/// Application-level error type
#[derive(Error, Debug)]
pub enum AppError {
    /// Manifest file related errors
    #[error(transparent)]
    Manifest(#[from] ManifestError),

    /// Package registry related errors
    #[error(transparent)]
    Registry(#[from] RegistryError),

    /// Dependency audit related errors
    #[error(transparent)]
    Audit(#[from] AuditError),

    /// Configuration related errors
    #[error(transparent)]
    Config(#[from] ConfigError),
}

/// Errors related to manifest file operations
#[derive(Error, Debug)]
pub enum ManifestError {
    /// Manifest file not found
    #[error("manifest file not found: {path}")]
    NotFound { path: PathBuf },

    /// Failed to read manifest file
    #[error("failed to read manifest file {path}: {source}")]
    ReadError {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Failed to write manifest file
    #[error("failed to write manifest file {path}: {source}")]
    WriteError {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// No item of the given kind and name exists in the document
    #[error("no {kind} item with Include=\"{name}\" in {path}")]
    ItemNotFound {
        path: PathBuf,
        kind: String,
        name: String,
    },
}

/// Errors related to package registry communication
#[derive(Error, Debug)]
pub enum RegistryError {
    /// Package not found in registry
    #[error("package '{package}' not found in {registry} registry")]
    PackageNotFound { package: String, registry: String },

    /// Network request failed
    #[error("failed to fetch package '{package}' from {registry}: {message}")]
    NetworkError {
        package: String,
        registry: String,
        message: String,
    },

    /// Rate limit exceeded
    #[error("rate limit exceeded for {registry} registry")]
    RateLimitExceeded { registry: String },

    /// Invalid response from registry
    #[error("invalid response from {registry} for '{package}': {message}")]
    InvalidResponse {
        package: String,
        registry: String,
        message: String,
    },

    /// Timeout
    #[error("timeout while fetching '{package}' from {registry}")]
    Timeout { package: String, registry: String },

    /// The service index does not advertise a usable package base address
    #[error("service index {url} does not advertise a PackageBaseAddress resource")]
    MissingResource { url: String },
}

/// Errors related to running the dependency-graph query
#[derive(Error, Debug)]
pub enum AuditError {
    /// The audit tool could not be started
    #[error("failed to start `{command}`: {source}")]
    SpawnFailed {
        command: String,
        #[source]
        source: std::io::Error,
    },

    /// Waiting for the audit tool failed
    #[error("failed to wait for `{command}`: {source}")]
    WaitFailed {
        command: String,
        #[source]
        source: std::io::Error,
    },

    /// The audit was interrupted by cancellation
    #[error("`{command}` was cancelled")]
    Cancelled { command: String },
}

/// Errors related to configuration
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Manifest path argument missing or pointing nowhere
    #[error("invalid path '{path}': {message}")]
    InvalidPath { path: PathBuf, message: String },

    /// A numeric option is out of range
    #[error("invalid value {value} for --{option}: {message}")]
    InvalidValue {
        option: String,
        value: String,
        message: String,
    },

    /// Command-line arguments could not be read back from clap
    #[error("invalid arguments: {0}")]
    Arguments(String),
}

impl ManifestError {
    /// Creates a new NotFound error
    pub fn not_found(path: impl Into<PathBuf>) -> Self {
        ManifestError::NotFound { path: path.into() }
    }

    /// Creates a new ReadError
    pub fn read_error(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        ManifestError::ReadError {
            path: path.into(),
            source,
        }
    }

    /// Creates a new WriteError
    pub fn write_error(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        ManifestError::WriteError {
            path: path.into(),
            source,
        }
    }

    /// Creates a new ItemNotFound error
    pub fn item_not_found(
        path: impl Into<PathBuf>,
        kind: impl Into<String>,
        name: impl Into<String>,
    ) -> Self {
        ManifestError::ItemNotFound {
            path: path.into(),
            kind: kind.into(),
            name: name.into(),
        }
    }
}

impl RegistryError {
    /// Creates a new PackageNotFound error
    pub fn package_not_found(package: impl Into<String>, registry: impl Into<String>) -> Self {
        RegistryError::PackageNotFound {
            package: package.into(),
            registry: registry.into(),
        }
    }

    /// Creates a new NetworkError
    pub fn network_error(
        package: impl Into<String>,
        registry: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        RegistryError::NetworkError {
            package: package.into(),
            registry: registry.into(),
            message: message.into(),
        }
    }

    /// Creates a new RateLimitExceeded error
    pub fn rate_limit_exceeded(registry: impl Into<String>) -> Self {
        RegistryError::RateLimitExceeded {
            registry: registry.into(),
        }
    }

    /// Creates a new Timeout error
    pub fn timeout(package: impl Into<String>, registry: impl Into<String>) -> Self {
        RegistryError::Timeout {
            package: package.into(),
            registry: registry.into(),
        }
    }
}

impl AuditError {
    /// Creates a new SpawnFailed error
    pub fn spawn_failed(command: impl Into<String>, source: std::io::Error) -> Self {
        AuditError::SpawnFailed {
            command: command.into(),
            source,
        }
    }

    /// Creates a new WaitFailed error
    pub fn wait_failed(command: impl Into<String>, source: std::io::Error) -> Self {
        AuditError::WaitFailed {
            command: command.into(),
            source,
        }
    }
}

impl ConfigError {
    /// Creates a new InvalidPath error
    pub fn invalid_path(path: impl Into<PathBuf>, message: impl Into<String>) -> Self {
        ConfigError::InvalidPath {
            path: path.into(),
            message: message.into(),
        }
    }

    /// Creates a new InvalidValue error
    pub fn invalid_value(
        option: impl Into<String>,
        value: impl ToString,
        message: impl Into<String>,
    ) -> Self {
        ConfigError::InvalidValue {
            option: option.into(),
            value: value.to_string(),
            message: message.into(),
        }
    }
}
