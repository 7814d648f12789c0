//! CLI argument parsing module for nuget-helper
//!
//! Each subcommand owns an `Args` struct; the root command is assembled from
//! the command registry at startup.

use crate::config::{
    CleanOptions, UpgradeOptions, DEFAULT_MANIFEST_PATH, DEFAULT_SOURCE, DEFAULT_TIMEOUT_SECS,
    DEFAULT_UPGRADE_PARALLELISM,
};
use crate::error::ConfigError;
use clap::{ArgAction, ArgMatches, Args, Command, FromArgMatches};
use std::path::Path;

/// Root command name
pub const BIN_NAME: &str = "nuget-helper";

/// Options shared by every subcommand
#[derive(Args, Debug, Clone, Default, PartialEq, Eq)]
pub struct GlobalArgs {
    /// Enable debug logging on stderr
    #[arg(long, global = true)]
    pub verbose: bool,

    /// Enable quiet mode - no progress bar
    #[arg(short, long, global = true)]
    pub quiet: bool,
}

/// Arguments of `clean`
#[derive(Args, Debug, Clone, PartialEq, Eq)]
pub struct CleanArgs {
    /// Only list unused packages, leave Directory.Packages.props untouched
    #[arg(short = 'd', long)]
    pub dry_run: bool,

    /// Maximum concurrent `dotnet nuget why` processes (default: number of CPUs)
    #[arg(long, value_name = "N")]
    pub parallel: Option<usize>,

    /// Seconds before a single audit is abandoned
    #[arg(long, value_name = "SECS", default_value_t = DEFAULT_TIMEOUT_SECS)]
    pub timeout: u64,
}

impl CleanArgs {
    /// Validate into options, searching `directory` for the solution
    pub fn into_options(self, directory: &Path) -> Result<CleanOptions, ConfigError> {
        CleanOptions::new(directory, self.dry_run, self.parallel, self.timeout)
    }
}

/// Arguments of `upgrade`
#[derive(Args, Debug, Clone, PartialEq, Eq)]
pub struct UpgradeArgs {
    /// Path to project or Directory.Packages.props file
    #[arg(long, value_name = "FILE", default_value = DEFAULT_MANIFEST_PATH)]
    pub path: String,

    /// Hide packages that are already up to date
    #[arg(
        long,
        value_name = "BOOL",
        default_value_t = true,
        action = ArgAction::Set,
        num_args = 0..=1,
        require_equals = true,
        default_missing_value = "true"
    )]
    pub suppress: bool,

    /// Only consider stable (non pre-release) versions
    #[arg(
        long,
        value_name = "BOOL",
        default_value_t = true,
        action = ArgAction::Set,
        num_args = 0..=1,
        require_equals = true,
        default_missing_value = "true"
    )]
    pub stable: bool,

    /// Report updates without writing them
    #[arg(
        long,
        value_name = "BOOL",
        default_value_t = false,
        action = ArgAction::Set,
        num_args = 0..=1,
        require_equals = true,
        default_missing_value = "true"
    )]
    pub dry_run: bool,

    /// Maximum concurrent registry lookups
    #[arg(long, value_name = "N", default_value_t = DEFAULT_UPGRADE_PARALLELISM)]
    pub parallel: usize,

    /// Seconds before a single lookup is abandoned
    #[arg(long, value_name = "SECS", default_value_t = DEFAULT_TIMEOUT_SECS)]
    pub timeout: u64,

    /// NuGet V3 service index
    #[arg(long, value_name = "URL", default_value = DEFAULT_SOURCE)]
    pub source: String,
}

impl UpgradeArgs {
    /// Validate into options; fails when the manifest path is empty or missing
    pub fn into_options(self) -> Result<UpgradeOptions, ConfigError> {
        UpgradeOptions::new(
            self.path,
            self.suppress,
            self.stable,
            self.dry_run,
            self.parallel,
            self.timeout,
            self.source,
        )
    }
}

/// Root command without subcommands
pub fn root_command() -> Command {
    let root = Command::new(BIN_NAME)
        .about("NuGet helper tool")
        .version(env!("CARGO_PKG_VERSION"))
        .subcommand_required(true)
        .arg_required_else_help(true);
    GlobalArgs::augment_args(root)
}

/// Read typed arguments back out of parsed matches
pub fn parse_args<A: FromArgMatches>(matches: &ArgMatches) -> Result<A, ConfigError> {
    A::from_arg_matches(matches).map_err(|e| ConfigError::Arguments(e.to_string()))
}
