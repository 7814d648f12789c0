//! Subcommand registry
//!
//! Commands are listed in a static table of (name, factory) pairs; the root
//! CLI is built from that table and dispatch looks names up in it.

mod clean;
mod upgrade;

pub use clean::CleanCommand;
pub use upgrade::UpgradeCommand;

use crate::cli::root_command;
use crate::error::AppError;
use crate::mapper::CancelToken;
use crate::report::Reporter;
use async_trait::async_trait;
use clap::{ArgMatches, Command};
use std::path::PathBuf;
use std::sync::Arc;

/// How a command finished
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommandStatus {
    /// Ran to the end, including soft failures and setup no-ops
    Completed,
    /// Stopped early by cancellation
    Cancelled,
}

/// Everything a command needs from the process
#[derive(Clone)]
pub struct CommandContext {
    /// Where lines for the operator go
    pub reporter: Arc<dyn Reporter>,
    /// Triggered by Ctrl-C
    pub cancel: CancelToken,
    /// Directory the command was started in
    pub working_dir: PathBuf,
}

/// A subcommand: its clap definition and how to run it
#[async_trait]
pub trait CommandDefinition: Send + Sync {
    /// Subcommand name
    fn name(&self) -> &'static str;

    /// clap definition of the subcommand
    fn command(&self) -> Command;

    /// Run with the subcommand's matches
    async fn run(
        &self,
        matches: &ArgMatches,
        context: &CommandContext,
    ) -> Result<CommandStatus, AppError>;
}

/// Creates a command definition
pub type CommandFactory = fn() -> Box<dyn CommandDefinition>;

/// Every subcommand, in help order
pub static REGISTRY: &[(&str, CommandFactory)] = &[
    ("clean", CleanCommand::factory),
    ("upgrade", UpgradeCommand::factory),
];

/// Instantiate the command registered under `name`
pub fn lookup(name: &str) -> Option<Box<dyn CommandDefinition>> {
    REGISTRY
        .iter()
        .find(|(registered, _)| *registered == name)
        .map(|(_, factory)| factory())
}

/// Root command with every registered subcommand attached
pub fn build_cli() -> Command {
    REGISTRY
        .iter()
        .fold(root_command(), |root, (_, factory)| {
            root.subcommand(factory().command())
        })
}
