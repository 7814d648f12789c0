//! `upgrade`: move declared packages to their latest registry version

use super::{CommandContext, CommandDefinition, CommandStatus};
use crate::cli::{parse_args, UpgradeArgs};
use crate::error::AppError;
use crate::manifest::MsBuildDocument;
use crate::registry::{HttpClient, NuGetRegistry, RegistryClient};
use crate::upgrade::run_upgrade;
use async_trait::async_trait;
use clap::{ArgMatches, Args, Command};
use std::sync::Arc;
use tracing::debug;

/// The `upgrade` subcommand
pub struct UpgradeCommand;

impl UpgradeCommand {
    /// Boxed instance for the command registry
    pub fn factory() -> Box<dyn CommandDefinition> {
        Box::new(UpgradeCommand)
    }
}

#[async_trait]
impl CommandDefinition for UpgradeCommand {
    fn name(&self) -> &'static str {
        "upgrade"
    }

    fn command(&self) -> Command {
        UpgradeArgs::augment_args(
            Command::new(self.name())
                .about(
                    "Upgrade all NuGet packages (csproj or CPM), including transitive pinned versions",
                )
                .after_help(
                    "Versions written as $(Property) are read from and written to unconditional \
                     properties in the same file; other property references are reported as unparsable.",
                ),
        )
    }

    async fn run(
        &self,
        matches: &ArgMatches,
        context: &CommandContext,
    ) -> Result<CommandStatus, AppError> {
        let args: UpgradeArgs = parse_args(matches)?;
        let options = args.into_options()?;

        let mut doc = MsBuildDocument::load(&options.path)?;
        let registry: Arc<dyn RegistryClient> = Arc::new(NuGetRegistry::new(
            HttpClient::new()?,
            options.source.clone(),
        ));

        let summary = run_upgrade(
            &mut doc,
            &options,
            registry,
            Arc::clone(&context.reporter),
            &context.cancel,
        )
        .await?;

        debug!(
            checked = summary.checked,
            updates = summary.updates.len(),
            skipped = summary.skipped,
            errors = summary.errors,
            saved = summary.applied.saved,
            "upgrade finished"
        );

        Ok(if summary.cancelled {
            CommandStatus::Cancelled
        } else {
            CommandStatus::Completed
        })
    }
}
