//! `clean`: remove package pins nothing in the solution uses

use super::{CommandContext, CommandDefinition, CommandStatus};
use crate::audit::{run_clean, DependencyAuditor, DotnetCli};
use crate::cli::{parse_args, CleanArgs};
use crate::error::AppError;
use crate::manifest::{find_solution, manifest_beside, MsBuildDocument, SolutionLookup};
use async_trait::async_trait;
use clap::{ArgMatches, Args, Command};
use std::sync::Arc;
use tracing::debug;

/// The `clean` subcommand
pub struct CleanCommand;

impl CleanCommand {
    /// Boxed instance for the command registry
    pub fn factory() -> Box<dyn CommandDefinition> {
        Box::new(CleanCommand)
    }
}

#[async_trait]
impl CommandDefinition for CleanCommand {
    fn name(&self) -> &'static str {
        "clean"
    }

    fn command(&self) -> Command {
        CleanArgs::augment_args(
            Command::new(self.name())
                .about("Remove unused packages from Directory.Packages.props"),
        )
    }

    async fn run(
        &self,
        matches: &ArgMatches,
        context: &CommandContext,
    ) -> Result<CommandStatus, AppError> {
        let args: CleanArgs = parse_args(matches)?;
        let options = args.into_options(&context.working_dir)?;
        let reporter = Arc::clone(&context.reporter);

        let solution = match find_solution(&options.directory) {
            SolutionLookup::Found(path) => path,
            SolutionLookup::Missing => {
                reporter.info("No solution file found in the current directory");
                return Ok(CommandStatus::Completed);
            }
            SolutionLookup::Ambiguous(found) => {
                let names: Vec<String> = found
                    .iter()
                    .filter_map(|p| p.file_name())
                    .map(|n| n.to_string_lossy().into_owned())
                    .collect();
                reporter.info(&format!(
                    "Multiple solution files found in the current directory: {}",
                    names.join(", ")
                ));
                return Ok(CommandStatus::Completed);
            }
        };

        let manifest = manifest_beside(&solution);
        if !manifest.is_file() {
            reporter.info("No Directory.Packages.props file found in the solution directory");
            return Ok(CommandStatus::Completed);
        }

        let mut doc = MsBuildDocument::load(&manifest)?;
        let auditor: Arc<dyn DependencyAuditor> = Arc::new(DotnetCli::new());
        let summary = run_clean(
            &solution,
            &mut doc,
            &options,
            auditor,
            reporter,
            &context.cancel,
        )
        .await?;

        debug!(
            audited = summary.audited,
            unused = summary.unused.len(),
            errors = summary.errors,
            saved = summary.applied.saved,
            "clean finished"
        );

        Ok(if summary.cancelled {
            CommandStatus::Cancelled
        } else {
            CommandStatus::Completed
        })
    }
}
