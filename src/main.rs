//! nuget-helper - NuGet package maintenance CLI
//!
//! Subcommands:
//! - clean: remove unused PackageVersion entries from Directory.Packages.props
//! - upgrade: move declared packages to their latest registry version

use nuget_helper::cli::{parse_args, GlobalArgs};
use nuget_helper::commands::{build_cli, lookup, CommandContext, CommandStatus};
use nuget_helper::mapper::CancelToken;
use nuget_helper::report::ConsoleReporter;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

/// Exit code after Ctrl-C
const EXIT_CANCELLED: u8 = 130;

#[tokio::main]
async fn main() -> ExitCode {
    let matches = match build_cli().try_get_matches() {
        Ok(matches) => matches,
        Err(e) => {
            let _ = e.print();
            return if e.use_stderr() {
                ExitCode::FAILURE
            } else {
                ExitCode::SUCCESS
            };
        }
    };

    match run(matches).await {
        Ok(CommandStatus::Completed) => ExitCode::SUCCESS,
        Ok(CommandStatus::Cancelled) => {
            eprintln!("Cancelled");
            ExitCode::from(EXIT_CANCELLED)
        }
        Err(e) => {
            eprintln!("Error: {:#}", e);
            ExitCode::FAILURE
        }
    }
}

/// Main application logic
async fn run(matches: clap::ArgMatches) -> anyhow::Result<CommandStatus> {
    let global: GlobalArgs = parse_args(&matches)?;
    init_tracing(global.verbose);

    let Some((name, sub_matches)) = matches.subcommand() else {
        anyhow::bail!("no subcommand given");
    };
    let Some(command) = lookup(name) else {
        anyhow::bail!("unknown command '{}'", name);
    };

    let cancel = CancelToken::new();
    let on_interrupt = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::debug!("interrupt received");
            on_interrupt.cancel();
        }
    });

    let context = CommandContext {
        reporter: Arc::new(ConsoleReporter::new(global.quiet)),
        cancel,
        working_dir: PathBuf::from("."),
    };

    tracing::debug!(command = name, version = env!("CARGO_PKG_VERSION"), "starting");
    Ok(command.run(sub_matches, &context).await?)
}

/// Logs go to stderr; `RUST_LOG` wins over `--verbose`
fn init_tracing(verbose: bool) {
    let default_level = if verbose { "debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}
