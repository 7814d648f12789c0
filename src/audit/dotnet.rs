//! `dotnet nuget why` runner

use super::{AuditOutput, DependencyAuditor};
use crate::error::AuditError;
use crate::mapper::CancelToken;
use async_trait::async_trait;
use std::path::Path;
use std::process::Stdio;
use tokio::process::Command;
use tracing::debug;

/// Runs the .NET CLI as a child process
#[derive(Debug, Clone)]
pub struct DotnetCli {
    program: String,
}

impl DotnetCli {
    /// Use `dotnet` from PATH
    pub fn new() -> Self {
        Self::with_program("dotnet")
    }

    /// Use a specific executable
    pub fn with_program(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
        }
    }
}

impl Default for DotnetCli {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl DependencyAuditor for DotnetCli {
    fn command_line(&self, solution: &Path, package: &str) -> String {
        format!(
            "{} nuget why {} {}",
            self.program,
            solution.display(),
            package
        )
    }

    async fn why(
        &self,
        solution: &Path,
        package: &str,
        cancel: &CancelToken,
    ) -> Result<AuditOutput, AuditError> {
        let command = self.command_line(solution, package);

        let child = Command::new(&self.program)
            .arg("nuget")
            .arg("why")
            .arg(solution)
            .arg(package)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| AuditError::spawn_failed(&command, e))?;

        let output = tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                debug!(%command, "cancelled, killing child");
                return Err(AuditError::Cancelled { command });
            }
            // drains stdout and stderr concurrently
            output = child.wait_with_output() => {
                output.map_err(|e| AuditError::wait_failed(&command, e))?
            }
        };

        debug!(%command, status = ?output.status.code(), "audit finished");

        Ok(AuditOutput {
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
            exit_code: output.status.code(),
        })
    }
}
