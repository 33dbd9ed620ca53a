//! Desktop companion launcher
//!
//! Opens the atest desktop application with the host's native "open" command.
//! Success means the command exited with status zero; whether the
//! application actually came up is not observed.

use std::sync::Arc;

use async_trait::async_trait;

use crate::handlers::NoArgs;
use crate::registry::ToolContext;
use crate::tools::ToolResult;
use crate::{Error, Result};

/// Name the desktop application is registered under
pub const DESKTOP_APP: &str = "atest-desktop";

/// A program and its arguments
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LaunchCommand {
    pub program: String,
    pub args: Vec<String>,
}

impl LaunchCommand {
    fn new(program: &str, args: &[&str]) -> Self {
        Self {
            program: program.to_string(),
            args: args.iter().map(|a| a.to_string()).collect(),
        }
    }
}

/// Command that opens the desktop app on `os` (as in `std::env::consts::OS`)
pub fn launch_command(os: &str) -> Result<LaunchCommand> {
    match os {
        "windows" => Ok(LaunchCommand::new("cmd", &["/C", "start", DESKTOP_APP])),
        "macos" => Ok(LaunchCommand::new("open", &["-a", DESKTOP_APP])),
        "linux" => Ok(LaunchCommand::new("xdg-open", &[DESKTOP_APP])),
        other => Err(Error::UnsupportedPlatform {
            os: other.to_string(),
        }),
    }
}

/// Exit information from a finished command
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandOutput {
    pub code: Option<i32>,
    pub stderr: String,
}

impl CommandOutput {
    pub fn success(&self) -> bool {
        self.code == Some(0)
    }
}

/// Runs launch commands
#[async_trait]
pub trait CommandRunner: Send + Sync {
    async fn run(&self, command: &LaunchCommand) -> Result<CommandOutput>;
}

/// Runs commands as child processes
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemCommandRunner;

#[async_trait]
impl CommandRunner for SystemCommandRunner {
    async fn run(&self, command: &LaunchCommand) -> Result<CommandOutput> {
        let output = tokio::process::Command::new(&command.program)
            .args(&command.args)
            .output()
            .await
            .map_err(|e| Error::LaunchFailed {
                program: command.program.clone(),
                message: e.to_string(),
            })?;

        Ok(CommandOutput {
            code: output.status.code(),
            stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
        })
    }
}

pub struct Launcher {
    os: String,
    runner: Arc<dyn CommandRunner>,
}

impl Launcher {
    pub fn new(os: impl Into<String>, runner: Arc<dyn CommandRunner>) -> Self {
        Self {
            os: os.into(),
            runner,
        }
    }

    /// Launcher for the current host
    pub fn system() -> Self {
        Self::new(std::env::consts::OS, Arc::new(SystemCommandRunner))
    }

    pub fn os(&self) -> &str {
        &self.os
    }

    /// Run the launch command for this OS
    pub async fn launch(&self) -> Result<()> {
        let command = launch_command(&self.os)?;
        tracing::info!(program = %command.program, args = ?command.args, "Launching desktop app");

        let output = self.runner.run(&command).await?;
        if output.success() {
            return Ok(());
        }

        let status = match output.code {
            Some(code) => format!("exit status {code}"),
            None => "terminated by signal".to_string(),
        };
        let message = if output.stderr.is_empty() {
            status
        } else {
            format!("{status}: {}", output.stderr)
        };
        Err(Error::LaunchFailed {
            program: command.program,
            message,
        })
    }
}

/// Handle start-atest-desktop
pub async fn start_atest_desktop(ctx: Arc<ToolContext>, _args: NoArgs) -> Result<ToolResult> {
    ctx.launcher.launch().await?;
    Ok(ToolResult::text(
        "atest started successfully, please check the app",
    ))
}
