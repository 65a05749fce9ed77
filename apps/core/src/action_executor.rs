use std::process::{Child, Command, ExitStatus, Stdio};
use std::thread::{self, JoinHandle};

use thiserror::Error;
use tracing::{debug, info, warn};

use crate::model::{Action, ActionKind};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LaunchError {
    #[error("empty command line")]
    EmptyCommand,
    #[error("failed to start '{command}': {message}")]
    Spawn { command: String, message: String },
}

/// Starts external commands on behalf of `RunProcess` actions.
pub trait ProcessLauncher: Send + Sync {
    fn launch(&self, command_line: &str, visible_console: bool) -> Result<(), LaunchError>;
}

/// Launches through the platform shell and does not wait for the child.
#[derive(Debug, Default, Clone, Copy)]
pub struct ShellLauncher;

impl ProcessLauncher for ShellLauncher {
    fn launch(&self, command_line: &str, visible_console: bool) -> Result<(), LaunchError> {
        let trimmed = command_line.trim();
        if trimmed.is_empty() {
            return Err(LaunchError::EmptyCommand);
        }

        let mut command = shell_command(trimmed, visible_console);
        let child = command.spawn().map_err(|e| LaunchError::Spawn {
            command: trimmed.to_string(),
            message: e.to_string(),
        })?;
        info!(pid = child.id(), command = trimmed, visible_console, "launched process");
        reap(child, trimmed.to_string());
        Ok(())
    }
}

/// Waits for `child` on a detached thread so it does not linger as a zombie.
fn reap(mut child: Child, command: String) -> JoinHandle<Option<ExitStatus>> {
    thread::spawn(move || match child.wait() {
        Ok(status) => {
            debug!(command = %command, %status, "launched process exited");
            Some(status)
        }
        Err(error) => {
            warn!(command = %command, %error, "failed to wait for launched process");
            None
        }
    })
}

#[cfg(target_os = "windows")]
fn shell_command(command_line: &str, visible_console: bool) -> Command {
    use std::os::windows::process::CommandExt;

    const CREATE_NEW_CONSOLE: u32 = 0x0000_0010;
    const CREATE_NO_WINDOW: u32 = 0x0800_0000;

    let mut command = Command::new("cmd.exe");
    if visible_console {
        // /k keeps the console open so the user can read the output.
        command.raw_arg("/k").raw_arg(command_line);
        command.creation_flags(CREATE_NEW_CONSOLE);
    } else {
        command.raw_arg("/c").raw_arg(command_line);
        command.creation_flags(CREATE_NO_WINDOW);
        command.stdout(Stdio::null()).stderr(Stdio::null());
    }
    command.stdin(Stdio::null());
    command
}

#[cfg(not(target_os = "windows"))]
fn shell_command(command_line: &str, visible_console: bool) -> Command {
    let mut command = Command::new("sh");
    command.arg("-c").arg(command_line).stdin(Stdio::null());
    if !visible_console {
        command.stdout(Stdio::null()).stderr(Stdio::null());
    }
    command
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ActionOutcome {
    /// The frontend should place this text on the clipboard.
    Copied(String),
    Launched,
}

pub fn perform(
    action: &Action,
    launcher: &dyn ProcessLauncher,
) -> Result<ActionOutcome, LaunchError> {
    match &action.kind {
        ActionKind::CopyText { text } => Ok(ActionOutcome::Copied(text.clone())),
        ActionKind::RunProcess {
            command_line,
            visible_console,
        } => {
            if command_line.trim().is_empty() {
                return Err(LaunchError::EmptyCommand);
            }
            launcher.launch(command_line, *visible_console)?;
            Ok(ActionOutcome::Launched)
        }
    }
}
