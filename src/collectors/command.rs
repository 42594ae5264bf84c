use std::process::Stdio;
use std::time::Duration;
use thiserror::Error;
use tokio::process::Command;
use tokio::time;

#[derive(Debug, Clone)]
pub struct CommandOutput {
    pub success: bool,
    pub stdout: String,
    pub stderr: String,
}

#[derive(Debug, Error)]
pub enum CommandError {
    #[error("{program} not found in PATH")]
    NotFound { program: String },
    #[error("failed to run {program}: {source}")]
    Spawn {
        program: String,
        source: std::io::Error,
    },
    #[error("{program} did not finish within {timeout:?}")]
    Timeout { program: String, timeout: Duration },
}

/// Runs `program` with `args`, capturing stdout and stderr.
///
/// The child is killed if it outlives `timeout`. Output is decoded lossily;
/// `LC_ALL=C` keeps numeric columns in a parseable form.
pub async fn run_command(
    program: &str,
    args: &[&str],
    timeout: Duration,
) -> Result<CommandOutput, CommandError> {
    if !tool_available(program) {
        return Err(CommandError::NotFound {
            program: program.to_string(),
        });
    }

    let child = Command::new(program)
        .args(args)
        .env("LC_ALL", "C")
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true)
        .output();

    match time::timeout(timeout, child).await {
        Ok(Ok(output)) => Ok(CommandOutput {
            success: output.status.success(),
            stdout: String::from_utf8_lossy(&output.stdout).to_string(),
            stderr: String::from_utf8_lossy(&output.stderr).to_string(),
        }),
        Ok(Err(source)) => Err(CommandError::Spawn {
            program: program.to_string(),
            source,
        }),
        Err(_elapsed) => Err(CommandError::Timeout {
            program: program.to_string(),
            timeout,
        }),
    }
}

/// Whether `program` resolves to an executable, the way a shell would find it.
///
/// Names containing a `/` are checked as paths.
pub fn tool_available(program: &str) -> bool {
    which::which(program).is_ok()
}
