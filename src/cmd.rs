use std::io::Write;
use std::os::unix::process::ExitStatusExt;
use std::process::{Command, ExitStatus, Output, Stdio};

use crate::channel::ExecOutput;
use crate::error::{DeployError, DeployResult};

const SIGINT: i32 = 2;

/// Run a command and capture its combined stdout/stderr together
/// with the exit code. Non-zero exit is not an error here; callers
/// classify the result themselves.
pub fn capture(program: &str, args: &[&str]) -> DeployResult<ExecOutput> {
    let output = spawn(program, args)?;
    interrupted_check(output.status)?;

    Ok(ExecOutput {
        output: combined(&output),
        code: exit_code(output.status),
    })
}

/// Run a command and capture output. Fails if the command returns
/// a non-zero exit code.
pub fn run(program: &str, args: &[&str]) -> DeployResult<String> {
    let output = spawn(program, args)?;
    interrupted_check(output.status)?;

    if output.status.success() {
        Ok(String::from_utf8_lossy(&output.stdout).trim().to_string())
    } else {
        let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
        eprintln!("stderr: {stderr}");
        Err(DeployError::CommandFailed {
            command: format_command(program, args),
            status: output.status,
        })
    }
}

/// Run a command with stdin/stdout/stderr inherited (interactive).
pub fn run_interactive(program: &str, args: &[&str]) -> DeployResult<()> {
    let status = Command::new(program)
        .args(args)
        .stdin(Stdio::inherit())
        .stdout(Stdio::inherit())
        .stderr(Stdio::inherit())
        .status()
        .map_err(|e| spawn_error(program, &e))?;
    interrupted_check(status)?;

    if status.success() {
        Ok(())
    } else {
        Err(DeployError::CommandFailed {
            command: format_command(program, args),
            status,
        })
    }
}

/// Run a command that pipes its stdin from a byte slice.
pub fn run_with_stdin(program: &str, args: &[&str], stdin_data: &[u8]) -> DeployResult<ExecOutput> {
    let mut child = Command::new(program)
        .args(args)
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .map_err(|e| spawn_error(program, &e))?;

    if let Some(stdin) = &mut child.stdin {
        stdin.write_all(stdin_data)?;
    }
    drop(child.stdin.take());

    let output = child.wait_with_output()?;
    interrupted_check(output.status)?;

    Ok(ExecOutput {
        output: combined(&output),
        code: exit_code(output.status),
    })
}

/// Check if a command exists on PATH.
#[must_use]
pub fn command_exists(program: &str) -> bool {
    Command::new("which")
        .arg(program)
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .status()
        .is_ok_and(|s| s.success())
}

fn spawn(program: &str, args: &[&str]) -> DeployResult<Output> {
    Command::new(program)
        .args(args)
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .output()
        .map_err(|e| spawn_error(program, &e))
}

fn spawn_error(program: &str, e: &std::io::Error) -> DeployError {
    if e.kind() == std::io::ErrorKind::NotFound {
        DeployError::CommandNotFound(program.to_string())
    } else {
        DeployError::Io(std::io::Error::new(e.kind(), e.to_string()))
    }
}

/// A child killed by SIGINT means the operator hit Ctrl-C; the
/// driver must still run its reporting path before exiting 130.
fn interrupted_check(status: ExitStatus) -> DeployResult<()> {
    if status.signal() == Some(SIGINT) {
        return Err(DeployError::Interrupted);
    }
    Ok(())
}

fn exit_code(status: ExitStatus) -> i32 {
    status
        .code()
        .unwrap_or_else(|| 128 + status.signal().unwrap_or(0))
}

fn combined(output: &Output) -> String {
    let stdout = String::from_utf8_lossy(&output.stdout);
    let stderr = String::from_utf8_lossy(&output.stderr);
    let mut text = stdout.trim().to_string();
    let err = stderr.trim();
    if !err.is_empty() {
        if !text.is_empty() {
            text.push('\n');
        }
        text.push_str(err);
    }
    text
}

fn format_command(program: &str, args: &[&str]) -> String {
    let mut parts = vec![program.to_string()];
    parts.extend(args.iter().map(|a| (*a).to_string()));
    parts.join(" ")
}
