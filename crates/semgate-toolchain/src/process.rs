//! Subprocess execution with the run's [`CargoEnv`].

use std::process::{ExitStatus, Stdio};

use semgate_core::SemgateError;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, BufReader};
use tokio::process::Command;

use crate::env::CargoEnv;

/// Combined output of a finished subprocess.
#[derive(Debug, Clone)]
pub struct CommandOutput {
    pub status: ExitStatus,
    /// Stdout and stderr lines, interleaved in arrival order.
    pub combined: String,
}

fn command(program: &str, args: &[&str], env: &CargoEnv) -> Command {
    let mut command = Command::new(program);
    command.args(args);
    env.apply(&mut command);
    command
}

fn display(program: &str, args: &[&str]) -> String {
    std::iter::once(program)
        .chain(args.iter().copied())
        .collect::<Vec<_>>()
        .join(" ")
}

/// Run a command with inherited stdio, failing on a non-zero exit.
///
/// # Errors
///
/// Returns [`SemgateError::Process`] if the command cannot be spawned or
/// exits unsuccessfully.
pub async fn run(program: &str, args: &[&str], env: &CargoEnv) -> Result<(), SemgateError> {
    let shown = display(program, args);
    tracing::info!("[command]{shown}");

    let status = command(program, args, env)
        .status()
        .await
        .map_err(|e| SemgateError::Process(format!("failed to run {shown}: {e}")))?;

    if !status.success() {
        return Err(SemgateError::Process(format!("{shown} failed with {status}")));
    }
    Ok(())
}

/// Run a command and return its stdout, failing on a non-zero exit.
pub async fn stdout_of(program: &str, args: &[&str], env: &CargoEnv) -> Result<String, SemgateError> {
    let shown = display(program, args);
    tracing::debug!("[command]{shown}");

    let output = command(program, args, env)
        .stdin(Stdio::null())
        .output()
        .await
        .map_err(|e| SemgateError::Process(format!("failed to run {shown}: {e}")))?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        return Err(SemgateError::Process(format!(
            "{shown} failed with {}: {}",
            output.status,
            stderr.trim()
        )));
    }
    Ok(String::from_utf8_lossy(&output.stdout).into_owned())
}

/// Run a command, echoing its output live while capturing it.
///
/// A non-zero exit is not an error here; callers inspect
/// [`CommandOutput::status`].
///
/// # Errors
///
/// Returns [`SemgateError::Process`] if the command cannot be spawned, or
/// [`SemgateError::Io`] if reading its output fails.
pub async fn tee(program: &str, args: &[&str], env: &CargoEnv) -> Result<CommandOutput, SemgateError> {
    let shown = display(program, args);
    tracing::info!("[command]{shown}");

    let mut child = command(program, args, env)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .map_err(|e| SemgateError::Process(format!("failed to run {shown}: {e}")))?;

    let stdout = child
        .stdout
        .take()
        .ok_or_else(|| SemgateError::Process(format!("no stdout pipe for {shown}")))?;
    let stderr = child
        .stderr
        .take()
        .ok_or_else(|| SemgateError::Process(format!("no stderr pipe for {shown}")))?;

    let captured = capture(BufReader::new(stdout), BufReader::new(stderr)).await;
    let combined = match captured {
        Ok(combined) => combined,
        Err(e) => {
            if let Err(kill) = child.kill().await {
                tracing::warn!("failed to stop {shown}: {kill}");
            }
            return Err(e.into());
        }
    };

    let status = child.wait().await?;
    Ok(CommandOutput { status, combined })
}

/// Echo and collect both streams line by line until both reach EOF.
///
/// Lines are split on raw bytes and decoded lossily, so invalid UTF-8 in
/// tool output never aborts the capture.
async fn capture<O, E>(mut stdout: O, mut stderr: E) -> std::io::Result<String>
where
    O: AsyncBufRead + Unpin,
    E: AsyncBufRead + Unpin,
{
    let mut combined = String::new();
    let (mut out_buf, mut err_buf) = (Vec::new(), Vec::new());
    let (mut out_done, mut err_done) = (false, false);

    while !(out_done && err_done) {
        tokio::select! {
            read = stdout.read_until(b'\n', &mut out_buf), if !out_done => {
                if read? == 0 {
                    out_done = true;
                } else {
                    let line = decode_line(&out_buf);
                    println!("{line}");
                    combined.push_str(&line);
                    combined.push('\n');
                    out_buf.clear();
                }
            }
            read = stderr.read_until(b'\n', &mut err_buf), if !err_done => {
                if read? == 0 {
                    err_done = true;
                } else {
                    let line = decode_line(&err_buf);
                    eprintln!("{line}");
                    combined.push_str(&line);
                    combined.push('\n');
                    err_buf.clear();
                }
            }
        }
    }
    Ok(combined)
}

fn decode_line(bytes: &[u8]) -> String {
    let bytes = bytes.strip_suffix(b"\n").unwrap_or(bytes);
    let bytes = bytes.strip_suffix(b"\r").unwrap_or(bytes);
    String::from_utf8_lossy(bytes).into_owned()
}

/// Normalize `--version` output for use in cache keys: trim, then replace
/// every whitespace character with `-`.
///
/// # Examples
///
/// ```
/// use semgate_toolchain::process::normalize_version;
///
/// assert_eq!(
///     normalize_version("rustc 1.80.0 (051478957 2024-07-21)\n"),
///     "rustc-1.80.0-(051478957-2024-07-21)"
/// );
/// ```
pub fn normalize_version(output: &str) -> String {
    output
        .trim()
        .chars()
        .map(|c| if c.is_whitespace() { '-' } else { c })
        .collect()
}

/// Normalized `rustc --version`.
pub async fn rustc_version(env: &CargoEnv) -> Result<String, SemgateError> {
    Ok(normalize_version(&stdout_of("rustc", &["--version"], env).await?))
}

/// Normalized `cargo semver-checks --version`.
pub async fn semver_checks_version(env: &CargoEnv) -> Result<String, SemgateError> {
    Ok(normalize_version(
        &stdout_of("cargo", &["semver-checks", "--version"], env).await?,
    ))
}
