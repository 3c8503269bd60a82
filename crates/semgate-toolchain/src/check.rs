use semgate_core::{CheckInputs, SemgateError};

use crate::env::CargoEnv;
use crate::process;

/// Result of one `cargo semver-checks check-release` invocation.
#[derive(Debug, Clone)]
pub struct CheckRun {
    /// Exit code, `None` if the process was killed by a signal.
    pub exit_code: Option<i32>,
    /// Captured stdout and stderr with ANSI escapes removed.
    pub output: String,
}

impl CheckRun {
    pub fn success(&self) -> bool {
        self.exit_code == Some(0)
    }

    /// Turn an unsuccessful run into an error.
    pub fn into_result(self) -> Result<Self, SemgateError> {
        if self.success() {
            return Ok(self);
        }
        let status = match self.exit_code {
            Some(code) => format!("exit code {code}"),
            None => "a signal".to_string(),
        };
        Err(SemgateError::Process(format!(
            "cargo semver-checks failed with {status}"
        )))
    }
}

/// Full argument list after `cargo`.
pub fn check_release_command(inputs: &CheckInputs) -> Vec<String> {
    let mut args = vec!["semver-checks".to_string(), "check-release".to_string()];
    args.extend(inputs.check_release_args());
    args
}

/// Run `cargo semver-checks check-release`, echoing and capturing its output.
///
/// A failing check is reported through [`CheckRun::exit_code`], not as an
/// error, so the caller can publish output and save the cache first.
///
/// # Errors
///
/// Returns [`SemgateError::Process`] if cargo cannot be spawned.
pub async fn run_semver_checks(inputs: &CheckInputs, env: &CargoEnv) -> Result<CheckRun, SemgateError> {
    let args = check_release_command(inputs);
    let args: Vec<&str> = args.iter().map(String::as_str).collect();

    let output = process::tee("cargo", &args, env).await?;
    Ok(CheckRun {
        exit_code: output.status.code(),
        output: console::strip_ansi_codes(&output.combined).into_owned(),
    })
}
