//! GitHub Actions workflow commands: step outputs, search-path additions, and
//! error annotations.

use std::io::Write;
use std::path::{Path, PathBuf};

use crate::error::SemgateError;

/// Handle on the files GitHub Actions reads step results from.
///
/// Outside of Actions both files are absent and values are printed instead.
#[derive(Debug, Clone, Default)]
pub struct Workflow {
    output_file: Option<PathBuf>,
    path_file: Option<PathBuf>,
    in_actions: bool,
}

impl Workflow {
    /// Read `GITHUB_OUTPUT`, `GITHUB_PATH` and `GITHUB_ACTIONS`.
    pub fn from_env() -> Self {
        let file = |name: &str| {
            std::env::var_os(name)
                .filter(|v| !v.is_empty())
                .map(PathBuf::from)
        };
        Self {
            output_file: file("GITHUB_OUTPUT"),
            path_file: file("GITHUB_PATH"),
            in_actions: std::env::var("GITHUB_ACTIONS").is_ok_and(|v| v == "true"),
        }
    }

    /// A workflow writing to explicit files.
    pub fn with_files(output_file: Option<PathBuf>, path_file: Option<PathBuf>) -> Self {
        Self {
            output_file,
            path_file,
            in_actions: true,
        }
    }

    /// Whether this process runs inside a GitHub Actions job.
    pub fn in_actions(&self) -> bool {
        self.in_actions
    }

    /// Publish a named step output.
    ///
    /// Multi-line values are written with a heredoc delimiter that does not
    /// occur in the value.
    ///
    /// # Errors
    ///
    /// Returns [`SemgateError::Io`] if the output file cannot be appended to.
    pub fn set_output(&self, name: &str, value: &str) -> Result<(), SemgateError> {
        match &self.output_file {
            Some(path) => {
                let delimiter = heredoc_delimiter(value);
                append(path, &format!("{name}<<{delimiter}\n{value}\n{delimiter}\n"))
            }
            None => {
                tracing::debug!(name, "GITHUB_OUTPUT not set, printing output");
                println!("{name}={value}");
                Ok(())
            }
        }
    }

    /// Prepend `dir` to `PATH` for subsequent workflow steps.
    pub fn add_path(&self, dir: &Path) -> Result<(), SemgateError> {
        match &self.path_file {
            Some(path) => append(path, &format!("{}\n", dir.display())),
            None => {
                tracing::debug!(dir = %dir.display(), "GITHUB_PATH not set, not publishing path");
                Ok(())
            }
        }
    }

    /// Emit a failure annotation for the current step.
    pub fn error(&self, message: &str) {
        if self.in_actions {
            println!("::error::{}", escape_data(message));
        }
    }
}

fn append(path: &Path, content: &str) -> Result<(), SemgateError> {
    let mut file = std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)?;
    file.write_all(content.as_bytes())?;
    Ok(())
}

fn heredoc_delimiter(value: &str) -> String {
    let mut delimiter = format!("ghadelimiter_{}", std::process::id());
    while value.contains(&delimiter) {
        delimiter.push('_');
    }
    delimiter
}

/// Escape a workflow command payload.
///
/// # Examples
///
/// ```
/// use semgate_core::workflow::escape_data;
///
/// assert_eq!(escape_data("50%\nfailed"), "50%25%0Afailed");
/// ```
pub fn escape_data(value: &str) -> String {
    value
        .replace('%', "%25")
        .replace('\r', "%0D")
        .replace('\n', "%0A")
}
