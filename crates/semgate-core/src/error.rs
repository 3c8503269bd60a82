use std::path::PathBuf;

/// Errors that can occur across semgate.
///
/// Library crates use this type directly; the binary converts it to a
/// `miette::Report` at the boundary.
///
/// # Examples
///
/// ```
/// use semgate_core::SemgateError;
///
/// let err = SemgateError::Config("missing token".into());
/// assert!(err.to_string().contains("missing token"));
/// ```
#[derive(Debug, thiserror::Error, miette::Diagnostic)]
pub enum SemgateError {
    /// Filesystem I/O failure.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Invalid or missing configuration.
    #[error("configuration error: {0}")]
    #[diagnostic(code(semgate::config))]
    Config(String),

    /// A subprocess could not be spawned or exited unsuccessfully.
    #[error("process error: {0}")]
    Process(String),

    /// GitHub API or asset download failure.
    #[error("GitHub error: {0}")]
    GitHub(String),

    /// Cache store failure.
    #[error("cache error: {0}")]
    Cache(String),

    /// Comment template could not be loaded.
    #[error("{0}")]
    Template(String),

    /// JSON serialization / deserialization failure.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// TOML deserialization failure.
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),

    /// Invalid classification pattern.
    #[error("invalid pattern: {0}")]
    Pattern(#[from] regex::Error),

    /// A required file was not found.
    #[error("file not found: {}", .0.display())]
    FileNotFound(PathBuf),
}
