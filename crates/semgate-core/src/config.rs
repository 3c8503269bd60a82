use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::SemgateError;

/// Top-level configuration loaded from `.semgate.toml`.
///
/// Supports layered resolution: CLI flags > `INPUT_*` env vars > config file > defaults.
///
/// # Examples
///
/// ```
/// use semgate_core::SemgateConfig;
///
/// let config = SemgateConfig::default();
/// assert_eq!(config.toolchain.rust_toolchain, "stable");
/// assert_eq!(config.cache.prefix_key, "semver");
/// ```
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SemgateConfig {
    /// Toolchain and lint tool provisioning.
    #[serde(default)]
    pub toolchain: ToolchainConfig,
    /// Rustdoc cache settings.
    #[serde(default)]
    pub cache: CacheConfig,
    /// Pull request comment settings.
    #[serde(default)]
    pub comment: CommentConfig,
}

impl SemgateConfig {
    /// Load configuration from a TOML file at `path`.
    ///
    /// # Errors
    ///
    /// Returns [`SemgateError::Io`] if the file cannot be read, or
    /// [`SemgateError::Toml`] if the content is not valid TOML.
    pub fn from_file(path: &Path) -> Result<Self, SemgateError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml(&content)
    }

    /// Parse configuration from a TOML string.
    ///
    /// # Examples
    ///
    /// ```
    /// use semgate_core::SemgateConfig;
    ///
    /// let config = SemgateConfig::from_toml("[cache]\nshared_key = \"docs\"").unwrap();
    /// assert_eq!(config.cache.shared_key.as_deref(), Some("docs"));
    /// ```
    pub fn from_toml(content: &str) -> Result<Self, SemgateError> {
        let config: Self = toml::from_str(content)?;
        Ok(config)
    }
}

/// Toolchain provisioning configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolchainConfig {
    /// Toolchain passed to `rustup toolchain install`; `manual` skips rustup.
    #[serde(default = "default_rust_toolchain")]
    pub rust_toolchain: String,
    /// `cargo-semver-checks` release: `latest` or a tag such as `v0.36.0`.
    #[serde(default = "default_version")]
    pub version: String,
}

fn default_rust_toolchain() -> String {
    "stable".into()
}

fn default_version() -> String {
    "latest".into()
}

impl Default for ToolchainConfig {
    fn default() -> Self {
        Self {
            rust_toolchain: default_rust_toolchain(),
            version: default_version(),
        }
    }
}

/// Rustdoc cache configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheConfig {
    /// First component of every cache key (default: `semver`).
    #[serde(default = "default_prefix_key")]
    pub prefix_key: String,
    /// Replaces the per-job component so several jobs share one cache.
    pub shared_key: Option<String>,
    /// Replaces the whole derived key.
    pub cache_key: Option<String>,
    /// Root directory of the local cache store.
    pub store_dir: Option<PathBuf>,
}

fn default_prefix_key() -> String {
    "semver".into()
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            prefix_key: default_prefix_key(),
            shared_key: None,
            cache_key: None,
            store_dir: None,
        }
    }
}

/// Pull request comment configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CommentConfig {
    /// Directory holding `patch.txt`, `minor.txt`, ... templates.
    pub templates_dir: Option<PathBuf>,
    /// Line patterns used to classify lint output.
    #[serde(default)]
    pub patterns: PatternConfig,
}

/// Regular expressions per result bucket, matched against each output line.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PatternConfig {
    #[serde(default)]
    pub minor: Vec<String>,
    #[serde(default)]
    pub major: Vec<String>,
    #[serde(default)]
    pub warning: Vec<String>,
    #[serde(default)]
    pub error: Vec<String>,
}
