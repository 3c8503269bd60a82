//! Cache key derivation.
//!
//! A key is the `-`-joined sequence of: user prefix, run disambiguator,
//! platform, compiler version, lint-tool version, lock-file hash, and a fixed
//! suffix. The order keeps a match in one component from hiding a mismatch in
//! the next.

use std::path::Path;

use semgate_core::{CheckInputs, SemgateError};
use sha2::{Digest, Sha256};

use crate::hashing::hash_lock_files;

/// Fixed last component of every derived key.
pub const KEY_SUFFIX: &str = "semver-checks-rustdoc";

/// User-controlled parts of the key.
#[derive(Debug, Clone)]
pub struct KeySettings {
    /// First component (default `semver`).
    pub prefix_key: String,
    /// Replaces the run-dependent component when set.
    pub shared_key: Option<String>,
    /// Replaces the whole key when set.
    pub cache_key: Option<String>,
    /// CI job identifier (`GITHUB_JOB`), empty outside CI.
    pub job: String,
}

/// Normalized version strings of the tools that produce cached artifacts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolVersions {
    pub rustc: String,
    pub semver_checks: String,
}

/// Every component of a derived key, in key order.
///
/// # Examples
///
/// ```
/// use semgate_cache::key::CacheKeyParts;
///
/// let parts = CacheKeyParts {
///     prefix: "semver".into(),
///     disambiguator: "check-0123456789abcdef".into(),
///     platform: "linux".into(),
///     rustc_version: "rustc-1.80.0".into(),
///     tool_version: "cargo-semver-checks-0.36.0".into(),
///     locks_hash: "ff".into(),
/// };
/// assert_eq!(
///     parts.to_key(),
///     "semver-check-0123456789abcdef-linux-rustc-1.80.0-cargo-semver-checks-0.36.0-ff-semver-checks-rustdoc"
/// );
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheKeyParts {
    pub prefix: String,
    pub disambiguator: String,
    pub platform: String,
    pub rustc_version: String,
    pub tool_version: String,
    pub locks_hash: String,
}

impl CacheKeyParts {
    /// Join the components into the key string.
    pub fn to_key(&self) -> String {
        [
            self.prefix.as_str(),
            self.disambiguator.as_str(),
            self.platform.as_str(),
            self.rustc_version.as_str(),
            self.tool_version.as_str(),
            self.locks_hash.as_str(),
            KEY_SUFFIX,
        ]
        .join("-")
    }
}

/// Derive the base cache key for a run.
///
/// `cache_key` short-circuits derivation. Otherwise lock files under
/// `workspace_root` are hashed and combined with the other components.
///
/// # Errors
///
/// Returns [`SemgateError::Io`] if a lock file cannot be read.
pub fn derive_cache_key(
    settings: &KeySettings,
    inputs: &CheckInputs,
    platform: &str,
    versions: &ToolVersions,
    workspace_root: &Path,
) -> Result<String, SemgateError> {
    if let Some(key) = settings.cache_key.as_deref().filter(|k| !k.is_empty()) {
        tracing::debug!("using cache key override");
        return Ok(key.to_string());
    }

    let disambiguator = match settings.shared_key.as_deref().filter(|k| !k.is_empty()) {
        Some(shared) => shared.to_string(),
        None => run_dependent_key(&settings.job, inputs)?,
    };

    let locks_hash = hash_lock_files(workspace_root)?;
    if locks_hash.is_empty() {
        tracing::warn!(
            root = %workspace_root.display(),
            "no Cargo.lock found, cache key omits the lock file hash"
        );
    }

    let parts = CacheKeyParts {
        prefix: settings.prefix_key.clone(),
        disambiguator,
        platform: platform.to_string(),
        rustc_version: versions.rustc.clone(),
        tool_version: versions.semver_checks.clone(),
        locks_hash,
    };
    Ok(parts.to_key())
}

/// `<job>-<16 hex chars>` identifying the job and the inputs that shape
/// which rustdoc gets generated.
///
/// List inputs are sorted first, so their order does not matter.
pub fn run_dependent_key(job: &str, inputs: &CheckInputs) -> Result<String, SemgateError> {
    let sorted = |values: &[String]| {
        let mut values = values.to_vec();
        values.sort();
        values
    };

    let mut hasher = Sha256::new();
    hasher.update(serde_json::to_string(
        &serde_json::json!({ "package": sorted(&inputs.packages) }),
    )?);
    hasher.update(serde_json::to_string(
        &serde_json::json!({ "exclude": sorted(&inputs.excludes) }),
    )?);
    hasher.update(serde_json::to_string(
        &serde_json::json!({ "manifest_path": inputs.manifest_path.as_deref().unwrap_or("") }),
    )?);
    hasher.update(serde_json::to_string(&serde_json::json!({
        "feature_group": inputs.feature_group.map(|g| g.to_string()).unwrap_or_default()
    }))?);
    hasher.update(serde_json::to_string(
        &serde_json::json!({ "features": sorted(&inputs.features) }),
    )?);

    let digest = format!("{:x}", hasher.finalize());
    Ok(format!("{job}-{}", &digest[..16]))
}

/// Key a cache snapshot is saved under: the base key plus a content hash.
pub fn key_with_content_hash(base: &str, content_hash: &str) -> String {
    format!("{base}-{content_hash}")
}
