//! Content hashing for lock files and cache directories.

use std::path::{Path, PathBuf};

use semgate_core::SemgateError;
use sha2::{Digest, Sha256};
use walkdir::WalkDir;

/// SHA-256 of a file's content, as lowercase hex.
///
/// # Errors
///
/// Returns [`SemgateError::Io`] if the file cannot be read.
pub fn hash_file(path: &Path) -> Result<String, SemgateError> {
    let content = std::fs::read(path)?;
    let mut hasher = Sha256::new();
    hasher.update(&content);
    Ok(format!("{:x}", hasher.finalize()))
}

/// Aggregate hash of every file matching a glob `pattern`.
///
/// Matches are sorted by path before hashing, so the result does not depend
/// on directory enumeration order. Each file contributes its own content hash.
/// Returns an empty string when nothing matches.
///
/// # Errors
///
/// Returns [`SemgateError::Config`] for a malformed pattern, or
/// [`SemgateError::Io`] if a matched file cannot be read.
pub fn hash_files(pattern: &str) -> Result<String, SemgateError> {
    let entries = glob::glob(pattern)
        .map_err(|e| SemgateError::Config(format!("invalid glob pattern '{pattern}': {e}")))?;

    let mut paths: Vec<PathBuf> = entries
        .filter_map(|entry| match entry {
            Ok(path) => Some(path),
            Err(e) => {
                tracing::warn!("skipping unreadable path: {e}");
                None
            }
        })
        .filter(|path| path.is_file())
        .collect();
    paths.sort();

    if paths.is_empty() {
        return Ok(String::new());
    }

    let mut hasher = Sha256::new();
    for path in &paths {
        tracing::debug!(path = %path.display(), "hashing");
        hasher.update(hash_file(path)?.as_bytes());
    }
    Ok(format!("{:x}", hasher.finalize()))
}

/// Aggregate hash of every `Cargo.lock` below `workspace_root`, recursively.
///
/// Degrades to an empty string when the workspace has no lock file.
pub fn hash_lock_files(workspace_root: &Path) -> Result<String, SemgateError> {
    let root = glob::Pattern::escape(&workspace_root.to_string_lossy());
    let pattern = Path::new(&root).join("**").join("Cargo.lock");
    hash_files(&pattern.to_string_lossy())
}

/// Hash of a directory tree: relative file paths and their contents.
///
/// Two directories with the same files at the same relative paths hash the
/// same regardless of where they live. A missing directory hashes like an
/// empty one.
pub fn hash_folder_content(dir: &Path) -> Result<String, SemgateError> {
    let mut hasher = Sha256::new();
    if dir.exists() {
        for entry in WalkDir::new(dir).sort_by_file_name() {
            let entry = entry.map_err(std::io::Error::from)?;
            if !entry.file_type().is_file() {
                continue;
            }
            let relative = entry.path().strip_prefix(dir).unwrap_or(entry.path());
            let relative: Vec<_> = relative
                .components()
                .map(|c| c.as_os_str().to_string_lossy())
                .collect();
            hasher.update(relative.join("/").as_bytes());
            hasher.update([0u8]);
            hasher.update(hash_file(entry.path())?.as_bytes());
        }
    }
    Ok(format!("{:x}", hasher.finalize()))
}
