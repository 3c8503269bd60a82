//! Cache stores: where directory snapshots live between CI runs.

use std::path::{Path, PathBuf};
use std::time::SystemTime;

use semgate_core::SemgateError;
use sha2::{Digest, Sha256};
use walkdir::WalkDir;

/// Snapshot storage keyed by opaque strings.
pub trait CacheStore {
    /// Restore a snapshot into `dir`.
    ///
    /// Tries `primary_key` exactly, then each of `restore_keys` as a key
    /// prefix. Returns the key of the restored snapshot, or `None` on a miss.
    fn restore(
        &self,
        dir: &Path,
        primary_key: &str,
        restore_keys: &[&str],
    ) -> Result<Option<String>, SemgateError>;

    /// Save the content of `dir` under `key`, replacing any previous snapshot.
    fn save(&self, dir: &Path, key: &str) -> Result<(), SemgateError>;
}

const KEY_FILE: &str = "key";
const DATA_DIR: &str = "data";

/// A [`CacheStore`] keeping one snapshot directory per key on local disk.
///
/// Layout: `<root>/<sha256(key)>/key` holds the key verbatim and
/// `<root>/<sha256(key)>/data/` the snapshot.
///
/// # Examples
///
/// ```no_run
/// use semgate_cache::store::{CacheStore, LocalCacheStore};
/// use std::path::Path;
///
/// let store = LocalCacheStore::new("/tmp/semgate-store");
/// store.save(Path::new("target/semver-checks/cache"), "semver-linux-abc").unwrap();
/// ```
#[derive(Debug, Clone)]
pub struct LocalCacheStore {
    root: PathBuf,
}

impl LocalCacheStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn entry_dir(&self, key: &str) -> PathBuf {
        let mut hasher = Sha256::new();
        hasher.update(key.as_bytes());
        self.root.join(format!("{:x}", hasher.finalize()))
    }

    /// Newest entry whose key starts with `prefix`.
    fn find_by_prefix(&self, prefix: &str) -> Result<Option<(String, PathBuf)>, SemgateError> {
        if !self.root.is_dir() {
            return Ok(None);
        }

        let mut best: Option<(SystemTime, String, PathBuf)> = None;
        for entry in std::fs::read_dir(&self.root)? {
            let entry_dir = entry?.path();
            // Staging copy of an interrupted save.
            if entry_dir.extension().is_some_and(|ext| ext == "tmp") {
                continue;
            }
            let key_path = entry_dir.join(KEY_FILE);
            let Ok(key) = std::fs::read_to_string(&key_path) else {
                continue;
            };
            if !key.starts_with(prefix) {
                continue;
            }
            let modified = std::fs::metadata(&key_path)?.modified()?;
            if best.as_ref().map_or(true, |(t, _, _)| modified > *t) {
                best = Some((modified, key, entry_dir));
            }
        }
        Ok(best.map(|(_, key, dir)| (key, dir)))
    }
}

impl CacheStore for LocalCacheStore {
    fn restore(
        &self,
        dir: &Path,
        primary_key: &str,
        restore_keys: &[&str],
    ) -> Result<Option<String>, SemgateError> {
        let exact = self.entry_dir(primary_key);
        let hit = if exact.join(KEY_FILE).is_file() {
            Some((primary_key.to_string(), exact))
        } else {
            let mut found = None;
            for prefix in restore_keys {
                if let Some(hit) = self.find_by_prefix(prefix)? {
                    found = Some(hit);
                    break;
                }
            }
            found
        };

        let Some((key, entry_dir)) = hit else {
            return Ok(None);
        };
        std::fs::create_dir_all(dir)?;
        copy_tree(&entry_dir.join(DATA_DIR), dir)?;
        Ok(Some(key))
    }

    fn save(&self, dir: &Path, key: &str) -> Result<(), SemgateError> {
        if !dir.is_dir() {
            return Err(SemgateError::Cache(format!(
                "cannot save missing directory {}",
                dir.display()
            )));
        }

        let entry_dir = self.entry_dir(key);
        let staging = entry_dir.with_extension("tmp");
        if staging.exists() {
            std::fs::remove_dir_all(&staging)?;
        }
        std::fs::create_dir_all(staging.join(DATA_DIR))?;
        copy_tree(dir, &staging.join(DATA_DIR))?;
        std::fs::write(staging.join(KEY_FILE), key)?;

        if entry_dir.exists() {
            std::fs::remove_dir_all(&entry_dir)?;
        }
        std::fs::rename(&staging, &entry_dir)?;
        Ok(())
    }
}

/// Copy every regular file under `src` into `dst`, keeping relative paths.
///
/// Symlinks are not followed or copied.
fn copy_tree(src: &Path, dst: &Path) -> Result<(), SemgateError> {
    if !src.is_dir() {
        return Ok(());
    }
    for entry in WalkDir::new(src) {
        let entry = entry.map_err(std::io::Error::from)?;
        let relative = entry
            .path()
            .strip_prefix(src)
            .map_err(|e| SemgateError::Cache(e.to_string()))?;
        let target = dst.join(relative);
        let file_type = entry.file_type();
        if file_type.is_dir() {
            std::fs::create_dir_all(&target)?;
        } else if file_type.is_file() {
            std::fs::copy(entry.path(), &target)?;
        } else {
            tracing::debug!(path = %entry.path().display(), "skipping non-regular file");
        }
    }
    Ok(())
}
