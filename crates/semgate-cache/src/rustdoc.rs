use std::path::{Path, PathBuf};

use semgate_core::SemgateError;

use crate::hashing::hash_folder_content;
use crate::key::key_with_content_hash;
use crate::store::CacheStore;

/// Outcome of [`RustdocCache::save`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SaveOutcome {
    /// A snapshot was written under this key.
    Saved(String),
    /// The directory matches the restored snapshot; nothing was written.
    UpToDate,
}

/// The rustdoc JSON cache `cargo semver-checks` keeps between runs.
///
/// Restores by the base key (exact match first, then any snapshot whose key
/// starts with it) and saves under the base key plus a hash of the
/// directory content.
///
/// # Examples
///
/// ```no_run
/// use semgate_cache::rustdoc::RustdocCache;
/// use semgate_cache::store::LocalCacheStore;
///
/// let store = LocalCacheStore::new("/tmp/semgate-store");
/// let mut cache = RustdocCache::new(store, "semver-checks/target/semver-checks/cache", "semver-key");
/// let hit = cache.restore().unwrap();
/// // ... run cargo semver-checks ...
/// cache.save().unwrap();
/// ```
pub struct RustdocCache<S> {
    store: S,
    cache_path: PathBuf,
    key: String,
    restored_key: Option<String>,
}

impl<S: CacheStore> RustdocCache<S> {
    pub fn new(store: S, cache_path: impl Into<PathBuf>, key: impl Into<String>) -> Self {
        let cache_path = cache_path.into();
        let cache_path = std::path::absolute(&cache_path).unwrap_or(cache_path);
        Self {
            store,
            cache_path,
            key: key.into(),
            restored_key: None,
        }
    }

    pub fn cache_path(&self) -> &Path {
        &self.cache_path
    }

    /// Base key, without the content hash suffix.
    pub fn key(&self) -> &str {
        &self.key
    }

    /// Key of the snapshot last restored or saved.
    pub fn restored_key(&self) -> Option<&str> {
        self.restored_key.as_deref()
    }

    /// Create the cache directory and restore a snapshot into it.
    ///
    /// Returns `true` on a cache hit.
    ///
    /// # Errors
    ///
    /// Returns [`SemgateError::Io`] if the directory cannot be created, or
    /// whatever the store reports.
    pub fn restore(&mut self) -> Result<bool, SemgateError> {
        std::fs::create_dir_all(&self.cache_path)?;

        tracing::info!("Restoring rustdoc cache...");
        tracing::info!("Rustdoc cache path: {}.", self.cache_path.display());
        tracing::info!("Rustdoc cache key: {}.", self.key);

        match self
            .store
            .restore(&self.cache_path, &self.key, &[self.key.as_str()])?
        {
            Some(key) => {
                tracing::info!("Restored rustdoc cache using key {key}.");
                self.restored_key = Some(key);
                Ok(true)
            }
            None => {
                tracing::info!("Rustdoc cache not found.");
                Ok(false)
            }
        }
    }

    /// Save the cache directory unless it is unchanged since restore.
    pub fn save(&mut self) -> Result<SaveOutcome, SemgateError> {
        let content_hash = hash_folder_content(&self.cache_path)?;
        let key = key_with_content_hash(&self.key, &content_hash);

        if self.restored_key.as_deref() == Some(key.as_str()) {
            tracing::info!("Rustdoc cache is up to date, skipping saving.");
            return Ok(SaveOutcome::UpToDate);
        }

        tracing::info!("Saving rustdoc cache using key {key}");
        self.store.save(&self.cache_path, &key)?;
        self.restored_key = Some(key.clone());
        Ok(SaveOutcome::Saved(key))
    }
}
