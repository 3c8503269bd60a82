//! Rustdoc artifact caching: key derivation, content hashing, and snapshot
//! restore/save.

pub mod hashing;
pub mod key;
pub mod rustdoc;
pub mod store;

pub use key::{derive_cache_key, KeySettings, ToolVersions};
pub use rustdoc::{RustdocCache, SaveOutcome};
pub use store::{CacheStore, LocalCacheStore};
