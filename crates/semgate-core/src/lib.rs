//! Core types, configuration, and error handling for semgate.
//!
//! This crate provides the shared foundation used by all other semgate crates:
//! - [`SemgateError`]: unified error type using `thiserror`
//! - [`SemgateConfig`]: configuration loaded from `.semgate.toml`
//! - Shared types: [`FeatureGroup`], [`RunnerOs`], [`Severity`],
//!   [`ResultSummary`], [`CheckInputs`]
//! - [`workflow`]: GitHub Actions step outputs and annotations

mod config;
mod error;
mod types;
pub mod workflow;

pub use config::{CacheConfig, CommentConfig, PatternConfig, SemgateConfig, ToolchainConfig};
pub use error::SemgateError;
pub use types::{
    host_platform, option_from_list, option_if_value_provided, split_list_input, CheckInputs,
    FeatureGroup, Finding, ResultSummary, RunnerOs, Severity,
};

/// A convenience `Result` type for semgate operations.
pub type Result<T> = std::result::Result<T, SemgateError>;
