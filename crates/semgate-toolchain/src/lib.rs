//! Toolchain provisioning and `cargo semver-checks` execution.
//!
//! All subprocesses receive an explicit [`env::CargoEnv`] instead of relying
//! on a mutated process environment.

pub mod check;
pub mod env;
pub mod install;
pub mod process;
pub mod rustup;

pub use check::{run_semver_checks, CheckRun};
pub use env::CargoEnv;
pub use install::{install_semver_checks, InstallMethod, InstallOptions};
