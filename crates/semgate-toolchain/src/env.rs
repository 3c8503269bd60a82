//! Environment handed to every cargo/rustc/rustup subprocess.
//!
//! Resolved once per run from the inherited environment. Values already set
//! by the caller win; the process environment itself is never modified.

use std::ffi::OsString;
use std::path::{Path, PathBuf};

/// Default `CARGO_TARGET_DIR`, relative to the working directory.
pub fn default_target_dir() -> PathBuf {
    Path::new("semver-checks").join("target")
}

/// Subprocess environment for one run.
///
/// # Examples
///
/// ```
/// use semgate_toolchain::env::CargoEnv;
///
/// let env = CargoEnv::from_lookup(|_| None);
/// assert_eq!(env.incremental, "0");
/// assert_eq!(env.term_color, "always");
/// assert!(env.registry_protocol.is_none());
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CargoEnv {
    /// `CARGO_TARGET_DIR`.
    pub target_dir: PathBuf,
    /// `CARGO_INCREMENTAL`.
    pub incremental: String,
    /// `CARGO_TERM_COLOR`.
    pub term_color: String,
    /// `CARGO_REGISTRIES_CRATES_IO_PROTOCOL`; settled by
    /// [`CargoEnv::settle_registry_protocol`] once rustc is known.
    pub registry_protocol: Option<String>,
    /// `RUSTUP_TOOLCHAIN`, set when this run installed a toolchain.
    pub rustup_toolchain: Option<String>,
    /// Directories searched before the inherited `PATH`.
    pub extra_paths: Vec<PathBuf>,
    base_path: Option<OsString>,
}

impl CargoEnv {
    /// Resolve from the current process environment.
    pub fn from_process() -> Self {
        let mut env = Self::from_lookup(|name| std::env::var(name).ok().filter(|v| !v.is_empty()));
        env.base_path = std::env::var_os("PATH");
        env
    }

    /// Resolve from an arbitrary variable lookup.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        Self {
            target_dir: lookup("CARGO_TARGET_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(default_target_dir),
            incremental: lookup("CARGO_INCREMENTAL").unwrap_or_else(|| "0".into()),
            term_color: lookup("CARGO_TERM_COLOR").unwrap_or_else(|| "always".into()),
            registry_protocol: lookup("CARGO_REGISTRIES_CRATES_IO_PROTOCOL"),
            rustup_toolchain: lookup("RUSTUP_TOOLCHAIN"),
            extra_paths: Vec::new(),
            base_path: lookup("PATH").map(OsString::from),
        }
    }

    /// Default the registry protocol to `sparse`, except on rustc 1.66 and
    /// 1.67 where it is unstable. `rustc_version` is the normalized
    /// `rustc --version` output.
    pub fn settle_registry_protocol(&mut self, rustc_version: &str) {
        if self.registry_protocol.is_some() {
            return;
        }
        if !rustc_version.starts_with("rustc-1.66") && !rustc_version.starts_with("rustc-1.67") {
            self.registry_protocol = Some("sparse".into());
        }
    }

    /// Put `dir` first on the search path.
    pub fn prepend_path(&mut self, dir: PathBuf) {
        if !self.extra_paths.contains(&dir) {
            self.extra_paths.insert(0, dir);
        }
    }

    /// Search path: extra directories, then the inherited `PATH`.
    pub fn search_path(&self) -> Vec<PathBuf> {
        let mut dirs = self.extra_paths.clone();
        if let Some(base) = &self.base_path {
            dirs.extend(std::env::split_paths(base));
        }
        dirs
    }

    /// Locate `program` on the search path.
    pub fn which(&self, program: &str) -> Option<PathBuf> {
        self.search_path()
            .into_iter()
            .flat_map(|dir| executable_names(program).map(move |name| dir.join(name)))
            .find(|candidate| candidate.is_file())
    }

    /// Variables to set on a subprocess.
    pub fn vars(&self) -> Vec<(&'static str, OsString)> {
        let mut vars = vec![
            ("CARGO_TARGET_DIR", self.target_dir.clone().into_os_string()),
            ("CARGO_INCREMENTAL", self.incremental.clone().into()),
            ("CARGO_TERM_COLOR", self.term_color.clone().into()),
        ];
        if let Some(protocol) = &self.registry_protocol {
            vars.push(("CARGO_REGISTRIES_CRATES_IO_PROTOCOL", protocol.clone().into()));
        }
        if let Some(toolchain) = &self.rustup_toolchain {
            vars.push(("RUSTUP_TOOLCHAIN", toolchain.clone().into()));
        }
        if !self.extra_paths.is_empty() {
            match std::env::join_paths(self.search_path()) {
                Ok(path) => vars.push(("PATH", path)),
                Err(e) => tracing::warn!("cannot extend PATH: {e}"),
            }
        }
        vars
    }

    /// Apply [`CargoEnv::vars`] to a command.
    pub fn apply(&self, command: &mut tokio::process::Command) {
        command.envs(self.vars());
    }
}

fn executable_names(program: &str) -> impl Iterator<Item = String> {
    let exe = if cfg!(windows) {
        Some(format!("{program}.exe"))
    } else {
        None
    };
    std::iter::once(program.to_string()).chain(exe)
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |name| map.get(name).cloned()
    }

    #[test]
    fn defaults_when_unset() {
        let env = CargoEnv::from_lookup(|_| None);
        assert_eq!(env.target_dir, default_target_dir());
        assert_eq!(env.incremental, "0");
        assert_eq!(env.term_color, "always");
        assert_eq!(env.rustup_toolchain, None);
    }

    #[test]
    fn existing_values_win() {
        let env = CargoEnv::from_lookup(lookup(&[
            ("CARGO_TARGET_DIR", "/build"),
            ("CARGO_INCREMENTAL", "1"),
            ("CARGO_TERM_COLOR", "never"),
            ("CARGO_REGISTRIES_CRATES_IO_PROTOCOL", "git"),
        ]));
        assert_eq!(env.target_dir, PathBuf::from("/build"));
        assert_eq!(env.incremental, "1");
        assert_eq!(env.term_color, "never");
        assert_eq!(env.registry_protocol.as_deref(), Some("git"));
    }

    #[test]
    fn sparse_protocol_by_default() {
        let mut env = CargoEnv::from_lookup(|_| None);
        env.settle_registry_protocol("rustc-1.80.0-(051478957-2024-07-21)");
        assert_eq!(env.registry_protocol.as_deref(), Some("sparse"));
    }

    #[test]
    fn no_sparse_protocol_on_166_and_167() {
        for version in ["rustc-1.66.1-(90743e729-2023-01-10)", "rustc-1.67.0"] {
            let mut env = CargoEnv::from_lookup(|_| None);
            env.settle_registry_protocol(version);
            assert_eq!(env.registry_protocol, None, "{version}");
        }
    }

    #[test]
    fn preset_protocol_is_kept() {
        let mut env = CargoEnv::from_lookup(lookup(&[("CARGO_REGISTRIES_CRATES_IO_PROTOCOL", "git")]));
        env.settle_registry_protocol("rustc-1.80.0");
        assert_eq!(env.registry_protocol.as_deref(), Some("git"));
    }

    #[test]
    fn vars_include_toolchain_and_path() {
        let mut env = CargoEnv::from_lookup(lookup(&[("PATH", "/usr/bin")]));
        env.rustup_toolchain = Some("nightly".into());
        env.prepend_path(PathBuf::from("/opt/tool"));

        let vars: HashMap<_, _> = env.vars().into_iter().collect();
        assert_eq!(vars["RUSTUP_TOOLCHAIN"], OsString::from("nightly"));
        let path: Vec<PathBuf> = std::env::split_paths(&vars["PATH"]).collect();
        assert_eq!(path, vec![PathBuf::from("/opt/tool"), PathBuf::from("/usr/bin")]);
    }

    #[test]
    fn path_untouched_without_extra_dirs() {
        let env = CargoEnv::from_lookup(lookup(&[("PATH", "/usr/bin")]));
        assert!(env.vars().iter().all(|(name, _)| *name != "PATH"));
    }

    #[test]
    fn which_searches_extra_paths_first() {
        let dir = tempfile::tempdir().unwrap();
        let name = if cfg!(windows) {
            "cargo-semver-checks.exe"
        } else {
            "cargo-semver-checks"
        };
        std::fs::write(dir.path().join(name), "").unwrap();

        let mut env = CargoEnv::from_lookup(|_| None);
        assert_eq!(env.which("cargo-semver-checks"), None);

        env.prepend_path(dir.path().to_path_buf());
        assert_eq!(env.which("cargo-semver-checks"), Some(dir.path().join(name)));
    }

    #[test]
    fn prepend_path_deduplicates() {
        let mut env = CargoEnv::from_lookup(|_| None);
        env.prepend_path(PathBuf::from("/a"));
        env.prepend_path(PathBuf::from("/a"));
        assert_eq!(env.extra_paths.len(), 1);
    }
}
