//! Rust toolchain installation through rustup.

use std::path::{Path, PathBuf};

use semgate_core::workflow::Workflow;
use semgate_core::{RunnerOs, SemgateError};

use crate::env::CargoEnv;
use crate::process;

/// Toolchain selector that leaves toolchain setup to the user.
pub const MANUAL: &str = "manual";

/// Install `toolchain` and pin it for every subprocess of this run.
///
/// Does nothing for [`MANUAL`]. Installs rustup itself first when it is not
/// on the search path.
///
/// # Errors
///
/// Returns [`SemgateError::Process`] if any rustup step fails.
pub async fn install_toolchain(
    toolchain: &str,
    env: &mut CargoEnv,
    workflow: &Workflow,
) -> Result<(), SemgateError> {
    if toolchain == MANUAL {
        tracing::info!("rust-toolchain is 'manual', skipping toolchain installation");
        return Ok(());
    }

    if env.which("rustup").is_none() {
        install_rustup(env, workflow).await?;
    }

    process::run("rustup", &["show"], env).await?;
    process::run("rustup", &["set", "profile", "minimal"], env).await?;
    process::run("rustup", &["toolchain", "install", toolchain], env).await?;

    pin_toolchain(toolchain, env);
    Ok(())
}

/// Pin `RUSTUP_TOOLCHAIN` for subprocesses without installing anything.
///
/// [`MANUAL`] leaves the environment as it is.
pub fn pin_toolchain(toolchain: &str, env: &mut CargoEnv) {
    if toolchain != MANUAL {
        env.rustup_toolchain = Some(toolchain.to_string());
    }
}

/// Download URL of `rustup-init` for a runner.
///
/// # Examples
///
/// ```
/// use semgate_core::RunnerOs;
/// use semgate_toolchain::rustup::rustup_init_url;
///
/// assert_eq!(
///     rustup_init_url(RunnerOs::Linux),
///     "https://static.rust-lang.org/rustup/dist/x86_64-unknown-linux-gnu/rustup-init"
/// );
/// ```
pub fn rustup_init_url(os: RunnerOs) -> String {
    let exe = if os == RunnerOs::Windows { ".exe" } else { "" };
    format!(
        "https://static.rust-lang.org/rustup/dist/{}/rustup-init{exe}",
        os.target_triple()
    )
}

/// `$CARGO_HOME/bin`, defaulting to `~/.cargo/bin`.
fn cargo_bin_dir() -> Result<PathBuf, SemgateError> {
    let home = match std::env::var_os("CARGO_HOME") {
        Some(home) if !home.is_empty() => PathBuf::from(home),
        _ => dirs::home_dir()
            .ok_or_else(|| SemgateError::Config("cannot determine home directory".into()))?
            .join(".cargo"),
    };
    Ok(home.join("bin"))
}

async fn install_rustup(env: &mut CargoEnv, workflow: &Workflow) -> Result<(), SemgateError> {
    let os = RunnerOs::current()?;
    let url = rustup_init_url(os);
    let installer = std::env::temp_dir().join(if os == RunnerOs::Windows {
        "semgate-rustup-init.exe"
    } else {
        "semgate-rustup-init"
    });

    tracing::info!("rustup not found, downloading {url}");
    download(&url, &installer).await?;
    make_executable(&installer)?;

    let installer_str = installer.to_string_lossy();
    process::run(
        &installer_str,
        &[
            "-y",
            "--default-toolchain",
            "none",
            "--profile",
            "minimal",
            "--no-modify-path",
        ],
        env,
    )
    .await?;

    let bin = cargo_bin_dir()?;
    workflow.add_path(&bin)?;
    env.prepend_path(bin);
    Ok(())
}

async fn download(url: &str, dest: &Path) -> Result<(), SemgateError> {
    let response = reqwest::get(url)
        .await
        .and_then(reqwest::Response::error_for_status)
        .map_err(|e| SemgateError::Process(format!("failed to download {url}: {e}")))?;
    let bytes = response
        .bytes()
        .await
        .map_err(|e| SemgateError::Process(format!("failed to read {url}: {e}")))?;
    tokio::fs::write(dest, &bytes).await?;
    Ok(())
}

#[cfg(unix)]
fn make_executable(path: &Path) -> Result<(), SemgateError> {
    use std::os::unix::fs::PermissionsExt;

    let mut permissions = std::fs::metadata(path)?.permissions();
    permissions.set_mode(0o755);
    std::fs::set_permissions(path, permissions)?;
    Ok(())
}

#[cfg(not(unix))]
fn make_executable(_path: &Path) -> Result<(), SemgateError> {
    Ok(())
}
