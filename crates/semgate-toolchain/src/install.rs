//! Provisioning of the `cargo-semver-checks` binary.

use std::path::{Path, PathBuf};

use semgate_core::workflow::Workflow;
use semgate_core::{RunnerOs, SemgateError};
use semgate_github::client::select_asset;
use semgate_github::{GitHubClient, ReleaseVersion};

use crate::env::CargoEnv;
use crate::process;

pub const TOOL_NAME: &str = "cargo-semver-checks";
const RELEASE_OWNER: &str = "obi1kenobi";
const RELEASE_REPO: &str = "cargo-semver-checks";

/// How the lint tool ended up available.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InstallMethod {
    /// Already on the search path.
    Present,
    /// Prebuilt release binary extracted into this directory.
    Prebuilt(PathBuf),
    /// Built from source with `cargo install`.
    FromSource,
}

/// Options for [`install_semver_checks`].
#[derive(Debug, Clone)]
pub struct InstallOptions {
    pub version: ReleaseVersion,
    /// `github-token` input; `GITHUB_TOKEN` takes precedence.
    pub github_token: Option<String>,
    /// Directory prebuilt binaries are extracted under.
    pub tools_dir: PathBuf,
}

/// Make `cargo-semver-checks` available, installing it if needed.
///
/// Prefers the prebuilt release binary for the current runner. Any failure
/// on that path falls back to `cargo install`.
///
/// # Errors
///
/// Returns [`SemgateError::Process`] if the `cargo install` fallback fails.
pub async fn install_semver_checks(
    options: &InstallOptions,
    env: &mut CargoEnv,
    workflow: &Workflow,
) -> Result<InstallMethod, SemgateError> {
    if env.which(TOOL_NAME).is_some() {
        tracing::debug!("{TOOL_NAME} found on PATH");
        return Ok(InstallMethod::Present);
    }

    tracing::info!("{TOOL_NAME} is not installed, installing now...");

    match install_prebuilt(options).await {
        Ok(bin_dir) => {
            workflow.add_path(&bin_dir)?;
            env.prepend_path(bin_dir.clone());
            Ok(InstallMethod::Prebuilt(bin_dir))
        }
        Err(e) => {
            tracing::info!("Failed to download precompiled binary of {TOOL_NAME}.");
            tracing::info!("Error: {e}");
            tracing::info!("Installing using cargo install...");

            let args = cargo_install_args(&options.version);
            let args: Vec<&str> = args.iter().map(String::as_str).collect();
            process::run("cargo", &args, env).await?;
            Ok(InstallMethod::FromSource)
        }
    }
}

async fn install_prebuilt(options: &InstallOptions) -> Result<PathBuf, SemgateError> {
    let target = RunnerOs::current()?.target_triple();
    let client = GitHubClient::from_env(options.github_token.as_deref())?;

    let assets = client
        .release_assets(RELEASE_OWNER, RELEASE_REPO, &options.version)
        .await?;
    let asset = select_asset(&assets, target)?;

    let dest = install_dir(&options.tools_dir, &options.version);
    tokio::fs::create_dir_all(&dest).await?;
    let tarball = dest.join(&asset.name);

    tracing::info!("downloading {TOOL_NAME} from {}", asset.url);
    client.download_asset(&asset.url, &tarball).await?;

    tracing::info!("extracting {}", tarball.display());
    extract_tarball(&tarball, &dest).await?;
    tokio::fs::remove_file(&tarball).await?;

    Ok(dest)
}

/// `<tools_dir>/cargo-semver-checks/<tag or "latest">`.
pub fn install_dir(tools_dir: &Path, version: &ReleaseVersion) -> PathBuf {
    let version = match version {
        ReleaseVersion::Latest => "latest",
        ReleaseVersion::Tag(tag) => tag.as_str(),
    };
    tools_dir.join(TOOL_NAME).join(version)
}

async fn extract_tarball(tarball: &Path, dest: &Path) -> Result<(), SemgateError> {
    let tarball = tarball.to_string_lossy();
    let dest = dest.to_string_lossy();
    process::run(
        "tar",
        &["-xzf", &tarball, "-C", &dest],
        &CargoEnv::from_process(),
    )
    .await
}

/// Arguments of the `cargo install` fallback.
///
/// A pinned tag is passed as `--version` without its leading `v`.
///
/// # Examples
///
/// ```
/// use semgate_github::ReleaseVersion;
/// use semgate_toolchain::install::cargo_install_args;
///
/// assert_eq!(
///     cargo_install_args(&ReleaseVersion::Tag("v0.36.0".into())),
///     vec!["install", "cargo-semver-checks", "--locked", "--version", "0.36.0"],
/// );
/// ```
pub fn cargo_install_args(version: &ReleaseVersion) -> Vec<String> {
    let mut args = vec![
        "install".to_string(),
        TOOL_NAME.to_string(),
        "--locked".to_string(),
    ];
    if let ReleaseVersion::Tag(tag) = version {
        args.push("--version".to_string());
        args.push(tag.strip_prefix('v').unwrap_or(tag).to_string());
    }
    args
}
