use std::io::IsTerminal;
use std::path::{Path, PathBuf};

use clap::builder::FalseyValueParser;
use clap::{ArgAction, Args, CommandFactory, Parser, Subcommand};
use miette::{IntoDiagnostic, Result};
use tracing_subscriber::EnvFilter;

use semgate_cache::{
    derive_cache_key, KeySettings, LocalCacheStore, RustdocCache, SaveOutcome, ToolVersions,
};
use semgate_core::workflow::Workflow;
use semgate_core::{host_platform, split_list_input, CheckInputs, FeatureGroup, SemgateConfig};
use semgate_github::event::{parse_pr_reference, pull_request_from_env};
use semgate_github::{GitHubClient, ReleaseVersion};
use semgate_report::{plan_comment, post_comment, read_output_file, Classifier};
use semgate_toolchain::{
    install_semver_checks, process, run_semver_checks, rustup, CargoEnv, InstallMethod,
    InstallOptions,
};

const OUTPUT_NAME: &str = "cargo-semver-checks-output";

#[derive(Parser)]
#[command(
    name = "semgate",
    version,
    about = "Run cargo-semver-checks in CI with rustdoc caching and PR summaries",
    long_about = "semgate installs a Rust toolchain and cargo-semver-checks, runs\n\
                   `cargo semver-checks check-release`, caches the generated rustdoc between\n\
                   CI runs, and summarizes the result on the pull request.\n\n\
                   Every input can be given as a flag or as the GitHub Actions INPUT_<NAME>\n\
                   environment variable.\n\n\
                   Examples:\n  \
                     semgate check                          Run the checks for the current workspace\n  \
                     semgate check --package my-crate       Check a single package\n  \
                     semgate cache-key                      Print the rustdoc cache key\n  \
                     semgate comment --output-file out.txt  Comment the result on the pull request"
)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Path to configuration file (default: .semgate.toml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Enable debug logging
    #[arg(long, short, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Command {
    /// Install the tools, run cargo-semver-checks, and cache rustdoc
    #[command(long_about = "Install the tools, run cargo-semver-checks, and cache rustdoc.\n\n\
        Provisions the requested toolchain through rustup and cargo-semver-checks from\n\
        its prebuilt release (falling back to `cargo install`), restores the rustdoc\n\
        cache, runs `cargo semver-checks check-release`, publishes the captured output\n\
        as `cargo-semver-checks-output`, and saves the cache.\n\n\
        Examples:\n  semgate check\n  semgate check --feature-group all-features --release-type minor\n  semgate check --rust-toolchain manual --shared-key semver")]
    Check(CheckArgs),
    /// Print the rustdoc cache key for the current inputs
    #[command(
        long_about = "Print the rustdoc cache key for the current inputs.\n\n\
        Queries the rustc and cargo-semver-checks versions under the same toolchain pin\n\
        and hashes every Cargo.lock under the workspace, exactly as `semgate check`\n\
        does, without installing anything or touching the cache. Useful for debugging\n\
        cache misses."
    )]
    CacheKey {
        #[command(flatten)]
        inputs: InputArgs,
        #[command(flatten)]
        key: KeyArgs,
        /// Toolchain `semgate check` pins, or `manual` (default: stable)
        #[arg(long, env = "INPUT_RUST-TOOLCHAIN")]
        rust_toolchain: Option<String>,
    },
    /// Comment the check result on the triggering pull request
    #[command(long_about = "Comment the check result on the triggering pull request.\n\n\
        Classifies the captured cargo-semver-checks output, renders the template for the\n\
        resulting severity (patch, minor, major, warning, error), and posts it. The pull\n\
        request is read from $GITHUB_EVENT_PATH unless --pr is given. Outside a pull\n\
        request the command does nothing.\n\n\
        Examples:\n  semgate comment --output-file semver.txt\n  semgate comment --output-file semver.txt --dry-run")]
    Comment(CommentArgs),
    /// Generate shell completion scripts
    #[command(hide = true)]
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: clap_complete::Shell,
    },
}

/// Inputs that shape the `check-release` invocation.
#[derive(Args, Debug, Clone)]
struct InputArgs {
    /// Package to check (repeatable, or newline/comma separated)
    #[arg(long, env = "INPUT_PACKAGE")]
    package: Vec<String>,

    /// Package to exclude (repeatable, or newline/comma separated)
    #[arg(long, env = "INPUT_EXCLUDE")]
    exclude: Vec<String>,

    /// Path to Cargo.toml of the crate or workspace to check
    #[arg(long, env = "INPUT_MANIFEST-PATH")]
    manifest_path: Option<String>,

    /// Release type to check against (patch, minor, major)
    #[arg(long, env = "INPUT_RELEASE-TYPE")]
    release_type: Option<String>,

    /// Feature group: all-features, default-features, only-explicit-features
    #[arg(long, env = "INPUT_FEATURE-GROUP")]
    feature_group: Option<String>,

    /// Feature to enable (repeatable, or newline/comma separated)
    #[arg(long, env = "INPUT_FEATURES")]
    features: Vec<String>,

    /// Pass --verbose to cargo-semver-checks
    #[arg(
        long,
        env = "INPUT_VERBOSE",
        action = ArgAction::SetTrue,
        value_parser = FalseyValueParser::new()
    )]
    tool_verbose: bool,
}

impl InputArgs {
    fn to_check_inputs(&self) -> Result<CheckInputs> {
        let feature_group = FeatureGroup::parse_input(self.feature_group.as_deref().unwrap_or(""))?;
        Ok(CheckInputs {
            packages: split_list_input(&self.package),
            excludes: split_list_input(&self.exclude),
            manifest_path: non_empty(self.manifest_path.as_deref()),
            release_type: non_empty(self.release_type.as_deref()),
            feature_group,
            features: split_list_input(&self.features),
            verbose: self.tool_verbose,
        })
    }
}

/// Cache key overrides.
#[derive(Args, Debug, Clone)]
struct KeyArgs {
    /// First component of the cache key (default: semver)
    #[arg(long, env = "INPUT_PREFIX-KEY")]
    prefix_key: Option<String>,

    /// Replace the per-job component so several jobs share one cache
    #[arg(long, env = "INPUT_SHARED-KEY")]
    shared_key: Option<String>,

    /// Use this cache key verbatim instead of deriving one
    #[arg(long, env = "INPUT_CACHE-KEY")]
    cache_key: Option<String>,
}

impl KeyArgs {
    fn settings(&self, config: &SemgateConfig) -> KeySettings {
        KeySettings {
            prefix_key: non_empty(self.prefix_key.as_deref())
                .unwrap_or_else(|| config.cache.prefix_key.clone()),
            shared_key: non_empty(self.shared_key.as_deref()).or_else(|| config.cache.shared_key.clone()),
            cache_key: non_empty(self.cache_key.as_deref()).or_else(|| config.cache.cache_key.clone()),
            job: std::env::var("GITHUB_JOB").unwrap_or_default(),
        }
    }
}

#[derive(Args, Debug, Clone)]
struct CheckArgs {
    #[command(flatten)]
    inputs: InputArgs,

    #[command(flatten)]
    key: KeyArgs,

    /// Toolchain to install through rustup, or `manual` to skip (default: stable)
    #[arg(long, env = "INPUT_RUST-TOOLCHAIN")]
    rust_toolchain: Option<String>,

    /// cargo-semver-checks release: `latest` or a tag such as v0.36.0
    #[arg(long = "version", env = "INPUT_VERSION")]
    tool_version: Option<String>,

    /// Token for the GitHub API (GITHUB_TOKEN takes precedence)
    #[arg(long, env = "INPUT_GITHUB-TOKEN", hide_env_values = true)]
    github_token: Option<String>,

    /// Root directory of the local rustdoc cache store
    #[arg(long, env = "SEMGATE_CACHE_STORE")]
    cache_store: Option<PathBuf>,

    /// Directory prebuilt binaries are extracted under
    #[arg(long, env = "SEMGATE_TOOLS_DIR")]
    tools_dir: Option<PathBuf>,
}

#[derive(Args, Debug, Clone)]
struct CommentArgs {
    /// Captured cargo-semver-checks output
    #[arg(long, env = "INPUT_CARGO-SEMVER-CHECKS-OUTPUT")]
    output: Option<String>,

    /// Read the captured output from a file (wins over --output)
    #[arg(long)]
    output_file: Option<PathBuf>,

    /// Directory holding patch.txt, minor.txt, major.txt, warning.txt, error.txt
    #[arg(long, env = "INPUT_TEMPLATES-DIR")]
    templates_dir: Option<PathBuf>,

    /// Token for the GitHub API (GITHUB_TOKEN takes precedence)
    #[arg(long, env = "INPUT_GITHUB-TOKEN", hide_env_values = true)]
    github_token: Option<String>,

    /// Pull request to comment on (format: owner/repo#123)
    #[arg(long)]
    pr: Option<String>,

    /// Print the rendered comment instead of posting it
    #[arg(long)]
    dry_run: bool,
}

fn non_empty(value: Option<&str>) -> Option<String> {
    value.map(str::trim).filter(|v| !v.is_empty()).map(str::to_string)
}

fn load_config(path: Option<&Path>) -> Result<SemgateConfig> {
    match path {
        Some(path) => Ok(SemgateConfig::from_file(path)?),
        None => {
            let default_path = Path::new(".semgate.toml");
            if default_path.exists() {
                Ok(SemgateConfig::from_file(default_path)?)
            } else {
                Ok(SemgateConfig::default())
            }
        }
    }
}

fn init_tracing(verbose: bool) {
    let default = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .without_time()
        .init();
}

/// Directory whose `Cargo.lock` files feed the cache key.
///
/// A manifest path with an extension names a file, so its parent is used.
fn workspace_root(manifest_path: Option<&str>) -> PathBuf {
    let Some(manifest) = manifest_path else {
        return PathBuf::from("./");
    };
    let path = Path::new(manifest);
    if path.extension().is_some() {
        path.parent()
            .filter(|p| !p.as_os_str().is_empty())
            .map_or_else(|| PathBuf::from("./"), Path::to_path_buf)
    } else {
        path.to_path_buf()
    }
}

fn runner_tool_cache() -> Option<PathBuf> {
    std::env::var_os("RUNNER_TOOL_CACHE")
        .filter(|v| !v.is_empty())
        .map(PathBuf::from)
}

fn default_store_dir() -> PathBuf {
    runner_tool_cache().map_or_else(|| PathBuf::from(".semgate-cache"), |dir| dir.join("semgate"))
}

fn default_tools_dir() -> PathBuf {
    runner_tool_cache().unwrap_or_else(|| std::env::temp_dir().join("semgate-tools"))
}

fn default_templates_dir() -> PathBuf {
    if let Some(action) = std::env::var_os("GITHUB_ACTION_PATH").filter(|v| !v.is_empty()) {
        return PathBuf::from(action).join("resources").join("templates");
    }
    std::env::current_exe()
        .ok()
        .and_then(|exe| exe.parent().map(|dir| dir.join("resources").join("templates")))
        .filter(|dir| dir.is_dir())
        .unwrap_or_else(|| PathBuf::from("resources").join("templates"))
}

fn resolve_toolchain(arg: Option<&str>, config: &SemgateConfig) -> String {
    non_empty(arg).unwrap_or_else(|| config.toolchain.rust_toolchain.clone())
}

async fn tool_versions(env: &CargoEnv) -> Result<ToolVersions> {
    let rustc = process::rustc_version(env).await?;
    let semver_checks = process::semver_checks_version(env).await?;
    Ok(ToolVersions { rustc, semver_checks })
}

fn cache_key(
    inputs: &CheckInputs,
    key: &KeyArgs,
    config: &SemgateConfig,
    versions: &ToolVersions,
) -> Result<String> {
    let settings = key.settings(config);
    let root = workspace_root(inputs.manifest_path.as_deref());
    Ok(derive_cache_key(&settings, inputs, host_platform(), versions, &root)?)
}

async fn run_check(args: &CheckArgs, config: &SemgateConfig, workflow: &Workflow) -> Result<()> {
    let inputs = args.inputs.to_check_inputs()?;
    let toolchain = resolve_toolchain(args.rust_toolchain.as_deref(), config);
    let version = non_empty(args.tool_version.as_deref())
        .unwrap_or_else(|| config.toolchain.version.clone());

    let mut env = CargoEnv::from_process();
    tracing::debug!(target_dir = %env.target_dir.display(), "resolved cargo environment");

    rustup::install_toolchain(&toolchain, &mut env, workflow).await?;
    let rustc = process::rustc_version(&env).await?;
    env.settle_registry_protocol(&rustc);

    let options = InstallOptions {
        version: ReleaseVersion::parse(&version),
        github_token: non_empty(args.github_token.as_deref()),
        tools_dir: args.tools_dir.clone().unwrap_or_else(default_tools_dir),
    };
    match install_semver_checks(&options, &mut env, workflow).await? {
        InstallMethod::Present => tracing::debug!("using installed cargo-semver-checks"),
        InstallMethod::Prebuilt(dir) => {
            tracing::info!("installed prebuilt cargo-semver-checks into {}", dir.display());
        }
        InstallMethod::FromSource => tracing::info!("built cargo-semver-checks from source"),
    }

    let semver_checks = process::semver_checks_version(&env).await?;
    let versions = ToolVersions { rustc, semver_checks };
    let key = cache_key(&inputs, &args.key, config, &versions)?;

    let store_dir = args
        .cache_store
        .clone()
        .or_else(|| config.cache.store_dir.clone())
        .unwrap_or_else(default_store_dir);
    let cache_path = env.target_dir.join("semver-checks").join("cache");
    let mut cache = RustdocCache::new(LocalCacheStore::new(store_dir), cache_path, key);
    cache.restore()?;

    let run = run_semver_checks(&inputs, &env).await?;
    workflow.set_output(OUTPUT_NAME, &run.output)?;

    match cache.save()? {
        SaveOutcome::Saved(key) => tracing::debug!("saved rustdoc cache as {key}"),
        SaveOutcome::UpToDate => tracing::debug!("rustdoc cache unchanged"),
    }

    run.into_result()?;
    Ok(())
}

async fn run_cache_key(
    inputs: &InputArgs,
    key: &KeyArgs,
    toolchain: Option<&str>,
    config: &SemgateConfig,
) -> Result<()> {
    let inputs = inputs.to_check_inputs()?;
    let mut env = CargoEnv::from_process();
    rustup::pin_toolchain(&resolve_toolchain(toolchain, config), &mut env);

    let spinner = if std::io::stderr().is_terminal() {
        let pb = indicatif::ProgressBar::new_spinner();
        pb.set_style(
            indicatif::ProgressStyle::with_template("{spinner:.cyan} {msg} ({elapsed})")
                .into_diagnostic()?,
        );
        pb.set_message("Probing tool versions...");
        pb.enable_steady_tick(std::time::Duration::from_millis(120));
        Some(pb)
    } else {
        None
    };

    let versions = tool_versions(&env).await.inspect_err(|_e| {
        if let Some(pb) = &spinner {
            pb.finish_with_message("Failed");
        }
    })?;
    if let Some(pb) = spinner {
        pb.finish_and_clear();
    }

    println!("{}", cache_key(&inputs, key, config, &versions)?);
    Ok(())
}

async fn run_comment(args: &CommentArgs, config: &SemgateConfig) -> Result<()> {
    let output = match (&args.output, &args.output_file) {
        (_, Some(path)) => read_output_file(path)?,
        (Some(output), None) => output.clone(),
        (None, None) => String::new(),
    };

    let classifier = Classifier::new(&config.comment.patterns)?;
    tracing::debug!("{} classification patterns loaded", classifier.pattern_count());

    let templates_dir = args
        .templates_dir
        .clone()
        .or_else(|| config.comment.templates_dir.clone())
        .unwrap_or_else(default_templates_dir);
    let plan = plan_comment(&classifier, &output, &templates_dir)?;
    tracing::info!("Result severity: {}", plan.severity());

    if args.dry_run {
        print!("{}", plan.body);
        return Ok(());
    }

    let client = GitHubClient::from_env(non_empty(args.github_token.as_deref()).as_deref())?;

    let pull_request = match &args.pr {
        Some(reference) => Some(parse_pr_reference(reference)?),
        None => pull_request_from_env()?,
    };
    let Some(pr) = pull_request else {
        tracing::info!("Not a pull_request event. No further actions required.");
        return Ok(());
    };

    post_comment(&client, &pr, &plan).await?;
    Ok(())
}

async fn run(cli: Cli, workflow: &Workflow) -> Result<()> {
    let config = load_config(cli.config.as_deref())?;

    match cli.command {
        Command::Check(ref args) => run_check(args, &config, workflow).await,
        Command::CacheKey {
            ref inputs,
            ref key,
            ref rust_toolchain,
        } => run_cache_key(inputs, key, rust_toolchain.as_deref(), &config).await,
        Command::Comment(ref args) => run_comment(args, &config).await,
        Command::Completions { shell } => {
            let mut cmd = Cli::command();
            clap_complete::generate(shell, &mut cmd, "semgate", &mut std::io::stdout());
            Ok(())
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    miette::set_hook(Box::new(|_| {
        Box::new(
            miette::MietteHandlerOpts::new()
                .terminal_links(true)
                .build(),
        )
    }))
    .expect("miette handler");
    human_panic::setup_panic!();

    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let workflow = Workflow::from_env();
    if let Err(err) = run(cli, &workflow).await {
        workflow.error(&err.to_string());
        return Err(err);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn workspace_root_from_manifest_path() {
        assert_eq!(workspace_root(None), PathBuf::from("./"));
        assert_eq!(workspace_root(Some("Cargo.toml")), PathBuf::from("./"));
        assert_eq!(
            workspace_root(Some("crates/foo/Cargo.toml")),
            PathBuf::from("crates/foo")
        );
        assert_eq!(workspace_root(Some("crates/foo")), PathBuf::from("crates/foo"));
    }

    #[test]
    fn list_inputs_are_split() {
        let cli = Cli::try_parse_from([
            "semgate",
            "check",
            "--package",
            "a,b",
            "--package",
            "c",
            "--features",
            "x\ny",
            "--feature-group",
            "all-features",
        ])
        .unwrap();
        let Command::Check(args) = cli.command else {
            panic!("expected check");
        };
        let inputs = args.inputs.to_check_inputs().unwrap();
        assert_eq!(inputs.packages, vec!["a", "b", "c"]);
        assert_eq!(inputs.features, vec!["x", "y"]);
        assert_eq!(inputs.feature_group, Some(FeatureGroup::AllFeatures));
        assert!(!inputs.verbose);
    }

    #[test]
    fn unknown_feature_group_is_rejected() {
        let cli =
            Cli::try_parse_from(["semgate", "cache-key", "--feature-group", "some"]).unwrap();
        let Command::CacheKey { inputs, .. } = cli.command else {
            panic!("expected cache-key");
        };
        let err = inputs.to_check_inputs().unwrap_err();
        assert!(err.to_string().contains("Unsupported feature group"));
    }

    #[test]
    fn cache_key_takes_the_check_toolchain() {
        let config = SemgateConfig::default();
        let cli =
            Cli::try_parse_from(["semgate", "cache-key", "--rust-toolchain", "nightly"]).unwrap();
        let Command::CacheKey { rust_toolchain, .. } = cli.command else {
            panic!("expected cache-key");
        };
        assert_eq!(resolve_toolchain(rust_toolchain.as_deref(), &config), "nightly");
        assert_eq!(
            resolve_toolchain(Some(""), &config),
            config.toolchain.rust_toolchain
        );
    }

    #[test]
    fn key_settings_fall_back_to_config() {
        let config = SemgateConfig::from_toml(
            "[cache]\nprefix_key = \"docs\"\nshared_key = \"shared\"\n",
        )
        .unwrap();
        let key = KeyArgs {
            prefix_key: None,
            shared_key: Some("  ".into()),
            cache_key: None,
        };
        let settings = key.settings(&config);
        assert_eq!(settings.prefix_key, "docs");
        assert_eq!(settings.shared_key.as_deref(), Some("shared"));
        assert!(settings.cache_key.is_none());

        let key = KeyArgs {
            prefix_key: Some("cli".into()),
            shared_key: None,
            cache_key: Some("fixed".into()),
        };
        let settings = key.settings(&config);
        assert_eq!(settings.prefix_key, "cli");
        assert_eq!(settings.cache_key.as_deref(), Some("fixed"));
    }
}
