use std::path::Path;

use semgate_core::SemgateError;
use tokio::io::AsyncWriteExt;

const USER_AGENT: &str = concat!("semgate/", env!("CARGO_PKG_VERSION"));

const MISSING_TOKEN: &str = "Querying the GitHub API is possible only if the GitHub token is set.";

/// Pick the GitHub token: the `GITHUB_TOKEN` environment value wins over the
/// `github-token` input. Empty values count as unset.
///
/// # Errors
///
/// Returns [`SemgateError::Config`] when neither is set.
///
/// # Examples
///
/// ```
/// use semgate_github::client::resolve_token;
///
/// assert_eq!(resolve_token(Some("env"), Some("input")).unwrap(), "env");
/// assert_eq!(resolve_token(Some(""), Some("input")).unwrap(), "input");
/// assert!(resolve_token(None, None).is_err());
/// ```
pub fn resolve_token(env: Option<&str>, input: Option<&str>) -> Result<String, SemgateError> {
    env.filter(|t| !t.is_empty())
        .or(input.filter(|t| !t.is_empty()))
        .map(str::to_string)
        .ok_or_else(|| SemgateError::Config(MISSING_TOKEN.into()))
}

/// A release asset: file name and API download URL.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReleaseAsset {
    pub name: String,
    pub url: String,
}

/// Which release to download.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReleaseVersion {
    Latest,
    Tag(String),
}

impl ReleaseVersion {
    /// `latest` (or empty) means the newest release; anything else is a tag.
    pub fn parse(value: &str) -> Self {
        match value.trim() {
            "" | "latest" => ReleaseVersion::Latest,
            tag => ReleaseVersion::Tag(tag.to_string()),
        }
    }
}

/// Find the `.tar.gz` asset built for `target`.
///
/// # Errors
///
/// Returns [`SemgateError::GitHub`] when the release has no such asset.
///
/// # Examples
///
/// ```
/// use semgate_github::client::{select_asset, ReleaseAsset};
///
/// let assets = vec![
///     ReleaseAsset { name: "tool-x86_64-apple-darwin.tar.gz".into(), url: "a".into() },
///     ReleaseAsset { name: "tool-x86_64-unknown-linux-gnu.tar.gz".into(), url: "b".into() },
/// ];
/// let asset = select_asset(&assets, "x86_64-unknown-linux-gnu").unwrap();
/// assert_eq!(asset.url, "b");
/// ```
pub fn select_asset<'a>(
    assets: &'a [ReleaseAsset],
    target: &str,
) -> Result<&'a ReleaseAsset, SemgateError> {
    let suffix = format!("{target}.tar.gz");
    assets
        .iter()
        .find(|asset| asset.name.ends_with(&suffix))
        .ok_or_else(|| SemgateError::GitHub(format!("Couldn't find a release for target {target}.")))
}

/// GitHub client for release lookups, asset downloads, and PR comments.
pub struct GitHubClient {
    octocrab: octocrab::Octocrab,
    http: reqwest::Client,
    token: String,
}

impl GitHubClient {
    /// Create a client authenticated with `token`.
    ///
    /// # Errors
    ///
    /// Returns [`SemgateError::GitHub`] if the client cannot be built.
    pub fn new(token: &str) -> Result<Self, SemgateError> {
        let octocrab = octocrab::Octocrab::builder()
            .personal_token(token.to_string())
            .build()
            .map_err(|e| SemgateError::GitHub(format!("failed to create GitHub client: {e}")))?;

        let http = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .build()
            .map_err(|e| SemgateError::GitHub(format!("failed to create HTTP client: {e}")))?;

        Ok(Self {
            octocrab,
            http,
            token: token.to_string(),
        })
    }

    /// Create a client from `GITHUB_TOKEN` or the given input value.
    pub fn from_env(input_token: Option<&str>) -> Result<Self, SemgateError> {
        let env = std::env::var("GITHUB_TOKEN").ok();
        let token = resolve_token(env.as_deref(), input_token)?;
        Self::new(&token)
    }

    /// List the assets of the latest release, or of the release tagged `tag`.
    ///
    /// # Errors
    ///
    /// Returns [`SemgateError::GitHub`] on network or API errors.
    pub async fn release_assets(
        &self,
        owner: &str,
        repo: &str,
        version: &ReleaseVersion,
    ) -> Result<Vec<ReleaseAsset>, SemgateError> {
        let repos = self.octocrab.repos(owner, repo);
        let releases = repos.releases();
        let release = match version {
            ReleaseVersion::Latest => releases.get_latest().await,
            ReleaseVersion::Tag(tag) => releases.get_by_tag(tag).await,
        }
        .map_err(|e| SemgateError::GitHub(format!("failed to fetch release of {owner}/{repo}: {e}")))?;

        Ok(release
            .assets
            .into_iter()
            .map(|asset| ReleaseAsset {
                name: asset.name,
                url: asset.url.to_string(),
            })
            .collect())
    }

    /// Download a release asset through the API into `dest`.
    ///
    /// # Errors
    ///
    /// Returns [`SemgateError::GitHub`] on network or HTTP errors, or
    /// [`SemgateError::Io`] if `dest` cannot be written.
    pub async fn download_asset(&self, url: &str, dest: &Path) -> Result<(), SemgateError> {
        let response = self
            .http
            .get(url)
            .header("Accept", "application/octet-stream")
            .header("Authorization", format!("token {}", self.token))
            .send()
            .await
            .map_err(|e| SemgateError::GitHub(format!("failed to download {url}: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(SemgateError::GitHub(format!(
                "GitHub API error {status}: {body}"
            )));
        }

        let bytes = response
            .bytes()
            .await
            .map_err(|e| SemgateError::GitHub(format!("failed to read {url}: {e}")))?;

        let mut file = tokio::fs::File::create(dest).await?;
        file.write_all(&bytes).await?;
        file.flush().await?;
        Ok(())
    }

    /// Post a comment on a pull request (issues API).
    ///
    /// # Errors
    ///
    /// Returns [`SemgateError::GitHub`] on API errors.
    pub async fn create_issue_comment(
        &self,
        owner: &str,
        repo: &str,
        number: u64,
        body: &str,
    ) -> Result<(), SemgateError> {
        self.octocrab
            .issues(owner, repo)
            .create_comment(number, body)
            .await
            .map_err(|e| SemgateError::GitHub(format!("failed to post comment: {e}")))?;
        Ok(())
    }
}
