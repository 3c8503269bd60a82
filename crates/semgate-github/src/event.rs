use std::path::Path;

use semgate_core::SemgateError;

/// Where a comment should go: repository and pull request number.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PullRequestRef {
    pub owner: String,
    pub repo: String,
    pub number: u64,
}

/// Resolve the pull request that triggered this workflow run.
///
/// Reads `GITHUB_REPOSITORY` and the event payload at `GITHUB_EVENT_PATH`.
/// Returns `Ok(None)` for events that are not about a pull request.
///
/// # Errors
///
/// Returns [`SemgateError::Config`] if `GITHUB_REPOSITORY` is missing or
/// malformed, or the payload cannot be read or parsed.
pub fn pull_request_from_env() -> Result<Option<PullRequestRef>, SemgateError> {
    let Some(event_path) = std::env::var_os("GITHUB_EVENT_PATH") else {
        tracing::debug!("GITHUB_EVENT_PATH not set");
        return Ok(None);
    };
    let repository = std::env::var("GITHUB_REPOSITORY")
        .map_err(|_| SemgateError::Config("GITHUB_REPOSITORY is not set".into()))?;
    pull_request_from_event(&repository, Path::new(&event_path))
}

/// Resolve the pull request from an explicit repository and event file.
pub fn pull_request_from_event(
    repository: &str,
    event_path: &Path,
) -> Result<Option<PullRequestRef>, SemgateError> {
    let content = std::fs::read_to_string(event_path).map_err(|e| {
        SemgateError::Config(format!(
            "failed to read event payload {}: {e}",
            event_path.display()
        ))
    })?;
    let payload: serde_json::Value = serde_json::from_str(&content)?;

    let Some(number) = pull_request_number(&payload) else {
        return Ok(None);
    };
    let (owner, repo) = parse_repository(repository)?;
    Ok(Some(PullRequestRef {
        owner,
        repo,
        number,
    }))
}

/// `pull_request.number` from a webhook payload.
///
/// # Examples
///
/// ```
/// use semgate_github::event::pull_request_number;
///
/// let payload = serde_json::json!({ "pull_request": { "number": 7 } });
/// assert_eq!(pull_request_number(&payload), Some(7));
/// assert_eq!(pull_request_number(&serde_json::json!({ "ref": "main" })), None);
/// ```
pub fn pull_request_number(payload: &serde_json::Value) -> Option<u64> {
    payload.get("pull_request")?.get("number")?.as_u64()
}

/// Split `owner/repo`.
pub fn parse_repository(repository: &str) -> Result<(String, String), SemgateError> {
    match repository.split_once('/') {
        Some((owner, repo)) if !owner.is_empty() && !repo.is_empty() && !repo.contains('/') => {
            Ok((owner.to_string(), repo.to_string()))
        }
        _ => Err(SemgateError::Config(format!(
            "invalid repository '{repository}', expected owner/repo"
        ))),
    }
}

/// Parse a PR reference string (`owner/repo#number`).
///
/// # Errors
///
/// Returns [`SemgateError::Config`] if the format is invalid.
///
/// # Examples
///
/// ```
/// use semgate_github::event::parse_pr_reference;
///
/// let pr = parse_pr_reference("obi1kenobi/cargo-semver-checks#42").unwrap();
/// assert_eq!(pr.owner, "obi1kenobi");
/// assert_eq!(pr.repo, "cargo-semver-checks");
/// assert_eq!(pr.number, 42);
/// ```
pub fn parse_pr_reference(pr_ref: &str) -> Result<PullRequestRef, SemgateError> {
    let Some((owner_repo, number_str)) = pr_ref.split_once('#') else {
        return Err(SemgateError::Config(format!(
            "invalid PR reference '{pr_ref}', expected owner/repo#number"
        )));
    };
    let (owner, repo) = parse_repository(owner_repo).map_err(|_| {
        SemgateError::Config(format!(
            "invalid PR reference '{pr_ref}', expected owner/repo#number"
        ))
    })?;
    let number: u64 = number_str
        .parse()
        .map_err(|_| SemgateError::Config(format!("invalid PR number: {number_str}")))?;
    Ok(PullRequestRef {
        owner,
        repo,
        number,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_valid_pr_reference() {
        let pr = parse_pr_reference("rust-lang/rust#12345").unwrap();
        assert_eq!(
            pr,
            PullRequestRef {
                owner: "rust-lang".into(),
                repo: "rust".into(),
                number: 12345,
            }
        );
    }

    #[test]
    fn parse_pr_reference_missing_hash() {
        assert!(parse_pr_reference("owner/repo").is_err());
    }

    #[test]
    fn parse_pr_reference_missing_slash() {
        assert!(parse_pr_reference("repo#123").is_err());
    }

    #[test]
    fn parse_pr_reference_invalid_number() {
        assert!(parse_pr_reference("owner/repo#abc").is_err());
    }

    #[test]
    fn repository_requires_two_parts() {
        assert!(parse_repository("owner").is_err());
        assert!(parse_repository("owner/").is_err());
        assert!(parse_repository("a/b/c").is_err());
        assert_eq!(
            parse_repository("a/b").unwrap(),
            ("a".to_string(), "b".to_string())
        );
    }

    #[test]
    fn event_with_pull_request() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("event.json");
        std::fs::write(&path, r#"{"action":"opened","pull_request":{"number":17}}"#).unwrap();

        let pr = pull_request_from_event("octo/widgets", &path).unwrap().unwrap();
        assert_eq!(pr.owner, "octo");
        assert_eq!(pr.repo, "widgets");
        assert_eq!(pr.number, 17);
    }

    #[test]
    fn push_event_has_no_pull_request() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("event.json");
        std::fs::write(&path, r#"{"ref":"refs/heads/main"}"#).unwrap();

        assert_eq!(pull_request_from_event("octo/widgets", &path).unwrap(), None);
    }

    #[test]
    fn unreadable_event_is_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = pull_request_from_event("octo/widgets", &dir.path().join("missing.json"))
            .unwrap_err();
        assert!(matches!(err, SemgateError::Config(_)));
    }
}
