use std::path::Path;

use semgate_core::{ResultSummary, SemgateError, Severity};
use semgate_github::{GitHubClient, PullRequestRef};

use crate::classify::Classifier;
use crate::template::{load_template, render};

/// A classified result and the comment body rendered for it.
#[derive(Debug, Clone)]
pub struct CommentPlan {
    pub summary: ResultSummary,
    pub body: String,
}

impl CommentPlan {
    pub fn severity(&self) -> Severity {
        self.summary.severity()
    }
}

/// Classify `output` and render the matching template.
///
/// # Errors
///
/// Returns [`SemgateError::Config`] for empty output and
/// [`SemgateError::Template`] when the template is missing.
pub fn plan_comment(
    classifier: &Classifier,
    output: &str,
    templates_dir: &Path,
) -> Result<CommentPlan, SemgateError> {
    tracing::debug!("Parsing cargo-semver-checks output: {output}");
    let summary = classifier.classify(output)?;
    let template = load_template(templates_dir, summary.severity())?;
    let body = render(&template, &summary);
    Ok(CommentPlan { summary, body })
}

/// Read lint output saved by an earlier step.
///
/// # Errors
///
/// Returns [`SemgateError::FileNotFound`] when `path` does not exist.
pub fn read_output_file(path: &Path) -> Result<String, SemgateError> {
    std::fs::read_to_string(path).map_err(|e| match e.kind() {
        std::io::ErrorKind::NotFound => SemgateError::FileNotFound(path.to_path_buf()),
        _ => SemgateError::Io(e),
    })
}

/// Post the planned comment on `pr`.
pub async fn post_comment(
    client: &GitHubClient,
    pr: &PullRequestRef,
    plan: &CommentPlan,
) -> Result<(), SemgateError> {
    client
        .create_issue_comment(&pr.owner, &pr.repo, pr.number, &plan.body)
        .await?;
    tracing::info!("Comment posted on pull request #{}", pr.number);
    Ok(())
}
