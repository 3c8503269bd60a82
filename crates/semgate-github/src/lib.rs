//! GitHub integration: API client, release assets, and workflow event context.

pub mod client;
pub mod event;

pub use client::{GitHubClient, ReleaseAsset, ReleaseVersion};
pub use event::PullRequestRef;
