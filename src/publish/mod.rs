//! Remote store for the deploy script.
//!
//! - [`github`] - GitHub REST implementation (contents + git refs API)
//!
//! Unlike the release channels, failures here are fatal to a run.

pub mod github;

use async_trait::async_trait;
use thiserror::Error;

pub use github::GithubPublisher;

#[derive(Debug, Error)]
pub enum PublishError {
    #[error("Failed to build HTTP client: {0}")]
    Client(#[source] reqwest::Error),
    #[error("Request failed: {0}")]
    Network(#[from] reqwest::Error),
    #[error("Request timed out")]
    Timeout,
    #[error("Invalid API URL: {0}")]
    Url(#[from] url::ParseError),
    #[error("API error: status {status}: {body}")]
    Api { status: u16, body: String },
    #[error("Unexpected API response: {0}")]
    InvalidResponse(String),
}

/// Current state of the artifact in the remote store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteArtifact {
    pub content: String,
    /// Revision of the content, required to commit on top of it
    pub sha: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommitAuthor {
    pub name: String,
    pub email: String,
}

/// A single-file commit on top of a known revision.
#[derive(Debug, Clone)]
pub struct CommitRequest<'a> {
    pub path: &'a str,
    pub branch: &'a str,
    pub content: &'a str,
    pub base_sha: &'a str,
    pub message: &'a str,
    pub author: &'a CommitAuthor,
}

/// Read, commit and tag operations against the store holding the artifact.
#[async_trait]
pub trait Publisher: Send + Sync {
    async fn get_artifact(&self, path: &str, branch: &str) -> Result<RemoteArtifact, PublishError>;

    /// Returns the sha of the new commit.
    async fn commit_artifact(&self, request: &CommitRequest<'_>) -> Result<String, PublishError>;

    async fn create_tag(&self, name: &str, sha: &str) -> Result<(), PublishError>;
}
