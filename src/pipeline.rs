//! One complete run: read the script, reconcile, commit and tag.
//!
//! Runs strictly in sequence. The tag is only created once the commit has
//! succeeded, so a failed run never leaves a tag without its commit.
use crate::publish::{CommitAuthor, CommitRequest, PublishError, Publisher};
use crate::reconcile::{NoUpdateReason, ReconcileOutcome, Reconciler};
use crate::release::ReleaseSource;

/// Where the artifact lives in the remote store.
#[derive(Debug, Clone)]
pub struct PublishTarget {
    pub path: String,
    pub branch: String,
    pub author: CommitAuthor,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct RunOptions {
    /// Patch even when the channels disagree.
    pub force: bool,
    /// Reconcile but never write to the remote store.
    pub dry_run: bool,
}

/// What a run ended up doing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunReport {
    NoUpdate(NoUpdateReason),
    /// An update was found but `dry_run` kept it from being published.
    DryRun { version: String },
    Published { version: String, commit_sha: String },
}

/// Executes one run against `publisher`.
///
/// # Errors
///
/// Only remote store failures are errors; release channel problems end in
/// [`RunReport::NoUpdate`].
pub async fn run<P, O, C>(
    publisher: &P,
    reconciler: &Reconciler<O, C>,
    target: &PublishTarget,
    options: RunOptions,
) -> Result<RunReport, PublishError>
where
    P: Publisher,
    O: ReleaseSource,
    C: ReleaseSource,
{
    tracing::info!(path = %target.path, branch = %target.branch, "Fetching current artifact...");
    let remote = publisher
        .get_artifact(&target.path, &target.branch)
        .await
        .inspect_err(|e| tracing::error!(error = %e, "Failed to fetch current artifact"))?;

    let current_version = reconciler.model().current_version(&remote.content);
    tracing::info!(version = %current_version, "Current version: {current_version}");

    let (version, artifact) = match reconciler
        .reconcile(&current_version, &remote.content, options.force)
        .await
    {
        ReconcileOutcome::NoUpdate { reason, .. } => {
            tracing::info!(reason = %reason, "No updates found for {reason}");
            return Ok(RunReport::NoUpdate(reason));
        }
        ReconcileOutcome::Updated { version, artifact } => (version, artifact),
    };

    tracing::info!(version = %version, "New version found: {version}");

    if options.dry_run {
        tracing::info!("Dry run, leaving remote artifact untouched");
        return Ok(RunReport::DryRun { version });
    }

    let message = format!("Update to {version}");
    let commit_sha = publisher
        .commit_artifact(&CommitRequest {
            path: &target.path,
            branch: &target.branch,
            content: &artifact,
            base_sha: &remote.sha,
            message: &message,
            author: &target.author,
        })
        .await
        .inspect_err(|e| tracing::error!(error = %e, "Failed to commit updated artifact"))?;

    publisher
        .create_tag(&version, &commit_sha)
        .await
        .inspect_err(|e| tracing::error!(error = %e, tag = %version, "Failed to create tag"))?;

    tracing::info!(version = %version, commit = %commit_sha, "Remote artifact updated");
    Ok(RunReport::Published {
        version,
        commit_sha,
    })
}
