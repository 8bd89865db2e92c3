//! Decides whether the deploy script should move to a new release pair.
//!
//! An update needs both channels to agree: the official build must be newer
//! than the one recorded in the script, and the community feed must already
//! carry a build with the same version. Channel failures never abort a run;
//! they read as the sentinel release and end in [`ReconcileOutcome::NoUpdate`].
use std::fmt;
use tracing::{Instrument, Span};

use crate::artifact::ArtifactModel;
use crate::config::Config;
use crate::release::{
    DownloadButtonExtractor, FeedScraper, FeedTitleExtractor, PageScraper, Release,
    ReleaseSource, VersionOrdering,
};
use crate::transport::Transport;

/// Why a run produced no commit-worthy update.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NoUpdateReason {
    /// The official channel is not ahead of the recorded version.
    OfficialNotNewer { official: String },
    /// The official channel moved but the community feed has not caught up.
    CommunityBehind { community: String },
}

impl fmt::Display for NoUpdateReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NoUpdateReason::OfficialNotNewer { official } => {
                write!(f, "official channel, current: {official}")
            }
            NoUpdateReason::CommunityBehind { community } => {
                write!(f, "community channel, current: {community}")
            }
        }
    }
}

/// Result of one reconciliation pass.
///
/// Both arms carry the artifact text. Under force mode a `NoUpdate` may hold
/// a patched artifact.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReconcileOutcome {
    Updated {
        version: String,
        artifact: String,
    },
    NoUpdate {
        reason: NoUpdateReason,
        artifact: String,
    },
}

impl ReconcileOutcome {
    pub fn artifact(&self) -> &str {
        match self {
            ReconcileOutcome::Updated { artifact, .. }
            | ReconcileOutcome::NoUpdate { artifact, .. } => artifact,
        }
    }

    pub fn is_updated(&self) -> bool {
        matches!(self, ReconcileOutcome::Updated { .. })
    }
}

/// Combines the two channels with the artifact model.
pub struct Reconciler<O, C> {
    official: O,
    community: C,
    model: ArtifactModel,
    ordering: Box<dyn VersionOrdering>,
    span: Span,
}

impl<O: ReleaseSource, C: ReleaseSource> Reconciler<O, C> {
    pub fn new(
        official: O,
        community: C,
        model: ArtifactModel,
        ordering: Box<dyn VersionOrdering>,
        span: Span,
    ) -> Self {
        Self {
            official,
            community,
            model,
            ordering,
            span,
        }
    }

    pub fn model(&self) -> &ArtifactModel {
        &self.model
    }

    /// Runs one pass against `current_artifact`, whose recorded version is
    /// `current_version`.
    ///
    /// The community channel is only consulted when the official channel is
    /// newer or `force` is set. With `force`, the artifact is patched even if
    /// the channels disagree, but the reported outcome still follows the
    /// usual rules, so a forced patch can come back as `NoUpdate`.
    pub async fn reconcile(
        &self,
        current_version: &str,
        current_artifact: &str,
        force: bool,
    ) -> ReconcileOutcome {
        async {
            let official = self.official.latest().await.unwrap_or_else(Release::sentinel);
            let official_newer = self.ordering.is_newer(&official.version, current_version);

            if !official_newer && !force {
                tracing::debug!(
                    official = %official.version,
                    current = %current_version,
                    "Official channel not newer, skipping community channel"
                );
                return ReconcileOutcome::NoUpdate {
                    reason: NoUpdateReason::OfficialNotNewer {
                        official: official.version,
                    },
                    artifact: current_artifact.to_owned(),
                };
            }

            let community = self.community.latest().await.unwrap_or_else(Release::sentinel);

            let artifact = if community.version == official.version || force {
                if community.version != official.version {
                    tracing::warn!(
                        official = %official.version,
                        community = %community.version,
                        "Force mode: patching regardless of channel agreement"
                    );
                }
                self.model.patch(
                    current_artifact,
                    &official.version,
                    &official.download_url,
                    &community.download_url,
                )
            } else {
                current_artifact.to_owned()
            };

            // Evaluated against the first comparison even when force patched above
            if !official_newer {
                ReconcileOutcome::NoUpdate {
                    reason: NoUpdateReason::OfficialNotNewer {
                        official: official.version,
                    },
                    artifact,
                }
            } else if community.version != official.version {
                ReconcileOutcome::NoUpdate {
                    reason: NoUpdateReason::CommunityBehind {
                        community: community.version,
                    },
                    artifact,
                }
            } else {
                ReconcileOutcome::Updated {
                    version: official.version,
                    artifact,
                }
            }
        }
        .instrument(self.span.clone())
        .await
    }
}

impl Reconciler<PageScraper, FeedScraper> {
    /// Wires the live scrapers described by `config` onto `transport`.
    pub fn from_config(config: &Config, transport: Transport) -> Self {
        let official = PageScraper::new(
            transport.clone(),
            config.official_page_url.clone(),
            DownloadButtonExtractor::new(config.download_button_class.clone()),
            tracing::info_span!("official"),
        );
        let community = FeedScraper::new(
            transport,
            config.community_feed_url.clone(),
            FeedTitleExtractor::new(
                config.device_model.clone(),
                config.community_download_base.clone(),
            ),
            tracing::info_span!("community", device = %config.device_model),
        );

        Self::new(
            official,
            community,
            ArtifactModel::new(config.markers.clone()),
            config.version_ordering.build(),
            tracing::info_span!("reconcile"),
        )
    }
}
