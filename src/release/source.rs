use async_trait::async_trait;
use tracing::{Instrument, Span};

use super::{
    DownloadButtonExtractor, FeedTitleExtractor, Release, ReleaseExtractor, SENTINEL_VERSION,
};
use crate::transport::Transport;

/// Something that can report the latest release on a channel.
///
/// Never fails: any problem reaching or reading the channel is logged and
/// reported as `None`.
#[async_trait]
pub trait ReleaseSource: Send + Sync {
    async fn latest(&self) -> Option<Release>;
}

/// Fetches one URL and hands the body to a [`ReleaseExtractor`].
///
/// Log output is recorded inside the span supplied at construction.
#[derive(Debug, Clone)]
pub struct Scraper<E> {
    transport: Transport,
    url: String,
    extractor: E,
    span: Span,
}

/// Official channel scraper.
pub type PageScraper = Scraper<DownloadButtonExtractor>;

/// Community channel scraper.
pub type FeedScraper = Scraper<FeedTitleExtractor>;

impl<E: ReleaseExtractor> Scraper<E> {
    pub fn new(transport: Transport, url: impl Into<String>, extractor: E, span: Span) -> Self {
        Self {
            transport,
            url: url.into(),
            extractor,
            span,
        }
    }
}

#[async_trait]
impl<E: ReleaseExtractor> ReleaseSource for Scraper<E> {
    async fn latest(&self) -> Option<Release> {
        let channel = self.extractor.channel();

        async {
            tracing::info!(url = %self.url, "Fetching {channel} version info...");

            let body = match self.transport.fetch(&self.url).await {
                Ok(body) => body,
                Err(e) => {
                    tracing::warn!(error = %e, "Cannot fetch {channel} release page");
                    return None;
                }
            };

            let release = match self.extractor.extract(&body) {
                Ok(release) => release,
                Err(e) => {
                    tracing::warn!(error = %e, "Failed to parse {channel} release page");
                    return None;
                }
            };

            let version = release
                .as_ref()
                .map_or(SENTINEL_VERSION, |r| r.version.as_str());
            tracing::info!(version = %version, "{channel} version: {version}");

            release
        }
        .instrument(self.span.clone())
        .await
    }
}
