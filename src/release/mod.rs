//! Release discovery for the two publication channels.
//!
//! - [`page`] - the vendor download page (official channel)
//! - [`feed`] - the community RSS feed
//! - [`ordering`] - how two version tokens are compared
//! - [`source`] - fetch + extract, with fetch and parse failures collapsed to "not found"
//!
//! Each channel's layout knowledge lives in one [`ReleaseExtractor`] so a
//! markup change on either side only touches that adapter.

pub mod feed;
pub mod ordering;
pub mod page;
pub mod source;

use thiserror::Error;

pub use feed::FeedTitleExtractor;
pub use ordering::{DottedNumeric, Lexicographic, OrderingKind, VersionOrdering};
pub use page::DownloadButtonExtractor;
pub use source::{FeedScraper, PageScraper, ReleaseSource, Scraper};

/// Version reported when a channel has nothing usable.
pub const SENTINEL_VERSION: &str = "0.0.0";

/// A firmware build published on one channel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Release {
    /// Opaque version token lifted from a file name, e.g. `8.3.1`
    pub version: String,
    /// Where the build can be downloaded from
    pub download_url: String,
}

impl Release {
    /// The "nothing found" release: sentinel version, empty URL.
    pub fn sentinel() -> Self {
        Self {
            version: SENTINEL_VERSION.to_owned(),
            download_url: String::new(),
        }
    }
}

/// Errors raised while interpreting a fetched channel body.
#[derive(Debug, Error)]
pub enum ExtractError {
    /// Feed XML could not be parsed as RSS or Atom
    #[error("Feed parse error: {0}")]
    Feed(#[from] feed_rs::parser::ParseFeedError),
}

/// Turns a channel's raw response body into a release.
///
/// `Ok(None)` means the body was readable but held no candidate. A candidate
/// whose version token cannot be located is still returned, carrying
/// [`SENTINEL_VERSION`] alongside its URL.
pub trait ReleaseExtractor: Send + Sync {
    /// Short channel label used in log output.
    fn channel(&self) -> &'static str;

    fn extract(&self, body: &[u8]) -> Result<Option<Release>, ExtractError>;
}

/// Returns the `index`-th `_`-separated field of `segment`, if there are that many.
pub(crate) fn underscore_field(segment: &str, index: usize) -> Option<&str> {
    segment.split('_').nth(index)
}
