//! Community channel: the build feed published on SourceForge.
//!
//! Entry titles are file paths such as
//! `/xiaomi.eu/MIUI-WEEKLY-RELEASES/8.3.1/xiaomi.eu_multi_MIMix2_8.3.1_v9-8.0.zip`,
//! so both the download link and the version are derived from the title.
use feed_rs::parser;

use super::{underscore_field, ExtractError, Release, ReleaseExtractor, SENTINEL_VERSION};

/// Matches the first feed entry whose title mentions a device model.
#[derive(Debug, Clone)]
pub struct FeedTitleExtractor {
    device_model: String,
    download_base: String,
}

impl FeedTitleExtractor {
    pub fn new(device_model: impl Into<String>, download_base: impl Into<String>) -> Self {
        Self {
            device_model: device_model.into(),
            download_base: download_base.into(),
        }
    }
}

impl ReleaseExtractor for FeedTitleExtractor {
    fn channel(&self) -> &'static str {
        "community"
    }

    fn extract(&self, body: &[u8]) -> Result<Option<Release>, ExtractError> {
        let feed = parser::parse(body)?;

        let title = feed
            .entries
            .into_iter()
            .map(|entry| entry.title.map(|t| t.content).unwrap_or_default())
            .find(|title| title.contains(&self.device_model));

        Ok(title.map(|title| self.release_from_title(title)))
    }
}

impl FeedTitleExtractor {
    fn release_from_title(&self, title: String) -> Release {
        let file_name = title.rsplit('/').next().unwrap_or_default();
        let version = underscore_field(file_name, 3).unwrap_or(SENTINEL_VERSION);

        Release {
            version: version.to_owned(),
            // Titles are joined raw, without percent-encoding
            download_url: format!("{}{}", self.download_base, title),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const BASE: &str = "https://jaist.dl.sourceforge.net/project/xiaomi-eu-multilang-miui-roms";

    fn rss(titles: &[&str]) -> String {
        let items: String = titles
            .iter()
            .map(|t| format!("<item><title>{t}</title><link>https://sf.net/x</link></item>"))
            .collect();
        format!(r#"<?xml version="1.0"?><rss version="2.0"><channel><title>Builds</title>{items}</channel></rss>"#)
    }

    fn extractor() -> FeedTitleExtractor {
        FeedTitleExtractor::new("MIMix2", BASE)
    }

    #[test]
    fn test_first_matching_entry_wins() {
        let body = rss(&[
            "/xiaomi.eu/MIUI-WEEKLY-RELEASES/8.3.1/xiaomi.eu_multi_MI6_8.3.1_v9-8.0.zip",
            "/xiaomi.eu/MIUI-WEEKLY-RELEASES/8.3.1/xiaomi.eu_multi_MIMix2_8.3.1_v9-8.0.zip",
            "/xiaomi.eu/MIUI-WEEKLY-RELEASES/8.2.22/xiaomi.eu_multi_MIMix2_8.2.22_v9-8.0.zip",
        ]);

        let release = extractor().extract(body.as_bytes()).unwrap().unwrap();
        assert_eq!(release.version, "8.3.1");
        assert_eq!(
            release.download_url,
            format!("{BASE}/xiaomi.eu/MIUI-WEEKLY-RELEASES/8.3.1/xiaomi.eu_multi_MIMix2_8.3.1_v9-8.0.zip")
        );
    }

    #[test]
    fn test_match_is_substring_and_case_sensitive() {
        let body = rss(&[
            "/r/1.0.0/xiaomi.eu_multi_MIMIX2_1.0.0_v9.zip",
            "/r/2.0.0/xiaomi.eu_multi_MIMix2S_2.0.0_v9.zip",
        ]);

        // "MIMix2S" contains "MIMix2"; "MIMIX2" does not
        let release = extractor().extract(body.as_bytes()).unwrap().unwrap();
        assert_eq!(release.version, "2.0.0");
    }

    #[test]
    fn test_no_match_is_not_found() {
        let body = rss(&["/r/1.0.0/xiaomi.eu_multi_MI8_1.0.0_v10.zip"]);
        assert!(extractor().extract(body.as_bytes()).unwrap().is_none());
    }

    #[test]
    fn test_empty_feed_is_not_found() {
        let body = rss(&[]);
        assert!(extractor().extract(body.as_bytes()).unwrap().is_none());
    }

    #[test]
    fn test_too_few_fields_keeps_sentinel_version() {
        let body = rss(&["/r/8.3.1/MIMix2_8.3.1_v9.zip"]);
        let release = extractor().extract(body.as_bytes()).unwrap().unwrap();
        assert_eq!(release.version, SENTINEL_VERSION);
        assert_eq!(release.download_url, format!("{BASE}/r/8.3.1/MIMix2_8.3.1_v9.zip"));
    }

    #[test]
    fn test_title_with_spaces_not_encoded() {
        let body = rss(&["/r/8.3.1/xiaomi.eu_multi_MIMix2_8.3.1_v9 beta.zip"]);
        let release = extractor().extract(body.as_bytes()).unwrap().unwrap();
        assert!(release.download_url.ends_with("v9 beta.zip"));
    }

    #[test]
    fn test_malformed_feed_is_error() {
        let result = extractor().extract(b"<not valid xml");
        assert!(matches!(result, Err(ExtractError::Feed(_))));
    }

    #[test]
    fn test_atom_feed_supported() {
        let body = r#"<?xml version="1.0" encoding="utf-8"?>
<feed xmlns="http://www.w3.org/2005/Atom">
  <title>Builds</title>
  <id>urn:builds</id>
  <updated>2018-03-01T00:00:00Z</updated>
  <entry>
    <title>/r/8.3.1/xiaomi.eu_multi_MIMix2_8.3.1_v9-8.0.zip</title>
    <id>urn:1</id>
    <updated>2018-03-01T00:00:00Z</updated>
  </entry>
</feed>"#;
        let release = extractor().extract(body.as_bytes()).unwrap().unwrap();
        assert_eq!(release.version, "8.3.1");
    }
}
