//! Configuration file parser for the optional `--config` TOML file.
//!
//! Every key is optional; the defaults track the Mi MIX 2 weekly builds and
//! the `mipay-extract` deploy script. Unknown keys are accepted but logged,
//! since a typo would otherwise silently fall back to a default.
use serde::Deserialize;
use std::path::Path;
use std::time::Duration;
use thiserror::Error;

use crate::artifact::Markers;
use crate::release::page::DEFAULT_DOWNLOAD_BUTTON_CLASS;
use crate::release::OrderingKind;
use crate::transport::DEFAULT_USER_AGENT;

// ============================================================================
// Error Types
// ============================================================================

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid TOML in config file: {0}")]
    Parse(#[from] toml::de::Error),

    /// Config file exceeds maximum allowed size.
    #[error("Config file too large: {0}")]
    TooLarge(String),

    #[error("Invalid URL for `{key}`: {source}")]
    InvalidUrl {
        key: &'static str,
        #[source]
        source: url::ParseError,
    },

    #[error("`request_timeout_secs` must be greater than zero")]
    ZeroTimeout,

    /// An empty marker would match every line of the deploy script.
    #[error("`{key}` must not be empty")]
    EmptyMarker { key: &'static str },
}

// ============================================================================
// Configuration Structs
// ============================================================================

/// Top-level configuration.
///
/// All fields use `#[serde(default)]` so any subset of keys can be specified.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Device identifier searched for in community feed titles.
    pub device_model: String,

    /// Vendor page listing the official builds.
    pub official_page_url: String,

    /// `class` attribute of the download anchors on the vendor page.
    pub download_button_class: String,

    /// RSS feed of community builds.
    pub community_feed_url: String,

    /// Prefix joined with a feed entry title to form the download URL.
    pub community_download_base: String,

    /// Client identity sent to both release channels.
    pub user_agent: String,

    /// Per-request timeout for every HTTP call.
    pub request_timeout_secs: u64,

    /// How release versions are compared against the recorded one.
    pub version_ordering: OrderingKind,

    pub markers: Markers,

    pub github: GithubConfig,
}

/// Where the deploy script lives and who commits to it.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct GithubConfig {
    pub owner: String,
    pub repo: String,
    /// Path of the deploy script inside the repository.
    pub path: String,
    pub branch: String,
    pub author_name: String,
    pub author_email: String,
    /// REST API root; overridable for GitHub Enterprise.
    pub api_base_url: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            device_model: "MIMix2".to_string(),
            official_page_url: "https://www.miui.com/download-337.html".to_string(),
            download_button_class: DEFAULT_DOWNLOAD_BUTTON_CLASS.to_string(),
            community_feed_url: "https://sourceforge.net/projects/xiaomi-eu-multilang-miui-roms/rss?path=/xiaomi.eu/MIUI-WEEKLY-RELEASES".to_string(),
            community_download_base: "https://jaist.dl.sourceforge.net/project/xiaomi-eu-multilang-miui-roms".to_string(),
            user_agent: DEFAULT_USER_AGENT.to_string(),
            request_timeout_secs: 10,
            version_ordering: OrderingKind::default(),
            markers: Markers::default(),
            github: GithubConfig::default(),
        }
    }
}

impl Default for GithubConfig {
    fn default() -> Self {
        Self {
            owner: "linusyang92".to_string(),
            repo: "mipay-extract".to_string(),
            path: "deploy.sh".to_string(),
            branch: "master".to_string(),
            author_name: "linusyang92".to_string(),
            author_email: "32575696+linusyang92@users.noreply.github.com".to_string(),
            api_base_url: "https://api.github.com".to_string(),
        }
    }
}

impl Config {
    /// Maximum config file size (1 MB).
    const MAX_FILE_SIZE: u64 = 1_048_576;

    const KNOWN_KEYS: [&'static str; 10] = [
        "device_model",
        "official_page_url",
        "download_button_class",
        "community_feed_url",
        "community_download_base",
        "user_agent",
        "request_timeout_secs",
        "version_ordering",
        "markers",
        "github",
    ];

    /// Load configuration from a TOML file.
    ///
    /// - Missing file → `Ok(Config::default())`
    /// - Empty file → `Ok(Config::default())`
    /// - Invalid TOML → `Err(ConfigError::Parse)` with line number info
    /// - Unknown keys → accepted, logged as warning
    /// - Unparseable URLs, a zero timeout or an empty marker → rejected
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        // Check file size before reading to avoid slurping a huge file.
        match std::fs::metadata(path) {
            Ok(meta) if meta.len() > Self::MAX_FILE_SIZE => {
                return Err(ConfigError::TooLarge(format!(
                    "Config file is {} bytes (max {} bytes)",
                    meta.len(),
                    Self::MAX_FILE_SIZE
                )));
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::debug!(path = %path.display(), "No config file found, using defaults");
                return Ok(Self::default());
            }
            Err(e) => return Err(ConfigError::Io(e)),
            Ok(_) => {}
        }

        let content = std::fs::read_to_string(path)?;

        if content.trim().is_empty() {
            tracing::debug!(path = %path.display(), "Config file is empty, using defaults");
            return Ok(Self::default());
        }

        if let Ok(raw) = content.parse::<toml::Table>() {
            for key in raw.keys() {
                if !Self::KNOWN_KEYS.contains(&key.as_str()) {
                    tracing::warn!(key = %key, "Unknown key in config file, ignoring");
                }
            }
        }

        let config: Config = toml::from_str(&content)?;
        config.validate()?;
        tracing::info!(path = %path.display(), device = %config.device_model, "Loaded configuration");
        Ok(config)
    }

    /// Rejects settings that would make every run fail in a confusing way.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let urls = [
            ("official_page_url", &self.official_page_url),
            ("community_feed_url", &self.community_feed_url),
            ("github.api_base_url", &self.github.api_base_url),
        ];
        for (key, value) in urls {
            url::Url::parse(value).map_err(|source| ConfigError::InvalidUrl { key, source })?;
        }

        if self.request_timeout_secs == 0 {
            return Err(ConfigError::ZeroTimeout);
        }

        let markers = [
            ("markers.official_host", &self.markers.official_host),
            ("markers.community_version_key", &self.markers.community_version_key),
            ("markers.community_host", &self.markers.community_host),
        ];
        if let Some((key, _)) = markers.into_iter().find(|(_, value)| value.is_empty()) {
            return Err(ConfigError::EmptyMarker { key });
        }

        Ok(())
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

// ============================================================================
// Tests
// ============================================================================
