//! The deploy script whose download links track the two release channels.
//!
//! Three kinds of line matter; everything else is carried through untouched:
//!
//! ```text
//! EU_VER=8.2.22
//! 'http://bigota.d.miui.com/8.2.22/miui_MIMIX2_8.2.22_4f5e8d7c4b_8.0.zip'
//! 'https://jaist.dl.sourceforge.net/project/.../xiaomi.eu_multi_MIMix2_8.2.22_v9-8.0.zip'
//! ```
use serde::Deserialize;

use crate::release::{underscore_field, SENTINEL_VERSION};

/// Substrings that identify the rewritable lines of the script.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct Markers {
    /// Host of the official download URL
    pub official_host: String,
    /// Assignment prefix of the community version, including `=`
    pub community_version_key: String,
    /// Host of the community download URL
    pub community_host: String,
}

impl Default for Markers {
    fn default() -> Self {
        Self {
            official_host: "bigota.d.miui.com".to_string(),
            community_version_key: "EU_VER=".to_string(),
            community_host: "dl.sourceforge.net".to_string(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum LineClass {
    OfficialUrl,
    CommunityVersion,
    CommunityUrl,
    Verbatim,
}

/// Reads and rewrites deploy scripts marked up with a set of [`Markers`].
#[derive(Debug, Clone, Default)]
pub struct ArtifactModel {
    markers: Markers,
}

impl ArtifactModel {
    pub fn new(markers: Markers) -> Self {
        Self { markers }
    }

    /// Version recorded on the first official-URL line, or the sentinel.
    ///
    /// The whole line is split on `_` and the third field taken, which for
    /// `'http://host/8.2.22/miui_MIMIX2_8.2.22_x.zip'` yields `8.2.22`.
    pub fn current_version(&self, text: &str) -> String {
        lines(text)
            .find(|line| line.contains(&self.markers.official_host))
            .and_then(|line| underscore_field(line, 2))
            .unwrap_or(SENTINEL_VERSION)
            .to_owned()
    }

    /// Rewrites the three marked lines and passes the rest through.
    ///
    /// Every output line, the last included, ends in `\n`; `\r\n` endings
    /// come out as `\n`. Rewritten lines lose any indentation they had.
    pub fn patch(
        &self,
        original: &str,
        community_version: &str,
        official_url: &str,
        community_url: &str,
    ) -> String {
        let mut patched = String::with_capacity(original.len() + 64);

        for line in lines(original) {
            match self.classify(line) {
                LineClass::OfficialUrl => {
                    patched.push('\'');
                    patched.push_str(official_url);
                    patched.push('\'');
                }
                LineClass::CommunityVersion => {
                    patched.push_str(&self.markers.community_version_key);
                    patched.push_str(community_version);
                }
                LineClass::CommunityUrl => {
                    patched.push('\'');
                    patched.push_str(community_url);
                    patched.push('\'');
                }
                LineClass::Verbatim => patched.push_str(line),
            }
            patched.push('\n');
        }

        patched
    }

    // First marker wins; a line is never rewritten twice.
    fn classify(&self, line: &str) -> LineClass {
        if line.contains(&self.markers.official_host) {
            LineClass::OfficialUrl
        } else if line.contains(&self.markers.community_version_key) {
            LineClass::CommunityVersion
        } else if line.contains(&self.markers.community_host) {
            LineClass::CommunityUrl
        } else {
            LineClass::Verbatim
        }
    }
}

/// Lines without their terminator. A lone `\r` ending the final line is
/// dropped too, which `str::lines` leaves in place.
fn lines(text: &str) -> impl Iterator<Item = &str> {
    text.lines().map(|line| line.strip_suffix('\r').unwrap_or(line))
}
