//! Official channel: the vendor's ROM download page.
//!
//! The page lists one `<a class="download_btn">` per published build, newest
//! last. The version lives in the linked file name, e.g.
//! `miui_MIMIX2_8.3.1_4f5e8d7c4b_8.0.zip`.
use super::{underscore_field, ExtractError, Release, ReleaseExtractor, SENTINEL_VERSION};

pub const DEFAULT_DOWNLOAD_BUTTON_CLASS: &str = "download_btn";

/// Picks the last anchor carrying the download button class.
#[derive(Debug, Clone)]
pub struct DownloadButtonExtractor {
    class: String,
}

impl DownloadButtonExtractor {
    pub fn new(class: impl Into<String>) -> Self {
        Self {
            class: class.into(),
        }
    }
}

impl Default for DownloadButtonExtractor {
    fn default() -> Self {
        Self::new(DEFAULT_DOWNLOAD_BUTTON_CLASS)
    }
}

impl ReleaseExtractor for DownloadButtonExtractor {
    fn channel(&self) -> &'static str {
        "official"
    }

    fn extract(&self, body: &[u8]) -> Result<Option<Release>, ExtractError> {
        let html = String::from_utf8_lossy(body);

        // Several buttons can match; the newest build is listed last
        let Some(button) = find_anchors(&html)
            .into_iter()
            .rev()
            .find(|attrs| attr(attrs, "class") == Some(self.class.as_str()))
        else {
            return Ok(None);
        };

        let href = attr(&button, "href").unwrap_or_default().to_owned();
        Ok(Some(release_from_href(href)))
    }
}

fn release_from_href(href: String) -> Release {
    let file_name = href.rsplit('/').next().unwrap_or_default();
    let version = underscore_field(file_name, 2).unwrap_or(SENTINEL_VERSION);

    Release {
        version: version.to_owned(),
        download_url: href,
    }
}

type Attributes = Vec<(String, String)>;

/// First value of `name` in a tag's attribute list.
fn attr<'a>(attrs: &'a Attributes, name: &str) -> Option<&'a str> {
    attrs
        .iter()
        .find(|(key, _)| key == name)
        .map(|(_, value)| value.as_str())
}

/// Elements whose content is text, never markup.
const RAW_TEXT_ELEMENTS: [&str; 4] = ["script", "style", "textarea", "title"];

/// Collects the attributes of every `<a>` start tag, in document order.
///
/// Uses simple tag scanning (no HTML parser dependency). Comments and the
/// contents of raw text elements such as `<script>` are skipped, quoted
/// attribute values may contain `>`, and entity references in values are
/// decoded.
fn find_anchors(html: &str) -> Vec<Attributes> {
    // ASCII lowering keeps byte offsets aligned with `html`
    let lower = html.to_ascii_lowercase();
    let bytes = lower.as_bytes();
    let mut anchors = Vec::new();
    let mut pos = 0;

    while let Some(offset) = lower[pos..].find('<') {
        let start = pos + offset;
        let rest = &lower[start..];

        if rest.starts_with("<!--") {
            match rest.find("-->") {
                Some(end) => {
                    pos = start + end + 3;
                    continue;
                }
                None => break,
            }
        }

        // `<` not followed by a tag name is text
        let opens_tag = bytes
            .get(start + 1)
            .is_some_and(|b| b.is_ascii_alphabetic() || *b == b'/' || *b == b'!');
        if !opens_tag {
            pos = start + 1;
            continue;
        }

        let Some(end) = tag_end(&html[start..]) else {
            break;
        };

        let name_len = rest[1..]
            .find(|c: char| !c.is_ascii_alphanumeric())
            .unwrap_or(rest.len() - 1);
        let name = &rest[1..1 + name_len];

        if name == "a" {
            anchors.push(parse_attributes(&html[start + 2..start + end]));
        }

        pos = start + end + 1;

        if RAW_TEXT_ELEMENTS.contains(&name) {
            match raw_text_end(&lower[pos..], name) {
                Some(close) => pos += close,
                None => break,
            }
        }
    }

    anchors
}

/// Offset of the `</name` tag that ends a raw text element's content.
fn raw_text_end(content: &str, name: &str) -> Option<usize> {
    let mut from = 0;

    while let Some(offset) = content[from..].find("</") {
        let close = from + offset;
        let after = close + 2 + name.len();
        let closes = content[close + 2..].starts_with(name)
            && content
                .as_bytes()
                .get(after)
                .map_or(true, |b| b.is_ascii_whitespace() || *b == b'/' || *b == b'>');
        if closes {
            return Some(close);
        }
        from = close + 2;
    }

    None
}

/// Offset of the `>` closing the tag that starts at `tag[0]`, honouring quoted values.
fn tag_end(tag: &str) -> Option<usize> {
    let mut quote: Option<u8> = None;
    let mut after_equals = false;

    for (i, b) in tag.bytes().enumerate() {
        match quote {
            Some(q) if b == q => quote = None,
            Some(_) => {}
            None => match b {
                b'"' | b'\'' if after_equals => quote = Some(b),
                b'>' => return Some(i),
                _ => {}
            },
        }
        if !b.is_ascii_whitespace() {
            after_equals = b == b'=';
        }
    }

    None
}

/// Parses `name=value` pairs out of the inside of a start tag.
fn parse_attributes(inner: &str) -> Attributes {
    let bytes = inner.as_bytes();
    let len = bytes.len();
    let mut attrs = Vec::new();
    let mut i = 0;

    loop {
        while i < len && (bytes[i].is_ascii_whitespace() || bytes[i] == b'/') {
            i += 1;
        }
        if i >= len {
            break;
        }

        let name_start = i;
        while i < len && !bytes[i].is_ascii_whitespace() && bytes[i] != b'=' && bytes[i] != b'/' {
            i += 1;
        }
        let name = inner[name_start..i].to_ascii_lowercase();

        while i < len && bytes[i].is_ascii_whitespace() {
            i += 1;
        }

        let mut value = "";
        if i < len && bytes[i] == b'=' {
            i += 1;
            while i < len && bytes[i].is_ascii_whitespace() {
                i += 1;
            }
            if i < len && (bytes[i] == b'"' || bytes[i] == b'\'') {
                let quote = bytes[i];
                i += 1;
                let value_start = i;
                while i < len && bytes[i] != quote {
                    i += 1;
                }
                value = &inner[value_start..i];
                i = (i + 1).min(len);
            } else {
                let value_start = i;
                while i < len && !bytes[i].is_ascii_whitespace() {
                    i += 1;
                }
                value = &inner[value_start..i];
            }
        }

        attrs.push((name, decode_entities(value)));
    }

    attrs
}

fn decode_entities(value: &str) -> String {
    if !value.contains('&') {
        return value.to_owned();
    }

    let mut decoded = String::with_capacity(value.len());
    let mut rest = value;

    while let Some(amp) = rest.find('&') {
        decoded.push_str(&rest[..amp]);
        rest = &rest[amp..];

        // Longest reference handled is `&#x10FFFF;`
        let reference = rest[1..]
            .find(';')
            .filter(|&semi| semi <= 8)
            .and_then(|semi| decode_reference(&rest[1..1 + semi]).map(|c| (c, semi + 2)));

        match reference {
            Some((c, consumed)) => {
                decoded.push(c);
                rest = &rest[consumed..];
            }
            None => {
                decoded.push('&');
                rest = &rest[1..];
            }
        }
    }

    decoded.push_str(rest);
    decoded
}

/// Resolves the text between `&` and `;`: a named entity or a numeric reference.
fn decode_reference(reference: &str) -> Option<char> {
    let code = if let Some(hex) = reference
        .strip_prefix("#x")
        .or_else(|| reference.strip_prefix("#X"))
    {
        if hex.is_empty() || !hex.bytes().all(|b| b.is_ascii_hexdigit()) {
            return None;
        }
        u32::from_str_radix(hex, 16).ok()?
    } else if let Some(digits) = reference.strip_prefix('#') {
        if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
            return None;
        }
        digits.parse().ok()?
    } else {
        return match reference {
            "amp" => Some('&'),
            "lt" => Some('<'),
            "gt" => Some('>'),
            "quot" => Some('"'),
            "apos" => Some('\''),
            "nbsp" => Some('\u{a0}'),
            _ => None,
        };
    };

    char::from_u32(code)
}
