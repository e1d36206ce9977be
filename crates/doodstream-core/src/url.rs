//! URL helper functions for the DoodStream extractor
//!
//! Provides functions for parsing source URLs and building embed,
//! pass and destination URLs.

use std::time::{SystemTime, UNIX_EPOCH};

use url::{ParseError, Url};

use crate::error::{ExtractorError, Result};

/// Extracts the video identifier from a source page URL
///
/// The identifier is the last path segment after trailing slashes are
/// stripped. Query string and fragment are ignored. Input without a
/// scheme (e.g. "dood.to/d/abc") is read as a bare path.
///
/// # Errors
/// Returns `InvalidSourceUrl` if the URL cannot be parsed or the path
/// yields no identifier
///
/// # Example
/// ```
/// use doodstream_core::url::extract_video_id;
/// let id = extract_video_id("https://dood.to/d/x1y2z3?ref=home").unwrap();
/// assert_eq!(id, "x1y2z3");
/// ```
pub fn extract_video_id(source_url: &str) -> Result<String> {
    let trimmed = source_url.trim();
    let path = match Url::parse(trimmed) {
        Ok(parsed) => parsed.path().to_string(),
        Err(ParseError::RelativeUrlWithoutBase) => {
            trimmed.split(['?', '#']).next().unwrap_or_default().to_string()
        }
        Err(e) => {
            return Err(ExtractorError::InvalidSourceUrl(format!("{}: {}", source_url, e)));
        }
    };

    path.trim_end_matches('/')
        .rsplit('/')
        .next()
        .filter(|segment| !segment.is_empty())
        .map(str::to_string)
        .ok_or_else(|| ExtractorError::InvalidSourceUrl(source_url.to_string()))
}

/// Builds the embed page URL for an identifier
///
/// # Example
/// ```
/// use doodstream_core::url::build_embed_url;
/// let url = build_embed_url("https://myvidplay.com/", "/e/", "x1y2z3");
/// assert_eq!(url, "https://myvidplay.com/e/x1y2z3");
/// ```
pub fn build_embed_url(origin: &str, embed_path: &str, video_id: &str) -> String {
    let origin = origin.trim_end_matches('/');
    let embed_path = embed_path.trim_start_matches('/');
    format!("{}/{}{}", origin, embed_path, video_id)
}

/// Resolves a sub-path found in a page against the site origin
///
/// # Errors
/// Returns `InvalidConfig` if the origin is not a base URL, and
/// `PatternNotFound` if the sub-path cannot be joined onto it
pub fn resolve_against_origin(origin: &str, sub_path: &str) -> Result<String> {
    let base = Url::parse(origin)
        .map_err(|e| ExtractorError::InvalidConfig(format!("base_origin {:?}: {}", origin, e)))?;

    base.join(sub_path).map(String::from).map_err(|e| {
        ExtractorError::PatternNotFound(format!("unresolvable sub-path {:?}: {}", sub_path, e))
    })
}

/// Composes the final media URL
///
/// # Example
/// ```
/// use doodstream_core::url::build_destination_url;
/// let url = build_destination_url("https://cdn.example/v/abc~", "123456789", "tok", 1700000000);
/// assert_eq!(url, "https://cdn.example/v/abc~123456789?token=tok&expiry=1700000000");
/// ```
pub fn build_destination_url(base_stream: &str, suffix: &str, token: &str, expiry: u64) -> String {
    format!(
        "{}{}?token={}&expiry={}",
        base_stream.trim(),
        suffix,
        token,
        expiry
    )
}

/// Current wall-clock time in whole seconds since the Unix epoch
pub fn unix_timestamp() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or_default()
}

/// Host part of `url`, if it parses and has one
pub fn host_of(url: &str) -> Option<String> {
    Url::parse(url).ok()?.host_str().map(str::to_string)
}

/// Whether `url`'s host is `host`, ignoring case and a leading `www.`
pub fn host_matches(url: &str, host: &str) -> bool {
    let Some(url_host) = host_of(url) else {
        return false;
    };

    let url_host = url_host.strip_prefix("www.").unwrap_or(url_host.as_str());
    let host = host.strip_prefix("www.").unwrap_or(host);
    url_host.eq_ignore_ascii_case(host)
}
