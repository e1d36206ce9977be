//! Core data types for the DoodStream extractor
//!
//! Contains the request/result values handed across the extractor
//! boundary and the header map they carry.

use std::collections::BTreeMap;

use serde::{Deserialize, Deserializer, Serialize};

/// Header name to value mapping with case-insensitive names
///
/// The spelling of the first insertion is kept. Inserting a name that
/// differs only in ASCII case replaces the existing entry. Deserialized
/// maps go through the same rule.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct RequestHeaders {
    entries: BTreeMap<String, String>,
}

impl RequestHeaders {
    pub fn new() -> Self {
        Self::default()
    }

    fn stored_name(&self, name: &str) -> Option<&String> {
        self.entries.keys().find(|k| k.eq_ignore_ascii_case(name))
    }

    /// Insert a header, returning the previous value if one existed
    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<String>) -> Option<String> {
        let name = name.into();
        let value = value.into();
        match self.stored_name(&name).cloned() {
            Some(existing) => self.entries.insert(existing, value),
            None => self.entries.insert(name, value),
        }
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.stored_name(name)
            .and_then(|k| self.entries.get(k))
            .map(String::as_str)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.stored_name(name).is_some()
    }

    /// Remove every entry matching `name`, returning the first value found
    pub fn remove(&mut self, name: &str) -> Option<String> {
        let mut removed = None;
        while let Some(key) = self.stored_name(name).cloned() {
            let value = self.entries.remove(&key);
            removed = removed.or(value);
        }
        removed
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }
}

impl<K, V> FromIterator<(K, V)> for RequestHeaders
where
    K: Into<String>,
    V: Into<String>,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut headers = RequestHeaders::new();
        for (name, value) in iter {
            headers.insert(name, value);
        }
        headers
    }
}

impl<'de> Deserialize<'de> for RequestHeaders {
    fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let entries = BTreeMap::<String, String>::deserialize(deserializer)?;
        Ok(entries.into_iter().collect())
    }
}

/// Input to a single extraction
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtractionRequest {
    /// Page URL on the video host (e.g. "https://dood.to/d/abc123")
    pub source_url: String,

    /// Caller-supplied base headers; only `User-Agent` is consulted
    pub headers: RequestHeaders,
}

impl ExtractionRequest {
    pub fn new(source_url: impl Into<String>) -> Self {
        Self::with_headers(source_url, RequestHeaders::new())
    }

    pub fn with_headers(source_url: impl Into<String>, headers: RequestHeaders) -> Self {
        Self {
            source_url: source_url.into(),
            headers,
        }
    }
}

/// Downstream handling mode for a resolved URL
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EndpointHint {
    /// Stream the destination as-is, forwarding range requests (seek-safe)
    #[serde(rename = "proxy_stream_endpoint")]
    ProxyStream,

    /// Destination is an HLS playlist that needs rewriting
    #[serde(rename = "hls_manifest_proxy")]
    HlsManifestProxy,

    /// Destination is a DASH manifest that needs rewriting
    #[serde(rename = "mpd_manifest_proxy")]
    MpdManifestProxy,
}

impl EndpointHint {
    pub fn as_str(&self) -> &'static str {
        match self {
            EndpointHint::ProxyStream => "proxy_stream_endpoint",
            EndpointHint::HlsManifestProxy => "hls_manifest_proxy",
            EndpointHint::MpdManifestProxy => "mpd_manifest_proxy",
        }
    }
}

/// Output of a successful extraction
///
/// `request_headers` is the complete set needed to fetch
/// `destination_url`; nothing from the extraction requests has to be
/// replayed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExtractionResult {
    /// Absolute direct media URL
    pub destination_url: String,

    /// Headers to attach to the media fetch
    pub request_headers: RequestHeaders,

    /// How the dispatcher should serve the destination
    #[serde(rename = "mediaflow_endpoint")]
    pub endpoint_hint: EndpointHint,
}
