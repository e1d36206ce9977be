//! Site parameters for the DoodStream extractor
//!
//! Everything the resolver needs to know about a particular mirror lives
//! here, so site variants are a config change rather than a code change.

use serde::{Deserialize, Serialize};

use crate::error::{ExtractorError, Result};

const DEFAULT_BASE_ORIGIN: &str = "https://myvidplay.com";
const DEFAULT_USER_AGENT: &str = "Mozilla/5.0";

const DEFAULT_HOST_ALIASES: &[&str] = &[
    "dood.to",
    "dood.so",
    "dood.la",
    "dood.ws",
    "dood.wf",
    "dood.watch",
    "dood.yt",
    "doodstream.com",
    "d000d.com",
    "d0000d.com",
    "ds2play.com",
    "ds2video.com",
];

/// Configuration for one DoodStream-style site
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExtractorConfig {
    /// Origin used for the embed page, sub-path resolution and Referer
    /// (default: "https://myvidplay.com")
    pub base_origin: String,
    /// Path prefix of the embed page (default: "/e/")
    pub embed_path: String,
    /// Literal prefix of the pass sub-path in the embed page (default: "/pass_md5/")
    pub pass_path_prefix: String,
    /// Query key holding the token in the embed page (default: "token")
    pub token_param: String,
    /// Opaque literal appended to the base stream value (default: "123456789")
    pub stream_suffix: String,
    /// User-Agent used when the caller supplies none (default: "Mozilla/5.0")
    pub default_user_agent: String,
    /// Extra hosts this site is served from
    pub host_aliases: Vec<String>,
}

impl Default for ExtractorConfig {
    fn default() -> Self {
        Self {
            base_origin: DEFAULT_BASE_ORIGIN.to_string(),
            embed_path: "/e/".to_string(),
            pass_path_prefix: "/pass_md5/".to_string(),
            token_param: "token".to_string(),
            stream_suffix: "123456789".to_string(),
            default_user_agent: DEFAULT_USER_AGENT.to_string(),
            host_aliases: DEFAULT_HOST_ALIASES.iter().map(|h| h.to_string()).collect(),
        }
    }
}

impl ExtractorConfig {
    /// Parse a config from TOML; missing keys take their defaults
    ///
    /// # Example
    /// ```
    /// use doodstream_core::ExtractorConfig;
    /// let toml = r#"base_origin = "https://dood.example""#;
    /// let config = ExtractorConfig::from_toml_str(toml).unwrap();
    /// assert_eq!(config.base_origin, "https://dood.example");
    /// assert_eq!(config.embed_path, "/e/");
    /// ```
    pub fn from_toml_str(input: &str) -> Result<Self> {
        let config: Self = toml::from_str(input)
            .map_err(|e| ExtractorError::InvalidConfig(e.message().to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Check that the config can drive an extraction
    ///
    /// # Errors
    /// - `InvalidConfig` if `base_origin` is not an absolute http(s) URL
    /// - `InvalidConfig` if `pass_path_prefix` or `token_param` is empty
    pub fn validate(&self) -> Result<()> {
        let origin = url::Url::parse(&self.base_origin).map_err(|e| {
            ExtractorError::InvalidConfig(format!("base_origin {:?}: {}", self.base_origin, e))
        })?;

        if !matches!(origin.scheme(), "http" | "https") || origin.host_str().is_none() {
            return Err(ExtractorError::InvalidConfig(format!(
                "base_origin must be an http(s) origin, got {:?}",
                self.base_origin
            )));
        }

        if self.pass_path_prefix.is_empty() {
            return Err(ExtractorError::InvalidConfig(
                "pass_path_prefix cannot be empty".to_string(),
            ));
        }

        if self.token_param.is_empty() {
            return Err(ExtractorError::InvalidConfig(
                "token_param cannot be empty".to_string(),
            ));
        }

        Ok(())
    }

    /// `base_origin` without a trailing slash
    pub fn origin(&self) -> &str {
        self.base_origin.trim_end_matches('/')
    }

    /// Referer sent with every follow-up request
    pub fn referer(&self) -> String {
        format!("{}/", self.origin())
    }
}
