//! Field locators for embed-page HTML
//!
//! A [`FieldLocator`] pulls one named value out of a response body. The
//! extractor only knows about [`FieldSpec`]s, so the scanning strategy can
//! be swapped or tested without touching the network code.

use regex::Regex;

use crate::error::{ExtractorError, Result};

/// A named value to locate in a body
#[derive(Debug, Clone)]
pub struct FieldSpec {
    name: String,
    pattern: Regex,
}

impl FieldSpec {
    /// Build a spec from a raw regex; group 1 is the value if present
    pub fn new(name: impl Into<String>, pattern: &str) -> Result<Self> {
        let name = name.into();
        let pattern = Regex::new(pattern)
            .map_err(|e| ExtractorError::InvalidConfig(format!("pattern for {}: {}", name, e)))?;
        Ok(Self { name, pattern })
    }

    /// Literal `prefix` followed by a run of non-quote characters
    ///
    /// The prefix is part of the located value.
    ///
    /// # Example
    /// ```
    /// use doodstream_core::{FieldLocator, FieldSpec, RegexLocator};
    /// let spec = FieldSpec::path_after("pass_md5", "/pass_md5/").unwrap();
    /// let body = "$.get('/pass_md5/12-34/abc', function(data)";
    /// assert_eq!(RegexLocator.locate(body, &spec).as_deref(), Some("/pass_md5/12-34/abc"));
    /// ```
    pub fn path_after(name: impl Into<String>, prefix: &str) -> Result<Self> {
        Self::new(name, &format!("({}[^']+)", regex::escape(prefix)))
    }

    /// Value of `key=` up to the next `&`
    ///
    /// # Example
    /// ```
    /// use doodstream_core::{FieldLocator, FieldSpec, RegexLocator};
    /// let spec = FieldSpec::query_value("token", "token").unwrap();
    /// let body = "return a + '?token=abc123&expiry=' + Date.now();";
    /// assert_eq!(RegexLocator.locate(body, &spec).as_deref(), Some("abc123"));
    /// ```
    pub fn query_value(name: impl Into<String>, key: &str) -> Result<Self> {
        Self::new(name, &format!("{}=([^&]+)", regex::escape(key)))
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn pattern(&self) -> &Regex {
        &self.pattern
    }
}

/// Locates a [`FieldSpec`] in a body
pub trait FieldLocator: Send + Sync {
    /// First occurrence of the field, or `None` when absent
    fn locate(&self, body: &str, field: &FieldSpec) -> Option<String>;
}

/// Default locator: first regex match of the spec's pattern
#[derive(Debug, Clone, Copy, Default)]
pub struct RegexLocator;

impl FieldLocator for RegexLocator {
    fn locate(&self, body: &str, field: &FieldSpec) -> Option<String> {
        let caps = field.pattern().captures(body)?;
        caps.get(1)
            .or_else(|| caps.get(0))
            .map(|m| m.as_str().to_string())
    }
}
