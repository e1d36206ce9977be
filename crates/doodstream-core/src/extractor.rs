//! Stream extractor API
//!
//! Combines the HTTP fetcher with field locators to turn a DoodStream
//! page URL into a direct media URL plus the headers to fetch it with.

use async_trait::async_trait;
use reqwest::header::USER_AGENT;
use tracing::{debug, info, instrument, warn};

use crate::client::{FetchRequest, HttpFetcher, ReqwestFetcher};
use crate::config::ExtractorConfig;
use crate::error::{ExtractorError, FetchError, FetchStep, Result};
use crate::locator::{FieldLocator, FieldSpec, RegexLocator};
use crate::types::{EndpointHint, ExtractionRequest, ExtractionResult, RequestHeaders};
use crate::url::{
    build_destination_url, build_embed_url, extract_video_id, host_matches, host_of,
    resolve_against_origin, unix_timestamp,
};

/// A link-resolution strategy for one hosting site
#[async_trait]
pub trait StreamExtractor: Send + Sync {
    /// Short identifier (e.g. "doodstream")
    fn name(&self) -> &'static str;

    /// Whether this extractor handles `url`
    fn supports(&self, url: &str) -> bool;

    /// Resolve a source page into a direct media URL
    async fn extract(&self, request: &ExtractionRequest) -> Result<ExtractionResult>;
}

/// Extractor for DoodStream / MyVidPlay embeds
///
/// Performs two GETs per call: the embed page, then the pass sub-path
/// found in it. The second request never carries range headers; the
/// host answers ranged requests for that resource with different content.
///
/// Holds no per-call state, so one instance can serve concurrent calls.
pub struct DoodStreamExtractor<F = ReqwestFetcher> {
    config: ExtractorConfig,
    fetcher: F,
    locator: Box<dyn FieldLocator>,
    pass_field: FieldSpec,
    token_field: FieldSpec,
}

impl DoodStreamExtractor<ReqwestFetcher> {
    /// Create an extractor for the default site with a default HTTP client
    ///
    /// # Errors
    /// Returns error if HTTP client initialization fails
    pub fn new() -> Result<Self> {
        Self::with_config(ExtractorConfig::default())
    }

    /// Create an extractor for a custom site with a default HTTP client
    ///
    /// # Errors
    /// - `InvalidConfig` if the config does not validate
    pub fn with_config(config: ExtractorConfig) -> Result<Self> {
        Self::with_fetcher(config, ReqwestFetcher::new()?)
    }
}

impl<F: HttpFetcher> DoodStreamExtractor<F> {
    /// Create an extractor that issues its requests through `fetcher`
    ///
    /// # Errors
    /// - `InvalidConfig` if the config does not validate
    pub fn with_fetcher(config: ExtractorConfig, fetcher: F) -> Result<Self> {
        config.validate()?;

        let pass_field = FieldSpec::path_after("pass_md5", &config.pass_path_prefix)?;
        let token_field = FieldSpec::query_value(config.token_param.clone(), &config.token_param)?;

        Ok(Self {
            config,
            fetcher,
            locator: Box::new(RegexLocator),
            pass_field,
            token_field,
        })
    }

    /// Replace the field locator
    pub fn with_locator(mut self, locator: impl FieldLocator + 'static) -> Self {
        self.locator = Box::new(locator);
        self
    }

    pub fn config(&self) -> &ExtractorConfig {
        &self.config
    }

    pub fn fetcher(&self) -> &F {
        &self.fetcher
    }

    /// Headers for every follow-up request and for the final media fetch
    ///
    /// Only the caller's User-Agent is carried over. Referer is always the
    /// site origin.
    pub fn follow_up_headers(&self, caller: &RequestHeaders) -> RequestHeaders {
        let user_agent = caller
            .get(USER_AGENT.as_str())
            .filter(|ua| !ua.trim().is_empty())
            .unwrap_or(self.config.default_user_agent.as_str());

        let mut headers = RequestHeaders::new();
        headers.insert("User-Agent", user_agent);
        headers.insert("Referer", self.config.referer());
        headers
    }

    /// Run one request and return its body, failing on non-2xx
    async fn fetch_body(&self, step: FetchStep, request: FetchRequest) -> Result<String> {
        let response = self
            .fetcher
            .fetch(request)
            .await
            .map_err(|e| ExtractorError::upstream(step, e))?;

        if !response.is_success() {
            return Err(ExtractorError::upstream(
                step,
                FetchError::Status(response.status),
            ));
        }

        Ok(response.body)
    }

    /// Resolve `source_url` into an [`ExtractionResult`]
    ///
    /// # Errors
    /// - `InvalidSourceUrl` if no identifier can be taken from the URL
    /// - `PatternNotFound` if the embed page has no pass sub-path
    /// - `TokenNotFound` if the embed page has no token
    /// - `UpstreamFetchFailed` if either request fails or returns non-2xx
    #[instrument(skip(self, headers), fields(extractor = "doodstream"))]
    pub async fn resolve(
        &self,
        source_url: &str,
        headers: &RequestHeaders,
    ) -> Result<ExtractionResult> {
        let video_id = extract_video_id(source_url)?;
        let request_headers = self.follow_up_headers(headers);

        let embed_url = build_embed_url(self.config.origin(), &self.config.embed_path, &video_id);
        debug!(%video_id, %embed_url, "fetching embed page");
        let html = self
            .fetch_body(
                FetchStep::EmbedPage,
                FetchRequest::get(&embed_url, request_headers.clone()),
            )
            .await?;

        let pass_path = self
            .locator
            .locate(&html, &self.pass_field)
            .ok_or_else(|| ExtractorError::PatternNotFound(self.pass_field.name().to_string()))?;
        let pass_url = resolve_against_origin(self.config.origin(), &pass_path)?;

        // Must be a full-body request, a ranged one returns a different payload
        debug!(%pass_url, "resolving base stream");
        let base_stream = self
            .fetch_body(
                FetchStep::PassMd5,
                FetchRequest::get_full_body(&pass_url, request_headers.clone()),
            )
            .await?;
        let base_stream = base_stream.trim();
        if base_stream.is_empty() {
            return Err(ExtractorError::upstream(FetchStep::PassMd5, FetchError::EmptyBody));
        }

        let token = self
            .locator
            .locate(&html, &self.token_field)
            .ok_or_else(|| ExtractorError::TokenNotFound(self.token_field.name().to_string()))?;

        let destination_url = build_destination_url(
            base_stream,
            &self.config.stream_suffix,
            &token,
            unix_timestamp(),
        );
        info!(%video_id, "resolved direct stream");

        Ok(ExtractionResult {
            destination_url,
            request_headers,
            endpoint_hint: EndpointHint::ProxyStream,
        })
    }
}

#[async_trait]
impl<F: HttpFetcher> StreamExtractor for DoodStreamExtractor<F> {
    fn name(&self) -> &'static str {
        "doodstream"
    }

    fn supports(&self, url: &str) -> bool {
        host_of(&self.config.base_origin)
            .iter()
            .chain(self.config.host_aliases.iter())
            .any(|host| host_matches(url, host))
    }

    async fn extract(&self, request: &ExtractionRequest) -> Result<ExtractionResult> {
        self.resolve(&request.source_url, &request.headers)
            .await
            .inspect_err(|e| {
                warn!(
                    url = %request.source_url,
                    reason = e.reason(),
                    "extraction failed: {}",
                    e
                )
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::{FetchResponse, RangePolicy};
    use std::collections::VecDeque;
    use std::sync::Mutex;

    const EMBED_HTML: &str = r#"<html><body><script>
        $.get('/pass_md5/59274-178-96-1703958212-b8f1d3/vwxyz12345', function(data) {
            dsplayer.src({ src: data + makePlay(), type: 'video/mp4' });
        });
        function makePlay() { return a + "?token=q8k2ymf0f1rwlmxrd3lx1zu3&expiry=" + Date.now(); }
    </script></body></html>"#;

    const BASE_STREAM: &str = "https://xy42.cloudatacdn.com/u5kj6qzkgdlsdyfmyuvhzw/b6sm9vzk7~";

    /// Replays canned responses and records every request
    #[derive(Default)]
    struct FakeFetcher {
        responses: Mutex<VecDeque<std::result::Result<FetchResponse, FetchError>>>,
        requests: Mutex<Vec<FetchRequest>>,
    }

    impl FakeFetcher {
        fn with_bodies(bodies: &[(u16, &str)]) -> Self {
            let fetcher = Self::default();
            for (status, body) in bodies {
                fetcher.push(Ok(FetchResponse {
                    status: *status,
                    body: body.to_string(),
                }));
            }
            fetcher
        }

        fn push(&self, response: std::result::Result<FetchResponse, FetchError>) {
            self.responses.lock().unwrap().push_back(response);
        }

        fn requests(&self) -> Vec<FetchRequest> {
            self.requests.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl HttpFetcher for FakeFetcher {
        async fn fetch(
            &self,
            request: FetchRequest,
        ) -> std::result::Result<FetchResponse, FetchError> {
            self.requests.lock().unwrap().push(request);
            self.responses
                .lock()
                .unwrap()
                .pop_front()
                .expect("unexpected extra request")
        }
    }

    struct FixedLocator;

    impl FieldLocator for FixedLocator {
        fn locate(&self, _body: &str, field: &FieldSpec) -> Option<String> {
            match field.name() {
                "pass_md5" => Some("/pass_md5/fixed".to_string()),
                "token" => Some("fixedtoken".to_string()),
                _ => None,
            }
        }
    }

    fn extractor(fetcher: FakeFetcher) -> DoodStreamExtractor<FakeFetcher> {
        DoodStreamExtractor::with_fetcher(ExtractorConfig::default(), fetcher).unwrap()
    }

    #[tokio::test]
    async fn test_extract_success() {
        let ex = extractor(FakeFetcher::with_bodies(&[
            (200, EMBED_HTML),
            (200, &format!("{}\n", BASE_STREAM)),
        ]));

        let before = unix_timestamp();
        let result = ex
            .extract(&ExtractionRequest::new("https://dood.to/d/vwxyz12345"))
            .await
            .expect("extraction should succeed");
        let after = unix_timestamp();

        let prefix = format!("{}123456789?token=q8k2ymf0f1rwlmxrd3lx1zu3&expiry=", BASE_STREAM);
        let expiry: u64 = result
            .destination_url
            .strip_prefix(&prefix)
            .expect("destination should start with base, suffix and token")
            .parse()
            .expect("expiry should be an integer");
        assert!(before <= expiry && expiry <= after);

        assert_eq!(result.endpoint_hint, EndpointHint::ProxyStream);
        assert_eq!(result.request_headers.get("Referer"), Some("https://myvidplay.com/"));
        assert_eq!(result.request_headers.get("User-Agent"), Some("Mozilla/5.0"));
        assert_eq!(result.request_headers.len(), 2);
    }

    #[tokio::test]
    async fn test_extract_request_sequence() {
        let ex = extractor(FakeFetcher::with_bodies(&[(200, EMBED_HTML), (200, BASE_STREAM)]));

        ex.extract(&ExtractionRequest::new("https://myvidplay.com/e/vwxyz12345/"))
            .await
            .unwrap();

        let requests = ex.fetcher().requests();
        assert_eq!(requests.len(), 2);
        assert_eq!(requests[0].url, "https://myvidplay.com/e/vwxyz12345");
        assert_eq!(requests[0].range, RangePolicy::Allow);
        assert_eq!(
            requests[1].url,
            "https://myvidplay.com/pass_md5/59274-178-96-1703958212-b8f1d3/vwxyz12345"
        );
        assert_eq!(requests[1].range, RangePolicy::Disabled);
        assert_eq!(requests[0].headers, requests[1].headers);
    }

    #[tokio::test]
    async fn test_pass_fetch_is_range_free_even_with_caller_range() {
        let ex = extractor(FakeFetcher::with_bodies(&[(200, EMBED_HTML), (200, BASE_STREAM)]));
        let caller: RequestHeaders = [("Range", "bytes=0-1"), ("If-Range", "etag")]
            .into_iter()
            .collect();

        ex.extract(&ExtractionRequest::with_headers("https://dood.to/d/abc", caller))
            .await
            .unwrap();

        let pass = &ex.fetcher().requests()[1];
        assert_eq!(pass.range, RangePolicy::Disabled);
        assert!(!pass.effective_headers().contains("range"));
        assert!(!pass.effective_headers().contains("if-range"));
    }

    #[tokio::test]
    async fn test_caller_user_agent_kept_and_referer_overridden() {
        let ex = extractor(FakeFetcher::with_bodies(&[(200, EMBED_HTML), (200, BASE_STREAM)]));
        let caller: RequestHeaders = [
            ("user-agent", "Custom/1.0"),
            ("referer", "https://evil.example/"),
            ("Cookie", "session=1"),
        ]
        .into_iter()
        .collect();

        let result = ex
            .extract(&ExtractionRequest::with_headers("https://dood.to/d/abc", caller))
            .await
            .unwrap();

        assert_eq!(result.request_headers.get("User-Agent"), Some("Custom/1.0"));
        assert_eq!(result.request_headers.get("Referer"), Some("https://myvidplay.com/"));
        assert!(!result.request_headers.contains("Cookie"));
        assert_eq!(
            ex.fetcher().requests()[0].headers.get("referer"),
            Some("https://myvidplay.com/")
        );
    }

    #[test]
    fn test_blank_user_agent_falls_back_to_default() {
        let ex = extractor(FakeFetcher::default());
        let caller: RequestHeaders = [("User-Agent", "  ")].into_iter().collect();
        let headers = ex.follow_up_headers(&caller);
        assert_eq!(headers.get("user-agent"), Some("Mozilla/5.0"));
    }

    #[tokio::test]
    async fn test_invalid_source_url_makes_no_request() {
        let ex = extractor(FakeFetcher::default());

        let result = ex.extract(&ExtractionRequest::new("https://dood.to/")).await;

        assert!(matches!(result, Err(ExtractorError::InvalidSourceUrl(_))));
        assert!(ex.fetcher().requests().is_empty());
    }

    #[tokio::test]
    async fn test_missing_pass_path_skips_second_fetch() {
        let ex = extractor(FakeFetcher::with_bodies(&[(
            200,
            "<html>?token=abc&expiry=1 but no player</html>",
        )]));

        let result = ex.extract(&ExtractionRequest::new("https://dood.to/d/abc")).await;

        match result {
            Err(ExtractorError::PatternNotFound(field)) => assert_eq!(field, "pass_md5"),
            other => panic!("Expected PatternNotFound error, got {:?}", other),
        }
        assert_eq!(ex.fetcher().requests().len(), 1);
    }

    #[tokio::test]
    async fn test_missing_token() {
        let ex = extractor(FakeFetcher::with_bodies(&[
            (200, "$.get('/pass_md5/1-2-3/abc', function(data) {})"),
            (200, BASE_STREAM),
        ]));

        let result = ex.extract(&ExtractionRequest::new("https://dood.to/d/abc")).await;

        match result {
            Err(ExtractorError::TokenNotFound(field)) => assert_eq!(field, "token"),
            other => panic!("Expected TokenNotFound error, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_embed_status_error() {
        let ex = extractor(FakeFetcher::with_bodies(&[(404, "File not found")]));

        let result = ex.extract(&ExtractionRequest::new("https://dood.to/d/gone")).await;

        match result {
            Err(ExtractorError::UpstreamFetchFailed {
                step: FetchStep::EmbedPage,
                source: FetchError::Status(404),
            }) => {}
            other => panic!("Expected embed page status error, got {:?}", other),
        }
        assert_eq!(ex.fetcher().requests().len(), 1);
    }

    #[tokio::test]
    async fn test_fetcher_error_propagates_with_step() {
        let fetcher = FakeFetcher::with_bodies(&[(200, EMBED_HTML)]);
        fetcher.push(Err(FetchError::InvalidHeader("Referer".to_string())));
        let ex = extractor(fetcher);

        let result = ex.extract(&ExtractionRequest::new("https://dood.to/d/abc")).await;

        let error = result.expect_err("fetch failure must abort extraction");
        assert_eq!(error.fetch_step(), Some(FetchStep::PassMd5));
        assert_eq!(error.reason(), "upstream-fetch-failed");
    }

    #[tokio::test]
    async fn test_empty_base_stream_is_rejected() {
        let ex = extractor(FakeFetcher::with_bodies(&[(200, EMBED_HTML), (200, " \n ")]));

        let result = ex.extract(&ExtractionRequest::new("https://dood.to/d/abc")).await;

        assert!(matches!(
            result,
            Err(ExtractorError::UpstreamFetchFailed {
                step: FetchStep::PassMd5,
                source: FetchError::EmptyBody,
            })
        ));
    }

    #[tokio::test]
    async fn test_custom_config_drives_urls_and_suffix() {
        let config = ExtractorConfig {
            base_origin: "https://d000d.com/".to_string(),
            stream_suffix: "000".to_string(),
            ..Default::default()
        };
        let fetcher = FakeFetcher::with_bodies(&[(200, EMBED_HTML), (200, BASE_STREAM)]);
        let ex = DoodStreamExtractor::with_fetcher(config, fetcher).unwrap();

        let result = ex
            .extract(&ExtractionRequest::new("https://dood.to/d/abc"))
            .await
            .unwrap();

        assert!(result
            .destination_url
            .starts_with(&format!("{}000?token=", BASE_STREAM)));
        assert_eq!(result.request_headers.get("Referer"), Some("https://d000d.com/"));
        assert_eq!(ex.fetcher().requests()[0].url, "https://d000d.com/e/abc");
    }

    #[tokio::test]
    async fn test_custom_locator() {
        let fetcher = FakeFetcher::with_bodies(&[(200, "<html></html>"), (200, BASE_STREAM)]);
        let ex = extractor(fetcher).with_locator(FixedLocator);

        let result = ex
            .extract(&ExtractionRequest::new("https://dood.to/d/abc"))
            .await
            .unwrap();

        assert!(result.destination_url.contains("?token=fixedtoken&expiry="));
        assert_eq!(
            ex.fetcher().requests()[1].url,
            "https://myvidplay.com/pass_md5/fixed"
        );
    }

    #[test]
    fn test_invalid_config_rejected() {
        let config = ExtractorConfig {
            base_origin: "not an origin".to_string(),
            ..Default::default()
        };
        let result = DoodStreamExtractor::with_fetcher(config, FakeFetcher::default());
        assert!(matches!(result, Err(ExtractorError::InvalidConfig(_))));
    }

    #[test]
    fn test_supports() {
        let ex = extractor(FakeFetcher::default());
        assert_eq!(ex.name(), "doodstream");
        assert!(ex.supports("https://myvidplay.com/e/abc"));
        assert!(ex.supports("https://www.dood.to/d/abc"));
        assert!(ex.supports("https://ds2play.com/e/abc"));
        assert!(!ex.supports("https://youtube.com/watch?v=abc"));
        assert!(!ex.supports("nonsense"));
    }
}
