//! DoodStream Resolver Core Library
//!
//! Turns DoodStream / MyVidPlay page URLs into direct media URLs that a
//! streaming proxy can pass through.
//!
//! # Overview
//!
//! One extraction is two chained GET requests:
//! - the embed page for the video identifier
//! - the pass sub-path found in it, fetched in full (never ranged)
//!
//! The pass response, an opaque suffix, the page token and an expiry
//! timestamp make up the final URL.
//!
//! # Example
//!
//! ```no_run
//! use doodstream_core::{DoodStreamExtractor, ExtractionRequest, Result, StreamExtractor};
//!
//! #[tokio::main]
//! async fn main() -> Result<()> {
//!     let extractor = DoodStreamExtractor::new()?;
//!
//!     let result = extractor
//!         .extract(&ExtractionRequest::new("https://dood.to/d/x1y2z3"))
//!         .await?;
//!
//!     println!("{}", result.destination_url);
//!     // Returns: https://xy42.cloudatacdn.com/...~123456789?token=...&expiry=...
//!     for (name, value) in result.request_headers.iter() {
//!         println!("{}: {}", name, value);
//!     }
//!
//!     Ok(())
//! }
//! ```
//!
//! # Expiry
//!
//! Destination URLs embed a token and an `expiry` timestamp taken at
//! resolution time. Resolve right before streaming and do not cache them.

mod client;
mod config;
mod error;
mod extractor;
pub mod locator;
mod types;
pub mod url;

// Re-export client types
pub use client::{
    ClientConfig, FetchRequest, FetchResponse, HttpFetcher, RangePolicy, RateLimiter,
    ReqwestFetcher,
};

// Re-export config
pub use config::ExtractorConfig;

// Re-export error types
pub use error::{ExtractorError, FetchError, FetchStep, Result};

// Re-export extractor API
pub use extractor::{DoodStreamExtractor, StreamExtractor};

// Re-export locator types
pub use locator::{FieldLocator, FieldSpec, RegexLocator};

// Re-export data types
pub use types::{EndpointHint, ExtractionRequest, ExtractionResult, RequestHeaders};

/// Resolve one source URL with the default site config and HTTP client
///
/// Builds a fresh extractor per call. Keep a [`DoodStreamExtractor`]
/// around instead when resolving many URLs so the rate limiter is shared.
///
/// # Errors
/// See [`DoodStreamExtractor::resolve`]
pub async fn extract(url: &str, headers: RequestHeaders) -> Result<ExtractionResult> {
    let extractor = DoodStreamExtractor::new()?;
    extractor
        .extract(&ExtractionRequest::with_headers(url, headers))
        .await
}
