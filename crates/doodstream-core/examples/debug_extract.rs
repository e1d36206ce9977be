//! Debug script to resolve one DoodStream URL end to end
//!
//! Run with: cargo run --example debug_extract -p doodstream-core -- <url> [config.toml]
//!
//! Logging follows `RUST_LOG` (default: `doodstream_core=debug`).

use doodstream_core::{
    DoodStreamExtractor, ExtractionRequest, ExtractorConfig, ExtractorError, StreamExtractor,
};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("doodstream_core=debug")),
        )
        .init();

    let mut args = std::env::args().skip(1);
    let Some(url) = args.next() else {
        eprintln!("usage: debug_extract <url> [config.toml]");
        return Ok(());
    };

    let config = match args.next() {
        Some(path) => ExtractorConfig::from_toml_str(&std::fs::read_to_string(path)?)?,
        None => ExtractorConfig::default(),
    };
    let embed_origin = config.origin().to_string();
    let embed_path = config.embed_path.clone();
    let extractor = DoodStreamExtractor::with_config(config)?;

    if !extractor.supports(&url) {
        println!("! {} is not a known {} host, trying anyway", url, extractor.name());
    }

    match extractor.extract(&ExtractionRequest::new(url.as_str())).await {
        Ok(result) => {
            println!("✓ Destination URL:");
            println!("{}\n", result.destination_url);
            println!("Headers:");
            for (name, value) in result.request_headers.iter() {
                println!("  {}: {}", name, value);
            }
            println!("Endpoint: {}", result.endpoint_hint.as_str());
        }
        Err(e) => {
            println!("✗ Extraction failed [{}]: {}", e.reason(), e);

            // Save the embed page for inspection when scanning failed
            if matches!(
                e,
                ExtractorError::PatternNotFound(_) | ExtractorError::TokenNotFound(_)
            ) {
                let video_id = doodstream_core::url::extract_video_id(&url)?;
                let embed_url =
                    doodstream_core::url::build_embed_url(&embed_origin, &embed_path, &video_id);
                let html = reqwest::Client::new()
                    .get(&embed_url)
                    .header("Referer", format!("{}/", embed_origin))
                    .send()
                    .await?
                    .text()
                    .await?;

                std::fs::write("debug_embed.html", &html)?;
                println!("Embed page saved to debug_embed.html");
            }
        }
    }

    Ok(())
}
