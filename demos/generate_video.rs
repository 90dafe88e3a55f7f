//! Render one video per prompt line with multi-model fallback.
//!
//! Reads the API key from `GEMINI_API_KEY` (or `GOOGLE_API_KEY`).
//!
//! ```sh
//! cargo run --example generate_video -- veo-2 "a cat on a skateboard
//! a lighthouse in a storm"
//! ```

use std::path::Path;
use veo_jobs::{
    persist_media, prompts_from_lines, AspectRatio, ClientConfig, GeminiClient, JobRequest,
    JobRunner, ModelTier,
};

#[tokio::main]
async fn main() -> std::result::Result<(), Box<dyn std::error::Error>> {
    let mut args = std::env::args().skip(1);
    let tier: ModelTier = args.next().as_deref().unwrap_or("veo-3-fast").parse()?;
    let prompts = prompts_from_lines(&args.next().unwrap_or_default());
    if prompts.is_empty() {
        eprintln!("Usage: generate_video <tier> <prompts, one per line>");
        return Ok(());
    }

    let config = ClientConfig::from_env()?;
    let client = GeminiClient::new(config.clone());
    if !client.health().await? {
        eprintln!("Gemini API rejected the key or is unreachable");
        return Ok(());
    }

    let runner = JobRunner::from_config(&client, &config);
    let requests = prompts
        .iter()
        .map(|p| JobRequest::builder(p.as_str()).aspect_ratio(AspectRatio::Landscape).build())
        .collect::<veo_jobs::Result<Vec<_>>>()?;

    println!("Rendering {} video(s) with {}", requests.len(), tier);
    let results = runner
        .run_batch(&requests, &tier.candidates(), |index, progress| {
            println!(
                "  [{}/{}] {} check #{} ({:.0?})",
                index + 1,
                requests.len(),
                progress.provider_id,
                progress.attempt,
                progress.elapsed
            );
        })
        .await;

    for (index, result) in results.into_iter().enumerate() {
        match result {
            Ok(outcome) => {
                for item in &outcome.items {
                    match item.bytes() {
                        Some(bytes) => {
                            let name = item.suggested_file_name(&format!("video_{}", index + 1));
                            let path = persist_media(Path::new("videos"), &name, bytes).await?;
                            println!("Saved {}", path.display());
                        }
                        None => eprintln!("Download failed for {}", item.reference.uri),
                    }
                }
            }
            Err(e) => eprintln!("Video {} failed: {}", index + 1, e),
        }
    }

    Ok(())
}
