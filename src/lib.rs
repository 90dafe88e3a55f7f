//! # veo-jobs
//!
//! Async client core for long-running generative video jobs: submit a
//! request, fall back across alternative models when a submission is
//! rejected, poll the job until it finishes, and fetch the produced media.
//!
//! The remote API sits behind the [`MediaProvider`] trait. [`GeminiClient`]
//! implements it for the Gemini API's Veo models; tests and other backends
//! can supply their own.
//!
//! ## Flow
//!
//! 1. Build a [`JobRequest`] (prompt, optional source image, settings).
//! 2. Pick a [`ProviderCandidateList`], e.g. from a [`ModelTier`].
//! 3. [`FallbackSubmitter`] tries each candidate in order, retrying each
//!    once with a sanitized config before moving on.
//! 4. [`JobPoller`] checks status on a fixed interval (5s by default)
//!    until the job is done.
//! 5. [`MediaFetcher`] downloads each result; [`persist_media`] saves it
//!    if the caller wants a local copy.
//!
//! [`JobRunner`] wires the steps together.
//!
//! ## Quick Start
//!
//! ```no_run
//! use veo_jobs::{AspectRatio, ClientConfig, GeminiClient, JobRequest, JobRunner, ModelTier};
//!
//! # async fn example() -> veo_jobs::Result<()> {
//! let config = ClientConfig::from_env()?;
//! let client = GeminiClient::new(config.clone());
//! let runner = JobRunner::from_config(&client, &config);
//!
//! let request = JobRequest::builder("a lighthouse in a storm, cinematic")
//!     .aspect_ratio(AspectRatio::Landscape)
//!     .negative_prompt("low quality")
//!     .build()?;
//!
//! let outcome = runner
//!     .run_job(&request, &ModelTier::Veo3Fast.candidates(), |p| {
//!         println!("still rendering ({:?})", p.elapsed)
//!     })
//!     .await?;
//!
//! for item in &outcome.items {
//!     if let Some(bytes) = item.bytes() {
//!         let name = item.suggested_file_name("lighthouse");
//!         veo_jobs::persist_media(std::path::Path::new("out"), &name, bytes).await?;
//!     }
//! }
//! # Ok(())
//! # }
//! ```

pub mod candidates;
pub mod client;
pub mod config;
pub mod error;
pub mod fetch;
pub mod poll;
pub mod provider;
pub mod request;
pub mod runner;
pub mod submit;
pub mod types;

pub use candidates::{ModelTier, ProviderCandidateList};
pub use client::GeminiClient;
pub use config::{ClientConfig, ClientConfigBuilder};
pub use error::{FailedAttempt, JobError, ProviderError, Result};
pub use fetch::{persist_media, FetchedMedia, MediaFetcher};
pub use poll::{IntervalTicker, JobPoller, Ticker};
pub use provider::MediaProvider;
pub use request::{
    parse_seed, prompts_from_lines, AspectRatio, GenerationConfig, GenerationPayload, JobRequest,
    JobRequestBuilder, PersonGeneration, Resolution, SourceImage,
};
pub use runner::{JobOutcome, JobRunner};
pub use submit::{FallbackSubmitter, JobSubmitter};
pub use types::{
    AsyncJobHandle, CompletedJob, JobState, JobStatus, JobToken, MediaRef, PollProgress,
};
