use std::sync::{atomic::AtomicBool, Arc};
use std::time::Duration;

use crate::candidates::ProviderCandidateList;
use crate::error::Result;
use crate::fetch::{FetchedMedia, MediaFetcher};
use crate::poll::{IntervalTicker, JobPoller, Ticker};
use crate::provider::MediaProvider;
use crate::request::JobRequest;
use crate::submit::FallbackSubmitter;
use crate::types::{JobToken, PollProgress};

/// Everything a finished job produced.
#[derive(Debug)]
pub struct JobOutcome {
    /// The candidate that accepted the job.
    pub provider_id: String,
    pub token: JobToken,
    /// One entry per media reference, each with its own fetch result.
    pub items: Vec<FetchedMedia>,
}

impl JobOutcome {
    /// Bytes of every item that downloaded successfully, in order.
    pub fn bytes(&self) -> Vec<&[u8]> {
        self.items.iter().filter_map(|i| i.bytes()).collect()
    }

    /// Items whose download failed.
    pub fn failures(&self) -> impl Iterator<Item = &FetchedMedia> {
        self.items.iter().filter(|i| !i.is_ok())
    }
}

/// Runs one job end to end: fallback submit, poll to completion, fetch.
///
/// Stateless per job; callers own any queue or history.
///
/// # Example
/// ```no_run
/// use veo_jobs::{ClientConfig, GeminiClient, JobRequest, JobRunner, ModelTier};
///
/// # async fn example() -> veo_jobs::Result<()> {
/// let config = ClientConfig::from_env()?;
/// let client = GeminiClient::new(config.clone());
/// let runner = JobRunner::from_config(&client, &config);
///
/// let request = JobRequest::builder("a cat on a skateboard").build()?;
/// let outcome = runner
///     .run_job(&request, &ModelTier::Veo2.candidates(), |p| {
///         println!("check #{} after {:?}", p.attempt, p.elapsed)
///     })
///     .await?;
///
/// for item in &outcome.items {
///     if let Some(bytes) = item.bytes() {
///         std::fs::write(item.suggested_file_name("cat"), bytes).unwrap();
///     }
/// }
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct JobRunner<P, T = IntervalTicker> {
    submitter: FallbackSubmitter<P>,
    poller: JobPoller<P, T>,
    fetcher: MediaFetcher<P>,
}

impl<P: MediaProvider + Clone> JobRunner<P, IntervalTicker> {
    /// Runner polling every 5 seconds.
    pub fn new(provider: P) -> Self {
        Self::with_ticker(provider, IntervalTicker::default())
    }

    /// Runner polling at a custom interval.
    pub fn with_interval(provider: P, interval: Duration) -> Self {
        Self::with_ticker(provider, IntervalTicker::new(interval))
    }

    /// Runner polling at `config.poll_interval`.
    pub fn from_config(provider: P, config: &crate::config::ClientConfig) -> Self {
        Self::with_interval(provider, config.poll_interval)
    }
}

impl<P: MediaProvider + Clone, T: Ticker> JobRunner<P, T> {
    pub fn with_ticker(provider: P, ticker: T) -> Self {
        Self {
            submitter: FallbackSubmitter::new(provider.clone()),
            poller: JobPoller::with_ticker(provider.clone(), ticker),
            fetcher: MediaFetcher::new(provider),
        }
    }

    /// Stop polling once `flag` is set. Submitted jobs keep running remotely.
    pub fn with_cancellation(mut self, flag: Arc<AtomicBool>) -> Self {
        self.poller = self.poller.with_cancellation(flag);
        self
    }

    /// Enable or disable the sanitized retry per candidate (default: on).
    pub fn with_sanitized_retry(mut self, enabled: bool) -> Self {
        self.submitter = self.submitter.with_sanitized_retry(enabled);
        self
    }

    pub fn fetcher(&self) -> &MediaFetcher<P> {
        &self.fetcher
    }

    /// Submit, wait, and fetch. `on_tick` is called once per status check.
    ///
    /// Submission, polling, and empty-result errors abort the job. Fetch
    /// errors are kept per item in [`JobOutcome::items`].
    pub async fn run_job<F>(
        &self,
        request: &JobRequest,
        candidates: &ProviderCandidateList,
        on_tick: F,
    ) -> Result<JobOutcome>
    where
        F: FnMut(PollProgress),
    {
        let (mut handle, provider_id) = self
            .submitter
            .submit_with_fallback(candidates, request)
            .await?;

        let completed = self.poller.poll_to_completion(&mut handle, on_tick).await?;
        tracing::info!(
            provider = %provider_id,
            token = %completed.token,
            items = completed.media.len(),
            polls = completed.polls,
            "job completed"
        );

        let items = self.fetcher.fetch_all(&completed.media).await;
        Ok(JobOutcome {
            provider_id,
            token: completed.token,
            items,
        })
    }

    /// Run several requests one after another. A failed request does not
    /// stop the rest; `on_tick` also receives the request's index.
    pub async fn run_batch<F>(
        &self,
        requests: &[JobRequest],
        candidates: &ProviderCandidateList,
        mut on_tick: F,
    ) -> Vec<Result<JobOutcome>>
    where
        F: FnMut(usize, PollProgress),
    {
        let mut results = Vec::with_capacity(requests.len());
        for (index, request) in requests.iter().enumerate() {
            let result = self
                .run_job(request, candidates, |p| on_tick(index, p))
                .await;
            if let Err(e) = &result {
                tracing::warn!(index, total = requests.len(), "batch item failed: {}", e);
            }
            results.push(result);
        }
        results
    }
}
