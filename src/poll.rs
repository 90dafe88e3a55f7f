use std::future::Future;
use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};
use std::time::Duration;
use tokio::time::Instant;

use crate::config::DEFAULT_POLL_INTERVAL;
use crate::error::{JobError, Result};
use crate::provider::MediaProvider;
use crate::types::{AsyncJobHandle, CompletedJob, JobState, PollProgress};

/// Waits between two status checks.
///
/// Injected into [`JobPoller`] so the loop can be driven without real
/// sleeps in tests.
pub trait Ticker: Send + Sync {
    fn tick(&self) -> impl Future<Output = ()> + Send;
}

/// Sleeps a fixed interval on the tokio timer.
#[derive(Debug, Clone, Copy)]
pub struct IntervalTicker {
    interval: Duration,
}

impl IntervalTicker {
    pub fn new(interval: Duration) -> Self {
        Self { interval }
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }
}

impl Default for IntervalTicker {
    fn default() -> Self {
        Self::new(DEFAULT_POLL_INTERVAL)
    }
}

impl Ticker for IntervalTicker {
    async fn tick(&self) {
        tokio::time::sleep(self.interval).await;
    }
}

/// Polls an [`AsyncJobHandle`] until the remote job finishes.
///
/// There is no overall timeout. To stop early, set the flag passed to
/// [`with_cancellation`](Self::with_cancellation); only local polling
/// stops, the remote job keeps running.
#[derive(Debug, Clone)]
pub struct JobPoller<P, T = IntervalTicker> {
    provider: P,
    ticker: T,
    cancellation: Option<Arc<AtomicBool>>,
}

impl<P: MediaProvider> JobPoller<P, IntervalTicker> {
    /// Poller with the default 5 second interval.
    pub fn new(provider: P) -> Self {
        Self::with_ticker(provider, IntervalTicker::default())
    }
}

impl<P: MediaProvider, T: Ticker> JobPoller<P, T> {
    pub fn with_ticker(provider: P, ticker: T) -> Self {
        Self {
            provider,
            ticker,
            cancellation: None,
        }
    }

    /// Stop polling with [`JobError::Cancelled`] once `flag` is set.
    pub fn with_cancellation(mut self, flag: Arc<AtomicBool>) -> Self {
        self.cancellation = Some(flag);
        self
    }

    pub fn provider(&self) -> &P {
        &self.provider
    }

    fn is_cancelled(&self) -> bool {
        self.cancellation
            .as_ref()
            .map(|c| c.load(Ordering::Relaxed))
            .unwrap_or(false)
    }

    /// Perform a single status check and advance the handle's state.
    ///
    /// A failing status call is reported as [`JobError::Polling`] and is
    /// not retried.
    pub async fn check(&self, handle: &mut AsyncJobHandle) -> Result<JobState> {
        let result = self.provider.status(handle.token()).await;
        match result {
            Ok(status) => {
                handle.apply(status);
                Ok(handle.state())
            }
            Err(source) => {
                handle.mark_failed();
                Err(JobError::Polling {
                    token: handle.token().to_string(),
                    source,
                })
            }
        }
    }

    /// Poll until the job is done, calling `on_tick` once per status check.
    pub async fn poll_to_completion<F>(
        &self,
        handle: &mut AsyncJobHandle,
        mut on_tick: F,
    ) -> Result<CompletedJob>
    where
        F: FnMut(PollProgress),
    {
        let start = Instant::now();
        let mut attempt: u32 = 0;

        loop {
            if self.is_cancelled() {
                tracing::info!(token = %handle.token(), "polling cancelled locally");
                return Err(JobError::Cancelled {
                    token: handle.token().to_string(),
                });
            }

            attempt += 1;
            let state = self.check(handle).await?;
            tracing::debug!(token = %handle.token(), attempt, state = ?state, "status checked");

            on_tick(PollProgress {
                token: handle.token().clone(),
                provider_id: handle.provider_id().to_string(),
                attempt,
                elapsed: start.elapsed(),
                done: state.is_terminal(),
            });

            if state.is_terminal() {
                return finish(handle, attempt);
            }

            self.ticker.tick().await;
        }
    }
}

fn finish(handle: &AsyncJobHandle, polls: u32) -> Result<CompletedJob> {
    let token = handle.token().to_string();
    let status = handle.last_status();

    match handle.state() {
        JobState::CompletedWithResult => Ok(CompletedJob {
            token: handle.token().clone(),
            provider_id: handle.provider_id().to_string(),
            media: status.map(|s| s.media.clone()).unwrap_or_default(),
            polls,
        }),
        JobState::CompletedEmpty => Err(JobError::EmptyResult {
            token,
            filtered_reasons: status.map(|s| s.filtered_reasons.clone()).unwrap_or_default(),
        }),
        _ => Err(JobError::JobFailed {
            token,
            message: status
                .and_then(|s| s.error.clone())
                .unwrap_or_else(|| "Job failed without a message".to_string()),
        }),
    }
}
