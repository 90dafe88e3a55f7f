use std::path::PathBuf;
use thiserror::Error;

/// Errors returned by a [`MediaProvider`](crate::provider::MediaProvider)
/// for a single remote call.
#[derive(Error, Debug)]
pub enum ProviderError {
    /// The provider returned a non-success HTTP status.
    #[error("provider returned HTTP {status}: {body}")]
    Http { status: u16, body: String },

    /// Network-level request failure with context.
    #[error("{context}: {source}")]
    Network {
        context: String,
        source: reqwest::Error,
    },

    /// The response was missing expected fields.
    #[error("{0}")]
    InvalidResponse(String),

    /// The provider refused the call with a message of its own.
    #[error("{0}")]
    Rejected(String),

    /// A success response whose body was not valid JSON.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// One failed submission recorded while walking a candidate list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FailedAttempt {
    pub provider_id: String,
    /// `true` when the attempt used the sanitized retry request.
    pub sanitized: bool,
    pub message: String,
}

/// Errors returned by job submission, polling and fetching.
#[derive(Error, Debug)]
pub enum JobError {
    /// The request could not be built (empty prompt without an image,
    /// unparseable seed, empty candidate list).
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// A single provider rejected the submission. Recoverable via fallback.
    #[error("Submission to {provider} failed: {source}")]
    Submission {
        provider: String,
        source: ProviderError,
    },

    /// Every candidate (and its sanitized retry) failed.
    #[error(
        "All candidates exhausted after {} attempt(s); last error: {last}",
        .attempts.len()
    )]
    AllCandidatesExhausted {
        attempts: Vec<FailedAttempt>,
        #[source]
        last: Box<JobError>,
    },

    /// The status check itself failed. Not retried.
    #[error("Status check for {token} failed: {source}")]
    Polling {
        token: String,
        source: ProviderError,
    },

    /// The remote job reached a terminal failure state.
    #[error("Job {token} failed: {message}")]
    JobFailed { token: String, message: String },

    /// The job finished but produced nothing usable.
    #[error("Job {token} completed without producing any media{}", describe_filtered(.filtered_reasons))]
    EmptyResult {
        token: String,
        filtered_reasons: Vec<String>,
    },

    /// Downloading one media item failed.
    #[error("Failed to fetch {uri}: {source}")]
    Fetch { uri: String, source: ProviderError },

    /// The caller stopped polling locally. The remote job may still run.
    #[error("Polling of {token} was cancelled")]
    Cancelled { token: String },

    /// Writing fetched media to disk failed.
    #[error("Failed to persist media to {}: {source}", .path.display())]
    Persist {
        path: PathBuf,
        source: std::io::Error,
    },
}

fn describe_filtered(reasons: &[String]) -> String {
    if reasons.is_empty() {
        String::new()
    } else {
        format!(" (filtered: {})", reasons.join("; "))
    }
}

/// Convenience alias.
pub type Result<T> = std::result::Result<T, JobError>;
