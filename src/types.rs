use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Opaque token for a job accepted by a provider (e.g. an operation name).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct JobToken(pub String);

impl JobToken {
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for JobToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Reference to one generated media item, resolvable by a provider download.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MediaRef {
    pub uri: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mime_type: Option<String>,
}

impl MediaRef {
    pub fn new(uri: impl Into<String>) -> Self {
        Self {
            uri: uri.into(),
            mime_type: None,
        }
    }

    pub fn with_mime_type(mut self, mime: impl Into<String>) -> Self {
        self.mime_type = Some(mime.into());
        self
    }
}

/// One status snapshot reported by a provider.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct JobStatus {
    pub done: bool,
    pub media: Vec<MediaRef>,
    /// Terminal failure message, if the job failed remotely.
    pub error: Option<String>,
    /// Reasons the provider withheld output (safety filtering).
    pub filtered_reasons: Vec<String>,
}

impl JobStatus {
    pub fn pending() -> Self {
        Self::default()
    }

    pub fn completed(media: Vec<MediaRef>) -> Self {
        Self {
            done: true,
            media,
            ..Self::default()
        }
    }

    pub fn failed(message: impl Into<String>) -> Self {
        Self {
            done: true,
            error: Some(message.into()),
            ..Self::default()
        }
    }
}

/// Lifecycle of one job attempt:
/// Created -> Submitted -> Polling -> CompletedWithResult/CompletedEmpty/Failed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum JobState {
    Created,
    Submitted,
    Polling,
    CompletedWithResult,
    CompletedEmpty,
    Failed,
}

impl JobState {
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            JobState::CompletedWithResult | JobState::CompletedEmpty | JobState::Failed
        )
    }
}

/// Handle to a submitted job. Only [`JobPoller`](crate::poll::JobPoller)
/// refreshes it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AsyncJobHandle {
    token: JobToken,
    provider_id: String,
    state: JobState,
    last_status: Option<JobStatus>,
}

impl AsyncJobHandle {
    pub fn new(token: JobToken, provider_id: impl Into<String>) -> Self {
        Self {
            token,
            provider_id: provider_id.into(),
            state: JobState::Submitted,
            last_status: None,
        }
    }

    pub fn token(&self) -> &JobToken {
        &self.token
    }

    pub fn provider_id(&self) -> &str {
        &self.provider_id
    }

    pub fn state(&self) -> JobState {
        self.state
    }

    pub fn is_done(&self) -> bool {
        self.last_status.as_ref().map(|s| s.done).unwrap_or(false)
    }

    pub fn last_status(&self) -> Option<&JobStatus> {
        self.last_status.as_ref()
    }

    /// Record a fresh status and advance the state machine.
    pub(crate) fn apply(&mut self, status: JobStatus) {
        self.state = if !status.done {
            JobState::Polling
        } else if status.error.is_some() {
            JobState::Failed
        } else if status.media.is_empty() {
            JobState::CompletedEmpty
        } else {
            JobState::CompletedWithResult
        };
        self.last_status = Some(status);
    }

    pub(crate) fn mark_failed(&mut self) {
        self.state = JobState::Failed;
    }
}

/// A job that finished with at least one media item.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompletedJob {
    pub token: JobToken,
    pub provider_id: String,
    pub media: Vec<MediaRef>,
    /// Number of status checks it took.
    pub polls: u32,
}

/// Liveness report passed to the tick callback once per status check.
#[derive(Debug, Clone)]
pub struct PollProgress {
    pub token: JobToken,
    pub provider_id: String,
    /// 1-based count of status checks so far.
    pub attempt: u32,
    pub elapsed: Duration,
    pub done: bool,
}
