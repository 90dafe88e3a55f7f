use std::future::Future;

use crate::error::ProviderError;
use crate::request::GenerationPayload;
use crate::types::{JobStatus, JobToken, MediaRef};

/// A generative-media backend that runs long-running jobs.
///
/// Implementations are expected to perform exactly one remote call per
/// method invocation. `submit` starts remote billing, so callers must not
/// invoke it speculatively.
///
/// # Example
///
/// ```ignore
/// use veo_jobs::*;
///
/// struct Canned;
///
/// impl MediaProvider for Canned {
///     async fn submit(&self, _model: &str, _p: &GenerationPayload<'_>) -> Result<JobToken, ProviderError> {
///         Ok(JobToken::new("op-1"))
///     }
///     async fn status(&self, _t: &JobToken) -> Result<JobStatus, ProviderError> {
///         Ok(JobStatus::completed(vec![MediaRef::new("mem://1")]))
///     }
///     async fn download(&self, _m: &MediaRef) -> Result<Vec<u8>, ProviderError> {
///         Ok(vec![0u8; 4])
///     }
/// }
/// ```
pub trait MediaProvider: Send + Sync {
    /// Start a job on `model_id`. Returns the provider's job token.
    fn submit(
        &self,
        model_id: &str,
        payload: &GenerationPayload<'_>,
    ) -> impl Future<Output = Result<JobToken, ProviderError>> + Send;

    /// Fetch the current status of a job.
    fn status(
        &self,
        token: &JobToken,
    ) -> impl Future<Output = Result<JobStatus, ProviderError>> + Send;

    /// Download the raw bytes behind a media reference.
    fn download(
        &self,
        media: &MediaRef,
    ) -> impl Future<Output = Result<Vec<u8>, ProviderError>> + Send;
}

impl<P: MediaProvider> MediaProvider for &P {
    fn submit(
        &self,
        model_id: &str,
        payload: &GenerationPayload<'_>,
    ) -> impl Future<Output = Result<JobToken, ProviderError>> + Send {
        (**self).submit(model_id, payload)
    }

    fn status(
        &self,
        token: &JobToken,
    ) -> impl Future<Output = Result<JobStatus, ProviderError>> + Send {
        (**self).status(token)
    }

    fn download(
        &self,
        media: &MediaRef,
    ) -> impl Future<Output = Result<Vec<u8>, ProviderError>> + Send {
        (**self).download(media)
    }
}

impl<P: MediaProvider> MediaProvider for std::sync::Arc<P> {
    fn submit(
        &self,
        model_id: &str,
        payload: &GenerationPayload<'_>,
    ) -> impl Future<Output = Result<JobToken, ProviderError>> + Send {
        (**self).submit(model_id, payload)
    }

    fn status(
        &self,
        token: &JobToken,
    ) -> impl Future<Output = Result<JobStatus, ProviderError>> + Send {
        (**self).status(token)
    }

    fn download(
        &self,
        media: &MediaRef,
    ) -> impl Future<Output = Result<Vec<u8>, ProviderError>> + Send {
        (**self).download(media)
    }
}
