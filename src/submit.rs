use crate::candidates::ProviderCandidateList;
use crate::error::{FailedAttempt, JobError, Result};
use crate::provider::MediaProvider;
use crate::request::JobRequest;
use crate::types::AsyncJobHandle;

/// Submits a [`JobRequest`] to one candidate model.
///
/// Every call starts remote compute, so it is only ever invoked for the
/// documented fallback attempts.
#[derive(Debug, Clone)]
pub struct JobSubmitter<P> {
    provider: P,
}

impl<P: MediaProvider> JobSubmitter<P> {
    pub fn new(provider: P) -> Self {
        Self { provider }
    }

    pub fn provider(&self) -> &P {
        &self.provider
    }

    /// Submit `request` to `provider_id`. Provider failures come back as
    /// [`JobError::Submission`].
    pub async fn submit(&self, provider_id: &str, request: &JobRequest) -> Result<AsyncJobHandle> {
        let payload = request.payload();
        if payload.config.resolution != request.requested_resolution() {
            tracing::debug!(
                provider = provider_id,
                requested = request.requested_resolution().as_str(),
                effective = payload.config.resolution.as_str(),
                "resolution downgraded for aspect ratio {}",
                request.aspect_ratio().as_str()
            );
        }

        match self.provider.submit(provider_id, &payload).await {
            Ok(token) => {
                tracing::debug!(provider = provider_id, token = %token, "job submitted");
                Ok(AsyncJobHandle::new(token, provider_id))
            }
            Err(source) => Err(JobError::Submission {
                provider: provider_id.to_string(),
                source,
            }),
        }
    }
}

/// Walks a [`ProviderCandidateList`] in order until one candidate accepts
/// the job.
///
/// When a candidate rejects the request, it is retried exactly once with
/// [`JobRequest::sanitized`] before moving on. This is a crude heuristic
/// for parameter-incompatibility rejections: it cannot tell those apart
/// from real outages, and the error that triggered it is only kept in the
/// attempt log. The retry is skipped when the request is already in the
/// sanitized shape, since it would send an identical submission.
#[derive(Debug, Clone)]
pub struct FallbackSubmitter<P> {
    submitter: JobSubmitter<P>,
    sanitized_retry: bool,
}

impl<P: MediaProvider> FallbackSubmitter<P> {
    pub fn new(provider: P) -> Self {
        Self {
            submitter: JobSubmitter::new(provider),
            sanitized_retry: true,
        }
    }

    /// Enable or disable the per-candidate sanitized retry (default: on).
    pub fn with_sanitized_retry(mut self, enabled: bool) -> Self {
        self.sanitized_retry = enabled;
        self
    }

    pub fn submitter(&self) -> &JobSubmitter<P> {
        &self.submitter
    }

    /// Submit to the first candidate that accepts the job.
    ///
    /// Returns the handle and the id of the accepting candidate. Fails with
    /// [`JobError::AllCandidatesExhausted`] once every candidate (and its
    /// sanitized retry) has been rejected; with N candidates that is at
    /// most 2N submissions.
    pub async fn submit_with_fallback(
        &self,
        candidates: &ProviderCandidateList,
        request: &JobRequest,
    ) -> Result<(AsyncJobHandle, String)> {
        let sanitized = request.sanitized();
        let retry = self.sanitized_retry && !request.is_sanitized();

        let mut attempts = Vec::new();
        let mut last_error = None;

        for candidate in candidates.iter() {
            let mut tries = vec![(request, false)];
            if retry {
                tries.push((&sanitized, true));
            }

            for (attempt_request, is_sanitized) in tries {
                match self.submitter.submit(candidate, attempt_request).await {
                    Ok(handle) => {
                        tracing::info!(
                            provider = candidate,
                            sanitized = is_sanitized,
                            failed_attempts = attempts.len(),
                            "job accepted"
                        );
                        return Ok((handle, candidate.to_string()));
                    }
                    Err(err) => {
                        tracing::warn!(
                            provider = candidate,
                            sanitized = is_sanitized,
                            "submission failed: {}",
                            err
                        );
                        attempts.push(FailedAttempt {
                            provider_id: candidate.to_string(),
                            sanitized: is_sanitized,
                            message: err.to_string(),
                        });
                        last_error = Some(err);
                    }
                }
            }
        }

        match last_error {
            Some(last) => Err(JobError::AllCandidatesExhausted {
                attempts,
                last: Box::new(last),
            }),
            None => Err(JobError::InvalidRequest(
                "Candidate list must contain at least one model id".into(),
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ProviderError;
    use crate::request::{AspectRatio, GenerationPayload, Resolution};
    use crate::types::{JobStatus, JobToken, MediaRef};
    use std::sync::Mutex;

    /// Accepts only the listed model ids; records every submit.
    struct Gatekeeper {
        accept: Vec<&'static str>,
        accept_sanitized_only: bool,
        calls: Mutex<Vec<(String, Resolution)>>,
    }

    impl Gatekeeper {
        fn new(accept: Vec<&'static str>) -> Self {
            Self {
                accept,
                accept_sanitized_only: false,
                calls: Mutex::new(Vec::new()),
            }
        }

        fn calls(&self) -> Vec<(String, Resolution)> {
            self.calls.lock().unwrap().clone()
        }
    }

    impl MediaProvider for Gatekeeper {
        async fn submit(
            &self,
            model_id: &str,
            payload: &GenerationPayload<'_>,
        ) -> std::result::Result<JobToken, ProviderError> {
            self.calls
                .lock()
                .unwrap()
                .push((model_id.to_string(), payload.config.resolution));
            let sanitized_shape = payload.config.aspect_ratio == AspectRatio::Landscape
                && payload.config.resolution == Resolution::Hd;
            if self.accept.contains(&model_id) && (!self.accept_sanitized_only || sanitized_shape) {
                Ok(JobToken::new(format!("op-{}", model_id)))
            } else {
                Err(ProviderError::Rejected(format!("{} unavailable", model_id)))
            }
        }

        async fn status(&self, _token: &JobToken) -> std::result::Result<JobStatus, ProviderError> {
            Ok(JobStatus::pending())
        }

        async fn download(&self, _media: &MediaRef) -> std::result::Result<Vec<u8>, ProviderError> {
            Ok(Vec::new())
        }
    }

    fn fancy_request() -> JobRequest {
        JobRequest::builder("a cat on a skateboard")
            .aspect_ratio(AspectRatio::Square)
            .resolution(Resolution::FullHd)
            .seed(11)
            .build()
            .unwrap()
    }

    #[tokio::test]
    async fn test_submitter_wraps_provider_error() {
        let provider = Gatekeeper::new(vec![]);
        let submitter = JobSubmitter::new(&provider);
        let err = submitter.submit("m1", &fancy_request()).await.unwrap_err();
        match err {
            JobError::Submission { provider, .. } => assert_eq!(provider, "m1"),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test]
    async fn test_submitter_sends_downgraded_resolution() {
        let provider = Gatekeeper::new(vec!["m1"]);
        let submitter = JobSubmitter::new(&provider);
        let request = JobRequest::builder("x")
            .aspect_ratio(AspectRatio::Portrait)
            .resolution(Resolution::FullHd)
            .build()
            .unwrap();
        let handle = submitter.submit("m1", &request).await.unwrap();
        assert_eq!(handle.provider_id(), "m1");
        assert_eq!(provider.calls(), vec![("m1".to_string(), Resolution::Hd)]);
    }

    #[tokio::test]
    async fn test_first_candidate_wins_without_extra_calls() {
        let provider = Gatekeeper::new(vec!["m1", "m2"]);
        let fallback = FallbackSubmitter::new(&provider);
        let candidates = ProviderCandidateList::new(["m1", "m2"]).unwrap();

        let (handle, id) = fallback
            .submit_with_fallback(&candidates, &fancy_request())
            .await
            .unwrap();
        assert_eq!(id, "m1");
        assert_eq!(handle.token().as_str(), "op-m1");
        assert_eq!(provider.calls().len(), 1);
    }

    #[tokio::test]
    async fn test_sanitized_retry_rescues_same_candidate() {
        let mut provider = Gatekeeper::new(vec!["m1"]);
        provider.accept_sanitized_only = true;
        let fallback = FallbackSubmitter::new(&provider);
        let candidates = ProviderCandidateList::new(["m1", "m2"]).unwrap();

        let (_, id) = fallback
            .submit_with_fallback(&candidates, &fancy_request())
            .await
            .unwrap();
        assert_eq!(id, "m1");
        assert_eq!(
            provider.calls(),
            vec![
                ("m1".to_string(), Resolution::FullHd),
                ("m1".to_string(), Resolution::Hd)
            ]
        );
    }

    #[tokio::test]
    async fn test_retry_disabled() {
        let provider = Gatekeeper::new(vec!["m2"]);
        let fallback = FallbackSubmitter::new(&provider).with_sanitized_retry(false);
        let candidates = ProviderCandidateList::new(["m1", "m2"]).unwrap();

        let (_, id) = fallback
            .submit_with_fallback(&candidates, &fancy_request())
            .await
            .unwrap();
        assert_eq!(id, "m2");
        assert_eq!(provider.calls().len(), 2);
    }

    #[tokio::test]
    async fn test_already_sanitized_request_is_not_resubmitted() {
        let provider = Gatekeeper::new(vec![]);
        let fallback = FallbackSubmitter::new(&provider);
        let candidates = ProviderCandidateList::new(["m1", "m2"]).unwrap();
        let request = JobRequest::builder("plain").build().unwrap();

        let err = fallback
            .submit_with_fallback(&candidates, &request)
            .await
            .unwrap_err();
        assert_eq!(provider.calls().len(), 2);
        match err {
            JobError::AllCandidatesExhausted { attempts, .. } => {
                assert!(attempts.iter().all(|a| !a.sanitized));
            }
            other => panic!("unexpected error: {other}"),
        }
    }
}
