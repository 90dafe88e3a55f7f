use base64::Engine;
use reqwest::{Client, RequestBuilder};
use serde_json::{json, Map, Value};

use crate::config::ClientConfig;
use crate::error::ProviderError;
use crate::provider::MediaProvider;
use crate::request::GenerationPayload;
use crate::types::{JobStatus, JobToken, MediaRef};

const API_KEY_HEADER: &str = "x-goog-api-key";

fn normalize(endpoint: String) -> String {
    endpoint.trim_end_matches('/').to_string()
}

/// `veo-2.0-generate-001` and `models/veo-2.0-generate-001` are both accepted.
fn model_path(model_id: &str) -> String {
    let id = model_id.trim().trim_start_matches('/');
    if id.starts_with("models/") {
        id.to_string()
    } else {
        format!("models/{}", id)
    }
}

/// Async client for the Gemini API's long-running video generation.
///
/// Submits jobs with `:predictLongRunning`, reads operation status, and
/// downloads the generated files. Implements [`MediaProvider`] so it can
/// be driven by [`JobRunner`](crate::runner::JobRunner).
///
/// # Example
/// ```no_run
/// use veo_jobs::{ClientConfig, GeminiClient};
///
/// # async fn example() -> Result<(), veo_jobs::ProviderError> {
/// let client = GeminiClient::new(ClientConfig::new("my-api-key"));
/// let healthy = client.health().await?;
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct GeminiClient {
    http: Client,
    config: ClientConfig,
}

impl GeminiClient {
    /// Create a new client from a config.
    pub fn new(mut config: ClientConfig) -> Self {
        config.endpoint = normalize(config.endpoint);
        Self {
            http: Client::new(),
            config,
        }
    }

    /// Use a custom `reqwest::Client` (for connection pooling, proxies, TLS).
    pub fn with_http_client(mut self, client: Client) -> Self {
        self.http = client;
        self
    }

    /// Returns the configured endpoint URL.
    pub fn endpoint(&self) -> &str {
        &self.config.endpoint
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    // ── Health ──────────────────────────────────────────────────────

    /// Check whether the API is reachable and accepts the key.
    pub async fn health(&self) -> Result<bool, ProviderError> {
        let url = format!("{}/models?pageSize=1", self.config.endpoint);
        let resp = self
            .authed(self.http.get(&url))
            .timeout(self.config.request_timeout)
            .send()
            .await
            .map_err(|e| ProviderError::Network {
                context: format!("Cannot connect to {}", self.config.endpoint),
                source: e,
            })?;
        Ok(resp.status().is_success())
    }

    fn authed(&self, req: RequestBuilder) -> RequestBuilder {
        req.header(API_KEY_HEADER, &self.config.api_key)
    }

    async fn send_json(&self, req: RequestBuilder, context: &str) -> Result<Value, ProviderError> {
        let resp = self
            .authed(req)
            .timeout(self.config.request_timeout)
            .send()
            .await
            .map_err(|e| ProviderError::Network {
                context: context.to_string(),
                source: e,
            })?;

        if !resp.status().is_success() {
            return Err(http_error(resp).await);
        }

        let text = resp.text().await.map_err(|e| ProviderError::Network {
            context: format!("{}: unreadable response body", context),
            source: e,
        })?;
        parse_body(&text)
    }
}

impl MediaProvider for GeminiClient {
    async fn submit(
        &self,
        model_id: &str,
        payload: &GenerationPayload<'_>,
    ) -> Result<JobToken, ProviderError> {
        let url = format!(
            "{}/{}:predictLongRunning",
            self.config.endpoint,
            model_path(model_id)
        );
        let body = submit_body(payload);
        tracing::debug!(model = model_id, "submitting generation job");

        let json = self
            .send_json(
                self.http.post(&url).json(&body),
                &format!("Failed to submit job to {}", model_id),
            )
            .await?;

        operation_name(&json)
    }

    async fn status(&self, token: &JobToken) -> Result<JobStatus, ProviderError> {
        let url = format!("{}/{}", self.config.endpoint, token.as_str());
        let json = self
            .send_json(self.http.get(&url), "Failed to fetch operation status")
            .await?;
        parse_operation(&json)
    }

    async fn download(&self, media: &MediaRef) -> Result<Vec<u8>, ProviderError> {
        let url = if media.uri.starts_with("http://") || media.uri.starts_with("https://") {
            media.uri.clone()
        } else {
            format!("{}/{}", self.config.endpoint, media.uri.trim_start_matches('/'))
        };

        let resp = self
            .authed(self.http.get(&url))
            .timeout(self.config.download_timeout)
            .send()
            .await
            .map_err(|e| ProviderError::Network {
                context: format!("Failed to download {}", media.uri),
                source: e,
            })?;

        if !resp.status().is_success() {
            return Err(http_error(resp).await);
        }

        let bytes = resp.bytes().await.map_err(|e| ProviderError::Network {
            context: "Failed to read media bytes".into(),
            source: e,
        })?;
        Ok(bytes.to_vec())
    }
}

/// Build the `:predictLongRunning` request body.
pub(crate) fn submit_body(payload: &GenerationPayload<'_>) -> Value {
    let mut instance = Map::new();
    if !payload.prompt.is_empty() {
        instance.insert("prompt".into(), json!(payload.prompt));
    }
    if let Some(image) = payload.image {
        instance.insert(
            "image".into(),
            json!({
                "bytesBase64Encoded": base64::engine::general_purpose::STANDARD.encode(&image.bytes),
                "mimeType": image.mime_type,
            }),
        );
    }

    let config = &payload.config;
    let mut parameters = Map::new();
    parameters.insert("aspectRatio".into(), json!(config.aspect_ratio.as_str()));
    parameters.insert("resolution".into(), json!(config.resolution.as_str()));
    parameters.insert("sampleCount".into(), json!(config.sample_count));
    if let Some(negative) = &config.negative_prompt {
        parameters.insert("negativePrompt".into(), json!(negative));
    }
    if let Some(seed) = config.seed {
        parameters.insert("seed".into(), json!(seed));
    }
    if let Some(policy) = config.person_generation {
        parameters.insert("personGeneration".into(), json!(policy.as_str()));
    }

    json!({
        "instances": [Value::Object(instance)],
        "parameters": Value::Object(parameters),
    })
}

fn operation_name(json: &Value) -> Result<JobToken, ProviderError> {
    json.get("name")
        .and_then(|v| v.as_str())
        .filter(|s| !s.is_empty())
        .map(JobToken::new)
        .ok_or_else(|| ProviderError::InvalidResponse("Response missing operation name".into()))
}

/// Parse a long-running operation resource into a [`JobStatus`].
pub(crate) fn parse_operation(json: &Value) -> Result<JobStatus, ProviderError> {
    if !json.is_object() {
        return Err(ProviderError::InvalidResponse(
            "Operation response is not an object".into(),
        ));
    }

    let done = json.get("done").and_then(|v| v.as_bool()).unwrap_or(false);

    if let Some(err) = json.get("error").filter(|e| !e.is_null()) {
        let message = err
            .get("message")
            .and_then(|v| v.as_str())
            .unwrap_or("Unknown error");
        let code = err.get("code").and_then(|v| v.as_i64());
        let message = match code {
            Some(code) => format!("{} (code {})", message, code),
            None => message.to_string(),
        };
        return Ok(JobStatus::failed(message));
    }

    if !done {
        return Ok(JobStatus::pending());
    }

    // REST returns generateVideoResponse.generatedSamples; the SDK shape
    // uses generatedVideos. Accept either.
    let response = json.get("response");
    let video_response = response.and_then(|r| r.get("generateVideoResponse"));
    let samples = video_response
        .and_then(|r| r.get("generatedSamples"))
        .or_else(|| response.and_then(|r| r.get("generatedVideos")))
        .and_then(|s| s.as_array());

    let mut media = Vec::new();
    if let Some(samples) = samples {
        for sample in samples {
            let video = sample.get("video");
            if let Some(uri) = video.and_then(|v| v.get("uri")).and_then(|u| u.as_str()) {
                let mut item = MediaRef::new(uri);
                if let Some(mime) = video
                    .and_then(|v| v.get("mimeType"))
                    .and_then(|m| m.as_str())
                {
                    item = item.with_mime_type(mime);
                }
                media.push(item);
            }
        }
    }

    let filtered_reasons = video_response
        .and_then(|r| r.get("raiMediaFilteredReasons"))
        .and_then(|r| r.as_array())
        .map(|arr| {
            arr.iter()
                .filter_map(|v| v.as_str().map(String::from))
                .collect()
        })
        .unwrap_or_default();

    Ok(JobStatus {
        done: true,
        media,
        error: None,
        filtered_reasons,
    })
}

/// Turn a non-success response into [`ProviderError::Http`], keeping the
/// provider's `error.message` when the body carries one.
async fn http_error(resp: reqwest::Response) -> ProviderError {
    let status = resp.status().as_u16();
    let body = resp.text().await.unwrap_or_default();
    ProviderError::Http {
        status,
        body: error_message(&body).unwrap_or(body),
    }
}

fn parse_body(text: &str) -> Result<Value, ProviderError> {
    Ok(serde_json::from_str(text)?)
}

/// Pull `error.message` out of a JSON error body, if there is one.
fn error_message(body: &str) -> Option<String> {
    let json: Value = serde_json::from_str(body).ok()?;
    json.pointer("/error/message")
        .and_then(|v| v.as_str())
        .map(String::from)
}
