use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::error::{JobError, Result};

/// Largest number of media items a single job may request.
pub const MAX_SAMPLE_COUNT: u8 = 4;

/// Output frame aspect ratio.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AspectRatio {
    #[default]
    #[serde(rename = "16:9")]
    Landscape,
    #[serde(rename = "9:16")]
    Portrait,
    #[serde(rename = "1:1")]
    Square,
    #[serde(rename = "4:3")]
    Classic,
    #[serde(rename = "3:4")]
    ClassicPortrait,
}

impl AspectRatio {
    pub fn as_str(&self) -> &'static str {
        match self {
            AspectRatio::Landscape => "16:9",
            AspectRatio::Portrait => "9:16",
            AspectRatio::Square => "1:1",
            AspectRatio::Classic => "4:3",
            AspectRatio::ClassicPortrait => "3:4",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s.trim() {
            "16:9" => Some(AspectRatio::Landscape),
            "9:16" => Some(AspectRatio::Portrait),
            "1:1" => Some(AspectRatio::Square),
            "4:3" => Some(AspectRatio::Classic),
            "3:4" => Some(AspectRatio::ClassicPortrait),
            _ => None,
        }
    }
}

/// Output video resolution.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Resolution {
    #[default]
    #[serde(rename = "720p")]
    Hd,
    #[serde(rename = "1080p")]
    FullHd,
}

impl Resolution {
    pub fn as_str(&self) -> &'static str {
        match self {
            Resolution::Hd => "720p",
            Resolution::FullHd => "1080p",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s.trim() {
            "720p" => Some(Resolution::Hd),
            "1080p" => Some(Resolution::FullHd),
            _ => None,
        }
    }
}

/// Policy for generating people in the output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PersonGeneration {
    AllowAll,
    AllowAdult,
    DontAllow,
}

impl PersonGeneration {
    pub fn as_str(&self) -> &'static str {
        match self {
            PersonGeneration::AllowAll => "allow_all",
            PersonGeneration::AllowAdult => "allow_adult",
            PersonGeneration::DontAllow => "dont_allow",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s.trim() {
            "allow_all" => Some(PersonGeneration::AllowAll),
            "allow_adult" => Some(PersonGeneration::AllowAdult),
            "dont_allow" => Some(PersonGeneration::DontAllow),
            _ => None,
        }
    }
}

/// An input image for image-to-video jobs.
#[derive(Clone, PartialEq, Eq)]
pub struct SourceImage {
    pub bytes: Vec<u8>,
    pub mime_type: String,
}

impl std::fmt::Debug for SourceImage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SourceImage")
            .field("bytes", &format_args!("<{} bytes>", self.bytes.len()))
            .field("mime_type", &self.mime_type)
            .finish()
    }
}

impl SourceImage {
    pub fn new(bytes: Vec<u8>, mime_type: impl Into<String>) -> Self {
        Self {
            bytes,
            mime_type: mime_type.into(),
        }
    }

    /// Read an image file, inferring the MIME type from its extension.
    ///
    /// Only PNG and JPEG inputs are accepted.
    pub async fn load(path: &Path) -> Result<Self> {
        let mime = path
            .extension()
            .and_then(|e| e.to_str())
            .and_then(mime_for_extension)
            .ok_or_else(|| {
                JobError::InvalidRequest(format!(
                    "Unsupported image type: {}",
                    path.display()
                ))
            })?;
        let bytes = tokio::fs::read(path).await.map_err(|e| {
            JobError::InvalidRequest(format!("Cannot read image {}: {}", path.display(), e))
        })?;
        Ok(Self::new(bytes, mime))
    }
}

fn mime_for_extension(ext: &str) -> Option<&'static str> {
    match ext.to_ascii_lowercase().as_str() {
        "png" => Some("image/png"),
        "jpg" | "jpeg" => Some("image/jpeg"),
        _ => None,
    }
}

/// Parse a seed typed into a free-form field.
///
/// Blank input and `0` both mean "no seed". Anything that is not a
/// non-negative 32-bit integer is rejected.
pub fn parse_seed(input: &str) -> Result<Option<u32>> {
    let trimmed = input.trim();
    if trimmed.is_empty() {
        return Ok(None);
    }
    let seed: u32 = trimmed
        .parse()
        .map_err(|_| JobError::InvalidRequest(format!("Seed must be a non-negative integer, got {:?}", trimmed)))?;
    Ok((seed != 0).then_some(seed))
}

/// Split multi-line prompt input into one prompt per non-blank line.
pub fn prompts_from_lines(text: &str) -> Vec<String> {
    text.lines()
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .map(String::from)
        .collect()
}

/// Generation parameters as they are sent downstream.
///
/// Produced by [`JobRequest::config`], so the resolution downgrade and
/// seed normalization have already been applied.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GenerationConfig {
    pub aspect_ratio: AspectRatio,
    pub resolution: Resolution,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub negative_prompt: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub seed: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub person_generation: Option<PersonGeneration>,
    pub sample_count: u8,
}

/// Borrowed view of a request handed to a provider on submit.
#[derive(Debug, Clone)]
pub struct GenerationPayload<'a> {
    pub prompt: &'a str,
    pub image: Option<&'a SourceImage>,
    pub config: GenerationConfig,
}

/// An immutable description of one generation request.
///
/// Build one with [`JobRequest::builder`].
///
/// # Example
/// ```
/// use veo_jobs::{AspectRatio, JobRequest, Resolution};
///
/// let request = JobRequest::builder("a cat on a skateboard")
///     .aspect_ratio(AspectRatio::Portrait)
///     .resolution(Resolution::FullHd)
///     .seed(0)
///     .build()
///     .unwrap();
///
/// let config = request.config();
/// assert_eq!(config.resolution, Resolution::Hd);
/// assert_eq!(config.seed, None);
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobRequest {
    prompt: String,
    source_image: Option<SourceImage>,
    aspect_ratio: AspectRatio,
    resolution: Resolution,
    negative_prompt: Option<String>,
    seed: Option<u32>,
    person_generation: Option<PersonGeneration>,
    sample_count: u8,
}

impl JobRequest {
    /// Start building a request for the given prompt (may be empty when
    /// an image is supplied).
    pub fn builder(prompt: impl Into<String>) -> JobRequestBuilder {
        JobRequestBuilder::new(prompt)
    }

    pub fn prompt(&self) -> &str {
        &self.prompt
    }

    pub fn source_image(&self) -> Option<&SourceImage> {
        self.source_image.as_ref()
    }

    pub fn aspect_ratio(&self) -> AspectRatio {
        self.aspect_ratio
    }

    /// The resolution as requested, before any downgrade.
    pub fn requested_resolution(&self) -> Resolution {
        self.resolution
    }

    /// The resolution that will actually be sent. 1080p is not available
    /// for portrait output and falls back to 720p.
    pub fn effective_resolution(&self) -> Resolution {
        match (self.aspect_ratio, self.resolution) {
            (AspectRatio::Portrait, Resolution::FullHd) => Resolution::Hd,
            (_, r) => r,
        }
    }

    pub fn negative_prompt(&self) -> Option<&str> {
        self.negative_prompt.as_deref()
    }

    pub fn seed(&self) -> Option<u32> {
        self.seed
    }

    pub fn person_generation(&self) -> Option<PersonGeneration> {
        self.person_generation
    }

    pub fn sample_count(&self) -> u8 {
        self.sample_count
    }

    /// Downstream configuration for this request.
    pub fn config(&self) -> GenerationConfig {
        GenerationConfig {
            aspect_ratio: self.aspect_ratio,
            resolution: self.effective_resolution(),
            negative_prompt: self.negative_prompt.clone(),
            seed: self.seed,
            person_generation: self.person_generation,
            sample_count: self.sample_count,
        }
    }

    /// Borrowed payload for a provider submit call.
    pub fn payload(&self) -> GenerationPayload<'_> {
        GenerationPayload {
            prompt: &self.prompt,
            image: self.source_image.as_ref(),
            config: self.config(),
        }
    }

    /// A copy with configuration reset to known-safe values: 16:9, 720p,
    /// no negative prompt, no seed. Prompt, image, person policy and
    /// sample count are kept.
    pub fn sanitized(&self) -> JobRequest {
        JobRequest {
            aspect_ratio: AspectRatio::Landscape,
            resolution: Resolution::Hd,
            negative_prompt: None,
            seed: None,
            ..self.clone()
        }
    }

    /// Whether [`sanitized`](Self::sanitized) would send the same config.
    pub fn is_sanitized(&self) -> bool {
        self.config() == self.sanitized().config()
    }
}

/// Builder for [`JobRequest`].
#[derive(Debug, Clone)]
pub struct JobRequestBuilder {
    prompt: String,
    source_image: Option<SourceImage>,
    aspect_ratio: AspectRatio,
    resolution: Resolution,
    negative_prompt: Option<String>,
    seed: Option<u32>,
    person_generation: Option<PersonGeneration>,
    sample_count: u8,
}

impl JobRequestBuilder {
    fn new(prompt: impl Into<String>) -> Self {
        Self {
            prompt: prompt.into(),
            source_image: None,
            aspect_ratio: AspectRatio::default(),
            resolution: Resolution::default(),
            negative_prompt: None,
            seed: None,
            person_generation: None,
            sample_count: 1,
        }
    }

    /// Attach a source image (image-to-video).
    pub fn image(mut self, image: SourceImage) -> Self {
        self.source_image = Some(image);
        self
    }

    pub fn aspect_ratio(mut self, aspect_ratio: AspectRatio) -> Self {
        self.aspect_ratio = aspect_ratio;
        self
    }

    pub fn resolution(mut self, resolution: Resolution) -> Self {
        self.resolution = resolution;
        self
    }

    /// Set the negative prompt. Blank text clears it.
    pub fn negative_prompt(mut self, prompt: impl Into<String>) -> Self {
        let prompt = prompt.into();
        self.negative_prompt = if prompt.trim().is_empty() {
            None
        } else {
            Some(prompt.trim().to_string())
        };
        self
    }

    /// Set a fixed seed. `0` means unset (random).
    pub fn seed(mut self, seed: u32) -> Self {
        self.seed = (seed != 0).then_some(seed);
        self
    }

    /// Set the seed from an already-parsed optional value.
    pub fn maybe_seed(mut self, seed: Option<u32>) -> Self {
        self.seed = seed.filter(|s| *s != 0);
        self
    }

    pub fn person_generation(mut self, policy: PersonGeneration) -> Self {
        self.person_generation = Some(policy);
        self
    }

    /// Number of media items to request, clamped to `1..=MAX_SAMPLE_COUNT`.
    pub fn sample_count(mut self, count: u8) -> Self {
        self.sample_count = count.clamp(1, MAX_SAMPLE_COUNT);
        self
    }

    /// Validate and build the request.
    pub fn build(self) -> Result<JobRequest> {
        let prompt = self.prompt.trim().to_string();
        if prompt.is_empty() && self.source_image.is_none() {
            return Err(JobError::InvalidRequest(
                "A prompt is required when no source image is supplied".into(),
            ));
        }
        if let Some(image) = &self.source_image {
            if image.bytes.is_empty() {
                return Err(JobError::InvalidRequest("Source image is empty".into()));
            }
        }

        Ok(JobRequest {
            prompt,
            source_image: self.source_image,
            aspect_ratio: self.aspect_ratio,
            resolution: self.resolution,
            negative_prompt: self.negative_prompt,
            seed: self.seed,
            person_generation: self.person_generation,
            sample_count: self.sample_count,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_portrait_1080p_downgrades() {
        let request = JobRequest::builder("a cat on a skateboard")
            .aspect_ratio(AspectRatio::Portrait)
            .resolution(Resolution::FullHd)
            .seed(0)
            .build()
            .unwrap();

        assert_eq!(request.requested_resolution(), Resolution::FullHd);
        let config = request.config();
        assert_eq!(config.resolution, Resolution::Hd);
        assert_eq!(config.seed, None);
    }

    #[test]
    fn test_other_ratios_keep_1080p() {
        for ratio in [
            AspectRatio::Landscape,
            AspectRatio::Square,
            AspectRatio::Classic,
            AspectRatio::ClassicPortrait,
        ] {
            let request = JobRequest::builder("x")
                .aspect_ratio(ratio)
                .resolution(Resolution::FullHd)
                .build()
                .unwrap();
            assert_eq!(request.effective_resolution(), Resolution::FullHd, "{:?}", ratio);
        }
    }

    #[test]
    fn test_empty_prompt_requires_image() {
        let err = JobRequest::builder("   ").build().unwrap_err();
        assert!(matches!(err, JobError::InvalidRequest(_)));

        let ok = JobRequest::builder("")
            .image(SourceImage::new(vec![1, 2, 3], "image/png"))
            .build();
        assert!(ok.is_ok());
    }

    #[test]
    fn test_empty_image_rejected() {
        let err = JobRequest::builder("x")
            .image(SourceImage::new(Vec::new(), "image/png"))
            .build()
            .unwrap_err();
        assert!(matches!(err, JobError::InvalidRequest(_)));
    }

    #[test]
    fn test_sanitized_resets_config_only() {
        let request = JobRequest::builder("sunset")
            .image(SourceImage::new(vec![9], "image/jpeg"))
            .aspect_ratio(AspectRatio::Square)
            .resolution(Resolution::FullHd)
            .negative_prompt("blurry")
            .seed(42)
            .person_generation(PersonGeneration::DontAllow)
            .sample_count(2)
            .build()
            .unwrap();
        assert!(!request.is_sanitized());

        let safe = request.sanitized();
        assert_eq!(safe.prompt(), "sunset");
        assert!(safe.source_image().is_some());
        assert_eq!(safe.aspect_ratio(), AspectRatio::Landscape);
        assert_eq!(safe.effective_resolution(), Resolution::Hd);
        assert_eq!(safe.negative_prompt(), None);
        assert_eq!(safe.seed(), None);
        assert_eq!(safe.person_generation(), Some(PersonGeneration::DontAllow));
        assert_eq!(safe.sample_count(), 2);
        assert!(safe.is_sanitized());
    }

    #[test]
    fn test_default_request_is_already_sanitized() {
        let request = JobRequest::builder("plain").build().unwrap();
        assert!(request.is_sanitized());
    }

    #[test]
    fn test_blank_negative_prompt_cleared() {
        let request = JobRequest::builder("x").negative_prompt("  ").build().unwrap();
        assert_eq!(request.negative_prompt(), None);
    }

    #[test]
    fn test_sample_count_clamped() {
        let zero = JobRequest::builder("x").sample_count(0).build().unwrap();
        assert_eq!(zero.sample_count(), 1);
        let many = JobRequest::builder("x").sample_count(10).build().unwrap();
        assert_eq!(many.sample_count(), MAX_SAMPLE_COUNT);
    }

    #[test]
    fn test_parse_seed() {
        assert_eq!(parse_seed("").unwrap(), None);
        assert_eq!(parse_seed("  0 ").unwrap(), None);
        assert_eq!(parse_seed("1234").unwrap(), Some(1234));
        assert!(parse_seed("-5").is_err());
        assert!(parse_seed("abc").is_err());
    }

    #[test]
    fn test_prompts_from_lines() {
        let prompts = prompts_from_lines("a cat\n\n  a dog  \n\t\nbird");
        assert_eq!(prompts, vec!["a cat", "a dog", "bird"]);
    }

    #[test]
    fn test_enum_wire_strings() {
        assert_eq!(serde_json::to_string(&AspectRatio::Portrait).unwrap(), "\"9:16\"");
        assert_eq!(serde_json::to_string(&Resolution::FullHd).unwrap(), "\"1080p\"");
        assert_eq!(
            serde_json::to_string(&PersonGeneration::AllowAdult).unwrap(),
            "\"allow_adult\""
        );
        assert_eq!(AspectRatio::parse("3:4"), Some(AspectRatio::ClassicPortrait));
        assert_eq!(Resolution::parse("4k"), None);
        assert_eq!(PersonGeneration::parse("dont_allow"), Some(PersonGeneration::DontAllow));
    }

    #[test]
    fn test_config_serialization_omits_unset() {
        let config = JobRequest::builder("x").build().unwrap().config();
        let json = serde_json::to_value(&config).unwrap();
        assert!(json.get("seed").is_none());
        assert!(json.get("negative_prompt").is_none());
        assert_eq!(json["aspect_ratio"], "16:9");
    }

    #[test]
    fn test_source_image_debug_hides_bytes() {
        let image = SourceImage::new(vec![0; 2048], "image/png");
        let dbg = format!("{:?}", image);
        assert!(dbg.contains("<2048 bytes>"));
    }

    #[tokio::test]
    async fn test_load_rejects_unknown_extension() {
        let err = SourceImage::load(Path::new("frame.gif")).await.unwrap_err();
        assert!(matches!(err, JobError::InvalidRequest(_)));
    }

    #[tokio::test]
    async fn test_load_png() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("frame.PNG");
        std::fs::write(&path, [137, 80, 78, 71]).unwrap();
        let image = SourceImage::load(&path).await.unwrap();
        assert_eq!(image.mime_type, "image/png");
        assert_eq!(image.bytes.len(), 4);
    }
}
