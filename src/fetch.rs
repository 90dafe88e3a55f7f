use std::path::{Path, PathBuf};

use crate::error::{JobError, Result};
use crate::provider::MediaProvider;
use crate::types::MediaRef;

/// Downloads the bytes behind finished jobs' media references.
///
/// Fetching never touches the local filesystem; use [`persist_media`] for
/// that as a separate step.
#[derive(Debug, Clone)]
pub struct MediaFetcher<P> {
    provider: P,
}

/// The outcome of fetching one media item.
///
/// Each item carries its own result so one failed download does not
/// invalidate its siblings.
#[derive(Debug)]
pub struct FetchedMedia {
    pub index: usize,
    pub reference: MediaRef,
    pub result: Result<Vec<u8>>,
}

impl FetchedMedia {
    pub fn bytes(&self) -> Option<&[u8]> {
        self.result.as_deref().ok()
    }

    pub fn is_ok(&self) -> bool {
        self.result.is_ok()
    }

    /// `{stem}_{index}.{ext}`, with the extension taken from the MIME type
    /// (mp4 when unknown).
    pub fn suggested_file_name(&self, stem: &str) -> String {
        let ext = match self.reference.mime_type.as_deref() {
            Some("video/webm") => "webm",
            Some("video/quicktime") => "mov",
            Some("image/png") => "png",
            Some("image/jpeg") => "jpg",
            _ => "mp4",
        };
        format!("{}_{}.{}", sanitize_stem(stem), self.index, ext)
    }
}

fn sanitize_stem(stem: &str) -> String {
    let cleaned: String = stem
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '-' || c == '_' { c } else { '_' })
        .collect();
    if cleaned.is_empty() {
        "video".to_string()
    } else {
        cleaned
    }
}

impl<P: MediaProvider> MediaFetcher<P> {
    pub fn new(provider: P) -> Self {
        Self { provider }
    }

    /// Download one media item.
    pub async fn fetch(&self, media: &MediaRef) -> Result<Vec<u8>> {
        let result = self.provider.download(media).await;
        result.map_err(|source| JobError::Fetch {
            uri: media.uri.clone(),
            source,
        })
    }

    /// Download every item in order, keeping per-item failures.
    pub async fn fetch_all(&self, media: &[MediaRef]) -> Vec<FetchedMedia> {
        let mut fetched = Vec::with_capacity(media.len());
        for (index, reference) in media.iter().enumerate() {
            let result = self.fetch(reference).await;
            match &result {
                Ok(bytes) => tracing::debug!(uri = %reference.uri, size = bytes.len(), "media fetched"),
                Err(e) => tracing::warn!(uri = %reference.uri, "media fetch failed: {}", e),
            }
            fetched.push(FetchedMedia {
                index,
                reference: reference.clone(),
                result,
            });
        }
        fetched
    }
}

/// Write fetched bytes to `dir/file_name`, creating `dir` if needed.
pub async fn persist_media(dir: &Path, file_name: &str, bytes: &[u8]) -> Result<PathBuf> {
    let path = dir.join(file_name);
    tokio::fs::create_dir_all(dir)
        .await
        .map_err(|source| JobError::Persist {
            path: dir.to_path_buf(),
            source,
        })?;
    tokio::fs::write(&path, bytes)
        .await
        .map_err(|source| JobError::Persist {
            path: path.clone(),
            source,
        })?;
    tracing::debug!(path = %path.display(), size = bytes.len(), "media persisted");
    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_suggested_file_name() {
        let item = FetchedMedia {
            index: 2,
            reference: MediaRef::new("files/a").with_mime_type("video/webm"),
            result: Ok(vec![1]),
        };
        assert_eq!(item.suggested_file_name("cat on skateboard"), "cat_on_skateboard_2.webm");
        assert_eq!(item.bytes(), Some(&[1u8][..]));

        let plain = FetchedMedia {
            index: 0,
            reference: MediaRef::new("files/b"),
            result: Ok(Vec::new()),
        };
        assert_eq!(plain.suggested_file_name(""), "video_0.mp4");
    }

    #[tokio::test]
    async fn test_persist_creates_directory() {
        let temp = tempfile::tempdir().unwrap();
        let dir = temp.path().join("nested").join("out");
        let path = persist_media(&dir, "clip_0.mp4", b"bytes").await.unwrap();
        assert_eq!(path, dir.join("clip_0.mp4"));
        assert_eq!(std::fs::read(&path).unwrap(), b"bytes");
    }

    #[tokio::test]
    async fn test_persist_reports_path_on_failure() {
        let temp = tempfile::tempdir().unwrap();
        let blocker = temp.path().join("file");
        std::fs::write(&blocker, b"x").unwrap();

        let err = persist_media(&blocker, "clip.mp4", b"bytes").await.unwrap_err();
        assert!(matches!(err, JobError::Persist { .. }));
    }
}
