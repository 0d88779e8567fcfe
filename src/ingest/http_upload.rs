use axum::extract::multipart::{Field, MultipartError};
use axum::extract::Multipart;
use axum::http::StatusCode;
use tracing::{debug, info};

use crate::core::config::IngestConfig;
use crate::core::error::UploadError;
use crate::core::types::{normalize_media_type, StoredVideo};
use crate::storage::disk::DiskVideoSlot;

// ---------------------------------------------------------------------------
// Upload handler
// ---------------------------------------------------------------------------

/// Receives a multipart upload into the latest slot.
///
/// Processing flow:
/// 1. Walk the multipart fields, skipping any not named `field_name`
/// 2. Check the declared media type against `accepted_media_prefix`
/// 3. Stream the field body into a slot writer, enforcing the size ceiling
/// 4. Commit (replace the slot) or abort on any failure
pub struct HttpUploadHandler<'a> {
    config: &'a IngestConfig,
    slot: &'a DiskVideoSlot,
}

impl<'a> HttpUploadHandler<'a> {
    pub fn new(config: &'a IngestConfig, slot: &'a DiskVideoSlot) -> Self {
        Self { config, slot }
    }

    pub async fn receive(&self, mut multipart: Multipart) -> Result<StoredVideo, UploadError> {
        while let Some(field) = multipart
            .next_field()
            .await
            .map_err(|e| self.multipart_error(e))?
        {
            if field.name() != Some(self.config.field_name.as_str()) {
                debug!(field = ?field.name(), "skipping unrelated multipart field");
                continue;
            }

            let media_type = field
                .content_type()
                .map(normalize_media_type)
                .unwrap_or_default();
            validate_media_type(&media_type, &self.config.accepted_media_prefix)?;

            let stored = self.store_field(field).await?;
            info!(
                path = %stored.path.display(),
                size_bytes = stored.size_bytes,
                %media_type,
                "video stored in latest slot"
            );
            return Ok(stored);
        }

        Err(UploadError::MissingField {
            field: self.config.field_name.clone(),
        })
    }

    async fn store_field(&self, mut field: Field<'_>) -> Result<StoredVideo, UploadError> {
        let max_bytes = self.config.max_upload_size_bytes;
        let mut writer = self.slot.begin_write().await?;

        loop {
            let chunk = match field.chunk().await {
                Ok(Some(chunk)) => chunk,
                Ok(None) => break,
                Err(e) => {
                    writer.abort().await;
                    return Err(self.multipart_error(e));
                }
            };

            if writer.bytes_written() + chunk.len() as u64 > max_bytes {
                writer.abort().await;
                return Err(UploadError::UploadTooLarge { max_bytes });
            }

            if let Err(e) = writer.write_chunk(&chunk).await {
                writer.abort().await;
                return Err(e.into());
            }
        }

        Ok(writer.commit().await?)
    }

    /// Body-limit hits surface from the multipart parser as 413s.
    fn multipart_error(&self, err: MultipartError) -> UploadError {
        if err.status() == StatusCode::PAYLOAD_TOO_LARGE {
            UploadError::UploadTooLarge {
                max_bytes: self.config.max_upload_size_bytes,
            }
        } else {
            UploadError::Multipart {
                reason: err.body_text(),
            }
        }
    }
}

/// Check a normalized media type against the accepted category prefix.
pub fn validate_media_type(media_type: &str, accepted_prefix: &str) -> Result<(), UploadError> {
    let prefix = accepted_prefix.to_ascii_lowercase();
    if media_type.len() > prefix.len() && media_type.starts_with(&prefix) {
        Ok(())
    } else {
        Err(UploadError::UnsupportedMediaType {
            media_type: if media_type.is_empty() {
                "none".to_string()
            } else {
                media_type.to_string()
            },
            accepted: accepted_prefix.to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_accepts_video_types() {
        assert!(validate_media_type("video/mp4", "video/").is_ok());
        assert!(validate_media_type("video/webm", "video/").is_ok());
        assert!(validate_media_type("video/quicktime", "Video/").is_ok());
    }

    #[test]
    fn test_rejects_other_types() {
        assert!(matches!(
            validate_media_type("text/plain", "video/"),
            Err(UploadError::UnsupportedMediaType { .. })
        ));
        assert!(validate_media_type("application/octet-stream", "video/").is_err());
        assert!(validate_media_type("videos/mp4", "video/").is_err());
    }

    #[test]
    fn test_rejects_bare_prefix_and_missing_type() {
        assert!(validate_media_type("video/", "video/").is_err());
        let err = validate_media_type("", "video/").unwrap_err();
        assert!(err.to_string().contains("none"));
    }
}
