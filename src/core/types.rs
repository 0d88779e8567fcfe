use serde::Serialize;
use std::path::PathBuf;

// ---------------------------------------------------------------------------
// Stored video
// ---------------------------------------------------------------------------

/// The single video held in the latest slot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredVideo {
    pub path: PathBuf,
    pub size_bytes: u64,
}

impl StoredVideo {
    /// File name of the slot, as reported to uploaders.
    pub fn file_name(&self) -> String {
        self.path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default()
    }
}

// ---------------------------------------------------------------------------
// Upload API types
// ---------------------------------------------------------------------------

/// Successful upload response.
#[derive(Debug, Clone, Serialize)]
pub struct UploadResponse {
    pub message: String,
    pub filename: String,
    pub size: u64,
}

impl From<&StoredVideo> for UploadResponse {
    fn from(video: &StoredVideo) -> Self {
        Self {
            message: "Video uploaded successfully".to_string(),
            filename: video.file_name(),
            size: video.size_bytes,
        }
    }
}

// ---------------------------------------------------------------------------
// Media type helpers
// ---------------------------------------------------------------------------

/// Strip MIME parameters and lowercase ("Video/MP4; codecs=avc1" -> "video/mp4").
pub fn normalize_media_type(media_type: &str) -> String {
    media_type
        .split(';')
        .next()
        .unwrap_or(media_type)
        .trim()
        .to_ascii_lowercase()
}

/// Determine content type from file extension.
pub fn content_type_for_path(path: &str) -> &'static str {
    let lower = path.to_ascii_lowercase();
    if lower.ends_with(".mp4") || lower.ends_with(".m4v") {
        "video/mp4"
    } else if lower.ends_with(".webm") {
        "video/webm"
    } else if lower.ends_with(".mov") {
        "video/quicktime"
    } else if lower.ends_with(".mkv") {
        "video/x-matroska"
    } else {
        "application/octet-stream"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_media_type() {
        assert_eq!(normalize_media_type("video/mp4"), "video/mp4");
        assert_eq!(normalize_media_type("Video/MP4; codecs=avc1"), "video/mp4");
        assert_eq!(normalize_media_type(" text/plain "), "text/plain");
    }

    #[test]
    fn test_content_type_for_path() {
        assert_eq!(content_type_for_path("uploads/latest.mp4"), "video/mp4");
        assert_eq!(content_type_for_path("clip.WEBM"), "video/webm");
        assert_eq!(content_type_for_path("blob"), "application/octet-stream");
    }

    #[test]
    fn test_upload_response_from_stored_video() {
        let video = StoredVideo {
            path: PathBuf::from("uploads/latest.mp4"),
            size_bytes: 10,
        };
        let resp = UploadResponse::from(&video);
        assert_eq!(resp.message, "Video uploaded successfully");
        assert_eq!(resp.filename, "latest.mp4");
        assert_eq!(resp.size, 10);
    }
}
