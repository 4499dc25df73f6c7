//! Image staging, validation and URL resolution.

use base64::engine::general_purpose::STANDARD;
use base64::Engine;

use crate::error::ServiceError;

/// Accepted MIME types for uploaded images.
pub const ALLOWED_MIME_TYPES: &[&str] = &["image/jpeg", "image/jpg", "image/png", "image/webp"];

/// Per-file upload ceiling.
pub const MAX_IMAGE_BYTES: usize = 5 * 1024 * 1024;

/// A file selected in a form but not yet uploaded.
#[derive(Debug, Clone, PartialEq)]
pub struct StagedImage {
    pub file_name: String,
    pub mime_type: String,
    pub bytes: Vec<u8>,
}

impl StagedImage {
    pub fn new(file_name: impl Into<String>, mime_type: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            file_name: file_name.into(),
            mime_type: mime_type.into(),
            bytes,
        }
    }

    /// Checks MIME type and size. Count limits are the caller's concern.
    pub fn validate(&self) -> Result<(), ServiceError> {
        let mime = self.mime_type.to_ascii_lowercase();
        if !ALLOWED_MIME_TYPES.contains(&mime.as_str()) {
            return Err(ServiceError::validation(
                "images",
                format!("{} is not an accepted image type (jpeg, png, webp)", self.mime_type),
            ));
        }
        if self.bytes.len() > MAX_IMAGE_BYTES {
            return Err(ServiceError::validation(
                "images",
                format!("{} exceeds the 5 MB limit", self.file_name),
            ));
        }
        Ok(())
    }

    /// Extension used for the stored object name.
    pub fn extension(&self) -> &str {
        match self.file_name.rsplit_once('.') {
            Some((_, ext)) if !ext.is_empty() => ext,
            _ => match self.mime_type.as_str() {
                "image/png" => "png",
                "image/webp" => "webp",
                _ => "jpg",
            },
        }
    }

    /// Local preview shown before upload.
    pub fn preview_url(&self) -> String {
        format!("data:{};base64,{}", self.mime_type, STANDARD.encode(&self.bytes))
    }

    /// `{unix_millis}_{random}.{ext}`; unique enough that concurrent uploads
    /// never collide on a name.
    pub fn object_name(&self) -> String {
        let millis = chrono::Utc::now().timestamp_millis();
        let random = uuid::Uuid::new_v4().simple().to_string();
        format!("{}_{}.{}", millis, &random[..12], self.extension())
    }
}

/// Resolves stored filenames to public URLs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageUrls {
    base: String,
}

impl ImageUrls {
    pub fn new(base: impl Into<String>) -> Self {
        let base = base.into();
        Self {
            base: base.trim_end_matches('/').to_string(),
        }
    }

    pub fn resolve(&self, bucket: &str, path: &str) -> String {
        format!("{}/{}/{}", self.base, bucket, path.trim_start_matches('/'))
    }
}
