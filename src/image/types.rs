//! Core types for image transformation.

use crate::error::{RetouchError, Result};
use crate::image::encoder::strip_data_url_prefix;
use base64::Engine;
use std::path::Path;
use std::time::{SystemTime, UNIX_EPOCH};

/// Image formats recognised when inferring a file's MIME type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ImageFormat {
    /// PNG format (lossless).
    #[default]
    Png,
    /// JPEG format (lossy).
    Jpeg,
    /// WebP format (modern, efficient).
    WebP,
}

impl ImageFormat {
    /// Returns the file extension for this format.
    pub fn extension(&self) -> &'static str {
        match self {
            Self::Png => "png",
            Self::Jpeg => "jpg",
            Self::WebP => "webp",
        }
    }

    /// Returns the MIME type for this format.
    pub fn mime_type(&self) -> &'static str {
        match self {
            Self::Png => "image/png",
            Self::Jpeg => "image/jpeg",
            Self::WebP => "image/webp",
        }
    }

    /// Attempts to detect format from file extension.
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.to_lowercase().as_str() {
            "png" => Some(Self::Png),
            "jpg" | "jpeg" => Some(Self::Jpeg),
            "webp" => Some(Self::WebP),
            _ => None,
        }
    }

    /// Detects image format from magic bytes.
    pub fn from_magic_bytes(data: &[u8]) -> Option<Self> {
        if data.len() < 12 {
            return None;
        }

        // PNG: 89 50 4E 47 0D 0A 1A 0A
        if data.starts_with(&[0x89, 0x50, 0x4E, 0x47, 0x0D, 0x0A, 0x1A, 0x0A]) {
            return Some(Self::Png);
        }

        // JPEG: FF D8 FF
        if data.starts_with(&[0xFF, 0xD8, 0xFF]) {
            return Some(Self::Jpeg);
        }

        // WebP: RIFF....WEBP
        if data.starts_with(b"RIFF") && &data[8..12] == b"WEBP" {
            return Some(Self::WebP);
        }

        None
    }
}

/// An image ready for transmission: raw base64 payload plus its MIME type.
///
/// Immutable once built. The payload never carries a data-URL prefix.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncodedImage {
    data: String,
    mime_type: String,
}

impl EncodedImage {
    /// Encodes raw bytes.
    ///
    /// Fails with [`RetouchError::InvalidInput`] if `mime_type` is not an `image/*` type.
    pub fn from_bytes(bytes: &[u8], mime_type: impl Into<String>) -> Result<Self> {
        let mime_type = check_image_mime(mime_type.into())?;
        Ok(Self {
            data: base64::engine::general_purpose::STANDARD.encode(bytes),
            mime_type,
        })
    }

    /// Wraps an existing base64 payload, given either raw or as a data URL.
    ///
    /// A `data:image/(png|jpeg|jpg|webp);base64,` prefix is stripped; the
    /// remainder must be valid standard base64.
    pub fn from_base64(data: &str, mime_type: impl Into<String>) -> Result<Self> {
        let mime_type = check_image_mime(mime_type.into())?;
        let data = strip_data_url_prefix(data.trim());
        base64::engine::general_purpose::STANDARD
            .decode(data)
            .map_err(|e| RetouchError::InvalidInput(format!("invalid base64 image data: {e}")))?;
        Ok(Self {
            data: data.to_string(),
            mime_type,
        })
    }

    /// The raw base64 payload.
    pub fn data(&self) -> &str {
        &self.data
    }

    /// The declared MIME type, e.g. `image/png`.
    pub fn mime_type(&self) -> &str {
        &self.mime_type
    }

    /// Returns true if there is no payload.
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Decodes the payload back into bytes.
    pub fn decode(&self) -> Result<Vec<u8>> {
        base64::engine::general_purpose::STANDARD
            .decode(&self.data)
            .map_err(|e| RetouchError::InvalidInput(format!("invalid base64 image data: {e}")))
    }
}

fn check_image_mime(mime_type: String) -> Result<String> {
    if mime_type.starts_with("image/") {
        Ok(mime_type)
    } else {
        Err(RetouchError::InvalidInput(format!(
            "not an image file (type: {mime_type})"
        )))
    }
}

/// An image plus the edit instruction to apply to it.
#[derive(Debug, Clone)]
pub struct TransformationRequest {
    /// The image to transform.
    pub image: EncodedImage,
    /// Natural-language edit instruction.
    pub prompt: String,
}

impl TransformationRequest {
    /// Creates a new request. Call [`validate`](Self::validate) before dispatch.
    pub fn new(image: EncodedImage, prompt: impl Into<String>) -> Self {
        Self {
            image,
            prompt: prompt.into(),
        }
    }

    /// Checks the dispatch guard: a non-blank prompt and a non-empty image.
    pub fn validate(&self) -> Result<()> {
        if self.prompt.trim().is_empty() {
            return Err(RetouchError::InvalidInput(
                "prompt must not be empty".into(),
            ));
        }
        if self.image.is_empty() {
            return Err(RetouchError::InvalidInput(
                "image data must not be empty".into(),
            ));
        }
        Ok(())
    }
}

/// A transformed image, held as a `data:image/png;base64,...` URL.
#[derive(Debug, Clone, PartialEq, Eq)]
#[must_use = "transformed image should be saved or displayed"]
pub struct TransformedImage {
    data_url: String,
}

impl TransformedImage {
    const PREFIX: &'static str = "data:image/png;base64,";

    /// Wraps a base64 payload returned by the model. The payload is labelled PNG.
    pub fn from_png_base64(payload: &str) -> Self {
        Self {
            data_url: format!("{}{}", Self::PREFIX, payload),
        }
    }

    /// The full data URL.
    pub fn data_url(&self) -> &str {
        &self.data_url
    }

    /// The base64 payload without its prefix.
    pub fn payload(&self) -> &str {
        &self.data_url[Self::PREFIX.len()..]
    }

    /// Decodes the payload into image bytes.
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        base64::engine::general_purpose::STANDARD
            .decode(self.payload())
            .map_err(|e| RetouchError::transformation(format!("failed to decode image data: {e}")))
    }

    /// Decodes and writes the image to `path`.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        std::fs::write(path, self.to_bytes()?)?;
        Ok(())
    }

    /// Filename proposed for a download made at `timestamp_ms`.
    pub fn suggested_filename(timestamp_ms: u128) -> String {
        format!("ai-generated-{timestamp_ms}.png")
    }

    /// Filename proposed for a download made now.
    pub fn default_filename() -> String {
        let now = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default()
            .as_millis();
        Self::suggested_filename(now)
    }
}

impl std::fmt::Display for TransformedImage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.data_url)
    }
}
