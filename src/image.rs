//! Image references carried by user turns.
//!
//! A reference is either a data URL produced from a locally-read file or a
//! remote `http(s)` URL. The server resolves either form to raw bytes before
//! attaching them inline to the generation request.

use std::fs;
use std::path::Path;

use base64::{engine::general_purpose::STANDARD, Engine as _};
use reqwest::Client;

use crate::chat::ImageMime;
use crate::error::ChatError;

/// MIME types accepted for uploaded images.
pub const ALLOWED_UPLOAD_TYPES: [&str; 4] = ["image/png", "image/jpeg", "image/jpg", "image/webp"];

pub const INVALID_FILE_TYPE_MESSAGE: &str =
    "Invalid file type. Only PNG, JPEG, JPG, and WEBP are allowed.";

/// A parsed image reference.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ImageReference {
    /// Decoded payload of an inline `data:` URL. The declared MIME type is
    /// not kept since Gemini always receives the image as JPEG.
    Data(Vec<u8>),
    /// Remote URL to fetch
    Remote(String),
}

impl ImageReference {
    /// Classifies and, for data URLs, decodes an image reference.
    pub fn parse(url: &str) -> Result<Self, ChatError> {
        let trimmed = url.trim();
        if let Some(rest) = trimmed.strip_prefix("data:") {
            let (meta, payload) = rest
                .split_once(',')
                .ok_or_else(|| ChatError::ImageError("data URL has no payload".into()))?;
            if !meta.split(';').skip(1).any(|p| p.eq_ignore_ascii_case("base64")) {
                return Err(ChatError::ImageError(
                    "only base64 data URLs are supported".into(),
                ));
            }
            let bytes = STANDARD
                .decode(payload.trim())
                .map_err(|e| ChatError::ImageError(format!("invalid base64 payload: {}", e)))?;
            return Ok(ImageReference::Data(bytes));
        }

        let lower = trimmed.to_ascii_lowercase();
        if lower.starts_with("http://") || lower.starts_with("https://") {
            Ok(ImageReference::Remote(trimmed.to_string()))
        } else {
            Err(ChatError::ImageError(format!(
                "unsupported image reference: {}",
                truncate(trimmed, 32)
            )))
        }
    }
}

/// Resolves an image reference to raw bytes, fetching remote URLs with `client`.
///
/// Every failure is reported as [`ChatError::ImageError`].
pub async fn load_image(client: &Client, url: &str) -> Result<Vec<u8>, ChatError> {
    match ImageReference::parse(url)? {
        ImageReference::Data(bytes) => Ok(bytes),
        ImageReference::Remote(url) => {
            log::debug!("fetching image from {}", url);
            let resp = client
                .get(&url)
                .send()
                .await
                .map_err(|e| ChatError::ImageError(e.to_string()))?;
            if !resp.status().is_success() {
                return Err(ChatError::ImageError(format!(
                    "Failed to fetch image: HTTP {}",
                    resp.status()
                )));
            }
            let bytes = resp
                .bytes()
                .await
                .map_err(|e| ChatError::ImageError(e.to_string()))?;
            Ok(bytes.to_vec())
        }
    }
}

/// Detects the MIME type of an image from its binary data
pub fn detect_image_mime(data: &[u8]) -> Option<ImageMime> {
    if data.starts_with(&[0xFF, 0xD8, 0xFF]) {
        Some(ImageMime::JPEG)
    } else if data.starts_with(&[0x89, 0x50, 0x4E, 0x47]) {
        Some(ImageMime::PNG)
    } else if data.starts_with(&[0x47, 0x49, 0x46]) {
        Some(ImageMime::GIF)
    } else if data.len() >= 12 && &data[0..4] == b"RIFF" && &data[8..12] == b"WEBP" {
        Some(ImageMime::WEBP)
    } else {
        None
    }
}

fn mime_from_extension(path: &Path) -> Option<&'static str> {
    let ext = path.extension()?.to_str()?.to_ascii_lowercase();
    match ext.as_str() {
        "png" => Some("image/png"),
        "jpg" => Some("image/jpg"),
        "jpeg" => Some("image/jpeg"),
        "webp" => Some("image/webp"),
        "gif" => Some("image/gif"),
        "bmp" => Some("image/bmp"),
        "svg" => Some("image/svg+xml"),
        _ => None,
    }
}

/// Encodes raw bytes as a `data:` URL.
pub fn to_data_url(mime: &str, bytes: &[u8]) -> String {
    format!("data:{};base64,{}", mime, STANDARD.encode(bytes))
}

/// Reads a local image file into a data URL.
///
/// The type is taken from the file extension, falling back to the leading
/// bytes; anything outside [`ALLOWED_UPLOAD_TYPES`] is refused.
pub fn read_image_file(path: &Path) -> Result<String, ChatError> {
    let ext_mime = mime_from_extension(path);
    if let Some(mime) = ext_mime {
        if !ALLOWED_UPLOAD_TYPES.contains(&mime) {
            return Err(ChatError::InvalidRequest(INVALID_FILE_TYPE_MESSAGE.into()));
        }
    }

    let bytes = fs::read(path).map_err(|e| {
        ChatError::InvalidRequest(format!("Failed to read {}: {}", path.display(), e))
    })?;

    let mime = match ext_mime {
        Some(mime) => mime,
        None => detect_image_mime(&bytes)
            .map(|m| m.mime_type())
            .filter(|m| ALLOWED_UPLOAD_TYPES.contains(m))
            .ok_or_else(|| ChatError::InvalidRequest(INVALID_FILE_TYPE_MESSAGE.into()))?,
    };

    Ok(to_data_url(mime, &bytes))
}

fn truncate(s: &str, max: usize) -> &str {
    match s.char_indices().nth(max) {
        Some((idx, _)) => &s[..idx],
        None => s,
    }
}
