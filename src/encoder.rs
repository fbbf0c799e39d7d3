//! Turns an uploaded file into the base64 payload shared by the preview and the API request.

use base64::{engine::general_purpose, Engine as _};
use serde::Serialize;

/// MIME type assumed when neither the upload nor the magic bytes say otherwise.
pub const FALLBACK_MIME_TYPE: &str = "image/png";

/// One uploaded image, base64 encoded without any `data:` prefix.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ImagePayload {
    pub mime_type: String,
    pub data: String,
}

impl ImagePayload {
    pub fn data_url(&self) -> String {
        format!("data:{};base64,{}", self.mime_type, self.data)
    }
}

/// Encodes `bytes` as-is. No type or size checks happen here.
pub fn encode_image(bytes: &[u8], declared_mime: Option<&str>) -> ImagePayload {
    ImagePayload {
        mime_type: resolve_mime_type(bytes, declared_mime),
        data: general_purpose::STANDARD.encode(bytes),
    }
}

fn resolve_mime_type(bytes: &[u8], declared_mime: Option<&str>) -> String {
    if let Some(mime) = declared_mime.map(str::trim) {
        if mime.starts_with("image/") {
            return mime.to_string();
        }
    }

    image::guess_format(bytes)
        .map(|format| format.to_mime_type().to_string())
        .unwrap_or_else(|_| FALLBACK_MIME_TYPE.to_string())
}
