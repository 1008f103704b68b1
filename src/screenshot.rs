//! Screenshot payload validation.
//!
//! Decodes and size-checks inbound base64 screenshots before they are
//! attached to a summarizer call. Invalid base64 and oversized images are
//! skipped silently; at most `max_images` survive. Decoded bytes are used
//! for validation only and are never persisted.

use base64::engine::general_purpose::STANDARD;
use base64::Engine;

use crate::models::{Screenshot, ScreenshotPayload};

/// Maximum decoded screenshot size in bytes.
const MAX_IMAGE_BYTES: usize = 5 * 1024 * 1024;

/// Validate inbound screenshot payloads, keeping at most `max_images`.
pub fn normalize_screenshots(items: &[ScreenshotPayload], max_images: usize) -> Vec<Screenshot> {
    let mut out = Vec::new();
    for item in items {
        if item.data_base64.is_empty() {
            continue;
        }
        let decoded = match STANDARD.decode(item.data_base64.as_bytes()) {
            Ok(bytes) => bytes,
            Err(_) => continue,
        };
        if decoded.len() > MAX_IMAGE_BYTES {
            continue;
        }
        let mime = if item.mime.trim().is_empty() {
            "image/png".to_string()
        } else {
            item.mime.trim().to_string()
        };
        out.push(Screenshot {
            mime,
            b64: item.data_base64.clone(),
        });
        if out.len() >= max_images {
            break;
        }
    }
    out
}
