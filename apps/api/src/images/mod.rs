//! Image sources and their encoded form.
//!
//! Three heterogeneous sources feed one generation run: files uploaded by
//! the inspector (spooled to disk for the session), raw image URLs, and
//! items picked from the external photo library. The aggregator merges all
//! three into the ordered base64 payload the generation endpoint expects.

pub mod aggregator;
pub mod handlers;
pub mod share_link;

use std::path::PathBuf;

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use serde::{Deserialize, Serialize};

/// An uploaded file held in the session spool directory.
/// The bytes are re-read from disk at submission time, not cached.
#[derive(Debug, Clone)]
pub struct LocalImage {
    pub file_name: String,
    pub mime_type: String,
    pub path: PathBuf,
}

/// An image chosen from the external photo library, referenced by an opaque
/// id and a base URL for later full-resolution retrieval.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PickedMedia {
    pub id: String,
    pub base_url: String,
    #[serde(default)]
    pub filename: String,
}

/// An image encoded as base64 text paired with its mime type, suitable for
/// embedding directly in a generation request body. Derived, never mutated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EncodedImage {
    pub data: String,
    pub mime_type: String,
}

impl EncodedImage {
    pub fn from_bytes(bytes: &[u8], mime_type: &str) -> Self {
        EncodedImage {
            data: BASE64.encode(bytes),
            mime_type: mime_type.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_bytes_encodes_standard_base64() {
        let encoded = EncodedImage::from_bytes(b"hello", "image/png");
        assert_eq!(encoded.data, "aGVsbG8=");
        assert_eq!(encoded.mime_type, "image/png");
    }
}
