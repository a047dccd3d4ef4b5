//! Opaque image payloads for `analyze_image`.
//!
//! Callers hand over either raw bytes or a base64 string (optionally a
//! `data:<mime>;base64,` URL, as browsers produce).

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

const DEFAULT_MIME: &str = "image/jpeg";

/// An image as received from the caller.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "data", rename_all = "snake_case")]
pub enum ImageData {
    Bytes(Vec<u8>),
    Base64(String),
}

/// A decoded image with its best-guess MIME type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodedImage {
    pub mime_type: String,
    pub bytes: Vec<u8>,
}

impl DecodedImage {
    /// Base64 encoding of the bytes, for inline upload.
    pub fn to_base64(&self) -> String {
        STANDARD.encode(&self.bytes)
    }
}

impl ImageData {
    pub fn from_bytes(bytes: impl Into<Vec<u8>>) -> Self {
        Self::Bytes(bytes.into())
    }

    pub fn from_base64(encoded: impl Into<String>) -> Self {
        Self::Base64(encoded.into())
    }

    /// Decode the payload, detecting the MIME type from a data URL prefix
    /// or the file signature.
    pub fn decode(&self) -> Result<DecodedImage> {
        match self {
            Self::Bytes(bytes) => {
                if bytes.is_empty() {
                    return Err(Error::InvalidImage("empty payload".to_string()));
                }
                Ok(DecodedImage {
                    mime_type: sniff_mime(bytes).to_string(),
                    bytes: bytes.clone(),
                })
            }
            Self::Base64(encoded) => {
                let (declared_mime, payload) = split_data_url(encoded.trim());
                let cleaned: String = payload.chars().filter(|c| !c.is_whitespace()).collect();
                if cleaned.is_empty() {
                    return Err(Error::InvalidImage("empty payload".to_string()));
                }
                let bytes = STANDARD
                    .decode(cleaned.as_bytes())
                    .map_err(|e| Error::InvalidImage(e.to_string()))?;
                let mime_type = declared_mime
                    .map(str::to_string)
                    .unwrap_or_else(|| sniff_mime(&bytes).to_string());
                Ok(DecodedImage { mime_type, bytes })
            }
        }
    }
}

/// Split `data:image/png;base64,AAAA` into its MIME type and payload.
fn split_data_url(input: &str) -> (Option<&str>, &str) {
    let Some(rest) = input.strip_prefix("data:") else {
        return (None, input);
    };
    match rest.split_once(',') {
        Some((header, payload)) => {
            let mime = header
                .split(';')
                .next()
                .filter(|m| !m.is_empty());
            (mime, payload)
        }
        None => (None, input),
    }
}

fn sniff_mime(bytes: &[u8]) -> &'static str {
    if bytes.starts_with(&[0x89, b'P', b'N', b'G']) {
        "image/png"
    } else if bytes.starts_with(&[0xFF, 0xD8, 0xFF]) {
        "image/jpeg"
    } else if bytes.starts_with(b"GIF8") {
        "image/gif"
    } else if bytes.len() >= 12 && &bytes[..4] == b"RIFF" && &bytes[8..12] == b"WEBP" {
        "image/webp"
    } else {
        DEFAULT_MIME
    }
}
