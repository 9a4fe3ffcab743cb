use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};
use image::{codecs::jpeg::JpegEncoder, ImageResult, RgbImage};
use serde::{Deserialize, Serialize};

pub const JPEG_MIME: &str = "image/jpeg";
/// Quality used for every snapshot (0.85 on the 0..1 scale).
pub const JPEG_QUALITY: u8 = 85;

/// A single encoded still, kept as a `data:image/...;base64,` URI.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CapturedImage {
    data_uri: String,
}

impl CapturedImage {
    pub fn from_data_uri(data_uri: impl Into<String>) -> Self {
        Self {
            data_uri: data_uri.into(),
        }
    }

    pub fn from_bytes(mime_type: &str, bytes: &[u8]) -> Self {
        Self::from_data_uri(format!("data:{mime_type};base64,{}", BASE64.encode(bytes)))
    }

    pub fn encode_jpeg(frame: &RgbImage, quality: u8) -> ImageResult<Self> {
        let mut bytes = Vec::new();
        JpegEncoder::new_with_quality(&mut bytes, quality).encode_image(frame)?;
        Ok(Self::from_bytes(JPEG_MIME, &bytes))
    }

    pub fn as_data_uri(&self) -> &str {
        &self.data_uri
    }

    /// MIME type named by the URI prefix; bare payloads are assumed to be JPEG.
    pub fn mime_type(&self) -> &str {
        split_data_uri(&self.data_uri)
            .map(|(mime, _)| mime)
            .unwrap_or(JPEG_MIME)
    }

    pub fn base64_payload(&self) -> &str {
        strip_data_uri_prefix(&self.data_uri)
    }

    pub fn decode_bytes(&self) -> Result<Vec<u8>, base64::DecodeError> {
        BASE64.decode(self.base64_payload())
    }
}

/// Drops a leading `data:image/<subtype>;base64,` if there is one.
pub fn strip_data_uri_prefix(encoded: &str) -> &str {
    split_data_uri(encoded)
        .map(|(_, payload)| payload)
        .unwrap_or(encoded)
}

fn split_data_uri(encoded: &str) -> Option<(&str, &str)> {
    let rest = encoded.strip_prefix("data:")?;
    let (mime, payload) = rest.split_once(";base64,")?;
    let subtype = mime.strip_prefix("image/")?;
    let word_chars = subtype
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '_');
    if subtype.is_empty() || !word_chars {
        return None;
    }
    Some((mime, payload))
}
