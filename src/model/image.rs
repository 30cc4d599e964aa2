//! Encoded image payloads pulled out of image XObjects.

use serde::{Deserialize, Serialize};

/// Encoded bytes of an embedded image, ready to hash and write to disk.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImageData {
    /// Encoded bytes (JPEG, JPEG 2000, PNG, or the raw stream as a last resort)
    #[serde(skip_serializing)]
    pub bytes: Vec<u8>,

    /// MIME type of `bytes`
    pub mime_type: String,

    /// Width in pixels
    pub width: u32,

    /// Height in pixels
    pub height: u32,
}

impl ImageData {
    /// Create image data, sniffing the MIME type from the bytes.
    pub fn new(bytes: Vec<u8>, width: u32, height: u32) -> Self {
        let mime_type = Self::detect_mime_type(&bytes)
            .unwrap_or("application/octet-stream")
            .to_string();
        Self {
            bytes,
            mime_type,
            width,
            height,
        }
    }

    /// Number of encoded bytes.
    pub fn size(&self) -> usize {
        self.bytes.len()
    }

    /// Whether the bytes are a format image viewers understand.
    pub fn is_encoded(&self) -> bool {
        self.mime_type != "application/octet-stream"
    }

    /// Native file extension for the encoded bytes.
    ///
    /// Exported assets always use the `.png` name from the naming grammar;
    /// this only tells callers what the payload actually is.
    pub fn extension(&self) -> &str {
        match self.mime_type.as_str() {
            "image/jpeg" => "jpg",
            "image/png" => "png",
            "image/jp2" => "jp2",
            "image/tiff" => "tiff",
            _ => "raw",
        }
    }

    /// Detect MIME type from magic bytes.
    pub fn detect_mime_type(data: &[u8]) -> Option<&'static str> {
        if data.starts_with(&[0xFF, 0xD8, 0xFF]) {
            return Some("image/jpeg");
        }
        if data.starts_with(&[0x89, 0x50, 0x4E, 0x47, 0x0D, 0x0A, 0x1A, 0x0A]) {
            return Some("image/png");
        }
        // JP2 container signature box, then bare codestream
        if data.starts_with(&[0x00, 0x00, 0x00, 0x0C, 0x6A, 0x50, 0x20, 0x20])
            || data.starts_with(&[0xFF, 0x4F, 0xFF, 0x51])
        {
            return Some("image/jp2");
        }
        if data.starts_with(&[0x49, 0x49, 0x2A, 0x00]) || data.starts_with(&[0x4D, 0x4D, 0x00, 0x2A])
        {
            return Some("image/tiff");
        }
        None
    }
}
