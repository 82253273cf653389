//! Image upload constants and client-side validation.
//!
//! Files are checked here before any network call: declared MIME type
//! against the allow-list, byte size against the configured maximum, and
//! the leading magic bytes against the declared type.

use std::sync::Arc;

use crate::error::CoreError;

// ---------------------------------------------------------------------------
// Constants
// ---------------------------------------------------------------------------

pub const MIME_JPEG: &str = "image/jpeg";
pub const MIME_PNG: &str = "image/png";
pub const MIME_GIF: &str = "image/gif";
pub const MIME_WEBP: &str = "image/webp";

/// The only image types the media host is asked to store.
pub const ALLOWED_IMAGE_TYPES: &[&str] = &[MIME_JPEG, MIME_PNG, MIME_GIF, MIME_WEBP];

/// Default maximum upload size (10 MiB).
pub const DEFAULT_MAX_IMAGE_BYTES: u64 = 10 * 1024 * 1024;

// ---------------------------------------------------------------------------
// ImageFile
// ---------------------------------------------------------------------------

/// A picked or dropped file, fully read into memory.
#[derive(Debug, Clone)]
pub struct ImageFile {
    pub name: String,
    pub mime_type: String,
    pub data: Arc<[u8]>,
}

impl ImageFile {
    pub fn new(name: impl Into<String>, mime_type: impl Into<String>, data: impl Into<Arc<[u8]>>) -> Self {
        Self {
            name: name.into(),
            mime_type: mime_type.into(),
            data: data.into(),
        }
    }

    /// Build a file whose MIME type is inferred from its magic bytes.
    ///
    /// Unrecognised content gets `application/octet-stream`, which the
    /// allow-list then rejects.
    pub fn sniffed(name: impl Into<String>, data: impl Into<Arc<[u8]>>) -> Self {
        let data = data.into();
        let mime_type = sniff_mime(&data).unwrap_or("application/octet-stream");
        Self::new(name, mime_type, data)
    }

    pub fn size(&self) -> u64 {
        self.data.len() as u64
    }
}

/// MIME type of the image format recognised from the leading bytes.
pub fn sniff_mime(data: &[u8]) -> Option<&'static str> {
    image::guess_format(data).ok().map(|f| f.to_mime_type())
}

// ---------------------------------------------------------------------------
// Rules
// ---------------------------------------------------------------------------

/// Upload limits supplied by configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageRules {
    pub allowed_types: Vec<String>,
    pub max_bytes: u64,
}

impl Default for ImageRules {
    fn default() -> Self {
        Self {
            allowed_types: ALLOWED_IMAGE_TYPES.iter().map(|s| s.to_string()).collect(),
            max_bytes: DEFAULT_MAX_IMAGE_BYTES,
        }
    }
}

impl ImageRules {
    pub fn with_max_bytes(max_bytes: u64) -> Self {
        Self {
            max_bytes,
            ..Self::default()
        }
    }

    /// Validate a file before it is handed to the media host.
    pub fn validate(&self, file: &ImageFile) -> Result<(), CoreError> {
        if !self.allowed_types.iter().any(|t| t == &file.mime_type) {
            return Err(CoreError::Validation(format!(
                "Unsupported file type '{}' for {}. Allowed: JPG, PNG, GIF, WebP",
                file.mime_type, file.name
            )));
        }

        if file.size() == 0 {
            return Err(CoreError::Validation(format!("File {} is empty", file.name)));
        }

        if file.size() > self.max_bytes {
            return Err(CoreError::Validation(format!(
                "File {} is too large ({} bytes). Maximum is {} MB",
                file.name,
                file.size(),
                self.max_bytes / 1024 / 1024
            )));
        }

        match sniff_mime(&file.data) {
            Some(actual) if actual == file.mime_type => Ok(()),
            Some(actual) => Err(CoreError::Validation(format!(
                "File {} is declared as {} but contains {actual}",
                file.name, file.mime_type
            ))),
            None => Err(CoreError::Validation(format!(
                "File {} is not a readable image",
                file.name
            ))),
        }
    }
}

#[cfg(test)]
pub(crate) mod fixtures {
    /// Smallest byte prefixes the format sniffer recognises.
    pub const PNG_HEADER: &[u8] = b"\x89PNG\r\n\x1a\n\0\0\0\rIHDR";
    pub const JPEG_HEADER: &[u8] = b"\xFF\xD8\xFF\xE0\0\x10JFIF\0";
    pub const GIF_HEADER: &[u8] = b"GIF89a\x01\0\x01\0";
}
