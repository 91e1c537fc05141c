//! Thumbnail validation and normalization

use image::ImageFormat;
use std::fs;
use std::path::Path;

use super::ImageValidator;

/// Accepts JPEG and PNG content (sniffed, not by extension)
///
/// An accepted file is decoded and re-encoded in place in its own format,
/// which strips trailing garbage and metadata. Anything else is deleted.
#[derive(Debug, Clone, Copy, Default)]
pub struct FormatValidator;

impl FormatValidator {
    pub fn new() -> Self {
        Self
    }

    fn normalize(path: &Path) -> Result<(), String> {
        let bytes = fs::read(path).map_err(|e| format!("read failed: {}", e))?;
        let format = image::guess_format(&bytes).map_err(|e| format!("unknown format: {}", e))?;

        if !matches!(format, ImageFormat::Jpeg | ImageFormat::Png) {
            return Err(format!("unsupported format {:?}", format));
        }

        let decoded = image::load_from_memory_with_format(&bytes, format)
            .map_err(|e| format!("decode failed: {}", e))?;
        decoded
            .save_with_format(path, format)
            .map_err(|e| format!("re-encode failed: {}", e))
    }
}

impl ImageValidator for FormatValidator {
    fn validate(&self, path: &Path) -> bool {
        match Self::normalize(path) {
            Ok(()) => true,
            Err(reason) => {
                tracing::warn!(path = %path.display(), reason = %reason, "Rejected image");
                if let Err(e) = fs::remove_file(path) {
                    if e.kind() != std::io::ErrorKind::NotFound {
                        tracing::warn!(path = %path.display(), error = %e, "Failed to delete rejected image");
                    }
                }
                false
            }
        }
    }

    fn dimensions(&self, path: &Path) -> Option<(u32, u32)> {
        // Content decides the decoder; thumbnails keep a `.jpg` name whatever they hold
        let dimensions = image::ImageReader::open(path)
            .and_then(|reader| reader.with_guessed_format())
            .map_err(image::ImageError::IoError)
            .and_then(|reader| reader.into_dimensions());

        match dimensions {
            Ok(dimensions) => Some(dimensions),
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "Cannot read image dimensions");
                None
            }
        }
    }
}
