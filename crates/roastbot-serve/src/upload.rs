//! Custom template uploads.
//!
//! Uploaded images are decoded from a data URL, checked against a minimum
//! size, shrunk to fit the template box and re-encoded as JPEG before they
//! are written into the template directory.

use std::io::Cursor;

use base64::Engine;
use image::codecs::jpeg::JpegEncoder;
use image::imageops::FilterType;
use image::{DynamicImage, ExtendedColorType};

use crate::render::loader::MAX_SOURCE_SIDE;

/// Smallest accepted upload side, inclusive.
pub const MIN_UPLOAD_SIDE: u32 = 200;

/// Uploads are shrunk to fit this box; smaller images keep their size.
pub const MAX_UPLOAD_WIDTH: u32 = 800;
pub const MAX_UPLOAD_HEIGHT: u32 = 600;

pub const JPEG_QUALITY: u8 = 80;

/// Largest encoded template accepted.
pub const MAX_UPLOAD_BYTES: usize = 5 * 1024 * 1024;

/// Upload processing failures.
#[derive(Debug, thiserror::Error)]
pub enum UploadError {
    #[error("Invalid base64 image data")]
    InvalidData,

    #[error("Invalid image metadata")]
    InvalidImage,

    #[error("Image dimensions too small. Minimum 200px required.")]
    TooSmall,

    #[error("Image dimensions too large. Maximum 5000px allowed.")]
    TooLarge,

    #[error("Image size exceeds 5MB limit")]
    FileTooLarge,

    #[error("Failed to process image")]
    Encode(#[source] image::ImageError),

    #[error("failed to save template: {0}")]
    Save(#[from] std::io::Error),
}

impl UploadError {
    /// Whether the failure lies with the submitted image rather than the
    /// server.
    pub fn is_client_error(&self) -> bool {
        !matches!(self, Self::Encode(_) | Self::Save(_))
    }
}

/// A re-encoded template ready to be written.
#[derive(Debug, Clone)]
pub struct ProcessedTemplate {
    pub jpeg: Vec<u8>,
    pub width: u32,
    pub height: u32,
}

/// Output size for a source image: aspect-preserving fit inside
/// `MAX_UPLOAD_WIDTH` x `MAX_UPLOAD_HEIGHT`, never enlarged.
pub fn target_dimensions(width: u32, height: u32) -> (u32, u32) {
    let aspect = width as f64 / height as f64;
    let (mut w, mut h) = (width, height);
    if w > MAX_UPLOAD_WIDTH {
        w = MAX_UPLOAD_WIDTH;
        h = (w as f64 / aspect).round() as u32;
    }
    if h > MAX_UPLOAD_HEIGHT {
        h = MAX_UPLOAD_HEIGHT;
        w = (h as f64 * aspect).round() as u32;
    }
    (w.max(1), h.max(1))
}

/// Lowercase the name and replace everything outside `[a-z0-9]` with `-`.
pub fn slug(name: &str) -> String {
    name.to_lowercase()
        .chars()
        .map(|c| if c.is_ascii_lowercase() || c.is_ascii_digit() { c } else { '-' })
        .collect()
}

/// File name for an upload taken at `timestamp_ms`.
pub fn upload_filename(timestamp_ms: i64, name: &str) -> String {
    format!("{timestamp_ms}-{}.jpg", slug(name))
}

/// Decode, validate, resize and JPEG-encode an uploaded data URL.
///
/// CPU-bound; call from the blocking pool.
pub fn process_upload(data_url: &str) -> Result<ProcessedTemplate, UploadError> {
    let payload = data_url
        .rsplit_once(";base64,")
        .map(|(_, payload)| payload)
        .ok_or(UploadError::InvalidData)?;
    let bytes = base64::engine::general_purpose::STANDARD
        .decode(payload.trim())
        .map_err(|_| UploadError::InvalidData)?;

    let (width, height) = image::ImageReader::new(Cursor::new(&bytes))
        .with_guessed_format()
        .map_err(|_| UploadError::InvalidImage)?
        .into_dimensions()
        .map_err(|_| UploadError::InvalidImage)?;
    if width == 0 || height == 0 {
        return Err(UploadError::InvalidImage);
    }
    if width < MIN_UPLOAD_SIDE || height < MIN_UPLOAD_SIDE {
        return Err(UploadError::TooSmall);
    }
    if width > MAX_SOURCE_SIDE || height > MAX_SOURCE_SIDE {
        return Err(UploadError::TooLarge);
    }

    let decoded = image::load_from_memory(&bytes).map_err(|_| UploadError::InvalidImage)?;
    let (target_w, target_h) = target_dimensions(width, height);
    let resized: DynamicImage = if (target_w, target_h) == (width, height) {
        decoded
    } else {
        decoded.resize_exact(target_w, target_h, FilterType::Lanczos3)
    };

    let rgb = resized.to_rgb8();
    let mut jpeg = Vec::new();
    JpegEncoder::new_with_quality(&mut jpeg, JPEG_QUALITY)
        .encode(rgb.as_raw(), rgb.width(), rgb.height(), ExtendedColorType::Rgb8)
        .map_err(UploadError::Encode)?;

    if jpeg.len() > MAX_UPLOAD_BYTES {
        return Err(UploadError::FileTooLarge);
    }

    Ok(ProcessedTemplate {
        jpeg,
        width: rgb.width(),
        height: rgb.height(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::render::loader::tests::{data_url, png_bytes};

    #[test]
    fn small_enough_images_keep_their_size() {
        assert_eq!(target_dimensions(640, 480), (640, 480));
        assert_eq!(target_dimensions(200, 200), (200, 200));
    }

    #[test]
    fn wide_images_fit_the_width() {
        assert_eq!(target_dimensions(1600, 900), (800, 450));
    }

    #[test]
    fn tall_images_fit_the_height() {
        assert_eq!(target_dimensions(600, 1200), (300, 600));
        // Width shrinks first, then height still overflows.
        assert_eq!(target_dimensions(1000, 900), (667, 600));
    }

    #[test]
    fn slug_keeps_lowercase_alphanumerics() {
        assert_eq!(slug("Distracted Boyfriend 2"), "distracted-boyfriend-2");
        assert_eq!(slug("Café!"), "caf--");
        assert_eq!(upload_filename(1700000000000, "My Meme"), "1700000000000-my-meme.jpg");
    }

    #[test]
    fn processes_png_into_jpeg() {
        let url = data_url(&png_bytes(1000, 500, [200, 40, 40, 255]));
        let processed = process_upload(&url).unwrap();
        assert_eq!((processed.width, processed.height), (800, 400));

        let decoded = image::load_from_memory(&processed.jpeg).unwrap();
        assert_eq!((decoded.width(), decoded.height()), (800, 400));
        assert_eq!(
            image::guess_format(&processed.jpeg).unwrap(),
            image::ImageFormat::Jpeg
        );
    }

    #[test]
    fn rejects_small_and_malformed_uploads() {
        let small = data_url(&png_bytes(199, 400, [0, 0, 0, 255]));
        assert!(matches!(process_upload(&small), Err(UploadError::TooSmall)));

        assert!(matches!(
            process_upload("data:image/png;base64,!!!"),
            Err(UploadError::InvalidData)
        ));
        assert!(matches!(
            process_upload("data:image/png,plain"),
            Err(UploadError::InvalidData)
        ));

        let not_an_image = format!(
            "data:image/png;base64,{}",
            base64::engine::general_purpose::STANDARD.encode(b"hello world")
        );
        assert!(matches!(
            process_upload(&not_an_image),
            Err(UploadError::InvalidImage)
        ));
    }

    #[test]
    fn error_messages_are_user_facing() {
        assert_eq!(
            UploadError::TooSmall.to_string(),
            "Image dimensions too small. Minimum 200px required."
        );
        assert_eq!(UploadError::FileTooLarge.to_string(), "Image size exceeds 5MB limit");
        assert!(UploadError::TooSmall.is_client_error());
        assert!(!UploadError::Save(std::io::Error::other("disk full")).is_client_error());
    }
}
