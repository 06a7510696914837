use std::fs;
use std::io::Cursor;
use std::path::Path;
use std::sync::Arc;

use image::imageops::{self, FilterType};
use image::{ImageFormat, ImageReader, RgbaImage};
use sha2::{Digest, Sha256};

use crate::error::IngestError;

pub const MAX_DIMENSION: u32 = 1920;

/// A decoded source image, normalized to at most the configured display size.
///
/// Cloning is cheap; pixel data and the raw bytes are shared.
#[derive(Clone, Debug)]
pub struct ImageDocument {
    fingerprint: String,
    source_width: u32,
    source_height: u32,
    pixels: Arc<RgbaImage>,
    source_bytes: Arc<[u8]>,
}

impl ImageDocument {
    pub fn fingerprint(&self) -> &str {
        &self.fingerprint
    }

    pub fn source_size(&self) -> (u32, u32) {
        (self.source_width, self.source_height)
    }

    pub fn display_size(&self) -> (u32, u32) {
        self.pixels.dimensions()
    }

    pub fn pixels(&self) -> &RgbaImage {
        &self.pixels
    }

    pub fn source_bytes(&self) -> &[u8] {
        &self.source_bytes
    }

    pub fn was_resampled(&self) -> bool {
        self.display_size() != self.source_size()
    }

    /// Bytes to hand to the service as the `image` upload: the original file,
    /// or the resampled pixels as PNG when the source was too large.
    pub fn upload_bytes(&self) -> Result<Vec<u8>, image::ImageError> {
        if !self.was_resampled() {
            return Ok(self.source_bytes.to_vec());
        }
        let mut out = Vec::new();
        self.pixels.write_to(&mut Cursor::new(&mut out), ImageFormat::Png)?;
        Ok(out)
    }
}

/// Lowercase hex SHA-256 of the raw bytes.
pub fn fingerprint(bytes: &[u8]) -> String {
    format!("{:x}", Sha256::digest(bytes))
}

/// Display size for a `width`×`height` source: unchanged when both fit in
/// `max`, otherwise scaled uniformly so the long side becomes `max`.
pub fn display_size(width: u32, height: u32, max: u32) -> (u32, u32) {
    if width <= max && height <= max {
        return (width, height);
    }
    let scaled = |short: u32, long: u32| -> u32 {
        ((short as f64 * max as f64 / long as f64).round() as u32).max(1)
    };
    if width >= height {
        (max, scaled(height, width))
    } else {
        (scaled(width, height), max)
    }
}

pub fn load(path: &Path, max: u32) -> Result<ImageDocument, IngestError> {
    let bytes = fs::read(path)?;
    log::info!("Loaded {} ({} bytes)", path.display(), bytes.len());
    load_bytes(bytes, max)
}

pub fn load_bytes(bytes: Vec<u8>, max: u32) -> Result<ImageDocument, IngestError> {
    let fingerprint = fingerprint(&bytes);
    load_bytes_with_fingerprint(bytes, fingerprint, max)
}

/// Like `load_bytes`, but keeps an identity assigned elsewhere (e.g. by the service).
pub fn load_bytes_with_fingerprint(
    bytes: Vec<u8>,
    fingerprint: String,
    max: u32,
) -> Result<ImageDocument, IngestError> {
    let decoded = ImageReader::new(Cursor::new(&bytes))
        .with_guessed_format()?
        .decode()?;
    let rgba = decoded.to_rgba8();
    let (source_width, source_height) = rgba.dimensions();
    let (width, height) = display_size(source_width, source_height, max);

    let pixels = if (width, height) != (source_width, source_height) {
        log::info!(
            "Downscaling {}x{} -> {}x{}",
            source_width,
            source_height,
            width,
            height
        );
        imageops::resize(&rgba, width, height, FilterType::Triangle)
    } else {
        rgba
    };

    Ok(ImageDocument {
        fingerprint,
        source_width,
        source_height,
        pixels: Arc::new(pixels),
        source_bytes: bytes.into(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn png_bytes(width: u32, height: u32) -> Vec<u8> {
        let img = RgbaImage::from_fn(width, height, |x, y| {
            image::Rgba([x as u8, y as u8, 90, 255])
        });
        let mut out = Vec::new();
        img.write_to(&mut Cursor::new(&mut out), ImageFormat::Png).unwrap();
        out
    }

    #[test]
    fn test_display_size_rules() {
        assert_eq!(display_size(4000, 2000, 1920), (1920, 960));
        assert_eq!(display_size(2000, 4000, 1920), (960, 1920));
        assert_eq!(display_size(1920, 1080, 1920), (1920, 1080));
        assert_eq!(display_size(640, 480, 1920), (640, 480));
        assert_eq!(display_size(3000, 1, 1920), (1920, 1));
        assert_eq!(display_size(2500, 1333, 1920), (1920, 1024));
    }

    #[test]
    fn test_fingerprint_is_stable_hex() {
        let a = fingerprint(b"hello");
        assert_eq!(a.len(), 64);
        assert_eq!(a, fingerprint(b"hello"));
        assert_ne!(a, fingerprint(b"hello!"));
        assert!(a.chars().all(|c| c.is_ascii_hexdigit() && !c.is_ascii_uppercase()));
    }

    #[test]
    fn test_small_image_is_not_resampled() {
        let bytes = png_bytes(40, 30);
        let doc = load_bytes(bytes.clone(), MAX_DIMENSION).unwrap();
        assert_eq!(doc.display_size(), (40, 30));
        assert!(!doc.was_resampled());
        assert_eq!(doc.fingerprint(), fingerprint(&bytes));
        assert_eq!(doc.upload_bytes().unwrap(), bytes);
    }

    #[test]
    fn test_large_image_is_downscaled() {
        let doc = load_bytes(png_bytes(100, 50), 40).unwrap();
        assert_eq!(doc.source_size(), (100, 50));
        assert_eq!(doc.display_size(), (40, 20));
        assert!(doc.was_resampled());

        let uploaded = image::load_from_memory(&doc.upload_bytes().unwrap()).unwrap();
        assert_eq!((uploaded.width(), uploaded.height()), (40, 20));
    }

    #[test]
    fn test_garbage_is_decode_error() {
        let result = load_bytes(b"definitely not an image".to_vec(), MAX_DIMENSION);
        assert!(matches!(result, Err(IngestError::Decode(_))));
    }

    #[test]
    fn test_missing_file_is_io_error() {
        let dir = tempfile::tempdir().unwrap();
        let result = load(&dir.path().join("missing.png"), MAX_DIMENSION);
        assert!(matches!(result, Err(IngestError::Io(_))));
    }

    #[test]
    fn test_load_from_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("photo.png");
        fs::write(&path, png_bytes(12, 9)).unwrap();
        let doc = load(&path, MAX_DIMENSION).unwrap();
        assert_eq!(doc.display_size(), (12, 9));
    }
}
