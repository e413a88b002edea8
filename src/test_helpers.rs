//! Shared test utilities for the image-session test suite.
//!
//! Builds synthetic bitmaps, encoded fixtures and [`Upload`] descriptors so
//! tests never depend on image files checked into the repo.
//!
//! # Usage
//!
//! ```rust
//! use crate::test_helpers::*;
//!
//! let tmp = TempDir::new().unwrap();
//! let upload = write_upload(tmp.path(), "photo.jpg", ImageFormat::Jpeg, 800, 600);
//! let session = ImageSession::initialize(&upload, &AllowedFormats::All, &options_in(tmp.path()));
//! assert!(session.is_initialized());
//! ```

use std::path::Path;

use image::{DynamicImage, Rgb, RgbImage, Rgba, RgbaImage};

use crate::imaging::{Bitmap, Codec, ImageFormat, Quality, RustCodec};
use crate::session::{SessionOptions, Upload};

// =========================================================================
// Bitmaps
// =========================================================================

/// RGB8 bitmap with a smooth gradient, so crops and resizes are visible.
pub fn gradient_bitmap(width: u32, height: u32) -> Bitmap {
    let img = RgbImage::from_fn(width, height, |x, y| {
        Rgb([
            (x * 255 / width.max(1)) as u8,
            (y * 255 / height.max(1)) as u8,
            ((x + y) % 256) as u8,
        ])
    });
    Bitmap::new(DynamicImage::ImageRgb8(img)).unwrap()
}

/// RGBA8 bitmap with a varying alpha channel.
pub fn rgba_bitmap(width: u32, height: u32) -> Bitmap {
    let img = RgbaImage::from_fn(width, height, |x, y| {
        Rgba([(x % 256) as u8, (y % 256) as u8, 128, ((x * y) % 256) as u8])
    });
    Bitmap::new(DynamicImage::ImageRgba8(img)).unwrap()
}

// =========================================================================
// Encoded fixtures
// =========================================================================

pub fn encoded(format: ImageFormat, width: u32, height: u32) -> Vec<u8> {
    RustCodec::new()
        .encode(&gradient_bitmap(width, height), format, Quality::default())
        .unwrap()
}

pub fn png_bytes(width: u32, height: u32) -> Vec<u8> {
    encoded(ImageFormat::Png, width, height)
}

pub fn jpeg_bytes(width: u32, height: u32) -> Vec<u8> {
    encoded(ImageFormat::Jpeg, width, height)
}

// =========================================================================
// Uploads
// =========================================================================

/// Write an encoded image into `dir` and describe it as an upload with the
/// format's canonical MIME type and the exact byte size.
pub fn write_upload(
    dir: &Path,
    file_name: &str,
    format: ImageFormat,
    width: u32,
    height: u32,
) -> Upload {
    let bytes = encoded(format, width, height);
    let path = dir.join(file_name);
    std::fs::write(&path, &bytes).unwrap();
    Upload {
        name: file_name.to_string(),
        declared_mime_type: format.mime().to_string(),
        byte_size: bytes.len() as u64,
        source_path: path,
    }
}

/// Write arbitrary bytes and describe them as an upload of `mime`.
pub fn write_raw_upload(dir: &Path, file_name: &str, mime: &str, bytes: &[u8]) -> Upload {
    let path = dir.join(file_name);
    std::fs::write(&path, bytes).unwrap();
    Upload {
        name: file_name.to_string(),
        declared_mime_type: mime.to_string(),
        byte_size: bytes.len() as u64,
        source_path: path,
    }
}

/// Session options that spill under `root` instead of the OS temp dir.
pub fn options_in(root: &Path) -> SessionOptions {
    SessionOptions {
        spill_root: root.to_path_buf(),
        ..SessionOptions::default()
    }
}

/// Number of entries directly inside `dir`.
pub fn entry_count(dir: &Path) -> usize {
    std::fs::read_dir(dir).unwrap().count()
}
