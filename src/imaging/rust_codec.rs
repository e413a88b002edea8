//! Pure Rust codec built on the `image` crate.
//!
//! ## Crate mapping
//!
//! | Operation | Crate / function |
//! |---|---|
//! | Decode (JPEG, GIF, PNG) | `image::load_from_memory_with_format` |
//! | Encode → JPEG | `image::codecs::jpeg::JpegEncoder` (RGB8, caller quality) |
//! | Encode → GIF | `image::codecs::gif::GifEncoder` (single RGBA frame) |
//! | Encode → PNG | `DynamicImage::write_to` (lossless, keeps bit depth) |

use super::bitmap::Bitmap;
use super::codec::{Codec, CodecError};
use super::format::ImageFormat;
use super::params::Quality;
use image::codecs::gif::GifEncoder;
use image::codecs::jpeg::JpegEncoder;
use image::{DynamicImage, Frame};
use std::borrow::Cow;
use std::io::Cursor;

/// Production codec. Stateless.
#[derive(Debug, Default, Clone, Copy)]
pub struct RustCodec;

impl RustCodec {
    pub fn new() -> Self {
        Self
    }
}

fn codec_format(format: ImageFormat) -> image::ImageFormat {
    match format {
        ImageFormat::Jpeg => image::ImageFormat::Jpeg,
        ImageFormat::Gif => image::ImageFormat::Gif,
        ImageFormat::Png => image::ImageFormat::Png,
    }
}

fn encode_error(format: ImageFormat, err: impl std::fmt::Display) -> CodecError {
    CodecError::Encode {
        format,
        reason: err.to_string(),
    }
}

/// JPEG has no alpha channel and only 8-bit samples.
fn jpeg_compatible(img: &DynamicImage) -> Cow<'_, DynamicImage> {
    match img {
        DynamicImage::ImageRgb8(_) | DynamicImage::ImageLuma8(_) => Cow::Borrowed(img),
        other => Cow::Owned(DynamicImage::ImageRgb8(other.to_rgb8())),
    }
}

fn encode_jpeg(img: &DynamicImage, quality: Quality) -> Result<Vec<u8>, CodecError> {
    let quality = u8::try_from(quality.value())
        .ok()
        .filter(|q| (1..=100).contains(q))
        .ok_or_else(|| {
            encode_error(
                ImageFormat::Jpeg,
                format!("quality {} is outside 1-100", quality.value()),
            )
        })?;

    let mut buf = Vec::new();
    let encoder = JpegEncoder::new_with_quality(&mut buf, quality);
    jpeg_compatible(img)
        .write_with_encoder(encoder)
        .map_err(|e| encode_error(ImageFormat::Jpeg, e))?;
    Ok(buf)
}

fn encode_gif(img: &DynamicImage) -> Result<Vec<u8>, CodecError> {
    let mut buf = Vec::new();
    {
        let mut encoder = GifEncoder::new(&mut buf);
        encoder
            .encode_frame(Frame::new(img.to_rgba8()))
            .map_err(|e| encode_error(ImageFormat::Gif, e))?;
    }
    Ok(buf)
}

fn encode_png(img: &DynamicImage) -> Result<Vec<u8>, CodecError> {
    let mut cursor = Cursor::new(Vec::new());
    img.write_to(&mut cursor, image::ImageFormat::Png)
        .map_err(|e| encode_error(ImageFormat::Png, e))?;
    Ok(cursor.into_inner())
}

impl Codec for RustCodec {
    fn decode(&self, bytes: &[u8], format: ImageFormat) -> Result<Bitmap, CodecError> {
        let img = image::load_from_memory_with_format(bytes, codec_format(format)).map_err(
            |e| CodecError::Decode {
                format,
                reason: e.to_string(),
            },
        )?;
        Bitmap::new(img).ok_or_else(|| CodecError::Decode {
            format,
            reason: "image has zero area".into(),
        })
    }

    fn encode(
        &self,
        bitmap: &Bitmap,
        format: ImageFormat,
        quality: Quality,
    ) -> Result<Vec<u8>, CodecError> {
        let img = bitmap.as_image();
        match format {
            ImageFormat::Jpeg => encode_jpeg(img, quality),
            ImageFormat::Gif => encode_gif(img),
            ImageFormat::Png => encode_png(img),
        }
    }
}
