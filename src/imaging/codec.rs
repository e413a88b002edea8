//! Codec trait: the decode/encode capability the session depends on.
//!
//! The production implementation is
//! [`RustCodec`](super::rust_codec::RustCodec), built on the `image` crate.
//! The store and the save path only see this trait, so tests can swap in
//! a recording mock.

use super::bitmap::Bitmap;
use super::format::ImageFormat;
use super::params::Quality;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum CodecError {
    #[error("{format} decode failed: {reason}")]
    Decode { format: ImageFormat, reason: String },
    #[error("{format} encode failed: {reason}")]
    Encode { format: ImageFormat, reason: String },
}

/// Decode and encode in-memory buffers.
///
/// `quality` is only meaningful for JPEG; other formats ignore it.
pub trait Codec {
    fn decode(&self, bytes: &[u8], format: ImageFormat) -> Result<Bitmap, CodecError>;

    fn encode(
        &self,
        bitmap: &Bitmap,
        format: ImageFormat,
        quality: Quality,
    ) -> Result<Vec<u8>, CodecError>;
}

impl<C: Codec + ?Sized> Codec for &C {
    fn decode(&self, bytes: &[u8], format: ImageFormat) -> Result<Bitmap, CodecError> {
        (**self).decode(bytes, format)
    }

    fn encode(
        &self,
        bitmap: &Bitmap,
        format: ImageFormat,
        quality: Quality,
    ) -> Result<Vec<u8>, CodecError> {
        (**self).encode(bitmap, format, quality)
    }
}
