//! Image handling: validation, codecs, and resizing.
//!
//! | Operation | Crate / function |
//! |---|---|
//! | **Validate** | MIME allow-list + fixed byte cap |
//! | **Decode** | `image::load_from_memory_with_format` |
//! | **Resize** | `crop_imm` + `resize_exact` (bilinear by default) |
//! | **Encode → JPEG/GIF/PNG** | `image::codecs::{jpeg, gif}` encoders, `write_to` |
//!
//! The module is split into:
//! - **Calculations**: Pure functions for resize geometry (unit testable)
//! - **Parameters**: Data structures describing image operations
//! - **Codec**: [`Codec`] trait + [`RustCodec`]
//! - **Resize**: the resize engine, reading only the original bitmap
//! - **Operations**: decoder and encoder adapters around the codec

mod bitmap;
pub mod calculations;
pub mod codec;
mod format;
pub mod operations;
mod params;
pub mod resize;
pub mod rust_codec;
mod validate;

pub use bitmap::{Bitmap, Dimensions};
pub use codec::{Codec, CodecError};
pub use format::{AllowedFormats, ImageFormat, UnknownFormat};
pub use operations::{DecodeError, SaveError, SaveTarget, decode_upload, encode_to_file};
pub use params::{Quality, ResizeFilter, ResizeMode, ResizeParams};
pub use resize::{ResizeEngine, ResizeError, resize};
pub use rust_codec::RustCodec;
pub use validate::{MAX_UPLOAD_BYTES, ValidationError, validate};
