//! Decoder and encoder adapters.
//!
//! These sit between the session and the [`Codec`]: decoding turns validated
//! upload bytes into the original [`Bitmap`], saving turns a resident bitmap
//! into a file in a caller-chosen directory. Both report failures with their
//! own error types so the session can tell them apart.

use super::bitmap::Bitmap;
use super::codec::Codec;
use super::format::{ImageFormat, UnknownFormat};
use super::params::Quality;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, info};

#[derive(Error, Debug)]
#[error("could not decode {format} upload '{name}': {reason}")]
pub struct DecodeError {
    pub name: String,
    pub format: ImageFormat,
    pub reason: String,
}

impl DecodeError {
    pub fn user_message(&self) -> &'static str {
        "The uploaded image could not be decoded."
    }
}

/// Decode upload bytes in the format the validator matched.
pub fn decode_upload(
    codec: &impl Codec,
    name: &str,
    bytes: &[u8],
    format: ImageFormat,
) -> Result<Bitmap, DecodeError> {
    let bitmap = codec
        .decode(bytes, format)
        .map_err(|e| DecodeError {
            name: name.to_string(),
            format,
            reason: e.to_string(),
        })?;
    debug!(name, %format, dimensions = %bitmap.dimensions(), "decoded upload");
    Ok(bitmap)
}

#[derive(Error, Debug)]
pub enum SaveError {
    #[error("output directory '{}' does not exist or is not a directory", .0.display())]
    InvalidPath(PathBuf),
    #[error("base name '{0}' must be non-empty and contain only A-Z, a-z, 0-9, '_' or '-'")]
    InvalidName(String),
    #[error("unsupported output format '{0}' (expected jpeg, gif or png)")]
    InvalidFormat(String),
    #[error("failed to write {}: {reason}", path.display())]
    EncodeFailure { path: PathBuf, reason: String },
}

impl SaveError {
    pub fn user_message(&self) -> &'static str {
        match self {
            SaveError::InvalidPath(_) => "The output location is not available.",
            SaveError::InvalidName(_) => "The output file name is not valid.",
            SaveError::InvalidFormat(_) => "The requested output format is not supported.",
            SaveError::EncodeFailure { .. } => "The image could not be saved.",
        }
    }
}

impl From<UnknownFormat> for SaveError {
    fn from(err: UnknownFormat) -> Self {
        SaveError::InvalidFormat(err.0)
    }
}

/// `^[A-Za-z0-9_-]+$`
pub fn is_valid_base_name(name: &str) -> bool {
    !name.is_empty()
        && name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
}

/// A checked output location: existing directory, safe base name, known format.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SaveTarget {
    dir: PathBuf,
    base_name: String,
    format: ImageFormat,
}

impl SaveTarget {
    /// Checks run in order: directory, then name, then format.
    pub fn new(dir: &Path, base_name: &str, format: &str) -> Result<Self, SaveError> {
        if !dir.is_dir() {
            return Err(SaveError::InvalidPath(dir.to_path_buf()));
        }
        if !is_valid_base_name(base_name) {
            return Err(SaveError::InvalidName(base_name.to_string()));
        }
        let format: ImageFormat = format.parse()?;
        Ok(Self {
            dir: dir.to_path_buf(),
            base_name: base_name.to_string(),
            format,
        })
    }

    pub fn format(&self) -> ImageFormat {
        self.format
    }

    /// `dir/base_name.<ext>`
    pub fn path(&self) -> PathBuf {
        self.dir
            .join(format!("{}.{}", self.base_name, self.format.extension()))
    }
}

/// Encode `bitmap` and write it to the target path, replacing any existing file.
pub fn encode_to_file(
    codec: &impl Codec,
    bitmap: &Bitmap,
    target: &SaveTarget,
    quality: Quality,
) -> Result<PathBuf, SaveError> {
    let path = target.path();
    let bytes = codec
        .encode(bitmap, target.format(), quality)
        .map_err(|e| SaveError::EncodeFailure {
            path: path.clone(),
            reason: e.to_string(),
        })?;
    std::fs::write(&path, &bytes).map_err(|e| SaveError::EncodeFailure {
        path: path.clone(),
        reason: e.to_string(),
    })?;
    info!(
        path = %path.display(),
        format = %target.format(),
        dimensions = %bitmap.dimensions(),
        bytes = bytes.len(),
        "saved image"
    );
    Ok(path)
}
