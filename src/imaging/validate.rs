//! Upload validation: size cap and MIME allow-list.
//!
//! Runs before any byte of the upload is decoded.

use super::format::{AllowedFormats, ImageFormat};
use thiserror::Error;

/// Largest accepted upload, in bytes (5 MiB).
pub const MAX_UPLOAD_BYTES: u64 = 5_242_880;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("upload is {size} bytes, limit is {max} bytes")]
    TooLarge { size: u64, max: u64 },
    #[error("declared type '{mime}' is not an allowed image type")]
    UnsupportedType { mime: String },
    #[error("malformed upload: {0}")]
    MalformedUpload(String),
}

impl ValidationError {
    pub fn user_message(&self) -> &'static str {
        match self {
            ValidationError::TooLarge { .. } => "The uploaded file is too large.",
            ValidationError::UnsupportedType { .. } => {
                "The uploaded file is not a supported image type."
            }
            ValidationError::MalformedUpload(_) => "The upload could not be read.",
        }
    }
}

/// Check a declared upload against the size cap and allow-list.
///
/// Returns the format the MIME type maps to, which the decoder then uses.
/// Size is checked first, so an oversized upload is `TooLarge` whatever its type.
pub fn validate(
    declared_mime: &str,
    byte_size: u64,
    allowed: &AllowedFormats,
) -> Result<ImageFormat, ValidationError> {
    if byte_size > MAX_UPLOAD_BYTES {
        return Err(ValidationError::TooLarge {
            size: byte_size,
            max: MAX_UPLOAD_BYTES,
        });
    }

    match ImageFormat::from_mime(declared_mime) {
        Some(format) if allowed.allows(format) => Ok(format),
        _ => Err(ValidationError::UnsupportedType {
            mime: declared_mime.to_string(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_allowed_type_within_limit() {
        assert_eq!(
            validate("image/jpeg", 1024, &AllowedFormats::All),
            Ok(ImageFormat::Jpeg)
        );
    }

    #[test]
    fn limit_is_inclusive() {
        assert!(validate("image/png", MAX_UPLOAD_BYTES, &AllowedFormats::All).is_ok());
        assert_eq!(
            validate("image/png", MAX_UPLOAD_BYTES + 1, &AllowedFormats::All),
            Err(ValidationError::TooLarge {
                size: MAX_UPLOAD_BYTES + 1,
                max: MAX_UPLOAD_BYTES
            })
        );
    }

    #[test]
    fn too_large_wins_over_unsupported_type() {
        let err = validate("application/zip", 10_000_000, &AllowedFormats::All).unwrap_err();
        assert!(matches!(err, ValidationError::TooLarge { .. }));
    }

    #[test]
    fn rejects_type_outside_allow_list() {
        let allowed = AllowedFormats::only([ImageFormat::Png]).unwrap();
        let err = validate("image/gif", 10, &allowed).unwrap_err();
        assert_eq!(
            err,
            ValidationError::UnsupportedType {
                mime: "image/gif".into()
            }
        );
    }

    #[test]
    fn rejects_unknown_type_even_with_all() {
        let err = validate("image/webp", 10, &AllowedFormats::All).unwrap_err();
        assert!(matches!(err, ValidationError::UnsupportedType { .. }));
    }

    #[test]
    fn user_messages_do_not_leak_details() {
        let err = ValidationError::UnsupportedType {
            mime: "image/secret".into(),
        };
        assert!(!err.user_message().contains("secret"));
        assert!(err.to_string().contains("image/secret"));
    }
}
