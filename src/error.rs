//! Session-level error: every component failure plus `NotInitialized`.
//!
//! `Display` (and [`SessionError::detail`]) is the diagnostic string with
//! file, identifier and cause. [`SessionError::user_message`] is a generic
//! sentence that is safe to show to whoever uploaded the image.

use crate::imaging::{DecodeError, ResizeError, SaveError, ValidationError};
use crate::store::StoreError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum SessionError {
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error(transparent)]
    Decode(#[from] DecodeError),
    #[error(transparent)]
    Resize(#[from] ResizeError),
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error(transparent)]
    Save(#[from] SaveError),
    #[error("session is not initialized: {0}")]
    NotInitialized(String),
}

impl SessionError {
    pub fn detail(&self) -> String {
        self.to_string()
    }

    pub fn user_message(&self) -> &'static str {
        match self {
            SessionError::Validation(e) => e.user_message(),
            SessionError::Decode(e) => e.user_message(),
            SessionError::Resize(e) => e.user_message(),
            SessionError::Store(e) => e.user_message(),
            SessionError::Save(e) => e.user_message(),
            SessionError::NotInitialized(_) => "The image could not be loaded.",
        }
    }
}

/// Result type for session operations.
pub type Result<T> = std::result::Result<T, SessionError>;
