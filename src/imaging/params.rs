//! Parameter types for image operations.
//!
//! These describe *what* to do, not *how*. The [`resize`](super::resize)
//! engine and the [`codec`](super::codec) consume them.
//!
//! ## Types
//!
//! - [`Quality`]: JPEG quality, passed through to the codec as given (default 85).
//! - [`ResizeMode`]: Stretch, ShrinkKeepAspect, or CropCenterResize.
//! - [`ResizeFilter`]: Resampling filter used by every mode.
//! - [`ResizeParams`]: Mode plus target box.

use super::resize::ResizeError;
use image::imageops::FilterType;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Quality setting for lossy encoding.
///
/// Not clamped: the codec decides which values it accepts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Quality(pub u32);

impl Quality {
    pub fn new(value: u32) -> Self {
        Self(value)
    }

    pub fn value(self) -> u32 {
        self.0
    }
}

impl Default for Quality {
    fn default() -> Self {
        Self(85)
    }
}

/// How a derivative's canvas is derived from the target box.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResizeMode {
    /// Exactly the target box; aspect ratio ignored.
    Stretch,
    /// Fit inside the target box keeping aspect ratio; never upscales.
    ShrinkKeepAspect,
    /// Crop the centered region matching the target aspect, then scale to the box.
    CropCenterResize,
}

impl fmt::Display for ResizeMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ResizeMode::Stretch => "stretch",
            ResizeMode::ShrinkKeepAspect => "shrink",
            ResizeMode::CropCenterResize => "crop",
        };
        f.write_str(name)
    }
}

impl FromStr for ResizeMode {
    type Err = ResizeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "stretch" => Ok(ResizeMode::Stretch),
            "shrink" | "shrink-keep-aspect" => Ok(ResizeMode::ShrinkKeepAspect),
            "crop" | "crop-center" => Ok(ResizeMode::CropCenterResize),
            _ => Err(ResizeError::InvalidMode(s.to_string())),
        }
    }
}

/// Resampling filter, configurable in `[resize] filter`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ResizeFilter {
    Nearest,
    /// Bilinear.
    #[default]
    Triangle,
    CatmullRom,
    Gaussian,
    Lanczos3,
}

impl ResizeFilter {
    pub fn filter_type(self) -> FilterType {
        match self {
            ResizeFilter::Nearest => FilterType::Nearest,
            ResizeFilter::Triangle => FilterType::Triangle,
            ResizeFilter::CatmullRom => FilterType::CatmullRom,
            ResizeFilter::Gaussian => FilterType::Gaussian,
            ResizeFilter::Lanczos3 => FilterType::Lanczos3,
        }
    }
}

/// Parameters for one resize operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResizeParams {
    pub mode: ResizeMode,
    pub width: u32,
    pub height: u32,
}

impl ResizeParams {
    pub fn new(mode: ResizeMode, width: u32, height: u32) -> Self {
        Self {
            mode,
            width,
            height,
        }
    }

    /// Both target dimensions must be positive.
    pub fn check(&self) -> Result<(), ResizeError> {
        if self.width == 0 || self.height == 0 {
            return Err(ResizeError::InvalidDimensions {
                width: self.width,
                height: self.height,
            });
        }
        Ok(())
    }
}
