//! Resize engine.
//!
//! Produces a new [`Bitmap`] from a source bitmap in one of three modes:
//!
//! | Mode | Canvas | Source region |
//! |---|---|---|
//! | Stretch | exactly the target box | whole source |
//! | ShrinkKeepAspect | [`shrink_keep_aspect_dimensions`] | whole source |
//! | CropCenterResize | exactly the target box | [`center_crop_rect`] |
//!
//! The canvas is reserved before any resampling so that running out of
//! memory is reported as [`ResizeError::AllocationFailure`] instead of
//! aborting the process. When the source region already has the canvas
//! dimensions, pixels are copied without resampling.

use super::bitmap::{Bitmap, Dimensions};
use super::calculations::{CropRect, center_crop_rect, shrink_keep_aspect_dimensions};
use super::params::{ResizeFilter, ResizeMode, ResizeParams};
use image::DynamicImage;
use thiserror::Error;
use tracing::debug;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ResizeError {
    #[error("unknown resize mode '{0}' (expected stretch, shrink or crop)")]
    InvalidMode(String),
    #[error("target dimensions must be positive, got {width}x{height}")]
    InvalidDimensions { width: u32, height: u32 },
    #[error("could not allocate a {width}x{height} canvas ({bytes} bytes)")]
    AllocationFailure { width: u32, height: u32, bytes: u128 },
    #[error("resampling to {expected} failed: {reason}")]
    ResampleFailure { expected: Dimensions, reason: String },
}

impl ResizeError {
    pub fn user_message(&self) -> &'static str {
        match self {
            ResizeError::InvalidMode(_) => "The requested resize mode is not supported.",
            ResizeError::InvalidDimensions { .. } => "The requested image size is not valid.",
            ResizeError::AllocationFailure { .. } => {
                "The requested image size is too large to process."
            }
            ResizeError::ResampleFailure { .. } => "The image could not be resized.",
        }
    }
}

/// Resize with a fixed resampling filter.
#[derive(Debug, Clone, Copy, Default)]
pub struct ResizeEngine {
    filter: ResizeFilter,
}

impl ResizeEngine {
    pub fn new(filter: ResizeFilter) -> Self {
        Self { filter }
    }

    /// Derive a new bitmap from `source`.
    pub fn resize(&self, source: &Bitmap, params: &ResizeParams) -> Result<Bitmap, ResizeError> {
        params.check()?;
        let target = Dimensions::new(params.width, params.height);

        let source_dims = source.dimensions();
        let full = CropRect {
            x: 0,
            y: 0,
            width: source_dims.width,
            height: source_dims.height,
        };
        let (region, canvas) = match params.mode {
            ResizeMode::Stretch => (full, target),
            ResizeMode::ShrinkKeepAspect => {
                (full, shrink_keep_aspect_dimensions(source_dims, target))
            }
            ResizeMode::CropCenterResize => (center_crop_rect(source_dims, target), target),
        };

        debug!(
            mode = %params.mode,
            source = %source_dims,
            region = %region.dimensions(),
            x = region.x,
            y = region.y,
            canvas = %canvas,
            "resizing"
        );

        reserve_canvas(canvas, source.color_type().bytes_per_pixel())?;
        self.resample(source, region, canvas)
    }

    fn resample(
        &self,
        source: &Bitmap,
        region: CropRect,
        canvas: Dimensions,
    ) -> Result<Bitmap, ResizeError> {
        let img = source.as_image();
        let cropped = if region.is_full(source.dimensions()) {
            None
        } else {
            Some(img.crop_imm(region.x, region.y, region.width, region.height))
        };
        let region_img: &DynamicImage = cropped.as_ref().unwrap_or(img);

        let out = if region.dimensions() == canvas {
            match cropped {
                Some(c) => c,
                None => img.clone(),
            }
        } else {
            region_img.resize_exact(canvas.width, canvas.height, self.filter.filter_type())
        };

        if out.width() != canvas.width || out.height() != canvas.height {
            return Err(ResizeError::ResampleFailure {
                expected: canvas,
                reason: format!("resampler produced {}x{}", out.width(), out.height()),
            });
        }
        Bitmap::new(out).ok_or_else(|| ResizeError::ResampleFailure {
            expected: canvas,
            reason: "resampler produced an empty image".into(),
        })
    }
}

/// Resize with the default (bilinear) filter.
pub fn resize(
    source: &Bitmap,
    mode: ResizeMode,
    width: u32,
    height: u32,
) -> Result<Bitmap, ResizeError> {
    ResizeEngine::default().resize(source, &ResizeParams::new(mode, width, height))
}

/// Make sure a canvas of this size can be allocated at all.
fn reserve_canvas(canvas: Dimensions, bytes_per_pixel: u8) -> Result<(), ResizeError> {
    let bytes = canvas.area() as u128 * bytes_per_pixel as u128;
    let failure = || ResizeError::AllocationFailure {
        width: canvas.width,
        height: canvas.height,
        bytes,
    };
    let len = usize::try_from(bytes).map_err(|_| failure())?;
    let mut probe: Vec<u8> = Vec::new();
    probe.try_reserve_exact(len).map_err(|_| failure())?;
    Ok(())
}
