//! Pure calculation functions for resize geometry.
//!
//! All functions here are pure and testable without any I/O or images.
//!
//! Aspect ratios are never materialized as floats. Every comparison of two
//! ratios is done by cross-multiplying in `u64`, and every
//! `floor(a / (b / c))` is computed as `(a * c) / b`, so results are exact
//! for all `u32` inputs.

use super::bitmap::Dimensions;

/// Region of the source that a crop reads from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CropRect {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

impl CropRect {
    pub fn dimensions(self) -> Dimensions {
        Dimensions::new(self.width, self.height)
    }

    /// True when the rectangle covers the whole source.
    pub fn is_full(self, source: Dimensions) -> bool {
        self.x == 0 && self.y == 0 && self.dimensions() == source
    }
}

/// `floor(a * b / c)` without intermediate overflow, saturated to `u32`.
fn mul_div_floor(a: u32, b: u32, c: u32) -> u32 {
    let value = (a as u64 * b as u64) / c as u64;
    u32::try_from(value).unwrap_or(u32::MAX)
}

/// Output dimensions for ShrinkKeepAspect.
///
/// A source that already fits the box is returned unchanged (no upscaling).
/// Otherwise one axis is pinned to the box:
/// - narrower than square (`w/h < 1`): height = box height,
///   width = `floor(w / (h / box_h))`
/// - square or wider: width = box width, height = `floor(h / (w / box_w))`
///
/// The free axis can exceed the box on extreme aspect ratios; the pinned axis
/// always matches exactly. Results are at least 1px.
///
/// # Examples
/// ```
/// # use image_session::imaging::calculations::shrink_keep_aspect_dimensions;
/// # use image_session::imaging::Dimensions;
/// let out = shrink_keep_aspect_dimensions(Dimensions::new(800, 600), Dimensions::new(200, 200));
/// assert_eq!(out, Dimensions::new(200, 150));
/// ```
pub fn shrink_keep_aspect_dimensions(source: Dimensions, target: Dimensions) -> Dimensions {
    let Dimensions {
        width: src_w,
        height: src_h,
    } = source;
    let Dimensions {
        width: tgt_w,
        height: tgt_h,
    } = target;

    if src_w <= tgt_w && src_h <= tgt_h {
        return source;
    }

    if src_w < src_h {
        // Portrait: height pinned
        Dimensions::new(mul_div_floor(src_w, tgt_h, src_h).max(1), tgt_h)
    } else {
        // Landscape or square: width pinned
        Dimensions::new(tgt_w, mul_div_floor(src_h, tgt_w, src_w).max(1))
    }
}

/// Which source axis a center crop keeps in full.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CropMatch {
    pub height: bool,
    pub width: bool,
}

/// Decide the crop axes from output ratio `oAR = tw/th` and input ratio
/// `iAR = sw/sh`.
///
/// - height match: `(oAR <= 1 && iAR >= 1) || (oAR > 1 && iAR > 1 && iAR >= oAR)`
/// - width match:  `(oAR >= 1 && iAR <= 1) || (oAR < 1 && iAR < 1 && oAR >= iAR)`
pub fn crop_match(source: Dimensions, target: Dimensions) -> CropMatch {
    let (sw, sh) = (source.width as u64, source.height as u64);
    let (tw, th) = (target.width as u64, target.height as u64);

    // Ratio comparisons by cross-multiplication.
    let out_le_1 = tw <= th;
    let out_ge_1 = tw >= th;
    let in_le_1 = sw <= sh;
    let in_ge_1 = sw >= sh;
    let in_ge_out = sw * th >= tw * sh;
    let out_ge_in = tw * sh >= sw * th;

    CropMatch {
        height: (out_le_1 && in_ge_1) || (!out_le_1 && !in_le_1 && in_ge_out),
        width: (out_ge_1 && in_le_1) || (!out_ge_1 && !in_ge_1 && out_ge_in),
    }
}

/// Centered source rectangle for CropCenterResize.
///
/// Height-match keeps the full source height and takes
/// `floor(oAR * sh)` columns (or all of them if width also matches). Every
/// other case, including when neither axis matches, keeps the full width and
/// takes `floor(sh / oAR)` rows. Grab sizes are clamped to `1..=source` per
/// axis before centering, since the fall-through branch can ask for more rows
/// than the source has.
///
/// # Examples
/// ```
/// # use image_session::imaging::calculations::center_crop_rect;
/// # use image_session::imaging::Dimensions;
/// let rect = center_crop_rect(Dimensions::new(400, 300), Dimensions::new(300, 300));
/// assert_eq!((rect.x, rect.y, rect.width, rect.height), (50, 0, 300, 300));
/// ```
pub fn center_crop_rect(source: Dimensions, target: Dimensions) -> CropRect {
    let matched = crop_match(source, target);
    let (sw, sh) = (source.width, source.height);
    let (tw, th) = (target.width, target.height);

    let (grab_w, grab_h) = if matched.height {
        let grab_w = if matched.width {
            sw
        } else {
            // floor(oAR * sh)
            mul_div_floor(tw, sh, th)
        };
        (grab_w, sh)
    } else {
        // floor(sh / oAR)
        (sw, mul_div_floor(sh, th, tw))
    };

    let grab_w = grab_w.clamp(1, sw);
    let grab_h = grab_h.clamp(1, sh);

    CropRect {
        x: (sw - grab_w) / 2,
        y: (sh - grab_h) / 2,
        width: grab_w,
        height: grab_h,
    }
}
