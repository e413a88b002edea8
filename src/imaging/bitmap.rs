//! In-memory decoded image.

use image::{ColorType, DynamicImage};
use std::fmt;

/// Width and height of an image in pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub struct Dimensions {
    pub width: u32,
    pub height: u32,
}

impl Dimensions {
    pub fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    pub fn area(self) -> u64 {
        self.width as u64 * self.height as u64
    }

    pub fn as_tuple(self) -> (u32, u32) {
        (self.width, self.height)
    }
}

impl From<(u32, u32)> for Dimensions {
    fn from((width, height): (u32, u32)) -> Self {
        Self { width, height }
    }
}

impl fmt::Display for Dimensions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{}", self.width, self.height)
    }
}

/// A decoded pixel grid with a non-zero area.
///
/// Created only by decoding or resizing, never mutated afterwards. Not
/// `Clone`: every bitmap in a session has exactly one owner.
pub struct Bitmap {
    image: DynamicImage,
}

impl Bitmap {
    /// Wrap a decoded image. Returns `None` for a zero-area image.
    pub fn new(image: DynamicImage) -> Option<Self> {
        if image.width() == 0 || image.height() == 0 {
            return None;
        }
        Some(Self { image })
    }

    pub fn width(&self) -> u32 {
        self.image.width()
    }

    pub fn height(&self) -> u32 {
        self.image.height()
    }

    pub fn dimensions(&self) -> Dimensions {
        Dimensions::new(self.width(), self.height())
    }

    /// Pixel format of the underlying buffer.
    pub fn color_type(&self) -> ColorType {
        self.image.color()
    }

    pub fn as_image(&self) -> &DynamicImage {
        &self.image
    }

    /// Raw pixel bytes, row-major.
    pub fn as_bytes(&self) -> &[u8] {
        self.image.as_bytes()
    }
}

impl fmt::Debug for Bitmap {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Bitmap")
            .field("dimensions", &self.dimensions())
            .field("color_type", &self.color_type())
            .finish()
    }
}
