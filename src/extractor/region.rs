//! Region structure for defining an extraction window
//!
//! Coordinates are in pixels with (0,0) at the top-left corner of the image.

/// Rectangular window in pixel coordinates
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Region {
    /// Column of the top-left corner
    pub x: u64,
    /// Row of the top-left corner
    pub y: u64,
    /// Width in pixels
    pub width: u64,
    /// Height in pixels
    pub height: u64,
}

impl Region {
    pub fn new(x: u64, y: u64, width: u64, height: u64) -> Self {
        Region { x, y, width, height }
    }

    /// Square window of side `size` centered on (col, row)
    ///
    /// Returns `None` when the window would start left of or above the image.
    pub fn centered(col: u64, row: u64, size: u64) -> Option<Self> {
        let half = size / 2;
        Some(Region::new(col.checked_sub(half)?, row.checked_sub(half)?, size, size))
    }

    /// Column just past the right edge (exclusive)
    pub fn end_x(&self) -> u64 {
        self.x + self.width
    }

    /// Row just past the bottom edge (exclusive)
    pub fn end_y(&self) -> u64 {
        self.y + self.height
    }

    /// Whether the window lies fully inside a `width` x `height` image
    pub fn fits_within(&self, width: u64, height: u64) -> bool {
        self.end_x() <= width && self.end_y() <= height
    }
}
