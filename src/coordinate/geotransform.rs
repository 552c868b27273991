//! Affine geotransform between pixel and model space
//!
//! Coefficients follow the usual six-term layout:
//! `x = c[0] + col * c[1] + row * c[2]` and `y = c[3] + col * c[4] + row * c[5]`,
//! where (col, row) address the top-left corner of a pixel.

/// Six-coefficient affine transform
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GeoTransform(pub [f64; 6]);

impl GeoTransform {
    /// Builds the transform from ModelPixelScale and the first ModelTiepoint
    pub fn from_scale_and_tiepoint(scale: &[f64], tiepoint: &[f64]) -> Option<Self> {
        if scale.len() < 2 || tiepoint.len() < 6 || scale[0] == 0.0 || scale[1] == 0.0 {
            return None;
        }
        let (i, j) = (tiepoint[0], tiepoint[1]);
        let (x, y) = (tiepoint[3], tiepoint[4]);
        let (sx, sy) = (scale[0], scale[1]);

        Some(GeoTransform([x - i * sx, sx, 0.0, y + j * sy, 0.0, -sy]))
    }

    /// Builds the transform from a 4x4 row-major ModelTransformation matrix
    pub fn from_model_transformation(matrix: &[f64]) -> Option<Self> {
        if matrix.len() < 16 {
            return None;
        }
        Some(GeoTransform([matrix[3], matrix[0], matrix[1], matrix[7], matrix[4], matrix[5]]))
    }

    /// Moves the origin from a pixel center to its top-left corner (PixelIsPoint rasters)
    pub fn shifted_to_pixel_corner(&self) -> Self {
        let c = self.0;
        GeoTransform([
            c[0] - 0.5 * c[1] - 0.5 * c[2],
            c[1],
            c[2],
            c[3] - 0.5 * c[4] - 0.5 * c[5],
            c[4],
            c[5],
        ])
    }

    /// Pixel (col, row) to model (x, y)
    pub fn apply(&self, col: f64, row: f64) -> (f64, f64) {
        let c = self.0;
        (c[0] + col * c[1] + row * c[2], c[3] + col * c[4] + row * c[5])
    }

    /// Model (x, y) to fractional pixel (col, row); `None` for a singular transform
    pub fn invert(&self, x: f64, y: f64) -> Option<(f64, f64)> {
        let c = self.0;
        let det = c[1] * c[5] - c[2] * c[4];
        if det == 0.0 || !det.is_finite() {
            return None;
        }
        let (dx, dy) = (x - c[0], y - c[3]);
        let col = (c[5] * dx - c[2] * dy) / det;
        let row = (-c[4] * dx + c[1] * dy) / det;
        Some((col, row))
    }

    pub fn pixel_width(&self) -> f64 {
        self.0[1]
    }

    pub fn pixel_height(&self) -> f64 {
        self.0[5]
    }
}
