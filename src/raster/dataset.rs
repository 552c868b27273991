//! Raster dataset contract

use crate::coordinate::{CoordinateSystem, GeoTransform};
use crate::extractor::Region;
use crate::tiff::errors::TiffResult;

use super::metadata::SceneMetadata;
use super::sample::PixelValue;

/// A single-band georeferenced raster with block-readable pixel access
pub trait RasterDataset {
    /// Width and height in pixels
    fn dimensions(&self) -> (u64, u64);

    /// Pixel-corner affine transform, if the raster is georeferenced
    fn geo_transform(&self) -> Option<GeoTransform>;

    /// Coordinate system the transform is expressed in
    fn coordinate_system(&self) -> Option<CoordinateSystem>;

    /// Band identifier (e.g. `SR_B4`)
    fn band(&self) -> &str;

    /// Read a window row-major in the raster's native sample type.
    /// Implementations never pad: an incompletely decoded window is an error.
    fn read_window(&mut self, region: Region) -> TiffResult<Vec<PixelValue>>;

    fn scene_metadata(&self) -> SceneMetadata;
}
