//! Coordinate handling for geospatial data
//!
//! Validated geographic input (`Coordinate`), projected points, the raster
//! coordinate systems we can project into, and the affine geotransform that
//! maps projected coordinates to pixel indices.

mod point;
mod transform;
mod crs;
mod geotransform;

pub use self::point::{Coordinate, Point};
pub use self::transform::CoordinateTransformer;
pub use self::crs::{CoordinateSystem, CoordinateSystemFactory};
pub use self::geotransform::GeoTransform;
