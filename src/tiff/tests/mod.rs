//! Tests for TIFF parsing and GeoTIFF-backed raster access

pub(crate) mod test_utils;

mod geotiff_tests;
