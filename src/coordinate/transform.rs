//! Projection of WGS84 coordinates into raster coordinate systems

use super::point::{Coordinate, Point};
use super::crs::CoordinateSystem;
use crate::errors::CoordinateError;
use std::f64::consts::PI;

/// WGS84 semi-major axis in meters
const SEMI_MAJOR_AXIS: f64 = 6378137.0;
/// WGS84 flattening
const FLATTENING: f64 = 1.0 / 298.257223563;
/// UTM scale factor on the central meridian
const UTM_SCALE_FACTOR: f64 = 0.9996;
const UTM_FALSE_EASTING: f64 = 500_000.0;
const UTM_FALSE_NORTHING_SOUTH: f64 = 10_000_000.0;
/// Latitude limit of the Web Mercator square
const WEB_MERCATOR_MAX_LAT: f64 = 85.051_128_779_806_59;

/// Transformer for converting geographic coordinates into projected systems
pub struct CoordinateTransformer;

impl CoordinateTransformer {
    /// Convert from WGS84 (EPSG:4326) to Web Mercator (EPSG:3857)
    pub fn wgs84_to_web_mercator(&self, lon: f64, lat: f64) -> Point {
        let lat = lat.clamp(-WEB_MERCATOR_MAX_LAT, WEB_MERCATOR_MAX_LAT);

        let x = lon * SEMI_MAJOR_AXIS * PI / 180.0;
        let y = f64::ln(f64::tan((90.0 + lat) * PI / 360.0)) * SEMI_MAJOR_AXIS;

        Point::new(x, y)
    }

    /// Convert from WGS84 to a UTM zone (transverse Mercator series, Snyder 1987)
    pub fn wgs84_to_utm(&self, lon: f64, lat: f64, zone: u8, north: bool) -> Point {
        let e2 = FLATTENING * (2.0 - FLATTENING);
        let e4 = e2 * e2;
        let e6 = e4 * e2;
        let ep2 = e2 / (1.0 - e2);

        let phi = lat.to_radians();
        let central_meridian = ((zone as f64 - 1.0) * 6.0 - 180.0 + 3.0).to_radians();
        let (sin_phi, cos_phi, tan_phi) = (phi.sin(), phi.cos(), phi.tan());

        let n = SEMI_MAJOR_AXIS / (1.0 - e2 * sin_phi * sin_phi).sqrt();
        let t = tan_phi * tan_phi;
        let c = ep2 * cos_phi * cos_phi;
        let a = cos_phi * (lon.to_radians() - central_meridian);

        let m = SEMI_MAJOR_AXIS * (
            (1.0 - e2 / 4.0 - 3.0 * e4 / 64.0 - 5.0 * e6 / 256.0) * phi
                - (3.0 * e2 / 8.0 + 3.0 * e4 / 32.0 + 45.0 * e6 / 1024.0) * (2.0 * phi).sin()
                + (15.0 * e4 / 256.0 + 45.0 * e6 / 1024.0) * (4.0 * phi).sin()
                - (35.0 * e6 / 3072.0) * (6.0 * phi).sin()
        );

        let x = UTM_SCALE_FACTOR * n * (
            a + (1.0 - t + c) * a.powi(3) / 6.0
                + (5.0 - 18.0 * t + t * t + 72.0 * c - 58.0 * ep2) * a.powi(5) / 120.0
        ) + UTM_FALSE_EASTING;

        let mut y = UTM_SCALE_FACTOR * (
            m + n * tan_phi * (
                a * a / 2.0
                    + (5.0 - t + 9.0 * c + 4.0 * c * c) * a.powi(4) / 24.0
                    + (61.0 - 58.0 * t + t * t + 600.0 * c - 330.0 * ep2) * a.powi(6) / 720.0
            )
        );
        if !north {
            y += UTM_FALSE_NORTHING_SOUTH;
        }

        Point::new(x, y)
    }

    /// Project a coordinate into the given coordinate system
    pub fn project(&self, coordinate: &Coordinate, target: &CoordinateSystem) -> Result<Point, CoordinateError> {
        let (lon, lat) = (coordinate.longitude(), coordinate.latitude());
        match target {
            CoordinateSystem::WGS84 => Ok(coordinate.to_point()),
            CoordinateSystem::WebMercator => Ok(self.wgs84_to_web_mercator(lon, lat)),
            CoordinateSystem::UTM { zone, north } => Ok(self.wgs84_to_utm(lon, lat, *zone, *north)),
            CoordinateSystem::Other(code) => Err(CoordinateError::UnsupportedCrs(*code)),
        }
    }
}
