//! Coordinate Reference System handling

use std::fmt;

/// Identifier for common coordinate systems
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CoordinateSystem {
    /// WGS 84 (EPSG:4326)
    WGS84,
    /// Web Mercator (EPSG:3857)
    WebMercator,
    /// UTM zone on WGS84 (EPSG:326xx north, 327xx south)
    UTM { zone: u8, north: bool },
    /// Other EPSG code
    Other(u32),
}

impl CoordinateSystem {
    /// Get the EPSG code for this coordinate system
    pub fn epsg_code(&self) -> u32 {
        match self {
            CoordinateSystem::WGS84 => 4326,
            CoordinateSystem::WebMercator => 3857,
            CoordinateSystem::UTM { zone, north: true } => 32600 + *zone as u32,
            CoordinateSystem::UTM { zone, north: false } => 32700 + *zone as u32,
            CoordinateSystem::Other(code) => *code,
        }
    }

    /// Get a description of this coordinate system
    pub fn description(&self) -> String {
        match self {
            CoordinateSystem::WGS84 => "WGS 84 (EPSG:4326)".to_string(),
            CoordinateSystem::WebMercator => "Web Mercator (EPSG:3857)".to_string(),
            CoordinateSystem::UTM { zone, north } => format!(
                "WGS 84 / UTM zone {}{} (EPSG:{})",
                zone, if *north { "N" } else { "S" }, self.epsg_code()
            ),
            CoordinateSystem::Other(code) => format!("EPSG:{}", code),
        }
    }
}

impl fmt::Display for CoordinateSystem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.description())
    }
}

/// Factory for creating coordinate systems
pub struct CoordinateSystemFactory;

impl CoordinateSystemFactory {
    /// Create a coordinate system from an EPSG code
    pub fn from_epsg(epsg: u32) -> CoordinateSystem {
        match epsg {
            4326 => CoordinateSystem::WGS84,
            3857 => CoordinateSystem::WebMercator,
            32601..=32660 => CoordinateSystem::UTM { zone: (epsg - 32600) as u8, north: true },
            32701..=32760 => CoordinateSystem::UTM { zone: (epsg - 32700) as u8, north: false },
            _ => CoordinateSystem::Other(epsg),
        }
    }
}
