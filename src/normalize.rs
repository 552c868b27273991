//! Result normalization
//!
//! Flattens an `ExtractionResult` into the record shape handed to persistence,
//! re-checking the grid invariants on the way. Unit conversion from raw sensor
//! counts happens here and nowhere else.

use std::fmt;

use serde::de::{self, Deserializer, Visitor};
use serde::{Deserialize, Serialize, Serializer};

use crate::errors::InternalConsistencyError;
use crate::extractor::{center_index, ExtractionResult};
use crate::raster::PixelValue;

const UNKNOWN: &str = "unknown";

/// Cloud cover that is always present in a record: a percentage or `"unknown"`
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum CloudCover {
    Known(f64),
    Unknown,
}

impl CloudCover {
    pub fn as_option(&self) -> Option<f64> {
        match *self {
            CloudCover::Known(value) => Some(value),
            CloudCover::Unknown => None,
        }
    }
}

impl From<Option<f64>> for CloudCover {
    fn from(value: Option<f64>) -> Self {
        value.map_or(CloudCover::Unknown, CloudCover::Known)
    }
}

impl fmt::Display for CloudCover {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CloudCover::Known(value) => write!(f, "{}", value),
            CloudCover::Unknown => f.write_str(UNKNOWN),
        }
    }
}

impl Serialize for CloudCover {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match *self {
            CloudCover::Known(value) => serializer.serialize_f64(value),
            CloudCover::Unknown => serializer.serialize_str(UNKNOWN),
        }
    }
}

impl<'de> Deserialize<'de> for CloudCover {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct CloudCoverVisitor;

        impl<'de> Visitor<'de> for CloudCoverVisitor {
            type Value = CloudCover;

            fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
                write!(f, "a percentage or \"{}\"", UNKNOWN)
            }

            fn visit_f64<E: de::Error>(self, v: f64) -> Result<CloudCover, E> {
                Ok(CloudCover::Known(v))
            }

            fn visit_u64<E: de::Error>(self, v: u64) -> Result<CloudCover, E> {
                Ok(CloudCover::Known(v as f64))
            }

            fn visit_i64<E: de::Error>(self, v: i64) -> Result<CloudCover, E> {
                Ok(CloudCover::Known(v as f64))
            }

            fn visit_str<E: de::Error>(self, v: &str) -> Result<CloudCover, E> {
                if v == UNKNOWN {
                    Ok(CloudCover::Unknown)
                } else {
                    Err(E::invalid_value(de::Unexpected::Str(v), &self))
                }
            }

            fn visit_unit<E: de::Error>(self) -> Result<CloudCover, E> {
                Ok(CloudCover::Unknown)
            }
        }

        deserializer.deserialize_any(CloudCoverVisitor)
    }
}

/// Linear conversion `raw * scale + offset`
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Rescale {
    pub scale: f64,
    pub offset: f64,
}

impl Rescale {
    /// Collection 2 Level-2 surface reflectance
    pub const LANDSAT_C2_L2_REFLECTANCE: Rescale = Rescale { scale: 0.0000275, offset: -0.2 };

    pub fn apply(&self, raw: f64) -> f64 {
        raw * self.scale + self.offset
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NormalizedPixel {
    pub position: usize,
    /// Raw value, rescaled when the normalizer has a `Rescale`
    pub value: f64,
    pub raw_value: PixelValue,
    pub is_center: bool,
}

/// The persistence-ready form of one extraction
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PersistableRecord {
    pub scene_id: String,
    pub latitude: f64,
    pub longitude: f64,
    pub cloud_cover: CloudCover,
    /// `YYYY-MM-DD` or `"unknown"`
    pub acquisition_date: String,
    pub band: String,
    pub neighborhood_size: usize,
    pub pixels: Vec<NormalizedPixel>,
}

impl PersistableRecord {
    pub fn center_pixel(&self) -> Option<&NormalizedPixel> {
        self.pixels.iter().find(|p| p.is_center)
    }
}

pub struct ResultNormalizer {
    neighborhood_size: usize,
    rescale: Option<Rescale>,
}

impl ResultNormalizer {
    pub fn new(neighborhood_size: usize, rescale: Option<Rescale>) -> Self {
        ResultNormalizer { neighborhood_size, rescale }
    }

    /// Flatten and check an extraction. Fails only when the grid contract is broken.
    pub fn normalize(&self, result: &ExtractionResult) -> Result<PersistableRecord, InternalConsistencyError> {
        let size = self.neighborhood_size;
        if size == 0 || size % 2 == 0 {
            return Err(InternalConsistencyError::NeighborhoodSize(size));
        }

        let expected = size * size;
        if result.grid.len() != expected {
            return Err(InternalConsistencyError::GridLength { expected, actual: result.grid.len() });
        }

        let center = center_index(size);
        let mut pixels = Vec::with_capacity(expected);
        for (index, sample) in result.grid.iter().enumerate() {
            if sample.position != index {
                return Err(InternalConsistencyError::Position { index, position: sample.position });
            }
            if sample.is_center != (index == center) {
                return Err(InternalConsistencyError::CenterFlag { position: index, flag: sample.is_center });
            }

            let raw = sample.value.as_f64();
            pixels.push(NormalizedPixel {
                position: index,
                value: self.rescale.map_or(raw, |r| r.apply(raw)),
                raw_value: sample.value,
                is_center: sample.is_center,
            });
        }

        let metadata = &result.metadata;
        Ok(PersistableRecord {
            scene_id: metadata.scene_id.clone(),
            latitude: metadata.coordinate.latitude(),
            longitude: metadata.coordinate.longitude(),
            cloud_cover: metadata.cloud_cover.into(),
            acquisition_date: metadata.acquisition_date
                .map(|d| d.format("%Y-%m-%d").to_string())
                .unwrap_or_else(|| UNKNOWN.to_string()),
            band: result.grid.first().map(|s| s.band.clone()).unwrap_or_default(),
            neighborhood_size: size,
            pixels,
        })
    }
}
