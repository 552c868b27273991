//! GeoTIFF georeferencing
//!
//! Reads the GeoKey directory plus the model tags of an IFD and turns them
//! into a `GeoInfo`: the raster's coordinate system and its affine transform.

use log::debug;

use crate::coordinate::{CoordinateSystem, CoordinateSystemFactory, GeoTransform};
use crate::io::seekable::SeekableReader;
use crate::tiff::constants::{epsg, geo_keys, raster_type, tags};
use crate::tiff::errors::{TiffError, TiffResult};
use crate::tiff::ifd::IFD;
use crate::tiff::reader::TiffReader;

/// One entry of the GeoKey directory
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GeoKeyEntry {
    pub key_id: u16,
    /// 0 when the value is stored in `value_offset` itself
    pub tiff_tag_location: u16,
    pub count: u16,
    pub value_offset: u16,
}

impl GeoKeyEntry {
    pub fn new(key_id: u16, tiff_tag_location: u16, count: u16, value_offset: u16) -> Self {
        GeoKeyEntry { key_id, tiff_tag_location, count, value_offset }
    }

    /// The key's value when it is stored inline
    pub fn inline_value(&self) -> Option<u16> {
        (self.tiff_tag_location == 0).then_some(self.value_offset)
    }
}

/// Get a readable name for a GeoKey
pub fn get_key_name(key_id: u16) -> &'static str {
    match key_id {
        geo_keys::MODEL_TYPE => "GTModelTypeGeoKey",
        geo_keys::RASTER_TYPE => "GTRasterTypeGeoKey",
        geo_keys::GEOGRAPHIC_TYPE => "GeographicTypeGeoKey",
        geo_keys::PROJECTED_CS_TYPE => "ProjectedCSTypeGeoKey",
        _ => "Unknown",
    }
}

/// Georeferencing extracted from a GeoTIFF IFD
#[derive(Debug, Clone, PartialEq)]
pub struct GeoInfo {
    /// EPSG code of the raster CRS, if the GeoKeys declare one
    pub epsg_code: Option<u32>,
    /// GTRasterTypeGeoKey (PixelIsArea when absent)
    pub raster_type: u16,
    /// Pixel-corner based transform, if the model tags are present
    pub geo_transform: Option<GeoTransform>,
}

impl GeoInfo {
    pub fn coordinate_system(&self) -> Option<CoordinateSystem> {
        self.epsg_code.map(CoordinateSystemFactory::from_epsg)
    }

    pub fn is_georeferenced(&self) -> bool {
        self.epsg_code.is_some() && self.geo_transform.is_some()
    }
}

/// Parser for GeoTIFF geographic metadata
pub struct GeoKeyParser;

impl GeoKeyParser {
    /// Parse the GeoKey directory of an IFD
    ///
    /// The directory is a SHORT array: a 4-value header (version, revision,
    /// minor revision, key count) followed by 4 values per key.
    pub fn parse_geo_key_directory(
        tiff_reader: &TiffReader,
        reader: &mut dyn SeekableReader,
        ifd: &IFD,
    ) -> TiffResult<Vec<GeoKeyEntry>> {
        if !ifd.has_tag(tags::GEO_KEY_DIRECTORY_TAG) {
            return Ok(Vec::new());
        }

        let values = tiff_reader.read_tag_values(reader, ifd, tags::GEO_KEY_DIRECTORY_TAG)?;
        if values.len() < 4 {
            return Err(TiffError::GenericError("Invalid GeoKey directory header".to_string()));
        }

        let num_keys = values[3] as usize;
        debug!("GeoKey directory: version={}, revision={}.{}, keys={}",
               values[0], values[1], values[2], num_keys);

        let keys: Vec<GeoKeyEntry> = values[4..]
            .chunks_exact(4)
            .take(num_keys)
            .map(|k| GeoKeyEntry::new(k[0] as u16, k[1] as u16, k[2] as u16, k[3] as u16))
            .collect();

        if keys.len() < num_keys {
            return Err(TiffError::GenericError(format!(
                "GeoKey directory declares {} keys but holds {}", num_keys, keys.len()
            )));
        }

        for key in &keys {
            debug!("GeoKey: id={} ({}), location={}, count={}, value={}",
                   key.key_id, get_key_name(key.key_id), key.tiff_tag_location, key.count, key.value_offset);
        }

        Ok(keys)
    }

    /// Extract the CRS and geotransform of an IFD
    pub fn extract_geo_info(
        tiff_reader: &TiffReader,
        reader: &mut dyn SeekableReader,
        ifd: &IFD,
    ) -> TiffResult<GeoInfo> {
        let keys = Self::parse_geo_key_directory(tiff_reader, reader, ifd)?;
        let key_value = |id: u16| keys.iter().find(|k| k.key_id == id).and_then(|k| k.inline_value());

        let declared = |code: Option<u16>| code.filter(|c| *c != 0 && *c != epsg::USER_DEFINED);
        let epsg_code = declared(key_value(geo_keys::PROJECTED_CS_TYPE))
            .or_else(|| declared(key_value(geo_keys::GEOGRAPHIC_TYPE)))
            .map(u32::from);

        let raster_type = key_value(geo_keys::RASTER_TYPE).unwrap_or(raster_type::PIXEL_IS_AREA);

        let mut geo_transform = if ifd.has_tag(tags::MODEL_TRANSFORMATION_TAG) {
            let matrix = tiff_reader.read_tag_doubles(reader, ifd, tags::MODEL_TRANSFORMATION_TAG)?;
            GeoTransform::from_model_transformation(&matrix)
        } else if ifd.has_tag(tags::MODEL_PIXEL_SCALE_TAG) && ifd.has_tag(tags::MODEL_TIEPOINT_TAG) {
            let scale = tiff_reader.read_tag_doubles(reader, ifd, tags::MODEL_PIXEL_SCALE_TAG)?;
            let tiepoint = tiff_reader.read_tag_doubles(reader, ifd, tags::MODEL_TIEPOINT_TAG)?;
            GeoTransform::from_scale_and_tiepoint(&scale, &tiepoint)
        } else {
            None
        };

        if raster_type == raster_type::PIXEL_IS_POINT {
            geo_transform = geo_transform.map(|gt| gt.shifted_to_pixel_corner());
        }

        debug!("GeoInfo: epsg={:?}, raster_type={}, transform={:?}", epsg_code, raster_type, geo_transform);

        Ok(GeoInfo { epsg_code, raster_type, geo_transform })
    }
}
