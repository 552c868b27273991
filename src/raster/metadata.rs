//! Scene-level metadata: cloud cover and acquisition date
//!
//! Sources, in order of preference: the GDAL metadata tag embedded in the
//! GeoTIFF, a Landsat MTL XML sidecar next to the band file, and finally the
//! acquisition date encoded in the Landsat scene identifier.

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use chrono::NaiveDate;
use lazy_static::lazy_static;
use log::{debug, warn};
use quick_xml::events::Event;
use quick_xml::Reader;
use regex::Regex;

const CLOUD_COVER_KEY: &str = "CLOUD_COVER";
const DATE_ACQUIRED_KEY: &str = "DATE_ACQUIRED";

lazy_static! {
    /// Collection display id, e.g. LC08_L2SP_044034_20240615_20240621_02_T1
    static ref DISPLAY_ID: Regex =
        Regex::new(r"L[COTEM]0\d_L\d[A-Z]{2}_\d{6}_(\d{8})_\d{8}_\d{2}_[A-Z0-9]{2}").unwrap();
    /// Entity id, e.g. LC80440342024167LGN00 (year + day of year)
    static ref ENTITY_ID: Regex =
        Regex::new(r"L[COTEM]\d\d{6}(\d{4})(\d{3})[A-Z]{3}\d{2}").unwrap();
}

/// Metadata describing the whole scene rather than a pixel
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SceneMetadata {
    pub cloud_cover: Option<f64>,
    pub acquisition_date: Option<NaiveDate>,
}

impl SceneMetadata {
    /// Build from XML leaf values keyed by name
    fn from_fields(fields: &HashMap<String, String>) -> Self {
        let cloud_cover = fields.get(CLOUD_COVER_KEY)
            .and_then(|v| v.trim().parse::<f64>().ok())
            .filter(|v| (0.0..=100.0).contains(v));
        let acquisition_date = fields.get(DATE_ACQUIRED_KEY)
            .and_then(|v| NaiveDate::parse_from_str(v.trim().get(..10).unwrap_or(v), "%Y-%m-%d").ok());
        SceneMetadata { cloud_cover, acquisition_date }
    }

    /// Parse the XML stored in the GDAL_METADATA tag (`<Item name="...">` entries)
    pub fn from_gdal_metadata(xml: &str) -> Self {
        Self::from_fields(&collect_xml_fields(xml))
    }

    /// Parse a Landsat MTL XML document
    pub fn from_mtl_xml(xml: &str) -> Self {
        Self::from_fields(&collect_xml_fields(xml))
    }

    /// Acquisition date encoded in a Landsat display id or entity id
    pub fn from_scene_id(scene_id: &str) -> Self {
        let acquisition_date = if let Some(caps) = DISPLAY_ID.captures(scene_id) {
            NaiveDate::parse_from_str(&caps[1], "%Y%m%d").ok()
        } else if let Some(caps) = ENTITY_ID.captures(scene_id) {
            let year = caps[1].parse::<i32>().ok();
            let day = caps[2].parse::<u32>().ok();
            year.zip(day).and_then(|(y, d)| NaiveDate::from_yo_opt(y, d))
        } else {
            None
        };
        SceneMetadata { cloud_cover: None, acquisition_date }
    }

    /// Fill fields still missing here from `other`
    pub fn or(self, other: SceneMetadata) -> Self {
        SceneMetadata {
            cloud_cover: self.cloud_cover.or(other.cloud_cover),
            acquisition_date: self.acquisition_date.or(other.acquisition_date),
        }
    }

    pub fn is_complete(&self) -> bool {
        self.cloud_cover.is_some() && self.acquisition_date.is_some()
    }
}

/// Candidate MTL sidecar paths for a band file
///
/// `LC08_..._T1_SR_B4.TIF` pairs with `LC08_..._T1_MTL.xml`; a cached
/// `{scene}_{band}.TIF` pairs with `{scene}_MTL.xml`.
pub fn mtl_sidecar_paths(band_path: &Path, band: &str) -> Vec<PathBuf> {
    let Some(stem) = band_path.file_stem().and_then(|s| s.to_str()) else {
        return Vec::new();
    };
    let dir = band_path.parent().unwrap_or_else(|| Path::new("."));

    let mut candidates = Vec::new();
    if let Some(scene) = stem.strip_suffix(&format!("_{}", band)) {
        candidates.push(dir.join(format!("{}_MTL.xml", scene)));
    }
    if let Some(display_id) = DISPLAY_ID.find(stem) {
        let path = dir.join(format!("{}_MTL.xml", display_id.as_str()));
        if !candidates.contains(&path) {
            candidates.push(path);
        }
    }
    candidates
}

/// Read the first MTL sidecar that exists next to `band_path`
pub fn read_mtl_sidecar(band_path: &Path, band: &str) -> Option<SceneMetadata> {
    for candidate in mtl_sidecar_paths(band_path, band) {
        if !candidate.is_file() {
            continue;
        }
        match fs::read_to_string(&candidate) {
            Ok(xml) => {
                debug!("Reading scene metadata from {}", candidate.display());
                return Some(SceneMetadata::from_mtl_xml(&xml));
            }
            Err(e) => warn!("Cannot read MTL sidecar {}: {}", candidate.display(), e),
        }
    }
    None
}

/// Collect the text of XML leaf elements keyed by element name, or by the
/// `name` attribute for GDAL `<Item>` elements. The first occurrence wins.
fn collect_xml_fields(xml: &str) -> HashMap<String, String> {
    let mut reader = Reader::from_str(xml);
    reader.config_mut().trim_text(true);

    let mut fields = HashMap::new();
    let mut current: Option<String> = None;

    loop {
        match reader.read_event() {
            Ok(Event::Start(e)) => {
                let tag = String::from_utf8_lossy(e.local_name().as_ref()).to_string();
                current = if tag == "Item" {
                    e.attributes()
                        .flatten()
                        .find(|a| a.key.as_ref() == b"name")
                        .and_then(|a| a.unescape_value().ok().map(|v| v.to_string()))
                } else {
                    Some(tag)
                };
            }
            Ok(Event::Text(t)) => {
                if let (Some(key), Ok(text)) = (current.as_ref(), t.unescape()) {
                    fields.entry(key.clone()).or_insert_with(|| text.to_string());
                }
            }
            Ok(Event::End(_)) => current = None,
            Ok(Event::Eof) => break,
            Err(e) => {
                warn!("Malformed metadata XML at position {}: {}", reader.buffer_position(), e);
                break;
            }
            Ok(_) => {}
        }
    }

    fields
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn gdal_metadata_items() {
        let xml = r#"<GDALMetadata>
  <Item name="CLOUD_COVER">12.5</Item>
  <Item name="DATE_ACQUIRED">2024-06-01</Item>
  <Item name="SCALE" sample="0">0.0000275</Item>
</GDALMetadata>"#;
        let metadata = SceneMetadata::from_gdal_metadata(xml);
        assert_eq!(metadata.cloud_cover, Some(12.5));
        assert_eq!(metadata.acquisition_date, NaiveDate::from_ymd_opt(2024, 6, 1));
        assert!(metadata.is_complete());
    }

    #[test]
    fn mtl_document_with_unknown_cloud_cover() {
        let xml = r#"<?xml version="1.0"?>
<LANDSAT_METADATA_FILE>
  <IMAGE_ATTRIBUTES>
    <CLOUD_COVER>-1</CLOUD_COVER>
    <DATE_ACQUIRED>2024-05-20</DATE_ACQUIRED>
  </IMAGE_ATTRIBUTES>
</LANDSAT_METADATA_FILE>"#;
        let metadata = SceneMetadata::from_mtl_xml(xml);
        assert_eq!(metadata.cloud_cover, None);
        assert_eq!(metadata.acquisition_date, NaiveDate::from_ymd_opt(2024, 5, 20));
    }

    #[test]
    fn dates_from_scene_identifiers() {
        let display = SceneMetadata::from_scene_id("LC08_L2SP_044034_20240615_20240621_02_T1");
        assert_eq!(display.acquisition_date, NaiveDate::from_ymd_opt(2024, 6, 15));

        let entity = SceneMetadata::from_scene_id("LC80440342024167LGN00");
        assert_eq!(entity.acquisition_date, NaiveDate::from_ymd_opt(2024, 6, 15));

        assert_eq!(SceneMetadata::from_scene_id("LC08_001").acquisition_date, None);
    }

    #[test]
    fn earlier_source_wins() {
        let embedded = SceneMetadata { cloud_cover: Some(3.0), acquisition_date: None };
        let fallback = SceneMetadata { cloud_cover: Some(50.0), acquisition_date: NaiveDate::from_ymd_opt(2024, 1, 2) };
        let merged = embedded.or(fallback);
        assert_eq!(merged.cloud_cover, Some(3.0));
        assert_eq!(merged.acquisition_date, NaiveDate::from_ymd_opt(2024, 1, 2));
    }

    #[test]
    fn sidecar_found_next_to_cached_band() {
        let dir = tempfile::tempdir().unwrap();
        let band = dir.path().join("LC08_001_SR_B4.TIF");
        std::fs::write(dir.path().join("LC08_001_MTL.xml"),
                       "<LANDSAT_METADATA_FILE><CLOUD_COVER>7.25</CLOUD_COVER></LANDSAT_METADATA_FILE>").unwrap();

        let metadata = read_mtl_sidecar(&band, "SR_B4").unwrap();
        assert_eq!(metadata.cloud_cover, Some(7.25));
    }

    #[test]
    fn sidecar_candidates_for_collection_file_name() {
        let band = Path::new("/data/LC08_L2SP_044034_20240615_20240621_02_T1_SR_B4.TIF");
        let candidates = mtl_sidecar_paths(band, "SR_B4");
        assert_eq!(candidates, vec![PathBuf::from("/data/LC08_L2SP_044034_20240615_20240621_02_T1_MTL.xml")]);
    }
}
