//! GeoTIFF georeferencing and the band dataset built on it

extern crate std;

use std::fs;

use approx::assert_abs_diff_eq;
use chrono::NaiveDate;

use super::test_utils::{TestGeo, TestTiff};
use crate::coordinate::{Coordinate, CoordinateSystem};
use crate::errors::ExtractionErrorKind;
use crate::extractor::{extract_neighborhood, locate_pixel};
use crate::raster::{GeoTiffDataset, PixelValue, RasterDataset};
use crate::tiff::constants::sample_format;

fn los_angeles() -> Coordinate {
    Coordinate::new(34.05, -118.25).unwrap()
}

#[test]
fn test_geographic_dataset() {
    let tiff = TestTiff::new(10, 10).geo(TestGeo::geographic(-119.0, 34.5, 0.1));
    let mut dataset = GeoTiffDataset::from_reader(tiff.cursor(), "SR_B4").unwrap();

    std::assert_eq!(dataset.dimensions(), (10, 10));
    std::assert_eq!(dataset.coordinate_system(), Some(CoordinateSystem::WGS84));
    std::assert!(dataset.geo_info().is_georeferenced());

    let result = extract_neighborhood(&mut dataset, "LC80410362024167LGN00", los_angeles(), 3).unwrap();
    std::assert_eq!(result.metadata.pixel, (7, 4));
    let values: Vec<PixelValue> = result.grid.iter().map(|s| s.value).collect();
    let expected: Vec<PixelValue> = [36u64, 37, 38, 46, 47, 48, 56, 57, 58].iter().map(|v| PixelValue::Unsigned(*v)).collect();
    std::assert_eq!(values, expected);
    std::assert_eq!(result.center().map(|s| s.band.as_str()), Some("SR_B4"));
}

#[test]
fn test_utm_dataset_projects_the_coordinate() {
    let tiff = TestTiff::new(40, 40)
        .tiles(16, 16)
        .geo(TestGeo::projected(32611, 384_000.0, 3_769_000.0, 30.0));
    let mut dataset = GeoTiffDataset::from_reader(tiff.cursor(), "SR_B4").unwrap();

    std::assert_eq!(dataset.coordinate_system(), Some(CoordinateSystem::UTM { zone: 11, north: true }));
    std::assert_eq!(locate_pixel(&dataset, &los_angeles()).unwrap(), (20, 19));

    let result = extract_neighborhood(&mut dataset, "scene", los_angeles(), 5).unwrap();
    std::assert_eq!(result.center().map(|s| s.value), Some(PixelValue::Unsigned(19 * 40 + 20)));
}

#[test]
fn test_pixel_is_point_moves_origin_to_corner() {
    let mut geo = TestGeo::geographic(-119.0, 34.5, 0.1);
    geo.pixel_is_point = true;
    let dataset = GeoTiffDataset::from_reader(TestTiff::new(4, 4).geo(geo).cursor(), "SR_B4").unwrap();

    let transform = dataset.geo_transform().unwrap();
    assert_abs_diff_eq!(transform.0[0], -119.05, epsilon = 1e-9);
    assert_abs_diff_eq!(transform.0[3], 34.55, epsilon = 1e-9);
}

#[test]
fn test_unknown_projection_is_unsupported() {
    let tiff = TestTiff::new(10, 10).geo(TestGeo::projected(2154, 650_000.0, 6_860_000.0, 30.0));
    let dataset = GeoTiffDataset::from_reader(tiff.cursor(), "SR_B4").unwrap();

    std::assert!(matches!(
        locate_pixel(&dataset, &los_angeles()),
        Err(ExtractionErrorKind::Unsupported(_))
    ));
}

#[test]
fn test_missing_georeferencing() {
    let mut dataset = GeoTiffDataset::from_reader(TestTiff::new(10, 10).cursor(), "SR_B4").unwrap();
    std::assert!(!dataset.geo_info().is_georeferenced());
    std::assert!(extract_neighborhood(&mut dataset, "scene", los_angeles(), 3).is_err());
}

#[test]
fn test_embedded_gdal_metadata() {
    let xml = "<GDALMetadata>\
        <Item name=\"CLOUD_COVER\">4.20</Item>\
        <Item name=\"DATE_ACQUIRED\">2024-06-15</Item>\
        </GDALMetadata>";
    let tiff = TestTiff::new(4, 4)
        .sample(32, sample_format::IEEEFP)
        .geo(TestGeo::geographic(-119.0, 34.5, 0.1))
        .gdal_metadata(xml);
    let dataset = GeoTiffDataset::from_reader(tiff.cursor(), "ST_B10").unwrap();

    let metadata = dataset.scene_metadata();
    std::assert_eq!(metadata.cloud_cover, Some(4.2));
    std::assert_eq!(metadata.acquisition_date, NaiveDate::from_ymd_opt(2024, 6, 15));
    std::assert_eq!(dataset.band(), "ST_B10");
}

#[test]
fn test_open_reads_mtl_sidecar() {
    let dir = tempfile::tempdir().unwrap();
    let band = dir.path().join("LC80410362024167LGN00_SR_B4.TIF");
    fs::write(&band, TestTiff::new(4, 4).geo(TestGeo::geographic(-119.0, 34.5, 0.1)).build()).unwrap();
    fs::write(
        dir.path().join("LC80410362024167LGN00_MTL.xml"),
        "<LANDSAT_METADATA_FILE><IMAGE_ATTRIBUTES>\
         <CLOUD_COVER>12.50</CLOUD_COVER><DATE_ACQUIRED>2024-06-14</DATE_ACQUIRED>\
         </IMAGE_ATTRIBUTES></LANDSAT_METADATA_FILE>",
    ).unwrap();

    let dataset = GeoTiffDataset::open(&band, "SR_B4").unwrap();
    let metadata = dataset.scene_metadata();
    std::assert_eq!(metadata.cloud_cover, Some(12.5));
    std::assert_eq!(metadata.acquisition_date, NaiveDate::from_ymd_opt(2024, 6, 14));
}

#[test]
fn test_open_falls_back_to_date_in_file_name() {
    let dir = tempfile::tempdir().unwrap();
    let band = dir.path().join("LC08_L2SP_041036_20240615_20240621_02_T1_SR_B4.TIF");
    fs::write(&band, TestTiff::new(4, 4).build()).unwrap();

    let metadata = GeoTiffDataset::open(&band, "SR_B4").unwrap().scene_metadata();
    std::assert_eq!(metadata.cloud_cover, None);
    std::assert_eq!(metadata.acquisition_date, NaiveDate::from_ymd_opt(2024, 6, 15));
}
