//! Coordinate to pixel mapping and neighborhood reads

use chrono::NaiveDate;
use log::{debug, info};
use serde::{Deserialize, Serialize};

use crate::coordinate::{Coordinate, CoordinateTransformer};
use crate::errors::{CoordinateError, ExtractionError, ExtractionErrorKind};
use crate::raster::{PixelValue, RasterDataset, RasterSource};
use crate::search::SceneCandidate;
use crate::session::SessionManager;
use crate::tiff::errors::TiffError;

use super::region::Region;

pub const DEFAULT_NEIGHBORHOOD_SIZE: usize = 3;

/// Linear index of the center sample in a row-major `size` x `size` grid
pub fn center_index(size: usize) -> usize {
    size * size / 2
}

/// One pixel of an extracted neighborhood
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PixelSample {
    pub value: PixelValue,
    pub band: String,
    /// Row-major index within the grid
    pub position: usize,
    /// True only for the pixel containing the requested coordinate
    pub is_center: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExtractionMetadata {
    pub scene_id: String,
    pub cloud_cover: Option<f64>,
    pub acquisition_date: Option<NaiveDate>,
    pub coordinate: Coordinate,
    /// Column and row of the center pixel
    pub pixel: (u64, u64),
    pub neighborhood_size: usize,
}

/// A complete neighborhood grid plus scene metadata
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExtractionResult {
    pub grid: Vec<PixelSample>,
    pub metadata: ExtractionMetadata,
}

impl ExtractionResult {
    pub fn center(&self) -> Option<&PixelSample> {
        self.grid.iter().find(|sample| sample.is_center)
    }
}

/// Resolve the pixel (column, row) containing `coordinate`
///
/// The coordinate is projected into the raster's coordinate system and run
/// through the inverse geotransform. Pixels off the raster are `OutOfBounds`.
pub fn locate_pixel(dataset: &dyn RasterDataset, coordinate: &Coordinate) -> Result<(u64, u64), ExtractionErrorKind> {
    let transform = dataset.geo_transform()
        .ok_or_else(|| ExtractionErrorKind::Unsupported("raster is not georeferenced".to_string()))?;
    let crs = dataset.coordinate_system()
        .ok_or_else(|| ExtractionErrorKind::Unsupported("raster has no coordinate system".to_string()))?;

    let point = CoordinateTransformer.project(coordinate, &crs).map_err(|e| match e {
        CoordinateError::UnsupportedCrs(code) => {
            ExtractionErrorKind::Unsupported(format!("coordinate system EPSG:{}", code))
        }
        other => ExtractionErrorKind::InvalidCoordinate(other),
    })?;

    let (col, row) = transform.invert(point.x, point.y)
        .ok_or_else(|| ExtractionErrorKind::Unsupported("geotransform is not invertible".to_string()))?;
    let (col, row) = (col.floor(), row.floor());
    debug!("{} -> {} ({:.3}, {:.3}) -> pixel ({}, {})", coordinate, crs, point.x, point.y, col, row);

    let (width, height) = dataset.dimensions();
    if col < 0.0 || row < 0.0 || col >= width as f64 || row >= height as f64 {
        return Err(ExtractionErrorKind::OutOfBounds {
            col: col as i64,
            row: row as i64,
            width,
            height,
        });
    }

    Ok((col as u64, row as u64))
}

fn check_size(size: usize) -> Result<(), ExtractionErrorKind> {
    if size == 0 || size % 2 == 0 {
        return Err(ExtractionErrorKind::InvalidNeighborhood(size));
    }
    Ok(())
}

/// Read the `size` x `size` grid centered on `coordinate`
///
/// The whole neighborhood must lie on the raster; one that would cross an
/// edge is `EdgeOfRaster`, never a padded grid.
pub fn extract_neighborhood(dataset: &mut dyn RasterDataset, scene_id: &str, coordinate: Coordinate, size: usize) -> Result<ExtractionResult, ExtractionError> {
    let fail = |kind: ExtractionErrorKind| ExtractionError::new(scene_id, coordinate, kind);
    check_size(size).map_err(fail)?;

    let (col, row) = locate_pixel(dataset, &coordinate).map_err(fail)?;
    let (width, height) = dataset.dimensions();

    let region = Region::centered(col, row, size as u64)
        .filter(|region| region.fits_within(width, height))
        .ok_or_else(|| fail(ExtractionErrorKind::EdgeOfRaster { col, row, size, width, height }))?;

    let values = dataset.read_window(region).map_err(|e| fail(e.into()))?;
    if values.len() != size * size {
        return Err(fail(ExtractionErrorKind::Decode(TiffError::GenericError(format!(
            "window {:?} returned {} values", region, values.len()
        )))));
    }

    let center = center_index(size);
    let band = dataset.band().to_string();
    let grid = values.into_iter()
        .enumerate()
        .map(|(position, value)| PixelSample {
            value,
            band: band.clone(),
            position,
            is_center: position == center,
        })
        .collect();

    let scene = dataset.scene_metadata();
    Ok(ExtractionResult {
        grid,
        metadata: ExtractionMetadata {
            scene_id: scene_id.to_string(),
            cloud_cover: scene.cloud_cover,
            acquisition_date: scene.acquisition_date,
            coordinate,
            pixel: (col, row),
            neighborhood_size: size,
        },
    })
}

/// Reads fixed-size neighborhoods from scenes resolved through a `RasterSource`
pub struct PixelExtractor {
    source: Box<dyn RasterSource>,
    neighborhood_size: usize,
}

impl PixelExtractor {
    pub fn new(source: Box<dyn RasterSource>, neighborhood_size: usize) -> Self {
        PixelExtractor { source, neighborhood_size }
    }

    pub fn neighborhood_size(&self) -> usize {
        self.neighborhood_size
    }

    /// Extract the neighborhood around `coordinate` from scene `scene_id`
    pub fn extract(&self, session: &SessionManager, scene_id: &str, coordinate: Coordinate) -> Result<ExtractionResult, ExtractionError> {
        let fail = |kind: ExtractionErrorKind| ExtractionError::new(scene_id, coordinate, kind);

        check_size(self.neighborhood_size).map_err(fail)?;
        session.ensure_active().map_err(|e| fail(ExtractionErrorKind::Session(e)))?;

        info!("Extracting {}x{} neighborhood of scene {} at {}",
              self.neighborhood_size, self.neighborhood_size, scene_id, coordinate);
        let mut dataset = self.source.open_scene(session, scene_id).map_err(fail)?;
        self.extract_from_dataset(dataset.as_mut(), scene_id, coordinate)
    }

    /// Extract from a search candidate, taking metadata the raster lacks from the catalog record
    pub fn extract_candidate(&self, session: &SessionManager, candidate: &SceneCandidate, coordinate: Coordinate) -> Result<ExtractionResult, ExtractionError> {
        let mut result = self.extract(session, &candidate.scene_id, coordinate)?;
        let metadata = &mut result.metadata;
        metadata.cloud_cover = metadata.cloud_cover.or(candidate.cloud_cover);
        metadata.acquisition_date = metadata.acquisition_date.or(Some(candidate.acquisition_date));
        Ok(result)
    }

    /// Extract from an already open dataset
    pub fn extract_from_dataset(&self, dataset: &mut dyn RasterDataset, scene_id: &str, coordinate: Coordinate) -> Result<ExtractionResult, ExtractionError> {
        extract_neighborhood(dataset, scene_id, coordinate, self.neighborhood_size)
    }
}
