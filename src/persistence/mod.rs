//! Storage of normalized extraction records
//!
//! The pipeline only talks to storage through [`PersistenceAdapter`]: one
//! search row per extraction, one pixel row per grid position.

mod json_store;
mod memory;

use chrono::{DateTime, Utc};
use log::debug;
use serde::{Deserialize, Serialize};

use crate::errors::PersistenceError;
use crate::normalize::{CloudCover, NormalizedPixel, PersistableRecord};
use crate::raster::PixelValue;

pub use json_store::JsonFileStore;
pub use memory::MemoryStore;

/// A stored search, identified by `id`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchRecord {
    pub id: u64,
    pub user_id: u64,
    pub latitude: f64,
    pub longitude: f64,
    pub scene_id: String,
    pub cloud_cover: CloudCover,
    pub created_at: DateTime<Utc>,
}

/// A stored grid pixel belonging to a search
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PixelRecord {
    pub search_id: u64,
    pub position: usize,
    pub value: f64,
    pub raw_value: PixelValue,
    pub is_center: bool,
}

pub trait PersistenceAdapter {
    fn save_search(
        &mut self,
        user_id: u64,
        latitude: f64,
        longitude: f64,
        scene_id: &str,
        cloud_cover: CloudCover,
    ) -> Result<SearchRecord, PersistenceError>;

    fn save_pixel_data(
        &mut self,
        search_id: u64,
        pixel: &NormalizedPixel,
        is_center: bool,
        position: usize,
    ) -> Result<(), PersistenceError>;

    /// Make everything saved so far durable
    fn flush(&mut self) -> Result<(), PersistenceError> {
        Ok(())
    }
}

/// Persist one normalized record: a search row, then one pixel row per position
pub fn store_record(
    adapter: &mut dyn PersistenceAdapter,
    user_id: u64,
    record: &PersistableRecord,
) -> Result<SearchRecord, PersistenceError> {
    let search = adapter.save_search(user_id, record.latitude, record.longitude, &record.scene_id, record.cloud_cover)?;
    for pixel in &record.pixels {
        adapter.save_pixel_data(search.id, pixel, pixel.is_center, pixel.position)?;
    }
    adapter.flush()?;

    debug!("Stored search {} with {} pixels", search.id, record.pixels.len());
    Ok(search)
}
