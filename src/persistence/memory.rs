use chrono::Utc;
use serde::{Deserialize, Serialize};

use crate::errors::PersistenceError;
use crate::normalize::{CloudCover, NormalizedPixel};

use super::{PersistenceAdapter, PixelRecord, SearchRecord};

/// In-process store; also the document layout of `JsonFileStore`
#[derive(Debug, Default, Clone, PartialEq, Serialize, Deserialize)]
pub struct MemoryStore {
    pub searches: Vec<SearchRecord>,
    pub pixels: Vec<PixelRecord>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn search(&self, id: u64) -> Option<&SearchRecord> {
        self.searches.iter().find(|s| s.id == id)
    }

    /// Pixels of a search ordered by position
    pub fn pixels_for(&self, search_id: u64) -> Vec<&PixelRecord> {
        let mut pixels: Vec<_> = self.pixels.iter().filter(|p| p.search_id == search_id).collect();
        pixels.sort_by_key(|p| p.position);
        pixels
    }

    fn next_id(&self) -> u64 {
        self.searches.iter().map(|s| s.id).max().unwrap_or(0) + 1
    }
}

impl PersistenceAdapter for MemoryStore {
    fn save_search(
        &mut self,
        user_id: u64,
        latitude: f64,
        longitude: f64,
        scene_id: &str,
        cloud_cover: CloudCover,
    ) -> Result<SearchRecord, PersistenceError> {
        let record = SearchRecord {
            id: self.next_id(),
            user_id,
            latitude,
            longitude,
            scene_id: scene_id.to_string(),
            cloud_cover,
            created_at: Utc::now(),
        };
        self.searches.push(record.clone());
        Ok(record)
    }

    fn save_pixel_data(
        &mut self,
        search_id: u64,
        pixel: &NormalizedPixel,
        is_center: bool,
        position: usize,
    ) -> Result<(), PersistenceError> {
        if self.search(search_id).is_none() {
            return Err(PersistenceError::UnknownSearch(search_id));
        }
        self.pixels.push(PixelRecord {
            search_id,
            position,
            value: pixel.value,
            raw_value: pixel.raw_value,
            is_center,
        });
        Ok(())
    }
}
