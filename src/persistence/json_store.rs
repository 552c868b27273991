use std::ffi::OsString;
use std::fs::{self, File};
use std::io::{BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};

use log::{debug, info};

use crate::errors::PersistenceError;
use crate::normalize::{CloudCover, NormalizedPixel};

use super::memory::MemoryStore;
use super::{PersistenceAdapter, SearchRecord};

/// Searches and pixels kept as one JSON document on disk
///
/// Saves go to memory; `flush` rewrites the document through a temporary file
/// and a rename, so a reader never sees a half-written file.
pub struct JsonFileStore {
    path: PathBuf,
    store: MemoryStore,
    dirty: bool,
}

impl JsonFileStore {
    /// Open the store at `path`, starting empty if the file does not exist yet
    pub fn open(path: impl AsRef<Path>) -> Result<Self, PersistenceError> {
        let path = path.as_ref().to_path_buf();
        let store = if path.is_file() {
            let store: MemoryStore = serde_json::from_reader(BufReader::new(File::open(&path)?))?;
            debug!("Loaded {} searches from {}", store.searches.len(), path.display());
            store
        } else {
            info!("Creating new record store at {}", path.display());
            MemoryStore::new()
        };

        Ok(JsonFileStore { path, store, dirty: false })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn records(&self) -> &MemoryStore {
        &self.store
    }

    fn temp_path(&self) -> PathBuf {
        let mut name = OsString::from(self.path.as_os_str());
        name.push(".tmp");
        PathBuf::from(name)
    }
}

impl PersistenceAdapter for JsonFileStore {
    fn save_search(
        &mut self,
        user_id: u64,
        latitude: f64,
        longitude: f64,
        scene_id: &str,
        cloud_cover: CloudCover,
    ) -> Result<SearchRecord, PersistenceError> {
        self.dirty = true;
        self.store.save_search(user_id, latitude, longitude, scene_id, cloud_cover)
    }

    fn save_pixel_data(
        &mut self,
        search_id: u64,
        pixel: &NormalizedPixel,
        is_center: bool,
        position: usize,
    ) -> Result<(), PersistenceError> {
        self.dirty = true;
        self.store.save_pixel_data(search_id, pixel, is_center, position)
    }

    fn flush(&mut self) -> Result<(), PersistenceError> {
        if !self.dirty {
            return Ok(());
        }
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }

        let temp = self.temp_path();
        {
            let mut writer = BufWriter::new(File::create(&temp)?);
            serde_json::to_writer_pretty(&mut writer, &self.store)?;
            writer.flush()?;
        }
        fs::rename(&temp, &self.path)?;
        self.dirty = false;

        debug!("Wrote {} searches to {}", self.store.searches.len(), self.path.display());
        Ok(())
    }
}
