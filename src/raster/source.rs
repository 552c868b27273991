//! Scene id to raster dataset resolution

use std::fs;
use std::path::{Path, PathBuf};

use log::{debug, info, warn};

use crate::errors::ExtractionErrorKind;
use crate::session::SessionManager;

use super::dataset::RasterDataset;
use super::geotiff::GeoTiffDataset;

/// Resolves a scene identifier to an open raster dataset
pub trait RasterSource {
    fn open_scene(&self, session: &SessionManager, scene_id: &str) -> Result<Box<dyn RasterDataset>, ExtractionErrorKind>;
}

/// Band files kept in a local directory, downloaded through the session on first use
pub struct CachedRasterSource {
    cache_dir: PathBuf,
    band: String,
}

impl CachedRasterSource {
    pub fn new(cache_dir: impl Into<PathBuf>, band: &str) -> Self {
        CachedRasterSource {
            cache_dir: cache_dir.into(),
            band: band.to_string(),
        }
    }

    pub fn band(&self) -> &str {
        &self.band
    }

    pub fn cache_dir(&self) -> &Path {
        &self.cache_dir
    }

    /// Where the band file of `scene_id` lives in the cache
    pub fn band_path(&self, scene_id: &str) -> PathBuf {
        self.cache_dir.join(format!("{}_{}.TIF", scene_id, self.band))
    }

    fn fetch(&self, session: &SessionManager, scene_id: &str) -> Result<PathBuf, ExtractionErrorKind> {
        fs::create_dir_all(&self.cache_dir)
            .map_err(|e| ExtractionErrorKind::Network(e.into()))?;

        info!("Band {} of scene {} not cached, downloading", self.band, scene_id);
        let path = session.download_scene(scene_id, &self.band, &self.cache_dir)?;

        // The MTL sidecar only fills in metadata, a failed download is not fatal
        if let Err(e) = session.download_sidecar(scene_id, &self.cache_dir) {
            warn!("No MTL sidecar for scene {}: {}", scene_id, e);
        }

        Ok(path)
    }
}

impl RasterSource for CachedRasterSource {
    fn open_scene(&self, session: &SessionManager, scene_id: &str) -> Result<Box<dyn RasterDataset>, ExtractionErrorKind> {
        let cached = self.band_path(scene_id);
        let path = if cached.is_file() {
            debug!("Using cached band file {}", cached.display());
            cached
        } else {
            self.fetch(session, scene_id)?
        };

        let dataset = GeoTiffDataset::open(&path, &self.band)?;
        Ok(Box::new(dataset))
    }
}
