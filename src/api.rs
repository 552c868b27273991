use log::info;

use crate::config::Config;
use crate::coordinate::Coordinate;
use crate::errors::PipelineError;
use crate::extractor::{ExtractionResult, PixelExtractor};
use crate::normalize::{PersistableRecord, ResultNormalizer};
use crate::persistence::{store_record, PersistenceAdapter, SearchRecord};
use crate::raster::{CachedRasterSource, RasterSource};
use crate::search::{DateWindow, SceneCandidate, SceneSearchEngine};
use crate::session::{CatalogProvider, M2mProvider, SessionManager};

/// Main interface to the scene discovery and extraction pipeline
///
/// Owns the catalog session for its whole lifetime; dropping it (or calling
/// [`SceneKit::close`]) logs out.
pub struct SceneKit {
    config: Config,
    session: SessionManager,
    search: SceneSearchEngine,
    extractor: PixelExtractor,
    normalizer: ResultNormalizer,
}

impl SceneKit {
    /// Open a session against the M2M catalog described by `config`
    ///
    /// # Returns
    /// A ready SceneKit, or an authentication error if either login fails
    pub fn connect(config: Config) -> Result<Self, PipelineError> {
        let provider = M2mProvider::new(
            &config.catalog.endpoint,
            &config.catalog.dataset,
            config.catalog.download_timeout(),
        );
        let source = CachedRasterSource::new(&config.extraction.cache_dir, &config.extraction.band);
        Self::with_provider(config, &provider, Box::new(source))
    }

    /// Build the pipeline on an arbitrary catalog provider and raster source
    pub fn with_provider(config: Config, provider: &dyn CatalogProvider, source: Box<dyn RasterSource>) -> Result<Self, PipelineError> {
        config.validate()?;
        let credentials = config.credentials()?;
        let session = SessionManager::open(provider, &credentials, config.catalog.session_ttl())?;

        let search = SceneSearchEngine::new(&config.catalog.dataset, config.search.window_days, config.catalog.max_results);
        let extractor = PixelExtractor::new(source, config.extraction.neighborhood_size);
        let normalizer = ResultNormalizer::new(config.extraction.neighborhood_size, config.normalize.rescale());

        Ok(SceneKit {
            config,
            session,
            search,
            extractor,
            normalizer,
        })
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn session(&self) -> &SessionManager {
        &self.session
    }

    /// Find scenes covering a point
    ///
    /// # Arguments
    /// * `latitude`, `longitude` - WGS84 degrees, validated before any request
    /// * `window` - Acquisition dates; defaults to the configured number of days up to today
    /// * `max_cloud_cover` - Percent threshold; defaults to the configured value
    ///
    /// # Returns
    /// Candidates in catalog order. No matches is an empty vector, not an error.
    pub fn search(&self, latitude: f64, longitude: f64, window: Option<DateWindow>, max_cloud_cover: Option<f64>) -> Result<Vec<SceneCandidate>, PipelineError> {
        let coordinate = Coordinate::new(latitude, longitude)?;
        let max_cloud_cover = max_cloud_cover.or(Some(self.config.search.max_cloud_cover));
        Ok(self.search.search(&self.session, coordinate, window, max_cloud_cover)?)
    }

    /// Extract the pixel neighborhood around a point from one scene
    pub fn extract(&self, scene_id: &str, latitude: f64, longitude: f64) -> Result<ExtractionResult, PipelineError> {
        let coordinate = Coordinate::new(latitude, longitude)?;
        Ok(self.extractor.extract(&self.session, scene_id, coordinate)?)
    }

    /// Extract, normalize and persist
    ///
    /// Nothing is written unless extraction and normalization both succeed.
    ///
    /// # Returns
    /// The stored search row and the record that was persisted
    pub fn extract_and_store(&self, store: &mut dyn PersistenceAdapter, scene_id: &str, latitude: f64, longitude: f64) -> Result<(SearchRecord, PersistableRecord), PipelineError> {
        let result = self.extract(scene_id, latitude, longitude)?;
        self.store(store, &result)
    }

    /// Search at a point and extract from the first scene the catalog returns
    ///
    /// # Returns
    /// `None` when no scene matches, otherwise what `extract_and_store` returns
    pub fn extract_first_match(&self, store: &mut dyn PersistenceAdapter, latitude: f64, longitude: f64) -> Result<Option<(SearchRecord, PersistableRecord)>, PipelineError> {
        let candidates = self.search(latitude, longitude, None, None)?;
        let Some(candidate) = candidates.first() else {
            return Ok(None);
        };

        let coordinate = Coordinate::new(latitude, longitude)?;
        let result = self.extractor.extract_candidate(&self.session, candidate, coordinate)?;
        self.store(store, &result).map(Some)
    }

    fn store(&self, store: &mut dyn PersistenceAdapter, result: &ExtractionResult) -> Result<(SearchRecord, PersistableRecord), PipelineError> {
        let record = self.normalizer.normalize(result)?;
        let search = store_record(store, self.config.storage.user_id, &record)?;

        info!("Stored extraction of scene {} as search {}", record.scene_id, search.id);
        Ok((search, record))
    }

    /// Log out of the catalog; safe to call more than once
    pub fn close(&self) {
        self.session.close();
    }
}
