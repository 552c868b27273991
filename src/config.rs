//! Configuration
//!
//! Loaded from a TOML file; every section and field has a default, so an empty
//! file (or no file at all) gives a working setup apart from credentials.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use log::{debug, LevelFilter};
use serde::Deserialize;

use crate::errors::{AuthenticationError, ConfigError};
use crate::extractor::DEFAULT_NEIGHBORHOOD_SIZE;
use crate::normalize::Rescale;
use crate::search::{DEFAULT_DATASET, DEFAULT_MAX_CLOUD_COVER, DEFAULT_MAX_RESULTS, DEFAULT_WINDOW_DAYS, MAX_WINDOW_DAYS};
use crate::session::m2m::DEFAULT_ENDPOINT;
use crate::session::Credentials;

/// Upper bound for `catalog.session_ttl_minutes`, one week
pub const MAX_SESSION_TTL_MINUTES: i64 = 7 * 24 * 60;

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    pub catalog: CatalogConfig,
    pub search: SearchConfig,
    pub extraction: ExtractionConfig,
    pub normalize: NormalizeConfig,
    pub storage: StorageConfig,
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CatalogConfig {
    pub endpoint: String,
    pub dataset: String,
    pub username: Option<String>,
    pub password: Option<String>,
    pub session_ttl_minutes: i64,
    pub max_results: usize,
    pub download_timeout_secs: u64,
}

impl Default for CatalogConfig {
    fn default() -> Self {
        CatalogConfig {
            endpoint: DEFAULT_ENDPOINT.to_string(),
            dataset: DEFAULT_DATASET.to_string(),
            username: None,
            password: None,
            session_ttl_minutes: 120,
            max_results: DEFAULT_MAX_RESULTS,
            download_timeout_secs: 300,
        }
    }
}

impl CatalogConfig {
    pub fn session_ttl(&self) -> chrono::Duration {
        chrono::Duration::minutes(self.session_ttl_minutes.clamp(0, MAX_SESSION_TTL_MINUTES))
    }

    pub fn download_timeout(&self) -> Duration {
        Duration::from_secs(self.download_timeout_secs)
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SearchConfig {
    pub max_cloud_cover: f64,
    pub window_days: i64,
}

impl Default for SearchConfig {
    fn default() -> Self {
        SearchConfig {
            max_cloud_cover: DEFAULT_MAX_CLOUD_COVER,
            window_days: DEFAULT_WINDOW_DAYS,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ExtractionConfig {
    pub neighborhood_size: usize,
    pub band: String,
    pub cache_dir: PathBuf,
}

impl Default for ExtractionConfig {
    fn default() -> Self {
        ExtractionConfig {
            neighborhood_size: DEFAULT_NEIGHBORHOOD_SIZE,
            band: "SR_B4".to_string(),
            cache_dir: PathBuf::from("scene-cache"),
        }
    }
}

/// Rescaling applied by the normalizer; off unless both fields are set
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct NormalizeConfig {
    pub scale: Option<f64>,
    pub offset: Option<f64>,
}

impl NormalizeConfig {
    pub fn rescale(&self) -> Option<Rescale> {
        match (self.scale, self.offset) {
            (Some(scale), Some(offset)) => Some(Rescale { scale, offset }),
            (Some(scale), None) => Some(Rescale { scale, offset: 0.0 }),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct StorageConfig {
    pub path: PathBuf,
    pub user_id: u64,
}

impl Default for StorageConfig {
    fn default() -> Self {
        StorageConfig {
            path: PathBuf::from("scenekit-records.json"),
            user_id: 1,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct LoggingConfig {
    pub file: PathBuf,
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        LoggingConfig {
            file: PathBuf::from("scenekit.log"),
            level: "info".to_string(),
        }
    }
}

impl LoggingConfig {
    pub fn level_filter(&self) -> Result<LevelFilter, ConfigError> {
        self.level.parse()
            .map_err(|_| ConfigError::Invalid(format!("unknown log level '{}'", self.level)))
    }
}

impl Config {
    /// Load and validate a configuration file
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        debug!("Loading configuration from {}", path.display());
        let content = fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }

    /// Load `path` if given, otherwise use the defaults
    pub fn load_or_default(path: Option<&Path>) -> Result<Self, ConfigError> {
        match path {
            Some(path) => Self::load(path),
            None => Ok(Config::default()),
        }
    }

    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        let config: Config = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let size = self.extraction.neighborhood_size;
        if size == 0 || size % 2 == 0 {
            return Err(ConfigError::Invalid(format!(
                "extraction.neighborhood_size must be odd and positive, got {}", size
            )));
        }
        if !(0.0..=100.0).contains(&self.search.max_cloud_cover) {
            return Err(ConfigError::Invalid(format!(
                "search.max_cloud_cover must be within [0, 100], got {}", self.search.max_cloud_cover
            )));
        }
        if !(0..=MAX_WINDOW_DAYS).contains(&self.search.window_days) {
            return Err(ConfigError::Invalid(format!(
                "search.window_days must be within [0, {}], got {}", MAX_WINDOW_DAYS, self.search.window_days
            )));
        }
        if !(1..=MAX_SESSION_TTL_MINUTES).contains(&self.catalog.session_ttl_minutes) {
            return Err(ConfigError::Invalid(format!(
                "catalog.session_ttl_minutes must be within [1, {}], got {}",
                MAX_SESSION_TTL_MINUTES, self.catalog.session_ttl_minutes
            )));
        }
        self.logging.level_filter()?;
        Ok(())
    }

    /// Catalog credentials, with environment variables taking precedence
    pub fn credentials(&self) -> Result<Credentials, AuthenticationError> {
        Credentials::resolve(self.catalog.username.as_deref(), self.catalog.password.as_deref())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_file_gives_defaults() {
        let config = Config::from_toml_str("").unwrap();
        assert_eq!(config.catalog.dataset, "landsat_ot_c2_l2");
        assert_eq!(config.search.max_cloud_cover, 50.0);
        assert_eq!(config.search.window_days, 30);
        assert_eq!(config.extraction.neighborhood_size, 3);
        assert_eq!(config.storage.user_id, 1);
        assert!(config.normalize.rescale().is_none());
    }

    #[test]
    fn reads_sections() {
        let config = Config::from_toml_str(r#"
            [catalog]
            username = "alice"
            session_ttl_minutes = 30

            [extraction]
            neighborhood_size = 5
            band = "SR_B5"

            [normalize]
            scale = 0.0000275
            offset = -0.2

            [logging]
            level = "debug"
        "#).unwrap();

        assert_eq!(config.catalog.username.as_deref(), Some("alice"));
        assert_eq!(config.catalog.session_ttl(), chrono::Duration::minutes(30));
        assert_eq!(config.extraction.band, "SR_B5");
        assert_eq!(config.normalize.rescale(), Some(Rescale::LANDSAT_C2_L2_REFLECTANCE));
        assert_eq!(config.logging.level_filter().unwrap(), LevelFilter::Debug);
    }

    #[test]
    fn rejects_even_neighborhood_and_bad_threshold() {
        assert!(matches!(
            Config::from_toml_str("[extraction]\nneighborhood_size = 4"),
            Err(ConfigError::Invalid(_))
        ));
        assert!(matches!(
            Config::from_toml_str("[search]\nmax_cloud_cover = 120.0"),
            Err(ConfigError::Invalid(_))
        ));
    }

    #[test]
    fn rejects_out_of_range_window_and_ttl() {
        assert!(matches!(
            Config::from_toml_str("[search]\nwindow_days = 100000000"),
            Err(ConfigError::Invalid(_))
        ));
        assert!(matches!(
            Config::from_toml_str("[catalog]\nsession_ttl_minutes = 1000000000000"),
            Err(ConfigError::Invalid(_))
        ));
        assert!(Config::from_toml_str("[search]\nwindow_days = 36500").is_ok());
    }

    #[test]
    fn session_ttl_is_capped_without_validation() {
        let mut config = Config::default();
        config.catalog.session_ttl_minutes = 1_000_000_000_000;
        assert_eq!(config.catalog.session_ttl(), chrono::Duration::minutes(MAX_SESSION_TTL_MINUTES));
    }

    #[test]
    fn unknown_keys_are_parse_errors() {
        assert!(matches!(Config::from_toml_str("[search]\nmax_cloud = 10"), Err(ConfigError::Parse(_))));
    }
}
