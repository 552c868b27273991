//! Error taxonomy for the discovery and extraction pipeline
//!
//! Each stage has its own error type so callers can tell an authentication
//! failure from an empty search or a coordinate that falls off the raster.
//! `PipelineError` wraps all of them for the facade and the CLI.

use chrono::{DateTime, Utc};
use thiserror::Error;

use crate::coordinate::Coordinate;
use crate::tiff::errors::TiffError;

/// Invalid geographic input, raised before any network call
#[derive(Debug, Error, Clone, PartialEq)]
pub enum CoordinateError {
    #[error("latitude {0} is outside [-90, 90]")]
    LatitudeOutOfRange(f64),

    #[error("longitude {0} is outside [-180, 180]")]
    LongitudeOutOfRange(f64),

    #[error("coordinate component is not a finite number")]
    NotFinite,

    #[error("no projection available from WGS84 to EPSG:{0}")]
    UnsupportedCrs(u32),
}

/// The catalog session could not be established
#[derive(Debug, Error)]
pub enum AuthenticationError {
    #[error("catalog rejected credentials for user '{username}': {reason}")]
    Rejected { username: String, reason: String },

    #[error("catalog service unreachable: {0}")]
    Unreachable(String),

    #[error("no catalog credentials configured")]
    MissingCredentials,

    #[error("session lifetime of {0} minutes cannot be represented")]
    InvalidLifetime(i64),
}

/// Operation attempted on a session that can no longer be used
#[derive(Debug, Error, Clone, PartialEq)]
pub enum SessionError {
    #[error("session has been closed")]
    Closed,

    #[error("session expired at {0}")]
    Expired(DateTime<Utc>),
}

/// Failure talking to the imagery catalog
#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("HTTP request failed: {0}")]
    Http(String),

    #[error("catalog API error {code}: {message}")]
    Api { code: String, message: String },

    #[error("unexpected catalog response: {0}")]
    Decode(String),

    #[error("not available from the catalog: {0}")]
    Unavailable(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Session(#[from] SessionError),
}

impl From<reqwest::Error> for CatalogError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            CatalogError::Decode(err.to_string())
        } else {
            CatalogError::Http(err.to_string())
        }
    }
}

/// Scene search failed (an empty result is not an error)
#[derive(Debug, Error)]
pub enum SearchError {
    #[error("invalid coordinate: {0}")]
    InvalidCoordinate(#[from] CoordinateError),

    #[error("date window start {start} is after end {end}")]
    InvalidDateWindow { start: String, end: String },

    #[error("cloud cover threshold {0} is outside [0, 100]")]
    InvalidCloudCover(f64),

    #[error("date window of {0} days is outside [0, 36500]")]
    InvalidWindowLength(i64),

    #[error("catalog query failed: {0}")]
    Catalog(#[from] CatalogError),
}

/// Why a neighborhood could not be extracted
#[derive(Debug, Error)]
pub enum ExtractionErrorKind {
    #[error("pixel ({col}, {row}) is outside the {width}x{height} raster")]
    OutOfBounds { col: i64, row: i64, width: u64, height: u64 },

    #[error("{size}x{size} neighborhood around pixel ({col}, {row}) extends past the edge of the {width}x{height} raster")]
    EdgeOfRaster { col: u64, row: u64, size: usize, width: u64, height: u64 },

    #[error("raster decode failed: {0}")]
    Decode(#[from] TiffError),

    #[error("raster download failed: {0}")]
    Network(CatalogError),

    #[error(transparent)]
    Session(SessionError),

    #[error("unsupported raster: {0}")]
    Unsupported(String),

    #[error("neighborhood size must be odd and positive, got {0}")]
    InvalidNeighborhood(usize),

    #[error(transparent)]
    InvalidCoordinate(#[from] CoordinateError),
}

impl From<CatalogError> for ExtractionErrorKind {
    fn from(err: CatalogError) -> Self {
        match err {
            CatalogError::Session(e) => ExtractionErrorKind::Session(e),
            other => ExtractionErrorKind::Network(other),
        }
    }
}

/// Extraction failure with the scene and coordinate it happened at
#[derive(Debug, Error)]
#[error("extraction of scene {scene_id} at {coordinate} failed: {kind}")]
pub struct ExtractionError {
    pub scene_id: String,
    pub coordinate: Coordinate,
    pub kind: ExtractionErrorKind,
}

impl ExtractionError {
    pub fn new(scene_id: impl Into<String>, coordinate: Coordinate, kind: impl Into<ExtractionErrorKind>) -> Self {
        ExtractionError { scene_id: scene_id.into(), coordinate, kind: kind.into() }
    }

    /// The coordinate does not fall on this scene at all
    pub fn is_out_of_bounds(&self) -> bool {
        matches!(self.kind, ExtractionErrorKind::OutOfBounds { .. })
    }

    /// The coordinate is on the scene but too close to its edge for a full grid
    pub fn is_edge_of_raster(&self) -> bool {
        matches!(self.kind, ExtractionErrorKind::EdgeOfRaster { .. })
    }
}

/// A normalizer input broke the grid contract; indicates a defect upstream
#[derive(Debug, Error, Clone, PartialEq)]
pub enum InternalConsistencyError {
    #[error("grid has {actual} samples, expected {expected}")]
    GridLength { expected: usize, actual: usize },

    #[error("sample at index {index} carries position {position}")]
    Position { index: usize, position: usize },

    #[error("center flag is {flag} at position {position}")]
    CenterFlag { position: usize, flag: bool },

    #[error("neighborhood size must be odd and positive, got {0}")]
    NeighborhoodSize(usize),
}

/// Storage backend failure
#[derive(Debug, Error)]
pub enum PersistenceError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("no search record with id {0}")]
    UnknownSearch(u64),
}

/// Configuration could not be loaded
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("cannot read configuration: {0}")]
    Io(#[from] std::io::Error),

    #[error("cannot parse configuration: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("invalid configuration: {0}")]
    Invalid(String),
}

/// Any failure of a full search/extract/persist run
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Authentication(#[from] AuthenticationError),

    #[error(transparent)]
    Session(#[from] SessionError),

    #[error(transparent)]
    Coordinate(#[from] CoordinateError),

    #[error(transparent)]
    Search(#[from] SearchError),

    #[error(transparent)]
    Extraction(#[from] ExtractionError),

    #[error("internal consistency error: {0}")]
    Consistency(#[from] InternalConsistencyError),

    #[error(transparent)]
    Persistence(#[from] PersistenceError),

    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    #[error("cannot render output: {0}")]
    Output(#[from] serde_json::Error),
}
