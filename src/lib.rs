pub mod io;
pub mod tiff;
pub mod utils;
pub mod compression;
pub mod coordinate;
pub mod raster;
pub mod session;
pub mod search;
pub mod extractor;
pub mod normalize;
pub mod persistence;
pub mod config;
pub mod errors;
pub mod commands;
pub mod api;

pub use crate::api::SceneKit;
pub use crate::config::Config;
pub use crate::errors::PipelineError;

pub use coordinate::{Coordinate, CoordinateSystem, GeoTransform};
pub use extractor::{ExtractionResult, PixelExtractor, PixelSample, Region};
pub use normalize::{CloudCover, PersistableRecord, ResultNormalizer};
pub use persistence::{JsonFileStore, MemoryStore, PersistenceAdapter};
pub use raster::{GeoTiffDataset, RasterDataset, RasterSource};
pub use search::{DateWindow, SceneCandidate, SceneSearchEngine};
pub use session::{Credentials, SessionManager};
pub use tiff::TiffReader;
