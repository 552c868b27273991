//! Raster access for pixel extraction
//!
//! `RasterDataset` is what the extractor reads from; `GeoTiffDataset` is the
//! decoder-backed implementation and `RasterSource` resolves a scene id to a
//! dataset, downloading through the session when needed.

mod dataset;
mod geotiff;
mod metadata;
mod sample;
mod source;
mod window_reader;

pub use dataset::RasterDataset;
pub use geotiff::GeoTiffDataset;
pub use metadata::{read_mtl_sidecar, SceneMetadata};
pub use sample::{PixelValue, SampleType};
pub use source::{CachedRasterSource, RasterSource};
pub use window_reader::{BlockKind, BlockLayout, WindowReader};
