//! Neighborhood pixel extraction
//!
//! Maps a geographic coordinate onto a scene's raster and reads the square
//! block of pixels centered on it.

mod neighborhood;
mod region;

pub use neighborhood::{
    center_index, extract_neighborhood, locate_pixel, ExtractionMetadata, ExtractionResult, PixelExtractor, PixelSample,
    DEFAULT_NEIGHBORHOOD_SIZE,
};
pub use region::Region;
