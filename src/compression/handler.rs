//! Compression handler trait definition

use crate::tiff::errors::TiffResult;

/// Strategy trait for decoding one TIFF compression method
pub trait CompressionHandler: Send + Sync {
    /// Decompress a single strip or tile
    fn decompress(&self, data: &[u8]) -> TiffResult<Vec<u8>>;

    /// Get the name of this compression method
    fn name(&self) -> &'static str;

    /// Get the compression code
    fn code(&self) -> u64;
}
