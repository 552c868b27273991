//! Handler for Adobe Deflate compressed data

use std::io::Read;
use flate2::read::ZlibDecoder;
use log::debug;

use crate::tiff::errors::TiffResult;
use crate::tiff::constants::compression;
use super::handler::CompressionHandler;

/// Adobe Deflate (zlib) handler
///
/// Serves both the registered code 8 and the legacy code 32946, which carry
/// the same zlib stream.
pub struct AdobeDeflateHandler {
    code: u16,
}

impl AdobeDeflateHandler {
    pub fn new() -> Self {
        AdobeDeflateHandler { code: compression::DEFLATE }
    }

    /// Handler registered under the pre-standard code 32946
    pub fn legacy() -> Self {
        AdobeDeflateHandler { code: compression::DEFLATE_LEGACY }
    }
}

impl Default for AdobeDeflateHandler {
    fn default() -> Self {
        Self::new()
    }
}

impl CompressionHandler for AdobeDeflateHandler {
    fn decompress(&self, data: &[u8]) -> TiffResult<Vec<u8>> {
        let mut decoder = ZlibDecoder::new(data);
        let mut decompressed_data = Vec::new();
        decoder.read_to_end(&mut decompressed_data)?;
        debug!("Deflate decompressed {} -> {} bytes", data.len(), decompressed_data.len());
        Ok(decompressed_data)
    }

    fn name(&self) -> &'static str {
        "Adobe Deflate"
    }

    fn code(&self) -> u64 {
        self.code as u64
    }
}
