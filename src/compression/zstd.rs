//! Handler for ZSTD compressed data

use crate::tiff::errors::{TiffError, TiffResult};
use crate::tiff::constants::compression;
use super::handler::CompressionHandler;
use log::{debug, warn};

/// ZSTD compression handler (compression code 14)
pub struct ZstdHandler;

impl CompressionHandler for ZstdHandler {
    fn decompress(&self, data: &[u8]) -> TiffResult<Vec<u8>> {
        if data.is_empty() {
            return Ok(Vec::new());
        }

        match zstd::decode_all(data) {
            Ok(decompressed_data) => {
                debug!("ZSTD decompressed {} -> {} bytes", data.len(), decompressed_data.len());
                Ok(decompressed_data)
            },
            Err(e) => {
                warn!("ZSTD decompression error: {}", e);
                Err(TiffError::GenericError(format!("ZSTD decompression error: {}", e)))
            }
        }
    }

    fn name(&self) -> &'static str {
        "ZSTD"
    }

    fn code(&self) -> u64 {
        compression::ZSTD as u64
    }
}
