//! TIFF validation utilities
//!
//! Guards against malformed headers and offsets before they are followed.

use log::{error, warn};
use std::io::SeekFrom;

use crate::io::seekable::SeekableReader;
use crate::tiff::errors::{TiffError, TiffResult};
use crate::io::byte_order::ByteOrderHandler;
use crate::tiff::constants::header;

/// Validates an IFD offset against the file size
pub fn validate_ifd_offset(offset: u64, file_size: u64) -> TiffResult<()> {
    if offset >= file_size || offset < 8 {
        return Err(TiffError::GenericError(format!(
            "Invalid IFD offset: {} (file size: {})",
            offset, file_size
        )));
    }

    Ok(())
}

/// Gets the size of the underlying stream, restoring the current position
pub fn get_file_size(reader: &mut dyn SeekableReader) -> TiffResult<u64> {
    let current_position = reader.stream_position()?;
    let file_size = match reader.seek(SeekFrom::End(0)) {
        Ok(size) => size,
        Err(e) => {
            warn!("Could not determine file size: {}", e);
            u64::MAX
        }
    };
    reader.seek(SeekFrom::Start(current_position))?;

    Ok(file_size)
}

/// Validates the BigTIFF header (offset size 8 followed by a zero word)
pub fn validate_bigtiff_header(
    reader: &mut dyn SeekableReader,
    byte_order_handler: &dyn ByteOrderHandler,
) -> TiffResult<()> {
    let offset_size = byte_order_handler.read_u16(reader)?;
    let zeros = byte_order_handler.read_u16(reader)?;

    if offset_size != header::BIGTIFF_OFFSET_SIZE || zeros != 0 {
        error!("Invalid BigTIFF header: offset_size={}, zeros={}", offset_size, zeros);
        return Err(TiffError::InvalidBigTIFFHeader);
    }

    Ok(())
}

/// Checks that a block's byte range lies inside the file
pub fn validate_block_range(index: usize, offset: u64, byte_count: u64, file_size: u64) -> TiffResult<()> {
    match offset.checked_add(byte_count) {
        Some(end) if end <= file_size => Ok(()),
        _ => Err(TiffError::GenericError(format!(
            "Block {} at offset {} with {} bytes exceeds file size {}",
            index, offset, byte_count, file_size
        ))),
    }
}
