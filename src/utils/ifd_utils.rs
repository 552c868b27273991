//! IFD utilities
//!
//! Offsets and sizes needed to walk the IFD chain.

use crate::io::seekable::SeekableReader;
use crate::io::byte_order::ByteOrderHandler;
use crate::tiff::errors::TiffResult;
use crate::tiff::ifd::IFD;

/// Reads an IFD offset (the header's first offset or an IFD's next-pointer)
pub fn read_ifd_offset(
    reader: &mut dyn SeekableReader,
    is_big_tiff: bool,
    byte_order_handler: &dyn ByteOrderHandler,
) -> TiffResult<u64> {
    let offset = if is_big_tiff {
        byte_order_handler.read_u64(reader)?
    } else {
        byte_order_handler.read_u32(reader)? as u64
    };
    Ok(offset)
}

/// Calculates the size of an IFD in bytes, excluding the next-IFD pointer
pub fn calculate_ifd_size(ifd: &IFD, is_big_tiff: bool) -> u64 {
    if is_big_tiff {
        // 8 (entry count) + 20 (each entry)
        8 + (20 * ifd.entries.len() as u64)
    } else {
        // 2 (entry count) + 12 (each entry)
        2 + (12 * ifd.entries.len() as u64)
    }
}
