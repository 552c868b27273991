//! TIFF file reader implementation
//!
//! Parses the header and IFD chain of a TIFF/BigTIFF file and reads tag value
//! arrays. The byte order detected from the header is kept on the reader as a
//! `ByteOrderHandler` strategy and reused for every later read.

use log::{debug, info, warn};
use std::io::SeekFrom;

use crate::io::seekable::SeekableReader;
use crate::io::byte_order::{ByteOrder, ByteOrderHandler};
use crate::tiff::constants::field_types;
use crate::tiff::errors::{TiffError, TiffResult};
use crate::tiff::ifd::{IFD, IFDEntry};
use crate::tiff::types::TIFF;
use crate::tiff::validation;
use crate::utils::format_utils;
use crate::utils::ifd_utils;
use crate::utils::tag_utils;
use crate::utils::string_utils;

/// Upper bound on the IFD chain length, guards against offset loops
const MAX_IFDS: usize = 100;

/// Reader for TIFF and BigTIFF files
pub struct TiffReader {
    /// Current byte order handler
    byte_order_handler: Option<Box<dyn ByteOrderHandler>>,
    /// Whether currently reading BigTIFF format
    is_big_tiff: bool,
}

impl Default for TiffReader {
    fn default() -> Self {
        Self::new()
    }
}

impl TiffReader {
    /// Creates a new TIFF reader
    pub fn new() -> Self {
        TiffReader {
            byte_order_handler: None,
            is_big_tiff: false,
        }
    }

    fn handler(&self) -> TiffResult<&dyn ByteOrderHandler> {
        self.byte_order_handler.as_deref()
            .ok_or_else(|| TiffError::GenericError("Byte order not yet determined".to_string()))
    }

    /// Byte order of the file read last
    pub fn byte_order(&self) -> TiffResult<ByteOrder> {
        Ok(self.handler()?.byte_order())
    }

    /// Returns whether the current file is a BigTIFF
    pub fn is_big_tiff(&self) -> bool {
        self.is_big_tiff
    }

    /// Reads a TIFF file from the given reader
    ///
    /// 1. Detect byte order (little/big endian)
    /// 2. Check for TIFF or BigTIFF format
    /// 3. Read all IFDs (Image File Directories)
    pub fn read(&mut self, reader: &mut dyn SeekableReader) -> TiffResult<TIFF> {
        reader.seek(SeekFrom::Start(0))?;

        let byte_order = format_utils::detect_byte_order(reader)?;
        self.byte_order_handler = Some(byte_order.create_handler());

        let (is_big_tiff, _) = format_utils::detect_tiff_format(reader, self.handler()?)?;
        self.is_big_tiff = is_big_tiff;

        let first_ifd_offset = ifd_utils::read_ifd_offset(reader, self.is_big_tiff, self.handler()?)?;
        debug!("First IFD offset: {}", first_ifd_offset);

        let file_size = validation::get_file_size(reader)?;
        validation::validate_ifd_offset(first_ifd_offset, file_size)?;

        let mut tiff = TIFF::new(self.is_big_tiff, byte_order);
        tiff.ifds = self.read_ifd_chain(reader, first_ifd_offset, file_size)?;

        if tiff.ifds.is_empty() {
            return Err(TiffError::GenericError("No IFDs found in TIFF file".to_string()));
        }

        info!("Read {} IFDs ({})", tiff.ifds.len(), if is_big_tiff { "BigTIFF" } else { "TIFF" });
        Ok(tiff)
    }

    /// Reads a chain of IFDs starting from the given offset
    ///
    /// A broken link ends the chain with a warning; the IFDs read so far are kept.
    fn read_ifd_chain(&self, reader: &mut dyn SeekableReader, first_ifd_offset: u64, file_size: u64) -> TiffResult<Vec<IFD>> {
        let mut ifds = Vec::new();
        let mut ifd_offset = first_ifd_offset;

        while ifd_offset != 0 && ifds.len() < MAX_IFDS {
            if ifd_offset >= file_size {
                warn!("IFD offset {} exceeds file size {}, stopping IFD chain", ifd_offset, file_size);
                break;
            }

            let ifd = match self.read_ifd(reader, ifd_offset, ifds.len()) {
                Ok(ifd) => ifd,
                Err(e) => {
                    warn!("Error reading IFD {}: {}", ifds.len(), e);
                    break;
                }
            };

            let next_offset_position = ifd_offset + ifd_utils::calculate_ifd_size(&ifd, self.is_big_tiff);
            ifds.push(ifd);

            if next_offset_position >= file_size {
                break;
            }

            reader.seek(SeekFrom::Start(next_offset_position))?;
            ifd_offset = match ifd_utils::read_ifd_offset(reader, self.is_big_tiff, self.handler()?) {
                Ok(offset) => offset,
                Err(e) => {
                    warn!("Error reading next IFD offset: {}", e);
                    break;
                }
            };

            if ifd_offset != 0 && (ifd_offset >= file_size || ifd_offset < 8) {
                warn!("Invalid next IFD offset: {}, stopping IFD chain", ifd_offset);
                break;
            }
        }

        Ok(ifds)
    }

    /// Reads an IFD: an entry count followed by that many tag entries
    pub fn read_ifd(&self, reader: &mut dyn SeekableReader, offset: u64, number: usize) -> TiffResult<IFD> {
        reader.seek(SeekFrom::Start(offset))?;
        let handler = self.handler()?;

        let entry_count = if self.is_big_tiff {
            handler.read_u64(reader)?
        } else {
            handler.read_u16(reader)? as u64
        };
        debug!("IFD #{} at {} has {} entries", number, offset, entry_count);

        let mut ifd = IFD::new(number, offset);
        for _ in 0..entry_count {
            ifd.add_entry(self.read_ifd_entry(reader)?);
        }

        Ok(ifd)
    }

    /// Reads a single IFD entry, keeping the raw value field
    fn read_ifd_entry(&self, reader: &mut dyn SeekableReader) -> TiffResult<IFDEntry> {
        let handler = self.handler()?;
        let order = handler.byte_order();

        let tag = handler.read_u16(reader)?;
        let field_type = handler.read_u16(reader)?;
        let count = if self.is_big_tiff {
            handler.read_u64(reader)?
        } else {
            handler.read_u32(reader)? as u64
        };

        let field_len = if self.is_big_tiff { 8 } else { 4 };
        let mut raw = [0u8; 8];
        reader.read_exact(&mut raw[..field_len])?;

        let offset = if self.is_big_tiff {
            order.u64_from(&raw)
        } else {
            order.u32_from(&raw[..4]) as u64
        };

        let mut entry = IFDEntry::with_raw(tag, field_type, count, offset, raw);
        if entry.count == 1 && entry.is_value_inline(self.is_big_tiff) {
            if let Some(value) = tag_utils::unpack_inline_values(&entry, order).first() {
                entry.value_offset = *value;
            }
        }

        Ok(entry)
    }

    /// Reads a tag's integer values as a vector of u64
    pub fn read_tag_values(&self, reader: &mut dyn SeekableReader, ifd: &IFD, tag: u16) -> TiffResult<Vec<u64>> {
        let entry = ifd.get_entry(tag)
            .ok_or(TiffError::TagNotFound(tag))?;
        let handler = self.handler()?;

        if entry.is_value_inline(self.is_big_tiff) {
            return Ok(tag_utils::unpack_inline_values(entry, handler.byte_order()));
        }

        let mut values = Vec::with_capacity(entry.count as usize);
        reader.seek(SeekFrom::Start(entry.value_offset))?;
        tag_utils::read_tag_value_array(reader, entry, handler, &mut values)?;

        Ok(values)
    }

    /// Reads a DOUBLE tag (ModelPixelScale, ModelTiepoint, GeoDoubleParams, ...)
    pub fn read_tag_doubles(&self, reader: &mut dyn SeekableReader, ifd: &IFD, tag: u16) -> TiffResult<Vec<f64>> {
        let entry = ifd.get_entry(tag)
            .ok_or(TiffError::TagNotFound(tag))?;
        if entry.field_type != field_types::DOUBLE {
            return Err(TiffError::UnsupportedFieldType(entry.field_type));
        }
        let handler = self.handler()?;

        if entry.is_value_inline(self.is_big_tiff) {
            return Ok(vec![f64::from_bits(handler.byte_order().u64_from(&entry.raw))]);
        }

        reader.seek(SeekFrom::Start(entry.value_offset))?;
        let mut values = Vec::with_capacity(entry.count as usize);
        for _ in 0..entry.count {
            values.push(handler.read_f64(reader)?);
        }

        Ok(values)
    }

    /// Reads an ASCII tag, with trailing NULs removed
    pub fn read_tag_ascii(&self, reader: &mut dyn SeekableReader, ifd: &IFD, tag: u16) -> TiffResult<String> {
        let entry = ifd.get_entry(tag)
            .ok_or(TiffError::TagNotFound(tag))?;

        let mut buffer = if entry.is_value_inline(self.is_big_tiff) {
            entry.raw[..entry.count as usize].to_vec()
        } else {
            reader.seek(SeekFrom::Start(entry.value_offset))?;
            let mut buffer = vec![0u8; entry.count as usize];
            reader.read_exact(&mut buffer)?;
            buffer
        };

        string_utils::trim_trailing_nulls(&mut buffer);
        String::from_utf8(buffer)
            .map_err(|e| TiffError::GenericError(format!("Invalid UTF-8 string in tag {}: {}", tag, e)))
    }
}
