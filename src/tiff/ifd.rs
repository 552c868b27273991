//! Image File Directory (IFD) structures and methods
//!
//! An IFD is the tag directory describing one image in a TIFF file. The raster
//! decoder only ever works from the first full-resolution IFD, but the whole
//! chain is kept so overviews can be told apart.

use std::collections::HashMap;
use std::fmt;
use crate::tiff::constants::{field_types, tags};
use log::trace;
use crate::utils::tag_utils;

/// Represents an Image File Directory (IFD) in a TIFF file
#[derive(Debug, Clone)]
pub struct IFD {
    /// Entries in this IFD
    pub entries: Vec<IFDEntry>,
    /// IFD number (0-based)
    pub number: usize,
    /// Offset to this IFD in the file
    pub offset: u64,
    /// Cached tag values for quick lookup
    tag_map: HashMap<u16, IFDEntry>,
}

/// Represents an entry in an Image File Directory (IFD)
///
/// For small values `value_offset` holds the value itself, otherwise it is the
/// file offset of the value array.
#[derive(Debug, Clone)]
pub struct IFDEntry {
    /// TIFF tag identifier
    pub tag: u16,
    /// Field type
    pub field_type: u16,
    /// Number of values
    pub count: u64,
    /// Value or offset to values
    pub value_offset: u64,
    /// The value field exactly as stored in the file (4 bytes for TIFF, 8 for BigTIFF)
    pub raw: [u8; 8],
}

impl IFDEntry {
    /// Creates a new IFD entry whose value field is `value_offset` in little-endian order
    pub fn new(tag: u16, field_type: u16, count: u64, value_offset: u64) -> Self {
        Self::with_raw(tag, field_type, count, value_offset, value_offset.to_le_bytes())
    }

    /// Creates a new IFD entry keeping the raw value field bytes
    pub fn with_raw(tag: u16, field_type: u16, count: u64, value_offset: u64, raw: [u8; 8]) -> Self {
        trace!("IFD entry: tag={} ({}), type={} ({}), count={}, offset/value={}",
               tag, tag_utils::get_tag_name(tag), field_type,
               tag_utils::get_field_type_name(field_type), count, value_offset);

        Self {
            tag,
            field_type,
            count,
            value_offset,
            raw,
        }
    }

    /// Get the size in bytes of one value of this entry's field type
    pub fn get_field_type_size(&self) -> usize {
        match self.field_type {
            field_types::BYTE | field_types::ASCII | field_types::SBYTE | field_types::UNDEFINED => 1,
            field_types::SHORT | field_types::SSHORT => 2,
            field_types::LONG | field_types::SLONG | field_types::FLOAT => 4,
            field_types::RATIONAL | field_types::SRATIONAL | field_types::DOUBLE => 8,
            field_types::LONG8 | field_types::SLONG8 | field_types::IFD8 => 8,
            _ => 1,
        }
    }

    /// Whether the value fits in the entry itself rather than at an offset
    pub fn is_value_inline(&self, is_big_tiff: bool) -> bool {
        let total_size = self.get_field_type_size() as u64 * self.count;
        let inline_size = if is_big_tiff { 8 } else { 4 };
        total_size <= inline_size
    }
}

impl IFD {
    /// Creates a new, empty IFD
    pub fn new(number: usize, offset: u64) -> Self {
        Self {
            entries: Vec::new(),
            number,
            offset,
            tag_map: HashMap::new(),
        }
    }

    /// Adds an entry to this IFD
    pub fn add_entry(&mut self, entry: IFDEntry) {
        self.tag_map.insert(entry.tag, entry.clone());
        self.entries.push(entry);
    }

    /// Gets a tag value (value_offset) directly
    pub fn get_tag_value(&self, tag: u16) -> Option<u64> {
        self.tag_map.get(&tag).map(|entry| entry.value_offset)
    }

    /// Checks if this IFD has a specific tag
    pub fn has_tag(&self, tag: u16) -> bool {
        self.tag_map.contains_key(&tag)
    }

    /// Gets an IFD entry by tag
    pub fn get_entry(&self, tag: u16) -> Option<&IFDEntry> {
        self.tag_map.get(&tag)
    }

    /// Width and height of the image, if both tags are present
    pub fn get_dimensions(&self) -> Option<(u64, u64)> {
        let width = self.get_tag_value(tags::IMAGE_WIDTH)?;
        let height = self.get_tag_value(tags::IMAGE_LENGTH)?;
        Some((width, height))
    }

    /// Number of samples per pixel (default 1)
    pub fn get_samples_per_pixel(&self) -> u64 {
        self.get_tag_value(tags::SAMPLES_PER_PIXEL).unwrap_or(1)
    }

    /// Whether the image data is organised in tiles instead of strips
    pub fn is_tiled(&self) -> bool {
        self.has_tag(tags::TILE_WIDTH) && self.has_tag(tags::TILE_LENGTH)
    }

    /// Whether this IFD is a reduced-resolution overview
    pub fn is_overview(&self) -> bool {
        self.get_tag_value(tags::NEW_SUBFILE_TYPE)
            .map(|subfile_type| subfile_type & 1 == 1)
            .unwrap_or(false)
    }
}

impl fmt::Display for IFD {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "IFD #{} (offset: {})", self.number, self.offset)?;
        if let Some((width, height)) = self.get_dimensions() {
            writeln!(f, "  Dimensions: {}x{}", width, height)?;
        }
        writeln!(f, "  Samples per pixel: {}", self.get_samples_per_pixel())?;
        for entry in &self.entries {
            let value_display = match entry.tag {
                tags::COMPRESSION => format!("{} ({})",
                                             entry.value_offset,
                                             tag_utils::get_compression_name(entry.value_offset)),
                _ => entry.value_offset.to_string(),
            };
            writeln!(f, "    {} ({}): {} [{}]",
                     entry.tag, tag_utils::get_tag_name(entry.tag), value_display,
                     tag_utils::get_field_type_name(entry.field_type))?;
        }
        Ok(())
    }
}
