//! Byte order handling for TIFF files
//!
//! Header and IFD fields are read through a `ByteOrderHandler` strategy chosen
//! from the "II"/"MM" marker. Decoded pixel blocks are plain byte slices, so
//! `ByteOrder` also offers slice decoders for sample values.

use byteorder::{BigEndian, ByteOrder as Endian, LittleEndian, ReadBytesExt};
use std::io::Result;

use crate::io::seekable::SeekableReader;
use crate::tiff::errors::{TiffError, TiffResult};

/// Represents the byte order of a TIFF file
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ByteOrder {
    /// Little-endian byte order (II)
    LittleEndian,
    /// Big-endian byte order (MM)
    BigEndian,
}

impl ByteOrder {
    /// Detects the byte order from the TIFF header
    pub fn detect(reader: &mut dyn SeekableReader) -> TiffResult<Self> {
        let marker = reader.read_u16::<LittleEndian>()?;
        match marker {
            0x4949 => Ok(ByteOrder::LittleEndian), // "II"
            0x4D4D => Ok(ByteOrder::BigEndian),    // "MM"
            _ => Err(TiffError::InvalidByteOrder(marker)),
        }
    }

    /// Returns a string representation of this byte order
    pub fn name(&self) -> &'static str {
        match self {
            ByteOrder::LittleEndian => "Little Endian (II)",
            ByteOrder::BigEndian => "Big Endian (MM)",
        }
    }

    /// Creates the appropriate handler for this byte order
    pub fn create_handler(&self) -> Box<dyn ByteOrderHandler> {
        match self {
            ByteOrder::LittleEndian => Box::new(LittleEndianHandler),
            ByteOrder::BigEndian => Box::new(BigEndianHandler),
        }
    }

    pub fn u16_from(&self, bytes: &[u8]) -> u16 {
        match self {
            ByteOrder::LittleEndian => LittleEndian::read_u16(bytes),
            ByteOrder::BigEndian => BigEndian::read_u16(bytes),
        }
    }

    pub fn u32_from(&self, bytes: &[u8]) -> u32 {
        match self {
            ByteOrder::LittleEndian => LittleEndian::read_u32(bytes),
            ByteOrder::BigEndian => BigEndian::read_u32(bytes),
        }
    }

    pub fn u64_from(&self, bytes: &[u8]) -> u64 {
        match self {
            ByteOrder::LittleEndian => LittleEndian::read_u64(bytes),
            ByteOrder::BigEndian => BigEndian::read_u64(bytes),
        }
    }

    pub fn write_u16(&self, bytes: &mut [u8], value: u16) {
        match self {
            ByteOrder::LittleEndian => LittleEndian::write_u16(bytes, value),
            ByteOrder::BigEndian => BigEndian::write_u16(bytes, value),
        }
    }

    pub fn write_u32(&self, bytes: &mut [u8], value: u32) {
        match self {
            ByteOrder::LittleEndian => LittleEndian::write_u32(bytes, value),
            ByteOrder::BigEndian => BigEndian::write_u32(bytes, value),
        }
    }

    pub fn write_u64(&self, bytes: &mut [u8], value: u64) {
        match self {
            ByteOrder::LittleEndian => LittleEndian::write_u64(bytes, value),
            ByteOrder::BigEndian => BigEndian::write_u64(bytes, value),
        }
    }
}

/// Trait for byte order handling strategies
pub trait ByteOrderHandler: Send + Sync {
    /// The byte order this handler reads
    fn byte_order(&self) -> ByteOrder;

    /// Read a u16 value
    fn read_u16(&self, reader: &mut dyn SeekableReader) -> Result<u16>;

    /// Read a u32 value
    fn read_u32(&self, reader: &mut dyn SeekableReader) -> Result<u32>;

    /// Read a u64 value
    fn read_u64(&self, reader: &mut dyn SeekableReader) -> Result<u64>;

    /// Read an f64 value
    fn read_f64(&self, reader: &mut dyn SeekableReader) -> Result<f64>;
}

/// Little-endian byte order handler
pub struct LittleEndianHandler;

impl ByteOrderHandler for LittleEndianHandler {
    fn byte_order(&self) -> ByteOrder {
        ByteOrder::LittleEndian
    }

    fn read_u16(&self, reader: &mut dyn SeekableReader) -> Result<u16> {
        reader.read_u16::<LittleEndian>()
    }

    fn read_u32(&self, reader: &mut dyn SeekableReader) -> Result<u32> {
        reader.read_u32::<LittleEndian>()
    }

    fn read_u64(&self, reader: &mut dyn SeekableReader) -> Result<u64> {
        reader.read_u64::<LittleEndian>()
    }

    fn read_f64(&self, reader: &mut dyn SeekableReader) -> Result<f64> {
        reader.read_f64::<LittleEndian>()
    }
}

/// Big-endian byte order handler
pub struct BigEndianHandler;

impl ByteOrderHandler for BigEndianHandler {
    fn byte_order(&self) -> ByteOrder {
        ByteOrder::BigEndian
    }

    fn read_u16(&self, reader: &mut dyn SeekableReader) -> Result<u16> {
        reader.read_u16::<BigEndian>()
    }

    fn read_u32(&self, reader: &mut dyn SeekableReader) -> Result<u32> {
        reader.read_u32::<BigEndian>()
    }

    fn read_u64(&self, reader: &mut dyn SeekableReader) -> Result<u64> {
        reader.read_u64::<BigEndian>()
    }

    fn read_f64(&self, reader: &mut dyn SeekableReader) -> Result<f64> {
        reader.read_f64::<BigEndian>()
    }
}
