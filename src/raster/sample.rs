//! Pixel sample types and decoding

use std::fmt;
use serde::{Deserialize, Serialize};

use crate::io::byte_order::ByteOrder;
use crate::tiff::constants::sample_format;
use crate::tiff::errors::{TiffError, TiffResult};

/// A pixel value in the raster's native numeric type
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PixelValue {
    Unsigned(u64),
    Signed(i64),
    Float(f64),
}

impl PixelValue {
    pub fn as_f64(&self) -> f64 {
        match *self {
            PixelValue::Unsigned(v) => v as f64,
            PixelValue::Signed(v) => v as f64,
            PixelValue::Float(v) => v,
        }
    }
}

impl fmt::Display for PixelValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PixelValue::Unsigned(v) => write!(f, "{}", v),
            PixelValue::Signed(v) => write!(f, "{}", v),
            PixelValue::Float(v) => write!(f, "{}", v),
        }
    }
}

/// Storage type of one sample, from BitsPerSample and SampleFormat
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SampleType {
    U8,
    U16,
    U32,
    U64,
    I8,
    I16,
    I32,
    I64,
    F32,
    F64,
}

impl SampleType {
    pub fn from_tags(bits: u16, format: u16) -> TiffResult<Self> {
        let sample_type = match (format, bits) {
            (sample_format::UNSIGNED, 8) => SampleType::U8,
            (sample_format::UNSIGNED, 16) => SampleType::U16,
            (sample_format::UNSIGNED, 32) => SampleType::U32,
            (sample_format::UNSIGNED, 64) => SampleType::U64,
            (sample_format::SIGNED, 8) => SampleType::I8,
            (sample_format::SIGNED, 16) => SampleType::I16,
            (sample_format::SIGNED, 32) => SampleType::I32,
            (sample_format::SIGNED, 64) => SampleType::I64,
            (sample_format::IEEEFP, 32) => SampleType::F32,
            (sample_format::IEEEFP, 64) => SampleType::F64,
            _ => return Err(TiffError::UnsupportedSampleLayout { bits, format }),
        };
        Ok(sample_type)
    }

    /// Size of one sample in bytes
    pub fn byte_size(&self) -> usize {
        match self {
            SampleType::U8 | SampleType::I8 => 1,
            SampleType::U16 | SampleType::I16 => 2,
            SampleType::U32 | SampleType::I32 | SampleType::F32 => 4,
            SampleType::U64 | SampleType::I64 | SampleType::F64 => 8,
        }
    }

    pub fn is_float(&self) -> bool {
        matches!(self, SampleType::F32 | SampleType::F64)
    }

    /// Decode one sample from the start of `bytes`
    pub fn decode(&self, bytes: &[u8], order: ByteOrder) -> PixelValue {
        match self {
            SampleType::U8 => PixelValue::Unsigned(bytes[0] as u64),
            SampleType::U16 => PixelValue::Unsigned(order.u16_from(bytes) as u64),
            SampleType::U32 => PixelValue::Unsigned(order.u32_from(bytes) as u64),
            SampleType::U64 => PixelValue::Unsigned(order.u64_from(bytes)),
            SampleType::I8 => PixelValue::Signed(bytes[0] as i8 as i64),
            SampleType::I16 => PixelValue::Signed(order.u16_from(bytes) as i16 as i64),
            SampleType::I32 => PixelValue::Signed(order.u32_from(bytes) as i32 as i64),
            SampleType::I64 => PixelValue::Signed(order.u64_from(bytes) as i64),
            SampleType::F32 => PixelValue::Float(f32::from_bits(order.u32_from(bytes)) as f64),
            SampleType::F64 => PixelValue::Float(f64::from_bits(order.u64_from(bytes))),
        }
    }
}
