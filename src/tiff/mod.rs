//! TIFF file format parsing module
//!
//! This module provides structures and functions for reading
//! TIFF and BigTIFF format files.

pub mod errors;
pub mod ifd;
pub(crate) mod types;
pub mod reader;
pub(crate) mod constants;
pub mod geo_key_parser;
pub(crate) mod validation;

#[cfg(test)]
pub(crate) mod tests;

pub use crate::io::byte_order::{BigEndianHandler, ByteOrder, ByteOrderHandler, LittleEndianHandler};
pub use errors::{TiffError, TiffResult};
pub use geo_key_parser::{GeoInfo, GeoKeyEntry, GeoKeyParser};
pub use ifd::{IFD, IFDEntry};
pub use reader::TiffReader;
pub use types::TIFF;
