//! Seekable reader trait
//!
//! Raster files are opened either from disk (`BufReader<File>`) or from memory
//! (`Cursor<Vec<u8>>`); both go through this trait object.

use std::io::{Read, Seek};

/// Trait for readers that can both read and seek
pub trait SeekableReader: Read + Seek + Send + Sync {}

impl<T: Read + Seek + Send + Sync> SeekableReader for T {}
