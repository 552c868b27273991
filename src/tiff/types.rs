//! Core TIFF data structures

use crate::io::byte_order::ByteOrder;
use crate::tiff::ifd::IFD;
use std::fmt;

/// Represents a TIFF file with its Image File Directories (IFDs)
#[derive(Debug)]
pub struct TIFF {
    /// Image File Directories in the TIFF file
    pub ifds: Vec<IFD>,
    /// Whether this is a BigTIFF format
    pub is_big_tiff: bool,
    /// Byte order declared in the header
    pub byte_order: ByteOrder,
}

impl TIFF {
    /// Creates a new empty TIFF structure
    pub fn new(is_big_tiff: bool, byte_order: ByteOrder) -> Self {
        TIFF {
            ifds: Vec::new(),
            is_big_tiff,
            byte_order,
        }
    }

    /// Returns the main (first) IFD if available
    pub fn main_ifd(&self) -> Option<&IFD> {
        self.ifds.first()
    }

    /// First IFD that holds full-resolution image data
    ///
    /// Cloud-optimized files can put a mask or overview first, so overviews
    /// are skipped; falls back to the first IFD.
    pub fn full_resolution_ifd(&self) -> Option<&IFD> {
        self.ifds.iter()
            .find(|ifd| !ifd.is_overview())
            .or_else(|| self.main_ifd())
    }

    /// Returns the number of IFDs in the TIFF file
    pub fn ifd_count(&self) -> usize {
        self.ifds.len()
    }

    /// Returns all reduced-resolution IFDs
    pub fn overviews(&self) -> Vec<&IFD> {
        self.ifds.iter()
            .filter(|ifd| ifd.is_overview())
            .collect()
    }
}

impl fmt::Display for TIFF {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "TIFF File:")?;
        writeln!(f, "  Format: {}", if self.is_big_tiff { "BigTIFF" } else { "TIFF" })?;
        writeln!(f, "  Byte order: {}", self.byte_order.name())?;
        writeln!(f, "  Number of IFDs: {}", self.ifds.len())?;

        if let Some(ifd) = self.main_ifd() {
            write!(f, "{}", ifd)?;
        }

        Ok(())
    }
}
