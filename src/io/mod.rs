//! Low-level I/O helpers shared by the TIFF reader and the raster decoder

pub mod seekable;
pub mod byte_order;
