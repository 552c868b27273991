//! Compression handling for TIFF files
//!
//! Each supported TIFF compression code is decoded by a `CompressionHandler`
//! strategy; `CompressionFactory` picks the handler from the IFD's code.

mod handler;
mod uncompressed;
mod deflate;
mod factory;
mod zstd;
mod lzw;
mod packbits;

pub use handler::CompressionHandler;
pub use uncompressed::UncompressedHandler;
pub use deflate::AdobeDeflateHandler;
pub use factory::CompressionFactory;
pub use zstd::ZstdHandler;
pub use lzw::LzwHandler;
pub use packbits::PackBitsHandler;
