//! TIFF tag utilities
//!
//! Reading tag value arrays and naming tags, field types and compression codes
//! for log output.

use byteorder::ReadBytesExt;

use crate::io::seekable::SeekableReader;
use crate::io::byte_order::{ByteOrder, ByteOrderHandler};
use crate::tiff::errors::{TiffError, TiffResult};
use crate::tiff::ifd::IFDEntry;
use crate::tiff::constants::{field_types, tags, compression};

/// Reads an array of integer tag values based on the field type
///
/// The reader must already be positioned at the first value.
pub fn read_tag_value_array(
    reader: &mut dyn SeekableReader,
    entry: &IFDEntry,
    handler: &dyn ByteOrderHandler,
    values: &mut Vec<u64>,
) -> TiffResult<()> {
    for _ in 0..entry.count {
        let value = match entry.field_type {
            field_types::BYTE | field_types::SBYTE | field_types::UNDEFINED => reader.read_u8()? as u64,
            field_types::SHORT | field_types::SSHORT => handler.read_u16(reader)? as u64,
            field_types::LONG | field_types::SLONG => handler.read_u32(reader)? as u64,
            field_types::LONG8 | field_types::SLONG8 | field_types::IFD8 => handler.read_u64(reader)?,
            _ => return Err(TiffError::UnsupportedFieldType(entry.field_type)),
        };

        values.push(value);
    }

    Ok(())
}

/// Decodes integer values stored inline in an entry's value field
///
/// Inline values are left-justified in the value field, so they are decoded
/// from the raw field bytes in file byte order.
pub fn unpack_inline_values(entry: &IFDEntry, order: ByteOrder) -> Vec<u64> {
    let size = entry.get_field_type_size();
    (0..entry.count as usize)
        .filter(|i| (i + 1) * size <= entry.raw.len())
        .map(|i| {
            let bytes = &entry.raw[i * size..(i + 1) * size];
            match size {
                1 => bytes[0] as u64,
                2 => order.u16_from(bytes) as u64,
                4 => order.u32_from(bytes) as u64,
                _ => order.u64_from(bytes),
            }
        })
        .collect()
}

/// Get the name of a TIFF tag
pub fn get_tag_name(tag: u16) -> &'static str {
    match tag {
        tags::NEW_SUBFILE_TYPE => "NewSubfileType",
        tags::IMAGE_WIDTH => "ImageWidth",
        tags::IMAGE_LENGTH => "ImageLength",
        tags::BITS_PER_SAMPLE => "BitsPerSample",
        tags::COMPRESSION => "Compression",
        tags::PHOTOMETRIC_INTERPRETATION => "PhotometricInterpretation",
        tags::STRIP_OFFSETS => "StripOffsets",
        tags::SAMPLES_PER_PIXEL => "SamplesPerPixel",
        tags::ROWS_PER_STRIP => "RowsPerStrip",
        tags::STRIP_BYTE_COUNTS => "StripByteCounts",
        tags::PLANAR_CONFIGURATION => "PlanarConfiguration",
        tags::PREDICTOR => "Predictor",
        tags::TILE_WIDTH => "TileWidth",
        tags::TILE_LENGTH => "TileLength",
        tags::TILE_OFFSETS => "TileOffsets",
        tags::TILE_BYTE_COUNTS => "TileByteCounts",
        tags::SAMPLE_FORMAT => "SampleFormat",
        tags::MODEL_PIXEL_SCALE_TAG => "ModelPixelScale",
        tags::MODEL_TIEPOINT_TAG => "ModelTiepoint",
        tags::MODEL_TRANSFORMATION_TAG => "ModelTransformation",
        tags::GEO_KEY_DIRECTORY_TAG => "GeoKeyDirectory",
        tags::GEO_DOUBLE_PARAMS_TAG => "GeoDoubleParams",
        tags::GEO_ASCII_PARAMS_TAG => "GeoAsciiParams",
        tags::GDAL_METADATA => "GDALMetadata",
        tags::GDAL_NODATA => "GDALNoData",
        _ => "Unknown",
    }
}

/// Get the name of a TIFF field type
pub fn get_field_type_name(field_type: u16) -> &'static str {
    match field_type {
        field_types::BYTE => "BYTE",
        field_types::ASCII => "ASCII",
        field_types::SHORT => "SHORT",
        field_types::LONG => "LONG",
        field_types::RATIONAL => "RATIONAL",
        field_types::SBYTE => "SBYTE",
        field_types::UNDEFINED => "UNDEFINED",
        field_types::SSHORT => "SSHORT",
        field_types::SLONG => "SLONG",
        field_types::SRATIONAL => "SRATIONAL",
        field_types::FLOAT => "FLOAT",
        field_types::DOUBLE => "DOUBLE",
        field_types::LONG8 => "LONG8",
        field_types::SLONG8 => "SLONG8",
        field_types::IFD8 => "IFD8",
        _ => "Unknown",
    }
}

/// Get the name of a compression method
pub fn get_compression_name(compression_code: u64) -> &'static str {
    match compression_code as u16 {
        compression::NONE => "None",
        compression::LZW => "LZW",
        compression::JPEG => "JPEG",
        compression::DEFLATE | compression::DEFLATE_LEGACY => "Adobe Deflate",
        compression::ZSTD => "Zstandard",
        compression::PACKBITS => "PackBits",
        _ => "Unknown",
    }
}
