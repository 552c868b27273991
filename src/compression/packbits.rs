//! Handler for PackBits run-length encoded data

use crate::tiff::errors::{TiffError, TiffResult};
use crate::tiff::constants::compression;
use super::handler::CompressionHandler;

/// PackBits handler (compression code 32773)
///
/// A header byte `n` in 0..=127 copies the next n+1 bytes, -127..=-1 repeats the
/// next byte 1-n times, and -128 is a no-op.
pub struct PackBitsHandler;

impl CompressionHandler for PackBitsHandler {
    fn decompress(&self, data: &[u8]) -> TiffResult<Vec<u8>> {
        let mut output = Vec::with_capacity(data.len() * 2);
        let mut pos = 0;

        while pos < data.len() {
            let header = data[pos] as i8;
            pos += 1;

            match header {
                -128 => continue,
                0..=127 => {
                    let count = header as usize + 1;
                    let literal = data.get(pos..pos + count)
                        .ok_or_else(|| TiffError::GenericError("PackBits: truncated literal run".to_string()))?;
                    output.extend_from_slice(literal);
                    pos += count;
                }
                _ => {
                    let byte = *data.get(pos)
                        .ok_or_else(|| TiffError::GenericError("PackBits: missing repeat byte".to_string()))?;
                    let count = (1 - header as isize) as usize;
                    output.resize(output.len() + count, byte);
                    pos += 1;
                }
            }
        }

        Ok(output)
    }

    fn name(&self) -> &'static str {
        "PackBits"
    }

    fn code(&self) -> u64 {
        compression::PACKBITS as u64
    }
}
