//! TIFF predictor reversal
//!
//! Horizontal differencing (predictor 2) stores each sample as the difference
//! to the previous sample of the same channel in the row. Decoding adds the
//! running value back, with wrapping arithmetic at the sample's width.

use crate::io::byte_order::ByteOrder;
use crate::tiff::errors::{TiffError, TiffResult};

/// Undo horizontal differencing in a decoded block
///
/// * `row_len` - samples per row (pixels per row times `stride`)
/// * `stride` - distance between samples of the same channel
pub fn undo_horizontal_differencing(
    data: &mut [u8],
    row_len: usize,
    rows: usize,
    sample_size: usize,
    stride: usize,
    order: ByteOrder,
) -> TiffResult<()> {
    let row_bytes = row_len * sample_size;
    if data.len() < row_bytes * rows {
        return Err(TiffError::GenericError(format!(
            "Predictor block holds {} bytes, expected {}", data.len(), row_bytes * rows
        )));
    }

    for row in data.chunks_exact_mut(row_bytes).take(rows) {
        for i in stride..row_len {
            let (prev, cur) = (i - stride, i);
            match sample_size {
                1 => row[cur] = row[cur].wrapping_add(row[prev]),
                2 => {
                    let sum = order.u16_from(&row[cur * 2..]).wrapping_add(order.u16_from(&row[prev * 2..]));
                    order.write_u16(&mut row[cur * 2..cur * 2 + 2], sum);
                }
                4 => {
                    let sum = order.u32_from(&row[cur * 4..]).wrapping_add(order.u32_from(&row[prev * 4..]));
                    order.write_u32(&mut row[cur * 4..cur * 4 + 4], sum);
                }
                8 => {
                    let sum = order.u64_from(&row[cur * 8..]).wrapping_add(order.u64_from(&row[prev * 8..]));
                    order.write_u64(&mut row[cur * 8..cur * 8 + 8], sum);
                }
                other => return Err(TiffError::GenericError(format!("Predictor on {}-byte samples", other))),
            }
        }
    }

    Ok(())
}
