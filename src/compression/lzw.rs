//! Handler for TIFF LZW compressed data
//!
//! TIFF LZW packs codes most-significant-bit first and widens the code size
//! one entry early (at 511, 1023 and 2047 rather than at the power of two).

use crate::tiff::errors::{TiffError, TiffResult};
use crate::tiff::constants::compression;
use super::handler::CompressionHandler;

const CLEAR_CODE: u16 = 256;
const EOI_CODE: u16 = 257;
const FIRST_FREE: usize = 258;
const MAX_CODE_SIZE: u8 = 12;
const TABLE_LIMIT: usize = 4096;

/// LZW handler (compression code 5)
pub struct LzwHandler;

impl CompressionHandler for LzwHandler {
    fn decompress(&self, data: &[u8]) -> TiffResult<Vec<u8>> {
        LzwDecoder::new().decode(data)
    }

    fn name(&self) -> &'static str {
        "LZW"
    }

    fn code(&self) -> u64 {
        compression::LZW as u64
    }
}

struct LzwDecoder {
    dictionary: Vec<Vec<u8>>,
}

impl LzwDecoder {
    fn new() -> Self {
        let mut dictionary = Vec::with_capacity(TABLE_LIMIT);
        for i in 0..=255u8 {
            dictionary.push(vec![i]);
        }
        // Clear and EOI occupy 256 and 257
        dictionary.push(Vec::new());
        dictionary.push(Vec::new());

        Self { dictionary }
    }

    fn reset(&mut self) {
        self.dictionary.truncate(FIRST_FREE);
    }

    fn decode(&mut self, data: &[u8]) -> TiffResult<Vec<u8>> {
        let mut output = Vec::with_capacity(data.len() * 2);
        let mut reader = BitReader::new(data);
        let mut code_size = 9;
        let mut previous: Option<usize> = None;

        while let Some(code) = reader.read_bits(code_size) {
            if code == EOI_CODE {
                break;
            }
            if code == CLEAR_CODE {
                self.reset();
                code_size = 9;
                previous = None;
                continue;
            }

            let code = code as usize;
            let entry = if code < self.dictionary.len() {
                self.dictionary[code].clone()
            } else if code == self.dictionary.len() {
                let prev = previous
                    .ok_or_else(|| TiffError::GenericError(format!("Invalid LZW code {} after clear", code)))?;
                let mut entry = self.dictionary[prev].clone();
                entry.push(self.dictionary[prev][0]);
                entry
            } else {
                return Err(TiffError::GenericError(format!("Invalid LZW code: {}", code)));
            };

            output.extend_from_slice(&entry);

            if let Some(prev) = previous {
                if self.dictionary.len() < TABLE_LIMIT {
                    let mut new_entry = self.dictionary[prev].clone();
                    new_entry.push(entry[0]);
                    self.dictionary.push(new_entry);
                }
                if self.dictionary.len() + 1 == (1 << code_size) && code_size < MAX_CODE_SIZE {
                    code_size += 1;
                }
            }

            previous = Some(code);
        }

        Ok(output)
    }
}

/// Reads MSB-first variable-length codes from a byte stream
struct BitReader<'a> {
    data: &'a [u8],
    bit_position: usize,
}

impl<'a> BitReader<'a> {
    fn new(data: &'a [u8]) -> Self {
        Self { data, bit_position: 0 }
    }

    fn read_bits(&mut self, count: u8) -> Option<u16> {
        let count = count as usize;
        if self.bit_position + count > self.data.len() * 8 {
            return None;
        }

        let mut result = 0u16;
        for _ in 0..count {
            let byte = self.data[self.bit_position / 8];
            let bit = (byte >> (7 - self.bit_position % 8)) & 1;
            result = (result << 1) | bit as u16;
            self.bit_position += 1;
        }

        Some(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    /// Minimal TIFF LZW encoder used to produce streams that cross code-size boundaries
    fn encode(data: &[u8]) -> Vec<u8> {
        let mut bits: Vec<u8> = Vec::new();
        let emit = |bits: &mut Vec<u8>, code: usize, width: u8| {
            for i in (0..width).rev() {
                bits.push(((code >> i) & 1) as u8);
            }
        };
        let fresh = || (0..=255u8).map(|b| (vec![b], b as usize)).collect::<HashMap<_, _>>();

        let mut table = fresh();
        let mut next = FIRST_FREE;
        let mut width = 9u8;
        emit(&mut bits, CLEAR_CODE as usize, width);

        let mut w: Vec<u8> = Vec::new();
        for &c in data {
            let mut wc = w.clone();
            wc.push(c);
            if table.contains_key(&wc) {
                w = wc;
                continue;
            }
            emit(&mut bits, table[&w], width);
            table.insert(wc, next);
            next += 1;
            if next == (1 << width) && width < MAX_CODE_SIZE {
                width += 1;
            }
            if next >= 4093 {
                emit(&mut bits, CLEAR_CODE as usize, width);
                table = fresh();
                next = FIRST_FREE;
                width = 9;
            }
            w = vec![c];
        }
        if !w.is_empty() {
            emit(&mut bits, table[&w], width);
        }
        if next + 1 == (1 << width) && width < MAX_CODE_SIZE {
            width += 1;
        }
        emit(&mut bits, EOI_CODE as usize, width);

        bits.chunks(8)
            .map(|chunk| chunk.iter().enumerate().fold(0u8, |acc, (i, b)| acc | (b << (7 - i))))
            .collect()
    }

    #[test]
    fn bit_reader_is_msb_first() {
        let data = [0b1101_0010, 0b1011_0101];
        let mut reader = BitReader::new(&data);
        assert_eq!(reader.read_bits(3), Some(0b110));
        assert_eq!(reader.read_bits(9), Some(0b1_0010_1011));
        assert_eq!(reader.read_bits(5), None);
    }

    #[test]
    fn decodes_known_stream() {
        let encoded = [128, 21, 9, 228, 34, 41, 60, 164, 78, 39, 149, 32, 80, 72, 52, 46, 11, 7, 132, 192, 64];
        let decoded = LzwHandler.decompress(&encoded).unwrap();
        assert_eq!(decoded, b"TOBEORNOTTOBEORTOBEORNOT".to_vec());
    }

    #[test]
    fn decodes_across_code_size_changes_and_clear() {
        let mut state = 12345u32;
        let data: Vec<u8> = (0..20_000)
            .map(|_| {
                state = state.wrapping_mul(1_103_515_245).wrapping_add(12_345);
                b"abcd"[(state >> 16) as usize % 4]
            })
            .collect();

        let decoded = LzwHandler.decompress(&encode(&data)).unwrap();
        assert_eq!(decoded, data);
    }

    #[test]
    fn rejects_code_beyond_table() {
        // Clear, then code 300 with nothing defined yet
        let mut bits = vec![];
        for code in [256u16, 300] {
            for i in (0..9).rev() {
                bits.push(((code >> i) & 1) as u8);
            }
        }
        let bytes: Vec<u8> = bits.chunks(8)
            .map(|chunk| chunk.iter().enumerate().fold(0u8, |acc, (i, b)| acc | (b << (7 - i))))
            .collect();
        assert!(LzwHandler.decompress(&bytes).is_err());
    }
}
