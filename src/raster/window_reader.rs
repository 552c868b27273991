//! Block-based window reading for strip and tile organised TIFFs
//!
//! A window is read by visiting every strip or tile that intersects it,
//! decompressing the block, undoing the predictor and copying the covered
//! samples out. Samples of one channel are returned row-major.

use log::{debug, trace};
use std::io::SeekFrom;

use crate::compression::{CompressionFactory, CompressionHandler};
use crate::extractor::Region;
use crate::io::byte_order::ByteOrder;
use crate::io::seekable::SeekableReader;
use crate::tiff::constants::{planar_config, predictor, sample_format, tags};
use crate::tiff::errors::{TiffError, TiffResult};
use crate::tiff::ifd::IFD;
use crate::tiff::reader::TiffReader;
use crate::tiff::validation;
use crate::utils::predictor::undo_horizontal_differencing;
use crate::utils::tag_utils;

use super::sample::{PixelValue, SampleType};

/// How image data is split into blocks
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlockKind {
    Strips { rows_per_strip: u64 },
    Tiles { tile_width: u64, tile_height: u64 },
}

/// Everything needed to locate and decode the blocks of one IFD
#[derive(Debug, Clone)]
pub struct BlockLayout {
    pub width: u64,
    pub height: u64,
    pub samples_per_pixel: u64,
    pub sample_type: SampleType,
    pub planar: u16,
    pub compression: u64,
    pub predictor: u16,
    pub kind: BlockKind,
    pub offsets: Vec<u64>,
    pub byte_counts: Vec<u64>,
    pub byte_order: ByteOrder,
}

impl BlockLayout {
    /// Read the layout tags of an IFD
    pub fn from_ifd(tiff_reader: &TiffReader, reader: &mut dyn SeekableReader, ifd: &IFD) -> TiffResult<Self> {
        let (width, height) = ifd.get_dimensions().ok_or(TiffError::MissingDimensions)?;
        let samples_per_pixel = ifd.get_samples_per_pixel().max(1);

        let bits = Self::first_value(tiff_reader, reader, ifd, tags::BITS_PER_SAMPLE, 1)?;
        let format = Self::first_value(tiff_reader, reader, ifd, tags::SAMPLE_FORMAT, sample_format::UNSIGNED as u64)?;
        let sample_type = SampleType::from_tags(bits as u16, format as u16)?;

        let planar = ifd.get_tag_value(tags::PLANAR_CONFIGURATION).unwrap_or(planar_config::CHUNKY as u64) as u16;
        let compression = ifd.get_tag_value(tags::COMPRESSION).unwrap_or(1);
        let predictor = ifd.get_tag_value(tags::PREDICTOR).unwrap_or(predictor::NONE as u64) as u16;

        let (kind, offsets_tag, counts_tag) = if ifd.is_tiled() {
            let tile_width = ifd.get_tag_value(tags::TILE_WIDTH).unwrap_or(256);
            let tile_height = ifd.get_tag_value(tags::TILE_LENGTH).unwrap_or(256);
            if tile_width == 0 || tile_height == 0 {
                return Err(TiffError::InvalidTileSize { width: tile_width, height: tile_height });
            }
            let kind = BlockKind::Tiles { tile_width, tile_height };
            (kind, tags::TILE_OFFSETS, tags::TILE_BYTE_COUNTS)
        } else {
            let rows_per_strip = ifd.get_tag_value(tags::ROWS_PER_STRIP).unwrap_or(height).clamp(1, height.max(1));
            (BlockKind::Strips { rows_per_strip }, tags::STRIP_OFFSETS, tags::STRIP_BYTE_COUNTS)
        };

        let offsets = tiff_reader.read_tag_values(reader, ifd, offsets_tag)?;
        let byte_counts = tiff_reader.read_tag_values(reader, ifd, counts_tag)?;
        if offsets.len() != byte_counts.len() {
            return Err(TiffError::GenericError(format!(
                "{} has {} entries but {} has {}",
                tag_utils::get_tag_name(offsets_tag), offsets.len(),
                tag_utils::get_tag_name(counts_tag), byte_counts.len()
            )));
        }

        let layout = BlockLayout {
            width,
            height,
            samples_per_pixel,
            sample_type,
            planar,
            compression,
            predictor,
            kind,
            offsets,
            byte_counts,
            byte_order: tiff_reader.byte_order()?,
        };

        if layout.offsets.len() < layout.expected_block_count() {
            return Err(TiffError::GenericError(format!(
                "Image needs {} blocks but only {} are listed",
                layout.expected_block_count(), layout.offsets.len()
            )));
        }

        debug!("Block layout: {}x{}, {:?}, {} spp, {:?}, compression {} ({}), predictor {}",
               width, height, sample_type, samples_per_pixel, kind,
               compression, tag_utils::get_compression_name(compression), predictor);

        Ok(layout)
    }

    fn first_value(tiff_reader: &TiffReader, reader: &mut dyn SeekableReader, ifd: &IFD, tag: u16, default: u64) -> TiffResult<u64> {
        if !ifd.has_tag(tag) {
            return Ok(default);
        }
        Ok(tiff_reader.read_tag_values(reader, ifd, tag)?.first().copied().unwrap_or(default))
    }

    fn block_size(&self) -> (u64, u64) {
        match self.kind {
            BlockKind::Strips { rows_per_strip } => (self.width, rows_per_strip),
            BlockKind::Tiles { tile_width, tile_height } => (tile_width, tile_height),
        }
    }

    fn blocks_across(&self) -> u64 {
        let (block_width, _) = self.block_size();
        self.width.div_ceil(block_width)
    }

    fn blocks_down(&self) -> u64 {
        let (_, block_height) = self.block_size();
        self.height.div_ceil(block_height)
    }

    fn blocks_per_plane(&self) -> u64 {
        self.blocks_across() * self.blocks_down()
    }

    fn expected_block_count(&self) -> usize {
        let planes = if self.planar == planar_config::PLANAR { self.samples_per_pixel } else { 1 };
        (self.blocks_per_plane() * planes) as usize
    }

    /// Samples stored per pixel inside one block
    fn samples_in_block(&self) -> u64 {
        if self.planar == planar_config::PLANAR { 1 } else { self.samples_per_pixel }
    }
}

/// Reads rectangular windows of one channel through a `BlockLayout`
pub struct WindowReader<'a> {
    layout: &'a BlockLayout,
    handler: Box<dyn CompressionHandler>,
}

impl<'a> WindowReader<'a> {
    pub fn new(layout: &'a BlockLayout) -> TiffResult<Self> {
        if layout.predictor == predictor::FLOATING_POINT
            || (layout.predictor == predictor::HORIZONTAL_DIFFERENCING && layout.sample_type.is_float())
            || (layout.predictor != predictor::NONE && layout.predictor != predictor::HORIZONTAL_DIFFERENCING)
        {
            return Err(TiffError::UnsupportedPredictor(layout.predictor as u64));
        }
        let handler = CompressionFactory::create_handler(layout.compression)?;
        Ok(WindowReader { layout, handler })
    }

    /// Read `region` of channel `sample`; fails unless every pixel is decoded
    pub fn read_window(&self, reader: &mut dyn SeekableReader, region: Region, sample: u64) -> TiffResult<Vec<PixelValue>> {
        let layout = self.layout;
        if region.end_x() > layout.width || region.end_y() > layout.height {
            return Err(TiffError::GenericError(format!(
                "Window {:?} exceeds {}x{} image", region, layout.width, layout.height
            )));
        }
        if sample >= layout.samples_per_pixel {
            return Err(TiffError::GenericError(format!(
                "Sample {} requested from {}-sample image", sample, layout.samples_per_pixel
            )));
        }

        let file_size = validation::get_file_size(reader)?;
        let (block_width, block_height) = layout.block_size();
        let mut window: Vec<Option<PixelValue>> = vec![None; (region.width * region.height) as usize];

        let plane_base = if layout.planar == planar_config::PLANAR { sample * layout.blocks_per_plane() } else { 0 };
        let first_block_x = region.x / block_width;
        let last_block_x = (region.end_x() - 1) / block_width;
        let first_block_y = region.y / block_height;
        let last_block_y = (region.end_y() - 1) / block_height;

        for block_y in first_block_y..=last_block_y {
            for block_x in first_block_x..=last_block_x {
                let index = (plane_base + block_y * layout.blocks_across() + block_x) as usize;
                // Strips shorten at the bottom of the image, tiles are always full size
                let rows = match layout.kind {
                    BlockKind::Strips { .. } => block_height.min(layout.height - block_y * block_height),
                    BlockKind::Tiles { .. } => block_height,
                };
                let block = self.read_block(reader, index, block_width, rows, file_size)?;
                self.copy_block(&block, block_x * block_width, block_y * block_height, block_width, rows, region, sample, &mut window);
            }
        }

        let missing = window.iter().filter(|v| v.is_none()).count();
        if missing > 0 {
            return Err(TiffError::GenericError(format!("{} pixels of window {:?} were not decoded", missing, region)));
        }
        Ok(window.into_iter().flatten().collect())
    }

    fn read_block(&self, reader: &mut dyn SeekableReader, index: usize, block_width: u64, rows: u64, file_size: u64) -> TiffResult<Vec<u8>> {
        let layout = self.layout;
        let offset = layout.offsets[index];
        let byte_count = layout.byte_counts[index];
        validation::validate_block_range(index, offset, byte_count, file_size)?;

        trace!("Reading block {} at offset {} ({} bytes, {})", index, offset, byte_count, self.handler.name());
        reader.seek(SeekFrom::Start(offset))?;
        let mut compressed = vec![0u8; byte_count as usize];
        reader.read_exact(&mut compressed)?;

        let mut data = self.handler.decompress(&compressed)?;

        let samples_per_row = (block_width * layout.samples_in_block()) as usize;
        let expected = samples_per_row * rows as usize * layout.sample_type.byte_size();
        if data.len() < expected {
            return Err(TiffError::TruncatedBlock { index, expected, actual: data.len() });
        }

        if layout.predictor == predictor::HORIZONTAL_DIFFERENCING {
            undo_horizontal_differencing(
                &mut data,
                samples_per_row,
                rows as usize,
                layout.sample_type.byte_size(),
                layout.samples_in_block() as usize,
                layout.byte_order,
            )?;
        }

        Ok(data)
    }

    #[allow(clippy::too_many_arguments)]
    fn copy_block(
        &self,
        block: &[u8],
        block_start_x: u64,
        block_start_y: u64,
        block_width: u64,
        rows: u64,
        region: Region,
        sample: u64,
        window: &mut [Option<PixelValue>],
    ) {
        let layout = self.layout;
        let sample_size = layout.sample_type.byte_size() as u64;
        let spp = layout.samples_in_block();
        let channel = if layout.planar == planar_config::PLANAR { 0 } else { sample };

        let y_start = region.y.max(block_start_y);
        let y_end = region.end_y().min(block_start_y + rows);
        let x_start = region.x.max(block_start_x);
        let x_end = region.end_x().min(block_start_x + block_width);

        for y in y_start..y_end {
            for x in x_start..x_end {
                let block_pixel = (y - block_start_y) * block_width + (x - block_start_x);
                let byte_index = ((block_pixel * spp + channel) * sample_size) as usize;
                let value = layout.sample_type.decode(&block[byte_index..], layout.byte_order);
                let window_index = ((y - region.y) * region.width + (x - region.x)) as usize;
                window[window_index] = Some(value);
            }
        }
    }
}
