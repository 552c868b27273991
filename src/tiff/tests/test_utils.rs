//! In-memory TIFF fixtures
//!
//! `TestTiff` writes a complete single-band (or multi-sample) TIFF into a
//! buffer: header, image blocks, out-of-line tag values and the IFD chain.

use std::io::{Cursor, Write};

use byteorder::{BigEndian, LittleEndian, WriteBytesExt};
use flate2::write::ZlibEncoder;
use flate2::Compression;

use crate::io::byte_order::ByteOrder;
use crate::tiff::constants::{compression, field_types, geo_keys, model_type, planar_config, predictor, raster_type, sample_format, tags};

/// How image data is cut into blocks
#[derive(Debug, Clone, Copy)]
pub enum Layout {
    Strips { rows_per_strip: u32 },
    Tiles { width: u32, height: u32 },
}

/// Georeferencing written as GeoKeys plus scale and tiepoint tags
#[derive(Debug, Clone)]
pub struct TestGeo {
    pub epsg: u16,
    pub pixel_is_point: bool,
    pub scale: [f64; 3],
    pub tiepoint: [f64; 6],
}

impl TestGeo {
    /// WGS84 grid with its upper-left corner at (`lon`, `lat`)
    pub fn geographic(lon: f64, lat: f64, pixel_size: f64) -> Self {
        TestGeo {
            epsg: 4326,
            pixel_is_point: false,
            scale: [pixel_size, pixel_size, 0.0],
            tiepoint: [0.0, 0.0, 0.0, lon, lat, 0.0],
        }
    }

    /// Projected grid (EPSG `epsg`) with its upper-left corner at (`x`, `y`)
    pub fn projected(epsg: u16, x: f64, y: f64, pixel_size: f64) -> Self {
        TestGeo {
            epsg,
            pixel_is_point: false,
            scale: [pixel_size, pixel_size, 0.0],
            tiepoint: [0.0, 0.0, 0.0, x, y, 0.0],
        }
    }

    fn is_projected(&self) -> bool {
        self.epsg != 4326
    }
}

enum TagData {
    Short(Vec<u16>),
    Long(Vec<u32>),
    Long8(Vec<u64>),
    Double(Vec<f64>),
    Ascii(String),
}

impl TagData {
    fn field_type(&self) -> u16 {
        match self {
            TagData::Short(_) => field_types::SHORT,
            TagData::Long(_) => field_types::LONG,
            TagData::Long8(_) => field_types::LONG8,
            TagData::Double(_) => field_types::DOUBLE,
            TagData::Ascii(_) => field_types::ASCII,
        }
    }

    fn count(&self) -> u64 {
        match self {
            TagData::Short(v) => v.len() as u64,
            TagData::Long(v) => v.len() as u64,
            TagData::Long8(v) => v.len() as u64,
            TagData::Double(v) => v.len() as u64,
            TagData::Ascii(s) => s.len() as u64 + 1,
        }
    }

    fn encode(&self, order: ByteOrder) -> Vec<u8> {
        let mut out = Vec::new();
        match self {
            TagData::Short(values) => values.iter().for_each(|v| push_u16(&mut out, order, *v)),
            TagData::Long(values) => values.iter().for_each(|v| push_u32(&mut out, order, *v)),
            TagData::Long8(values) => values.iter().for_each(|v| push_u64(&mut out, order, *v)),
            TagData::Double(values) => values.iter().for_each(|v| push_u64(&mut out, order, v.to_bits())),
            TagData::Ascii(s) => {
                out.extend_from_slice(s.as_bytes());
                out.push(0);
            }
        }
        out
    }
}

fn push_u16(out: &mut Vec<u8>, order: ByteOrder, value: u16) {
    match order {
        ByteOrder::LittleEndian => out.write_u16::<LittleEndian>(value).unwrap(),
        ByteOrder::BigEndian => out.write_u16::<BigEndian>(value).unwrap(),
    }
}

fn push_u32(out: &mut Vec<u8>, order: ByteOrder, value: u32) {
    match order {
        ByteOrder::LittleEndian => out.write_u32::<LittleEndian>(value).unwrap(),
        ByteOrder::BigEndian => out.write_u32::<BigEndian>(value).unwrap(),
    }
}

fn push_u64(out: &mut Vec<u8>, order: ByteOrder, value: u64) {
    match order {
        ByteOrder::LittleEndian => out.write_u64::<LittleEndian>(value).unwrap(),
        ByteOrder::BigEndian => out.write_u64::<BigEndian>(value).unwrap(),
    }
}

/// Builder for a TIFF file held in memory
///
/// Defaults: little-endian classic TIFF, one u16 sample per pixel, a single
/// uncompressed strip and values `0, 1, 2, ...` in row-major order.
pub struct TestTiff {
    byte_order: ByteOrder,
    big_tiff: bool,
    width: u32,
    height: u32,
    samples_per_pixel: u16,
    planar: u16,
    bits: u16,
    format: u16,
    compression: u16,
    predictor: u16,
    layout: Layout,
    values: Vec<f64>,
    geo: Option<TestGeo>,
    gdal_metadata: Option<String>,
    overview_first: bool,
}

impl TestTiff {
    pub fn new(width: u32, height: u32) -> Self {
        TestTiff {
            byte_order: ByteOrder::LittleEndian,
            big_tiff: false,
            width,
            height,
            samples_per_pixel: 1,
            planar: planar_config::CHUNKY,
            bits: 16,
            format: sample_format::UNSIGNED,
            compression: compression::NONE,
            predictor: predictor::NONE,
            layout: Layout::Strips { rows_per_strip: height },
            values: (0..width * height).map(f64::from).collect(),
            geo: None,
            gdal_metadata: None,
            overview_first: false,
        }
    }

    pub fn big_endian(mut self) -> Self {
        self.byte_order = ByteOrder::BigEndian;
        self
    }

    pub fn big_tiff(mut self) -> Self {
        self.big_tiff = true;
        self
    }

    pub fn sample(mut self, bits: u16, format: u16) -> Self {
        self.bits = bits;
        self.format = format;
        self
    }

    pub fn compression(mut self, code: u16) -> Self {
        self.compression = code;
        self
    }

    pub fn predictor(mut self, code: u16) -> Self {
        self.predictor = code;
        self
    }

    pub fn strips(mut self, rows_per_strip: u32) -> Self {
        self.layout = Layout::Strips { rows_per_strip };
        self
    }

    pub fn tiles(mut self, width: u32, height: u32) -> Self {
        self.layout = Layout::Tiles { width, height };
        self
    }

    /// Several samples per pixel; `values` then holds `width * height * samples` entries
    pub fn samples_per_pixel(mut self, samples: u16, planar: u16) -> Self {
        self.samples_per_pixel = samples;
        self.planar = planar;
        self
    }

    pub fn values(mut self, values: Vec<f64>) -> Self {
        self.values = values;
        self
    }

    pub fn geo(mut self, geo: TestGeo) -> Self {
        self.geo = Some(geo);
        self
    }

    pub fn gdal_metadata(mut self, xml: &str) -> Self {
        self.gdal_metadata = Some(xml.to_string());
        self
    }

    /// Put a 1x1 reduced-resolution IFD in front of the image IFD
    pub fn overview_first(mut self) -> Self {
        self.overview_first = true;
        self
    }

    pub fn cursor(&self) -> Cursor<Vec<u8>> {
        Cursor::new(self.build())
    }

    fn sample_bytes(&self) -> usize {
        (self.bits / 8) as usize
    }

    fn value_at(&self, x: u32, y: u32, sample: u16) -> f64 {
        let index = ((y * self.width + x) * self.samples_per_pixel as u32 + sample as u32) as usize;
        self.values.get(index).copied().unwrap_or(0.0)
    }

    fn encode_sample(&self, out: &mut Vec<u8>, value: f64) {
        let order = self.byte_order;
        match (self.format, self.bits) {
            (sample_format::IEEEFP, 32) => push_u32(out, order, (value as f32).to_bits()),
            (sample_format::IEEEFP, 64) => push_u64(out, order, value.to_bits()),
            (sample_format::SIGNED, 8) => out.push(value as i8 as u8),
            (sample_format::SIGNED, 16) => push_u16(out, order, value as i16 as u16),
            (sample_format::SIGNED, 32) => push_u32(out, order, value as i32 as u32),
            (_, 8) => out.push(value as u8),
            (_, 16) => push_u16(out, order, value as u16),
            (_, 32) => push_u32(out, order, value as u32),
            _ => push_u64(out, order, value as u64),
        }
    }

    /// Raw (uncompressed, undifferenced) bytes of one block
    fn block_bytes(&self, x0: u32, y0: u32, block_width: u32, rows: u32, plane: Option<u16>) -> Vec<u8> {
        let mut out = Vec::new();
        for y in y0..y0 + rows {
            for x in x0..x0 + block_width {
                let samples: Vec<u16> = match plane {
                    Some(p) => vec![p],
                    None => (0..self.samples_per_pixel).collect(),
                };
                for s in samples {
                    let value = if x < self.width && y < self.height { self.value_at(x, y, s) } else { 0.0 };
                    self.encode_sample(&mut out, value);
                }
            }
        }
        out
    }

    /// Forward horizontal differencing, row by row
    fn apply_predictor(&self, data: &mut [u8], row_samples: usize, stride: usize) {
        let size = self.sample_bytes();
        let order = self.byte_order;
        let row_bytes = row_samples * size;
        for row in data.chunks_mut(row_bytes) {
            for i in (stride..row_samples).rev() {
                let (cur, prev) = (i * size, (i - stride) * size);
                match size {
                    1 => row[cur] = row[cur].wrapping_sub(row[prev]),
                    2 => {
                        let v = order.u16_from(&row[cur..]).wrapping_sub(order.u16_from(&row[prev..]));
                        order.write_u16(&mut row[cur..], v);
                    }
                    4 => {
                        let v = order.u32_from(&row[cur..]).wrapping_sub(order.u32_from(&row[prev..]));
                        order.write_u32(&mut row[cur..], v);
                    }
                    _ => {
                        let v = order.u64_from(&row[cur..]).wrapping_sub(order.u64_from(&row[prev..]));
                        order.write_u64(&mut row[cur..], v);
                    }
                }
            }
        }
    }

    fn compress(&self, data: Vec<u8>) -> Vec<u8> {
        match self.compression {
            compression::DEFLATE | compression::DEFLATE_LEGACY => {
                let mut encoder = ZlibEncoder::new(Vec::new(), Compression::default());
                encoder.write_all(&data).unwrap();
                encoder.finish().unwrap()
            }
            compression::ZSTD => zstd::encode_all(data.as_slice(), 0).unwrap(),
            compression::PACKBITS => packbits_literal(&data),
            _ => data,
        }
    }

    /// Encoded blocks in file order (plane-major for planar images)
    fn blocks(&self) -> Vec<Vec<u8>> {
        let planes: Vec<Option<u16>> = if self.planar == planar_config::PLANAR {
            (0..self.samples_per_pixel).map(Some).collect()
        } else {
            vec![None]
        };
        let samples_in_block = if self.planar == planar_config::PLANAR { 1 } else { self.samples_per_pixel as usize };

        let mut blocks = Vec::new();
        for plane in planes {
            match self.layout {
                Layout::Strips { rows_per_strip } => {
                    let mut y = 0;
                    while y < self.height {
                        let rows = rows_per_strip.min(self.height - y);
                        let mut data = self.block_bytes(0, y, self.width, rows, plane);
                        if self.predictor == predictor::HORIZONTAL_DIFFERENCING {
                            self.apply_predictor(&mut data, self.width as usize * samples_in_block, samples_in_block);
                        }
                        blocks.push(self.compress(data));
                        y += rows_per_strip;
                    }
                }
                Layout::Tiles { width, height } => {
                    for tile_y in 0..self.height.div_ceil(height) {
                        for tile_x in 0..self.width.div_ceil(width) {
                            let mut data = self.block_bytes(tile_x * width, tile_y * height, width, height, plane);
                            if self.predictor == predictor::HORIZONTAL_DIFFERENCING {
                                self.apply_predictor(&mut data, width as usize * samples_in_block, samples_in_block);
                            }
                            blocks.push(self.compress(data));
                        }
                    }
                }
            }
        }
        blocks
    }

    fn offset_data(&self, values: Vec<u64>) -> TagData {
        if self.big_tiff {
            TagData::Long8(values)
        } else {
            TagData::Long(values.into_iter().map(|v| v as u32).collect())
        }
    }

    fn image_tags(&self, offsets: Vec<u64>, counts: Vec<u64>) -> Vec<(u16, TagData)> {
        let mut entries = vec![
            (tags::IMAGE_WIDTH, TagData::Long(vec![self.width])),
            (tags::IMAGE_LENGTH, TagData::Long(vec![self.height])),
            (tags::BITS_PER_SAMPLE, TagData::Short(vec![self.bits; self.samples_per_pixel as usize])),
            (tags::COMPRESSION, TagData::Short(vec![self.compression])),
            (tags::PHOTOMETRIC_INTERPRETATION, TagData::Short(vec![1])),
            (tags::SAMPLES_PER_PIXEL, TagData::Short(vec![self.samples_per_pixel])),
            (tags::PLANAR_CONFIGURATION, TagData::Short(vec![self.planar])),
            (tags::SAMPLE_FORMAT, TagData::Short(vec![self.format; self.samples_per_pixel as usize])),
        ];
        if self.predictor != predictor::NONE {
            entries.push((tags::PREDICTOR, TagData::Short(vec![self.predictor])));
        }

        match self.layout {
            Layout::Strips { rows_per_strip } => {
                entries.push((tags::ROWS_PER_STRIP, TagData::Long(vec![rows_per_strip])));
                entries.push((tags::STRIP_OFFSETS, self.offset_data(offsets)));
                entries.push((tags::STRIP_BYTE_COUNTS, self.offset_data(counts)));
            }
            Layout::Tiles { width, height } => {
                entries.push((tags::TILE_WIDTH, TagData::Long(vec![width])));
                entries.push((tags::TILE_LENGTH, TagData::Long(vec![height])));
                entries.push((tags::TILE_OFFSETS, self.offset_data(offsets)));
                entries.push((tags::TILE_BYTE_COUNTS, self.offset_data(counts)));
            }
        }

        if let Some(geo) = &self.geo {
            let (model, cs_key) = if geo.is_projected() {
                (model_type::PROJECTED, geo_keys::PROJECTED_CS_TYPE)
            } else {
                (model_type::GEOGRAPHIC, geo_keys::GEOGRAPHIC_TYPE)
            };
            let raster = if geo.pixel_is_point { raster_type::PIXEL_IS_POINT } else { raster_type::PIXEL_IS_AREA };
            entries.push((tags::MODEL_PIXEL_SCALE_TAG, TagData::Double(geo.scale.to_vec())));
            entries.push((tags::MODEL_TIEPOINT_TAG, TagData::Double(geo.tiepoint.to_vec())));
            entries.push((tags::GEO_KEY_DIRECTORY_TAG, TagData::Short(vec![
                1, 1, 0, 3,
                geo_keys::MODEL_TYPE, 0, 1, model,
                geo_keys::RASTER_TYPE, 0, 1, raster,
                cs_key, 0, 1, geo.epsg,
            ])));
        }

        if let Some(xml) = &self.gdal_metadata {
            entries.push((tags::GDAL_METADATA, TagData::Ascii(xml.clone())));
        }

        entries
    }

    fn overview_tags(&self, offset: u64) -> Vec<(u16, TagData)> {
        vec![
            (tags::NEW_SUBFILE_TYPE, TagData::Long(vec![1])),
            (tags::IMAGE_WIDTH, TagData::Long(vec![1])),
            (tags::IMAGE_LENGTH, TagData::Long(vec![1])),
            (tags::BITS_PER_SAMPLE, TagData::Short(vec![8])),
            (tags::ROWS_PER_STRIP, TagData::Long(vec![1])),
            (tags::STRIP_OFFSETS, self.offset_data(vec![offset])),
            (tags::STRIP_BYTE_COUNTS, self.offset_data(vec![1])),
        ]
    }

    /// Serialize one IFD whose first byte lands at `ifd_offset`
    ///
    /// Values that do not fit in the entry go into `extra`, which the caller
    /// writes at `extra_offset`.
    fn write_ifd(&self, mut entries: Vec<(u16, TagData)>, next_ifd: u64, extra_offset: u64, extra: &mut Vec<u8>) -> Vec<u8> {
        let order = self.byte_order;
        let inline_size = if self.big_tiff { 8 } else { 4 };
        entries.sort_by_key(|(tag, _)| *tag);

        let mut out = Vec::new();
        if self.big_tiff {
            push_u64(&mut out, order, entries.len() as u64);
        } else {
            push_u16(&mut out, order, entries.len() as u16);
        }

        for (tag, data) in &entries {
            push_u16(&mut out, order, *tag);
            push_u16(&mut out, order, data.field_type());
            if self.big_tiff {
                push_u64(&mut out, order, data.count());
            } else {
                push_u32(&mut out, order, data.count() as u32);
            }

            let mut bytes = data.encode(order);
            if bytes.len() <= inline_size {
                bytes.resize(inline_size, 0);
                out.extend_from_slice(&bytes);
            } else {
                let offset = extra_offset + extra.len() as u64;
                extra.extend_from_slice(&bytes);
                if extra.len() % 2 == 1 {
                    extra.push(0);
                }
                if self.big_tiff {
                    push_u64(&mut out, order, offset);
                } else {
                    push_u32(&mut out, order, offset as u32);
                }
            }
        }

        if self.big_tiff {
            push_u64(&mut out, order, next_ifd);
        } else {
            push_u32(&mut out, order, next_ifd as u32);
        }
        out
    }

    fn ifd_size(&self, entries: usize) -> u64 {
        if self.big_tiff {
            8 + 20 * entries as u64 + 8
        } else {
            2 + 12 * entries as u64 + 4
        }
    }

    /// Lay out header, block data, IFDs and their out-of-line values
    pub fn build(&self) -> Vec<u8> {
        let order = self.byte_order;
        let mut file = Vec::new();

        match order {
            ByteOrder::LittleEndian => file.extend_from_slice(b"II"),
            ByteOrder::BigEndian => file.extend_from_slice(b"MM"),
        }
        if self.big_tiff {
            push_u16(&mut file, order, 43);
            push_u16(&mut file, order, 8);
            push_u16(&mut file, order, 0);
        } else {
            push_u16(&mut file, order, 42);
        }
        let first_ifd_position = file.len();
        if self.big_tiff {
            push_u64(&mut file, order, 0);
        } else {
            push_u32(&mut file, order, 0);
        }

        let mut offsets = Vec::new();
        let mut counts = Vec::new();
        for block in self.blocks() {
            offsets.push(file.len() as u64);
            counts.push(block.len() as u64);
            file.extend_from_slice(&block);
        }
        let overview_pixel = file.len() as u64;
        file.push(0);
        if file.len() % 2 == 1 {
            file.push(0);
        }

        let image_entries = self.image_tags(offsets, counts);
        let image_entry_count = image_entries.len();

        let mut ifds = Vec::new();
        if self.overview_first {
            let overview_entries = self.overview_tags(overview_pixel);
            let overview_offset = file.len() as u64;
            let overview_size = self.ifd_size(overview_entries.len());
            let mut overview_extra = Vec::new();
            // Overview values all fit inline, so its extra area stays empty
            let image_offset = overview_offset + overview_size;
            ifds.push((overview_offset, self.write_ifd(overview_entries, image_offset, overview_offset + overview_size, &mut overview_extra)));
            let mut extra = Vec::new();
            let extra_offset = image_offset + self.ifd_size(image_entry_count);
            let image = self.write_ifd(image_entries, 0, extra_offset, &mut extra);
            ifds.push((image_offset, [image, extra].concat()));
        } else {
            let image_offset = file.len() as u64;
            let mut extra = Vec::new();
            let extra_offset = image_offset + self.ifd_size(image_entry_count);
            let image = self.write_ifd(image_entries, 0, extra_offset, &mut extra);
            ifds.push((image_offset, [image, extra].concat()));
        }

        let first_ifd = ifds[0].0;
        for (_, bytes) in ifds {
            file.extend_from_slice(&bytes);
        }

        let mut header_offset = Vec::new();
        if self.big_tiff {
            push_u64(&mut header_offset, order, first_ifd);
        } else {
            push_u32(&mut header_offset, order, first_ifd as u32);
        }
        file[first_ifd_position..first_ifd_position + header_offset.len()].copy_from_slice(&header_offset);

        file
    }
}

/// PackBits stream made only of literal runs
fn packbits_literal(data: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(data.len() + data.len() / 128 + 1);
    for chunk in data.chunks(128) {
        out.push((chunk.len() - 1) as u8);
        out.extend_from_slice(chunk);
    }
    out
}

/// Minimal little-endian header plus one IFD holding width and height only
pub fn create_test_tiff_buffer() -> Cursor<Vec<u8>> {
    let mut buffer = Vec::new();

    buffer.write_u16::<LittleEndian>(0x4949).unwrap(); // II
    buffer.write_u16::<LittleEndian>(42).unwrap();
    buffer.write_u32::<LittleEndian>(8).unwrap();

    buffer.write_u16::<LittleEndian>(2).unwrap();

    buffer.write_u16::<LittleEndian>(tags::IMAGE_WIDTH).unwrap();
    buffer.write_u16::<LittleEndian>(field_types::LONG).unwrap();
    buffer.write_u32::<LittleEndian>(1).unwrap();
    buffer.write_u32::<LittleEndian>(800).unwrap();

    buffer.write_u16::<LittleEndian>(tags::IMAGE_LENGTH).unwrap();
    buffer.write_u16::<LittleEndian>(field_types::LONG).unwrap();
    buffer.write_u32::<LittleEndian>(1).unwrap();
    buffer.write_u32::<LittleEndian>(600).unwrap();

    buffer.write_u32::<LittleEndian>(0).unwrap();

    Cursor::new(buffer)
}
