//! GeoTIFF-backed raster dataset

use std::fs::File;
use std::io::BufReader;
use std::path::Path;

use log::{debug, info};

use crate::coordinate::{CoordinateSystem, GeoTransform};
use crate::extractor::Region;
use crate::io::seekable::SeekableReader;
use crate::tiff::constants::tags;
use crate::tiff::errors::{TiffError, TiffResult};
use crate::tiff::geo_key_parser::{GeoInfo, GeoKeyParser};
use crate::tiff::reader::TiffReader;

use super::dataset::RasterDataset;
use super::metadata::{read_mtl_sidecar, SceneMetadata};
use super::sample::PixelValue;
use super::window_reader::{BlockLayout, WindowReader};

/// One band of a GeoTIFF file, read from its first full-resolution IFD
pub struct GeoTiffDataset<R: SeekableReader> {
    reader: R,
    layout: BlockLayout,
    geo_info: GeoInfo,
    band: String,
    metadata: SceneMetadata,
}

impl GeoTiffDataset<BufReader<File>> {
    /// Open a band file on disk
    ///
    /// Scene metadata missing from the file itself is looked up in an MTL
    /// sidecar and, for the date, in the file name.
    pub fn open(path: impl AsRef<Path>, band: &str) -> TiffResult<Self> {
        let path = path.as_ref();
        info!("Opening raster {}", path.display());

        let file = File::open(path)?;
        let mut dataset = Self::from_reader(BufReader::new(file), band)?;

        if !dataset.metadata.is_complete() {
            if let Some(sidecar) = read_mtl_sidecar(path, band) {
                dataset.metadata = dataset.metadata.or(sidecar);
            }
        }
        if dataset.metadata.acquisition_date.is_none() {
            if let Some(stem) = path.file_stem().and_then(|s| s.to_str()) {
                dataset.metadata = dataset.metadata.or(SceneMetadata::from_scene_id(stem));
            }
        }

        Ok(dataset)
    }
}

impl<R: SeekableReader> GeoTiffDataset<R> {
    /// Parse the TIFF structure, block layout and georeferencing of `reader`
    pub fn from_reader(mut reader: R, band: &str) -> TiffResult<Self> {
        let mut tiff_reader = TiffReader::new();
        let tiff = tiff_reader.read(&mut reader)?;
        let ifd = tiff.full_resolution_ifd()
            .ok_or_else(|| TiffError::GenericError("No image IFD".to_string()))?;

        let layout = BlockLayout::from_ifd(&tiff_reader, &mut reader, ifd)?;
        let geo_info = GeoKeyParser::extract_geo_info(&tiff_reader, &mut reader, ifd)?;

        let metadata = if ifd.has_tag(tags::GDAL_METADATA) {
            let xml = tiff_reader.read_tag_ascii(&mut reader, ifd, tags::GDAL_METADATA)?;
            SceneMetadata::from_gdal_metadata(&xml)
        } else {
            SceneMetadata::default()
        };
        debug!("Embedded scene metadata: {:?}", metadata);

        Ok(GeoTiffDataset {
            reader,
            layout,
            geo_info,
            band: band.to_string(),
            metadata,
        })
    }

    pub fn layout(&self) -> &BlockLayout {
        &self.layout
    }

    pub fn geo_info(&self) -> &GeoInfo {
        &self.geo_info
    }
}

impl<R: SeekableReader> RasterDataset for GeoTiffDataset<R> {
    fn dimensions(&self) -> (u64, u64) {
        (self.layout.width, self.layout.height)
    }

    fn geo_transform(&self) -> Option<GeoTransform> {
        self.geo_info.geo_transform
    }

    fn coordinate_system(&self) -> Option<CoordinateSystem> {
        self.geo_info.coordinate_system()
    }

    fn band(&self) -> &str {
        &self.band
    }

    fn read_window(&mut self, region: Region) -> TiffResult<Vec<PixelValue>> {
        WindowReader::new(&self.layout)?.read_window(&mut self.reader, region, 0)
    }

    fn scene_metadata(&self) -> SceneMetadata {
        self.metadata.clone()
    }
}
