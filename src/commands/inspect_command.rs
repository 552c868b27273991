//! Offline inspection of a local GeoTIFF band file
//!
//! Runs the same coordinate-to-pixel mapping and neighborhood read as the
//! catalog pipeline, without a session.

use std::path::PathBuf;

use clap::ArgMatches;
use log::info;

use crate::commands::command_traits::Command;
use crate::commands::{coordinate_arg, neighborhood_size_arg, required_arg};
use crate::config::Config;
use crate::coordinate::Coordinate;
use crate::errors::{ExtractionError, PipelineError};
use crate::extractor::extract_neighborhood;
use crate::normalize::ResultNormalizer;
use crate::raster::{BlockKind, GeoTiffDataset, RasterDataset};
use crate::utils::tag_utils::get_compression_name;

/// Command for reading a neighborhood out of a GeoTIFF on disk
pub struct InspectCommand<'a> {
    config: &'a Config,
    input_file: PathBuf,
    coordinate: Coordinate,
    band: String,
    neighborhood_size: usize,
}

impl<'a> InspectCommand<'a> {
    pub fn new(args: &ArgMatches, config: &'a Config) -> Result<Self, PipelineError> {
        let input_file = PathBuf::from(required_arg::<String>(args, "input")?);
        let band = args.get_one::<String>("band")
            .cloned()
            .unwrap_or_else(|| config.extraction.band.clone());

        Ok(InspectCommand {
            config,
            input_file,
            coordinate: coordinate_arg(args)?,
            band,
            neighborhood_size: neighborhood_size_arg(args, config)?,
        })
    }

    /// Scene id used in results and errors: the file stem
    fn scene_id(&self) -> String {
        self.input_file.file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| self.input_file.display().to_string())
    }

    fn log_summary<R: crate::io::seekable::SeekableReader>(&self, dataset: &GeoTiffDataset<R>) {
        let layout = dataset.layout();
        info!("Raster: {}", self.input_file.display());
        info!("  Dimensions: {}x{}", layout.width, layout.height);
        info!("  Sample type: {:?}, {} sample(s) per pixel", layout.sample_type, layout.samples_per_pixel);
        info!("  Compression: {} ({})", layout.compression, get_compression_name(layout.compression));
        match layout.kind {
            BlockKind::Strips { rows_per_strip } => info!("  Strips: {} rows each", rows_per_strip),
            BlockKind::Tiles { tile_width, tile_height } => info!("  Tiles: {}x{}", tile_width, tile_height),
        }
        match dataset.coordinate_system() {
            Some(crs) => info!("  Coordinate system: {}", crs.description()),
            None => info!("  Coordinate system: none"),
        }
        if let Some(transform) = dataset.geo_transform() {
            info!("  Pixel size: {} x {}", transform.pixel_width(), transform.pixel_height());
        }
    }
}

impl<'a> Command for InspectCommand<'a> {
    fn execute(&self) -> Result<(), PipelineError> {
        let scene_id = self.scene_id();
        let mut dataset = GeoTiffDataset::open(&self.input_file, &self.band)
            .map_err(|e| ExtractionError::new(scene_id.as_str(), self.coordinate, e))?;
        self.log_summary(&dataset);

        let result = extract_neighborhood(&mut dataset, &scene_id, self.coordinate, self.neighborhood_size)?;
        info!("Center pixel at column {}, row {}", result.metadata.pixel.0, result.metadata.pixel.1);

        let normalizer = ResultNormalizer::new(self.neighborhood_size, self.config.normalize.rescale());
        let record = normalizer.normalize(&result)?;
        println!("{}", serde_json::to_string_pretty(&record)?);
        Ok(())
    }
}
