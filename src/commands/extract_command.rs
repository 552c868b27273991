//! Extract-and-store command

use clap::ArgMatches;
use log::info;

use crate::api::SceneKit;
use crate::commands::command_traits::Command;
use crate::commands::{coordinate_arg, neighborhood_size_arg};
use crate::config::Config;
use crate::coordinate::Coordinate;
use crate::errors::PipelineError;
use crate::persistence::JsonFileStore;

/// Extracts a neighborhood from a scene, normalizes it and appends it to the record store
///
/// Without `--scene-id` the first scene found at the coordinate is used.
pub struct ExtractCommand {
    config: Config,
    coordinate: Coordinate,
    scene_id: Option<String>,
}

impl ExtractCommand {
    pub fn new(args: &ArgMatches, config: &Config) -> Result<Self, PipelineError> {
        let coordinate = coordinate_arg(args)?;
        let mut config = config.clone();
        config.extraction.neighborhood_size = neighborhood_size_arg(args, &config)?;

        Ok(ExtractCommand {
            config,
            coordinate,
            scene_id: args.get_one::<String>("scene-id").cloned(),
        })
    }
}

impl Command for ExtractCommand {
    fn execute(&self) -> Result<(), PipelineError> {
        let mut store = JsonFileStore::open(&self.config.storage.path)?;
        let kit = SceneKit::connect(self.config.clone())?;
        let (lat, lon) = (self.coordinate.latitude(), self.coordinate.longitude());

        let stored = match &self.scene_id {
            Some(scene_id) => Some(kit.extract_and_store(&mut store, scene_id, lat, lon)?),
            None => kit.extract_first_match(&mut store, lat, lon)?,
        };
        kit.close();

        match stored {
            Some((search, record)) => {
                info!("Search {} saved to {}", search.id, store.path().display());
                println!("{}", serde_json::to_string_pretty(&record)?);
            }
            None => println!("No scenes found at {}", self.coordinate),
        }
        Ok(())
    }
}
