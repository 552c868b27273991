//! CLI command implementations
//!
//! `search`, `extract` and `inspect`, each built from its clap subcommand
//! matches by `ScenekitCommandFactory`.

pub mod command_traits;
pub mod search_command;
pub mod extract_command;
pub mod inspect_command;

pub use command_traits::{Command, CommandFactory};
pub use search_command::SearchCommand;
pub use extract_command::ExtractCommand;
pub use inspect_command::InspectCommand;

use clap::ArgMatches;
use crate::config::Config;
use crate::coordinate::Coordinate;
use crate::errors::PipelineError;

/// Factory for creating command instances based on CLI arguments
pub struct ScenekitCommandFactory;

impl ScenekitCommandFactory {
    /// Create a new factory instance
    pub fn new() -> Self {
        ScenekitCommandFactory
    }
}

impl Default for ScenekitCommandFactory {
    fn default() -> Self {
        Self::new()
    }
}

impl<'a> CommandFactory<'a> for ScenekitCommandFactory {
    fn create_command(&self, args: &ArgMatches, config: &'a Config) -> Result<Box<dyn Command + 'a>, PipelineError> {
        match args.subcommand() {
            Some(("search", sub)) => Ok(Box::new(SearchCommand::new(sub, config)?)),
            Some(("extract", sub)) => Ok(Box::new(ExtractCommand::new(sub, config)?)),
            Some(("inspect", sub)) => Ok(Box::new(InspectCommand::new(sub, config)?)),
            Some((other, _)) => Err(PipelineError::InvalidArgument(format!("unknown command '{}'", other))),
            None => Err(PipelineError::InvalidArgument("no command given".to_string())),
        }
    }
}

/// `--lat` / `--lon` as a validated coordinate
pub(crate) fn coordinate_arg(args: &ArgMatches) -> Result<Coordinate, PipelineError> {
    let latitude = required_arg::<f64>(args, "lat")?;
    let longitude = required_arg::<f64>(args, "lon")?;
    Ok(Coordinate::new(latitude, longitude)?)
}

pub(crate) fn required_arg<T: Clone + Send + Sync + 'static>(args: &ArgMatches, name: &str) -> Result<T, PipelineError> {
    args.get_one::<T>(name)
        .cloned()
        .ok_or_else(|| PipelineError::InvalidArgument(format!("missing --{}", name)))
}

/// Neighborhood size from `--size`, falling back to the configured one
pub(crate) fn neighborhood_size_arg(args: &ArgMatches, config: &Config) -> Result<usize, PipelineError> {
    let size = args.get_one::<usize>("size").copied().unwrap_or(config.extraction.neighborhood_size);
    if size == 0 || size % 2 == 0 {
        return Err(PipelineError::InvalidArgument(format!("--size must be odd and positive, got {}", size)));
    }
    Ok(size)
}
