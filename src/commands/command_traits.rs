//! Command pattern interfaces
//!
//! Each CLI subcommand is a `Command`; the factory turns parsed clap
//! arguments into the right one.

use crate::config::Config;
use crate::errors::PipelineError;

/// Represents an executable command in the application
pub trait Command {
    /// Execute the command
    ///
    /// # Returns
    /// Result indicating success or an error
    fn execute(&self) -> Result<(), PipelineError>;
}

/// Factory for creating commands from CLI arguments
pub trait CommandFactory<'a> {
    /// Create a new Command instance based on CLI arguments
    ///
    /// # Arguments
    /// * `args` - CLI argument matches from clap
    /// * `config` - Loaded configuration
    ///
    /// # Returns
    /// A command that implements the Command trait, or an error
    fn create_command(&self, args: &clap::ArgMatches, config: &'a Config) -> Result<Box<dyn Command + 'a>, PipelineError>;
}
