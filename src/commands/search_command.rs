//! Scene search command

use chrono::{Local, NaiveDate};
use clap::ArgMatches;
use log::info;

use crate::api::SceneKit;
use crate::commands::command_traits::Command;
use crate::commands::coordinate_arg;
use crate::config::Config;
use crate::coordinate::Coordinate;
use crate::errors::PipelineError;
use crate::search::DateWindow;

/// Lists the scenes covering a point
pub struct SearchCommand<'a> {
    config: &'a Config,
    coordinate: Coordinate,
    window: Option<DateWindow>,
    max_cloud_cover: Option<f64>,
}

impl<'a> SearchCommand<'a> {
    pub fn new(args: &ArgMatches, config: &'a Config) -> Result<Self, PipelineError> {
        let coordinate = coordinate_arg(args)?;
        let window = date_window_arg(
            args.get_one::<String>("start").map(String::as_str),
            args.get_one::<String>("end").map(String::as_str),
            config.search.window_days,
            Local::now().date_naive(),
        )?;

        Ok(SearchCommand {
            config,
            coordinate,
            window,
            max_cloud_cover: args.get_one::<f64>("max-cloud").copied(),
        })
    }
}

/// Build a window from optional `--start` / `--end`; a missing end is today,
/// a missing start is `window_days` before the end.
fn date_window_arg(start: Option<&str>, end: Option<&str>, window_days: i64, today: NaiveDate) -> Result<Option<DateWindow>, PipelineError> {
    let parse = |value: &str| {
        NaiveDate::parse_from_str(value, "%Y-%m-%d")
            .map_err(|_| PipelineError::InvalidArgument(format!("'{}' is not a YYYY-MM-DD date", value)))
    };

    let window = match (start, end) {
        (None, None) => return Ok(None),
        (Some(start), None) => DateWindow::new(parse(start)?, today),
        (None, Some(end)) => DateWindow::ending_on(parse(end)?, window_days),
        (Some(start), Some(end)) => DateWindow::new(parse(start)?, parse(end)?),
    };
    Ok(Some(window?))
}

impl<'a> Command for SearchCommand<'a> {
    fn execute(&self) -> Result<(), PipelineError> {
        let kit = SceneKit::connect(self.config.clone())?;
        let candidates = kit.search(
            self.coordinate.latitude(),
            self.coordinate.longitude(),
            self.window,
            self.max_cloud_cover,
        )?;
        kit.close();

        if candidates.is_empty() {
            info!("Search at {} returned no scenes", self.coordinate);
            println!("No scenes found at {}", self.coordinate);
            return Ok(());
        }

        println!("{}", serde_json::to_string_pretty(&candidates)?);
        Ok(())
    }
}
