//! Scene search
//!
//! Turns a coordinate plus optional date window and cloud-cover threshold into
//! a catalog query, and parses the loosely-typed records that come back into
//! `SceneCandidate`s. Catalog order is kept as-is.

use chrono::{Duration, Local, NaiveDate};
use log::{debug, info, warn};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::coordinate::Coordinate;
use crate::errors::SearchError;
use crate::session::SessionManager;

pub const DEFAULT_DATASET: &str = "landsat_ot_c2_l2";
pub const DEFAULT_WINDOW_DAYS: i64 = 30;
pub const DEFAULT_MAX_CLOUD_COVER: f64 = 50.0;
pub const DEFAULT_MAX_RESULTS: usize = 100;
/// Longest default window, one hundred years
pub const MAX_WINDOW_DAYS: i64 = 36_500;

const DATE_FORMAT: &str = "%Y-%m-%d";

/// Inclusive calendar-date range
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DateWindow {
    start: NaiveDate,
    end: NaiveDate,
}

impl DateWindow {
    pub fn new(start: NaiveDate, end: NaiveDate) -> Result<Self, SearchError> {
        if start > end {
            return Err(SearchError::InvalidDateWindow {
                start: start.format(DATE_FORMAT).to_string(),
                end: end.format(DATE_FORMAT).to_string(),
            });
        }
        Ok(DateWindow { start, end })
    }

    /// `days` days before `end` through `end`
    pub fn ending_on(end: NaiveDate, days: i64) -> Result<Self, SearchError> {
        if !(0..=MAX_WINDOW_DAYS).contains(&days) {
            return Err(SearchError::InvalidWindowLength(days));
        }
        let start = end
            .checked_sub_signed(Duration::days(days))
            .ok_or(SearchError::InvalidWindowLength(days))?;
        Ok(DateWindow { start, end })
    }

    /// Parse a window from `YYYY-MM-DD` strings
    pub fn parse(start: &str, end: &str) -> Result<Self, SearchError> {
        let parse = |s: &str| {
            NaiveDate::parse_from_str(s, DATE_FORMAT).map_err(|_| SearchError::InvalidDateWindow {
                start: start.to_string(),
                end: end.to_string(),
            })
        };
        Self::new(parse(start)?, parse(end)?)
    }

    pub fn start(&self) -> NaiveDate {
        self.start
    }

    pub fn end(&self) -> NaiveDate {
        self.end
    }

    pub fn start_string(&self) -> String {
        self.start.format(DATE_FORMAT).to_string()
    }

    pub fn end_string(&self) -> String {
        self.end.format(DATE_FORMAT).to_string()
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        self.start <= date && date <= self.end
    }
}

/// Parameters of one catalog scene search
#[derive(Debug, Clone, PartialEq)]
pub struct SceneQuery {
    pub dataset: String,
    pub coordinate: Coordinate,
    pub window: DateWindow,
    pub max_cloud_cover: f64,
    pub max_results: usize,
}

/// A scene returned by search
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SceneCandidate {
    pub scene_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub display_id: Option<String>,
    /// Percent of the footprint under cloud, `None` when the catalog does not know
    pub cloud_cover: Option<f64>,
    pub acquisition_date: NaiveDate,
}

impl SceneCandidate {
    /// Parse a catalog record, rejecting shapes that do not fit
    pub fn from_record(record: &Value) -> Result<Self, String> {
        let scene_id = record.get("entity_id")
            .and_then(Value::as_str)
            .filter(|id| !id.is_empty())
            .ok_or("missing entity_id")?
            .to_string();

        let display_id = record.get("display_id")
            .and_then(Value::as_str)
            .map(str::to_string);

        let cloud_cover = parse_cloud_cover(record.get("cloud_cover"))?;

        let acquisition_date = record.get("acquisition_date")
            .and_then(Value::as_str)
            .ok_or("missing acquisition_date")
            .and_then(|s| parse_date(s).ok_or("unparseable acquisition_date"))?;

        Ok(SceneCandidate {
            scene_id,
            display_id,
            cloud_cover,
            acquisition_date,
        })
    }

    /// Whether the scene passes a cloud-cover threshold; unknown cover passes
    pub fn within_cloud_cover(&self, max_cloud_cover: f64) -> bool {
        self.cloud_cover.map_or(true, |cover| cover <= max_cloud_cover)
    }
}

/// Numbers or numeric strings; negative means unknown
fn parse_cloud_cover(value: Option<&Value>) -> Result<Option<f64>, String> {
    let cover = match value {
        None | Some(Value::Null) => return Ok(None),
        Some(Value::Number(n)) => n.as_f64(),
        Some(Value::String(s)) => s.trim().parse::<f64>().ok(),
        Some(_) => None,
    };

    match cover {
        Some(c) if !c.is_finite() => Err(format!("cloud_cover {} is not finite", c)),
        Some(c) if c < 0.0 => Ok(None),
        Some(c) if c > 100.0 => Err(format!("cloud_cover {} exceeds 100", c)),
        Some(c) => Ok(Some(c)),
        None => Err("cloud_cover is not a number".to_string()),
    }
}

/// `YYYY-MM-DD`, optionally followed by a time part
fn parse_date(value: &str) -> Option<NaiveDate> {
    let date = value.trim().get(..10)?;
    NaiveDate::parse_from_str(date, DATE_FORMAT).ok()
}

/// Finds candidate scenes for a coordinate through the session
pub struct SceneSearchEngine {
    dataset: String,
    window_days: i64,
    max_results: usize,
}

impl Default for SceneSearchEngine {
    fn default() -> Self {
        Self::new(DEFAULT_DATASET, DEFAULT_WINDOW_DAYS, DEFAULT_MAX_RESULTS)
    }
}

impl SceneSearchEngine {
    pub fn new(dataset: &str, window_days: i64, max_results: usize) -> Self {
        SceneSearchEngine {
            dataset: dataset.to_string(),
            window_days,
            max_results,
        }
    }

    pub fn dataset(&self) -> &str {
        &self.dataset
    }

    /// The window used when none is given: the last `window_days` days through `today`
    pub fn resolve_window(&self, window: Option<DateWindow>, today: NaiveDate) -> Result<DateWindow, SearchError> {
        match window {
            Some(window) => Ok(window),
            None => DateWindow::ending_on(today, self.window_days),
        }
    }

    /// Search relative to the local calendar date
    pub fn search(
        &self,
        session: &SessionManager,
        coordinate: Coordinate,
        window: Option<DateWindow>,
        max_cloud_cover: Option<f64>,
    ) -> Result<Vec<SceneCandidate>, SearchError> {
        self.search_on(session, coordinate, window, max_cloud_cover, Local::now().date_naive())
    }

    /// Search with an explicit reference date for the default window
    ///
    /// An empty result is `Ok(vec![])`. Scenes whose known cloud cover is above
    /// the threshold are dropped even if the catalog returned them.
    pub fn search_on(
        &self,
        session: &SessionManager,
        coordinate: Coordinate,
        window: Option<DateWindow>,
        max_cloud_cover: Option<f64>,
        today: NaiveDate,
    ) -> Result<Vec<SceneCandidate>, SearchError> {
        let max_cloud_cover = max_cloud_cover.unwrap_or(DEFAULT_MAX_CLOUD_COVER);
        if !(0.0..=100.0).contains(&max_cloud_cover) {
            return Err(SearchError::InvalidCloudCover(max_cloud_cover));
        }

        let query = SceneQuery {
            dataset: self.dataset.clone(),
            coordinate,
            window: self.resolve_window(window, today)?,
            max_cloud_cover,
            max_results: self.max_results,
        };
        info!("Searching {} at {} from {} to {} (cloud cover <= {})",
              query.dataset, coordinate, query.window.start_string(), query.window.end_string(), max_cloud_cover);

        let records = session.search_scenes(&query)?;
        debug!("Catalog returned {} records", records.len());

        let mut candidates = Vec::with_capacity(records.len());
        for record in &records {
            match SceneCandidate::from_record(record) {
                Ok(candidate) if candidate.within_cloud_cover(max_cloud_cover) => candidates.push(candidate),
                Ok(candidate) => debug!("Dropping {} with cloud cover {:?}", candidate.scene_id, candidate.cloud_cover),
                Err(reason) => warn!("Skipping malformed scene record ({}): {}", reason, record),
            }
        }

        info!("Found {} scenes", candidates.len());
        Ok(candidates)
    }
}
