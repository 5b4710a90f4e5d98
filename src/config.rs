//! Run configuration for a dashboard generation.
//!
//! Stored as a JSON object on disk:
//! ```json
//! {
//!   "start_date": "2023-01-02",
//!   "baseline_date": "2020-02-24",
//!   "excluded_line_ids": ["line-shuttle"],
//!   "holiday_ranges": [{ "start": "2023-12-23", "end": "2024-01-01" }]
//! }
//! ```

use anyhow::{Context, Result};
use chrono::NaiveDate;
use serde::Deserialize;

use crate::analyzers::fill::{DEFAULT_MAX_CARRY_FORWARD_WEEKS, DateRange, GapFillPolicy};
use crate::analyzers::regimes::{DEFAULT_CANCELLATION_LOOKBACK_DAYS, RegimeSummarizer};
use crate::analyzers::weekly::WeeklyMedianSeriesBuilder;
use crate::error::{DashboardError, DashboardResult};

#[derive(Debug, Clone, Deserialize)]
pub struct DashboardConfig {
    pub start_date: NaiveDate,
    /// Left unset to let the caller supply today's service date.
    #[serde(default)]
    pub end_date: Option<NaiveDate>,
    pub baseline_date: NaiveDate,
    #[serde(default)]
    pub excluded_line_ids: Vec<String>,
    /// Gaps overlapping these ranges are filled regardless of length.
    #[serde(default)]
    pub holiday_ranges: Vec<DateRange>,
    #[serde(default = "default_lookback_days")]
    pub cancellation_lookback_days: u32,
    #[serde(default = "default_max_carry_weeks")]
    pub max_carry_forward_weeks: usize,
}

fn default_lookback_days() -> u32 {
    DEFAULT_CANCELLATION_LOOKBACK_DAYS
}

fn default_max_carry_weeks() -> usize {
    DEFAULT_MAX_CARRY_FORWARD_WEEKS
}

impl DashboardConfig {
    /// Loads the config from a JSON file at `path`.
    pub fn load(path: &str) -> Result<Self> {
        let content =
            std::fs::read_to_string(path).with_context(|| format!("reading config '{path}'"))?;
        let config: Self =
            serde_json::from_str(&content).with_context(|| format!("parsing config '{path}'"))?;
        Ok(config)
    }

    /// Creates a config with defaults for everything but the required dates.
    pub fn new(start_date: NaiveDate, baseline_date: NaiveDate) -> Self {
        Self {
            start_date,
            end_date: None,
            baseline_date,
            excluded_line_ids: Vec::new(),
            holiday_ranges: Vec::new(),
            cancellation_lookback_days: DEFAULT_CANCELLATION_LOOKBACK_DAYS,
            max_carry_forward_weeks: DEFAULT_MAX_CARRY_FORWARD_WEEKS,
        }
    }

    pub fn with_end_date(mut self, end_date: NaiveDate) -> Self {
        self.end_date = Some(end_date);
        self
    }

    /// Resolved end of the run window.
    ///
    /// # Errors
    ///
    /// Fails if no end date was ever set.
    pub fn end_date(&self) -> DashboardResult<NaiveDate> {
        self.end_date
            .ok_or_else(|| DashboardError::InvalidConfig("end_date is not set".to_string()))
    }

    pub fn is_excluded(&self, line_id: &str) -> bool {
        self.excluded_line_ids.iter().any(|id| id == line_id)
    }

    /// Checks the whole config, including the resolved run window.
    pub fn validate(&self) -> DashboardResult<()> {
        let end_date = self.end_date()?;
        if self.start_date > end_date {
            return Err(DashboardError::InvalidConfig(format!(
                "start_date {} is after end_date {}",
                self.start_date, end_date
            )));
        }
        self.validate_parameters()
    }

    /// Checks the tuning parameters only; usable before an end date is known.
    pub fn validate_parameters(&self) -> DashboardResult<()> {
        if self.cancellation_lookback_days == 0 {
            return Err(DashboardError::InvalidConfig(
                "cancellation_lookback_days must be at least 1".to_string(),
            ));
        }
        if let Some(range) = self.holiday_ranges.iter().find(|r| r.start > r.end) {
            return Err(DashboardError::InvalidConfig(format!(
                "holiday range {} .. {} ends before it starts",
                range.start, range.end
            )));
        }
        Ok(())
    }

    pub fn summarizer(&self) -> RegimeSummarizer {
        RegimeSummarizer::new(self.cancellation_lookback_days)
    }

    pub fn series_builder(&self) -> WeeklyMedianSeriesBuilder {
        WeeklyMedianSeriesBuilder::new(GapFillPolicy::new(
            self.max_carry_forward_weeks,
            self.holiday_ranges.clone(),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_load_applies_defaults() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"{{"start_date": "2024-01-01", "baseline_date": "2020-02-24",
                "holiday_ranges": [{{"start": "2024-12-23", "end": "2025-01-01"}}]}}"#
        )
        .unwrap();

        let config = DashboardConfig::load(file.path().to_str().unwrap()).unwrap();

        assert_eq!(config.start_date, date(2024, 1, 1));
        assert_eq!(config.end_date, None);
        assert_eq!(config.cancellation_lookback_days, 7);
        assert_eq!(config.max_carry_forward_weeks, 5);
        assert_eq!(config.holiday_ranges.len(), 1);
        assert!(config.excluded_line_ids.is_empty());
    }

    #[test]
    fn test_load_missing_required_field() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{"start_date": "2024-01-01"}}"#).unwrap();

        assert!(DashboardConfig::load(file.path().to_str().unwrap()).is_err());
    }

    #[test]
    fn test_validate_requires_end_date() {
        let config = DashboardConfig::new(date(2024, 1, 1), date(2020, 2, 24));
        assert!(matches!(
            config.validate(),
            Err(DashboardError::InvalidConfig(_))
        ));
        assert!(config.with_end_date(date(2024, 6, 1)).validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_inverted_window() {
        let config =
            DashboardConfig::new(date(2024, 6, 1), date(2020, 2, 24)).with_end_date(date(2024, 1, 1));
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_inverted_holiday() {
        let mut config =
            DashboardConfig::new(date(2024, 1, 1), date(2020, 2, 24)).with_end_date(date(2024, 6, 1));
        config
            .holiday_ranges
            .push(DateRange::new(date(2024, 3, 2), date(2024, 3, 1)));
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_parameters_without_end_date() {
        let mut config = DashboardConfig::new(date(2024, 1, 1), date(2020, 2, 24));
        assert!(config.validate_parameters().is_ok());

        config.cancellation_lookback_days = 0;
        assert!(matches!(
            config.validate_parameters(),
            Err(DashboardError::InvalidConfig(_))
        ));
    }

    #[test]
    fn test_excluded_lines() {
        let mut config = DashboardConfig::new(date(2024, 1, 1), date(2020, 2, 24));
        config.excluded_line_ids.push("line-shuttle".to_string());
        assert!(config.is_excluded("line-shuttle"));
        assert!(!config.is_excluded("line-red"));
    }
}
