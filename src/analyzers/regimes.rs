//! Classification of weekday/Saturday/Sunday service regimes.
//!
//! Cancellation uses a short lookback so that a single disrupted day does
//! not mark a regime as cancelled, while a regime withdrawn for longer than
//! the lookback does. The exemplar profile is taken from the most recent
//! exception-free day, however far back that is.

use chrono::{Duration, NaiveDate};
use std::collections::BTreeMap;

use crate::analyzers::types::{
    DayKind, ServiceLevelsEntry, ServiceRegimes, ServiceSummary, ServiceSummaryForDay,
};
use crate::error::{DashboardError, DashboardResult};

pub const DEFAULT_CANCELLATION_LOOKBACK_DAYS: u32 = 7;

/// Days between the current reference date and its one-year-ago counterpart.
pub const ONE_YEAR_DAYS: i64 = 365;

#[derive(Debug, Clone, Copy)]
pub struct RegimeSummarizer {
    lookback_days: u32,
}

impl Default for RegimeSummarizer {
    fn default() -> Self {
        Self::new(DEFAULT_CANCELLATION_LOOKBACK_DAYS)
    }
}

impl RegimeSummarizer {
    /// A lookback of zero days is treated as one day.
    pub fn new(lookback_days: u32) -> Self {
        Self {
            lookback_days: lookback_days.max(1),
        }
    }

    /// Summarizes one kind of day as seen from `reference`.
    ///
    /// # Errors
    ///
    /// Returns [`DashboardError::InsufficientHistory`] when the regime is
    /// active but no exception-free day of that kind exists on or before
    /// `reference`.
    pub fn summarize(
        &self,
        history: &BTreeMap<NaiveDate, ServiceLevelsEntry>,
        reference: NaiveDate,
        day_kind: DayKind,
    ) -> DashboardResult<ServiceSummaryForDay> {
        if self.is_cancelled(history, reference, day_kind) {
            return Ok(ServiceSummaryForDay::cancelled());
        }

        let exemplar = history
            .range(..=reference)
            .rev()
            .map(|(_, entry)| entry)
            .find(|entry| day_kind.matches(entry.date) && !entry.has_service_exceptions)
            .ok_or(DashboardError::InsufficientHistory {
                day_kind,
                reference,
            })?;

        Ok(ServiceSummaryForDay::from_profile(exemplar.service_levels))
    }

    /// Summarizes all three kinds of day at `reference`.
    pub fn summarize_week(
        &self,
        history: &BTreeMap<NaiveDate, ServiceLevelsEntry>,
        reference: NaiveDate,
    ) -> DashboardResult<ServiceSummary> {
        Ok(ServiceSummary {
            weekday: self.summarize(history, reference, DayKind::Weekday)?,
            saturday: self.summarize(history, reference, DayKind::Saturday)?,
            sunday: self.summarize(history, reference, DayKind::Sunday)?,
        })
    }

    /// Builds the current, one-year-ago and baseline regimes for a line.
    pub fn summarize_regimes(
        &self,
        history: &BTreeMap<NaiveDate, ServiceLevelsEntry>,
        current: NaiveDate,
        baseline: NaiveDate,
    ) -> DashboardResult<ServiceRegimes> {
        Ok(ServiceRegimes {
            current: self.summarize_week(history, current)?,
            one_year_ago: self
                .summarize_week(history, current - Duration::days(ONE_YEAR_DAYS))?,
            baseline: self.summarize_week(history, baseline)?,
        })
    }

    /// Any entry of the matching kind inside the lookback window, with or
    /// without exceptions, means the regime is still running.
    fn is_cancelled(
        &self,
        history: &BTreeMap<NaiveDate, ServiceLevelsEntry>,
        reference: NaiveDate,
        day_kind: DayKind,
    ) -> bool {
        let window_start = reference - Duration::days(self.lookback_days as i64 - 1);
        !history
            .range(window_start..=reference)
            .any(|(date, _)| day_kind.matches(*date))
    }
}
