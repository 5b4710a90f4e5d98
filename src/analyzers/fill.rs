//! Gap detection and carry-forward smoothing for dense series.

use chrono::{Duration, NaiveDate};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::analyzers::utility::is_weekend;

pub const DEFAULT_MAX_CARRY_FORWARD_WEEKS: usize = 5;

/// Inclusive date range, used for holidays and other known anomalies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateRange {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl DateRange {
    pub fn new(start: NaiveDate, end: NaiveDate) -> Self {
        Self { start, end }
    }

    /// Whether this range shares at least one day with `[start, end]`.
    pub fn intersects(&self, start: NaiveDate, end: NaiveDate) -> bool {
        self.start <= end && start <= self.end
    }
}

/// Decides which runs of zero-valued weeks are gaps to smooth over and which
/// are real service gaps to report.
#[derive(Debug, Clone)]
pub struct GapFillPolicy {
    max_carry_weeks: usize,
    holiday_ranges: Vec<DateRange>,
}

impl Default for GapFillPolicy {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_CARRY_FORWARD_WEEKS, Vec::new())
    }
}

impl GapFillPolicy {
    pub fn new(max_carry_weeks: usize, holiday_ranges: Vec<DateRange>) -> Self {
        Self {
            max_carry_weeks,
            holiday_ranges,
        }
    }

    /// Replaces short or holiday-overlapping runs of zeros with the last
    /// non-zero value before the run.
    ///
    /// `weeks[i]` is the Monday that `values[i]` belongs to; both slices are
    /// in chronological order. A run with no preceding non-zero value is left
    /// as zero.
    pub fn fill(&self, weeks: &[NaiveDate], values: &mut [f64]) {
        debug_assert_eq!(weeks.len(), values.len());

        let mut last_known: Option<f64> = None;
        let mut i = 0;

        while i < values.len() {
            if values[i] != 0.0 {
                last_known = Some(values[i]);
                i += 1;
                continue;
            }

            let run_start = i;
            while i < values.len() && values[i] == 0.0 {
                i += 1;
            }
            let run_len = i - run_start;

            let Some(carry) = last_known else {
                continue;
            };

            let span_start = weeks[run_start];
            let span_end = weeks[i - 1] + Duration::days(6);

            if run_len <= self.max_carry_weeks || self.overlaps_holiday(span_start, span_end) {
                values[run_start..i].fill(carry);
            }
        }
    }

    fn overlaps_holiday(&self, start: NaiveDate, end: NaiveDate) -> bool {
        self.holiday_ranges
            .iter()
            .any(|range| range.intersects(start, end))
    }
}

/// Replaces zero readings on Saturdays and Sundays with the most recent
/// earlier non-zero reading.
///
/// Weekday readings are left alone; a weekend zero is treated as a stale
/// update rather than a real drop.
pub fn carry_forward_weekends(daily: &mut BTreeMap<NaiveDate, f64>) {
    let mut last_known: Option<f64> = None;

    for (date, value) in daily.iter_mut() {
        if *value != 0.0 {
            last_known = Some(*value);
            continue;
        }

        if is_weekend(*date) {
            if let Some(carry) = last_known {
                *value = carry;
            }
        }
    }
}
