//! Weekly median series built from irregular per-date records.

use chrono::{Duration, NaiveDate};
use std::collections::BTreeMap;

use crate::analyzers::fill::{GapFillPolicy, carry_forward_weekends};
use crate::analyzers::types::WeeklyMedianSeries;
use crate::analyzers::utility::{median_lower, week_start};

/// Builds one representative value per ISO week.
#[derive(Debug, Clone, Default)]
pub struct WeeklyMedianSeriesBuilder {
    policy: GapFillPolicy,
}

impl WeeklyMedianSeriesBuilder {
    pub fn new(policy: GapFillPolicy) -> Self {
        Self { policy }
    }

    /// Produces a dense weekly series covering every week from the week of
    /// `start` up to the week of `max_end`, where `max_end` is clamped to the
    /// latest date in `entries`.
    ///
    /// Weeks with entries take the lower median of `extract` over that week;
    /// weeks without entries start at zero and are then gap-filled.
    pub fn build<E, F>(
        &self,
        entries: &BTreeMap<NaiveDate, E>,
        extract: F,
        start: NaiveDate,
        max_end: NaiveDate,
    ) -> WeeklyMedianSeries
    where
        F: Fn(&E) -> f64,
    {
        let Some(latest) = entries.keys().next_back().copied() else {
            return WeeklyMedianSeries::default();
        };
        let end = max_end.min(latest);
        if end < start {
            return WeeklyMedianSeries::default();
        }

        let mut daily: BTreeMap<NaiveDate, f64> = entries
            .range(..=end)
            .map(|(date, entry)| (*date, extract(entry)))
            .collect();
        carry_forward_weekends(&mut daily);

        let first_week = week_start(start);
        let last_week = week_start(end);

        let mut buckets: BTreeMap<NaiveDate, Vec<f64>> = BTreeMap::new();
        for (date, value) in daily.range(first_week..) {
            buckets.entry(week_start(*date)).or_default().push(*value);
        }

        let mut weeks = Vec::new();
        let mut week = first_week;
        while week <= last_week {
            weeks.push(week);
            week += Duration::weeks(1);
        }

        let mut values: Vec<f64> = weeks
            .iter()
            .map(|week| buckets.get(week).map_or(0.0, |v| median_lower(v)))
            .collect();

        self.policy.fill(&weeks, &mut values);

        weeks.into_iter().zip(values).collect()
    }
}
