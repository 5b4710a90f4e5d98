//! Data types shared by the aggregation pipeline.

use chrono::{DateTime, Datelike, NaiveDate, Utc, Weekday};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

pub const HOURS_PER_DAY: usize = 24;

/// Scheduled trips for each local hour of a service day.
pub type HourlyCounts = [f64; HOURS_PER_DAY];

/// Rider-facing mode of a line, as listed in the route directory.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum LineKind {
    Bus,
    Subway,
    LightRail,
    CommuterRail,
    Ferry,
    #[serde(other)]
    Other,
}

/// One row of the route → line directory.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct RouteInfo {
    pub route_id: String,
    pub line_id: String,
    pub line_short_name: String,
    pub line_long_name: String,
    pub line_kind: LineKind,
}

impl RouteInfo {
    pub fn line_info(&self) -> LineInfo {
        LineInfo {
            line_id: self.line_id.clone(),
            line_short_name: self.line_short_name.clone(),
            line_long_name: self.line_long_name.clone(),
            line_kind: self.line_kind,
        }
    }
}

/// Display identity of a line, shared by all of its routes.
#[derive(Debug, Clone, PartialEq)]
pub struct LineInfo {
    pub line_id: String,
    pub line_short_name: String,
    pub line_long_name: String,
    pub line_kind: LineKind,
}

/// A single scheduled-service row for one route on one date.
///
/// Counts are bidirectional: each trip is recorded once per direction.
#[derive(Debug, Clone, PartialEq)]
pub struct RawServiceRow {
    pub route_id: String,
    pub date: NaiveDate,
    pub service_levels: HourlyCounts,
    pub has_service_exceptions: bool,
}

/// Unidirectional scheduled service for a whole line on one date.
#[derive(Debug, Clone, PartialEq)]
pub struct ServiceLevelsEntry {
    pub line_id: String,
    pub line_short_name: String,
    pub line_long_name: String,
    pub route_ids: BTreeSet<String>,
    pub date: NaiveDate,
    pub service_levels: HourlyCounts,
    pub has_service_exceptions: bool,
}

impl ServiceLevelsEntry {
    pub fn total_trips(&self) -> f64 {
        self.service_levels.iter().sum()
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct RidershipEntry {
    pub line_id: String,
    pub date: NaiveDate,
    pub ridership: f64,
}

/// Group of days of the week that share a service regime.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DayKind {
    Weekday,
    Saturday,
    Sunday,
}

impl DayKind {
    pub fn matches(self, date: NaiveDate) -> bool {
        match (self, date.weekday()) {
            (DayKind::Saturday, Weekday::Sat) => true,
            (DayKind::Sunday, Weekday::Sun) => true,
            (DayKind::Weekday, Weekday::Sat | Weekday::Sun) => false,
            (DayKind::Weekday, _) => true,
            _ => false,
        }
    }
}

impl fmt::Display for DayKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            DayKind::Weekday => "weekday",
            DayKind::Saturday => "saturday",
            DayKind::Sunday => "sunday",
        };
        f.write_str(name)
    }
}

/// Regime summary for one kind of day.
///
/// A cancelled day never carries a profile and always reports zero trips.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ServiceSummaryForDay {
    pub cancelled: bool,
    pub trips_per_hour: Option<HourlyCounts>,
    pub total_trips: u64,
}

impl ServiceSummaryForDay {
    pub fn cancelled() -> Self {
        Self {
            cancelled: true,
            trips_per_hour: None,
            total_trips: 0,
        }
    }

    pub fn from_profile(profile: HourlyCounts) -> Self {
        let total: f64 = profile.iter().sum();
        Self {
            cancelled: false,
            trips_per_hour: Some(profile),
            total_trips: total.round() as u64,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ServiceSummary {
    pub weekday: ServiceSummaryForDay,
    pub saturday: ServiceSummaryForDay,
    pub sunday: ServiceSummaryForDay,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ServiceRegimes {
    pub current: ServiceSummary,
    pub one_year_ago: ServiceSummary,
    pub baseline: ServiceSummary,
}

/// Representative value per ISO week, keyed by the Monday that starts it.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct WeeklyMedianSeries(pub BTreeMap<NaiveDate, f64>);

impl WeeklyMedianSeries {
    pub fn get(&self, week: NaiveDate) -> Option<f64> {
        self.0.get(&week).copied()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn values(&self) -> Vec<f64> {
        self.0.values().copied().collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = (NaiveDate, f64)> + '_ {
        self.0.iter().map(|(week, value)| (*week, *value))
    }
}

impl FromIterator<(NaiveDate, f64)> for WeeklyMedianSeries {
    fn from_iter<I: IntoIterator<Item = (NaiveDate, f64)>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

/// Per-line section of the dashboard document.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LineData {
    pub id: String,
    pub short_name: String,
    pub long_name: String,
    pub route_ids: BTreeSet<String>,
    pub line_kind: LineKind,
    pub start_date: NaiveDate,
    pub ridership_history: WeeklyMedianSeries,
    pub service_history: WeeklyMedianSeries,
    pub service_regimes: ServiceRegimes,
}

/// System-wide totals across every published line.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SummaryData {
    pub total_ridership_history: WeeklyMedianSeries,
    pub total_service_history: WeeklyMedianSeries,
    pub total_ridership_percentage: f64,
    pub total_service_percentage: f64,
    pub total_passengers: f64,
    pub total_trips: f64,
    pub total_lines_cancelled: usize,
    pub total_reduced_service: usize,
    pub total_increased_service: usize,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
}

/// Complete dashboard output, written once per run.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardDocument {
    pub generated_at: DateTime<Utc>,
    pub line_data: BTreeMap<String, LineData>,
    pub summary_data: SummaryData,
}
