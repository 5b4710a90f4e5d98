use crate::analyzers::merge::{baseline_percentage, merge_series};
use crate::analyzers::regimes::RegimeSummarizer;
use crate::analyzers::service_levels::build_line_history;
use crate::analyzers::types::{
    DashboardDocument, LineData, LineInfo, RawServiceRow, RidershipEntry, RouteInfo,
    ServiceRegimes, SummaryData, WeeklyMedianSeries,
};
use crate::analyzers::utility::week_start;
use crate::analyzers::weekly::WeeklyMedianSeriesBuilder;
use crate::config::DashboardConfig;
use crate::error::{DashboardError, DashboardResult};
use chrono::{DateTime, NaiveDate, Utc};
use std::collections::{BTreeMap, BTreeSet};
use tracing::{debug, info, warn};

/// Everything loaded for one line before assembly.
#[derive(Debug, Clone)]
pub struct LineRecords {
    pub line: LineInfo,
    pub route_ids: BTreeSet<String>,
    pub service_rows: Vec<RawServiceRow>,
    pub ridership: Vec<RidershipEntry>,
}

/// Groups the route directory by owning line, keeping directory order of
/// routes within each line.
pub fn group_routes_by_line(routes: &[RouteInfo]) -> BTreeMap<String, Vec<&RouteInfo>> {
    let mut lines: BTreeMap<String, Vec<&RouteInfo>> = BTreeMap::new();
    for route in routes {
        lines.entry(route.line_id.clone()).or_default().push(route);
    }
    lines
}

/// Builds a single line's dashboard section.
///
/// Returns `Ok(None)` when the line has no service inside the run window.
///
/// # Errors
///
/// Propagates [`DashboardError::InsufficientHistory`] from the regime
/// summarizer.
pub fn assemble_line(
    records: &LineRecords,
    summarizer: &RegimeSummarizer,
    builder: &WeeklyMedianSeriesBuilder,
    start_date: NaiveDate,
    end_date: NaiveDate,
    baseline_date: NaiveDate,
) -> DashboardResult<Option<LineData>> {
    let history = build_line_history(&records.line, &records.service_rows);

    if history.range(start_date..=end_date).next().is_none() {
        return Ok(None);
    }

    let service_regimes = summarizer.summarize_regimes(&history, end_date, baseline_date)?;

    let service_history =
        builder.build(&history, |entry| entry.total_trips(), start_date, end_date);

    let ridership: BTreeMap<NaiveDate, f64> = records
        .ridership
        .iter()
        .map(|entry| (entry.date, entry.ridership))
        .collect();
    let ridership_history = builder.build(&ridership, |v| *v, start_date, end_date);

    // the emptiness check above guarantees at least one key
    let first_service_date = history.keys().next().copied().unwrap_or(start_date);

    Ok(Some(LineData {
        id: records.line.line_id.clone(),
        short_name: records.line.line_short_name.clone(),
        long_name: records.line.line_long_name.clone(),
        route_ids: records.route_ids.clone(),
        line_kind: records.line.line_kind,
        start_date: first_service_date,
        ridership_history,
        service_history,
        service_regimes,
    }))
}

#[derive(Debug, Default, PartialEq)]
struct ServiceChangeCounts {
    cancelled: usize,
    reduced: usize,
    increased: usize,
}

/// Compares each line's current weekday regime with the one a year earlier.
fn count_service_changes<'a>(
    regimes: impl IntoIterator<Item = &'a ServiceRegimes>,
) -> ServiceChangeCounts {
    let mut counts = ServiceChangeCounts::default();

    for r in regimes {
        let now = &r.current.weekday;
        let then = &r.one_year_ago.weekday;

        if now.cancelled {
            counts.cancelled += 1;
            continue;
        }
        if then.cancelled {
            continue;
        }

        if now.total_trips < then.total_trips {
            counts.reduced += 1;
        } else if now.total_trips > then.total_trips {
            counts.increased += 1;
        }
    }

    counts
}

/// Latest week of `series`, or the week of `end_date` when it is empty.
fn latest_week(series: &WeeklyMedianSeries, end_date: NaiveDate) -> NaiveDate {
    series
        .0
        .keys()
        .next_back()
        .copied()
        .unwrap_or_else(|| week_start(end_date))
}

/// Builds the system-wide summary from every published line.
///
/// Each merged series is read at its own latest week, so a ridership feed
/// running ahead of the service feed does not zero out the service totals.
/// The baseline week is the week containing `baseline_date`.
pub fn summarize_lines(
    lines: &BTreeMap<String, LineData>,
    start_date: NaiveDate,
    end_date: NaiveDate,
    baseline_date: NaiveDate,
) -> SummaryData {
    let total_ridership_history = merge_series(lines.values().map(|l| &l.ridership_history));
    let total_service_history = merge_series(lines.values().map(|l| &l.service_history));

    let baseline_week = week_start(baseline_date);
    let present_service_week = latest_week(&total_service_history, end_date);
    let present_ridership_week = latest_week(&total_ridership_history, end_date);

    if total_service_history.get(baseline_week).is_none() {
        warn!(%baseline_week, "Baseline week is outside the service series");
    }
    if present_service_week != present_ridership_week {
        debug!(
            %present_service_week,
            %present_ridership_week,
            "Service and ridership end in different weeks"
        );
    }

    let counts = count_service_changes(lines.values().map(|l| &l.service_regimes));

    SummaryData {
        total_ridership_percentage: baseline_percentage(
            &total_ridership_history,
            present_ridership_week,
            baseline_week,
        ),
        total_service_percentage: baseline_percentage(
            &total_service_history,
            present_service_week,
            baseline_week,
        ),
        total_passengers: total_ridership_history
            .get(present_ridership_week)
            .unwrap_or(0.0),
        total_trips: total_service_history.get(present_service_week).unwrap_or(0.0),
        total_ridership_history,
        total_service_history,
        total_lines_cancelled: counts.cancelled,
        total_reduced_service: counts.reduced,
        total_increased_service: counts.increased,
        start_date,
        end_date,
    }
}

/// Assembles the full dashboard document from per-line records.
///
/// Excluded lines are skipped. Lines with no service in the window, or whose
/// history is too short to pick an exemplar, are dropped with a warning;
/// no placeholder data is produced for them.
///
/// # Errors
///
/// Fails on an invalid config. Per-line errors other than insufficient
/// history are propagated.
pub fn assemble_dashboard(
    config: &DashboardConfig,
    lines: impl IntoIterator<Item = LineRecords>,
    generated_at: DateTime<Utc>,
) -> DashboardResult<DashboardDocument> {
    config.validate()?;
    let end_date = config.end_date()?;
    let summarizer = config.summarizer();
    let builder = config.series_builder();

    let mut line_data = BTreeMap::new();

    for records in lines {
        let line_id = records.line.line_id.clone();

        if config.is_excluded(&line_id) {
            debug!(line_id = %line_id, "Line excluded by config");
            continue;
        }

        match assemble_line(
            &records,
            &summarizer,
            &builder,
            config.start_date,
            end_date,
            config.baseline_date,
        ) {
            Ok(Some(data)) => {
                line_data.insert(line_id, data);
            }
            Ok(None) => {
                warn!(line_id = %line_id, "No service in run window, dropping line");
            }
            Err(e @ DashboardError::InsufficientHistory { .. }) => {
                warn!(line_id = %line_id, error = %e, "Skipping line");
            }
            Err(e) => return Err(e),
        }
    }

    let summary_data = summarize_lines(
        &line_data,
        config.start_date,
        end_date,
        config.baseline_date,
    );

    info!(
        lines = line_data.len(),
        cancelled = summary_data.total_lines_cancelled,
        reduced = summary_data.total_reduced_service,
        increased = summary_data.total_increased_service,
        "Dashboard assembled"
    );

    Ok(DashboardDocument {
        generated_at,
        line_data,
        summary_data,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analyzers::types::{HOURS_PER_DAY, LineKind, ServiceSummary, ServiceSummaryForDay};
    use crate::analyzers::utility::is_weekend;
    use chrono::Duration;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn line_info(id: &str) -> LineInfo {
        LineInfo {
            line_id: id.to_string(),
            line_short_name: id.to_string(),
            line_long_name: format!("{id} Line"),
            line_kind: LineKind::Subway,
        }
    }

    /// Bidirectional weekday rows with `per_hour` trips each way.
    fn weekday_rows(route: &str, from: NaiveDate, to: NaiveDate, per_hour: f64) -> Vec<RawServiceRow> {
        let mut rows = Vec::new();
        let mut d = from;
        while d <= to {
            if !is_weekend(d) {
                rows.push(RawServiceRow {
                    route_id: route.to_string(),
                    date: d,
                    service_levels: [per_hour * 2.0; HOURS_PER_DAY],
                    has_service_exceptions: false,
                });
            }
            d += Duration::days(1);
        }
        rows
    }

    fn ridership(line: &str, from: NaiveDate, to: NaiveDate, value: f64) -> Vec<RidershipEntry> {
        let mut out = Vec::new();
        let mut d = from;
        while d <= to {
            out.push(RidershipEntry {
                line_id: line.to_string(),
                date: d,
                ridership: value,
            });
            d += Duration::days(1);
        }
        out
    }

    fn records(id: &str, rows: Vec<RawServiceRow>, riders: Vec<RidershipEntry>) -> LineRecords {
        LineRecords {
            line: line_info(id),
            route_ids: rows.iter().map(|r| r.route_id.clone()).collect(),
            service_rows: rows,
            ridership: riders,
        }
    }

    fn config() -> DashboardConfig {
        DashboardConfig::new(date(2024, 3, 4), date(2024, 3, 4)).with_end_date(date(2024, 3, 22))
    }

    fn weekday_summary(cancelled: bool, total: u64) -> ServiceSummary {
        let weekday = if cancelled {
            ServiceSummaryForDay::cancelled()
        } else {
            ServiceSummaryForDay {
                cancelled: false,
                trips_per_hour: None,
                total_trips: total,
            }
        };
        ServiceSummary {
            weekday,
            saturday: ServiceSummaryForDay::cancelled(),
            sunday: ServiceSummaryForDay::cancelled(),
        }
    }

    fn regimes(now: ServiceSummary, then: ServiceSummary) -> ServiceRegimes {
        ServiceRegimes {
            current: now,
            one_year_ago: then,
            baseline: weekday_summary(true, 0),
        }
    }

    #[test]
    fn test_red_line_end_to_end() {
        // [4]*24 bidirectional → [2]*24 unidirectional
        let red = records(
            "Red",
            weekday_rows("Red", date(2024, 3, 4), date(2024, 3, 22), 2.0),
            ridership("Red", date(2024, 3, 4), date(2024, 3, 22), 100.0),
        );

        let doc = assemble_dashboard(&config(), [red], Utc::now()).unwrap();

        let line = &doc.line_data["Red"];
        let current = &line.service_regimes.current;
        assert!(!current.weekday.cancelled);
        assert_eq!(current.weekday.total_trips, 48);
        assert!(current.saturday.cancelled);
        assert!(current.sunday.cancelled);
        assert_eq!(line.service_history.values(), vec![48.0, 48.0, 48.0]);
        assert_eq!(line.ridership_history.values(), vec![100.0, 100.0, 100.0]);
        assert_eq!(line.start_date, date(2024, 3, 4));
    }

    #[test]
    fn test_summary_totals_and_percentages() {
        let red = records(
            "Red",
            weekday_rows("Red", date(2024, 3, 4), date(2024, 3, 8), 2.0)
                .into_iter()
                .chain(weekday_rows("Red", date(2024, 3, 11), date(2024, 3, 22), 4.0))
                .collect(),
            ridership("Red", date(2024, 3, 4), date(2024, 3, 22), 100.0),
        );
        let blue = records(
            "Blue",
            weekday_rows("Blue", date(2024, 3, 4), date(2024, 3, 22), 1.0),
            ridership("Blue", date(2024, 3, 4), date(2024, 3, 22), 50.0),
        );

        let doc = assemble_dashboard(&config(), [red, blue], Utc::now()).unwrap();
        let summary = &doc.summary_data;

        assert_eq!(summary.total_service_history.values(), vec![72.0, 120.0, 120.0]);
        assert_eq!(summary.total_ridership_history.values(), vec![150.0, 150.0, 150.0]);
        assert!((summary.total_service_percentage - 120.0 / 72.0).abs() < 1e-9);
        assert_eq!(summary.total_ridership_percentage, 1.0);
        assert_eq!(summary.total_trips, 120.0);
        assert_eq!(summary.total_passengers, 150.0);
    }

    #[test]
    fn test_excluded_and_empty_lines_are_dropped() {
        let mut config = config();
        config.excluded_line_ids.push("Shuttle".to_string());

        let red = records(
            "Red",
            weekday_rows("Red", date(2024, 3, 4), date(2024, 3, 22), 2.0),
            vec![],
        );
        let shuttle = records(
            "Shuttle",
            weekday_rows("Shuttle", date(2024, 3, 4), date(2024, 3, 22), 2.0),
            vec![],
        );
        let retired = records(
            "Retired",
            weekday_rows("Retired", date(2023, 1, 2), date(2023, 6, 30), 2.0),
            vec![],
        );

        let doc = assemble_dashboard(&config, [red, shuttle, retired], Utc::now()).unwrap();

        assert_eq!(doc.line_data.keys().collect::<Vec<_>>(), vec!["Red"]);
    }

    #[test]
    fn test_line_without_clean_exemplar_is_skipped() {
        let mut rows = weekday_rows("Storm", date(2024, 3, 4), date(2024, 3, 22), 2.0);
        for row in rows.iter_mut() {
            row.has_service_exceptions = true;
        }
        let storm = records("Storm", rows, vec![]);

        let doc = assemble_dashboard(&config(), [storm], Utc::now()).unwrap();

        assert!(doc.line_data.is_empty());
        assert!(doc.summary_data.total_service_history.is_empty());
        assert_eq!(doc.summary_data.total_service_percentage, 0.0);
    }

    #[test]
    fn test_ridership_ahead_of_service_keeps_service_totals() {
        let red = records(
            "Red",
            weekday_rows("Red", date(2024, 3, 4), date(2024, 3, 15), 2.0),
            ridership("Red", date(2024, 3, 4), date(2024, 3, 22), 100.0),
        );

        let doc = assemble_dashboard(&config(), [red], Utc::now()).unwrap();
        let summary = &doc.summary_data;

        assert_eq!(summary.total_service_history.values(), vec![48.0, 48.0]);
        assert_eq!(summary.total_ridership_history.values(), vec![100.0, 100.0, 100.0]);
        assert_eq!(summary.total_service_percentage, 1.0);
        assert_eq!(summary.total_trips, 48.0);
        assert_eq!(summary.total_ridership_percentage, 1.0);
        assert_eq!(summary.total_passengers, 100.0);
    }

    #[test]
    fn test_count_service_changes() {
        let all = [
            regimes(weekday_summary(true, 0), weekday_summary(false, 100)),
            regimes(weekday_summary(false, 80), weekday_summary(false, 100)),
            regimes(weekday_summary(false, 120), weekday_summary(false, 100)),
            regimes(weekday_summary(false, 100), weekday_summary(false, 100)),
            regimes(weekday_summary(false, 100), weekday_summary(true, 0)),
        ];

        let counts = count_service_changes(all.iter());

        assert_eq!(
            counts,
            ServiceChangeCounts {
                cancelled: 1,
                reduced: 1,
                increased: 1,
            }
        );
    }

    #[test]
    fn test_group_routes_by_line() {
        let route = |route_id: &str, line_id: &str| RouteInfo {
            route_id: route_id.to_string(),
            line_id: line_id.to_string(),
            line_short_name: line_id.to_string(),
            line_long_name: line_id.to_string(),
            line_kind: LineKind::Bus,
        };
        let routes = vec![route("Red-A", "Red"), route("1", "line-1"), route("Red-B", "Red")];

        let grouped = group_routes_by_line(&routes);

        assert_eq!(grouped.len(), 2);
        let red: Vec<_> = grouped["Red"].iter().map(|r| r.route_id.as_str()).collect();
        assert_eq!(red, vec!["Red-A", "Red-B"]);
    }
}
