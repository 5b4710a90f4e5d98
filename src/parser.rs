//! CSV decoding for route directories, scheduled-service rows and ridership.

use chrono::NaiveDate;
use serde::Deserialize;
use serde::de::DeserializeOwned;

use crate::analyzers::types::{
    HOURS_PER_DAY, HourlyCounts, RawServiceRow, RidershipEntry, RouteInfo,
};
use crate::error::{DashboardError, DashboardResult};

#[derive(Debug, Deserialize)]
struct ServiceCsvRow {
    date: NaiveDate,
    has_service_exceptions: bool,
    service_levels: String,
}

#[derive(Debug, Deserialize)]
struct RidershipCsvRow {
    date: NaiveDate,
    ridership: f64,
}

fn malformed(source_name: &str, reason: impl ToString) -> DashboardError {
    DashboardError::MalformedRecord {
        source_name: source_name.to_string(),
        reason: reason.to_string(),
    }
}

fn read_records<T: DeserializeOwned>(bytes: &[u8], source_name: &str) -> DashboardResult<Vec<T>> {
    let mut rdr = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_reader(bytes);

    rdr.deserialize()
        .map(|result| result.map_err(|e| malformed(source_name, e)))
        .collect()
}

/// Parses 24 whitespace-separated, non-negative hourly counts.
pub fn parse_hourly_counts(raw: &str) -> Result<HourlyCounts, String> {
    let values = raw
        .split_whitespace()
        .map(|v| v.parse::<f64>().map_err(|e| format!("bad count '{v}': {e}")))
        .collect::<Result<Vec<_>, _>>()?;

    if let Some(v) = values.iter().find(|v| !v.is_finite() || **v < 0.0) {
        return Err(format!("count {v} is not a non-negative number"));
    }

    <HourlyCounts>::try_from(values.as_slice())
        .map_err(|_| format!("expected {HOURS_PER_DAY} hourly counts, got {}", values.len()))
}

/// Decodes the route → line directory.
pub fn parse_routes(bytes: &[u8], source_name: &str) -> DashboardResult<Vec<RouteInfo>> {
    read_records(bytes, source_name)
}

/// Decodes one route's scheduled-service rows.
///
/// # Errors
///
/// Returns [`DashboardError::MalformedRecord`] if a row cannot be decoded or
/// its hourly counts are not 24 non-negative numbers.
pub fn parse_service_rows(
    bytes: &[u8],
    route_id: &str,
    source_name: &str,
) -> DashboardResult<Vec<RawServiceRow>> {
    read_records::<ServiceCsvRow>(bytes, source_name)?
        .into_iter()
        .map(|row| {
            let service_levels = parse_hourly_counts(&row.service_levels)
                .map_err(|reason| malformed(source_name, format!("{}: {reason}", row.date)))?;
            Ok(RawServiceRow {
                route_id: route_id.to_string(),
                date: row.date,
                service_levels,
                has_service_exceptions: row.has_service_exceptions,
            })
        })
        .collect()
}

/// Decodes one line's daily ridership.
pub fn parse_ridership(
    bytes: &[u8],
    line_id: &str,
    source_name: &str,
) -> DashboardResult<Vec<RidershipEntry>> {
    read_records::<RidershipCsvRow>(bytes, source_name)?
        .into_iter()
        .map(|row| {
            if !row.ridership.is_finite() || row.ridership < 0.0 {
                return Err(malformed(
                    source_name,
                    format!("{}: negative ridership {}", row.date, row.ridership),
                ));
            }
            Ok(RidershipEntry {
                line_id: line_id.to_string(),
                date: row.date,
                ridership: row.ridership,
            })
        })
        .collect()
}
