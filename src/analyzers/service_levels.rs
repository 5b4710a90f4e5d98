//! Reduction of per-route scheduled-service rows into per-line daily profiles.

use chrono::NaiveDate;
use std::collections::{BTreeMap, BTreeSet};

use crate::analyzers::types::{HOURS_PER_DAY, LineInfo, RawServiceRow, ServiceLevelsEntry};

/// Combines every route row for one line on one date into a single entry.
///
/// Route vectors are summed hour by hour and halved, because each trip is
/// counted once per direction. Returns `None` when `rows` is empty: a date
/// with no rows has no entry, which is different from zero service.
pub fn aggregate_service_levels(
    line: &LineInfo,
    date: NaiveDate,
    rows: &[&RawServiceRow],
) -> Option<ServiceLevelsEntry> {
    if rows.is_empty() {
        return None;
    }

    let mut service_levels = [0.0; HOURS_PER_DAY];
    let mut has_service_exceptions = false;
    let mut route_ids = BTreeSet::new();

    for row in rows {
        for (total, count) in service_levels.iter_mut().zip(row.service_levels.iter()) {
            *total += count;
        }
        has_service_exceptions |= row.has_service_exceptions;
        route_ids.insert(row.route_id.clone());
    }

    for total in service_levels.iter_mut() {
        *total /= 2.0;
    }

    Some(ServiceLevelsEntry {
        line_id: line.line_id.clone(),
        line_short_name: line.line_short_name.clone(),
        line_long_name: line.line_long_name.clone(),
        route_ids,
        date,
        service_levels,
        has_service_exceptions,
    })
}

/// Groups all rows belonging to a line by date and aggregates each date.
///
/// `line` supplies the display names; `rows` may come from any of the
/// line's routes in any order.
pub fn build_line_history(
    line: &LineInfo,
    rows: &[RawServiceRow],
) -> BTreeMap<NaiveDate, ServiceLevelsEntry> {
    let mut by_date: BTreeMap<NaiveDate, Vec<&RawServiceRow>> = BTreeMap::new();
    for row in rows {
        by_date.entry(row.date).or_default().push(row);
    }

    by_date
        .into_iter()
        .filter_map(|(date, day_rows)| {
            aggregate_service_levels(line, date, &day_rows).map(|entry| (date, entry))
        })
        .collect()
}
