//! Key-aligned merging of weekly series and baseline-relative ratios.

use chrono::NaiveDate;
use std::collections::BTreeMap;

use crate::analyzers::types::WeeklyMedianSeries;

/// Sums series week by week over the union of their keys.
///
/// Series are aligned by week key, never by position, so inputs that start
/// on different dates still line up.
pub fn merge_series<'a, I>(series: I) -> WeeklyMedianSeries
where
    I: IntoIterator<Item = &'a WeeklyMedianSeries>,
{
    let mut merged: BTreeMap<NaiveDate, f64> = BTreeMap::new();
    for s in series {
        for (week, value) in s.iter() {
            *merged.entry(week).or_insert(0.0) += value;
        }
    }
    WeeklyMedianSeries(merged)
}

/// Ratio of the `present` week to the `baseline` week.
///
/// Returns 0.0 when the baseline value is zero or missing.
pub fn baseline_percentage(
    series: &WeeklyMedianSeries,
    present: NaiveDate,
    baseline: NaiveDate,
) -> f64 {
    let baseline_value = series.get(baseline).unwrap_or(0.0);
    if baseline_value == 0.0 {
        return 0.0;
    }
    series.get(present).unwrap_or(0.0) / baseline_value
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn week(i: i64) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 1, 1).unwrap() + chrono::Duration::weeks(i)
    }

    fn series(values: &[(i64, f64)]) -> WeeklyMedianSeries {
        values.iter().map(|(i, v)| (week(*i), *v)).collect()
    }

    #[test]
    fn test_merge_per_route_series() {
        let routes: HashMap<&str, WeeklyMedianSeries> = HashMap::from([
            ("Red-A", series(&[(0, 3.0), (1, 0.0), (2, 7.0)])),
            ("Red-B", series(&[(0, 0.0), (1, 5.0), (2, 0.0)])),
        ]);

        let merged = merge_series(routes.values());

        assert_eq!(merged.values(), vec![3.0, 5.0, 7.0]);
    }

    #[test]
    fn test_merge_aligns_by_key() {
        let early = series(&[(0, 1.0), (1, 2.0)]);
        let late = series(&[(1, 10.0), (2, 20.0)]);

        let merged = merge_series([&early, &late]);

        assert_eq!(merged.get(week(0)), Some(1.0));
        assert_eq!(merged.get(week(1)), Some(12.0));
        assert_eq!(merged.get(week(2)), Some(20.0));
    }

    #[test]
    fn test_merge_nothing_is_empty() {
        let merged = merge_series(std::iter::empty::<&WeeklyMedianSeries>());
        assert!(merged.is_empty());
    }

    #[test]
    fn test_percentage() {
        let s = series(&[(0, 10.0), (5, 20.0)]);
        assert_eq!(baseline_percentage(&s, week(5), week(0)), 2.0);
    }

    #[test]
    fn test_percentage_zero_baseline() {
        let s = series(&[(0, 0.0), (5, 20.0)]);
        assert_eq!(baseline_percentage(&s, week(5), week(0)), 0.0);
        assert_eq!(baseline_percentage(&s, week(5), week(9)), 0.0);
    }
}
