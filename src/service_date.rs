//! Service-date computation.
//!
//! A transit service day runs past local midnight until an early-morning
//! cutoff, so a trip at 01:30 on Tuesday belongs to Monday's service.

use chrono::{Duration, NaiveDate, NaiveDateTime, Timelike};

pub const DEFAULT_CUTOFF_HOUR: u32 = 3;

/// Service date for a local timestamp, given the cutoff hour.
pub fn service_date(local: NaiveDateTime, cutoff_hour: u32) -> NaiveDate {
    if local.hour() < cutoff_hour {
        local.date() - Duration::days(1)
    } else {
        local.date()
    }
}

/// Memoized service-date clock owned by its caller.
///
/// The result only changes when the local hour changes, so the last
/// `(date, hour)` pair and its answer are kept.
#[derive(Debug, Clone)]
pub struct ServiceDay {
    cutoff_hour: u32,
    cached: Option<((NaiveDate, u32), NaiveDate)>,
}

impl Default for ServiceDay {
    fn default() -> Self {
        Self::new(DEFAULT_CUTOFF_HOUR)
    }
}

impl ServiceDay {
    pub fn new(cutoff_hour: u32) -> Self {
        Self {
            cutoff_hour,
            cached: None,
        }
    }

    pub fn at(&mut self, local: NaiveDateTime) -> NaiveDate {
        let key = (local.date(), local.hour());
        if let Some((cached_key, date)) = self.cached {
            if cached_key == key {
                return date;
            }
        }

        let date = service_date(local, self.cutoff_hour);
        self.cached = Some((key, date));
        date
    }

    /// Service date for the current local time.
    pub fn today(&mut self) -> NaiveDate {
        self.at(chrono::Local::now().naive_local())
    }
}
