//! Error types raised by the reconciliation engine and its loaders.

use chrono::NaiveDate;
use thiserror::Error;

use crate::analyzers::types::DayKind;

/// Errors surfaced to callers of the engine.
///
/// Missing dates and empty histories are not errors; they resolve to
/// absence at the point they are found.
#[derive(Debug, Error)]
pub enum DashboardError {
    /// The unbounded exemplar walk ran out of history without finding an
    /// exception-free day of the requested kind.
    #[error("no exception-free {day_kind} service on or before {reference}")]
    InsufficientHistory {
        day_kind: DayKind,
        reference: NaiveDate,
    },

    #[error("invalid config: {0}")]
    InvalidConfig(String),

    #[error("malformed record in {source_name}: {reason}")]
    MalformedRecord { source_name: String, reason: String },
}

pub type DashboardResult<T> = Result<T, DashboardError>;
