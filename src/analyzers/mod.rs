//! Service and ridership reconciliation.
//!
//! Raw per-route schedule rows are reduced to per-line daily profiles,
//! summarized into weekday/Saturday/Sunday regimes, bucketed into gap-filled
//! weekly series, and merged into system totals. The async loaders and the
//! S3 publisher sit on top of the pure pieces.

pub mod aggregate;
pub mod analyzer;
pub mod fill;
pub mod merge;
pub mod regimes;
pub mod service_levels;
pub mod types;
pub mod utility;
pub mod weekly;
pub mod writetos3;
