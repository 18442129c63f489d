//! Error types for the analytics core.

use chrono::NaiveDate;

/// Conditions the core surfaces to callers instead of degrading silently.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AnalyticsError {
    #[error("date range is inverted: end {end} is before start {start}")]
    InvertedRange { start: NaiveDate, end: NaiveDate },

    #[error("date range is incomplete: both start and end dates are required")]
    MissingRange,

    #[error("unknown granularity '{0}' (expected day, week, month or year)")]
    UnknownGranularity(String),

    #[error("unknown activity type '{0}' (expected own or support)")]
    UnknownActivityType(String),

    #[error("unknown cost type '{0}' (expected actual or budget)")]
    UnknownCostType(String),
}

pub type AnalyticsResult<T> = Result<T, AnalyticsError>;
