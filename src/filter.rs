//! Lab / project / date predicates applied before aggregation.

use chrono::NaiveDate;
use serde::Serialize;

use crate::error::{AnalyticsError, AnalyticsResult};
use crate::models::{ActivityRecord, CostRecord};

/// Closed, non-inverted day range.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct DateRange {
    start: NaiveDate,
    end: NaiveDate,
}

impl DateRange {
    pub fn new(start: NaiveDate, end: NaiveDate) -> AnalyticsResult<Self> {
        if end < start {
            return Err(AnalyticsError::InvertedRange { start, end });
        }
        Ok(Self { start, end })
    }

    /// Builds a range from optional picker bounds; both must be present.
    pub fn from_bounds(start: Option<NaiveDate>, end: Option<NaiveDate>) -> AnalyticsResult<Self> {
        match (start, end) {
            (Some(start), Some(end)) => Self::new(start, end),
            _ => Err(AnalyticsError::MissingRange),
        }
    }

    pub fn start(&self) -> NaiveDate {
        self.start
    }

    pub fn end(&self) -> NaiveDate {
        self.end
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        self.start <= date && date <= self.end
    }
}

/// Fields the filter layer inspects on a source record.
pub trait Scoped {
    fn lab_id(&self) -> i64;
    fn project_id(&self) -> Option<i64>;
    fn record_date(&self) -> NaiveDate;
}

impl Scoped for ActivityRecord {
    fn lab_id(&self) -> i64 {
        self.lab_id
    }

    fn project_id(&self) -> Option<i64> {
        self.project_id
    }

    fn record_date(&self) -> NaiveDate {
        self.activity_date
    }
}

impl Scoped for CostRecord {
    fn lab_id(&self) -> i64 {
        self.lab_id
    }

    fn project_id(&self) -> Option<i64> {
        self.project_id
    }

    fn record_date(&self) -> NaiveDate {
        self.cost_date
    }
}

/// Optional lab and project equality filters. Absent filters always pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct RecordFilter {
    pub lab_id: Option<i64>,
    pub project_id: Option<i64>,
}

impl RecordFilter {
    pub fn new(lab_id: Option<i64>, project_id: Option<i64>) -> Self {
        Self { lab_id, project_id }
    }

    pub fn matches<R: Scoped>(&self, record: &R) -> bool {
        if let Some(lab_id) = self.lab_id {
            if record.lab_id() != lab_id {
                return false;
            }
        }
        if let Some(project_id) = self.project_id {
            if record.project_id() != Some(project_id) {
                return false;
            }
        }
        true
    }

    /// Lab/project predicates plus the inclusive day-level range check.
    pub fn admits<R: Scoped>(&self, record: &R, range: &DateRange) -> bool {
        range.contains(record.record_date()) && self.matches(record)
    }
}
