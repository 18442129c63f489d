//! Range totals: per-lab statistics and the dashboard overview.

use std::collections::HashSet;

use chrono::{Duration, NaiveDate};
use serde::Serialize;

use crate::filter::{DateRange, RecordFilter};
use crate::models::{ActivityRecord, ActivityType, CostRecord, CostType};

/// Trailing window the dashboard totals cover.
pub const DASHBOARD_WINDOW_DAYS: i64 = 30;

/// Counts the data layer reads from its own tables rather than from records.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct DirectoryCounts {
    pub active_labs: i64,
    pub projects: i64,
    pub active_personnel: i64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Dashboard {
    pub total_labs: i64,
    pub total_projects: i64,
    pub active_personnel: i64,
    pub total_hours: f64,
    pub total_cost: f64,
    pub since: NaiveDate,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct LabStats {
    pub total_hours: f64,
    pub participant_count: usize,
    pub total_cost: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Overview {
    pub total_hours: f64,
    pub total_actual_cost: f64,
    pub participant_count: usize,
    pub support_hours: f64,
    pub activity_count: usize,
}

/// Totals for one lab across the whole range; personnel are counted once
/// regardless of how many days they logged.
pub fn lab_stats(
    activities: &[ActivityRecord],
    costs: &[CostRecord],
    lab_id: i64,
    range: &DateRange,
    project_id: Option<i64>,
) -> LabStats {
    let filter = RecordFilter::new(Some(lab_id), project_id);
    let mut participants = HashSet::new();
    let mut total_hours = 0.0;

    for activity in activities.iter().filter(|a| filter.admits(*a, range)) {
        total_hours += activity.hours;
        participants.insert(activity.personnel_id);
    }

    let total_cost: f64 = costs
        .iter()
        .filter(|c| filter.admits(*c, range))
        .map(|c| c.amount)
        .sum();

    LabStats {
        total_hours,
        participant_count: participants.len(),
        total_cost,
    }
}

/// Window summary across every record passed in. Budget entries are
/// excluded from the cost total; participants are distinct personnel who
/// logged hours in the window.
pub fn overview(activities: &[ActivityRecord], costs: &[CostRecord], range: &DateRange) -> Overview {
    let mut participants = HashSet::new();
    let mut total_hours = 0.0;
    let mut support_hours = 0.0;
    let mut activity_count = 0;

    for activity in activities.iter().filter(|a| range.contains(a.activity_date)) {
        total_hours += activity.hours;
        if activity.activity_type == ActivityType::Support {
            support_hours += activity.hours;
        }
        participants.insert(activity.personnel_id);
        activity_count += 1;
    }

    let total_actual_cost: f64 = costs
        .iter()
        .filter(|c| c.cost_type == CostType::Actual && range.contains(c.cost_date))
        .map(|c| c.amount)
        .sum();

    Overview {
        total_hours,
        total_actual_cost,
        participant_count: participants.len(),
        support_hours,
        activity_count,
    }
}

/// Landing-page numbers: directory counts plus hours and actual cost dated
/// on or after `today - DASHBOARD_WINDOW_DAYS`.
pub fn dashboard(
    counts: DirectoryCounts,
    activities: &[ActivityRecord],
    costs: &[CostRecord],
    today: NaiveDate,
) -> Dashboard {
    let since = today - Duration::days(DASHBOARD_WINDOW_DAYS);

    let total_hours: f64 = activities
        .iter()
        .filter(|a| a.activity_date >= since)
        .map(|a| a.hours)
        .sum();
    let total_cost: f64 = costs
        .iter()
        .filter(|c| c.cost_type == CostType::Actual && c.cost_date >= since)
        .map(|c| c.amount)
        .sum();

    Dashboard {
        total_labs: counts.active_labs,
        total_projects: counts.projects,
        active_personnel: counts.active_personnel,
        total_hours,
        total_cost,
        since,
    }
}
