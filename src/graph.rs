//! Directed lab-to-lab support graph derived from support activities.

use chrono::NaiveDate;
use indexmap::{IndexMap, IndexSet};
use serde::Serialize;
use tracing::debug;

use crate::filter::DateRange;
use crate::models::ActivityRecord;

/// Hours one lab spent supporting another, merged across activities.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SupportEdge {
    pub supporting_lab: String,
    pub supported_lab: String,
    pub total_hours: f64,
    pub last_activity_date: NaiveDate,
}

impl SupportEdge {
    pub fn label(&self) -> String {
        format!(
            "{}→{} ({}h)",
            self.supporting_lab,
            self.supported_lab,
            self.total_hours.round() as i64
        )
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GraphNode {
    pub id: String,
    pub label: String,
}

/// Renderer-facing edge. `weight` is the raw hour total; scaling it to a
/// stroke width is up to the consumer.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GraphEdge {
    pub source: String,
    pub target: String,
    pub weight: f64,
    pub label: String,
    pub last_activity_date: NaiveDate,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct SupportGraph {
    pub nodes: Vec<GraphNode>,
    pub edges: Vec<GraphEdge>,
}

/// Optional restrictions on which support activities feed the graph.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct GraphFilter {
    pub range: Option<DateRange>,
    pub project_id: Option<i64>,
    /// Keeps only activities where this lab is the supporting or supported side.
    pub lab_id: Option<i64>,
}

impl GraphFilter {
    fn admits(&self, activity: &ActivityRecord) -> bool {
        if let Some(range) = &self.range {
            if !range.contains(activity.activity_date) {
                return false;
            }
        }
        if let Some(project_id) = self.project_id {
            if activity.project_id != Some(project_id) {
                return false;
            }
        }
        match self.lab_id {
            Some(lab_id) => activity.lab_id == lab_id || activity.supported_lab_id == Some(lab_id),
            None => true,
        }
    }
}

/// Groups support activities by ordered (supporting, supported) lab pair,
/// keyed by lab id so distinct labs sharing a name stay separate edges. The
/// supported lab falls back to its name when the record carries no id.
/// Edges come out in order of first appearance.
pub fn support_edges(activities: &[ActivityRecord], filter: &GraphFilter) -> Vec<SupportEdge> {
    let mut groups: IndexMap<(i64, Option<i64>, String), SupportEdge> = IndexMap::new();

    for activity in activities {
        let Some(target) = activity.support_target() else {
            continue;
        };
        if !filter.admits(activity) {
            continue;
        }

        let source = activity.lab_name.trim();
        let edge = groups
            .entry((activity.lab_id, activity.supported_lab_id, target.to_string()))
            .or_insert_with(|| SupportEdge {
                supporting_lab: source.to_string(),
                supported_lab: target.to_string(),
                total_hours: 0.0,
                last_activity_date: activity.activity_date,
            });
        edge.total_hours += activity.hours;
        edge.last_activity_date = edge.last_activity_date.max(activity.activity_date);
    }

    groups.into_values().collect()
}

pub fn build_support_graph(activities: &[ActivityRecord]) -> SupportGraph {
    build_support_graph_with(activities, &GraphFilter::default())
}

pub fn build_support_graph_with(activities: &[ActivityRecord], filter: &GraphFilter) -> SupportGraph {
    let merged = support_edges(activities, filter);

    let mut lab_names: IndexSet<&str> = IndexSet::new();
    for edge in &merged {
        for lab in [edge.supporting_lab.as_str(), edge.supported_lab.as_str()] {
            if !lab.is_empty() {
                lab_names.insert(lab);
            }
        }
    }

    let edges: Vec<GraphEdge> = merged
        .iter()
        .filter(|edge| lab_names.contains(edge.supporting_lab.as_str()) && lab_names.contains(edge.supported_lab.as_str()))
        .map(|edge| GraphEdge {
            source: edge.supporting_lab.clone(),
            target: edge.supported_lab.clone(),
            weight: edge.total_hours,
            label: edge.label(),
            last_activity_date: edge.last_activity_date,
        })
        .collect();

    let dropped = merged.len() - edges.len();
    if dropped > 0 {
        debug!(dropped, "dropped support edges with missing endpoints");
    }

    let nodes = lab_names
        .into_iter()
        .map(|name| GraphNode {
            id: name.to_string(),
            label: name.to_string(),
        })
        .collect();

    SupportGraph { nodes, edges }
}
