use std::fmt::Write;

use lab_analytics::graph::SupportGraph;
use lab_analytics::series::{SeriesQuery, TimeSeries};
use lab_analytics::stats::Overview;

pub fn series_table(series: &TimeSeries) -> String {
    let mut output = String::new();
    let _ = writeln!(output, "| Bucket | Hours | Cost | Participants |");
    let _ = writeln!(output, "|---|---:|---:|---:|");
    for (key, hours, cost, participants) in series.rows() {
        let _ = writeln!(output, "| {key} | {hours:.1} | {cost:.0} | {participants} |");
    }
    output
}

pub fn build_report(
    scope: Option<&str>,
    query: &SeriesQuery,
    overview: &Overview,
    series: &TimeSeries,
    graph: &SupportGraph,
) -> String {
    let mut output = String::new();
    let scope_label = scope.unwrap_or("all labs and projects");

    let _ = writeln!(output, "# Lab Analytics Report");
    let _ = writeln!(
        output,
        "Generated for {} ({} to {}, {} buckets)",
        scope_label,
        query.range.start(),
        query.range.end(),
        query.granularity.label()
    );
    let _ = writeln!(output);
    let _ = writeln!(output, "## Overview");
    let _ = writeln!(output, "- Activities logged: {}", overview.activity_count);
    let _ = writeln!(output, "- Total hours: {:.1}", overview.total_hours);
    let _ = writeln!(output, "- Support hours: {:.1}", overview.support_hours);
    let _ = writeln!(output, "- Participants: {}", overview.participant_count);
    let _ = writeln!(output, "- Actual cost: {:.0}", overview.total_actual_cost);

    let _ = writeln!(output);
    let _ = writeln!(output, "## Time Series");
    let totals = series.totals();
    if totals.hours == 0.0 && totals.cost == 0.0 {
        let _ = writeln!(output, "No activity or cost recorded for this window.");
    } else {
        output.push_str(&series_table(series));
    }

    let _ = writeln!(output);
    let _ = writeln!(output, "## Support Relationships");

    if graph.edges.is_empty() {
        let _ = writeln!(output, "No support activity recorded.");
    } else {
        let mut edges = graph.edges.clone();
        edges.sort_by(|a, b| b.weight.partial_cmp(&a.weight).unwrap_or(std::cmp::Ordering::Equal));
        let _ = writeln!(output, "{} labs connected by {} relationships.", graph.nodes.len(), edges.len());
        for edge in edges.iter().take(10) {
            let _ = writeln!(
                output,
                "- {} supported {}: {:.1}h (last on {})",
                edge.source, edge.target, edge.weight, edge.last_activity_date
            );
        }
    }

    output
}
