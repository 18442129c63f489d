//! Analytics core for the lab management dashboard.
//!
//! Pure, synchronous transformations over already-loaded activity and cost
//! records: time-bucketed hour/cost/participant series, per-lab totals, and
//! the directed support graph between labs. Nothing here performs I/O or
//! keeps state between calls.

pub mod bucket;
pub mod error;
pub mod filter;
pub mod graph;
pub mod models;
pub mod series;
pub mod stats;

pub use bucket::{bucket_key, enumerate_buckets, BucketKey, Granularity};
pub use error::{AnalyticsError, AnalyticsResult};
pub use filter::{DateRange, RecordFilter};
pub use graph::{build_support_graph, build_support_graph_with, GraphFilter, SupportGraph};
pub use models::{ActivityRecord, ActivityType, CostRecord, CostType};
pub use series::{aggregate, SeriesQuery, TimeSeries};
