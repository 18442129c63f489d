use std::path::PathBuf;

use anyhow::Context;
use chrono::{Months, NaiveDate, Utc};
use clap::{Args, Parser, Subcommand};
use sqlx::postgres::PgPoolOptions;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use lab_analytics::graph::{build_support_graph_with, GraphFilter};
use lab_analytics::series::{aggregate, SeriesQuery};
use lab_analytics::stats::{dashboard, lab_stats, overview};
use lab_analytics::{AnalyticsError, CostType, DateRange, Granularity, RecordFilter};

mod db;
mod report;

#[derive(Parser)]
#[command(name = "lab-analytics")]
#[command(about = "Lab activity and cost analytics for the lab management dashboard", long_about = None)]
struct Cli {
    /// Log level for this crate when RUST_LOG is unset
    #[arg(long, global = true, default_value = "info")]
    log_level: String,

    /// Postgres connection string for the lab dashboard database
    #[arg(long, global = true, env = "DATABASE_URL", hide_env_values = true)]
    database_url: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Args)]
struct RangeArgs {
    /// First day of the window (inclusive); defaults to one month ago
    #[arg(long)]
    from: Option<NaiveDate>,
    /// Last day of the window (inclusive); defaults to today
    #[arg(long)]
    to: Option<NaiveDate>,
}

#[derive(Subcommand)]
enum Commands {
    /// Create or upgrade the database schema
    InitDb,
    /// Load sample labs, personnel, activities and costs
    Seed,
    /// Import activities from a CSV file
    ImportActivities {
        #[arg(long)]
        csv: PathBuf,
    },
    /// Import costs from a CSV file
    ImportCosts {
        #[arg(long)]
        csv: PathBuf,
    },
    /// Show dashboard headline numbers for the last 30 days
    Dashboard,
    /// Print hours, cost and participant series per time bucket
    Series {
        #[command(flatten)]
        range: RangeArgs,
        #[arg(long, default_value_t = Granularity::Month)]
        granularity: Granularity,
        #[arg(long)]
        lab_id: Option<i64>,
        #[arg(long)]
        project_id: Option<i64>,
        /// Only sum costs of this type (actual or budget)
        #[arg(long)]
        cost_type: Option<CostType>,
        /// Emit JSON instead of a table
        #[arg(long)]
        json: bool,
    },
    /// Export the lab support graph as JSON nodes and edges
    Graph {
        /// Restrict to support activities on or after this day
        #[arg(long)]
        from: Option<NaiveDate>,
        /// Restrict to support activities on or before this day
        #[arg(long)]
        to: Option<NaiveDate>,
        #[arg(long)]
        project_id: Option<i64>,
        /// Keep only relationships where this lab supports or is supported
        #[arg(long)]
        lab_id: Option<i64>,
        /// Write to a file instead of stdout
        #[arg(long)]
        out: Option<PathBuf>,
    },
    /// Show totals for a single lab
    Stats {
        #[arg(long)]
        lab_id: i64,
        #[command(flatten)]
        range: RangeArgs,
        #[arg(long)]
        project_id: Option<i64>,
    },
    /// Generate a markdown report
    Report {
        #[command(flatten)]
        range: RangeArgs,
        #[arg(long, default_value_t = Granularity::Month)]
        granularity: Granularity,
        #[arg(long)]
        lab_id: Option<i64>,
        #[arg(long)]
        project_id: Option<i64>,
        #[arg(long, default_value = "lab-report.md")]
        out: PathBuf,
    },
}

impl RangeArgs {
    /// Both bounds omitted selects the last month; one bound alone is rejected.
    fn resolve(&self) -> anyhow::Result<DateRange> {
        let range = match (self.from, self.to) {
            (None, None) => {
                let today = Utc::now().date_naive();
                let month_ago = today.checked_sub_months(Months::new(1)).unwrap_or(today);
                DateRange::new(month_ago, today)
            }
            (from, to) => DateRange::from_bounds(from, to),
        };
        warn_on_bad_range(range)
    }
}

fn warn_on_bad_range(range: Result<DateRange, AnalyticsError>) -> anyhow::Result<DateRange> {
    range.map_err(|err| {
        warn!(error = %err, "no chart for this date range");
        anyhow::Error::new(err).context("select a complete, non-inverted date range")
    })
}

fn init_logging(level: &str) {
    tracing_subscriber::registry()
        .with(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(format!("lab_analytics={level},warn"))),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_logging(&cli.log_level);

    let pool = PgPoolOptions::new()
        .max_connections(5)
        .connect(&cli.database_url)
        .await
        .context("failed to connect to Postgres")?;

    match cli.command {
        Commands::InitDb => {
            db::init_db(&pool).await?;
            println!("Schema ready.");
        }
        Commands::Seed => {
            db::seed(&pool).await?;
            println!("Seed data inserted.");
        }
        Commands::ImportActivities { csv } => {
            let inserted = db::import_activities_csv(&pool, &csv).await?;
            println!("Inserted {inserted} activities from {}.", csv.display());
        }
        Commands::ImportCosts { csv } => {
            let inserted = db::import_costs_csv(&pool, &csv).await?;
            println!("Inserted {inserted} costs from {}.", csv.display());
        }
        Commands::Dashboard => {
            let counts = db::fetch_directory_counts(&pool).await?;
            let activities = db::fetch_activities(&pool, None).await?;
            let costs = db::fetch_costs(&pool, None).await?;
            let board = dashboard(counts, &activities, &costs, Utc::now().date_naive());

            println!("Dashboard (activity and cost since {}):", board.since);
            println!("- active labs {}", board.total_labs);
            println!("- projects {}", board.total_projects);
            println!("- active personnel {}", board.active_personnel);
            println!("- hours logged {:.1}", board.total_hours);
            println!("- actual cost {:.0}", board.total_cost);
        }
        Commands::Series {
            range,
            granularity,
            lab_id,
            project_id,
            cost_type,
            json,
        } => {
            let range = range.resolve()?;
            let activities = db::fetch_activities(&pool, Some(range)).await?;
            let costs = db::fetch_costs(&pool, Some(range)).await?;
            let query = SeriesQuery::new(range, granularity)
                .with_filter(RecordFilter::new(lab_id, project_id))
                .with_cost_type(cost_type);
            let series = aggregate(&activities, &costs, &query);

            if json {
                println!("{}", serde_json::to_string_pretty(&series)?);
            } else {
                let totals = series.totals();
                print!("{}", report::series_table(&series));
                println!(
                    "{} buckets, {:.1} hours, {:.0} cost in total.",
                    series.len(),
                    totals.hours,
                    totals.cost
                );
            }
        }
        Commands::Graph {
            from,
            to,
            project_id,
            lab_id,
            out,
        } => {
            let range = match (from, to) {
                (None, None) => None,
                (from, to) => Some(warn_on_bad_range(DateRange::from_bounds(from, to))?),
            };
            let activities = db::fetch_activities(&pool, range).await?;
            let filter = GraphFilter {
                range,
                project_id,
                lab_id,
            };
            let graph = build_support_graph_with(&activities, &filter);
            info!(nodes = graph.nodes.len(), edges = graph.edges.len(), "built support graph");

            let payload = serde_json::to_string_pretty(&graph)?;
            match out {
                Some(path) => {
                    std::fs::write(&path, payload)
                        .with_context(|| format!("failed to write {}", path.display()))?;
                    println!("Support graph written to {}.", path.display());
                }
                None => println!("{payload}"),
            }
        }
        Commands::Stats {
            lab_id,
            range,
            project_id,
        } => {
            let range = range.resolve()?;
            let activities = db::fetch_activities(&pool, Some(range)).await?;
            let costs = db::fetch_costs(&pool, Some(range)).await?;
            let stats = lab_stats(&activities, &costs, lab_id, &range, project_id);

            println!("Lab {lab_id} from {} to {}:", range.start(), range.end());
            println!("- total hours {:.1}", stats.total_hours);
            println!("- participants {}", stats.participant_count);
            println!("- total cost {:.0}", stats.total_cost);
        }
        Commands::Report {
            range,
            granularity,
            lab_id,
            project_id,
            out,
        } => {
            let range = range.resolve()?;
            let activities = db::fetch_activities(&pool, Some(range)).await?;
            let costs = db::fetch_costs(&pool, Some(range)).await?;
            let filter = RecordFilter::new(lab_id, project_id);
            let query = SeriesQuery::new(range, granularity).with_filter(filter);

            let series = aggregate(&activities, &costs, &query);
            let scoped_activities: Vec<_> = activities.iter().filter(|a| filter.matches(*a)).cloned().collect();
            let scoped_costs: Vec<_> = costs.iter().filter(|c| filter.matches(*c)).cloned().collect();
            let summary = overview(&scoped_activities, &scoped_costs, &range);
            let graph = build_support_graph_with(
                &activities,
                &GraphFilter {
                    range: Some(range),
                    project_id,
                    lab_id,
                },
            );
            let scope = match (lab_id, project_id) {
                (Some(lab), Some(project)) => Some(format!("lab {lab}, project {project}")),
                (Some(lab), None) => Some(format!("lab {lab}")),
                (None, Some(project)) => Some(format!("project {project}")),
                (None, None) => None,
            };

            let report = report::build_report(scope.as_deref(), &query, &summary, &series, &graph);
            std::fs::write(&out, report)
                .with_context(|| format!("failed to write {}", out.display()))?;
            println!("Report written to {}.", out.display());
        }
    }

    Ok(())
}
