use std::collections::HashMap;

use anyhow::{bail, Context};
use chrono::{Duration, NaiveDate, Utc};
use sqlx::{PgPool, Row};
use tracing::{debug, info};
use uuid::Uuid;

use lab_analytics::models::{valid_amount, valid_hours};
use lab_analytics::stats::DirectoryCounts;
use lab_analytics::{ActivityRecord, ActivityType, CostRecord, CostType, DateRange};

pub async fn init_db(pool: &PgPool) -> anyhow::Result<()> {
    sqlx::migrate!("./migrations").run(pool).await?;
    Ok(())
}

const SEED_LABS: &[(&str, &str)] = &[
    ("AFL", "AFL"),
    ("ITER", "Aither"),
    ("SALES", "Sales Lab"),
    ("ROBOFOOT", "Robofoot"),
    ("CSL", "CSL"),
    ("TACTILE", "Tactile Sensor"),
    ("C2B", "C2B"),
    ("FOLD", "Folding Module"),
    ("RDS", "RDS"),
    ("MINIFARM", "MiniFarm"),
    ("DANDELION", "Dandelion"),
    ("CONSUMER", "Consumer Lab"),
];

const SEED_PERSONNEL: &[(&str, &str, &str, &str)] = &[
    ("EMP001", "Kim Chulsoo", "kim.cs@futurelabs.com", "Researcher"),
    ("EMP002", "Lee Younghee", "lee.yh@futurelabs.com", "Senior Researcher"),
    ("EMP003", "Park Minsu", "park.ms@futurelabs.com", "Researcher"),
    ("EMP004", "Jung Sujin", "jung.sj@futurelabs.com", "Principal Researcher"),
    ("EMP005", "Choi Youngsoo", "choi.ys@futurelabs.com", "Researcher"),
];

const SEED_CATEGORIES: &[&str] = &["personnel", "equipment", "materials", "other"];

pub async fn seed(pool: &PgPool) -> anyhow::Result<()> {
    let mut lab_ids = Vec::with_capacity(SEED_LABS.len());
    for &(code, name) in SEED_LABS {
        let id: i64 = sqlx::query(
            r#"
            INSERT INTO lab_analytics.labs (code, name, description)
            VALUES ($1, $2, $3)
            ON CONFLICT (code) DO UPDATE SET name = EXCLUDED.name
            RETURNING id
            "#,
        )
        .bind(code)
        .bind(name)
        .bind(format!("{name} lab"))
        .fetch_one(pool)
        .await?
        .get("id");
        lab_ids.push(id);
    }

    let projects = vec![
        (
            "PRJ001",
            "Smart Factory AI",
            Some(NaiveDate::from_ymd_opt(2024, 1, 1).context("invalid date")?),
            Some(NaiveDate::from_ymd_opt(2024, 12, 31).context("invalid date")?),
            "active",
            lab_ids[0],
        ),
        (
            "PRJ002",
            "Supply Chain Ledger",
            Some(NaiveDate::from_ymd_opt(2024, 2, 1).context("invalid date")?),
            Some(NaiveDate::from_ymd_opt(2024, 11, 30).context("invalid date")?),
            "active",
            lab_ids[1],
        ),
        (
            "PRJ003",
            "Smart Building IoT",
            Some(NaiveDate::from_ymd_opt(2024, 3, 1).context("invalid date")?),
            Some(NaiveDate::from_ymd_opt(2024, 10, 31).context("invalid date")?),
            "active",
            lab_ids[2],
        ),
        ("UNKNOWN", "Unclassified", None, None, "unknown", lab_ids[0]),
    ];

    let mut project_ids = Vec::with_capacity(projects.len());
    for (code, name, start_date, end_date, status, lead_lab_id) in projects {
        let id: i64 = sqlx::query(
            r#"
            INSERT INTO lab_analytics.projects
            (code, name, start_date, end_date, status, lead_lab_id)
            VALUES ($1, $2, $3, $4, $5, $6)
            ON CONFLICT (code) DO UPDATE
            SET name = EXCLUDED.name, status = EXCLUDED.status
            RETURNING id
            "#,
        )
        .bind(code)
        .bind(name)
        .bind(start_date)
        .bind(end_date)
        .bind(status)
        .bind(lead_lab_id)
        .fetch_one(pool)
        .await?
        .get("id");
        project_ids.push(id);
    }

    let mut personnel_ids = Vec::with_capacity(SEED_PERSONNEL.len());
    for &(employee_id, name, email, position) in SEED_PERSONNEL {
        let id: i64 = sqlx::query(
            r#"
            INSERT INTO lab_analytics.personnel (employee_id, name, email, position)
            VALUES ($1, $2, $3, $4)
            ON CONFLICT (employee_id) DO UPDATE
            SET name = EXCLUDED.name, position = EXCLUDED.position
            RETURNING id
            "#,
        )
        .bind(employee_id)
        .bind(name)
        .bind(email)
        .bind(position)
        .fetch_one(pool)
        .await?
        .get("id");
        personnel_ids.push(id);
    }

    // Activity and cost samples spread over the last 90 days across the first five labs.
    let window_start = Utc::now().date_naive() - Duration::days(90);
    let active_labs = &lab_ids[..5];

    for i in 0..200usize {
        let lab_index = (i * 7) % active_labs.len();
        let activity_type = if i % 3 == 0 {
            ActivityType::Support
        } else {
            ActivityType::Own
        };
        let supported_lab_id = match activity_type {
            ActivityType::Support => Some(active_labs[(lab_index + 1 + i % 4) % active_labs.len()]),
            ActivityType::Own => None,
        };
        let project_id = match (i / 5 + i) % 5 {
            4 => None,
            slot => Some(project_ids[slot]),
        };

        sqlx::query(
            r#"
            INSERT INTO lab_analytics.activities
            (personnel_id, lab_id, project_id, activity_date, hours,
             activity_type, supported_lab_id, description, source_key)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            ON CONFLICT (source_key) DO NOTHING
            "#,
        )
        .bind(personnel_ids[i % personnel_ids.len()])
        .bind(active_labs[lab_index])
        .bind(project_id)
        .bind(window_start + Duration::days(((i * 37) % 90) as i64))
        .bind(1.0 + ((i * 13) % 70) as f64 / 10.0)
        .bind(activity_type.as_str())
        .bind(supported_lab_id)
        .bind(format!("Sample activity {}", i + 1))
        .bind(format!("seed-activity-{:03}", i + 1))
        .execute(pool)
        .await?;
    }

    for i in 0..50usize {
        let cost_type = if i % 2 == 0 {
            CostType::Actual
        } else {
            CostType::Budget
        };
        let project_id = match i % 4 {
            3 => None,
            slot => Some(project_ids[slot]),
        };

        sqlx::query(
            r#"
            INSERT INTO lab_analytics.costs
            (lab_id, project_id, cost_date, amount, cost_type, category, description, source_key)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            ON CONFLICT (source_key) DO NOTHING
            "#,
        )
        .bind(active_labs[(i * 3) % active_labs.len()])
        .bind(project_id)
        .bind(window_start + Duration::days(((i * 53) % 90) as i64))
        .bind(100_000.0 + ((i * 7919) % 4_900_000) as f64)
        .bind(cost_type.as_str())
        .bind(SEED_CATEGORIES[i % SEED_CATEGORIES.len()])
        .bind(format!("Sample cost {}", i + 1))
        .bind(format!("seed-cost-{:03}", i + 1))
        .execute(pool)
        .await?;
    }

    info!(
        labs = lab_ids.len(),
        projects = project_ids.len(),
        personnel = personnel_ids.len(),
        "seed data inserted"
    );
    Ok(())
}

pub async fn fetch_activities(pool: &PgPool, range: Option<DateRange>) -> anyhow::Result<Vec<ActivityRecord>> {
    let rows = sqlx::query(
        r#"
        SELECT a.id, a.personnel_id, p.name AS personnel_name, a.lab_id, l.name AS lab_name,
               a.project_id, a.activity_date, a.hours, a.activity_type,
               a.supported_lab_id, sl.name AS supported_lab_name, a.description
        FROM lab_analytics.activities a
        JOIN lab_analytics.personnel p ON p.id = a.personnel_id
        JOIN lab_analytics.labs l ON l.id = a.lab_id
        LEFT JOIN lab_analytics.labs sl ON sl.id = a.supported_lab_id
        WHERE ($1::date IS NULL OR a.activity_date >= $1)
          AND ($2::date IS NULL OR a.activity_date <= $2)
        ORDER BY a.activity_date, a.id
        "#,
    )
    .bind(range.map(|r| r.start()))
    .bind(range.map(|r| r.end()))
    .fetch_all(pool)
    .await
    .context("failed to load activities")?;

    let mut activities = Vec::with_capacity(rows.len());
    for row in rows {
        let activity_type: String = row.get("activity_type");
        activities.push(ActivityRecord {
            id: row.get("id"),
            personnel_id: row.get("personnel_id"),
            personnel_name: row.get("personnel_name"),
            lab_id: row.get("lab_id"),
            lab_name: row.get("lab_name"),
            project_id: row.get("project_id"),
            activity_date: row.get("activity_date"),
            hours: row.get("hours"),
            activity_type: activity_type.parse::<ActivityType>()?,
            supported_lab_id: row.get("supported_lab_id"),
            supported_lab_name: row.get("supported_lab_name"),
            description: row.get("description"),
        });
    }

    debug!(count = activities.len(), "loaded activities");
    Ok(activities)
}

pub async fn fetch_costs(pool: &PgPool, range: Option<DateRange>) -> anyhow::Result<Vec<CostRecord>> {
    let rows = sqlx::query(
        r#"
        SELECT c.id, c.lab_id, l.name AS lab_name, c.project_id, c.cost_date,
               c.amount, c.cost_type, c.category, c.description
        FROM lab_analytics.costs c
        JOIN lab_analytics.labs l ON l.id = c.lab_id
        WHERE ($1::date IS NULL OR c.cost_date >= $1)
          AND ($2::date IS NULL OR c.cost_date <= $2)
        ORDER BY c.cost_date, c.id
        "#,
    )
    .bind(range.map(|r| r.start()))
    .bind(range.map(|r| r.end()))
    .fetch_all(pool)
    .await
    .context("failed to load costs")?;

    let mut costs = Vec::with_capacity(rows.len());
    for row in rows {
        let cost_type: String = row.get("cost_type");
        costs.push(CostRecord {
            id: row.get("id"),
            lab_id: row.get("lab_id"),
            lab_name: row.get("lab_name"),
            project_id: row.get("project_id"),
            cost_date: row.get("cost_date"),
            amount: row.get("amount"),
            cost_type: cost_type.parse::<CostType>()?,
            category: row.get("category"),
            description: row.get("description"),
        });
    }

    debug!(count = costs.len(), "loaded costs");
    Ok(costs)
}

pub async fn fetch_directory_counts(pool: &PgPool) -> anyhow::Result<DirectoryCounts> {
    let row = sqlx::query(
        r#"
        SELECT
            (SELECT COUNT(*) FROM lab_analytics.labs WHERE is_active) AS active_labs,
            (SELECT COUNT(*) FROM lab_analytics.projects) AS projects,
            (SELECT COUNT(*) FROM lab_analytics.personnel WHERE is_active) AS active_personnel
        "#,
    )
    .fetch_one(pool)
    .await
    .context("failed to count labs, projects and personnel")?;

    Ok(DirectoryCounts {
        active_labs: row.get("active_labs"),
        projects: row.get("projects"),
        active_personnel: row.get("active_personnel"),
    })
}

/// Code-to-id lookups used to resolve CSV references.
struct Directory {
    labs: HashMap<String, i64>,
    projects: HashMap<String, i64>,
    personnel: HashMap<String, i64>,
}

impl Directory {
    async fn load(pool: &PgPool) -> anyhow::Result<Self> {
        let mut labs: HashMap<String, i64> = HashMap::new();
        for row in sqlx::query("SELECT id, code FROM lab_analytics.labs")
            .fetch_all(pool)
            .await?
        {
            labs.insert(row.get("code"), row.get("id"));
        }

        let mut projects: HashMap<String, i64> = HashMap::new();
        for row in sqlx::query("SELECT id, code FROM lab_analytics.projects")
            .fetch_all(pool)
            .await?
        {
            projects.insert(row.get("code"), row.get("id"));
        }

        let mut personnel: HashMap<String, i64> = HashMap::new();
        for row in sqlx::query("SELECT id, employee_id FROM lab_analytics.personnel")
            .fetch_all(pool)
            .await?
        {
            personnel.insert(row.get("employee_id"), row.get("id"));
        }

        Ok(Self {
            labs,
            projects,
            personnel,
        })
    }

    fn lab(&self, code: &str) -> anyhow::Result<i64> {
        self.labs
            .get(code)
            .copied()
            .with_context(|| format!("unknown lab code '{code}'"))
    }

    fn project(&self, code: Option<&str>) -> anyhow::Result<Option<i64>> {
        code.map(|code| {
            self.projects
                .get(code)
                .copied()
                .with_context(|| format!("unknown project code '{code}'"))
        })
        .transpose()
    }

    fn person(&self, employee_id: &str) -> anyhow::Result<i64> {
        self.personnel
            .get(employee_id)
            .copied()
            .with_context(|| format!("unknown employee id '{employee_id}'"))
    }
}

pub async fn import_activities_csv(pool: &PgPool, csv_path: &std::path::Path) -> anyhow::Result<usize> {
    #[derive(serde::Deserialize)]
    struct CsvRow {
        employee_id: String,
        lab_code: String,
        project_code: Option<String>,
        activity_date: NaiveDate,
        hours: f64,
        activity_type: ActivityType,
        supported_lab_code: Option<String>,
        description: Option<String>,
        source_key: Option<String>,
    }

    let directory = Directory::load(pool).await?;
    let mut reader = csv::Reader::from_path(csv_path)
        .with_context(|| format!("failed to open {}", csv_path.display()))?;
    let mut inserted = 0usize;

    for (line, result) in reader.deserialize::<CsvRow>().enumerate() {
        let row = result.with_context(|| format!("invalid activity row {}", line + 1))?;
        if !valid_hours(row.hours) {
            bail!("activity row {} has invalid hours {}", line + 1, row.hours);
        }

        let personnel_id = directory.person(&row.employee_id)?;
        let lab_id = directory.lab(&row.lab_code)?;
        let project_id = directory.project(row.project_code.as_deref())?;
        let supported_lab_id = match (row.activity_type, row.supported_lab_code.as_deref()) {
            (ActivityType::Support, Some(code)) => Some(directory.lab(code)?),
            _ => None,
        };

        let source_key = row
            .source_key
            .unwrap_or_else(|| format!("import-{}", Uuid::new_v4()));

        let result = sqlx::query(
            r#"
            INSERT INTO lab_analytics.activities
            (personnel_id, lab_id, project_id, activity_date, hours,
             activity_type, supported_lab_id, description, source_key)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            ON CONFLICT (source_key) DO NOTHING
            "#,
        )
        .bind(personnel_id)
        .bind(lab_id)
        .bind(project_id)
        .bind(row.activity_date)
        .bind(row.hours)
        .bind(row.activity_type.as_str())
        .bind(supported_lab_id)
        .bind(&row.description)
        .bind(source_key)
        .execute(pool)
        .await?;

        if result.rows_affected() > 0 {
            inserted += 1;
        }
    }

    Ok(inserted)
}

pub async fn import_costs_csv(pool: &PgPool, csv_path: &std::path::Path) -> anyhow::Result<usize> {
    #[derive(serde::Deserialize)]
    struct CsvRow {
        lab_code: String,
        project_code: Option<String>,
        cost_date: NaiveDate,
        amount: f64,
        cost_type: CostType,
        category: Option<String>,
        description: Option<String>,
        source_key: Option<String>,
    }

    let directory = Directory::load(pool).await?;
    let mut reader = csv::Reader::from_path(csv_path)
        .with_context(|| format!("failed to open {}", csv_path.display()))?;
    let mut inserted = 0usize;

    for (line, result) in reader.deserialize::<CsvRow>().enumerate() {
        let row = result.with_context(|| format!("invalid cost row {}", line + 1))?;
        if !valid_amount(row.amount) {
            bail!("cost row {} has invalid amount {}", line + 1, row.amount);
        }

        let lab_id = directory.lab(&row.lab_code)?;
        let project_id = directory.project(row.project_code.as_deref())?;
        let source_key = row
            .source_key
            .unwrap_or_else(|| format!("import-{}", Uuid::new_v4()));

        let result = sqlx::query(
            r#"
            INSERT INTO lab_analytics.costs
            (lab_id, project_id, cost_date, amount, cost_type, category, description, source_key)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            ON CONFLICT (source_key) DO NOTHING
            "#,
        )
        .bind(lab_id)
        .bind(project_id)
        .bind(row.cost_date)
        .bind(row.amount)
        .bind(row.cost_type.as_str())
        .bind(&row.category)
        .bind(&row.description)
        .bind(source_key)
        .execute(pool)
        .await?;

        if result.rows_affected() > 0 {
            inserted += 1;
        }
    }

    Ok(inserted)
}
