use anyhow::Context;
use chrono::NaiveDate;
use sqlx::{PgPool, Row};
use uuid::Uuid;

use crate::models::{DepartmentHotspot, NewTask, RiskDriver, RiskOverview, RiskScope};
use crate::risk;

pub async fn init_db(pool: &PgPool) -> anyhow::Result<()> {
    sqlx::migrate!("./migrations").run(pool).await?;
    Ok(())
}

/// Demo tenant used by `seed`.
pub const SEED_TENANT_ID: &str = "a3b8c6d2-5f41-4e0b-9c77-1d2e8f3a6b90";

pub async fn seed(pool: &PgPool) -> anyhow::Result<()> {
    let tenant_id = Uuid::parse_str(SEED_TENANT_ID)?;
    let scored_at = NaiveDate::from_ymd_opt(2026, 8, 3).context("invalid date")?;

    // (source_key, employee, dept_en, dept_ar, project, grade, risk_score)
    let scores = vec![
        ("seed-rs-001", "0c22f1f1-9184-4fd4-9b21-28c68a6a89dc", "Engineering", "الهندسة", "neom-hub", "G5", 82.0),
        ("seed-rs-002", "3d7f5d6f-24f7-4e8e-8b4b-3e7e44b4a7b2", "Engineering", "الهندسة", "neom-hub", "G4", 76.0),
        ("seed-rs-003", "d5a0a1a2-2a3c-44c2-8f73-60b7897a9dd2", "Engineering", "الهندسة", "riyadh-portal", "G4", 68.0),
        ("seed-rs-004", "7a3f9c11-6a55-4a2e-9f0d-2b9c7e5d4f31", "Sales", "المبيعات", "riyadh-portal", "G3", 74.0),
        ("seed-rs-005", "91b2e4d7-3c88-4f6a-b5e1-8a0d6c2f7e45", "Sales", "المبيعات", "riyadh-portal", "G3", 55.0),
        ("seed-rs-006", "c4d5e6f7-1a2b-4c3d-8e9f-0a1b2c3d4e5f", "Sales", "المبيعات", "jeddah-retail", "G2", 38.0),
        ("seed-rs-007", "5e6f7a8b-9c0d-4e1f-a2b3-c4d5e6f7a8b9", "Customer Support", "خدمة العملاء", "jeddah-retail", "G2", 47.0),
        ("seed-rs-008", "2f3a4b5c-6d7e-4f8a-9b0c-1d2e3f4a5b6c", "Customer Support", "خدمة العملاء", "jeddah-retail", "G1", 31.0),
    ];

    for (source_key, employee_id, dept_en, dept_ar, project_id, grade, risk_score) in scores {
        sqlx::query(
            r#"
            INSERT INTO retention_engine.risk_scores
            (id, tenant_id, employee_id, department_en, department_ar, project_id, grade, risk_score, scored_at, source_key)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
            ON CONFLICT (source_key) DO NOTHING
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(tenant_id)
        .bind(Uuid::parse_str(employee_id)?)
        .bind(dept_en)
        .bind(dept_ar)
        .bind(project_id)
        .bind(grade)
        .bind(risk_score)
        .bind(scored_at)
        .bind(source_key)
        .execute(pool)
        .await?;
    }

    // (source_key, employee, dept_en, project, grade, driver, contribution)
    let signals = vec![
        ("seed-ds-001", "0c22f1f1-9184-4fd4-9b21-28c68a6a89dc", "Engineering", "neom-hub", "G5", "Compensation", 24.0),
        ("seed-ds-002", "3d7f5d6f-24f7-4e8e-8b4b-3e7e44b4a7b2", "Engineering", "neom-hub", "G4", "Compensation", 19.0),
        ("seed-ds-003", "7a3f9c11-6a55-4a2e-9f0d-2b9c7e5d4f31", "Sales", "riyadh-portal", "G3", "Compensation", 15.0),
        ("seed-ds-004", "d5a0a1a2-2a3c-44c2-8f73-60b7897a9dd2", "Engineering", "riyadh-portal", "G4", "Manager Relationship", 17.0),
        ("seed-ds-005", "91b2e4d7-3c88-4f6a-b5e1-8a0d6c2f7e45", "Sales", "riyadh-portal", "G3", "Manager Relationship", 12.0),
        ("seed-ds-006", "5e6f7a8b-9c0d-4e1f-a2b3-c4d5e6f7a8b9", "Customer Support", "jeddah-retail", "G2", "Workload", 14.0),
        ("seed-ds-007", "2f3a4b5c-6d7e-4f8a-9b0c-1d2e3f4a5b6c", "Customer Support", "jeddah-retail", "G1", "Career Growth", 9.0),
    ];

    for (source_key, employee_id, dept_en, project_id, grade, driver, contribution) in signals {
        sqlx::query(
            r#"
            INSERT INTO retention_engine.driver_signals
            (id, tenant_id, employee_id, department_en, project_id, grade, driver, contribution, recorded_at, source_key)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
            ON CONFLICT (source_key) DO NOTHING
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(tenant_id)
        .bind(Uuid::parse_str(employee_id)?)
        .bind(dept_en)
        .bind(project_id)
        .bind(grade)
        .bind(driver)
        .bind(contribution)
        .bind(scored_at)
        .bind(source_key)
        .execute(pool)
        .await?;
    }

    Ok(())
}

/// Band split and average over the latest score per employee in scope.
pub async fn fetch_overview(
    pool: &PgPool,
    tenant_id: Uuid,
    scope: &RiskScope,
) -> Result<Option<RiskOverview>, sqlx::Error> {
    let mut query = format!(
        "SELECT COUNT(*) AS total, \
         AVG(latest.risk_score) AS avg_risk, \
         COUNT(*) FILTER (WHERE latest.risk_score >= {high}) AS high_count, \
         COUNT(*) FILTER (WHERE latest.risk_score >= {medium} AND latest.risk_score < {high}) AS medium_count, \
         COUNT(*) FILTER (WHERE latest.risk_score < {medium}) AS low_count \
         FROM (SELECT DISTINCT ON (employee_id) risk_score \
               FROM retention_engine.risk_scores \
               WHERE tenant_id = $1",
        high = risk::HIGH_RISK_THRESHOLD,
        medium = risk::MEDIUM_RISK_THRESHOLD,
    );

    if let Some((column, _)) = scope.filter_column() {
        query.push_str(&format!(" AND {column} = $2"));
    }
    query.push_str(" ORDER BY employee_id, scored_at DESC) latest");

    let mut stmt = sqlx::query(&query).bind(tenant_id);
    if let Some((_, value)) = scope.filter_column() {
        stmt = stmt.bind(value);
    }

    let row = stmt.fetch_one(pool).await?;
    Ok(risk::overview_from_counts(
        row.get("total"),
        row.get("high_count"),
        row.get("medium_count"),
        row.get("low_count"),
        row.get("avg_risk"),
    ))
}

/// Per-driver affected counts and contribution mass, ranked by share.
pub async fn fetch_drivers(
    pool: &PgPool,
    tenant_id: Uuid,
    scope: &RiskScope,
) -> Result<Vec<RiskDriver>, sqlx::Error> {
    let mut query = String::from(
        "SELECT driver, \
         COUNT(DISTINCT employee_id) AS affected_count, \
         SUM(contribution) AS total_contribution \
         FROM retention_engine.driver_signals \
         WHERE tenant_id = $1",
    );

    if let Some((column, _)) = scope.filter_column() {
        query.push_str(&format!(" AND {column} = $2"));
    }
    query.push_str(" GROUP BY driver");

    let mut stmt = sqlx::query(&query).bind(tenant_id);
    if let Some((_, value)) = scope.filter_column() {
        stmt = stmt.bind(value);
    }

    let rows = stmt.fetch_all(pool).await?;
    let rollups = rows
        .into_iter()
        .map(|row| risk::DriverRollup {
            driver: row.get("driver"),
            affected_count: row.get("affected_count"),
            total_contribution: row.get::<Option<f64>, _>("total_contribution").unwrap_or(0.0),
        })
        .collect();

    Ok(risk::rank_drivers(rollups))
}

/// Department rollups over the latest score per employee, always tenant-wide.
pub async fn fetch_hotspots(
    pool: &PgPool,
    tenant_id: Uuid,
) -> Result<Vec<DepartmentHotspot>, sqlx::Error> {
    let query = format!(
        "SELECT latest.department_en, latest.department_ar, \
         COUNT(*) AS employee_count, \
         AVG(latest.risk_score) AS avg_risk, \
         COUNT(*) FILTER (WHERE latest.risk_score >= {high}) AS high_count \
         FROM (SELECT DISTINCT ON (employee_id) department_en, department_ar, risk_score \
               FROM retention_engine.risk_scores \
               WHERE tenant_id = $1 \
               ORDER BY employee_id, scored_at DESC) latest \
         GROUP BY latest.department_en, latest.department_ar \
         ORDER BY avg_risk DESC",
        high = risk::HIGH_RISK_THRESHOLD,
    );

    let rows = sqlx::query(&query).bind(tenant_id).fetch_all(pool).await?;
    let rollups = rows
        .into_iter()
        .map(|row| risk::HotspotRollup {
            department_en: row.get("department_en"),
            department_ar: row.get("department_ar"),
            employee_count: row.get("employee_count"),
            avg_risk: row.get::<Option<f64>, _>("avg_risk").unwrap_or(0.0),
            high_count: row.get("high_count"),
        })
        .collect();

    Ok(risk::shape_hotspots(rollups))
}

/// Inserts one task row. Returns false when the dedupe key already exists,
/// i.e. the same plan was generated for this tenant/scope today.
pub async fn insert_task(pool: &PgPool, task: &NewTask) -> Result<bool, sqlx::Error> {
    let result = sqlx::query(
        r#"
        INSERT INTO retention_engine.tasks
        (id, tenant_id, module, title, description, priority, owner_role, metadata, dedupe_key)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
        ON CONFLICT (dedupe_key) DO NOTHING
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(task.tenant_id)
    .bind(task.module)
    .bind(&task.title)
    .bind(&task.description)
    .bind(task.priority.as_str())
    .bind(task.owner_role)
    .bind(&task.metadata)
    .bind(&task.dedupe_key)
    .execute(pool)
    .await?;

    Ok(result.rows_affected() > 0)
}

pub async fn import_csv(pool: &PgPool, csv_path: &std::path::Path) -> anyhow::Result<usize> {
    #[derive(serde::Deserialize)]
    struct CsvRow {
        tenant_id: Uuid,
        employee_id: Uuid,
        department_en: String,
        department_ar: String,
        project_id: String,
        grade: String,
        risk_score: f64,
        scored_at: NaiveDate,
        source_key: Option<String>,
    }

    let mut reader = csv::Reader::from_path(csv_path)?;
    let mut inserted = 0usize;

    for result in reader.deserialize::<CsvRow>() {
        let row = result?;
        let source_key = row
            .source_key
            .unwrap_or_else(|| format!("import-{}", Uuid::new_v4()));

        let result = sqlx::query(
            r#"
            INSERT INTO retention_engine.risk_scores
            (id, tenant_id, employee_id, department_en, department_ar, project_id, grade, risk_score, scored_at, source_key)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
            ON CONFLICT (source_key) DO NOTHING
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(row.tenant_id)
        .bind(row.employee_id)
        .bind(&row.department_en)
        .bind(&row.department_ar)
        .bind(&row.project_id)
        .bind(&row.grade)
        .bind(row.risk_score)
        .bind(row.scored_at)
        .bind(source_key)
        .execute(pool)
        .await?;

        if result.rows_affected() > 0 {
            inserted += 1;
        }
    }

    Ok(inserted)
}
