use chrono::{NaiveDate, Utc};
use sha2::{Digest, Sha256};
use sqlx::PgPool;
use uuid::Uuid;

use crate::actions;
use crate::db;
use crate::error::PipelineError;
use crate::models::{NewTask, RiskScope};

/// Module tag on every task row this pipeline creates.
pub const RETENTION_MODULE: &str = "retention";

/// Default assignee role for generated tasks.
pub const DEFAULT_OWNER_ROLE: &str = "hr_manager";

#[derive(Debug, Clone)]
pub struct GenerateParams {
    pub tenant_id: Uuid,
    pub scope: RiskScope,
}

#[derive(Debug, Clone)]
pub struct PipelineOutcome {
    /// Task rows actually inserted.
    pub actions_generated: usize,
    /// Plans the emitter tried to persist.
    pub actions_attempted: usize,
    /// Plans skipped because an identical task already exists for today.
    pub actions_deduped: usize,
    pub top_driver: Option<String>,
}

impl PipelineOutcome {
    pub fn summary_message(&self) -> String {
        format!(
            "Generated {} retention actions ({} attempted, {} duplicates skipped)",
            self.actions_generated, self.actions_attempted, self.actions_deduped
        )
    }
}

/// Runs one generation: aggregate, map, emit. Aggregation failures abort
/// before any task is written; emission is best-effort per item.
pub async fn run_pipeline(
    pool: &PgPool,
    params: &GenerateParams,
) -> Result<PipelineOutcome, PipelineError> {
    tracing::info!(
        tenant_id = %params.tenant_id,
        scope = %params.scope.key(),
        "starting retention action generation"
    );

    sqlx::query("SELECT 1")
        .execute(pool)
        .await
        .map_err(PipelineError::ServiceUnavailable)?;

    let overview = db::fetch_overview(pool, params.tenant_id, &params.scope)
        .await
        .map_err(PipelineError::DataUnavailable)?;
    let drivers = db::fetch_drivers(pool, params.tenant_id, &params.scope)
        .await
        .map_err(PipelineError::DataUnavailable)?;
    let hotspots = db::fetch_hotspots(pool, params.tenant_id)
        .await
        .map_err(PipelineError::DataUnavailable)?;

    let top_driver = drivers.first().map(|d| d.driver.as_str().to_string());
    let plans = actions::build_action_plans(overview.as_ref(), &drivers, &hotspots);

    let today = Utc::now().date_naive();
    let mut created = 0usize;
    let mut deduped = 0usize;

    for plan in &plans {
        let task = NewTask {
            tenant_id: params.tenant_id,
            module: RETENTION_MODULE,
            title: plan.title.clone(),
            description: plan.description.clone(),
            priority: plan.priority,
            owner_role: DEFAULT_OWNER_ROLE,
            metadata: plan.evidence.clone(),
            dedupe_key: dedupe_key(params.tenant_id, &params.scope, &plan.title, today),
        };

        match db::insert_task(pool, &task).await {
            Ok(true) => created += 1,
            Ok(false) => {
                deduped += 1;
                tracing::debug!(title = %plan.title, "task already exists for today, skipped");
            }
            Err(err) => {
                tracing::warn!(title = %plan.title, error = %err, "task creation failed, continuing");
            }
        }
    }

    let outcome = PipelineOutcome {
        actions_generated: created,
        actions_attempted: plans.len(),
        actions_deduped: deduped,
        top_driver,
    };
    tracing::info!(
        tenant_id = %params.tenant_id,
        created = outcome.actions_generated,
        attempted = outcome.actions_attempted,
        deduped = outcome.actions_deduped,
        "retention action generation finished"
    );
    Ok(outcome)
}

/// Content hash giving at-most-once-per-day task creation for a given
/// tenant, scope, and plan title.
pub fn dedupe_key(tenant_id: Uuid, scope: &RiskScope, title: &str, date: NaiveDate) -> String {
    let mut hasher = Sha256::new();
    hasher.update(tenant_id.as_bytes());
    hasher.update(scope.key().as_bytes());
    hasher.update(title.as_bytes());
    hasher.update(date.to_string().as_bytes());
    hex::encode(hasher.finalize())
}
