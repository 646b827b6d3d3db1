use serde::Serialize;
use uuid::Uuid;

use crate::error::PipelineError;

/// Tenant-wide risk summary for one aggregation call. Computed view, never
/// persisted; the three band percentages sum to ~100 modulo rounding.
#[derive(Debug, Clone, Serialize)]
pub struct RiskOverview {
    pub avg_risk: f64,
    pub high_risk_percentage: f64,
    pub medium_risk_percentage: f64,
    pub low_risk_percentage: f64,
    pub total_employees: i64,
}

/// Closed vocabulary of attrition drivers. Unknown database strings land in
/// `Other` so the mapper's match stays exhaustive.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RiskDriverKind {
    Compensation,
    ManagerRelationship,
    Workload,
    CareerGrowth,
    WorkLifeBalance,
    Recognition,
    Other(String),
}

impl RiskDriverKind {
    pub fn parse(name: &str) -> Self {
        match name {
            "Compensation" => RiskDriverKind::Compensation,
            "Manager Relationship" => RiskDriverKind::ManagerRelationship,
            "Workload" => RiskDriverKind::Workload,
            "Career Growth" => RiskDriverKind::CareerGrowth,
            "Work-Life Balance" => RiskDriverKind::WorkLifeBalance,
            "Recognition" => RiskDriverKind::Recognition,
            other => RiskDriverKind::Other(other.to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            RiskDriverKind::Compensation => "Compensation",
            RiskDriverKind::ManagerRelationship => "Manager Relationship",
            RiskDriverKind::Workload => "Workload",
            RiskDriverKind::CareerGrowth => "Career Growth",
            RiskDriverKind::WorkLifeBalance => "Work-Life Balance",
            RiskDriverKind::Recognition => "Recognition",
            RiskDriverKind::Other(name) => name,
        }
    }
}

/// One ranked contributing factor. Lists are ordered by
/// `contribution_percentage` descending; the head is the top driver.
#[derive(Debug, Clone)]
pub struct RiskDriver {
    pub driver: RiskDriverKind,
    pub affected_count: i64,
    pub contribution_percentage: f64,
}

/// Per-department rollup, bilingual names as stored.
#[derive(Debug, Clone)]
pub struct DepartmentHotspot {
    pub department_name_en: String,
    pub department_name_ar: String,
    pub employee_count: i64,
    pub avg_risk: f64,
    pub pct_high: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Priority {
    High,
    Medium,
    Low,
}

impl Priority {
    pub fn as_str(&self) -> &'static str {
        match self {
            Priority::High => "high",
            Priority::Medium => "medium",
            Priority::Low => "low",
        }
    }

    /// Sort key: urgent tiers first.
    pub fn rank(&self) -> u8 {
        match self {
            Priority::High => 0,
            Priority::Medium => 1,
            Priority::Low => 2,
        }
    }
}

/// Candidate recommendation produced by the rule table. Ephemeral; only its
/// materialized form (a task row) is persisted.
#[derive(Debug, Clone)]
pub struct ActionPlan {
    pub title: String,
    pub description: String,
    pub priority: Priority,
    pub evidence: serde_json::Value,
}

/// Task row handed to the task sink. Ownership passes to the surrounding
/// task-management system once inserted.
#[derive(Debug, Clone)]
pub struct NewTask {
    pub tenant_id: Uuid,
    pub module: &'static str,
    pub title: String,
    pub description: String,
    pub priority: Priority,
    pub owner_role: &'static str,
    pub metadata: serde_json::Value,
    pub dedupe_key: String,
}

/// Aggregation scope for a generation request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RiskScope {
    Overall,
    Dept(String),
    Project(String),
    Grade(String),
}

impl RiskScope {
    /// Builds a scope from the wire fields. A missing or `"overall"` scope is
    /// tenant-wide and any `scope_id` sent with it is ignored; a scoped
    /// request without an id is rejected.
    pub fn from_request(
        scope: Option<&str>,
        scope_id: Option<&str>,
    ) -> Result<Self, PipelineError> {
        let name = match scope {
            None | Some("overall") => return Ok(RiskScope::Overall),
            Some(name @ ("dept" | "project" | "grade")) => name,
            Some(other) => return Err(PipelineError::InvalidScope(other.to_string())),
        };
        let id = scope_id
            .map(str::trim)
            .filter(|id| !id.is_empty())
            .ok_or_else(|| PipelineError::MissingScopeId(name.to_string()))?
            .to_string();
        Ok(match name {
            "dept" => RiskScope::Dept(id),
            "project" => RiskScope::Project(id),
            _ => RiskScope::Grade(id),
        })
    }

    /// Column/value pair for the SQL scope filter, `None` for tenant-wide.
    pub fn filter_column(&self) -> Option<(&'static str, &str)> {
        match self {
            RiskScope::Overall => None,
            RiskScope::Dept(id) => Some(("department_en", id)),
            RiskScope::Project(id) => Some(("project_id", id)),
            RiskScope::Grade(id) => Some(("grade", id)),
        }
    }

    /// Stable text form, used in logs and in the task dedupe key.
    pub fn key(&self) -> String {
        match self {
            RiskScope::Overall => "overall".to_string(),
            RiskScope::Dept(id) => format!("dept:{id}"),
            RiskScope::Project(id) => format!("project:{id}"),
            RiskScope::Grade(id) => format!("grade:{id}"),
        }
    }
}
