use axum::extract::State;
use axum::http::{header, HeaderName, Method, StatusCode};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::Deserialize;
use serde_json::{json, Value};
use sqlx::PgPool;
use tower_http::cors::{Any, CorsLayer};
use uuid::Uuid;

use crate::error::PipelineError;
use crate::models::RiskScope;
use crate::pipeline::{self, GenerateParams};

/// Wire body of `POST /generate`, field names as the web client sends them.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateRequest {
    #[serde(default)]
    pub tenant_id: Option<String>,
    #[serde(default)]
    pub scope: Option<String>,
    #[serde(default)]
    pub scope_id: Option<String>,
}

pub async fn serve(pool: PgPool, bind: &str) -> anyhow::Result<()> {
    let addr: std::net::SocketAddr = bind.parse()?;
    let router = build_router(pool);

    tracing::info!("retention engine listening on http://{}", addr);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, router).await?;
    Ok(())
}

pub fn build_router(pool: PgPool) -> Router {
    // Preflight contract of the web client: wildcard origin plus the
    // Supabase client headers.
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST])
        .allow_headers([
            header::AUTHORIZATION,
            header::CONTENT_TYPE,
            HeaderName::from_static("x-client-info"),
            HeaderName::from_static("apikey"),
        ]);

    Router::new()
        .route("/health", get(health))
        .route("/generate", post(generate))
        .layer(cors)
        .with_state(pool)
}

async fn health() -> Json<Value> {
    Json(json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}

async fn generate(
    State(pool): State<PgPool>,
    Json(body): Json<GenerateRequest>,
) -> Result<Json<Value>, (StatusCode, Json<Value>)> {
    let params = parse_request(&body).map_err(error_response)?;

    match pipeline::run_pipeline(&pool, &params).await {
        Ok(outcome) => Ok(Json(json!({
            "success": true,
            "actionsGenerated": outcome.actions_generated,
            "message": outcome.summary_message(),
        }))),
        Err(err) => {
            tracing::error!(tenant_id = %params.tenant_id, error = %err, "generation failed");
            Err(error_response(err))
        }
    }
}

fn parse_request(body: &GenerateRequest) -> Result<GenerateParams, PipelineError> {
    let raw = body.tenant_id.as_deref().map(str::trim).unwrap_or_default();
    if raw.is_empty() {
        return Err(PipelineError::MissingTenant);
    }
    let tenant_id =
        Uuid::parse_str(raw).map_err(|_| PipelineError::InvalidTenant(raw.to_string()))?;
    let scope = RiskScope::from_request(body.scope.as_deref(), body.scope_id.as_deref())?;
    Ok(GenerateParams { tenant_id, scope })
}

fn error_response(err: PipelineError) -> (StatusCode, Json<Value>) {
    (
        err.status(),
        Json(json!({ "error": err.to_string(), "code": err.kind() })),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(tenant: Option<&str>, scope: Option<&str>, scope_id: Option<&str>) -> GenerateRequest {
        GenerateRequest {
            tenant_id: tenant.map(String::from),
            scope: scope.map(String::from),
            scope_id: scope_id.map(String::from),
        }
    }

    #[test]
    fn missing_tenant_is_rejected_before_any_work() {
        let err = parse_request(&request(None, None, None)).unwrap_err();
        assert_eq!(err.kind(), "invalid_request");
        assert_eq!(err.status(), StatusCode::BAD_REQUEST);

        let err = parse_request(&request(Some("   "), None, None)).unwrap_err();
        assert_eq!(err.kind(), "invalid_request");
    }

    #[test]
    fn malformed_tenant_uuid_is_rejected() {
        let err = parse_request(&request(Some("not-a-uuid"), None, None)).unwrap_err();
        assert_eq!(err.status(), StatusCode::BAD_REQUEST);
        assert!(err.to_string().contains("not-a-uuid"));
    }

    #[test]
    fn scope_defaults_to_overall() {
        let params = parse_request(&request(
            Some("a3b8c6d2-5f41-4e0b-9c77-1d2e8f3a6b90"),
            None,
            None,
        ))
        .unwrap();
        assert_eq!(params.scope, RiskScope::Overall);
    }

    #[test]
    fn dept_scope_carries_its_id() {
        let params = parse_request(&request(
            Some("a3b8c6d2-5f41-4e0b-9c77-1d2e8f3a6b90"),
            Some("dept"),
            Some("Engineering"),
        ))
        .unwrap();
        assert_eq!(params.scope, RiskScope::Dept("Engineering".to_string()));
    }

    #[test]
    fn wire_body_deserializes_camel_case() {
        let body: GenerateRequest = serde_json::from_str(
            r#"{"tenantId":"a3b8c6d2-5f41-4e0b-9c77-1d2e8f3a6b90","scope":"grade","scopeId":"G5"}"#,
        )
        .unwrap();
        let params = parse_request(&body).unwrap();
        assert_eq!(params.scope, RiskScope::Grade("G5".to_string()));
    }

    #[test]
    fn error_body_carries_message_and_code() {
        let (status, Json(body)) = error_response(PipelineError::MissingTenant);
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["code"], "invalid_request");
        assert_eq!(body["error"], "tenantId is required");
    }
}
