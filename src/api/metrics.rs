/// Deployment ingestion and DORA metric endpoints (customer-scoped)

use crate::{
    api::AppState,
    context::CurrentCustomer,
    error::{ApiError, ApiResult},
    metrics::{
        build_report,
        types::{CreateDeploymentRequest, Deployment},
        MetricsReport, TimeRange,
    },
};
use axum::{
    extract::{
        rejection::{JsonRejection, QueryRejection},
        Query, State,
    },
    http::StatusCode,
    response::Json,
    routing::{get, post},
    Router,
};
use serde::Deserialize;

/// Query parameters accepted by metric reads
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MetricsParams {
    pub time_range: Option<String>,
    pub start_date: Option<String>,
    pub end_date: Option<String>,
    pub project_id: Option<i64>,
}

pub fn create_metrics_routes() -> Router<AppState> {
    Router::new()
        .route("/deployments", post(create_deployment))
        .route("/metrics", get(get_metrics))
}

/// Record a deployment of one of the customer's projects
///
/// POST /deployments
/// Body: { "projectId": 1, "deployedOn": "2024-01-15", "leadTimeHours": 12.5, "failed": true, "restoreHours": 2 }
async fn create_deployment(
    State(state): State<AppState>,
    customer: CurrentCustomer,
    payload: Result<Json<CreateDeploymentRequest>, JsonRejection>,
) -> ApiResult<(StatusCode, Json<Deployment>)> {
    let Json(request) = payload?;

    if !customer.owns_project(request.project_id) {
        return Err(ApiError::NotFound(format!(
            "Project {} not found",
            request.project_id
        )));
    }
    if !request.lead_time_hours.is_finite() || request.lead_time_hours < 0.0 {
        return Err(ApiError::BadRequest(
            "leadTimeHours must be a non-negative number".to_string(),
        ));
    }
    if let Some(restore) = request.restore_hours {
        if !request.failed {
            return Err(ApiError::BadRequest(
                "restoreHours is only allowed for failed deployments".to_string(),
            ));
        }
        if !restore.is_finite() || restore < 0.0 {
            return Err(ApiError::BadRequest(
                "restoreHours must be a non-negative number".to_string(),
            ));
        }
    }

    let deployment = state
        .deployments
        .create_deployment(
            request.project_id,
            request.deployed_on,
            request.lead_time_hours,
            request.failed,
            request.restore_hours,
        )
        .await?;

    tracing::debug!(
        "🚀 Recorded deployment {} of project {} on {}",
        deployment.id,
        deployment.project_id,
        deployment.deployed_on
    );
    Ok((StatusCode::CREATED, Json(deployment)))
}

/// DORA metrics for the current customer
///
/// GET /metrics?timeRange=last30days&projectId=1
/// GET /metrics?startDate=2024-01-01&endDate=2024-01-31
async fn get_metrics(
    State(state): State<AppState>,
    customer: CurrentCustomer,
    params: Result<Query<MetricsParams>, QueryRejection>,
) -> ApiResult<Json<MetricsReport>> {
    let Query(params) = params?;
    let report = customer_report(&state, &customer, &params, TimeRange::default()).await?;
    Ok(Json(report))
}

/// Resolve the requested range and project filter, then aggregate
pub(crate) async fn customer_report(
    state: &AppState,
    customer: &CurrentCustomer,
    params: &MetricsParams,
    fallback: TimeRange,
) -> ApiResult<MetricsReport> {
    let time_range = TimeRange::from_query(
        params.time_range.as_deref(),
        params.start_date.as_deref(),
        params.end_date.as_deref(),
        fallback,
    )?;
    if let Some(project_id) = params.project_id {
        if !customer.owns_project(project_id) {
            return Err(ApiError::NotFound(format!("Project {} not found", project_id)));
        }
    }

    let range = time_range.resolve(chrono::Utc::now().date_naive());
    let deployments = state
        .deployments
        .list_for_customer(customer.id(), range, params.project_id)
        .await?;

    tracing::debug!(
        "📊 Building {} metrics for customer {} from {} deployments",
        time_range.name(),
        customer.id(),
        deployments.len()
    );
    Ok(build_report(customer.id(), range, params.project_id, &deployments))
}
