/// Dashboard REST API endpoints (customer-scoped)

use crate::{
    api::{
        metrics::{customer_report, MetricsParams},
        AppState,
    },
    context::CurrentCustomer,
    customer::types::{is_valid_id, MAX_NAME_LEN},
    dashboard::{generate_dashboard_id, CreateDashboardRequest, Dashboard},
    error::{ApiError, ApiResult},
    metrics::{MetricsReport, TimeRange},
};
use axum::{
    extract::{
        rejection::{JsonRejection, PathRejection, QueryRejection},
        Path, Query, State,
    },
    http::StatusCode,
    response::Json,
    routing::get,
    Router,
};
use serde::Serialize;
use serde_json::{json, Value};
use std::collections::HashSet;

/// Dashboard definition plus its panel data
#[derive(Debug, Serialize)]
pub struct DashboardData {
    pub dashboard: Dashboard,
    pub metrics: MetricsReport,
}

pub fn create_dashboard_routes() -> Router<AppState> {
    Router::new()
        .route("/dashboards", get(list_dashboards).post(create_dashboard))
        .route("/dashboards/{id}", get(get_dashboard).delete(delete_dashboard))
        .route("/dashboards/{id}/data", get(get_dashboard_data))
}

/// Shared dashboards and the customer's own
///
/// GET /dashboards
async fn list_dashboards(
    State(state): State<AppState>,
    customer: CurrentCustomer,
) -> ApiResult<Json<Vec<Dashboard>>> {
    Ok(Json(state.dashboards.list_visible(customer.id()).await?))
}

/// Create a dashboard owned by the current customer
///
/// POST /dashboards
/// Body: { "title": "Delivery", "panels": ["deploymentFrequency", "leadTime"], "defaultTimeRange": "last90days" }
async fn create_dashboard(
    State(state): State<AppState>,
    customer: CurrentCustomer,
    payload: Result<Json<CreateDashboardRequest>, JsonRejection>,
) -> ApiResult<(StatusCode, Json<Dashboard>)> {
    let Json(request) = payload?;

    let title = request.title.trim();
    if title.is_empty() || title.chars().count() > MAX_NAME_LEN {
        return Err(ApiError::BadRequest(format!(
            "Dashboard title is required and must be at most {} characters",
            MAX_NAME_LEN
        )));
    }
    if request.panels.is_empty() {
        return Err(ApiError::BadRequest("Dashboards need at least one panel".to_string()));
    }
    let mut seen = HashSet::new();
    if !request.panels.iter().all(|panel| seen.insert(*panel)) {
        return Err(ApiError::BadRequest("Dashboard panels must be unique".to_string()));
    }

    let default_time_range = match request.default_time_range.as_deref() {
        None => TimeRange::default(),
        Some(name) => TimeRange::preset(name).ok_or_else(|| {
            ApiError::BadRequest(format!(
                "defaultTimeRange '{}' must be one of last7days, last30days, last90days, thisYear",
                name
            ))
        })?,
    };

    let id = match request.id {
        Some(id) => {
            let id = id.trim().to_string();
            if !is_valid_id(&id) {
                return Err(ApiError::BadRequest(format!(
                    "Invalid dashboard id '{}': use lowercase letters, digits, '-' or '_'",
                    id
                )));
            }
            id
        }
        None => generate_dashboard_id(),
    };
    if state.dashboards.exists(&id).await? {
        return Err(ApiError::Conflict(format!("Dashboard '{}' already exists", id)));
    }

    let dashboard = Dashboard {
        id: id.clone(),
        customer_id: Some(customer.id().to_string()),
        title: title.to_string(),
        panels: request.panels,
        default_time_range: default_time_range.name().to_string(),
        created_at: String::new(),
    };
    state.dashboards.create_dashboard(&dashboard).await?;

    let created = state
        .dashboards
        .get_visible(customer.id(), &id)
        .await?
        .ok_or_else(|| ApiError::Internal(anyhow::anyhow!("Dashboard {} vanished after insert", id)))?;

    tracing::info!("📈 Created dashboard {} for customer {}", created.id, customer.id());
    Ok((StatusCode::CREATED, Json(created)))
}

/// GET /dashboards/{id}
async fn get_dashboard(
    State(state): State<AppState>,
    customer: CurrentCustomer,
    path: Result<Path<String>, PathRejection>,
) -> ApiResult<Json<Dashboard>> {
    let Path(id) = path?;
    visible_dashboard(&state, &customer, &id).await.map(Json)
}

/// Delete one of the customer's dashboards
///
/// DELETE /dashboards/{id}
async fn delete_dashboard(
    State(state): State<AppState>,
    customer: CurrentCustomer,
    path: Result<Path<String>, PathRejection>,
) -> ApiResult<Json<Value>> {
    let Path(id) = path?;
    let dashboard = visible_dashboard(&state, &customer, &id).await?;
    if dashboard.customer_id.is_none() {
        return Err(ApiError::BadRequest(format!(
            "Dashboard '{}' is shared and cannot be deleted",
            id
        )));
    }

    state.dashboards.delete_owned(customer.id(), &id).await?;
    tracing::info!("🗑️ Deleted dashboard {} of customer {}", id, customer.id());
    Ok(Json(json!({ "message": "Dashboard deleted successfully" })))
}

/// Dashboard data for the current customer
///
/// GET /dashboards/{id}/data?timeRange=last7days&projectId=1
/// Without a range the dashboard's default range applies.
async fn get_dashboard_data(
    State(state): State<AppState>,
    customer: CurrentCustomer,
    path: Result<Path<String>, PathRejection>,
    params: Result<Query<MetricsParams>, QueryRejection>,
) -> ApiResult<Json<DashboardData>> {
    let Path(id) = path?;
    let Query(params) = params?;
    let dashboard = visible_dashboard(&state, &customer, &id).await?;

    let fallback = TimeRange::preset(&dashboard.default_time_range).unwrap_or_default();
    let mut metrics = customer_report(&state, &customer, &params, fallback).await?;
    metrics.retain_panels(&dashboard.panels);

    Ok(Json(DashboardData { dashboard, metrics }))
}

async fn visible_dashboard(
    state: &AppState,
    customer: &CurrentCustomer,
    id: &str,
) -> ApiResult<Dashboard> {
    state
        .dashboards
        .get_visible(customer.id(), id)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("Dashboard '{}' not found", id)))
}
