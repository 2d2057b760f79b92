/// Project REST API endpoints
///
/// The catalog is administered without a customer context; reads are scoped
/// so a customer only sees the projects it owns.

use crate::{
    api::AppState,
    context::CurrentCustomer,
    customer::types::MAX_NAME_LEN,
    error::{ApiError, ApiResult},
    project::{types::CreateProjectRequest, Project},
};
use axum::{
    extract::{rejection::{JsonRejection, PathRejection}, Path, State},
    http::StatusCode,
    response::Json,
    routing::{delete, get, post},
    Router,
};
use serde_json::{json, Value};

/// Catalog administration routes
pub fn create_project_admin_routes() -> Router<AppState> {
    Router::new()
        .route("/projects", post(create_project))
        .route("/projects/{id}", delete(delete_project))
}

/// Customer-scoped project routes
pub fn create_scoped_project_routes() -> Router<AppState> {
    Router::new()
        .route("/projects", get(list_projects))
        .route("/projects/{id}", get(get_project))
}

/// Add a project to the catalog
///
/// POST /projects
/// Body: { "id": 6, "name": "billing-service", "description": "..." }
async fn create_project(
    State(state): State<AppState>,
    payload: Result<Json<CreateProjectRequest>, JsonRejection>,
) -> ApiResult<(StatusCode, Json<Project>)> {
    let Json(request) = payload?;

    let name = request.name.trim();
    if name.is_empty() {
        return Err(ApiError::BadRequest("Project name is required".to_string()));
    }
    if name.chars().count() > MAX_NAME_LEN {
        return Err(ApiError::BadRequest(format!(
            "Project name must be at most {} characters",
            MAX_NAME_LEN
        )));
    }
    if let Some(id) = request.id {
        if id <= 0 {
            return Err(ApiError::BadRequest("Project id must be positive".to_string()));
        }
        if state.projects.get_project(id).await?.is_some() {
            return Err(ApiError::Conflict(format!("Project {} already exists", id)));
        }
    }

    let description = request.description.unwrap_or_default();
    let project = state
        .projects
        .create_project(request.id, name, description.trim())
        .await?;

    tracing::info!("📁 Created project: {} ({})", project.id, project.name);
    Ok((StatusCode::CREATED, Json(project)))
}

/// Remove a project (and its deployments) from the catalog
///
/// DELETE /projects/{id}
async fn delete_project(
    State(state): State<AppState>,
    path: Result<Path<i64>, PathRejection>,
) -> ApiResult<Json<Value>> {
    let Path(id) = path?;
    let owner = state.customers.project_owner(id).await?;

    if !state.projects.delete_project(id).await? {
        return Err(ApiError::NotFound(format!("Project {} not found", id)));
    }
    if let Some(owner) = owner {
        state.registry().reload_customer(&owner).await?;
    }

    tracing::info!("🗑️ Deleted project: {}", id);
    Ok(Json(json!({ "message": format!("Project {} deleted successfully", id) })))
}

/// Projects owned by the current customer
///
/// GET /projects
async fn list_projects(
    State(state): State<AppState>,
    customer: CurrentCustomer,
) -> ApiResult<Json<Vec<Project>>> {
    Ok(Json(state.projects.list_customer_projects(customer.id()).await?))
}

/// One project of the current customer
///
/// GET /projects/{id}
async fn get_project(
    State(state): State<AppState>,
    customer: CurrentCustomer,
    path: Result<Path<i64>, PathRejection>,
) -> ApiResult<Json<Project>> {
    let Path(id) = path?;
    if !customer.owns_project(id) {
        return Err(ApiError::NotFound(format!("Project {} not found", id)));
    }

    state
        .projects
        .get_project(id)
        .await?
        .map(Json)
        .ok_or_else(|| ApiError::NotFound(format!("Project {} not found", id)))
}
