/// Customer management REST API endpoints
///
/// Administration routes are not scoped by the customer context: they must
/// keep working when the selected customer is deleted or renamed.

use crate::{
    api::AppState,
    context::CurrentCustomer,
    customer::{
        types::{CreateCustomerRequest, ReplaceProjectsRequest, UpdateCustomerRequest},
        Customer,
    },
    error::ApiResult,
};
use axum::{
    extract::{rejection::{JsonRejection, PathRejection}, Path, State},
    http::StatusCode,
    response::Json,
    routing::{get, post, put},
    Router,
};
use serde_json::{json, Value};

/// Create customer administration routes
pub fn create_customer_routes() -> Router<AppState> {
    Router::new()
        .route("/customers", get(list_customers).post(create_customer))
        .route(
            "/customers/{id}",
            get(get_customer).put(update_customer).delete(delete_customer),
        )
        .route("/customers/{id}/projects", put(replace_projects))
        .route(
            "/customers/{id}/projects/{project_id}",
            post(attach_project).delete(detach_project),
        )
}

/// Routes that read the request's customer context
pub fn create_current_customer_routes() -> Router<AppState> {
    Router::new().route("/customers/current", get(current_customer))
}

/// List all customers (feeds the customer selector)
///
/// GET /customers
async fn list_customers(State(state): State<AppState>) -> ApiResult<Json<Vec<Customer>>> {
    Ok(Json(state.customers.list().await?))
}

/// Create a customer
///
/// POST /customers
/// Body: { "id": "cust-003", "name": "Initech", "projects": [6, 7], "settings": {} }
async fn create_customer(
    State(state): State<AppState>,
    payload: Result<Json<CreateCustomerRequest>, JsonRejection>,
) -> ApiResult<(StatusCode, Json<Customer>)> {
    let Json(request) = payload?;
    let customer = state.customers.create(request).await?;
    Ok((StatusCode::CREATED, Json(customer)))
}

/// GET /customers/{id}
async fn get_customer(
    State(state): State<AppState>,
    path: Result<Path<String>, PathRejection>,
) -> ApiResult<Json<Customer>> {
    let Path(id) = path?;
    Ok(Json(state.customers.get(&id).await?))
}

/// Update name, description or settings
///
/// PUT /customers/{id}
async fn update_customer(
    State(state): State<AppState>,
    path: Result<Path<String>, PathRejection>,
    payload: Result<Json<UpdateCustomerRequest>, JsonRejection>,
) -> ApiResult<Json<Customer>> {
    let Path(id) = path?;
    let Json(request) = payload?;
    Ok(Json(state.customers.update(&id, request).await?))
}

/// Delete a customer and everything it owns
///
/// DELETE /customers/{id}
async fn delete_customer(
    State(state): State<AppState>,
    path: Result<Path<String>, PathRejection>,
) -> ApiResult<Json<Value>> {
    let Path(id) = path?;
    state.customers.delete(&id).await?;
    Ok(Json(json!({ "message": format!("Customer '{}' deleted successfully", id) })))
}

/// Replace the customer's project set
///
/// PUT /customers/{id}/projects
/// Body: { "projects": [1, 2, 3] }
async fn replace_projects(
    State(state): State<AppState>,
    path: Result<Path<String>, PathRejection>,
    payload: Result<Json<ReplaceProjectsRequest>, JsonRejection>,
) -> ApiResult<Json<Customer>> {
    let Path(id) = path?;
    let Json(request) = payload?;
    Ok(Json(state.customers.replace_projects(&id, request.projects).await?))
}

/// POST /customers/{id}/projects/{project_id}
async fn attach_project(
    State(state): State<AppState>,
    path: Result<Path<(String, i64)>, PathRejection>,
) -> ApiResult<Json<Customer>> {
    let Path((id, project_id)) = path?;
    Ok(Json(state.customers.attach_project(&id, project_id).await?))
}

/// DELETE /customers/{id}/projects/{project_id}
async fn detach_project(
    State(state): State<AppState>,
    path: Result<Path<(String, i64)>, PathRejection>,
) -> ApiResult<Json<Customer>> {
    let Path((id, project_id)) = path?;
    Ok(Json(state.customers.detach_project(&id, project_id).await?))
}

/// The customer selected by the request
///
/// GET /customers/current
async fn current_customer(customer: CurrentCustomer) -> Json<Customer> {
    Json(customer.0)
}
