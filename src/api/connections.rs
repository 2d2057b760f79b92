/// Connection REST API endpoints (customer-scoped)

use crate::{
    api::AppState,
    connection::{Connection, CreateConnectionRequest},
    context::CurrentCustomer,
    error::{ApiError, ApiResult},
};
use axum::{
    extract::{rejection::{JsonRejection, PathRejection}, Path, State},
    http::StatusCode,
    response::Json,
    routing::get,
    Router,
};
use serde_json::{json, Value};

pub fn create_connection_routes() -> Router<AppState> {
    Router::new()
        .route("/connections", get(list_connections).post(create_connection))
        .route("/connections/{id}", get(get_connection).delete(delete_connection))
}

/// Create a connection for the current customer
///
/// POST /connections
/// Body: { "name": "GitHub", "plugin": "github", "endpoint": "https://api.github.com", "customerId": "cust-001" }
async fn create_connection(
    State(state): State<AppState>,
    customer: CurrentCustomer,
    payload: Result<Json<CreateConnectionRequest>, JsonRejection>,
) -> ApiResult<(StatusCode, Json<Connection>)> {
    let Json(request) = payload?;

    if let Some(requested) = request.customer_id.as_deref() {
        if requested != customer.id() {
            return Err(ApiError::BadRequest(format!(
                "customerId '{}' does not match the selected customer '{}'",
                requested,
                customer.id()
            )));
        }
    }

    let name = request.name.trim();
    let plugin = request.plugin.trim();
    if name.is_empty() || plugin.is_empty() {
        return Err(ApiError::BadRequest(
            "Connection name and plugin are required".to_string(),
        ));
    }

    let options = match request.options {
        None | Some(Value::Null) => json!({}),
        Some(options @ Value::Object(_)) => options,
        Some(_) => {
            return Err(ApiError::BadRequest(
                "Connection options must be a JSON object".to_string(),
            ))
        }
    };
    let endpoint = request.endpoint.unwrap_or_default();

    let connection = state
        .connections
        .create_connection(customer.id(), name, plugin, endpoint.trim(), &options)
        .await?;

    tracing::info!(
        "🔌 Created {} connection {} for customer {}",
        connection.plugin,
        connection.id,
        customer.id()
    );
    Ok((StatusCode::CREATED, Json(connection)))
}

/// GET /connections
async fn list_connections(
    State(state): State<AppState>,
    customer: CurrentCustomer,
) -> ApiResult<Json<Vec<Connection>>> {
    Ok(Json(state.connections.list_connections(customer.id()).await?))
}

/// GET /connections/{id}
async fn get_connection(
    State(state): State<AppState>,
    customer: CurrentCustomer,
    path: Result<Path<i64>, PathRejection>,
) -> ApiResult<Json<Connection>> {
    let Path(id) = path?;
    state
        .connections
        .get_connection(customer.id(), id)
        .await?
        .map(Json)
        .ok_or_else(|| connection_not_found(id))
}

/// DELETE /connections/{id}
async fn delete_connection(
    State(state): State<AppState>,
    customer: CurrentCustomer,
    path: Result<Path<i64>, PathRejection>,
) -> ApiResult<Json<Value>> {
    let Path(id) = path?;
    if !state.connections.delete_connection(customer.id(), id).await? {
        return Err(connection_not_found(id));
    }

    tracing::info!("🗑️ Deleted connection {} of customer {}", id, customer.id());
    Ok(Json(json!({ "message": "Connection deleted successfully" })))
}

fn connection_not_found(id: i64) -> ApiError {
    ApiError::NotFound(format!("Connection {} not found", id))
}
