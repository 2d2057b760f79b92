/// Customer context resolution
///
/// Every scoped request names its customer through the `X-Customer-ID`
/// header or the `customer` query parameter. The middleware resolves that id
/// against the registry and stores a [`CustomerContext`] in the request
/// extensions; handlers take it through the [`CurrentCustomer`] extractor.

use crate::customer::{Customer, CustomerRegistry};
use crate::error::ApiError;
use axum::{
    extract::{FromRequestParts, Query, Request, State},
    http::{request::Parts, HeaderMap},
    middleware::Next,
    response::Response,
};
use serde::Deserialize;
use std::sync::Arc;

/// Header carrying the selected customer id
pub const CUSTOMER_HEADER: &str = "x-customer-id";

/// Query parameter carrying the selected customer id
pub const CUSTOMER_QUERY_PARAM: &str = "customer";

/// Customer resolved for the current request
#[derive(Debug, Clone)]
pub struct CustomerContext {
    pub customer: Customer,
}

#[derive(Debug, Deserialize)]
struct CustomerQuery {
    customer: Option<String>,
}

/// Resolve the customer named by the request, if any
///
/// Requests without a customer pass through untouched; the handlers that
/// need one reject them.
pub async fn resolve_customer(
    State(registry): State<Arc<CustomerRegistry>>,
    mut request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let from_header = header_customer_id(request.headers())?;
    let Query(query) = Query::<CustomerQuery>::try_from_uri(request.uri())?;
    let from_query = query.customer;

    let customer_id = match (from_header, from_query) {
        (Some(header), Some(query)) if header != query.trim() => {
            return Err(ApiError::BadRequest(format!(
                "Customer header '{}' does not match customer parameter '{}'",
                header, query
            )));
        }
        (Some(header), _) => Some(header),
        (None, Some(query)) => Some(query.trim().to_string()),
        (None, None) => None,
    };

    if let Some(customer_id) = customer_id {
        if customer_id.is_empty() {
            return Err(ApiError::BadRequest("Customer id must not be empty".to_string()));
        }
        let customer = registry.get(&customer_id).ok_or_else(|| {
            tracing::warn!("❌ Request for unknown customer: {}", customer_id);
            ApiError::NotFound(format!("Customer '{}' not found", customer_id))
        })?;

        tracing::debug!("🏢 Customer context: {} ({})", customer.id, customer.name);
        request.extensions_mut().insert(CustomerContext { customer });
    }

    Ok(next.run(request).await)
}

fn header_customer_id(headers: &HeaderMap) -> Result<Option<String>, ApiError> {
    match headers.get(CUSTOMER_HEADER) {
        None => Ok(None),
        Some(value) => value
            .to_str()
            .map(|id| Some(id.trim().to_string()))
            .map_err(|_| ApiError::BadRequest("Customer header must be valid ASCII".to_string())),
    }
}

/// Extractor for the customer resolved by [`resolve_customer`]
///
/// Rejects with "Please select a customer first" when no customer was named.
#[derive(Debug, Clone)]
pub struct CurrentCustomer(pub Customer);

impl<S> FromRequestParts<S> for CurrentCustomer
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<CustomerContext>()
            .map(|context| CurrentCustomer(context.customer.clone()))
            .ok_or(ApiError::CustomerRequired)
    }
}

impl CurrentCustomer {
    pub fn id(&self) -> &str {
        &self.0.id
    }

    /// Whether the customer owns a project
    pub fn owns_project(&self, project_id: i64) -> bool {
        self.0.projects.binary_search(&project_id).is_ok()
    }
}
