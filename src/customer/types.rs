/// Customer type definitions for the multi-customer architecture
///
/// A customer is an organization served by the platform. It owns a set of
/// projects, and every scoped request is resolved against one customer.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Maximum accepted length for identifiers (customers, dashboards)
pub const MAX_ID_LEN: usize = 64;

/// Maximum accepted length for display names
pub const MAX_NAME_LEN: usize = 255;

/// A customer organization and the projects it owns
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Customer {
    /// Unique customer identifier (e.g., "cust-001")
    pub id: String,
    /// Human-readable name (e.g., "Acme Corporation"), unique ignoring case
    pub name: String,
    /// Free-form description
    pub description: String,
    /// Ids of the projects this customer owns, ascending
    pub projects: Vec<i64>,
    /// Customer-specific settings shown on the settings page
    pub settings: Value,
    pub created_at: String,
    pub updated_at: String,
}

/// Request body for customer creation
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateCustomerRequest {
    /// Optional explicit id; generated as "cust-xxxxxxxx" when omitted
    pub id: Option<String>,
    pub name: String,
    pub description: Option<String>,
    /// Initial project ownership
    pub projects: Option<Vec<i64>>,
    pub settings: Option<Value>,
}

/// Request body for customer updates (absent fields stay unchanged)
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateCustomerRequest {
    pub name: Option<String>,
    pub description: Option<String>,
    pub settings: Option<Value>,
}

/// Request body replacing a customer's project set
#[derive(Debug, Clone, Deserialize)]
pub struct ReplaceProjectsRequest {
    pub projects: Vec<i64>,
}

/// Check an identifier: lowercase alphanumerics, '-' or '_', starting alphanumeric
pub fn is_valid_id(id: &str) -> bool {
    let mut chars = id.chars();
    let Some(first) = chars.next() else {
        return false;
    };
    id.len() <= MAX_ID_LEN
        && (first.is_ascii_lowercase() || first.is_ascii_digit())
        && chars.all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-' || c == '_')
}

/// Generate a fresh customer id
pub fn generate_customer_id() -> String {
    let simple = uuid::Uuid::new_v4().simple().to_string();
    format!("cust-{}", &simple[..8])
}
