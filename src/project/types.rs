/// Project type definitions
///
/// Projects are the platform's unit of collected data. Each project is owned
/// by at most one customer; ownership is what scopes every data view.

use serde::{Deserialize, Serialize};

/// A data platform project
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Project {
    /// Numeric project identifier (e.g., 1)
    pub id: i64,
    /// Human-readable project name (e.g., "payments-api")
    pub name: String,
    pub description: String,
    pub created_at: String,
}

/// Request body for project creation
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateProjectRequest {
    /// Optional explicit id; assigned by the database when omitted
    pub id: Option<i64>,
    pub name: String,
    pub description: Option<String>,
}
