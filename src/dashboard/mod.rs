/// Dashboard definitions
///
/// A dashboard is a titled set of metric panels with a default time range.
/// Shared dashboards (no owning customer) are visible to everyone; the rest
/// are visible to their owner only.

use crate::metrics::types::MetricKind;
use anyhow::Result;
use serde::{Deserialize, Serialize};
use sqlx::{
    sqlite::{SqlitePool, SqliteRow},
    Row,
};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Dashboard {
    pub id: String,
    /// Owning customer; None for shared dashboards
    pub customer_id: Option<String>,
    pub title: String,
    pub panels: Vec<MetricKind>,
    /// Preset name used when a data request names no range (e.g., "last30days")
    pub default_time_range: String,
    pub created_at: String,
}

/// Request body for dashboard creation
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateDashboardRequest {
    pub id: Option<String>,
    pub title: String,
    pub panels: Vec<MetricKind>,
    pub default_time_range: Option<String>,
}

/// Generate a fresh dashboard id
pub fn generate_dashboard_id() -> String {
    let simple = uuid::Uuid::new_v4().simple().to_string();
    format!("dash-{}", &simple[..8])
}

#[derive(Debug, Clone)]
pub struct DashboardStorage {
    pool: SqlitePool,
}

impl DashboardStorage {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub async fn create_dashboard(&self, dashboard: &Dashboard) -> Result<()> {
        let panels_json = serde_json::to_string(&dashboard.panels)?;
        sqlx::query(
            r#"
            INSERT INTO dashboards (id, customer_id, title, panels, default_time_range)
            VALUES (?, ?, ?, ?, ?)
            "#,
        )
        .bind(&dashboard.id)
        .bind(&dashboard.customer_id)
        .bind(&dashboard.title)
        .bind(&panels_json)
        .bind(&dashboard.default_time_range)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Whether any dashboard (of any customer) uses this id
    pub async fn exists(&self, id: &str) -> Result<bool> {
        let row = sqlx::query("SELECT 1 AS present FROM dashboards WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(row.is_some())
    }

    /// Dashboard by id if shared or owned by the customer
    pub async fn get_visible(&self, customer_id: &str, id: &str) -> Result<Option<Dashboard>> {
        let row = sqlx::query(
            r#"
            SELECT id, customer_id, title, panels, default_time_range, created_at
            FROM dashboards
            WHERE id = ? AND (customer_id IS NULL OR customer_id = ?)
            "#,
        )
        .bind(id)
        .bind(customer_id)
        .fetch_optional(&self.pool)
        .await?;

        row.as_ref().map(dashboard_from_row).transpose()
    }

    /// Shared dashboards first, then the customer's own, each by title
    pub async fn list_visible(&self, customer_id: &str) -> Result<Vec<Dashboard>> {
        let rows = sqlx::query(
            r#"
            SELECT id, customer_id, title, panels, default_time_range, created_at
            FROM dashboards
            WHERE customer_id IS NULL OR customer_id = ?
            ORDER BY customer_id IS NOT NULL, title, id
            "#,
        )
        .bind(customer_id)
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(dashboard_from_row).collect()
    }

    /// Delete a dashboard owned by the customer; shared dashboards are never deleted here
    pub async fn delete_owned(&self, customer_id: &str, id: &str) -> Result<bool> {
        let result = sqlx::query("DELETE FROM dashboards WHERE id = ? AND customer_id = ?")
            .bind(id)
            .bind(customer_id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }
}

fn dashboard_from_row(row: &SqliteRow) -> Result<Dashboard> {
    let panels_json: String = row.get("panels");
    Ok(Dashboard {
        id: row.get("id"),
        customer_id: row.get("customer_id"),
        title: row.get("title"),
        panels: serde_json::from_str(&panels_json)?,
        default_time_range: row.get("default_time_range"),
        created_at: row.get("created_at"),
    })
}
