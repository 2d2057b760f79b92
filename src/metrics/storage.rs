/// SQLite persistence for deployment records
///
/// Reads are always joined through customer_projects, so a customer only
/// ever sees deployments of projects it owns.

use crate::metrics::types::{DateRange, Deployment, DATE_FORMAT};
use anyhow::Result;
use chrono::NaiveDate;
use sqlx::{
    sqlite::{SqlitePool, SqliteRow},
    Row,
};

#[derive(Debug, Clone)]
pub struct DeploymentStorage {
    pool: SqlitePool,
}

impl DeploymentStorage {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Record a deployment of a project
    pub async fn create_deployment(
        &self,
        project_id: i64,
        deployed_on: NaiveDate,
        lead_time_hours: f64,
        failed: bool,
        restore_hours: Option<f64>,
    ) -> Result<Deployment> {
        let result = sqlx::query(
            r#"
            INSERT INTO deployments (project_id, deployed_on, lead_time_hours, failed, restore_hours)
            VALUES (?, ?, ?, ?, ?)
            "#,
        )
        .bind(project_id)
        .bind(deployed_on.format(DATE_FORMAT).to_string())
        .bind(lead_time_hours)
        .bind(failed)
        .bind(restore_hours)
        .execute(&self.pool)
        .await?;

        Ok(Deployment {
            id: result.last_insert_rowid(),
            project_id,
            deployed_on,
            lead_time_hours,
            failed,
            restore_hours,
        })
    }

    /// Deployments of a customer's projects inside a date range
    ///
    /// Optionally narrowed to one project. Ordered by day, then insertion.
    pub async fn list_for_customer(
        &self,
        customer_id: &str,
        range: DateRange,
        project_id: Option<i64>,
    ) -> Result<Vec<Deployment>> {
        let rows = sqlx::query(
            r#"
            SELECT d.id, d.project_id, d.deployed_on, d.lead_time_hours, d.failed, d.restore_hours
            FROM deployments d
            JOIN customer_projects cp ON cp.project_id = d.project_id
            WHERE cp.customer_id = ?
              AND d.deployed_on >= ?
              AND d.deployed_on <= ?
              AND (? IS NULL OR d.project_id = ?)
            ORDER BY d.deployed_on, d.id
            "#,
        )
        .bind(customer_id)
        .bind(range.start.format(DATE_FORMAT).to_string())
        .bind(range.end.format(DATE_FORMAT).to_string())
        .bind(project_id)
        .bind(project_id)
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(deployment_from_row).collect()
    }
}

fn deployment_from_row(row: &SqliteRow) -> Result<Deployment> {
    let deployed_on: String = row.get("deployed_on");
    let failed: i64 = row.get("failed");
    Ok(Deployment {
        id: row.get("id"),
        project_id: row.get("project_id"),
        deployed_on: NaiveDate::parse_from_str(&deployed_on, DATE_FORMAT)
            .map_err(|e| anyhow::anyhow!("Corrupt deployment date '{}': {}", deployed_on, e))?,
        lead_time_hours: row.get("lead_time_hours"),
        failed: failed != 0,
        restore_hours: row.get("restore_hours"),
    })
}
