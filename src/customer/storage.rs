/// SQLite persistence layer for customers and customer-project ownership
///
/// Customers live in the `customers` table; ownership of projects lives in
/// `customer_projects`, keyed by project so a project has at most one owner.

use crate::customer::types::Customer;
use anyhow::Result;
use sqlx::{
    sqlite::{SqlitePool, SqliteRow},
    Row,
};
use std::collections::HashMap;

/// SQLite-based customer storage manager
#[derive(Debug, Clone)]
pub struct CustomerStorage {
    /// Platform database pool
    pool: SqlitePool,
}

impl CustomerStorage {
    /// Create new storage instance with database connection
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Update an existing customer's fields
    ///
    /// Uses UPSERT; the customer's project list is managed separately.
    /// New customers go through [`CustomerStorage::insert_customer`].
    pub async fn save_customer(&self, customer: &Customer) -> Result<()> {
        let settings_json = serde_json::to_string(&customer.settings)?;

        sqlx::query(
            r#"
            INSERT INTO customers (id, name, description, settings, updated_at)
            VALUES (?, ?, ?, ?, CURRENT_TIMESTAMP)
            ON CONFLICT(id) DO UPDATE SET
                name = excluded.name,
                description = excluded.description,
                settings = excluded.settings,
                updated_at = CURRENT_TIMESTAMP
            "#,
        )
        .bind(&customer.id)
        .bind(&customer.name)
        .bind(&customer.description)
        .bind(&settings_json)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Insert a new customer together with its initial projects in one transaction
    ///
    /// Fails with a unique violation when the id, the name or one of the
    /// projects is already taken; nothing is written in that case.
    pub async fn insert_customer(&self, customer: &Customer, project_ids: &[i64]) -> Result<()> {
        let settings_json = serde_json::to_string(&customer.settings)?;
        let mut tx = self.pool.begin().await?;

        sqlx::query(
            r#"
            INSERT INTO customers (id, name, description, settings, updated_at)
            VALUES (?, ?, ?, ?, CURRENT_TIMESTAMP)
            "#,
        )
        .bind(&customer.id)
        .bind(&customer.name)
        .bind(&customer.description)
        .bind(&settings_json)
        .execute(&mut *tx)
        .await?;

        for project_id in project_ids {
            sqlx::query("INSERT INTO customer_projects (project_id, customer_id) VALUES (?, ?)")
                .bind(project_id)
                .bind(&customer.id)
                .execute(&mut *tx)
                .await?;
        }

        tx.commit().await?;
        Ok(())
    }

    /// Retrieve a customer (with owned projects) by ID
    pub async fn get_customer(&self, id: &str) -> Result<Option<Customer>> {
        let row = sqlx::query(
            "SELECT id, name, description, settings, created_at, updated_at FROM customers WHERE id = ?",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        match row {
            Some(row) => {
                let projects = self.project_ids(id).await?;
                Ok(Some(customer_from_row(&row, projects)?))
            }
            None => Ok(None),
        }
    }

    /// Find the id of the customer using a name, ignoring case
    pub async fn find_by_name(&self, name: &str) -> Result<Option<String>> {
        let row = sqlx::query("SELECT id FROM customers WHERE name = ?")
            .bind(name)
            .fetch_optional(&self.pool)
            .await?;

        Ok(row.map(|row| row.get("id")))
    }

    /// List all customers ordered by name
    pub async fn list_customers(&self) -> Result<Vec<Customer>> {
        let rows = sqlx::query(
            "SELECT id, name, description, settings, created_at, updated_at FROM customers ORDER BY name",
        )
        .fetch_all(&self.pool)
        .await?;

        let mut ownership = self.all_project_ids().await?;
        let mut customers = Vec::with_capacity(rows.len());
        for row in rows {
            let id: String = row.get("id");
            let projects = ownership.remove(&id).unwrap_or_default();
            customers.push(customer_from_row(&row, projects)?);
        }

        Ok(customers)
    }

    /// Load all customers for registry initialization
    ///
    /// Returns a map of customer_id -> Customer.
    pub async fn load_all_customers(&self) -> Result<HashMap<String, Customer>> {
        Ok(self
            .list_customers()
            .await?
            .into_iter()
            .map(|customer| (customer.id.clone(), customer))
            .collect())
    }

    /// Delete a customer by ID; ownership rows cascade
    pub async fn delete_customer(&self, id: &str) -> Result<bool> {
        let result = sqlx::query("DELETE FROM customers WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Project ids owned by a customer, ascending
    pub async fn project_ids(&self, customer_id: &str) -> Result<Vec<i64>> {
        let rows = sqlx::query(
            "SELECT project_id FROM customer_projects WHERE customer_id = ? ORDER BY project_id",
        )
        .bind(customer_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.iter().map(|row| row.get("project_id")).collect())
    }

    /// Customer owning a project, if any
    pub async fn project_owner(&self, project_id: i64) -> Result<Option<String>> {
        let row = sqlx::query("SELECT customer_id FROM customer_projects WHERE project_id = ?")
            .bind(project_id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(row.map(|row| row.get("customer_id")))
    }

    /// Whether a project exists in the platform catalog
    pub async fn project_exists(&self, project_id: i64) -> Result<bool> {
        let row = sqlx::query("SELECT 1 AS present FROM projects WHERE id = ?")
            .bind(project_id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(row.is_some())
    }

    /// Record that a customer owns a project
    pub async fn attach_project(&self, customer_id: &str, project_id: i64) -> Result<()> {
        sqlx::query("INSERT INTO customer_projects (project_id, customer_id) VALUES (?, ?)")
            .bind(project_id)
            .bind(customer_id)
            .execute(&self.pool)
            .await?;

        Ok(())
    }

    /// Drop a customer's ownership of a project
    pub async fn detach_project(&self, customer_id: &str, project_id: i64) -> Result<bool> {
        let result =
            sqlx::query("DELETE FROM customer_projects WHERE customer_id = ? AND project_id = ?")
                .bind(customer_id)
                .bind(project_id)
                .execute(&self.pool)
                .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Replace the full set of projects owned by a customer in one transaction
    pub async fn replace_projects(&self, customer_id: &str, project_ids: &[i64]) -> Result<()> {
        let mut tx = self.pool.begin().await?;

        sqlx::query("DELETE FROM customer_projects WHERE customer_id = ?")
            .bind(customer_id)
            .execute(&mut *tx)
            .await?;

        for project_id in project_ids {
            sqlx::query("INSERT INTO customer_projects (project_id, customer_id) VALUES (?, ?)")
                .bind(project_id)
                .bind(customer_id)
                .execute(&mut *tx)
                .await?;
        }

        tx.commit().await?;
        Ok(())
    }

    /// Ownership map customer_id -> project ids, ascending
    async fn all_project_ids(&self) -> Result<HashMap<String, Vec<i64>>> {
        let rows = sqlx::query(
            "SELECT customer_id, project_id FROM customer_projects ORDER BY customer_id, project_id",
        )
        .fetch_all(&self.pool)
        .await?;

        let mut ownership: HashMap<String, Vec<i64>> = HashMap::new();
        for row in rows {
            ownership
                .entry(row.get("customer_id"))
                .or_default()
                .push(row.get("project_id"));
        }

        Ok(ownership)
    }
}

/// Which uniqueness rule a failed write broke
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UniqueViolation {
    CustomerId,
    CustomerName,
    ProjectOwner,
}

/// Classify a storage error raised by a unique or primary key constraint
pub fn unique_violation(err: &anyhow::Error) -> Option<UniqueViolation> {
    let db_err = match err.downcast_ref::<sqlx::Error>() {
        Some(sqlx::Error::Database(db_err)) if db_err.is_unique_violation() => db_err,
        _ => return None,
    };

    let message = db_err.message();
    if message.contains("customer_projects.project_id") {
        Some(UniqueViolation::ProjectOwner)
    } else if message.contains("customers.name") {
        Some(UniqueViolation::CustomerName)
    } else {
        Some(UniqueViolation::CustomerId)
    }
}

fn customer_from_row(row: &SqliteRow, projects: Vec<i64>) -> Result<Customer> {
    let settings_json: String = row.get("settings");
    Ok(Customer {
        id: row.get("id"),
        name: row.get("name"),
        description: row.get("description"),
        projects,
        settings: serde_json::from_str(&settings_json)?,
        created_at: row.get("created_at"),
        updated_at: row.get("updated_at"),
    })
}
