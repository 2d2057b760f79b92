/// Data-source connections owned by customers
///
/// A connection describes where the platform collects data from for one
/// customer (plugin name, endpoint and plugin options).

use anyhow::Result;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sqlx::{
    sqlite::{SqlitePool, SqliteRow},
    Row,
};

/// A customer-owned data-source connection
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Connection {
    pub id: i64,
    pub customer_id: String,
    pub name: String,
    /// Collector plugin (e.g., "github", "jira", "gitlab")
    pub plugin: String,
    pub endpoint: String,
    /// Plugin-specific options
    pub options: Value,
    pub created_at: String,
}

/// Request body for connection creation
///
/// `customerId` is optional; when present it must match the request's customer context.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateConnectionRequest {
    pub name: String,
    pub plugin: String,
    pub endpoint: Option<String>,
    pub options: Option<Value>,
    pub customer_id: Option<String>,
}

/// SQLite-based connection storage; every query is scoped by customer
#[derive(Debug, Clone)]
pub struct ConnectionStorage {
    pool: SqlitePool,
}

impl ConnectionStorage {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub async fn create_connection(
        &self,
        customer_id: &str,
        name: &str,
        plugin: &str,
        endpoint: &str,
        options: &Value,
    ) -> Result<Connection> {
        let options_json = serde_json::to_string(options)?;
        let result = sqlx::query(
            "INSERT INTO connections (customer_id, name, plugin, endpoint, options) VALUES (?, ?, ?, ?, ?)",
        )
        .bind(customer_id)
        .bind(name)
        .bind(plugin)
        .bind(endpoint)
        .bind(&options_json)
        .execute(&self.pool)
        .await?;

        let id = result.last_insert_rowid();
        self.get_connection(customer_id, id)
            .await?
            .ok_or_else(|| anyhow::anyhow!("Connection {} vanished after insert", id))
    }

    /// Retrieve a connection, only if the customer owns it
    pub async fn get_connection(&self, customer_id: &str, id: i64) -> Result<Option<Connection>> {
        let row = sqlx::query(
            r#"
            SELECT id, customer_id, name, plugin, endpoint, options, created_at
            FROM connections WHERE id = ? AND customer_id = ?
            "#,
        )
        .bind(id)
        .bind(customer_id)
        .fetch_optional(&self.pool)
        .await?;

        row.as_ref().map(connection_from_row).transpose()
    }

    pub async fn list_connections(&self, customer_id: &str) -> Result<Vec<Connection>> {
        let rows = sqlx::query(
            r#"
            SELECT id, customer_id, name, plugin, endpoint, options, created_at
            FROM connections WHERE customer_id = ? ORDER BY id
            "#,
        )
        .bind(customer_id)
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(connection_from_row).collect()
    }

    pub async fn delete_connection(&self, customer_id: &str, id: i64) -> Result<bool> {
        let result = sqlx::query("DELETE FROM connections WHERE id = ? AND customer_id = ?")
            .bind(id)
            .bind(customer_id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }
}

fn connection_from_row(row: &SqliteRow) -> Result<Connection> {
    let options_json: String = row.get("options");
    Ok(Connection {
        id: row.get("id"),
        customer_id: row.get("customer_id"),
        name: row.get("name"),
        plugin: row.get("plugin"),
        endpoint: row.get("endpoint"),
        options: serde_json::from_str(&options_json)?,
        created_at: row.get("created_at"),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::PlatformDatabase;
    use serde_json::json;

    async fn storage() -> ConnectionStorage {
        let db = PlatformDatabase::in_memory().await.unwrap();
        let pool = db.pool();
        sqlx::query("INSERT INTO customers (id, name) VALUES ('cust-001', 'Acme'), ('cust-002', 'Globex')")
            .execute(&pool)
            .await
            .unwrap();
        ConnectionStorage::new(pool)
    }

    #[tokio::test]
    async fn connections_are_scoped_by_customer() {
        let storage = storage().await;
        let github = storage
            .create_connection("cust-001", "GitHub", "github", "https://api.github.com", &json!({ "rateLimit": 5000 }))
            .await
            .unwrap();
        storage
            .create_connection("cust-002", "Jira", "jira", "", &json!({}))
            .await
            .unwrap();

        assert_eq!(github.options["rateLimit"], 5000);
        assert_eq!(storage.list_connections("cust-001").await.unwrap(), vec![github.clone()]);
        assert!(storage.get_connection("cust-002", github.id).await.unwrap().is_none());
        assert!(!storage.delete_connection("cust-002", github.id).await.unwrap());
        assert!(storage.delete_connection("cust-001", github.id).await.unwrap());
        assert!(storage.list_connections("cust-001").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn unknown_customer_is_rejected_by_foreign_key() {
        let storage = storage().await;
        let result = storage
            .create_connection("ghost", "GitHub", "github", "", &json!({}))
            .await;
        assert!(result.is_err());
    }
}
