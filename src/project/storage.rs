/// SQLite persistence layer for the project catalog

use crate::project::types::Project;
use anyhow::Result;
use sqlx::{
    sqlite::{SqlitePool, SqliteRow},
    Row,
};

/// SQLite-based project storage
#[derive(Debug, Clone)]
pub struct ProjectStorage {
    pool: SqlitePool,
}

impl ProjectStorage {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Insert a project; the database assigns the id when none is given
    pub async fn create_project(
        &self,
        id: Option<i64>,
        name: &str,
        description: &str,
    ) -> Result<Project> {
        let result = sqlx::query("INSERT INTO projects (id, name, description) VALUES (?, ?, ?)")
            .bind(id)
            .bind(name)
            .bind(description)
            .execute(&self.pool)
            .await?;

        let id = id.unwrap_or_else(|| result.last_insert_rowid());
        self.get_project(id)
            .await?
            .ok_or_else(|| anyhow::anyhow!("Project {} vanished after insert", id))
    }

    /// Retrieve a project by ID
    pub async fn get_project(&self, id: i64) -> Result<Option<Project>> {
        let row = sqlx::query("SELECT id, name, description, created_at FROM projects WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(row.as_ref().map(project_from_row))
    }

    /// Projects owned by one customer, ascending by id
    pub async fn list_customer_projects(&self, customer_id: &str) -> Result<Vec<Project>> {
        let rows = sqlx::query(
            r#"
            SELECT p.id, p.name, p.description, p.created_at
            FROM projects p
            JOIN customer_projects cp ON cp.project_id = p.id
            WHERE cp.customer_id = ?
            ORDER BY p.id
            "#,
        )
        .bind(customer_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.iter().map(project_from_row).collect())
    }

    /// Delete a project; ownership and deployments cascade
    pub async fn delete_project(&self, id: i64) -> Result<bool> {
        let result = sqlx::query("DELETE FROM projects WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }
}

fn project_from_row(row: &SqliteRow) -> Project {
    Project {
        id: row.get("id"),
        name: row.get("name"),
        description: row.get("description"),
        created_at: row.get("created_at"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::PlatformDatabase;

    #[tokio::test]
    async fn create_with_and_without_id() {
        let db = PlatformDatabase::in_memory().await.unwrap();
        let storage = ProjectStorage::new(db.pool());

        let explicit = storage.create_project(Some(10), "api", "").await.unwrap();
        assert_eq!(explicit.id, 10);
        let assigned = storage.create_project(None, "web", "frontend").await.unwrap();
        assert_eq!(assigned.id, 11);
        assert_eq!(assigned.description, "frontend");

        assert!(storage.create_project(Some(10), "dup", "").await.is_err());

        assert_eq!(storage.get_project(10).await.unwrap().unwrap().name, "api");
    }

    #[tokio::test]
    async fn customer_listing_only_returns_owned_projects() {
        let db = PlatformDatabase::in_memory().await.unwrap();
        let pool = db.pool();
        let storage = ProjectStorage::new(pool.clone());
        for id in 1..=3 {
            storage.create_project(Some(id), &format!("p{}", id), "").await.unwrap();
        }
        sqlx::query("INSERT INTO customers (id, name) VALUES ('cust-001', 'Acme')")
            .execute(&pool)
            .await
            .unwrap();
        sqlx::query("INSERT INTO customer_projects (project_id, customer_id) VALUES (3, 'cust-001'), (1, 'cust-001')")
            .execute(&pool)
            .await
            .unwrap();

        let owned = storage.list_customer_projects("cust-001").await.unwrap();
        assert_eq!(owned.iter().map(|p| p.id).collect::<Vec<_>>(), vec![1, 3]);
        assert!(storage.list_customer_projects("cust-002").await.unwrap().is_empty());

        assert!(storage.delete_project(1).await.unwrap());
        assert!(!storage.delete_project(1).await.unwrap());
        assert_eq!(storage.list_customer_projects("cust-001").await.unwrap().len(), 1);
    }
}
