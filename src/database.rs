/// Platform database for customer-scoped storage
///
/// A single SQLite database holds customers, projects, the customer-project
/// ownership table and every customer-scoped resource:
/// - {data_dir}/customerlake.db
///
/// Foreign keys cascade customer deletion into associations, connections and
/// customer-owned dashboards.

use crate::config::DatabaseConfig;
use anyhow::Result;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use std::path::Path;
use std::str::FromStr;

/// Database file name inside the configured data directory
pub const DATABASE_FILE: &str = "customerlake.db";

/// Connection pool plus schema bootstrap for the platform database
#[derive(Debug, Clone)]
pub struct PlatformDatabase {
    pool: SqlitePool,
}

impl PlatformDatabase {
    /// Open (or create) the platform database described by the config
    pub async fn connect(config: &DatabaseConfig) -> Result<Self> {
        std::fs::create_dir_all(&config.data_dir).map_err(|e| {
            anyhow::anyhow!("Failed to create data directory '{}': {}", config.data_dir, e)
        })?;
        let db_path = Path::new(&config.data_dir).join(DATABASE_FILE);

        tracing::info!("🗄️ Opening platform database: {}", db_path.display());

        let options = SqliteConnectOptions::new()
            .filename(&db_path)
            .create_if_missing(true)
            .foreign_keys(true);
        let pool = SqlitePoolOptions::new()
            .max_connections(config.max_connections.max(1))
            .connect_with(options)
            .await?;

        let database = Self { pool };
        database.init_schema().await?;

        tracing::info!("✅ Platform database ready: {}", db_path.display());
        Ok(database)
    }

    /// Private in-memory database, used by tests and ephemeral runs
    ///
    /// Pinned to a single connection so every query sees the same memory database.
    pub async fn in_memory() -> Result<Self> {
        let options = SqliteConnectOptions::from_str("sqlite::memory:")?.foreign_keys(true);
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .connect_with(options)
            .await?;

        let database = Self { pool };
        database.init_schema().await?;
        Ok(database)
    }

    /// Shared connection pool
    pub fn pool(&self) -> SqlitePool {
        self.pool.clone()
    }

    /// Create every table and index (safe to call repeatedly)
    async fn init_schema(&self) -> Result<()> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS customers (
                id TEXT PRIMARY KEY,
                name TEXT NOT NULL UNIQUE COLLATE NOCASE,
                description TEXT NOT NULL DEFAULT '',
                settings JSON NOT NULL DEFAULT '{}',
                created_at TIMESTAMP DEFAULT CURRENT_TIMESTAMP,
                updated_at TIMESTAMP DEFAULT CURRENT_TIMESTAMP
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS projects (
                id INTEGER PRIMARY KEY,
                name TEXT NOT NULL,
                description TEXT NOT NULL DEFAULT '',
                created_at TIMESTAMP DEFAULT CURRENT_TIMESTAMP
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        // project_id is the key: a project has at most one owning customer
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS customer_projects (
                project_id INTEGER PRIMARY KEY REFERENCES projects(id) ON DELETE CASCADE,
                customer_id TEXT NOT NULL REFERENCES customers(id) ON DELETE CASCADE,
                created_at TIMESTAMP DEFAULT CURRENT_TIMESTAMP
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS connections (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                customer_id TEXT NOT NULL REFERENCES customers(id) ON DELETE CASCADE,
                name TEXT NOT NULL,
                plugin TEXT NOT NULL,
                endpoint TEXT NOT NULL DEFAULT '',
                options JSON NOT NULL DEFAULT '{}',
                created_at TIMESTAMP DEFAULT CURRENT_TIMESTAMP
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS deployments (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                project_id INTEGER NOT NULL REFERENCES projects(id) ON DELETE CASCADE,
                deployed_on TEXT NOT NULL,
                lead_time_hours REAL NOT NULL,
                failed INTEGER NOT NULL DEFAULT 0,
                restore_hours REAL,
                created_at TIMESTAMP DEFAULT CURRENT_TIMESTAMP
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS dashboards (
                id TEXT PRIMARY KEY,
                customer_id TEXT REFERENCES customers(id) ON DELETE CASCADE,
                title TEXT NOT NULL,
                panels JSON NOT NULL,
                default_time_range TEXT NOT NULL DEFAULT 'last30days',
                created_at TIMESTAMP DEFAULT CURRENT_TIMESTAMP
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        // Shared DORA dashboard visible to every customer
        sqlx::query(
            r#"
            INSERT OR IGNORE INTO dashboards (id, customer_id, title, panels, default_time_range)
            VALUES ('dora', NULL, 'DORA Metrics',
                    '["deploymentFrequency","leadTime","changeFailureRate","timeToRestore"]',
                    'last30days')
            "#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query("CREATE INDEX IF NOT EXISTS idx_customer_projects_customer ON customer_projects(customer_id)")
            .execute(&self.pool)
            .await?;

        sqlx::query("CREATE INDEX IF NOT EXISTS idx_connections_customer ON connections(customer_id)")
            .execute(&self.pool)
            .await?;

        sqlx::query("CREATE INDEX IF NOT EXISTS idx_deployments_project_day ON deployments(project_id, deployed_on)")
            .execute(&self.pool)
            .await?;

        sqlx::query("CREATE INDEX IF NOT EXISTS idx_dashboards_customer ON dashboards(customer_id)")
            .execute(&self.pool)
            .await?;

        Ok(())
    }
}
