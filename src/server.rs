/// Server setup and initialization
///
/// Wires together the platform database, customer registry, API routes and
/// request tracing. Provides the application factory used by main and tests.

use crate::{
    api::{create_api_routes, AppState},
    config::{ApiConfig, Config},
    customer::{types::CreateCustomerRequest, CustomerError, CustomerRegistry, CustomerStorage},
    database::PlatformDatabase,
};
use anyhow::Result;
use axum::{routing::get, Router};
use std::sync::Arc;
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;
use tracing_subscriber::EnvFilter;

/// Create the main Axum application with all routes and middleware
pub async fn create_app(config: Config) -> Result<Router> {
    tracing::info!("🗄️ Initializing platform database");
    let database = PlatformDatabase::connect(&config.database)
        .await
        .map_err(|e| anyhow::anyhow!("Failed to open platform database: {}", e))?;

    let state = create_state(&database).await?;

    if config.seed_demo {
        tracing::info!("🌱 Seeding demo customers and projects");
        seed_demo_data(&state).await?;
    }

    tracing::info!("✅ Application initialized successfully");
    Ok(build_router(state, &config.api))
}

/// Build the shared state and load the customer registry
pub async fn create_state(database: &PlatformDatabase) -> Result<AppState> {
    tracing::info!("📊 Initializing customer registry");
    let registry = Arc::new(CustomerRegistry::new(CustomerStorage::new(database.pool())));
    registry
        .init_from_storage()
        .await
        .map_err(|e| anyhow::anyhow!("Failed to load customers from storage: {}", e))?;

    Ok(AppState::new(database, registry))
}

/// Assemble the HTTP router: health check plus the API under its base path
pub fn build_router(state: AppState, api: &ApiConfig) -> Router {
    let api_routes = create_api_routes(state);
    let router = Router::new().route("/healthz", get(health_check));

    let router = match api.normalized_base_path() {
        Some(base_path) => {
            tracing::info!("📡 Mounting API under {}", base_path);
            router.nest(&base_path, api_routes)
        }
        None => router.merge(api_routes),
    };

    router.layer(TraceLayer::new_for_http())
}

/// Demo tenants: two customers splitting five projects
pub async fn seed_demo_data(state: &AppState) -> Result<()> {
    let projects = [
        (1, "payments-api"),
        (2, "web-portal"),
        (3, "mobile-app"),
        (4, "inventory-service"),
        (5, "analytics-pipeline"),
    ];
    for (id, name) in projects {
        if state.projects.get_project(id).await?.is_none() {
            state.projects.create_project(Some(id), name, "").await?;
        }
    }

    let customers = [
        ("cust-001", "Acme Corporation", vec![1, 2, 3]),
        ("cust-002", "Globex Industries", vec![4, 5]),
    ];
    for (id, name, projects) in customers {
        match state.customers.get(id).await {
            Ok(_) => tracing::debug!("Demo customer {} already present", id),
            Err(CustomerError::NotFound(_)) => {
                state
                    .customers
                    .create(CreateCustomerRequest {
                        id: Some(id.to_string()),
                        name: name.to_string(),
                        projects: Some(projects),
                        ..Default::default()
                    })
                    .await
                    .map_err(|e| anyhow::anyhow!("Failed to seed customer {}: {}", id, e))?;
            }
            Err(e) => return Err(anyhow::anyhow!("Failed to look up demo customer {}: {}", id, e)),
        }
    }

    Ok(())
}

/// Start the HTTP server with the given configuration
pub async fn start_server(config: Config) -> Result<()> {
    // RUST_LOG wins over the configured filter
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.log_filter));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_ids(true)
        .with_level(true)
        .init();

    tracing::info!("Starting customerlake server...");

    let app = create_app(config.clone()).await?;

    let bind_addr = format!("{}:{}", config.server.host, config.server.port);
    let listener = TcpListener::bind(&bind_addr).await?;

    tracing::info!("Server listening on http://{}", bind_addr);

    axum::serve(listener, app.into_make_service()).await?;

    Ok(())
}

/// Health check endpoint handler
async fn health_check() -> &'static str {
    "ok"
}
