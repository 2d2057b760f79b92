/// HTTP API Layer
///
/// REST controllers for customer management and customer-scoped data:
/// - Customer CRUD and project ownership (unscoped administration)
/// - Projects, connections, deployments, metrics and dashboards, scoped by
///   the customer context middleware

// Customer management endpoints
pub mod customers;

// Project catalog and customer project listing
pub mod projects;

// Customer data-source connections
pub mod connections;

// Deployment ingestion and DORA metrics
pub mod metrics;

// Customer dashboards and dashboard data
pub mod dashboards;

use crate::{
    connection::ConnectionStorage,
    context::resolve_customer,
    customer::{CustomerRegistry, CustomerService, CustomerStorage},
    dashboard::DashboardStorage,
    database::PlatformDatabase,
    metrics::DeploymentStorage,
    project::ProjectStorage,
};
use axum::{middleware, Router};
use std::sync::Arc;

/// Application state containing shared resources
#[derive(Debug, Clone)]
pub struct AppState {
    /// Customer operations (owns the registry)
    pub customers: CustomerService,
    /// Project catalog
    pub projects: ProjectStorage,
    /// Customer connections
    pub connections: ConnectionStorage,
    /// Deployment records feeding the metrics
    pub deployments: DeploymentStorage,
    /// Dashboard definitions
    pub dashboards: DashboardStorage,
}

impl AppState {
    /// Wire every storage to the platform database
    pub fn new(database: &PlatformDatabase, registry: Arc<CustomerRegistry>) -> Self {
        let pool = database.pool();
        Self {
            customers: CustomerService::new(CustomerStorage::new(pool.clone()), registry),
            projects: ProjectStorage::new(pool.clone()),
            connections: ConnectionStorage::new(pool.clone()),
            deployments: DeploymentStorage::new(pool.clone()),
            dashboards: DashboardStorage::new(pool),
        }
    }

    pub fn registry(&self) -> &Arc<CustomerRegistry> {
        self.customers.registry()
    }
}

/// Create every API route with the customer context middleware applied to
/// the scoped ones
pub fn create_api_routes(state: AppState) -> Router {
    let scoped = Router::new()
        .merge(customers::create_current_customer_routes())
        .merge(projects::create_scoped_project_routes())
        .merge(connections::create_connection_routes())
        .merge(metrics::create_metrics_routes())
        .merge(dashboards::create_dashboard_routes())
        .route_layer(middleware::from_fn_with_state(
            Arc::clone(state.registry()),
            resolve_customer,
        ));

    Router::new()
        .merge(customers::create_customer_routes())
        .merge(projects::create_project_admin_routes())
        .merge(scoped)
        .with_state(state)
}
