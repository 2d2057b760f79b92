/// customerlake: multi-customer support for DevLake-style data platforms
///
/// This library resolves a customer context for every scoped request and
/// serves customer-isolated projects, connections, metrics and dashboards.

// Core configuration and setup
pub mod config;

// Platform database bootstrap (SQLite schema and pool)
pub mod database;

// HTTP error responses
pub mod error;

// Customer management layer - data model, storage, registry and service
pub mod customer;

// Project catalog
pub mod project;

// Customer data-source connections
pub mod connection;

// Deployment records and DORA metric aggregation
pub mod metrics;

// Dashboard definitions
pub mod dashboard;

// Customer context middleware and extractor
pub mod context;

// HTTP API layer - REST controllers
pub mod api;

// Server setup and initialization
pub mod server;

// Re-export commonly used types for external consumers
pub use customer::{Customer, CustomerRegistry, CustomerService};
pub use project::Project;
pub use context::{CurrentCustomer, CustomerContext};
pub use server::start_server;
