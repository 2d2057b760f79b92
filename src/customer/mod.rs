/// Customer management layer
///
/// Handles the customer data model, its SQLite persistence, the hot-reload
/// registry consulted by the context middleware, and the service that
/// enforces project ownership rules.

// Customer type definitions and id rules
pub mod types;

// SQLite persistence for customers and customer-project ownership
pub mod storage;

// Lock-free registry for per-request customer resolution
pub mod registry;

// Validated customer operations
pub mod service;

pub use registry::CustomerRegistry;
pub use service::{CustomerError, CustomerService};
pub use storage::CustomerStorage;
pub use types::Customer;
