/// Project catalog module
///
/// Projects are created once in the platform catalog and then owned by a
/// customer through the customer-project association table.

pub mod storage;
pub mod types;

pub use storage::ProjectStorage;
pub use types::Project;
