/// Customer-scoped engineering metrics
///
/// - Type definitions (deployments, time ranges, reports)
/// - Deployment persistence scoped through project ownership
/// - DORA aggregation into per-day series

pub mod report;
pub mod storage;
pub mod types;

pub use report::build_report;
pub use storage::DeploymentStorage;
pub use types::{DateRange, Deployment, MetricKind, MetricsReport, TimeRange};
