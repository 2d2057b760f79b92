/// customerlake: multi-customer support for DevLake-style data platforms
///
/// Main entry point. Loads configuration from the environment and starts the
/// HTTP server.

use customerlake::{config::Config, server::start_server};

/// Application entry point
///
/// The server provides:
/// - Customer management at {base}/customers/*
/// - Customer-scoped projects, connections, deployments, metrics and dashboards
/// - Health check at /healthz
#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Defaults to 0.0.0.0:8080, data/customerlake.db and /api/rest
    let config = Config::default();

    start_server(config).await?;

    Ok(())
}
