// Main entry point - Dependency injection and server setup
use std::{net::SocketAddr, sync::Arc};

use anyhow::Context;
use tower_http::trace::TraceLayer;
use tracing_subscriber::EnvFilter;

use dashboard_builder::application::dashboard_repository::DashboardRepository;
use dashboard_builder::application::dashboard_service::DashboardService;
use dashboard_builder::infrastructure::config::{load_settings, Backend, DEFAULT_CONFIG_PATH};
use dashboard_builder::infrastructure::memory_repository::MemoryDashboardRepository;
use dashboard_builder::infrastructure::rest_repository::RestDashboardRepository;
use dashboard_builder::presentation::app_state::AppState;
use dashboard_builder::presentation::router::router;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    // Load configuration
    let settings = load_settings(DEFAULT_CONFIG_PATH)?;

    // Create repository (infrastructure layer)
    let repository: Arc<dyn DashboardRepository> = match settings.storage.backend {
        Backend::Memory => Arc::new(MemoryDashboardRepository::new()),
        Backend::Rest => {
            let (url, key) = settings.storage.rest_credentials()?;
            Arc::new(RestDashboardRepository::new(url, key))
        }
    };

    // Create services (application layer)
    let dashboard_service = DashboardService::new(repository, settings.session_options());

    // Create application state
    let state = Arc::new(AppState { dashboard_service });

    // Build router (presentation layer)
    let app = router(state).layer(TraceLayer::new_for_http());

    // Start server
    let addr: SocketAddr = settings
        .server
        .bind
        .parse()
        .with_context(|| format!("Invalid bind address {}", settings.server.bind))?;
    tracing::info!(backend = ?settings.storage.backend, "Starting dashboard-builder service on {}", addr);

    axum::serve(tokio::net::TcpListener::bind(addr).await?, app).await?;

    Ok(())
}
