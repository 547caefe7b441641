use anyhow::Result;
use axum::Router;
use std::sync::Arc;
use tokio::net::TcpListener;
use tower::ServiceBuilder;
use tower_http::trace::TraceLayer;
use tracing::{info, warn, Level};

use scratchmatch_server::admin::admin_router;
use scratchmatch_server::api::api_router;
use scratchmatch_server::config::Config;
use scratchmatch_server::repository::SqliteRepository;
use scratchmatch_server::store::EventStore;
use scratchmatch_server::AppState;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt().with_max_level(Level::INFO).init();

    info!("Starting scratchmatch server");

    let config =
        Config::from_env().expect("Failed to load configuration from environment variables");

    let db_path = config.state_dir.join("scratchmatch-state.db");
    info!("Using state database: {}", db_path.display());
    let repository =
        SqliteRepository::new(&db_path).expect("Failed to initialize SQLite database");

    let store = EventStore::load(Arc::new(repository))
        .await
        .expect("Failed to load event state from the database");

    if config.admin_credentials.is_none() {
        warn!("ADMIN_USERNAME/ADMIN_PASSWORD not set; admin endpoints are disabled");
    }

    let app_state = Arc::new(AppState::new(Arc::new(store), config.admin_credentials));

    let app = Router::new()
        .merge(api_router(app_state.clone()))
        .merge(admin_router(app_state))
        .layer(ServiceBuilder::new().layer(TraceLayer::new_for_http()));

    let listener = TcpListener::bind(format!("0.0.0.0:{}", config.port)).await?;
    info!("Server listening on port {}", config.port);

    axum::serve(listener, app).await?;

    Ok(())
}
