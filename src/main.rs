use featurevault::{
    api::{build_router, AppState},
    config::{Config, IndexingConfig, ObservabilityConfig, ServerConfig, StateBackend, StateConfig},
    indexing::{IndexMaintainer, ProjectionBuilder},
    projections::{BranchListingProjection, ProductVersionProjection},
    query::QueryService,
    search::{SearchConfig, SearchService},
    store::create_store,
};
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "featurevault=info,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load configuration
    let config = Config::load().unwrap_or_else(|e| {
        eprintln!("Failed to load configuration: {}", e);
        eprintln!("Using default configuration");
        default_config()
    });

    tracing::info!("Starting FeatureVault v{}", env!("CARGO_PKG_VERSION"));
    tracing::info!("Storage backend: {:?}", config.state.backend);

    // Mutation channel from the store to the index maintainer
    let (events_tx, events_rx) = tokio::sync::mpsc::channel(config.indexing.event_channel_capacity);

    // Initialize storage backend
    let store = create_store(&config.state, events_tx)?;
    tracing::info!("Storage backend initialized");

    // Initialize the search projection
    let search_service = Arc::new(SearchService::new(config.search.clone()).await?);
    tracing::info!("Search index opened at {:?}", config.search.index_path);

    // Initialize the in-memory projections
    let product_version = Arc::new(ProductVersionProjection::new());
    let branches = Arc::new(BranchListingProjection::new());

    let projections: Vec<Arc<dyn ProjectionBuilder>> = vec![
        search_service.clone(),
        product_version.clone(),
        branches.clone(),
    ];
    let maintainer = Arc::new(IndexMaintainer::new(projections));

    // Rebuild projections from persisted state before serving queries
    let replayed = maintainer.rebuild(store.as_ref()).await?;
    tracing::info!(replayed, "Projections rebuilt from store");

    // Spawn the maintainer loop
    let maintainer_worker = maintainer.clone();
    tokio::spawn(async move {
        maintainer_worker.run(events_rx).await;
    });
    tracing::info!("Index maintainer started");

    // Create application state for the HTTP API
    let query = Arc::new(QueryService::new(
        search_service.clone(),
        product_version,
        branches,
    ));
    let app_state = AppState::new(store, query);

    // Build HTTP router with REST API
    let app = build_router(app_state);

    // Start HTTP server
    let http_addr = format!("{}:{}", config.server.host, config.server.http_port);
    let http_listener = tokio::net::TcpListener::bind(&http_addr).await?;

    tracing::info!("HTTP API server listening on http://{}", http_addr);
    tracing::info!("   Health check: http://{}/health", http_addr);
    tracing::info!("   REST API: http://{}/v1/features", http_addr);

    let http_handle = tokio::spawn(async move {
        if let Err(e) = axum::serve(http_listener, app).await {
            tracing::error!("HTTP server error: {}", e);
        }
    });

    tokio::select! {
        _ = http_handle => {
            tracing::warn!("HTTP server stopped");
        }
        _ = tokio::signal::ctrl_c() => {
            tracing::info!("Shutdown signal received");
        }
    }

    tracing::info!("Shutting down gracefully...");
    Ok(())
}

fn default_config() -> Config {
    Config {
        server: ServerConfig {
            host: "0.0.0.0".to_string(),
            http_port: 8080,
            request_timeout_secs: 30,
        },
        state: StateConfig {
            backend: StateBackend::Sled,
            path: Some("./data/features".into()),
        },
        search: SearchConfig::default(),
        indexing: IndexingConfig::default(),
        observability: ObservabilityConfig {
            log_level: "info".to_string(),
            json_logs: false,
            service_name: "featurevault".to_string(),
        },
    }
}
