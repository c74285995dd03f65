use crate::api::{handlers, AppState};
use axum::{
    routing::{delete, get, post},
    Router,
};
use tower_http::{
    cors::CorsLayer,
    trace::{DefaultMakeSpan, DefaultOnResponse, TraceLayer},
};

/// Build the main API router
pub fn build_router(state: AppState) -> Router {
    Router::new()
        // Health endpoints
        .route("/health", get(handlers::health_check))
        .route("/health/live", get(handlers::health_check))
        .route("/health/ready", get(handlers::health_check))
        // Feature corpus
        .route("/v1/features", post(handlers::upload_feature))
        .route("/v1/features/recent", get(handlers::recent_features))
        .route("/v1/features/:branch/:digest", get(handlers::get_feature))
        .route(
            "/v1/features/:branch/:digest",
            delete(handlers::delete_feature),
        )
        // Branch listings
        .route("/v1/branches", get(handlers::list_branches))
        .route(
            "/v1/branches/:branch/features",
            get(handlers::list_branch_features),
        )
        // Search
        .route("/v1/search", get(handlers::search))
        // Analysis reports
        .route("/v1/reports", post(handlers::submit_report))
        .route("/v1/reports/grouped", get(handlers::grouped_reports))
        // Add state
        .with_state(state)
        // Add middleware
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::new().include_headers(true))
                .on_response(DefaultOnResponse::new().include_headers(true)),
        )
        .layer(CorsLayer::permissive())
}
