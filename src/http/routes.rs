use axum::{
    routing::{get, post},
    Router,
};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use super::handlers;
use super::state::AppState;

/// Create the HTTP router with all routes
pub fn create_router(state: AppState) -> Router {
    Router::new()
        // Health check
        .route("/health", get(handlers::health_check))
        // Interview control
        .route("/interviews/start", post(handlers::start_interview))
        .route(
            "/interviews/stop/:interview_id",
            post(handlers::stop_interview),
        )
        // Interview queries
        .route(
            "/interviews/:interview_id/status",
            get(handlers::get_interview_status),
        )
        .route(
            "/interviews/:interview_id/transcript",
            get(handlers::get_interview_transcript),
        )
        .route(
            "/interviews/:interview_id/progress",
            get(handlers::get_interview_progress),
        )
        // Script queries
        .route("/script", get(handlers::get_script))
        .route("/script/section", post(handlers::get_section))
        .route("/script/question", post(handlers::get_question))
        // Note generation
        .route("/notes/summary", post(handlers::summary_note))
        // Browser clients call this API directly
        .layer(CorsLayer::permissive())
        // Add tracing middleware for request logging
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
