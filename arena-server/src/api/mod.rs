//! REST/SSE API for the feedback and ranking engine
//!
//! Thin wiring over the core components: handlers validate input, call
//! exactly one engine operation, and publish the resulting delta.

pub mod handlers;
pub mod identity;
pub mod sse;

use arena_common::Error;
use axum::{
    extract::State,
    http::StatusCode,
    response::Json,
    routing::{get, post},
    Router,
};
use serde::Serialize;
use serde_json::json;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::state::AppState;

/// Create the API router
pub fn create_router(state: AppState) -> Router {
    Router::new()
        // Health check (no prefix for health endpoint)
        .route("/health", get(health_check))

        // API v1 routes
        .nest("/api/v1", Router::new()
            // Match lifecycle
            .route("/matches", post(handlers::create_match))
            .route("/matches", get(handlers::list_matches))
            .route("/matches/:match_id", get(handlers::get_match))

            // Feedback
            .route("/matches/:match_id/reactions", post(handlers::submit_reaction))
            .route("/matches/:match_id/comments", post(handlers::submit_comment))
            .route("/matches/:match_id/feedback", get(handlers::get_feedback))

            // Real-time channel
            .route("/matches/:match_id/events", get(sse::event_stream))

            // Rankings
            .route("/rankings", get(handlers::get_rankings))
        )
        .with_state(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
}

/// Health check endpoint
async fn health_check(State(state): State<AppState>) -> Json<serde_json::Value> {
    Json(json!({
        "status": "ok",
        "module": "arena-server",
        "version": env!("CARGO_PKG_VERSION"),
        "port": state.port,
    }))
}

/// Error payload returned for rejected requests
#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub error: String,
}

/// Map engine errors to HTTP responses
///
/// NotFound/Validation/Unauthorized return synchronously to the caller;
/// they are never broadcast on the channel.
pub fn error_response(err: &Error) -> (StatusCode, Json<ErrorBody>) {
    let status = match err {
        Error::NotFound(_) => StatusCode::NOT_FOUND,
        Error::Validation(_) => StatusCode::BAD_REQUEST,
        Error::Unauthorized(_) => StatusCode::UNAUTHORIZED,
        Error::ExternalService(_) => StatusCode::SERVICE_UNAVAILABLE,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    };
    (
        status,
        Json(ErrorBody {
            error: err.to_string(),
        }),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_status_mapping() {
        let (status, _) = error_response(&Error::NotFound("match".into()));
        assert_eq!(status, StatusCode::NOT_FOUND);

        let (status, _) = error_response(&Error::Validation("empty".into()));
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let (status, _) = error_response(&Error::Unauthorized("no identity".into()));
        assert_eq!(status, StatusCode::UNAUTHORIZED);

        let (status, _) = error_response(&Error::Internal("boom".into()));
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    }
}
