use crate::{AppState, handlers};
use axum::{Router, routing::get};

/// Public Router Module
///
/// Endpoints the gateway answers itself. None of these paths fall inside a
/// dashboard zone, so the access router never intercepts them.
pub fn public_routes() -> Router<AppState> {
    Router::new()
        // GET /health
        // Liveness check; returns "ok" without touching any collaborator.
        .route("/health", get(handlers::health))
        // GET /api/session
        // The caller's session in the { success, data, message, error } envelope.
        .route("/api/session", get(handlers::get_session))
}
