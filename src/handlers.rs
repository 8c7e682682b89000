use axum::{
    Json,
    extract::{Request, State},
    http::{HeaderMap, header},
    response::{IntoResponse, Response},
};

use crate::{models::SessionResponse, session::SessionState, upstream::UpstreamState};

// --- Handlers ---

/// health
///
/// [Public Route] Liveness check for load balancers.
#[utoipa::path(
    get,
    path = "/health",
    responses((status = 200, description = "Gateway is up", body = String))
)]
pub async fn health() -> &'static str {
    "ok"
}

/// get_session
///
/// [Public Route] Reports the caller's session in the uniform envelope. A failed
/// lookup is not an HTTP error: it answers `success = false` with a null user, the
/// same shape the frontend already handles for signed-out visitors.
#[utoipa::path(
    get,
    path = "/api/session",
    responses((status = 200, description = "Current session", body = SessionResponse))
)]
pub async fn get_session(
    State(sessions): State<SessionState>,
    headers: HeaderMap,
) -> Json<SessionResponse> {
    let cookie_header = headers
        .get(header::COOKIE)
        .and_then(|value| value.to_str().ok());

    match sessions.resolve(cookie_header).await {
        Ok(user) => Json(SessionResponse::resolved(user)),
        Err(e) => {
            tracing::warn!(error = %e, "session lookup failed");
            Json(SessionResponse::failed(e.to_string()))
        }
    }
}

/// forward_page
///
/// [Fallback] Hands every request not served by the gateway itself to the page
/// renderer. Protected paths only reach this point after the access router let them
/// through.
pub async fn forward_page(State(upstream): State<UpstreamState>, request: Request) -> Response {
    match upstream.forward(request).await {
        Ok(response) => response,
        Err(e) => e.into_response(),
    }
}
