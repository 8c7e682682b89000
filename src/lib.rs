use axum::{
    Router,
    extract::FromRef,
    http::HeaderName,
    middleware,
};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use tower::ServiceBuilder;
use tower_http::{
    cors::{Any, CorsLayer},
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    trace::{DefaultOnResponse, TraceLayer},
};
use tracing::{Level, Span};

// --- Module Structure ---

// Routing rules and the middleware that applies them.
pub mod access;
pub mod auth;

// Collaborators and their contracts.
pub mod session;
pub mod upstream;

pub mod config;
pub mod handlers;
pub mod models;

// Gateway-served endpoints vs. forwarded pages.
pub mod routes;
use routes::{pages, public};

// --- Public Re-exports ---

pub use config::AppConfig;
pub use session::{HttpSessionResolver, MockSessionResolver, SessionState};
pub use upstream::{HttpUpstream, MockUpstream, UpstreamState};

/// ApiDoc
///
/// OpenAPI document for the endpoints the gateway answers itself, served at
/// `/api-docs/openapi.json`. Forwarded pages are not part of it.
#[derive(OpenApi)]
#[openapi(
    paths(handlers::health, handlers::get_session),
    components(
        schemas(
            models::Role, models::SessionUser, models::SessionPayload, models::SessionResponse,
        )
    ),
    tags(
        (name = "skillbridge-gateway", description = "SkillBridge access gateway")
    )
)]
struct ApiDoc;

/// AppState
///
/// Shared, immutable container for the gateway's collaborators and configuration.
#[derive(Clone)]
pub struct AppState {
    /// Identity lookup used by the access router and `/api/session`.
    pub sessions: SessionState,
    /// Page renderer receiving every forwarded request.
    pub upstream: UpstreamState,
    pub config: AppConfig,
}

// --- Axum FromRef Extractor Implementations ---

impl FromRef<AppState> for SessionState {
    fn from_ref(app_state: &AppState) -> SessionState {
        app_state.sessions.clone()
    }
}

impl FromRef<AppState> for UpstreamState {
    fn from_ref(app_state: &AppState) -> UpstreamState {
        app_state.upstream.clone()
    }
}

impl FromRef<AppState> for AppConfig {
    fn from_ref(app_state: &AppState) -> AppConfig {
        app_state.config.clone()
    }
}

/// create_router
///
/// Assembles the gateway: public endpoints, the forwarding fallback, the access
/// router over both, then the observability and CORS layers.
pub fn create_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_methods(Any)
        .allow_origin(Any)
        .allow_headers(Any);

    let x_request_id = HeaderName::from_static("x-request-id");

    let base_router = Router::new()
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .merge(public::public_routes())
        .merge(pages::page_routes())
        // Runs for every request, including the fallback; it only acts on the
        // dashboard zones.
        .layer(middleware::from_fn_with_state(
            state.clone(),
            auth::access_router,
        ))
        .with_state(state);

    base_router
        .layer(
            ServiceBuilder::new()
                .layer(SetRequestIdLayer::new(
                    x_request_id.clone(),
                    MakeRequestUuid,
                ))
                .layer(
                    TraceLayer::new_for_http()
                        .make_span_with(trace_span_logger)
                        .on_response(
                            DefaultOnResponse::new()
                                .level(Level::INFO)
                                .latency_unit(tower_http::LatencyUnit::Millis),
                        ),
                )
                .layer(PropagateRequestIdLayer::new(x_request_id)),
        )
        .layer(cors)
}

/// trace_span_logger
///
/// Span for every request, tagged with the `x-request-id` set by `SetRequestIdLayer`
/// so all log lines of one request correlate.
fn trace_span_logger(request: &axum::http::Request<axum::body::Body>) -> Span {
    let request_id = request
        .headers()
        .get("x-request-id")
        .and_then(|value| value.to_str().ok())
        .unwrap_or("unknown");

    tracing::info_span!(
        "http_request",
        method = ?request.method(),
        uri = ?request.uri(),
        req_id = %request_id,
    )
}
