use skillbridge_gateway::{
    AppState,
    access,
    config::{AppConfig, Env},
    create_router,
    session::{HttpSessionResolver, SessionState},
    upstream::{HttpUpstream, UpstreamState},
};
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// main
///
/// Loads configuration, sets up logging, wires the collaborators into the shared
/// state and serves the gateway.
#[tokio::main]
async fn main() {
    // 1. Configuration (fail-fast on missing production variables)
    dotenv::dotenv().ok();
    let config = AppConfig::load().expect("FATAL: invalid gateway configuration");

    // 2. Logging: RUST_LOG wins, otherwise verbose defaults for the gateway itself.
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "skillbridge_gateway=debug,tower_http=info".into());

    match config.env {
        Env::Local => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(tracing_subscriber::fmt::layer().pretty())
                .init();
        }
        Env::Production => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(tracing_subscriber::fmt::layer().json())
                .init();
        }
    }

    tracing::info!("Gateway starting in {:?} mode", config.env);
    tracing::info!(
        matcher = ?access::matcher_patterns(),
        "Access router guards these paths"
    );

    // 3. Collaborators
    let sessions = Arc::new(HttpSessionResolver::new(&config.auth_url)) as SessionState;
    let upstream = Arc::new(
        HttpUpstream::new(&config.upstream_url, config.max_body_bytes)
            .expect("FATAL: could not build the upstream HTTP client"),
    ) as UpstreamState;

    tracing::info!(auth_url = %config.auth_url, upstream_url = %config.upstream_url, "Collaborators configured");

    // 4. Router and server
    let bind_addr = config.bind_addr.clone();
    let app_state = AppState {
        sessions,
        upstream,
        config,
    };
    let app = create_router(app_state);

    let listener = TcpListener::bind(&bind_addr)
        .await
        .expect("FATAL: could not bind the gateway address. Check BIND_ADDR.");

    tracing::info!("Listening on {}", bind_addr);

    axum::serve(listener, app)
        .await
        .expect("FATAL: gateway server terminated unexpectedly");
}
