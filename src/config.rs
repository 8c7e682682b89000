use std::env;

use thiserror::Error;

/// Default body limit for requests forwarded to the page renderer (10 MiB).
pub const DEFAULT_MAX_BODY_BYTES: usize = 10 * 1024 * 1024;

/// AppConfig
///
/// Holds the gateway's configuration. Immutable once loaded and pulled into
/// handlers and middleware via `FromRef`, like the rest of the application state.
#[derive(Clone, Debug)]
pub struct AppConfig {
    // Runtime environment marker. Controls log format and which variables are mandatory.
    pub env: Env,
    // Base URL of the identity service; the session lookup calls `{auth_url}/get-session`.
    pub auth_url: String,
    // Base URL of the page renderer that receives forwarded requests.
    pub upstream_url: String,
    // Socket address the HTTP server binds to.
    pub bind_addr: String,
    // Largest request body relayed upstream.
    pub max_body_bytes: usize,
    // Honour `x-forwarded-host`/`x-forwarded-proto` when building redirects.
    // Only safe when a proxy in front of the gateway overwrites them.
    pub trust_proxy: bool,
}

/// Env
///
/// Runtime context. Local gets pretty logs and built-in collaborator URLs;
/// production requires every collaborator URL to be set explicitly.
#[derive(Clone, PartialEq, Debug)]
pub enum Env {
    Local,
    Production,
}

#[derive(Debug, Error, PartialEq)]
pub enum ConfigError {
    #[error("{0} must be set in production")]
    Missing(&'static str),
    #[error("{name} is not a valid number: {value}")]
    InvalidNumber { name: &'static str, value: String },
}

impl Default for AppConfig {
    /// Non-panicking local configuration used by tests to scaffold state.
    fn default() -> Self {
        Self {
            env: Env::Local,
            auth_url: "http://localhost:5000/api/auth".to_string(),
            upstream_url: "http://localhost:3000".to_string(),
            bind_addr: "0.0.0.0:8080".to_string(),
            max_body_bytes: DEFAULT_MAX_BODY_BYTES,
            trust_proxy: false,
        }
    }
}

impl AppConfig {
    /// load
    ///
    /// Reads the configuration from environment variables. In production the
    /// collaborator URLs are mandatory and a missing one is reported instead of
    /// silently falling back to localhost.
    pub fn load() -> Result<Self, ConfigError> {
        let env = match env::var("APP_ENV").as_deref() {
            Ok("production") => Env::Production,
            _ => Env::Local,
        };
        let defaults = Self::default();

        let auth_url = required_in_prod(&env, "AUTH_URL", defaults.auth_url)?;
        let upstream_url = required_in_prod(&env, "UPSTREAM_URL", defaults.upstream_url)?;
        let bind_addr = env::var("BIND_ADDR").unwrap_or(defaults.bind_addr);

        let max_body_bytes = match env::var("MAX_BODY_BYTES") {
            Ok(value) => value
                .parse::<usize>()
                .map_err(|_| ConfigError::InvalidNumber {
                    name: "MAX_BODY_BYTES",
                    value,
                })?,
            Err(_) => defaults.max_body_bytes,
        };

        let trust_proxy = matches!(
            env::var("TRUST_PROXY").as_deref().map(str::trim),
            Ok("true" | "1")
        );

        Ok(Self {
            env,
            auth_url: trim_base_url(auth_url),
            upstream_url: trim_base_url(upstream_url),
            bind_addr,
            max_body_bytes,
            trust_proxy,
        })
    }
}

fn required_in_prod(env: &Env, name: &'static str, fallback: String) -> Result<String, ConfigError> {
    match (env::var(name), env) {
        (Ok(value), _) if !value.trim().is_empty() => Ok(value),
        (_, Env::Production) => Err(ConfigError::Missing(name)),
        (_, Env::Local) => Ok(fallback),
    }
}

// Joined with absolute paths later, so a trailing slash would double up.
fn trim_base_url(url: String) -> String {
    url.trim_end_matches('/').to_string()
}
