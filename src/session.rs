use async_trait::async_trait;
use reqwest::header;
use std::sync::{
    Arc, Mutex,
    atomic::{AtomicUsize, Ordering},
};
use thiserror::Error;

use crate::models::{SessionPayload, SessionUser};

/// SessionError
///
/// Everything that can go wrong while asking the identity service who the caller is.
/// The access router collapses all of these into "no user".
#[derive(Debug, Error)]
pub enum SessionError {
    #[error("session service unreachable: {0}")]
    Transport(String),
    #[error("session service returned status {0}")]
    Status(u16),
    #[error("session payload could not be decoded: {0}")]
    Decode(String),
}

// 1. SessionResolver Contract
/// SessionResolver
///
/// Resolves the caller's identity from the request's cookie header. Injected into
/// the application state so the router never reaches for an ambient lookup, and so
/// tests can swap in `MockSessionResolver`.
#[async_trait]
pub trait SessionResolver: Send + Sync {
    /// Returns `Ok(None)` when there is no authenticated user behind the cookie.
    async fn resolve(&self, cookie_header: Option<&str>) -> Result<Option<SessionUser>, SessionError>;
}

// 2. The Real Implementation (Identity service over HTTP)
/// HttpSessionResolver
///
/// Forwards the cookie header to `GET {auth_url}/get-session`. Sessions are never
/// cached: every call hits the identity service with `Cache-Control: no-store`.
#[derive(Clone)]
pub struct HttpSessionResolver {
    client: reqwest::Client,
    session_url: String,
}

impl HttpSessionResolver {
    pub fn new(auth_url: &str) -> Self {
        Self::with_client(reqwest::Client::new(), auth_url)
    }

    pub fn with_client(client: reqwest::Client, auth_url: &str) -> Self {
        Self {
            client,
            session_url: format!("{}/get-session", auth_url.trim_end_matches('/')),
        }
    }
}

#[async_trait]
impl SessionResolver for HttpSessionResolver {
    async fn resolve(&self, cookie_header: Option<&str>) -> Result<Option<SessionUser>, SessionError> {
        // Without cookies the identity service can only answer "no session".
        let Some(cookie) = cookie_header.filter(|c| !c.trim().is_empty()) else {
            return Ok(None);
        };

        let response = self
            .client
            .get(&self.session_url)
            .header(header::COOKIE, cookie)
            .header(header::CACHE_CONTROL, "no-store")
            .send()
            .await
            .map_err(|e| SessionError::Transport(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(SessionError::Status(status.as_u16()));
        }

        let body = response
            .bytes()
            .await
            .map_err(|e| SessionError::Transport(e.to_string()))?;

        // The service answers with a JSON `null` when the cookie carries no session.
        let payload: Option<SessionPayload> =
            serde_json::from_slice(&body).map_err(|e| SessionError::Decode(e.to_string()))?;

        Ok(payload.and_then(|p| p.user))
    }
}

// 3. The Mock Implementation (For Tests)
/// MockSessionResolver
///
/// Returns a fixed user (or a fixed failure) and records how it was called, so
/// tests can assert both the routing outcome and whether a lookup happened at all.
#[derive(Clone, Default)]
pub struct MockSessionResolver {
    user: Option<SessionUser>,
    should_fail: bool,
    calls: Arc<AtomicUsize>,
    last_cookie: Arc<Mutex<Option<String>>>,
}

impl MockSessionResolver {
    /// A resolver for a visitor without a session.
    pub fn anonymous() -> Self {
        Self::default()
    }

    pub fn signed_in(user: SessionUser) -> Self {
        Self {
            user: Some(user),
            ..Self::default()
        }
    }

    pub fn new_failing() -> Self {
        Self {
            should_fail: true,
            ..Self::default()
        }
    }

    /// Number of lookups performed so far.
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// Cookie header received by the most recent lookup.
    pub fn last_cookie(&self) -> Option<String> {
        self.last_cookie
            .lock()
            .map(|cookie| cookie.clone())
            .unwrap_or_default()
    }
}

#[async_trait]
impl SessionResolver for MockSessionResolver {
    async fn resolve(&self, cookie_header: Option<&str>) -> Result<Option<SessionUser>, SessionError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Ok(mut last) = self.last_cookie.lock() {
            *last = cookie_header.map(str::to_string);
        }

        if self.should_fail {
            return Err(SessionError::Transport(
                "Mock Session Error: Simulation requested".to_string(),
            ));
        }
        Ok(self.user.clone())
    }
}

/// SessionState
///
/// The concrete type used to share the session lookup across the application state.
pub type SessionState = Arc<dyn SessionResolver>;
