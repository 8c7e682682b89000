use axum::{
    extract::{Request, State},
    http::{self, HeaderMap, StatusCode, Uri, header, uri::PathAndQuery},
    middleware::Next,
    response::{IntoResponse, Redirect, Response},
};

use crate::{
    access::{self, Decision},
    config::AppConfig,
    session::SessionState,
};

/// access_router
///
/// Middleware guarding the dashboard zones. The path is normalized first and the
/// request rewritten to it, so the zone check and the page renderer agree on which
/// page is being asked for. For requests inside the trigger surface it then:
/// 1. resolves the session from the cookie header (a failed lookup counts as no user);
/// 2. sends unauthenticated callers to `/login`;
/// 3. sends callers visiting another role's zone to their own home route;
/// 4. otherwise lets the request through.
///
/// Requests outside the trigger surface skip the session lookup entirely.
pub async fn access_router(
    State(sessions): State<SessionState>,
    State(config): State<AppConfig>,
    mut request: Request,
    next: Next,
) -> Response {
    let path = access::normalize_path(request.uri().path());
    if path != request.uri().path() {
        match with_path(request.uri(), &path) {
            Ok(uri) => {
                tracing::debug!(raw = %request.uri(), path = %path, "request path normalized");
                *request.uri_mut() = uri;
            }
            Err(e) => {
                tracing::warn!(error = %e, raw = %request.uri(), "unusable request path");
                return StatusCode::BAD_REQUEST.into_response();
            }
        }
    }

    if !access::is_protected(&path) {
        return next.run(request).await;
    }

    let cookie_header = request
        .headers()
        .get(header::COOKIE)
        .and_then(|value| value.to_str().ok());

    let role = match sessions.resolve(cookie_header).await {
        Ok(user) => user.map(|u| u.role),
        Err(e) => {
            tracing::warn!(error = %e, path = %path, "session lookup failed, treating caller as anonymous");
            None
        }
    };

    match access::decide(role, &path) {
        Decision::Forward => {
            tracing::debug!(path = %path, role = ?role, "access granted");
            next.run(request).await
        }
        Decision::Redirect(target) => {
            tracing::debug!(path = %path, role = ?role, redirect_to = target, "access redirected");
            let location =
                redirect_location(request.uri(), request.headers(), target, config.trust_proxy);
            Redirect::temporary(&location).into_response()
        }
    }
}

// Same URI with the path swapped out; the query string is kept.
fn with_path(uri: &Uri, path: &str) -> Result<Uri, http::Error> {
    let path_and_query = match uri.query() {
        Some(query) => format!("{path}?{query}"),
        None => path.to_string(),
    };

    let mut parts = uri.clone().into_parts();
    parts.path_and_query = Some(PathAndQuery::try_from(path_and_query)?);
    Ok(Uri::from_parts(parts)?)
}

/// redirect_location
///
/// Rewrites the path of the original request URL to `target`, keeping scheme and host.
/// `x-forwarded-host`/`x-forwarded-proto` are only read when `trust_proxy` is set, and
/// then only their first (client-most) entry. Without any host information the bare
/// path is used.
pub fn redirect_location(
    uri: &Uri,
    headers: &HeaderMap,
    target: &str,
    trust_proxy: bool,
) -> String {
    if let (Some(scheme), Some(authority)) = (uri.scheme_str(), uri.authority()) {
        return format!("{scheme}://{authority}{target}");
    }

    let forwarded_host = trust_proxy
        .then(|| first_forwarded(headers, "x-forwarded-host"))
        .flatten();
    let host = forwarded_host.or_else(|| {
        headers
            .get(header::HOST)
            .and_then(|value| value.to_str().ok())
    });

    match host {
        Some(host) => {
            let scheme = trust_proxy
                .then(|| first_forwarded(headers, "x-forwarded-proto"))
                .flatten()
                .unwrap_or("http");
            format!("{scheme}://{host}{target}")
        }
        None => target.to_string(),
    }
}

fn first_forwarded<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers
        .get(name)?
        .to_str()
        .ok()?
        .split(',')
        .next()
        .map(str::trim)
        .filter(|value| !value.is_empty())
}
