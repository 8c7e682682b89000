use async_trait::async_trait;
use axum::{
    body::Body,
    extract::Request,
    http::{HeaderMap, HeaderName, StatusCode, header},
    response::{IntoResponse, Response},
};
use futures::StreamExt;
use std::sync::Arc;
use thiserror::Error;

/// UpstreamError
///
/// Failures while relaying a request to the page renderer.
#[derive(Debug, Error)]
pub enum UpstreamError {
    #[error("request body exceeds {0} bytes")]
    PayloadTooLarge(usize),
    #[error("request body could not be read: {0}")]
    InvalidRequestBody(String),
    #[error("page renderer unreachable: {0}")]
    Unreachable(String),
}

impl IntoResponse for UpstreamError {
    fn into_response(self) -> Response {
        let status = match &self {
            UpstreamError::PayloadTooLarge(_) => StatusCode::PAYLOAD_TOO_LARGE,
            UpstreamError::InvalidRequestBody(_) => StatusCode::BAD_REQUEST,
            UpstreamError::Unreachable(_) => StatusCode::BAD_GATEWAY,
        };
        tracing::error!(error = %self, "upstream forwarding failed");
        status.into_response()
    }
}

// 1. Upstream Contract
/// Upstream
///
/// Whatever renders the pages once the access router lets a request through.
#[async_trait]
pub trait Upstream: Send + Sync {
    async fn forward(&self, request: Request) -> Result<Response, UpstreamError>;
}

// 2. The Real Implementation (Reverse proxy to the page renderer)
/// HttpUpstream
///
/// Re-issues the request against the configured base URL, keeping method, path,
/// query, body and end-to-end headers. The answer is streamed back as it arrives.
#[derive(Clone)]
pub struct HttpUpstream {
    client: reqwest::Client,
    base_url: String,
    max_body_bytes: usize,
}

impl HttpUpstream {
    pub fn new(base_url: &str, max_body_bytes: usize) -> Result<Self, reqwest::Error> {
        // Redirects from the renderer belong to the browser, not to the gateway.
        let client = reqwest::Client::builder()
            .redirect(reqwest::redirect::Policy::none())
            .build()?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            max_body_bytes,
        })
    }

    // Buffers the request body, stopping as soon as it passes the limit.
    async fn read_body(&self, body: Body) -> Result<Vec<u8>, UpstreamError> {
        let mut stream = body.into_data_stream();
        let mut buffered = Vec::new();

        while let Some(chunk) = stream.next().await {
            let chunk = chunk.map_err(|e| UpstreamError::InvalidRequestBody(e.to_string()))?;
            if buffered.len() + chunk.len() > self.max_body_bytes {
                return Err(UpstreamError::PayloadTooLarge(self.max_body_bytes));
            }
            buffered.extend_from_slice(&chunk);
        }

        Ok(buffered)
    }
}

#[async_trait]
impl Upstream for HttpUpstream {
    async fn forward(&self, request: Request) -> Result<Response, UpstreamError> {
        let (parts, body) = request.into_parts();

        let path_and_query = parts
            .uri
            .path_and_query()
            .map(|pq| pq.as_str())
            .unwrap_or("/");
        let url = format!("{}{}", self.base_url, path_and_query);

        let body = self.read_body(body).await?;

        let mut headers = parts.headers;
        strip_hop_by_hop(&mut headers);
        headers.remove(header::HOST);

        let upstream_response = self
            .client
            .request(parts.method, url)
            .headers(headers)
            .body(body)
            .send()
            .await
            .map_err(|e| UpstreamError::Unreachable(e.to_string()))?;

        let status = upstream_response.status();
        let mut response_headers = upstream_response.headers().clone();
        strip_hop_by_hop(&mut response_headers);

        let mut response = Response::new(Body::from_stream(upstream_response.bytes_stream()));
        *response.status_mut() = status;
        *response.headers_mut() = response_headers;
        Ok(response)
    }
}

/// Headers scoped to a single connection; never relayed across the proxy.
static HOP_BY_HOP: [HeaderName; 7] = [
    header::CONNECTION,
    header::PROXY_AUTHENTICATE,
    header::PROXY_AUTHORIZATION,
    header::TE,
    header::TRAILER,
    header::TRANSFER_ENCODING,
    header::UPGRADE,
];

// Also drops every header the `Connection` header names as connection-scoped.
fn strip_hop_by_hop(headers: &mut HeaderMap) {
    let listed: Vec<HeaderName> = headers
        .get_all(header::CONNECTION)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|value| value.split(','))
        .filter_map(|token| HeaderName::from_bytes(token.trim().as_bytes()).ok())
        .collect();

    for name in listed.iter().chain(HOP_BY_HOP.iter()) {
        headers.remove(name);
    }
    headers.remove("keep-alive");
}

// 3. The Mock Implementation (For Tests)
/// MockUpstream
///
/// Stands in for the page renderer: answers 200 with `"<METHOD> <path?query>"`, so
/// tests can see exactly which request made it through the gateway.
#[derive(Clone, Default)]
pub struct MockUpstream {
    /// When true, every forward fails as if the renderer were down.
    pub should_fail: bool,
}

impl MockUpstream {
    pub fn new() -> Self {
        Self { should_fail: false }
    }

    pub fn new_failing() -> Self {
        Self { should_fail: true }
    }
}

#[async_trait]
impl Upstream for MockUpstream {
    async fn forward(&self, request: Request) -> Result<Response, UpstreamError> {
        if self.should_fail {
            return Err(UpstreamError::Unreachable(
                "Mock Upstream Error: Simulation requested".to_string(),
            ));
        }

        let target = request
            .uri()
            .path_and_query()
            .map(|pq| pq.as_str().to_string())
            .unwrap_or_else(|| "/".to_string());

        Ok(format!("{} {}", request.method(), target).into_response())
    }
}

/// UpstreamState
///
/// The concrete type used to share the page renderer across the application state.
pub type UpstreamState = Arc<dyn Upstream>;
