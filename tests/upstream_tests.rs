use axum::{
    body::Body,
    http::{Request, StatusCode, header},
};
use skillbridge_gateway::{
    AppConfig, AppState, create_router,
    models::{Role, SessionUser},
    session::{MockSessionResolver, SessionState},
    upstream::{HttpUpstream, Upstream, UpstreamError, UpstreamState},
};
use std::sync::Arc;
use tower::util::ServiceExt;
use wiremock::{
    Mock, MockServer, ResponseTemplate,
    matchers::{any, body_string, header as header_is, method, path, query_param},
};

const LIMIT: usize = 1024;

fn gateway(sessions: MockSessionResolver, server: &MockServer) -> axum::Router {
    let state = AppState {
        sessions: Arc::new(sessions) as SessionState,
        upstream: Arc::new(HttpUpstream::new(&server.uri(), LIMIT).unwrap()) as UpstreamState,
        config: AppConfig::default(),
    };
    create_router(state)
}

#[tokio::test]
async fn test_forwards_path_query_and_cookies() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/tutor/availability"))
        .and(query_param("week", "3"))
        .and(header_is("cookie", "better-auth.session_token=abc"))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("content-type", "text/html")
                .set_body_string("<h1>Availability</h1>"),
        )
        .expect(1)
        .mount(&server)
        .await;

    let upstream = HttpUpstream::new(&server.uri(), LIMIT).unwrap();
    let request = Request::builder()
        .uri("/tutor/availability?week=3")
        .header(header::HOST, "skillbridge.test")
        .header(header::COOKIE, "better-auth.session_token=abc")
        .body(Body::empty())
        .unwrap();

    let response = upstream.forward(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.headers()[header::CONTENT_TYPE], "text/html");
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    assert_eq!(&bytes[..], b"<h1>Availability</h1>");
}

#[tokio::test]
async fn test_forwards_body_and_method() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/dashboard/bookings"))
        .and(body_string(r#"{"slot":"mon-9"}"#))
        .respond_with(ResponseTemplate::new(201))
        .expect(1)
        .mount(&server)
        .await;

    let upstream = HttpUpstream::new(&server.uri(), LIMIT).unwrap();
    let request = Request::builder()
        .method("POST")
        .uri("/dashboard/bookings")
        .body(Body::from(r#"{"slot":"mon-9"}"#))
        .unwrap();

    let response = upstream.forward(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);
}

#[tokio::test]
async fn test_renderer_redirects_are_relayed_not_followed() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/"))
        .respond_with(ResponseTemplate::new(308).insert_header("location", "/tutors"))
        .mount(&server)
        .await;

    let upstream = HttpUpstream::new(&server.uri(), LIMIT).unwrap();
    let request = Request::builder().uri("/").body(Body::empty()).unwrap();

    let response = upstream.forward(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::PERMANENT_REDIRECT);
    assert_eq!(response.headers()[header::LOCATION], "/tutors");
}

#[tokio::test]
async fn test_oversized_body_is_rejected() {
    let upstream = HttpUpstream::new("http://127.0.0.1:9", LIMIT).unwrap();
    let request = Request::builder()
        .method("POST")
        .uri("/dashboard/profile")
        .body(Body::from(vec![b'x'; LIMIT + 1]))
        .unwrap();

    let result = upstream.forward(request).await;
    assert!(matches!(result, Err(UpstreamError::PayloadTooLarge(LIMIT))));
}

#[tokio::test]
async fn test_unreachable_renderer() {
    let upstream = HttpUpstream::new("http://127.0.0.1:9", LIMIT).unwrap();
    let request = Request::builder().uri("/").body(Body::empty()).unwrap();

    let result = upstream.forward(request).await;
    assert!(matches!(result, Err(UpstreamError::Unreachable(_))));
}

#[tokio::test]
async fn test_failed_body_read_is_not_reported_as_too_large() {
    let upstream = HttpUpstream::new("http://127.0.0.1:9", LIMIT).unwrap();
    let chunks = vec![
        Ok::<_, std::io::Error>("partial"),
        Err(std::io::Error::other("client went away")),
    ];
    let request = Request::builder()
        .method("POST")
        .uri("/dashboard/profile")
        .body(Body::from_stream(futures::stream::iter(chunks)))
        .unwrap();

    let result = upstream.forward(request).await;
    assert!(matches!(result, Err(UpstreamError::InvalidRequestBody(_))));
}

#[tokio::test]
async fn test_large_page_is_relayed_in_full() {
    let page = vec![b'a'; 256 * 1024];
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/tutor/reports"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(page.clone()))
        .mount(&server)
        .await;

    // The request body limit does not apply to what the renderer sends back.
    let upstream = HttpUpstream::new(&server.uri(), LIMIT).unwrap();
    let request = Request::builder()
        .uri("/tutor/reports")
        .body(Body::empty())
        .unwrap();

    let response = upstream.forward(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    assert_eq!(bytes.len(), page.len());
    assert_eq!(&bytes[..], &page[..]);
}

#[tokio::test]
async fn test_connection_listed_headers_are_not_relayed() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/dashboard"))
        .and(|req: &wiremock::Request| {
            !req.headers.contains_key("x-debug-token") && !req.headers.contains_key("x-trace-hop")
        })
        .and(header_is("x-client", "web"))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;

    let upstream = HttpUpstream::new(&server.uri(), LIMIT).unwrap();
    let request = Request::builder()
        .uri("/dashboard")
        .header(header::CONNECTION, "x-debug-token, x-trace-hop")
        .header("x-debug-token", "secret")
        .header("x-trace-hop", "1")
        .header("x-client", "web")
        .body(Body::empty())
        .unwrap();

    let response = upstream.forward(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}

// --- Through the gateway ---

#[tokio::test]
async fn test_dot_segment_path_never_reaches_admin_page() {
    let server = MockServer::start().await;
    Mock::given(any())
        .respond_with(ResponseTemplate::new(200).set_body_string("admin console"))
        .expect(0)
        .mount(&server)
        .await;

    let request = Request::builder()
        .uri("/categories/%2e%2e/admin/users")
        .header(header::HOST, "skillbridge.test")
        .body(Body::empty())
        .unwrap();

    let response = gateway(MockSessionResolver::anonymous(), &server)
        .oneshot(request)
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::TEMPORARY_REDIRECT);
    assert_eq!(
        response.headers()[header::LOCATION],
        "http://skillbridge.test/login"
    );
}

#[tokio::test]
async fn test_renderer_receives_the_checked_path() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/dashboard/bookings"))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;

    let student = SessionUser {
        id: "usr_02".to_string(),
        role: Role::Student,
        name: None,
        email: None,
        image: None,
    };
    let request = Request::builder()
        .uri("/categories/../dashboard/./bookings")
        .header(header::HOST, "skillbridge.test")
        .body(Body::empty())
        .unwrap();

    let response = gateway(MockSessionResolver::signed_in(student), &server)
        .oneshot(request)
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
}
