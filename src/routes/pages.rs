use crate::{AppState, handlers};
use axum::Router;

/// Pages Router Module
///
/// Everything else goes to the page renderer unchanged: method, path, query,
/// cookies and body.
pub fn page_routes() -> Router<AppState> {
    Router::new().fallback(handlers::forward_page)
}
