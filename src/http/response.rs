//! Responses produced by the gateway itself.

use axum::body::{Body, Bytes};
use axum::http::{header, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};

use crate::fallback::FallbackDecision;

/// 200 with the application shell; never cached by intermediaries.
pub fn shell(html: Bytes) -> Response {
    let mut response = Response::new(Body::from(html));
    let headers = response.headers_mut();
    headers.insert(
        header::CONTENT_TYPE,
        HeaderValue::from_static("text/html; charset=utf-8"),
    );
    if let Some(cache_control) = FallbackDecision::Shell.cache_control() {
        headers.insert(header::CACHE_CONTROL, cache_control);
    }
    response
}

/// Minimal plain-text 404.
pub fn not_found() -> Response {
    (
        StatusCode::NOT_FOUND,
        [(header::CONTENT_TYPE, "text/plain; charset=utf-8")],
        "Not Found",
    )
        .into_response()
}
