use axum::{
    body::Bytes,
    extract::State,
    http::{HeaderMap, Method, Uri},
    Router,
};
use base64::{engine::general_purpose, Engine as _};
use tower_http::trace::TraceLayer;

use crate::envelope::{RouterRequest, RouterResponse};
use crate::router::dispatch;
use crate::state::AppState;

/// Request header marking a base64-encoded body
pub const BODY_ENCODING_HEADER: &str = "content-transfer-encoding";

/// Build the HTTP app.
///
/// axum does no routing here: every request falls through to the item
/// router so its precedence rules (health first, then preflight) hold for
/// all methods and paths.
pub fn create_app(state: AppState) -> Router {
    Router::new()
        .fallback(http_handler)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn http_handler(
    State(state): State<AppState>,
    method: Method,
    uri: Uri,
    headers: HeaderMap,
    body: Bytes,
) -> RouterResponse {
    let request = to_router_request(&method, &uri, &headers, &body);
    dispatch(&state, &request).await
}

/// Normalize an HTTP request into the router's request shape
pub fn to_router_request(
    method: &Method,
    uri: &Uri,
    headers: &HeaderMap,
    body: &[u8],
) -> RouterRequest {
    let is_base64_encoded = headers
        .get(BODY_ENCODING_HEADER)
        .and_then(|value| value.to_str().ok())
        .is_some_and(|value| value.eq_ignore_ascii_case("base64"));

    let (body, is_base64_encoded) = match std::str::from_utf8(body) {
        _ if body.is_empty() => (None, is_base64_encoded),
        Ok(text) => (Some(text.to_string()), is_base64_encoded),
        // Raw bytes go through base64 so decoding rejects them as invalid JSON
        Err(_) => (Some(general_purpose::STANDARD.encode(body)), true),
    };

    RouterRequest {
        method: method.as_str().to_string(),
        path: uri.path().to_string(),
        body,
        is_base64_encoded,
    }
}
