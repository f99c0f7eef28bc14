use crate::envelope::RouterResponse;
use crate::models::{now_iso8601, HealthResponse};
use crate::routes;
use crate::state::AppState;
use axum::http::StatusCode;

/// /health handler - Liveness probe
///
/// Answers for any method and never touches the item store.
#[utoipa::path(
    get,
    path = routes::HEALTH,
    responses(
        (status = 200, description = "Service is up", body = HealthResponse)
    ),
    tag = "health"
)]
pub fn health_handler(state: &AppState) -> RouterResponse {
    tracing::debug!("Health check");
    RouterResponse::json(
        StatusCode::OK,
        &HealthResponse {
            ok: true,
            table: state.config.table_name.clone(),
            time: now_iso8601(),
        },
    )
}
