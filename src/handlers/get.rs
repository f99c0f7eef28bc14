use crate::envelope::RouterResponse;
use crate::error::{ApiError, ErrorResponse};
use crate::models::ItemResponse;
use crate::routes;
use crate::state::AppState;
use axum::http::StatusCode;

/// GET /items/{id} handler - Retrieve an item
#[utoipa::path(
    get,
    path = routes::ITEM,
    params(
        ("id" = String, Path, description = "Item identifier, [A-Za-z0-9_.-]+")
    ),
    responses(
        (status = 200, description = "Item found", body = ItemResponse),
        (status = 400, description = "Missing or invalid id", body = ErrorResponse),
        (status = 404, description = "Item not found", body = ErrorResponse),
        (status = 500, description = "Store error", body = ErrorResponse)
    ),
    tag = "items"
)]
pub async fn get_handler(state: &AppState, id: &str) -> Result<RouterResponse, ApiError> {
    match state.store.get(id).await? {
        Some(item) => {
            tracing::info!("Retrieved item with id: {}", id);
            Ok(RouterResponse::json(
                StatusCode::OK,
                &ItemResponse { ok: true, item },
            ))
        }
        None => Err(ApiError::ItemNotFound(id.to_string())),
    }
}
