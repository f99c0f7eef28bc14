use crate::envelope::RouterResponse;
use crate::error::{ApiError, ErrorResponse};
use crate::models::ItemResponse;
use crate::routes;
use crate::state::AppState;
use crate::store::StoreError;
use axum::http::StatusCode;

/// DELETE /items/{id} handler - Remove an item, returning its last value
#[utoipa::path(
    delete,
    path = routes::ITEM,
    params(
        ("id" = String, Path, description = "Item identifier, [A-Za-z0-9_.-]+")
    ),
    responses(
        (status = 200, description = "Item deleted", body = ItemResponse),
        (status = 400, description = "Missing or invalid id", body = ErrorResponse),
        (status = 404, description = "Item not found", body = ErrorResponse),
        (status = 500, description = "Store error", body = ErrorResponse)
    ),
    tag = "items"
)]
pub async fn delete_handler(state: &AppState, id: &str) -> Result<RouterResponse, ApiError> {
    match state.store.delete_existing(id).await {
        Ok(item) => {
            tracing::info!("Deleted item with id: {}", id);
            Ok(RouterResponse::json(
                StatusCode::OK,
                &ItemResponse { ok: true, item },
            ))
        }
        Err(StoreError::ConditionFailed) => Err(ApiError::ItemNotFound(id.to_string())),
        Err(err) => Err(err.into()),
    }
}
