use crate::envelope::{RouterRequest, RouterResponse};
use crate::error::{ApiError, ErrorResponse};
use crate::models::{update_expression, Assignment, ItemResponse};
use crate::routes;
use crate::state::AppState;
use crate::store::StoreError;
use axum::http::StatusCode;

/// PUT /items/{id} handler - Replace top-level fields of an existing item
///
/// `id` and `createdAt` in the body are ignored. Each remaining key replaces
/// the stored value wholesale; fields absent from the body are left alone.
#[utoipa::path(
    put,
    path = routes::ITEM,
    params(
        ("id" = String, Path, description = "Item identifier, [A-Za-z0-9_.-]+")
    ),
    request_body = serde_json::Value,
    responses(
        (status = 200, description = "Item updated", body = ItemResponse),
        (status = 400, description = "Invalid id, invalid body, or no updatable fields", body = ErrorResponse),
        (status = 404, description = "Item not found", body = ErrorResponse),
        (status = 500, description = "Store error", body = ErrorResponse)
    ),
    tag = "items"
)]
pub async fn update_handler(
    state: &AppState,
    id: &str,
    request: &RouterRequest,
) -> Result<RouterResponse, ApiError> {
    let assignments = Assignment::from_body(request.json_object()?);
    if assignments.is_empty() {
        return Err(ApiError::NoUpdatableFields);
    }

    tracing::debug!("Updating item {} with {}", id, update_expression(&assignments));

    match state.store.update_existing(id, &assignments).await {
        Ok(item) => {
            tracing::info!("Updated item with id: {}", id);
            Ok(RouterResponse::json(
                StatusCode::OK,
                &ItemResponse { ok: true, item },
            ))
        }
        Err(StoreError::ConditionFailed) => Err(ApiError::ItemNotFound(id.to_string())),
        Err(err) => Err(err.into()),
    }
}
