use crate::envelope::{RouterRequest, RouterResponse};
use crate::error::{ApiError, ErrorResponse};
use crate::models::{Item, ItemResponse};
use crate::routes;
use crate::state::AppState;
use axum::http::StatusCode;

/// POST /items handler - Create an item
///
/// The server assigns `id` and `createdAt`; the body supplies every other field.
#[utoipa::path(
    post,
    path = routes::ITEMS,
    request_body = serde_json::Value,
    responses(
        (status = 201, description = "Item created", body = ItemResponse),
        (status = 400, description = "Body is not a JSON object", body = ErrorResponse),
        (status = 500, description = "Store error", body = ErrorResponse)
    ),
    tag = "items"
)]
pub async fn create_handler(
    state: &AppState,
    request: &RouterRequest,
) -> Result<RouterResponse, ApiError> {
    let fields = request.json_object()?;
    let item = Item::new(fields);

    state.store.put(&item).await?;

    tracing::info!("Created item with id: {}", item.id);
    Ok(RouterResponse::json(
        StatusCode::CREATED,
        &ItemResponse { ok: true, item },
    ))
}
