use crate::envelope::RouterResponse;
use crate::error::{ApiError, ErrorResponse};
use crate::models::ListResponse;
use crate::routes;
use crate::state::AppState;
use axum::http::StatusCode;

/// Fixed page size; there is no continuation past the first page.
pub const LIST_LIMIT: usize = 20;

/// GET /items handler - List items
///
/// Returns at most [`LIST_LIMIT`] items in whatever order the store yields them.
#[utoipa::path(
    get,
    path = routes::ITEMS,
    responses(
        (status = 200, description = "Up to 20 items", body = ListResponse),
        (status = 500, description = "Store error", body = ErrorResponse)
    ),
    tag = "items"
)]
pub async fn list_handler(state: &AppState) -> Result<RouterResponse, ApiError> {
    let items = state.store.scan(LIST_LIMIT).await?;

    tracing::info!("Listed {} items (limit: {})", items.len(), LIST_LIMIT);
    Ok(RouterResponse::json(
        StatusCode::OK,
        &ListResponse {
            ok: true,
            count: items.len(),
            items,
        },
    ))
}
