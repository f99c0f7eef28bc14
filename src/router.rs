use crate::envelope::{RouterRequest, RouterResponse};
use crate::error::ApiError;
use crate::handlers;
use crate::routes::Route;
use crate::state::AppState;

/// Route one normalized request to exactly one response.
///
/// Stateless per call: the only shared thing is the injected store, and each
/// operation makes at most one call to it.
pub async fn dispatch(state: &AppState, request: &RouterRequest) -> RouterResponse {
    let route = Route::resolve(&request.method, &request.path);

    let result = match route {
        Route::Health => Ok(handlers::health_handler(state)),
        Route::Preflight => Ok(RouterResponse::no_content()),
        Route::Create => handlers::create_handler(state, request).await,
        Route::List => handlers::list_handler(state).await,
        Route::Read(Some(id)) => handlers::get_handler(state, id).await,
        Route::Update(Some(id)) => handlers::update_handler(state, id, request).await,
        Route::Delete(Some(id)) => handlers::delete_handler(state, id).await,
        Route::Read(None) | Route::Update(None) | Route::Delete(None) => Err(ApiError::InvalidId),
        Route::NotHandled => Err(ApiError::RouteNotHandled {
            method: request.method.clone(),
            path: request.path.clone(),
        }),
    };

    let response = result.unwrap_or_else(ApiError::into_response);
    tracing::info!(
        "{} {} -> {}",
        request.method,
        request.path,
        response.status_code
    );
    response
}
