use axum::http::StatusCode;
use serde::{Deserialize, Serialize};

use crate::envelope::RouterResponse;
use crate::store::StoreError;

/// Error response body
#[derive(Serialize, Deserialize, utoipa::ToSchema)]
pub struct ErrorResponse {
    pub error: String,
    pub message: String,
}

/// Custom error type for routed operations
///
/// Every variant maps to exactly one status code and error kind, so all
/// failures leave the router in the same envelope as successes.
#[derive(Debug)]
pub enum ApiError {
    /// Body is not valid JSON (or not decodable base64/UTF-8)
    InvalidJson,
    /// Body parsed but is not a JSON object
    NotAnObject,
    /// Path identifier missing or outside `[A-Za-z0-9_.-]`
    InvalidId,
    /// Update body had nothing left after dropping protected keys
    NoUpdatableFields,
    /// Item does not exist
    ItemNotFound(String),
    /// No route for this method and path
    RouteNotHandled { method: String, path: String },
    /// Store failure passed through as-is
    Store(StoreError),
}

impl ApiError {
    fn parts(&self) -> (StatusCode, String, String) {
        let bad_request = |message: &str| {
            (
                StatusCode::BAD_REQUEST,
                "BadRequest".to_string(),
                message.to_string(),
            )
        };

        match self {
            ApiError::InvalidJson => bad_request("Body must be valid JSON"),
            ApiError::NotAnObject => bad_request("Body must be a JSON object"),
            ApiError::InvalidId => bad_request("Missing or invalid id"),
            ApiError::NoUpdatableFields => bad_request("No updatable fields provided"),
            ApiError::ItemNotFound(id) => (
                StatusCode::NOT_FOUND,
                "NotFound".to_string(),
                format!("Item not found: {}", id),
            ),
            ApiError::RouteNotHandled { method, path } => (
                StatusCode::NOT_FOUND,
                "NotFound".to_string(),
                format!("{} {} not handled", method, path),
            ),
            ApiError::Store(err) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                err.name().to_string(),
                err.message(),
            ),
        }
    }

    pub fn into_response(self) -> RouterResponse {
        let (status, error, message) = self.parts();

        if status.is_server_error() {
            tracing::error!("{}: {}", error, message);
        } else {
            tracing::warn!("{}: {}", error, message);
        }

        RouterResponse::json(status, &ErrorResponse { error, message })
    }
}

impl From<StoreError> for ApiError {
    fn from(err: StoreError) -> Self {
        ApiError::Store(err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn decode(response: &RouterResponse) -> ErrorResponse {
        serde_json::from_str(&response.body).unwrap()
    }

    #[test]
    fn test_bad_request_mapping() {
        let response = ApiError::NoUpdatableFields.into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let body = decode(&response);
        assert_eq!(body.error, "BadRequest");
        assert_eq!(body.message, "No updatable fields provided");
    }

    #[test]
    fn test_route_not_handled_message() {
        let response = ApiError::RouteNotHandled {
            method: "PATCH".to_string(),
            path: "/items".to_string(),
        }
        .into_response();

        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        let body = decode(&response);
        assert_eq!(body.error, "NotFound");
        assert_eq!(body.message, "PATCH /items not handled");
    }

    #[test]
    fn test_store_error_passes_through() {
        let response =
            ApiError::from(StoreError::backend("Unavailable", "connection refused")).into_response();

        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let body = decode(&response);
        assert_eq!(body.error, "Unavailable");
        assert_eq!(body.message, "connection refused");

        let raw = response.json_body().unwrap();
        assert!(raw.get("ok").is_none());
    }

    #[test]
    fn test_unmapped_condition_failure_is_internal() {
        let response = ApiError::from(StoreError::ConditionFailed).into_response();

        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let body = decode(&response);
        assert_eq!(body.error, "ConditionalCheckFailed");
        assert_eq!(body.message, "The conditional request failed");
    }
}
