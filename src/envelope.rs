use axum::{
    body::Body,
    http::{HeaderName, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
};
use base64::{engine::general_purpose, Engine as _};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value as JsonValue};
use std::collections::BTreeMap;

use crate::error::ApiError;

/// Headers attached to every response
pub const RESPONSE_HEADERS: [(&str, &str); 4] = [
    ("Content-Type", "application/json"),
    ("Access-Control-Allow-Origin", "*"),
    ("Access-Control-Allow-Methods", "GET,POST,PUT,DELETE,OPTIONS"),
    ("Access-Control-Allow-Headers", "Content-Type,Authorization"),
];

/// A normalized inbound request.
///
/// Deserializes from the API gateway proxy event shape so recorded events can
/// be replayed against the router directly.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RouterRequest {
    #[serde(rename = "httpMethod")]
    pub method: String,
    pub path: String,
    #[serde(default)]
    pub body: Option<String>,
    #[serde(default)]
    pub is_base64_encoded: bool,
}

impl RouterRequest {
    #[cfg(test)]
    pub fn new(method: impl Into<String>, path: impl Into<String>) -> Self {
        Self {
            method: method.into(),
            path: path.into(),
            ..Default::default()
        }
    }

    #[cfg(test)]
    pub fn with_body(mut self, body: impl Into<String>) -> Self {
        self.body = Some(body.into());
        self
    }

    #[cfg(test)]
    pub fn base64_encoded(mut self) -> Self {
        self.is_base64_encoded = true;
        self
    }

    /// Parse the body as a JSON object.
    ///
    /// A missing or empty body is an empty object. Base64 bodies are decoded
    /// first; bytes that do not decode to UTF-8 count as invalid JSON.
    pub fn json_object(&self) -> Result<Map<String, JsonValue>, ApiError> {
        let raw = match self.body.as_deref() {
            None | Some("") => return Ok(Map::new()),
            Some(raw) => raw,
        };

        let text = if self.is_base64_encoded {
            let bytes = general_purpose::STANDARD
                .decode(raw)
                .map_err(|_| ApiError::InvalidJson)?;
            String::from_utf8(bytes).map_err(|_| ApiError::InvalidJson)?
        } else {
            raw.to_string()
        };

        if text.is_empty() {
            return Ok(Map::new());
        }

        match serde_json::from_str::<JsonValue>(&text) {
            Ok(JsonValue::Object(map)) => Ok(map),
            Ok(_) => Err(ApiError::NotAnObject),
            Err(_) => Err(ApiError::InvalidJson),
        }
    }
}

/// A normalized outbound response, serialized in the proxy response shape
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RouterResponse {
    pub status_code: u16,
    pub headers: BTreeMap<String, String>,
    pub body: String,
}

impl RouterResponse {
    /// JSON response with the standard header set
    pub fn json<T: Serialize>(status: StatusCode, payload: &T) -> Self {
        let body = serde_json::to_string(payload).unwrap_or_else(|e| {
            tracing::error!("Failed to serialize response body: {}", e);
            "{}".to_string()
        });
        Self::with_body(status, body)
    }

    /// Empty 204 response, used for CORS preflight
    pub fn no_content() -> Self {
        Self::with_body(StatusCode::NO_CONTENT, String::new())
    }

    fn with_body(status: StatusCode, body: String) -> Self {
        let headers = RESPONSE_HEADERS
            .iter()
            .map(|(name, value)| (name.to_string(), value.to_string()))
            .collect();
        Self {
            status_code: status.as_u16(),
            headers,
            body,
        }
    }

    pub fn status(&self) -> StatusCode {
        StatusCode::from_u16(self.status_code).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR)
    }

    /// Decode the body as JSON
    #[cfg(test)]
    pub fn json_body(&self) -> serde_json::Result<JsonValue> {
        serde_json::from_str(&self.body)
    }
}

impl IntoResponse for RouterResponse {
    fn into_response(self) -> Response {
        let status = self.status();
        let mut response = Response::new(Body::from(self.body));
        *response.status_mut() = status;

        let headers = response.headers_mut();
        for (name, value) in &self.headers {
            match (
                HeaderName::from_bytes(name.as_bytes()),
                HeaderValue::from_str(value),
            ) {
                (Ok(name), Ok(value)) => {
                    headers.insert(name, value);
                }
                _ => tracing::warn!("Dropping invalid response header: {}", name),
            }
        }

        response
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_empty_body_is_empty_object() {
        let request = RouterRequest::new("POST", "/items");
        assert!(request.json_object().unwrap().is_empty());

        let request = RouterRequest::new("POST", "/items").with_body("");
        assert!(request.json_object().unwrap().is_empty());
    }

    #[test]
    fn test_base64_body_is_decoded() {
        let encoded = general_purpose::STANDARD.encode(r#"{"name":"widget"}"#);
        let request = RouterRequest::new("POST", "/items")
            .with_body(encoded)
            .base64_encoded();

        let body = request.json_object().unwrap();
        assert_eq!(body["name"], json!("widget"));
    }

    #[test]
    fn test_invalid_bodies_are_rejected() {
        let invalid = RouterRequest::new("POST", "/items").with_body("{not json");
        assert!(matches!(invalid.json_object(), Err(ApiError::InvalidJson)));

        let bad_base64 = RouterRequest::new("POST", "/items")
            .with_body("%%%")
            .base64_encoded();
        assert!(matches!(bad_base64.json_object(), Err(ApiError::InvalidJson)));

        let array = RouterRequest::new("POST", "/items").with_body("[1, 2]");
        assert!(matches!(array.json_object(), Err(ApiError::NotAnObject)));
    }

    #[test]
    fn test_request_from_proxy_event() {
        let event = json!({
            "httpMethod": "PUT",
            "path": "/items/abc",
            "body": "eyJub3RlIjoieCJ9",
            "isBase64Encoded": true,
            "headers": {"content-type": "application/json"}
        });

        let request: RouterRequest = serde_json::from_value(event).unwrap();
        assert_eq!(request.method, "PUT");
        assert_eq!(request.path, "/items/abc");
        assert_eq!(request.json_object().unwrap()["note"], json!("x"));
    }

    #[test]
    fn test_response_carries_standard_headers() {
        let response = RouterResponse::json(StatusCode::OK, &json!({"ok": true}));
        let value = serde_json::to_value(&response).unwrap();

        assert_eq!(value["statusCode"], json!(200));
        assert_eq!(value["headers"]["Content-Type"], json!("application/json"));
        assert_eq!(value["headers"]["Access-Control-Allow-Origin"], json!("*"));
        assert_eq!(value["body"], json!(r#"{"ok":true}"#));

        let preflight = RouterResponse::no_content();
        assert_eq!(preflight.status(), StatusCode::NO_CONTENT);
        assert!(preflight.body.is_empty());
    }
}
