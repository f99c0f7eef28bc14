use utoipa::OpenApi;

use crate::error::ErrorResponse;
use crate::handlers;
use crate::models::{HealthResponse, Item, ItemResponse, ListResponse};

/// OpenAPI documentation
#[derive(OpenApi)]
#[openapi(
    info(
        title = "rust-spanner-items API",
        version = "1.0.0",
        description = "A minimal item CRUD service backed by Google Cloud Spanner"
    ),
    paths(
        handlers::health::health_handler,
        handlers::create::create_handler,
        handlers::list::list_handler,
        handlers::get::get_handler,
        handlers::update::update_handler,
        handlers::delete::delete_handler
    ),
    components(
        schemas(
            Item,
            ItemResponse,
            ListResponse,
            HealthResponse,
            ErrorResponse
        )
    ),
    tags(
        (name = "health", description = "Health check operations"),
        (name = "items", description = "Item operations")
    )
)]
pub struct ApiDoc;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_openapi_lists_item_routes() {
        let doc = ApiDoc::openapi();
        let paths = &doc.paths.paths;

        assert!(paths.contains_key("/health"));
        assert!(paths.contains_key("/items"));
        assert!(paths.contains_key("/items/{id}"));

        let item = &paths["/items/{id}"];
        assert!(item.get.is_some());
        assert!(item.put.is_some());
        assert!(item.delete.is_some());

        let json = doc.to_pretty_json().unwrap();
        assert!(json.contains("ItemResponse"));
    }
}
