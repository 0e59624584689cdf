pub mod handlers;
pub mod models;
pub mod repository;
pub mod validation;

use async_trait::async_trait;
use axum::Router;
use bookshelf_kernel::{InitCtx, Module};
use serde_json::json;

use repository::BookRepositoryArc;

/// Books module: CRUD endpoints over the injected repository
pub struct BooksModule {
    repository: BookRepositoryArc,
}

impl BooksModule {
    pub fn new(repository: BookRepositoryArc) -> Self {
        Self { repository }
    }
}

#[async_trait]
impl Module for BooksModule {
    fn name(&self) -> &'static str {
        "books"
    }

    async fn init(&self, ctx: &InitCtx<'_>) -> anyhow::Result<()> {
        tracing::info!(
            module = self.name(),
            environment = ?ctx.settings.environment,
            backend = ?ctx.settings.database.backend,
            "books module initialized"
        );
        Ok(())
    }

    fn routes(&self) -> Router {
        handlers::router(self.repository.clone())
    }

    fn openapi(&self) -> Option<serde_json::Value> {
        Some(openapi_fragment())
    }

    async fn start(&self, _ctx: &InitCtx<'_>) -> anyhow::Result<()> {
        tracing::info!(module = self.name(), "books module started");
        Ok(())
    }

    async fn stop(&self) -> anyhow::Result<()> {
        tracing::info!(module = self.name(), "books module stopped");
        Ok(())
    }
}

fn json_response(description: &str, schema: serde_json::Value) -> serde_json::Value {
    json!({
        "description": description,
        "content": {
            "application/json": {
                "schema": schema
            }
        }
    })
}

fn schema_ref(name: &str) -> serde_json::Value {
    json!({ "$ref": format!("#/components/schemas/{}", name) })
}

fn openapi_fragment() -> serde_json::Value {
    let id_parameter = json!({
        "name": "id",
        "in": "path",
        "required": true,
        "description": "24-character hexadecimal book identifier",
        "schema": { "type": "string", "pattern": "^[0-9a-fA-F]{24}$" }
    });
    let book_body = json!({
        "content": {
            "application/json": {
                "schema": schema_ref("BookFields")
            }
        }
    });
    let server_error = json_response("Internal server error", json!({ "type": "string" }));

    json!({
        "paths": {
            "/books": {
                "get": {
                    "summary": "List books",
                    "tags": ["Books"],
                    "responses": {
                        "200": json_response("All stored books", schema_ref("BookList")),
                        "500": server_error
                    }
                },
                "post": {
                    "summary": "Create a book",
                    "tags": ["Books"],
                    "requestBody": book_body,
                    "responses": {
                        "200": json_response("The created book", schema_ref("Book")),
                        "400": json_response("Validation errors", schema_ref("ValidationErrorResponse")),
                        "500": server_error
                    }
                }
            },
            "/books/{id}": {
                "put": {
                    "summary": "Update the supplied fields of a book",
                    "tags": ["Books"],
                    "parameters": [id_parameter],
                    "requestBody": book_body,
                    "responses": {
                        "200": json_response("The updated book", schema_ref("Book")),
                        "400": json_response(
                            "Validation errors, malformed id, or empty body",
                            json!({
                                "oneOf": [
                                    schema_ref("ValidationErrorResponse"),
                                    schema_ref("MessageResponse")
                                ]
                            })
                        ),
                        "404": json_response("Book not found", schema_ref("MessageResponse")),
                        "500": server_error
                    }
                },
                "delete": {
                    "summary": "Delete a book",
                    "tags": ["Books"],
                    "parameters": [id_parameter],
                    "responses": {
                        "200": json_response("Confirmation", json!({ "type": "string" })),
                        "400": json_response("Malformed id", schema_ref("MessageResponse")),
                        "404": json_response("Book not found", schema_ref("MessageResponse")),
                        "500": server_error
                    }
                }
            }
        },
        "components": {
            "schemas": {
                "Book": {
                    "type": "object",
                    "properties": {
                        "_id": {
                            "type": "string",
                            "description": "Identifier assigned at creation"
                        },
                        "title": {
                            "type": "string",
                            "description": "Title of the book"
                        },
                        "author": {
                            "type": "string",
                            "description": "Author of the book"
                        },
                        "rating": {
                            "type": "integer",
                            "format": "int64",
                            "description": "Rating given to the book"
                        }
                    },
                    "required": ["_id"]
                },
                "BookFields": {
                    "type": "object",
                    "properties": {
                        "title": { "type": "string" },
                        "author": { "type": "string" },
                        "rating": { "type": "integer", "format": "int64" }
                    }
                },
                "BookList": {
                    "type": "object",
                    "properties": {
                        "books": {
                            "type": "array",
                            "items": schema_ref("Book")
                        }
                    },
                    "required": ["books"]
                }
            }
        }
    })
}

/// Create a new instance of the books module
pub fn create_module(repository: BookRepositoryArc) -> std::sync::Arc<dyn Module> {
    std::sync::Arc::new(BooksModule::new(repository))
}
