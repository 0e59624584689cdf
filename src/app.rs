//! Process bootstrap: storage selection, module lifecycle and serving.

use std::future::Future;
use std::sync::Arc;

use bookshelf_db::DbHandle;
use bookshelf_kernel::settings::{DatabaseBackend, Settings};
use bookshelf_kernel::{InitCtx, ModuleRegistry};

use crate::modules;
use crate::modules::books::repository::{
    BookRepositoryArc, MemoryBookRepository, MongoBookRepository,
};

/// Build the registry for `settings`: the storage backend plus every module.
///
/// With the MongoDB backend the connection handle is registered as the core
/// `db` module so the registry owns its init and teardown.
pub async fn build_registry(settings: &Settings) -> anyhow::Result<ModuleRegistry> {
    let mut registry = ModuleRegistry::new();

    let books: BookRepositoryArc = match settings.database.backend {
        DatabaseBackend::Mongo => {
            let handle = DbHandle::connect(settings).await?;
            let repository = MongoBookRepository::new(&handle);
            registry.register_core(bookshelf_db::create_module(handle));
            Arc::new(repository)
        }
        DatabaseBackend::Memory => {
            tracing::warn!("using in-memory book storage; records are lost on exit");
            Arc::new(MemoryBookRepository::new())
        }
    };

    modules::register_all(&mut registry, books);
    Ok(registry)
}

/// Run every module and serve HTTP until `shutdown` resolves, then stop the
/// modules in reverse order.
pub async fn serve<F>(settings: &Settings, shutdown: F) -> anyhow::Result<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    let registry = build_registry(settings).await?;
    let ctx = InitCtx { settings };

    registry.init_all(&ctx).await?;
    registry.start_all(&ctx).await?;

    let served = bookshelf_http::start_server(&registry, settings, shutdown).await;

    registry.stop_all().await?;
    tracing::info!("bookshelf-app shutdown complete");
    served
}

/// [`serve`] until SIGINT or SIGTERM.
pub async fn run(settings: &Settings) -> anyhow::Result<()> {
    serve(settings, bookshelf_http::shutdown_signal()).await
}

#[cfg(test)]
mod tests {
    use super::*;

    fn memory_settings() -> Settings {
        let mut settings = Settings::default();
        settings.database.backend = DatabaseBackend::Memory;
        settings.server.host = "127.0.0.1".to_string();
        settings.server.port = 0;
        settings
    }

    #[tokio::test]
    async fn memory_backend_registers_only_books() {
        let registry = build_registry(&memory_settings()).await.unwrap();
        assert!(registry.get_module("books").is_some());
        assert!(registry.get_module("db").is_none());
    }

    #[tokio::test]
    async fn mongo_backend_registers_db_module() {
        let registry = build_registry(&Settings::default()).await.unwrap();
        assert!(registry.get_module("db").is_some());
        assert!(registry.get_module("books").is_some());
    }

    #[tokio::test]
    async fn swagger_document_lists_book_routes() {
        use axum::body::{to_bytes, Body};
        use axum::http::{Request, StatusCode};
        use tower::ServiceExt;

        let settings = memory_settings();
        let registry = build_registry(&settings).await.unwrap();
        let router = bookshelf_http::build_router(&registry, &settings);

        let response = router
            .oneshot(
                Request::builder()
                    .uri("/api-docs/openapi.json")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let spec: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        assert!(spec["paths"]["/books"]["post"].is_object());
        assert!(spec["paths"]["/books/{id}"]["delete"].is_object());
        assert!(spec["components"]["schemas"]["Book"].is_object());
    }

    #[tokio::test]
    async fn serve_returns_after_shutdown() {
        serve(&memory_settings(), async {}).await.unwrap();
    }
}
