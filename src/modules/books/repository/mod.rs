use std::sync::Arc;

use async_trait::async_trait;
use bookshelf_http::error::AppError;
use mongodb::bson::oid::ObjectId;

use super::models::{Book, BookFields};

/// In-memory repository implementation.
pub mod memory;
/// MongoDB repository implementation.
pub mod mongo;

pub use memory::MemoryBookRepository;
pub use mongo::MongoBookRepository;

#[derive(thiserror::Error, Debug)]
pub enum BookRepositoryError {
    #[error("database failure: {0}")]
    Database(#[from] mongodb::error::Error),

    #[error("{0}")]
    Other(String),
}

/// Persistence operations behind the book endpoints.
///
/// Each call is a single attempt; implementations never retry.
#[async_trait]
pub trait BookRepository: Send + Sync {
    /// Every stored book, in storage order.
    async fn list(&self) -> Result<Vec<Book>, BookRepositoryError>;

    /// Store a new book built from `fields` under a fresh identifier.
    async fn create(&self, fields: BookFields) -> Result<Book, BookRepositoryError>;

    /// Overwrite the present `fields` of the book with `id` in one atomic
    /// step. Returns the updated book, or `None` when no such book exists.
    async fn update(
        &self,
        id: ObjectId,
        fields: BookFields,
    ) -> Result<Option<Book>, BookRepositoryError>;

    /// Remove the book with `id`; `false` when there was none.
    async fn delete(&self, id: ObjectId) -> Result<bool, BookRepositoryError>;
}

/// Shared handle injected into the books module.
pub type BookRepositoryArc = Arc<dyn BookRepository>;

impl From<BookRepositoryError> for AppError {
    fn from(err: BookRepositoryError) -> Self {
        AppError::Internal(anyhow::Error::new(err))
    }
}
