use std::{collections::BTreeMap, sync::Arc};

use async_trait::async_trait;
use mongodb::bson::oid::ObjectId;
use tokio::sync::RwLock;

use super::{BookRepository, BookRepositoryError};
use crate::modules::books::models::{Book, BookFields};

/// Process-local book storage, ordered by identifier (and so by creation).
#[derive(Debug, Clone, Default)]
pub struct MemoryBookRepository {
    books: Arc<RwLock<BTreeMap<ObjectId, Book>>>,
}

impl MemoryBookRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Repository pre-populated with `books`.
    pub fn with_data(books: Vec<Book>) -> Self {
        Self {
            books: Arc::new(RwLock::new(
                books.into_iter().map(|book| (book.id, book)).collect(),
            )),
        }
    }
}

#[async_trait]
impl BookRepository for MemoryBookRepository {
    async fn list(&self) -> Result<Vec<Book>, BookRepositoryError> {
        Ok(self.books.read().await.values().cloned().collect())
    }

    async fn create(&self, fields: BookFields) -> Result<Book, BookRepositoryError> {
        let book = Book::new(ObjectId::new(), fields);
        self.books.write().await.insert(book.id, book.clone());
        Ok(book)
    }

    async fn update(
        &self,
        id: ObjectId,
        fields: BookFields,
    ) -> Result<Option<Book>, BookRepositoryError> {
        let mut books = self.books.write().await;
        Ok(books.get_mut(&id).map(|book| {
            book.merge(fields);
            book.clone()
        }))
    }

    async fn delete(&self, id: ObjectId) -> Result<bool, BookRepositoryError> {
        Ok(self.books.write().await.remove(&id).is_some())
    }
}
