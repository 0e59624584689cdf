use async_trait::async_trait;
use bookshelf_db::DbHandle;
use futures::TryStreamExt;
use mongodb::{
    bson::{doc, oid::ObjectId, Document},
    options::ReturnDocument,
    Collection,
};
use serde::{Deserialize, Serialize};

use super::{BookRepository, BookRepositoryError};
use crate::modules::books::models::{Book, BookFields};

const COLLECTION: &str = "books";

/// Stored shape of a book in the `books` collection.
#[derive(Debug, Serialize, Deserialize)]
struct BookDocument {
    #[serde(rename = "_id")]
    id: ObjectId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    author: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    rating: Option<i64>,
}

impl From<BookDocument> for Book {
    fn from(document: BookDocument) -> Self {
        Self {
            id: document.id,
            title: document.title,
            author: document.author,
            rating: document.rating,
        }
    }
}

impl From<&Book> for BookDocument {
    fn from(book: &Book) -> Self {
        Self {
            id: book.id,
            title: book.title.clone(),
            author: book.author.clone(),
            rating: book.rating,
        }
    }
}

/// `$set` body holding only the supplied fields.
fn set_document(fields: BookFields) -> Document {
    let mut set = Document::new();
    if let Some(title) = fields.title {
        set.insert("title", title);
    }
    if let Some(author) = fields.author {
        set.insert("author", author);
    }
    if let Some(rating) = fields.rating {
        set.insert("rating", rating);
    }
    set
}

/// Books stored in the `books` collection of the configured database.
#[derive(Debug, Clone)]
pub struct MongoBookRepository {
    collection: Collection<BookDocument>,
}

impl MongoBookRepository {
    pub fn new(db: &DbHandle) -> Self {
        Self {
            collection: db.collection(COLLECTION),
        }
    }
}

#[async_trait]
impl BookRepository for MongoBookRepository {
    async fn list(&self) -> Result<Vec<Book>, BookRepositoryError> {
        let documents: Vec<BookDocument> = self.collection.find(doc! {}).await?.try_collect().await?;
        Ok(documents.into_iter().map(Book::from).collect())
    }

    async fn create(&self, fields: BookFields) -> Result<Book, BookRepositoryError> {
        let book = Book::new(ObjectId::new(), fields);
        self.collection.insert_one(BookDocument::from(&book)).await?;
        Ok(book)
    }

    async fn update(
        &self,
        id: ObjectId,
        fields: BookFields,
    ) -> Result<Option<Book>, BookRepositoryError> {
        let set = set_document(fields);
        if set.is_empty() {
            let document = self.collection.find_one(doc! { "_id": id }).await?;
            return Ok(document.map(Book::from));
        }

        let document = self
            .collection
            .find_one_and_update(doc! { "_id": id }, doc! { "$set": set })
            .return_document(ReturnDocument::After)
            .await?;
        Ok(document.map(Book::from))
    }

    async fn delete(&self, id: ObjectId) -> Result<bool, BookRepositoryError> {
        let result = self.collection.delete_one(doc! { "_id": id }).await?;
        Ok(result.deleted_count > 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bookshelf_kernel::settings::{Environment, Settings};
    use mongodb::bson::Bson;

    #[test]
    fn set_document_contains_only_present_fields() {
        let set = set_document(BookFields {
            title: None,
            author: Some(String::new()),
            rating: Some(0),
        });
        assert_eq!(set, doc! { "author": "", "rating": 0_i64 });
        assert!(matches!(set.get("rating"), Some(Bson::Int64(0))));
    }

    #[test]
    fn document_conversion_keeps_fields() {
        let book = Book::new(
            ObjectId::new(),
            BookFields {
                title: Some("Learn X".to_string()),
                author: None,
                rating: Some(5),
            },
        );
        let round_tripped = Book::from(BookDocument::from(&book));
        assert_eq!(round_tripped, book);
    }

    #[tokio::test]
    #[ignore = "requires a MongoDB server on 127.0.0.1:27017"]
    async fn crud_against_local_server() {
        let mut settings = Settings::default();
        settings.environment = Environment::Test;
        let handle = DbHandle::connect(&settings).await.unwrap();
        let repository = MongoBookRepository::new(&handle);
        repository.collection.drop().await.unwrap();

        let created = repository
            .create(BookFields {
                title: Some("Learn X".to_string()),
                author: Some("A".to_string()),
                rating: Some(5),
            })
            .await
            .unwrap();

        let updated = repository
            .update(
                created.id,
                BookFields {
                    rating: Some(0),
                    ..BookFields::default()
                },
            )
            .await
            .unwrap()
            .unwrap();
        assert_eq!(updated.title.as_deref(), Some("Learn X"));
        assert_eq!(updated.rating, Some(0));

        assert!(repository.delete(created.id).await.unwrap());
        assert!(!repository.delete(created.id).await.unwrap());
        assert!(repository.list().await.unwrap().is_empty());

        handle.shutdown().await;
    }
}
