use axum::{
    extract::{rejection::PathRejection, Path, State},
    routing::{get, put},
    Json, Router,
};
use bookshelf_http::error::AppError;
use mongodb::bson::oid::ObjectId;

use super::models::{Book, BookList};
use super::repository::BookRepositoryArc;
use super::validation::ValidatedBook;

pub const BOOK_NOT_FOUND: &str = "Book not found";
pub const EMPTY_BODY: &str = "Request body is empty";
pub const UPDATE_BAD_ID: &str = "Id is not a mongoose Object_Id";
pub const DELETE_BAD_ID: &str = "Id is not a mongo Object_Id";
pub const BOOK_DELETED: &str = "Book deleted";

#[derive(Clone)]
struct BooksState {
    repository: BookRepositoryArc,
}

/// Routes for `/books` and `/books/{id}` backed by `repository`
pub fn router(repository: BookRepositoryArc) -> Router {
    Router::new()
        .route("/books", get(list_books).post(create_book))
        .route("/books/{id}", put(update_book).delete(delete_book))
        .with_state(BooksState { repository })
}

/// An id segment that does not even decode (e.g. `%FF`) is as malformed as
/// one that is not hex.
fn parse_id(
    raw: Result<Path<String>, PathRejection>,
    message: &'static str,
) -> Result<ObjectId, AppError> {
    let Ok(Path(raw)) = raw else {
        return Err(AppError::bad_request(message));
    };
    ObjectId::parse_str(&raw).map_err(|_| AppError::bad_request(message))
}

async fn list_books(State(state): State<BooksState>) -> Result<Json<BookList>, AppError> {
    let books = state.repository.list().await?;
    tracing::debug!(count = books.len(), "listed books");
    Ok(Json(BookList { books }))
}

async fn create_book(
    State(state): State<BooksState>,
    ValidatedBook(fields): ValidatedBook,
) -> Result<Json<Book>, AppError> {
    let book = state.repository.create(fields).await?;
    tracing::info!(book_id = %book.id, "book created");
    Ok(Json(book))
}

/// Preconditions run in order: identifier format, non-empty payload, then
/// existence, which the repository checks atomically with the write.
async fn update_book(
    State(state): State<BooksState>,
    id: Result<Path<String>, PathRejection>,
    ValidatedBook(fields): ValidatedBook,
) -> Result<Json<Book>, AppError> {
    let id = parse_id(id, UPDATE_BAD_ID)?;

    if fields.is_empty() {
        return Err(AppError::bad_request(EMPTY_BODY));
    }

    match state.repository.update(id, fields).await? {
        Some(book) => {
            tracing::info!(book_id = %id, "book updated");
            Ok(Json(book))
        }
        None => Err(AppError::not_found(BOOK_NOT_FOUND)),
    }
}

async fn delete_book(
    State(state): State<BooksState>,
    id: Result<Path<String>, PathRejection>,
) -> Result<Json<&'static str>, AppError> {
    let id = parse_id(id, DELETE_BAD_ID)?;

    if state.repository.delete(id).await? {
        tracing::info!(book_id = %id, "book deleted");
        Ok(Json(BOOK_DELETED))
    } else {
        Err(AppError::not_found(BOOK_NOT_FOUND))
    }
}
