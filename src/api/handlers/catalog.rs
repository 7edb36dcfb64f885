//! Author and book management handlers.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use serde::Deserialize;

use crate::{
    api::AppState,
    error::{AppError, AppResult},
    models::{Author, AuthorId, Book, BookId},
};

use super::validate_text;

#[derive(Debug, Deserialize)]
pub struct AuthorRequest {
    pub name: String,
}

#[derive(Debug, Deserialize)]
pub struct BookRequest {
    pub title: String,
    pub author_id: AuthorId,
}

#[derive(Debug, Deserialize)]
pub struct BookQuery {
    pub search: Option<String>,
}

fn author_not_found(id: AuthorId) -> AppError {
    AppError::NotFound(format!("Author {}", id))
}

fn book_not_found(id: BookId) -> AppError {
    AppError::NotFound(format!("Book {}", id))
}

/// List all authors
pub async fn list_authors(State(state): State<AppState>) -> AppResult<Json<Vec<Author>>> {
    Ok(Json(state.catalog.list_authors().await?))
}

/// Create a new author
pub async fn create_author(
    State(state): State<AppState>,
    Json(request): Json<AuthorRequest>,
) -> AppResult<(StatusCode, Json<Author>)> {
    let name = validate_text("name", &request.name)?;
    let author = state.catalog.create_author(&name).await?;
    tracing::info!(author_id = author.id, "Author created");
    Ok((StatusCode::CREATED, Json(author)))
}

pub async fn get_author(
    State(state): State<AppState>,
    Path(id): Path<AuthorId>,
) -> AppResult<Json<Author>> {
    state
        .catalog
        .get_author(id)
        .await?
        .map(Json)
        .ok_or_else(|| author_not_found(id))
}

pub async fn update_author(
    State(state): State<AppState>,
    Path(id): Path<AuthorId>,
    Json(request): Json<AuthorRequest>,
) -> AppResult<Json<Author>> {
    let name = validate_text("name", &request.name)?;
    state
        .catalog
        .update_author(id, &name)
        .await?
        .map(Json)
        .ok_or_else(|| author_not_found(id))
}

/// Delete an author together with their books
pub async fn delete_author(
    State(state): State<AppState>,
    Path(id): Path<AuthorId>,
) -> AppResult<StatusCode> {
    if !state.catalog.delete_author(id).await? {
        return Err(author_not_found(id));
    }
    tracing::info!(author_id = id, "Author deleted");
    Ok(StatusCode::NO_CONTENT)
}

/// List books, optionally filtered by a title or author-name substring
pub async fn list_books(
    State(state): State<AppState>,
    Query(query): Query<BookQuery>,
) -> AppResult<Json<Vec<Book>>> {
    let books = match query.search.as_deref().map(str::trim) {
        Some(search) if !search.is_empty() => state.catalog.search_books(search).await?,
        _ => state.catalog.list_books(None).await?,
    };
    Ok(Json(books))
}

/// Create a new book
pub async fn create_book(
    State(state): State<AppState>,
    Json(request): Json<BookRequest>,
) -> AppResult<(StatusCode, Json<Book>)> {
    let title = validate_text("title", &request.title)?;
    let book = state.catalog.create_book(&title, request.author_id).await?;
    tracing::info!(book_id = book.id, author_id = book.author_id, "Book created");
    Ok((StatusCode::CREATED, Json(book)))
}

pub async fn get_book(
    State(state): State<AppState>,
    Path(id): Path<BookId>,
) -> AppResult<Json<Book>> {
    state
        .catalog
        .get_book(id)
        .await?
        .map(Json)
        .ok_or_else(|| book_not_found(id))
}

pub async fn update_book(
    State(state): State<AppState>,
    Path(id): Path<BookId>,
    Json(request): Json<BookRequest>,
) -> AppResult<Json<Book>> {
    let title = validate_text("title", &request.title)?;
    state
        .catalog
        .update_book(id, &title, request.author_id)
        .await?
        .map(Json)
        .ok_or_else(|| book_not_found(id))
}

/// Delete a book; favorites pointing at it go with it
pub async fn delete_book(
    State(state): State<AppState>,
    Path(id): Path<BookId>,
) -> AppResult<StatusCode> {
    if !state.catalog.delete_book(id).await? {
        return Err(book_not_found(id));
    }
    tracing::info!(book_id = id, "Book deleted");
    Ok(StatusCode::NO_CONTENT)
}
