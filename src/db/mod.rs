//! Persistence collaborators
//!
//! The favorites engine only talks to storage through the [`Catalog`] and
//! [`FavoriteStore`] traits. Two backends implement both: an in-memory store
//! used for development and tests, and PostgreSQL.
use async_trait::async_trait;

use crate::{
    error::AppResult,
    models::{Author, AuthorId, Book, BookId, Favorite, UserId},
};

pub mod memory;
pub mod postgres;

pub use memory::MemoryStore;
pub use postgres::{create_pool, run_migrations, PgStore};

/// Read and write access to authors and books
///
/// Listings are returned in ascending id order so that corpora built from
/// them are reproducible.
#[async_trait]
pub trait Catalog: Send + Sync {
    /// Look up a single book
    async fn get_book(&self, id: BookId) -> AppResult<Option<Book>>;

    /// List every book, skipping those whose title equals `exclude_title` exactly
    async fn list_books(&self, exclude_title: Option<&str>) -> AppResult<Vec<Book>>;

    /// Case-insensitive substring search over book titles and author names
    async fn search_books(&self, query: &str) -> AppResult<Vec<Book>>;

    async fn create_book(&self, title: &str, author_id: AuthorId) -> AppResult<Book>;

    async fn update_book(
        &self,
        id: BookId,
        title: &str,
        author_id: AuthorId,
    ) -> AppResult<Option<Book>>;

    /// Deletes the book and every favorite pointing at it
    async fn delete_book(&self, id: BookId) -> AppResult<bool>;

    async fn list_authors(&self) -> AppResult<Vec<Author>>;

    async fn get_author(&self, id: AuthorId) -> AppResult<Option<Author>>;

    async fn create_author(&self, name: &str) -> AppResult<Author>;

    async fn update_author(&self, id: AuthorId, name: &str) -> AppResult<Option<Author>>;

    /// Deletes the author along with their books and the favorites on them
    async fn delete_author(&self, id: AuthorId) -> AppResult<bool>;
}

/// Storage for favorite records
///
/// Implementations must reject a second record for the same (user, book) pair
/// with [`AppError::AlreadyFavorited`](crate::error::AppError::AlreadyFavorited).
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait FavoriteStore: Send + Sync {
    async fn count(&self, user_id: UserId) -> AppResult<usize>;

    async fn exists(&self, user_id: UserId, book_id: BookId) -> AppResult<bool>;

    /// Inserts unless the user already holds `max_favorites` records
    ///
    /// The count and the insert are atomic with respect to other inserts for
    /// the same user, across every process sharing the store.
    async fn insert(
        &self,
        user_id: UserId,
        book_id: BookId,
        max_favorites: usize,
    ) -> AppResult<Favorite>;

    /// Returns whether a record was removed
    async fn delete(&self, user_id: UserId, book_id: BookId) -> AppResult<bool>;

    /// All of the user's favorites in insertion order
    async fn list(&self, user_id: UserId) -> AppResult<Vec<Favorite>>;
}
