use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::RwLock;

use crate::{
    error::{AppError, AppResult},
    models::{Author, AuthorId, Book, BookId, Favorite, UserId},
};

use super::{Catalog, FavoriteStore};

/// In-process store backing both the catalog and favorites
///
/// Cloning is cheap; clones share the same data.
#[derive(Clone, Default)]
pub struct MemoryStore {
    inner: Arc<RwLock<MemoryStoreInner>>,
}

#[derive(Default)]
struct MemoryStoreInner {
    authors: BTreeMap<AuthorId, Author>,
    books: BTreeMap<BookId, Book>,
    favorites: Vec<Favorite>,
    last_author_id: AuthorId,
    last_book_id: BookId,
    last_favorite_id: i64,
}

impl MemoryStore {
    /// Creates a new empty store
    pub fn new() -> Self {
        Self::default()
    }
}

impl MemoryStoreInner {
    fn author_name(&self, id: AuthorId) -> Option<&str> {
        self.authors.get(&id).map(|a| a.name.as_str())
    }

    fn ensure_author(&self, id: AuthorId) -> AppResult<()> {
        if self.authors.contains_key(&id) {
            Ok(())
        } else {
            Err(AppError::InvalidInput(format!("Author {} does not exist", id)))
        }
    }

    fn remove_book(&mut self, id: BookId) -> bool {
        let removed = self.books.remove(&id).is_some();
        if removed {
            self.favorites.retain(|f| f.book_id != id);
        }
        removed
    }
}

#[async_trait]
impl Catalog for MemoryStore {
    async fn get_book(&self, id: BookId) -> AppResult<Option<Book>> {
        let inner = self.inner.read().await;
        Ok(inner.books.get(&id).cloned())
    }

    async fn list_books(&self, exclude_title: Option<&str>) -> AppResult<Vec<Book>> {
        let inner = self.inner.read().await;
        let books = inner
            .books
            .values()
            .filter(|b| exclude_title.map_or(true, |t| b.title != t))
            .cloned()
            .collect();
        Ok(books)
    }

    async fn search_books(&self, query: &str) -> AppResult<Vec<Book>> {
        let needle = query.to_lowercase();
        let inner = self.inner.read().await;
        let books = inner
            .books
            .values()
            .filter(|b| {
                b.title.to_lowercase().contains(&needle)
                    || inner
                        .author_name(b.author_id)
                        .is_some_and(|name| name.to_lowercase().contains(&needle))
            })
            .cloned()
            .collect();
        Ok(books)
    }

    async fn create_book(&self, title: &str, author_id: AuthorId) -> AppResult<Book> {
        let mut inner = self.inner.write().await;
        inner.ensure_author(author_id)?;

        inner.last_book_id += 1;
        let book = Book {
            id: inner.last_book_id,
            title: title.to_string(),
            author_id,
        };
        inner.books.insert(book.id, book.clone());
        Ok(book)
    }

    async fn update_book(
        &self,
        id: BookId,
        title: &str,
        author_id: AuthorId,
    ) -> AppResult<Option<Book>> {
        let mut inner = self.inner.write().await;
        if !inner.books.contains_key(&id) {
            return Ok(None);
        }
        inner.ensure_author(author_id)?;

        let book = Book {
            id,
            title: title.to_string(),
            author_id,
        };
        inner.books.insert(id, book.clone());
        Ok(Some(book))
    }

    async fn delete_book(&self, id: BookId) -> AppResult<bool> {
        let mut inner = self.inner.write().await;
        Ok(inner.remove_book(id))
    }

    async fn list_authors(&self) -> AppResult<Vec<Author>> {
        let inner = self.inner.read().await;
        Ok(inner.authors.values().cloned().collect())
    }

    async fn get_author(&self, id: AuthorId) -> AppResult<Option<Author>> {
        let inner = self.inner.read().await;
        Ok(inner.authors.get(&id).cloned())
    }

    async fn create_author(&self, name: &str) -> AppResult<Author> {
        let mut inner = self.inner.write().await;
        inner.last_author_id += 1;
        let author = Author {
            id: inner.last_author_id,
            name: name.to_string(),
        };
        inner.authors.insert(author.id, author.clone());
        Ok(author)
    }

    async fn update_author(&self, id: AuthorId, name: &str) -> AppResult<Option<Author>> {
        let mut inner = self.inner.write().await;
        Ok(inner.authors.get_mut(&id).map(|author| {
            author.name = name.to_string();
            author.clone()
        }))
    }

    async fn delete_author(&self, id: AuthorId) -> AppResult<bool> {
        let mut inner = self.inner.write().await;
        if inner.authors.remove(&id).is_none() {
            return Ok(false);
        }

        let orphaned: Vec<BookId> = inner
            .books
            .values()
            .filter(|b| b.author_id == id)
            .map(|b| b.id)
            .collect();
        for book_id in orphaned {
            inner.remove_book(book_id);
        }
        Ok(true)
    }
}

#[async_trait]
impl FavoriteStore for MemoryStore {
    async fn count(&self, user_id: UserId) -> AppResult<usize> {
        let inner = self.inner.read().await;
        Ok(inner.favorites.iter().filter(|f| f.user_id == user_id).count())
    }

    async fn exists(&self, user_id: UserId, book_id: BookId) -> AppResult<bool> {
        let inner = self.inner.read().await;
        Ok(inner
            .favorites
            .iter()
            .any(|f| f.user_id == user_id && f.book_id == book_id))
    }

    async fn insert(
        &self,
        user_id: UserId,
        book_id: BookId,
        max_favorites: usize,
    ) -> AppResult<Favorite> {
        let mut inner = self.inner.write().await;
        if inner.favorites.iter().filter(|f| f.user_id == user_id).count() >= max_favorites {
            return Err(AppError::CapacityExceeded(max_favorites));
        }
        if !inner.books.contains_key(&book_id) {
            return Err(AppError::BookNotFound(book_id));
        }
        if inner
            .favorites
            .iter()
            .any(|f| f.user_id == user_id && f.book_id == book_id)
        {
            return Err(AppError::AlreadyFavorited);
        }

        inner.last_favorite_id += 1;
        let favorite = Favorite {
            id: inner.last_favorite_id,
            user_id,
            book_id,
            created_at: Utc::now(),
        };
        inner.favorites.push(favorite.clone());
        Ok(favorite)
    }

    async fn delete(&self, user_id: UserId, book_id: BookId) -> AppResult<bool> {
        let mut inner = self.inner.write().await;
        let before = inner.favorites.len();
        inner
            .favorites
            .retain(|f| !(f.user_id == user_id && f.book_id == book_id));
        Ok(inner.favorites.len() < before)
    }

    async fn list(&self, user_id: UserId) -> AppResult<Vec<Favorite>> {
        let inner = self.inner.read().await;
        Ok(inner
            .favorites
            .iter()
            .filter(|f| f.user_id == user_id)
            .cloned()
            .collect())
    }
}
