use async_trait::async_trait;
use sqlx::{postgres::PgPoolOptions, PgPool};

use crate::{
    error::{AppError, AppResult},
    models::{Author, AuthorId, Book, BookId, Favorite, UserId},
};

use super::{Catalog, FavoriteStore};

/// Connects to `database_url` with at most `max_connections` open connections
pub async fn create_pool(database_url: &str, max_connections: u32) -> anyhow::Result<PgPool> {
    let pool = PgPoolOptions::new()
        .max_connections(max_connections)
        .connect(database_url)
        .await?;

    Ok(pool)
}

/// Applies the embedded schema migrations
pub async fn run_migrations(pool: &PgPool) -> anyhow::Result<()> {
    sqlx::migrate!("./migrations").run(pool).await?;
    Ok(())
}

/// Catalog and favorites backed by PostgreSQL
///
/// Cascading deletes and the (user, book) uniqueness rule are enforced by the
/// schema in `migrations/`.
#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

/// Maps a foreign-key violation on `books.author_id` to a validation error
fn author_violation(author_id: AuthorId) -> impl FnOnce(sqlx::Error) -> AppError {
    move |e| {
        if let sqlx::Error::Database(db) = &e {
            if db.is_foreign_key_violation() {
                return AppError::InvalidInput(format!("Author {} does not exist", author_id));
            }
        }
        AppError::Database(e)
    }
}

#[async_trait]
impl Catalog for PgStore {
    async fn get_book(&self, id: BookId) -> AppResult<Option<Book>> {
        let book = sqlx::query_as::<_, Book>("SELECT id, title, author_id FROM books WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(book)
    }

    async fn list_books(&self, exclude_title: Option<&str>) -> AppResult<Vec<Book>> {
        let books = sqlx::query_as::<_, Book>(
            "SELECT id, title, author_id FROM books \
             WHERE $1::TEXT IS NULL OR title <> $1 \
             ORDER BY id",
        )
        .bind(exclude_title)
        .fetch_all(&self.pool)
        .await?;
        Ok(books)
    }

    async fn search_books(&self, query: &str) -> AppResult<Vec<Book>> {
        let books = sqlx::query_as::<_, Book>(
            "SELECT b.id, b.title, b.author_id FROM books b \
             JOIN authors a ON a.id = b.author_id \
             WHERE strpos(lower(b.title), lower($1)) > 0 \
                OR strpos(lower(a.name), lower($1)) > 0 \
             ORDER BY b.id",
        )
        .bind(query)
        .fetch_all(&self.pool)
        .await?;
        Ok(books)
    }

    async fn create_book(&self, title: &str, author_id: AuthorId) -> AppResult<Book> {
        sqlx::query_as::<_, Book>(
            "INSERT INTO books (title, author_id) VALUES ($1, $2) \
             RETURNING id, title, author_id",
        )
        .bind(title)
        .bind(author_id)
        .fetch_one(&self.pool)
        .await
        .map_err(author_violation(author_id))
    }

    async fn update_book(
        &self,
        id: BookId,
        title: &str,
        author_id: AuthorId,
    ) -> AppResult<Option<Book>> {
        sqlx::query_as::<_, Book>(
            "UPDATE books SET title = $2, author_id = $3 WHERE id = $1 \
             RETURNING id, title, author_id",
        )
        .bind(id)
        .bind(title)
        .bind(author_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(author_violation(author_id))
    }

    async fn delete_book(&self, id: BookId) -> AppResult<bool> {
        let result = sqlx::query("DELETE FROM books WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn list_authors(&self) -> AppResult<Vec<Author>> {
        let authors = sqlx::query_as::<_, Author>("SELECT id, name FROM authors ORDER BY id")
            .fetch_all(&self.pool)
            .await?;
        Ok(authors)
    }

    async fn get_author(&self, id: AuthorId) -> AppResult<Option<Author>> {
        let author = sqlx::query_as::<_, Author>("SELECT id, name FROM authors WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(author)
    }

    async fn create_author(&self, name: &str) -> AppResult<Author> {
        let author = sqlx::query_as::<_, Author>(
            "INSERT INTO authors (name) VALUES ($1) RETURNING id, name",
        )
        .bind(name)
        .fetch_one(&self.pool)
        .await?;
        Ok(author)
    }

    async fn update_author(&self, id: AuthorId, name: &str) -> AppResult<Option<Author>> {
        let author = sqlx::query_as::<_, Author>(
            "UPDATE authors SET name = $2 WHERE id = $1 RETURNING id, name",
        )
        .bind(id)
        .bind(name)
        .fetch_optional(&self.pool)
        .await?;
        Ok(author)
    }

    async fn delete_author(&self, id: AuthorId) -> AppResult<bool> {
        let result = sqlx::query("DELETE FROM authors WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}

#[async_trait]
impl FavoriteStore for PgStore {
    async fn count(&self, user_id: UserId) -> AppResult<usize> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM favorites WHERE user_id = $1")
            .bind(user_id)
            .fetch_one(&self.pool)
            .await?;
        Ok(count as usize)
    }

    async fn exists(&self, user_id: UserId, book_id: BookId) -> AppResult<bool> {
        let exists: bool = sqlx::query_scalar(
            "SELECT EXISTS(SELECT 1 FROM favorites WHERE user_id = $1 AND book_id = $2)",
        )
        .bind(user_id)
        .bind(book_id)
        .fetch_one(&self.pool)
        .await?;
        Ok(exists)
    }

    async fn insert(
        &self,
        user_id: UserId,
        book_id: BookId,
        max_favorites: usize,
    ) -> AppResult<Favorite> {
        let mut tx = self.pool.begin().await?;

        // Held until commit or rollback, so concurrent inserts for one user
        // see each other's rows when counting
        sqlx::query("SELECT pg_advisory_xact_lock($1)")
            .bind(user_id)
            .execute(&mut *tx)
            .await?;

        let favorite = sqlx::query_as::<_, Favorite>(
            "INSERT INTO favorites (user_id, book_id) \
             SELECT $1::BIGINT, $2::BIGINT \
             WHERE (SELECT COUNT(*) FROM favorites WHERE user_id = $1) < $3 \
             RETURNING id, user_id, book_id, created_at",
        )
        .bind(user_id)
        .bind(book_id)
        .bind(max_favorites as i64)
        .fetch_optional(&mut *tx)
        .await
        .map_err(|e| {
            if let sqlx::Error::Database(db) = &e {
                if db.is_unique_violation() {
                    return AppError::AlreadyFavorited;
                }
                if db.is_foreign_key_violation() {
                    return AppError::BookNotFound(book_id);
                }
            }
            AppError::Database(e)
        })?
        .ok_or(AppError::CapacityExceeded(max_favorites))?;

        tx.commit().await?;
        Ok(favorite)
    }

    async fn delete(&self, user_id: UserId, book_id: BookId) -> AppResult<bool> {
        let result = sqlx::query("DELETE FROM favorites WHERE user_id = $1 AND book_id = $2")
            .bind(user_id)
            .bind(book_id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn list(&self, user_id: UserId) -> AppResult<Vec<Favorite>> {
        let favorites = sqlx::query_as::<_, Favorite>(
            "SELECT id, user_id, book_id, created_at FROM favorites \
             WHERE user_id = $1 ORDER BY id",
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(favorites)
    }
}
