use serde::{Deserialize, Serialize};

use super::{AuthorId, BookId};

/// A catalog book
///
/// The recommendation engine only reads books; it never creates or edits them.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, sqlx::FromRow)]
pub struct Book {
    /// Unique identifier for the book
    pub id: BookId,
    /// Title used as the book's text for similarity matching
    pub title: String,
    /// Author who wrote the book
    pub author_id: AuthorId,
}
