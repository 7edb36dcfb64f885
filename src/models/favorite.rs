use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{Book, BookId, UserId};

/// A book a user has marked as favorite
///
/// At most one record exists per (user, book) pair. Records are created and
/// deleted, never updated.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, sqlx::FromRow)]
pub struct Favorite {
    pub id: i64,
    pub user_id: UserId,
    pub book_id: BookId,
    pub created_at: DateTime<Utc>,
}

/// Outcome of a successful add: the stored favorite and books similar to it
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct FavoriteWithRecommendations {
    pub favorite: Favorite,
    /// Most similar books first
    pub recommended: Vec<Book>,
}
