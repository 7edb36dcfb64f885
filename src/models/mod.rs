mod author;
mod book;
mod favorite;

pub use author::Author;
pub use book::Book;
pub use favorite::{Favorite, FavoriteWithRecommendations};

/// Opaque identifier of the user owning favorites
pub type UserId = i64;

/// Primary key of a catalog book
pub type BookId = i64;

/// Primary key of an author record
pub type AuthorId = i64;

/// Maximum length of author names and book titles
pub const MAX_TEXT_LEN: usize = 255;
