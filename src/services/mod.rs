pub mod favorites;
pub mod recommendations;

pub use favorites::{FavoritesService, DEFAULT_MAX_FAVORITES, DEFAULT_RECOMMENDATION_LIMIT};
pub use recommendations::Recommender;
