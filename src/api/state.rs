use std::sync::Arc;

use crate::{
    db::{Catalog, FavoriteStore, MemoryStore},
    services::{FavoritesService, DEFAULT_MAX_FAVORITES, DEFAULT_RECOMMENDATION_LIMIT},
};

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub catalog: Arc<dyn Catalog>,
    pub favorites: Arc<FavoritesService>,
}

impl Default for AppState {
    fn default() -> Self {
        Self::in_memory(DEFAULT_MAX_FAVORITES, DEFAULT_RECOMMENDATION_LIMIT)
    }
}

impl AppState {
    /// Wires the catalog and favorites service over the given backends
    pub fn new(
        catalog: Arc<dyn Catalog>,
        store: Arc<dyn FavoriteStore>,
        max_favorites: usize,
        recommendation_limit: usize,
    ) -> Self {
        let favorites = Arc::new(FavoritesService::new(
            catalog.clone(),
            store,
            max_favorites,
            recommendation_limit,
        ));
        Self { catalog, favorites }
    }

    /// Creates state over a fresh, empty in-memory store
    pub fn in_memory(max_favorites: usize, recommendation_limit: usize) -> Self {
        let store = Arc::new(MemoryStore::new());
        Self::new(store.clone(), store, max_favorites, recommendation_limit)
    }
}
