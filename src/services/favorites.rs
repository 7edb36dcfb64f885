use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};

use crate::{
    db::{Catalog, FavoriteStore},
    error::{AppError, AppResult},
    models::{Book, BookId, Favorite, FavoriteWithRecommendations, UserId},
};

use super::recommendations::Recommender;

/// Favorites a user may hold unless configured otherwise
pub const DEFAULT_MAX_FAVORITES: usize = 20;

/// Books returned with a new favorite unless configured otherwise
pub const DEFAULT_RECOMMENDATION_LIMIT: usize = 5;

/// One async mutex per user, created on first use
///
/// Holding a user's guard serializes the capacity check and insert of
/// concurrent adds for that user while other users proceed in parallel.
/// An entry lives only while some request holds or awaits it.
#[derive(Default)]
struct UserLocks {
    locks: Mutex<HashMap<UserId, Arc<AsyncMutex<()>>>>,
}

impl UserLocks {
    async fn acquire(&self, user_id: UserId) -> UserGuard<'_> {
        let lock = {
            let mut locks = self.locks.lock().unwrap_or_else(|e| e.into_inner());
            locks.entry(user_id).or_default().clone()
        };
        UserGuard {
            locks: self,
            user_id,
            guard: Some(lock.lock_owned().await),
        }
    }

    fn release(&self, user_id: UserId) {
        let mut locks = self.locks.lock().unwrap_or_else(|e| e.into_inner());
        // Waiters hold their own clone, so a count of one is the map's alone
        if locks
            .get(&user_id)
            .is_some_and(|lock| Arc::strong_count(lock) == 1)
        {
            locks.remove(&user_id);
        }
    }

    #[cfg(test)]
    fn len(&self) -> usize {
        self.locks.lock().unwrap_or_else(|e| e.into_inner()).len()
    }
}

/// Exclusive access to one user's favorites, evicting its lock on drop
struct UserGuard<'a> {
    locks: &'a UserLocks,
    user_id: UserId,
    guard: Option<OwnedMutexGuard<()>>,
}

impl Drop for UserGuard<'_> {
    fn drop(&mut self) {
        drop(self.guard.take());
        self.locks.release(self.user_id);
    }
}

/// Owns the favorite invariants and triggers recommendations on add
pub struct FavoritesService {
    catalog: Arc<dyn Catalog>,
    store: Arc<dyn FavoriteStore>,
    recommender: Recommender,
    locks: UserLocks,
    max_favorites: usize,
}

impl FavoritesService {
    pub fn new(
        catalog: Arc<dyn Catalog>,
        store: Arc<dyn FavoriteStore>,
        max_favorites: usize,
        recommendation_limit: usize,
    ) -> Self {
        let recommender = Recommender::new(catalog.clone(), store.clone(), recommendation_limit);
        Self {
            catalog,
            store,
            recommender,
            locks: UserLocks::default(),
            max_favorites,
        }
    }

    /// Marks `book_id` as a favorite of `user_id` and returns similar books
    ///
    /// The favorite is committed before recommendations are computed. If the
    /// recommendation step fails the favorite stays and the list is empty.
    #[tracing::instrument(skip(self))]
    pub async fn add_favorite(
        &self,
        user_id: UserId,
        book_id: BookId,
    ) -> AppResult<FavoriteWithRecommendations> {
        let (favorite, book) = {
            let _guard = self.locks.acquire(user_id).await;

            let count = self.store.count(user_id).await?;
            if count >= self.max_favorites {
                tracing::info!(count, "Favorite capacity reached");
                return Err(AppError::CapacityExceeded(self.max_favorites));
            }
            if self.store.exists(user_id, book_id).await? {
                return Err(AppError::AlreadyFavorited);
            }
            let book = self
                .catalog
                .get_book(book_id)
                .await?
                .ok_or(AppError::BookNotFound(book_id))?;

            let favorite = self
                .store
                .insert(user_id, book_id, self.max_favorites)
                .await?;
            (favorite, book)
        };

        tracing::info!(favorite_id = favorite.id, "Favorite added");

        let recommended = self.recommend_or_empty(user_id, &book).await;
        Ok(FavoriteWithRecommendations {
            favorite,
            recommended,
        })
    }

    /// Removes the (user, book) favorite
    #[tracing::instrument(skip(self))]
    pub async fn remove_favorite(&self, user_id: UserId, book_id: BookId) -> AppResult<()> {
        if !self.store.delete(user_id, book_id).await? {
            return Err(AppError::NotFavorited);
        }
        tracing::info!("Favorite removed");
        Ok(())
    }

    /// All favorites of `user_id` in insertion order
    pub async fn list_favorites(&self, user_id: UserId) -> AppResult<Vec<Favorite>> {
        self.store.list(user_id).await
    }

    /// Recommendations for `book_id` without recording a favorite
    #[tracing::instrument(skip(self))]
    pub async fn recommendations_for(
        &self,
        user_id: UserId,
        book_id: BookId,
    ) -> AppResult<Vec<Book>> {
        let book = self
            .catalog
            .get_book(book_id)
            .await?
            .ok_or(AppError::BookNotFound(book_id))?;
        Ok(self.recommend_or_empty(user_id, &book).await)
    }

    async fn recommend_or_empty(&self, user_id: UserId, anchor: &Book) -> Vec<Book> {
        match self.recommender.recommend(user_id, anchor).await {
            Ok(books) => books,
            Err(e) => {
                tracing::warn!(error = %e, "Recommendation failed, returning none");
                Vec::new()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{MemoryStore, MockFavoriteStore};
    use chrono::Utc;

    const MAX_FAVORITES: usize = DEFAULT_MAX_FAVORITES;

    async fn create_test_service() -> (Arc<FavoritesService>, MemoryStore, Vec<Book>) {
        let store = MemoryStore::new();
        let author = store.create_author("Frank Herbert").await.unwrap();
        let mut books = Vec::new();
        for title in ["Dune", "Dune Messiah", "Foundation", "The Hobbit"] {
            books.push(store.create_book(title, author.id).await.unwrap());
        }

        let shared = Arc::new(store.clone());
        let service = FavoritesService::new(shared.clone(), shared, MAX_FAVORITES, 5);
        (Arc::new(service), store, books)
    }

    async fn add_books(store: &MemoryStore, count: usize) -> Vec<BookId> {
        let author = store.create_author("Various").await.unwrap();
        let mut ids = Vec::new();
        for i in 0..count {
            let title = format!("Anthology {}", i);
            ids.push(store.create_book(&title, author.id).await.unwrap().id);
        }
        ids
    }

    #[tokio::test]
    async fn test_add_favorite_returns_similar_books() {
        let (service, store, books) = create_test_service().await;

        let result = service.add_favorite(1, books[0].id).await.unwrap();

        assert_eq!(result.favorite.user_id, 1);
        assert_eq!(result.favorite.book_id, books[0].id);
        assert!(store.exists(1, books[0].id).await.unwrap());

        let titles: Vec<&str> = result.recommended.iter().map(|b| b.title.as_str()).collect();
        assert_eq!(titles, vec!["Dune Messiah", "Foundation", "The Hobbit"]);
    }

    #[tokio::test]
    async fn test_add_increments_count_by_one() {
        let (service, store, books) = create_test_service().await;
        service.add_favorite(1, books[1].id).await.unwrap();
        let before = store.count(1).await.unwrap();

        service.add_favorite(1, books[2].id).await.unwrap();
        assert_eq!(store.count(1).await.unwrap(), before + 1);
    }

    #[tokio::test]
    async fn test_duplicate_add_is_rejected() {
        let (service, _store, books) = create_test_service().await;
        service.add_favorite(1, books[0].id).await.unwrap();

        let result = service.add_favorite(1, books[0].id).await;
        assert!(matches!(result, Err(AppError::AlreadyFavorited)));

        // Another user may favorite the same book
        assert!(service.add_favorite(2, books[0].id).await.is_ok());
    }

    #[tokio::test]
    async fn test_unknown_book_is_rejected() {
        let (service, store, _) = create_test_service().await;
        let result = service.add_favorite(1, 999).await;
        assert!(matches!(result, Err(AppError::BookNotFound(999))));
        assert_eq!(store.count(1).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_capacity_rejects_the_twenty_first() {
        let (service, store, _) = create_test_service().await;
        let ids = add_books(&store, MAX_FAVORITES + 1).await;

        for &id in &ids[..MAX_FAVORITES] {
            service.add_favorite(1, id).await.unwrap();
        }

        let result = service.add_favorite(1, ids[MAX_FAVORITES]).await;
        assert!(matches!(result, Err(AppError::CapacityExceeded(20))));
        assert_eq!(store.count(1).await.unwrap(), MAX_FAVORITES);

        // Removing one frees a slot
        service.remove_favorite(1, ids[0]).await.unwrap();
        assert!(service.add_favorite(1, ids[MAX_FAVORITES]).await.is_ok());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_adds_never_exceed_capacity() {
        let (service, store, _) = create_test_service().await;
        let ids = add_books(&store, MAX_FAVORITES + 10).await;

        let mut tasks = Vec::new();
        for id in ids {
            let service = service.clone();
            tasks.push(tokio::spawn(async move { service.add_favorite(7, id).await }));
        }

        let mut added = 0;
        let mut rejected = 0;
        for task in tasks {
            match task.await.unwrap() {
                Ok(_) => added += 1,
                Err(AppError::CapacityExceeded(_)) => rejected += 1,
                Err(e) => panic!("unexpected error: {}", e),
            }
        }

        assert_eq!(added, MAX_FAVORITES);
        assert_eq!(rejected, 10);
        assert_eq!(store.count(7).await.unwrap(), MAX_FAVORITES);
    }

    #[tokio::test]
    async fn test_user_locks_are_released_after_rejected_adds() {
        let (service, store, books) = create_test_service().await;
        let ids = add_books(&store, MAX_FAVORITES + 1).await;
        for &id in &ids[..MAX_FAVORITES] {
            service.add_favorite(1, id).await.unwrap();
        }
        service.add_favorite(2, books[0].id).await.unwrap();

        for user_id in 100..1100 {
            let result = service.add_favorite(user_id, 999).await;
            assert!(matches!(result, Err(AppError::BookNotFound(999))));
        }
        let duplicate = service.add_favorite(2, books[0].id).await;
        assert!(matches!(duplicate, Err(AppError::AlreadyFavorited)));
        let over = service.add_favorite(1, ids[MAX_FAVORITES]).await;
        assert!(matches!(over, Err(AppError::CapacityExceeded(_))));

        assert_eq!(service.locks.len(), 0);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_user_locks_are_released_after_contention() {
        let (service, store, _) = create_test_service().await;
        let ids = add_books(&store, 8).await;

        let mut tasks = Vec::new();
        for (i, id) in ids.into_iter().enumerate() {
            let service = service.clone();
            let user_id = (i % 2) as UserId;
            tasks.push(tokio::spawn(async move { service.add_favorite(user_id, id).await }));
        }
        for task in tasks {
            task.await.unwrap().unwrap();
        }

        assert_eq!(store.count(0).await.unwrap(), 4);
        assert_eq!(service.locks.len(), 0);
    }

    #[tokio::test]
    async fn test_remove_then_add_again() {
        let (service, store, books) = create_test_service().await;
        service.add_favorite(1, books[3].id).await.unwrap();

        service.remove_favorite(1, books[3].id).await.unwrap();
        assert!(!store.exists(1, books[3].id).await.unwrap());

        assert!(service.add_favorite(1, books[3].id).await.is_ok());
    }

    #[tokio::test]
    async fn test_remove_absent_favorite() {
        let (service, _store, books) = create_test_service().await;
        let result = service.remove_favorite(1, books[0].id).await;
        assert!(matches!(result, Err(AppError::NotFavorited)));
    }

    #[tokio::test]
    async fn test_list_favorites_per_user() {
        let (service, _store, books) = create_test_service().await;
        service.add_favorite(1, books[2].id).await.unwrap();
        service.add_favorite(1, books[0].id).await.unwrap();
        service.add_favorite(2, books[1].id).await.unwrap();

        let favorites = service.list_favorites(1).await.unwrap();
        let ids: Vec<BookId> = favorites.iter().map(|f| f.book_id).collect();
        assert_eq!(ids, vec![books[2].id, books[0].id]);
        assert!(service.list_favorites(3).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_earlier_favorites_join_the_corpus() {
        let (service, store, books) = create_test_service().await;
        let author = store.create_author("Brian Herbert").await.unwrap();
        let hunters = store.create_book("Hunters of Dune", author.id).await.unwrap();
        service.add_favorite(1, hunters.id).await.unwrap();

        let result = service.add_favorite(1, books[0].id).await.unwrap();
        let ids: Vec<BookId> = result.recommended.iter().map(|b| b.id).collect();

        // Both Dune-titled books outrank the rest, each listed once
        assert_eq!(ids.len(), 4);
        assert!(ids[..2].contains(&hunters.id));
        assert!(ids[..2].contains(&books[1].id));
    }

    #[tokio::test]
    async fn test_recommendations_for_does_not_persist() {
        let (service, store, books) = create_test_service().await;

        let recommended = service.recommendations_for(1, books[0].id).await.unwrap();
        assert_eq!(recommended[0].id, books[1].id);
        assert_eq!(store.count(1).await.unwrap(), 0);

        let missing = service.recommendations_for(1, 404).await;
        assert!(matches!(missing, Err(AppError::BookNotFound(404))));
    }

    #[tokio::test]
    async fn test_recommendation_failure_keeps_favorite() {
        let catalog = MemoryStore::new();
        let author = catalog.create_author("Frank Herbert").await.unwrap();
        let dune = catalog.create_book("Dune", author.id).await.unwrap();
        catalog.create_book("Dune Messiah", author.id).await.unwrap();

        let mut store = MockFavoriteStore::new();
        store.expect_count().returning(|_| Ok(0));
        store.expect_exists().returning(|_, _| Ok(false));
        store.expect_insert().times(1).returning(|user_id, book_id, _| {
            Ok(Favorite {
                id: 1,
                user_id,
                book_id,
                created_at: Utc::now(),
            })
        });
        store
            .expect_list()
            .returning(|_| Err(AppError::Internal("favorites table offline".to_string())));

        let service = FavoritesService::new(Arc::new(catalog), Arc::new(store), MAX_FAVORITES, 5);
        let result = service.add_favorite(1, dune.id).await.unwrap();

        assert_eq!(result.favorite.book_id, dune.id);
        assert!(result.recommended.is_empty());
    }

    #[tokio::test]
    async fn test_persistence_failure_propagates() {
        let catalog = MemoryStore::new();
        let author = catalog.create_author("Frank Herbert").await.unwrap();
        let dune = catalog.create_book("Dune", author.id).await.unwrap();

        let mut store = MockFavoriteStore::new();
        store.expect_count().returning(|_| Ok(0));
        store.expect_exists().returning(|_, _| Ok(false));
        store
            .expect_insert()
            .returning(|_, _, _| Err(AppError::Internal("disk full".to_string())));
        store.expect_list().never();

        let service = FavoritesService::new(Arc::new(catalog), Arc::new(store), MAX_FAVORITES, 5);
        let result = service.add_favorite(1, dune.id).await;

        assert!(matches!(result, Err(AppError::Internal(_))));
    }

    #[tokio::test]
    async fn test_capacity_checked_before_lookup() {
        let mut store = MockFavoriteStore::new();
        store
            .expect_count()
            .returning(|_| Ok(MAX_FAVORITES));
        store.expect_exists().never();
        store.expect_insert().never();

        let service = FavoritesService::new(
            Arc::new(MemoryStore::new()),
            Arc::new(store),
            MAX_FAVORITES,
            5,
        );
        let result = service.add_favorite(1, 1).await;
        assert!(matches!(result, Err(AppError::CapacityExceeded(_))));
    }
}
