//! Content-based book recommendations.
//!
//! Given an anchor book, titles from the catalog and the user's favorites are
//! weighted with TF-IDF and ranked by cosine similarity to the anchor title.
//! Everything is recomputed per request; nothing is cached between calls.

use std::sync::Arc;

use thiserror::Error;

use crate::{
    db::{Catalog, FavoriteStore},
    error::AppError,
    models::{Book, BookId, UserId},
};

pub mod corpus;
pub mod ranker;
pub mod vectorizer;

pub use corpus::{Corpus, CorpusBuilder, CorpusUnit, UnitSource};
pub use ranker::{cosine_similarity, rank, top_k, ScoredCandidate};
pub use vectorizer::{tokenize, FeatureVector, TfidfVectorizer};

/// Error types for the recommendation pipeline
#[derive(Debug, Error)]
pub enum RecommendError {
    #[error("Cannot vectorize an empty corpus")]
    EmptyCorpus,
    #[error("Vector dimensions differ: {0} vs {1}")]
    DimensionMismatch(usize, usize),
    #[error("Failed to load corpus: {0}")]
    Source(#[from] AppError),
}

/// Ranks the corpus' candidates against its anchor and returns up to `limit`
/// distinct book ids, most similar first.
pub fn recommend_ids(corpus: &Corpus, limit: usize) -> Result<Vec<BookId>, RecommendError> {
    let mut vectors = TfidfVectorizer::new().fit_transform(&corpus.texts())?;
    let anchor = vectors.pop().ok_or(RecommendError::EmptyCorpus)?;

    let candidates: Vec<(BookId, FeatureVector)> =
        corpus.candidate_ids().into_iter().zip(vectors).collect();

    let ranked = rank(&anchor, &candidates)?;
    Ok(top_k(&ranked, limit))
}

/// Computes title-similarity recommendations against live storage
#[derive(Clone)]
pub struct Recommender {
    catalog: Arc<dyn Catalog>,
    favorites: Arc<dyn FavoriteStore>,
    limit: usize,
}

impl Recommender {
    pub fn new(catalog: Arc<dyn Catalog>, favorites: Arc<dyn FavoriteStore>, limit: usize) -> Self {
        Self {
            catalog,
            favorites,
            limit,
        }
    }

    /// Books most similar to `anchor` for `user_id`
    #[tracing::instrument(skip(self, anchor), fields(anchor_id = anchor.id))]
    pub async fn recommend(
        &self,
        user_id: UserId,
        anchor: &Book,
    ) -> Result<Vec<Book>, RecommendError> {
        let corpus = CorpusBuilder::new(self.catalog.as_ref(), self.favorites.as_ref())
            .build(user_id, anchor)
            .await?;

        let books: Vec<Book> = recommend_ids(&corpus, self.limit)?
            .into_iter()
            .filter_map(|id| corpus.book(id).cloned())
            .collect();

        tracing::info!(
            corpus_size = corpus.len(),
            recommended = books.len(),
            "Computed recommendations"
        );

        Ok(books)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::MemoryStore;

    fn book(id: BookId, title: &str) -> Book {
        Book {
            id,
            title: title.to_string(),
            author_id: 1,
        }
    }

    fn dune_catalog() -> Vec<Book> {
        vec![
            book(1, "Dune"),
            book(2, "Dune Messiah"),
            book(3, "Foundation"),
            book(4, "The Hobbit"),
        ]
    }

    #[test]
    fn test_shared_token_ranks_first() {
        let catalog = dune_catalog().into_iter().filter(|b| b.title != "Dune").collect();
        let corpus = Corpus::assemble(vec![], catalog, "Dune");
        let ids = recommend_ids(&corpus, 5).unwrap();

        // Foundation and The Hobbit tie at zero and keep catalog order
        assert_eq!(ids, vec![2, 3, 4]);
    }

    #[test]
    fn test_identical_favorite_ranks_first() {
        let corpus = Corpus::assemble(
            vec![book(7, "Foundation and Empire")],
            vec![book(3, "Foundation"), book(8, "Second Foundation")],
            "Foundation and Empire",
        );
        assert_eq!(corpus.candidate_ids(), vec![7, 3, 8]);

        let mut vectors = TfidfVectorizer::new().fit_transform(&corpus.texts()).unwrap();
        let anchor = vectors.pop().unwrap();
        let score = cosine_similarity(&anchor, &vectors[0]).unwrap();
        assert!((score - 1.0).abs() < 1e-9);

        assert_eq!(recommend_ids(&corpus, 5).unwrap()[0], 7);
    }

    #[test]
    fn test_limit_caps_results() {
        let catalog: Vec<Book> = (1..=12)
            .map(|i| book(i, &format!("Saga Volume {}", i)))
            .collect();
        let corpus = Corpus::assemble(vec![], catalog, "Saga");
        assert_eq!(recommend_ids(&corpus, 5).unwrap().len(), 5);
    }

    #[test]
    fn test_anchor_only_corpus_recommends_nothing() {
        let corpus = Corpus::assemble(vec![], vec![], "Dune");
        assert!(recommend_ids(&corpus, 5).unwrap().is_empty());
    }

    #[test]
    fn test_pipeline_is_deterministic() {
        let corpus = Corpus::assemble(
            vec![book(4, "The Hobbit")],
            dune_catalog(),
            "Children of Dune",
        );
        let first = recommend_ids(&corpus, 5).unwrap();
        let second = recommend_ids(&corpus, 5).unwrap();
        assert_eq!(first, second);
    }

    #[tokio::test]
    async fn test_recommender_resolves_books() {
        let store = Arc::new(MemoryStore::new());
        let author = store.create_author("Frank Herbert").await.unwrap();
        let dune = store.create_book("Dune", author.id).await.unwrap();
        let messiah = store.create_book("Dune Messiah", author.id).await.unwrap();
        store.create_book("Foundation", author.id).await.unwrap();

        let recommender = Recommender::new(store.clone(), store.clone(), 5);
        let books = recommender.recommend(1, &dune).await.unwrap();

        assert_eq!(books.len(), 2);
        assert_eq!(books[0], messiah);
    }
}
