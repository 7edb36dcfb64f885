use std::collections::HashMap;

use crate::{
    db::{Catalog, FavoriteStore},
    models::{Book, BookId, UserId},
};

use super::RecommendError;

/// Where a corpus unit's text came from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnitSource {
    /// Title of a catalog or favorite book
    Book(BookId),
    /// The title recommendations are computed for
    Anchor,
}

/// One piece of text taking part in a similarity computation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CorpusUnit {
    pub text: String,
    pub source: UnitSource,
}

/// Ordered text units for one request, anchor last
///
/// Keeps the records behind its units so ranked ids resolve without another
/// storage round trip.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Corpus {
    units: Vec<CorpusUnit>,
    books: HashMap<BookId, Book>,
}

impl Corpus {
    /// Lays out `favorites`, then `catalog`, then the anchor itself.
    ///
    /// `catalog` is taken as given; title exclusion happens in
    /// [`Catalog::list_books`].
    pub fn assemble(favorites: Vec<Book>, catalog: Vec<Book>, anchor_title: &str) -> Self {
        let mut books = HashMap::with_capacity(favorites.len() + catalog.len());
        let units = favorites
            .into_iter()
            .chain(catalog)
            .map(|book| {
                let unit = CorpusUnit {
                    text: book.title.clone(),
                    source: UnitSource::Book(book.id),
                };
                books.entry(book.id).or_insert(book);
                unit
            })
            .chain(std::iter::once(CorpusUnit {
                text: anchor_title.to_string(),
                source: UnitSource::Anchor,
            }))
            .collect();

        Self { units, books }
    }

    /// The record behind a candidate id
    pub fn book(&self, id: BookId) -> Option<&Book> {
        self.books.get(&id)
    }

    pub fn units(&self) -> &[CorpusUnit] {
        &self.units
    }

    pub fn texts(&self) -> Vec<&str> {
        self.units.iter().map(|u| u.text.as_str()).collect()
    }

    /// Book ids of every unit except the anchor, in corpus order
    pub fn candidate_ids(&self) -> Vec<BookId> {
        self.units
            .iter()
            .filter_map(|u| match u.source {
                UnitSource::Book(id) => Some(id),
                UnitSource::Anchor => None,
            })
            .collect()
    }

    pub fn len(&self) -> usize {
        self.units.len()
    }

    pub fn is_empty(&self) -> bool {
        self.units.is_empty()
    }
}

/// Gathers the texts for a recommendation request from storage
pub struct CorpusBuilder<'a> {
    catalog: &'a dyn Catalog,
    favorites: &'a dyn FavoriteStore,
}

impl<'a> CorpusBuilder<'a> {
    pub fn new(catalog: &'a dyn Catalog, favorites: &'a dyn FavoriteStore) -> Self {
        Self { catalog, favorites }
    }

    /// Builds the corpus for `user_id` anchored on `anchor`
    ///
    /// The anchor book's own favorite record is left out of the favorites
    /// section. Favorites whose book has disappeared are skipped.
    pub async fn build(&self, user_id: UserId, anchor: &Book) -> Result<Corpus, RecommendError> {
        let catalog = self.catalog.list_books(Some(anchor.title.as_str())).await?;
        let by_id: HashMap<BookId, &Book> = catalog.iter().map(|b| (b.id, b)).collect();

        let mut favorite_books = Vec::new();
        for favorite in self.favorites.list(user_id).await? {
            if favorite.book_id == anchor.id {
                continue;
            }
            // Only favorites titled like the anchor are missing from the listing
            let book = match by_id.get(&favorite.book_id) {
                Some(book) => Some((*book).clone()),
                None => self.catalog.get_book(favorite.book_id).await?,
            };
            if let Some(book) = book {
                favorite_books.push(book);
            }
        }

        tracing::debug!(
            user_id,
            favorites = favorite_books.len(),
            catalog = catalog.len(),
            "Assembled recommendation corpus"
        );

        Ok(Corpus::assemble(favorite_books, catalog, &anchor.title))
    }
}
