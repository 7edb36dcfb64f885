//! TF-IDF weighting of title text.
//!
//! Each document becomes a vector with one dimension per distinct token in
//! the corpus. Token dimensions follow sorted token order, so fitting the
//! same corpus twice always produces identical vectors.

use std::collections::{BTreeMap, BTreeSet};

use super::RecommendError;

/// Dense TF-IDF vector for one corpus unit
pub type FeatureVector = Vec<f64>;

/// Lowercases `text` and splits it on every non-alphanumeric character.
pub fn tokenize(text: &str) -> Vec<String> {
    text.to_lowercase()
        .split(|c: char| !c.is_alphanumeric())
        .filter(|s| !s.is_empty())
        .map(String::from)
        .collect()
}

/// Learns a vocabulary and IDF weights from a corpus and projects it into
/// L2-normalized TF-IDF space.
///
/// The IDF is smoothed as `ln((1 + n) / (1 + df)) + 1`, so a term present in
/// every document still carries weight and no division by zero occurs.
#[derive(Debug, Default)]
pub struct TfidfVectorizer {
    vocabulary: BTreeMap<String, usize>,
    idf: Vec<f64>,
}

impl TfidfVectorizer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of distinct tokens seen by the last fit
    pub fn vocabulary_size(&self) -> usize {
        self.vocabulary.len()
    }

    /// Dimension index assigned to `token`, if it was seen during fitting
    pub fn index_of(&self, token: &str) -> Option<usize> {
        self.vocabulary.get(token).copied()
    }

    /// Learns vocabulary and IDF from `documents`, then returns one vector per document
    pub fn fit_transform<S: AsRef<str>>(
        &mut self,
        documents: &[S],
    ) -> Result<Vec<FeatureVector>, RecommendError> {
        if documents.is_empty() {
            return Err(RecommendError::EmptyCorpus);
        }

        let tokenized: Vec<Vec<String>> = documents
            .iter()
            .map(|doc| tokenize(doc.as_ref()))
            .collect();

        let distinct: BTreeSet<&str> = tokenized
            .iter()
            .flat_map(|tokens| tokens.iter().map(String::as_str))
            .collect();
        self.vocabulary = distinct
            .into_iter()
            .enumerate()
            .map(|(index, token)| (token.to_string(), index))
            .collect();

        let n_docs = documents.len() as f64;
        let mut doc_freq = vec![0usize; self.vocabulary.len()];
        for tokens in &tokenized {
            let present: BTreeSet<usize> = tokens
                .iter()
                .filter_map(|t| self.vocabulary.get(t).copied())
                .collect();
            for index in present {
                doc_freq[index] += 1;
            }
        }
        self.idf = doc_freq
            .iter()
            .map(|&df| ((1.0 + n_docs) / (1.0 + df as f64)).ln() + 1.0)
            .collect();

        Ok(tokenized.iter().map(|tokens| self.weigh(tokens)).collect())
    }

    fn weigh(&self, tokens: &[String]) -> FeatureVector {
        let mut vector = vec![0.0; self.vocabulary.len()];
        for token in tokens {
            if let Some(&index) = self.vocabulary.get(token) {
                vector[index] += 1.0;
            }
        }
        for (weight, idf) in vector.iter_mut().zip(&self.idf) {
            *weight *= idf;
        }

        let norm = vector.iter().map(|x| x * x).sum::<f64>().sqrt();
        if norm > 0.0 {
            vector.iter_mut().for_each(|x| *x /= norm);
        }
        vector
    }
}
