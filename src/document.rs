//! Clause records and the entries returned by a search

use serde::{Deserialize, Serialize};

/// One clause of the corpus.
///
/// Position matters: the document at index `i` of a [`DocumentSet`](crate::artifacts::DocumentSet)
/// belongs to row `i` of the vector artifact.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Document {
    /// Identifier from the dataset's `id` column, empty when the dataset has none.
    pub id: String,
    /// Trimmed clause text.
    pub content: String,
}

impl Document {
    pub fn new(id: impl Into<String>, content: impl Into<String>) -> Self {
        Document { id: id.into(), content: content.into() }
    }
}

/// A ranked search result.
///
/// `score` is the squared Euclidean distance to the query, lower is closer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchHit {
    pub content: String,
    pub score: f32,
}
