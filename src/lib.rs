//! # nyaya-rag - Semantic search over legal clauses
//!
//! Two halves share this crate:
//!
//! - an offline generator that reads a CSV of clauses, embeds each one with a
//!   sentence-transformers model and writes an artifact pair (an `.npy`
//!   embedding array and a document list)
//! - a server that loads the pair into an exact nearest-neighbour index and
//!   answers `POST /rag` with the clauses closest to a query, ranked by
//!   squared Euclidean distance
//!
//! ## Example
//!
//! ```
//! use nyaya_rag::{Corpus, Document, FlatIndex};
//!
//! let index = FlatIndex::from_rows(2, vec![1.0, 0.0, 0.0, 1.0]).unwrap();
//! let corpus = Corpus::new(index, vec![
//!     Document::new("1", "A contract requires offer and acceptance."),
//!     Document::new("3", "Breach of contract occurs when a party fails to perform."),
//! ]).unwrap();
//!
//! let hits = corpus.search(&[0.1, 0.9], 5).unwrap();
//! assert_eq!(hits.len(), 2);
//! assert!(hits[0].content.starts_with("Breach"));
//! ```

pub mod artifacts;
pub mod dataset;
pub mod document;
pub mod embedding;
pub mod error;
pub mod generate;
pub mod index;
pub mod server;
pub mod vector;

pub use artifacts::{Corpus, Embeddings};
pub use document::{Document, SearchHit};
pub use embedding::{Embed, SentenceEmbedder};
pub use error::{Error, Result};
pub use index::FlatIndex;
