//! The artifact module
//! Persist the generator output and load it back for serving
//!
//! Two files are produced together:
//!
//! - a NumPy `.npy` array of shape `(N, D)` holding little-endian `f32`
//!   embeddings, one row per clause
//! - a bincode [`DocumentSet`] holding the `N` clause records in row order,
//!   along with the embedding dimension they were produced with
//!
//! [`load`] refuses any pair whose row count or dimension disagree, so a
//! stale or mismatched pair is caught at startup instead of at query time.

use crate::document::{Document, SearchHit};
use crate::error::{Error, Result};
use crate::index::FlatIndex;
use candle_core::{DType, Device, Tensor};
use serde::{Deserialize, Serialize};
use std::{
    fs::File,
    io::{BufReader, BufWriter, Write},
    path::Path,
};

pub const DEFAULT_VECTORS_FILE: &str = "nyaya_embeddings.npy";
pub const DEFAULT_DOCUMENTS_FILE: &str = "nyaya_docs.bin";

const FORMAT_VERSION: u32 = 1;

/// Row-major embedding matrix produced by the generator.
#[derive(Debug, Clone, PartialEq)]
pub struct Embeddings {
    rows: usize,
    dimension: usize,
    data: Vec<f32>,
}

impl Embeddings {
    /// Flattens per-text vectors, checking that they all have `dimension` floats.
    pub fn from_rows(dimension: usize, rows: Vec<Vec<f32>>) -> Result<Embeddings> {
        let count = rows.len();
        let mut data = Vec::with_capacity(count * dimension);
        for row in rows {
            if row.len() != dimension {
                return Err(Error::DimensionMismatch { expected: dimension, actual: row.len() });
            }
            data.extend(row);
        }

        Ok(Embeddings { rows: count, dimension, data })
    }

    pub fn rows(&self) -> usize {
        self.rows
    }

    pub fn dimension(&self) -> usize {
        self.dimension
    }

    pub fn as_slice(&self) -> &[f32] {
        &self.data
    }
}

/// The document artifact.
#[derive(Debug, Serialize, Deserialize)]
pub struct DocumentSet {
    format_version: u32,
    dimension: usize,
    documents: Vec<Document>,
}

/// The loaded, validated pair of artifacts: a search index and the documents
/// its rows refer to.
#[derive(Debug, Clone)]
pub struct Corpus {
    index: FlatIndex,
    documents: Vec<Document>,
}

impl Corpus {
    /// Pairs an index with its documents.
    ///
    /// # Errors
    ///
    /// [`Error::Startup`] if the index and the document list differ in length.
    pub fn new(index: FlatIndex, documents: Vec<Document>) -> Result<Corpus> {
        if index.len() != documents.len() {
            return Err(Error::startup(format!(
                "Index holds {} vectors but there are {} documents",
                index.len(),
                documents.len()
            )));
        }

        Ok(Corpus { index, documents })
    }

    /// Returns the `top_k` documents closest to an already embedded query,
    /// closest first.
    pub fn search(&self, query: &[f32], top_k: usize) -> Result<Vec<SearchHit>> {
        let hits = self.index.search(query, top_k)?;

        Ok(hits
            .into_iter()
            .map(|(row, score)| SearchHit {
                content: self.documents[row].content.clone(),
                score,
            })
            .collect())
    }

    pub fn documents(&self) -> &[Document] {
        &self.documents
    }

    pub fn len(&self) -> usize {
        self.documents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.documents.is_empty()
    }

    pub fn dimension(&self) -> usize {
        self.index.dimension()
    }
}

/// Writes both artifacts, replacing any existing files.
///
/// # Errors
///
/// Fails if `embeddings` and `documents` differ in length, or on any IO or
/// serialization error.
pub fn save(
    vectors_path: impl AsRef<Path>,
    documents_path: impl AsRef<Path>,
    embeddings: &Embeddings,
    documents: &[Document],
) -> Result<()> {
    if embeddings.rows() != documents.len() {
        return Err(Error::embedding(format!(
            "Refusing to save {} vectors with {} documents",
            embeddings.rows(),
            documents.len()
        )));
    }

    let tensor = Tensor::from_vec(
        embeddings.as_slice().to_vec(),
        (embeddings.rows(), embeddings.dimension()),
        &Device::Cpu,
    )?;
    tensor.write_npy(vectors_path.as_ref())?;

    let set = DocumentSet {
        format_version: FORMAT_VERSION,
        dimension: embeddings.dimension(),
        documents: documents.to_vec(),
    };
    let file = File::create(documents_path.as_ref())?;
    let mut writer = BufWriter::new(file);
    bincode::serialize_into(&mut writer, &set)?;
    writer.flush()?;

    Ok(())
}

/// Loads and cross-checks both artifacts.
///
/// Every failure is reported as [`Error::Startup`]: a missing or unreadable
/// file, a malformed `.npy` header, an unknown document format version, or a
/// pair whose row count or dimension disagree.
pub fn load(vectors_path: impl AsRef<Path>, documents_path: impl AsRef<Path>) -> Result<Corpus> {
    let vectors_path = vectors_path.as_ref();
    let documents_path = documents_path.as_ref();

    let (rows, dimension, data) = read_vectors(vectors_path)?;

    let file = File::open(documents_path).map_err(|e| {
        Error::startup(format!("Cannot open document artifact '{}': {}", documents_path.display(), e))
    })?;
    let set: DocumentSet = bincode::deserialize_from(BufReader::new(file)).map_err(|e| {
        Error::startup(format!("Invalid document artifact '{}': {}", documents_path.display(), e))
    })?;

    if set.format_version != FORMAT_VERSION {
        return Err(Error::startup(format!(
            "Document artifact '{}' has format version {}, expected {}",
            documents_path.display(),
            set.format_version,
            FORMAT_VERSION
        )));
    }
    if rows != set.documents.len() {
        return Err(Error::startup(format!(
            "Artifact mismatch: {} vectors in '{}' but {} documents in '{}'; regenerate both files",
            rows,
            vectors_path.display(),
            set.documents.len(),
            documents_path.display()
        )));
    }
    if dimension != set.dimension {
        return Err(Error::startup(format!(
            "Artifact mismatch: vectors are {}-dimensional but documents were embedded at {}",
            dimension, set.dimension
        )));
    }

    let index = FlatIndex::from_rows(dimension, data)?;
    Corpus::new(index, set.documents)
}

/// Reads the `.npy` vector artifact as `(rows, dimension, data)`.
///
/// The array must be 2-D and hold `f32` values.
fn read_vectors(path: &Path) -> Result<(usize, usize, Vec<f32>)> {
    if !path.is_file() {
        return Err(Error::startup(format!(
            "Cannot open vector artifact '{}': file not found",
            path.display()
        )));
    }

    let invalid = |e: candle_core::Error| {
        Error::startup(format!("Invalid vector artifact '{}': {}", path.display(), e))
    };

    let tensor = Tensor::read_npy(path).map_err(invalid)?;
    if tensor.dtype() != DType::F32 {
        return Err(Error::startup(format!(
            "Invalid vector artifact '{}': expected f32 values, found {:?}",
            path.display(),
            tensor.dtype()
        )));
    }
    let (rows, dimension) = tensor.dims2().map_err(invalid)?;
    let data = tensor.flatten_all().and_then(|t| t.to_vec1::<f32>()).map_err(invalid)?;

    Ok((rows, dimension, data))
}

#[cfg(test)]
mod artifacts_test {
    use super::*;
    use tempfile::TempDir;

    fn sample() -> (Embeddings, Vec<Document>) {
        let embeddings = Embeddings::from_rows(3, vec![
            vec![1.0, 0.0, 0.0],
            vec![0.0, 1.0, 0.0],
        ]).unwrap();
        let documents = vec![
            Document::new("1", "A contract requires offer and acceptance."),
            Document::new("3", "Breach of contract occurs when a party fails to perform."),
        ];
        (embeddings, documents)
    }

    fn paths(dir: &TempDir) -> (std::path::PathBuf, std::path::PathBuf) {
        (dir.path().join(DEFAULT_VECTORS_FILE), dir.path().join(DEFAULT_DOCUMENTS_FILE))
    }

    #[test]
    fn test_embeddings_from_rows_rejects_wrong_width() {
        let result = Embeddings::from_rows(3, vec![vec![1.0, 0.0, 0.0], vec![1.0]]);

        assert!(matches!(result, Err(Error::DimensionMismatch { expected: 3, actual: 1 })));
    }

    #[test]
    fn test_save_and_load() {
        let dir = TempDir::new().unwrap();
        let (vectors, docs) = paths(&dir);
        let (embeddings, documents) = sample();

        save(&vectors, &docs, &embeddings, &documents).unwrap();
        let corpus = load(&vectors, &docs).unwrap();

        assert_eq!(corpus.len(), 2);
        assert_eq!(corpus.dimension(), 3);
        assert_eq!(corpus.documents(), &documents[..]);

        let hits = corpus.search(&[0.0, 1.0, 0.0], 5).unwrap();
        assert_eq!(hits.len(), 2);
        assert_eq!(hits[0].content, documents[1].content);
        assert_eq!(hits[0].score, 0.0);
    }

    #[test]
    fn test_vector_artifact_is_plain_npy() {
        let dir = TempDir::new().unwrap();
        let (vectors, docs) = paths(&dir);
        let (embeddings, documents) = sample();

        save(&vectors, &docs, &embeddings, &documents).unwrap();
        let tensor = Tensor::read_npy(&vectors).unwrap();

        assert_eq!(tensor.dims(), &[2, 3]);
        assert_eq!(tensor.dtype(), DType::F32);
        assert_eq!(
            tensor.to_vec2::<f32>().unwrap(),
            vec![vec![1.0, 0.0, 0.0], vec![0.0, 1.0, 0.0]]
        );
    }

    #[test]
    fn test_load_rejects_float64_vectors() {
        let dir = TempDir::new().unwrap();
        let (vectors, docs) = paths(&dir);
        let (embeddings, documents) = sample();
        save(&vectors, &docs, &embeddings, &documents).unwrap();

        let wide = Tensor::new(&[[1.0f64, 0.0, 0.0], [0.0, 1.0, 0.0]], &Device::Cpu).unwrap();
        wide.write_npy(&vectors).unwrap();

        match load(&vectors, &docs) {
            Err(Error::Startup(msg)) => assert!(msg.contains("expected f32")),
            other => panic!("Expected startup error, got {:?}", other),
        }
    }

    #[test]
    fn test_load_rejects_one_dimensional_vectors() {
        let dir = TempDir::new().unwrap();
        let (vectors, docs) = paths(&dir);
        let (embeddings, documents) = sample();
        save(&vectors, &docs, &embeddings, &documents).unwrap();

        let flat = Tensor::new(&[1.0f32, 0.0, 0.0, 0.0, 1.0, 0.0], &Device::Cpu).unwrap();
        flat.write_npy(&vectors).unwrap();

        match load(&vectors, &docs) {
            Err(Error::Startup(msg)) => assert!(msg.contains("Invalid vector artifact")),
            other => panic!("Expected startup error, got {:?}", other),
        }
    }

    #[test]
    fn test_load_missing_files() {
        let dir = TempDir::new().unwrap();
        let (vectors, docs) = paths(&dir);

        match load(&vectors, &docs) {
            Err(Error::Startup(msg)) => assert!(msg.contains("Cannot open vector artifact")),
            other => panic!("Expected startup error, got {:?}", other),
        }
    }

    #[test]
    fn test_load_truncated_vectors() {
        let dir = TempDir::new().unwrap();
        let (vectors, docs) = paths(&dir);
        let (embeddings, documents) = sample();
        save(&vectors, &docs, &embeddings, &documents).unwrap();

        let bytes = std::fs::read(&vectors).unwrap();
        std::fs::write(&vectors, &bytes[..bytes.len() - 4]).unwrap();

        assert!(matches!(load(&vectors, &docs), Err(Error::Startup(_))));
    }

    #[test]
    fn test_load_rejects_mismatched_pair() {
        let dir = TempDir::new().unwrap();
        let (vectors, docs) = paths(&dir);
        let (embeddings, documents) = sample();
        save(&vectors, &docs, &embeddings, &documents).unwrap();

        // Overwrite the documents with a pair from a smaller run
        let other_vectors = dir.path().join("other.npy");
        let small = Embeddings::from_rows(3, vec![vec![1.0, 0.0, 0.0]]).unwrap();
        save(&other_vectors, &docs, &small, &documents[..1]).unwrap();

        match load(&vectors, &docs) {
            Err(Error::Startup(msg)) => assert!(msg.contains("2 vectors")),
            other => panic!("Expected startup error, got {:?}", other),
        }
    }

    #[test]
    fn test_load_rejects_dimension_mismatch() {
        let dir = TempDir::new().unwrap();
        let (vectors, docs) = paths(&dir);
        let (embeddings, documents) = sample();
        save(&vectors, &docs, &embeddings, &documents).unwrap();

        let other_vectors = dir.path().join("other.npy");
        let wide = Embeddings::from_rows(4, vec![vec![0.0; 4], vec![0.0; 4]]).unwrap();
        save(&other_vectors, &docs, &wide, &documents).unwrap();

        match load(&vectors, &docs) {
            Err(Error::Startup(msg)) => assert!(msg.contains("3-dimensional")),
            other => panic!("Expected startup error, got {:?}", other),
        }
    }

    #[test]
    fn test_load_corrupt_documents() {
        let dir = TempDir::new().unwrap();
        let (vectors, docs) = paths(&dir);
        let (embeddings, documents) = sample();
        save(&vectors, &docs, &embeddings, &documents).unwrap();

        std::fs::write(&docs, b"not bincode").unwrap();

        assert!(matches!(load(&vectors, &docs), Err(Error::Startup(_))));
    }

    #[test]
    fn test_save_rejects_length_mismatch() {
        let dir = TempDir::new().unwrap();
        let (vectors, docs) = paths(&dir);
        let (embeddings, documents) = sample();

        let result = save(&vectors, &docs, &embeddings, &documents[..1]);

        assert!(matches!(result, Err(Error::Embedding(msg)) if msg.contains("2 vectors with 1 documents")));
        assert!(!vectors.exists());
    }

    #[test]
    fn test_save_overwrites() {
        let dir = TempDir::new().unwrap();
        let (vectors, docs) = paths(&dir);
        let (embeddings, documents) = sample();
        save(&vectors, &docs, &embeddings, &documents).unwrap();

        let single = Embeddings::from_rows(3, vec![vec![0.0, 0.0, 1.0]]).unwrap();
        let replacement = vec![Document::new("", "only clause")];
        save(&vectors, &docs, &single, &replacement).unwrap();

        let corpus = load(&vectors, &docs).unwrap();
        assert_eq!(corpus.len(), 1);
        assert_eq!(corpus.documents()[0].content, "only clause");
    }

    #[test]
    fn test_save_and_load_empty() {
        let dir = TempDir::new().unwrap();
        let (vectors, docs) = paths(&dir);
        let empty = Embeddings::from_rows(384, Vec::new()).unwrap();

        save(&vectors, &docs, &empty, &[]).unwrap();
        let corpus = load(&vectors, &docs).unwrap();

        assert!(corpus.is_empty());
        assert_eq!(corpus.dimension(), 384);
        assert!(corpus.search(&vec![0.0; 384], 5).unwrap().is_empty());
    }

    #[test]
    fn test_corpus_new_rejects_length_mismatch() {
        let index = FlatIndex::from_rows(2, vec![1.0, 0.0]).unwrap();

        let result = Corpus::new(index, Vec::new());
        assert!(matches!(result, Err(Error::Startup(_))));
    }
}
