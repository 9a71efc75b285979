//! The offline generator
//!
//! Reads the clause dataset, embeds every clause and writes the artifact pair
//! the server loads at startup.

use crate::artifacts::{self, Embeddings};
use crate::dataset;
use crate::embedding::Embed;
use crate::error::{Error, Result};
use std::path::PathBuf;
use std::time::{Duration, Instant};

pub const DEFAULT_INPUT_FILE: &str = "legal_dataset.csv";
pub const DEFAULT_BATCH_SIZE: usize = 64;

/// Where to read from and write to.
#[derive(Debug, Clone)]
pub struct GenerateOptions {
    pub input: PathBuf,
    pub vectors: PathBuf,
    pub documents: PathBuf,
    pub batch_size: usize,
}

impl Default for GenerateOptions {
    fn default() -> Self {
        GenerateOptions {
            input: PathBuf::from(DEFAULT_INPUT_FILE),
            vectors: PathBuf::from(artifacts::DEFAULT_VECTORS_FILE),
            documents: PathBuf::from(artifacts::DEFAULT_DOCUMENTS_FILE),
            batch_size: DEFAULT_BATCH_SIZE,
        }
    }
}

/// What a generator run produced.
#[derive(Debug, Clone)]
pub struct GenerateSummary {
    pub documents: usize,
    pub dimension: usize,
    pub vectors_path: PathBuf,
    pub documents_path: PathBuf,
    pub elapsed: Duration,
}

/// Runs the whole pipeline: dataset, embeddings, artifacts.
///
/// Nothing is written unless the dataset parses and every clause is embedded,
/// so a configuration error leaves existing artifacts untouched.
pub fn run(options: &GenerateOptions, embedder: &dyn Embed) -> Result<GenerateSummary> {
    let start = Instant::now();

    let documents = dataset::load_clauses(&options.input)?;
    tracing::info!("Loaded {} clauses from {}", documents.len(), options.input.display());

    tracing::info!("Generating embeddings (this may take a few minutes)...");
    let texts: Vec<&str> = documents.iter().map(|d| d.content.as_str()).collect();
    let rows = embed_all(embedder, &texts, options.batch_size)?;
    if rows.len() != documents.len() {
        return Err(Error::embedding(format!(
            "Model returned {} vectors for {} clauses",
            rows.len(),
            documents.len()
        )));
    }
    let embeddings = Embeddings::from_rows(embedder.dimension(), rows)?;

    artifacts::save(&options.vectors, &options.documents, &embeddings, &documents)?;
    tracing::info!("Saved embeddings to {}", options.vectors.display());
    tracing::info!("Saved documents to {}", options.documents.display());

    Ok(GenerateSummary {
        documents: documents.len(),
        dimension: embeddings.dimension(),
        vectors_path: options.vectors.clone(),
        documents_path: options.documents.clone(),
        elapsed: start.elapsed(),
    })
}

/// Embeds `texts` in batches, reporting progress as it goes.
fn embed_all(embedder: &dyn Embed, texts: &[&str], batch_size: usize) -> Result<Vec<Vec<f32>>> {
    let batch_size = batch_size.max(1);
    let total_batches = texts.len().div_ceil(batch_size);
    let start = Instant::now();
    let mut rows = Vec::with_capacity(texts.len());

    for (batch_idx, chunk) in texts.chunks(batch_size).enumerate() {
        rows.extend(embedder.embed_batch(chunk)?);

        let done = rows.len();
        let elapsed = start.elapsed().as_secs_f64();
        tracing::info!(
            "Batch {}/{}: {}/{} clauses ({:.0} clauses/s, elapsed {:.1}s)",
            batch_idx + 1,
            total_batches,
            done,
            texts.len(),
            done as f64 / elapsed.max(f64::EPSILON),
            elapsed
        );
    }

    Ok(rows)
}
