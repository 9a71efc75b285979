//! Sentence embeddings
//!
//! [`SentenceEmbedder`] runs a BERT-family sentence-transformers model
//! (MiniLM by default) with candle: tokenize, forward pass, attention-masked
//! mean pooling, then L2 normalization. The output for a given text is the
//! same whether it is embedded alone or in a batch, which keeps generator
//! and server vectors in one embedding space.

use crate::error::{Error, Result};
use crate::vector::l2_norm;
use candle_core::{DType, Device, Tensor};
use candle_nn::VarBuilder;
use candle_transformers::models::bert::{BertModel, Config};
use hf_hub::{api::sync::Api, Repo, RepoType};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use tokenizers::{PaddingParams, Tokenizer, TruncationParams};

/// Model used by both the generator and the server unless configured otherwise.
pub const DEFAULT_MODEL: &str = "sentence-transformers/all-MiniLM-L6-v2";

/// MiniLM was trained with inputs capped at this many tokens
const MAX_SEQUENCE_LENGTH: usize = 256;

/// Anything that turns text into fixed-length vectors.
pub trait Embed: Send + Sync {
    /// Length of every vector this embedder produces.
    fn dimension(&self) -> usize;

    /// Embeds `texts`, returning one vector per text in input order.
    fn embed_batch(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>>;

    fn embed(&self, text: &str) -> Result<Vec<f32>> {
        self.embed_batch(&[text])?
            .pop()
            .ok_or_else(|| Error::embedding("Model returned no vector"))
    }
}

/// Sentence-transformers BERT model running on candle.
pub struct SentenceEmbedder {
    model: BertModel,
    tokenizer: Tokenizer,
    device: Device,
    dimension: usize,
}

#[derive(Deserialize)]
struct HiddenSize {
    hidden_size: usize,
}

impl SentenceEmbedder {
    /// Loads a model from a local directory or from the Hugging Face Hub.
    ///
    /// `model` is either a directory holding `config.json`, `tokenizer.json`
    /// and `model.safetensors`, or a Hub repository id. A bare name such as
    /// `all-MiniLM-L6-v2` is looked up under `sentence-transformers/`.
    ///
    /// # Examples
    ///
    /// ```no_run
    /// use nyaya_rag::{Embed, SentenceEmbedder};
    ///
    /// let embedder = SentenceEmbedder::load("all-MiniLM-L6-v2").unwrap();
    /// let vector = embedder.embed("breach of contract").unwrap();
    /// assert_eq!(vector.len(), 384);
    /// ```
    pub fn load(model: &str) -> Result<Self> {
        let device = Device::cuda_if_available(0)?;
        match &device {
            Device::Cuda(_) => tracing::info!("Embedding on CUDA GPU"),
            _ => tracing::info!("Embedding on CPU"),
        }

        let files = ModelFiles::resolve(model)?;

        let config_json = std::fs::read_to_string(&files.config)?;
        let config: Config = serde_json::from_str(&config_json)?;
        let HiddenSize { hidden_size } = serde_json::from_str(&config_json)?;

        let mut tokenizer = Tokenizer::from_file(&files.tokenizer)
            .map_err(|e| Error::model(format!("Cannot load tokenizer: {}", e)))?;
        tokenizer.with_padding(Some(PaddingParams::default()));
        tokenizer
            .with_truncation(Some(TruncationParams {
                max_length: MAX_SEQUENCE_LENGTH,
                ..Default::default()
            }))
            .map_err(|e| Error::model(format!("Cannot configure truncation: {}", e)))?;

        let vb = unsafe { VarBuilder::from_mmaped_safetensors(&[files.weights], DType::F32, &device)? };
        let bert = BertModel::load(vb, &config)?;

        tracing::info!("Loaded embedding model '{}' ({}d)", model, hidden_size);

        Ok(SentenceEmbedder {
            model: bert,
            tokenizer,
            device,
            dimension: hidden_size,
        })
    }
}

impl Embed for SentenceEmbedder {
    fn dimension(&self) -> usize {
        self.dimension
    }

    fn embed_batch(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }

        let encodings = self
            .tokenizer
            .encode_batch(texts.to_vec(), true)
            .map_err(|e| Error::embedding(format!("Tokenization failed: {}", e)))?;

        let batch_len = encodings.len();
        let seq_len = encodings[0].get_ids().len();

        let token_ids: Vec<u32> = encodings.iter().flat_map(|e| e.get_ids().iter().copied()).collect();
        let mask: Vec<u32> = encodings.iter().flat_map(|e| e.get_attention_mask().iter().copied()).collect();

        let token_ids = Tensor::from_vec(token_ids, (batch_len, seq_len), &self.device)?;
        let attention_mask = Tensor::from_vec(mask, (batch_len, seq_len), &self.device)?;
        let token_type_ids = token_ids.zeros_like()?;

        let hidden_states = self.model.forward(&token_ids, &token_type_ids, Some(&attention_mask))?;
        let pooled = mean_pooling(&hidden_states, &attention_mask)?;

        normalize_rows(pooled.to_vec2::<f32>()?)
    }
}

fn mean_pooling(hidden_states: &Tensor, attention_mask: &Tensor) -> candle_core::Result<Tensor> {
    let mask_expanded = attention_mask
        .unsqueeze(2)?
        .broadcast_as(hidden_states.shape())?
        .to_dtype(hidden_states.dtype())?;

    let sum_embeddings = (hidden_states * &mask_expanded)?.sum(1)?;
    let sum_mask = mask_expanded.sum(1)?.clamp(1e-9, f64::MAX)?;
    sum_embeddings.broadcast_div(&sum_mask)
}

fn normalize_rows(rows: Vec<Vec<f32>>) -> Result<Vec<Vec<f32>>> {
    rows.iter().map(|row| l2_norm(row)).collect()
}

/// Paths of the three files a BERT sentence model needs.
#[derive(Debug)]
struct ModelFiles {
    config: PathBuf,
    tokenizer: PathBuf,
    weights: PathBuf,
}

impl ModelFiles {
    fn resolve(model: &str) -> Result<ModelFiles> {
        let local = Path::new(model);
        if local.is_dir() {
            return ModelFiles::from_dir(local);
        }

        let repo_id = hub_repo_id(model);
        tracing::info!("Fetching '{}' from the Hugging Face Hub", repo_id);

        let api = Api::new().map_err(|e| Error::model(format!("Cannot reach the Hugging Face Hub: {}", e)))?;
        let repo = api.repo(Repo::new(repo_id.clone(), RepoType::Model));
        let fetch = |name: &str| {
            repo.get(name)
                .map_err(|e| Error::model(format!("Cannot fetch '{}' from '{}': {}", name, repo_id, e)))
        };

        Ok(ModelFiles {
            config: fetch("config.json")?,
            tokenizer: fetch("tokenizer.json")?,
            weights: fetch("model.safetensors")?,
        })
    }

    fn from_dir(dir: &Path) -> Result<ModelFiles> {
        let files = ModelFiles {
            config: dir.join("config.json"),
            tokenizer: dir.join("tokenizer.json"),
            weights: dir.join("model.safetensors"),
        };

        for path in [&files.config, &files.tokenizer, &files.weights] {
            if !path.is_file() {
                return Err(Error::model(format!("Model file '{}' not found", path.display())));
            }
        }

        Ok(files)
    }
}

fn hub_repo_id(model: &str) -> String {
    if model.contains('/') {
        model.to_string()
    } else {
        format!("sentence-transformers/{}", model)
    }
}
