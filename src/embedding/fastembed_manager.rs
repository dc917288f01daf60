use super::EmbeddingProvider;
use anyhow::{Context, Result, bail};
use fastembed::{EmbeddingModel, InitOptions, TextEmbedding};
use std::sync::Mutex;

/// Map a configured model name to a FastEmbed model and its dimension
pub(crate) fn resolve_model(name: &str) -> Result<(EmbeddingModel, usize, &'static str)> {
    let resolved = match name.trim().to_ascii_lowercase().as_str() {
        "all-minilm-l6-v2" | "sentence-transformers/all-minilm-l6-v2" => {
            (EmbeddingModel::AllMiniLML6V2, 384, "all-MiniLM-L6-v2")
        }
        "all-minilm-l12-v2" | "sentence-transformers/all-minilm-l12-v2" => {
            (EmbeddingModel::AllMiniLML12V2, 384, "all-MiniLM-L12-v2")
        }
        "bge-small-en-v1.5" | "baai/bge-small-en-v1.5" => {
            (EmbeddingModel::BGESmallENV15, 384, "BAAI/bge-small-en-v1.5")
        }
        "bge-base-en-v1.5" | "baai/bge-base-en-v1.5" => {
            (EmbeddingModel::BGEBaseENV15, 768, "BAAI/bge-base-en-v1.5")
        }
        other => bail!("Unsupported embedding model '{}'", other),
    };
    Ok(resolved)
}

/// FastEmbed-based embedding provider running locally via ONNX
pub struct FastEmbedManager {
    model: Mutex<TextEmbedding>,
    dimension: usize,
    name: &'static str,
}

impl FastEmbedManager {
    /// Create a new FastEmbedManager with the default model (all-MiniLM-L6-v2)
    pub fn new() -> Result<Self> {
        Self::from_model_name("all-MiniLM-L6-v2")
    }

    /// Create a manager for a model named in configuration
    pub fn from_model_name(name: &str) -> Result<Self> {
        let (model, dimension, canonical) = resolve_model(name)?;
        tracing::info!("Initializing FastEmbed model: {}", canonical);

        let mut options = InitOptions::default();
        options.model_name = model;
        options.show_download_progress = true;

        let embedding_model =
            TextEmbedding::try_new(options).context("Failed to initialize FastEmbed model")?;

        Ok(Self {
            model: Mutex::new(embedding_model),
            dimension,
            name: canonical,
        })
    }
}

impl EmbeddingProvider for FastEmbedManager {
    fn embed_batch(&self, texts: Vec<String>) -> Result<Vec<Vec<f32>>> {
        if texts.is_empty() {
            return Ok(vec![]);
        }

        tracing::debug!("Generating embeddings for {} texts", texts.len());

        let mut model = self
            .model
            .lock()
            .map_err(|e| anyhow::anyhow!("Embedding model lock poisoned: {}", e))?;
        model
            .embed(texts, None)
            .context("Failed to generate embeddings")
    }

    fn dimension(&self) -> usize {
        self.dimension
    }

    fn model_name(&self) -> &str {
        self.name
    }
}
