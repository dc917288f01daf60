//! Generative model collaborator
//!
//! The pipeline talks to a model only through [`TextGenerator`]. The handle is
//! constructed explicitly and owned by the client; nothing here is global.

mod http;

pub use http::{Backend, HttpGenerator};

use anyhow::Result;
use async_trait::async_trait;

/// A single completion request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GenerationRequest {
    pub prompt: String,
    /// Upper bound on generated tokens
    pub max_output_tokens: usize,
    /// Greedy decoding when true, sampling otherwise
    pub deterministic: bool,
}

impl GenerationRequest {
    /// Request decoded greedily, used for structure synthesis
    pub fn deterministic(prompt: impl Into<String>, max_output_tokens: usize) -> Self {
        Self {
            prompt: prompt.into(),
            max_output_tokens,
            deterministic: true,
        }
    }

    /// Request decoded with sampling, used for page content and answers
    pub fn sampled(prompt: impl Into<String>, max_output_tokens: usize) -> Self {
        Self {
            prompt: prompt.into(),
            max_output_tokens,
            deterministic: false,
        }
    }
}

/// Trait for text generation backends
#[async_trait]
pub trait TextGenerator: Send + Sync {
    /// Generate a continuation for the prompt; returns only the new text.
    /// An empty string means the model produced nothing.
    async fn generate(&self, request: &GenerationRequest) -> Result<String>;

    /// Identifier of the model, used in cache keys and index paths
    fn model_id(&self) -> &str;
}
