//! Deterministic collaborators for unit tests

use crate::embedding::EmbeddingProvider;
use crate::llm::{GenerationRequest, TextGenerator};
use anyhow::Result;
use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use tokio_util::sync::CancellationToken;

const HASH_DIMENSION: usize = 256;

/// Bag-of-words embedder: each lowercase word is hashed into one bucket
pub struct HashEmbedder {
    calls: AtomicUsize,
    dimension: usize,
    /// Fail the given (1-based) `embed_batch` call
    fail_on_call: Option<usize>,
}

impl HashEmbedder {
    pub fn new() -> Self {
        Self::with_dimension(HASH_DIMENSION)
    }

    pub fn with_dimension(dimension: usize) -> Self {
        Self {
            calls: AtomicUsize::new(0),
            dimension: dimension.max(1),
            fail_on_call: None,
        }
    }

    pub fn failing_on_call(mut self, call: usize) -> Self {
        self.fail_on_call = Some(call);
        self
    }

    /// Number of `embed_batch` invocations so far
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn embed_one(text: &str) -> Vec<f32> {
        hash_embed(text, HASH_DIMENSION)
    }
}

fn hash_embed(text: &str, dimension: usize) -> Vec<f32> {
    let mut vector = vec![0.0f32; dimension];
    for word in text
        .split(|c: char| !c.is_alphanumeric())
        .filter(|w| !w.is_empty())
    {
        let mut hash: u64 = 0xcbf29ce484222325;
        for byte in word.to_lowercase().bytes() {
            hash ^= byte as u64;
            hash = hash.wrapping_mul(0x100000001b3);
        }
        vector[(hash % dimension as u64) as usize] += 1.0;
    }
    let norm = vector.iter().map(|v| v * v).sum::<f32>().sqrt();
    if norm > 0.0 {
        vector.iter_mut().for_each(|v| *v /= norm);
    }
    vector
}

impl EmbeddingProvider for HashEmbedder {
    fn embed_batch(&self, texts: Vec<String>) -> Result<Vec<Vec<f32>>> {
        let call = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
        if self.fail_on_call == Some(call) {
            anyhow::bail!("embedding call {} failed", call);
        }
        Ok(texts.iter().map(|t| hash_embed(t, self.dimension)).collect())
    }

    fn dimension(&self) -> usize {
        self.dimension
    }

    fn model_name(&self) -> &str {
        "hash-embedder"
    }
}

/// Replays queued replies in order and records every request it receives
pub struct ScriptedGenerator {
    replies: Mutex<VecDeque<Result<String>>>,
    requests: Mutex<Vec<GenerationRequest>>,
    model_id: String,
    /// Cancel this token while answering the given (1-based) call
    cancel_on_call: Option<(usize, CancellationToken)>,
}

impl ScriptedGenerator {
    pub fn new(replies: Vec<Result<String>>) -> Self {
        Self {
            replies: Mutex::new(replies.into()),
            requests: Mutex::new(Vec::new()),
            model_id: "scripted/model".to_string(),
            cancel_on_call: None,
        }
    }

    pub fn cancelling_on_call(mut self, call: usize, token: CancellationToken) -> Self {
        self.cancel_on_call = Some((call, token));
        self
    }

    pub fn from_texts(replies: &[&str]) -> Self {
        Self::new(replies.iter().map(|r| Ok(r.to_string())).collect())
    }

    pub fn requests(&self) -> Vec<GenerationRequest> {
        self.requests.lock().unwrap().clone()
    }

    pub fn call_count(&self) -> usize {
        self.requests.lock().unwrap().len()
    }
}

#[async_trait]
impl TextGenerator for ScriptedGenerator {
    async fn generate(&self, request: &GenerationRequest) -> Result<String> {
        let call = {
            let mut requests = self.requests.lock().unwrap();
            requests.push(request.clone());
            requests.len()
        };
        if let Some((on_call, token)) = &self.cancel_on_call
            && *on_call == call
        {
            token.cancel();
        }
        self.replies
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Ok(String::new()))
    }

    fn model_id(&self) -> &str {
        &self.model_id
    }
}
