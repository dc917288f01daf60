//! Persistent retrieval index over chunks
//!
//! An index lives in its own directory: the LanceDB table plus a
//! `manifest.json` describing the content and embedder it was built from.
//! The manifest is written last, so a directory without one is an
//! unfinished build.

use super::{ChunkRetriever, LanceVectorDB, VectorDatabase};
use crate::embedding::EmbeddingProvider;
use crate::error::{IndexError, WikiError};
use crate::indexer::Chunk;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::path::{Path, PathBuf};
use std::sync::Arc;

const MANIFEST_FILE: &str = "manifest.json";

/// Describes the content an index was created from
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexManifest {
    pub fingerprint: String,
    pub chunk_count: usize,
    pub embedding_model: String,
    pub dimension: usize,
}

/// SHA-256 over every chunk's source id and text, in order
pub fn content_fingerprint(chunks: &[Chunk]) -> String {
    let mut hasher = Sha256::new();
    for chunk in chunks {
        hasher.update(chunk.source_id.as_bytes());
        hasher.update([0u8]);
        hasher.update(chunk.text.as_bytes());
        hasher.update([0u8]);
    }
    format!("{:x}", hasher.finalize())
}

/// A queryable, persisted set of embedded chunks
pub struct RetrievalIndex {
    db: LanceVectorDB,
    embedder: Arc<dyn EmbeddingProvider>,
    path: PathBuf,
}

impl RetrievalIndex {
    /// Build an index for `chunks` at `path`, or reopen the one already there
    ///
    /// An existing index is reopened only when its manifest names the same
    /// embedding model and dimension as `embedder`. Anything else in the
    /// directory is discarded and rebuilt. A build that fails part way
    /// removes the directory so the next run starts clean.
    pub async fn build(
        chunks: &[Chunk],
        path: &Path,
        embedder: Arc<dyn EmbeddingProvider>,
        batch_size: usize,
    ) -> Result<Self, WikiError> {
        let fingerprint = content_fingerprint(chunks);

        if has_entries(path) {
            match read_manifest(path) {
                Some(manifest) if is_compatible(&manifest, embedder.as_ref()) => {
                    if manifest.fingerprint != fingerprint {
                        tracing::warn!(
                            "Index at {} was built from different content ({} chunks); reusing it anyway",
                            path.display(),
                            manifest.chunk_count
                        );
                    }
                    let index = Self::open(path, embedder).await?;
                    tracing::info!("Reusing existing index at {}", path.display());
                    return Ok(index);
                }
                Some(manifest) => tracing::warn!(
                    "Index at {} was built with {} ({} dims), not {} ({} dims); rebuilding",
                    path.display(),
                    manifest.embedding_model,
                    manifest.dimension,
                    embedder.model_name(),
                    embedder.dimension()
                ),
                None => tracing::warn!(
                    "Index at {} has no readable manifest; rebuilding",
                    path.display()
                ),
            }
            std::fs::remove_dir_all(path).map_err(|e| open_failed(path, e))?;
        }

        std::fs::create_dir_all(path).map_err(|e| open_failed(path, e))?;
        match Self::populate(chunks, path, embedder, batch_size, fingerprint).await {
            Ok(index) => Ok(index),
            Err(e) => {
                if let Err(cleanup) = std::fs::remove_dir_all(path) {
                    tracing::warn!(
                        "Failed to remove partial index at {}: {}",
                        path.display(),
                        cleanup
                    );
                }
                Err(e)
            }
        }
    }

    async fn populate(
        chunks: &[Chunk],
        path: &Path,
        embedder: Arc<dyn EmbeddingProvider>,
        batch_size: usize,
        fingerprint: String,
    ) -> Result<Self, WikiError> {
        let index = Self::open(path, embedder).await?;
        let dimension = index.embedder.dimension();
        index
            .db
            .initialize(dimension)
            .await
            .map_err(|e| open_failed(path, e))?;

        let batch_size = batch_size.max(1);
        let mut stored = 0usize;
        for batch in chunks.chunks(batch_size) {
            let texts: Vec<String> = batch.iter().map(|c| c.text.clone()).collect();
            let embeddings = index.embed(texts).await?;
            if embeddings.len() != batch.len() {
                return Err(IndexError::EmbeddingFailed(format!(
                    "expected {} embeddings, got {}",
                    batch.len(),
                    embeddings.len()
                ))
                .into());
            }
            stored += index
                .db
                .store_chunks(embeddings, batch, stored as u64)
                .await
                .map_err(|e| IndexError::StoreFailed(format!("{:#}", e)))?;
            tracing::debug!("Indexed {}/{} chunks", stored, chunks.len());
        }

        let manifest = IndexManifest {
            fingerprint,
            chunk_count: stored,
            embedding_model: index.embedder.model_name().to_string(),
            dimension,
        };
        write_manifest(path, &manifest)?;

        tracing::info!("Built index with {} chunks at {}", stored, path.display());
        Ok(index)
    }

    /// Open an existing index without touching its content
    ///
    /// Fails when the manifest records a vector dimension other than the
    /// embedder's, since every query would be rejected by the table.
    pub async fn open(path: &Path, embedder: Arc<dyn EmbeddingProvider>) -> Result<Self, WikiError> {
        if let Some(manifest) = read_manifest(path)
            && manifest.dimension != embedder.dimension()
        {
            return Err(open_failed(
                path,
                format!(
                    "index has {}-dimensional vectors from {}, embedder {} produces {}",
                    manifest.dimension,
                    manifest.embedding_model,
                    embedder.model_name(),
                    embedder.dimension()
                ),
            ));
        }

        let db_path = path.to_string_lossy().to_string();
        let db = LanceVectorDB::with_path(&db_path)
            .await
            .map_err(|e| open_failed(path, e))?;
        Ok(Self {
            db,
            embedder,
            path: path.to_path_buf(),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Number of chunks in the index
    pub async fn len(&self) -> Result<usize, WikiError> {
        self.db
            .count()
            .await
            .map_err(|e| IndexError::SearchFailed(format!("{:#}", e)).into())
    }

    pub async fn is_empty(&self) -> Result<bool, WikiError> {
        Ok(self.len().await? == 0)
    }

    /// The `k` chunks most similar to `text`, nearest first
    pub async fn query(&self, text: &str, k: usize) -> Result<Vec<Chunk>, WikiError> {
        if k == 0 || self.is_empty().await? {
            return Ok(Vec::new());
        }

        let mut embeddings = self.embed(vec![text.to_string()]).await?;
        let vector = embeddings
            .pop()
            .ok_or_else(|| IndexError::EmbeddingFailed("no embedding for query".to_string()))?;

        // Over-fetch so ties at the cut-off resolve by insertion order
        let results = self
            .db
            .search(vector, k.saturating_mul(2))
            .await
            .map_err(|e| IndexError::SearchFailed(format!("{:#}", e)))?;

        Ok(results.into_iter().take(k).map(|r| r.chunk).collect())
    }

    async fn embed(&self, texts: Vec<String>) -> Result<Vec<Vec<f32>>, WikiError> {
        let embedder = Arc::clone(&self.embedder);
        let embeddings = tokio::task::spawn_blocking(move || embedder.embed_batch(texts))
            .await
            .map_err(|e| IndexError::EmbeddingFailed(e.to_string()))?
            .map_err(|e| IndexError::EmbeddingFailed(format!("{:#}", e)))?;
        Ok(embeddings)
    }
}

#[async_trait::async_trait]
impl ChunkRetriever for RetrievalIndex {
    async fn retrieve(&self, query: &str, k: usize) -> Result<Vec<Chunk>, WikiError> {
        self.query(query, k).await
    }
}

fn has_entries(path: &Path) -> bool {
    std::fs::read_dir(path)
        .map(|mut entries| entries.next().is_some())
        .unwrap_or(false)
}

fn is_compatible(manifest: &IndexManifest, embedder: &dyn EmbeddingProvider) -> bool {
    manifest.dimension == embedder.dimension() && manifest.embedding_model == embedder.model_name()
}

fn read_manifest(path: &Path) -> Option<IndexManifest> {
    let content = std::fs::read_to_string(path.join(MANIFEST_FILE)).ok()?;
    serde_json::from_str(&content).ok()
}

fn write_manifest(path: &Path, manifest: &IndexManifest) -> Result<(), WikiError> {
    let json = serde_json::to_string_pretty(manifest)
        .map_err(|e| IndexError::StoreFailed(e.to_string()))?;
    std::fs::write(path.join(MANIFEST_FILE), json)
        .map_err(|e| IndexError::StoreFailed(e.to_string()))?;
    Ok(())
}

fn open_failed(path: &Path, err: impl std::fmt::Display) -> WikiError {
    IndexError::OpenFailed {
        path: path.display().to_string(),
        reason: err.to_string(),
    }
    .into()
}
