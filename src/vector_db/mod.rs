// LanceDB is the embedded vector database backing every retrieval index
pub mod lance_client;
mod retrieval_index;

pub use lance_client::LanceVectorDB;
pub use retrieval_index::{IndexManifest, RetrievalIndex, content_fingerprint};

use crate::error::WikiError;
use crate::indexer::Chunk;
use anyhow::Result;

/// A stored chunk returned by a similarity search
#[derive(Debug, Clone)]
pub struct ScoredChunk {
    pub chunk: Chunk,
    /// Similarity in (0, 1], higher is closer
    pub score: f32,
    /// Insertion order within the index
    pub ordinal: u64,
}

/// Trait for vector database operations
#[async_trait::async_trait]
pub trait VectorDatabase: Send + Sync {
    /// Initialize the database and create the chunk table if needed
    async fn initialize(&self, dimension: usize) -> Result<()>;

    /// Store one embedding per chunk; ordinals start at `first_ordinal`
    async fn store_chunks(
        &self,
        embeddings: Vec<Vec<f32>>,
        chunks: &[Chunk],
        first_ordinal: u64,
    ) -> Result<usize>;

    /// Nearest chunks first, ties in insertion order
    async fn search(&self, query_vector: Vec<f32>, limit: usize) -> Result<Vec<ScoredChunk>>;

    /// Number of stored chunks
    async fn count(&self) -> Result<usize>;
}

/// Anything that can answer "which chunks are most relevant to this text"
#[async_trait::async_trait]
pub trait ChunkRetriever: Send + Sync {
    async fn retrieve(&self, query: &str, k: usize) -> Result<Vec<Chunk>, WikiError>;
}
