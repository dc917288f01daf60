//! Pipeline orchestration
//!
//! [`WikiClient`] owns the collaborators (model, embedder, repository
//! source) and the cache, and runs the end-to-end generation: fetch,
//! structure synthesis and repair, source indexing, page writing, and the
//! knowledge index used for question answering.

use crate::cache::{CacheEntry, CacheKey, WikiCache, safe_model_id};
use crate::config::Config;
use crate::embedding::{EmbeddingProvider, FastEmbedManager};
use crate::error::{IndexError, WikiError};
use crate::git::{GitRepositorySource, RepositorySource};
use crate::indexer::{Chunk, TextChunker};
use crate::llm::{GenerationRequest, HttpGenerator, TextGenerator};
use crate::prompts;
use crate::types::{GenerateRequest, RepoRef, RetrievalState};
use crate::vector_db::RetrievalIndex;
use crate::wiki::markup::repair_structure;
use crate::wiki::pages::{PageFailure, PageGenerator, PageSettings};
use crate::wiki::synthesizer::{StructureSynthesizer, SynthesisConfig};
use anyhow::{Context, Result};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;
use tokio_util::sync::CancellationToken;

/// Separator between retrieved chunks in an answer context
pub const CONTEXT_SEPARATOR: &str = "\n\n---\n\n";

/// Outcome of [`WikiClient::generate`]
#[derive(Debug, Clone)]
pub struct GenerationReport {
    pub entry: CacheEntry,
    /// True when the entry came from the cache and nothing was generated
    pub from_cache: bool,
    /// Pages that were planned but produced no content
    pub failures: Vec<PageFailure>,
}

/// Main client for generating wikis and answering questions about them
///
/// # Example
///
/// ```no_run
/// use repo_wiki::client::WikiClient;
/// use repo_wiki::config::Config;
/// use repo_wiki::types::GenerateRequest;
/// use tokio_util::sync::CancellationToken;
///
/// #[tokio::main]
/// async fn main() -> anyhow::Result<()> {
///     let client = WikiClient::new(Config::default()).await?;
///     let request = GenerateRequest {
///         repo_url: "https://github.com/owner/repo".to_string(),
///         language: Default::default(),
///         comprehensive: true,
///     };
///     let report = client.generate(&request, &CancellationToken::new()).await?;
///     println!("{} pages", report.entry.pages.len());
///     Ok(())
/// }
/// ```
#[derive(Clone)]
pub struct WikiClient {
    pub(crate) config: Arc<Config>,
    pub(crate) generator: Arc<dyn TextGenerator>,
    pub(crate) embedder: Arc<dyn EmbeddingProvider>,
    pub(crate) source: Arc<dyn RepositorySource>,
    pub(crate) cache: WikiCache,
}

impl WikiClient {
    /// Create a client with the default collaborators for `config`
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration is invalid, the generation
    /// backend is unknown, or the embedding model cannot be initialized.
    pub async fn new(config: Config) -> Result<Self> {
        config.validate().context("Invalid configuration")?;

        let generator =
            HttpGenerator::connect(&config.llm).context("Failed to create generation backend")?;

        let model_name = config.embedding.model_name.clone();
        let embedder = tokio::task::spawn_blocking(move || FastEmbedManager::from_model_name(&model_name))
            .await
            .context("Embedding model initialization task failed")??;

        let source = GitRepositorySource::new(config.indexing.clone());

        Ok(Self::with_components(
            config,
            Arc::new(generator),
            Arc::new(embedder),
            Arc::new(source),
        ))
    }

    /// Create a client from explicitly constructed collaborators
    pub fn with_components(
        config: Config,
        generator: Arc<dyn TextGenerator>,
        embedder: Arc<dyn EmbeddingProvider>,
        source: Arc<dyn RepositorySource>,
    ) -> Self {
        let cache = WikiCache::new(config.cache.cache_dir.clone());
        Self {
            config: Arc::new(config),
            generator,
            embedder,
            source,
            cache,
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn cache(&self) -> &WikiCache {
        &self.cache
    }

    pub fn model_id(&self) -> &str {
        self.generator.model_id()
    }

    /// Index over the repository's source files
    pub fn source_index_path(&self, repo: &RepoRef) -> PathBuf {
        self.config
            .retrieval
            .index_root
            .join(format!("{}__{}", repo.name, safe_model_id(self.model_id())))
    }

    /// Index over the generated wiki, used for answering questions
    pub fn knowledge_index_path(&self, repo: &RepoRef) -> PathBuf {
        self.config
            .retrieval
            .index_root
            .join(format!("{}__{}_chatbot", repo.name, safe_model_id(self.model_id())))
    }

    fn chunker(&self) -> TextChunker {
        TextChunker::new(
            self.config.indexing.chunk_size,
            self.config.indexing.chunk_overlap,
        )
    }

    /// Generate the wiki for a repository, or load it from the cache
    pub async fn generate(
        &self,
        request: &GenerateRequest,
        cancel: &CancellationToken,
    ) -> Result<GenerationReport, WikiError> {
        let start = Instant::now();
        let repo = RepoRef::parse(&request.repo_url)?;
        let key = CacheKey::new(repo.name.clone(), self.model_id());

        if let Some(entry) = self.cache.load(&key)? {
            tracing::info!("Using cached wiki for {}", repo.slug());
            self.build_knowledge_index(&repo, &entry).await?;
            return Ok(GenerationReport {
                entry,
                from_cache: true,
                failures: Vec::new(),
            });
        }

        tracing::info!("Fetching {}", request.repo_url);
        let snapshot = self.source.fetch(&request.repo_url).await?;

        let prompt = prompts::structure_prompt(
            &repo,
            &snapshot.file_tree,
            &snapshot.readme,
            request.language,
            request.comprehensive,
        );
        let synthesis = StructureSynthesizer::new(
            self.generator.as_ref(),
            SynthesisConfig::from(&self.config.generation),
        )
        .synthesize(&prompt, cancel)
        .await?;
        tracing::info!(
            "Structure synthesized in {} request(s) ({:?})",
            synthesis.iterations,
            synthesis.termination
        );

        let repaired = repair_structure(&synthesis.markup)?;
        let structure = repaired.document;

        let sources: Vec<(&str, &str)> = snapshot
            .files
            .iter()
            .map(|f| (f.relative_path.as_str(), f.content.as_str()))
            .collect();
        let chunks = self.chunker().chunk_sources(&sources);
        tracing::info!(
            "Chunked {} file(s) into {} chunk(s)",
            snapshot.files.len(),
            chunks.len()
        );
        let source_index = RetrievalIndex::build(
            &chunks,
            &self.source_index_path(&repo),
            Arc::clone(&self.embedder),
            self.config.embedding.batch_size,
        )
        .await?;

        let settings = PageSettings {
            top_k: self.config.retrieval.top_k,
            max_output_tokens: self.config.generation.page_max_tokens,
            concurrency: self.config.generation.page_concurrency,
            language: request.language,
        };
        let pages = PageGenerator::new(self.generator.as_ref(), &source_index, settings)
            .generate_all(&structure, cancel)
            .await;

        if cancel.is_cancelled() {
            tracing::warn!("Generation for {} cancelled; nothing cached", repo.slug());
            return Err(WikiError::EmptyModelResponse);
        }

        let entry = CacheEntry {
            file_tree: snapshot.file_tree,
            readme: snapshot.readme,
            xml: repaired.xml,
            pages: pages.pages,
        };

        // Nothing succeeded: report without caching or indexing
        if entry.pages.is_empty() && !pages.failures.is_empty() {
            tracing::warn!(
                "All {} page(s) of {} failed; nothing cached",
                pages.failures.len(),
                repo.slug()
            );
            return Ok(GenerationReport {
                entry,
                from_cache: false,
                failures: pages.failures,
            });
        }

        self.build_knowledge_index(&repo, &entry).await?;
        self.cache.save(&key, &entry)?;

        tracing::info!(
            "Generated wiki for {}: {} page(s), {} failure(s) in {:?}",
            repo.slug(),
            entry.pages.len(),
            pages.failures.len(),
            start.elapsed()
        );

        Ok(GenerationReport {
            entry,
            from_cache: false,
            failures: pages.failures,
        })
    }

    async fn build_knowledge_index(
        &self,
        repo: &RepoRef,
        entry: &CacheEntry,
    ) -> Result<RetrievalIndex, WikiError> {
        let chunks = knowledge_chunks(entry, &self.chunker());
        RetrievalIndex::build(
            &chunks,
            &self.knowledge_index_path(repo),
            Arc::clone(&self.embedder),
            self.config.embedding.batch_size,
        )
        .await
    }

    /// Retrieve context for a question from a generated wiki
    pub async fn retrieve(&self, repo_url: &str, question: &str) -> Result<RetrievalState, WikiError> {
        let repo = RepoRef::parse(repo_url)?;
        let question = question.trim();
        if question.is_empty() {
            return Ok(RetrievalState::default());
        }

        let path = self.knowledge_index_path(&repo);
        if !path.exists() {
            return Err(IndexError::NotBuilt(path.display().to_string()).into());
        }

        let index = RetrievalIndex::open(&path, Arc::clone(&self.embedder)).await?;
        let chunks = index.query(question, self.config.retrieval.top_k).await?;
        tracing::debug!("Retrieved {} chunk(s) for question", chunks.len());

        Ok(RetrievalState {
            question: question.to_string(),
            context: join_context(&chunks),
        })
    }

    /// Answer a question about a generated wiki
    pub async fn answer(
        &self,
        repo_url: &str,
        question: &str,
        cancel: &CancellationToken,
    ) -> Result<String, WikiError> {
        let state = self.retrieve(repo_url, question).await?;
        if state.question.is_empty() {
            return Err(crate::error::ValidationError::Empty("question".to_string()).into());
        }

        let prompt = prompts::answer_prompt(&state.question, &state.context);
        let request = GenerationRequest::sampled(prompt, self.config.generation.page_max_tokens);
        let reply = tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(WikiError::EmptyModelResponse),
            reply = self.generator.generate(&request) => reply,
        };

        match reply {
            Ok(answer) if !answer.trim().is_empty() => Ok(answer),
            Ok(_) => Err(WikiError::EmptyModelResponse),
            Err(e) => {
                tracing::warn!("Answer request failed: {:#}", e);
                Err(WikiError::EmptyModelResponse)
            }
        }
    }

    /// Release the model, embedder and repository source
    pub fn shutdown(self) {
        tracing::info!(
            "Shutting down client (model {}, embedder {})",
            self.generator.model_id(),
            self.embedder.model_name()
        );
        drop(self);
    }
}

/// Chunks of a wiki entry: file tree, structure, readme and every page
pub fn knowledge_chunks(entry: &CacheEntry, chunker: &TextChunker) -> Vec<Chunk> {
    let page_ids: Vec<String> = entry
        .pages
        .keys()
        .map(|title| format!("pages/{}", title))
        .collect();

    let mut sources: Vec<(&str, &str)> = vec![
        ("file_tree", entry.file_tree.as_str()),
        ("xml", entry.xml.as_str()),
        ("readme", entry.readme.as_str()),
    ];
    sources.extend(
        page_ids
            .iter()
            .zip(entry.pages.values())
            .map(|(id, body)| (id.as_str(), body.as_str())),
    );

    chunker.chunk_sources(&sources)
}

fn join_context(chunks: &[Chunk]) -> String {
    chunks
        .iter()
        .map(|c| c.text.as_str())
        .collect::<Vec<_>>()
        .join(CONTEXT_SEPARATOR)
}
