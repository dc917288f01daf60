//! # repo-wiki - Repository wiki generation with retrieval-augmented models
//!
//! Turns a source repository into a structured, navigable wiki by combining a
//! generative text model with a retrieval index built from the repository's
//! own files, and answers questions against the generated wiki.
//!
//! ## Pipeline
//!
//! ```text
//! repository URL
//!      │ git (depth-1 clone)
//!      ▼
//! file tree + README ──► structure prompt ──► synthesizer (chunked, continues
//!      │                                       until </wiki_structure>)
//!      │                                            │
//!      │                                            ▼
//!      │                                      markup repair ──► StructureDocument
//!      ▼                                                              │
//! source files ──► chunker ──► retrieval index (LanceDB + FastEmbed)  │
//!                                     │                               │
//!                                     └──────► page generator ◄───────┘
//!                                                   │
//!                                                   ▼
//!                                   cache entry ──► knowledge index (Q&A)
//! ```
//!
//! ## Modules
//!
//! - [`client`]: End-to-end orchestration (`WikiClient`)
//! - [`wiki`]: Structure synthesis, markup repair, page generation, segments
//! - [`vector_db`]: Retrieval index backed by LanceDB
//! - [`embedding`]: Embedding generation using FastEmbed
//! - [`llm`]: Generative model trait and HTTP backends
//! - [`indexer`]: Repository reading and chunking
//! - [`git`]: Repository acquisition
//! - [`cache`]: Per-repository wiki cache
//! - [`config`]: Configuration with environment variable overrides
//!
//! ## Usage Example
//!
//! ```no_run
//! use repo_wiki::client::WikiClient;
//! use repo_wiki::config::Config;
//! use repo_wiki::types::GenerateRequest;
//! use tokio_util::sync::CancellationToken;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let client = WikiClient::new(Config::new()?).await?;
//!     let request = GenerateRequest {
//!         repo_url: "https://github.com/owner/repo".to_string(),
//!         language: Default::default(),
//!         comprehensive: false,
//!     };
//!     let report = client.generate(&request, &CancellationToken::new()).await?;
//!     for title in report.entry.pages.keys() {
//!         println!("{}", title);
//!     }
//!     Ok(())
//! }
//! ```

/// Per-repository wiki cache
pub mod cache;

/// Pipeline orchestration and question answering
pub mod client;

/// Configuration management with environment variable overrides
pub mod config;

/// Embedding generation using FastEmbed
pub mod embedding;

/// Error types and utilities
pub mod error;

/// Repository acquisition (git clone into a temporary directory)
pub mod git;

/// Include/exclude glob filtering
pub mod glob_utils;

/// Repository reading and text chunking
pub mod indexer;

/// Generative model trait and HTTP backends
pub mod llm;

/// Platform-specific data, cache and config directories
pub mod paths;

/// Prompt assembly
pub mod prompts;

/// Shared request and state types
pub mod types;

/// Retrieval index over embedded chunks
pub mod vector_db;

/// Wiki structure, markup repair, pages and segments
pub mod wiki;

#[cfg(test)]
pub(crate) mod test_support;
