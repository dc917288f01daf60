//! Repository acquisition
//!
//! A [`RepositorySource`] turns a repository URL into a snapshot: the
//! rendered file tree, the readme and the eligible source files. The git
//! implementation makes a depth-1 clone into a temporary directory that is
//! removed however the fetch ends.

use crate::config::IndexingConfig;
use crate::error::{GitError, WikiError};
use crate::indexer::{FileWalker, SourceFile, build_file_tree, read_readme};
use crate::types::RepoRef;
use anyhow::{Context, Result};
use async_trait::async_trait;
use git2::FetchOptions;
use git2::build::RepoBuilder;
use std::path::Path;

/// Everything the pipeline reads from a repository
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RepositorySnapshot {
    pub file_tree: String,
    pub readme: String,
    pub files: Vec<SourceFile>,
}

/// Trait for fetching repository snapshots
#[async_trait]
pub trait RepositorySource: Send + Sync {
    async fn fetch(&self, url: &str) -> Result<RepositorySnapshot, WikiError>;
}

/// Read a snapshot from a checked-out repository at `root`
pub fn read_snapshot(
    root: &Path,
    root_name: &str,
    indexing: &IndexingConfig,
) -> Result<RepositorySnapshot> {
    let file_tree = build_file_tree(root, root_name).context("Failed to build file tree")?;
    let readme = read_readme(root);
    let files = FileWalker::new(root, indexing.max_file_size)
        .with_extensions(indexing.extensions.clone())
        .with_patterns(&indexing.include_patterns, &indexing.exclude_patterns)
        .walk()
        .context("Failed to read repository files")?;

    Ok(RepositorySnapshot {
        file_tree,
        readme,
        files,
    })
}

/// Clones repositories with git
pub struct GitRepositorySource {
    indexing: IndexingConfig,
}

impl GitRepositorySource {
    pub fn new(indexing: IndexingConfig) -> Self {
        Self { indexing }
    }

    fn clone_and_read(url: &str, name: &str, indexing: &IndexingConfig) -> Result<RepositorySnapshot, WikiError> {
        let clone_dir = tempfile::Builder::new()
            .prefix("repo-wiki-")
            .tempdir()
            .map_err(|e| GitError::CloneFailed {
                url: url.to_string(),
                reason: format!("failed to create clone directory: {}", e),
            })?;

        let mut builder = RepoBuilder::new();
        // Local transports do not support shallow fetches
        if !Path::new(url).exists() {
            let mut fetch_options = FetchOptions::new();
            fetch_options.depth(1);
            builder.fetch_options(fetch_options);
        }

        tracing::info!("Cloning {} into {}", url, clone_dir.path().display());
        builder
            .clone(url, clone_dir.path())
            .map_err(|e| GitError::CloneFailed {
                url: url.to_string(),
                reason: e.message().to_string(),
            })?;

        let snapshot = read_snapshot(clone_dir.path(), name, indexing)
            .map_err(|e| GitError::SnapshotFailed(format!("{:#}", e)))?;

        tracing::info!(
            "Read {} source file(s) from {}",
            snapshot.files.len(),
            name
        );
        Ok(snapshot)
    }
}

#[async_trait]
impl RepositorySource for GitRepositorySource {
    async fn fetch(&self, url: &str) -> Result<RepositorySnapshot, WikiError> {
        let repo = RepoRef::parse(url)?;
        let url = url.trim().to_string();
        let indexing = self.indexing.clone();

        tokio::task::spawn_blocking(move || Self::clone_and_read(&url, &repo.name, &indexing))
            .await
            .map_err(|e| WikiError::other(format!("Clone task failed: {}", e)))?
    }
}
