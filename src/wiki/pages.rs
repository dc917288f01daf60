//! Page content generation
//!
//! Every page of a structure gets one retrieval query and one sampled model
//! call. Pages run on a bounded pool but results come back in document order.
//! A page that fails is left out of the page map and listed in the report.

use crate::error::WikiError;
use crate::llm::{GenerationRequest, TextGenerator};
use crate::prompts;
use crate::types::WikiLanguage;
use crate::vector_db::ChunkRetriever;
use crate::wiki::structure::{Page, StructureDocument};
use futures::stream::{self, StreamExt};
use std::collections::{BTreeMap, HashSet};
use tokio_util::sync::CancellationToken;

/// Retrieval query used to gather context for a page
pub fn page_query(page: &Page) -> String {
    format!(
        "Wiki Page: {}. Relevant files: {}",
        page.title,
        page.relevant_files.join(", ")
    )
}

/// A page that produced no content
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageFailure {
    pub page_id: String,
    pub title: String,
    pub reason: String,
}

impl PageFailure {
    pub fn to_error(&self) -> WikiError {
        WikiError::PageGeneration {
            title: self.title.clone(),
            reason: self.reason.clone(),
        }
    }
}

/// Outcome of generating all pages of a structure
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PageGenerationReport {
    /// Page title to markdown body, successful pages only
    pub pages: BTreeMap<String, String>,
    pub failures: Vec<PageFailure>,
}

/// Settings for a page generation run
#[derive(Debug, Clone, Copy)]
pub struct PageSettings {
    pub top_k: usize,
    pub max_output_tokens: usize,
    pub concurrency: usize,
    pub language: WikiLanguage,
}

impl Default for PageSettings {
    fn default() -> Self {
        Self {
            top_k: 5,
            max_output_tokens: 4096,
            concurrency: 1,
            language: WikiLanguage::default(),
        }
    }
}

/// Writes page bodies from retrieved context
pub struct PageGenerator<'a> {
    generator: &'a dyn TextGenerator,
    retriever: &'a dyn ChunkRetriever,
    settings: PageSettings,
}

impl<'a> PageGenerator<'a> {
    pub fn new(
        generator: &'a dyn TextGenerator,
        retriever: &'a dyn ChunkRetriever,
        settings: PageSettings,
    ) -> Self {
        Self {
            generator,
            retriever,
            settings,
        }
    }

    /// Generate every page of `structure`
    pub async fn generate_all(
        &self,
        structure: &StructureDocument,
        cancel: &CancellationToken,
    ) -> PageGenerationReport {
        let mut report = PageGenerationReport::default();

        let mut seen = HashSet::new();
        let mut unique = Vec::new();
        for page in structure.pages() {
            if seen.insert(page.title.as_str()) {
                unique.push(page);
            } else {
                tracing::warn!("Skipping page '{}': duplicate title '{}'", page.id, page.title);
                report.failures.push(PageFailure {
                    page_id: page.id.clone(),
                    title: page.title.clone(),
                    reason: "duplicate page title".to_string(),
                });
            }
        }

        let total = unique.len();
        tracing::info!(
            "Generating {} page(s) with concurrency {}",
            total,
            self.settings.concurrency.max(1)
        );

        let results: Vec<(&Page, Result<String, String>)> = stream::iter(unique)
            .map(|page| async move { (page, self.generate_page(page, cancel).await) })
            .buffered(self.settings.concurrency.max(1))
            .collect()
            .await;

        for (position, (page, result)) in results.into_iter().enumerate() {
            match result {
                Ok(body) => {
                    tracing::info!("Generated page {}/{}: {}", position + 1, total, page.title);
                    report.pages.insert(page.title.clone(), body);
                }
                Err(reason) => {
                    tracing::warn!("Failed to generate page '{}': {}", page.title, reason);
                    report.failures.push(PageFailure {
                        page_id: page.id.clone(),
                        title: page.title.clone(),
                        reason,
                    });
                }
            }
        }

        report
    }

    async fn generate_page(&self, page: &Page, cancel: &CancellationToken) -> Result<String, String> {
        if cancel.is_cancelled() {
            return Err("cancelled".to_string());
        }

        let chunks = self
            .retriever
            .retrieve(&page_query(page), self.settings.top_k)
            .await
            .map_err(|e| format!("retrieval failed: {}", e))?;
        let context = chunks
            .iter()
            .map(|c| c.text.as_str())
            .collect::<Vec<_>>()
            .join("\n\n");
        tracing::debug!("Page '{}': {} context chunk(s)", page.title, chunks.len());

        let prompt = prompts::page_prompt(page, self.settings.language, &context);
        let request = GenerationRequest::sampled(prompt, self.settings.max_output_tokens);

        let reply = tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err("cancelled".to_string()),
            reply = self.generator.generate(&request) => reply,
        };

        match reply {
            Ok(body) if !body.trim().is_empty() => Ok(body),
            Ok(_) => Err(WikiError::EmptyModelResponse.to_string()),
            Err(e) => Err(format!("{:#}", e)),
        }
    }
}
