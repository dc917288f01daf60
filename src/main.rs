//! # repo-wiki CLI
//!
//! ```bash
//! # Generate (or load from cache) the wiki for a repository
//! repo-wiki generate --repo-url https://github.com/owner/repo --language ja --comprehensive
//!
//! # Ask a question against a generated wiki
//! repo-wiki ask --repo-url https://github.com/owner/repo "How is the config loaded?"
//!
//! # Split a markdown page into text and diagram segments
//! repo-wiki segments page.md
//! ```

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use repo_wiki::cache::CacheEntry;
use repo_wiki::client::WikiClient;
use repo_wiki::config::Config;
use repo_wiki::types::{GenerateRequest, WikiLanguage};
use repo_wiki::wiki::segments::{Segment, split_segments_with_spans, unescape_diagram};
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use tokio_util::sync::CancellationToken;

/// Generate a structured wiki for a source repository
#[derive(Parser)]
#[command(name = "repo-wiki", version, about)]
struct Cli {
    /// Path to a TOML configuration file (defaults to the platform config directory)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Generate the wiki for a repository, or load it from the cache
    Generate {
        /// Repository URL to clone
        #[arg(long)]
        repo_url: String,

        /// Content language: en, ja, zh, zh-tw, es, kr, vi, pt-br, fr, ru
        #[arg(long, default_value = "en")]
        language: WikiLanguage,

        /// Ask for a sectioned structure instead of a flat page list
        #[arg(long)]
        comprehensive: bool,

        /// Model id (overrides configuration)
        #[arg(long)]
        model: Option<String>,

        /// Directory to write the structure and one markdown file per page to
        #[arg(long)]
        output: Option<PathBuf>,

        /// Print the generation report as JSON
        #[arg(long)]
        json: bool,
    },

    /// Answer a question using a previously generated wiki
    Ask {
        /// Repository URL the wiki was generated from
        #[arg(long)]
        repo_url: String,

        /// Model id (overrides configuration)
        #[arg(long)]
        model: Option<String>,

        /// Print the retrieved context instead of asking the model
        #[arg(long)]
        context_only: bool,

        /// The question
        question: String,
    },

    /// Split a markdown file into text and diagram segments
    Segments {
        /// Markdown file to split
        file: PathBuf,
    },
}

fn load_config(path: Option<&Path>, model: Option<String>) -> Result<Config> {
    let mut config = match path {
        Some(path) => Config::from_file(path)?,
        None => Config::load_or_default()?,
    };
    config.apply_env_overrides();
    if let Some(model) = model {
        config.llm.model_id = model;
    }
    config.validate()?;
    Ok(config)
}

/// File name for a page title: alphanumerics kept, everything else `-`
fn page_file_name(title: &str) -> String {
    let slug: String = title
        .chars()
        .map(|c| if c.is_alphanumeric() { c.to_ascii_lowercase() } else { '-' })
        .collect();
    let slug = slug
        .split('-')
        .filter(|part| !part.is_empty())
        .collect::<Vec<_>>()
        .join("-");
    if slug.is_empty() {
        "page.md".to_string()
    } else {
        format!("{}.md", slug)
    }
}

/// File names for `titles` in order; a repeated slug gets `-2`, `-3`, ...
fn unique_page_file_names<'a>(titles: impl IntoIterator<Item = &'a str>) -> Vec<String> {
    let mut taken = HashSet::new();
    titles
        .into_iter()
        .map(|title| {
            let name = page_file_name(title);
            let stem = name.trim_end_matches(".md").to_string();
            let mut candidate = name;
            let mut n = 2;
            while !taken.insert(candidate.clone()) {
                candidate = format!("{}-{}.md", stem, n);
                n += 1;
            }
            candidate
        })
        .collect()
}

fn write_output(dir: &Path, entry: &CacheEntry) -> Result<()> {
    let pages_dir = dir.join("pages");
    std::fs::create_dir_all(&pages_dir)
        .with_context(|| format!("Failed to create output directory {:?}", pages_dir))?;

    std::fs::write(dir.join("structure.xml"), &entry.xml).context("Failed to write structure")?;
    let pages = entry.ordered_pages();
    let names = unique_page_file_names(pages.iter().map(|(title, _)| *title));
    for ((_, body), name) in pages.iter().zip(&names) {
        let path = pages_dir.join(name);
        std::fs::write(&path, body).with_context(|| format!("Failed to write {:?}", path))?;
    }
    tracing::info!("Wrote {} page(s) to {}", entry.pages.len(), dir.display());
    Ok(())
}

async fn run(cli: Cli) -> Result<()> {
    let cancel = CancellationToken::new();
    let ctrl_c = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::warn!("Interrupted, cancelling");
            ctrl_c.cancel();
        }
    });

    match cli.command {
        Commands::Generate {
            repo_url,
            language,
            comprehensive,
            model,
            output,
            json,
        } => {
            let config = load_config(cli.config.as_deref(), model)?;
            let client = WikiClient::new(config).await?;
            let request = GenerateRequest {
                repo_url,
                language,
                comprehensive,
            };
            let report = client.generate(&request, &cancel).await?;

            if let Some(dir) = output {
                write_output(&dir, &report.entry)?;
            }

            if json {
                let failures: Vec<_> = report
                    .failures
                    .iter()
                    .map(|f| {
                        serde_json::json!({
                            "page_id": f.page_id,
                            "title": f.title,
                            "reason": f.reason,
                        })
                    })
                    .collect();
                let value = serde_json::json!({
                    "from_cache": report.from_cache,
                    "entry": report.entry,
                    "failures": failures,
                });
                println!("{}", serde_json::to_string_pretty(&value)?);
            } else {
                println!(
                    "{} page(s){}",
                    report.entry.pages.len(),
                    if report.from_cache { " (cached)" } else { "" }
                );
                for (title, _) in report.entry.ordered_pages() {
                    println!("  {}", title);
                }
                for failure in &report.failures {
                    println!("  failed: {} ({})", failure.title, failure.reason);
                }
            }
            client.shutdown();
        }
        Commands::Ask {
            repo_url,
            model,
            context_only,
            question,
        } => {
            let config = load_config(cli.config.as_deref(), model)?;
            let client = WikiClient::new(config).await?;
            if context_only {
                let state = client.retrieve(&repo_url, &question).await?;
                println!("{}", state.context);
            } else {
                let answer = client.answer(&repo_url, &question, &cancel).await?;
                println!("{}", answer);
            }
            client.shutdown();
        }
        Commands::Segments { file } => {
            let markdown = std::fs::read_to_string(&file)
                .with_context(|| format!("Failed to read {:?}", file))?;
            let segments: Vec<_> = split_segments_with_spans(&markdown)
                .into_iter()
                .map(|s| {
                    let segment = match s.segment {
                        Segment::Diagram(content) => Segment::Diagram(unescape_diagram(&content)),
                        text => text,
                    };
                    serde_json::json!({
                        "segment": segment,
                        "start": s.span.start,
                        "end": s.span.end,
                    })
                })
                .collect();
            println!("{}", serde_json::to_string_pretty(&segments)?);
        }
    }

    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .init();

    run(Cli::parse()).await
}
