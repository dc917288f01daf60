//! Repository snapshot reading: eligible source files, file tree and readme

use crate::error::WikiError;
use crate::glob_utils::PathFilter;
use anyhow::{Context, Result};
use ignore::WalkBuilder;
use std::fs;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// Returned by [`read_readme`] when the repository has no `README.md`
pub const MISSING_README: &str = "No README.md found.";

/// A source file read from the repository
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceFile {
    /// Path relative to the repository root, `/`-separated
    pub relative_path: String,
    /// UTF-8 file contents
    pub content: String,
}

pub struct FileWalker {
    pub(crate) root: PathBuf,
    pub(crate) max_file_size: usize,
    pub(crate) extensions: Vec<String>,
    pub(crate) filter: PathFilter,
}

impl FileWalker {
    pub fn new(root: impl AsRef<Path>, max_file_size: usize) -> Self {
        Self {
            root: root.as_ref().to_path_buf(),
            max_file_size,
            extensions: Vec::new(),
            filter: PathFilter::allow_all(),
        }
    }

    /// Restrict the walk to these extensions (without the dot, case-insensitive).
    /// An empty list accepts every extension.
    pub fn with_extensions(mut self, extensions: Vec<String>) -> Self {
        self.extensions = extensions
            .into_iter()
            .map(|e| e.trim_start_matches('.').to_ascii_lowercase())
            .collect();
        self
    }

    pub fn with_patterns(mut self, include_patterns: &[String], exclude_patterns: &[String]) -> Self {
        self.filter = PathFilter::new(include_patterns, exclude_patterns);
        self
    }

    /// Walk the directory and read every eligible file, sorted by path
    pub fn walk(&self) -> Result<Vec<SourceFile>> {
        if !self.root.exists() {
            anyhow::bail!("Root directory does not exist: {:?}", self.root);
        }
        if !self.root.is_dir() {
            anyhow::bail!("Root path is not a directory: {:?}", self.root);
        }

        let mut files = Vec::new();
        let mut skipped = 0usize;

        let walker = WalkBuilder::new(&self.root)
            .standard_filters(true) // Respect .gitignore, .ignore, etc.
            .hidden(false)
            .require_git(false)
            .sort_by_file_name(|a, b| a.cmp(b))
            .build();

        for entry in walker {
            let entry = entry.context("Failed to read directory entry")?;
            let path = entry.path();

            if entry.file_type().is_none_or(|t| !t.is_file()) {
                continue;
            }

            if path.components().any(|c| c.as_os_str() == ".git") {
                continue;
            }

            if !self.has_supported_extension(path) {
                continue;
            }

            let relative_path = relative_path(&self.root, path);
            if !self.filter.is_allowed(&relative_path) {
                tracing::debug!("Skipping filtered file: {}", relative_path);
                continue;
            }

            if let Ok(metadata) = entry.metadata()
                && metadata.len() > self.max_file_size as u64
            {
                tracing::debug!("Skipping large file: {}", relative_path);
                continue;
            }

            match read_utf8(path, &relative_path) {
                Ok(content) => files.push(SourceFile {
                    relative_path,
                    content,
                }),
                Err(e) => {
                    tracing::debug!("{}", e);
                    skipped += 1;
                }
            }
        }

        tracing::info!(
            "Read {} source files ({} unreadable skipped)",
            files.len(),
            skipped
        );
        Ok(files)
    }

    fn has_supported_extension(&self, path: &Path) -> bool {
        if self.extensions.is_empty() {
            return true;
        }
        path.extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_ascii_lowercase())
            .is_some_and(|ext| self.extensions.iter().any(|allowed| *allowed == ext))
    }
}

fn relative_path(root: &Path, path: &Path) -> String {
    path.strip_prefix(root)
        .unwrap_or(path)
        .components()
        .map(|c| c.as_os_str().to_string_lossy())
        .collect::<Vec<_>>()
        .join("/")
}

/// Read a file as UTF-8; undecodable files are a unit-of-work error
fn read_utf8(path: &Path, relative_path: &str) -> Result<String, WikiError> {
    let bytes = fs::read(path).map_err(|e| WikiError::SourceRead {
        path: relative_path.to_string(),
        reason: e.to_string(),
    })?;
    String::from_utf8(bytes).map_err(|e| WikiError::SourceRead {
        path: relative_path.to_string(),
        reason: format!("not valid UTF-8: {}", e.utf8_error()),
    })
}

/// Render the repository layout as an indented tree
///
/// The root is printed as `{root_name}/`; every level below it is indented by
/// two spaces, directories carry a trailing `/`, and within a directory files
/// come before subdirectories. `.git` is omitted.
pub fn build_file_tree(root: &Path, root_name: &str) -> Result<String> {
    let mut lines = vec![format!("{}/", root_name)];

    let walker = WalkDir::new(root)
        .min_depth(1)
        .sort_by(|a, b| {
            a.file_type()
                .is_dir()
                .cmp(&b.file_type().is_dir())
                .then_with(|| a.file_name().cmp(b.file_name()))
        })
        .into_iter()
        .filter_entry(|e| e.file_name() != ".git");

    for entry in walker {
        let entry = entry.with_context(|| format!("Failed to walk {:?}", root))?;
        let indent = "  ".repeat(entry.depth());
        let name = entry.file_name().to_string_lossy();
        if entry.file_type().is_dir() {
            lines.push(format!("{}{}/", indent, name));
        } else {
            lines.push(format!("{}{}", indent, name));
        }
    }

    Ok(lines.join("\n"))
}

/// Contents of `README.md` at the repository root, decoded lossily
pub fn read_readme(root: &Path) -> String {
    let path = root.join("README.md");
    match fs::read(&path) {
        Ok(bytes) => String::from_utf8_lossy(&bytes).into_owned(),
        Err(_) => MISSING_README.to_string(),
    }
}
