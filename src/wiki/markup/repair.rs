//! Extraction, tag correction and structure recovery for model output

use super::tree::{Element, parse_recovering, parse_strict};
use crate::error::WikiError;
use crate::wiki::structure::{Importance, Page, Section, StructureDocument};

const ROOT_TAG: &str = "wiki_structure";
const SNIPPET_CHARS: usize = 600;

/// Double-escaped angle brackets, longest first
const ENTITY_COLLAPSE: [(&str, char); 4] = [
    ("&amp;amp;lt;", '<'),
    ("&amp;amp;gt;", '>'),
    ("&amp;lt;", '<'),
    ("&amp;gt;", '>'),
];

/// Hyphenated tag names models emit, and their canonical spelling
const TAG_RENAMES: [(&str, &str); 8] = [
    ("page-ref", "page_ref"),
    ("file-path", "file_path"),
    ("related-pages", "related_pages"),
    ("related-page", "related"),
    ("section-ref", "section_ref"),
    ("relevant-files", "relevant_files"),
    ("parent-section", "parent_section"),
    ("wiki-structure", "wiki_structure"),
];

/// Structure markup after repair, and the document parsed from it
#[derive(Debug, Clone)]
pub struct RepairedStructure {
    pub document: StructureDocument,
    /// Corrected markup, re-serialized when recovery was needed
    pub xml: String,
    /// Whether the strict parse failed and the recovering parser was used
    pub recovered: bool,
}

fn snippet(text: &str) -> String {
    text.chars().take(SNIPPET_CHARS).collect()
}

/// Position of the first `<wiki_structure` (or `<wiki-structure`) opening tag
/// at or after `from`, compared case-insensitively
fn find_open(lower: &str, from: usize) -> Option<usize> {
    let mut search = from;
    while let Some(rel) = lower[search..].find("<wiki") {
        let at = search + rel;
        let tail = &lower[at + 1..];
        let named = tail
            .strip_prefix(ROOT_TAG)
            .or_else(|| tail.strip_prefix("wiki-structure"));
        if let Some(after) = named
            && after
                .chars()
                .next()
                .is_some_and(|c| c == '>' || c == '/' || c.is_whitespace())
        {
            return Some(at);
        }
        search = at + 1;
    }
    None
}

/// Byte range end of the first `</wiki_structure>` closing tag at or after `from`
fn find_close(lower: &str, from: usize) -> Option<usize> {
    let mut search = from;
    while let Some(rel) = lower[search..].find("</wiki") {
        let at = search + rel;
        let tail = &lower[at + 2..];
        let named = tail
            .strip_prefix(ROOT_TAG)
            .or_else(|| tail.strip_prefix("wiki-structure"));
        if let Some(after) = named {
            let trimmed = after.trim_start();
            if trimmed.starts_with('>') {
                return Some(lower.len() - trimmed.len() + 1);
            }
        }
        search = at + 2;
    }
    None
}

/// Locate the structure block in raw model output
///
/// The block runs from the first opening tag to the first closing tag after
/// it; anything around it, including code fences, is discarded.
pub fn extract_structure_block(text: &str) -> Result<&str, WikiError> {
    let not_found = || WikiError::StructureBlockNotFound {
        snippet: snippet(text),
    };

    if text.trim().is_empty() {
        return Err(WikiError::EmptyModelResponse);
    }

    let lower = text.to_ascii_lowercase();
    let start = find_open(&lower, 0).ok_or_else(not_found)?;
    let end = find_close(&lower, start).ok_or_else(not_found)?;
    Ok(&text[start..end])
}

fn collapse_entities(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut rest = text;

    while let Some(amp) = rest.find('&') {
        out.push_str(&rest[..amp]);
        rest = &rest[amp..];
        match ENTITY_COLLAPSE
            .iter()
            .find(|(pattern, _)| rest.starts_with(pattern))
        {
            Some((pattern, replacement)) => {
                out.push(*replacement);
                rest = &rest[pattern.len()..];
            }
            None => {
                out.push('&');
                rest = &rest[1..];
            }
        }
    }

    out.push_str(rest);
    out
}

fn rename_tags(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut rest = text;

    while let Some(lt) = rest.find('<') {
        out.push_str(&rest[..=lt]);
        rest = &rest[lt + 1..];

        if let Some(after_slash) = rest.strip_prefix('/') {
            out.push('/');
            rest = after_slash;
        }

        let renamed = TAG_RENAMES.iter().find(|(wrong, _)| {
            rest.strip_prefix(wrong).is_some_and(|after| {
                after
                    .chars()
                    .next()
                    .is_some_and(|c| c == '>' || c == '/' || c.is_whitespace())
            })
        });

        if let Some((wrong, right)) = renamed {
            out.push_str(right);
            rest = &rest[wrong.len()..];
        }
    }

    out.push_str(rest);
    out
}

/// Normalize common model mistakes in structure markup
///
/// Double-escaped angle brackets collapse to `<` and `>`, then hyphenated tag
/// names are renamed to their canonical form in opening, closing and
/// self-closing tags. Applying it twice gives the same result as once.
pub fn correct_markup(text: &str) -> String {
    rename_tags(&collapse_entities(text))
}

fn child_text(element: &Element, name: &str) -> String {
    element
        .child(name)
        .map(|c| c.text().trim().to_string())
        .unwrap_or_default()
}

fn ref_list(element: &Element, container: &str, item: &str) -> Vec<String> {
    element
        .child(container)
        .map(|c| {
            c.children_named(item)
                .map(|e| e.text().trim().to_string())
                .filter(|t| !t.is_empty())
                .collect()
        })
        .unwrap_or_default()
}

/// Convert a parsed structure tree into a document
///
/// Pages are collected from anywhere below the root. Pages without a title
/// become "Untitled" and elements without an id get a positional one.
pub fn to_structure_document(root: &Element) -> StructureDocument {
    let sections = root
        .descendants_named("section")
        .into_iter()
        .enumerate()
        .map(|(i, section)| {
            let mut subsection_refs = ref_list(section, "subsections", "section_ref");
            if let Some(subs) = section.child("subsections") {
                subsection_refs.extend(
                    subs.children_named("section")
                        .filter_map(|s| s.attribute("id"))
                        .map(str::to_string),
                );
            }
            Section {
                id: section
                    .attribute("id")
                    .map(str::to_string)
                    .unwrap_or_else(|| format!("section-{}", i + 1)),
                title: child_text(section, "title"),
                page_refs: ref_list(section, "pages", "page_ref"),
                subsection_refs,
            }
        })
        .collect();

    let pages = root
        .descendants_named("page")
        .into_iter()
        .enumerate()
        .map(|(i, page)| {
            let title = child_text(page, "title");
            let parent = child_text(page, "parent_section");
            Page {
                id: page
                    .attribute("id")
                    .map(str::to_string)
                    .unwrap_or_else(|| format!("page-{}", i + 1)),
                title: if title.is_empty() {
                    "Untitled".to_string()
                } else {
                    title
                },
                description: child_text(page, "description"),
                importance: Importance::parse_lenient(&child_text(page, "importance")),
                relevant_files: ref_list(page, "relevant_files", "file_path"),
                related_page_refs: ref_list(page, "related_pages", "related"),
                parent_section_ref: (!parent.is_empty()).then_some(parent),
            }
        })
        .collect();

    StructureDocument::new(
        child_text(root, "title"),
        child_text(root, "description"),
        sections,
        pages,
    )
}

/// Extract, correct and parse the structure markup in raw model output
pub fn repair_structure(raw: &str) -> Result<RepairedStructure, WikiError> {
    let block = extract_structure_block(raw)?;
    let corrected = correct_markup(block);

    let (root, xml, recovered) = match parse_strict(&corrected) {
        Ok(root) => (root, corrected, false),
        Err(strict_err) => {
            tracing::warn!(
                "Structure markup is not well-formed ({}), recovering",
                strict_err
            );
            let tree = parse_recovering(&corrected).ok_or_else(|| {
                WikiError::UnrecoverableMarkup(format!("{} (no element recovered)", strict_err))
            })?;
            let xml = tree.to_markup();
            let root = parse_strict(&xml).map_err(|e| {
                WikiError::UnrecoverableMarkup(format!(
                    "{}; recovered markup still invalid: {}",
                    strict_err, e
                ))
            })?;
            (root, xml, true)
        }
    };

    let document = to_structure_document(&root);

    let dangling = document.dangling_references();
    if !dangling.is_empty() {
        tracing::debug!(
            "Structure has {} dangling references: {}",
            dangling.len(),
            dangling
                .iter()
                .map(|d| d.to_string())
                .collect::<Vec<_>>()
                .join(", ")
        );
    }

    tracing::info!(
        "Parsed wiki structure '{}' with {} sections and {} pages",
        document.title(),
        document.sections().len(),
        document.pages().len()
    );

    Ok(RepairedStructure {
        document,
        xml,
        recovered,
    })
}
