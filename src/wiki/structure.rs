//! The wiki outline produced by structure synthesis

use serde::{Deserialize, Serialize};
use std::fmt;

/// How central a page is to understanding the repository
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Importance {
    High,
    #[default]
    Medium,
    Low,
}

impl Importance {
    /// Lenient parse; anything unrecognized is `Medium`
    pub fn parse_lenient(value: &str) -> Self {
        match value.trim().to_ascii_lowercase().as_str() {
            "high" => Importance::High,
            "low" => Importance::Low,
            _ => Importance::Medium,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Section {
    pub id: String,
    pub title: String,
    /// Ids of pages listed in this section
    pub page_refs: Vec<String>,
    /// Ids of nested sections
    pub subsection_refs: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Page {
    pub id: String,
    pub title: String,
    pub description: String,
    pub importance: Importance,
    /// Repository-relative paths the page should be written from
    pub relevant_files: Vec<String>,
    /// Ids of related pages
    pub related_page_refs: Vec<String>,
    pub parent_section_ref: Option<String>,
}

/// Kind of reference that failed to resolve
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReferenceKind {
    SectionPage,
    Subsection,
    RelatedPage,
    ParentSection,
}

impl fmt::Display for ReferenceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ReferenceKind::SectionPage => "page_ref",
            ReferenceKind::Subsection => "section_ref",
            ReferenceKind::RelatedPage => "related",
            ReferenceKind::ParentSection => "parent_section",
        };
        f.write_str(name)
    }
}

/// A reference whose target id does not exist in the document
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DanglingReference {
    /// Id of the section or page holding the reference
    pub from: String,
    pub kind: ReferenceKind,
    pub target: String,
}

impl fmt::Display for DanglingReference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} -> {} '{}'", self.from, self.kind, self.target)
    }
}

/// Title, description, sections and pages of a wiki
///
/// References between sections and pages are plain ids. Lookups that follow
/// a reference return `None` when the target is missing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StructureDocument {
    title: String,
    description: String,
    sections: Vec<Section>,
    pages: Vec<Page>,
}

impl StructureDocument {
    pub fn new(
        title: impl Into<String>,
        description: impl Into<String>,
        sections: Vec<Section>,
        pages: Vec<Page>,
    ) -> Self {
        Self {
            title: title.into(),
            description: description.into(),
            sections,
            pages,
        }
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn sections(&self) -> &[Section] {
        &self.sections
    }

    /// Pages in document order
    pub fn pages(&self) -> &[Page] {
        &self.pages
    }

    pub fn page(&self, id: &str) -> Option<&Page> {
        self.pages.iter().find(|p| p.id == id)
    }

    pub fn section(&self, id: &str) -> Option<&Section> {
        self.sections.iter().find(|s| s.id == id)
    }

    /// Pages listed by `section`, skipping dangling ids
    pub fn section_pages<'a>(&'a self, section: &'a Section) -> impl Iterator<Item = &'a Page> {
        section.page_refs.iter().filter_map(|id| self.page(id))
    }

    /// Nested sections of `section`, skipping dangling ids
    pub fn subsections<'a>(&'a self, section: &'a Section) -> impl Iterator<Item = &'a Section> {
        section
            .subsection_refs
            .iter()
            .filter_map(|id| self.section(id))
    }

    pub fn related_pages<'a>(&'a self, page: &'a Page) -> impl Iterator<Item = &'a Page> {
        page.related_page_refs.iter().filter_map(|id| self.page(id))
    }

    pub fn parent_section(&self, page: &Page) -> Option<&Section> {
        page.parent_section_ref
            .as_deref()
            .and_then(|id| self.section(id))
    }

    /// Sections that are not nested inside another section
    pub fn root_sections(&self) -> impl Iterator<Item = &Section> {
        self.sections.iter().filter(|candidate| {
            !self
                .sections
                .iter()
                .any(|s| s.subsection_refs.iter().any(|r| *r == candidate.id))
        })
    }

    /// Every reference whose target is missing, in document order
    pub fn dangling_references(&self) -> Vec<DanglingReference> {
        let mut dangling = Vec::new();

        for section in &self.sections {
            for target in &section.page_refs {
                if self.page(target).is_none() {
                    dangling.push(DanglingReference {
                        from: section.id.clone(),
                        kind: ReferenceKind::SectionPage,
                        target: target.clone(),
                    });
                }
            }
            for target in &section.subsection_refs {
                if self.section(target).is_none() {
                    dangling.push(DanglingReference {
                        from: section.id.clone(),
                        kind: ReferenceKind::Subsection,
                        target: target.clone(),
                    });
                }
            }
        }

        for page in &self.pages {
            for target in &page.related_page_refs {
                if self.page(target).is_none() {
                    dangling.push(DanglingReference {
                        from: page.id.clone(),
                        kind: ReferenceKind::RelatedPage,
                        target: target.clone(),
                    });
                }
            }
            if let Some(target) = &page.parent_section_ref
                && self.section(target).is_none()
            {
                dangling.push(DanglingReference {
                    from: page.id.clone(),
                    kind: ReferenceKind::ParentSection,
                    target: target.clone(),
                });
            }
        }

        dangling
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn page(id: &str, related: &[&str], parent: Option<&str>) -> Page {
        Page {
            id: id.to_string(),
            title: format!("Title {}", id),
            description: String::new(),
            importance: Importance::Medium,
            relevant_files: vec![],
            related_page_refs: related.iter().map(|s| s.to_string()).collect(),
            parent_section_ref: parent.map(str::to_string),
        }
    }

    fn section(id: &str, pages: &[&str], subs: &[&str]) -> Section {
        Section {
            id: id.to_string(),
            title: format!("Section {}", id),
            page_refs: pages.iter().map(|s| s.to_string()).collect(),
            subsection_refs: subs.iter().map(|s| s.to_string()).collect(),
        }
    }

    fn sample() -> StructureDocument {
        StructureDocument::new(
            "Wiki",
            "A wiki",
            vec![
                section("s1", &["p1", "p2"], &["s2"]),
                section("s2", &["p3", "missing-page"], &["missing-section"]),
            ],
            vec![
                page("p1", &["p2"], Some("s1")),
                page("p2", &["nope"], Some("s1")),
                page("p3", &[], Some("gone")),
            ],
        )
    }

    #[test]
    fn test_importance_parse_lenient() {
        assert_eq!(Importance::parse_lenient("HIGH"), Importance::High);
        assert_eq!(Importance::parse_lenient(" low "), Importance::Low);
        assert_eq!(Importance::parse_lenient("critical"), Importance::Medium);
        assert_eq!(Importance::parse_lenient(""), Importance::Medium);
    }

    #[test]
    fn test_lookups() {
        let doc = sample();
        assert_eq!(doc.page("p2").map(|p| p.title.as_str()), Some("Title p2"));
        assert!(doc.page("missing-page").is_none());
        assert!(doc.section("s2").is_some());
    }

    #[test]
    fn test_references_resolve_to_none_when_dangling() {
        let doc = sample();
        let s2 = doc.section("s2").unwrap();
        let ids: Vec<&str> = doc.section_pages(s2).map(|p| p.id.as_str()).collect();
        assert_eq!(ids, vec!["p3"]);
        assert_eq!(doc.subsections(s2).count(), 0);

        let p3 = doc.page("p3").unwrap();
        assert!(doc.parent_section(p3).is_none());

        let p1 = doc.page("p1").unwrap();
        assert_eq!(doc.parent_section(p1).map(|s| s.id.as_str()), Some("s1"));
        assert_eq!(doc.related_pages(p1).count(), 1);
    }

    #[test]
    fn test_root_sections() {
        let doc = sample();
        let roots: Vec<&str> = doc.root_sections().map(|s| s.id.as_str()).collect();
        assert_eq!(roots, vec!["s1"]);
    }

    #[test]
    fn test_dangling_references() {
        let doc = sample();
        let dangling = doc.dangling_references();
        let rendered: Vec<String> = dangling.iter().map(|d| d.to_string()).collect();
        assert_eq!(
            rendered,
            vec![
                "s2 -> page_ref 'missing-page'",
                "s2 -> section_ref 'missing-section'",
                "p2 -> related 'nope'",
                "p3 -> parent_section 'gone'",
            ]
        );
    }

    #[test]
    fn test_empty_document_has_no_dangling_references() {
        let doc = StructureDocument::new("", "", vec![], vec![]);
        assert!(doc.dangling_references().is_empty());
        assert!(doc.pages().is_empty());
    }
}
