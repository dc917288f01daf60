use super::*;
use crate::error::WikiError;
use crate::wiki::structure::Importance;

const TWO_SECTIONS_FOUR_PAGES: &str = r#"Here is the structure you asked for:

```xml
<wiki_structure>
  <title>Demo Wiki</title>
  <description>A demo repository</description>
  <sections>
    <section id="section-1">
      <title>Overview</title>
      <pages>
        <page-ref>page-1</page-ref>
        <page-ref>page-2</page-ref>
      </pages>
      <subsections>
        <section-ref>section-2</section-ref>
      </subsections>
    </section>
    <section id="section-2">
      <title>Internals</title>
      <pages>
        <page-ref>page-3</page-ref>
        <page-ref>page-4</page-ref>
      </pages>
    </section>
  </sections>
  <pages>
    <page id="page-1">
      <title>Introduction</title>
      <description>What it is</description>
      <importance>high</importance>
      <relevant_files>
        <file-path>README.md</file-path>
      </relevant_files>
      <related_pages>
        <related>page-2</related>
      </related_pages>
      <parent_section>section-1</parent_section>
    </page>
    <page id="page-2">
      <title>Getting Started</title>
      <importance>medium</importance>
      <relevant_files>
        <file-path>src/main.rs</file-path>
        <file-path>Cargo.toml</file-path>
      </relevant_files>
      <parent_section>section-1</parent_section>
    </page>
    <page id="page-3">
      <title>Parser</title>
      <importance>low</importance>
      <relevant_files>
        <file-path>src/parser.rs</file-path>
      </relevant_files>
      <parent_section>section-2</parent_section>
    </page>
    <page id="page-4">
      <title>Storage</title>
      <relevant_files>
        <file-path>src/storage.rs</file-path>
      </relevant_files>
      <parent_section>section-2</parent_section>
    </page>
  </pages>
</wiki_structure>
```

Let me know if you need anything else."#;

// Extraction

#[test]
fn test_extract_excludes_surrounding_prose_and_fences() {
    let block = extract_structure_block(TWO_SECTIONS_FOUR_PAGES).unwrap();
    assert!(block.starts_with("<wiki_structure>"));
    assert!(block.ends_with("</wiki_structure>"));
}

#[test]
fn test_extract_is_case_insensitive() {
    let text = "noise <WIKI_STRUCTURE><title>x</title></Wiki_Structure> tail";
    assert_eq!(
        extract_structure_block(text).unwrap(),
        "<WIKI_STRUCTURE><title>x</title></Wiki_Structure>"
    );
}

#[test]
fn test_extract_takes_first_close_after_first_open() {
    let text = "</wiki_structure><wiki_structure>a</wiki_structure><wiki_structure>b</wiki_structure>";
    assert_eq!(
        extract_structure_block(text).unwrap(),
        "<wiki_structure>a</wiki_structure>"
    );
}

#[test]
fn test_extract_accepts_attributes_on_root() {
    let text = "<wiki_structure version=\"1\">x</wiki_structure >";
    assert_eq!(extract_structure_block(text).unwrap(), text);
}

#[test]
fn test_extract_ignores_similar_tag_names() {
    let text = "<wiki_structures>x</wiki_structures>";
    assert!(matches!(
        extract_structure_block(text),
        Err(WikiError::StructureBlockNotFound { .. })
    ));
}

#[test]
fn test_extract_missing_closing_marker() {
    let text = "<wiki_structure><title>cut off";
    match extract_structure_block(text) {
        Err(WikiError::StructureBlockNotFound { snippet }) => {
            assert_eq!(snippet, text);
        }
        other => panic!("unexpected result: {:?}", other),
    }
}

#[test]
fn test_extract_snippet_is_truncated() {
    let text = "x".repeat(2000);
    match extract_structure_block(&text) {
        Err(WikiError::StructureBlockNotFound { snippet }) => assert_eq!(snippet.len(), 600),
        other => panic!("unexpected result: {:?}", other),
    }
}

#[test]
fn test_extract_empty_response() {
    assert!(matches!(
        extract_structure_block("   "),
        Err(WikiError::EmptyModelResponse)
    ));
}

// Correction

#[test]
fn test_correct_collapses_double_escaped_entities() {
    assert_eq!(
        correct_markup("&amp;amp;lt;title&amp;amp;gt;x&amp;lt;/title&amp;gt;"),
        "<title>x</title>"
    );
}

#[test]
fn test_correct_leaves_single_escapes_alone() {
    assert_eq!(correct_markup("a &lt; b &amp; c"), "a &lt; b &amp; c");
}

#[test]
fn test_correct_renames_open_close_and_self_closing_tags() {
    assert_eq!(
        correct_markup("<page-ref>p1</page-ref><file-path/><related-page attr=\"x\">p2</related-page>"),
        "<page_ref>p1</page_ref><file_path/><related attr=\"x\">p2</related>"
    );
}

#[test]
fn test_correct_renames_whole_names_only() {
    assert_eq!(
        correct_markup("<related-pages><related-page>p</related-page></related-pages>"),
        "<related_pages><related>p</related></related_pages>"
    );
    assert_eq!(correct_markup("<page-reference>"), "<page-reference>");
}

#[test]
fn test_correct_does_not_touch_text() {
    assert_eq!(correct_markup("<title>page-ref</title>"), "<title>page-ref</title>");
}

#[test]
fn test_correct_is_idempotent() {
    let inputs = [
        TWO_SECTIONS_FOUR_PAGES,
        "&amp;amp;amp;lt;x&amp;amp;gt;",
        "&amp;lt;page-ref&amp;gt;p&amp;lt;/page-ref&amp;gt;",
        "<wiki-structure><parent-section>s</parent-section></wiki-structure>",
        "a & b < c > d",
        "&amp;amp;lt;&amp;amp;lt;section-ref>",
    ];
    for input in inputs {
        let once = correct_markup(input);
        assert_eq!(correct_markup(&once), once, "input: {input}");
    }
}

// Strict parsing

#[test]
fn test_strict_parses_well_formed() {
    let root = parse_strict("<?xml version=\"1.0\"?><a x=\"1\"><b>t &amp; u</b><!-- c --><b/></a>").unwrap();
    assert_eq!(root.name, "a");
    assert_eq!(root.attribute("x"), Some("1"));
    assert_eq!(root.children_named("b").count(), 2);
    assert_eq!(root.child("b").unwrap().text(), "t & u");
}

#[test]
fn test_strict_rejects_malformed_inputs() {
    let cases = [
        ("<a><b></a>", "mismatched"),
        ("<a><b></b>", "unclosed"),
        ("<a>1 < 2</a>", "unescaped"),
        ("<a>fish & chips</a>", "entity"),
        ("<a x=\"1\" x=\"2\"/>", "duplicate"),
        ("<a x=1/>", "quoted"),
        ("<a/><b/>", "multiple root"),
        ("<a/>trailing", "outside"),
        ("</a>", "unexpected"),
        ("", "no root"),
    ];
    for (input, expected) in cases {
        let err = parse_strict(input).unwrap_err();
        assert!(
            err.message.contains(expected),
            "input {input:?}: got '{}'",
            err.message
        );
    }
}

// Recovering parsing

#[test]
fn test_recover_skips_unknown_closing_tag() {
    let root = parse_recovering("<a><b>x</c></b></a>").unwrap();
    assert_eq!(root.to_markup(), "<a><b>x</b></a>");
}

#[test]
fn test_recover_outer_close_closes_inner() {
    let root = parse_recovering("<a><b><c>x</a>").unwrap();
    assert_eq!(root.to_markup(), "<a><b><c>x</c></b></a>");
}

#[test]
fn test_recover_closes_at_end_of_input() {
    let root = parse_recovering("<a><b>x").unwrap();
    assert_eq!(root.to_markup(), "<a><b>x</b></a>");
}

#[test]
fn test_recover_keeps_stray_markup_and_bare_ampersand_as_text() {
    let root = parse_recovering("<a>1 < 2 & 3 &amp; 4</a>").unwrap();
    assert_eq!(root.text(), "1 < 2 & 3 & 4");
    assert_eq!(root.to_markup(), "<a>1 &lt; 2 &amp; 3 &amp; 4</a>");
}

#[test]
fn test_recover_attributes() {
    let root = parse_recovering("<a x=1 x=\"2\" y=\"3\">t</a>").unwrap();
    assert_eq!(
        root.attributes,
        vec![
            ("x".to_string(), "1".to_string()),
            ("y".to_string(), "3".to_string())
        ]
    );
}

#[test]
fn test_recover_drops_content_after_root() {
    let root = parse_recovering("lead <a>x</a><b>y</b> tail").unwrap();
    assert_eq!(root.to_markup(), "<a>x</a>");
}

#[test]
fn test_recover_without_elements() {
    assert!(parse_recovering("just text < and more").is_none());
}

#[test]
fn test_recovered_markup_parses_strictly() {
    let inputs = [
        "<a><b>x</c></a>",
        "<a><b><c>1 < 2 &",
        "<a x=1 x=2><b y='&bogus;'>t</b>",
    ];
    for input in inputs {
        let recovered = parse_recovering(input).unwrap();
        let reparsed = parse_strict(&recovered.to_markup()).unwrap();
        assert_eq!(reparsed, recovered, "input: {input}");
    }
}

// Full repair

#[test]
fn test_repair_two_sections_four_pages() {
    let repaired = repair_structure(TWO_SECTIONS_FOUR_PAGES).unwrap();
    let doc = &repaired.document;

    assert!(!repaired.recovered);
    assert_eq!(doc.title(), "Demo Wiki");
    assert_eq!(doc.description(), "A demo repository");
    assert_eq!(doc.sections().len(), 2);
    assert_eq!(doc.pages().len(), 4);
    assert!(doc.dangling_references().is_empty());

    let s1 = doc.section("section-1").unwrap();
    assert_eq!(s1.page_refs, vec!["page-1", "page-2"]);
    assert_eq!(s1.subsection_refs, vec!["section-2"]);

    let p2 = doc.page("page-2").unwrap();
    assert_eq!(p2.relevant_files, vec!["src/main.rs", "Cargo.toml"]);
    assert_eq!(p2.parent_section_ref.as_deref(), Some("section-1"));

    let importances: Vec<Importance> = doc.pages().iter().map(|p| p.importance).collect();
    assert_eq!(
        importances,
        vec![
            Importance::High,
            Importance::Medium,
            Importance::Low,
            Importance::Medium
        ]
    );

    assert!(repaired.xml.contains("<page_ref>page-1</page_ref>"));
    assert!(!repaired.xml.contains("page-ref"));
}

#[test]
fn test_repair_recovers_unclosed_elements() {
    let raw = "<wiki_structure><title>Broken</title><pages>\
               <page id=\"a\"><title>First</title>\
               <page id=\"b\"><title>Second</title>\
               </pages></wiki_structure>";
    let repaired = repair_structure(raw).unwrap();

    assert!(repaired.recovered);
    let titles: Vec<&str> = repaired
        .document
        .pages()
        .iter()
        .map(|p| p.title.as_str())
        .collect();
    assert_eq!(titles, vec!["First", "Second"]);
    assert!(parse_strict(&repaired.xml).is_ok());
}

#[test]
fn test_repair_defaults_for_missing_fields() {
    let raw = "<wiki_structure><pages><page><description>d</description></page>\
               <page id=\"x\"><title>  </title></page></pages></wiki_structure>";
    let doc = repair_structure(raw).unwrap().document;
    let pages = doc.pages();
    assert_eq!(pages[0].id, "page-1");
    assert_eq!(pages[0].title, "Untitled");
    assert_eq!(pages[1].id, "x");
    assert_eq!(pages[1].title, "Untitled");
    assert_eq!(pages[0].importance, Importance::Medium);
    assert!(pages[0].parent_section_ref.is_none());
}

#[test]
fn test_repair_collects_pages_nested_anywhere() {
    let raw = "<wiki_structure><sections><section id=\"s\"><pages>\
               <page id=\"inner\"><title>Inner</title></page>\
               </pages></section></sections></wiki_structure>";
    let doc = repair_structure(raw).unwrap().document;
    assert_eq!(doc.pages().len(), 1);
    assert_eq!(doc.pages()[0].title, "Inner");
}

#[test]
fn test_repair_hyphenated_root_and_escaped_tags() {
    let raw = "&amp;lt;wiki-structure&amp;gt;<title>T</title></wiki-structure>";
    // Extraction needs a literal opening tag
    assert!(repair_structure(raw).is_err());

    let raw = "<wiki-structure>&amp;lt;title&amp;gt;T&amp;lt;/title&amp;gt;</wiki-structure>";
    let repaired = repair_structure(raw).unwrap();
    assert_eq!(repaired.document.title(), "T");
    assert!(repaired.xml.starts_with("<wiki_structure>"));
}

#[test]
fn test_repair_unrecoverable_markup() {
    let raw = "<wiki_structure <</wiki_structure>";
    assert!(matches!(
        repair_structure(raw),
        Err(WikiError::UnrecoverableMarkup(_))
    ));
}

#[test]
fn test_repair_missing_block() {
    assert!(matches!(
        repair_structure("I could not produce a structure."),
        Err(WikiError::StructureBlockNotFound { .. })
    ));
}
