//! Prompt assembly for structure synthesis, page writing and answering

use crate::types::{RepoRef, WikiLanguage};
use crate::wiki::structure::Page;

const STRUCTURE_FORMAT_SECTIONED: &str = r#"<wiki_structure>
  <title>[Overall title for the wiki]</title>
  <description>[Brief description of the repository]</description>
  <sections>
    <section id="section-1">
      <title>[Section title]</title>
      <pages>
        <page_ref>page-1</page_ref>
        <page_ref>page-2</page_ref>
      </pages>
      <subsections>
        <section_ref>section-2</section_ref>
      </subsections>
    </section>
  </sections>
  <pages>
    <page id="page-1">
      <title>[Page title]</title>
      <description>[What this page covers]</description>
      <importance>high|medium|low</importance>
      <relevant_files>
        <file_path>[Path to a relevant file]</file_path>
      </relevant_files>
      <related_pages>
        <related>page-2</related>
      </related_pages>
      <parent_section>section-1</parent_section>
    </page>
  </pages>
</wiki_structure>"#;

const STRUCTURE_FORMAT_FLAT: &str = r#"<wiki_structure>
  <title>[Overall title for the wiki]</title>
  <description>[Brief description of the repository]</description>
  <pages>
    <page id="page-1">
      <title>[Page title]</title>
      <description>[What this page covers]</description>
      <importance>high|medium|low</importance>
      <relevant_files>
        <file_path>[Path to a relevant file]</file_path>
      </relevant_files>
      <related_pages>
        <related>page-2</related>
      </related_pages>
    </page>
  </pages>
</wiki_structure>"#;

const SUGGESTED_SECTIONS: &[&str] = &[
    "Overview (general information about the project)",
    "System Architecture (how the system is designed)",
    "Core Features (key functionality)",
    "Data Management/Flow",
    "Frontend Components",
    "Backend Systems",
    "Model Integration",
    "Deployment/Infrastructure",
    "Extensibility and Customization",
];

/// Prompt asking the model to outline the wiki for a repository
pub fn structure_prompt(
    repo: &RepoRef,
    file_tree: &str,
    readme: &str,
    language: WikiLanguage,
    comprehensive: bool,
) -> String {
    let mut prompt = format!(
        "Analyze the repository {slug} and design a wiki for it.\n\n\
         1. The complete file tree of the project:\n<file_tree>\n{file_tree}\n</file_tree>\n\n\
         2. The README file of the project:\n<readme>\n{readme}\n</readme>\n\n\
         Choose the most logical wiki structure for this repository's content.\n\n\
         IMPORTANT: The wiki content will be written in {lang}.\n\n\
         Include pages that benefit from diagrams, such as architecture overviews, \
         state machines and class hierarchies.\n",
        slug = repo.slug(),
        lang = language.display_name(),
    );

    if comprehensive {
        prompt.push_str("\nOrganize the wiki into these main sections:\n");
        for section in SUGGESTED_SECTIONS {
            prompt.push_str("- ");
            prompt.push_str(section);
            prompt.push('\n');
        }
        prompt.push_str("\nReturn your analysis in the following XML format:\n\n");
        prompt.push_str(STRUCTURE_FORMAT_SECTIONED);
    } else {
        prompt.push_str("\nReturn your analysis in the following XML format:\n\n");
        prompt.push_str(STRUCTURE_FORMAT_FLAT);
    }

    prompt.trim().to_string()
}

/// Prompt asking the model to keep writing an interrupted structure
pub fn continuation_prompt(tail: &str) -> String {
    format!(
        "Continue writing the wiki structure XML based on the previous content:\n{}",
        tail
    )
}

/// Prompt asking the model to write one wiki page in markdown
pub fn page_prompt(page: &Page, language: WikiLanguage, context: &str) -> String {
    let file_links = page
        .relevant_files
        .iter()
        .map(|path| format!("- [{path}](REPO_URL/{path})"))
        .collect::<Vec<_>>()
        .join("\n");
    let title = &page.title;
    let lang = language.display_name();

    format!(
        r#"You are an expert technical writer and software architect.
Write a technical wiki page in Markdown about "{title}" in this project.

Use the [RELEVANT_SOURCE_FILES] and the retrieved [RAG_CONTEXT] as your only sources.

Start the page with these two blocks:
<details>
<summary>Relevant source files</summary>

The following files were used as context for generating this wiki page:

{file_links}
</details>

<details>
<summary>Retrieved additional context</summary>

{context}
</details>

Then give the page an H1 heading: # {title}

1. Introduction: one or two paragraphs on the purpose and scope of "{title}".
2. Detailed sections: use H2 and H3 headings; explain architecture, components, data flow and key functions as shown in the sources.
3. Mermaid diagrams: use fenced ```mermaid blocks (graph TD, sequenceDiagram, classDiagram, erDiagram) for flows and relationships. Use top-down orientation and keep node labels short.
4. Tables: summarize components, parameters, configuration options or data fields.
5. Code snippets (optional): short excerpts from the sources in fenced blocks with a language tag.
6. Citations: after every significant claim, diagram, table or snippet add `Sources: [file.ext:start-end]()`.
7. Accuracy: do not invent behaviour that the sources do not show.
8. End with a short summary.

IMPORTANT: Write the content in {lang}."#
    )
}

/// Prompt asking the model to answer a question from retrieved context
pub fn answer_prompt(question: &str, context: &str) -> String {
    format!(
        "Answer the question about the repository using only the context below. \
         If the context does not contain the answer, say so.\n\n\
         <context>\n{context}\n</context>\n\n\
         Question: {question}"
    )
}
