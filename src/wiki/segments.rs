//! Splitting markdown into prose and diagram segments
//!
//! A page body is scanned line by line for fenced code blocks. Blocks whose
//! info string starts with `mermaid` become [`Segment::Diagram`]; everything
//! else, including other fenced blocks, stays prose.

use serde::{Deserialize, Serialize};
use std::ops::Range;

/// One piece of a rendered page
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "content", rename_all = "lowercase")]
pub enum Segment {
    Text(String),
    Diagram(String),
}

impl Segment {
    pub fn content(&self) -> &str {
        match self {
            Segment::Text(s) | Segment::Diagram(s) => s,
        }
    }

    pub fn is_diagram(&self) -> bool {
        matches!(self, Segment::Diagram(_))
    }
}

/// A segment together with the byte range it was taken from
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpannedSegment {
    pub segment: Segment,
    pub span: Range<usize>,
}

/// An opening or closing fence line
struct Fence<'a> {
    indent: &'a str,
    marker: char,
    len: usize,
    info: &'a str,
}

fn parse_fence(line: &str) -> Option<Fence<'_>> {
    let body = line.trim_end_matches(['\n', '\r']);
    let indent_len = body.len() - body.trim_start_matches([' ', '\t']).len();
    let (indent, rest) = body.split_at(indent_len);

    let marker = rest.chars().next().filter(|c| *c == '`' || *c == '~')?;
    let len = rest.chars().take_while(|c| *c == marker).count();
    if len < 3 {
        return None;
    }

    Some(Fence {
        indent,
        marker,
        len,
        info: &rest[len..],
    })
}

impl Fence<'_> {
    fn is_diagram(&self) -> bool {
        let info = self.info.trim_start();
        let Some(prefix) = info.get(..7) else {
            return false;
        };
        prefix.eq_ignore_ascii_case("mermaid")
            && !info[7..]
                .chars()
                .next()
                .is_some_and(|c| c.is_alphanumeric() || c == '_')
    }

    /// Whether `line` closes this fence
    fn is_closed_by(&self, line: &str) -> bool {
        parse_fence(line).is_some_and(|close| {
            close.indent == self.indent
                && close.marker == self.marker
                && close.len >= self.len
                && close.info.trim().is_empty()
        })
    }
}

/// Lines with their starting byte offsets; each line keeps its terminator
fn lines_with_offsets(md: &str) -> Vec<(usize, &str)> {
    let mut offset = 0;
    md.split_inclusive('\n')
        .map(|line| {
            let start = offset;
            offset += line.len();
            (start, line)
        })
        .collect()
}

fn push_text(md: &str, range: Range<usize>, out: &mut Vec<SpannedSegment>) {
    let raw = &md[range.clone()];
    let leading = raw.len() - raw.trim_start_matches(['\n', '\r']).len();
    let content = raw.trim_matches(['\n', '\r']);
    if content.trim().is_empty() {
        return;
    }
    let start = range.start + leading;
    out.push(SpannedSegment {
        segment: Segment::Text(content.to_string()),
        span: start..start + content.len(),
    });
}

fn diagram_body(lines: &[(usize, &str)]) -> String {
    let body: Vec<&str> = lines
        .iter()
        .map(|(_, l)| l.trim_end_matches(['\n', '\r']))
        .collect();
    let first = body.iter().position(|l| !l.trim().is_empty());
    let last = body.iter().rposition(|l| !l.trim().is_empty());
    match (first, last) {
        (Some(first), Some(last)) => body[first..=last].join("\n"),
        _ => String::new(),
    }
}

/// Split markdown into ordered, non-overlapping segments with their byte spans
///
/// Everything in `md` outside the returned spans is whitespace.
pub fn split_segments_with_spans(md: &str) -> Vec<SpannedSegment> {
    let lines = lines_with_offsets(md);
    let mut out = Vec::new();
    let mut text_start = 0;
    let mut i = 0;

    while i < lines.len() {
        let (line_start, line) = lines[i];
        let Some(fence) = parse_fence(line) else {
            i += 1;
            continue;
        };

        let close = (i + 1..lines.len()).find(|&j| fence.is_closed_by(lines[j].1));

        if !fence.is_diagram() {
            // Ordinary code block: skip over it so its contents are never scanned
            i = close.map_or(lines.len(), |j| j + 1);
            continue;
        }

        let Some(j) = close else {
            // Unterminated diagram: the rest is prose
            break;
        };

        push_text(md, text_start..line_start, &mut out);

        let (close_start, close_line) = lines[j];
        let block_end = close_start + close_line.trim_end_matches(['\n', '\r']).len();
        out.push(SpannedSegment {
            segment: Segment::Diagram(diagram_body(&lines[i + 1..j])),
            span: line_start..block_end,
        });

        text_start = close_start + close_line.len();
        i = j + 1;
    }

    push_text(md, text_start..md.len(), &mut out);
    out
}

/// Split markdown into ordered prose and diagram segments
pub fn split_segments(md: &str) -> Vec<Segment> {
    split_segments_with_spans(md)
        .into_iter()
        .map(|s| s.segment)
        .collect()
}

/// Render segments back to markdown with canonical diagram fences
pub fn render_segments(segments: &[Segment]) -> String {
    segments
        .iter()
        .map(|segment| match segment {
            Segment::Text(text) => text.clone(),
            Segment::Diagram(body) => format!("```mermaid\n{}\n```", body),
        })
        .collect::<Vec<_>>()
        .join("\n\n")
}

/// Decode the HTML entities models tend to emit inside diagram source
pub fn unescape_diagram(source: &str) -> String {
    let mut out = String::with_capacity(source.len());
    let mut rest = source;

    while let Some(amp) = rest.find('&') {
        out.push_str(&rest[..amp]);
        rest = &rest[amp..];

        let decoded = rest[1..]
            .find(';')
            .filter(|&semi| semi <= 10)
            .and_then(|semi| decode_entity(&rest[1..semi + 1]).map(|c| (c, semi + 2)));

        match decoded {
            Some((c, consumed)) => {
                out.push(c);
                rest = &rest[consumed..];
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

fn decode_entity(name: &str) -> Option<char> {
    match name {
        "lt" => Some('<'),
        "gt" => Some('>'),
        "amp" => Some('&'),
        "quot" => Some('"'),
        "apos" => Some('\''),
        _ => {
            let digits = name.strip_prefix('#')?;
            let code = match digits.strip_prefix(['x', 'X']) {
                Some(hex) => u32::from_str_radix(hex, 16).ok()?,
                None => digits.parse().ok()?,
            };
            char::from_u32(code)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn text(s: &str) -> Segment {
        Segment::Text(s.to_string())
    }

    fn diagram(s: &str) -> Segment {
        Segment::Diagram(s.to_string())
    }

    #[test]
    fn test_basic_split() {
        let md = "intro\n\n```mermaid\ngraph TD\nA-->B\n```\n\nend";
        assert_eq!(
            split_segments(md),
            vec![text("intro"), diagram("graph TD\nA-->B"), text("end")]
        );
    }

    #[test]
    fn test_no_diagrams_is_single_text() {
        let md = "# Title\n\nSome prose.\n";
        assert_eq!(split_segments(md), vec![text("# Title\n\nSome prose.")]);
    }

    #[test]
    fn test_empty_and_blank_input() {
        assert!(split_segments("").is_empty());
        assert!(split_segments("\n\n  \n").is_empty());
    }

    #[test]
    fn test_diagram_only() {
        let md = "```mermaid\nsequenceDiagram\n  A->>B: hi\n```";
        assert_eq!(split_segments(md), vec![diagram("sequenceDiagram\n  A->>B: hi")]);
    }

    #[test]
    fn test_tilde_fence_and_case_insensitive_info() {
        let md = "a\n~~~ Mermaid title\ngraph TD\n~~~\nb";
        assert_eq!(
            split_segments(md),
            vec![text("a"), diagram("graph TD"), text("b")]
        );
    }

    #[test]
    fn test_indented_fence_requires_same_indentation() {
        let md = "- item\n  ```mermaid\n  graph TD\n  ```\n- next";
        assert_eq!(
            split_segments(md),
            vec![text("- item"), diagram("  graph TD"), text("- next")]
        );
    }

    #[test]
    fn test_longer_closing_fence_closes() {
        let md = "```mermaid\ngraph TD\n`````\nafter";
        assert_eq!(split_segments(md), vec![diagram("graph TD"), text("after")]);
    }

    #[test]
    fn test_mismatched_fence_char_does_not_close() {
        let md = "```mermaid\ngraph TD\n~~~\n```\nafter";
        assert_eq!(
            split_segments(md),
            vec![diagram("graph TD\n~~~"), text("after")]
        );
    }

    #[test]
    fn test_mermaid_prefix_word_is_not_a_diagram() {
        let md = "```mermaidjs\ngraph TD\n```";
        assert_eq!(split_segments(md), vec![text(md)]);
    }

    #[test]
    fn test_diagram_inside_code_block_is_not_extracted() {
        let md = "````markdown\n```mermaid\ngraph TD\n```\n````\n\n```mermaid\nflowchart TD\n```";
        let segments = split_segments(md);
        assert_eq!(segments.len(), 2);
        assert!(matches!(&segments[0], Segment::Text(t) if t.starts_with("````markdown")));
        assert_eq!(segments[1], diagram("flowchart TD"));
    }

    #[test]
    fn test_unterminated_diagram_becomes_trailing_text() {
        let md = "intro\n\n```mermaid\ngraph TD\n```\n\nmiddle\n\n```mermaid\nA-->B\n";
        assert_eq!(
            split_segments(md),
            vec![
                text("intro"),
                diagram("graph TD"),
                text("middle\n\n```mermaid\nA-->B"),
            ]
        );
    }

    #[test]
    fn test_diagram_body_blank_lines_trimmed() {
        let md = "```mermaid\n\n\ngraph TD\n\nA-->B\n\n```";
        assert_eq!(split_segments(md), vec![diagram("graph TD\n\nA-->B")]);
    }

    #[test]
    fn test_crlf_line_endings() {
        let md = "intro\r\n```mermaid\r\ngraph TD\r\n```\r\nend";
        assert_eq!(
            split_segments(md),
            vec![text("intro"), diagram("graph TD"), text("end")]
        );
    }

    #[test]
    fn test_spans_are_ordered_and_cover_non_whitespace() {
        let md = "\n\nintro line\n\n```mermaid\ngraph TD\nA-->B\n```\n\n```rust\nfn main() {}\n```\n\n~~~mermaid\nC-->D\n~~~\n\nend\n";
        let spanned = split_segments_with_spans(md);
        assert_eq!(spanned.len(), 5);

        let mut covered = vec![false; md.len()];
        let mut prev_end = 0;
        for s in &spanned {
            assert!(s.span.start >= prev_end, "spans must be ordered");
            assert!(s.span.start < s.span.end);
            prev_end = s.span.end;
            for flag in &mut covered[s.span.clone()] {
                *flag = true;
            }
            if let Segment::Text(t) = &s.segment {
                assert_eq!(&md[s.span.clone()], t);
            }
        }
        for (i, b) in md.bytes().enumerate() {
            if !covered[i] {
                assert!(b.is_ascii_whitespace(), "byte {} outside spans", i);
            }
        }
    }

    #[test]
    fn test_render_round_trip_is_stable() {
        let md = "intro\n\n  ~~~~ mermaid\n\ngraph TD\n  ~~~~\nmiddle\n```mermaid\nA-->B\n```\n\n\nend";
        let first = split_segments(md);
        let rendered = render_segments(&first);
        assert_eq!(split_segments(&rendered), first);
    }

    #[test]
    fn test_segment_serializes_with_type_tag() {
        let json = serde_json::to_string(&diagram("graph TD")).unwrap();
        assert_eq!(json, r#"{"type":"diagram","content":"graph TD"}"#);
    }

    #[test]
    fn test_unescape_diagram() {
        assert_eq!(unescape_diagram("A --&gt; B"), "A --> B");
        assert_eq!(
            unescape_diagram("&lt;T&gt; &amp;&quot;x&quot; &#39;y&#39; &#x41;"),
            "<T> &\"x\" 'y' A"
        );
        assert_eq!(unescape_diagram("a & b &unknown; c"), "a & b &unknown; c");
        assert_eq!(unescape_diagram("trailing &"), "trailing &");
    }
}
