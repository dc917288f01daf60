//! Element tree built from the token stream
//!
//! [`parse_strict`] accepts only well-formed markup. [`parse_recovering`]
//! applies a fixed set of recovery rules and always yields the best tree it
//! can, or nothing when the input contains no element at all.

use super::tokenizer::{Located, RawAttribute, Token, tokenize};
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Node {
    Element(Element),
    /// Decoded character data
    Text(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Element {
    pub name: String,
    pub attributes: Vec<(String, String)>,
    pub children: Vec<Node>,
}

/// A well-formedness violation found by the strict parser
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{message} at byte {offset}")]
pub struct MarkupError {
    pub offset: usize,
    pub message: String,
}

impl MarkupError {
    fn new(offset: usize, message: impl Into<String>) -> Self {
        Self {
            offset,
            message: message.into(),
        }
    }
}

impl Element {
    fn new(name: String, attributes: Vec<(String, String)>) -> Self {
        Self {
            name,
            attributes,
            children: Vec::new(),
        }
    }

    pub fn attribute(&self, name: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, v)| v.as_str())
    }

    /// Direct child elements
    pub fn elements(&self) -> impl Iterator<Item = &Element> {
        self.children.iter().filter_map(|n| match n {
            Node::Element(e) => Some(e),
            Node::Text(_) => None,
        })
    }

    /// First direct child element called `name`
    pub fn child(&self, name: &str) -> Option<&Element> {
        self.elements().find(|e| e.name == name)
    }

    /// Direct child elements called `name`
    pub fn children_named<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a Element> {
        self.elements().filter(move |e| e.name == name)
    }

    /// All descendant elements called `name`, in document order
    pub fn descendants_named<'a>(&'a self, name: &str) -> Vec<&'a Element> {
        let mut found = Vec::new();
        self.collect_descendants(name, &mut found);
        found
    }

    fn collect_descendants<'a>(&'a self, name: &str, found: &mut Vec<&'a Element>) {
        for child in self.elements() {
            if child.name == name {
                found.push(child);
            }
            child.collect_descendants(name, found);
        }
    }

    /// Concatenated text of this element and its descendants
    pub fn text(&self) -> String {
        let mut out = String::new();
        self.collect_text(&mut out);
        out
    }

    fn collect_text(&self, out: &mut String) {
        for child in &self.children {
            match child {
                Node::Text(t) => out.push_str(t),
                Node::Element(e) => e.collect_text(out),
            }
        }
    }

    fn push_text(&mut self, text: &str) {
        if text.is_empty() {
            return;
        }
        if let Some(Node::Text(last)) = self.children.last_mut() {
            last.push_str(text);
        } else {
            self.children.push(Node::Text(text.to_string()));
        }
    }

    /// Serialize as well-formed markup
    pub fn to_markup(&self) -> String {
        let mut out = String::new();
        self.write_markup(&mut out);
        out
    }

    fn write_markup(&self, out: &mut String) {
        out.push('<');
        out.push_str(&self.name);
        for (name, value) in &self.attributes {
            out.push(' ');
            out.push_str(name);
            out.push_str("=\"");
            escape_into(value, true, out);
            out.push('"');
        }
        if self.children.is_empty() {
            out.push_str("/>");
            return;
        }
        out.push('>');
        for child in &self.children {
            match child {
                Node::Text(t) => escape_into(t, false, out),
                Node::Element(e) => e.write_markup(out),
            }
        }
        out.push_str("</");
        out.push_str(&self.name);
        out.push('>');
    }
}

fn escape_into(text: &str, attribute: bool, out: &mut String) {
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' if attribute => out.push_str("&quot;"),
            _ => out.push(c),
        }
    }
}

/// Decode entity references; `Err` carries the byte position of a bad `&`
fn decode_entities(raw: &str, lenient: bool) -> Result<String, usize> {
    let mut out = String::with_capacity(raw.len());
    let mut rest = raw;

    while let Some(amp) = rest.find('&') {
        out.push_str(&rest[..amp]);
        let position = raw.len() - rest.len() + amp;
        rest = &rest[amp..];

        let decoded = rest[1..].find(';').and_then(|semi| {
            let name = &rest[1..semi + 1];
            entity_char(name).map(|c| (c, semi + 2))
        });

        match decoded {
            Some((c, consumed)) => {
                out.push(c);
                rest = &rest[consumed..];
            }
            None if lenient => {
                out.push('&');
                rest = &rest[1..];
            }
            None => return Err(position),
        }
    }

    out.push_str(rest);
    Ok(out)
}

fn entity_char(name: &str) -> Option<char> {
    match name {
        "lt" => Some('<'),
        "gt" => Some('>'),
        "amp" => Some('&'),
        "quot" => Some('"'),
        "apos" => Some('\''),
        _ => {
            let digits = name.strip_prefix('#')?;
            let code = match digits.strip_prefix('x') {
                Some(hex) => u32::from_str_radix(hex, 16).ok()?,
                None => digits.parse().ok()?,
            };
            char::from_u32(code)
        }
    }
}

/// Pops the innermost open element and attaches it to its parent, or makes it
/// the root when no parent is open
fn close_top(stack: &mut Vec<Element>, root: &mut Option<Element>) {
    if let Some(element) = stack.pop() {
        match stack.last_mut() {
            Some(parent) => parent.children.push(Node::Element(element)),
            None => *root = Some(element),
        }
    }
}

/// Parse well-formed markup into its root element
pub fn parse_strict(input: &str) -> Result<Element, MarkupError> {
    let mut stack: Vec<Element> = Vec::new();
    let mut root: Option<Element> = None;

    for Located { offset, token } in tokenize(input) {
        match token {
            Token::StartTag {
                name,
                attributes,
                self_closing,
            } => {
                if root.is_some() && stack.is_empty() {
                    return Err(MarkupError::new(offset, "multiple root elements"));
                }
                let attributes = strict_attributes(&name, attributes, offset)?;
                stack.push(Element::new(name, attributes));
                if self_closing {
                    close_top(&mut stack, &mut root);
                }
            }
            Token::EndTag { name } => match stack.last() {
                Some(open) if open.name == name => close_top(&mut stack, &mut root),
                Some(open) => {
                    return Err(MarkupError::new(
                        offset,
                        format!("mismatched closing tag </{}> for <{}>", name, open.name),
                    ));
                }
                None => {
                    return Err(MarkupError::new(
                        offset,
                        format!("unexpected closing tag </{}>", name),
                    ));
                }
            },
            Token::Text(raw) => {
                let Some(open) = stack.last_mut() else {
                    if raw.trim().is_empty() {
                        continue;
                    }
                    return Err(MarkupError::new(offset, "text outside the root element"));
                };
                let text = decode_entities(&raw, false)
                    .map_err(|at| MarkupError::new(offset + at, "invalid entity reference"))?;
                open.push_text(&text);
            }
            Token::CData(data) => match stack.last_mut() {
                Some(open) => open.push_text(&data),
                None => {
                    return Err(MarkupError::new(offset, "CDATA outside the root element"));
                }
            },
            Token::Comment(_) | Token::Declaration(_) => {}
            Token::Stray => {
                return Err(MarkupError::new(offset, "unescaped '<'"));
            }
        }
    }

    if let Some(open) = stack.last() {
        return Err(MarkupError::new(
            input.len(),
            format!("unclosed tag <{}>", open.name),
        ));
    }

    root.ok_or_else(|| MarkupError::new(0, "no root element"))
}

fn strict_attributes(
    element: &str,
    attributes: Vec<RawAttribute>,
    offset: usize,
) -> Result<Vec<(String, String)>, MarkupError> {
    let mut out: Vec<(String, String)> = Vec::with_capacity(attributes.len());

    for attr in attributes {
        if out.iter().any(|(n, _)| *n == attr.name) {
            return Err(MarkupError::new(
                offset,
                format!("duplicate attribute '{}' on <{}>", attr.name, element),
            ));
        }
        let value = match (attr.value, attr.quoted) {
            (Some(value), true) => value,
            _ => {
                return Err(MarkupError::new(
                    offset,
                    format!("attribute '{}' on <{}> must be quoted", attr.name, element),
                ));
            }
        };
        let value = decode_entities(&value, false)
            .map_err(|_| MarkupError::new(offset, "invalid entity reference in attribute"))?;
        out.push((attr.name, value));
    }

    Ok(out)
}

/// Parse markup, recovering from well-formedness errors
///
/// Recovery rules:
/// - a closing tag that matches no open element is skipped
/// - a closing tag for an outer element also closes the unclosed inner ones
/// - elements still open at end of input are closed there
/// - a stray `<` is kept as text and an unrecognized `&` stays literal
/// - unquoted attribute values are accepted; the first of duplicate attributes wins
/// - anything after the root element closes is dropped, as is text before it
pub fn parse_recovering(input: &str) -> Option<Element> {
    let mut stack: Vec<Element> = Vec::new();
    let mut root: Option<Element> = None;

    for Located { token, .. } in tokenize(input) {
        if root.is_some() {
            break;
        }

        match token {
            Token::StartTag {
                name,
                attributes,
                self_closing,
            } => {
                stack.push(Element::new(name, lenient_attributes(attributes)));
                if self_closing {
                    close_top(&mut stack, &mut root);
                }
            }
            Token::EndTag { name } => {
                if let Some(depth) = stack.iter().rposition(|e| e.name == name) {
                    while stack.len() > depth {
                        close_top(&mut stack, &mut root);
                    }
                }
            }
            Token::Text(raw) => {
                if let Some(open) = stack.last_mut()
                    && let Ok(text) = decode_entities(&raw, true)
                {
                    open.push_text(&text);
                }
            }
            Token::CData(data) => {
                if let Some(open) = stack.last_mut() {
                    open.push_text(&data);
                }
            }
            Token::Stray => {
                if let Some(open) = stack.last_mut() {
                    open.push_text("<");
                }
            }
            Token::Comment(_) | Token::Declaration(_) => {}
        }
    }

    while !stack.is_empty() {
        close_top(&mut stack, &mut root);
    }

    root
}

fn lenient_attributes(attributes: Vec<RawAttribute>) -> Vec<(String, String)> {
    let mut out: Vec<(String, String)> = Vec::with_capacity(attributes.len());
    for attr in attributes {
        if out.iter().any(|(n, _)| *n == attr.name) {
            continue;
        }
        let value = attr.value.unwrap_or_default();
        let value = decode_entities(&value, true).unwrap_or(value);
        out.push((attr.name, value));
    }
    out
}
