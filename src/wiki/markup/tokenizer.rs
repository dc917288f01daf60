//! Markup tokenizer
//!
//! Splits input into tags, text, comments and declarations. It never fails:
//! a `<` that does not begin well-formed markup is emitted as
//! [`Token::Stray`] and scanning resumes right after it, so the characters
//! that follow are read as ordinary text.

/// An attribute as written in the source
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawAttribute {
    pub name: String,
    /// Undecoded value; `None` for a bare attribute name
    pub value: Option<String>,
    pub quoted: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Token {
    StartTag {
        name: String,
        attributes: Vec<RawAttribute>,
        self_closing: bool,
    },
    EndTag {
        name: String,
    },
    /// Character data with entities still encoded
    Text(String),
    CData(String),
    Comment(String),
    /// `<?...?>` and `<!...>`
    Declaration(String),
    /// A `<` that does not start valid markup
    Stray,
}

/// A token and the byte offset where it starts
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Located {
    pub offset: usize,
    pub token: Token,
}

pub struct Tokenizer<'a> {
    input: &'a str,
    pos: usize,
}

impl<'a> Tokenizer<'a> {
    pub fn new(input: &'a str) -> Self {
        Self { input, pos: 0 }
    }

    fn markup(&mut self) -> Token {
        let input = self.input;
        let rest = &input[self.pos..];

        let delimited = |open: &str, close: &str| -> Option<(String, usize)> {
            let body = rest.strip_prefix(open)?;
            let end = body.find(close)?;
            Some((body[..end].to_string(), open.len() + end + close.len()))
        };

        let parsed = if rest.starts_with("<!--") {
            delimited("<!--", "-->").map(|(s, n)| (Token::Comment(s), n))
        } else if rest.starts_with("<![CDATA[") {
            delimited("<![CDATA[", "]]>").map(|(s, n)| (Token::CData(s), n))
        } else if rest.starts_with("<?") {
            delimited("<?", "?>").map(|(s, n)| (Token::Declaration(s), n))
        } else if rest.starts_with("<!") {
            delimited("<!", ">").map(|(s, n)| (Token::Declaration(s), n))
        } else if rest.starts_with("</") {
            end_tag(rest)
        } else {
            start_tag(rest)
        };

        match parsed {
            Some((token, consumed)) => {
                self.pos += consumed;
                token
            }
            None => {
                self.pos += 1;
                Token::Stray
            }
        }
    }
}

impl Iterator for Tokenizer<'_> {
    type Item = Located;

    fn next(&mut self) -> Option<Located> {
        let input = self.input;
        let rest = input.get(self.pos..).filter(|r| !r.is_empty())?;
        let offset = self.pos;

        let token = if rest.starts_with('<') {
            self.markup()
        } else {
            let end = rest.find('<').unwrap_or(rest.len());
            self.pos += end;
            Token::Text(rest[..end].to_string())
        };

        Some(Located { offset, token })
    }
}

/// Tokenize a whole document
pub fn tokenize(input: &str) -> Vec<Located> {
    Tokenizer::new(input).collect()
}

fn is_name_start(c: char) -> bool {
    c.is_alphabetic() || c == '_' || c == ':'
}

fn is_name_char(c: char) -> bool {
    c.is_alphanumeric() || matches!(c, '_' | '-' | '.' | ':')
}

/// Leading XML name of `s`, if any
pub(crate) fn read_name(s: &str) -> Option<&str> {
    let mut chars = s.char_indices();
    let (_, first) = chars.next()?;
    if !is_name_start(first) {
        return None;
    }
    let end = chars
        .find(|(_, c)| !is_name_char(*c))
        .map_or(s.len(), |(i, _)| i);
    Some(&s[..end])
}

fn skip_whitespace(s: &str, i: usize) -> usize {
    i + (s[i..].len() - s[i..].trim_start().len())
}

fn end_tag(rest: &str) -> Option<(Token, usize)> {
    let name = read_name(&rest[2..])?;
    let i = skip_whitespace(rest, 2 + name.len());
    rest[i..].starts_with('>').then(|| {
        (
            Token::EndTag {
                name: name.to_string(),
            },
            i + 1,
        )
    })
}

fn start_tag(rest: &str) -> Option<(Token, usize)> {
    let name = read_name(&rest[1..])?;
    let mut i = 1 + name.len();
    let mut attributes = Vec::new();

    loop {
        i = skip_whitespace(rest, i);
        let tail = &rest[i..];

        if tail.starts_with("/>") {
            return Some((
                Token::StartTag {
                    name: name.to_string(),
                    attributes,
                    self_closing: true,
                },
                i + 2,
            ));
        }
        if tail.starts_with('>') {
            return Some((
                Token::StartTag {
                    name: name.to_string(),
                    attributes,
                    self_closing: false,
                },
                i + 1,
            ));
        }

        let attr_name = read_name(tail)?;
        i = skip_whitespace(rest, i + attr_name.len());

        if !rest[i..].starts_with('=') {
            attributes.push(RawAttribute {
                name: attr_name.to_string(),
                value: None,
                quoted: false,
            });
            continue;
        }

        i = skip_whitespace(rest, i + 1);
        let tail = &rest[i..];
        let quote = tail.chars().next().filter(|c| *c == '"' || *c == '\'');

        let (value, quoted, consumed) = match quote {
            Some(q) => {
                let end = tail[1..].find(q)?;
                (&tail[1..1 + end], true, end + 2)
            }
            None => {
                let end = tail
                    .find(|c: char| c.is_whitespace() || matches!(c, '>' | '<' | '"' | '\''))
                    .unwrap_or(tail.len());
                let value = tail[..end].strip_suffix('/').unwrap_or(&tail[..end]);
                if value.is_empty() {
                    return None;
                }
                (value, false, value.len())
            }
        };

        attributes.push(RawAttribute {
            name: attr_name.to_string(),
            value: Some(value.to_string()),
            quoted,
        });
        i += consumed;
    }
}
