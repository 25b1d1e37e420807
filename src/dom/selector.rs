//! A small subset of CSS selectors: one compound selector made of an
//! optional tag, `#id`, `.class` and `[attr]` / `[attr=value]` parts.
//! Enough to name a reveal toggle or a reveal target.

use std::fmt;
use std::iter::Peekable;
use std::str::{CharIndices, FromStr};

use super::node::Element;

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum SelectorError {
    #[error("Selector is empty")]
    Empty,
    #[error("Unsupported selector {selector:?}: unexpected {found:?} at byte {at}")]
    Unexpected {
        selector: String,
        found: char,
        at: usize,
    },
    #[error("Unsupported selector {0:?}: unterminated attribute")]
    UnterminatedAttribute(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Part {
    Id(String),
    Class(String),
    Attr { name: String, value: Option<String> },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Selector {
    raw: String,
    tag: Option<String>,
    parts: Vec<Part>,
}

fn is_ident_char(c: char) -> bool {
    c.is_alphanumeric() || c == '-' || c == '_'
}

fn take_ident(chars: &mut Peekable<CharIndices<'_>>) -> String {
    let mut ident = String::new();
    while let Some(&(_, c)) = chars.peek() {
        if !is_ident_char(c) {
            break;
        }
        ident.push(c);
        chars.next();
    }
    ident
}

impl Selector {
    pub fn parse(selector: &str) -> Result<Self, SelectorError> {
        let raw = selector.trim();
        if raw.is_empty() {
            return Err(SelectorError::Empty);
        }

        let unexpected = |at: usize, found: char| SelectorError::Unexpected {
            selector: raw.to_string(),
            found,
            at,
        };

        let mut chars = raw.char_indices().peekable();
        let tag = take_ident(&mut chars);
        let tag = (!tag.is_empty()).then(|| tag.to_ascii_lowercase());
        let mut parts = Vec::new();

        while let Some((at, c)) = chars.next() {
            match c {
                '#' | '.' => {
                    let ident = take_ident(&mut chars);
                    if ident.is_empty() {
                        return Err(unexpected(at, c));
                    }
                    parts.push(if c == '#' {
                        Part::Id(ident)
                    } else {
                        Part::Class(ident)
                    });
                }
                '[' => {
                    let rest = &raw[at + 1..];
                    let close = rest
                        .find(']')
                        .ok_or_else(|| SelectorError::UnterminatedAttribute(raw.to_string()))?;
                    let body = &rest[..close];
                    let (name, value) = match body.split_once('=') {
                        Some((name, value)) => {
                            let value = value.trim().trim_matches(|q: char| q == '"' || q == '\'');
                            (name.trim(), Some(value.to_string()))
                        }
                        None => (body.trim(), None),
                    };
                    if name.is_empty() || !name.chars().all(is_ident_char) {
                        return Err(unexpected(at, c));
                    }
                    parts.push(Part::Attr {
                        name: name.to_ascii_lowercase(),
                        value,
                    });
                    // Skip past the closing bracket.
                    for (idx, _) in chars.by_ref() {
                        if idx == at + 1 + close {
                            break;
                        }
                    }
                }
                other => return Err(unexpected(at, other)),
            }
        }

        if tag.is_none() && parts.is_empty() {
            return Err(SelectorError::Empty);
        }

        Ok(Self {
            raw: raw.to_string(),
            tag,
            parts,
        })
    }

    pub fn matches(&self, element: &Element) -> bool {
        if let Some(tag) = &self.tag {
            if !element.is(tag) {
                return false;
            }
        }
        self.parts.iter().all(|part| match part {
            Part::Id(id) => element.id() == Some(id.as_str()),
            Part::Class(class) => element.classes().any(|c| c == class),
            Part::Attr { name, value: None } => element.has_attr(name),
            Part::Attr {
                name,
                value: Some(value),
            } => element.attr(name) == Some(value.as_str()),
        })
    }

    pub fn as_str(&self) -> &str {
        &self.raw
    }
}

impl FromStr for Selector {
    type Err = SelectorError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl fmt::Display for Selector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw)
    }
}
