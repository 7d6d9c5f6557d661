//! CSS subset used by the in-memory driver.
//!
//! Supports comma-separated compound selectors built from a tag (or `*`),
//! `#id`, `.class`, and attribute tests `[a]`, `[a=v]`, `[a*=v]`, `[a^=v]`,
//! `[a$=v]`, `[a~=v]` with an optional ` i` flag. Combinators are rejected.

use crate::result::{VigiaError, VigiaResult};
use std::collections::BTreeMap;

#[derive(Debug, Clone, PartialEq, Eq)]
enum AttrOp {
    Exists,
    Equals(String),
    Contains(String),
    Prefix(String),
    Suffix(String),
    Word(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct AttrTest {
    name: String,
    op: AttrOp,
    case_insensitive: bool,
}

impl AttrTest {
    fn matches(&self, attributes: &BTreeMap<String, String>) -> bool {
        let Some(actual) = attributes.get(&self.name) else {
            return false;
        };
        let fold = |s: &str| {
            if self.case_insensitive {
                s.to_lowercase()
            } else {
                s.to_string()
            }
        };
        let actual = fold(actual);
        match &self.op {
            AttrOp::Exists => true,
            AttrOp::Equals(v) => actual == fold(v),
            AttrOp::Contains(v) => !v.is_empty() && actual.contains(&fold(v)),
            AttrOp::Prefix(v) => !v.is_empty() && actual.starts_with(&fold(v)),
            AttrOp::Suffix(v) => !v.is_empty() && actual.ends_with(&fold(v)),
            AttrOp::Word(v) => actual.split_whitespace().any(|w| w == fold(v)),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
struct Compound {
    tag: Option<String>,
    id: Option<String>,
    classes: Vec<String>,
    attributes: Vec<AttrTest>,
}

impl Compound {
    fn matches(&self, tag: &str, attributes: &BTreeMap<String, String>) -> bool {
        if self.tag.as_deref().is_some_and(|t| t != tag) {
            return false;
        }
        if let Some(id) = &self.id {
            if attributes.get("id") != Some(id) {
                return false;
            }
        }
        if !self.classes.is_empty() {
            let class_list = attributes.get("class").map_or("", String::as_str);
            if !self
                .classes
                .iter()
                .all(|c| class_list.split_whitespace().any(|have| have == c))
            {
                return false;
            }
        }
        self.attributes.iter().all(|a| a.matches(attributes))
    }
}

/// Parsed selector list
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CssSelectorList {
    compounds: Vec<Compound>,
}

impl CssSelectorList {
    /// Parse a selector list
    pub fn parse(input: &str) -> VigiaResult<Self> {
        let compounds = split_list(input)
            .into_iter()
            .map(|part| Parser::new(part.trim(), input).compound())
            .collect::<VigiaResult<Vec<_>>>()?;
        Ok(Self { compounds })
    }

    /// Whether any selector in the list matches the element
    pub fn matches(&self, tag: &str, attributes: &BTreeMap<String, String>) -> bool {
        self.compounds.iter().any(|c| c.matches(tag, attributes))
    }
}

fn split_list(input: &str) -> Vec<&str> {
    let mut parts = Vec::new();
    let mut depth = 0usize;
    let mut quote: Option<char> = None;
    let mut start = 0;
    for (i, c) in input.char_indices() {
        match (quote, c) {
            (Some(q), c) if c == q => quote = None,
            (Some(_), _) => {}
            (None, '"' | '\'') => quote = Some(c),
            (None, '[') => depth += 1,
            (None, ']') => depth = depth.saturating_sub(1),
            (None, ',') if depth == 0 => {
                parts.push(&input[start..i]);
                start = i + 1;
            }
            _ => {}
        }
    }
    parts.push(&input[start..]);
    parts
}

struct Parser<'a> {
    chars: Vec<char>,
    pos: usize,
    whole: &'a str,
}

impl<'a> Parser<'a> {
    fn new(part: &str, whole: &'a str) -> Self {
        Self {
            chars: part.chars().collect(),
            pos: 0,
            whole,
        }
    }

    fn error(&self, message: impl Into<String>) -> VigiaError {
        VigiaError::InvalidSelector {
            selector: self.whole.to_string(),
            message: message.into(),
        }
    }

    fn peek(&self) -> Option<char> {
        self.chars.get(self.pos).copied()
    }

    fn skip_whitespace(&mut self) {
        while self.peek().is_some_and(char::is_whitespace) {
            self.pos += 1;
        }
    }

    fn ident(&mut self) -> String {
        let mut out = String::new();
        while let Some(c) = self.peek() {
            if c.is_alphanumeric() || c == '-' || c == '_' {
                out.push(c);
                self.pos += 1;
            } else {
                break;
            }
        }
        out
    }

    fn required_ident(&mut self, what: &str) -> VigiaResult<String> {
        let ident = self.ident();
        if ident.is_empty() {
            return Err(self.error(format!("expected {what}")));
        }
        Ok(ident)
    }

    fn compound(mut self) -> VigiaResult<Compound> {
        if self.chars.is_empty() {
            return Err(self.error("empty selector"));
        }
        let mut compound = Compound::default();
        if self.peek() == Some('*') {
            self.pos += 1;
        } else {
            let tag = self.ident();
            if !tag.is_empty() {
                compound.tag = Some(tag.to_ascii_lowercase());
            }
        }
        while let Some(c) = self.peek() {
            match c {
                '#' => {
                    self.pos += 1;
                    compound.id = Some(self.required_ident("id")?);
                }
                '.' => {
                    self.pos += 1;
                    compound.classes.push(self.required_ident("class name")?);
                }
                '[' => {
                    self.pos += 1;
                    compound.attributes.push(self.attribute()?);
                }
                c if c.is_whitespace() || matches!(c, '>' | '+' | '~') => {
                    return Err(self.error("combinators are not supported"));
                }
                other => return Err(self.error(format!("unexpected '{other}'"))),
            }
        }
        Ok(compound)
    }

    fn attribute(&mut self) -> VigiaResult<AttrTest> {
        self.skip_whitespace();
        let name = self.required_ident("attribute name")?.to_ascii_lowercase();
        self.skip_whitespace();
        if self.peek() == Some(']') {
            self.pos += 1;
            return Ok(AttrTest {
                name,
                op: AttrOp::Exists,
                case_insensitive: false,
            });
        }
        let op_char = self.peek();
        if op_char != Some('=') {
            self.pos += 1;
            if self.peek() != Some('=') {
                return Err(self.error("expected attribute operator"));
            }
        }
        self.pos += 1;
        self.skip_whitespace();
        let value = self.value()?;
        let op = match op_char {
            Some('=') => AttrOp::Equals(value),
            Some('*') => AttrOp::Contains(value),
            Some('^') => AttrOp::Prefix(value),
            Some('$') => AttrOp::Suffix(value),
            Some('~') => AttrOp::Word(value),
            _ => return Err(self.error("unsupported attribute operator")),
        };
        self.skip_whitespace();
        let mut case_insensitive = false;
        match self.peek() {
            Some('i' | 'I') => {
                case_insensitive = true;
                self.pos += 1;
            }
            Some('s' | 'S') => self.pos += 1,
            _ => {}
        }
        self.skip_whitespace();
        if self.peek() != Some(']') {
            return Err(self.error("expected ']'"));
        }
        self.pos += 1;
        Ok(AttrTest {
            name,
            op,
            case_insensitive,
        })
    }

    fn value(&mut self) -> VigiaResult<String> {
        match self.peek() {
            Some(q @ ('"' | '\'')) => {
                self.pos += 1;
                let mut out = String::new();
                loop {
                    match self.peek() {
                        Some(c) if c == q => {
                            self.pos += 1;
                            return Ok(out);
                        }
                        Some(c) => {
                            out.push(c);
                            self.pos += 1;
                        }
                        None => return Err(self.error("unterminated string")),
                    }
                }
            }
            _ => self.required_ident("attribute value"),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    fn attrs(pairs: &[(&str, &str)]) -> BTreeMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect()
    }

    #[test]
    fn test_search_input_list() {
        let list =
            CssSelectorList::parse(r#"input[type="search"], input[role="searchbox"]"#).unwrap();
        assert!(list.matches("input", &attrs(&[("type", "search")])));
        assert!(list.matches("input", &attrs(&[("role", "searchbox")])));
        assert!(!list.matches("input", &attrs(&[("type", "text")])));
        assert!(!list.matches("div", &attrs(&[("type", "search")])));
    }

    #[test]
    fn test_contains_and_presence() {
        let list = CssSelectorList::parse(
            r#"[aria-label*="search"], [placeholder*="Search"], [data-search]"#,
        )
        .unwrap();
        assert!(list.matches("div", &attrs(&[("aria-label", "open search")])));
        assert!(list.matches("input", &attrs(&[("placeholder", "Search docs")])));
        assert!(list.matches("div", &attrs(&[("data-search", "")])));
        assert!(!list.matches("div", &attrs(&[("aria-label", "Search")])));
    }

    #[test]
    fn test_case_insensitive_flag() {
        let list = CssSelectorList::parse(r#"[aria-label*="search" i]"#).unwrap();
        assert!(list.matches("button", &attrs(&[("aria-label", "Search")])));
    }

    #[test]
    fn test_id_and_classes() {
        let list = CssSelectorList::parse("button.DocSearch.DocSearch-Button").unwrap();
        assert!(list.matches(
            "button",
            &attrs(&[("class", "DocSearch DocSearch-Button extra")])
        ));
        assert!(!list.matches("button", &attrs(&[("class", "DocSearch")])));

        let by_id = CssSelectorList::parse("#main").unwrap();
        assert!(by_id.matches("div", &attrs(&[("id", "main")])));
    }

    #[test]
    fn test_rejects_combinators_and_garbage() {
        assert!(CssSelectorList::parse("nav a").is_err());
        assert!(CssSelectorList::parse("ul > li").is_err());
        assert!(CssSelectorList::parse("input[type=").is_err());
        assert!(CssSelectorList::parse("a,").is_err());
        assert!(CssSelectorList::parse("[x|=y]").is_err());
    }
}
