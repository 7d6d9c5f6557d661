//! Text matching for accessible names, placeholders, and text content.
//!
//! Plain strings match as case-insensitive substrings after whitespace
//! normalization. Strings written `/source/flags` compile to regular
//! expressions. Exact matching is opt-in.

use crate::result::{VigiaError, VigiaResult};
use regex::{Regex, RegexBuilder};
use std::fmt;
use std::hash::{Hash, Hasher};
use std::str::FromStr;

/// Collapse runs of whitespace into single spaces and trim the ends
pub fn normalize_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// A compiled regular expression with the flags it was written with
#[derive(Debug, Clone)]
pub struct Pattern {
    source: String,
    flags: String,
    regex: Regex,
}

impl Pattern {
    /// Compile `source` with flag letters `i`, `m`, `s`, `u`
    pub fn new(source: impl Into<String>, flags: impl Into<String>) -> VigiaResult<Self> {
        let source = source.into();
        let flags = flags.into();
        let mut builder = RegexBuilder::new(&source);
        for flag in flags.chars() {
            match flag {
                'i' => {
                    builder.case_insensitive(true);
                }
                'm' => {
                    builder.multi_line(true);
                }
                's' => {
                    builder.dot_matches_new_line(true);
                }
                // Rust regexes are always Unicode aware
                'u' => {}
                other => {
                    return Err(VigiaError::InvalidPattern {
                        pattern: format!("/{source}/{flags}"),
                        message: format!("unsupported flag '{other}'"),
                    })
                }
            }
        }
        let regex = builder.build().map_err(|e| VigiaError::InvalidPattern {
            pattern: format!("/{source}/{flags}"),
            message: e.to_string(),
        })?;
        Ok(Self {
            source,
            flags,
            regex,
        })
    }

    /// Pattern source without delimiters
    pub fn source(&self) -> &str {
        &self.source
    }

    /// Flag letters
    pub fn flags(&self) -> &str {
        &self.flags
    }

    /// Test the compiled expression
    pub fn is_match(&self, text: &str) -> bool {
        self.regex.is_match(text)
    }
}

impl PartialEq for Pattern {
    fn eq(&self, other: &Self) -> bool {
        self.source == other.source && self.flags == other.flags
    }
}

impl Eq for Pattern {}

impl Hash for Pattern {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.source.hash(state);
        self.flags.hash(state);
    }
}

impl fmt::Display for Pattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "/{}/{}", self.source, self.flags)
    }
}

/// How a piece of text is matched
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum TextMatcher {
    /// Case-insensitive substring after whitespace normalization
    Substring(String),
    /// Whole-string equality after whitespace normalization
    Exact(String),
    /// Regular expression against the normalized text
    Pattern(Pattern),
}

impl TextMatcher {
    /// Substring matcher
    pub fn substring(text: impl Into<String>) -> Self {
        Self::Substring(text.into())
    }

    /// Exact matcher
    pub fn exact(text: impl Into<String>) -> Self {
        Self::Exact(text.into())
    }

    /// Regex matcher without flags
    pub fn regex(source: impl Into<String>) -> VigiaResult<Self> {
        Pattern::new(source, "").map(Self::Pattern)
    }

    /// Regex matcher with flags
    pub fn regex_with_flags(
        source: impl Into<String>,
        flags: impl Into<String>,
    ) -> VigiaResult<Self> {
        Pattern::new(source, flags).map(Self::Pattern)
    }

    /// Parse `/source/flags` as a pattern, anything else as a substring
    pub fn parse(input: &str) -> VigiaResult<Self> {
        if let Some(rest) = input.strip_prefix('/') {
            if let Some(end) = rest.rfind('/') {
                let flags = &rest[end + 1..];
                if flags.chars().all(|c| matches!(c, 'i' | 'm' | 's' | 'u')) {
                    return Self::regex_with_flags(&rest[..end], flags);
                }
            }
        }
        Ok(Self::Substring(input.to_string()))
    }

    /// Test `text` against this matcher
    pub fn matches(&self, text: &str) -> bool {
        let normalized = normalize_whitespace(text);
        match self {
            Self::Substring(needle) => normalized
                .to_lowercase()
                .contains(&normalize_whitespace(needle).to_lowercase()),
            Self::Exact(expected) => normalized == normalize_whitespace(expected),
            Self::Pattern(pattern) => pattern.is_match(&normalized),
        }
    }
}

impl FromStr for TextMatcher {
    type Err = VigiaError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl fmt::Display for TextMatcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Substring(text) => write!(f, "'{text}'"),
            Self::Exact(text) => write!(f, "'{text}' (exact)"),
            Self::Pattern(pattern) => write!(f, "{pattern}"),
        }
    }
}
