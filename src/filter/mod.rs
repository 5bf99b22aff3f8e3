//! Post filters
//!
//! Filters are given on the command line as `FIELD:PATTERN` and suppress
//! every post whose named field matches. Three pattern forms are accepted:
//!
//! - `/regex/`: a regular expression
//! - `[text]`: an exact substring
//! - anything else: whitespace separated words, `*` acting as a wildcard;
//!   the pattern matches when any of the words does

use crate::site::Post;
use regex::Regex;
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Errors raised while compiling a filter expression
#[derive(Debug, Error)]
pub enum FilterError {
    #[error("filter '{0}' must have the form FIELD:PATTERN")]
    MissingSeparator(String),

    #[error("filter '{0}' has an empty field name")]
    EmptyField(String),

    #[error("filter '{0}' has an empty pattern")]
    EmptyPattern(String),

    #[error("filter '{expression}' has an invalid pattern: {source}")]
    InvalidPattern {
        expression: String,
        #[source]
        source: regex::Error,
    },
}

/// A compiled `(field, pattern)` pair
#[derive(Debug, Clone)]
pub struct FilterPredicate {
    field: String,
    matcher: Regex,
}

impl FilterPredicate {
    /// Compiles a pattern against a post field
    pub fn new(field: &str, pattern: &str) -> Result<Self, FilterError> {
        let expression = format!("{}:{}", field, pattern);
        let field = field.trim();
        if field.is_empty() {
            return Err(FilterError::EmptyField(expression));
        }

        let source = pattern_to_regex(pattern.trim())
            .ok_or_else(|| FilterError::EmptyPattern(expression.clone()))?;
        let matcher = Regex::new(&source)
            .map_err(|source| FilterError::InvalidPattern { expression, source })?;

        Ok(Self {
            field: field.to_string(),
            matcher,
        })
    }

    /// Parses a `FIELD:PATTERN` expression
    ///
    /// Only the first colon separates field from pattern, so patterns may
    /// themselves contain colons.
    pub fn parse(expression: &str) -> Result<Self, FilterError> {
        let (field, pattern) = expression
            .split_once(':')
            .ok_or_else(|| FilterError::MissingSeparator(expression.to_string()))?;
        Self::new(field, pattern)
    }

    pub fn field(&self) -> &str {
        &self.field
    }

    /// Whether the post's field matches; a missing field is the empty string
    pub fn matches(&self, post: &Post) -> bool {
        self.matcher.is_match(&post.field_string(&self.field))
    }
}

impl FromStr for FilterPredicate {
    type Err = FilterError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl fmt::Display for FilterPredicate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.field, self.matcher.as_str())
    }
}

/// True when any predicate matches the post
pub fn is_filtered(post: &Post, filters: &[FilterPredicate]) -> bool {
    filters.iter().any(|filter| filter.matches(post))
}

fn pattern_to_regex(pattern: &str) -> Option<String> {
    if pattern.len() >= 2 && pattern.starts_with('/') && pattern.ends_with('/') {
        let inner = &pattern[1..pattern.len() - 1];
        return (!inner.is_empty()).then(|| inner.to_string());
    }

    if pattern.len() >= 2 && pattern.starts_with('[') && pattern.ends_with(']') {
        let inner = &pattern[1..pattern.len() - 1];
        return (!inner.is_empty()).then(|| regex::escape(inner));
    }

    let words: Vec<String> = pattern
        .split_whitespace()
        .map(|word| {
            word.split('*')
                .map(regex::escape)
                .collect::<Vec<_>>()
                .join(".*?")
        })
        .filter(|word| !word.is_empty())
        .collect();

    (!words.is_empty()).then(|| words.join("|"))
}
