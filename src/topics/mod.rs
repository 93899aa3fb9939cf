//! Topic naming and pattern matching for sync grants
//!
//! Topic names are dot-separated segments: `chat.room-1.messages`
//! Each segment must match: [a-zA-Z0-9_-]+
//!
//! Patterns may end with a wildcard:
//! - `chat.room-1.*` covers `chat.room-1.messages`, `chat.room-1.typing.7`
//! - `chat.*` covers anything under `chat.`
//! - `*` covers everything

use std::fmt;
use std::str::FromStr;
use thiserror::Error;

fn is_valid_segment_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_' || c == '-'
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TopicError {
    #[error("topic cannot be empty")]
    Empty,

    #[error("invalid segment '{0}': must match [a-zA-Z0-9_-]+")]
    InvalidSegment(String),

    #[error("wildcard '*' can only appear as the last segment")]
    WildcardNotAtEnd,

    #[error("empty segment in topic")]
    EmptySegment,
}

fn validate_segments(name: &str) -> Result<(), TopicError> {
    for part in name.split('.') {
        if part.is_empty() {
            return Err(TopicError::EmptySegment);
        }
        if part.contains('*') {
            return Err(TopicError::WildcardNotAtEnd);
        }
        if !part.chars().all(is_valid_segment_char) {
            return Err(TopicError::InvalidSegment(part.to_string()));
        }
    }
    Ok(())
}

/// `name` lies strictly below `prefix` in the segment hierarchy
fn is_below(name: &str, prefix: &str) -> bool {
    name.len() > prefix.len()
        && name.starts_with(prefix)
        && name.as_bytes()[prefix.len()] == b'.'
}

/// A topic pattern that may end with a wildcard
///
/// A pattern without a wildcard names exactly one topic, so subscription
/// requests for a single topic and for a whole subtree share this type.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TopicPattern {
    /// The prefix before the wildcard (or the full name if no wildcard)
    prefix: String,
    is_wildcard: bool,
}

impl TopicPattern {
    pub fn parse(pattern: &str) -> Result<Self, TopicError> {
        if pattern.is_empty() {
            return Err(TopicError::Empty);
        }

        if pattern == "*" {
            return Ok(Self {
                prefix: String::new(),
                is_wildcard: true,
            });
        }

        let (prefix, is_wildcard) = match pattern.strip_suffix(".*") {
            Some(prefix) => (prefix, true),
            None => (pattern, false),
        };

        validate_segments(prefix)?;

        Ok(Self {
            prefix: prefix.to_string(),
            is_wildcard,
        })
    }

    /// Whether every topic matched by `other` is also matched by `self`
    pub fn covers(&self, other: &TopicPattern) -> bool {
        if !self.is_wildcard {
            return !other.is_wildcard && self.prefix == other.prefix;
        }
        if self.prefix.is_empty() {
            return true;
        }
        if other.prefix == self.prefix {
            return other.is_wildcard;
        }
        is_below(&other.prefix, &self.prefix)
    }
}

impl fmt::Display for TopicPattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (self.is_wildcard, self.prefix.is_empty()) {
            (true, true) => write!(f, "*"),
            (true, false) => write!(f, "{}.*", self.prefix),
            (false, _) => write!(f, "{}", self.prefix),
        }
    }
}

impl FromStr for TopicPattern {
    type Err = TopicError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}
