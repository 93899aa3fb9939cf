//! Topic grants for sync roles

use crate::messages::SyncMethod;
use crate::topics::{TopicError, TopicPattern};
use std::fmt;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GrantError {
    #[error("invalid grant '{0}': expected '<method>:<pattern>'")]
    InvalidFormat(String),

    #[error("unknown sync method '{0}'")]
    UnknownMethod(String),

    #[error("invalid grant pattern: {0}")]
    Pattern(#[from] TopicError),
}

/// A single grant: sync method + topic pattern
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Grant {
    pub method: SyncMethod,
    pub pattern: TopicPattern,
}

impl Grant {
    pub fn new(method: SyncMethod, pattern: TopicPattern) -> Self {
        Self { method, pattern }
    }

    /// Parse `"<method>:<pattern>"`, where `all` expands to one grant per method
    pub fn parse_all(s: &str) -> Result<Vec<Grant>, GrantError> {
        let (method, pattern) = s
            .split_once(':')
            .ok_or_else(|| GrantError::InvalidFormat(s.to_string()))?;

        let methods = SyncMethod::parse_all(method.trim())
            .ok_or_else(|| GrantError::UnknownMethod(method.trim().to_string()))?;
        let pattern = TopicPattern::parse(pattern.trim())?;

        Ok(methods
            .into_iter()
            .map(|m| Grant::new(m, pattern.clone()))
            .collect())
    }

    /// Check if this grant allows `method` on everything `requested` names
    pub fn allows(&self, method: SyncMethod, requested: &TopicPattern) -> bool {
        self.method == method && self.pattern.covers(requested)
    }
}

impl fmt::Display for Grant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.method, self.pattern)
    }
}

/// A collection of grants; allows an operation if any grant does
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GrantSet {
    grants: Vec<Grant>,
}

impl GrantSet {
    pub fn new() -> Self {
        Self { grants: Vec::new() }
    }

    /// Parse a list of grant strings
    pub fn parse<I, S>(specs: I) -> Result<Self, GrantError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut set = GrantSet::new();
        for spec in specs {
            set.add_all(Grant::parse_all(spec.as_ref())?);
        }
        Ok(set)
    }

    pub fn add(&mut self, grant: Grant) {
        if !self.grants.contains(&grant) {
            self.grants.push(grant);
        }
    }

    pub fn add_all(&mut self, grants: impl IntoIterator<Item = Grant>) {
        for grant in grants {
            self.add(grant);
        }
    }

    /// Check `method` against a raw topic or topic pattern.
    ///
    /// Text that does not parse as a pattern is denied.
    pub fn allows(&self, method: SyncMethod, topic: &str) -> bool {
        match TopicPattern::parse(topic) {
            Ok(requested) => self.grants.iter().any(|g| g.allows(method, &requested)),
            Err(_) => false,
        }
    }

    pub fn len(&self) -> usize {
        self.grants.len()
    }

    pub fn is_empty(&self) -> bool {
        self.grants.is_empty()
    }
}

impl FromIterator<Grant> for GrantSet {
    fn from_iter<T: IntoIterator<Item = Grant>>(iter: T) -> Self {
        let mut set = GrantSet::new();
        set.add_all(iter);
        set
    }
}
