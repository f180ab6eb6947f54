use serde::{Deserialize, Serialize};
use std::borrow::Borrow;
use std::collections::HashSet;
use std::fmt;
use thiserror::Error;

use crate::core::error::{Result, WardenError};

#[derive(Debug, Error)]
pub enum PatternError {
    #[error("invalid glob pattern: {0}")]
    InvalidGlob(String),
    #[error("invalid regex pattern: {0}")]
    InvalidRegex(#[from] regex::Error),
}

/// Opaque identifier of a grantable capability.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Capability(String);

impl Capability {
    pub fn new(id: impl Into<String>) -> Result<Self> {
        let id = id.into();
        if id.trim().is_empty() {
            return Err(WardenError::InvalidCapability(id));
        }
        Ok(Self(id))
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Parses every identifier, failing on the first invalid one.
    pub fn parse_all<I, S>(ids: I) -> Result<Vec<Self>>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        ids.into_iter().map(Self::new).collect()
    }
}

impl fmt::Display for Capability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl Borrow<str> for Capability {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl AsRef<str> for Capability {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Removes repeated identifiers, keeping the first occurrence of each.
#[must_use]
pub fn dedup_preserving_order(capabilities: Vec<Capability>) -> Vec<Capability> {
    let mut seen = HashSet::with_capacity(capabilities.len());
    capabilities
        .into_iter()
        .filter(|cap| seen.insert(cap.clone()))
        .collect()
}

/// Result of the synchronous check phase.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CheckReport {
    pub granted: Vec<Capability>,
    pub pending: Vec<Capability>,
    pub unknown: Vec<Capability>,
}

impl CheckReport {
    #[must_use]
    pub fn is_all_granted(&self) -> bool {
        self.pending.is_empty() && self.unknown.is_empty()
    }

    #[must_use]
    pub fn needs_consent(&self) -> bool {
        !self.pending.is_empty()
    }
}

/// Final disposition of every capability in a request.
///
/// The four lists are pairwise disjoint and together cover the
/// deduplicated request.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Outcome {
    pub granted: Vec<Capability>,
    pub denied: Vec<Capability>,
    pub denied_permanently: Vec<Capability>,
    pub unknown: Vec<Capability>,
}

impl Outcome {
    #[must_use]
    pub fn is_all_granted(&self) -> bool {
        self.denied.is_empty() && self.denied_permanently.is_empty() && self.unknown.is_empty()
    }

    /// Every refused capability, permanent or not.
    pub fn all_denied(&self) -> impl Iterator<Item = &Capability> {
        self.denied.iter().chain(&self.denied_permanently)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.granted.len() + self.denied.len() + self.denied_permanently.len() + self.unknown.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fn join(caps: &[Capability]) -> String {
            caps.iter()
                .map(Capability::as_str)
                .collect::<Vec<_>>()
                .join(", ")
        }

        writeln!(f, "granted: {}", join(&self.granted))?;
        writeln!(f, "denied: {}", join(&self.denied))?;
        writeln!(f, "denied permanently: {}", join(&self.denied_permanently))?;
        write!(f, "unknown: {}", join(&self.unknown))
    }
}

/// Matcher used by configuration-driven authorities.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "pattern", rename_all = "snake_case")]
pub enum Pattern {
    Exact(String),
    Glob(String),
    Regex(String),
}

impl Pattern {
    /// Compiles the pattern once so repeated lookups skip parsing.
    pub fn compile(&self) -> std::result::Result<CompiledPattern, PatternError> {
        Ok(match self {
            Self::Exact(s) => CompiledPattern::Exact(s.clone()),
            Self::Glob(s) => CompiledPattern::Glob(
                glob::Pattern::new(s).map_err(|e| PatternError::InvalidGlob(e.to_string()))?,
            ),
            Self::Regex(s) => CompiledPattern::Regex(regex::Regex::new(s)?),
        })
    }
}

impl fmt::Display for Pattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Exact(s) | Self::Glob(s) => write!(f, "{s}"),
            Self::Regex(s) => write!(f, "/{s}/"),
        }
    }
}

#[derive(Debug, Clone)]
pub enum CompiledPattern {
    Exact(String),
    Glob(glob::Pattern),
    Regex(regex::Regex),
}

impl CompiledPattern {
    #[must_use]
    pub fn matches(&self, target: &str) -> bool {
        match self {
            Self::Exact(s) => s == target,
            Self::Glob(p) => p.matches(target),
            Self::Regex(re) => re.is_match(target),
        }
    }
}
