use std::fmt;

use serde::{Deserialize, Serialize};

use crate::PathError;

/// A single path segment: nonempty, `[A-Za-z0-9_]+` only.
///
/// Hyphens are deliberately rejected — a label path with hyphenated
/// labels is exactly the GitLab-vs-DB path mismatch this crate exists
/// to avoid (GitLab paths commonly use hyphens; DB label paths here
/// never do, so a hyphen in input is a signal the caller passed a
/// filesystem or provider path by mistake).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Label(String);

impl Label {
    pub fn new(s: &str) -> Result<Self, PathError> {
        if s.is_empty() || !s.chars().all(|c| c.is_ascii_alphanumeric() || c == '_') {
            return Err(PathError::InvalidLabel(s.to_string()));
        }
        Ok(Self(s.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Label {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl TryFrom<String> for Label {
    type Error = PathError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(&value)
    }
}

impl From<Label> for String {
    fn from(label: Label) -> Self {
        label.0
    }
}
