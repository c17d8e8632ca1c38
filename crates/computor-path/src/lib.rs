//! Label-path algebra used both as a database key type and as a filesystem
//! mapper (`.` segments on one side, `/` on the other).
//!
//! A single algebra here prevents the class of bug where a label-path
//! column is compared against a bare `String` — on a database that
//! backs the column with an ordered-label type (e.g. Postgres `ltree`),
//! a plain string-equality comparison silently returns no rows instead
//! of failing loudly. Every comparison in this crate, and every caller
//! that holds a [`LabelPath`], goes through the type instead.

mod label;
#[cfg(feature = "sea-orm-ltree")]
mod sea_orm_support;

pub use label::Label;

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors raised while constructing or parsing a [`LabelPath`].
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum PathError {
    #[error("path has no labels")]
    Empty,
    #[error("invalid label `{0}`: labels must match [A-Za-z0-9_]+")]
    InvalidLabel(String),
}

/// An ordered, non-empty sequence of [`Label`]s joined by `.`.
///
/// `LabelPath` is the single type used for `Organization.path`,
/// `CourseFamily.path`, `Course.path`, and `CourseContent.path`. The
/// first three are always single-label paths; `CourseContent.path` is
/// multi-label and forms a tree under its course.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct LabelPath {
    labels: Vec<Label>,
}

impl LabelPath {
    /// Parse a single label (no dots) into a one-level path.
    pub fn single(label: impl AsRef<str>) -> Result<Self, PathError> {
        Ok(Self {
            labels: vec![Label::new(label.as_ref())?],
        })
    }

    /// Build a path from an already-validated sequence of labels.
    ///
    /// Round-trip invariant: `from_label_sequence(labels(p)) == p` for
    /// every `p` this crate produces.
    pub fn from_label_sequence(labels: Vec<Label>) -> Result<Self, PathError> {
        if labels.is_empty() {
            return Err(PathError::Empty);
        }
        Ok(Self { labels })
    }

    /// Parse a dot-joined string such as `"week1.vectors"`.
    pub fn parse(s: &str) -> Result<Self, PathError> {
        if s.is_empty() {
            return Err(PathError::Empty);
        }
        let labels = s
            .split('.')
            .map(Label::new)
            .collect::<Result<Vec<_>, _>>()?;
        Self::from_label_sequence(labels)
    }

    /// Number of labels (`nlevel` in the ordered-label-path vocabulary).
    pub fn nlevel(&self) -> usize {
        self.labels.len()
    }

    pub fn labels(&self) -> &[Label] {
        &self.labels
    }

    /// `concat(a, b)`: append `other`'s labels after `self`'s.
    pub fn concat(&self, other: &LabelPath) -> LabelPath {
        let mut labels = self.labels.clone();
        labels.extend(other.labels.iter().cloned());
        LabelPath { labels }
    }

    /// Append a single label.
    pub fn push(&self, label: impl AsRef<str>) -> Result<LabelPath, PathError> {
        let mut labels = self.labels.clone();
        labels.push(Label::new(label.as_ref())?);
        Ok(LabelPath { labels })
    }

    /// `parent(p)`: the path with its last label removed, or `None` for
    /// a single-level path.
    pub fn parent(&self) -> Option<LabelPath> {
        if self.labels.len() <= 1 {
            return None;
        }
        Some(LabelPath {
            labels: self.labels[..self.labels.len() - 1].to_vec(),
        })
    }

    pub fn leaf(&self) -> &Label {
        self.labels.last().expect("LabelPath is never empty")
    }

    /// `is_ancestor(self, descendant)`.
    pub fn is_ancestor(&self, descendant: &LabelPath) -> bool {
        self.labels.len() < descendant.labels.len()
            && self.labels[..] == descendant.labels[..self.labels.len()]
    }

    /// `is_descendant(self, ancestor)`.
    pub fn is_descendant(&self, ancestor: &LabelPath) -> bool {
        ancestor.is_ancestor(self)
    }

    /// `to_filesystem(p)`: replace `.` with `/`. The result never
    /// contains `.` originating from label content, since labels are
    /// restricted to `[A-Za-z0-9_]+`.
    pub fn to_filesystem(&self) -> String {
        self.labels
            .iter()
            .map(Label::as_str)
            .collect::<Vec<_>>()
            .join("/")
    }
}

impl fmt::Display for LabelPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut first = true;
        for label in &self.labels {
            if !first {
                write!(f, ".")?;
            }
            first = false;
            write!(f, "{label}")?;
        }
        Ok(())
    }
}

impl FromStr for LabelPath {
    type Err = PathError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<String> for LabelPath {
    type Error = PathError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<LabelPath> for String {
    fn from(path: LabelPath) -> Self {
        path.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trip_via_labels() {
        let p = LabelPath::parse("week1.vectors.solution").unwrap();
        let rebuilt = LabelPath::from_label_sequence(p.labels().to_vec()).unwrap();
        assert_eq!(p, rebuilt);
        assert_eq!(p.to_string(), "week1.vectors.solution");
    }

    #[test]
    fn filesystem_mapping_has_no_dots() {
        let p = LabelPath::parse("week1.vectors").unwrap();
        assert_eq!(p.to_filesystem(), "week1/vectors");
        assert!(!p.to_filesystem().contains('.'));
    }

    #[test]
    fn rejects_empty_and_invalid_labels() {
        assert_eq!(LabelPath::parse(""), Err(PathError::Empty));
        assert!(LabelPath::parse("week-1").is_err());
        assert!(LabelPath::parse("week1..vectors").is_err());
    }

    #[test]
    fn ancestry() {
        let course = LabelPath::parse("week1").unwrap();
        let content = LabelPath::parse("week1.vectors").unwrap();
        assert!(course.is_ancestor(&content));
        assert!(content.is_descendant(&course));
        assert!(!content.is_ancestor(&course));
    }

    #[test]
    fn parent_of_single_level_is_none() {
        let p = LabelPath::parse("week1").unwrap();
        assert_eq!(p.parent(), None);
    }

    #[test]
    fn nlevel_counts_labels() {
        assert_eq!(LabelPath::parse("a.b.c").unwrap().nlevel(), 3);
    }

    #[test]
    fn concat_appends_labels() {
        let a = LabelPath::parse("week1").unwrap();
        let b = LabelPath::parse("vectors").unwrap();
        assert_eq!(a.concat(&b).to_string(), "week1.vectors");
    }

    proptest::proptest! {
        #[test]
        fn prop_round_trip(labels in proptest::collection::vec("[A-Za-z0-9_]{1,12}", 1..6)) {
            let path = LabelPath::from_label_sequence(
                labels.iter().map(|l| Label::new(l).unwrap()).collect()
            ).unwrap();
            let rebuilt = LabelPath::from_label_sequence(path.labels().to_vec()).unwrap();
            prop_assert_eq!(path.clone(), rebuilt);
            prop_assert!(!path.to_filesystem().contains('.'));
        }
    }
}
