//! The parsed `meta.yaml` model (§3 "Meta", §6 field list). Recognized
//! fields only; unknown keys are preserved in `extra` so a later
//! consumer (e.g. an execution backend) can still see them without a
//! schema migration here — meta.yaml's schema evolution is explicitly
//! out of scope (spec.md Non-goals) beyond what the deployment
//! pipeline consumes.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExecutionBackend {
    pub slug: String,
    pub version: Option<String>,
    #[serde(default)]
    pub settings: serde_json::Value,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct MetaProperties {
    #[serde(default, rename = "studentSubmissionFiles")]
    pub student_submission_files: Vec<String>,
    #[serde(default, rename = "additionalFiles")]
    pub additional_files: Vec<String>,
    #[serde(default, rename = "testFiles")]
    pub test_files: Vec<String>,
    #[serde(default, rename = "studentTemplates")]
    pub student_templates: Vec<String>,
    #[serde(default, rename = "executionBackend")]
    pub execution_backend: Option<ExecutionBackend>,
}

/// A `testDependencies` list entry before normalization into
/// `ExampleDependency` rows: either a bare hierarchical slug (meaning
/// "latest") or an object naming an explicit constraint.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum TestDependencyEntry {
    Bare(String),
    Explicit { slug: String, version: Option<String> },
}

impl TestDependencyEntry {
    pub fn slug(&self) -> &str {
        match self {
            TestDependencyEntry::Bare(s) => s,
            TestDependencyEntry::Explicit { slug, .. } => slug,
        }
    }

    pub fn constraint(&self) -> Option<&str> {
        match self {
            TestDependencyEntry::Bare(_) => None,
            TestDependencyEntry::Explicit { version, .. } => version.as_deref(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Meta {
    pub title: String,
    pub description: Option<String>,
    /// Hierarchical, e.g. `alg.sort`. Must contain at least two labels
    /// when used as a `testDependencies` slug; the example's own
    /// top-level `slug` has no such minimum.
    pub slug: String,
    pub version: String,
    pub language: Option<String>,
    pub license: Option<String>,
    #[serde(default)]
    pub authors: Vec<String>,
    #[serde(default)]
    pub properties: MetaProperties,
    #[serde(default, rename = "testDependencies")]
    pub test_dependencies: Vec<TestDependencyEntry>,
    #[serde(flatten)]
    pub extra: HashMap<String, serde_json::Value>,
}

#[derive(Debug, thiserror::Error)]
pub enum MetaError {
    #[error("failed to parse meta.yaml: {0}")]
    Parse(#[from] serde_yaml::Error),
    #[error("testDependencies slug `{0}` must be hierarchical (at least two labels)")]
    NonHierarchicalSlug(String),
}

impl Meta {
    pub fn parse(yaml: &str) -> Result<Self, MetaError> {
        let meta: Meta = serde_yaml::from_str(yaml)?;
        for dep in &meta.test_dependencies {
            if !dep.slug().contains('.') {
                return Err(MetaError::NonHierarchicalSlug(dep.slug().to_string()));
            }
        }
        Ok(meta)
    }

    /// A student-safe derivative that omits test references and
    /// grading internals (§4.9 step 5).
    pub fn student_safe(&self) -> Meta {
        let mut safe = self.clone();
        safe.properties.test_files.clear();
        safe.test_dependencies.clear();
        safe.extra.remove("grading");
        safe.extra.remove("solution");
        safe
    }

    pub fn to_yaml(&self) -> Result<String, MetaError> {
        Ok(serde_yaml::to_string(self)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"
title: Vectors
slug: physics.math.vectors
version: v1.0
language: python
properties:
  studentSubmissionFiles: [main.py, utils.py]
  additionalFiles: [README_extra.md]
  testFiles: [test_main.py]
  studentTemplates: [studentTemplates/main.py]
testDependencies:
  - alg.base
  - slug: alg.sort
    version: ">=1.1"
"#;

    #[test]
    fn parses_mixed_test_dependencies() {
        let meta = Meta::parse(SAMPLE).unwrap();
        assert_eq!(meta.test_dependencies.len(), 2);
        assert_eq!(meta.test_dependencies[0].slug(), "alg.base");
        assert_eq!(meta.test_dependencies[0].constraint(), None);
        assert_eq!(meta.test_dependencies[1].constraint(), Some(">=1.1"));
    }

    #[test]
    fn student_safe_strips_tests() {
        let meta = Meta::parse(SAMPLE).unwrap();
        let safe = meta.student_safe();
        assert!(safe.properties.test_files.is_empty());
        assert!(safe.test_dependencies.is_empty());
        assert_eq!(safe.properties.student_submission_files.len(), 2);
    }

    #[test]
    fn rejects_non_hierarchical_slug() {
        let yaml = SAMPLE.replace("alg.base", "base");
        assert!(matches!(
            Meta::parse(&yaml),
            Err(MetaError::NonHierarchicalSlug(_))
        ));
    }
}
