//! The declarative deployment configuration (§6), the single YAML
//! input to `DeployHierarchy`.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GitlabTarget {
    pub url: String,
    pub token: String,
    pub parent: Option<i64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrganizationConfig {
    pub path: String,
    pub name: String,
    pub description: Option<String>,
    pub gitlab: GitlabTarget,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CourseFamilyConfig {
    pub path: String,
    pub name: String,
    pub description: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExecutionBackendConfig {
    pub slug: String,
    #[serde(default)]
    pub settings: serde_json::Value,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceConfig {
    pub url: Option<String>,
    pub token: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct CourseSettingsConfig {
    #[serde(default)]
    pub source: Option<SourceConfig>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CourseConfig {
    pub path: String,
    pub name: String,
    pub description: Option<String>,
    #[serde(default, rename = "executionBackends")]
    pub execution_backends: Vec<ExecutionBackendConfig>,
    #[serde(default)]
    pub settings: CourseSettingsConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeployHierarchyConfig {
    pub organization: OrganizationConfig,
    #[serde(rename = "courseFamily")]
    pub course_family: CourseFamilyConfig,
    pub course: CourseConfig,
}

impl DeployHierarchyConfig {
    pub fn from_yaml(yaml: &str) -> Result<Self, serde_yaml::Error> {
        serde_yaml::from_str(yaml)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"
organization:
  path: acme
  name: ACME University
  gitlab: { url: "https://gitlab.example.com", token: "secret", parent: null }
courseFamily:
  path: cs
  name: Computer Science
course:
  path: algorithms101
  name: Algorithms 101
  executionBackends:
    - slug: python-pytest
  settings:
    source:
      url: "https://example.com/seed.git"
"#;

    #[test]
    fn parses_full_config() {
        let cfg = DeployHierarchyConfig::from_yaml(SAMPLE).unwrap();
        assert_eq!(cfg.organization.path, "acme");
        assert_eq!(cfg.course.execution_backends.len(), 1);
        assert_eq!(
            cfg.course.settings.source.as_ref().unwrap().url.as_deref(),
            Some("https://example.com/seed.git")
        );
    }
}
