//! Request and response shapes for the Git Host Gateway (§4.4). Field
//! names mirror the GitLab REST API vocabulary (`namespace_id`,
//! `full_path`, numeric access levels) since GitLab is the reference
//! provider; a different provider adapter would translate at its own
//! boundary instead of changing these types.

use chrono::{DateTime, Utc};
use derive_builder::Builder;
use serde::{Deserialize, Serialize};

/// `{reporter=read, developer=read-write, maintainer=admin}` (§4.4).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccessLevel {
    Reporter,
    Developer,
    Maintainer,
}

impl AccessLevel {
    /// GitLab's numeric access level, as used in both the REST API
    /// and UI.
    pub const fn as_gitlab_level(self) -> u16 {
        match self {
            AccessLevel::Reporter => 20,
            AccessLevel::Developer => 30,
            AccessLevel::Maintainer => 40,
        }
    }
}

#[derive(Debug, Clone, Builder)]
#[builder(setter(into))]
pub struct GroupSpec {
    pub name: String,
    pub path: String,
    #[builder(default)]
    pub parent_group_id: Option<i64>,
    /// Full path of the parent group (e.g. `my_org/prog`), required
    /// whenever `parent_group_id` is set so the path-lookup fallback
    /// can build this group's true nested `full_path` rather than its
    /// bare leaf segment.
    #[builder(default)]
    pub parent_full_path: Option<String>,
}

impl GroupSpec {
    /// The full provider path this group resolves to: `path` alone at
    /// the top level, or `parent_full_path/path` when nested.
    pub fn full_path(&self) -> String {
        match &self.parent_full_path {
            Some(parent) => format!("{parent}/{}", self.path),
            None => self.path.clone(),
        }
    }
}

#[derive(Debug, Clone, Builder)]
#[builder(setter(into))]
pub struct ProjectSpec {
    pub name: String,
    pub path: String,
    pub namespace_id: i64,
    #[builder(default = "true")]
    pub initialize: bool,
}

/// A member or subgroup to grant access to; exactly one of `user_id`
/// / `group_id` is set.
#[derive(Debug, Clone)]
pub enum MemberPrincipal {
    User(i64),
    Group(i64),
}

/// Cached provider metadata persisted back onto the owning entity
/// (`Organization`/`CourseFamily`/`Course`). Either `group_id` or
/// `project_id` is populated, never both — which one is set tells the
/// caller what kind of resource this is.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GitlabProperties {
    pub group_id: Option<i64>,
    pub project_id: Option<i64>,
    pub namespace_id: Option<i64>,
    pub web_url: String,
    pub full_path: String,
    pub last_synced_at: DateTime<Utc>,
}

impl GitlabProperties {
    pub fn for_group(group_id: i64, namespace_id: Option<i64>, web_url: String, full_path: String) -> Self {
        Self {
            group_id: Some(group_id),
            project_id: None,
            namespace_id,
            web_url,
            full_path,
            last_synced_at: Utc::now(),
        }
    }

    pub fn for_project(project_id: i64, namespace_id: i64, web_url: String, full_path: String) -> Self {
        Self {
            group_id: None,
            project_id: Some(project_id),
            namespace_id: Some(namespace_id),
            web_url,
            full_path,
            last_synced_at: Utc::now(),
        }
    }

    pub fn provider_id(&self) -> Option<i64> {
        self.group_id.or(self.project_id)
    }
}
