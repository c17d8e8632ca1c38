//! The GHG capability trait and a GitLab-backed implementation. The
//! client talks to the GitLab REST API directly via `reqwest` rather
//! than reusing a full endpoint-builder crate (DESIGN.md records why);
//! every mutating call is idempotent per §4.4: look up by cached
//! provider id, then by path, and adopt the existing resource on
//! collision instead of erroring.

use async_trait::async_trait;
use computor_core::error::ComputorError;
use serde::Deserialize;
use serde_json::json;

use crate::model::{AccessLevel, GitlabProperties, GroupSpec, MemberPrincipal, ProjectSpec};

#[async_trait]
pub trait GitHostGateway: Send + Sync {
    async fn find_group_by_path(&self, full_path: &str) -> Result<Option<GitlabProperties>, ComputorError>;

    async fn find_project_by_path(&self, full_path: &str) -> Result<Option<GitlabProperties>, ComputorError>;

    async fn find_or_create_group(
        &self,
        spec: &GroupSpec,
        cached: Option<&GitlabProperties>,
    ) -> Result<GitlabProperties, ComputorError>;

    async fn find_or_create_project(
        &self,
        spec: &ProjectSpec,
        cached: Option<&GitlabProperties>,
    ) -> Result<GitlabProperties, ComputorError>;

    async fn set_member_access(
        &self,
        properties: &GitlabProperties,
        principal: MemberPrincipal,
        level: AccessLevel,
    ) -> Result<(), ComputorError>;

    /// Builds an authenticated HTTPS remote URL for this provider. The
    /// credential is embedded only in the string handed to the git
    /// transport for a single call; it is never persisted to a remote
    /// config or logged (§4.4).
    fn authenticated_remote_url(&self, full_path: &str) -> String;
}

pub struct GitLabClient {
    base_url: String,
    token: String,
    http: reqwest::Client,
}

impl GitLabClient {
    pub fn new(base_url: impl Into<String>, token: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            token: token.into(),
            http: reqwest::Client::new(),
        }
    }

    fn api_url(&self, path: &str) -> String {
        format!("{}/api/v4{path}", self.base_url.trim_end_matches('/'))
    }

    fn request(&self, method: reqwest::Method, path: &str) -> reqwest::RequestBuilder {
        self.http
            .request(method, self.api_url(path))
            .header("PRIVATE-TOKEN", &self.token)
    }

    async fn decode<T: for<'de> Deserialize<'de>>(resp: reqwest::Response) -> Result<T, ComputorError> {
        let status = resp.status();
        if status == reqwest::StatusCode::UNAUTHORIZED || status == reqwest::StatusCode::FORBIDDEN {
            let body = resp.text().await.unwrap_or_default();
            return Err(ComputorError::ProviderAuth(body));
        }
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(ComputorError::ProviderTransient(format!("{status}: {body}")));
        }
        resp.json::<T>()
            .await
            .map_err(|e| ComputorError::ProviderTransient(e.to_string()))
    }
}

#[derive(Debug, Deserialize)]
struct RawGroup {
    id: i64,
    parent_id: Option<i64>,
    web_url: String,
    full_path: String,
}

#[derive(Debug, Deserialize)]
struct RawProject {
    id: i64,
    namespace: RawNamespace,
    web_url: String,
    path_with_namespace: String,
}

#[derive(Debug, Deserialize)]
struct RawNamespace {
    id: i64,
}

#[async_trait]
impl GitHostGateway for GitLabClient {
    async fn find_group_by_path(&self, full_path: &str) -> Result<Option<GitlabProperties>, ComputorError> {
        let resp = self
            .request(reqwest::Method::GET, &format!("/groups/{}", urlencoding_path(full_path)))
            .send()
            .await
            .map_err(|e| ComputorError::ProviderTransient(e.to_string()))?;
        if resp.status() == reqwest::StatusCode::NOT_FOUND {
            return Ok(None);
        }
        let raw: RawGroup = Self::decode(resp).await?;
        Ok(Some(GitlabProperties::for_group(
            raw.id,
            raw.parent_id,
            raw.web_url,
            raw.full_path,
        )))
    }

    async fn find_project_by_path(&self, full_path: &str) -> Result<Option<GitlabProperties>, ComputorError> {
        let resp = self
            .request(reqwest::Method::GET, &format!("/projects/{}", urlencoding_path(full_path)))
            .send()
            .await
            .map_err(|e| ComputorError::ProviderTransient(e.to_string()))?;
        if resp.status() == reqwest::StatusCode::NOT_FOUND {
            return Ok(None);
        }
        let raw: RawProject = Self::decode(resp).await?;
        Ok(Some(GitlabProperties::for_project(
            raw.id,
            raw.namespace.id,
            raw.web_url,
            raw.path_with_namespace,
        )))
    }

    async fn find_or_create_group(
        &self,
        spec: &GroupSpec,
        cached: Option<&GitlabProperties>,
    ) -> Result<GitlabProperties, ComputorError> {
        if let Some(id) = cached.and_then(|c| c.group_id) {
            let resp = self
                .request(reqwest::Method::GET, &format!("/groups/{id}"))
                .send()
                .await
                .map_err(|e| ComputorError::ProviderTransient(e.to_string()))?;
            if resp.status().is_success() {
                let raw: RawGroup = Self::decode(resp).await?;
                return Ok(GitlabProperties::for_group(raw.id, raw.parent_id, raw.web_url, raw.full_path));
            }
            tracing::warn!(group_id = id, "cached group id stale, falling back to path lookup");
        }

        let full_path = spec.full_path();
        if let Some(existing) = self.find_group_by_path(&full_path).await? {
            return Ok(existing);
        }

        let resp = self
            .request(reqwest::Method::POST, "/groups")
            .json(&json!({
                "name": spec.name,
                "path": spec.path,
                "parent_id": spec.parent_group_id,
            }))
            .send()
            .await
            .map_err(|e| ComputorError::ProviderTransient(e.to_string()))?;
        if resp.status() == reqwest::StatusCode::CONFLICT {
            // path taken: adopt the existing group (§4.4 collision rule).
            return self
                .find_group_by_path(&full_path)
                .await?
                .ok_or_else(|| ComputorError::Conflict(format!("group `{full_path}` conflicts but cannot be found")));
        }
        let raw: RawGroup = Self::decode(resp).await?;
        Ok(GitlabProperties::for_group(raw.id, raw.parent_id, raw.web_url, raw.full_path))
    }

    async fn find_or_create_project(
        &self,
        spec: &ProjectSpec,
        cached: Option<&GitlabProperties>,
    ) -> Result<GitlabProperties, ComputorError> {
        if let Some(id) = cached.and_then(|c| c.project_id) {
            let resp = self
                .request(reqwest::Method::GET, &format!("/projects/{id}"))
                .send()
                .await
                .map_err(|e| ComputorError::ProviderTransient(e.to_string()))?;
            if resp.status().is_success() {
                let raw: RawProject = Self::decode(resp).await?;
                return Ok(GitlabProperties::for_project(
                    raw.id,
                    raw.namespace.id,
                    raw.web_url,
                    raw.path_with_namespace,
                ));
            }
            tracing::warn!(project_id = id, "cached project id stale, falling back to path lookup");
        }

        let resp = self
            .request(reqwest::Method::POST, "/projects")
            .json(&json!({
                "name": spec.name,
                "path": spec.path,
                "namespace_id": spec.namespace_id,
                "initialize_with_readme": spec.initialize,
            }))
            .send()
            .await
            .map_err(|e| ComputorError::ProviderTransient(e.to_string()))?;
        if resp.status() == reqwest::StatusCode::CONFLICT {
            // path taken: adopt the existing project (§4.4 collision rule).
            let full_path = format!("{}/{}", spec.namespace_id, spec.path);
            return self
                .find_project_by_path(&full_path)
                .await?
                .ok_or_else(|| ComputorError::Conflict(format!("project `{}` conflicts but cannot be found", spec.path)));
        }
        let raw: RawProject = Self::decode(resp).await?;
        Ok(GitlabProperties::for_project(
            raw.id,
            raw.namespace.id,
            raw.web_url,
            raw.path_with_namespace,
        ))
    }

    async fn set_member_access(
        &self,
        properties: &GitlabProperties,
        principal: MemberPrincipal,
        level: AccessLevel,
    ) -> Result<(), ComputorError> {
        let (scope, id) = match properties.provider_id() {
            Some(id) if properties.group_id.is_some() => ("groups", id),
            Some(id) => ("projects", id),
            None => {
                return Err(ComputorError::Validation(
                    "gitlab properties carry neither group_id nor project_id".into(),
                ))
            }
        };

        let body = match principal {
            MemberPrincipal::User(user_id) => json!({
                "user_id": user_id,
                "access_level": level.as_gitlab_level(),
            }),
            MemberPrincipal::Group(group_id) => json!({
                "group_id": group_id,
                "group_access": level.as_gitlab_level(),
            }),
        };

        let path = match principal {
            MemberPrincipal::User(_) => format!("/{scope}/{id}/members"),
            MemberPrincipal::Group(_) => format!("/{scope}/{id}/share"),
        };

        let resp = self
            .request(reqwest::Method::POST, &path)
            .json(&body)
            .send()
            .await
            .map_err(|e| ComputorError::ProviderTransient(e.to_string()))?;

        if resp.status() == reqwest::StatusCode::CONFLICT {
            // Already a member/share at some level; treat as success,
            // matching the idempotent-mutation rule elsewhere in GHG.
            return Ok(());
        }
        if !resp.status().is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(ComputorError::ProviderTransient(body));
        }
        Ok(())
    }

    fn authenticated_remote_url(&self, full_path: &str) -> String {
        let base = self.base_url.trim_start_matches("https://").trim_start_matches("http://");
        format!("https://oauth2:{}@{base}/{full_path}.git", self.token)
    }
}

fn urlencoding_path(full_path: &str) -> String {
    full_path.replace('/', "%2F")
}
