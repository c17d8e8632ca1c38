//! `POST /system/deploy/{organizations,course-families,courses}` and
//! `POST /system/hierarchy/create` (§6): each submits one HP workflow
//! under a workflow id derived from the resource it targets, and
//! returns immediately with `{workflow_id}`.

use std::sync::Arc;

use axum::extract::State;
use axum::Json;
use computor_orchestrator::config::{CourseConfig, CourseFamilyConfig, DeployHierarchyConfig, OrganizationConfig};
use computor_workflow::engine::derive_workflow_id;
use serde::{Deserialize, Serialize};
use serde_json::json;
use uuid::Uuid;

use crate::error::ApiResult;
use crate::state::{AppState, TASK_QUEUE_CREATE_COURSE, TASK_QUEUE_CREATE_COURSE_FAMILY, TASK_QUEUE_CREATE_ORGANIZATION, TASK_QUEUE_DEPLOY_HIERARCHY};

#[derive(Debug, Serialize)]
pub struct WorkflowSubmitted {
    pub workflow_id: String,
}

pub async fn deploy_organization(State(state): State<Arc<AppState>>, Json(cfg): Json<OrganizationConfig>) -> ApiResult<Json<WorkflowSubmitted>> {
    let workflow_id = derive_workflow_id("create-organization", &cfg.path);
    state
        .executor
        .submit(&workflow_id, TASK_QUEUE_CREATE_ORGANIZATION, serde_json::to_value(&cfg).expect("config is serializable"))
        .await?;
    Ok(Json(WorkflowSubmitted { workflow_id }))
}

#[derive(Debug, Deserialize)]
pub struct CreateCourseFamilyRequest {
    pub organization_id: Uuid,
    #[serde(flatten)]
    pub config: CourseFamilyConfig,
}

pub async fn deploy_course_family(State(state): State<Arc<AppState>>, Json(req): Json<CreateCourseFamilyRequest>) -> ApiResult<Json<WorkflowSubmitted>> {
    let workflow_id = derive_workflow_id("create-course-family", format!("{}-{}", req.organization_id, req.config.path));
    let input = json!({ "organization_id": req.organization_id, "config": req.config });
    state.executor.submit(&workflow_id, TASK_QUEUE_CREATE_COURSE_FAMILY, input).await?;
    Ok(Json(WorkflowSubmitted { workflow_id }))
}

#[derive(Debug, Deserialize)]
pub struct CreateCourseRequest {
    pub course_family_id: Uuid,
    #[serde(flatten)]
    pub config: CourseConfig,
}

pub async fn deploy_course(State(state): State<Arc<AppState>>, Json(req): Json<CreateCourseRequest>) -> ApiResult<Json<WorkflowSubmitted>> {
    let workflow_id = derive_workflow_id("create-course", format!("{}-{}", req.course_family_id, req.config.path));
    let input = json!({ "course_family_id": req.course_family_id, "config": req.config });
    state.executor.submit(&workflow_id, TASK_QUEUE_CREATE_COURSE, input).await?;
    Ok(Json(WorkflowSubmitted { workflow_id }))
}

/// Accepts the declarative YAML config verbatim as the request body
/// (§6); `Content-Type` is irrelevant, the body is parsed as YAML
/// regardless, matching how `DeployHierarchyConfig::from_yaml` is the
/// single parser for this shape everywhere else in the workspace.
pub async fn create_hierarchy(State(state): State<Arc<AppState>>, body: String) -> ApiResult<Json<WorkflowSubmitted>> {
    let cfg = DeployHierarchyConfig::from_yaml(&body)
        .map_err(|e| computor_core::error::ComputorError::Validation(format!("invalid hierarchy config: {e}")))?;
    let workflow_id = derive_workflow_id("deploy-hierarchy", &cfg.course.path);
    let input = serde_json::to_value(&cfg).expect("config is serializable");
    state.executor.submit(&workflow_id, TASK_QUEUE_DEPLOY_HIERARCHY, input).await?;
    Ok(Json(WorkflowSubmitted { workflow_id }))
}
