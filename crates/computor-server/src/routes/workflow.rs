//! `POST /system/courses/{id}/generate-assignments`, `.../generate-student-template`,
//! and `GET /system/hierarchy/status/{workflow_id}` (§6).

use std::sync::Arc;

use axum::extract::{Path, State};
use axum::Json;
use computor_workflow::engine::{derive_workflow_id, WorkflowQueryResult, WorkflowStatus};
use serde::Serialize;
use serde_json::json;
use uuid::Uuid;

use crate::error::ApiResult;
use crate::routes::deploy::WorkflowSubmitted;
use crate::state::{AppState, TASK_QUEUE_GENERATE_ASSIGNMENTS, TASK_QUEUE_GENERATE_STUDENT_TEMPLATE};

pub async fn generate_assignments(State(state): State<Arc<AppState>>, Path(course_id): Path<Uuid>) -> ApiResult<Json<WorkflowSubmitted>> {
    let workflow_id = derive_workflow_id("deploy-course", course_id);
    let input = json!({ "course_id": course_id, "workflow_id": workflow_id });
    state.executor.submit(&workflow_id, TASK_QUEUE_GENERATE_ASSIGNMENTS, input).await?;
    Ok(Json(WorkflowSubmitted { workflow_id }))
}

pub async fn generate_student_template(State(state): State<Arc<AppState>>, Path(course_id): Path<Uuid>) -> ApiResult<Json<WorkflowSubmitted>> {
    let workflow_id = derive_workflow_id("student-template-course", course_id);
    let input = json!({ "course_id": course_id });
    state.executor.submit(&workflow_id, TASK_QUEUE_GENERATE_STUDENT_TEMPLATE, input).await?;
    Ok(Json(WorkflowSubmitted { workflow_id }))
}

#[derive(Debug, Serialize)]
pub struct WorkflowStatusResponse {
    pub status: &'static str,
    pub result: Option<serde_json::Value>,
    pub error: Option<String>,
}

impl From<WorkflowQueryResult> for WorkflowStatusResponse {
    fn from(result: WorkflowQueryResult) -> Self {
        let status = match result.status {
            WorkflowStatus::Running => "RUNNING",
            WorkflowStatus::Completed => "COMPLETED",
            WorkflowStatus::Failed => "FAILED",
            WorkflowStatus::Canceled => "CANCELED",
        };
        Self {
            status,
            result: result.result,
            error: result.error,
        }
    }
}

pub async fn hierarchy_status(State(state): State<Arc<AppState>>, Path(workflow_id): Path<String>) -> ApiResult<Json<WorkflowStatusResponse>> {
    let result = state.executor.query(&workflow_id).await?;
    Ok(Json(result.into()))
}
