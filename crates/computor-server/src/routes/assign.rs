//! `POST /course-contents/{id}/assign-example` (§6): binds a
//! submittable `CourseContent` to a catalog `ExampleVersion`, creating
//! or updating its `CourseContentDeployment` and appending an
//! `assigned` `DeploymentHistory` row. Unlike the workflow-shaped
//! routes, this is a single short DB transaction — assignment itself
//! does not touch the provider or the object store, only DP/AD do.

use std::sync::Arc;

use chrono::Utc;
use computor_catalog::entities::course_content_deployment::{self, DeploymentStatus};
use computor_catalog::entities::deployment_history::{self, HistoryAction};
use computor_catalog::entities::{course_content, example_version};
use computor_core::error::ComputorError;
use sea_orm::{ActiveModelTrait, ActiveValue::Set, ColumnTrait, EntityTrait, QueryFilter, TransactionTrait};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use axum::extract::{Path, State};
use axum::Json;

use crate::error::ApiResult;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct AssignExampleRequest {
    pub example_id: Uuid,
    pub example_version_id: Uuid,
}

#[derive(Debug, Serialize)]
pub struct AssignExampleResponse {
    pub course_content_deployment_id: Uuid,
    pub status: DeploymentStatus,
}

pub async fn assign_example(
    State(state): State<Arc<AppState>>,
    Path(course_content_id): Path<Uuid>,
    Json(req): Json<AssignExampleRequest>,
) -> ApiResult<Json<AssignExampleResponse>> {
    let content = course_content::Entity::find_by_id(course_content_id)
        .one(&state.db)
        .await
        .map_err(|e| ComputorError::ProviderTransient(e.to_string()))?
        .ok_or_else(|| ComputorError::NotFound(format!("course_content {course_content_id}")))?;
    if !content.submittable {
        return Err(ComputorError::Conflict(format!("course_content {course_content_id} is not submittable")).into());
    }

    let version = example_version::Entity::find_by_id(req.example_version_id)
        .one(&state.db)
        .await
        .map_err(|e| ComputorError::ProviderTransient(e.to_string()))?
        .ok_or_else(|| ComputorError::NotFound(format!("example_version {}", req.example_version_id)))?;
    if version.example_id != req.example_id {
        return Err(ComputorError::Validation(format!(
            "example_version {} does not belong to example {}",
            req.example_version_id, req.example_id
        ))
        .into());
    }

    let txn = state.db.begin().await.map_err(|e| ComputorError::ProviderTransient(e.to_string()))?;

    let mut content_active: course_content::ActiveModel = content.into();
    content_active.example_id = Set(Some(req.example_id));
    content_active.example_version_id = Set(Some(req.example_version_id));
    content_active
        .update(&txn)
        .await
        .map_err(|e| ComputorError::ProviderTransient(e.to_string()))?;

    let existing = course_content_deployment::Entity::find()
        .filter(course_content_deployment::Column::CourseContentId.eq(course_content_id))
        .one(&txn)
        .await
        .map_err(|e| ComputorError::ProviderTransient(e.to_string()))?;

    let deployment_id = match existing {
        Some(existing) => {
            if !existing.status.can_transition_to(DeploymentStatus::Assigned) {
                tracing::warn!(
                    course_content_id = %course_content_id,
                    from = ?existing.status,
                    "re-assigning example over an existing non-pending deployment"
                );
            }
            let id = existing.id;
            let mut active: course_content_deployment::ActiveModel = existing.into();
            active.example_version_id = Set(Some(req.example_version_id));
            active.status = Set(DeploymentStatus::Assigned);
            active.update(&txn).await.map_err(|e| ComputorError::ProviderTransient(e.to_string()))?;
            id
        }
        None => {
            let id = Uuid::new_v4();
            let model = course_content_deployment::ActiveModel {
                id: Set(id),
                course_content_id: Set(course_content_id),
                example_version_id: Set(Some(req.example_version_id)),
                status: Set(DeploymentStatus::Assigned),
                deployed_at: Set(None),
                deployed_path: Set(None),
                workflow_id: Set(None),
                last_deployment_metadata: Set(None),
            };
            model.insert(&txn).await.map_err(|e| ComputorError::ProviderTransient(e.to_string()))?;
            id
        }
    };

    let history = deployment_history::ActiveModel {
        id: Set(Uuid::new_v4()),
        deployment_id: Set(deployment_id),
        action: Set(HistoryAction::Assigned),
        example_version_id: Set(Some(req.example_version_id)),
        workflow_id: Set(None),
        actor: Set(None),
        created_at: Set(Utc::now()),
        details: Set(None),
    };
    history.insert(&txn).await.map_err(|e| ComputorError::ProviderTransient(e.to_string()))?;

    txn.commit().await.map_err(|e| ComputorError::ProviderTransient(e.to_string()))?;

    Ok(Json(AssignExampleResponse {
        course_content_deployment_id: deployment_id,
        status: DeploymentStatus::Assigned,
    }))
}
