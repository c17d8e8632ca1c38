//! Assignment Deployer (AD, §4.8): workflow `GenerateAssignments`.
//! Makes the course's `assignments` repository reflect the current
//! [`DeploymentPlan`] exactly — clone, materialize each deployment's
//! files, commit, push, and record per-content status.

use std::collections::HashSet;
use std::path::Path;

use chrono::{DateTime, Utc};
use computor_catalog::entities::course;
use computor_catalog::entities::course_content_deployment::{self, DeploymentStatus};
use computor_catalog::entities::deployment_history::{self, HistoryAction};
use computor_catalog::entities::example;
use computor_catalog::meta::Meta;
use computor_core::config::ActivityTimeouts;
use computor_core::error::ComputorError;
use computor_core::retry::RetryPolicy;
use computor_git::{GitHostGateway, GitTransport};
use computor_storage::{ContentStoreGateway, ObjectStoreBackend};
use computor_workflow::activity::{run_activity, ActivityContext, CancelToken};
use sea_orm::{ActiveModelTrait, ActiveValue::Set, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter};
use serde::{Deserialize, Serialize};
use serde_json::json;
use uuid::Uuid;

use crate::planner::{plan_course_deployment, Deployment, DeploymentPlan};
use crate::provisioning::CourseGitlabProperties;

const BRANCH: &str = "main";
const MANIFEST_FILE: &str = ".deployment.json";
const COMMIT_AUTHOR: &str = "computor-orchestrator";

#[derive(Debug, Serialize, Deserialize)]
struct DeploymentManifest {
    example_id: Uuid,
    example_version_id: Uuid,
    deployed_at: DateTime<Utc>,
    files: Vec<String>,
}

/// Outcome of materializing and recording a single [`Deployment`].
pub struct DeploymentOutcome {
    pub deployment: Deployment,
    pub result: Result<(), ComputorError>,
}

fn transfer_ctx(cancel: CancelToken) -> ActivityContext {
    ActivityContext::new(ActivityTimeouts::REPOSITORY_TRANSFER, ActivityTimeouts::HEARTBEAT_INTERVAL, cancel)
}

fn provider_ctx(cancel: CancelToken) -> ActivityContext {
    ActivityContext::new(ActivityTimeouts::PROVIDER_CALL, ActivityTimeouts::HEARTBEAT_INTERVAL, cancel)
}

fn db_ctx(cancel: CancelToken) -> ActivityContext {
    ActivityContext::new(ActivityTimeouts::FAST_DB, ActivityTimeouts::HEARTBEAT_INTERVAL, cancel)
}

pub(crate) async fn load_course_gitlab_properties(db: &DatabaseConnection, course_id: Uuid) -> Result<(course::Model, CourseGitlabProperties), ComputorError> {
    let row = course::Entity::find_by_id(course_id)
        .one(db)
        .await
        .map_err(|e| ComputorError::ProviderTransient(e.to_string()))?
        .ok_or_else(|| ComputorError::NotFound(format!("course {course_id}")))?;
    let properties: CourseGitlabProperties = row
        .gitlab_properties
        .clone()
        .and_then(|v| serde_json::from_value(v).ok())
        .ok_or_else(|| ComputorError::Validation("course has no provider projects yet".into()))?;
    Ok((row, properties))
}

/// Downloads every object under a version's storage prefix (skipping
/// the raw `meta.yaml`, rewritten separately with course-specific
/// values) into `target_dir`, returning the paths written relative to
/// `target_dir`.
async fn materialize_deployment<B: ObjectStoreBackend>(
    storage: &ContentStoreGateway<B>,
    repo_root: &Path,
    deployment: &Deployment,
    repository_id: Uuid,
) -> Result<Vec<String>, ComputorError> {
    let prefix = computor_storage::addressing::version_prefix(repository_id, deployment.example_id, &deployment.version_tag);
    let keys = storage.list_objects(storage.default_bucket(), &prefix).await?;
    let target_dir = repo_root.join(&deployment.target_path);
    tokio::fs::create_dir_all(&target_dir).await?;

    let mut written = Vec::with_capacity(keys.len());
    for key in keys {
        let relative = key.strip_prefix(&format!("{prefix}/")).unwrap_or(&key).to_string();
        if relative == "meta.yaml" {
            continue;
        }
        let object = storage.get_object(storage.default_bucket(), &key).await?;
        let dest = target_dir.join(&relative);
        if let Some(parent) = dest.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        tokio::fs::write(&dest, object.bytes.as_ref()).await?;
        written.push(relative);
    }
    Ok(written)
}

/// Rewrites `meta.yaml` at the deployment target with course-specific
/// values (identifier, content id, version tag) layered into `extra`
/// (§4.8 step 4).
async fn write_course_meta<B: ObjectStoreBackend>(
    storage: &ContentStoreGateway<B>,
    repo_root: &Path,
    deployment: &Deployment,
    repository_id: Uuid,
    identifier: &str,
) -> Result<(), ComputorError> {
    let key = computor_storage::addressing::file_key(repository_id, deployment.example_id, &deployment.version_tag, "meta.yaml");
    let object = storage.get_object(storage.default_bucket(), &key).await?;
    let yaml = std::str::from_utf8(object.bytes.as_ref())
        .map_err(|e| ComputorError::Validation(format!("meta.yaml for {identifier} is not valid UTF-8: {e}")))?;
    let mut meta = Meta::parse(yaml).map_err(|e| ComputorError::Validation(e.to_string()))?;
    meta.extra.insert("identifier".to_string(), json!(identifier));
    meta.extra.insert("versionTag".to_string(), json!(deployment.version_tag));
    if let Some(content_id) = deployment.course_content_id {
        meta.extra.insert("courseContentId".to_string(), json!(content_id));
    }
    let rewritten = meta.to_yaml().map_err(|e| ComputorError::Validation(e.to_string()))?;
    tokio::fs::write(repo_root.join(&deployment.target_path).join("meta.yaml"), rewritten).await?;
    Ok(())
}

/// Removes files present in a previous `.deployment.json` manifest but
/// absent from the freshly written set, then writes the new manifest
/// (§4.8 step 2/4: overwrite, delete stale, preserve everything else).
async fn reconcile_manifest(repo_root: &Path, deployment: &Deployment, new_files: &[String]) -> Result<(), ComputorError> {
    let target_dir = repo_root.join(&deployment.target_path);
    let manifest_path = target_dir.join(MANIFEST_FILE);

    if let Ok(existing) = tokio::fs::read(&manifest_path).await {
        if let Ok(previous) = serde_json::from_slice::<DeploymentManifest>(&existing) {
            let fresh: HashSet<&str> = new_files.iter().map(String::as_str).collect();
            for stale in previous.files.iter().filter(|f| !fresh.contains(f.as_str())) {
                let path = target_dir.join(stale);
                let _ = tokio::fs::remove_file(&path).await;
            }
        }
    }

    let manifest = DeploymentManifest {
        example_id: deployment.example_id,
        example_version_id: deployment.example_version_id,
        deployed_at: Utc::now(),
        files: new_files.to_vec(),
    };
    let body = serde_json::to_vec_pretty(&manifest).map_err(|e| ComputorError::Validation(e.to_string()))?;
    tokio::fs::write(&manifest_path, body).await?;
    Ok(())
}

/// `GenerateAssignments(course_id)`: clones the assignments project,
/// materializes every deployment in the plan, commits once, and pushes
/// (with one pull-rebase retry on a conflicting push). Per-content
/// failures are isolated — a failing direct deployment is recorded
/// `failed` and excluded from the commit message, while the rest of
/// the plan still lands (§4.8 "Failure semantics").
pub async fn generate_assignments(
    db: &DatabaseConnection,
    git: &dyn GitHostGateway,
    storage: &ContentStoreGateway<impl ObjectStoreBackend>,
    worktree_root: &Path,
    course_id: Uuid,
    workflow_id: &str,
    cancel: CancelToken,
) -> Result<Vec<DeploymentOutcome>, ComputorError> {
    let plan: DeploymentPlan = plan_course_deployment(db, course_id).await?;
    let (_course, properties) = load_course_gitlab_properties(db, course_id).await?;
    let remote_url = git.authenticated_remote_url(&properties.assignments_project.full_path);

    let transport = GitTransport::new(worktree_root);
    let xfer_ctx = transfer_ctx(cancel.clone());
    let repo_path = run_activity("generate_assignments.clone", &xfer_ctx, &RetryPolicy::repository_transfer(), || {
        transport.clone_repository(&remote_url, BRANCH, &format!("assignments-{course_id}"))
    })
    .await?;

    let record_ctx = db_ctx(cancel.clone());
    mark_deploying(db, &record_ctx, &plan_course_content_ids(&plan), workflow_id).await?;

    let prov_ctx = provider_ctx(cancel.clone());
    let mut outcomes = Vec::with_capacity(plan.deployments.len());
    let mut committed = Vec::new();

    for deployment in plan.deployments {
        let result = deploy_one(db, storage, &repo_path, &deployment, &prov_ctx).await;
        if result.is_ok() {
            committed.push(format!("{}@{}", deployment.example_id, deployment.version_tag));
        }
        outcomes.push(DeploymentOutcome { deployment, result });
    }

    let message = format!("deploy: {}", committed.join(", "));
    run_activity("generate_assignments.commit", &xfer_ctx, &RetryPolicy::repository_transfer(), || {
        transport.commit_all(&repo_path, &message, COMMIT_AUTHOR)
    })
    .await?;
    let commit_sha = run_activity("generate_assignments.push", &xfer_ctx, &RetryPolicy::repository_transfer(), || {
        transport.push_with_rebase_retry(&repo_path, &remote_url, BRANCH)
    })
    .await?;

    for outcome in &outcomes {
        record_deployment_result(db, &record_ctx, outcome, workflow_id, &commit_sha).await?;
    }

    Ok(outcomes)
}

fn plan_course_content_ids(plan: &DeploymentPlan) -> Vec<Uuid> {
    plan.deployments.iter().filter_map(|d| d.course_content_id).collect()
}

/// Marks every directly-deployed content's `CourseContentDeployment` as
/// `deploying` before the clone/materialize/commit/push sequence runs,
/// so the status machine's `assigned -> deploying -> deployed|failed`
/// path (§8) is observable mid-run rather than jumping straight from
/// `assigned` to a terminal state.
async fn mark_deploying(
    db: &DatabaseConnection,
    ctx: &ActivityContext,
    course_content_ids: &[Uuid],
    workflow_id: &str,
) -> Result<(), ComputorError> {
    for &course_content_id in course_content_ids {
        run_activity("generate_assignments.mark_deploying", ctx, &RetryPolicy::fast_db(), || async {
            let Some(existing) = course_content_deployment::Entity::find()
                .filter(course_content_deployment::Column::CourseContentId.eq(course_content_id))
                .one(db)
                .await
                .map_err(|e| ComputorError::ProviderTransient(e.to_string()))?
            else {
                return Ok(());
            };
            if !existing.status.can_transition_to(DeploymentStatus::Deploying) {
                return Ok(());
            }
            let mut active: course_content_deployment::ActiveModel = existing.into();
            active.status = Set(DeploymentStatus::Deploying);
            active.workflow_id = Set(Some(workflow_id.to_string()));
            active
                .update(db)
                .await
                .map_err(|e| ComputorError::ProviderTransient(e.to_string()))?;
            Ok(())
        })
        .await?;
    }
    Ok(())
}

async fn deploy_one<B: ObjectStoreBackend>(
    db: &DatabaseConnection,
    storage: &ContentStoreGateway<B>,
    repo_path: &Path,
    deployment: &Deployment,
    ctx: &ActivityContext,
) -> Result<(), ComputorError> {
    let example_row = example::Entity::find_by_id(deployment.example_id)
        .one(db)
        .await
        .map_err(|e| ComputorError::ProviderTransient(e.to_string()))?
        .ok_or_else(|| ComputorError::NotFound(format!("example {}", deployment.example_id)))?;

    let written = run_activity(
        "generate_assignments.materialize",
        ctx,
        &RetryPolicy::provider_call(),
        || materialize_deployment(storage, repo_path, deployment, example_row.repository_id),
    )
    .await?;

    write_course_meta(storage, repo_path, deployment, example_row.repository_id, &example_row.identifier.to_string()).await?;
    reconcile_manifest(repo_path, deployment, &written).await?;
    Ok(())
}

async fn record_deployment_result(
    db: &DatabaseConnection,
    ctx: &ActivityContext,
    outcome: &DeploymentOutcome,
    workflow_id: &str,
    commit_sha: &str,
) -> Result<(), ComputorError> {
    let Some(course_content_id) = outcome.deployment.course_content_id else {
        return Ok(());
    };

    run_activity("generate_assignments.record_status", ctx, &RetryPolicy::fast_db(), || async {
        let existing = course_content_deployment::Entity::find()
            .filter(course_content_deployment::Column::CourseContentId.eq(course_content_id))
            .one(db)
            .await
            .map_err(|e| ComputorError::ProviderTransient(e.to_string()))?
            .ok_or_else(|| ComputorError::NotFound(format!("course_content_deployment for {course_content_id}")))?;

        let (status, action, details) = match &outcome.result {
            Ok(()) => (
                DeploymentStatus::Deployed,
                HistoryAction::Deployed,
                Some(json!({"commit_sha": commit_sha})),
            ),
            Err(e) => (
                DeploymentStatus::Failed,
                HistoryAction::Failed,
                Some(json!({"error": e.to_string()})),
            ),
        };
        if !existing.status.can_transition_to(status) {
            tracing::warn!(course_content_id = %course_content_id, from = ?existing.status, to = ?status, "unexpected deployment transition, applying anyway");
        }
        let deployment_id = existing.id;

        let mut active: course_content_deployment::ActiveModel = existing.into();
        active.status = Set(status);
        active.example_version_id = Set(Some(outcome.deployment.example_version_id));
        active.deployed_path = Set(Some(outcome.deployment.target_path.clone()));
        active.workflow_id = Set(Some(workflow_id.to_string()));
        if status == DeploymentStatus::Deployed {
            active.deployed_at = Set(Some(Utc::now()));
        }
        active
            .update(db)
            .await
            .map_err(|e| ComputorError::ProviderTransient(e.to_string()))?;

        let history = deployment_history::ActiveModel {
            id: Set(Uuid::new_v4()),
            deployment_id: Set(deployment_id),
            action: Set(action),
            example_version_id: Set(Some(outcome.deployment.example_version_id)),
            workflow_id: Set(Some(workflow_id.to_string())),
            actor: Set(None),
            created_at: Set(Utc::now()),
            details: Set(details),
        };
        history
            .insert(db)
            .await
            .map_err(|e| ComputorError::ProviderTransient(e.to_string()))?;
        Ok(())
    })
    .await
}
