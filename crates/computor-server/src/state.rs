//! Process-wide shared state and workflow-handler registration. One
//! `AppState` is built at startup and handed to every route via
//! `State<Arc<AppState>>`.

use std::path::PathBuf;
use std::sync::Arc;

use computor_core::error::ComputorError;
use computor_git::GitHostGateway;
use computor_orchestrator::config::{CourseConfig, CourseFamilyConfig, DeployHierarchyConfig, OrganizationConfig};
use computor_storage::{ContentStoreGateway, S3Backend};
use computor_workflow::activity::CancelToken;
use computor_workflow::executor::DurableExecutor;
use sea_orm::DatabaseConnection;
use serde_json::Value;
use uuid::Uuid;

pub const TASK_QUEUE_CREATE_ORGANIZATION: &str = "create_organization";
pub const TASK_QUEUE_CREATE_COURSE_FAMILY: &str = "create_course_family";
pub const TASK_QUEUE_CREATE_COURSE: &str = "create_course";
pub const TASK_QUEUE_DEPLOY_HIERARCHY: &str = "deploy_hierarchy";
pub const TASK_QUEUE_GENERATE_ASSIGNMENTS: &str = "generate_assignments";
pub const TASK_QUEUE_GENERATE_STUDENT_TEMPLATE: &str = "generate_student_template";

pub struct AppState {
    pub db: DatabaseConnection,
    pub git: Arc<dyn GitHostGateway>,
    pub storage: Arc<ContentStoreGateway<S3Backend>>,
    pub executor: Arc<DurableExecutor>,
    pub worktree_root: PathBuf,
}

/// Registers every HP/AD/TG workflow body with `executor` under a
/// fixed task queue name (§9 "per-process init registers workflow and
/// activity implementations with DWE"). Route handlers only ever call
/// `executor.submit`; the handler bodies below are the single place
/// that threads `AppState`'s capabilities into a workflow body.
pub fn register_workflows(state: &Arc<AppState>) {
    let executor = state.executor.clone();

    {
        let state = state.clone();
        executor.register_handler(
            TASK_QUEUE_CREATE_ORGANIZATION,
            Arc::new(move |input: Value, cancel: CancelToken| {
                let state = state.clone();
                Box::pin(async move {
                    let cfg: OrganizationConfig = serde_json::from_value(input).map_err(|e| ComputorError::Validation(e.to_string()))?;
                    let model = computor_orchestrator::create_organization(&state.db, state.git.as_ref(), &cfg, cancel).await?;
                    serde_json::to_value(model).map_err(|e| ComputorError::Validation(e.to_string()))
                })
            }),
        );
    }

    {
        let state = state.clone();
        executor.register_handler(
            TASK_QUEUE_CREATE_COURSE_FAMILY,
            Arc::new(move |input: Value, cancel: CancelToken| {
                let state = state.clone();
                Box::pin(async move {
                    #[derive(serde::Deserialize)]
                    struct Input {
                        organization_id: Uuid,
                        config: CourseFamilyConfig,
                    }
                    let input: Input = serde_json::from_value(input).map_err(|e| ComputorError::Validation(e.to_string()))?;
                    let model =
                        computor_orchestrator::create_course_family(&state.db, state.git.as_ref(), input.organization_id, &input.config, cancel)
                            .await?;
                    serde_json::to_value(model).map_err(|e| ComputorError::Validation(e.to_string()))
                })
            }),
        );
    }

    {
        let state = state.clone();
        executor.register_handler(
            TASK_QUEUE_CREATE_COURSE,
            Arc::new(move |input: Value, cancel: CancelToken| {
                let state = state.clone();
                Box::pin(async move {
                    #[derive(serde::Deserialize)]
                    struct Input {
                        course_family_id: Uuid,
                        config: CourseConfig,
                    }
                    let input: Input = serde_json::from_value(input).map_err(|e| ComputorError::Validation(e.to_string()))?;
                    let model = computor_orchestrator::create_course(
                        &state.db,
                        state.git.as_ref(),
                        &state.worktree_root,
                        input.course_family_id,
                        &input.config,
                        cancel,
                    )
                    .await?;
                    serde_json::to_value(model).map_err(|e| ComputorError::Validation(e.to_string()))
                })
            }),
        );
    }

    {
        let state = state.clone();
        executor.register_handler(
            TASK_QUEUE_DEPLOY_HIERARCHY,
            Arc::new(move |input: Value, cancel: CancelToken| {
                let state = state.clone();
                Box::pin(async move {
                    let cfg: DeployHierarchyConfig = serde_json::from_value(input).map_err(|e| ComputorError::Validation(e.to_string()))?;
                    let model =
                        computor_orchestrator::deploy_hierarchy(&state.db, state.git.clone(), &state.worktree_root, &cfg, cancel).await?;
                    serde_json::to_value(model).map_err(|e| ComputorError::Validation(e.to_string()))
                })
            }),
        );
    }

    {
        let state = state.clone();
        executor.register_handler(
            TASK_QUEUE_GENERATE_ASSIGNMENTS,
            Arc::new(move |input: Value, cancel: CancelToken| {
                let state = state.clone();
                Box::pin(async move {
                    #[derive(serde::Deserialize)]
                    struct Input {
                        course_id: Uuid,
                        workflow_id: String,
                    }
                    let input: Input = serde_json::from_value(input).map_err(|e| ComputorError::Validation(e.to_string()))?;
                    let outcomes = computor_orchestrator::generate_assignments(
                        &state.db,
                        state.git.as_ref(),
                        state.storage.as_ref(),
                        &state.worktree_root,
                        input.course_id,
                        &input.workflow_id,
                        cancel,
                    )
                    .await?;
                    let failed: Vec<String> = outcomes
                        .iter()
                        .filter_map(|o| o.result.as_ref().err().map(|e| format!("{}: {e}", o.deployment.target_path)))
                        .collect();
                    serde_json::to_value(serde_json::json!({
                        "deployed": outcomes.len() - failed.len(),
                        "failed": failed,
                    }))
                    .map_err(|e| ComputorError::Validation(e.to_string()))
                })
            }),
        );
    }

    {
        let state = state.clone();
        executor.register_handler(
            TASK_QUEUE_GENERATE_STUDENT_TEMPLATE,
            Arc::new(move |input: Value, cancel: CancelToken| {
                let state = state.clone();
                Box::pin(async move {
                    #[derive(serde::Deserialize)]
                    struct Input {
                        course_id: Uuid,
                    }
                    let input: Input = serde_json::from_value(input).map_err(|e| ComputorError::Validation(e.to_string()))?;
                    let built = computor_orchestrator::generate_student_template(
                        &state.db,
                        state.git.as_ref(),
                        state.storage.as_ref(),
                        &state.worktree_root,
                        input.course_id,
                        cancel,
                    )
                    .await?;
                    serde_json::to_value(serde_json::json!({ "built": built })).map_err(|e| ComputorError::Validation(e.to_string()))
                })
            }),
        );
    }
}
