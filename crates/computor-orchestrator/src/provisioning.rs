//! Hierarchy Provisioner (HP, §4.6): `CreateOrganization`,
//! `CreateCourseFamily`, `CreateCourse`, and the `DeployHierarchy`
//! workflow that drives the three in dependency order.

use std::path::Path;
use std::sync::Arc;

use chrono::Utc;
use computor_catalog::entities::{course, course_family, organization};
use computor_core::error::ComputorError;
use computor_core::retry::RetryPolicy;
use computor_git::{AccessLevel, GitHostGateway, GitTransport, GitlabProperties, GroupSpecBuilder, MemberPrincipal, ProjectSpecBuilder};
use computor_path::LabelPath;
use computor_workflow::activity::{run_activity, ActivityContext, CancelToken};
use sea_orm::{ActiveModelTrait, ActiveValue::Set, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter};
use serde::{Deserialize, Serialize};
use serde_json::json;
use uuid::Uuid;

const ASSIGNMENTS_BRANCH: &str = "main";

use crate::config::{CourseConfig, CourseFamilyConfig, DeployHierarchyConfig, OrganizationConfig};

/// `Planned → DbCreated → ProviderCreated → MembersSeeded → Ready`,
/// terminal `Failed(reason)` (§4.6).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum ProvisionState {
    Planned,
    DbCreated,
    ProviderCreated,
    MembersSeeded,
    Ready,
    Failed { reason: String },
}

impl ProvisionState {
    pub fn can_transition_to(&self, next: &ProvisionState) -> bool {
        use ProvisionState::*;
        if matches!(next, Failed { .. }) {
            return true;
        }
        matches!(
            (self, next),
            (Planned, DbCreated) | (DbCreated, ProviderCreated) | (ProviderCreated, MembersSeeded) | (MembersSeeded, Ready)
        )
    }
}

/// The five provider resources cached on a `Course` (doc comment on
/// `course::Model::gitlab_properties`).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CourseGitlabProperties {
    pub course_group: GitlabProperties,
    pub assignments_project: GitlabProperties,
    pub student_template_project: GitlabProperties,
    pub reference_project: GitlabProperties,
    pub students_group: GitlabProperties,
    pub tutors_group: GitlabProperties,
}

fn db_activity_ctx(cancel: CancelToken) -> ActivityContext {
    ActivityContext::new(
        computor_core::config::ActivityTimeouts::FAST_DB,
        computor_core::config::ActivityTimeouts::HEARTBEAT_INTERVAL,
        cancel,
    )
}

fn provider_activity_ctx(cancel: CancelToken) -> ActivityContext {
    ActivityContext::new(
        computor_core::config::ActivityTimeouts::PROVIDER_CALL,
        computor_core::config::ActivityTimeouts::HEARTBEAT_INTERVAL,
        cancel,
    )
}

/// `CreateOrganization(cfg)`: validates `cfg.path`, upserts the DB
/// row, ensures the provider group exists, writes back
/// `gitlab_properties`. DB failure is retried; a 4xx from the
/// provider is non-retryable except rate-limiting, which
/// [`ComputorError::ProviderTransient`] already models as retryable.
pub async fn create_organization(
    db: &DatabaseConnection,
    git: &dyn GitHostGateway,
    cfg: &OrganizationConfig,
    cancel: CancelToken,
) -> Result<organization::Model, ComputorError> {
    let path = LabelPath::single(&cfg.path).map_err(|e| ComputorError::Validation(e.to_string()))?;

    let db_ctx = db_activity_ctx(cancel.clone());
    let row = run_activity("create_organization.upsert_row", &db_ctx, &RetryPolicy::fast_db(), || async {
        if let Some(existing) = organization::Entity::find()
            .filter(organization::Column::Path.eq(path.clone()))
            .one(db)
            .await
            .map_err(|e| ComputorError::ProviderTransient(e.to_string()))?
        {
            return Ok(existing);
        }
        let model = organization::ActiveModel {
            id: Set(Uuid::new_v4()),
            path: Set(path.clone()),
            name: Set(cfg.name.clone()),
            description: Set(cfg.description.clone()),
            gitlab_properties: Set(None),
            archived_at: Set(None),
            created_at: Set(Utc::now()),
        };
        model.insert(db).await.map_err(|e| ComputorError::ProviderTransient(e.to_string()))
    })
    .await?;

    // Organizations are always top-level groups (§4.1): no parent_full_path.
    let provider_ctx = provider_activity_ctx(cancel.clone());
    let group_spec = GroupSpecBuilder::default()
        .name(cfg.name.clone())
        .path(cfg.path.clone())
        .parent_group_id(cfg.gitlab.parent)
        .build()
        .expect("all required builder fields set");
    let cached: Option<GitlabProperties> = row
        .gitlab_properties
        .clone()
        .and_then(|v| serde_json::from_value(v).ok());
    let properties = run_activity("create_organization.ensure_group", &provider_ctx, &RetryPolicy::provider_call(), || async {
        git.find_or_create_group(&group_spec, cached.as_ref()).await
    })
    .await?;

    let mut active: organization::ActiveModel = row.into();
    active.gitlab_properties = Set(Some(json!(properties)));
    active
        .update(db)
        .await
        .map_err(|e| ComputorError::ProviderTransient(e.to_string()))
}

/// `CreateCourseFamily(cfg, org_id)`: requires the organization to
/// already carry a provider `group_id`.
pub async fn create_course_family(
    db: &DatabaseConnection,
    git: &dyn GitHostGateway,
    organization_id: Uuid,
    cfg: &CourseFamilyConfig,
    cancel: CancelToken,
) -> Result<course_family::Model, ComputorError> {
    let path = LabelPath::single(&cfg.path).map_err(|e| ComputorError::Validation(e.to_string()))?;

    let org = organization::Entity::find_by_id(organization_id)
        .one(db)
        .await
        .map_err(|e| ComputorError::ProviderTransient(e.to_string()))?
        .ok_or_else(|| ComputorError::NotFound(format!("organization {organization_id}")))?;
    let org_properties: GitlabProperties = org
        .gitlab_properties
        .and_then(|v| serde_json::from_value(v).ok())
        .ok_or_else(|| ComputorError::Validation("organization has no provider group yet".into()))?;
    let parent_group_id = org_properties
        .group_id
        .ok_or_else(|| ComputorError::Validation("organization.gitlab_properties.group_id missing".into()))?;
    let parent_full_path = org_properties.full_path.clone();

    let db_ctx = db_activity_ctx(cancel.clone());
    let row = run_activity("create_course_family.upsert_row", &db_ctx, &RetryPolicy::fast_db(), || async {
        if let Some(existing) = course_family::Entity::find()
            .filter(course_family::Column::OrganizationId.eq(organization_id))
            .filter(course_family::Column::Path.eq(path.clone()))
            .one(db)
            .await
            .map_err(|e| ComputorError::ProviderTransient(e.to_string()))?
        {
            return Ok(existing);
        }
        let model = course_family::ActiveModel {
            id: Set(Uuid::new_v4()),
            organization_id: Set(organization_id),
            path: Set(path.clone()),
            name: Set(cfg.name.clone()),
            description: Set(cfg.description.clone()),
            gitlab_properties: Set(None),
            archived_at: Set(None),
            created_at: Set(Utc::now()),
        };
        model.insert(db).await.map_err(|e| ComputorError::ProviderTransient(e.to_string()))
    })
    .await?;

    let provider_ctx = provider_activity_ctx(cancel);
    let group_spec = GroupSpecBuilder::default()
        .name(cfg.name.clone())
        .path(cfg.path.clone())
        .parent_group_id(Some(parent_group_id))
        .parent_full_path(Some(parent_full_path))
        .build()
        .expect("all required builder fields set");
    let cached: Option<GitlabProperties> = row
        .gitlab_properties
        .clone()
        .and_then(|v| serde_json::from_value(v).ok());
    let properties = run_activity("create_course_family.ensure_group", &provider_ctx, &RetryPolicy::provider_call(), || async {
        git.find_or_create_group(&group_spec, cached.as_ref()).await
    })
    .await?;

    let mut active: course_family::ActiveModel = row.into();
    active.gitlab_properties = Set(Some(json!(properties)));
    active
        .update(db)
        .await
        .map_err(|e| ComputorError::ProviderTransient(e.to_string()))
}

const STUDENTS_ACCESS: AccessLevel = AccessLevel::Reporter;
const TUTORS_ACCESS: AccessLevel = AccessLevel::Developer;

/// `CreateCourse(cfg, family_id)`: creates the course subgroup, the
/// three per-course projects, and the `students`/`tutors` subgroups
/// with their predefined access levels (§4.6).
pub async fn create_course(
    db: &DatabaseConnection,
    git: &dyn GitHostGateway,
    worktree_root: &Path,
    course_family_id: Uuid,
    cfg: &CourseConfig,
    cancel: CancelToken,
) -> Result<course::Model, ComputorError> {
    let path = LabelPath::single(&cfg.path).map_err(|e| ComputorError::Validation(e.to_string()))?;

    let family = course_family::Entity::find_by_id(course_family_id)
        .one(db)
        .await
        .map_err(|e| ComputorError::ProviderTransient(e.to_string()))?
        .ok_or_else(|| ComputorError::NotFound(format!("course_family {course_family_id}")))?;
    let family_properties: GitlabProperties = family
        .gitlab_properties
        .and_then(|v| serde_json::from_value(v).ok())
        .ok_or_else(|| ComputorError::Validation("course family has no provider group yet".into()))?;
    let family_group_id = family_properties
        .group_id
        .ok_or_else(|| ComputorError::Validation("course_family.gitlab_properties.group_id missing".into()))?;
    let family_full_path = family_properties.full_path.clone();

    let db_ctx = db_activity_ctx(cancel.clone());
    let row = run_activity("create_course.upsert_row", &db_ctx, &RetryPolicy::fast_db(), || async {
        if let Some(existing) = course::Entity::find()
            .filter(course::Column::CourseFamilyId.eq(course_family_id))
            .filter(course::Column::Path.eq(path.clone()))
            .one(db)
            .await
            .map_err(|e| ComputorError::ProviderTransient(e.to_string()))?
        {
            return Ok(existing);
        }
        let model = course::ActiveModel {
            id: Set(Uuid::new_v4()),
            course_family_id: Set(course_family_id),
            path: Set(path.clone()),
            name: Set(cfg.name.clone()),
            description: Set(cfg.description.clone()),
            gitlab_properties: Set(None),
            archived_at: Set(None),
            created_at: Set(Utc::now()),
        };
        model.insert(db).await.map_err(|e| ComputorError::ProviderTransient(e.to_string()))
    })
    .await?;

    let cached: Option<CourseGitlabProperties> = row
        .gitlab_properties
        .clone()
        .and_then(|v| serde_json::from_value(v).ok());

    let provider_ctx = provider_activity_ctx(cancel.clone());
    let course_group = run_activity("create_course.ensure_group", &provider_ctx, &RetryPolicy::provider_call(), || async {
        let spec = GroupSpecBuilder::default()
            .name(cfg.name.clone())
            .path(cfg.path.clone())
            .parent_group_id(Some(family_group_id))
            .parent_full_path(Some(family_full_path.clone()))
            .build()
            .expect("all required builder fields set");
        git.find_or_create_group(&spec, cached.as_ref().map(|c| &c.course_group)).await
    })
    .await?;
    let course_group_id = course_group
        .group_id
        .ok_or_else(|| ComputorError::Integrity("created group carries no group_id".into()))?;

    let ensure_project = |project_path: &'static str, project_name: String| {
        let cached_project = cached.as_ref().map(|c| match project_path {
            "assignments" => c.assignments_project.clone(),
            "student-template" => c.student_template_project.clone(),
            "reference" => c.reference_project.clone(),
            other => unreachable!("unknown project path {other}"),
        });
        async move {
            let spec = ProjectSpecBuilder::default()
                .name(project_name)
                .path(project_path)
                .namespace_id(course_group_id)
                .initialize(true)
                .build()
                .expect("all required builder fields set");
            git.find_or_create_project(&spec, cached_project.as_ref()).await
        }
    };

    let assignments_project = run_activity("create_course.ensure_assignments_project", &provider_ctx, &RetryPolicy::provider_call(), || {
        ensure_project("assignments", format!("{} Assignments", cfg.name))
    })
    .await?;
    let student_template_project = run_activity("create_course.ensure_student_template_project", &provider_ctx, &RetryPolicy::provider_call(), || {
        ensure_project("student-template", format!("{} Student Template", cfg.name))
    })
    .await?;
    let reference_project = run_activity("create_course.ensure_reference_project", &provider_ctx, &RetryPolicy::provider_call(), || {
        ensure_project("reference", format!("{} Reference", cfg.name))
    })
    .await?;

    let ensure_subgroup = |subgroup_path: &'static str, subgroup_name: String| {
        let cached_subgroup = cached.as_ref().map(|c| match subgroup_path {
            "students" => c.students_group.clone(),
            "tutors" => c.tutors_group.clone(),
            other => unreachable!("unknown subgroup path {other}"),
        });
        let course_group_full_path = course_group.full_path.clone();
        async move {
            let spec = GroupSpecBuilder::default()
                .name(subgroup_name)
                .path(subgroup_path)
                .parent_group_id(Some(course_group_id))
                .parent_full_path(Some(course_group_full_path))
                .build()
                .expect("all required builder fields set");
            git.find_or_create_group(&spec, cached_subgroup.as_ref()).await
        }
    };

    let students_group = run_activity("create_course.ensure_students_group", &provider_ctx, &RetryPolicy::provider_call(), || {
        ensure_subgroup("students", format!("{} Students", cfg.name))
    })
    .await?;
    let tutors_group = run_activity("create_course.ensure_tutors_group", &provider_ctx, &RetryPolicy::provider_call(), || {
        ensure_subgroup("tutors", format!("{} Tutors", cfg.name))
    })
    .await?;

    run_activity("create_course.seed_member_access", &provider_ctx, &RetryPolicy::provider_call(), || async {
        git.set_member_access(
            &assignments_project,
            MemberPrincipal::Group(students_group.group_id.unwrap_or_default()),
            STUDENTS_ACCESS,
        )
        .await?;
        git.set_member_access(
            &assignments_project,
            MemberPrincipal::Group(tutors_group.group_id.unwrap_or_default()),
            TUTORS_ACCESS,
        )
        .await
    })
    .await?;

    if let Some(source) = cfg.settings.source.as_ref().filter(|s| s.url.is_some()) {
        let seed_url = source.url.clone().expect("filtered on url.is_some()");
        let authenticated_seed_url = authenticated_seed_url(&seed_url, source.token.as_deref());
        let assignments_remote = git.authenticated_remote_url(&assignments_project.full_path);
        let transport = GitTransport::new(worktree_root);
        run_activity("create_course.seed_assignments", &provider_ctx, &RetryPolicy::repository_transfer(), || async {
            let repo_path = transport
                .clone_repository(&authenticated_seed_url, ASSIGNMENTS_BRANCH, &format!("seed-{course_group_id}"))
                .await?;
            transport.force_push(&repo_path, &assignments_remote, ASSIGNMENTS_BRANCH).await
        })
        .await?;
        tracing::info!(course = %cfg.path, seed_url, "seeded assignments project from configured source");
    }

    let properties = CourseGitlabProperties {
        course_group,
        assignments_project,
        student_template_project,
        reference_project,
        students_group,
        tutors_group,
    };

    let mut active: course::ActiveModel = row.into();
    active.gitlab_properties = Set(Some(json!(properties)));
    active
        .update(db)
        .await
        .map_err(|e| ComputorError::ProviderTransient(e.to_string()))
}

/// Embeds `token` as an `oauth2` basic-auth credential in `url`, the
/// same shape `GitHostGateway::authenticated_remote_url` uses, so a
/// seed source on a different host than the provider still works.
fn authenticated_seed_url(url: &str, token: Option<&str>) -> String {
    match token {
        Some(token) if url.starts_with("https://") => format!("https://oauth2:{token}@{}", &url["https://".len()..]),
        _ => url.to_string(),
    }
}

/// `DeployHierarchy(cfg)`: invokes the three workflows above in
/// dependency order under one workflow id.
pub async fn deploy_hierarchy(
    db: &DatabaseConnection,
    git: Arc<dyn GitHostGateway>,
    worktree_root: &Path,
    cfg: &DeployHierarchyConfig,
    cancel: CancelToken,
) -> Result<course::Model, ComputorError> {
    let organization = create_organization(db, git.as_ref(), &cfg.organization, cancel.clone()).await?;
    let course_family = create_course_family(db, git.as_ref(), organization.id, &cfg.course_family, cancel.clone()).await?;
    create_course(db, git.as_ref(), worktree_root, course_family.id, &cfg.course, cancel).await
}
