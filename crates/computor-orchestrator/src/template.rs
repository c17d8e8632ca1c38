//! Template Generator (TG, §4.9): workflow `GenerateStudentTemplate`.
//! Re-derives a student-safe tree from each submittable CourseContent's
//! pinned `ExampleVersion` — never a copy of the assignments
//! repository — and pushes it to the course's `student-template`
//! project.

use std::collections::HashMap;
use std::path::Path;

use bytes::Bytes;
use computor_catalog::entities::{course_content, course_content_deployment, example, example_version};
use computor_catalog::entities::course_content_deployment::DeploymentStatus;
use computor_catalog::meta::Meta;
use computor_core::config::ActivityTimeouts;
use computor_core::error::ComputorError;
use computor_core::retry::RetryPolicy;
use computor_git::{GitHostGateway, GitTransport};
use computor_storage::{ContentStoreGateway, ObjectStoreBackend};
use computor_workflow::activity::{run_activity, ActivityContext, CancelToken};
use sea_orm::{ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter};
use uuid::Uuid;

use crate::deployer::load_course_gitlab_properties;

const BRANCH: &str = "main";
const COMMIT_AUTHOR: &str = "computor-orchestrator";
const CONTENT_PREFIX: &str = "content/";

fn transfer_ctx(cancel: CancelToken) -> ActivityContext {
    ActivityContext::new(ActivityTimeouts::REPOSITORY_TRANSFER, ActivityTimeouts::HEARTBEAT_INTERVAL, cancel)
}

fn provider_ctx(cancel: CancelToken) -> ActivityContext {
    ActivityContext::new(ActivityTimeouts::PROVIDER_CALL, ActivityTimeouts::HEARTBEAT_INTERVAL, cancel)
}

/// `README[_LANG].md` rename for a `content/` basename, or `None` if
/// the basename isn't an `index[_LANG].md` file (§4.9 step 1).
fn readme_rename(basename: &str) -> Option<String> {
    if basename.starts_with("index") && basename.ends_with(".md") {
        Some(format!("README{}", &basename["index".len()..]))
    } else {
        None
    }
}

async fn fetch_version_objects<B: ObjectStoreBackend>(
    storage: &ContentStoreGateway<B>,
    repository_id: Uuid,
    example_id: Uuid,
    version_tag: &str,
) -> Result<HashMap<String, Bytes>, ComputorError> {
    let prefix = computor_storage::addressing::version_prefix(repository_id, example_id, version_tag);
    let keys = storage.list_objects(storage.default_bucket(), &prefix).await?;
    let mut objects = HashMap::with_capacity(keys.len());
    for key in keys {
        let relative = key.strip_prefix(&format!("{prefix}/")).unwrap_or(&key).to_string();
        let object = storage.get_object(storage.default_bucket(), &key).await?;
        objects.insert(relative, object.bytes);
    }
    Ok(objects)
}

/// Builds one content item's student-facing tree at `target_dir`,
/// overwriting it from scratch so re-runs stay idempotent (§4.9's
/// "identical tree modulo commit metadata").
async fn build_student_tree(target_dir: &Path, meta: &Meta, objects: &HashMap<String, Bytes>) -> Result<(), ComputorError> {
    if tokio::fs::metadata(target_dir).await.is_ok() {
        tokio::fs::remove_dir_all(target_dir).await?;
    }
    tokio::fs::create_dir_all(target_dir).await?;

    // Step 1: content area, unfiltered.
    for (relative, bytes) in objects {
        let Some(sub_path) = relative.strip_prefix(CONTENT_PREFIX) else {
            continue;
        };
        let (dir, basename) = match sub_path.rsplit_once('/') {
            Some((d, b)) => (Some(d), b),
            None => (None, sub_path),
        };
        let target_name = readme_rename(basename).unwrap_or_else(|| basename.to_string());
        let dest = match dir {
            Some(d) => target_dir.join(d).join(&target_name),
            None => target_dir.join(&target_name),
        };
        if let Some(parent) = dest.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        tokio::fs::write(&dest, bytes.as_ref()).await?;
    }

    // Step 2: additional files, basename-only at the target root.
    for entry in &meta.properties.additional_files {
        let Some(bytes) = objects.get(entry) else {
            return Err(ComputorError::Validation(format!("meta.additionalFiles entry `{entry}` not found in version contents")));
        };
        let basename = entry.rsplit('/').next().unwrap_or(entry);
        tokio::fs::write(target_dir.join(basename), bytes.as_ref()).await?;
    }

    // Step 3: student submission files, guaranteed to exist.
    for entry in &meta.properties.student_submission_files {
        let entry_basename = entry.rsplit('/').next().unwrap_or(entry);
        let source = meta
            .properties
            .student_templates
            .iter()
            .filter(|candidate| candidate.rsplit('/').next().unwrap_or(candidate) == entry_basename)
            .max_by_key(|candidate| candidate.contains("studentTemplate"));

        let bytes = source.and_then(|path| objects.get(path));
        let dest = target_dir.join(entry);
        if let Some(parent) = dest.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        match bytes {
            Some(bytes) => tokio::fs::write(&dest, bytes.as_ref()).await?,
            None => tokio::fs::write(&dest, []).await?,
        }
    }

    // Step 4 is implicit: test_files and solution sources are never
    // referenced by the steps above, so they are simply never written.

    // Step 5: student-safe meta.yaml.
    let safe_yaml = meta.student_safe().to_yaml().map_err(|e| ComputorError::Validation(e.to_string()))?;
    tokio::fs::write(target_dir.join("meta.yaml"), safe_yaml).await?;

    Ok(())
}

/// `GenerateStudentTemplate(course_id)`: clones the student-template
/// project, rebuilds every deployed submittable content's tree from
/// its pinned version, commits once, and pushes.
pub async fn generate_student_template<B: ObjectStoreBackend>(
    db: &DatabaseConnection,
    git: &dyn GitHostGateway,
    storage: &ContentStoreGateway<B>,
    worktree_root: &Path,
    course_id: Uuid,
    cancel: CancelToken,
) -> Result<usize, ComputorError> {
    let (_course, properties) = load_course_gitlab_properties(db, course_id).await?;
    let remote_url = git.authenticated_remote_url(&properties.student_template_project.full_path);

    let transport = GitTransport::new(worktree_root);
    let xfer_ctx = transfer_ctx(cancel.clone());
    let repo_path = run_activity("generate_student_template.clone", &xfer_ctx, &RetryPolicy::repository_transfer(), || {
        transport.clone_repository(&remote_url, BRANCH, &format!("student-template-{course_id}"))
    })
    .await?;

    let contents = course_content::Entity::find()
        .filter(course_content::Column::CourseId.eq(course_id))
        .filter(course_content::Column::Submittable.eq(true))
        .all(db)
        .await
        .map_err(|e| ComputorError::ProviderTransient(e.to_string()))?;

    let prov_ctx = provider_ctx(cancel.clone());
    let mut built = 0usize;

    for content in contents {
        let Some(version_id) = content.example_version_id else {
            continue;
        };
        let deployment = course_content_deployment::Entity::find()
            .filter(course_content_deployment::Column::CourseContentId.eq(content.id))
            .one(db)
            .await
            .map_err(|e| ComputorError::ProviderTransient(e.to_string()))?;
        if !matches!(deployment.map(|d| d.status), Some(DeploymentStatus::Deployed)) {
            continue;
        }

        let version = example_version::Entity::find_by_id(version_id)
            .one(db)
            .await
            .map_err(|e| ComputorError::ProviderTransient(e.to_string()))?
            .ok_or_else(|| ComputorError::NotFound(format!("example_version {version_id}")))?;
        let example_row = example::Entity::find_by_id(version.example_id)
            .one(db)
            .await
            .map_err(|e| ComputorError::ProviderTransient(e.to_string()))?
            .ok_or_else(|| ComputorError::NotFound(format!("example {}", version.example_id)))?;

        let meta: Meta = serde_json::from_value(version.meta.clone()).map_err(|e| ComputorError::Validation(e.to_string()))?;
        let target_dir = repo_path.join(content.path.to_filesystem());

        run_activity("generate_student_template.build", &prov_ctx, &RetryPolicy::provider_call(), || async {
            let objects = fetch_version_objects(storage, example_row.repository_id, example_row.id, &version.version_tag).await?;
            build_student_tree(&target_dir, &meta, &objects).await
        })
        .await?;
        built += 1;
    }

    run_activity("generate_student_template.commit", &xfer_ctx, &RetryPolicy::repository_transfer(), || {
        transport.commit_all(&repo_path, &format!("student template: {built} content(s)"), COMMIT_AUTHOR)
    })
    .await?;
    run_activity("generate_student_template.push", &xfer_ctx, &RetryPolicy::repository_transfer(), || {
        transport.push_with_rebase_retry(&repo_path, &remote_url, BRANCH)
    })
    .await?;

    Ok(built)
}
