//! Deployment Planner (DP, §4.7): a pure function of catalog and
//! course-content state. Given a course, produces an ordered plan of
//! direct deployments (submittable content bound to an `ExampleVersion`)
//! plus the implicit deployments needed for their transitive
//! dependencies, resolved through VR.

use std::collections::{HashSet, VecDeque};

use computor_catalog::entities::{course_content, example, example_dependency, example_version};
use computor_catalog::{resolve_version, DependencyGraph};
use computor_core::error::ComputorError;
use sea_orm::{ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter};
use serde::Serialize;
use uuid::Uuid;

/// One entry in a [`DeploymentPlan`]. `course_content_id` is `None` for
/// an implicit dependency deployment not bound to any content.
#[derive(Debug, Clone, Serialize)]
pub struct Deployment {
    pub course_content_id: Option<Uuid>,
    pub example_id: Uuid,
    pub example_version_id: Uuid,
    pub version_tag: String,
    pub target_path: String,
    pub implicit: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct DeploymentPlan {
    pub course_id: Uuid,
    pub deployments: Vec<Deployment>,
}

/// `plan(course_id)`: fails fast on unresolved constraints (surfaced by
/// [`resolve_version`] as `NoMatchingVersion`/`UnknownSlug`/`UnknownTag`),
/// cycles (`DependencyCycle`), or a bound content whose
/// `submittable=false` (`Conflict`).
pub async fn plan_course_deployment(
    db: &DatabaseConnection,
    course_id: Uuid,
) -> Result<DeploymentPlan, ComputorError> {
    let contents = course_content::Entity::find()
        .filter(course_content::Column::CourseId.eq(course_id))
        .all(db)
        .await
        .map_err(|e| ComputorError::ProviderTransient(e.to_string()))?;

    let mut deployments = Vec::new();
    let mut graph = DependencyGraph::default();
    let mut queue: VecDeque<Uuid> = VecDeque::new();
    let mut placed: HashSet<Uuid> = HashSet::new();

    for content in &contents {
        let Some(example_version_id) = content.example_version_id else {
            continue;
        };
        if !content.submittable {
            return Err(ComputorError::Conflict(format!(
                "course_content {} is bound to a version but not submittable",
                content.id
            )));
        }
        let example_id = content
            .example_id
            .ok_or_else(|| ComputorError::Integrity(format!("course_content {} has a version but no example", content.id)))?;
        let version = example_version::Entity::find_by_id(example_version_id)
            .one(db)
            .await
            .map_err(|e| ComputorError::ProviderTransient(e.to_string()))?
            .ok_or_else(|| ComputorError::NotFound(format!("example_version {example_version_id}")))?;

        deployments.push(Deployment {
            course_content_id: Some(content.id),
            example_id,
            example_version_id,
            version_tag: version.version_tag.clone(),
            target_path: content.path.to_filesystem(),
            implicit: false,
        });

        if placed.insert(example_id) {
            queue.push_back(example_id);
        }
    }

    while let Some(example_id) = queue.pop_front() {
        let edges = example_dependency::Entity::find()
            .filter(example_dependency::Column::ExampleId.eq(example_id))
            .all(db)
            .await
            .map_err(|e| ComputorError::ProviderTransient(e.to_string()))?;

        for edge in edges {
            graph.add_edge(example_id, edge.depends_id);

            let depends_example = example::Entity::find_by_id(edge.depends_id)
                .one(db)
                .await
                .map_err(|e| ComputorError::ProviderTransient(e.to_string()))?
                .ok_or_else(|| ComputorError::NotFound(format!("example {}", edge.depends_id)))?;

            let version = resolve_version(db, &depends_example.identifier.to_string(), edge.version_constraint.as_deref()).await?;

            if placed.insert(edge.depends_id) {
                deployments.push(Deployment {
                    course_content_id: None,
                    example_id: edge.depends_id,
                    example_version_id: version.id,
                    version_tag: version.version_tag.clone(),
                    target_path: format!("_deps/{}/{}", depends_example.identifier, version.version_tag),
                    implicit: true,
                });
                queue.push_back(edge.depends_id);
            }
        }
    }

    graph.check_acyclic()?;

    Ok(DeploymentPlan { course_id, deployments })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plan_serializes_to_json() {
        let plan = DeploymentPlan {
            course_id: Uuid::nil(),
            deployments: vec![Deployment {
                course_content_id: Some(Uuid::nil()),
                example_id: Uuid::nil(),
                example_version_id: Uuid::nil(),
                version_tag: "v1.0".into(),
                target_path: "week1/vectors".into(),
                implicit: false,
            }],
        };
        let value = serde_json::to_value(&plan).unwrap();
        assert_eq!(value["deployments"][0]["version_tag"], "v1.0");
    }
}
