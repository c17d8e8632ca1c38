//! Version Resolver (VR): resolves a `(slug, constraint)` pair to a
//! specific [`entities::example_version::Model`] using the database's
//! `version_number` ordering, per §4.3.

use computor_core::error::ComputorError;
use computor_path::LabelPath;
use sea_orm::{ColumnTrait, EntityTrait, QueryFilter};

use crate::constraint::{Constraint, VersionRow, resolve as resolve_constraint};
use crate::entities::{example, example_version};

/// `resolve(slug, constraint)` is a pure function of catalog state:
/// repeated calls against an unchanged database return the same row
/// (§8 "Resolver determinism").
pub async fn resolve_version(
    db: &sea_orm::DatabaseConnection,
    slug: &str,
    constraint_raw: Option<&str>,
) -> Result<example_version::Model, ComputorError> {
    let identifier = LabelPath::parse(slug)
        .map_err(|e| ComputorError::Validation(format!("invalid slug `{slug}`: {e}")))?;

    let example = example::Entity::find()
        .filter(example::Column::Identifier.eq(identifier.to_string()))
        .one(db)
        .await
        .map_err(|e| ComputorError::ProviderTransient(e.to_string()))?
        .ok_or_else(|| ComputorError::UnknownSlug(slug.to_string()))?;

    let versions = example_version::Entity::find()
        .filter(example_version::Column::ExampleId.eq(example.id))
        .all(db)
        .await
        .map_err(|e| ComputorError::ProviderTransient(e.to_string()))?;

    let rows: Vec<VersionRow> = versions
        .iter()
        .map(|v| VersionRow {
            tag: v.version_tag.as_str(),
            number: v.version_number,
        })
        .collect();

    let constraint = Constraint::parse(constraint_raw);
    let resolved = resolve_constraint(slug, &rows, &constraint)?;

    versions
        .into_iter()
        .find(|v| v.version_tag == resolved.tag)
        .ok_or_else(|| ComputorError::UnknownTag(format!("{slug}@{}", resolved.tag)))
}
