//! Catalog Synchronizer (CS, §4.10): given a multi-file upload grouped
//! by top-level example directory, finds every directory carrying a
//! `meta.yaml`, parses it, creates (or reuses) the `Example` and a new
//! `ExampleVersion`, uploads the files through [`computor_storage`]
//! under the §4.2 addressing convention, and reconciles
//! `testDependencies` into `example_dependency` rows — rejecting the
//! whole batch on a cycle or an unresolved slug within the repository.

use std::collections::BTreeMap;

use bytes::Bytes;
use chrono::Utc;
use computor_core::error::ComputorError;
use computor_path::LabelPath;
use computor_storage::{ContentStoreGateway, ObjectMetadata, ObjectStoreBackend};
use sea_orm::{ActiveModelTrait, ActiveValue::Set, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter};
use sha2::{Digest, Sha256};
use uuid::Uuid;

use crate::dependency::DependencyGraph;
use crate::entities::{example, example_dependency, example_version};
use crate::meta::Meta;

const META_FILE: &str = "meta.yaml";
const CONTENT_HASH_KEY: &str = "_content_hash";

/// One file from the uploaded archive, path relative to the archive
/// root (e.g. `physics/math/vectors/main.py`).
#[derive(Debug, Clone)]
pub struct ArchiveFile {
    pub path: String,
    pub bytes: Bytes,
}

#[derive(Debug, Clone)]
pub struct SyncedExample {
    pub example_id: Uuid,
    pub version_id: Uuid,
    pub version_tag: String,
    /// `false` when a version under this tag already existed with
    /// identical content and nothing was uploaded.
    pub created: bool,
}

fn validate_directory(dir: &str) -> Result<(), ComputorError> {
    if dir.is_empty() {
        return Err(ComputorError::Validation("empty example directory".into()));
    }
    for component in dir.split('/') {
        let safe = !component.is_empty()
            && component != "."
            && component != ".."
            && component
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-');
        if !safe {
            return Err(ComputorError::Validation(format!(
                "directory component `{component}` in `{dir}` is not filesystem-safe"
            )));
        }
    }
    Ok(())
}

/// Identifier derivation per §4.10: metadata's `slug` wins when
/// present; a missing slug falls back to the reverse of
/// [`LabelPath::to_filesystem`] — the directory's path separators
/// rendered back as dots. `Meta::slug` is a required field in the
/// current schema, so the fallback only fires for blank slugs, kept
/// for forward compatibility should the field ever become optional.
fn derive_identifier(meta: &Meta, directory: &str) -> Result<LabelPath, ComputorError> {
    let raw = if meta.slug.trim().is_empty() {
        directory.replace('/', ".")
    } else {
        meta.slug.clone()
    };
    LabelPath::parse(&raw)
        .map_err(|e| ComputorError::Validation(format!("cannot derive identifier from `{raw}`: {e}")))
}

/// SHA-256 over the canonical (path-sorted) file listing: each file's
/// path and bytes, in order. Two uploads with the same files produce
/// the same hash regardless of archive entry order.
fn content_hash(files: &[&ArchiveFile]) -> String {
    let mut sorted: Vec<&&ArchiveFile> = files.iter().collect();
    sorted.sort_by(|a, b| a.path.cmp(&b.path));
    let mut hasher = Sha256::new();
    for file in sorted {
        hasher.update(file.path.as_bytes());
        hasher.update([0u8]);
        hasher.update(&file.bytes);
    }
    hex::encode(hasher.finalize())
}

/// Groups archive files by the top-level directory that directly
/// contains a `meta.yaml`. Files outside any such directory (loose
/// files at the archive root, or nested under a directory with no
/// `meta.yaml` of its own) are not part of any example and are
/// dropped silently — the upload form only recognizes example
/// directories.
fn group_by_example(files: &[ArchiveFile]) -> Vec<(String, Vec<&ArchiveFile>)> {
    let mut groups: BTreeMap<String, Vec<&ArchiveFile>> = BTreeMap::new();
    let example_dirs: Vec<String> = files
        .iter()
        .filter_map(|f| f.path.strip_suffix(&format!("/{META_FILE}")).map(str::to_string))
        .collect();

    for dir in &example_dirs {
        groups.entry(dir.clone()).or_default();
    }
    for file in files {
        let owner = example_dirs
            .iter()
            .filter(|d| file.path.starts_with(&format!("{d}/")))
            .max_by_key(|d| d.len());
        if let Some(dir) = owner {
            groups.get_mut(dir).unwrap().push(file);
        }
    }
    groups.into_iter().collect()
}

/// Synchronizes one uploaded archive against the catalog. Runs the
/// whole batch to completion per directory (creating versions,
/// uploading files) before reconciling dependency edges, so a cycle
/// or unknown slug discovered while normalizing `testDependencies`
/// fails the request without silently leaving half the batch applied
/// — callers that need stricter atomicity should wrap the call in an
/// outer DB transaction.
pub async fn synchronize_archive<B: ObjectStoreBackend>(
    db: &DatabaseConnection,
    storage: &ContentStoreGateway<B>,
    repository_id: Uuid,
    files: Vec<ArchiveFile>,
) -> Result<Vec<SyncedExample>, ComputorError> {
    let groups = group_by_example(&files);
    if groups.is_empty() {
        return Err(ComputorError::Validation(
            "archive contains no directory with a meta.yaml".into(),
        ));
    }

    let mut outcomes = Vec::with_capacity(groups.len());
    let mut new_edges: Vec<(Uuid, Uuid, Option<String>)> = Vec::new();

    for (directory, group_files) in &groups {
        validate_directory(directory)?;

        let meta_path = format!("{directory}/{META_FILE}");
        let meta_file = group_files
            .iter()
            .find(|f| f.path == meta_path)
            .expect("group constructed from a meta.yaml marker");
        let yaml = std::str::from_utf8(&meta_file.bytes)
            .map_err(|e| ComputorError::Validation(format!("{meta_path} is not valid UTF-8: {e}")))?;
        let meta = Meta::parse(yaml).map_err(|e| ComputorError::Validation(e.to_string()))?;

        let identifier = derive_identifier(&meta, directory)?;
        let hash = content_hash(group_files);

        let example_row = match example::Entity::find()
            .filter(example::Column::RepositoryId.eq(repository_id))
            .filter(example::Column::Identifier.eq(identifier.to_string()))
            .one(db)
            .await
            .map_err(|e| ComputorError::ProviderTransient(e.to_string()))?
        {
            Some(row) => row,
            None => {
                let tags = meta.extra.get("tags").cloned().unwrap_or_else(|| serde_json::json!([]));
                let subject = meta
                    .extra
                    .get("subject")
                    .and_then(|v| v.as_str())
                    .map(str::to_string);
                let model = example::ActiveModel {
                    id: Set(Uuid::new_v4()),
                    repository_id: Set(repository_id),
                    directory: Set(directory.clone()),
                    identifier: Set(identifier.clone()),
                    title: Set(meta.title.clone()),
                    description: Set(meta.description.clone()),
                    subject: Set(subject),
                    tags: Set(tags),
                };
                model
                    .insert(db)
                    .await
                    .map_err(|e| ComputorError::ProviderTransient(e.to_string()))?
            }
        };

        let existing_versions = example_version::Entity::find()
            .filter(example_version::Column::ExampleId.eq(example_row.id))
            .all(db)
            .await
            .map_err(|e| ComputorError::ProviderTransient(e.to_string()))?;

        if let Some(same_tag) = existing_versions.iter().find(|v| v.version_tag == meta.version) {
            let stored_hash = same_tag.meta.get(CONTENT_HASH_KEY).and_then(|v| v.as_str());
            if stored_hash == Some(hash.as_str()) {
                outcomes.push(SyncedExample {
                    example_id: example_row.id,
                    version_id: same_tag.id,
                    version_tag: same_tag.version_tag.clone(),
                    created: false,
                });
                continue;
            }
            return Err(ComputorError::Conflict(format!(
                "example `{identifier}` version `{}` already exists with different content",
                meta.version
            )));
        }

        let next_number = existing_versions.iter().map(|v| v.version_number).max().unwrap_or(0) + 1;
        let storage_prefix =
            computor_storage::addressing::version_prefix(repository_id, example_row.id, &meta.version);

        for file in group_files.iter() {
            if file.path == meta_path {
                continue;
            }
            let relative = file.path.strip_prefix(&format!("{directory}/")).unwrap_or(&file.path);
            let key = computor_storage::addressing::file_key(repository_id, example_row.id, &meta.version, relative);
            storage
                .put_object(storage.default_bucket(), &key, file.bytes.clone(), ObjectMetadata::default())
                .await?;
        }
        // meta.yaml itself is stored alongside the other files so the
        // deployment pipeline can fetch it without a DB round trip.
        storage
            .put_object(
                storage.default_bucket(),
                &computor_storage::addressing::file_key(repository_id, example_row.id, &meta.version, META_FILE),
                meta_file.bytes.clone(),
                ObjectMetadata::default(),
            )
            .await?;

        let mut meta_json =
            serde_json::to_value(&meta).map_err(|e| ComputorError::Validation(e.to_string()))?;
        if let serde_json::Value::Object(map) = &mut meta_json {
            map.insert(CONTENT_HASH_KEY.to_string(), serde_json::Value::String(hash.clone()));
        }

        let version_model = example_version::ActiveModel {
            id: Set(Uuid::new_v4()),
            example_id: Set(example_row.id),
            version_tag: Set(meta.version.clone()),
            version_number: Set(next_number),
            storage_path: Set(storage_prefix),
            meta: Set(meta_json),
            created_at: Set(Utc::now()),
        };
        let version_row = version_model
            .insert(db)
            .await
            .map_err(|e| ComputorError::ProviderTransient(e.to_string()))?;

        for dep in &meta.test_dependencies {
            let dep_identifier = LabelPath::parse(dep.slug())
                .map_err(|e| ComputorError::Validation(format!("invalid dependency slug `{}`: {e}", dep.slug())))?;
            let dep_example = example::Entity::find()
                .filter(example::Column::RepositoryId.eq(repository_id))
                .filter(example::Column::Identifier.eq(dep_identifier.to_string()))
                .one(db)
                .await
                .map_err(|e| ComputorError::ProviderTransient(e.to_string()))?
                .ok_or_else(|| ComputorError::UnknownSlug(dep.slug().to_string()))?;

            new_edges.push((example_row.id, dep_example.id, dep.constraint().map(str::to_string)));
        }

        outcomes.push(SyncedExample {
            example_id: example_row.id,
            version_id: version_row.id,
            version_tag: version_row.version_tag.clone(),
            created: true,
        });
    }

    reconcile_dependencies(db, new_edges).await?;

    Ok(outcomes)
}

async fn reconcile_dependencies(
    db: &DatabaseConnection,
    new_edges: Vec<(Uuid, Uuid, Option<String>)>,
) -> Result<(), ComputorError> {
    if new_edges.is_empty() {
        return Ok(());
    }

    let existing = example_dependency::Entity::find()
        .all(db)
        .await
        .map_err(|e| ComputorError::ProviderTransient(e.to_string()))?;
    let mut graph = DependencyGraph::from_edges(existing.iter().map(|d| (d.example_id, d.depends_id)));

    for (from, to, _) in &new_edges {
        if graph.would_cycle(*from, *to) {
            return Err(ComputorError::DependencyCycle(format!(
                "dependency {from} -> {to} would create a cycle"
            )));
        }
        graph.add_edge(*from, *to);
    }

    for (from, to, constraint) in new_edges {
        let already = example_dependency::Entity::find()
            .filter(example_dependency::Column::ExampleId.eq(from))
            .filter(example_dependency::Column::DependsId.eq(to))
            .one(db)
            .await
            .map_err(|e| ComputorError::ProviderTransient(e.to_string()))?;
        if already.is_some() {
            continue;
        }
        let model = example_dependency::ActiveModel {
            id: Set(Uuid::new_v4()),
            example_id: Set(from),
            depends_id: Set(to),
            version_constraint: Set(constraint),
        };
        model
            .insert(db)
            .await
            .map_err(|e| ComputorError::ProviderTransient(e.to_string()))?;
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn file(path: &str, content: &str) -> ArchiveFile {
        ArchiveFile {
            path: path.to_string(),
            bytes: Bytes::from(content.as_bytes().to_vec()),
        }
    }

    #[test]
    fn groups_files_by_meta_yaml_directory() {
        let files = vec![
            file("physics/vectors/meta.yaml", "title: V\nslug: physics.vectors\nversion: v1.0\n"),
            file("physics/vectors/main.py", "print(1)"),
            file("loose.txt", "ignored"),
        ];
        let groups = group_by_example(&files);
        assert_eq!(groups.len(), 1);
        assert_eq!(groups[0].0, "physics/vectors");
        assert_eq!(groups[0].1.len(), 2);
    }

    #[test]
    fn rejects_unsafe_directory_component() {
        assert!(validate_directory("ok_dir").is_ok());
        assert!(validate_directory("../escape").is_err());
        assert!(validate_directory("a/../b").is_err());
    }

    #[test]
    fn identifier_prefers_metadata_slug() {
        let meta = Meta::parse("title: V\nslug: physics.vectors\nversion: v1.0\n").unwrap();
        let id = derive_identifier(&meta, "physics/vectors").unwrap();
        assert_eq!(id.to_string(), "physics.vectors");
    }

    #[test]
    fn identifier_falls_back_to_directory_rendering() {
        let mut meta = Meta::parse("title: V\nslug: physics.vectors\nversion: v1.0\n").unwrap();
        meta.slug = String::new();
        let id = derive_identifier(&meta, "physics/vectors").unwrap();
        assert_eq!(id.to_string(), "physics.vectors");
    }

    #[test]
    fn content_hash_is_order_independent() {
        let a = file("a.py", "1");
        let b = file("b.py", "2");
        let h1 = content_hash(&[&a, &b]);
        let h2 = content_hash(&[&b, &a]);
        assert_eq!(h1, h2);
    }

    #[test]
    fn content_hash_changes_with_content() {
        let a = file("a.py", "1");
        let a2 = file("a.py", "2");
        assert_ne!(content_hash(&[&a]), content_hash(&[&a2]));
    }
}
