use computor_path::LabelPath;
use sea_orm::entity::prelude::*;

/// Invariant: `(repository_id, identifier)` unique. `identifier` is a
/// multi-label path (e.g. `physics.math.vectors`); `directory` is the
/// filesystem-safe name the example was ingested under.
#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "example")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub repository_id: Uuid,
    pub directory: String,
    #[sea_orm(column_type = "Custom(\"ltree\".to_string())")]
    pub identifier: LabelPath,
    pub title: String,
    pub description: Option<String>,
    pub subject: Option<String>,
    #[sea_orm(column_type = "Json")]
    pub tags: Json,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::example_repository::Entity",
        from = "Column::RepositoryId",
        to = "super::example_repository::Column::Id"
    )]
    Repository,
    #[sea_orm(has_many = "super::example_version::Entity")]
    Version,
    #[sea_orm(has_many = "super::example_dependency::Entity")]
    Dependency,
}

impl Related<super::example_repository::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Repository.def()
    }
}

impl Related<super::example_version::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Version.def()
    }
}

impl Related<super::example_dependency::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Dependency.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
