use sea_orm::entity::prelude::*;

/// Invariant: `version_tag` unique per example; `version_number`
/// strictly increasing in creation order (higher ⇒ newer). `meta` is
/// the parsed `meta.yaml` stored verbatim as JSON so the resolver and
/// the deployment pipeline can both query it without reparsing YAML.
#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "example_version")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub example_id: Uuid,
    pub version_tag: String,
    pub version_number: i64,
    pub storage_path: String,
    #[sea_orm(column_type = "Json")]
    pub meta: Json,
    pub created_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::example::Entity",
        from = "Column::ExampleId",
        to = "super::example::Column::Id"
    )]
    Example,
}

impl Related<super::example::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Example.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
