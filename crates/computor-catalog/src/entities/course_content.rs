use computor_path::LabelPath;
use sea_orm::entity::prelude::*;

#[derive(Debug, Clone, PartialEq, Eq, EnumIter, DeriveActiveEnum, serde::Serialize, serde::Deserialize)]
#[sea_orm(rust_type = "String", db_type = "Text")]
#[serde(rename_all = "snake_case")]
pub enum ContentKind {
    #[sea_orm(string_value = "unit")]
    Unit,
    #[sea_orm(string_value = "assignment")]
    Assignment,
}

/// Forms a tree by `path`. Invariant: parents exist if `nlevel(path) >
/// 1`. Only content with `submittable = true` may carry a
/// [`super::course_content_deployment`] row.
#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "course_content")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub course_id: Uuid,
    #[sea_orm(column_type = "Custom(\"ltree\".to_string())")]
    pub path: LabelPath,
    pub kind: ContentKind,
    pub submittable: bool,
    pub example_id: Option<Uuid>,
    pub example_version_id: Option<Uuid>,
    pub created_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::course::Entity",
        from = "Column::CourseId",
        to = "super::course::Column::Id"
    )]
    Course,
    #[sea_orm(has_one = "super::course_content_deployment::Entity")]
    Deployment,
}

impl Related<super::course::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Course.def()
    }
}

impl Related<super::course_content_deployment::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Deployment.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
