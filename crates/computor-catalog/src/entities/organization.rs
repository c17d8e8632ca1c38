use computor_path::LabelPath;
use sea_orm::entity::prelude::*;

/// Root of the hierarchy. `path` is always a single label.
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, serde::Serialize)]
#[sea_orm(table_name = "organization")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    #[sea_orm(unique, column_type = "Custom(\"ltree\".to_string())")]
    pub path: LabelPath,
    pub name: String,
    pub description: Option<String>,
    #[sea_orm(column_type = "Json", nullable)]
    pub gitlab_properties: Option<Json>,
    pub archived_at: Option<DateTimeUtc>,
    pub created_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::course_family::Entity")]
    CourseFamily,
}

impl Related<super::course_family::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::CourseFamily.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
