use computor_path::LabelPath;
use sea_orm::entity::prelude::*;

/// Invariant: unique `path` within its `course_family_id`. Holds the
/// cached provider ids for the three per-course projects and the two
/// members subgroups (stored in `gitlab_properties`, keys
/// `assignments_project`, `student_template_project`,
/// `reference_project`, `students_group`, `tutors_group`).
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, serde::Serialize)]
#[sea_orm(table_name = "course")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub course_family_id: Uuid,
    #[sea_orm(column_type = "Custom(\"ltree\".to_string())")]
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
    #[sea_orm(
        belongs_to = "super::course_family::Entity",
        from = "Column::CourseFamilyId",
        to = "super::course_family::Column::Id"
    )]
    CourseFamily,
    #[sea_orm(has_many = "super::course_content::Entity")]
    CourseContent,
}

impl Related<super::course_family::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::CourseFamily.def()
    }
}

impl Related<super::course_content::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::CourseContent.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
