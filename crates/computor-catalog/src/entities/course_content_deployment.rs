use sea_orm::entity::prelude::*;

/// `pending → assigned → deploying → deployed|failed`, with the
/// out-of-band states `outdated`, `orphaned`, `unassigned` driven by
/// catalog mutations and the explicit unbind path (see SPEC_FULL.md §D.3).
#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumIter, DeriveActiveEnum, serde::Serialize, serde::Deserialize)]
#[sea_orm(rust_type = "String", db_type = "Text")]
#[serde(rename_all = "snake_case")]
pub enum DeploymentStatus {
    #[sea_orm(string_value = "pending")]
    Pending,
    #[sea_orm(string_value = "assigned")]
    Assigned,
    #[sea_orm(string_value = "deploying")]
    Deploying,
    #[sea_orm(string_value = "deployed")]
    Deployed,
    #[sea_orm(string_value = "failed")]
    Failed,
    #[sea_orm(string_value = "orphaned")]
    Orphaned,
    #[sea_orm(string_value = "outdated")]
    Outdated,
    #[sea_orm(string_value = "unassigned")]
    Unassigned,
}

impl DeploymentStatus {
    /// Transitions an activity is allowed to drive directly (AD/TG).
    /// `outdated`/`orphaned`/`unassigned` are reached only via the
    /// paths documented in SPEC_FULL.md §D.3, never from here.
    pub fn can_transition_to(self, next: DeploymentStatus) -> bool {
        use DeploymentStatus::*;
        matches!(
            (self, next),
            (Pending, Assigned)
                | (Assigned, Deploying)
                | (Deploying, Deployed)
                | (Deploying, Failed)
                | (Failed, Deploying)
                | (Deployed, Deploying)
        )
    }
}

/// 1:1 with a submittable `CourseContent`. A DB-level rule (enforced
/// here at the application layer, mirrored by a check constraint in
/// the migration) rejects rows whose `course_content.submittable` is
/// false.
#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "course_content_deployment")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    #[sea_orm(unique)]
    pub course_content_id: Uuid,
    pub example_version_id: Option<Uuid>,
    pub status: DeploymentStatus,
    pub deployed_at: Option<DateTimeUtc>,
    pub deployed_path: Option<String>,
    pub workflow_id: Option<String>,
    #[sea_orm(column_type = "Json", nullable)]
    pub last_deployment_metadata: Option<Json>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::course_content::Entity",
        from = "Column::CourseContentId",
        to = "super::course_content::Column::Id"
    )]
    CourseContent,
    #[sea_orm(has_many = "super::deployment_history::Entity")]
    History,
}

impl Related<super::course_content::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::CourseContent.def()
    }
}

impl Related<super::deployment_history::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::History.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
