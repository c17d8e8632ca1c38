use sea_orm::entity::prelude::*;

/// Append-only: rows are never updated or deleted (§8 invariant).
#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumIter, DeriveActiveEnum, serde::Serialize, serde::Deserialize)]
#[sea_orm(rust_type = "String", db_type = "Text")]
#[serde(rename_all = "snake_case")]
pub enum HistoryAction {
    #[sea_orm(string_value = "assigned")]
    Assigned,
    #[sea_orm(string_value = "unassigned")]
    Unassigned,
    #[sea_orm(string_value = "deploy_started")]
    DeployStarted,
    #[sea_orm(string_value = "deployed")]
    Deployed,
    #[sea_orm(string_value = "failed")]
    Failed,
    #[sea_orm(string_value = "outdated")]
    Outdated,
    #[sea_orm(string_value = "orphaned")]
    Orphaned,
}

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "deployment_history")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub deployment_id: Uuid,
    pub action: HistoryAction,
    pub example_version_id: Option<Uuid>,
    pub workflow_id: Option<String>,
    pub actor: Option<String>,
    pub created_at: DateTimeUtc,
    #[sea_orm(column_type = "Json", nullable)]
    pub details: Option<Json>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::course_content_deployment::Entity",
        from = "Column::DeploymentId",
        to = "super::course_content_deployment::Column::Id"
    )]
    Deployment,
}

impl Related<super::course_content_deployment::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Deployment.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
