use sea_orm::entity::prelude::*;

/// Invariant: `example_id != depends_id`; no cycles in the transitive
/// closure (enforced at write time by [`crate::dependency`] and
/// re-checked at plan time by the Deployment Planner).
#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "example_dependency")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub example_id: Uuid,
    pub depends_id: Uuid,
    /// `None` means "latest" (the constraint grammar's unconstrained case).
    pub version_constraint: Option<String>,
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
