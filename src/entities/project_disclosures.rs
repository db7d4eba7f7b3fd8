use super::sea_orm_active_enums::DisclosureType;
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "project_disclosures")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub project_id: Uuid,
    pub disclosure_type: DisclosureType,
    pub title: String,
    #[sea_orm(column_type = "Text")]
    pub description: String,
    /// Index within the batch the disclosure was submitted in
    pub position: i32,
    pub created_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::nft_projects::Entity",
        from = "Column::ProjectId",
        to = "super::nft_projects::Column::Id",
        on_delete = "Cascade"
    )]
    Project,
}

impl Related<super::nft_projects::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Project.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
