//! SeaORM Entity for AI valuation reports (one current report per project)

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "valuation_reports")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    #[sea_orm(unique)]
    pub project_id: Uuid,
    #[sea_orm(column_type = "Decimal(Some((16, 2)))")]
    pub estimated_value_usd: Decimal,
    pub model_version: String,
    /// Markdown narrative produced by the model
    #[sea_orm(column_type = "Text")]
    pub report: String,
    pub created_at: DateTimeWithTimeZone,
    pub updated_at: DateTimeWithTimeZone,
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
