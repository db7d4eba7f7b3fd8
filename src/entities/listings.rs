//! SeaORM Entity for listings (one sale offer per project)

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "listings")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    #[sea_orm(unique)]
    pub project_id: Uuid,
    /// Escrow sale identifier, cleared when a suspension invalidates it
    pub sale_id: Option<i64>,
    /// Price in USDC (6 decimals, matching the token)
    #[sea_orm(column_type = "Decimal(Some((20, 6)))")]
    pub price_usdc: Decimal,
    pub escrow_address: Option<String>,
    pub listed_at: DateTimeWithTimeZone,
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
    #[sea_orm(has_one = "super::transactions::Entity")]
    Transaction,
}

impl Related<super::nft_projects::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Project.def()
    }
}

impl Related<super::transactions::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Transaction.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
