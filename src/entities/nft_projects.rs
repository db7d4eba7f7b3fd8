//! SeaORM Entity for NFT collection projects
//!
//! Rows are never hard-deleted by the service; removal is the `deleted` status.

use super::sea_orm_active_enums::{ProjectCategory, ProjectStatus};
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "nft_projects")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub name: String,
    pub image: Option<String>,
    /// Collection contract address (0x format, 42 chars)
    pub collection_address: String,
    pub chain_id: String,
    #[sea_orm(column_type = "Text")]
    pub description: String,
    pub category: ProjectCategory,
    /// Creator royalty in percent (0-100)
    #[sea_orm(column_type = "Decimal(Some((5, 2)))", nullable)]
    pub royalty_pct: Option<Decimal>,
    /// Trailing twelve month revenue in USD
    #[sea_orm(column_type = "Decimal(Some((16, 2)))", nullable)]
    pub ltm_revenue_usd: Option<Decimal>,
    /// Content identifier of the off-chain metadata
    pub metadata_cid: Option<String>,
    pub owner_id: Uuid,
    pub status: ProjectStatus,
    pub created_at: DateTimeWithTimeZone,
    pub updated_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::users::Entity",
        from = "Column::OwnerId",
        to = "super::users::Column::Id"
    )]
    Owner,
    #[sea_orm(has_one = "super::listings::Entity")]
    Listing,
    #[sea_orm(has_one = "super::valuation_reports::Entity")]
    ValuationReport,
    #[sea_orm(has_many = "super::project_disclosures::Entity")]
    Disclosures,
    #[sea_orm(has_many = "super::notifications::Entity")]
    Notifications,
}

impl Related<super::users::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Owner.def()
    }
}

impl Related<super::listings::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Listing.def()
    }
}

impl Related<super::valuation_reports::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::ValuationReport.def()
    }
}

impl Related<super::project_disclosures::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Disclosures.def()
    }
}

impl Related<super::notifications::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Notifications.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
