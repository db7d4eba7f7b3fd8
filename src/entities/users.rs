//! SeaORM Entity for wallet-authenticated users

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "users")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    /// Subject identifier issued by the wallet-identity provider
    #[sea_orm(unique)]
    pub sub: String,
    /// Wallet address from the latest session (may rotate)
    pub address: String,
    pub chain: String,
    pub twitter_username: Option<String>,
    pub twitter_profile_image_url: Option<String>,
    pub created_at: DateTimeWithTimeZone,
    pub updated_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::nft_projects::Entity")]
    NftProjects,
    #[sea_orm(has_many = "super::notifications::Entity")]
    Notifications,
    #[sea_orm(has_many = "super::transactions::Entity")]
    Transactions,
}

impl Related<super::nft_projects::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::NftProjects.def()
    }
}

impl Related<super::notifications::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Notifications.def()
    }
}

impl Related<super::transactions::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Transactions.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
