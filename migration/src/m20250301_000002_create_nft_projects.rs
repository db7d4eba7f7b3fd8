//! NFT collection projects registered for sale
//!
//! `category` and `status` hold the closed string enums of the service.

use sea_orm_migration::{prelude::*, schema::*};

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(NftProjects::Table)
                    .if_not_exists()
                    .col(pk_uuid(NftProjects::Id))
                    .col(string(NftProjects::Name))
                    .col(string_null(NftProjects::Image))
                    .col(string(NftProjects::CollectionAddress))
                    .col(string(NftProjects::ChainId))
                    .col(text(NftProjects::Description))
                    .col(string(NftProjects::Category))
                    .col(decimal_len_null(NftProjects::RoyaltyPct, 5, 2))
                    .col(decimal_len_null(NftProjects::LtmRevenueUsd, 16, 2))
                    .col(string_null(NftProjects::MetadataCid))
                    .col(uuid(NftProjects::OwnerId))
                    .col(string(NftProjects::Status).default("draft"))
                    .col(timestamp_with_time_zone(NftProjects::CreatedAt).default(Expr::current_timestamp()))
                    .col(timestamp_with_time_zone(NftProjects::UpdatedAt).default(Expr::current_timestamp()))
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_nft_projects_owner")
                            .from(NftProjects::Table, NftProjects::OwnerId)
                            .to(Users::Table, Users::Id),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_nft_projects_owner")
                    .table(NftProjects::Table)
                    .col(NftProjects::OwnerId)
                    .to_owned(),
            )
            .await?;

        // Marketplace browsing filters on status
        manager
            .create_index(
                Index::create()
                    .name("idx_nft_projects_status")
                    .table(NftProjects::Table)
                    .col(NftProjects::Status)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(NftProjects::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
enum NftProjects {
    Table,
    Id,
    Name,
    Image,
    CollectionAddress,
    ChainId,
    Description,
    Category,
    RoyaltyPct,
    LtmRevenueUsd,
    MetadataCid,
    OwnerId,
    Status,
    CreatedAt,
    UpdatedAt,
}

#[derive(DeriveIden)]
enum Users {
    Table,
    Id,
}
