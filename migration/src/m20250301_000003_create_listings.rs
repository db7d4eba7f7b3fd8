//! Sale offers, one per project
//!
//! `price_usdc` keeps the token's 6 decimal places. `sale_id` is the escrow's
//! handle and stays NULL until a registration is recorded.

use sea_orm_migration::{prelude::*, schema::*};

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Listings::Table)
                    .if_not_exists()
                    .col(pk_uuid(Listings::Id))
                    .col(uuid(Listings::ProjectId).unique_key())
                    .col(big_integer_null(Listings::SaleId))
                    .col(decimal_len(Listings::PriceUsdc, 20, 6))
                    .col(string_null(Listings::EscrowAddress))
                    .col(timestamp_with_time_zone(Listings::ListedAt).default(Expr::current_timestamp()))
                    .col(timestamp_with_time_zone(Listings::UpdatedAt).default(Expr::current_timestamp()))
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_listings_project")
                            .from(Listings::Table, Listings::ProjectId)
                            .to(NftProjects::Table, NftProjects::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        // A sale id identifies exactly one registration on a given escrow
        manager
            .create_index(
                Index::create()
                    .name("idx_listings_escrow_sale")
                    .table(Listings::Table)
                    .col(Listings::EscrowAddress)
                    .col(Listings::SaleId)
                    .unique()
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(Listings::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
enum Listings {
    Table,
    Id,
    ProjectId,
    SaleId,
    PriceUsdc,
    EscrowAddress,
    ListedAt,
    UpdatedAt,
}

#[derive(DeriveIden)]
enum NftProjects {
    Table,
    Id,
}
