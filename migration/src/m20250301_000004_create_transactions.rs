//! Completed purchases
//!
//! The unique keys on `listing_id` and `tx_hash` back the double-sale guard
//! and make the recording call idempotent.

use sea_orm_migration::{prelude::*, schema::*};

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Transactions::Table)
                    .if_not_exists()
                    .col(pk_uuid(Transactions::Id))
                    .col(uuid(Transactions::ListingId).unique_key())
                    .col(uuid(Transactions::BuyerId))
                    .col(decimal_len(Transactions::PriceUsdc, 20, 6))
                    .col(string(Transactions::TxHash).unique_key())
                    .col(timestamp_with_time_zone(Transactions::CreatedAt).default(Expr::current_timestamp()))
                    .col(timestamp_with_time_zone(Transactions::UpdatedAt).default(Expr::current_timestamp()))
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_transactions_listing")
                            .from(Transactions::Table, Transactions::ListingId)
                            .to(Listings::Table, Listings::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_transactions_buyer")
                            .from(Transactions::Table, Transactions::BuyerId)
                            .to(Users::Table, Users::Id),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_transactions_buyer")
                    .table(Transactions::Table)
                    .col(Transactions::BuyerId)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(Transactions::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
enum Transactions {
    Table,
    Id,
    ListingId,
    BuyerId,
    PriceUsdc,
    TxHash,
    CreatedAt,
    UpdatedAt,
}

#[derive(DeriveIden)]
enum Listings {
    Table,
    Id,
}

#[derive(DeriveIden)]
enum Users {
    Table,
    Id,
}
