//! Wallet-authenticated identities, keyed by the identity provider's subject

use sea_orm_migration::{prelude::*, schema::*};

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Users::Table)
                    .if_not_exists()
                    .col(pk_uuid(Users::Id))
                    .col(string(Users::Sub).unique_key())
                    .col(string(Users::Address).default(""))
                    .col(string(Users::Chain).default(""))
                    .col(string_null(Users::TwitterUsername))
                    .col(string_null(Users::TwitterProfileImageUrl))
                    .col(timestamp_with_time_zone(Users::CreatedAt).default(Expr::current_timestamp()))
                    .col(timestamp_with_time_zone(Users::UpdatedAt).default(Expr::current_timestamp()))
                    .to_owned(),
            )
            .await?;

        // Wallet lookups when reconciling on-chain buyers
        manager
            .create_index(
                Index::create()
                    .name("idx_users_address")
                    .table(Users::Table)
                    .col(Users::Address)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(Users::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
enum Users {
    Table,
    Id,
    Sub,
    Address,
    Chain,
    TwitterUsername,
    TwitterProfileImageUrl,
    CreatedAt,
    UpdatedAt,
}
