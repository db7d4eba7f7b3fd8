use sea_orm_migration::{prelude::*, schema::*};

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(ValuationReports::Table)
                    .if_not_exists()
                    .col(pk_uuid(ValuationReports::Id))
                    // One current report per project; regeneration upserts on this key
                    .col(uuid(ValuationReports::ProjectId).unique_key())
                    .col(decimal_len(ValuationReports::EstimatedValueUsd, 16, 2))
                    .col(string(ValuationReports::ModelVersion))
                    .col(text(ValuationReports::Report))
                    .col(timestamp_with_time_zone(ValuationReports::CreatedAt).default(Expr::current_timestamp()))
                    .col(timestamp_with_time_zone(ValuationReports::UpdatedAt).default(Expr::current_timestamp()))
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_valuation_reports_project")
                            .from(ValuationReports::Table, ValuationReports::ProjectId)
                            .to(NftProjects::Table, NftProjects::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(ValuationReports::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
enum ValuationReports {
    Table,
    Id,
    ProjectId,
    EstimatedValueUsd,
    ModelVersion,
    Report,
    CreatedAt,
    UpdatedAt,
}

#[derive(DeriveIden)]
enum NftProjects {
    Table,
    Id,
}
