use sea_orm_migration::{prelude::*, schema::*};

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(ProjectDisclosures::Table)
                    .if_not_exists()
                    .col(pk_uuid(ProjectDisclosures::Id))
                    .col(uuid(ProjectDisclosures::ProjectId))
                    .col(string(ProjectDisclosures::DisclosureType))
                    .col(string(ProjectDisclosures::Title))
                    .col(text(ProjectDisclosures::Description))
                    .col(integer(ProjectDisclosures::Position).default(0))
                    .col(timestamp_with_time_zone(ProjectDisclosures::CreatedAt).default(Expr::current_timestamp()))
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_project_disclosures_project")
                            .from(ProjectDisclosures::Table, ProjectDisclosures::ProjectId)
                            .to(NftProjects::Table, NftProjects::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_project_disclosures_project_position")
                    .table(ProjectDisclosures::Table)
                    .col(ProjectDisclosures::ProjectId)
                    .col(ProjectDisclosures::Position)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(ProjectDisclosures::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
enum ProjectDisclosures {
    Table,
    Id,
    ProjectId,
    DisclosureType,
    Title,
    Description,
    Position,
    CreatedAt,
}

#[derive(DeriveIden)]
enum NftProjects {
    Table,
    Id,
}
