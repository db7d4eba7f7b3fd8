pub use sea_orm_migration::prelude::*;

mod m20250301_000001_create_users;
mod m20250301_000002_create_nft_projects;
mod m20250301_000003_create_listings;
mod m20250301_000004_create_transactions;
mod m20250301_000005_create_valuation_reports;
mod m20250301_000006_create_project_disclosures;
mod m20250301_000007_create_notifications;

pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![
            Box::new(m20250301_000001_create_users::Migration),
            Box::new(m20250301_000002_create_nft_projects::Migration),
            Box::new(m20250301_000003_create_listings::Migration),
            Box::new(m20250301_000004_create_transactions::Migration),
            Box::new(m20250301_000005_create_valuation_reports::Migration),
            Box::new(m20250301_000006_create_project_disclosures::Migration),
            Box::new(m20250301_000007_create_notifications::Migration),
        ]
    }
}
