pub use super::listings::Entity as Listings;
pub use super::nft_projects::Entity as NftProjects;
pub use super::notifications::Entity as Notifications;
pub use super::project_disclosures::Entity as ProjectDisclosures;
pub use super::transactions::Entity as Transactions;
pub use super::users::Entity as Users;
pub use super::valuation_reports::Entity as ValuationReports;
