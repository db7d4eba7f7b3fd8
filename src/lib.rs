// src/lib.rs

use sea_orm::DatabaseConnection;
use std::sync::Arc;

use auth::SessionVerifier;
use config::AppConfig;
use services::{escrow::EscrowLedger, valuation::ValuationService};

#[derive(Clone)]
pub struct AppState {
    pub db: DatabaseConnection,
    pub config: Arc<AppConfig>,
    pub sessions: SessionVerifier,
    pub valuation: ValuationService,
    /// Present only when on-chain receipts are verified
    pub escrow: Option<Arc<dyn EscrowLedger>>,
}

pub mod entities {
    pub mod prelude;
    pub mod sea_orm_active_enums;
    pub mod users;
    pub mod nft_projects;
    pub mod listings;
    pub mod transactions;
    pub mod valuation_reports;
    pub mod project_disclosures;
    pub mod notifications;
}

pub mod models {
    pub mod pagination;
    pub mod project;
    pub mod listing;
    pub mod transaction;
    pub mod valuation;
    pub mod notification;
    pub mod user;
}

pub mod services {
    pub mod lifecycle;
    pub mod users;
    pub mod projects;
    pub mod listings;
    pub mod purchase;
    pub mod notifications;
    pub mod valuation;
    pub mod escrow;
}

pub mod handlers {
    pub mod health;
    pub mod projects;
    pub mod listings;
    pub mod transactions;
    pub mod valuation;
    pub mod disclosures;
    pub mod user;
    pub mod notifications;
}

pub mod auth;
pub mod config;
pub mod error;
pub mod extract;
pub mod routes;
