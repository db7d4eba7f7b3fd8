use chrono::{DateTime, FixedOffset};
use lazy_static::lazy_static;
use regex::Regex;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::entities::transactions;
use crate::models::pagination::Pagination;

lazy_static! {
    static ref TX_HASH: Regex = Regex::new(r"^0x[0-9a-fA-F]{64}$").unwrap();
}

pub fn is_tx_hash(value: &str) -> bool {
    TX_HASH.is_match(value)
}

/// Body of `POST /projects/{id}/purchase`
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PurchaseRequest {
    pub tx_hash: Option<String>,
}

/// Body of `POST /transactions`
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateTransactionRequest {
    pub listing_id: Uuid,
    pub tx_hash: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransactionListQuery {
    pub buyer_id: Option<Uuid>,
    pub listing_id: Option<Uuid>,
    pub project_id: Option<Uuid>,
    pub limit: Option<u64>,
    pub offset: Option<u64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransactionResponse {
    pub id: Uuid,
    pub listing_id: Uuid,
    pub buyer_id: Uuid,
    #[serde(rename = "priceUSDC", with = "rust_decimal::serde::float")]
    pub price_usdc: Decimal,
    pub tx_hash: String,
    pub created_at: DateTime<FixedOffset>,
}

impl From<transactions::Model> for TransactionResponse {
    fn from(t: transactions::Model) -> Self {
        Self {
            id: t.id,
            listing_id: t.listing_id,
            buyer_id: t.buyer_id,
            price_usdc: t.price_usdc,
            tx_hash: t.tx_hash,
            created_at: t.created_at,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransactionListResponse {
    pub transactions: Vec<TransactionResponse>,
    pub pagination: Pagination,
}
