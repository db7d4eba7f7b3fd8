use chrono::{DateTime, FixedOffset};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::entities::listings;
use crate::models::pagination::Pagination;
use crate::models::project::{is_evm_address, ProjectResponse};
use crate::models::transaction::{is_tx_hash, TransactionResponse};

/// USDC carries 6 decimals on-chain
pub const USDC_DECIMALS: u32 = 6;

/// Upper bound that still fits the `NUMERIC(20, 6)` price column
pub const MAX_PRICE_USDC: Decimal = dec!(1000000000);

/// Reject prices that are not positive, exceed the column, or are finer than a USDC unit
pub fn validate_price(price: Decimal) -> Result<Decimal, String> {
    if price <= Decimal::ZERO {
        return Err("priceUSDC must be greater than 0".to_string());
    }
    if price > MAX_PRICE_USDC {
        return Err(format!("priceUSDC must not exceed {}", MAX_PRICE_USDC));
    }
    let normalized = price.normalize();
    if normalized.scale() > USDC_DECIMALS {
        return Err(format!("priceUSDC supports at most {} decimal places", USDC_DECIMALS));
    }
    Ok(normalized)
}

/// Body of `POST /listings`: records an escrow registration that already
/// succeeded on-chain
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateListingRequest {
    pub project_id: Uuid,
    #[serde(rename = "priceUSDC")]
    pub price_usdc: Decimal,
    pub sale_id: i64,
    pub escrow_address: Option<String>,
    pub tx_hash: Option<String>,
}

impl CreateListingRequest {
    pub fn validate(&self) -> Result<(), String> {
        validate_price(self.price_usdc)?;
        if self.sale_id < 0 {
            return Err("saleId cannot be negative".to_string());
        }
        if let Some(escrow) = &self.escrow_address {
            if !is_evm_address(escrow) {
                return Err("escrowAddress must be a 0x-prefixed 20-byte hex address".to_string());
            }
        }
        if let Some(hash) = &self.tx_hash {
            if !is_tx_hash(hash) {
                return Err("txHash must be a 0x-prefixed 32-byte hex hash".to_string());
            }
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateListingRequest {
    #[serde(rename = "priceUSDC")]
    pub price_usdc: Option<Decimal>,
    pub sale_id: Option<i64>,
    pub escrow_address: Option<String>,
    /// Registration of the new sale id, checked while the project is active
    pub tx_hash: Option<String>,
}

impl UpdateListingRequest {
    pub fn validate(&self) -> Result<(), String> {
        if self.price_usdc.is_none() && self.sale_id.is_none() && self.escrow_address.is_none() {
            return Err("Nothing to update".to_string());
        }
        if let Some(price) = self.price_usdc {
            validate_price(price)?;
        }
        if matches!(self.sale_id, Some(id) if id < 0) {
            return Err("saleId cannot be negative".to_string());
        }
        if let Some(escrow) = &self.escrow_address {
            if !is_evm_address(escrow) {
                return Err("escrowAddress must be a 0x-prefixed 20-byte hex address".to_string());
            }
        }
        if let Some(hash) = &self.tx_hash {
            if !is_tx_hash(hash) {
                return Err("txHash must be a 0x-prefixed 32-byte hex hash".to_string());
            }
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListingListQuery {
    pub project_id: Option<Uuid>,
    pub seller_id: Option<Uuid>,
    pub status: Option<String>,
    pub limit: Option<u64>,
    pub offset: Option<u64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListingResponse {
    pub id: Uuid,
    pub project_id: Uuid,
    pub sale_id: Option<i64>,
    #[serde(rename = "priceUSDC", with = "rust_decimal::serde::float")]
    pub price_usdc: Decimal,
    pub escrow_address: Option<String>,
    pub listed_at: DateTime<FixedOffset>,
    pub updated_at: DateTime<FixedOffset>,
}

impl From<listings::Model> for ListingResponse {
    fn from(l: listings::Model) -> Self {
        Self {
            id: l.id,
            project_id: l.project_id,
            sale_id: l.sale_id,
            price_usdc: l.price_usdc,
            escrow_address: l.escrow_address,
            listed_at: l.listed_at,
            updated_at: l.updated_at,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListingWithContext {
    #[serde(flatten)]
    pub listing: ListingResponse,
    pub project: ProjectResponse,
    pub transaction: Option<TransactionResponse>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ListingListResponse {
    pub listings: Vec<ListingWithContext>,
    pub pagination: Pagination,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_price() {
        assert_eq!(validate_price(dec!(100.0)), Ok(dec!(100)));
        assert_eq!(validate_price(dec!(0.000001)), Ok(dec!(0.000001)));
        assert!(validate_price(dec!(0)).is_err());
        assert!(validate_price(dec!(-5)).is_err());
        assert!(validate_price(dec!(0.0000001)).is_err());
        assert!(validate_price(dec!(1000000000.5)).is_err());
    }

    #[test]
    fn test_max_price_fits_price_column() {
        // NUMERIC(20, 6) leaves 14 integer digits
        assert!(MAX_PRICE_USDC.trunc().to_string().len() <= 14);
        assert_eq!(validate_price(MAX_PRICE_USDC), Ok(MAX_PRICE_USDC));
    }

    #[test]
    fn test_trailing_zeros_are_not_extra_precision() {
        assert_eq!(validate_price(dec!(1.50000000)), Ok(dec!(1.5)));
    }

    #[test]
    fn test_create_request_validation() {
        let request: CreateListingRequest = serde_json::from_value(serde_json::json!({
            "projectId": Uuid::new_v4(),
            "priceUSDC": 100.0,
            "saleId": 42
        }))
        .unwrap();
        assert!(request.validate().is_ok());

        let mut bad = request.clone();
        bad.sale_id = -1;
        assert!(bad.validate().is_err());

        let mut bad = request.clone();
        bad.tx_hash = Some("0x1234".to_string());
        assert!(bad.validate().is_err());
    }

    #[test]
    fn test_empty_update_rejected() {
        assert_eq!(
            UpdateListingRequest::default().validate().unwrap_err(),
            "Nothing to update"
        );
    }
}
