//! Escrow contract client
//!
//! Wallet-signed calls (collection approval, sale registration, USDC approval,
//! buy, cancel) plus read-only receipt checks that let the backend confirm an
//! on-chain step before recording it.

use alloy::{
    network::EthereumWallet,
    primitives::{Address, B256, U256},
    providers::{Provider, ProviderBuilder, RootProvider},
    rpc::types::{Log, TransactionReceipt},
    signers::local::PrivateKeySigner,
    sol,
    sol_types::SolEvent,
    transports::http::{reqwest::Url, Client, Http},
};
use async_trait::async_trait;
use rust_decimal::Decimal;
use std::str::FromStr;
use thiserror::Error;
use tracing::{debug, error, info, warn};

use crate::config::EscrowConfig;
use crate::error::ApiError;

/// USDC token decimals
const USDC_DECIMALS: u32 = 6;

sol! {
    #[sol(rpc)]
    interface ICollectionEscrow {
        function registerSale(address collection, uint256 price) external returns (uint256 saleId);
        function buy(uint256 saleId) external;
        function cancelSale(uint256 saleId) external;

        event SaleRegistered(
            uint256 indexed saleId,
            address indexed seller,
            address indexed collection,
            uint256 price
        );

        event SalePurchased(
            uint256 indexed saleId,
            address indexed buyer,
            uint256 price
        );

        event SaleCancelled(uint256 indexed saleId);
    }

    #[sol(rpc)]
    interface IERC721 {
        function setApprovalForAll(address operator, bool approved) external;
        function isApprovedForAll(address owner, address operator) external view returns (bool);
    }

    #[sol(rpc)]
    interface IERC20 {
        function approve(address spender, uint256 amount) external returns (bool);
    }
}

#[derive(Debug, Error)]
pub enum EscrowError {
    #[error("Invalid escrow config: {0}")]
    InvalidConfig(String),
    #[error("Invalid amount: {0}")]
    InvalidAmount(String),
    #[error("An operator key is required for signed escrow calls")]
    MissingSigner,
    #[error("Provider error: {0}")]
    Provider(String),
    #[error("Transaction error: {0}")]
    Transaction(String),
    #[error("Transaction {0} not found or not yet mined")]
    ReceiptNotFound(String),
    #[error("Transaction {0} reverted")]
    Reverted(String),
    #[error("{0}")]
    EventNotFound(String),
}

impl EscrowError {
    /// True when the chain answered and the transaction does not prove the claimed step
    pub fn is_rejection(&self) -> bool {
        matches!(
            self,
            EscrowError::ReceiptNotFound(_) | EscrowError::Reverted(_) | EscrowError::EventNotFound(_)
        )
    }
}

impl From<EscrowError> for ApiError {
    fn from(err: EscrowError) -> Self {
        ApiError::Chain {
            rejected: err.is_rejection(),
            message: err.to_string(),
        }
    }
}

/// A sale registration proven by a receipt
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SaleRegistration {
    pub sale_id: u64,
    pub tx_hash: String,
    pub seller: String,
    pub collection: String,
    pub price_units: U256,
}

/// A purchase proven by a receipt
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SalePurchase {
    pub sale_id: u64,
    pub tx_hash: String,
    pub buyer: String,
    pub price_units: U256,
}

/// Read side of the escrow used by the listing and purchase workflows
#[async_trait]
pub trait EscrowLedger: Send + Sync {
    /// Lowercase 0x address of the escrow contract
    fn escrow_address(&self) -> String;

    /// Confirm `tx_hash` registered `sale_id` for `collection`
    async fn confirm_registration(
        &self,
        tx_hash: &str,
        sale_id: u64,
        collection: &str,
    ) -> Result<SaleRegistration, EscrowError>;

    /// Confirm `tx_hash` bought `sale_id`, for `buyer` when given
    async fn confirm_purchase(
        &self,
        tx_hash: &str,
        sale_id: u64,
        buyer: Option<&str>,
    ) -> Result<SalePurchase, EscrowError>;
}

/// Convert a USDC amount to the token's 6-decimal integer representation
pub fn usdc_to_base_units(amount: Decimal) -> Result<U256, EscrowError> {
    if amount <= Decimal::ZERO {
        return Err(EscrowError::InvalidAmount(format!("{} is not a positive amount", amount)));
    }
    let normalized = amount.normalize();
    if normalized.scale() > USDC_DECIMALS {
        return Err(EscrowError::InvalidAmount(format!(
            "{} has more than {} decimal places",
            amount, USDC_DECIMALS
        )));
    }

    let units = normalized.mantissa() as u128 * 10u128.pow(USDC_DECIMALS - normalized.scale());
    Ok(U256::from(units))
}

/// Convert 6-decimal integer units back to a USDC amount
pub fn base_units_to_usdc(units: U256) -> Option<Decimal> {
    let raw: u128 = units.try_into().ok()?;
    let raw = i128::try_from(raw).ok()?;
    Decimal::try_from_i128_with_scale(raw, USDC_DECIMALS).ok()
}

fn parse_address(value: &str, what: &str) -> Result<Address, EscrowError> {
    Address::from_str(value.trim()).map_err(|e| EscrowError::InvalidConfig(format!("Invalid {}: {}", what, e)))
}

fn parse_tx_hash(value: &str) -> Result<B256, EscrowError> {
    B256::from_str(value.trim()).map_err(|_| EscrowError::ReceiptNotFound(value.to_string()))
}

fn format_address(address: Address) -> String {
    format!("0x{}", hex::encode(address.as_slice()))
}

/// Escrow client bound to one contract on one chain
pub struct EscrowClient {
    provider: RootProvider<Http<Client>>,
    rpc_url: Url,
    escrow_address: Address,
    usdc_address: Address,
    signer: Option<PrivateKeySigner>,
}

impl EscrowClient {
    /// Build the client without touching the network
    pub fn new(config: &EscrowConfig) -> Result<Self, EscrowError> {
        let rpc_url: Url = config
            .rpc_url
            .parse()
            .map_err(|e| EscrowError::InvalidConfig(format!("Invalid RPC URL: {}", e)))?;

        let signer = match &config.operator_private_key {
            Some(key) => Some(
                key.parse::<PrivateKeySigner>()
                    .map_err(|e| EscrowError::InvalidConfig(format!("Invalid private key: {}", e)))?,
            ),
            None => None,
        };

        let escrow_address = parse_address(&config.contract_address, "escrow address")?;
        let usdc_address = parse_address(&config.usdc_address, "USDC address")?;

        info!(
            rpc_url = %config.rpc_url,
            escrow = %escrow_address,
            usdc = %usdc_address,
            signer = %signer.as_ref().map(|s| s.address().to_string()).unwrap_or_default(),
            "Escrow client configured"
        );

        Ok(Self {
            provider: ProviderBuilder::new().on_http(rpc_url.clone()),
            rpc_url,
            escrow_address,
            usdc_address,
            signer,
        })
    }

    pub async fn chain_id(&self) -> Result<u64, EscrowError> {
        self.provider.get_chain_id().await.map_err(|e| {
            error!(error = %e, "Failed to reach escrow RPC");
            EscrowError::Provider(format!("Connection failed: {}", e))
        })
    }

    /// Address of the operator key, if one is configured
    pub fn operator_address(&self) -> Option<String> {
        self.signer.as_ref().map(|s| format_address(s.address()))
    }

    fn signer_provider(&self) -> Result<impl Provider<Http<Client>>, EscrowError> {
        let signer = self.signer.clone().ok_or(EscrowError::MissingSigner)?;
        Ok(ProviderBuilder::new()
            .with_recommended_fillers()
            .wallet(EthereumWallet::from(signer))
            .on_http(self.rpc_url.clone()))
    }

    /// Grant the escrow operator rights over `collection` (ERC-721
    /// `setApprovalForAll`). Returns `None` when the approval already exists.
    pub async fn approve_collection(&self, collection: &str) -> Result<Option<String>, EscrowError> {
        let owner = self.signer.as_ref().ok_or(EscrowError::MissingSigner)?.address();
        let collection = parse_address(collection, "collection address")?;

        let approved = IERC721::new(collection, &self.provider)
            .isApprovedForAll(owner, self.escrow_address)
            .call()
            .await
            .map_err(|e| EscrowError::Provider(format!("isApprovedForAll failed: {}", e)))?
            ._0;
        if approved {
            debug!(collection = %collection, "Escrow already approved for collection");
            return Ok(None);
        }

        let provider = self.signer_provider()?;
        let pending = IERC721::new(collection, &provider)
            .setApprovalForAll(self.escrow_address, true)
            .send()
            .await
            .map_err(|e| {
                error!(error = %e, "Failed to send setApprovalForAll");
                EscrowError::Transaction(format!("Send failed: {}", e))
            })?;

        let tx_hash = format!("{:?}", pending.tx_hash());
        info!(tx_hash = %tx_hash, collection = %collection, "Collection approval sent");

        let receipt = pending
            .get_receipt()
            .await
            .map_err(|e| EscrowError::Transaction(format!("Receipt failed: {}", e)))?;
        if !receipt.status() {
            return Err(EscrowError::Reverted(tx_hash));
        }
        Ok(Some(tx_hash))
    }

    /// Register a sale of `collection` at `price` USDC and return the sale id
    /// announced by the escrow
    pub async fn register_sale(&self, collection: &str, price: Decimal) -> Result<SaleRegistration, EscrowError> {
        let units = usdc_to_base_units(price)?;
        let collection_address = parse_address(collection, "collection address")?;

        let provider = self.signer_provider()?;
        let pending = ICollectionEscrow::new(self.escrow_address, &provider)
            .registerSale(collection_address, units)
            .send()
            .await
            .map_err(|e| {
                error!(error = %e, "Failed to send registerSale");
                EscrowError::Transaction(format!("Send failed: {}", e))
            })?;

        let tx_hash = format!("{:?}", pending.tx_hash());
        info!(tx_hash = %tx_hash, price = %price, "Sale registration sent, waiting for confirmation");

        let receipt = pending
            .get_receipt()
            .await
            .map_err(|e| EscrowError::Transaction(format!("Receipt failed: {}", e)))?;
        if !receipt.status() {
            return Err(EscrowError::Reverted(tx_hash));
        }

        find_registration(receipt.inner.logs(), self.escrow_address, None, Some(collection_address), &tx_hash)
    }

    /// Approve the escrow to spend `amount` USDC of the operator wallet
    pub async fn approve_usdc(&self, amount: Decimal) -> Result<String, EscrowError> {
        let units = usdc_to_base_units(amount)?;
        let provider = self.signer_provider()?;

        let pending = IERC20::new(self.usdc_address, &provider)
            .approve(self.escrow_address, units)
            .send()
            .await
            .map_err(|e| EscrowError::Transaction(format!("Send failed: {}", e)))?;
        let tx_hash = format!("{:?}", pending.tx_hash());

        let receipt = pending
            .get_receipt()
            .await
            .map_err(|e| EscrowError::Transaction(format!("Receipt failed: {}", e)))?;
        if !receipt.status() {
            return Err(EscrowError::Reverted(tx_hash));
        }
        info!(tx_hash = %tx_hash, amount = %amount, "USDC spend approved");
        Ok(tx_hash)
    }

    pub async fn buy(&self, sale_id: u64) -> Result<String, EscrowError> {
        let provider = self.signer_provider()?;
        let pending = ICollectionEscrow::new(self.escrow_address, &provider)
            .buy(U256::from(sale_id))
            .send()
            .await
            .map_err(|e| EscrowError::Transaction(format!("Send failed: {}", e)))?;
        let tx_hash = format!("{:?}", pending.tx_hash());

        let receipt = pending
            .get_receipt()
            .await
            .map_err(|e| EscrowError::Transaction(format!("Receipt failed: {}", e)))?;
        if !receipt.status() {
            return Err(EscrowError::Reverted(tx_hash));
        }
        info!(tx_hash = %tx_hash, sale_id = sale_id, "Sale bought");
        Ok(tx_hash)
    }

    pub async fn cancel_sale(&self, sale_id: u64) -> Result<String, EscrowError> {
        let provider = self.signer_provider()?;
        let pending = ICollectionEscrow::new(self.escrow_address, &provider)
            .cancelSale(U256::from(sale_id))
            .send()
            .await
            .map_err(|e| EscrowError::Transaction(format!("Send failed: {}", e)))?;
        let tx_hash = format!("{:?}", pending.tx_hash());

        let receipt = pending
            .get_receipt()
            .await
            .map_err(|e| EscrowError::Transaction(format!("Receipt failed: {}", e)))?;
        if !receipt.status() {
            return Err(EscrowError::Reverted(tx_hash));
        }
        info!(tx_hash = %tx_hash, sale_id = sale_id, "Sale cancelled");
        Ok(tx_hash)
    }

    async fn successful_receipt(&self, tx_hash: &str) -> Result<TransactionReceipt, EscrowError> {
        let hash = parse_tx_hash(tx_hash)?;
        let receipt = self
            .provider
            .get_transaction_receipt(hash)
            .await
            .map_err(|e| EscrowError::Provider(format!("Failed to fetch receipt: {}", e)))?
            .ok_or_else(|| EscrowError::ReceiptNotFound(tx_hash.to_string()))?;

        if !receipt.status() {
            return Err(EscrowError::Reverted(tx_hash.to_string()));
        }
        Ok(receipt)
    }
}

/// Find the `SaleRegistered` event of the escrow in `logs`
fn find_registration(
    logs: &[Log],
    escrow: Address,
    sale_id: Option<u64>,
    collection: Option<Address>,
    tx_hash: &str,
) -> Result<SaleRegistration, EscrowError> {
    for log in logs {
        if log.address() != escrow || log.topics().first() != Some(&ICollectionEscrow::SaleRegistered::SIGNATURE_HASH) {
            continue;
        }
        let Ok(event) = ICollectionEscrow::SaleRegistered::decode_log_data(log.data(), true) else {
            warn!(tx_hash = %tx_hash, "Undecodable SaleRegistered log");
            continue;
        };

        let event_sale_id: u64 = match event.saleId.try_into() {
            Ok(id) => id,
            Err(_) => continue,
        };
        if sale_id.is_some_and(|id| id != event_sale_id) {
            continue;
        }
        if collection.is_some_and(|c| c != event.collection) {
            continue;
        }

        return Ok(SaleRegistration {
            sale_id: event_sale_id,
            tx_hash: tx_hash.to_string(),
            seller: format_address(event.seller),
            collection: format_address(event.collection),
            price_units: event.price,
        });
    }

    Err(EscrowError::EventNotFound(format!(
        "SaleRegistered event not found in transaction {}",
        tx_hash
    )))
}

/// Find the `SalePurchased` event of the escrow in `logs`
fn find_purchase(
    logs: &[Log],
    escrow: Address,
    sale_id: u64,
    buyer: Option<Address>,
    tx_hash: &str,
) -> Result<SalePurchase, EscrowError> {
    for log in logs {
        if log.address() != escrow || log.topics().first() != Some(&ICollectionEscrow::SalePurchased::SIGNATURE_HASH) {
            continue;
        }
        let Ok(event) = ICollectionEscrow::SalePurchased::decode_log_data(log.data(), true) else {
            warn!(tx_hash = %tx_hash, "Undecodable SalePurchased log");
            continue;
        };

        if event.saleId != U256::from(sale_id) {
            continue;
        }
        if buyer.is_some_and(|b| b != event.buyer) {
            return Err(EscrowError::EventNotFound(format!(
                "Sale {} was bought by {}, not by the caller",
                sale_id,
                format_address(event.buyer)
            )));
        }

        return Ok(SalePurchase {
            sale_id,
            tx_hash: tx_hash.to_string(),
            buyer: format_address(event.buyer),
            price_units: event.price,
        });
    }

    Err(EscrowError::EventNotFound(format!(
        "SalePurchased event for sale {} not found in transaction {}",
        sale_id, tx_hash
    )))
}

#[async_trait]
impl EscrowLedger for EscrowClient {
    fn escrow_address(&self) -> String {
        format_address(self.escrow_address)
    }

    async fn confirm_registration(
        &self,
        tx_hash: &str,
        sale_id: u64,
        collection: &str,
    ) -> Result<SaleRegistration, EscrowError> {
        let collection = parse_address(collection, "collection address")?;
        let receipt = self.successful_receipt(tx_hash).await?;
        let registration = find_registration(
            receipt.inner.logs(),
            self.escrow_address,
            Some(sale_id),
            Some(collection),
            tx_hash,
        )?;

        debug!(tx_hash = %tx_hash, sale_id = sale_id, "Sale registration confirmed on-chain");
        Ok(registration)
    }

    async fn confirm_purchase(
        &self,
        tx_hash: &str,
        sale_id: u64,
        buyer: Option<&str>,
    ) -> Result<SalePurchase, EscrowError> {
        // A wallet that does not parse as an EVM address cannot be matched against the event
        let buyer = buyer.and_then(|b| Address::from_str(b).ok());
        let receipt = self.successful_receipt(tx_hash).await?;
        let purchase = find_purchase(receipt.inner.logs(), self.escrow_address, sale_id, buyer, tx_hash)?;

        debug!(tx_hash = %tx_hash, sale_id = sale_id, buyer = %purchase.buyer, "Purchase confirmed on-chain");
        Ok(purchase)
    }
}
