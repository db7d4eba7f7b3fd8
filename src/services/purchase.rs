//! Purchase workflow
//!
//! Records a buy that already happened on the escrow. The project flips to
//! `sold`, the transaction row is inserted and the seller is notified in one
//! database transaction. The flip is a conditional update, so of two
//! concurrent attempts exactly one commits.

use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, PaginatorTrait, QueryFilter, QueryOrder,
    QuerySelect, Set, TransactionTrait,
};
use tracing::{info, warn};
use uuid::Uuid;

use crate::entities::{listings, nft_projects, prelude::*, sea_orm_active_enums::ProjectStatus, transactions, users};
use crate::error::ApiError;
use crate::models::transaction::is_tx_hash;
use crate::services::escrow::{base_units_to_usdc, EscrowLedger};
use crate::services::lifecycle::{check_transition, transition, Trigger};
use crate::services::notifications::{emit, purchase_notice};

/// What the buyer points at
#[derive(Debug, Clone, Copy)]
pub enum PurchaseTarget {
    Project(Uuid),
    Listing(Uuid),
}

#[derive(Debug, Clone)]
pub struct PurchaseOutcome {
    pub transaction: transactions::Model,
    /// The same purchase had been recorded before
    pub replayed: bool,
}

#[derive(Debug, Clone, Default)]
pub struct TransactionFilter {
    pub buyer_id: Option<Uuid>,
    pub listing_id: Option<Uuid>,
    pub project_id: Option<Uuid>,
    pub limit: u64,
    pub offset: u64,
}

fn not_active() -> ApiError {
    ApiError::Conflict("Listing is not active".to_string())
}

async fn resolve_target(
    db: &DatabaseConnection,
    target: PurchaseTarget,
) -> Result<(listings::Model, nft_projects::Model), ApiError> {
    let listing = match target {
        PurchaseTarget::Project(project_id) => Listings::find()
            .filter(listings::Column::ProjectId.eq(project_id))
            .one(db)
            .await?,
        PurchaseTarget::Listing(listing_id) => Listings::find_by_id(listing_id).one(db).await?,
    }
    .ok_or_else(|| ApiError::NotFound("Listing not found".to_string()))?;

    let project = NftProjects::find_by_id(listing.project_id)
        .one(db)
        .await?
        .ok_or_else(|| ApiError::NotFound("Project not found".to_string()))?;

    Ok((listing, project))
}

/// Record a purchase for `buyer` proven by `tx_hash`
pub async fn purchase(
    db: &DatabaseConnection,
    ledger: Option<&dyn EscrowLedger>,
    buyer: &users::Model,
    target: PurchaseTarget,
    tx_hash: &str,
) -> Result<PurchaseOutcome, ApiError> {
    if !is_tx_hash(tx_hash) {
        return Err(ApiError::Validation("txHash must be a 0x-prefixed 32-byte hex hash".to_string()));
    }
    let tx_hash = tx_hash.to_lowercase();

    let (listing, project) = resolve_target(db, target).await?;

    // A retried recording call returns the original row
    if let Some(existing) = Transactions::find()
        .filter(transactions::Column::TxHash.eq(&tx_hash))
        .one(db)
        .await?
    {
        if existing.listing_id == listing.id && existing.buyer_id == buyer.id {
            info!(transaction_id = %existing.id, tx_hash = %tx_hash, "Purchase already recorded");
            return Ok(PurchaseOutcome { transaction: existing, replayed: true });
        }
        return Err(ApiError::Conflict("Transaction hash already recorded".to_string()));
    }

    if project.status != ProjectStatus::Active {
        warn!(project_id = %project.id, status = %project.status, "Purchase of inactive listing");
        return Err(not_active());
    }
    if project.owner_id == buyer.id {
        return Err(ApiError::Conflict("You cannot buy your own project".to_string()));
    }
    let sale_id = listing
        .sale_id
        .ok_or_else(|| ApiError::Conflict("Listing has no registered escrow sale".to_string()))?;

    if let Some(ledger) = ledger {
        let buyer_wallet = Some(buyer.address.as_str()).filter(|a| !a.is_empty());
        let confirmed = ledger
            .confirm_purchase(&tx_hash, sale_id as u64, buyer_wallet)
            .await
            .inspect_err(|e| warn!(error = %e, tx_hash = %tx_hash, "Purchase not confirmed on-chain"))?;

        if base_units_to_usdc(confirmed.price_units) != Some(listing.price_usdc.normalize()) {
            warn!(
                listing_id = %listing.id,
                listed = %listing.price_usdc,
                paid_units = %confirmed.price_units,
                "On-chain price differs from listing"
            );
        }
    }

    check_transition(project.status, ProjectStatus::Sold, Trigger::Purchase)?;

    let txn = db.begin().await?;

    if !transition(&txn, project.id, ProjectStatus::Active, ProjectStatus::Sold).await? {
        warn!(project_id = %project.id, "Lost purchase race");
        return Err(not_active());
    }

    let now = Utc::now();
    let transaction = transactions::ActiveModel {
        id: Set(Uuid::new_v4()),
        listing_id: Set(listing.id),
        buyer_id: Set(buyer.id),
        price_usdc: Set(listing.price_usdc),
        tx_hash: Set(tx_hash.clone()),
        created_at: Set(now.into()),
        updated_at: Set(now.into()),
    }
    .insert(&txn)
    .await?;

    emit(&txn, purchase_notice(&project, &listing, &transaction)).await?;
    txn.commit().await?;

    info!(
        transaction_id = %transaction.id,
        project_id = %project.id,
        listing_id = %listing.id,
        buyer_id = %buyer.id,
        tx_hash = %tx_hash,
        price_usdc = %transaction.price_usdc,
        "Purchase recorded, project sold"
    );

    Ok(PurchaseOutcome { transaction, replayed: false })
}

pub async fn list_transactions(
    db: &DatabaseConnection,
    filter: &TransactionFilter,
) -> Result<(Vec<transactions::Model>, u64), ApiError> {
    let mut select = Transactions::find();

    if let Some(buyer_id) = filter.buyer_id {
        select = select.filter(transactions::Column::BuyerId.eq(buyer_id));
    }
    if let Some(listing_id) = filter.listing_id {
        select = select.filter(transactions::Column::ListingId.eq(listing_id));
    }
    if let Some(project_id) = filter.project_id {
        select = select
            .inner_join(Listings)
            .filter(listings::Column::ProjectId.eq(project_id));
    }

    let total = select.clone().count(db).await?;
    let page = select
        .order_by_desc(transactions::Column::CreatedAt)
        .offset(filter.offset)
        .limit(filter.limit)
        .all(db)
        .await?;

    Ok((page, total))
}
