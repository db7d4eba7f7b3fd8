//! Listing workflow
//!
//! Records escrow registrations, handles price/cancel changes and the
//! owner-triggered status route. Every status write is a conditional
//! transition inside the same database transaction as the listing change.

use chrono::Utc;
use rust_decimal::Decimal;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, PaginatorTrait, QueryFilter, QueryOrder,
    QuerySelect, Set, TransactionTrait,
};
use std::collections::HashMap;
use tracing::{info, warn};
use uuid::Uuid;

use crate::config::RelistPolicy;
use crate::entities::{
    listings, nft_projects, prelude::*, sea_orm_active_enums::ProjectStatus, transactions, users,
};
use crate::error::ApiError;
use crate::models::listing::{validate_price, ListingWithContext, UpdateListingRequest};
use crate::services::escrow::EscrowLedger;
use crate::services::lifecycle::{check_transition, hold_status, transition, Trigger};
use crate::services::projects::{clear_disclosures, load_owned};

/// An escrow registration the seller reports after it succeeded on-chain
#[derive(Debug, Clone)]
pub struct ListingRegistration {
    pub project_id: Uuid,
    pub price_usdc: Decimal,
    pub sale_id: i64,
    pub escrow_address: Option<String>,
    pub tx_hash: Option<String>,
}

#[derive(Debug, Clone)]
pub struct ListingFilter {
    pub project_id: Option<Uuid>,
    pub seller_id: Option<Uuid>,
    pub status: Option<ProjectStatus>,
    pub limit: u64,
    pub offset: u64,
}

fn concurrent_change() -> ApiError {
    ApiError::Conflict("Project status changed concurrently, please retry".to_string())
}

/// With a ledger configured, listings may only name the contract it verifies against
fn pinned_escrow(ledger: Option<&dyn EscrowLedger>, requested: &str) -> Result<String, ApiError> {
    let requested = requested.to_lowercase();
    match ledger {
        Some(ledger) if ledger.escrow_address().to_lowercase() != requested => Err(ApiError::Validation(
            "escrowAddress does not match the escrow contract".to_string(),
        )),
        _ => Ok(requested),
    }
}

/// Persist a sale registration and activate the project.
///
/// Returns the listing and whether anything was written; recording the same
/// registration twice is a no-op.
pub async fn record_listing(
    db: &DatabaseConnection,
    ledger: Option<&dyn EscrowLedger>,
    seller: &users::Model,
    registration: ListingRegistration,
    default_escrow: Option<&str>,
) -> Result<(listings::Model, bool), ApiError> {
    let price = validate_price(registration.price_usdc).map_err(ApiError::Validation)?;
    let project = load_owned(db, seller, registration.project_id).await?;
    let escrow_address = match (registration.escrow_address.as_deref(), ledger) {
        (Some(requested), _) => Some(pinned_escrow(ledger, requested)?),
        (None, Some(ledger)) => Some(ledger.escrow_address().to_lowercase()),
        (None, None) => default_escrow.map(str::to_lowercase),
    };

    let existing = Listings::find()
        .filter(listings::Column::ProjectId.eq(project.id))
        .one(db)
        .await?;

    match project.status {
        ProjectStatus::Draft | ProjectStatus::Suspended => {}
        ProjectStatus::Active => {
            return match existing {
                Some(listing) if listing.sale_id == Some(registration.sale_id) && listing.price_usdc == price => {
                    info!(listing_id = %listing.id, "Listing already recorded");
                    Ok((listing, false))
                }
                _ => Err(ApiError::Conflict(
                    "Project is already listed; cancel the current listing first".to_string(),
                )),
            };
        }
        ProjectStatus::Sold => return Err(ApiError::Conflict("Project has already been sold".to_string())),
        ProjectStatus::Deleted => return Err(ApiError::NotFound("Project not found".to_string())),
    }

    if let (Some(ledger), Some(tx_hash)) = (ledger, registration.tx_hash.as_deref()) {
        ledger
            .confirm_registration(tx_hash, registration.sale_id as u64, &project.collection_address)
            .await
            .inspect_err(|e| warn!(error = %e, tx_hash = %tx_hash, "Sale registration not confirmed"))?;
    }

    let now = Utc::now();

    let txn = db.begin().await?;

    if !transition(&txn, project.id, project.status, ProjectStatus::Active).await? {
        return Err(concurrent_change());
    }

    let listing = match existing {
        Some(listing) => {
            let mut active: listings::ActiveModel = listing.into();
            active.sale_id = Set(Some(registration.sale_id));
            active.price_usdc = Set(price);
            active.escrow_address = Set(escrow_address);
            active.listed_at = Set(now.into());
            active.updated_at = Set(now.into());
            active.update(&txn).await?
        }
        None => {
            listings::ActiveModel {
                id: Set(Uuid::new_v4()),
                project_id: Set(project.id),
                sale_id: Set(Some(registration.sale_id)),
                price_usdc: Set(price),
                escrow_address: Set(escrow_address),
                listed_at: Set(now.into()),
                updated_at: Set(now.into()),
            }
            .insert(&txn)
            .await?
        }
    };

    txn.commit().await?;

    info!(
        listing_id = %listing.id,
        project_id = %project.id,
        sale_id = registration.sale_id,
        price_usdc = %price,
        from = %project.status,
        "Listing recorded, project active"
    );
    Ok((listing, true))
}

/// Owner change of price, sale id or escrow address.
///
/// While the project is active, a new sale id or escrow has to come with a
/// registration the ledger confirms.
pub async fn update_listing(
    db: &DatabaseConnection,
    ledger: Option<&dyn EscrowLedger>,
    seller: &users::Model,
    listing_id: Uuid,
    changes: UpdateListingRequest,
) -> Result<listings::Model, ApiError> {
    let listing = Listings::find_by_id(listing_id)
        .one(db)
        .await?
        .ok_or_else(|| ApiError::NotFound("Listing not found".to_string()))?;
    let project = load_owned(db, seller, listing.project_id).await?;
    if project.status == ProjectStatus::Sold {
        return Err(ApiError::Conflict("Listing can no longer be changed once sold".to_string()));
    }

    let escrow_address = changes
        .escrow_address
        .as_deref()
        .map(|requested| pinned_escrow(ledger, requested))
        .transpose()?;
    let sale_changed = changes.sale_id.is_some_and(|id| listing.sale_id != Some(id));
    let escrow_changed = escrow_address
        .as_ref()
        .is_some_and(|escrow| listing.escrow_address.as_ref() != Some(escrow));

    if let (ProjectStatus::Active, Some(ledger), true) = (project.status, ledger, sale_changed || escrow_changed) {
        let sale_id = changes.sale_id.or(listing.sale_id).ok_or_else(|| {
            ApiError::Validation("saleId is required to move an active listing".to_string())
        })?;
        let tx_hash = changes.tx_hash.as_deref().ok_or_else(|| {
            ApiError::Validation("txHash of the new sale registration is required while the project is active".to_string())
        })?;
        ledger
            .confirm_registration(tx_hash, sale_id as u64, &project.collection_address)
            .await
            .inspect_err(|e| warn!(error = %e, tx_hash = %tx_hash, "Sale registration not confirmed"))?;
    }

    let mut active: listings::ActiveModel = listing.into();
    if let Some(price) = changes.price_usdc {
        active.price_usdc = Set(validate_price(price).map_err(ApiError::Validation)?);
    }
    if let Some(sale_id) = changes.sale_id {
        active.sale_id = Set(Some(sale_id));
    }
    if let Some(escrow) = escrow_address {
        active.escrow_address = Set(Some(escrow));
    }
    active.updated_at = Set(Utc::now().into());

    // A purchase flips the status in its own transaction
    let txn = db.begin().await?;
    if !hold_status(&txn, project.id, project.status).await? {
        return Err(concurrent_change());
    }
    let updated = active.update(&txn).await?;
    txn.commit().await?;

    info!(
        listing_id = %updated.id,
        project_id = %project.id,
        sale_changed,
        escrow_changed,
        "Listing updated"
    );
    Ok(updated)
}

/// Owner cancellation: removes the listing and suspends an active project
pub async fn cancel_listing(
    db: &DatabaseConnection,
    seller: &users::Model,
    listing_id: Uuid,
) -> Result<nft_projects::Model, ApiError> {
    let listing = Listings::find_by_id(listing_id)
        .one(db)
        .await?
        .ok_or_else(|| ApiError::NotFound("Listing not found".to_string()))?;
    let project = load_owned(db, seller, listing.project_id).await?;
    if project.status == ProjectStatus::Sold {
        return Err(ApiError::Conflict("Listing can no longer be cancelled once sold".to_string()));
    }

    let txn = db.begin().await?;
    let settled = match project.status {
        ProjectStatus::Active => transition(&txn, project.id, ProjectStatus::Active, ProjectStatus::Suspended).await?,
        status => hold_status(&txn, project.id, status).await?,
    };
    if !settled {
        return Err(concurrent_change());
    }
    Listings::delete_by_id(listing.id).exec(&txn).await?;
    txn.commit().await?;

    info!(listing_id = %listing.id, project_id = %project.id, "Listing cancelled");

    Ok(NftProjects::find_by_id(project.id)
        .one(db)
        .await?
        .ok_or_else(|| ApiError::NotFound("Project not found".to_string()))?)
}

/// Owner-triggered status change (`PUT /user/projects/{id}/status`)
pub async fn change_status(
    db: &DatabaseConnection,
    owner: &users::Model,
    project_id: Uuid,
    target: ProjectStatus,
    policy: RelistPolicy,
) -> Result<nft_projects::Model, ApiError> {
    let project = load_owned(db, owner, project_id).await?;
    let from = project.status;
    check_transition(from, target, Trigger::Owner)?;

    let listing = Listings::find()
        .filter(listings::Column::ProjectId.eq(project_id))
        .one(db)
        .await?;

    let txn = db.begin().await?;

    match target {
        ProjectStatus::Active => {
            if !listing.as_ref().is_some_and(|l| l.sale_id.is_some()) {
                return Err(ApiError::Conflict(
                    "Register the sale on the escrow before activating the project".to_string(),
                ));
            }
            if !transition(&txn, project_id, from, target).await? {
                return Err(concurrent_change());
            }
        }
        ProjectStatus::Suspended => {
            if !transition(&txn, project_id, from, target).await? {
                return Err(concurrent_change());
            }
            if let (RelistPolicy::Reregister, Some(listing)) = (policy, listing) {
                let mut active: listings::ActiveModel = listing.into();
                active.sale_id = Set(None);
                active.updated_at = Set(Utc::now().into());
                active.update(&txn).await?;
            }
        }
        ProjectStatus::Deleted => {
            if !transition(&txn, project_id, from, target).await? {
                return Err(concurrent_change());
            }
            let cleared = clear_disclosures(&txn, project_id).await?;
            info!(project_id = %project_id, disclosures = cleared, "Cleared disclosures of deleted project");
        }
        // check_transition rejects every other owner target
        ProjectStatus::Draft | ProjectStatus::Sold => {
            return Err(ApiError::Conflict(format!("Cannot change status from {} to {}", from, target)));
        }
    }

    txn.commit().await?;
    info!(project_id = %project_id, from = %from, to = %target, "Project status changed");

    Ok(NftProjects::find_by_id(project_id)
        .one(db)
        .await?
        .ok_or_else(|| ApiError::NotFound("Project not found".to_string()))?)
}

async fn with_context(
    db: &DatabaseConnection,
    listings: Vec<listings::Model>,
) -> Result<Vec<ListingWithContext>, ApiError> {
    if listings.is_empty() {
        return Ok(Vec::new());
    }
    let project_ids: Vec<Uuid> = listings.iter().map(|l| l.project_id).collect();
    let listing_ids: Vec<Uuid> = listings.iter().map(|l| l.id).collect();

    let projects: HashMap<Uuid, nft_projects::Model> = NftProjects::find()
        .filter(nft_projects::Column::Id.is_in(project_ids))
        .all(db)
        .await?
        .into_iter()
        .map(|p| (p.id, p))
        .collect();
    let mut purchases: HashMap<Uuid, transactions::Model> = Transactions::find()
        .filter(transactions::Column::ListingId.is_in(listing_ids))
        .all(db)
        .await?
        .into_iter()
        .map(|t| (t.listing_id, t))
        .collect();

    let mut out = Vec::with_capacity(listings.len());
    for listing in listings {
        let Some(project) = projects.get(&listing.project_id) else {
            continue;
        };
        out.push(ListingWithContext {
            project: project.clone().into(),
            transaction: purchases.remove(&listing.id).map(Into::into),
            listing: listing.into(),
        });
    }
    Ok(out)
}

/// Listings of live projects, newest first
pub async fn list_listings(
    db: &DatabaseConnection,
    filter: &ListingFilter,
) -> Result<(Vec<ListingWithContext>, u64), ApiError> {
    let mut select = Listings::find()
        .inner_join(NftProjects)
        .filter(nft_projects::Column::Status.ne(ProjectStatus::Deleted));

    if let Some(project_id) = filter.project_id {
        select = select.filter(listings::Column::ProjectId.eq(project_id));
    }
    if let Some(seller_id) = filter.seller_id {
        select = select.filter(nft_projects::Column::OwnerId.eq(seller_id));
    }
    if let Some(status) = filter.status {
        select = select.filter(nft_projects::Column::Status.eq(status));
    }

    let total = select.clone().count(db).await?;
    let page = select
        .order_by_desc(listings::Column::ListedAt)
        .offset(filter.offset)
        .limit(filter.limit)
        .all(db)
        .await?;

    Ok((with_context(db, page).await?, total))
}

pub async fn get_listing(db: &DatabaseConnection, listing_id: Uuid) -> Result<ListingWithContext, ApiError> {
    let listing = Listings::find_by_id(listing_id)
        .inner_join(NftProjects)
        .filter(nft_projects::Column::Status.ne(ProjectStatus::Deleted))
        .one(db)
        .await?
        .ok_or_else(|| ApiError::NotFound("Listing not found".to_string()))?;

    with_context(db, vec![listing])
        .await?
        .pop()
        .ok_or_else(|| ApiError::NotFound("Listing not found".to_string()))
}
