//! Listing Handlers

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use tracing::{info, warn};

use crate::auth::AuthUser;
use crate::entities::sea_orm_active_enums::ProjectStatus;
use crate::error::ApiError;
use crate::extract::{parse_id, JsonBody, QueryParams};
use crate::models::listing::{
    CreateListingRequest, ListingListQuery, ListingListResponse, ListingResponse, ListingWithContext,
    UpdateListingRequest,
};
use crate::models::pagination::{page_window, Pagination};
use crate::models::project::ProjectResponse;
use crate::services::listings;
use crate::AppState;

/// GET /listings?projectId&sellerId&status&limit&offset
pub async fn list_listings(
    State(state): State<AppState>,
    QueryParams(query): QueryParams<ListingListQuery>,
) -> Result<Json<ListingListResponse>, ApiError> {
    let (limit, offset) = page_window(query.limit, query.offset).map_err(ApiError::Validation)?;
    let status = query
        .status
        .as_deref()
        .map(str::parse::<ProjectStatus>)
        .transpose()
        .map_err(|_| ApiError::Validation("Invalid status".to_string()))?;

    let filter = listings::ListingFilter {
        project_id: query.project_id,
        seller_id: query.seller_id,
        status,
        limit,
        offset,
    };
    let (listings, total) = listings::list_listings(&state.db, &filter).await?;

    Ok(Json(ListingListResponse {
        listings,
        pagination: Pagination { total, limit, offset },
    }))
}

/// GET /listings/{id}
pub async fn get_listing(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<ListingWithContext>, ApiError> {
    let listing_id = parse_id(&id, "listing")?;
    Ok(Json(listings::get_listing(&state.db, listing_id).await?))
}

/// Record an escrow registration and activate the project
///
/// POST /listings
///
/// Replaying the same registration answers 200 with the stored listing.
pub async fn create_listing(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    JsonBody(request): JsonBody<CreateListingRequest>,
) -> Result<(StatusCode, Json<ListingResponse>), ApiError> {
    request.validate().map_err(|e| {
        warn!(user_id = %user.id, error = %e, "Rejected listing registration");
        ApiError::Validation(e)
    })?;

    info!(
        project_id = %request.project_id,
        sale_id = request.sale_id,
        price_usdc = %request.price_usdc,
        "Listing registration received"
    );

    let registration = listings::ListingRegistration {
        project_id: request.project_id,
        price_usdc: request.price_usdc,
        sale_id: request.sale_id,
        escrow_address: request.escrow_address,
        tx_hash: request.tx_hash,
    };
    let default_escrow = state.config.escrow.as_ref().map(|e| e.contract_address.as_str());

    let (listing, created) =
        listings::record_listing(&state.db, state.escrow.as_deref(), &user, registration, default_escrow).await?;

    let status = if created { StatusCode::CREATED } else { StatusCode::OK };
    Ok((status, Json(listing.into())))
}

/// PUT /listings/{id}
pub async fn update_listing(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    Path(id): Path<String>,
    JsonBody(request): JsonBody<UpdateListingRequest>,
) -> Result<Json<ListingResponse>, ApiError> {
    let listing_id = parse_id(&id, "listing")?;
    request.validate().map_err(ApiError::Validation)?;

    let listing = listings::update_listing(&state.db, state.escrow.as_deref(), &user, listing_id, request).await?;
    Ok(Json(listing.into()))
}

/// Cancel a listing; returns the project in its new state
///
/// DELETE /listings/{id}
pub async fn delete_listing(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    Path(id): Path<String>,
) -> Result<Json<ProjectResponse>, ApiError> {
    let listing_id = parse_id(&id, "listing")?;
    info!(listing_id = %listing_id, user_id = %user.id, "Listing cancellation received");

    let project = listings::cancel_listing(&state.db, &user, listing_id).await?;
    Ok(Json(project.into()))
}
