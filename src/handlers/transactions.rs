//! Transaction Handlers

use axum::{extract::State, http::StatusCode, Json};
use tracing::info;

use crate::auth::AuthUser;
use crate::error::ApiError;
use crate::extract::{JsonBody, QueryParams};
use crate::models::pagination::{page_window, Pagination};
use crate::models::transaction::{
    CreateTransactionRequest, TransactionListQuery, TransactionListResponse, TransactionResponse,
};
use crate::services::purchase;
use crate::AppState;

/// GET /transactions?buyerId&listingId&projectId&limit&offset
pub async fn list_transactions(
    State(state): State<AppState>,
    QueryParams(query): QueryParams<TransactionListQuery>,
) -> Result<Json<TransactionListResponse>, ApiError> {
    let (limit, offset) = page_window(query.limit, query.offset).map_err(ApiError::Validation)?;

    let filter = purchase::TransactionFilter {
        buyer_id: query.buyer_id,
        listing_id: query.listing_id,
        project_id: query.project_id,
        limit,
        offset,
    };
    let (transactions, total) = purchase::list_transactions(&state.db, &filter).await?;

    Ok(Json(TransactionListResponse {
        transactions: transactions.into_iter().map(Into::into).collect(),
        pagination: Pagination { total, limit, offset },
    }))
}

/// Record a purchase keyed by listing
///
/// POST /transactions
pub async fn create_transaction(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    JsonBody(request): JsonBody<CreateTransactionRequest>,
) -> Result<(StatusCode, Json<TransactionResponse>), ApiError> {
    let tx_hash = request
        .tx_hash
        .ok_or_else(|| ApiError::Validation("txHash is required".to_string()))?;

    info!(listing_id = %request.listing_id, buyer_id = %user.id, tx_hash = %tx_hash, "Transaction recording received");

    let outcome = purchase::purchase(
        &state.db,
        state.escrow.as_deref(),
        &user,
        purchase::PurchaseTarget::Listing(request.listing_id),
        &tx_hash,
    )
    .await?;

    let status = if outcome.replayed { StatusCode::OK } else { StatusCode::CREATED };
    Ok((status, Json(outcome.transaction.into())))
}
