//! Notification emitter and feed queries

use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder, Set,
};
use serde_json::json;
use tracing::info;
use uuid::Uuid;

use crate::entities::{
    listings, nft_projects, notifications, prelude::*, sea_orm_active_enums::NotificationType, transactions,
    valuation_reports,
};
use crate::error::ApiError;

/// Seller-facing notification for a recorded purchase
pub fn purchase_notice(
    project: &nft_projects::Model,
    listing: &listings::Model,
    transaction: &transactions::Model,
) -> notifications::ActiveModel {
    new_notice(
        project.owner_id,
        NotificationType::Purchase,
        "NFT Purchased",
        format!("Your NFT project \"{}\" has been purchased.", project.name),
        project.id,
        json!({
            "listingId": listing.id,
            "transactionId": transaction.id,
            "buyerId": transaction.buyer_id,
            "txHash": transaction.tx_hash,
            "priceUSDC": transaction.price_usdc.to_string(),
        }),
    )
}

/// Owner-facing notification for a generated valuation
pub fn valuation_notice(
    project: &nft_projects::Model,
    report: &valuation_reports::Model,
) -> notifications::ActiveModel {
    new_notice(
        project.owner_id,
        NotificationType::ValuationCompleted,
        "Valuation Completed",
        format!("The valuation report for \"{}\" is ready.", project.name),
        project.id,
        json!({
            "reportId": report.id,
            "estimatedValueUSD": report.estimated_value_usd.to_string(),
            "modelVersion": report.model_version,
        }),
    )
}

fn new_notice(
    user_id: Uuid,
    notification_type: NotificationType,
    title: &str,
    message: String,
    project_id: Uuid,
    metadata: serde_json::Value,
) -> notifications::ActiveModel {
    let now = Utc::now();
    notifications::ActiveModel {
        id: Set(Uuid::new_v4()),
        user_id: Set(user_id),
        notification_type: Set(notification_type),
        title: Set(title.to_string()),
        message: Set(message),
        project_id: Set(project_id),
        read: Set(false),
        metadata: Set(Some(metadata)),
        created_at: Set(now.into()),
        updated_at: Set(now.into()),
    }
}

/// Insert a notification on `conn`, usually the transaction of the step that caused it
pub async fn emit<C: ConnectionTrait>(
    conn: &C,
    notice: notifications::ActiveModel,
) -> Result<notifications::Model, ApiError> {
    let created = notice.insert(conn).await?;
    info!(
        notification_id = %created.id,
        user_id = %created.user_id,
        project_id = %created.project_id,
        "Notification emitted"
    );
    Ok(created)
}

/// A user's notifications, newest first
pub async fn list_for_user(
    db: &DatabaseConnection,
    user_id: Uuid,
    unread_only: bool,
) -> Result<Vec<notifications::Model>, ApiError> {
    let mut query = Notifications::find().filter(notifications::Column::UserId.eq(user_id));
    if unread_only {
        query = query.filter(notifications::Column::Read.eq(false));
    }

    Ok(query
        .order_by_desc(notifications::Column::CreatedAt)
        .all(db)
        .await?)
}

/// Flip `read` on one of the user's notifications
pub async fn mark_read(
    db: &DatabaseConnection,
    user_id: Uuid,
    notification_id: Uuid,
) -> Result<notifications::Model, ApiError> {
    let notification = Notifications::find_by_id(notification_id)
        .filter(notifications::Column::UserId.eq(user_id))
        .one(db)
        .await?
        .ok_or_else(|| ApiError::NotFound("Notification not found".to_string()))?;

    if notification.read {
        return Ok(notification);
    }

    let mut active: notifications::ActiveModel = notification.into();
    active.read = Set(true);
    active.updated_at = Set(Utc::now().into());
    Ok(active.update(db).await?)
}
