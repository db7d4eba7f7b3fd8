use axum::{
    extract::{Path, State},
    Json,
};

use crate::auth::AuthUser;
use crate::error::ApiError;
use crate::extract::{parse_id, QueryParams};
use crate::models::notification::{NotificationListResponse, NotificationQuery, NotificationResponse};
use crate::services::notifications;
use crate::AppState;

/// GET /user/notifications?unreadOnly
pub async fn list_notifications(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    QueryParams(query): QueryParams<NotificationQuery>,
) -> Result<Json<NotificationListResponse>, ApiError> {
    let rows = notifications::list_for_user(&state.db, user.id, query.unread_only.unwrap_or(false)).await?;
    Ok(Json(NotificationListResponse {
        notifications: rows.into_iter().map(Into::into).collect(),
    }))
}

/// PUT /user/notifications/{id}/read
pub async fn mark_notification_read(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    Path(id): Path<String>,
) -> Result<Json<NotificationResponse>, ApiError> {
    let notification_id = parse_id(&id, "notification")?;
    let notification = notifications::mark_read(&state.db, user.id, notification_id).await?;
    Ok(Json(notification.into()))
}
