//! Local user rows for wallet-authenticated sessions

use chrono::Utc;
use sea_orm::{ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, Set};
use tracing::{debug, info};
use uuid::Uuid;

use crate::entities::{prelude::*, users};
use crate::error::ApiError;

/// Wallet identity asserted by a verified session
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionIdentity {
    pub sub: String,
    pub address: String,
    pub chain: String,
}

/// Map a session subject to its local user, creating it on first sight and
/// following address/chain rotations on later logins.
pub async fn upsert_session_user(
    db: &DatabaseConnection,
    identity: &SessionIdentity,
) -> Result<users::Model, ApiError> {
    if let Some(existing) = find_by_sub(db, &identity.sub).await? {
        if existing.address == identity.address && existing.chain == identity.chain {
            return Ok(existing);
        }

        info!(
            user_id = %existing.id,
            address = %identity.address,
            chain = %identity.chain,
            "Wallet rotated, updating user"
        );
        let mut active: users::ActiveModel = existing.into();
        active.address = Set(identity.address.clone());
        active.chain = Set(identity.chain.clone());
        active.updated_at = Set(Utc::now().into());
        return Ok(active.update(db).await?);
    }

    let now = Utc::now();
    let user = users::ActiveModel {
        id: Set(Uuid::new_v4()),
        sub: Set(identity.sub.clone()),
        address: Set(identity.address.clone()),
        chain: Set(identity.chain.clone()),
        twitter_username: Set(None),
        twitter_profile_image_url: Set(None),
        created_at: Set(now.into()),
        updated_at: Set(now.into()),
    };

    match user.insert(db).await.map_err(ApiError::from) {
        Ok(created) => {
            info!(user_id = %created.id, sub = %created.sub, "Created user for new session subject");
            Ok(created)
        }
        // Another request registered the same subject first
        Err(ApiError::Conflict(_)) => {
            debug!(sub = %identity.sub, "Concurrent user creation, re-reading");
            find_by_sub(db, &identity.sub)
                .await?
                .ok_or_else(|| ApiError::Internal("User vanished after concurrent insert".to_string()))
        }
        Err(e) => Err(e),
    }
}

pub async fn find_by_sub(db: &DatabaseConnection, sub: &str) -> Result<Option<users::Model>, ApiError> {
    Ok(Users::find()
        .filter(users::Column::Sub.eq(sub))
        .one(db)
        .await?)
}

/// Attach (or replace) the linked social profile of a user
pub async fn link_social_profile(
    db: &DatabaseConnection,
    user: users::Model,
    username: String,
    avatar: Option<String>,
) -> Result<users::Model, ApiError> {
    let mut active: users::ActiveModel = user.into();
    active.twitter_username = Set(Some(username));
    active.twitter_profile_image_url = Set(avatar);
    active.updated_at = Set(Utc::now().into());

    let updated = active.update(db).await?;
    info!(user_id = %updated.id, "Linked social profile");
    Ok(updated)
}
