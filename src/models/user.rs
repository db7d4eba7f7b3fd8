use chrono::{DateTime, FixedOffset};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::entities::users;

/// Body of `PUT /user/social`
#[derive(Debug, Clone, Deserialize)]
pub struct SocialLinkRequest {
    pub username: Option<String>,
    pub avatar: Option<String>,
}

impl SocialLinkRequest {
    pub fn validate(self) -> Result<(String, Option<String>), String> {
        let username = self
            .username
            .map(|u| u.trim().trim_start_matches('@').to_string())
            .filter(|u| !u.is_empty())
            .ok_or_else(|| "username is required".to_string())?;
        let avatar = self.avatar.map(|a| a.trim().to_string()).filter(|a| !a.is_empty());
        Ok((username, avatar))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserResponse {
    pub id: Uuid,
    pub address: String,
    pub chain: String,
    pub twitter_username: Option<String>,
    pub twitter_profile_image_url: Option<String>,
    pub created_at: DateTime<FixedOffset>,
}

impl From<users::Model> for UserResponse {
    fn from(u: users::Model) -> Self {
        Self {
            id: u.id,
            address: u.address,
            chain: u.chain,
            twitter_username: u.twitter_username,
            twitter_profile_image_url: u.twitter_profile_image_url,
            created_at: u.created_at,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_social_link_validation() {
        let request = SocialLinkRequest {
            username: Some(" @collector ".to_string()),
            avatar: Some(String::new()),
        };
        assert_eq!(request.validate().unwrap(), ("collector".to_string(), None));

        let request = SocialLinkRequest { username: None, avatar: None };
        assert!(request.validate().is_err());
    }
}
