//! Bearer-session verification and the authenticated-user extractor
//!
//! Sessions are JWTs minted by the external wallet-identity provider. The
//! backend only verifies them and maps the subject to a local `users` row.

use axum::{
    extract::FromRequestParts,
    http::{header::AUTHORIZATION, request::Parts},
};
use jsonwebtoken::{decode, Algorithm, DecodingKey, Validation};
use moka::future::Cache;
use sea_orm::DatabaseConnection;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, warn};

use crate::config::SessionKey;
use crate::entities::users;
use crate::error::ApiError;
use crate::services::users::{upsert_session_user, SessionIdentity};
use crate::AppState;

#[derive(Debug, Error)]
pub enum SessionError {
    #[error("Missing bearer token")]
    Missing,
    #[error("Malformed authorization header")]
    Malformed,
    #[error("Invalid session token: {0}")]
    Invalid(#[from] jsonwebtoken::errors::Error),
    #[error("Invalid session key: {0}")]
    Key(String),
}

impl From<SessionError> for ApiError {
    fn from(_: SessionError) -> Self {
        ApiError::Unauthorized
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct VerifiedCredential {
    #[serde(default)]
    pub address: Option<String>,
    #[serde(default)]
    pub chain: Option<String>,
}

/// Claims the identity provider puts in a session token
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionClaims {
    pub sub: String,
    pub exp: usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub iss: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub chain: Option<String>,
    #[serde(default)]
    pub verified_credentials: Vec<VerifiedCredential>,
}

impl SessionClaims {
    /// The wallet of the session: the first verified credential, falling back
    /// to the top-level claims
    pub fn identity(&self) -> SessionIdentity {
        let credential = self.verified_credentials.first();
        let address = credential
            .and_then(|c| c.address.clone())
            .or_else(|| self.address.clone())
            .unwrap_or_default();
        let chain = credential
            .and_then(|c| c.chain.clone())
            .or_else(|| self.chain.clone())
            .unwrap_or_default();

        SessionIdentity {
            sub: self.sub.clone(),
            address: normalize_address(&address),
            chain,
        }
    }
}

fn normalize_address(address: &str) -> String {
    let trimmed = address.trim();
    if trimmed.starts_with("0x") {
        trimmed.to_lowercase()
    } else {
        trimmed.to_string()
    }
}

/// Verifies session tokens and caches the subject → user mapping
#[derive(Clone)]
pub struct SessionVerifier {
    decoding_key: Arc<DecodingKey>,
    validation: Arc<Validation>,
    users: Cache<String, users::Model>,
}

impl SessionVerifier {
    pub fn new(key: &SessionKey, issuer: Option<&str>, cache_ttl: Duration) -> Result<Self, SessionError> {
        let (decoding_key, algorithm) = match key {
            SessionKey::Secret(secret) => (DecodingKey::from_secret(secret.as_bytes()), Algorithm::HS256),
            SessionKey::RsaPem(pem) => (
                DecodingKey::from_rsa_pem(pem.as_bytes()).map_err(|e| SessionError::Key(e.to_string()))?,
                Algorithm::RS256,
            ),
        };

        let mut validation = Validation::new(algorithm);
        validation.set_required_spec_claims(&["exp", "sub"]);
        if let Some(issuer) = issuer {
            validation.set_issuer(&[issuer]);
        }

        let users = Cache::builder()
            .time_to_live(cache_ttl)
            .max_capacity(10_000)
            .build();

        Ok(Self {
            decoding_key: Arc::new(decoding_key),
            validation: Arc::new(validation),
            users,
        })
    }

    pub fn verify(&self, token: &str) -> Result<SessionClaims, SessionError> {
        let data = decode::<SessionClaims>(token, &self.decoding_key, &self.validation)?;
        Ok(data.claims)
    }

    /// Resolve the local user of a verified session
    pub async fn resolve_user(
        &self,
        db: &DatabaseConnection,
        claims: &SessionClaims,
    ) -> Result<users::Model, ApiError> {
        let identity = claims.identity();

        if let Some(cached) = self.users.get(&identity.sub).await {
            if cached.address == identity.address && cached.chain == identity.chain {
                return Ok(cached);
            }
        }

        let user = upsert_session_user(db, &identity).await?;
        self.users.insert(identity.sub.clone(), user.clone()).await;
        Ok(user)
    }

    /// Drop a cached user after its row changed
    pub async fn forget(&self, sub: &str) {
        self.users.invalidate(sub).await;
    }
}

fn bearer_token(parts: &Parts) -> Result<&str, SessionError> {
    let header = parts.headers.get(AUTHORIZATION).ok_or(SessionError::Missing)?;
    let value = header.to_str().map_err(|_| SessionError::Malformed)?;
    let token = value
        .strip_prefix("Bearer ")
        .or_else(|| value.strip_prefix("bearer "))
        .ok_or(SessionError::Malformed)?
        .trim();

    if token.is_empty() {
        return Err(SessionError::Missing);
    }
    Ok(token)
}

/// The caller's local user; rejects with 401 when the session is missing or invalid
pub struct AuthUser(pub users::Model);

impl FromRequestParts<AppState> for AuthUser {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let token = bearer_token(parts).inspect_err(|e| debug!(error = %e, "No usable session"))?;

        let claims = state
            .sessions
            .verify(token)
            .inspect_err(|e| warn!(error = %e, "Session verification failed"))?;

        let user = state.sessions.resolve_user(&state.db, &claims).await?;
        Ok(AuthUser(user))
    }
}
