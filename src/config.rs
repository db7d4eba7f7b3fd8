//! Environment-driven service configuration
//!
//! Loaded once at startup (after `dotenvy::dotenv()`) and shared through `AppState`.

use std::collections::HashMap;
use std::str::FromStr;
use std::time::Duration;
use thiserror::Error;

const DEFAULT_SERVER_HOST: &str = "0.0.0.0";
const DEFAULT_SERVER_PORT: u16 = 3000;
const DEFAULT_MAX_CONNECTIONS: u32 = 10;
const DEFAULT_OPENAI_BASE_URL: &str = "https://api.openai.com/v1";
const DEFAULT_VALUATION_MODEL: &str = "gpt-4o";
const DEFAULT_SESSION_CACHE_TTL_SECS: u64 = 300;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{0} must be set")]
    Missing(&'static str),
    #[error("Invalid value for {name}: {value}")]
    Invalid { name: &'static str, value: String },
}

/// What happens to the escrow sale identifier when an active listing is suspended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RelistPolicy {
    /// Clear the sale id; relisting needs a fresh on-chain registration
    Reregister,
    /// Keep the sale id; the suspended sale can be reactivated as is
    Reuse,
}

impl FromStr for RelistPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "reregister" => Ok(RelistPolicy::Reregister),
            "reuse" => Ok(RelistPolicy::Reuse),
            other => Err(other.to_string()),
        }
    }
}

/// Key material used to verify session tokens
#[derive(Clone)]
pub enum SessionKey {
    /// HS256 shared secret
    Secret(String),
    /// RS256 public key (PEM) of the wallet-identity provider
    RsaPem(String),
}

#[derive(Clone)]
pub struct EscrowConfig {
    pub rpc_url: String,
    pub contract_address: String,
    pub usdc_address: String,
    pub operator_private_key: Option<String>,
    /// Check purchase/registration receipts before recording them
    pub verify_transactions: bool,
}

impl EscrowConfig {
    /// Escrow settings alone, for tools that never touch the database
    pub fn from_env() -> Result<Option<Self>, ConfigError> {
        let vars: HashMap<String, String> = std::env::vars().collect();
        Self::from_lookup(|name| vars.get(name).cloned())
    }

    /// `None` when `ESCROW_RPC_URL` is unset
    pub fn from_lookup<F>(lookup: F) -> Result<Option<Self>, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());

        let Some(rpc_url) = get("ESCROW_RPC_URL") else {
            return Ok(None);
        };

        Ok(Some(Self {
            rpc_url,
            contract_address: get("ESCROW_CONTRACT_ADDRESS").ok_or(ConfigError::Missing("ESCROW_CONTRACT_ADDRESS"))?,
            usdc_address: get("USDC_TOKEN_ADDRESS").ok_or(ConfigError::Missing("USDC_TOKEN_ADDRESS"))?,
            operator_private_key: get("ESCROW_OPERATOR_PRIVATE_KEY"),
            verify_transactions: parse_or(
                "ESCROW_VERIFY_TRANSACTIONS",
                get("ESCROW_VERIFY_TRANSACTIONS"),
                true,
            )?,
        }))
    }
}

#[derive(Clone)]
pub struct AppConfig {
    pub database_url: String,
    pub database_max_connections: u32,
    pub server_host: String,
    pub server_port: u16,
    pub session_key: SessionKey,
    pub session_issuer: Option<String>,
    pub session_cache_ttl: Duration,
    pub openai_api_key: Option<String>,
    pub openai_base_url: String,
    pub valuation_model: String,
    pub escrow: Option<EscrowConfig>,
    pub relist_policy: RelistPolicy,
}

impl AppConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        let vars: HashMap<String, String> = std::env::vars().collect();
        Self::from_lookup(|name| vars.get(name).cloned())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        // Empty values count as unset
        let get = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());

        let database_url = get("DATABASE_URL").ok_or(ConfigError::Missing("DATABASE_URL"))?;
        let database_max_connections =
            parse_or("DATABASE_MAX_CONNECTIONS", get("DATABASE_MAX_CONNECTIONS"), DEFAULT_MAX_CONNECTIONS)?;
        let server_host = get("SERVER_HOST").unwrap_or_else(|| DEFAULT_SERVER_HOST.to_string());
        let server_port = parse_or("SERVER_PORT", get("SERVER_PORT"), DEFAULT_SERVER_PORT)?;

        let session_key = match (get("SESSION_JWT_PUBLIC_KEY"), get("SESSION_JWT_SECRET")) {
            (Some(pem), _) => SessionKey::RsaPem(pem.replace("\\n", "\n")),
            (None, Some(secret)) => SessionKey::Secret(secret),
            (None, None) => return Err(ConfigError::Missing("SESSION_JWT_SECRET or SESSION_JWT_PUBLIC_KEY")),
        };
        let session_cache_ttl = Duration::from_secs(parse_or(
            "SESSION_CACHE_TTL_SECS",
            get("SESSION_CACHE_TTL_SECS"),
            DEFAULT_SESSION_CACHE_TTL_SECS,
        )?);

        let escrow = EscrowConfig::from_lookup(&lookup)?;

        let relist_policy = match get("RELIST_POLICY") {
            Some(raw) => raw.parse().map_err(|value| ConfigError::Invalid {
                name: "RELIST_POLICY",
                value,
            })?,
            None => RelistPolicy::Reregister,
        };

        Ok(Self {
            database_url,
            database_max_connections,
            server_host,
            server_port,
            session_key,
            session_issuer: get("SESSION_JWT_ISSUER"),
            session_cache_ttl,
            openai_api_key: get("OPENAI_API_KEY"),
            openai_base_url: get("OPENAI_BASE_URL")
                .unwrap_or_else(|| DEFAULT_OPENAI_BASE_URL.to_string()),
            valuation_model: get("VALUATION_MODEL").unwrap_or_else(|| DEFAULT_VALUATION_MODEL.to_string()),
            escrow,
            relist_policy,
        })
    }

    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.server_host, self.server_port)
    }
}

fn parse_or<T: FromStr>(name: &'static str, raw: Option<String>, default: T) -> Result<T, ConfigError> {
    match raw {
        Some(value) => value
            .trim()
            .parse()
            .map_err(|_| ConfigError::Invalid { name, value }),
        None => Ok(default),
    }
}
