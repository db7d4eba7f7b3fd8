#![allow(dead_code)]

use alloy::primitives::U256;
use async_trait::async_trait;
use axum::{
    body::Body,
    http::{header, Method, Request, StatusCode},
    Router,
};
use jsonwebtoken::{encode, EncodingKey, Header};
use sea_orm::{ConnectOptions, Database, DatabaseConnection, DbErr};
use sea_orm_migration::MigratorTrait;
use serde_json::{json, Value};
use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};
use tower::ServiceExt;
use uuid::Uuid;

use collection_market_backend::auth::SessionVerifier;
use collection_market_backend::config::AppConfig;
use collection_market_backend::routes::build_router;
use collection_market_backend::services::escrow::{EscrowError, EscrowLedger, SalePurchase, SaleRegistration};
use collection_market_backend::services::valuation::{CompletionClient, ValuationError, ValuationService};
use collection_market_backend::AppState;

pub const SESSION_SECRET: &str = "integration-test-secret";
pub const ESCROW_ADDRESS: &str = "0x00000000000000000000000000000000000000e5";
pub const COLLECTION_ADDRESS: &str = "0x00000000000000000000000000000000000000c0";

/// Set up an in-memory database with the full schema
pub async fn setup_test_db() -> Result<DatabaseConnection, DbErr> {
    // One connection: every pooled connection would get its own empty memory database
    let mut options = ConnectOptions::new("sqlite::memory:");
    options.max_connections(1).min_connections(1).sqlx_logging(false);

    let db = Database::connect(options).await?;
    migration::Migrator::up(&db, None).await?;
    Ok(db)
}

/// Valuation model that answers with a canned reply
pub struct StubCompletion {
    reply: Mutex<String>,
    prompts: Mutex<Vec<String>>,
}

impl StubCompletion {
    pub fn new() -> Self {
        Self {
            reply: Mutex::new(valuation_reply(1_000_000, "A promising collection.")),
            prompts: Mutex::new(Vec::new()),
        }
    }

    pub fn set_reply(&self, reply: impl Into<String>) {
        *self.reply.lock().unwrap() = reply.into();
    }

    pub fn prompts(&self) -> Vec<String> {
        self.prompts.lock().unwrap().clone()
    }
}

#[async_trait]
impl CompletionClient for StubCompletion {
    fn model_version(&self) -> &str {
        "stub-model"
    }

    async fn complete(&self, _system: &str, user: &str) -> Result<String, ValuationError> {
        self.prompts.lock().unwrap().push(user.to_string());
        Ok(self.reply.lock().unwrap().clone())
    }
}

pub fn valuation_reply(value: u64, report: &str) -> String {
    json!({ "estimatedValueUSD": value, "report": report }).to_string()
}

/// Escrow ledger that confirms every transaction unless told otherwise
#[derive(Default)]
pub struct StubLedger {
    rejected: Mutex<HashSet<String>>,
    confirmed: Mutex<HashMap<String, u64>>,
}

impl StubLedger {
    pub fn reject(&self, tx_hash: &str) {
        self.rejected.lock().unwrap().insert(tx_hash.to_lowercase());
    }

    /// Sale ids confirmed per transaction hash
    pub fn confirmed(&self) -> HashMap<String, u64> {
        self.confirmed.lock().unwrap().clone()
    }

    fn check(&self, tx_hash: &str, sale_id: u64) -> Result<(), EscrowError> {
        if self.rejected.lock().unwrap().contains(&tx_hash.to_lowercase()) {
            return Err(EscrowError::EventNotFound(format!("no escrow event in {}", tx_hash)));
        }
        self.confirmed.lock().unwrap().insert(tx_hash.to_lowercase(), sale_id);
        Ok(())
    }
}

#[async_trait]
impl EscrowLedger for StubLedger {
    fn escrow_address(&self) -> String {
        ESCROW_ADDRESS.to_string()
    }

    async fn confirm_registration(
        &self,
        tx_hash: &str,
        sale_id: u64,
        collection: &str,
    ) -> Result<SaleRegistration, EscrowError> {
        self.check(tx_hash, sale_id)?;
        Ok(SaleRegistration {
            sale_id,
            tx_hash: tx_hash.to_string(),
            seller: String::new(),
            collection: collection.to_string(),
            price_units: U256::ZERO,
        })
    }

    async fn confirm_purchase(
        &self,
        tx_hash: &str,
        sale_id: u64,
        buyer: Option<&str>,
    ) -> Result<SalePurchase, EscrowError> {
        self.check(tx_hash, sale_id)?;
        Ok(SalePurchase {
            sale_id,
            tx_hash: tx_hash.to_string(),
            buyer: buyer.unwrap_or_default().to_string(),
            price_units: U256::from(100_000_000u64),
        })
    }
}

pub struct TestApp {
    pub router: Router,
    pub db: DatabaseConnection,
    pub completion: Arc<StubCompletion>,
    pub ledger: Arc<StubLedger>,
}

pub async fn spawn_app() -> TestApp {
    spawn_app_with(&[]).await
}

/// Build the app with extra configuration variables
pub async fn spawn_app_with(vars: &[(&str, &str)]) -> TestApp {
    let db = setup_test_db().await.expect("test database");

    let mut env: HashMap<String, String> = HashMap::from([
        ("DATABASE_URL".to_string(), "sqlite::memory:".to_string()),
        ("SESSION_JWT_SECRET".to_string(), SESSION_SECRET.to_string()),
    ]);
    for (name, value) in vars {
        env.insert(name.to_string(), value.to_string());
    }
    let config = AppConfig::from_lookup(|name| env.get(name).cloned()).expect("test config");

    let sessions = SessionVerifier::new(&config.session_key, None, config.session_cache_ttl).expect("session verifier");
    let completion = Arc::new(StubCompletion::new());
    let ledger = Arc::new(StubLedger::default());

    let state = AppState {
        db: db.clone(),
        config: Arc::new(config),
        sessions,
        valuation: ValuationService::new(completion.clone()),
        escrow: Some(ledger.clone()),
    };

    TestApp {
        router: build_router(state),
        db,
        completion,
        ledger,
    }
}

/// Session token for a wallet, signed like the identity provider would
pub fn session_token(sub: &str, address: &str) -> String {
    let claims = json!({
        "sub": sub,
        "exp": chrono::Utc::now().timestamp() + 3600,
        "verified_credentials": [{ "address": address, "chain": "EVM" }],
    });
    encode(&Header::default(), &claims, &EncodingKey::from_secret(SESSION_SECRET.as_bytes())).unwrap()
}

pub fn wallet(n: u8) -> String {
    format!("0x{}", format!("{:02x}", n).repeat(20))
}

pub fn tx_hash(n: u8) -> String {
    format!("0x{}", format!("{:02x}", n).repeat(32))
}

pub fn project_body(name: &str) -> Value {
    json!({
        "name": name,
        "collectionAddress": COLLECTION_ADDRESS,
        "chainId": 8453,
        "description": format!("{} collection", name),
        "category": "Art",
    })
}

impl TestApp {
    pub async fn send(&self, method: Method, uri: &str, token: Option<&str>, body: Option<Value>) -> (StatusCode, Value) {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
        }
        let request = match body {
            Some(body) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(serde_json::to_vec(&body).unwrap()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };

        let response = self.router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();

        let value = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap_or_else(|_| Value::String(String::from_utf8_lossy(&bytes).to_string()))
        };
        (status, value)
    }

    pub async fn get(&self, uri: &str, token: Option<&str>) -> (StatusCode, Value) {
        self.send(Method::GET, uri, token, None).await
    }

    pub async fn post(&self, uri: &str, token: &str, body: Value) -> (StatusCode, Value) {
        self.send(Method::POST, uri, Some(token), Some(body)).await
    }

    pub async fn put(&self, uri: &str, token: &str, body: Value) -> (StatusCode, Value) {
        self.send(Method::PUT, uri, Some(token), Some(body)).await
    }

    pub async fn delete(&self, uri: &str, token: &str) -> (StatusCode, Value) {
        self.send(Method::DELETE, uri, Some(token), None).await
    }

    /// Create a draft project and return its id
    pub async fn create_project(&self, token: &str, name: &str) -> Uuid {
        let (status, body) = self.post("/projects", token, project_body(name)).await;
        assert_eq!(status, StatusCode::CREATED, "{}", body);
        body["id"].as_str().unwrap().parse().unwrap()
    }

    /// Record an escrow registration and return the listing id
    pub async fn list_project(&self, token: &str, project_id: Uuid, price: f64, sale_id: i64) -> Uuid {
        let (status, body) = self
            .post(
                "/listings",
                token,
                json!({ "projectId": project_id, "priceUSDC": price, "saleId": sale_id }),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED, "{}", body);
        body["id"].as_str().unwrap().parse().unwrap()
    }

    pub async fn project_status(&self, project_id: Uuid, token: &str) -> String {
        let (status, body) = self.get(&format!("/user/projects/{}", project_id), Some(token)).await;
        assert_eq!(status, StatusCode::OK, "{}", body);
        body["status"].as_str().unwrap().to_string()
    }
}
