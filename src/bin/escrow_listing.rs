//! Operator tool for escrow listings
//!
//! `list` runs the first-time listing sequence in order: collection approval,
//! sale registration on the escrow, then recording the listing with the
//! backend. `buy` approves the USDC spend, buys the sale on the escrow, then
//! records the purchase. `cancel` cancels the sale on-chain, then removes the
//! listing. Each step only runs when the previous one succeeded.

use anyhow::{bail, Context};
use reqwest::Client;
use rust_decimal::Decimal;
use serde_json::json;
use std::env;
use std::str::FromStr;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use uuid::Uuid;

use collection_market_backend::config::EscrowConfig;
use collection_market_backend::entities::sea_orm_active_enums::ProjectStatus;
use collection_market_backend::models::listing::{validate_price, ListingResponse, ListingWithContext};
use collection_market_backend::models::project::{ProjectDetail, ProjectResponse};
use collection_market_backend::models::transaction::TransactionResponse;
use collection_market_backend::services::escrow::{EscrowClient, EscrowLedger};

const DEFAULT_BACKEND_URL: &str = "http://localhost:3000";

fn usage() -> ! {
    eprintln!("Usage:");
    eprintln!("  cargo run --bin escrow_listing list <project_id> <price_usdc>");
    eprintln!("  cargo run --bin escrow_listing buy <project_id>");
    eprintln!("  cargo run --bin escrow_listing cancel <listing_id>");
    eprintln!("Example: cargo run --bin escrow_listing list 6f1c0c3e-4b1e-4d7a-9a51-1f2b3c4d5e6f 250.5");
    std::process::exit(1);
}

/// Authenticated calls to the marketplace backend
struct Backend {
    client: Client,
    base_url: String,
    token: String,
}

impl Backend {
    fn from_env() -> anyhow::Result<Self> {
        let token = env::var("BACKEND_SESSION_TOKEN").context("BACKEND_SESSION_TOKEN must be set")?;
        let base_url = env::var("BACKEND_URL").unwrap_or_else(|_| DEFAULT_BACKEND_URL.to_string());
        Ok(Self {
            client: Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
            token,
        })
    }

    async fn send<T: serde::de::DeserializeOwned>(&self, request: reqwest::RequestBuilder) -> anyhow::Result<T> {
        let response = request.bearer_auth(&self.token).send().await?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            bail!("Backend returned {}: {}", status, body);
        }
        Ok(response.json().await?)
    }

    async fn own_project(&self, project_id: Uuid) -> anyhow::Result<ProjectDetail> {
        self.send(self.client.get(format!("{}/user/projects/{}", self.base_url, project_id)))
            .await
    }

    async fn project(&self, project_id: Uuid) -> anyhow::Result<ProjectDetail> {
        self.send(self.client.get(format!("{}/projects/{}", self.base_url, project_id)))
            .await
    }

    async fn record_purchase(&self, project_id: Uuid, tx_hash: &str) -> anyhow::Result<TransactionResponse> {
        self.send(
            self.client
                .post(format!("{}/projects/{}/purchase", self.base_url, project_id))
                .json(&json!({ "txHash": tx_hash })),
        )
        .await
    }

    async fn listing(&self, listing_id: Uuid) -> anyhow::Result<ListingWithContext> {
        self.send(self.client.get(format!("{}/listings/{}", self.base_url, listing_id)))
            .await
    }

    async fn record_listing(&self, body: serde_json::Value) -> anyhow::Result<ListingResponse> {
        self.send(self.client.post(format!("{}/listings", self.base_url)).json(&body))
            .await
    }

    async fn cancel_listing(&self, listing_id: Uuid) -> anyhow::Result<ProjectResponse> {
        self.send(self.client.delete(format!("{}/listings/{}", self.base_url, listing_id)))
            .await
    }
}

async fn list(escrow: &EscrowClient, backend: &Backend, project_id: Uuid, price: Decimal) -> anyhow::Result<()> {
    let detail = backend.own_project(project_id).await?;
    let project = detail.project;
    if !matches!(project.status, ProjectStatus::Draft | ProjectStatus::Suspended) {
        bail!("Project {} is {}, only draft or suspended projects can be listed", project.id, project.status);
    }

    // 1. Collection approval
    match escrow.approve_collection(&project.collection_address).await? {
        Some(tx_hash) => tracing::info!("Collection approved for escrow: {}", tx_hash),
        None => tracing::info!("Collection already approved for escrow"),
    }

    // 2. Sale registration
    let registration = escrow.register_sale(&project.collection_address, price).await?;
    tracing::info!(
        "Sale {} registered at {} USDC in {}",
        registration.sale_id,
        price,
        registration.tx_hash
    );

    // 3. Backend recording
    let body = json!({
        "projectId": project.id,
        "priceUSDC": price,
        "saleId": registration.sale_id,
        "escrowAddress": escrow.escrow_address(),
        "txHash": registration.tx_hash,
    });
    let listing = backend.record_listing(body).await.with_context(|| {
        format!(
            "Sale {} is registered on-chain ({}) but the backend did not record it; retry the recording",
            registration.sale_id, registration.tx_hash
        )
    })?;

    tracing::info!("Listing {} recorded, project {} is active", listing.id, project.id);
    Ok(())
}

/// Sale id and price of an active project listed on `escrow_address`
fn purchasable_sale(detail: &ProjectDetail, escrow_address: &str) -> anyhow::Result<(u64, Decimal)> {
    if detail.project.status != ProjectStatus::Active {
        bail!("Project {} is {}, only active projects can be bought", detail.project.id, detail.project.status);
    }
    let listing = detail.listing.as_ref().context("Project has no listing")?;
    let sale_id = listing.sale_id.context("Listing has no registered sale")?;
    let sale_id = u64::try_from(sale_id).context("Negative sale id")?;
    if listing.escrow_address.as_deref().is_some_and(|e| !e.eq_ignore_ascii_case(escrow_address)) {
        bail!("Listing {} is registered on another escrow contract", listing.id);
    }
    Ok((sale_id, listing.price_usdc))
}

async fn buy(escrow: &EscrowClient, backend: &Backend, project_id: Uuid) -> anyhow::Result<()> {
    let detail = backend.project(project_id).await?;
    let (sale_id, price) = purchasable_sale(&detail, &escrow.escrow_address())?;

    // 1. USDC spend approval
    let approval = escrow.approve_usdc(price).await?;
    tracing::info!("Approved {} USDC for escrow: {}", price, approval);

    // 2. Purchase on the escrow
    let tx_hash = escrow.buy(sale_id).await?;
    tracing::info!("Sale {} bought in {}", sale_id, tx_hash);

    // 3. Backend recording
    let transaction = backend.record_purchase(project_id, &tx_hash).await.with_context(|| {
        format!(
            "Sale {} is bought on-chain ({}) but the backend did not record it; retry the recording",
            sale_id, tx_hash
        )
    })?;

    tracing::info!("Purchase {} recorded, project {} is sold", transaction.id, project_id);
    Ok(())
}

async fn cancel(escrow: &EscrowClient, backend: &Backend, listing_id: Uuid) -> anyhow::Result<()> {
    let listing = backend.listing(listing_id).await?;
    if listing.project.status == ProjectStatus::Sold {
        bail!("Listing {} is already sold", listing_id);
    }

    match listing.listing.sale_id {
        Some(sale_id) => {
            let sale_id = u64::try_from(sale_id).context("Negative sale id")?;
            let tx_hash = escrow.cancel_sale(sale_id).await?;
            tracing::info!("Sale {} cancelled on-chain: {}", sale_id, tx_hash);
        }
        None => tracing::warn!("Listing {} has no registered sale, skipping on-chain cancel", listing_id),
    }

    let project = backend.cancel_listing(listing_id).await?;
    tracing::info!("Listing {} removed, project {} is {}", listing_id, project.id, project.status);
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,collection_market_backend=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load environment variables
    dotenvy::dotenv().ok();

    let args: Vec<String> = env::args().collect();
    if args.len() < 3 {
        usage();
    }

    let escrow_config = EscrowConfig::from_env()?.context("ESCROW_RPC_URL must be set")?;
    if escrow_config.operator_private_key.is_none() {
        bail!("ESCROW_OPERATOR_PRIVATE_KEY must be set");
    }
    let escrow = EscrowClient::new(&escrow_config)?;
    let chain_id = escrow.chain_id().await?;
    tracing::info!(
        "Operator {} on chain {}",
        escrow.operator_address().unwrap_or_default(),
        chain_id
    );

    let backend = Backend::from_env()?;

    match (args[1].as_str(), args.len()) {
        ("list", 4) => {
            let project_id = Uuid::parse_str(&args[2]).context("Invalid project id")?;
            let price = Decimal::from_str(&args[3]).context("Invalid price")?;
            let price = validate_price(price).map_err(anyhow::Error::msg)?;
            list(&escrow, &backend, project_id, price).await
        }
        ("buy", 3) => {
            let project_id = Uuid::parse_str(&args[2]).context("Invalid project id")?;
            buy(&escrow, &backend, project_id).await
        }
        ("cancel", 3) => {
            let listing_id = Uuid::parse_str(&args[2]).context("Invalid listing id")?;
            cancel(&escrow, &backend, listing_id).await
        }
        _ => usage(),
    }
}
