//! AI valuation of NFT projects
//!
//! Builds a deterministic prompt from the project and its disclosures, asks
//! a chat-completion model for a JSON verdict and keeps one current report
//! per project.

use async_trait::async_trait;
use chrono::Utc;
use reqwest::Client;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use sea_orm::{
    sea_query::OnConflict, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, Set, TransactionTrait,
};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tracing::{error, info};
use uuid::Uuid;

use crate::entities::{nft_projects, prelude::*, project_disclosures, users, valuation_reports};
use crate::error::ApiError;
use crate::services::notifications::{emit, valuation_notice};
use crate::services::projects::{list_disclosures, load_owned};

const REQUEST_TIMEOUT: Duration = Duration::from_secs(180);

/// Largest value the `NUMERIC(16, 2)` column holds
const MAX_ESTIMATE_USD: Decimal = dec!(99999999999999.99);

pub const SYSTEM_PROMPT: &str =
    "You are an expert in NFT valuation. Analyze the following NFT project and provide a detailed valuation report.";

const REPORT_INSTRUCTIONS: &str = r#"Please provide:
Please prepare a detailed report evaluating the investment value of the following NFT projects.
Please summarize the entire report in 3,000-4,000 words in English and output in Markdown format.
Please include the following items

1. Project Summary.
   - Objective/vision, major NFT collections, chains, number of issues
2. Market Environment/Competitive Analysis
   - Comparison with 2-3 similar projects (size, use cases, market valuation)
3. Demand-side indicators
   - On-chain data including primary/secondary distribution volume, number of holders, resale rate, average holding period, etc.
4. Supply-side indicators
   - Total supply, release schedule, burn/staking availability
5. Team and community analysis
   - Core member biographies, community size (Discord / X followers), engagement metrics
6. Tokenomics & Cash Flow
   - Royalty rates, operating revenue sources, use of funds, treasury balance
7. Development Progress & Roadmap
   - Past milestones achieved and planned for the next 6-12 months
8. Risk Factors.
   - Regulations, market volatility, dependent platforms, smart contract vulnerabilities
9. Valuation Methodology and Estimates
   - (i) DCF (discounted future royalties), (ii) Relative value (similar collection multiples), (iii) On-chain indicators (e.g., NVT)
   - Assumptions for each method, sensitivity analysis, and valuation by range
10. Final valuation in USDC

The response should be a JSON object like below.
Do not include any other text or formatting like ```json or ```


{
  "estimatedValueUSD": 1000000,
  "report": "This NFT project is worth 1 million USDC."
}
"#;

#[derive(Debug, Error)]
pub enum ValuationError {
    #[error("Valuation model API key is not configured")]
    MissingApiKey,
    #[error("Valuation model request failed: {0}")]
    Request(#[from] reqwest::Error),
    #[error("Valuation model returned HTTP {status}: {body}")]
    Status { status: u16, body: String },
    #[error("Invalid response from valuation model: {0}")]
    InvalidResponse(String),
}

impl From<ValuationError> for ApiError {
    fn from(err: ValuationError) -> Self {
        match err {
            ValuationError::InvalidResponse(_) => {
                ApiError::Upstream("Invalid response from valuation model".to_string())
            }
            other => ApiError::Upstream(other.to_string()),
        }
    }
}

/// Chat-completion backend of the valuation service
#[async_trait]
pub trait CompletionClient: Send + Sync {
    /// Version string stored with each report
    fn model_version(&self) -> &str;

    /// Return the raw assistant message for a system + user prompt
    async fn complete(&self, system: &str, user: &str) -> Result<String, ValuationError>;
}

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    response_format: Value,
}

#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChatResponseMessage,
}

#[derive(Deserialize)]
struct ChatResponseMessage {
    content: Option<String>,
}

/// OpenAI-compatible chat-completions client
#[derive(Clone)]
pub struct OpenAiClient {
    client: Client,
    api_key: Option<String>,
    base_url: String,
    model: String,
}

impl OpenAiClient {
    pub fn new(api_key: Option<String>, base_url: String, model: String) -> Self {
        let client = Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .unwrap_or_else(|_| Client::new());

        Self {
            client,
            api_key,
            base_url: base_url.trim_end_matches('/').to_string(),
            model,
        }
    }
}

#[async_trait]
impl CompletionClient for OpenAiClient {
    fn model_version(&self) -> &str {
        &self.model
    }

    async fn complete(&self, system: &str, user: &str) -> Result<String, ValuationError> {
        let api_key = self.api_key.as_deref().ok_or(ValuationError::MissingApiKey)?;

        let request = ChatRequest {
            model: &self.model,
            messages: vec![
                ChatMessage { role: "system", content: system },
                ChatMessage { role: "user", content: user },
            ],
            response_format: serde_json::json!({ "type": "json_object" }),
        };

        let response = self
            .client
            .post(format!("{}/chat/completions", self.base_url))
            .bearer_auth(api_key)
            .json(&request)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ValuationError::Status {
                status: status.as_u16(),
                body: body.chars().take(500).collect(),
            });
        }

        let parsed: ChatResponse = response.json().await?;
        parsed
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .ok_or_else(|| ValuationError::InvalidResponse("empty completion".to_string()))
    }
}

/// Parsed model verdict
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Valuation {
    pub estimated_value_usd: Decimal,
    pub report: String,
}

/// User prompt for a project; identical inputs give identical prompts
pub fn build_prompt(project: &nft_projects::Model, disclosures: &[project_disclosures::Model]) -> String {
    let revenue = project
        .ltm_revenue_usd
        .filter(|r| !r.is_zero())
        .map(|r| r.normalize().to_string())
        .unwrap_or_else(|| "N/A".to_string());

    let disclosure_lines = if disclosures.is_empty() {
        "N/A".to_string()
    } else {
        disclosures
            .iter()
            .map(|d| format!("{}: {}", d.disclosure_type.as_str(), d.title))
            .collect::<Vec<_>>()
            .join("\n")
    };

    format!(
        "Please analyze this NFT project and provide a valuation:\n\
         Name: {}\n\
         Collection Address: {}\n\
         Description: {}\n\
         Category: {}\n\
         Chain: {}\n\
         Last 12 Months Revenue: {}\n\
         Disclosures: {}\n\
         \n\
         {}",
        project.name,
        project.collection_address,
        project.description,
        project.category.as_str(),
        project.chain_id,
        revenue,
        disclosure_lines,
        REPORT_INSTRUCTIONS,
    )
}

/// Parse the model answer: a bare JSON object with a positive
/// `estimatedValueUSD` and a non-empty `report`
pub fn parse_response(raw: &str) -> Result<Valuation, ValuationError> {
    let value: Value = serde_json::from_str(raw.trim())
        .map_err(|e| ValuationError::InvalidResponse(format!("not JSON: {}", e)))?;
    let object = value
        .as_object()
        .ok_or_else(|| ValuationError::InvalidResponse("not a JSON object".to_string()))?;

    let estimate = match object.get("estimatedValueUSD") {
        Some(Value::Number(n)) => Decimal::from_str(&n.to_string())
            .or_else(|_| Decimal::from_scientific(&n.to_string()))
            .ok(),
        Some(Value::String(s)) => Decimal::from_str(s.trim()).ok(),
        _ => None,
    }
    .ok_or_else(|| ValuationError::InvalidResponse("estimatedValueUSD missing or not numeric".to_string()))?
    .round_dp(2);

    if estimate <= Decimal::ZERO {
        return Err(ValuationError::InvalidResponse("estimatedValueUSD must be positive".to_string()));
    }
    if estimate > MAX_ESTIMATE_USD {
        return Err(ValuationError::InvalidResponse("estimatedValueUSD out of range".to_string()));
    }

    let report = object
        .get("report")
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|r| !r.is_empty())
        .ok_or_else(|| ValuationError::InvalidResponse("report missing or empty".to_string()))?;

    Ok(Valuation {
        estimated_value_usd: estimate,
        report: report.to_string(),
    })
}

#[derive(Clone)]
pub struct ValuationService {
    client: Arc<dyn CompletionClient>,
}

impl ValuationService {
    pub fn new(client: Arc<dyn CompletionClient>) -> Self {
        Self { client }
    }

    /// Generate (or regenerate) the report of one of `owner`'s projects.
    ///
    /// Nothing is written when the model call fails or its answer is unusable.
    pub async fn generate(
        &self,
        db: &DatabaseConnection,
        owner: &users::Model,
        project_id: Uuid,
    ) -> Result<valuation_reports::Model, ApiError> {
        let project = load_owned(db, owner, project_id).await?;
        let disclosures = list_disclosures(db, project.id, None).await?;
        let prompt = build_prompt(&project, &disclosures);

        info!(project_id = %project.id, model = %self.client.model_version(), "Requesting valuation");

        let raw = self
            .client
            .complete(SYSTEM_PROMPT, &prompt)
            .await
            .inspect_err(|e| error!(project_id = %project.id, error = %e, "Valuation model call failed"))?;
        let valuation = parse_response(&raw)
            .inspect_err(|e| error!(project_id = %project.id, error = %e, "Unusable valuation response"))?;

        let now = Utc::now();
        let row = valuation_reports::ActiveModel {
            id: Set(Uuid::new_v4()),
            project_id: Set(project.id),
            estimated_value_usd: Set(valuation.estimated_value_usd),
            model_version: Set(self.client.model_version().to_string()),
            report: Set(valuation.report),
            created_at: Set(now.into()),
            updated_at: Set(now.into()),
        };

        let txn = db.begin().await?;
        ValuationReports::insert(row)
            .on_conflict(
                OnConflict::column(valuation_reports::Column::ProjectId)
                    .update_columns([
                        valuation_reports::Column::EstimatedValueUsd,
                        valuation_reports::Column::ModelVersion,
                        valuation_reports::Column::Report,
                        valuation_reports::Column::UpdatedAt,
                    ])
                    .to_owned(),
            )
            .exec_without_returning(&txn)
            .await?;

        let report = ValuationReports::find()
            .filter(valuation_reports::Column::ProjectId.eq(project.id))
            .one(&txn)
            .await?
            .ok_or_else(|| ApiError::Internal("Valuation report missing after upsert".to_string()))?;

        emit(&txn, valuation_notice(&project, &report)).await?;
        txn.commit().await?;

        info!(
            project_id = %project.id,
            report_id = %report.id,
            estimated_value_usd = %report.estimated_value_usd,
            "Valuation report stored"
        );
        Ok(report)
    }
}

/// Current report of a live project
pub async fn current_report(
    db: &DatabaseConnection,
    project_id: Uuid,
) -> Result<valuation_reports::Model, ApiError> {
    crate::services::projects::find_live_project(db, project_id).await?;
    ValuationReports::find()
        .filter(valuation_reports::Column::ProjectId.eq(project_id))
        .one(db)
        .await?
        .ok_or_else(|| ApiError::NotFound("Valuation report not found".to_string()))
}
