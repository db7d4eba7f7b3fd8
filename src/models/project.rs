use chrono::{DateTime, FixedOffset};
use lazy_static::lazy_static;
use regex::Regex;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Deserializer, Serialize};
use uuid::Uuid;

use crate::entities::{
    nft_projects, project_disclosures,
    sea_orm_active_enums::{DisclosureType, ProjectCategory, ProjectStatus},
    users,
};
use crate::models::listing::ListingResponse;
use crate::models::pagination::Pagination;
use crate::models::valuation::ValuationReportResponse;

lazy_static! {
    static ref EVM_ADDRESS: Regex = Regex::new(r"^0x[0-9a-fA-F]{40}$").unwrap();
}

pub const MAX_NAME_LEN: usize = 200;

/// Largest revenue the `NUMERIC(16, 2)` column holds
pub const MAX_LTM_REVENUE_USD: Decimal = dec!(99999999999999.99);

pub fn is_evm_address(value: &str) -> bool {
    EVM_ADDRESS.is_match(value)
}

/// Accepts `"8453"` as well as `8453`
fn string_or_number<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    match Option::<serde_json::Value>::deserialize(deserializer)? {
        None | Some(serde_json::Value::Null) => Ok(None),
        Some(serde_json::Value::String(s)) => Ok(Some(s)),
        Some(serde_json::Value::Number(n)) => Ok(Some(n.to_string())),
        Some(other) => Err(serde::de::Error::custom(format!(
            "expected a string or number, got {}",
            other
        ))),
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DisclosureInput {
    pub disclosure_type: Option<String>,
    pub title: Option<String>,
    pub description: Option<String>,
}

/// Body of `POST /projects` and `PUT /projects/{id}`
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectRequest {
    pub name: Option<String>,
    pub image: Option<String>,
    pub collection_address: Option<String>,
    #[serde(default, deserialize_with = "string_or_number")]
    pub chain_id: Option<String>,
    pub description: Option<String>,
    pub category: Option<String>,
    pub royalty_pct: Option<Decimal>,
    #[serde(rename = "ltmRevenueUSD")]
    pub ltm_revenue_usd: Option<Decimal>,
    #[serde(rename = "metadataCID")]
    pub metadata_cid: Option<String>,
    pub disclosures: Option<Vec<DisclosureInput>>,
}

/// Validated project fields
#[derive(Debug, Clone, PartialEq)]
pub struct ProjectDraft {
    pub name: String,
    pub image: Option<String>,
    pub collection_address: String,
    pub chain_id: String,
    pub description: String,
    pub category: ProjectCategory,
    pub royalty_pct: Option<Decimal>,
    pub ltm_revenue_usd: Option<Decimal>,
    pub metadata_cid: Option<String>,
    /// `None` leaves existing disclosures untouched on edit
    pub disclosures: Option<Vec<DisclosureDraft>>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DisclosureDraft {
    pub disclosure_type: DisclosureType,
    pub title: String,
    pub description: String,
}

fn required(value: &Option<String>) -> Option<String> {
    value
        .as_ref()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn optional(value: Option<String>) -> Option<String> {
    value.map(|v| v.trim().to_string()).filter(|v| !v.is_empty())
}

impl ProjectRequest {
    pub fn validate(self) -> Result<ProjectDraft, String> {
        let (Some(name), Some(collection_address), Some(chain_id), Some(description), Some(category)) = (
            required(&self.name),
            required(&self.collection_address),
            required(&self.chain_id),
            required(&self.description),
            required(&self.category),
        ) else {
            return Err("Missing required fields".to_string());
        };

        if name.chars().count() > MAX_NAME_LEN {
            return Err(format!("name must be at most {} characters", MAX_NAME_LEN));
        }
        if !is_evm_address(&collection_address) {
            return Err("collectionAddress must be a 0x-prefixed 20-byte hex address".to_string());
        }
        let category: ProjectCategory = category.parse()?;

        if let Some(royalty) = self.royalty_pct {
            if royalty < Decimal::ZERO || royalty > Decimal::ONE_HUNDRED {
                return Err("royaltyPct must be between 0 and 100".to_string());
            }
        }
        if let Some(revenue) = self.ltm_revenue_usd {
            if revenue < Decimal::ZERO {
                return Err("ltmRevenueUSD cannot be negative".to_string());
            }
            if revenue > MAX_LTM_REVENUE_USD {
                return Err(format!("ltmRevenueUSD must not exceed {}", MAX_LTM_REVENUE_USD));
            }
        }

        let disclosures = match self.disclosures {
            Some(items) => Some(
                items
                    .into_iter()
                    .map(DisclosureInput::validate)
                    .collect::<Result<Vec<_>, _>>()?,
            ),
            None => None,
        };

        Ok(ProjectDraft {
            name,
            image: optional(self.image),
            collection_address: collection_address.to_lowercase(),
            chain_id,
            description,
            category,
            royalty_pct: self.royalty_pct.map(|v| v.round_dp(2)),
            ltm_revenue_usd: self.ltm_revenue_usd.map(|v| v.round_dp(2)),
            metadata_cid: optional(self.metadata_cid),
            disclosures,
        })
    }
}

impl DisclosureInput {
    pub fn validate(self) -> Result<DisclosureDraft, String> {
        let (Some(disclosure_type), Some(title), Some(description)) = (
            required(&self.disclosure_type),
            required(&self.title),
            required(&self.description),
        ) else {
            return Err("Disclosures require disclosureType, title and description".to_string());
        };

        Ok(DisclosureDraft {
            disclosure_type: disclosure_type.parse()?,
            title,
            description,
        })
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectListQuery {
    pub search: Option<String>,
    pub category: Option<String>,
    pub owner_id: Option<Uuid>,
    pub status: Option<String>,
    pub limit: Option<u64>,
    pub offset: Option<u64>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusUpdateRequest {
    pub status: Option<String>,
    pub project_id: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DisclosureQuery {
    pub project_id: Uuid,
    pub disclosure_type: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectResponse {
    pub id: Uuid,
    pub name: String,
    pub image: Option<String>,
    pub collection_address: String,
    pub chain_id: String,
    pub description: String,
    pub category: ProjectCategory,
    #[serde(with = "rust_decimal::serde::float_option")]
    pub royalty_pct: Option<Decimal>,
    #[serde(rename = "ltmRevenueUSD", with = "rust_decimal::serde::float_option")]
    pub ltm_revenue_usd: Option<Decimal>,
    #[serde(rename = "metadataCID")]
    pub metadata_cid: Option<String>,
    pub owner_id: Uuid,
    pub status: ProjectStatus,
    pub created_at: DateTime<FixedOffset>,
    pub updated_at: DateTime<FixedOffset>,
}

impl From<nft_projects::Model> for ProjectResponse {
    fn from(p: nft_projects::Model) -> Self {
        Self {
            id: p.id,
            name: p.name,
            image: p.image,
            collection_address: p.collection_address,
            chain_id: p.chain_id,
            description: p.description,
            category: p.category,
            royalty_pct: p.royalty_pct,
            ltm_revenue_usd: p.ltm_revenue_usd,
            metadata_cid: p.metadata_cid,
            owner_id: p.owner_id,
            status: p.status,
            created_at: p.created_at,
            updated_at: p.updated_at,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DisclosureResponse {
    pub id: Uuid,
    pub project_id: Uuid,
    pub disclosure_type: DisclosureType,
    pub title: String,
    pub description: String,
    pub created_at: DateTime<FixedOffset>,
}

impl From<project_disclosures::Model> for DisclosureResponse {
    fn from(d: project_disclosures::Model) -> Self {
        Self {
            id: d.id,
            project_id: d.project_id,
            disclosure_type: d.disclosure_type,
            title: d.title,
            description: d.description,
            created_at: d.created_at,
        }
    }
}

/// Public view of a project owner
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OwnerResponse {
    pub id: Uuid,
    pub address: String,
    pub twitter_username: Option<String>,
    pub twitter_profile_image_url: Option<String>,
}

impl From<users::Model> for OwnerResponse {
    fn from(u: users::Model) -> Self {
        Self {
            id: u.id,
            address: u.address,
            twitter_username: u.twitter_username,
            twitter_profile_image_url: u.twitter_profile_image_url,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectSummary {
    #[serde(flatten)]
    pub project: ProjectResponse,
    pub listing: Option<ListingResponse>,
    pub valuation: Option<ValuationReportResponse>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectDetail {
    #[serde(flatten)]
    pub project: ProjectResponse,
    pub owner: Option<OwnerResponse>,
    pub listing: Option<ListingResponse>,
    pub valuation: Option<ValuationReportResponse>,
    pub disclosures: Vec<DisclosureResponse>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProjectListResponse {
    pub projects: Vec<ProjectSummary>,
    pub pagination: Pagination,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OwnerProjectsResponse {
    pub projects: Vec<ProjectSummary>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DisclosureListResponse {
    pub disclosures: Vec<DisclosureResponse>,
}
