use chrono::{DateTime, FixedOffset};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::entities::valuation_reports;

/// Result of `POST /user/projects/{id}/valuation`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ValuationResponse {
    pub report: String,
    #[serde(rename = "estimatedValueUSD", with = "rust_decimal::serde::float")]
    pub estimated_value_usd: Decimal,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ValuationReportQuery {
    pub project_id: Uuid,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ValuationReportResponse {
    pub id: Uuid,
    pub project_id: Uuid,
    #[serde(rename = "estimatedValueUSD", with = "rust_decimal::serde::float")]
    pub estimated_value_usd: Decimal,
    pub model_version: String,
    pub report: String,
    pub created_at: DateTime<FixedOffset>,
    pub updated_at: DateTime<FixedOffset>,
}

impl From<valuation_reports::Model> for ValuationReportResponse {
    fn from(r: valuation_reports::Model) -> Self {
        Self {
            id: r.id,
            project_id: r.project_id,
            estimated_value_usd: r.estimated_value_usd,
            model_version: r.model_version,
            report: r.report,
            created_at: r.created_at,
            updated_at: r.updated_at,
        }
    }
}
