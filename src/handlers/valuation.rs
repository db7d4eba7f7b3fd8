//! Valuation Handlers

use axum::{
    extract::{Path, State},
    Json,
};
use tracing::info;

use crate::auth::AuthUser;
use crate::error::ApiError;
use crate::extract::{parse_id, QueryParams};
use crate::models::valuation::{ValuationReportQuery, ValuationReportResponse, ValuationResponse};
use crate::services::valuation::current_report;
use crate::AppState;

/// GET /valuation-reports?projectId
pub async fn get_valuation_report(
    State(state): State<AppState>,
    QueryParams(query): QueryParams<ValuationReportQuery>,
) -> Result<Json<ValuationReportResponse>, ApiError> {
    let report = current_report(&state.db, query.project_id).await?;
    Ok(Json(report.into()))
}

/// Generate or refresh the valuation of one of the caller's projects
///
/// POST /user/projects/{id}/valuation
///
/// # Response
///
/// ```json
/// { "report": "...", "estimatedValueUSD": 1000000 }
/// ```
pub async fn generate_valuation(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    Path(id): Path<String>,
) -> Result<Json<ValuationResponse>, ApiError> {
    let project_id = parse_id(&id, "project")?;
    info!(project_id = %project_id, user_id = %user.id, "Valuation request received");

    let report = state.valuation.generate(&state.db, &user, project_id).await?;

    Ok(Json(ValuationResponse {
        report: report.report,
        estimated_value_usd: report.estimated_value_usd,
    }))
}
