use axum::{extract::State, Json};

use crate::entities::sea_orm_active_enums::DisclosureType;
use crate::error::ApiError;
use crate::extract::QueryParams;
use crate::models::project::{DisclosureListResponse, DisclosureQuery};
use crate::services::projects::{find_live_project, list_disclosures};
use crate::AppState;

/// GET /project-disclosures?projectId&disclosureType
pub async fn list_project_disclosures(
    State(state): State<AppState>,
    QueryParams(query): QueryParams<DisclosureQuery>,
) -> Result<Json<DisclosureListResponse>, ApiError> {
    let disclosure_type = query
        .disclosure_type
        .as_deref()
        .map(str::parse::<DisclosureType>)
        .transpose()
        .map_err(|_| ApiError::Validation("Invalid disclosureType".to_string()))?;

    let project = find_live_project(&state.db, query.project_id).await?;
    let disclosures = list_disclosures(&state.db, project.id, disclosure_type).await?;

    Ok(Json(DisclosureListResponse {
        disclosures: disclosures.into_iter().map(Into::into).collect(),
    }))
}
