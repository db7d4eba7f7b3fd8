//! Project Handlers
//!
//! Public marketplace browsing plus owner CRUD and the buyer purchase route.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use tracing::{info, warn};

use crate::auth::AuthUser;
use crate::entities::sea_orm_active_enums::{ProjectCategory, ProjectStatus};
use crate::error::ApiError;
use crate::extract::{parse_id, JsonBody, QueryParams};
use crate::models::pagination::{page_window, Pagination};
use crate::models::project::{ProjectDetail, ProjectListQuery, ProjectListResponse, ProjectRequest, ProjectResponse};
use crate::models::transaction::{PurchaseRequest, TransactionResponse};
use crate::services::{listings, projects, purchase};
use crate::AppState;

/// List live projects, newest first
///
/// GET /projects?search&category&ownerId&status&limit&offset
pub async fn list_projects(
    State(state): State<AppState>,
    QueryParams(query): QueryParams<ProjectListQuery>,
) -> Result<Json<ProjectListResponse>, ApiError> {
    info!(
        search = ?query.search,
        category = ?query.category,
        status = ?query.status,
        limit = query.limit,
        offset = query.offset,
        "Project list request received"
    );

    let (limit, offset) = page_window(query.limit, query.offset).map_err(ApiError::Validation)?;
    let category = query
        .category
        .as_deref()
        .map(str::parse::<ProjectCategory>)
        .transpose()
        .map_err(|_| ApiError::Validation("Invalid category".to_string()))?;
    let status = query
        .status
        .as_deref()
        .map(str::parse::<ProjectStatus>)
        .transpose()
        .map_err(|_| ApiError::Validation("Invalid status".to_string()))?;

    let filter = projects::ProjectFilter {
        search: query.search,
        category,
        owner_id: query.owner_id,
        status,
        limit,
        offset,
    };
    let (projects, total) = projects::list_projects(&state.db, &filter).await?;

    Ok(Json(ProjectListResponse {
        projects,
        pagination: Pagination { total, limit, offset },
    }))
}

/// GET /projects/{id}
pub async fn get_project(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<ProjectDetail>, ApiError> {
    let project_id = parse_id(&id, "project")?;
    let project = projects::find_live_project(&state.db, project_id).await?;
    Ok(Json(projects::project_detail(&state.db, project).await?))
}

/// POST /projects
pub async fn create_project(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    JsonBody(request): JsonBody<ProjectRequest>,
) -> Result<(StatusCode, Json<ProjectDetail>), ApiError> {
    let draft = request.validate().map_err(|e| {
        warn!(user_id = %user.id, error = %e, "Rejected project submission");
        ApiError::Validation(e)
    })?;

    let detail = projects::create_project(&state.db, &user, draft).await?;
    Ok((StatusCode::CREATED, Json(detail)))
}

/// PUT /projects/{id}
pub async fn update_project(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    Path(id): Path<String>,
    JsonBody(request): JsonBody<ProjectRequest>,
) -> Result<Json<ProjectDetail>, ApiError> {
    let project_id = parse_id(&id, "project")?;
    // Ownership is checked before the body so a stranger always gets 403
    projects::load_owned(&state.db, &user, project_id).await?;
    let draft = request.validate().map_err(ApiError::Validation)?;

    info!(project_id = %project_id, user_id = %user.id, "Project edit request received");
    Ok(Json(projects::update_project(&state.db, &user, project_id, draft).await?))
}

/// Soft delete
///
/// DELETE /projects/{id}
pub async fn delete_project(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    Path(id): Path<String>,
) -> Result<Json<ProjectResponse>, ApiError> {
    let project_id = parse_id(&id, "project")?;
    info!(project_id = %project_id, user_id = %user.id, "Project delete request received");

    let project = listings::change_status(
        &state.db,
        &user,
        project_id,
        ProjectStatus::Deleted,
        state.config.relist_policy,
    )
    .await?;
    Ok(Json(project.into()))
}

/// Record a purchase of the project's listing
///
/// POST /projects/{id}/purchase
pub async fn purchase_project(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    Path(id): Path<String>,
    JsonBody(request): JsonBody<PurchaseRequest>,
) -> Result<(StatusCode, Json<TransactionResponse>), ApiError> {
    let project_id = parse_id(&id, "project")?;
    let tx_hash = request
        .tx_hash
        .ok_or_else(|| ApiError::Validation("txHash is required".to_string()))?;

    info!(project_id = %project_id, buyer_id = %user.id, tx_hash = %tx_hash, "Purchase request received");

    let outcome = purchase::purchase(
        &state.db,
        state.escrow.as_deref(),
        &user,
        purchase::PurchaseTarget::Project(project_id),
        &tx_hash,
    )
    .await?;

    let status = if outcome.replayed { StatusCode::OK } else { StatusCode::CREATED };
    Ok((status, Json(outcome.transaction.into())))
}
