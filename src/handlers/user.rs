//! Handlers for the signed-in user and their projects

use axum::{
    extract::{Path, State},
    Json,
};
use tracing::{info, warn};

use crate::auth::AuthUser;
use crate::entities::sea_orm_active_enums::ProjectStatus;
use crate::error::ApiError;
use crate::extract::{parse_id, JsonBody};
use crate::models::project::{OwnerProjectsResponse, ProjectDetail, ProjectResponse, StatusUpdateRequest};
use crate::models::user::{SocialLinkRequest, UserResponse};
use crate::services::{listings, projects, users};
use crate::AppState;

/// GET /user
pub async fn get_current_user(AuthUser(user): AuthUser) -> Json<UserResponse> {
    Json(user.into())
}

/// PUT /user/social
pub async fn link_social(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    JsonBody(request): JsonBody<SocialLinkRequest>,
) -> Result<Json<UserResponse>, ApiError> {
    let (username, avatar) = request.validate().map_err(ApiError::Validation)?;

    let updated = users::link_social_profile(&state.db, user, username, avatar).await?;
    state.sessions.forget(&updated.sub).await;

    Ok(Json(updated.into()))
}

/// GET /user/projects
pub async fn list_own_projects(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
) -> Result<Json<OwnerProjectsResponse>, ApiError> {
    let projects = projects::list_owner_projects(&state.db, user.id).await?;
    Ok(Json(OwnerProjectsResponse { projects }))
}

/// GET /user/projects/{id}
pub async fn get_own_project(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    Path(id): Path<String>,
) -> Result<Json<ProjectDetail>, ApiError> {
    let project_id = parse_id(&id, "project")?;
    let project = projects::load_owned(&state.db, &user, project_id).await?;
    Ok(Json(projects::project_detail(&state.db, project).await?))
}

/// Owner-triggered status transition
///
/// PUT /user/projects/{id}/status
///
/// Ownership is checked before the payload, so a non-owner gets 403 whatever
/// the body says.
pub async fn update_project_status(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    Path(id): Path<String>,
    JsonBody(request): JsonBody<StatusUpdateRequest>,
) -> Result<Json<ProjectResponse>, ApiError> {
    let project_id = parse_id(&id, "project")?;
    projects::load_owned(&state.db, &user, project_id).await?;

    let target = request
        .status
        .as_deref()
        .map(str::parse::<ProjectStatus>)
        .and_then(Result::ok)
        .ok_or_else(|| {
            warn!(project_id = %project_id, status = ?request.status, "Rejected status value");
            ApiError::Validation("Invalid status".to_string())
        })?;

    if let Some(body_id) = request.project_id.as_deref() {
        if parse_id(body_id, "project")? != project_id {
            return Err(ApiError::Validation("projectId does not match the path".to_string()));
        }
    }

    info!(project_id = %project_id, user_id = %user.id, target = %target, "Status change request received");

    let project =
        listings::change_status(&state.db, &user, project_id, target, state.config.relist_policy).await?;
    Ok(Json(project.into()))
}
