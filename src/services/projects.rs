//! Project store: creation, edits, queries and disclosure handling

use chrono::Utc;
use sea_orm::{
    sea_query::{Expr, Func, LikeExpr},
    ActiveModelTrait, ColumnTrait, Condition, ConnectionTrait, DatabaseConnection, EntityTrait, PaginatorTrait,
    QueryFilter, QueryOrder, QuerySelect, Set, TransactionTrait,
};
use std::collections::HashMap;
use tracing::{info, warn};
use uuid::Uuid;

use crate::entities::{
    listings, nft_projects, prelude::*, project_disclosures,
    sea_orm_active_enums::{DisclosureType, ProjectCategory, ProjectStatus},
    users, valuation_reports,
};
use crate::error::ApiError;
use crate::models::project::{DisclosureDraft, ProjectDetail, ProjectDraft, ProjectSummary};
use crate::services::lifecycle::is_editable;

/// Filters of the public project list
#[derive(Debug, Clone, Default)]
pub struct ProjectFilter {
    pub search: Option<String>,
    pub category: Option<ProjectCategory>,
    pub owner_id: Option<Uuid>,
    pub status: Option<ProjectStatus>,
    pub limit: u64,
    pub offset: u64,
}

/// Escape LIKE wildcards so user input only matches literally
fn like_pattern(search: &str) -> LikeExpr {
    let escaped = search
        .to_lowercase()
        .replace('\\', "\\\\")
        .replace('%', "\\%")
        .replace('_', "\\_");
    LikeExpr::new(format!("%{}%", escaped)).escape('\\')
}

/// Load a live (non-deleted) project
pub async fn find_live_project(db: &DatabaseConnection, project_id: Uuid) -> Result<nft_projects::Model, ApiError> {
    NftProjects::find_by_id(project_id)
        .filter(nft_projects::Column::Status.ne(ProjectStatus::Deleted))
        .one(db)
        .await?
        .ok_or_else(|| ApiError::NotFound("Project not found".to_string()))
}

/// Load a live project that `owner` may act on: 404 when missing or deleted,
/// 403 when someone else owns it
pub async fn load_owned(
    db: &DatabaseConnection,
    owner: &users::Model,
    project_id: Uuid,
) -> Result<nft_projects::Model, ApiError> {
    let project = find_live_project(db, project_id).await?;
    if project.owner_id != owner.id {
        warn!(project_id = %project_id, user_id = %owner.id, "Rejected non-owner access to project");
        return Err(ApiError::Forbidden);
    }
    Ok(project)
}

pub(crate) async fn insert_disclosures<C: ConnectionTrait>(
    conn: &C,
    project_id: Uuid,
    disclosures: &[DisclosureDraft],
) -> Result<(), ApiError> {
    if disclosures.is_empty() {
        return Ok(());
    }

    let now = Utc::now();
    let rows = disclosures.iter().enumerate().map(|(position, d)| project_disclosures::ActiveModel {
        id: Set(Uuid::new_v4()),
        project_id: Set(project_id),
        disclosure_type: Set(d.disclosure_type),
        title: Set(d.title.clone()),
        description: Set(d.description.clone()),
        position: Set(position as i32),
        created_at: Set(now.into()),
    });

    ProjectDisclosures::insert_many(rows).exec(conn).await?;
    Ok(())
}

pub(crate) async fn clear_disclosures<C: ConnectionTrait>(conn: &C, project_id: Uuid) -> Result<u64, ApiError> {
    let result = ProjectDisclosures::delete_many()
        .filter(project_disclosures::Column::ProjectId.eq(project_id))
        .exec(conn)
        .await?;
    Ok(result.rows_affected)
}

/// Create a project in `draft` together with its disclosures
pub async fn create_project(
    db: &DatabaseConnection,
    owner: &users::Model,
    draft: ProjectDraft,
) -> Result<ProjectDetail, ApiError> {
    let now = Utc::now();
    let txn = db.begin().await?;

    let project = nft_projects::ActiveModel {
        id: Set(Uuid::new_v4()),
        name: Set(draft.name),
        image: Set(draft.image),
        collection_address: Set(draft.collection_address),
        chain_id: Set(draft.chain_id),
        description: Set(draft.description),
        category: Set(draft.category),
        royalty_pct: Set(draft.royalty_pct),
        ltm_revenue_usd: Set(draft.ltm_revenue_usd),
        metadata_cid: Set(draft.metadata_cid),
        owner_id: Set(owner.id),
        status: Set(ProjectStatus::Draft),
        created_at: Set(now.into()),
        updated_at: Set(now.into()),
    }
    .insert(&txn)
    .await?;

    let disclosures = draft.disclosures.unwrap_or_default();
    insert_disclosures(&txn, project.id, &disclosures).await?;
    txn.commit().await?;

    info!(
        project_id = %project.id,
        owner_id = %owner.id,
        disclosures = disclosures.len(),
        "Project created"
    );

    project_detail(db, project).await
}

/// Full edit by the owner; disclosures are replaced wholesale when supplied
pub async fn update_project(
    db: &DatabaseConnection,
    owner: &users::Model,
    project_id: Uuid,
    draft: ProjectDraft,
) -> Result<ProjectDetail, ApiError> {
    let project = load_owned(db, owner, project_id).await?;
    if !is_editable(project.status) {
        return Err(ApiError::Conflict(format!(
            "Project cannot be edited while {}",
            project.status
        )));
    }

    let txn = db.begin().await?;

    let changes = nft_projects::ActiveModel {
        name: Set(draft.name),
        image: Set(draft.image),
        collection_address: Set(draft.collection_address),
        chain_id: Set(draft.chain_id),
        description: Set(draft.description),
        category: Set(draft.category),
        royalty_pct: Set(draft.royalty_pct),
        ltm_revenue_usd: Set(draft.ltm_revenue_usd),
        metadata_cid: Set(draft.metadata_cid),
        updated_at: Set(Utc::now().into()),
        ..Default::default()
    };

    // Re-checked in the write so a concurrent sale or delete wins
    let result = NftProjects::update_many()
        .set(changes)
        .filter(nft_projects::Column::Id.eq(project_id))
        .filter(nft_projects::Column::Status.is_in([
            ProjectStatus::Draft,
            ProjectStatus::Active,
            ProjectStatus::Suspended,
        ]))
        .exec(&txn)
        .await?;
    if result.rows_affected == 0 {
        return Err(ApiError::Conflict("Project status changed, edit rejected".to_string()));
    }

    if let Some(disclosures) = &draft.disclosures {
        clear_disclosures(&txn, project_id).await?;
        insert_disclosures(&txn, project_id, disclosures).await?;
    }
    txn.commit().await?;

    info!(project_id = %project_id, owner_id = %owner.id, "Project updated");

    let updated = find_live_project(db, project_id).await?;
    project_detail(db, updated).await
}

/// Assemble the detail view of a loaded project
pub async fn project_detail(db: &DatabaseConnection, project: nft_projects::Model) -> Result<ProjectDetail, ApiError> {
    let owner = Users::find_by_id(project.owner_id).one(db).await?;
    let listing = Listings::find()
        .filter(listings::Column::ProjectId.eq(project.id))
        .one(db)
        .await?;
    let valuation = ValuationReports::find()
        .filter(valuation_reports::Column::ProjectId.eq(project.id))
        .one(db)
        .await?;
    let disclosures = list_disclosures(db, project.id, None).await?;

    Ok(ProjectDetail {
        project: project.into(),
        owner: owner.map(Into::into),
        listing: listing.map(Into::into),
        valuation: valuation.map(Into::into),
        disclosures: disclosures.into_iter().map(Into::into).collect(),
    })
}

/// Disclosures of a project in submission order
pub async fn list_disclosures(
    db: &DatabaseConnection,
    project_id: Uuid,
    disclosure_type: Option<DisclosureType>,
) -> Result<Vec<project_disclosures::Model>, ApiError> {
    let mut query = ProjectDisclosures::find().filter(project_disclosures::Column::ProjectId.eq(project_id));
    if let Some(kind) = disclosure_type {
        query = query.filter(project_disclosures::Column::DisclosureType.eq(kind));
    }

    Ok(query
        .order_by_asc(project_disclosures::Column::Position)
        .order_by_asc(project_disclosures::Column::CreatedAt)
        .all(db)
        .await?)
}

/// Attach listing and current valuation to each project
async fn summarize(db: &DatabaseConnection, projects: Vec<nft_projects::Model>) -> Result<Vec<ProjectSummary>, ApiError> {
    if projects.is_empty() {
        return Ok(Vec::new());
    }
    let ids: Vec<Uuid> = projects.iter().map(|p| p.id).collect();

    let mut listings_by_project: HashMap<Uuid, listings::Model> = Listings::find()
        .filter(listings::Column::ProjectId.is_in(ids.clone()))
        .all(db)
        .await?
        .into_iter()
        .map(|l| (l.project_id, l))
        .collect();

    let mut reports_by_project: HashMap<Uuid, valuation_reports::Model> = ValuationReports::find()
        .filter(valuation_reports::Column::ProjectId.is_in(ids))
        .all(db)
        .await?
        .into_iter()
        .map(|r| (r.project_id, r))
        .collect();

    Ok(projects
        .into_iter()
        .map(|p| ProjectSummary {
            listing: listings_by_project.remove(&p.id).map(Into::into),
            valuation: reports_by_project.remove(&p.id).map(Into::into),
            project: p.into(),
        })
        .collect())
}

/// Public marketplace list, newest first
pub async fn list_projects(
    db: &DatabaseConnection,
    filter: &ProjectFilter,
) -> Result<(Vec<ProjectSummary>, u64), ApiError> {
    let mut select = NftProjects::find().filter(nft_projects::Column::Status.ne(ProjectStatus::Deleted));

    if let Some(search) = filter.search.as_deref().map(str::trim).filter(|s| !s.is_empty()) {
        select = select.filter(
            Condition::any()
                .add(Expr::expr(Func::lower(Expr::col(nft_projects::Column::Name))).like(like_pattern(search)))
                .add(Expr::expr(Func::lower(Expr::col(nft_projects::Column::Description))).like(like_pattern(search))),
        );
    }
    if let Some(category) = filter.category {
        select = select.filter(nft_projects::Column::Category.eq(category));
    }
    if let Some(owner_id) = filter.owner_id {
        select = select.filter(nft_projects::Column::OwnerId.eq(owner_id));
    }
    if let Some(status) = filter.status {
        select = select.filter(nft_projects::Column::Status.eq(status));
    }

    let total = select.clone().count(db).await?;

    let projects = select
        .order_by_desc(nft_projects::Column::CreatedAt)
        .offset(filter.offset)
        .limit(filter.limit)
        .all(db)
        .await?;

    Ok((summarize(db, projects).await?, total))
}

/// The caller's own live projects, drafts included
pub async fn list_owner_projects(db: &DatabaseConnection, owner_id: Uuid) -> Result<Vec<ProjectSummary>, ApiError> {
    let projects = NftProjects::find()
        .filter(nft_projects::Column::OwnerId.eq(owner_id))
        .filter(nft_projects::Column::Status.ne(ProjectStatus::Deleted))
        .order_by_desc(nft_projects::Column::CreatedAt)
        .all(db)
        .await?;

    summarize(db, projects).await
}
