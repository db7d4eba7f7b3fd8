//! Listing/sale status state machine
//!
//! ```text
//! draft ──► active ──► sold
//!   │        ▲  │
//!   │        │  ▼
//!   │      suspended
//!   ▼        │
//! deleted ◄──┘ (from draft, active, suspended)
//! ```
//!
//! Every write goes through [`transition`], a conditional update on the status
//! that was read, so concurrent requests cannot both move a project out of the
//! same state.

use chrono::Utc;
use sea_orm::{sea_query::Expr, ColumnTrait, ConnectionTrait, DbErr, EntityTrait, QueryFilter};
use thiserror::Error;
use uuid::Uuid;

use crate::entities::{nft_projects, prelude::*, sea_orm_active_enums::ProjectStatus};
use crate::error::ApiError;

/// Who is asking for the transition
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Trigger {
    /// The project owner through the status/listing/delete routes
    Owner,
    /// A recorded purchase
    Purchase,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum TransitionError {
    #[error("Project is {0} and can no longer change status")]
    Terminal(ProjectStatus),
    #[error("Project is already {0}")]
    Unchanged(ProjectStatus),
    #[error("Only a purchase can mark a project as sold")]
    PurchaseOnly,
    #[error("Cannot change status from {from} to {to}")]
    NotAllowed { from: ProjectStatus, to: ProjectStatus },
}

impl From<TransitionError> for ApiError {
    fn from(err: TransitionError) -> Self {
        ApiError::Conflict(err.to_string())
    }
}

/// Check a transition against the state machine
pub fn check_transition(from: ProjectStatus, to: ProjectStatus, trigger: Trigger) -> Result<(), TransitionError> {
    use ProjectStatus::*;

    if from.is_terminal() {
        return Err(TransitionError::Terminal(from));
    }
    if from == to {
        return Err(TransitionError::Unchanged(from));
    }

    match (from, to, trigger) {
        (Active, Sold, Trigger::Purchase) => Ok(()),
        (_, Sold, Trigger::Owner) => Err(TransitionError::PurchaseOnly),
        (Draft, Active, Trigger::Owner)
        | (Active, Suspended, Trigger::Owner)
        | (Suspended, Active, Trigger::Owner)
        | (Draft | Active | Suspended, Deleted, Trigger::Owner) => Ok(()),
        _ => Err(TransitionError::NotAllowed { from, to }),
    }
}

/// Statuses in which the owner may still edit project details
pub fn is_editable(status: ProjectStatus) -> bool {
    matches!(status, ProjectStatus::Draft | ProjectStatus::Active | ProjectStatus::Suspended)
}

/// Move `project_id` from `from` to `to` only if it is still in `from`.
///
/// Returns `false` when another writer changed the status first.
pub async fn transition<C: ConnectionTrait>(
    conn: &C,
    project_id: Uuid,
    from: ProjectStatus,
    to: ProjectStatus,
) -> Result<bool, DbErr> {
    let result = NftProjects::update_many()
        .col_expr(nft_projects::Column::Status, Expr::value(to))
        .col_expr(
            nft_projects::Column::UpdatedAt,
            Expr::value(chrono::DateTime::<chrono::FixedOffset>::from(Utc::now())),
        )
        .filter(nft_projects::Column::Id.eq(project_id))
        .filter(nft_projects::Column::Status.eq(from))
        .exec(conn)
        .await?;

    Ok(result.rows_affected == 1)
}

/// Rewrite the status of `project_id` in place if it is still `status`,
/// holding the row until the surrounding transaction ends.
///
/// Returns `false` when another writer changed the status first.
pub async fn hold_status<C: ConnectionTrait>(conn: &C, project_id: Uuid, status: ProjectStatus) -> Result<bool, DbErr> {
    let result = NftProjects::update_many()
        .col_expr(nft_projects::Column::Status, Expr::value(status))
        .filter(nft_projects::Column::Id.eq(project_id))
        .filter(nft_projects::Column::Status.eq(status))
        .exec(conn)
        .await?;

    Ok(result.rows_affected == 1)
}

#[cfg(test)]
mod tests {
    use super::*;
    use sea_orm::Iterable;
    use ProjectStatus::*;

    #[test]
    fn test_owner_transitions() {
        assert!(check_transition(Draft, Active, Trigger::Owner).is_ok());
        assert!(check_transition(Active, Suspended, Trigger::Owner).is_ok());
        assert!(check_transition(Suspended, Active, Trigger::Owner).is_ok());
        assert!(check_transition(Draft, Deleted, Trigger::Owner).is_ok());
        assert!(check_transition(Active, Deleted, Trigger::Owner).is_ok());
        assert!(check_transition(Suspended, Deleted, Trigger::Owner).is_ok());
    }

    #[test]
    fn test_sold_only_through_purchase() {
        assert!(check_transition(Active, Sold, Trigger::Purchase).is_ok());
        assert_eq!(
            check_transition(Active, Sold, Trigger::Owner),
            Err(TransitionError::PurchaseOnly)
        );
        assert_eq!(
            check_transition(Draft, Sold, Trigger::Purchase),
            Err(TransitionError::NotAllowed { from: Draft, to: Sold })
        );
        assert_eq!(
            check_transition(Suspended, Sold, Trigger::Purchase),
            Err(TransitionError::NotAllowed { from: Suspended, to: Sold })
        );
    }

    #[test]
    fn test_terminal_states_have_no_exits() {
        for to in ProjectStatus::iter() {
            for trigger in [Trigger::Owner, Trigger::Purchase] {
                assert_eq!(check_transition(Sold, to, trigger), Err(TransitionError::Terminal(Sold)));
                assert_eq!(check_transition(Deleted, to, trigger), Err(TransitionError::Terminal(Deleted)));
            }
        }
    }

    #[test]
    fn test_rejected_pairs() {
        assert!(check_transition(Draft, Suspended, Trigger::Owner).is_err());
        assert!(check_transition(Suspended, Draft, Trigger::Owner).is_err());
        assert!(check_transition(Active, Draft, Trigger::Owner).is_err());
        assert_eq!(
            check_transition(Active, Active, Trigger::Owner),
            Err(TransitionError::Unchanged(Active))
        );
    }

    #[test]
    fn test_editable_statuses() {
        assert!(is_editable(Draft));
        assert!(is_editable(Active));
        assert!(is_editable(Suspended));
        assert!(!is_editable(Sold));
        assert!(!is_editable(Deleted));
    }

    #[test]
    fn test_conflict_maps_to_bad_request() {
        let err: ApiError = TransitionError::Terminal(Sold).into();
        assert_eq!(err.status(), axum::http::StatusCode::BAD_REQUEST);
        assert_eq!(err.to_string(), "Project is sold and can no longer change status");
    }
}
