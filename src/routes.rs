use axum::{
    routing::{get, post, put},
    Router,
};
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::handlers::{disclosures, health, listings, notifications, projects, transactions, user, valuation};
use crate::AppState;

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health::health))
        // Projects
        .route("/projects", get(projects::list_projects).post(projects::create_project))
        .route(
            "/projects/{id}",
            get(projects::get_project)
                .put(projects::update_project)
                .delete(projects::delete_project),
        )
        .route("/projects/{id}/purchase", post(projects::purchase_project))
        .route("/project-disclosures", get(disclosures::list_project_disclosures))
        // Listings and purchases
        .route("/listings", get(listings::list_listings).post(listings::create_listing))
        .route(
            "/listings/{id}",
            get(listings::get_listing)
                .put(listings::update_listing)
                .delete(listings::delete_listing),
        )
        .route(
            "/transactions",
            get(transactions::list_transactions).post(transactions::create_transaction),
        )
        .route("/valuation-reports", get(valuation::get_valuation_report))
        // Signed-in user
        .route("/user", get(user::get_current_user))
        .route("/user/social", put(user::link_social))
        .route("/user/projects", get(user::list_own_projects))
        .route("/user/projects/{id}", get(user::get_own_project))
        .route("/user/projects/{id}/status", put(user::update_project_status))
        .route("/user/projects/{id}/valuation", post(valuation::generate_valuation))
        .route("/user/notifications", get(notifications::list_notifications))
        .route("/user/notifications/{id}/read", put(notifications::mark_notification_read))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}
