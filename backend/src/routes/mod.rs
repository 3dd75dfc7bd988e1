//! Route definitions for the feed purchase service

use axum::{routing::get, Router};

use crate::{handlers, AppState};

/// Create API routes
pub fn api_routes() -> Router<AppState> {
    Router::new()
        .route("/health", get(handlers::health_check))
        .nest("/feed-purchases", feed_purchase_routes())
}

/// Feed purchase routes
fn feed_purchase_routes() -> Router<AppState> {
    Router::new()
        .route(
            "/",
            get(handlers::list_purchases).post(handlers::create_purchase),
        )
        // Static segment takes precedence over the id capture
        .route("/summary", get(handlers::purchase_summary))
        .route(
            "/:purchase_id",
            get(handlers::get_purchase)
                .put(handlers::update_purchase)
                .patch(handlers::patch_purchase)
                .delete(handlers::delete_purchase),
        )
        .route("/:purchase_id/history", get(handlers::purchase_history))
}
