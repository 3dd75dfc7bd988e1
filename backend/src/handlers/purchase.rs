//! HTTP handlers for feed purchase endpoints

use axum::{
    extract::{Path, Query, State},
    http::{HeaderMap, StatusCode},
    Json,
};
use axum_extra::extract::WithRejection;

use crate::error::{AppError, AppResult};
use crate::models::{FeedPurchase, FeedPurchaseHistory, PaginatedResponse, Pagination, PurchaseSummary};
use crate::services::purchase::{PurchaseFilter, PurchaseInput, PurchaseQuery, UpdatePurchaseInput};
use crate::services::{HistoryService, PurchaseService};
use crate::AppState;

/// Header carrying an optional audit reason for writes
pub const CHANGE_REASON_HEADER: &str = "x-change-reason";

fn change_reason(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(CHANGE_REASON_HEADER)
        .and_then(|value| value.to_str().ok())
}

/// List feed purchases
pub async fn list_purchases(
    State(state): State<AppState>,
    Query(query): Query<PurchaseQuery>,
) -> AppResult<Json<PaginatedResponse<FeedPurchase>>> {
    let filter = PurchaseFilter::from_query(&query)?;
    let pagination = Pagination::from_params(
        query.page.as_deref(),
        query.page_size.as_deref(),
        state.config.pagination.default_page_size,
        state.config.pagination.max_page_size,
    );

    let service = PurchaseService::new(state.db);
    let purchases = service
        .list_purchases(&filter, &query.ordering(), pagination)
        .await?;
    Ok(Json(purchases))
}

/// Aggregate spend over the filtered purchases
pub async fn purchase_summary(
    State(state): State<AppState>,
    Query(query): Query<PurchaseQuery>,
) -> AppResult<Json<PurchaseSummary>> {
    let filter = PurchaseFilter::from_query(&query)?;

    let service = PurchaseService::new(state.db);
    let summary = service.summarize(&filter, query.summary_options()).await?;
    Ok(Json(summary))
}

/// Get a single purchase
pub async fn get_purchase(
    State(state): State<AppState>,
    Path(purchase_id): Path<i64>,
) -> AppResult<Json<FeedPurchase>> {
    let service = PurchaseService::new(state.db);
    let purchase = service.get_purchase(purchase_id).await?;
    Ok(Json(purchase))
}

/// Record a purchase
pub async fn create_purchase(
    State(state): State<AppState>,
    headers: HeaderMap,
    WithRejection(Json(input), _): WithRejection<Json<PurchaseInput>, AppError>,
) -> AppResult<(StatusCode, Json<FeedPurchase>)> {
    let service = PurchaseService::new(state.db);
    let purchase = service
        .create_purchase(input, change_reason(&headers))
        .await?;
    Ok((StatusCode::CREATED, Json(purchase)))
}

/// Replace a purchase
pub async fn update_purchase(
    State(state): State<AppState>,
    Path(purchase_id): Path<i64>,
    headers: HeaderMap,
    WithRejection(Json(input), _): WithRejection<Json<PurchaseInput>, AppError>,
) -> AppResult<Json<FeedPurchase>> {
    let service = PurchaseService::new(state.db);
    let purchase = service
        .update_purchase(purchase_id, input, change_reason(&headers))
        .await?;
    Ok(Json(purchase))
}

/// Partially update a purchase
pub async fn patch_purchase(
    State(state): State<AppState>,
    Path(purchase_id): Path<i64>,
    headers: HeaderMap,
    WithRejection(Json(input), _): WithRejection<Json<UpdatePurchaseInput>, AppError>,
) -> AppResult<Json<FeedPurchase>> {
    let service = PurchaseService::new(state.db);
    let purchase = service
        .patch_purchase(purchase_id, input, change_reason(&headers))
        .await?;
    Ok(Json(purchase))
}

/// Delete a purchase
pub async fn delete_purchase(
    State(state): State<AppState>,
    Path(purchase_id): Path<i64>,
    headers: HeaderMap,
) -> AppResult<StatusCode> {
    let service = PurchaseService::new(state.db);
    service
        .delete_purchase(purchase_id, change_reason(&headers))
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Audit trail of a purchase, newest first
pub async fn purchase_history(
    State(state): State<AppState>,
    Path(purchase_id): Path<i64>,
) -> AppResult<Json<Vec<FeedPurchaseHistory>>> {
    let service = HistoryService::new(state.db);
    let history = service.list_for_purchase(purchase_id).await?;
    Ok(Json(history))
}
