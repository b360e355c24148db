//! Receipt lookup and sales statistics endpoints.

use std::sync::Arc;

use axum::Json;
use axum::extract::{Path, Query, State};
use chrono::{DateTime, Utc};
use domain::{PurchaseLine, Purchaser, Receipt, ReceiptCode, SalesSummary};
use serde::{Deserialize, Serialize};
use store::Storage;

use crate::error::ApiError;
use crate::identity::Caller;
use crate::routes::parse_receipt_id;
use crate::state::AppState;

#[derive(Deserialize)]
pub struct SalesQuery {
    pub start: Option<DateTime<Utc>>,
    pub end: Option<DateTime<Utc>>,
}

#[derive(Serialize)]
pub struct ReceiptLineResponse {
    pub item_id: String,
    pub title: String,
    pub quantity: u32,
    pub unit_price_cents: i64,
    pub subtotal_cents: i64,
}

impl From<&PurchaseLine> for ReceiptLineResponse {
    fn from(line: &PurchaseLine) -> Self {
        Self {
            item_id: line.item_id.to_string(),
            title: line.title.clone(),
            quantity: line.quantity,
            unit_price_cents: line.unit_price.cents(),
            subtotal_cents: line.subtotal().cents(),
        }
    }
}

#[derive(Serialize)]
pub struct ReceiptResponse {
    pub id: String,
    pub code: String,
    pub purchaser: String,
    pub purchased_at: String,
    pub lines: Vec<ReceiptLineResponse>,
    pub total_amount_cents: i64,
    pub total_items: u64,
}

impl From<&Receipt> for ReceiptResponse {
    fn from(receipt: &Receipt) -> Self {
        Self {
            id: receipt.id().to_string(),
            code: receipt.code().to_string(),
            purchaser: receipt.purchaser().to_string(),
            purchased_at: receipt.purchased_at().to_rfc3339(),
            lines: receipt.lines().iter().map(ReceiptLineResponse::from).collect(),
            total_amount_cents: receipt.total_amount().cents(),
            total_items: receipt.total_items(),
        }
    }
}

#[derive(Serialize)]
pub struct SalesStatsResponse {
    pub total_sales_cents: i64,
    pub total_orders: u64,
    pub average_order_value_cents: i64,
}

impl From<SalesSummary> for SalesStatsResponse {
    fn from(summary: SalesSummary) -> Self {
        Self {
            total_sales_cents: summary.total_sales.cents(),
            total_orders: summary.total_orders,
            average_order_value_cents: summary.average_order_value.cents(),
        }
    }
}

fn ensure_owner(receipt: &Receipt, caller: &Purchaser) -> Result<(), ApiError> {
    if receipt.purchaser() != caller {
        return Err(ApiError::Forbidden(
            "Receipt belongs to another purchaser".to_string(),
        ));
    }
    Ok(())
}

/// GET /receipts: the caller's receipts, newest first.
#[tracing::instrument(skip(state))]
pub async fn list<S: Storage>(
    State(state): State<Arc<AppState<S>>>,
    Caller(purchaser): Caller,
) -> Result<Json<Vec<ReceiptResponse>>, ApiError> {
    let receipts = state.receipts.receipts_for(&purchaser).await?;
    Ok(Json(receipts.iter().map(ReceiptResponse::from).collect()))
}

/// GET /receipts/{id}: one of the caller's receipts.
#[tracing::instrument(skip(state))]
pub async fn get<S: Storage>(
    State(state): State<Arc<AppState<S>>>,
    Path(id): Path<String>,
    Caller(purchaser): Caller,
) -> Result<Json<ReceiptResponse>, ApiError> {
    let receipt_id = parse_receipt_id(&id)?;
    let receipt = state
        .receipts
        .get_receipt(receipt_id)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("Receipt {id} not found")))?;

    ensure_owner(&receipt, &purchaser)?;
    Ok(Json(ReceiptResponse::from(&receipt)))
}

/// GET /receipts/code/{code}: look a receipt up by its code.
#[tracing::instrument(skip(state))]
pub async fn get_by_code<S: Storage>(
    State(state): State<Arc<AppState<S>>>,
    Path(code): Path<String>,
    Caller(purchaser): Caller,
) -> Result<Json<ReceiptResponse>, ApiError> {
    let receipt_code =
        ReceiptCode::new(code.as_str()).map_err(|e| ApiError::BadRequest(e.to_string()))?;
    let receipt = state
        .receipts
        .get_receipt_by_code(&receipt_code)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("Receipt {code} not found")))?;

    ensure_owner(&receipt, &purchaser)?;
    Ok(Json(ReceiptResponse::from(&receipt)))
}

/// GET /receipts/stats/sales: sales totals over an optional time range.
#[tracing::instrument(skip(state, query))]
pub async fn sales_stats<S: Storage>(
    State(state): State<Arc<AppState<S>>>,
    Query(query): Query<SalesQuery>,
    Caller(_purchaser): Caller,
) -> Result<Json<SalesStatsResponse>, ApiError> {
    if let (Some(start), Some(end)) = (query.start, query.end)
        && start > end
    {
        return Err(ApiError::BadRequest(
            "start must not be after end".to_string(),
        ));
    }

    let summary = state.receipts.sales_summary(query.start, query.end).await?;
    Ok(Json(summary.into()))
}
