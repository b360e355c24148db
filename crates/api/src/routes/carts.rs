//! Cart management and purchase endpoints.

use std::sync::Arc;

use axum::Json;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use checkout::{CartTotal, CheckoutOutcome, CheckoutStatus, RejectedLine};
use common::CartId;
use domain::{Cart, ItemId, MAX_LINE_QUANTITY, Purchaser, ResolvedCart};
use serde::{Deserialize, Serialize};
use store::Storage;

use crate::error::ApiError;
use crate::identity::Caller;
use crate::routes::parse_cart_id;
use crate::routes::receipts::{ReceiptLineResponse, ReceiptResponse};
use crate::state::AppState;

// -- Request types --

#[derive(Deserialize)]
pub struct AddLineRequest {
    pub quantity: i64,
}

#[derive(Deserialize)]
pub struct UpdateLineRequest {
    pub quantity: i64,
}

// -- Response types --

#[derive(Serialize)]
pub struct CartLineResponse {
    pub item_id: String,
    /// `None` when the item is gone from the catalog.
    pub title: Option<String>,
    pub quantity: u32,
    pub unit_price_cents: Option<i64>,
    pub subtotal_cents: Option<i64>,
}

#[derive(Serialize)]
pub struct CartResponse {
    pub id: String,
    pub owner: Option<String>,
    pub lines: Vec<CartLineResponse>,
    pub total_amount_cents: i64,
    pub total_items: u64,
}

impl From<&ResolvedCart> for CartResponse {
    fn from(resolved: &ResolvedCart) -> Self {
        let lines = resolved
            .lines
            .iter()
            .map(|line| CartLineResponse {
                item_id: line.line.item_id.to_string(),
                title: line.item.as_ref().map(|item| item.title.clone()),
                quantity: line.line.quantity,
                unit_price_cents: line.item.as_ref().map(|item| item.price.cents()),
                subtotal_cents: CartTotal::line_subtotal(line).map(|s| s.cents()),
            })
            .collect();
        let total = CartTotal::of(resolved);

        Self {
            id: resolved.cart.id().to_string(),
            owner: resolved.cart.owner().map(|o| o.to_string()),
            lines,
            total_amount_cents: total.total_amount.cents(),
            total_items: total.total_items,
        }
    }
}

#[derive(Serialize)]
pub struct CartTotalResponse {
    pub total_amount_cents: i64,
    pub total_items: u64,
}

impl From<CartTotal> for CartTotalResponse {
    fn from(total: CartTotal) -> Self {
        Self {
            total_amount_cents: total.total_amount.cents(),
            total_items: total.total_items,
        }
    }
}

#[derive(Serialize)]
pub struct RejectedLineResponse {
    pub item_id: String,
    pub title: Option<String>,
    pub requested: u32,
    pub available: u32,
    pub shortfall: u32,
}

impl From<&RejectedLine> for RejectedLineResponse {
    fn from(line: &RejectedLine) -> Self {
        Self {
            item_id: line.item_id.to_string(),
            title: line.title.clone(),
            requested: line.requested,
            available: line.available,
            shortfall: line.shortfall(),
        }
    }
}

#[derive(Serialize)]
pub struct PurchaseResponse {
    pub success: bool,
    pub status: CheckoutStatus,
    pub message: String,
    pub receipt: Option<ReceiptResponse>,
    pub purchased_lines: Vec<ReceiptLineResponse>,
    pub rejected_lines: Vec<RejectedLineResponse>,
    pub total_amount_cents: i64,
    pub total_items: u64,
    pub cart_sync_error: Option<String>,
}

impl From<&CheckoutOutcome> for PurchaseResponse {
    fn from(outcome: &CheckoutOutcome) -> Self {
        Self {
            success: outcome.success(),
            status: outcome.status,
            message: outcome.message().to_string(),
            receipt: outcome.receipt.as_ref().map(ReceiptResponse::from),
            purchased_lines: outcome.purchased.iter().map(ReceiptLineResponse::from).collect(),
            rejected_lines: outcome.rejected.iter().map(RejectedLineResponse::from).collect(),
            total_amount_cents: outcome.total_amount().cents(),
            total_items: outcome.total_items(),
            cart_sync_error: outcome.cart_sync_error.clone(),
        }
    }
}

// -- Helpers --

/// Loads a cart and checks the caller may use it.
async fn authorize<S: Storage>(
    state: &AppState<S>,
    cart_id: CartId,
    purchaser: &Purchaser,
) -> Result<Cart, ApiError> {
    let cart = state.carts.get_cart(cart_id).await?;
    if !cart.is_accessible_by(purchaser) {
        return Err(ApiError::Forbidden(format!(
            "Cart {cart_id} belongs to another purchaser"
        )));
    }
    Ok(cart)
}

async fn cart_response<S: Storage>(
    state: &AppState<S>,
    cart_id: CartId,
) -> Result<Json<CartResponse>, ApiError> {
    let resolved = state.carts.get_cart_with_items(cart_id).await?;
    Ok(Json(CartResponse::from(&resolved)))
}

fn positive_quantity(quantity: i64) -> Result<u32, ApiError> {
    if quantity <= 0 {
        return Err(ApiError::BadRequest(format!(
            "Invalid quantity: {quantity} (must be greater than 0)"
        )));
    }
    u32::try_from(quantity)
        .ok()
        .filter(|q| *q <= MAX_LINE_QUANTITY)
        .ok_or_else(|| {
            ApiError::BadRequest(format!(
                "Quantity too large: {quantity} (at most {MAX_LINE_QUANTITY} per line)"
            ))
        })
}

// -- Handlers --

/// POST /carts: create an empty cart, owned by the caller if identified.
#[tracing::instrument(skip(state))]
pub async fn create<S: Storage>(
    State(state): State<Arc<AppState<S>>>,
    caller: Option<Caller>,
) -> Result<(StatusCode, Json<CartResponse>), ApiError> {
    let owner = caller.map(|Caller(purchaser)| purchaser);
    let cart = state.carts.create_cart(owner).await?;
    let Json(response) = cart_response(&state, cart.id()).await?;
    Ok((StatusCode::CREATED, Json(response)))
}

/// GET /carts/{id}: a cart with current catalog prices.
#[tracing::instrument(skip(state))]
pub async fn get<S: Storage>(
    State(state): State<Arc<AppState<S>>>,
    Path(id): Path<String>,
    Caller(purchaser): Caller,
) -> Result<Json<CartResponse>, ApiError> {
    let cart_id = parse_cart_id(&id)?;
    authorize(&state, cart_id, &purchaser).await?;
    cart_response(&state, cart_id).await
}

/// GET /carts/{id}/total: price the cart at current catalog prices.
#[tracing::instrument(skip(state))]
pub async fn total<S: Storage>(
    State(state): State<Arc<AppState<S>>>,
    Path(id): Path<String>,
    Caller(purchaser): Caller,
) -> Result<Json<CartTotalResponse>, ApiError> {
    let cart_id = parse_cart_id(&id)?;
    authorize(&state, cart_id, &purchaser).await?;
    let total = state.carts.cart_total(cart_id).await?;
    Ok(Json(total.into()))
}

/// DELETE /carts/{id}: remove every line.
#[tracing::instrument(skip(state))]
pub async fn clear<S: Storage>(
    State(state): State<Arc<AppState<S>>>,
    Path(id): Path<String>,
    Caller(purchaser): Caller,
) -> Result<Json<CartResponse>, ApiError> {
    let cart_id = parse_cart_id(&id)?;

    let _guard = state.gate.lock(cart_id).await;
    authorize(&state, cart_id, &purchaser).await?;
    state.carts.clear(cart_id).await?;
    cart_response(&state, cart_id).await
}

/// POST /carts/{id}/items/{item}: add units of an item (default 1).
#[tracing::instrument(skip(state, req))]
pub async fn add_line<S: Storage>(
    State(state): State<Arc<AppState<S>>>,
    Path((id, item)): Path<(String, String)>,
    Caller(purchaser): Caller,
    req: Option<Json<AddLineRequest>>,
) -> Result<Json<CartResponse>, ApiError> {
    let cart_id = parse_cart_id(&id)?;
    let quantity = match req {
        Some(Json(req)) => positive_quantity(req.quantity)?,
        None => 1,
    };

    let _guard = state.gate.lock(cart_id).await;
    authorize(&state, cart_id, &purchaser).await?;
    state
        .carts
        .add_line(cart_id, &ItemId::new(item), quantity)
        .await?;
    cart_response(&state, cart_id).await
}

/// PUT /carts/{id}/items/{item}: set a line's quantity; zero or less removes it.
#[tracing::instrument(skip(state, req))]
pub async fn update_line<S: Storage>(
    State(state): State<Arc<AppState<S>>>,
    Path((id, item)): Path<(String, String)>,
    Caller(purchaser): Caller,
    Json(req): Json<UpdateLineRequest>,
) -> Result<Json<CartResponse>, ApiError> {
    let cart_id = parse_cart_id(&id)?;
    let quantity = if req.quantity <= 0 {
        0
    } else {
        positive_quantity(req.quantity)?
    };

    let _guard = state.gate.lock(cart_id).await;
    authorize(&state, cart_id, &purchaser).await?;
    state
        .carts
        .update_line(cart_id, &ItemId::new(item), quantity)
        .await?;
    cart_response(&state, cart_id).await
}

/// DELETE /carts/{id}/items/{item}: remove a line if present.
#[tracing::instrument(skip(state))]
pub async fn remove_line<S: Storage>(
    State(state): State<Arc<AppState<S>>>,
    Path((id, item)): Path<(String, String)>,
    Caller(purchaser): Caller,
) -> Result<Json<CartResponse>, ApiError> {
    let cart_id = parse_cart_id(&id)?;

    let _guard = state.gate.lock(cart_id).await;
    authorize(&state, cart_id, &purchaser).await?;
    state.carts.remove_line(cart_id, &ItemId::new(item)).await?;
    cart_response(&state, cart_id).await
}

/// POST /carts/{id}/purchase: check the cart out.
///
/// 200 when every line sold, 207 when some did, 400 when none did.
#[tracing::instrument(skip(state))]
pub async fn purchase<S: Storage>(
    State(state): State<Arc<AppState<S>>>,
    Path(id): Path<String>,
    Caller(purchaser): Caller,
) -> Result<(StatusCode, Json<PurchaseResponse>), ApiError> {
    let cart_id = parse_cart_id(&id)?;

    let _guard = state.gate.lock(cart_id).await;
    authorize(&state, cart_id, &purchaser).await?;

    let outcome = state.checkout.checkout(cart_id, &purchaser).await?;

    let status = match outcome.status {
        CheckoutStatus::Completed => StatusCode::OK,
        CheckoutStatus::Partial => StatusCode::MULTI_STATUS,
        CheckoutStatus::NoStockAvailable => StatusCode::BAD_REQUEST,
    };

    Ok((status, Json(PurchaseResponse::from(&outcome))))
}
