//! Catalog endpoints.

use std::sync::Arc;

use axum::Json;
use axum::extract::{Path, Query, State};
use domain::{CatalogItem, ItemId, Money};
use serde::{Deserialize, Serialize};
use store::{InventoryStore, Storage};

use crate::error::ApiError;
use crate::state::AppState;

#[derive(Deserialize)]
pub struct ListItemsQuery {
    #[serde(default)]
    pub include_inactive: bool,
}

#[derive(Deserialize)]
pub struct PutItemRequest {
    pub title: String,
    pub price_cents: i64,
    pub stock: u32,
    #[serde(default = "default_active")]
    pub active: bool,
}

fn default_active() -> bool {
    true
}

#[derive(Serialize)]
pub struct ItemResponse {
    pub id: String,
    pub title: String,
    pub price_cents: i64,
    pub stock: u32,
    pub active: bool,
}

impl From<CatalogItem> for ItemResponse {
    fn from(item: CatalogItem) -> Self {
        Self {
            id: item.id.to_string(),
            title: item.title,
            price_cents: item.price.cents(),
            stock: item.stock,
            active: item.active,
        }
    }
}

/// GET /items: list catalog items ordered by ID.
#[tracing::instrument(skip(state, query))]
pub async fn list<S: Storage>(
    State(state): State<Arc<AppState<S>>>,
    Query(query): Query<ListItemsQuery>,
) -> Result<Json<Vec<ItemResponse>>, ApiError> {
    let items = state.inventory.list_items(!query.include_inactive).await?;
    Ok(Json(items.into_iter().map(ItemResponse::from).collect()))
}

/// GET /items/{id}: load one catalog item.
#[tracing::instrument(skip(state))]
pub async fn get<S: Storage>(
    State(state): State<Arc<AppState<S>>>,
    Path(id): Path<String>,
) -> Result<Json<ItemResponse>, ApiError> {
    let item = state
        .inventory
        .get_item(&ItemId::new(id.as_str()))
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("Item {id} not found")))?;
    Ok(Json(item.into()))
}

/// PUT /items/{id}: create or replace a catalog item.
#[tracing::instrument(skip(state, req))]
pub async fn put<S: Storage>(
    State(state): State<Arc<AppState<S>>>,
    Path(id): Path<String>,
    Json(req): Json<PutItemRequest>,
) -> Result<Json<ItemResponse>, ApiError> {
    let mut item = CatalogItem::new(id, req.title, Money::from_cents(req.price_cents), req.stock)
        .map_err(|e| ApiError::BadRequest(e.to_string()))?;
    if !req.active {
        item = item.deactivated();
    }

    state.inventory.put_item(&item).await?;
    tracing::info!(item_id = %item.id, stock = item.stock, "catalog item stored");

    Ok(Json(item.into()))
}
