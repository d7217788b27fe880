//! Handlers for `/inventory` endpoints.
//!
//! | Method | Path | Notes |
//! |--------|------|-------|
//! | `GET`  | `/inventory` | Optional `?in_stock=true` |
//! | `GET`  | `/inventory/history` | Optional `?product_id=<uuid>`, newest first |
//! | `GET`  | `/inventory/:product_id` | 404 if not found |
//! | `PUT`  | `/inventory/:product_id` | Unconditional overwrite |
//! | `POST` | `/inventory/:product_id/adjust` | 409 if stock would go negative |

use std::sync::Arc;

use axum::{
  Json,
  extract::{Path, Query, State},
};
use serde::Deserialize;
use tally_core::{
  stock::{Inventory, InventoryHistory},
  store::InventoryStore,
};
use uuid::Uuid;

use crate::{
  PageParams,
  error::{ApiError, store_err},
};

// ─── List ─────────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct ListParams {
  pub in_stock: Option<bool>,
  pub offset:   Option<usize>,
  pub limit:    Option<usize>,
}

/// `GET /inventory[?in_stock=true]`
pub async fn list<S>(
  State(store): State<Arc<S>>,
  Query(params): Query<ListParams>,
) -> Result<Json<Vec<Inventory>>, ApiError>
where
  S: InventoryStore,
{
  let page = PageParams { offset: params.offset, limit: params.limit };
  let rows = store
    .list_inventory(params.in_stock.unwrap_or(false), page.into())
    .await
    .map_err(store_err)?;
  Ok(Json(rows))
}

// ─── Get one ──────────────────────────────────────────────────────────────────

/// `GET /inventory/:product_id`
pub async fn get_one<S>(
  State(store): State<Arc<S>>,
  Path(product_id): Path<Uuid>,
) -> Result<Json<Inventory>, ApiError>
where
  S: InventoryStore,
{
  let inventory = store.get_inventory(product_id).await.map_err(store_err)?;
  Ok(Json(inventory))
}

// ─── Set ──────────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct SetBody {
  pub quantity: i64,
  pub reason:   Option<String>,
}

/// `PUT /inventory/:product_id` — body: `{"quantity": 12, "reason": "..."}`
pub async fn set<S>(
  State(store): State<Arc<S>>,
  Path(product_id): Path<Uuid>,
  Json(body): Json<SetBody>,
) -> Result<Json<Inventory>, ApiError>
where
  S: InventoryStore,
{
  let inventory = store
    .set_inventory(product_id, body.quantity, body.reason)
    .await
    .map_err(store_err)?;
  Ok(Json(inventory))
}

// ─── Adjust ───────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct AdjustBody {
  pub delta:  i64,
  pub reason: Option<String>,
}

/// `POST /inventory/:product_id/adjust` — body: `{"delta": -3, "reason": "..."}`
pub async fn adjust<S>(
  State(store): State<Arc<S>>,
  Path(product_id): Path<Uuid>,
  Json(body): Json<AdjustBody>,
) -> Result<Json<Inventory>, ApiError>
where
  S: InventoryStore,
{
  let inventory = store
    .adjust_inventory(product_id, body.delta, body.reason)
    .await
    .map_err(store_err)?;
  Ok(Json(inventory))
}

// ─── History ──────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct HistoryParams {
  pub product_id: Option<Uuid>,
  pub offset:     Option<usize>,
  pub limit:      Option<usize>,
}

/// `GET /inventory/history[?product_id=<uuid>]`
pub async fn history<S>(
  State(store): State<Arc<S>>,
  Query(params): Query<HistoryParams>,
) -> Result<Json<Vec<InventoryHistory>>, ApiError>
where
  S: InventoryStore,
{
  let page = PageParams { offset: params.offset, limit: params.limit };
  let rows = store
    .list_inventory_history(params.product_id, page.into())
    .await
    .map_err(store_err)?;
  Ok(Json(rows))
}
