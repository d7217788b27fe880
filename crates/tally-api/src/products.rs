//! Handlers for `/products` endpoints.
//!
//! | Method   | Path | Notes |
//! |----------|------|-------|
//! | `GET`    | `/products` | Filters via query string; all conjunctive |
//! | `POST`   | `/products` | Creates inventory + seed history rows too |
//! | `GET`    | `/products/:id` | Category eagerly resolved |
//! | `PATCH`  | `/products/:id` | Price change writes a price-history row |
//! | `DELETE` | `/products/:id` | Cascades to inventory and history |
//! | `GET`    | `/products/sku/:sku` | |
//! | `GET`    | `/products/:id/price-history` | Newest first |

use std::sync::Arc;

use axum::{
  Json,
  extract::{Path, Query, State},
  http::StatusCode,
  response::IntoResponse,
};
use tally_core::{
  catalog::{NewProduct, Product, ProductDetail, ProductFilter, ProductPatch},
  stock::PriceHistory,
  store::InventoryStore,
};
use uuid::Uuid;

use crate::{
  PageParams,
  error::{ApiError, store_err},
};

/// `GET /products` — filter fields map 1:1 onto [`ProductFilter`].
pub async fn list<S>(
  State(store): State<Arc<S>>,
  Query(filter): Query<ProductFilter>,
) -> Result<Json<Vec<Product>>, ApiError>
where
  S: InventoryStore,
{
  let products = store.list_products(&filter).await.map_err(store_err)?;
  Ok(Json(products))
}

/// `POST /products`
pub async fn create<S>(
  State(store): State<Arc<S>>,
  Json(body): Json<NewProduct>,
) -> Result<impl IntoResponse, ApiError>
where
  S: InventoryStore,
{
  let product = store.create_product(body).await.map_err(store_err)?;
  Ok((StatusCode::CREATED, Json(product)))
}

/// `GET /products/:id`
pub async fn get_one<S>(
  State(store): State<Arc<S>>,
  Path(id): Path<Uuid>,
) -> Result<Json<ProductDetail>, ApiError>
where
  S: InventoryStore,
{
  let detail = store.get_product(id).await.map_err(store_err)?;
  Ok(Json(detail))
}

/// `GET /products/sku/:sku`
pub async fn get_by_sku<S>(
  State(store): State<Arc<S>>,
  Path(sku): Path<String>,
) -> Result<Json<Product>, ApiError>
where
  S: InventoryStore,
{
  let product = store.get_product_by_sku(&sku).await.map_err(store_err)?;
  Ok(Json(product))
}

/// `PATCH /products/:id`
pub async fn update<S>(
  State(store): State<Arc<S>>,
  Path(id): Path<Uuid>,
  Json(patch): Json<ProductPatch>,
) -> Result<Json<Product>, ApiError>
where
  S: InventoryStore,
{
  let product = store.update_product(id, patch).await.map_err(store_err)?;
  Ok(Json(product))
}

/// `DELETE /products/:id`
pub async fn delete_one<S>(
  State(store): State<Arc<S>>,
  Path(id): Path<Uuid>,
) -> Result<StatusCode, ApiError>
where
  S: InventoryStore,
{
  store.delete_product(id).await.map_err(store_err)?;
  Ok(StatusCode::NO_CONTENT)
}

/// `GET /products/:id/price-history`
pub async fn price_history<S>(
  State(store): State<Arc<S>>,
  Path(id): Path<Uuid>,
  Query(page): Query<PageParams>,
) -> Result<Json<Vec<PriceHistory>>, ApiError>
where
  S: InventoryStore,
{
  let history = store
    .list_price_history(id, page.into())
    .await
    .map_err(store_err)?;
  Ok(Json(history))
}
