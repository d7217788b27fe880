//! Handlers for `/categories` endpoints.
//!
//! | Method   | Path | Notes |
//! |----------|------|-------|
//! | `GET`    | `/categories` | |
//! | `POST`   | `/categories` | Body: `{"name":"...", "description":"..."}` |
//! | `GET`    | `/categories/:id` | 404 if not found |
//! | `PATCH`  | `/categories/:id` | Partial update |
//! | `DELETE` | `/categories/:id` | Referencing products keep existing |

use std::sync::Arc;

use axum::{
  Json,
  extract::{Path, State},
  http::StatusCode,
  response::IntoResponse,
};
use tally_core::{
  catalog::{Category, CategoryPatch, NewCategory},
  store::InventoryStore,
};
use uuid::Uuid;

use crate::error::{ApiError, store_err};

/// `GET /categories`
pub async fn list<S>(
  State(store): State<Arc<S>>,
) -> Result<Json<Vec<Category>>, ApiError>
where
  S: InventoryStore,
{
  let categories = store.list_categories().await.map_err(store_err)?;
  Ok(Json(categories))
}

/// `POST /categories`
pub async fn create<S>(
  State(store): State<Arc<S>>,
  Json(body): Json<NewCategory>,
) -> Result<impl IntoResponse, ApiError>
where
  S: InventoryStore,
{
  let category = store.create_category(body).await.map_err(store_err)?;
  Ok((StatusCode::CREATED, Json(category)))
}

/// `GET /categories/:id`
pub async fn get_one<S>(
  State(store): State<Arc<S>>,
  Path(id): Path<Uuid>,
) -> Result<Json<Category>, ApiError>
where
  S: InventoryStore,
{
  let category = store.get_category(id).await.map_err(store_err)?;
  Ok(Json(category))
}

/// `PATCH /categories/:id`
pub async fn update<S>(
  State(store): State<Arc<S>>,
  Path(id): Path<Uuid>,
  Json(patch): Json<CategoryPatch>,
) -> Result<Json<Category>, ApiError>
where
  S: InventoryStore,
{
  let category = store.update_category(id, patch).await.map_err(store_err)?;
  Ok(Json(category))
}

/// `DELETE /categories/:id`
pub async fn delete_one<S>(
  State(store): State<Arc<S>>,
  Path(id): Path<Uuid>,
) -> Result<StatusCode, ApiError>
where
  S: InventoryStore,
{
  store.delete_category(id).await.map_err(store_err)?;
  Ok(StatusCode::NO_CONTENT)
}
