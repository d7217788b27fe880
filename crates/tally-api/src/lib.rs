//! JSON REST API for Tally.
//!
//! Exposes an axum [`Router`] backed by any
//! [`tally_core::store::InventoryStore`]. Auth, TLS, and transport concerns
//! are the caller's responsibility.
//!
//! # Mounting
//!
//! ```rust,ignore
//! .nest("/api", tally_api::api_router(store.clone()))
//! ```

pub mod categories;
pub mod error;
pub mod inventory;
pub mod products;

use std::sync::Arc;

use axum::{
  Router,
  routing::{get, post},
};
use serde::Deserialize;
use tally_core::store::{InventoryStore, Page};

pub use error::ApiError;

/// Offset/limit query parameters shared by the listing endpoints.
#[derive(Debug, Clone, Copy, Default, Deserialize)]
pub struct PageParams {
  pub offset: Option<usize>,
  pub limit:  Option<usize>,
}

impl From<PageParams> for Page {
  fn from(p: PageParams) -> Self {
    let default = Page::default();
    Page {
      offset: p.offset.unwrap_or(default.offset),
      limit:  p.limit.unwrap_or(default.limit),
    }
  }
}

/// Build a fully-materialised API router for `store`.
///
/// The returned `Router<()>` can be nested into any parent router regardless
/// of its own state type.
pub fn api_router<S>(store: Arc<S>) -> Router<()>
where
  S: InventoryStore + 'static,
{
  Router::new()
    // Categories
    .route(
      "/categories",
      get(categories::list::<S>).post(categories::create::<S>),
    )
    .route(
      "/categories/{id}",
      get(categories::get_one::<S>)
        .patch(categories::update::<S>)
        .delete(categories::delete_one::<S>),
    )
    // Products
    .route(
      "/products",
      get(products::list::<S>).post(products::create::<S>),
    )
    .route(
      "/products/{id}",
      get(products::get_one::<S>)
        .patch(products::update::<S>)
        .delete(products::delete_one::<S>),
    )
    .route("/products/sku/{sku}", get(products::get_by_sku::<S>))
    .route(
      "/products/{id}/price-history",
      get(products::price_history::<S>),
    )
    // Inventory
    .route("/inventory", get(inventory::list::<S>))
    .route("/inventory/history", get(inventory::history::<S>))
    .route(
      "/inventory/{product_id}",
      get(inventory::get_one::<S>).put(inventory::set::<S>),
    )
    .route(
      "/inventory/{product_id}/adjust",
      post(inventory::adjust::<S>),
    )
    .with_state(store)
}
