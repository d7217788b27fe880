//! Catalog entities — categories and products.
//!
//! Products carry a weak, nullable reference to their category: deleting a
//! category clears the reference on its products rather than deleting them.
//! Everything a product owns (inventory, history) is cascade-deleted with it.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

// ─── Category ────────────────────────────────────────────────────────────────

/// A named grouping for products. Names are unique across the store.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Category {
  pub category_id: Uuid,
  pub name:        String,
  pub description: Option<String>,
  pub created_at:  DateTime<Utc>,
}

/// Input for creating a category. The id and timestamp are store-assigned.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewCategory {
  pub name:        String,
  pub description: Option<String>,
}

impl NewCategory {
  pub fn new(name: impl Into<String>) -> Self {
    Self { name: name.into(), description: None }
  }
}

/// Partial update for a category — only supplied fields are applied.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CategoryPatch {
  pub name:        Option<String>,
  pub description: Option<String>,
}

// ─── Product ─────────────────────────────────────────────────────────────────

/// A catalog product. The SKU is globally unique; `price` is fixed-point
/// decimal. Each product owns exactly one inventory record and its full
/// price/quantity audit history.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Product {
  pub product_id:  Uuid,
  pub sku:         String,
  pub name:        String,
  pub description: Option<String>,
  pub category_id: Option<Uuid>,
  pub price:       Decimal,
  pub is_active:   bool,
  pub created_at:  DateTime<Utc>,
}

/// Input for creating a product.
///
/// Creation is a single unit of work: the product row, its inventory record
/// (seeded with `initial_quantity`), and the two initial audit rows
/// (`old = NULL`) all commit together or not at all.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewProduct {
  pub name:             String,
  pub sku:              String,
  pub price:            Decimal,
  pub category_id:      Option<Uuid>,
  pub description:      Option<String>,
  /// Starting stock level; defaults to zero.
  #[serde(default)]
  pub initial_quantity: i64,
}

impl NewProduct {
  pub fn new(
    name: impl Into<String>,
    sku: impl Into<String>,
    price: Decimal,
  ) -> Self {
    Self {
      name:             name.into(),
      sku:              sku.into(),
      price,
      category_id:      None,
      description:      None,
      initial_quantity: 0,
    }
  }
}

/// Partial update for a product — only supplied fields are applied.
///
/// A `price` that differs from the current value produces one price-history
/// row in the same unit of work as the field update. No other field writes
/// audit rows.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProductPatch {
  pub name:        Option<String>,
  pub description: Option<String>,
  pub category_id: Option<Uuid>,
  pub price:       Option<Decimal>,
  pub is_active:   Option<bool>,
}

/// A product with its category eagerly resolved — never stored, always
/// assembled on read.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProductDetail {
  pub product:  Product,
  pub category: Option<Category>,
}

// ─── Listing filter ──────────────────────────────────────────────────────────

/// Parameters for [`InventoryStore::list_products`](crate::store::InventoryStore::list_products).
///
/// Filters are independently optional and conjunctive (AND).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProductFilter {
  /// Case-insensitive substring match on the product name.
  pub name:        Option<String>,
  /// Exact SKU match.
  pub sku:         Option<String>,
  pub category_id: Option<Uuid>,
  pub is_active:   Option<bool>,
  /// Inclusive lower price bound.
  pub price_min:   Option<Decimal>,
  /// Inclusive upper price bound.
  pub price_max:   Option<Decimal>,
  pub offset:      Option<usize>,
  pub limit:       Option<usize>,
}
