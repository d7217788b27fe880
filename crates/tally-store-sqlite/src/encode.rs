//! Encoding and decoding helpers between Rust domain types and the plain-text
//! representations stored in SQLite columns.
//!
//! Timestamps are stored as fixed-width RFC 3339 strings (microsecond
//! precision) so lexicographic ordering matches chronological ordering.
//! Prices are stored as canonical decimal strings. UUIDs are stored as
//! hyphenated lowercase strings.

use chrono::{DateTime, SecondsFormat, Utc};
use rust_decimal::Decimal;
use tally_core::{
  catalog::{Category, Product},
  stock::{Inventory, InventoryHistory, PriceHistory},
};
use uuid::Uuid;

use crate::{Error, Result};

// ─── Uuid ────────────────────────────────────────────────────────────────────

pub fn encode_uuid(id: Uuid) -> String { id.hyphenated().to_string() }

pub fn decode_uuid(s: &str) -> Result<Uuid> { Ok(Uuid::parse_str(s)?) }

// ─── DateTime<Utc> ───────────────────────────────────────────────────────────

pub fn encode_dt(dt: DateTime<Utc>) -> String {
  dt.to_rfc3339_opts(SecondsFormat::Micros, true)
}

pub fn decode_dt(s: &str) -> Result<DateTime<Utc>> {
  DateTime::parse_from_rfc3339(s)
    .map(|dt| dt.with_timezone(&Utc))
    .map_err(|e| Error::DateParse(e.to_string()))
}

// ─── Decimal ─────────────────────────────────────────────────────────────────

pub fn encode_decimal(d: Decimal) -> String { d.to_string() }

pub fn decode_decimal(s: &str) -> Result<Decimal> { Ok(s.parse::<Decimal>()?) }

// ─── Row types ───────────────────────────────────────────────────────────────

/// Raw strings read directly from a `categories` row.
pub struct RawCategory {
  pub category_id: String,
  pub name:        String,
  pub description: Option<String>,
  pub created_at:  String,
}

impl RawCategory {
  pub fn into_category(self) -> Result<Category> {
    Ok(Category {
      category_id: decode_uuid(&self.category_id)?,
      name:        self.name,
      description: self.description,
      created_at:  decode_dt(&self.created_at)?,
    })
  }
}

/// Raw strings read directly from a `products` row.
pub struct RawProduct {
  pub product_id:  String,
  pub sku:         String,
  pub name:        String,
  pub description: Option<String>,
  pub category_id: Option<String>,
  pub price:       String,
  pub is_active:   bool,
  pub created_at:  String,
}

impl RawProduct {
  pub fn into_product(self) -> Result<Product> {
    Ok(Product {
      product_id:  decode_uuid(&self.product_id)?,
      sku:         self.sku,
      name:        self.name,
      description: self.description,
      category_id: self
        .category_id
        .as_deref()
        .map(decode_uuid)
        .transpose()?,
      price:       decode_decimal(&self.price)?,
      is_active:   self.is_active,
      created_at:  decode_dt(&self.created_at)?,
    })
  }
}

/// Raw strings read directly from an `inventory` row.
pub struct RawInventory {
  pub inventory_id: String,
  pub product_id:   String,
  pub quantity:     i64,
  pub last_updated: String,
}

impl RawInventory {
  pub fn into_inventory(self) -> Result<Inventory> {
    Ok(Inventory {
      inventory_id: decode_uuid(&self.inventory_id)?,
      product_id:   decode_uuid(&self.product_id)?,
      quantity:     self.quantity,
      last_updated: decode_dt(&self.last_updated)?,
    })
  }
}

/// Raw strings read directly from a `price_history` row.
pub struct RawPriceHistory {
  pub history_id: String,
  pub product_id: String,
  pub old_price:  Option<String>,
  pub new_price:  String,
  pub changed_at: String,
}

impl RawPriceHistory {
  pub fn into_history(self) -> Result<PriceHistory> {
    Ok(PriceHistory {
      history_id: decode_uuid(&self.history_id)?,
      product_id: decode_uuid(&self.product_id)?,
      old_price:  self
        .old_price
        .as_deref()
        .map(decode_decimal)
        .transpose()?,
      new_price:  decode_decimal(&self.new_price)?,
      changed_at: decode_dt(&self.changed_at)?,
    })
  }
}

/// Raw strings read directly from an `inventory_history` row.
pub struct RawInventoryHistory {
  pub history_id:   String,
  pub product_id:   String,
  pub old_quantity: Option<i64>,
  pub new_quantity: i64,
  pub changed_at:   String,
  pub reason:       Option<String>,
}

impl RawInventoryHistory {
  pub fn into_history(self) -> Result<InventoryHistory> {
    Ok(InventoryHistory {
      history_id:   decode_uuid(&self.history_id)?,
      product_id:   decode_uuid(&self.product_id)?,
      old_quantity: self.old_quantity,
      new_quantity: self.new_quantity,
      changed_at:   decode_dt(&self.changed_at)?,
      reason:       self.reason,
    })
  }
}
