//! Stock level and audit-history types.
//!
//! History rows are immutable once written. No update or delete ever targets
//! them; a committed change to price or quantity has exactly one
//! corresponding history row, written in the same unit of work.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

// ─── Current stock ───────────────────────────────────────────────────────────

/// The current stock level for a product (one-to-one with the product).
///
/// Invariant: `quantity >= 0` at all times. Any mutation that would violate
/// this is rejected before anything is written.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Inventory {
  pub inventory_id: Uuid,
  pub product_id:   Uuid,
  pub quantity:     i64,
  /// Refreshed on every write to this row.
  pub last_updated: DateTime<Utc>,
}

// ─── Audit history ───────────────────────────────────────────────────────────

/// An immutable record of a price change.
/// `old_price` is `None` only for the record seeded at product creation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PriceHistory {
  pub history_id: Uuid,
  pub product_id: Uuid,
  pub old_price:  Option<Decimal>,
  pub new_price:  Decimal,
  pub changed_at: DateTime<Utc>,
}

/// An immutable record of a quantity change.
/// `old_quantity` is `None` only for the initial-stock record.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InventoryHistory {
  pub history_id:   Uuid,
  pub product_id:   Uuid,
  pub old_quantity: Option<i64>,
  pub new_quantity: i64,
  pub changed_at:   DateTime<Utc>,
  /// Free-text explanation supplied by the caller, if any.
  pub reason:       Option<String>,
}

/// The reason recorded on the inventory-history row seeded at product
/// creation.
pub const INITIAL_STOCK_REASON: &str = "Initial stock";
