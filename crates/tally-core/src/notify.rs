//! Post-commit change notification.
//!
//! A [`ChangeSink`] is supplied by the host layer and invoked by the store
//! strictly *after* a stock mutation has committed. Delivery is best-effort
//! and fire-and-forget: the interface cannot return an error, so a slow or
//! broken sink can never affect the caller-visible result of the mutation
//! that triggered it. Attaching no sink is legal — notification is then a
//! no-op.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A committed stock mutation, as delivered to a [`ChangeSink`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StockChange {
  /// Id of the inventory-history row written by the mutation.
  pub history_id:   Uuid,
  pub product_id:   Uuid,
  pub old_quantity: i64,
  pub new_quantity: i64,
  pub reason:       Option<String>,
}

/// Receives post-commit stock-change notifications.
///
/// Implementations must not block: hand the change off to a channel or task
/// and return. The store calls this synchronously from its commit path.
pub trait ChangeSink: Send + Sync {
  fn notify(&self, change: StockChange);
}
