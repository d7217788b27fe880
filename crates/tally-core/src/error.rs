//! The domain error taxonomy for `tally-core`.
//!
//! Backends map their own error types into this enum (see the
//! `Into<Error>` bound on [`InventoryStore::Error`](crate::store::InventoryStore)),
//! so host layers can classify failures without knowing the backend.

use thiserror::Error;
use uuid::Uuid;

#[derive(Debug, Error)]
pub enum Error {
  #[error("category not found: {0}")]
  CategoryNotFound(Uuid),

  #[error("product not found: {0}")]
  ProductNotFound(Uuid),

  #[error("product not found for sku: {0:?}")]
  SkuNotFound(String),

  #[error("inventory not found for product: {0}")]
  InventoryNotFound(Uuid),

  #[error("category name already taken: {0:?}")]
  DuplicateCategoryName(String),

  #[error("sku already taken: {0:?}")]
  DuplicateSku(String),

  /// A product referenced a category id that does not exist.
  #[error("unknown category: {0}")]
  UnknownCategory(Uuid),

  #[error(
    "insufficient inventory for product {product_id}: \
     have {available}, requested change {requested}"
  )]
  InsufficientStock {
    product_id: Uuid,
    available:  i64,
    requested:  i64,
  },

  /// A stored value could not be decoded back into its domain type.
  #[error("corrupt stored value: {0}")]
  Corrupt(String),

  /// Underlying store failure (I/O, constraint, deadlock). Never retried
  /// here; surfaced unchanged to the caller.
  #[error("store error: {0}")]
  Store(String),
}

impl Error {
  /// True for errors that mean "the requested entity does not exist".
  pub fn is_not_found(&self) -> bool {
    matches!(
      self,
      Self::CategoryNotFound(_)
        | Self::ProductNotFound(_)
        | Self::SkuNotFound(_)
        | Self::InventoryNotFound(_)
    )
  }

  /// True for uniqueness or invariant violations. These always roll back
  /// the full operation that raised them.
  pub fn is_conflict(&self) -> bool {
    matches!(
      self,
      Self::DuplicateCategoryName(_)
        | Self::DuplicateSku(_)
        | Self::UnknownCategory(_)
        | Self::InsufficientStock { .. }
    )
  }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
