//! The `InventoryStore` trait and supporting query types.
//!
//! The trait is implemented by storage backends (e.g. `tally-store-sqlite`).
//! Higher layers (`tally-api`) depend on this abstraction, not on any
//! concrete backend.

use std::future::Future;

use uuid::Uuid;

use crate::{
  catalog::{
    Category, CategoryPatch, NewCategory, NewProduct, Product, ProductDetail,
    ProductFilter, ProductPatch,
  },
  stock::{Inventory, InventoryHistory, PriceHistory},
};

// ─── Pagination ──────────────────────────────────────────────────────────────

/// An offset/limit window over a listing. No total-count contract.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Page {
  pub offset: usize,
  pub limit:  usize,
}

impl Default for Page {
  fn default() -> Self { Self { offset: 0, limit: 50 } }
}

// ─── Trait ───────────────────────────────────────────────────────────────────

/// Abstraction over an inventory store backend.
///
/// Every mutating operation is a single unit of work: either all of its
/// writes (state change plus audit row) commit, or none do. Backends must
/// serialize the read-validate-write sequence of `adjust_inventory` per
/// product, so the non-negative quantity invariant holds under concurrent
/// callers.
///
/// All methods return `Send` futures so the trait can be used in
/// multi-threaded async runtimes (e.g. tokio with `axum`).
pub trait InventoryStore: Send + Sync {
  type Error: std::error::Error
    + Into<crate::Error>
    + Send
    + Sync
    + 'static;

  // ── Categories ────────────────────────────────────────────────────────

  /// Create a category. Fails with a duplicate-name conflict if the name
  /// is already taken.
  fn create_category(
    &self,
    input: NewCategory,
  ) -> impl Future<Output = Result<Category, Self::Error>> + Send + '_;

  /// Retrieve a category by id. Fails with not-found if absent.
  fn get_category(
    &self,
    id: Uuid,
  ) -> impl Future<Output = Result<Category, Self::Error>> + Send + '_;

  /// List every category. Order is unspecified.
  fn list_categories(
    &self,
  ) -> impl Future<Output = Result<Vec<Category>, Self::Error>> + Send + '_;

  /// Apply the supplied fields and return the post-update row.
  fn update_category(
    &self,
    id: Uuid,
    patch: CategoryPatch,
  ) -> impl Future<Output = Result<Category, Self::Error>> + Send + '_;

  /// Delete a category. Products referencing it keep existing with their
  /// category reference cleared.
  fn delete_category(
    &self,
    id: Uuid,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + '_;

  // ── Products ──────────────────────────────────────────────────────────

  /// Create a product together with its inventory record and the two seed
  /// history rows, all in one unit of work. Fails with a duplicate-sku
  /// conflict if the SKU is taken.
  fn create_product(
    &self,
    input: NewProduct,
  ) -> impl Future<Output = Result<Product, Self::Error>> + Send + '_;

  /// Retrieve a product with its category eagerly resolved.
  fn get_product(
    &self,
    id: Uuid,
  ) -> impl Future<Output = Result<ProductDetail, Self::Error>> + Send + '_;

  /// Retrieve a product by SKU.
  fn get_product_by_sku<'a>(
    &'a self,
    sku: &'a str,
  ) -> impl Future<Output = Result<Product, Self::Error>> + Send + 'a;

  /// List products matching `filter` (conjunctive optional filters,
  /// offset/limit pagination).
  fn list_products<'a>(
    &'a self,
    filter: &'a ProductFilter,
  ) -> impl Future<Output = Result<Vec<Product>, Self::Error>> + Send + 'a;

  /// Apply the supplied fields and return the post-update row. A price
  /// change writes one price-history row in the same unit of work.
  fn update_product(
    &self,
    id: Uuid,
    patch: ProductPatch,
  ) -> impl Future<Output = Result<Product, Self::Error>> + Send + '_;

  /// Delete a product, cascading to its inventory record and both history
  /// tables.
  fn delete_product(
    &self,
    id: Uuid,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + '_;

  // ── Inventory ledger ──────────────────────────────────────────────────

  /// Current stock level for a product.
  fn get_inventory(
    &self,
    product_id: Uuid,
  ) -> impl Future<Output = Result<Inventory, Self::Error>> + Send + '_;

  /// List stock levels, optionally restricted to `quantity > 0`.
  fn list_inventory(
    &self,
    in_stock_only: bool,
    page: Page,
  ) -> impl Future<Output = Result<Vec<Inventory>, Self::Error>> + Send + '_;

  /// Overwrite the quantity unconditionally and record the change. The
  /// quantity write and its history row commit together.
  fn set_inventory(
    &self,
    product_id: Uuid,
    new_quantity: i64,
    reason: Option<String>,
  ) -> impl Future<Output = Result<Inventory, Self::Error>> + Send + '_;

  /// Apply a signed delta to the quantity. If the result would be
  /// negative the whole operation aborts with an insufficient-stock
  /// conflict and nothing is written — no quantity change, no history row,
  /// no notification.
  fn adjust_inventory(
    &self,
    product_id: Uuid,
    delta: i64,
    reason: Option<String>,
  ) -> impl Future<Output = Result<Inventory, Self::Error>> + Send + '_;

  // ── Audit history reads ───────────────────────────────────────────────

  /// Quantity-change history, newest first, optionally scoped to one
  /// product.
  fn list_inventory_history(
    &self,
    product_id: Option<Uuid>,
    page: Page,
  ) -> impl Future<Output = Result<Vec<InventoryHistory>, Self::Error>> + Send + '_;

  /// Price-change history for one product, newest first.
  fn list_price_history(
    &self,
    product_id: Uuid,
    page: Page,
  ) -> impl Future<Output = Result<Vec<PriceHistory>, Self::Error>> + Send + '_;
}
