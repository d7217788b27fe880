//! Integration tests for `SqliteStore` against an in-memory database.

use std::sync::{Arc, Mutex};

use rust_decimal::Decimal;
use tally_core::{
  Error as CoreError,
  catalog::{CategoryPatch, NewCategory, NewProduct, ProductFilter, ProductPatch},
  notify::{ChangeSink, StockChange},
  store::{InventoryStore, Page},
};
use uuid::Uuid;

use crate::{Error, SqliteStore};

async fn store() -> SqliteStore {
  SqliteStore::open_in_memory()
    .await
    .expect("in-memory store")
}

fn dec(s: &str) -> Decimal { s.parse().expect("decimal literal") }

fn widget(sku: &str) -> NewProduct {
  NewProduct::new("Widget", sku, dec("10.00"))
}

// ─── Categories ──────────────────────────────────────────────────────────────

#[tokio::test]
async fn create_and_get_category() {
  let s = store().await;

  let created = s
    .create_category(NewCategory::new("Electronics"))
    .await
    .unwrap();
  assert_eq!(created.name, "Electronics");

  let fetched = s.get_category(created.category_id).await.unwrap();
  assert_eq!(fetched.category_id, created.category_id);
  assert_eq!(fetched.name, "Electronics");
  assert!(fetched.description.is_none());
}

#[tokio::test]
async fn get_category_missing_errors() {
  let s = store().await;
  let err = s.get_category(Uuid::new_v4()).await.unwrap_err();
  assert!(matches!(err, Error::Domain(CoreError::CategoryNotFound(_))));
}

#[tokio::test]
async fn create_category_duplicate_name_conflicts() {
  let s = store().await;
  s.create_category(NewCategory::new("Tools")).await.unwrap();

  let err = s
    .create_category(NewCategory::new("Tools"))
    .await
    .unwrap_err();
  assert!(matches!(
    err,
    Error::Domain(CoreError::DuplicateCategoryName(_))
  ));

  // The failed create left no partial state behind.
  let all = s.list_categories().await.unwrap();
  assert_eq!(all.len(), 1);
}

#[tokio::test]
async fn update_category_applies_only_supplied_fields() {
  let s = store().await;
  let cat = s.create_category(NewCategory::new("Tools")).await.unwrap();

  let updated = s
    .update_category(
      cat.category_id,
      CategoryPatch {
        description: Some("Hand tools".into()),
        ..Default::default()
      },
    )
    .await
    .unwrap();

  assert_eq!(updated.name, "Tools");
  assert_eq!(updated.description.as_deref(), Some("Hand tools"));
}

#[tokio::test]
async fn update_category_duplicate_name_conflicts() {
  let s = store().await;
  s.create_category(NewCategory::new("Tools")).await.unwrap();
  let other = s.create_category(NewCategory::new("Toys")).await.unwrap();

  let err = s
    .update_category(
      other.category_id,
      CategoryPatch { name: Some("Tools".into()), ..Default::default() },
    )
    .await
    .unwrap_err();
  assert!(matches!(
    err,
    Error::Domain(CoreError::DuplicateCategoryName(_))
  ));

  // Nothing applied.
  let unchanged = s.get_category(other.category_id).await.unwrap();
  assert_eq!(unchanged.name, "Toys");
}

#[tokio::test]
async fn update_category_missing_errors() {
  let s = store().await;
  let err = s
    .update_category(Uuid::new_v4(), CategoryPatch::default())
    .await
    .unwrap_err();
  assert!(matches!(err, Error::Domain(CoreError::CategoryNotFound(_))));
}

#[tokio::test]
async fn delete_category_clears_product_reference() {
  let s = store().await;
  let cat = s.create_category(NewCategory::new("Tools")).await.unwrap();

  let mut input = widget("W-1");
  input.category_id = Some(cat.category_id);
  let product = s.create_product(input).await.unwrap();
  assert_eq!(product.category_id, Some(cat.category_id));

  s.delete_category(cat.category_id).await.unwrap();

  // The product survives with its category reference cleared.
  let detail = s.get_product(product.product_id).await.unwrap();
  assert!(detail.product.category_id.is_none());
  assert!(detail.category.is_none());
}

#[tokio::test]
async fn delete_category_missing_errors() {
  let s = store().await;
  let err = s.delete_category(Uuid::new_v4()).await.unwrap_err();
  assert!(matches!(err, Error::Domain(CoreError::CategoryNotFound(_))));
}

// ─── Product creation ────────────────────────────────────────────────────────

#[tokio::test]
async fn create_product_seeds_inventory_and_history() {
  let s = store().await;

  let mut input = widget("A1");
  input.initial_quantity = 5;
  let product = s.create_product(input).await.unwrap();

  let inventory = s.get_inventory(product.product_id).await.unwrap();
  assert_eq!(inventory.quantity, 5);
  assert_eq!(inventory.product_id, product.product_id);

  let inv_hist = s
    .list_inventory_history(Some(product.product_id), Page::default())
    .await
    .unwrap();
  assert_eq!(inv_hist.len(), 1);
  assert_eq!(inv_hist[0].old_quantity, None);
  assert_eq!(inv_hist[0].new_quantity, 5);
  assert_eq!(inv_hist[0].reason.as_deref(), Some("Initial stock"));

  let price_hist = s
    .list_price_history(product.product_id, Page::default())
    .await
    .unwrap();
  assert_eq!(price_hist.len(), 1);
  assert_eq!(price_hist[0].old_price, None);
  assert_eq!(price_hist[0].new_price, dec("10.00"));
}

#[tokio::test]
async fn create_product_read_back_matches_input() {
  let s = store().await;

  let product = s.create_product(widget("A1")).await.unwrap();
  let detail = s.get_product(product.product_id).await.unwrap();

  assert_eq!(detail.product.sku, "A1");
  assert_eq!(detail.product.name, "Widget");
  assert_eq!(detail.product.price, dec("10.00"));
  assert!(detail.product.is_active);
}

#[tokio::test]
async fn create_product_duplicate_sku_conflicts() {
  let s = store().await;
  s.create_product(widget("A1")).await.unwrap();

  let err = s.create_product(widget("A1")).await.unwrap_err();
  assert!(matches!(err, Error::Domain(CoreError::DuplicateSku(_))));

  // Exactly one product with that sku, and no orphaned inventory row.
  let filter = ProductFilter { sku: Some("A1".into()), ..Default::default() };
  assert_eq!(s.list_products(&filter).await.unwrap().len(), 1);
  assert_eq!(
    s.list_inventory(false, Page::default()).await.unwrap().len(),
    1
  );
}

#[tokio::test]
async fn create_product_unknown_category_conflicts() {
  let s = store().await;

  let mut input = widget("A1");
  input.category_id = Some(Uuid::new_v4());
  let err = s.create_product(input).await.unwrap_err();
  assert!(matches!(err, Error::Domain(CoreError::UnknownCategory(_))));

  // All-or-nothing: no product row was written.
  let err = s.get_product_by_sku("A1").await.unwrap_err();
  assert!(matches!(err, Error::Domain(CoreError::SkuNotFound(_))));
}

// ─── Product reads ───────────────────────────────────────────────────────────

#[tokio::test]
async fn get_product_resolves_category() {
  let s = store().await;
  let cat = s
    .create_category(NewCategory::new("Electronics"))
    .await
    .unwrap();

  let mut input = widget("A1");
  input.category_id = Some(cat.category_id);
  let product = s.create_product(input).await.unwrap();

  let detail = s.get_product(product.product_id).await.unwrap();
  let resolved = detail.category.expect("category resolved");
  assert_eq!(resolved.category_id, cat.category_id);
  assert_eq!(resolved.name, "Electronics");
}

#[tokio::test]
async fn get_product_missing_errors() {
  let s = store().await;
  let err = s.get_product(Uuid::new_v4()).await.unwrap_err();
  assert!(matches!(err, Error::Domain(CoreError::ProductNotFound(_))));
}

#[tokio::test]
async fn get_product_by_sku_missing_errors() {
  let s = store().await;
  let err = s.get_product_by_sku("NOPE").await.unwrap_err();
  assert!(matches!(err, Error::Domain(CoreError::SkuNotFound(_))));
}

#[tokio::test]
async fn list_products_name_filter_is_case_insensitive() {
  let s = store().await;
  s.create_product(NewProduct::new("Blue Widget", "B1", dec("5.00")))
    .await
    .unwrap();
  s.create_product(NewProduct::new("Red Gadget", "R1", dec("7.00")))
    .await
    .unwrap();

  let filter =
    ProductFilter { name: Some("widget".into()), ..Default::default() };
  let found = s.list_products(&filter).await.unwrap();
  assert_eq!(found.len(), 1);
  assert_eq!(found[0].sku, "B1");
}

#[tokio::test]
async fn list_products_filters_are_conjunctive() {
  let s = store().await;
  let cat = s.create_category(NewCategory::new("Tools")).await.unwrap();

  let mut hammer = NewProduct::new("Hammer", "H1", dec("12.50"));
  hammer.category_id = Some(cat.category_id);
  s.create_product(hammer).await.unwrap();

  let mut saw = NewProduct::new("Hand Saw", "S1", dec("25.00"));
  saw.category_id = Some(cat.category_id);
  s.create_product(saw).await.unwrap();

  s.create_product(NewProduct::new("Hamper", "H2", dec("12.50")))
    .await
    .unwrap();

  let filter = ProductFilter {
    name: Some("ham".into()),
    category_id: Some(cat.category_id),
    ..Default::default()
  };
  let found = s.list_products(&filter).await.unwrap();
  assert_eq!(found.len(), 1);
  assert_eq!(found[0].sku, "H1");
}

#[tokio::test]
async fn list_products_price_range() {
  let s = store().await;
  s.create_product(NewProduct::new("Cheap", "C1", dec("2.00")))
    .await
    .unwrap();
  s.create_product(NewProduct::new("Mid", "M1", dec("10.00")))
    .await
    .unwrap();
  s.create_product(NewProduct::new("Dear", "D1", dec("99.99")))
    .await
    .unwrap();

  let filter = ProductFilter {
    price_min: Some(dec("5.00")),
    price_max: Some(dec("50.00")),
    ..Default::default()
  };
  let found = s.list_products(&filter).await.unwrap();
  assert_eq!(found.len(), 1);
  assert_eq!(found[0].sku, "M1");
}

#[tokio::test]
async fn list_products_pagination() {
  let s = store().await;
  for i in 0..5 {
    s.create_product(widget(&format!("P-{i}"))).await.unwrap();
  }

  let page = ProductFilter { limit: Some(2), ..Default::default() };
  assert_eq!(s.list_products(&page).await.unwrap().len(), 2);

  let rest = ProductFilter {
    offset: Some(4),
    limit: Some(10),
    ..Default::default()
  };
  assert_eq!(s.list_products(&rest).await.unwrap().len(), 1);
}

// ─── Product updates ─────────────────────────────────────────────────────────

#[tokio::test]
async fn update_product_price_change_writes_history() {
  let s = store().await;
  let product = s.create_product(widget("A1")).await.unwrap();

  let updated = s
    .update_product(
      product.product_id,
      ProductPatch { price: Some(dec("12.00")), ..Default::default() },
    )
    .await
    .unwrap();
  assert_eq!(updated.price, dec("12.00"));

  let hist = s
    .list_price_history(product.product_id, Page::default())
    .await
    .unwrap();
  // Newest first: the change, then the creation seed.
  assert_eq!(hist.len(), 2);
  assert_eq!(hist[0].old_price, Some(dec("10.00")));
  assert_eq!(hist[0].new_price, dec("12.00"));
  assert_eq!(hist[1].old_price, None);
}

#[tokio::test]
async fn update_product_non_price_field_writes_no_history() {
  let s = store().await;
  let product = s.create_product(widget("A1")).await.unwrap();

  let updated = s
    .update_product(
      product.product_id,
      ProductPatch {
        description: Some("now with 20% more widget".into()),
        ..Default::default()
      },
    )
    .await
    .unwrap();
  assert_eq!(
    updated.description.as_deref(),
    Some("now with 20% more widget")
  );

  let hist = s
    .list_price_history(product.product_id, Page::default())
    .await
    .unwrap();
  assert_eq!(hist.len(), 1); // creation seed only
}

#[tokio::test]
async fn update_product_equal_price_writes_no_history() {
  let s = store().await;
  let product = s.create_product(widget("A1")).await.unwrap();

  // Numerically equal even though the scale differs.
  s.update_product(
    product.product_id,
    ProductPatch { price: Some(dec("10.0")), ..Default::default() },
  )
  .await
  .unwrap();

  let hist = s
    .list_price_history(product.product_id, Page::default())
    .await
    .unwrap();
  assert_eq!(hist.len(), 1);
}

#[tokio::test]
async fn update_product_missing_errors() {
  let s = store().await;
  let err = s
    .update_product(Uuid::new_v4(), ProductPatch::default())
    .await
    .unwrap_err();
  assert!(matches!(err, Error::Domain(CoreError::ProductNotFound(_))));
}

#[tokio::test]
async fn update_product_unknown_category_conflicts() {
  let s = store().await;
  let product = s.create_product(widget("A1")).await.unwrap();

  let err = s
    .update_product(
      product.product_id,
      ProductPatch { category_id: Some(Uuid::new_v4()), ..Default::default() },
    )
    .await
    .unwrap_err();
  assert!(matches!(err, Error::Domain(CoreError::UnknownCategory(_))));
}

#[tokio::test]
async fn delete_product_cascades_to_inventory_and_history() {
  let s = store().await;
  let mut input = widget("A1");
  input.initial_quantity = 5;
  let product = s.create_product(input).await.unwrap();
  s.adjust_inventory(product.product_id, -2, None).await.unwrap();

  s.delete_product(product.product_id).await.unwrap();

  let err = s.get_product(product.product_id).await.unwrap_err();
  assert!(matches!(err, Error::Domain(CoreError::ProductNotFound(_))));

  let err = s.get_inventory(product.product_id).await.unwrap_err();
  assert!(matches!(err, Error::Domain(CoreError::InventoryNotFound(_))));

  assert!(
    s.list_price_history(product.product_id, Page::default())
      .await
      .unwrap()
      .is_empty()
  );
  assert!(
    s.list_inventory_history(Some(product.product_id), Page::default())
      .await
      .unwrap()
      .is_empty()
  );
}

#[tokio::test]
async fn delete_product_missing_errors() {
  let s = store().await;
  let err = s.delete_product(Uuid::new_v4()).await.unwrap_err();
  assert!(matches!(err, Error::Domain(CoreError::ProductNotFound(_))));
}

// ─── Inventory ledger ────────────────────────────────────────────────────────

#[tokio::test]
async fn adjust_inventory_applies_delta_and_records_history() {
  let s = store().await;
  let mut input = widget("A1");
  input.initial_quantity = 5;
  let product = s.create_product(input).await.unwrap();

  let inventory = s
    .adjust_inventory(product.product_id, -3, Some("sale".into()))
    .await
    .unwrap();
  assert_eq!(inventory.quantity, 2);

  let hist = s
    .list_inventory_history(Some(product.product_id), Page::default())
    .await
    .unwrap();
  assert_eq!(hist.len(), 2);
  assert_eq!(hist[0].old_quantity, Some(5));
  assert_eq!(hist[0].new_quantity, 2);
  assert_eq!(hist[0].reason.as_deref(), Some("sale"));
}

#[tokio::test]
async fn adjust_inventory_insufficient_stock_writes_nothing() {
  let s = store().await;
  let mut input = widget("A1");
  input.initial_quantity = 2;
  let product = s.create_product(input).await.unwrap();

  let err = s
    .adjust_inventory(product.product_id, -10, None)
    .await
    .unwrap_err();
  assert!(matches!(
    err,
    Error::Domain(CoreError::InsufficientStock {
      available: 2,
      requested: -10,
      ..
    })
  ));

  // Neither the quantity nor the audit trail changed.
  let inventory = s.get_inventory(product.product_id).await.unwrap();
  assert_eq!(inventory.quantity, 2);
  let hist = s
    .list_inventory_history(Some(product.product_id), Page::default())
    .await
    .unwrap();
  assert_eq!(hist.len(), 1); // initial-stock row only
}

#[tokio::test]
async fn adjust_inventory_missing_product_errors() {
  let s = store().await;
  let err = s.adjust_inventory(Uuid::new_v4(), 1, None).await.unwrap_err();
  assert!(matches!(err, Error::Domain(CoreError::InventoryNotFound(_))));
}

#[tokio::test]
async fn set_inventory_overwrites_and_records_history() {
  let s = store().await;
  let mut input = widget("A1");
  input.initial_quantity = 5;
  let product = s.create_product(input).await.unwrap();

  let inventory = s
    .set_inventory(product.product_id, 20, Some("recount".into()))
    .await
    .unwrap();
  assert_eq!(inventory.quantity, 20);

  let hist = s
    .list_inventory_history(Some(product.product_id), Page::default())
    .await
    .unwrap();
  assert_eq!(hist.len(), 2);
  assert_eq!(hist[0].old_quantity, Some(5));
  assert_eq!(hist[0].new_quantity, 20);
  assert_eq!(hist[0].reason.as_deref(), Some("recount"));
}

#[tokio::test]
async fn set_inventory_negative_rejected_by_schema() {
  let s = store().await;
  let mut input = widget("A1");
  input.initial_quantity = 5;
  let product = s.create_product(input).await.unwrap();

  // set_inventory performs no floor check of its own; the CHECK constraint
  // rejects the write and rolls back the whole operation.
  let err = s
    .set_inventory(product.product_id, -1, None)
    .await
    .unwrap_err();
  assert!(matches!(err, Error::Database(_)));

  let inventory = s.get_inventory(product.product_id).await.unwrap();
  assert_eq!(inventory.quantity, 5);
  let hist = s
    .list_inventory_history(Some(product.product_id), Page::default())
    .await
    .unwrap();
  assert_eq!(hist.len(), 1);
}

#[tokio::test]
async fn set_inventory_missing_product_errors() {
  let s = store().await;
  let err = s.set_inventory(Uuid::new_v4(), 1, None).await.unwrap_err();
  assert!(matches!(err, Error::Domain(CoreError::InventoryNotFound(_))));
}

#[tokio::test]
async fn list_inventory_in_stock_only() {
  let s = store().await;
  let mut stocked = widget("A1");
  stocked.initial_quantity = 5;
  s.create_product(stocked).await.unwrap();
  s.create_product(widget("A2")).await.unwrap(); // quantity 0

  let all = s.list_inventory(false, Page::default()).await.unwrap();
  assert_eq!(all.len(), 2);

  let stocked = s.list_inventory(true, Page::default()).await.unwrap();
  assert_eq!(stocked.len(), 1);
  assert_eq!(stocked[0].quantity, 5);
}

// ─── Audit history reads ─────────────────────────────────────────────────────

#[tokio::test]
async fn inventory_history_newest_first() {
  let s = store().await;
  let mut input = widget("A1");
  input.initial_quantity = 10;
  let product = s.create_product(input).await.unwrap();

  s.adjust_inventory(product.product_id, -1, None).await.unwrap();
  s.adjust_inventory(product.product_id, -2, None).await.unwrap();

  let hist = s
    .list_inventory_history(Some(product.product_id), Page::default())
    .await
    .unwrap();
  assert_eq!(hist.len(), 3);
  assert_eq!(hist[0].new_quantity, 7);
  assert_eq!(hist[1].new_quantity, 9);
  assert_eq!(hist[2].old_quantity, None);
}

#[tokio::test]
async fn inventory_history_unscoped_spans_products() {
  let s = store().await;
  let a = s.create_product(widget("A1")).await.unwrap();
  let b = s.create_product(widget("B1")).await.unwrap();
  s.set_inventory(a.product_id, 3, None).await.unwrap();
  s.set_inventory(b.product_id, 4, None).await.unwrap();

  let hist = s
    .list_inventory_history(None, Page::default())
    .await
    .unwrap();
  assert_eq!(hist.len(), 4); // two seeds + two sets
}

#[tokio::test]
async fn inventory_history_pagination() {
  let s = store().await;
  let mut input = widget("A1");
  input.initial_quantity = 10;
  let product = s.create_product(input).await.unwrap();
  s.adjust_inventory(product.product_id, -1, None).await.unwrap();
  s.adjust_inventory(product.product_id, -1, None).await.unwrap();

  let first = s
    .list_inventory_history(
      Some(product.product_id),
      Page { offset: 0, limit: 1 },
    )
    .await
    .unwrap();
  assert_eq!(first.len(), 1);
  assert_eq!(first[0].new_quantity, 8);

  let second = s
    .list_inventory_history(
      Some(product.product_id),
      Page { offset: 1, limit: 1 },
    )
    .await
    .unwrap();
  assert_eq!(second.len(), 1);
  assert_eq!(second[0].new_quantity, 9);
}

#[tokio::test]
async fn price_history_newest_first() {
  let s = store().await;
  let product = s.create_product(widget("A1")).await.unwrap();

  s.update_product(
    product.product_id,
    ProductPatch { price: Some(dec("11.00")), ..Default::default() },
  )
  .await
  .unwrap();
  s.update_product(
    product.product_id,
    ProductPatch { price: Some(dec("9.50")), ..Default::default() },
  )
  .await
  .unwrap();

  let hist = s
    .list_price_history(product.product_id, Page::default())
    .await
    .unwrap();
  assert_eq!(hist.len(), 3);
  assert_eq!(hist[0].old_price, Some(dec("11.00")));
  assert_eq!(hist[0].new_price, dec("9.50"));
  assert_eq!(hist[1].old_price, Some(dec("10.00")));
  assert_eq!(hist[2].old_price, None);
}

// ─── Concurrency ─────────────────────────────────────────────────────────────

#[tokio::test(flavor = "multi_thread")]
async fn concurrent_adjustments_never_go_negative() {
  let s = store().await;
  let mut input = widget("A1");
  input.initial_quantity = 5;
  let product = s.create_product(input).await.unwrap();

  let mut handles = Vec::new();
  for _ in 0..10 {
    let s = s.clone();
    let pid = product.product_id;
    handles.push(tokio::spawn(async move {
      s.adjust_inventory(pid, -1, None).await
    }));
  }

  let mut ok = 0;
  let mut conflicts = 0;
  for handle in handles {
    match handle.await.unwrap() {
      Ok(_) => ok += 1,
      Err(Error::Domain(CoreError::InsufficientStock { .. })) => {
        conflicts += 1
      }
      Err(other) => panic!("unexpected error: {other}"),
    }
  }
  assert_eq!(ok, 5);
  assert_eq!(conflicts, 5);

  let inventory = s.get_inventory(product.product_id).await.unwrap();
  assert_eq!(inventory.quantity, 0);

  // Audit completeness: one row per committed change, none for conflicts.
  let hist = s
    .list_inventory_history(Some(product.product_id), Page::default())
    .await
    .unwrap();
  assert_eq!(hist.len(), 6); // seed + 5 successful decrements
}

// ─── Change notification ─────────────────────────────────────────────────────

#[derive(Default)]
struct RecordingSink(Mutex<Vec<StockChange>>);

impl ChangeSink for RecordingSink {
  fn notify(&self, change: StockChange) {
    self.0.lock().unwrap().push(change);
  }
}

#[tokio::test]
async fn sink_invoked_after_committed_mutations_only() {
  let sink = Arc::new(RecordingSink::default());
  let s = store().await.with_change_sink(sink.clone());

  let mut input = widget("A1");
  input.initial_quantity = 5;
  let product = s.create_product(input).await.unwrap();

  // Creation seeds history but is not a stock mutation.
  assert!(sink.0.lock().unwrap().is_empty());

  s.adjust_inventory(product.product_id, -2, Some("sale".into()))
    .await
    .unwrap();
  {
    let changes = sink.0.lock().unwrap();
    assert_eq!(changes.len(), 1);
    assert_eq!(changes[0].product_id, product.product_id);
    assert_eq!(changes[0].old_quantity, 5);
    assert_eq!(changes[0].new_quantity, 3);
    assert_eq!(changes[0].reason.as_deref(), Some("sale"));
  }

  // A rejected adjustment commits nothing and must not notify.
  s.adjust_inventory(product.product_id, -10, None)
    .await
    .unwrap_err();
  assert_eq!(sink.0.lock().unwrap().len(), 1);

  s.set_inventory(product.product_id, 9, None).await.unwrap();
  let changes = sink.0.lock().unwrap();
  assert_eq!(changes.len(), 2);
  assert_eq!(changes[1].old_quantity, 3);
  assert_eq!(changes[1].new_quantity, 9);
}
