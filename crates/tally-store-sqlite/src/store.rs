//! [`SqliteStore`] — the SQLite implementation of [`InventoryStore`].

use std::{path::Path, sync::Arc};

use chrono::Utc;
use rusqlite::OptionalExtension as _;
use rust_decimal::Decimal;
use uuid::Uuid;

use tally_core::{
  Error as CoreError,
  catalog::{
    Category, CategoryPatch, NewCategory, NewProduct, Product, ProductDetail,
    ProductFilter, ProductPatch,
  },
  notify::{ChangeSink, StockChange},
  stock::{
    INITIAL_STOCK_REASON, Inventory, InventoryHistory, PriceHistory,
  },
  store::{InventoryStore, Page},
};

use crate::{
  Error, Result,
  encode::{
    RawCategory, RawInventory, RawInventoryHistory, RawPriceHistory,
    RawProduct, decode_uuid, encode_decimal, encode_dt, encode_uuid,
  },
  schema::SCHEMA,
};

// ─── Row mappers ─────────────────────────────────────────────────────────────

fn category_from_row(row: &rusqlite::Row) -> rusqlite::Result<RawCategory> {
  Ok(RawCategory {
    category_id: row.get(0)?,
    name:        row.get(1)?,
    description: row.get(2)?,
    created_at:  row.get(3)?,
  })
}

fn product_from_row(row: &rusqlite::Row) -> rusqlite::Result<RawProduct> {
  Ok(RawProduct {
    product_id:  row.get(0)?,
    sku:         row.get(1)?,
    name:        row.get(2)?,
    description: row.get(3)?,
    category_id: row.get(4)?,
    price:       row.get(5)?,
    is_active:   row.get(6)?,
    created_at:  row.get(7)?,
  })
}

fn inventory_from_row(row: &rusqlite::Row) -> rusqlite::Result<RawInventory> {
  Ok(RawInventory {
    inventory_id: row.get(0)?,
    product_id:   row.get(1)?,
    quantity:     row.get(2)?,
    last_updated: row.get(3)?,
  })
}

fn price_history_from_row(
  row: &rusqlite::Row,
) -> rusqlite::Result<RawPriceHistory> {
  Ok(RawPriceHistory {
    history_id: row.get(0)?,
    product_id: row.get(1)?,
    old_price:  row.get(2)?,
    new_price:  row.get(3)?,
    changed_at: row.get(4)?,
  })
}

fn inventory_history_from_row(
  row: &rusqlite::Row,
) -> rusqlite::Result<RawInventoryHistory> {
  Ok(RawInventoryHistory {
    history_id:   row.get(0)?,
    product_id:   row.get(1)?,
    old_quantity: row.get(2)?,
    new_quantity: row.get(3)?,
    changed_at:   row.get(4)?,
    reason:       row.get(5)?,
  })
}

// ─── Store ───────────────────────────────────────────────────────────────────

/// A Tally inventory store backed by a single SQLite file.
///
/// Cloning is cheap — the inner connection is reference-counted. All
/// operations run on the connection's dedicated thread, so multi-statement
/// transactions are serialized at whole-operation granularity. That
/// serialization is what makes the read-validate-write sequence of
/// [`adjust_inventory`](InventoryStore::adjust_inventory) safe under
/// concurrent callers.
#[derive(Clone)]
pub struct SqliteStore {
  conn:        tokio_rusqlite::Connection,
  change_sink: Option<Arc<dyn ChangeSink>>,
}

impl SqliteStore {
  /// Open (or create) a store at `path` and run schema initialisation.
  pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open(path).await?;
    let store = Self { conn, change_sink: None };
    store.init_schema().await?;
    Ok(store)
  }

  /// Open an in-memory store — useful for testing.
  pub async fn open_in_memory() -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open_in_memory().await?;
    let store = Self { conn, change_sink: None };
    store.init_schema().await?;
    Ok(store)
  }

  /// Attach a post-commit change sink. The sink is invoked only after a
  /// stock mutation has committed; it is never invoked for a rolled-back
  /// operation.
  pub fn with_change_sink(mut self, sink: Arc<dyn ChangeSink>) -> Self {
    self.change_sink = Some(sink);
    self
  }

  async fn init_schema(&self) -> Result<()> {
    self
      .conn
      .call(|conn| {
        conn.execute_batch(SCHEMA)?;
        Ok(())
      })
      .await?;
    Ok(())
  }

  /// Deliver a committed stock change to the sink, if one is attached.
  fn notify_change(&self, change: StockChange) {
    tracing::debug!(
      product_id = %change.product_id,
      old_quantity = change.old_quantity,
      new_quantity = change.new_quantity,
      "stock change committed"
    );
    if let Some(sink) = &self.change_sink {
      sink.notify(change);
    }
  }
}

// ─── InventoryStore impl ─────────────────────────────────────────────────────

impl InventoryStore for SqliteStore {
  type Error = Error;

  // ── Categories ────────────────────────────────────────────────────────────

  async fn create_category(&self, input: NewCategory) -> Result<Category> {
    let category = Category {
      category_id: Uuid::new_v4(),
      name:        input.name,
      description: input.description,
      created_at:  Utc::now(),
    };

    let id_str      = encode_uuid(category.category_id);
    let at_str      = encode_dt(category.created_at);
    let name        = category.name.clone();
    let description = category.description.clone();

    let outcome: Result<()> = self
      .conn
      .call(move |conn| {
        let tx = conn.transaction()?;

        let taken: bool = tx
          .query_row(
            "SELECT 1 FROM categories WHERE name = ?1",
            rusqlite::params![name],
            |_| Ok(true),
          )
          .optional()?
          .unwrap_or(false);
        if taken {
          return Ok(Err(CoreError::DuplicateCategoryName(name).into()));
        }

        tx.execute(
          "INSERT INTO categories (category_id, name, description, created_at)
           VALUES (?1, ?2, ?3, ?4)",
          rusqlite::params![id_str, name, description, at_str],
        )?;
        tx.commit()?;
        Ok(Ok(()))
      })
      .await?;
    outcome?;

    Ok(category)
  }

  async fn get_category(&self, id: Uuid) -> Result<Category> {
    let id_str = encode_uuid(id);

    let raw: Option<RawCategory> = self
      .conn
      .call(move |conn| {
        Ok(
          conn
            .query_row(
              "SELECT category_id, name, description, created_at
               FROM categories WHERE category_id = ?1",
              rusqlite::params![id_str],
              category_from_row,
            )
            .optional()?,
        )
      })
      .await?;

    match raw {
      Some(raw) => raw.into_category(),
      None => Err(CoreError::CategoryNotFound(id).into()),
    }
  }

  async fn list_categories(&self) -> Result<Vec<Category>> {
    let raws: Vec<RawCategory> = self
      .conn
      .call(|conn| {
        let mut stmt = conn.prepare(
          "SELECT category_id, name, description, created_at FROM categories",
        )?;
        let rows = stmt
          .query_map([], category_from_row)?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    raws.into_iter().map(RawCategory::into_category).collect()
  }

  async fn update_category(
    &self,
    id: Uuid,
    patch: CategoryPatch,
  ) -> Result<Category> {
    let id_str = encode_uuid(id);

    let outcome: Result<RawCategory> = self
      .conn
      .call(move |conn| {
        let tx = conn.transaction()?;

        let existing: Option<RawCategory> = tx
          .query_row(
            "SELECT category_id, name, description, created_at
             FROM categories WHERE category_id = ?1",
            rusqlite::params![id_str],
            category_from_row,
          )
          .optional()?;
        let Some(existing) = existing else {
          return Ok(Err(CoreError::CategoryNotFound(id).into()));
        };

        if let Some(name) = &patch.name {
          let taken: bool = tx
            .query_row(
              "SELECT 1 FROM categories WHERE name = ?1 AND category_id != ?2",
              rusqlite::params![name, id_str],
              |_| Ok(true),
            )
            .optional()?
            .unwrap_or(false);
          if taken {
            return Ok(Err(
              CoreError::DuplicateCategoryName(name.clone()).into(),
            ));
          }
        }

        let name        = patch.name.unwrap_or(existing.name);
        let description = patch.description.or(existing.description);

        tx.execute(
          "UPDATE categories SET name = ?2, description = ?3
           WHERE category_id = ?1",
          rusqlite::params![id_str, name, description],
        )?;

        let updated = tx.query_row(
          "SELECT category_id, name, description, created_at
           FROM categories WHERE category_id = ?1",
          rusqlite::params![id_str],
          category_from_row,
        )?;
        tx.commit()?;
        Ok(Ok(updated))
      })
      .await?;

    outcome?.into_category()
  }

  async fn delete_category(&self, id: Uuid) -> Result<()> {
    let id_str = encode_uuid(id);

    // ON DELETE SET NULL clears category_id on referencing products.
    let affected = self
      .conn
      .call(move |conn| {
        Ok(conn.execute(
          "DELETE FROM categories WHERE category_id = ?1",
          rusqlite::params![id_str],
        )?)
      })
      .await?;

    if affected == 0 {
      return Err(CoreError::CategoryNotFound(id).into());
    }
    Ok(())
  }

  // ── Products ──────────────────────────────────────────────────────────────

  async fn create_product(&self, input: NewProduct) -> Result<Product> {
    let product = Product {
      product_id:  Uuid::new_v4(),
      sku:         input.sku,
      name:        input.name,
      description: input.description,
      category_id: input.category_id,
      price:       input.price,
      is_active:   true,
      created_at:  Utc::now(),
    };

    let inventory_id     = Uuid::new_v4();
    let price_hist_id    = Uuid::new_v4();
    let inv_hist_id      = Uuid::new_v4();
    let initial_quantity = input.initial_quantity;

    let product_id_str    = encode_uuid(product.product_id);
    let sku               = product.sku.clone();
    let name              = product.name.clone();
    let description       = product.description.clone();
    let category_id       = product.category_id;
    let category_id_str   = product.category_id.map(encode_uuid);
    let price_str         = encode_decimal(product.price);
    let at_str            = encode_dt(product.created_at);
    let inventory_id_str  = encode_uuid(inventory_id);
    let price_hist_id_str = encode_uuid(price_hist_id);
    let inv_hist_id_str   = encode_uuid(inv_hist_id);

    let outcome: Result<()> = self
      .conn
      .call(move |conn| {
        let tx = conn.transaction()?;

        let sku_taken: bool = tx
          .query_row(
            "SELECT 1 FROM products WHERE sku = ?1",
            rusqlite::params![sku],
            |_| Ok(true),
          )
          .optional()?
          .unwrap_or(false);
        if sku_taken {
          return Ok(Err(CoreError::DuplicateSku(sku).into()));
        }

        if let (Some(cid), Some(cid_str)) =
          (category_id, category_id_str.as_deref())
        {
          let known: bool = tx
            .query_row(
              "SELECT 1 FROM categories WHERE category_id = ?1",
              rusqlite::params![cid_str],
              |_| Ok(true),
            )
            .optional()?
            .unwrap_or(false);
          if !known {
            return Ok(Err(CoreError::UnknownCategory(cid).into()));
          }
        }

        tx.execute(
          "INSERT INTO products (
             product_id, sku, name, description, category_id,
             price, is_active, created_at
           ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
          rusqlite::params![
            product_id_str,
            sku,
            name,
            description,
            category_id_str,
            price_str,
            true,
            at_str,
          ],
        )?;
        tx.execute(
          "INSERT INTO inventory (inventory_id, product_id, quantity, last_updated)
           VALUES (?1, ?2, ?3, ?4)",
          rusqlite::params![
            inventory_id_str,
            product_id_str,
            initial_quantity,
            at_str,
          ],
        )?;
        tx.execute(
          "INSERT INTO price_history
             (history_id, product_id, old_price, new_price, changed_at)
           VALUES (?1, ?2, NULL, ?3, ?4)",
          rusqlite::params![price_hist_id_str, product_id_str, price_str, at_str],
        )?;
        tx.execute(
          "INSERT INTO inventory_history
             (history_id, product_id, old_quantity, new_quantity, changed_at, reason)
           VALUES (?1, ?2, NULL, ?3, ?4, ?5)",
          rusqlite::params![
            inv_hist_id_str,
            product_id_str,
            initial_quantity,
            at_str,
            INITIAL_STOCK_REASON,
          ],
        )?;
        tx.commit()?;
        Ok(Ok(()))
      })
      .await?;
    outcome?;

    Ok(product)
  }

  async fn get_product(&self, id: Uuid) -> Result<ProductDetail> {
    let id_str = encode_uuid(id);

    let raw: Option<(RawProduct, Option<RawCategory>)> = self
      .conn
      .call(move |conn| {
        Ok(
          conn
            .query_row(
              "SELECT
                 p.product_id, p.sku, p.name, p.description, p.category_id,
                 p.price, p.is_active, p.created_at,
                 c.category_id, c.name, c.description, c.created_at
               FROM products p
               LEFT JOIN categories c ON c.category_id = p.category_id
               WHERE p.product_id = ?1",
              rusqlite::params![id_str],
              |row| {
                let product = product_from_row(row)?;
                let category_id: Option<String> = row.get(8)?;
                let category = match category_id {
                  Some(category_id) => Some(RawCategory {
                    category_id,
                    name:        row.get(9)?,
                    description: row.get(10)?,
                    created_at:  row.get(11)?,
                  }),
                  None => None,
                };
                Ok((product, category))
              },
            )
            .optional()?,
        )
      })
      .await?;

    let Some((raw_product, raw_category)) = raw else {
      return Err(CoreError::ProductNotFound(id).into());
    };

    Ok(ProductDetail {
      product:  raw_product.into_product()?,
      category: raw_category.map(RawCategory::into_category).transpose()?,
    })
  }

  async fn get_product_by_sku(&self, sku: &str) -> Result<Product> {
    let sku_owned = sku.to_owned();

    let raw: Option<RawProduct> = self
      .conn
      .call(move |conn| {
        Ok(
          conn
            .query_row(
              "SELECT product_id, sku, name, description, category_id,
                      price, is_active, created_at
               FROM products WHERE sku = ?1",
              rusqlite::params![sku_owned],
              product_from_row,
            )
            .optional()?,
        )
      })
      .await?;

    match raw {
      Some(raw) => raw.into_product(),
      None => Err(CoreError::SkuNotFound(sku.to_owned()).into()),
    }
  }

  async fn list_products(&self, filter: &ProductFilter) -> Result<Vec<Product>> {
    let name_pattern  = filter.name.as_deref().map(|n| format!("%{n}%"));
    let sku           = filter.sku.clone();
    let category_str  = filter.category_id.map(encode_uuid);
    let is_active     = filter.is_active;
    let price_min_str = filter.price_min.map(encode_decimal);
    let price_max_str = filter.price_max.map(encode_decimal);
    let limit_val     = filter.limit.unwrap_or(50) as i64;
    let offset_val    = filter.offset.unwrap_or(0) as i64;

    let raws: Vec<RawProduct> = self
      .conn
      .call(move |conn| {
        // Build WHERE clause dynamically; placeholders are fixed-numbered so
        // unused ones simply go unreferenced.
        let mut conds: Vec<&'static str> = vec![];
        if name_pattern.is_some() {
          conds.push("name LIKE ?1");
        }
        if sku.is_some() {
          conds.push("sku = ?2");
        }
        if category_str.is_some() {
          conds.push("category_id = ?3");
        }
        if is_active.is_some() {
          conds.push("is_active = ?4");
        }
        if price_min_str.is_some() {
          conds.push("CAST(price AS REAL) >= CAST(?5 AS REAL)");
        }
        if price_max_str.is_some() {
          conds.push("CAST(price AS REAL) <= CAST(?6 AS REAL)");
        }

        let where_clause = if conds.is_empty() {
          String::new()
        } else {
          format!("WHERE {}", conds.join(" AND "))
        };

        let sql = format!(
          "SELECT product_id, sku, name, description, category_id,
                  price, is_active, created_at
           FROM products
           {where_clause}
           LIMIT ?7 OFFSET ?8"
        );

        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt
          .query_map(
            rusqlite::params![
              name_pattern.as_deref(),
              sku.as_deref(),
              category_str.as_deref(),
              is_active,
              price_min_str.as_deref(),
              price_max_str.as_deref(),
              limit_val,
              offset_val,
            ],
            product_from_row,
          )?
          .collect::<rusqlite::Result<Vec<_>>>()?;

        Ok(rows)
      })
      .await?;

    raws.into_iter().map(RawProduct::into_product).collect()
  }

  async fn update_product(
    &self,
    id: Uuid,
    patch: ProductPatch,
  ) -> Result<Product> {
    let id_str      = encode_uuid(id);
    let hist_id_str = encode_uuid(Uuid::new_v4());
    let now_str     = encode_dt(Utc::now());

    let patch_price        = patch.price;
    let patch_price_str    = patch.price.map(encode_decimal);
    let patch_category     = patch.category_id;
    let patch_category_str = patch.category_id.map(encode_uuid);
    let patch_name         = patch.name;
    let patch_description  = patch.description;
    let patch_is_active    = patch.is_active;

    let outcome: Result<RawProduct> = self
      .conn
      .call(move |conn| {
        let tx = conn.transaction()?;

        let existing: Option<RawProduct> = tx
          .query_row(
            "SELECT product_id, sku, name, description, category_id,
                    price, is_active, created_at
             FROM products WHERE product_id = ?1",
            rusqlite::params![id_str],
            product_from_row,
          )
          .optional()?;
        let Some(existing) = existing else {
          return Ok(Err(CoreError::ProductNotFound(id).into()));
        };

        if let (Some(cid), Some(cid_str)) =
          (patch_category, patch_category_str.as_deref())
        {
          let known: bool = tx
            .query_row(
              "SELECT 1 FROM categories WHERE category_id = ?1",
              rusqlite::params![cid_str],
              |_| Ok(true),
            )
            .optional()?
            .unwrap_or(false);
          if !known {
            return Ok(Err(CoreError::UnknownCategory(cid).into()));
          }
        }

        // A price equal to the current one is not a change and writes no
        // audit row.
        let price_changed = match (patch_price, existing.price.parse::<Decimal>())
        {
          (Some(new), Ok(old)) => new != old,
          (Some(_), Err(e)) => return Ok(Err(Error::Decimal(e))),
          (None, _) => false,
        };

        let old_price_str   = existing.price;
        let name            = patch_name.unwrap_or(existing.name);
        let description     = patch_description.or(existing.description);
        let category_id_str = patch_category_str.or(existing.category_id);
        let is_active       = patch_is_active.unwrap_or(existing.is_active);
        let price_str       =
          patch_price_str.unwrap_or_else(|| old_price_str.clone());

        tx.execute(
          "UPDATE products
           SET name = ?2, description = ?3, category_id = ?4,
               price = ?5, is_active = ?6
           WHERE product_id = ?1",
          rusqlite::params![
            id_str,
            name,
            description,
            category_id_str,
            price_str,
            is_active,
          ],
        )?;

        if price_changed {
          tx.execute(
            "INSERT INTO price_history
               (history_id, product_id, old_price, new_price, changed_at)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            rusqlite::params![
              hist_id_str,
              id_str,
              old_price_str,
              price_str,
              now_str,
            ],
          )?;
        }

        let updated = tx.query_row(
          "SELECT product_id, sku, name, description, category_id,
                  price, is_active, created_at
           FROM products WHERE product_id = ?1",
          rusqlite::params![id_str],
          product_from_row,
        )?;
        tx.commit()?;
        Ok(Ok(updated))
      })
      .await?;

    outcome?.into_product()
  }

  async fn delete_product(&self, id: Uuid) -> Result<()> {
    let id_str = encode_uuid(id);

    // Cascades to inventory and both history tables.
    let affected = self
      .conn
      .call(move |conn| {
        Ok(conn.execute(
          "DELETE FROM products WHERE product_id = ?1",
          rusqlite::params![id_str],
        )?)
      })
      .await?;

    if affected == 0 {
      return Err(CoreError::ProductNotFound(id).into());
    }
    Ok(())
  }

  // ── Inventory ledger ──────────────────────────────────────────────────────

  async fn get_inventory(&self, product_id: Uuid) -> Result<Inventory> {
    let pid_str = encode_uuid(product_id);

    let raw: Option<RawInventory> = self
      .conn
      .call(move |conn| {
        Ok(
          conn
            .query_row(
              "SELECT inventory_id, product_id, quantity, last_updated
               FROM inventory WHERE product_id = ?1",
              rusqlite::params![pid_str],
              inventory_from_row,
            )
            .optional()?,
        )
      })
      .await?;

    match raw {
      Some(raw) => raw.into_inventory(),
      None => Err(CoreError::InventoryNotFound(product_id).into()),
    }
  }

  async fn list_inventory(
    &self,
    in_stock_only: bool,
    page: Page,
  ) -> Result<Vec<Inventory>> {
    let limit_val  = page.limit as i64;
    let offset_val = page.offset as i64;

    let raws: Vec<RawInventory> = self
      .conn
      .call(move |conn| {
        let rows = if in_stock_only {
          let mut stmt = conn.prepare(
            "SELECT inventory_id, product_id, quantity, last_updated
             FROM inventory WHERE quantity > 0
             LIMIT ?1 OFFSET ?2",
          )?;
          stmt
            .query_map(
              rusqlite::params![limit_val, offset_val],
              inventory_from_row,
            )?
            .collect::<rusqlite::Result<Vec<_>>>()?
        } else {
          let mut stmt = conn.prepare(
            "SELECT inventory_id, product_id, quantity, last_updated
             FROM inventory
             LIMIT ?1 OFFSET ?2",
          )?;
          stmt
            .query_map(
              rusqlite::params![limit_val, offset_val],
              inventory_from_row,
            )?
            .collect::<rusqlite::Result<Vec<_>>>()?
        };
        Ok(rows)
      })
      .await?;

    raws.into_iter().map(RawInventory::into_inventory).collect()
  }

  async fn set_inventory(
    &self,
    product_id: Uuid,
    new_quantity: i64,
    reason: Option<String>,
  ) -> Result<Inventory> {
    let pid_str     = encode_uuid(product_id);
    let history_id  = Uuid::new_v4();
    let hist_id_str = encode_uuid(history_id);
    let now         = Utc::now();
    let now_str     = encode_dt(now);
    let reason_row  = reason.clone();

    let outcome: Result<(String, i64)> = self
      .conn
      .call(move |conn| {
        let tx = conn.transaction()?;

        let row: Option<(String, i64)> = tx
          .query_row(
            "SELECT inventory_id, quantity FROM inventory WHERE product_id = ?1",
            rusqlite::params![pid_str],
            |r| Ok((r.get(0)?, r.get(1)?)),
          )
          .optional()?;
        let Some((inventory_id_str, old_quantity)) = row else {
          return Ok(Err(CoreError::InventoryNotFound(product_id).into()));
        };

        // No floor check here: the overwrite is trusted, and the schema
        // CHECK constraint backstops the non-negative invariant.
        tx.execute(
          "UPDATE inventory SET quantity = ?2, last_updated = ?3
           WHERE product_id = ?1",
          rusqlite::params![pid_str, new_quantity, now_str],
        )?;
        tx.execute(
          "INSERT INTO inventory_history
             (history_id, product_id, old_quantity, new_quantity, changed_at, reason)
           VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
          rusqlite::params![
            hist_id_str,
            pid_str,
            old_quantity,
            new_quantity,
            now_str,
            reason_row,
          ],
        )?;
        tx.commit()?;
        Ok(Ok((inventory_id_str, old_quantity)))
      })
      .await?;
    let (inventory_id_str, old_quantity) = outcome?;

    self.notify_change(StockChange {
      history_id,
      product_id,
      old_quantity,
      new_quantity,
      reason,
    });

    Ok(Inventory {
      inventory_id: decode_uuid(&inventory_id_str)?,
      product_id,
      quantity: new_quantity,
      last_updated: now,
    })
  }

  async fn adjust_inventory(
    &self,
    product_id: Uuid,
    delta: i64,
    reason: Option<String>,
  ) -> Result<Inventory> {
    let pid_str     = encode_uuid(product_id);
    let history_id  = Uuid::new_v4();
    let hist_id_str = encode_uuid(history_id);
    let now         = Utc::now();
    let now_str     = encode_dt(now);
    let reason_row  = reason.clone();

    let outcome: Result<(String, i64, i64)> = self
      .conn
      .call(move |conn| {
        let tx = conn.transaction()?;

        let row: Option<(String, i64)> = tx
          .query_row(
            "SELECT inventory_id, quantity FROM inventory WHERE product_id = ?1",
            rusqlite::params![pid_str],
            |r| Ok((r.get(0)?, r.get(1)?)),
          )
          .optional()?;
        let Some((inventory_id_str, old_quantity)) = row else {
          return Ok(Err(CoreError::InventoryNotFound(product_id).into()));
        };

        let new_quantity = old_quantity + delta;
        if new_quantity < 0 {
          // Abort before anything is written: no quantity change, no
          // history row, no notification.
          return Ok(Err(
            CoreError::InsufficientStock {
              product_id,
              available: old_quantity,
              requested: delta,
            }
            .into(),
          ));
        }

        tx.execute(
          "UPDATE inventory SET quantity = ?2, last_updated = ?3
           WHERE product_id = ?1",
          rusqlite::params![pid_str, new_quantity, now_str],
        )?;
        tx.execute(
          "INSERT INTO inventory_history
             (history_id, product_id, old_quantity, new_quantity, changed_at, reason)
           VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
          rusqlite::params![
            hist_id_str,
            pid_str,
            old_quantity,
            new_quantity,
            now_str,
            reason_row,
          ],
        )?;
        tx.commit()?;
        Ok(Ok((inventory_id_str, old_quantity, new_quantity)))
      })
      .await?;
    let (inventory_id_str, old_quantity, new_quantity) = outcome?;

    self.notify_change(StockChange {
      history_id,
      product_id,
      old_quantity,
      new_quantity,
      reason,
    });

    Ok(Inventory {
      inventory_id: decode_uuid(&inventory_id_str)?,
      product_id,
      quantity: new_quantity,
      last_updated: now,
    })
  }

  // ── Audit history reads ───────────────────────────────────────────────────

  async fn list_inventory_history(
    &self,
    product_id: Option<Uuid>,
    page: Page,
  ) -> Result<Vec<InventoryHistory>> {
    let pid_str    = product_id.map(encode_uuid);
    let limit_val  = page.limit as i64;
    let offset_val = page.offset as i64;

    let raws: Vec<RawInventoryHistory> = self
      .conn
      .call(move |conn| {
        // rowid breaks ties between rows written in the same microsecond.
        let rows = if let Some(pid) = pid_str {
          let mut stmt = conn.prepare(
            "SELECT history_id, product_id, old_quantity, new_quantity,
                    changed_at, reason
             FROM inventory_history
             WHERE product_id = ?1
             ORDER BY changed_at DESC, rowid DESC
             LIMIT ?2 OFFSET ?3",
          )?;
          stmt
            .query_map(
              rusqlite::params![pid, limit_val, offset_val],
              inventory_history_from_row,
            )?
            .collect::<rusqlite::Result<Vec<_>>>()?
        } else {
          let mut stmt = conn.prepare(
            "SELECT history_id, product_id, old_quantity, new_quantity,
                    changed_at, reason
             FROM inventory_history
             ORDER BY changed_at DESC, rowid DESC
             LIMIT ?1 OFFSET ?2",
          )?;
          stmt
            .query_map(
              rusqlite::params![limit_val, offset_val],
              inventory_history_from_row,
            )?
            .collect::<rusqlite::Result<Vec<_>>>()?
        };
        Ok(rows)
      })
      .await?;

    raws
      .into_iter()
      .map(RawInventoryHistory::into_history)
      .collect()
  }

  async fn list_price_history(
    &self,
    product_id: Uuid,
    page: Page,
  ) -> Result<Vec<PriceHistory>> {
    let pid_str    = encode_uuid(product_id);
    let limit_val  = page.limit as i64;
    let offset_val = page.offset as i64;

    let raws: Vec<RawPriceHistory> = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(
          "SELECT history_id, product_id, old_price, new_price, changed_at
           FROM price_history
           WHERE product_id = ?1
           ORDER BY changed_at DESC, rowid DESC
           LIMIT ?2 OFFSET ?3",
        )?;
        let rows = stmt
          .query_map(
            rusqlite::params![pid_str, limit_val, offset_val],
            price_history_from_row,
          )?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    raws.into_iter().map(RawPriceHistory::into_history).collect()
  }
}
