//! SQL schema for the Tally SQLite store.
//!
//! Executed once at connection startup via `PRAGMA user_version`. Future
//! migrations will be gated on that version number.

/// Full schema DDL; idempotent thanks to `CREATE TABLE IF NOT EXISTS`.
pub const SCHEMA: &str = "
PRAGMA journal_mode = WAL;
PRAGMA foreign_keys = ON;

CREATE TABLE IF NOT EXISTS categories (
    category_id TEXT PRIMARY KEY,
    name        TEXT NOT NULL UNIQUE,
    description TEXT,
    created_at  TEXT NOT NULL    -- ISO 8601 UTC; server-assigned
);

CREATE TABLE IF NOT EXISTS products (
    product_id  TEXT PRIMARY KEY,
    sku         TEXT NOT NULL UNIQUE,
    name        TEXT NOT NULL,
    description TEXT,
    category_id TEXT REFERENCES categories(category_id) ON DELETE SET NULL,
    price       TEXT NOT NULL,   -- canonical decimal string, e.g. '10.00'
    is_active   INTEGER NOT NULL DEFAULT 1,
    created_at  TEXT NOT NULL
);

-- Exactly one row per product; quantity may never go negative.
CREATE TABLE IF NOT EXISTS inventory (
    inventory_id TEXT PRIMARY KEY,
    product_id   TEXT NOT NULL UNIQUE
                 REFERENCES products(product_id) ON DELETE CASCADE,
    quantity     INTEGER NOT NULL CHECK (quantity >= 0),
    last_updated TEXT NOT NULL
);

-- History tables are strictly append-only.
-- No UPDATE or DELETE is ever issued against them; the cascade from a
-- product delete is the only removal path.
CREATE TABLE IF NOT EXISTS price_history (
    history_id TEXT PRIMARY KEY,
    product_id TEXT NOT NULL
               REFERENCES products(product_id) ON DELETE CASCADE,
    old_price  TEXT,             -- NULL only on the creation seed row
    new_price  TEXT NOT NULL,
    changed_at TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS inventory_history (
    history_id   TEXT PRIMARY KEY,
    product_id   TEXT NOT NULL
                 REFERENCES products(product_id) ON DELETE CASCADE,
    old_quantity INTEGER,        -- NULL only on the initial-stock row
    new_quantity INTEGER NOT NULL,
    changed_at   TEXT NOT NULL,
    reason       TEXT
);

CREATE INDEX IF NOT EXISTS products_sku_idx      ON products(sku);
CREATE INDEX IF NOT EXISTS products_name_idx     ON products(name);
CREATE INDEX IF NOT EXISTS products_category_idx ON products(category_id);
CREATE INDEX IF NOT EXISTS price_hist_prod_idx   ON price_history(product_id);
CREATE INDEX IF NOT EXISTS price_hist_at_idx     ON price_history(changed_at);
CREATE INDEX IF NOT EXISTS inv_hist_prod_idx     ON inventory_history(product_id);
CREATE INDEX IF NOT EXISTS inv_hist_at_idx       ON inventory_history(changed_at);

PRAGMA user_version = 1;
";
