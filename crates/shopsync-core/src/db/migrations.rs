//! Database migrations

use rusqlite::Connection;

use crate::error::Result;

/// Current schema version
const CURRENT_VERSION: i32 = 1;

/// Run all pending migrations
pub fn run(conn: &Connection) -> Result<()> {
    let version = get_version(conn)?;

    if version < 1 {
        migrate_v1(conn)?;
    }

    Ok(())
}

/// Get the current schema version
fn get_version(conn: &Connection) -> Result<i32> {
    let exists: bool = conn.query_row(
        "SELECT EXISTS(SELECT 1 FROM sqlite_master WHERE type = 'table' AND name = 'schema_version')",
        [],
        |row| row.get(0),
    )?;

    if !exists {
        return Ok(0);
    }

    let version: i32 = conn.query_row(
        "SELECT COALESCE(MAX(version), 0) FROM schema_version",
        [],
        |row| row.get(0),
    )?;

    Ok(version)
}

/// Migration to version 1: initial mirror schema
fn migrate_v1(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "BEGIN;
        CREATE TABLE IF NOT EXISTS schema_version (
            version INTEGER PRIMARY KEY
        );

        CREATE TABLE IF NOT EXISTS shops (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            name TEXT NOT NULL,
            base_url TEXT NOT NULL,
            consumer_key TEXT NOT NULL,
            consumer_secret TEXT NOT NULL,
            active INTEGER NOT NULL DEFAULT 1,
            created_at INTEGER NOT NULL,
            updated_at INTEGER NOT NULL
        );

        CREATE TABLE IF NOT EXISTS categories (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            shop_id INTEGER NOT NULL REFERENCES shops(id) ON DELETE CASCADE,
            remote_id TEXT,
            name TEXT NOT NULL,
            slug TEXT NOT NULL DEFAULT '',
            description TEXT NOT NULL DEFAULT '',
            parent_id INTEGER REFERENCES categories(id) ON DELETE SET NULL,
            image_url TEXT,
            menu_order INTEGER NOT NULL DEFAULT 0,
            last_synced_at INTEGER
        );
        CREATE UNIQUE INDEX IF NOT EXISTS idx_categories_shop_remote
            ON categories(shop_id, remote_id) WHERE remote_id IS NOT NULL;

        CREATE TABLE IF NOT EXISTS products (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            shop_id INTEGER NOT NULL REFERENCES shops(id) ON DELETE CASCADE,
            remote_id TEXT,
            sku TEXT,
            name TEXT NOT NULL,
            slug TEXT NOT NULL DEFAULT '',
            description TEXT NOT NULL DEFAULT '',
            short_description TEXT NOT NULL DEFAULT '',
            price TEXT,
            regular_price TEXT,
            sale_price TEXT,
            status TEXT NOT NULL DEFAULT 'draft',
            product_type TEXT NOT NULL DEFAULT 'simple',
            manage_stock INTEGER NOT NULL DEFAULT 0,
            stock_quantity INTEGER,
            stock_status TEXT NOT NULL DEFAULT 'instock',
            weight TEXT,
            dimensions TEXT NOT NULL DEFAULT '{}',
            featured_image TEXT,
            gallery_images TEXT NOT NULL DEFAULT '[]',
            raw_payload TEXT NOT NULL DEFAULT 'null',
            last_synced_at INTEGER,
            created_at INTEGER NOT NULL,
            updated_at INTEGER NOT NULL
        );
        CREATE UNIQUE INDEX IF NOT EXISTS idx_products_shop_remote
            ON products(shop_id, remote_id) WHERE remote_id IS NOT NULL;
        CREATE INDEX IF NOT EXISTS idx_products_shop_sku ON products(shop_id, sku);

        CREATE TABLE IF NOT EXISTS variations (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            product_id INTEGER NOT NULL REFERENCES products(id) ON DELETE CASCADE,
            remote_id TEXT,
            sku TEXT,
            attributes TEXT NOT NULL DEFAULT '{}',
            price TEXT,
            regular_price TEXT,
            sale_price TEXT,
            manage_stock INTEGER NOT NULL DEFAULT 0,
            stock_quantity INTEGER,
            stock_status TEXT NOT NULL DEFAULT 'instock',
            dimensions TEXT NOT NULL DEFAULT '{}',
            image_url TEXT,
            last_synced_at INTEGER
        );
        CREATE UNIQUE INDEX IF NOT EXISTS idx_variations_product_remote
            ON variations(product_id, remote_id) WHERE remote_id IS NOT NULL;

        CREATE TABLE IF NOT EXISTS product_categories (
            product_id INTEGER NOT NULL REFERENCES products(id) ON DELETE CASCADE,
            category_id INTEGER NOT NULL REFERENCES categories(id) ON DELETE CASCADE,
            PRIMARY KEY (product_id, category_id)
        );

        INSERT INTO schema_version (version) VALUES (1);
        COMMIT;",
    )?;
    Ok(())
}
