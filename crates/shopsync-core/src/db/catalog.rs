//! Catalog repository: key lookups and upserts used by the reconciler.

use std::collections::BTreeMap;
use std::str::FromStr;

use rusqlite::{params, Connection, Row};
use rust_decimal::Decimal;

use crate::error::Result;
use crate::models::{
    now_millis, Category, CategoryRecord, Dimensions, Product, ProductRecord, Variation,
    VariationRecord,
};

/// Storage operations over the local mirror, shop-scoped where relevant.
///
/// The reconciler reads then writes without transactions; callers must not
/// run two syncs for the same shop concurrently.
pub trait CatalogRepository {
    fn find_category_by_remote_id(&self, shop_id: i64, remote_id: &str)
        -> Result<Option<Category>>;
    fn insert_category(&self, record: &CategoryRecord, parent_id: Option<i64>) -> Result<i64>;
    fn update_category(&self, id: i64, record: &CategoryRecord, parent_id: Option<i64>)
        -> Result<()>;
    fn list_categories(&self, shop_id: i64) -> Result<Vec<Category>>;

    fn find_product_by_remote_id(&self, shop_id: i64, remote_id: &str) -> Result<Option<Product>>;
    /// SKU fallback lookup, explicitly shop-scoped to keep two shops with
    /// colliding SKUs apart.
    fn find_product_by_sku(&self, shop_id: i64, sku: &str) -> Result<Option<Product>>;
    fn insert_product(&self, record: &ProductRecord) -> Result<i64>;
    fn update_product(&self, id: i64, record: &ProductRecord) -> Result<()>;
    fn list_products(&self, shop_id: i64) -> Result<Vec<Product>>;
    /// Products eligible for the variation phase: variable type with a
    /// known remote id.
    fn list_variable_products(&self, shop_id: i64) -> Result<Vec<Product>>;

    fn delete_category_links(&self, product_id: i64) -> Result<()>;
    fn insert_category_link(&self, product_id: i64, category_id: i64) -> Result<()>;
    fn category_ids_for_product(&self, product_id: i64) -> Result<Vec<i64>>;

    fn find_variation_by_remote_id(
        &self,
        product_id: i64,
        remote_id: &str,
    ) -> Result<Option<Variation>>;
    fn find_variation_by_sku(&self, product_id: i64, sku: &str) -> Result<Option<Variation>>;
    fn insert_variation(&self, product_id: i64, record: &VariationRecord) -> Result<i64>;
    fn update_variation(&self, id: i64, record: &VariationRecord) -> Result<()>;
    fn list_variations(&self, product_id: i64) -> Result<Vec<Variation>>;

    fn count_categories(&self, shop_id: i64) -> Result<i64>;
    fn count_products(&self, shop_id: i64) -> Result<i64>;
    fn count_variations(&self, shop_id: i64) -> Result<i64>;
    fn last_synced_at(&self, shop_id: i64) -> Result<Option<i64>>;
}

/// `SQLite` implementation of [`CatalogRepository`]
pub struct SqliteCatalogRepository<'a> {
    conn: &'a Connection,
}

impl<'a> SqliteCatalogRepository<'a> {
    /// Create a new repository with the given connection
    pub const fn new(conn: &'a Connection) -> Self {
        Self { conn }
    }

    fn parse_category(row: &Row<'_>) -> rusqlite::Result<Category> {
        Ok(Category {
            id: row.get(0)?,
            remote_id: row.get(1)?,
            shop_id: row.get(2)?,
            name: row.get(3)?,
            slug: row.get(4)?,
            description: row.get(5)?,
            parent_id: row.get(6)?,
            image_url: row.get(7)?,
            menu_order: row.get(8)?,
            last_synced_at: row.get(9)?,
        })
    }

    fn parse_product(row: &Row<'_>) -> rusqlite::Result<Product> {
        let dimensions: String = row.get(17)?;
        let gallery: String = row.get(19)?;
        let raw: String = row.get(20)?;
        let status: String = row.get(11)?;
        let product_type: String = row.get(12)?;
        let stock_status: String = row.get(15)?;
        Ok(Product {
            id: row.get(0)?,
            remote_id: row.get(1)?,
            shop_id: row.get(2)?,
            sku: row.get(3)?,
            name: row.get(4)?,
            slug: row.get(5)?,
            description: row.get(6)?,
            short_description: row.get(7)?,
            price: decimal_from_sql(row.get(8)?),
            regular_price: decimal_from_sql(row.get(9)?),
            sale_price: decimal_from_sql(row.get(10)?),
            status: status.parse().unwrap_or(crate::models::ProductStatus::Draft),
            product_type: crate::models::ProductType::from_remote(&product_type),
            manage_stock: row.get::<_, i64>(13)? != 0,
            stock_quantity: row.get(14)?,
            stock_status: crate::models::StockStatus::from_remote(&stock_status),
            weight: decimal_from_sql(row.get(16)?),
            dimensions: serde_json::from_str(&dimensions).unwrap_or_default(),
            featured_image: row.get(18)?,
            gallery_images: serde_json::from_str(&gallery).unwrap_or_default(),
            raw: serde_json::from_str(&raw).unwrap_or_default(),
            last_synced_at: row.get(21)?,
            created_at: row.get(22)?,
            updated_at: row.get(23)?,
        })
    }

    fn parse_variation(row: &Row<'_>) -> rusqlite::Result<Variation> {
        let attributes: String = row.get(4)?;
        let stock_status: String = row.get(10)?;
        let dimensions: String = row.get(11)?;
        Ok(Variation {
            id: row.get(0)?,
            product_id: row.get(1)?,
            remote_id: row.get(2)?,
            sku: row.get(3)?,
            attributes: serde_json::from_str::<BTreeMap<String, String>>(&attributes)
                .unwrap_or_default(),
            price: decimal_from_sql(row.get(5)?),
            regular_price: decimal_from_sql(row.get(6)?),
            sale_price: decimal_from_sql(row.get(7)?),
            manage_stock: row.get::<_, i64>(8)? != 0,
            stock_quantity: row.get(9)?,
            stock_status: crate::models::StockStatus::from_remote(&stock_status),
            dimensions: serde_json::from_str(&dimensions).unwrap_or_default(),
            image_url: row.get(12)?,
            last_synced_at: row.get(13)?,
        })
    }
}

const CATEGORY_COLUMNS: &str = "id, remote_id, shop_id, name, slug, description, parent_id, \
                                image_url, menu_order, last_synced_at";

const PRODUCT_COLUMNS: &str = "id, remote_id, shop_id, sku, name, slug, description, \
                               short_description, price, regular_price, sale_price, status, \
                               product_type, manage_stock, stock_quantity, stock_status, weight, \
                               dimensions, featured_image, gallery_images, raw_payload, \
                               last_synced_at, created_at, updated_at";

const VARIATION_COLUMNS: &str = "id, product_id, remote_id, sku, attributes, price, \
                                 regular_price, sale_price, manage_stock, stock_quantity, \
                                 stock_status, dimensions, image_url, last_synced_at";

impl CatalogRepository for SqliteCatalogRepository<'_> {
    fn find_category_by_remote_id(
        &self,
        shop_id: i64,
        remote_id: &str,
    ) -> Result<Option<Category>> {
        let result = self.conn.query_row(
            &format!("SELECT {CATEGORY_COLUMNS} FROM categories WHERE shop_id = ? AND remote_id = ?"),
            params![shop_id, remote_id],
            Self::parse_category,
        );
        optional(result)
    }

    fn insert_category(&self, record: &CategoryRecord, parent_id: Option<i64>) -> Result<i64> {
        self.conn.execute(
            "INSERT INTO categories (shop_id, remote_id, name, slug, description, parent_id, \
             image_url, menu_order, last_synced_at) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)",
            params![
                record.shop_id,
                record.remote_id,
                record.name,
                record.slug,
                record.description,
                parent_id,
                record.image_url,
                record.menu_order,
                now_millis(),
            ],
        )?;
        Ok(self.conn.last_insert_rowid())
    }

    fn update_category(
        &self,
        id: i64,
        record: &CategoryRecord,
        parent_id: Option<i64>,
    ) -> Result<()> {
        self.conn.execute(
            "UPDATE categories SET name = ?, slug = ?, description = ?, parent_id = ?, \
             image_url = ?, menu_order = ?, last_synced_at = ? WHERE id = ?",
            params![
                record.name,
                record.slug,
                record.description,
                parent_id,
                record.image_url,
                record.menu_order,
                now_millis(),
                id,
            ],
        )?;
        Ok(())
    }

    fn list_categories(&self, shop_id: i64) -> Result<Vec<Category>> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {CATEGORY_COLUMNS} FROM categories WHERE shop_id = ? \
             ORDER BY menu_order, name"
        ))?;
        let categories = stmt
            .query_map(params![shop_id], Self::parse_category)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(categories)
    }

    fn find_product_by_remote_id(&self, shop_id: i64, remote_id: &str) -> Result<Option<Product>> {
        let result = self.conn.query_row(
            &format!("SELECT {PRODUCT_COLUMNS} FROM products WHERE shop_id = ? AND remote_id = ?"),
            params![shop_id, remote_id],
            Self::parse_product,
        );
        optional(result)
    }

    fn find_product_by_sku(&self, shop_id: i64, sku: &str) -> Result<Option<Product>> {
        let result = self.conn.query_row(
            &format!("SELECT {PRODUCT_COLUMNS} FROM products WHERE shop_id = ? AND sku = ?"),
            params![shop_id, sku],
            Self::parse_product,
        );
        optional(result)
    }

    fn insert_product(&self, record: &ProductRecord) -> Result<i64> {
        let now = now_millis();
        self.conn.execute(
            "INSERT INTO products (shop_id, remote_id, sku, name, slug, description, \
             short_description, price, regular_price, sale_price, status, product_type, \
             manage_stock, stock_quantity, stock_status, weight, dimensions, featured_image, \
             gallery_images, raw_payload, last_synced_at, created_at, updated_at) \
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
            params![
                record.shop_id,
                record.remote_id,
                record.sku,
                record.name,
                record.slug,
                record.description,
                record.short_description,
                decimal_to_sql(record.price),
                decimal_to_sql(record.regular_price),
                decimal_to_sql(record.sale_price),
                record.status.as_str(),
                record.product_type.as_str(),
                i64::from(record.manage_stock),
                record.stock_quantity,
                record.stock_status.as_str(),
                decimal_to_sql(record.weight),
                serde_json::to_string(&record.dimensions)?,
                record.featured_image,
                serde_json::to_string(&record.gallery_images)?,
                serde_json::to_string(&record.raw)?,
                now,
                now,
                now,
            ],
        )?;
        Ok(self.conn.last_insert_rowid())
    }

    fn update_product(&self, id: i64, record: &ProductRecord) -> Result<()> {
        let now = now_millis();
        self.conn.execute(
            "UPDATE products SET remote_id = ?, sku = ?, name = ?, slug = ?, description = ?, \
             short_description = ?, price = ?, regular_price = ?, sale_price = ?, status = ?, \
             product_type = ?, manage_stock = ?, stock_quantity = ?, stock_status = ?, \
             weight = ?, dimensions = ?, featured_image = ?, gallery_images = ?, \
             raw_payload = ?, last_synced_at = ?, updated_at = ? WHERE id = ?",
            params![
                record.remote_id,
                record.sku,
                record.name,
                record.slug,
                record.description,
                record.short_description,
                decimal_to_sql(record.price),
                decimal_to_sql(record.regular_price),
                decimal_to_sql(record.sale_price),
                record.status.as_str(),
                record.product_type.as_str(),
                i64::from(record.manage_stock),
                record.stock_quantity,
                record.stock_status.as_str(),
                decimal_to_sql(record.weight),
                serde_json::to_string(&record.dimensions)?,
                record.featured_image,
                serde_json::to_string(&record.gallery_images)?,
                serde_json::to_string(&record.raw)?,
                now,
                now,
                id,
            ],
        )?;
        Ok(())
    }

    fn list_products(&self, shop_id: i64) -> Result<Vec<Product>> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {PRODUCT_COLUMNS} FROM products WHERE shop_id = ? ORDER BY name"
        ))?;
        let products = stmt
            .query_map(params![shop_id], Self::parse_product)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(products)
    }

    fn list_variable_products(&self, shop_id: i64) -> Result<Vec<Product>> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {PRODUCT_COLUMNS} FROM products WHERE shop_id = ? \
             AND product_type = 'variable' AND remote_id IS NOT NULL ORDER BY id"
        ))?;
        let products = stmt
            .query_map(params![shop_id], Self::parse_product)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(products)
    }

    fn delete_category_links(&self, product_id: i64) -> Result<()> {
        self.conn.execute(
            "DELETE FROM product_categories WHERE product_id = ?",
            params![product_id],
        )?;
        Ok(())
    }

    fn insert_category_link(&self, product_id: i64, category_id: i64) -> Result<()> {
        self.conn.execute(
            "INSERT OR IGNORE INTO product_categories (product_id, category_id) VALUES (?, ?)",
            params![product_id, category_id],
        )?;
        Ok(())
    }

    fn category_ids_for_product(&self, product_id: i64) -> Result<Vec<i64>> {
        let mut stmt = self
            .conn
            .prepare("SELECT category_id FROM product_categories WHERE product_id = ? ORDER BY category_id")?;
        let ids = stmt
            .query_map(params![product_id], |row| row.get(0))?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(ids)
    }

    fn find_variation_by_remote_id(
        &self,
        product_id: i64,
        remote_id: &str,
    ) -> Result<Option<Variation>> {
        let result = self.conn.query_row(
            &format!(
                "SELECT {VARIATION_COLUMNS} FROM variations WHERE product_id = ? AND remote_id = ?"
            ),
            params![product_id, remote_id],
            Self::parse_variation,
        );
        optional(result)
    }

    fn find_variation_by_sku(&self, product_id: i64, sku: &str) -> Result<Option<Variation>> {
        let result = self.conn.query_row(
            &format!("SELECT {VARIATION_COLUMNS} FROM variations WHERE product_id = ? AND sku = ?"),
            params![product_id, sku],
            Self::parse_variation,
        );
        optional(result)
    }

    fn insert_variation(&self, product_id: i64, record: &VariationRecord) -> Result<i64> {
        self.conn.execute(
            "INSERT INTO variations (product_id, remote_id, sku, attributes, price, \
             regular_price, sale_price, manage_stock, stock_quantity, stock_status, dimensions, \
             image_url, last_synced_at) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
            params![
                product_id,
                record.remote_id,
                record.sku,
                serde_json::to_string(&record.attributes)?,
                decimal_to_sql(record.price),
                decimal_to_sql(record.regular_price),
                decimal_to_sql(record.sale_price),
                i64::from(record.manage_stock),
                record.stock_quantity,
                record.stock_status.as_str(),
                serde_json::to_string(&record.dimensions)?,
                record.image_url,
                now_millis(),
            ],
        )?;
        Ok(self.conn.last_insert_rowid())
    }

    fn update_variation(&self, id: i64, record: &VariationRecord) -> Result<()> {
        self.conn.execute(
            "UPDATE variations SET remote_id = ?, sku = ?, attributes = ?, price = ?, \
             regular_price = ?, sale_price = ?, manage_stock = ?, stock_quantity = ?, \
             stock_status = ?, dimensions = ?, image_url = ?, last_synced_at = ? WHERE id = ?",
            params![
                record.remote_id,
                record.sku,
                serde_json::to_string(&record.attributes)?,
                decimal_to_sql(record.price),
                decimal_to_sql(record.regular_price),
                decimal_to_sql(record.sale_price),
                i64::from(record.manage_stock),
                record.stock_quantity,
                record.stock_status.as_str(),
                serde_json::to_string(&record.dimensions)?,
                record.image_url,
                now_millis(),
                id,
            ],
        )?;
        Ok(())
    }

    fn list_variations(&self, product_id: i64) -> Result<Vec<Variation>> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {VARIATION_COLUMNS} FROM variations WHERE product_id = ? ORDER BY id"
        ))?;
        let variations = stmt
            .query_map(params![product_id], Self::parse_variation)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(variations)
    }

    fn count_categories(&self, shop_id: i64) -> Result<i64> {
        let count = self.conn.query_row(
            "SELECT COUNT(*) FROM categories WHERE shop_id = ?",
            params![shop_id],
            |row| row.get(0),
        )?;
        Ok(count)
    }

    fn count_products(&self, shop_id: i64) -> Result<i64> {
        let count = self.conn.query_row(
            "SELECT COUNT(*) FROM products WHERE shop_id = ?",
            params![shop_id],
            |row| row.get(0),
        )?;
        Ok(count)
    }

    fn count_variations(&self, shop_id: i64) -> Result<i64> {
        let count = self.conn.query_row(
            "SELECT COUNT(*) FROM variations v JOIN products p ON v.product_id = p.id \
             WHERE p.shop_id = ?",
            params![shop_id],
            |row| row.get(0),
        )?;
        Ok(count)
    }

    fn last_synced_at(&self, shop_id: i64) -> Result<Option<i64>> {
        let value = self.conn.query_row(
            "SELECT MAX(last_synced_at) FROM products WHERE shop_id = ?",
            params![shop_id],
            |row| row.get(0),
        )?;
        Ok(value)
    }
}

fn optional<T>(result: rusqlite::Result<T>) -> Result<Option<T>> {
    match result {
        Ok(row) => Ok(Some(row)),
        Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
        Err(error) => Err(error.into()),
    }
}

fn decimal_to_sql(value: Option<Decimal>) -> Option<String> {
    value.map(|decimal| decimal.to_string())
}

fn decimal_from_sql(value: Option<String>) -> Option<Decimal> {
    value.and_then(|text| Decimal::from_str(&text).ok())
}
