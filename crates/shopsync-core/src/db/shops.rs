//! Shop connection repository

use rusqlite::{params, Connection, Row};

use crate::error::{Error, Result};
use crate::models::{now_millis, NewShop, Shop};

/// Storage operations for shop connection records.
pub trait ShopRepository {
    /// Register a new shop. Credentials must already be encrypted.
    fn create(&self, record: &NewShop) -> Result<Shop>;

    /// Get a shop by id
    fn get(&self, id: i64) -> Result<Option<Shop>>;

    /// List all registered shops
    fn list(&self) -> Result<Vec<Shop>>;

    /// Delete a shop and, via cascade, its mirrored catalog
    fn delete(&self, id: i64) -> Result<()>;
}

/// `SQLite` implementation of [`ShopRepository`]
pub struct SqliteShopRepository<'a> {
    conn: &'a Connection,
}

impl<'a> SqliteShopRepository<'a> {
    /// Create a new repository with the given connection
    pub const fn new(conn: &'a Connection) -> Self {
        Self { conn }
    }

    fn parse_shop(row: &Row<'_>) -> rusqlite::Result<Shop> {
        Ok(Shop {
            id: row.get(0)?,
            name: row.get(1)?,
            base_url: row.get(2)?,
            consumer_key: row.get(3)?,
            consumer_secret: row.get(4)?,
            active: row.get::<_, i64>(5)? != 0,
            created_at: row.get(6)?,
            updated_at: row.get(7)?,
        })
    }
}

const SHOP_COLUMNS: &str =
    "id, name, base_url, consumer_key, consumer_secret, active, created_at, updated_at";

impl ShopRepository for SqliteShopRepository<'_> {
    fn create(&self, record: &NewShop) -> Result<Shop> {
        let now = now_millis();
        self.conn.execute(
            "INSERT INTO shops (name, base_url, consumer_key, consumer_secret, active, \
             created_at, updated_at) VALUES (?, ?, ?, ?, 1, ?, ?)",
            params![
                record.name,
                record.base_url,
                record.consumer_key,
                record.consumer_secret,
                now,
                now,
            ],
        )?;
        let id = self.conn.last_insert_rowid();
        self.get(id)?
            .ok_or_else(|| Error::NotFound(format!("shop {id}")))
    }

    fn get(&self, id: i64) -> Result<Option<Shop>> {
        let result = self.conn.query_row(
            &format!("SELECT {SHOP_COLUMNS} FROM shops WHERE id = ?"),
            params![id],
            Self::parse_shop,
        );
        match result {
            Ok(shop) => Ok(Some(shop)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(error) => Err(error.into()),
        }
    }

    fn list(&self) -> Result<Vec<Shop>> {
        let mut stmt = self
            .conn
            .prepare(&format!("SELECT {SHOP_COLUMNS} FROM shops ORDER BY name"))?;
        let shops = stmt
            .query_map([], Self::parse_shop)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(shops)
    }

    fn delete(&self, id: i64) -> Result<()> {
        let rows = self
            .conn
            .execute("DELETE FROM shops WHERE id = ?", params![id])?;
        if rows == 0 {
            return Err(Error::NotFound(format!("shop {id}")));
        }
        Ok(())
    }
}
