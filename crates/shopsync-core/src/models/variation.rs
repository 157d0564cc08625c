//! Variation mirror rows and sync records

use std::collections::BTreeMap;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::{Dimensions, StockStatus};

/// A locally mirrored product variation.
///
/// Always owned by a local product row; the owning product is the shop
/// scope, so no `shop_id` is carried here.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Variation {
    /// Local primary key
    pub id: i64,
    /// Remote store's id; null for locally created rows
    pub remote_id: Option<String>,
    /// Local id of the owning product
    pub product_id: i64,
    pub sku: Option<String>,
    /// Attribute selections, flattened to name -> option
    pub attributes: BTreeMap<String, String>,
    pub price: Option<Decimal>,
    pub regular_price: Option<Decimal>,
    pub sale_price: Option<Decimal>,
    pub manage_stock: bool,
    pub stock_quantity: Option<i64>,
    pub stock_status: StockStatus,
    pub dimensions: Dimensions,
    /// At most one image; kept as the raw remote URL
    pub image_url: Option<String>,
    pub last_synced_at: Option<i64>,
}

/// Mapper output for one remote variation, ready for upsert.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VariationRecord {
    pub remote_id: String,
    pub sku: Option<String>,
    pub attributes: BTreeMap<String, String>,
    pub price: Option<Decimal>,
    pub regular_price: Option<Decimal>,
    pub sale_price: Option<Decimal>,
    pub manage_stock: bool,
    pub stock_quantity: Option<i64>,
    pub stock_status: StockStatus,
    pub dimensions: Dimensions,
    pub image_url: Option<String>,
}
