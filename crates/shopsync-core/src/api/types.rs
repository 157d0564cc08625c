//! Wire-format entities as received from the remote REST API.
//!
//! Deserialization is deliberately tolerant: the remote omits or nulls
//! fields freely, so almost everything defaults.

use serde::Deserialize;

/// An image reference on a remote entity.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct RemoteImage {
    #[serde(default)]
    pub src: String,
}

/// A remote product category. `parent == 0` marks a root.
#[derive(Debug, Clone, Deserialize)]
pub struct RemoteCategory {
    pub id: i64,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub slug: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub parent: i64,
    #[serde(default)]
    pub image: Option<RemoteImage>,
    #[serde(default)]
    pub menu_order: i64,
    #[serde(default)]
    pub count: i64,
}

/// A category reference embedded on a remote product.
#[derive(Debug, Clone, Deserialize)]
pub struct RemoteCategoryRef {
    pub id: i64,
}

/// Dimensions arrive as decimal strings; empty string means unset.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct RemoteDimensions {
    #[serde(default)]
    pub length: String,
    #[serde(default)]
    pub width: String,
    #[serde(default)]
    pub height: String,
}

/// One attribute selection on a variation.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct RemoteAttribute {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub option: String,
}

/// A remote product listing entry.
///
/// `raw` retains the verbatim payload the entry was parsed from; use
/// [`RemoteProduct::from_value`] so it is populated.
#[derive(Debug, Clone, Deserialize)]
pub struct RemoteProduct {
    pub id: i64,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub slug: String,
    #[serde(rename = "type", default)]
    pub product_type: String,
    #[serde(default)]
    pub status: String,
    #[serde(default)]
    pub sku: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub short_description: String,
    #[serde(default)]
    pub price: String,
    #[serde(default)]
    pub regular_price: String,
    #[serde(default)]
    pub sale_price: String,
    #[serde(default)]
    pub manage_stock: bool,
    #[serde(default)]
    pub stock_quantity: Option<i64>,
    #[serde(default)]
    pub stock_status: String,
    #[serde(default)]
    pub weight: String,
    #[serde(default)]
    pub dimensions: RemoteDimensions,
    #[serde(default)]
    pub categories: Vec<RemoteCategoryRef>,
    #[serde(default)]
    pub images: Vec<RemoteImage>,
    #[serde(skip)]
    pub raw: serde_json::Value,
}

impl RemoteProduct {
    /// Parse a listing entry while retaining the original payload in `raw`.
    pub fn from_value(value: serde_json::Value) -> Result<Self, serde_json::Error> {
        let mut product: Self = serde_json::from_value(value.clone())?;
        product.raw = value;
        Ok(product)
    }
}

/// A remote product variation. The owning product is implicit in the
/// endpoint path and is not part of the payload.
#[derive(Debug, Clone, Deserialize)]
pub struct RemoteVariation {
    pub id: i64,
    #[serde(default)]
    pub sku: String,
    #[serde(default)]
    pub price: String,
    #[serde(default)]
    pub regular_price: String,
    #[serde(default)]
    pub sale_price: String,
    #[serde(default)]
    pub manage_stock: bool,
    #[serde(default)]
    pub stock_quantity: Option<i64>,
    #[serde(default)]
    pub stock_status: String,
    #[serde(default)]
    pub dimensions: RemoteDimensions,
    #[serde(default)]
    pub attributes: Vec<RemoteAttribute>,
    #[serde(default)]
    pub image: Option<RemoteImage>,
}
