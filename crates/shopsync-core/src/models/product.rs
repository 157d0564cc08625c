//! Product mirror rows, sync records, and catalog enums

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Product publication status.
///
/// Mirrors the remote vocabulary one to one: only remote `publish` is
/// renamed (to `published`); every other remote status passes through,
/// including `pending`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProductStatus {
    Draft,
    Pending,
    Private,
    Published,
}

impl ProductStatus {
    /// Translate a remote status string. Unknown values fall back to draft.
    #[must_use]
    pub fn from_remote(value: &str) -> Self {
        match value {
            "publish" => Self::Published,
            "pending" => Self::Pending,
            "private" => Self::Private,
            _ => Self::Draft,
        }
    }

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Draft => "draft",
            Self::Pending => "pending",
            Self::Private => "private",
            Self::Published => "published",
        }
    }
}

impl std::str::FromStr for ProductStatus {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "draft" => Ok(Self::Draft),
            "pending" => Ok(Self::Pending),
            "private" => Ok(Self::Private),
            "published" => Ok(Self::Published),
            other => Err(format!("unknown product status: {other}")),
        }
    }
}

/// Product kind as defined by the remote catalog.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProductType {
    Simple,
    Variable,
    Grouped,
    External,
}

impl ProductType {
    #[must_use]
    pub fn from_remote(value: &str) -> Self {
        match value {
            "variable" => Self::Variable,
            "grouped" => Self::Grouped,
            "external" => Self::External,
            _ => Self::Simple,
        }
    }

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Simple => "simple",
            Self::Variable => "variable",
            Self::Grouped => "grouped",
            Self::External => "external",
        }
    }
}

/// Stock availability status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StockStatus {
    InStock,
    OutOfStock,
    OnBackorder,
}

impl StockStatus {
    #[must_use]
    pub fn from_remote(value: &str) -> Self {
        match value {
            "outofstock" => Self::OutOfStock,
            "onbackorder" => Self::OnBackorder,
            _ => Self::InStock,
        }
    }

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::InStock => "instock",
            Self::OutOfStock => "outofstock",
            Self::OnBackorder => "onbackorder",
        }
    }
}

/// Physical dimensions, absent when the remote left them blank.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Dimensions {
    pub length: Option<Decimal>,
    pub width: Option<Decimal>,
    pub height: Option<Decimal>,
}

/// A locally mirrored product.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Product {
    /// Local primary key
    pub id: i64,
    /// Remote store's id; null for locally created rows
    pub remote_id: Option<String>,
    pub shop_id: i64,
    /// Stock keeping unit; unique per shop in practice, collisions are
    /// resolved by the reconciler rather than rejected
    pub sku: Option<String>,
    pub name: String,
    pub slug: String,
    pub description: String,
    pub short_description: String,
    /// Current price; `None` means unset on the remote, never zero
    pub price: Option<Decimal>,
    pub regular_price: Option<Decimal>,
    pub sale_price: Option<Decimal>,
    pub status: ProductStatus,
    pub product_type: ProductType,
    pub manage_stock: bool,
    pub stock_quantity: Option<i64>,
    pub stock_status: StockStatus,
    pub weight: Option<Decimal>,
    pub dimensions: Dimensions,
    /// Featured image URL (migrated when the image gateway succeeded)
    pub featured_image: Option<String>,
    /// Gallery image URLs in remote order
    pub gallery_images: Vec<String>,
    /// Verbatim remote payload snapshot, kept for debugging
    pub raw: serde_json::Value,
    pub last_synced_at: Option<i64>,
    pub created_at: i64,
    pub updated_at: i64,
}

/// Mapper output for one remote product, ready for upsert.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProductRecord {
    pub shop_id: i64,
    pub remote_id: String,
    pub sku: Option<String>,
    pub name: String,
    pub slug: String,
    pub description: String,
    pub short_description: String,
    pub price: Option<Decimal>,
    pub regular_price: Option<Decimal>,
    pub sale_price: Option<Decimal>,
    pub status: ProductStatus,
    pub product_type: ProductType,
    pub manage_stock: bool,
    pub stock_quantity: Option<i64>,
    pub stock_status: StockStatus,
    pub weight: Option<Decimal>,
    pub dimensions: Dimensions,
    /// Remote ids of the categories this product belongs to
    pub category_remote_ids: Vec<String>,
    pub featured_image: Option<String>,
    pub gallery_images: Vec<String>,
    pub raw: serde_json::Value,
}
