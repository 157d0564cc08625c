//! Pure wire-to-record mappers.
//!
//! No I/O here: each function turns one remote entity into the sync record
//! the repositories upsert. Image migration happens around these in the
//! reconciler so the mappers stay deterministic.

use std::collections::BTreeMap;
use std::str::FromStr;

use rust_decimal::Decimal;

use crate::api::{RemoteAttribute, RemoteCategory, RemoteDimensions, RemoteProduct, RemoteVariation};
use crate::models::{
    CategoryRecord, Dimensions, ProductRecord, ProductStatus, ProductType, StockStatus,
    VariationRecord,
};

/// Parse a remote decimal-as-string. Empty or whitespace-only input means
/// "unset" and maps to `None`, never to zero.
#[must_use]
pub fn parse_decimal(value: &str) -> Option<Decimal> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return None;
    }
    Decimal::from_str(trimmed).ok()
}

/// Map a remote category to its sync record. Direct field renaming; the
/// parent stays a remote id for the reconciler to resolve.
#[must_use]
pub fn map_category(shop_id: i64, remote: &RemoteCategory) -> CategoryRecord {
    CategoryRecord {
        shop_id,
        remote_id: remote.id.to_string(),
        name: remote.name.clone(),
        slug: remote.slug.clone(),
        description: remote.description.clone(),
        parent_remote_id: (remote.parent != 0).then(|| remote.parent.to_string()),
        image_url: remote
            .image
            .as_ref()
            .map(|image| image.src.clone())
            .filter(|src| !src.is_empty()),
        menu_order: remote.menu_order,
    }
}

/// Map a remote product to its sync record.
///
/// The first remote image becomes the featured image, the rest the
/// gallery; both still carry remote URLs at this point. The verbatim
/// payload is retained in `raw`.
#[must_use]
pub fn map_product(shop_id: i64, remote: &RemoteProduct) -> ProductRecord {
    let mut images = remote
        .images
        .iter()
        .map(|image| image.src.clone())
        .filter(|src| !src.is_empty());
    let featured_image = images.next();
    let gallery_images: Vec<String> = images.collect();

    ProductRecord {
        shop_id,
        remote_id: remote.id.to_string(),
        sku: normalize_sku(&remote.sku),
        name: remote.name.clone(),
        slug: remote.slug.clone(),
        description: remote.description.clone(),
        short_description: remote.short_description.clone(),
        price: parse_decimal(&remote.price),
        regular_price: parse_decimal(&remote.regular_price),
        sale_price: parse_decimal(&remote.sale_price),
        status: ProductStatus::from_remote(&remote.status),
        product_type: ProductType::from_remote(&remote.product_type),
        manage_stock: remote.manage_stock,
        stock_quantity: remote.stock_quantity,
        stock_status: StockStatus::from_remote(&remote.stock_status),
        weight: parse_decimal(&remote.weight),
        dimensions: map_dimensions(&remote.dimensions),
        category_remote_ids: remote
            .categories
            .iter()
            .map(|category| category.id.to_string())
            .collect(),
        featured_image,
        gallery_images,
        raw: remote.raw.clone(),
    }
}

/// Map a remote variation to its sync record. The attribute list flattens
/// to a name -> option map; the image stays a raw remote URL.
#[must_use]
pub fn map_variation(remote: &RemoteVariation) -> VariationRecord {
    VariationRecord {
        remote_id: remote.id.to_string(),
        sku: normalize_sku(&remote.sku),
        attributes: flatten_attributes(&remote.attributes),
        price: parse_decimal(&remote.price),
        regular_price: parse_decimal(&remote.regular_price),
        sale_price: parse_decimal(&remote.sale_price),
        manage_stock: remote.manage_stock,
        stock_quantity: remote.stock_quantity,
        stock_status: StockStatus::from_remote(&remote.stock_status),
        dimensions: map_dimensions(&remote.dimensions),
        image_url: remote
            .image
            .as_ref()
            .map(|image| image.src.clone())
            .filter(|src| !src.is_empty()),
    }
}

fn map_dimensions(remote: &RemoteDimensions) -> Dimensions {
    Dimensions {
        length: parse_decimal(&remote.length),
        width: parse_decimal(&remote.width),
        height: parse_decimal(&remote.height),
    }
}

fn flatten_attributes(attributes: &[RemoteAttribute]) -> BTreeMap<String, String> {
    attributes
        .iter()
        .filter(|attribute| !attribute.name.is_empty())
        .map(|attribute| (attribute.name.clone(), attribute.option.clone()))
        .collect()
}

fn normalize_sku(sku: &str) -> Option<String> {
    let trimmed = sku.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}
