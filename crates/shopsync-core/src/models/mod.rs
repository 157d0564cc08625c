//! Local mirror entities and sync run reports

mod category;
mod product;
mod report;
mod shop;
mod variation;

pub use category::{Category, CategoryRecord};
pub use product::{Dimensions, Product, ProductRecord, ProductStatus, ProductType, StockStatus};
pub use report::{SyncDetails, SyncProgress, SyncReport, SyncStage};
pub use shop::{NewShop, Shop};
pub use variation::{Variation, VariationRecord};

/// Current Unix timestamp in milliseconds.
#[must_use]
pub fn now_millis() -> i64 {
    chrono::Utc::now().timestamp_millis()
}
