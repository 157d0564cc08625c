//! Category mirror rows and sync records

use serde::{Deserialize, Serialize};

/// A locally mirrored product category.
///
/// `(shop_id, remote_id)` is unique when `remote_id` is non-null; a null
/// `remote_id` marks a category created locally and never pushed upstream.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Category {
    /// Local primary key
    pub id: i64,
    /// Remote store's id, kept as text for cross-store comparison
    pub remote_id: Option<String>,
    /// Owning shop
    pub shop_id: i64,
    pub name: String,
    pub slug: String,
    pub description: String,
    /// Local id of the parent category, when resolved
    pub parent_id: Option<i64>,
    pub image_url: Option<String>,
    /// Remote display order
    pub menu_order: i64,
    /// Last successful sync (Unix ms)
    pub last_synced_at: Option<i64>,
}

/// Mapper output for one remote category, ready for upsert.
///
/// The parent is carried as a remote id; the reconciler resolves it to a
/// local row id (or null when the parent is not mirrored yet).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CategoryRecord {
    pub shop_id: i64,
    pub remote_id: String,
    pub name: String,
    pub slug: String,
    pub description: String,
    /// Remote id of the parent; `None` for root categories
    pub parent_remote_id: Option<String>,
    pub image_url: Option<String>,
    pub menu_order: i64,
}
