//! Reconciler tests against an in-memory mirror, a scripted catalog API,
//! and fake image gateways.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use pretty_assertions::assert_eq;
use serde_json::json;

use crate::api::{ApiError, CatalogApi, RemoteCategory, RemoteProduct, RemoteVariation};
use crate::db::{
    CatalogRepository, Database, ShopRepository, SqliteCatalogRepository, SqliteShopRepository,
};
use crate::error::{Error, Result};
use crate::media::{ImageGateway, MigratedImages, PassthroughImageGateway};
use crate::models::{
    Category, CategoryRecord, NewShop, Product, ProductRecord, SyncStage, Variation,
    VariationRecord,
};

use super::SyncService;

// ---- fakes ----

#[derive(Default)]
struct FakeApi {
    categories: Vec<RemoteCategory>,
    products: Vec<RemoteProduct>,
    variations: HashMap<String, Vec<RemoteVariation>>,
    categories_fail_auth: bool,
    products_fail_page: Option<u32>,
    variations_fail_for: Option<String>,
}

fn page_slice<T: Clone>(items: &[T], page: u32, per_page: usize) -> Vec<T> {
    let start = (page as usize - 1) * per_page;
    items.iter().skip(start).take(per_page).cloned().collect()
}

impl CatalogApi for FakeApi {
    async fn list_categories(
        &self,
        page: u32,
        per_page: usize,
    ) -> std::result::Result<Vec<RemoteCategory>, ApiError> {
        if self.categories_fail_auth {
            return Err(ApiError::Auth { status: 403 });
        }
        Ok(page_slice(&self.categories, page, per_page))
    }

    async fn list_products(
        &self,
        page: u32,
        per_page: usize,
    ) -> std::result::Result<Vec<RemoteProduct>, ApiError> {
        if self.products_fail_page == Some(page) {
            return Err(ApiError::Http {
                status: 500,
                body: None,
            });
        }
        Ok(page_slice(&self.products, page, per_page))
    }

    async fn list_variations(
        &self,
        product_remote_id: &str,
        _per_page: usize,
    ) -> std::result::Result<Vec<RemoteVariation>, ApiError> {
        if self.variations_fail_for.as_deref() == Some(product_remote_id) {
            return Err(ApiError::Http {
                status: 500,
                body: None,
            });
        }
        Ok(self
            .variations
            .get(product_remote_id)
            .cloned()
            .unwrap_or_default())
    }
}

/// Gateway whose every operation fails.
struct FailingImageGateway;

impl ImageGateway for FailingImageGateway {
    async fn initialize_bucket(&self) -> Result<()> {
        Err(Error::Storage("bucket offline".to_string()))
    }

    async fn sync_product_images(
        &self,
        _shop_id: i64,
        _featured: Option<&str>,
        _gallery: &[String],
    ) -> Result<MigratedImages> {
        Err(Error::Storage("image copy failed".to_string()))
    }

    async fn register_product_images(
        &self,
        _product_id: i64,
        _user_id: Option<&str>,
        _featured: Option<&str>,
        _gallery: &[String],
    ) -> Result<()> {
        Err(Error::Storage("media registration failed".to_string()))
    }
}

/// Gateway that rewrites every URL to a stable local one.
struct RewritingImageGateway;

impl ImageGateway for RewritingImageGateway {
    async fn initialize_bucket(&self) -> Result<()> {
        Ok(())
    }

    async fn sync_product_images(
        &self,
        _shop_id: i64,
        featured: Option<&str>,
        gallery: &[String],
    ) -> Result<MigratedImages> {
        Ok(MigratedImages {
            featured: featured.map(|url| format!("local://{url}")),
            gallery: gallery.iter().map(|url| format!("local://{url}")).collect(),
        })
    }

    async fn register_product_images(
        &self,
        _product_id: i64,
        _user_id: Option<&str>,
        _featured: Option<&str>,
        _gallery: &[String],
    ) -> Result<()> {
        Ok(())
    }
}

/// Repository wrapper that fails product inserts for one marked name.
struct SabotagedRepo<'a> {
    inner: SqliteCatalogRepository<'a>,
}

impl CatalogRepository for SabotagedRepo<'_> {
    fn find_category_by_remote_id(&self, shop_id: i64, remote_id: &str) -> Result<Option<Category>> {
        self.inner.find_category_by_remote_id(shop_id, remote_id)
    }
    fn insert_category(&self, record: &CategoryRecord, parent_id: Option<i64>) -> Result<i64> {
        self.inner.insert_category(record, parent_id)
    }
    fn update_category(&self, id: i64, record: &CategoryRecord, parent_id: Option<i64>) -> Result<()> {
        self.inner.update_category(id, record, parent_id)
    }
    fn list_categories(&self, shop_id: i64) -> Result<Vec<Category>> {
        self.inner.list_categories(shop_id)
    }
    fn find_product_by_remote_id(&self, shop_id: i64, remote_id: &str) -> Result<Option<Product>> {
        self.inner.find_product_by_remote_id(shop_id, remote_id)
    }
    fn find_product_by_sku(&self, shop_id: i64, sku: &str) -> Result<Option<Product>> {
        self.inner.find_product_by_sku(shop_id, sku)
    }
    fn insert_product(&self, record: &ProductRecord) -> Result<i64> {
        if record.name == "Broken widget" {
            return Err(Error::InvalidInput("simulated insert failure".to_string()));
        }
        self.inner.insert_product(record)
    }
    fn update_product(&self, id: i64, record: &ProductRecord) -> Result<()> {
        self.inner.update_product(id, record)
    }
    fn list_products(&self, shop_id: i64) -> Result<Vec<Product>> {
        self.inner.list_products(shop_id)
    }
    fn list_variable_products(&self, shop_id: i64) -> Result<Vec<Product>> {
        self.inner.list_variable_products(shop_id)
    }
    fn delete_category_links(&self, product_id: i64) -> Result<()> {
        self.inner.delete_category_links(product_id)
    }
    fn insert_category_link(&self, product_id: i64, category_id: i64) -> Result<()> {
        self.inner.insert_category_link(product_id, category_id)
    }
    fn category_ids_for_product(&self, product_id: i64) -> Result<Vec<i64>> {
        self.inner.category_ids_for_product(product_id)
    }
    fn find_variation_by_remote_id(&self, product_id: i64, remote_id: &str) -> Result<Option<Variation>> {
        self.inner.find_variation_by_remote_id(product_id, remote_id)
    }
    fn find_variation_by_sku(&self, product_id: i64, sku: &str) -> Result<Option<Variation>> {
        self.inner.find_variation_by_sku(product_id, sku)
    }
    fn insert_variation(&self, product_id: i64, record: &VariationRecord) -> Result<i64> {
        self.inner.insert_variation(product_id, record)
    }
    fn update_variation(&self, id: i64, record: &VariationRecord) -> Result<()> {
        self.inner.update_variation(id, record)
    }
    fn list_variations(&self, product_id: i64) -> Result<Vec<Variation>> {
        self.inner.list_variations(product_id)
    }
    fn count_categories(&self, shop_id: i64) -> Result<i64> {
        self.inner.count_categories(shop_id)
    }
    fn count_products(&self, shop_id: i64) -> Result<i64> {
        self.inner.count_products(shop_id)
    }
    fn count_variations(&self, shop_id: i64) -> Result<i64> {
        self.inner.count_variations(shop_id)
    }
    fn last_synced_at(&self, shop_id: i64) -> Result<Option<i64>> {
        self.inner.last_synced_at(shop_id)
    }
}

// ---- fixtures ----

fn setup() -> (Database, i64) {
    let db = Database::open_in_memory().unwrap();
    let shop = SqliteShopRepository::new(db.connection())
        .create(&NewShop {
            name: "test shop".to_string(),
            base_url: "https://shop.example.com".to_string(),
            consumer_key: "enc-key".to_string(),
            consumer_secret: "enc-secret".to_string(),
        })
        .unwrap();
    let id = shop.id;
    (db, id)
}

fn remote_category(id: i64, name: &str, parent: i64) -> RemoteCategory {
    serde_json::from_value(json!({
        "id": id,
        "name": name,
        "slug": name.to_lowercase(),
        "parent": parent,
    }))
    .unwrap()
}

fn remote_product(value: serde_json::Value) -> RemoteProduct {
    RemoteProduct::from_value(value).unwrap()
}

fn remote_variation(value: serde_json::Value) -> RemoteVariation {
    serde_json::from_value(value).unwrap()
}

fn small_catalog() -> FakeApi {
    FakeApi {
        categories: vec![
            remote_category(10, "Clothing", 0),
            remote_category(11, "Shirts", 10),
        ],
        products: vec![
            remote_product(json!({
                "id": 1,
                "name": "Plain tee",
                "sku": "TEE-1",
                "type": "simple",
                "status": "publish",
                "price": "15.00",
                "categories": [{"id": 10}, {"id": 11}],
            })),
            remote_product(json!({
                "id": 2,
                "name": "Logo tee",
                "sku": "TEE-2",
                "type": "variable",
                "status": "publish",
                "price": "",
                "categories": [{"id": 11}],
            })),
        ],
        variations: HashMap::from([(
            "2".to_string(),
            vec![
                remote_variation(json!({
                    "id": 201,
                    "sku": "TEE-2-RED",
                    "price": "18.00",
                    "attributes": [{"name": "Color", "option": "Red"}],
                })),
                remote_variation(json!({
                    "id": 202,
                    "sku": "TEE-2-BLUE",
                    "price": "18.00",
                    "attributes": [{"name": "Color", "option": "Blue"}],
                })),
            ],
        )]),
        ..FakeApi::default()
    }
}

// ---- tests ----

#[tokio::test]
async fn first_run_creates_second_run_updates() {
    let (db, shop_id) = setup();

    let service = SyncService::new(
        shop_id,
        small_catalog(),
        SqliteCatalogRepository::new(db.connection()),
        PassthroughImageGateway,
    );

    let first = service.sync_all().await;
    assert!(first.success, "errors: {:?}", first.details.errors);
    assert_eq!(first.details.categories_created, 2);
    assert_eq!(first.details.products_created, 2);
    assert_eq!(first.details.variations_created, 2);
    assert_eq!(first.details.categories_updated, 0);

    let second = service.sync_all().await;
    assert!(second.success);
    assert_eq!(second.details.categories_created, 0);
    assert_eq!(second.details.products_created, 0);
    assert_eq!(second.details.variations_created, 0);
    assert_eq!(second.details.categories_updated, 2);
    assert_eq!(second.details.products_updated, 2);
    assert_eq!(second.details.variations_updated, 2);

    let repo = SqliteCatalogRepository::new(db.connection());
    assert_eq!(repo.count_products(shop_id).unwrap(), 2);
    assert_eq!(repo.count_categories(shop_id).unwrap(), 2);
    assert_eq!(repo.count_variations(shop_id).unwrap(), 2);
}

#[tokio::test]
async fn sku_fallback_merges_local_row() {
    let (db, shop_id) = setup();

    // A product created locally, never pushed upstream: no remote id yet.
    db.connection()
        .execute(
            "INSERT INTO products (shop_id, remote_id, sku, name, created_at, updated_at) \
             VALUES (?, NULL, 'TEE-1', 'Local tee', 0, 0)",
            rusqlite::params![shop_id],
        )
        .unwrap();

    let service = SyncService::new(
        shop_id,
        small_catalog(),
        SqliteCatalogRepository::new(db.connection()),
        PassthroughImageGateway,
    );
    let report = service.sync_all().await;
    assert!(report.success, "errors: {:?}", report.details.errors);
    assert_eq!(report.details.products_created, 1); // only "Logo tee"
    assert_eq!(report.details.products_updated, 1); // merged into the local row

    let repo = SqliteCatalogRepository::new(db.connection());
    assert_eq!(repo.count_products(shop_id).unwrap(), 2);
    let merged = repo.find_product_by_sku(shop_id, "TEE-1").unwrap().unwrap();
    assert_eq!(merged.remote_id.as_deref(), Some("1"));
    assert_eq!(merged.name, "Plain tee");
}

#[tokio::test]
async fn child_category_resolves_parent_within_one_pass() {
    let (db, shop_id) = setup();

    // Child listed before its parent; roots are processed first anyway.
    let api = FakeApi {
        categories: vec![
            remote_category(11, "Shirts", 10),
            remote_category(10, "Clothing", 0),
        ],
        ..FakeApi::default()
    };
    let service = SyncService::new(
        shop_id,
        api,
        SqliteCatalogRepository::new(db.connection()),
        PassthroughImageGateway,
    );
    let report = service.sync_all().await;
    assert!(report.success);

    let repo = SqliteCatalogRepository::new(db.connection());
    let parent = repo.find_category_by_remote_id(shop_id, "10").unwrap().unwrap();
    let child = repo.find_category_by_remote_id(shop_id, "11").unwrap().unwrap();
    assert_eq!(child.parent_id, Some(parent.id));
}

#[tokio::test]
async fn deeply_nested_category_falls_back_to_null_parent() {
    let (db, shop_id) = setup();

    // Grandchild precedes its (non-root) parent in listing order, so its
    // parent is not mirrored yet when it is processed. It still syncs,
    // with a null parent.
    let api = FakeApi {
        categories: vec![
            remote_category(12, "Slim fit", 11),
            remote_category(11, "Shirts", 10),
            remote_category(10, "Clothing", 0),
        ],
        ..FakeApi::default()
    };
    let service = SyncService::new(
        shop_id,
        api,
        SqliteCatalogRepository::new(db.connection()),
        PassthroughImageGateway,
    );
    let report = service.sync_all().await;
    assert!(report.success);

    let repo = SqliteCatalogRepository::new(db.connection());
    let grandchild = repo.find_category_by_remote_id(shop_id, "12").unwrap().unwrap();
    assert_eq!(grandchild.parent_id, None);
    let child = repo.find_category_by_remote_id(shop_id, "11").unwrap().unwrap();
    assert!(child.parent_id.is_some());
}

#[tokio::test]
async fn per_item_failure_does_not_stop_the_phase() {
    let (db, shop_id) = setup();

    let api = FakeApi {
        products: vec![
            remote_product(json!({"id": 1, "name": "Good widget", "sku": "W-1"})),
            remote_product(json!({"id": 2, "name": "Broken widget", "sku": "W-2"})),
            remote_product(json!({"id": 3, "name": "Fine widget", "sku": "W-3"})),
        ],
        ..FakeApi::default()
    };
    let service = SyncService::new(
        shop_id,
        api,
        SabotagedRepo {
            inner: SqliteCatalogRepository::new(db.connection()),
        },
        PassthroughImageGateway,
    );
    let report = service.sync_all().await;

    assert!(!report.success);
    assert_eq!(report.details.products_created, 2);
    assert_eq!(report.details.errors.len(), 1);
    assert!(report.details.errors[0].contains("Broken widget"));

    let repo = SqliteCatalogRepository::new(db.connection());
    assert_eq!(repo.count_products(shop_id).unwrap(), 2);
}

#[tokio::test]
async fn empty_price_persists_as_null() {
    let (db, shop_id) = setup();

    let service = SyncService::new(
        shop_id,
        small_catalog(),
        SqliteCatalogRepository::new(db.connection()),
        PassthroughImageGateway,
    );
    service.sync_all().await;

    let repo = SqliteCatalogRepository::new(db.connection());
    let product = repo.find_product_by_remote_id(shop_id, "2").unwrap().unwrap();
    assert_eq!(product.price, None);
}

#[tokio::test]
async fn image_gateway_failure_keeps_remote_urls() {
    let (db, shop_id) = setup();

    let api = FakeApi {
        products: vec![remote_product(json!({
            "id": 1,
            "name": "Pictured widget",
            "images": [
                {"src": "https://cdn.example.com/a.jpg"},
                {"src": "https://cdn.example.com/b.jpg"},
            ],
        }))],
        ..FakeApi::default()
    };
    let service = SyncService::new(
        shop_id,
        api,
        SqliteCatalogRepository::new(db.connection()),
        FailingImageGateway,
    );
    let report = service.sync_all().await;
    assert!(report.success, "errors: {:?}", report.details.errors);

    let repo = SqliteCatalogRepository::new(db.connection());
    let product = repo.find_product_by_remote_id(shop_id, "1").unwrap().unwrap();
    assert_eq!(product.featured_image.as_deref(), Some("https://cdn.example.com/a.jpg"));
    assert_eq!(product.gallery_images, vec!["https://cdn.example.com/b.jpg".to_string()]);
}

#[tokio::test]
async fn migrated_urls_replace_remote_urls() {
    let (db, shop_id) = setup();

    let api = FakeApi {
        products: vec![remote_product(json!({
            "id": 1,
            "name": "Pictured widget",
            "images": [{"src": "https://cdn.example.com/a.jpg"}],
        }))],
        ..FakeApi::default()
    };
    let service = SyncService::new(
        shop_id,
        api,
        SqliteCatalogRepository::new(db.connection()),
        RewritingImageGateway,
    );
    service.sync_all().await;

    let repo = SqliteCatalogRepository::new(db.connection());
    let product = repo.find_product_by_remote_id(shop_id, "1").unwrap().unwrap();
    assert_eq!(
        product.featured_image.as_deref(),
        Some("local://https://cdn.example.com/a.jpg")
    );
}

#[tokio::test]
async fn category_auth_failure_records_permission_hint_and_run_continues() {
    let (db, shop_id) = setup();

    let api = FakeApi {
        categories_fail_auth: true,
        products: vec![remote_product(json!({"id": 1, "name": "Widget"}))],
        ..FakeApi::default()
    };
    let service = SyncService::new(
        shop_id,
        api,
        SqliteCatalogRepository::new(db.connection()),
        PassthroughImageGateway,
    );
    let report = service.sync_all().await;

    assert!(!report.success);
    assert_eq!(report.details.errors.len(), 1);
    assert!(report.details.errors[0].contains("read permissions"));
    // The product phase still ran with whatever was fetched.
    assert_eq!(report.details.products_created, 1);
}

#[tokio::test]
async fn failing_page_keeps_earlier_pages() {
    let (db, shop_id) = setup();

    // A full first page makes the loop suspect a second one, which fails.
    let products = (1..=100)
        .map(|id| remote_product(json!({"id": id, "name": format!("Widget {id}")})))
        .collect();
    let api = FakeApi {
        products,
        products_fail_page: Some(2),
        ..FakeApi::default()
    };
    let service = SyncService::new(
        shop_id,
        api,
        SqliteCatalogRepository::new(db.connection()),
        PassthroughImageGateway,
    );
    let report = service.sync_all().await;

    assert!(!report.success);
    assert_eq!(report.details.products_created, 100);
    assert_eq!(report.details.errors.len(), 1);
    assert!(report.details.errors[0].contains("page 2"));
}

#[tokio::test]
async fn variation_fetch_failure_is_per_product() {
    let (db, shop_id) = setup();

    let api = FakeApi {
        products: vec![
            remote_product(json!({"id": 1, "name": "Variable A", "type": "variable"})),
            remote_product(json!({"id": 2, "name": "Variable B", "type": "variable"})),
        ],
        variations: HashMap::from([(
            "2".to_string(),
            vec![remote_variation(json!({"id": 20, "sku": "B-1"}))],
        )]),
        variations_fail_for: Some("1".to_string()),
        ..FakeApi::default()
    };
    let service = SyncService::new(
        shop_id,
        api,
        SqliteCatalogRepository::new(db.connection()),
        PassthroughImageGateway,
    );
    let report = service.sync_all().await;

    assert!(!report.success);
    assert_eq!(report.details.variations_created, 1);
    assert_eq!(report.details.errors.len(), 1);
    assert!(report.details.errors[0].contains("Variable A"));
}

#[tokio::test]
async fn variation_sku_fallback_converges_rows() {
    let (db, shop_id) = setup();

    let repo = SqliteCatalogRepository::new(db.connection());
    let product_id = {
        db.connection()
            .execute(
                "INSERT INTO products (shop_id, remote_id, sku, name, product_type, created_at, updated_at) \
                 VALUES (?, '2', 'TEE-2', 'Logo tee', 'variable', 0, 0)",
                rusqlite::params![shop_id],
            )
            .unwrap();
        db.connection().last_insert_rowid()
    };
    // Variation known locally by SKU only.
    db.connection()
        .execute(
            "INSERT INTO variations (product_id, remote_id, sku) VALUES (?, NULL, 'TEE-2-RED')",
            rusqlite::params![product_id],
        )
        .unwrap();

    let service = SyncService::new(
        shop_id,
        small_catalog(),
        SqliteCatalogRepository::new(db.connection()),
        PassthroughImageGateway,
    );
    let report = service.sync_all().await;
    assert!(report.success, "errors: {:?}", report.details.errors);
    assert_eq!(report.details.variations_updated, 1);
    assert_eq!(report.details.variations_created, 1);

    let merged = repo.find_variation_by_sku(product_id, "TEE-2-RED").unwrap().unwrap();
    assert_eq!(merged.remote_id.as_deref(), Some("201"));
    assert_eq!(repo.count_variations(shop_id).unwrap(), 2);
}

#[tokio::test]
async fn category_links_are_rebuilt_each_run() {
    let (db, shop_id) = setup();

    let service = SyncService::new(
        shop_id,
        small_catalog(),
        SqliteCatalogRepository::new(db.connection()),
        PassthroughImageGateway,
    );
    service.sync_all().await;

    let repo = SqliteCatalogRepository::new(db.connection());
    let plain = repo.find_product_by_remote_id(shop_id, "1").unwrap().unwrap();
    assert_eq!(repo.category_ids_for_product(plain.id).unwrap().len(), 2);

    // A stale link disappears on the next run.
    let logo = repo.find_product_by_remote_id(shop_id, "2").unwrap().unwrap();
    let clothing = repo.find_category_by_remote_id(shop_id, "10").unwrap().unwrap();
    repo.insert_category_link(logo.id, clothing.id).unwrap();
    assert_eq!(repo.category_ids_for_product(logo.id).unwrap().len(), 2);

    service.sync_all().await;
    assert_eq!(repo.category_ids_for_product(logo.id).unwrap().len(), 1);
}

#[tokio::test]
async fn progress_reports_stages_in_order() {
    let (db, shop_id) = setup();

    let mut service = SyncService::new(
        shop_id,
        small_catalog(),
        SqliteCatalogRepository::new(db.connection()),
        PassthroughImageGateway,
    );
    let seen: Arc<Mutex<Vec<SyncStage>>> = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&seen);
    service.set_progress_callback(Box::new(move |progress| {
        sink.lock().unwrap().push(progress.stage);
    }));

    service.sync_all().await;

    let stages = seen.lock().unwrap();
    assert!(stages.contains(&SyncStage::Categories));
    assert!(stages.contains(&SyncStage::Products));
    assert!(stages.contains(&SyncStage::Variations));
    assert_eq!(stages.last(), Some(&SyncStage::Complete));

    // Stages never interleave out of order.
    let order = |stage: SyncStage| match stage {
        SyncStage::Categories => 0,
        SyncStage::Products => 1,
        SyncStage::Variations => 2,
        SyncStage::Complete => 3,
    };
    let ranks: Vec<u8> = stages.iter().copied().map(order).collect();
    let mut sorted = ranks.clone();
    sorted.sort_unstable();
    assert_eq!(ranks, sorted);
}
