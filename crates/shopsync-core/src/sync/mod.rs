//! The reconciler: drives one full catalog synchronization run for one shop.
//!
//! Three strictly sequential phases (categories, products, variations)
//! in dependency order; downstream phases assume upstream writes are
//! committed. Per-item failures are collected into the run's error log and
//! never abort a phase; only page-fetch failures stop pagination for one
//! entity kind, and even then later phases still run over whatever was
//! fetched. Everything is awaited sequentially on purpose: identity
//! resolution reads then writes without transactions, so a single flow of
//! control is the concurrency-safety mechanism.

use crate::api::{ApiError, CatalogApi, RemoteCategory, RemoteProduct, RemoteVariation, WooClient};
use crate::credentials::CredentialCipher;
use crate::db::CatalogRepository;
use crate::error::Result;
use crate::mapper;
use crate::media::ImageGateway;
use crate::models::{
    ProductRecord, Shop, SyncDetails, SyncProgress, SyncReport, SyncStage,
};

/// Fixed page size for all listing requests.
const PER_PAGE: usize = 100;

/// Observer for progress events. Optional; the reconciler is fully usable
/// headless.
pub type ProgressCallback = Box<dyn Fn(&SyncProgress) + Send + Sync>;

/// One-shop synchronization service.
///
/// Re-running converges existing rows instead of duplicating them, given
/// stable remote ids or SKUs.
pub struct SyncService<A, R, G> {
    shop_id: i64,
    user_id: Option<String>,
    api: A,
    repo: R,
    images: G,
    progress: Option<ProgressCallback>,
}

impl<R, G> SyncService<WooClient, R, G>
where
    R: CatalogRepository,
    G: ImageGateway,
{
    /// Build a service for a registered shop by decrypting its stored
    /// credentials and constructing the transport client.
    pub fn for_shop(
        shop: &Shop,
        cipher: &dyn CredentialCipher,
        repo: R,
        images: G,
    ) -> Result<Self> {
        let consumer_key = cipher.decrypt(&shop.consumer_key)?;
        let consumer_secret = cipher.decrypt(&shop.consumer_secret)?;
        let api = WooClient::new(&shop.base_url, &consumer_key, &consumer_secret)?;
        Ok(Self::new(shop.id, api, repo, images))
    }
}

impl<A, R, G> SyncService<A, R, G>
where
    A: CatalogApi,
    R: CatalogRepository,
    G: ImageGateway,
{
    pub fn new(shop_id: i64, api: A, repo: R, images: G) -> Self {
        Self {
            shop_id,
            user_id: None,
            api,
            repo,
            images,
            progress: None,
        }
    }

    /// Attribute media-library registrations to this user.
    #[must_use]
    pub fn with_user(mut self, user_id: impl Into<String>) -> Self {
        self.user_id = Some(user_id.into());
        self
    }

    /// Register an observer for progress events.
    pub fn set_progress_callback(&mut self, callback: ProgressCallback) {
        self.progress = Some(callback);
    }

    /// Run a full synchronization: categories, then products, then
    /// variations. Always returns a report; `success` is true iff the
    /// error log stayed empty.
    pub async fn sync_all(&self) -> SyncReport {
        let mut details = SyncDetails::default();
        tracing::info!(shop_id = self.shop_id, "starting catalog sync");

        if let Err(error) = self.images.initialize_bucket().await {
            tracing::warn!(%error, "image bucket initialization failed; continuing with remote URLs");
        }

        self.sync_categories(&mut details).await;
        self.sync_products(&mut details).await;
        self.sync_variations(&mut details).await;

        let success = details.errors.is_empty();
        let message = if success {
            format!("Synchronized {} items", details.total_synced())
        } else {
            format!(
                "Synchronized {} items with {} errors",
                details.total_synced(),
                details.errors.len()
            )
        };
        self.report_progress(SyncStage::Complete, 0, 0, message.clone());
        tracing::info!(shop_id = self.shop_id, success, %message, "catalog sync finished");
        SyncReport {
            success,
            message,
            details,
        }
    }

    // ---- categories ----

    async fn sync_categories(&self, details: &mut SyncDetails) {
        self.report_progress(SyncStage::Categories, 0, 0, "Fetching categories");
        let remote = self.fetch_all_categories(details).await;
        let total = remote.len();

        // Roots first so children can resolve their already-persisted
        // parent within one pass.
        let (roots, children): (Vec<_>, Vec<_>) =
            remote.iter().partition(|category| category.parent == 0);

        let mut done = 0;
        for category in roots.into_iter().chain(children) {
            done += 1;
            if let Err(error) = self.sync_one_category(category, details) {
                details
                    .errors
                    .push(format!("Category \"{}\": {error}", category.name));
            }
            self.report_progress(
                SyncStage::Categories,
                done,
                total,
                format!("Synced category \"{}\"", category.name),
            );
        }
    }

    fn sync_one_category(&self, remote: &RemoteCategory, details: &mut SyncDetails) -> Result<()> {
        let record = mapper::map_category(self.shop_id, remote);

        // Parent deeper than one level may not be mirrored yet; a null
        // parent beats failing the item.
        let parent_id = record
            .parent_remote_id
            .as_deref()
            .and_then(|remote_parent| {
                self.repo
                    .find_category_by_remote_id(self.shop_id, remote_parent)
                    .ok()
                    .flatten()
            })
            .map(|parent| parent.id);

        match self
            .repo
            .find_category_by_remote_id(self.shop_id, &record.remote_id)?
        {
            Some(existing) => {
                self.repo.update_category(existing.id, &record, parent_id)?;
                details.categories_updated += 1;
            }
            None => {
                self.repo.insert_category(&record, parent_id)?;
                details.categories_created += 1;
            }
        }
        Ok(())
    }

    async fn fetch_all_categories(&self, details: &mut SyncDetails) -> Vec<RemoteCategory> {
        let mut all = Vec::new();
        let mut page = 1;
        loop {
            match self.api.list_categories(page, PER_PAGE).await {
                Ok(batch) => {
                    let fetched = batch.len();
                    all.extend(batch);
                    self.report_progress(
                        SyncStage::Categories,
                        all.len(),
                        estimate_total(all.len(), fetched),
                        format!("Fetched category page {page}"),
                    );
                    if fetched < PER_PAGE {
                        break;
                    }
                    page += 1;
                }
                Err(error) => {
                    details.errors.push(page_error("categories", page, &error));
                    break;
                }
            }
        }
        all
    }

    // ---- products ----

    async fn sync_products(&self, details: &mut SyncDetails) {
        self.report_progress(SyncStage::Products, 0, 0, "Fetching products");
        let remote = self.fetch_all_products(details).await;
        let total = remote.len();

        for (index, product) in remote.iter().enumerate() {
            if let Err(error) = self.sync_one_product(product, details).await {
                details
                    .errors
                    .push(format!("Product \"{}\": {error}", product.name));
            }
            self.report_progress(
                SyncStage::Products,
                index + 1,
                total,
                format!("Synced product \"{}\"", product.name),
            );
        }
    }

    async fn sync_one_product(
        &self,
        remote: &RemoteProduct,
        details: &mut SyncDetails,
    ) -> Result<()> {
        let mut record = mapper::map_product(self.shop_id, remote);

        // Migrate images into owned storage; on failure keep the remote
        // URLs and carry on.
        match self
            .images
            .sync_product_images(self.shop_id, record.featured_image.as_deref(), &record.gallery_images)
            .await
        {
            Ok(migrated) => {
                record.featured_image = migrated.featured;
                record.gallery_images = migrated.gallery;
            }
            Err(error) => {
                tracing::warn!(product = %remote.name, %error, "image migration failed; keeping remote URLs");
            }
        }

        let product_id = match self.resolve_product(&record)? {
            Some(existing) => {
                self.repo.update_product(existing.id, &record)?;
                details.products_updated += 1;
                existing.id
            }
            None => {
                let id = self.repo.insert_product(&record)?;
                details.products_created += 1;
                id
            }
        };

        if let Err(error) = self
            .images
            .register_product_images(
                product_id,
                self.user_id.as_deref(),
                record.featured_image.as_deref(),
                &record.gallery_images,
            )
            .await
        {
            tracing::warn!(product_id, %error, "media library registration failed");
        }

        self.rebuild_category_links(product_id, &record)?;
        Ok(())
    }

    /// Ordered identity resolution: remote id first, then SKU. The SKU
    /// fallback converges rows created locally (or migrated) before they
    /// had a remote id.
    fn resolve_product(&self, record: &ProductRecord) -> Result<Option<crate::models::Product>> {
        if let Some(found) = self
            .repo
            .find_product_by_remote_id(self.shop_id, &record.remote_id)?
        {
            return Ok(Some(found));
        }
        if let Some(sku) = record.sku.as_deref() {
            return self.repo.find_product_by_sku(self.shop_id, sku);
        }
        Ok(None)
    }

    /// Fully rebuild the product's category link set. Unresolved
    /// categories are skipped; the category phase ran first and should
    /// already cover them.
    fn rebuild_category_links(&self, product_id: i64, record: &ProductRecord) -> Result<()> {
        self.repo.delete_category_links(product_id)?;
        for remote_category_id in &record.category_remote_ids {
            match self
                .repo
                .find_category_by_remote_id(self.shop_id, remote_category_id)
            {
                Ok(Some(category)) => self.repo.insert_category_link(product_id, category.id)?,
                Ok(None) => {
                    tracing::debug!(product_id, remote_category_id, "skipping unresolved category link");
                }
                Err(error) => {
                    tracing::debug!(product_id, remote_category_id, %error, "category lookup failed; skipping link");
                }
            }
        }
        Ok(())
    }

    async fn fetch_all_products(&self, details: &mut SyncDetails) -> Vec<RemoteProduct> {
        let mut all = Vec::new();
        let mut page = 1;
        loop {
            match self.api.list_products(page, PER_PAGE).await {
                Ok(batch) => {
                    let fetched = batch.len();
                    all.extend(batch);
                    self.report_progress(
                        SyncStage::Products,
                        all.len(),
                        estimate_total(all.len(), fetched),
                        format!("Fetched product page {page}"),
                    );
                    if fetched < PER_PAGE {
                        break;
                    }
                    page += 1;
                }
                Err(error) => {
                    details.errors.push(page_error("products", page, &error));
                    break;
                }
            }
        }
        all
    }

    // ---- variations ----

    async fn sync_variations(&self, details: &mut SyncDetails) {
        let parents = match self.repo.list_variable_products(self.shop_id) {
            Ok(parents) => parents,
            Err(error) => {
                details
                    .errors
                    .push(format!("Failed to list variable products: {error}"));
                return;
            }
        };
        let total = parents.len();
        self.report_progress(SyncStage::Variations, 0, total, "Syncing variations");

        for (index, parent) in parents.iter().enumerate() {
            // list_variable_products filters on remote_id, but stay safe.
            let Some(remote_product_id) = parent.remote_id.as_deref() else {
                continue;
            };

            // Single request per product; products with more than
            // PER_PAGE variations are truncated (matches upstream).
            match self.api.list_variations(remote_product_id, PER_PAGE).await {
                Ok(batch) => {
                    for variation in &batch {
                        if let Err(error) = self.sync_one_variation(parent.id, variation, details) {
                            details.errors.push(format!(
                                "Variation {} of \"{}\": {error}",
                                variation.id, parent.name
                            ));
                        }
                    }
                }
                Err(error) if error.is_auth() => {
                    details.errors.push(page_error("variations", 1, &error));
                }
                Err(error) => {
                    details.errors.push(format!(
                        "Failed to fetch variations for \"{}\": {error}",
                        parent.name
                    ));
                }
            }
            self.report_progress(
                SyncStage::Variations,
                index + 1,
                total,
                format!("Synced variations of \"{}\"", parent.name),
            );
        }
    }

    fn sync_one_variation(
        &self,
        product_id: i64,
        remote: &RemoteVariation,
        details: &mut SyncDetails,
    ) -> Result<()> {
        let record = mapper::map_variation(remote);

        let existing = match self
            .repo
            .find_variation_by_remote_id(product_id, &record.remote_id)?
        {
            Some(found) => Some(found),
            None => match record.sku.as_deref() {
                Some(sku) => self.repo.find_variation_by_sku(product_id, sku)?,
                None => None,
            },
        };

        match existing {
            Some(found) => {
                self.repo.update_variation(found.id, &record)?;
                details.variations_updated += 1;
            }
            None => {
                self.repo.insert_variation(product_id, &record)?;
                details.variations_created += 1;
            }
        }
        Ok(())
    }

    fn report_progress(
        &self,
        stage: SyncStage,
        current: usize,
        total: usize,
        message: impl Into<String>,
    ) {
        if let Some(callback) = &self.progress {
            callback(&SyncProgress {
                stage,
                current,
                total,
                message: message.into(),
            });
        }
    }
}

/// Listing totals are unknown until pagination ends naturally; while a
/// further page is suspected, estimate one more full page.
const fn estimate_total(fetched_so_far: usize, last_batch: usize) -> usize {
    if last_batch == PER_PAGE {
        fetched_so_far + PER_PAGE
    } else {
        fetched_so_far
    }
}

/// Page-fetch failures are phase-fatal for one entity kind. Auth failures
/// get a clearer domain message, detected from the error variant rather
/// than message text.
fn page_error(kind: &str, page: u32, error: &ApiError) -> String {
    if error.is_auth() {
        format!(
            "Failed to fetch {kind}: authentication failed - check that the REST API credentials have read permissions"
        )
    } else {
        format!("Failed to fetch {kind} page {page}: {error}")
    }
}

#[cfg(test)]
mod tests;
