//! Image migration gateway boundary.
//!
//! The actual storage backend (bucket provisioning, byte copying, CDN
//! rewriting) lives outside this crate; the reconciler only depends on
//! this trait. Every failure behind it is non-fatal to a sync run.

use crate::error::Result;

/// Stable local URLs returned by a successful migration.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MigratedImages {
    pub featured: Option<String>,
    pub gallery: Vec<String>,
}

/// External capability: copy remote image bytes into owned storage and
/// hand back canonical local URLs.
#[allow(async_fn_in_trait)]
pub trait ImageGateway {
    /// Prepare backing storage for a run. Called once per run; failure is
    /// logged and the run continues with direct remote URLs.
    async fn initialize_bucket(&self) -> Result<()>;

    /// Migrate a product's featured/gallery images, returning the local
    /// replacement URLs.
    async fn sync_product_images(
        &self,
        shop_id: i64,
        featured: Option<&str>,
        gallery: &[String],
    ) -> Result<MigratedImages>;

    /// Register a product's (already migrated) images with the central
    /// media library.
    async fn register_product_images(
        &self,
        product_id: i64,
        user_id: Option<&str>,
        featured: Option<&str>,
        gallery: &[String],
    ) -> Result<()>;
}

/// Gateway that performs no migration: images keep their remote URLs and
/// registration is a no-op. Used when no storage backend is configured.
#[derive(Debug, Clone, Copy, Default)]
pub struct PassthroughImageGateway;

impl ImageGateway for PassthroughImageGateway {
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
            featured: featured.map(ToString::to_string),
            gallery: gallery.to_vec(),
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
