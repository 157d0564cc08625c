//! Remote store REST API layer: transport client, wire types, and the
//! connection prober.

mod client;
mod error;
mod probe;
mod types;

pub use client::{CatalogApi, WooClient, DEFAULT_MAX_RETRIES, DEFAULT_TIMEOUT};
pub use error::ApiError;
pub use probe::{probe_connection, ProbeDetails, ProbeReport};
pub use types::{
    RemoteAttribute, RemoteCategory, RemoteCategoryRef, RemoteDimensions, RemoteImage,
    RemoteProduct, RemoteVariation,
};
