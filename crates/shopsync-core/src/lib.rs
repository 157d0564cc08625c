//! shopsync-core - Core library for Shopsync
//!
//! This crate contains the remote API client, the local mirror database
//! layer, and the catalog reconciler used by all Shopsync interfaces.

pub mod api;
pub mod credentials;
pub mod db;
pub mod error;
pub mod mapper;
pub mod media;
pub mod models;
pub mod sync;

pub use error::{Error, Result};
pub use models::{Shop, SyncReport};
