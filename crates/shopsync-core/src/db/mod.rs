//! Local mirror database layer

mod catalog;
mod connection;
mod migrations;
mod shops;

pub use catalog::{CatalogRepository, SqliteCatalogRepository};
pub use connection::Database;
pub use shops::{ShopRepository, SqliteShopRepository};
