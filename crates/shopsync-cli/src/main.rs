//! Shopsync CLI - Command-line interface for mirroring shop catalogs
//!
//! Register shops, probe their REST API connections, and run catalog syncs
//! against a local SQLite mirror.

use std::env;
use std::io;
use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand};
use serde::Serialize;
use shopsync_core::api::{probe_connection, ProbeReport, WooClient};
use shopsync_core::credentials::{Base64Cipher, CredentialCipher};
use shopsync_core::db::{
    CatalogRepository, Database, ShopRepository, SqliteCatalogRepository, SqliteShopRepository,
};
use shopsync_core::media::PassthroughImageGateway;
use shopsync_core::models::NewShop;
use shopsync_core::sync::SyncService;
use shopsync_core::Shop;
use thiserror::Error;

#[derive(Parser)]
#[command(name = "shopsync")]
#[command(about = "Mirror WooCommerce shop catalogs into a local database")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Optional path to local database file
    #[arg(long, value_name = "PATH", global = true)]
    db_path: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Manage registered shops
    Shop {
        #[command(subcommand)]
        command: ShopCommands,
    },
    /// Probe a shop's REST API connection
    Probe {
        /// Shop id
        id: i64,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Run a full catalog sync for a shop
    Sync {
        /// Shop id
        id: i64,
        /// Attribute media registrations to this user
        #[arg(long)]
        user: Option<String>,
        /// Output the final report as JSON
        #[arg(long)]
        json: bool,
    },
    /// Show mirror statistics for a shop
    Status {
        /// Shop id
        id: i64,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}

#[derive(Subcommand)]
enum ShopCommands {
    /// Register a new shop
    Add {
        /// Display name
        name: String,
        /// Store base URL (including scheme)
        url: String,
        /// REST API consumer key
        #[arg(long)]
        key: String,
        /// REST API consumer secret
        #[arg(long)]
        secret: String,
    },
    /// List registered shops
    List {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Remove a shop and its mirrored catalog
    Remove {
        /// Shop id
        id: i64,
    },
}

#[derive(Debug, Error)]
enum CliError {
    #[error(transparent)]
    Core(#[from] shopsync_core::Error),
    #[error(transparent)]
    Io(#[from] io::Error),
    #[error(transparent)]
    Serialization(#[from] serde_json::Error),
    #[error("Shop name cannot be empty")]
    EmptyShopName,
    #[error("Shop not found: {0}")]
    ShopNotFound(i64),
    #[error("Sync completed with {0} errors")]
    SyncFailed(usize),
}

#[tokio::main]
async fn main() {
    if let Err(error) = run().await {
        eprintln!("Error: {error}");
        std::process::exit(1);
    }
}

async fn run() -> Result<(), CliError> {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("shopsync=info".parse().unwrap()),
        )
        .init();

    let cli = Cli::parse();
    let db_path = resolve_db_path(cli.db_path);

    match cli.command {
        Commands::Shop { command } => match command {
            ShopCommands::Add {
                name,
                url,
                key,
                secret,
            } => run_shop_add(&name, &url, &key, &secret, &db_path)?,
            ShopCommands::List { json } => run_shop_list(json, &db_path)?,
            ShopCommands::Remove { id } => run_shop_remove(id, &db_path)?,
        },
        Commands::Probe { id, json } => run_probe(id, json, &db_path).await?,
        Commands::Sync { id, user, json } => run_sync(id, user, json, &db_path).await?,
        Commands::Status { id, json } => run_status(id, json, &db_path)?,
    }

    Ok(())
}

fn run_shop_add(
    name: &str,
    url: &str,
    key: &str,
    secret: &str,
    db_path: &Path,
) -> Result<(), CliError> {
    let name = normalize_shop_name(name).ok_or(CliError::EmptyShopName)?;

    // Validates the URL and credential shape before anything is stored.
    let client = WooClient::new(url, key, secret).map_err(shopsync_core::Error::from)?;
    let base_url = client.base_url().to_string();

    let cipher = Base64Cipher;
    let record = NewShop {
        name,
        base_url,
        consumer_key: cipher.encrypt(key)?,
        consumer_secret: cipher.encrypt(secret)?,
    };

    let db = open_database(db_path)?;
    let shop = SqliteShopRepository::new(db.connection()).create(&record)?;
    println!("Registered shop {} ({})", shop.id, shop.name);
    Ok(())
}

#[derive(Debug, Serialize)]
struct ShopListItem {
    id: i64,
    name: String,
    base_url: String,
    active: bool,
    created_at: i64,
}

fn shop_to_list_item(shop: &Shop) -> ShopListItem {
    ShopListItem {
        id: shop.id,
        name: shop.name.clone(),
        base_url: shop.base_url.clone(),
        active: shop.active,
        created_at: shop.created_at,
    }
}

fn run_shop_list(as_json: bool, db_path: &Path) -> Result<(), CliError> {
    let db = open_database(db_path)?;
    let shops = SqliteShopRepository::new(db.connection()).list()?;

    if as_json {
        let items = shops.iter().map(shop_to_list_item).collect::<Vec<_>>();
        println!("{}", serde_json::to_string_pretty(&items)?);
    } else if shops.is_empty() {
        println!("No shops registered");
    } else {
        for shop in &shops {
            let state = if shop.active { "active" } else { "inactive" };
            println!("{:>4}  {}  {}  [{state}]", shop.id, shop.name, shop.base_url);
        }
    }

    Ok(())
}

fn run_shop_remove(id: i64, db_path: &Path) -> Result<(), CliError> {
    let db = open_database(db_path)?;
    SqliteShopRepository::new(db.connection()).delete(id)?;
    println!("Removed shop {id}");
    Ok(())
}

async fn run_probe(id: i64, as_json: bool, db_path: &Path) -> Result<(), CliError> {
    let db = open_database(db_path)?;
    let shop = SqliteShopRepository::new(db.connection())
        .get(id)?
        .ok_or(CliError::ShopNotFound(id))?;

    let cipher = Base64Cipher;
    let key = cipher.decrypt(&shop.consumer_key)?;
    let secret = cipher.decrypt(&shop.consumer_secret)?;
    let client =
        WooClient::new(&shop.base_url, &key, &secret).map_err(shopsync_core::Error::from)?;

    let report = probe_connection(&client).await;

    if as_json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        print_probe_report(&shop, &report);
    }

    Ok(())
}

fn print_probe_report(shop: &Shop, report: &ProbeReport) {
    let verdict = |ok: bool| if ok { "ok" } else { "failed" };
    println!("Probing {} ({})", shop.name, shop.base_url);
    println!("  reachable:    {}", verdict(report.reachable));
    println!("  credentials:  {}", verdict(report.auth));
    println!("  product read: {}", verdict(report.details.products_ok));
    if let Some(status) = report.details.http_status {
        println!("  http status:  {status}");
    }
    println!("  elapsed:      {}ms", report.details.elapsed_ms);
    if let Some(error) = &report.details.error {
        println!("  error:        {error}");
    }
}

async fn run_sync(
    id: i64,
    user: Option<String>,
    as_json: bool,
    db_path: &Path,
) -> Result<(), CliError> {
    let db = open_database(db_path)?;
    let shop = SqliteShopRepository::new(db.connection())
        .get(id)?
        .ok_or(CliError::ShopNotFound(id))?;

    let mut service = SyncService::for_shop(
        &shop,
        &Base64Cipher,
        SqliteCatalogRepository::new(db.connection()),
        PassthroughImageGateway,
    )?;
    if let Some(user) = user {
        service = service.with_user(user);
    }
    service.set_progress_callback(Box::new(|progress| {
        eprintln!(
            "[{}] {}/{} {}",
            progress.stage, progress.current, progress.total, progress.message
        );
    }));

    let report = service.sync_all().await;
    if as_json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        println!("{}", report.message);
        for error in &report.details.errors {
            eprintln!("  - {error}");
        }
    }

    if report.success {
        Ok(())
    } else {
        Err(CliError::SyncFailed(report.details.errors.len()))
    }
}

#[derive(Debug, Serialize)]
struct StatusReport {
    shop_id: i64,
    name: String,
    categories: i64,
    products: i64,
    variations: i64,
    last_synced_at: Option<i64>,
}

fn run_status(id: i64, as_json: bool, db_path: &Path) -> Result<(), CliError> {
    let db = open_database(db_path)?;
    let shop = SqliteShopRepository::new(db.connection())
        .get(id)?
        .ok_or(CliError::ShopNotFound(id))?;
    let repo = SqliteCatalogRepository::new(db.connection());

    let status = StatusReport {
        shop_id: shop.id,
        name: shop.name.clone(),
        categories: repo.count_categories(shop.id)?,
        products: repo.count_products(shop.id)?,
        variations: repo.count_variations(shop.id)?,
        last_synced_at: repo.last_synced_at(shop.id)?,
    };

    if as_json {
        println!("{}", serde_json::to_string_pretty(&status)?);
    } else {
        println!("{} ({})", status.name, shop.base_url);
        println!("  categories: {}", status.categories);
        println!("  products:   {}", status.products);
        println!("  variations: {}", status.variations);
        println!("  last sync:  {}", format_synced_at(status.last_synced_at));
    }

    Ok(())
}

fn format_synced_at(timestamp_ms: Option<i64>) -> String {
    timestamp_ms
        .and_then(chrono::DateTime::from_timestamp_millis)
        .map_or_else(
            || "never".to_string(),
            |at| at.format("%Y-%m-%d %H:%M:%S UTC").to_string(),
        )
}

fn normalize_shop_name(name: &str) -> Option<String> {
    let trimmed = name.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}

fn resolve_db_path(cli_db_path: Option<PathBuf>) -> PathBuf {
    cli_db_path
        .or_else(|| env::var_os("SHOPSYNC_DB_PATH").map(PathBuf::from))
        .unwrap_or_else(default_db_path)
}

fn default_db_path() -> PathBuf {
    dirs::data_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("shopsync")
        .join("shopsync.db")
}

fn open_database(path: &Path) -> Result<Database, CliError> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    Ok(Database::open(path)?)
}
