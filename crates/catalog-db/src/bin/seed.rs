//! # Seed Data Generator
//!
//! Populates a catalog database with demo users, categories and products.
//!
//! ## Usage
//! ```bash
//! # Generate 50 products (default) into ./catalog.db
//! cargo run -p catalog-db --bin seed
//!
//! # Generate custom amount
//! cargo run -p catalog-db --bin seed -- --count 200
//!
//! # Specify database path or a config file
//! cargo run -p catalog-db --bin seed -- --db ./data/catalog.db
//! cargo run -p catalog-db --bin seed -- --config ./catalog.toml
//! ```
//!
//! Every product goes through `ProductRepository::create`, so categories are
//! created on first use and shared by every later product naming them.

use std::env;
use std::path::PathBuf;

use catalog_core::{NewProduct, NewUser, User};
use catalog_db::{CatalogConfig, Database, DbResult};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

/// Demo owners: (username, bio)
const OWNERS: &[(&str, &str)] = &[
    ("ada", "Ceramics and kitchenware"),
    ("grace", "Tea importer"),
    ("linus", "Secondhand books"),
];

/// Product families: (categories, base titles)
const FAMILIES: &[(&[&str], &[&str])] = &[
    (
        &["kitchen", "mugs"],
        &[
            "Stoneware Mug",
            "Enamel Camp Mug",
            "Double Wall Glass Mug",
            "Speckled Espresso Cup",
        ],
    ),
    (
        &["kitchen", "tea"],
        &[
            "Cast Iron Teapot",
            "Glass Infuser Teapot",
            "Bamboo Tea Scoop",
            "Matcha Whisk",
        ],
    ),
    (
        &["tea"],
        &[
            "Sencha Green Tea",
            "Assam Breakfast Tea",
            "Rooibos Vanilla",
            "Jasmine Pearls",
        ],
    ),
    (
        &["books"],
        &[
            "Field Guide to Ferns",
            "Pocket Atlas",
            "Letterpress Notebook",
        ],
    ),
    (
        &["books", "gifts"],
        &["Illustrated Cookbook", "Tea Ceremony Handbook"],
    ),
];

/// Size or edition suffixes, cycled to keep titles unique.
const VARIANTS: &[&str] = &["Small", "Large", "Gift Set", "Limited Edition", "Travel"];

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    init_tracing();

    let args: Vec<String> = env::args().collect();

    let mut count: usize = 50;
    let mut db_path: Option<PathBuf> = None;
    let mut config_path: Option<PathBuf> = None;

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--count" | "-c" => {
                if i + 1 < args.len() {
                    count = args[i + 1].parse().unwrap_or(50);
                    i += 1;
                }
            }
            "--db" | "-d" => {
                if i + 1 < args.len() {
                    db_path = Some(PathBuf::from(&args[i + 1]));
                    i += 1;
                }
            }
            "--config" => {
                if i + 1 < args.len() {
                    config_path = Some(PathBuf::from(&args[i + 1]));
                    i += 1;
                }
            }
            "--help" | "-h" => {
                println!("Catalog Seed Data Generator");
                println!();
                println!("Usage: seed [OPTIONS]");
                println!();
                println!("Options:");
                println!("  -c, --count <N>      Number of products to generate (default: 50)");
                println!("  -d, --db <PATH>      Database file path (overrides config)");
                println!("      --config <PATH>  Config file (default: platform config dir)");
                println!("  -h, --help           Show this help message");
                return Ok(());
            }
            other => warn!(arg = %other, "Ignoring unknown argument"),
        }
        i += 1;
    }

    let mut config = CatalogConfig::load(config_path)?;
    if let Some(path) = db_path {
        config.database.path = path;
    }

    println!("Catalog Seed Data Generator");
    println!("===========================");
    println!("Database: {}", config.database.path.display());
    println!("Products: {}", count);
    println!();

    let db = Database::new(config.db_config()).await?;
    println!("✓ Connected to database");
    println!("✓ Migrations applied");

    let existing = db.products().list(0, 1).await?.total_count;
    if existing > 0 {
        println!("⚠ Database already has {} products", existing);
        println!("  Skipping seed to avoid duplicates.");
        println!("  Delete the database file to regenerate.");
        return Ok(());
    }

    let owners = seed_owners(&db).await?;
    println!("✓ {} owners ready", owners.len());

    println!();
    println!("Generating products...");

    let start = std::time::Instant::now();
    let mut generated = 0;

    for (n, (categories, title)) in titles().take(count).enumerate() {
        let owner = &owners[n % owners.len()];
        let product = NewProduct::new(owner.id, &title)
            .description(format!("{} from {}'s shelf", title, owner.username));

        match db.products().create(&product, categories).await {
            Ok(_) => generated += 1,
            Err(e) => eprintln!("Failed to insert {}: {}", product.slug, e),
        }

        if generated > 0 && generated % 25 == 0 {
            info!(generated, "Seeding progress");
        }
    }

    let elapsed = start.elapsed();
    println!();
    println!("✓ Generated {} products in {:?}", generated, elapsed);

    println!();
    let categories = db.categories().list(0, 100).await?;
    for category in &categories.items {
        let page = db.products().list_by_category(&category.name, 0, 1).await?;
        println!("  {:<10} {} products", category.name, page.total_count);
    }

    println!();
    println!("✓ Seed complete!");

    db.close().await;
    Ok(())
}

/// Creates the demo owners, reusing any that already exist.
async fn seed_owners(db: &Database) -> DbResult<Vec<User>> {
    let mut owners = Vec::with_capacity(OWNERS.len());

    for (username, bio) in OWNERS {
        let user = match db.users().get_by_username(username).await? {
            Some(user) => user,
            None => {
                let mut user = db
                    .users()
                    .create(&NewUser::new(
                        *username,
                        format!("{}@example.com", username),
                        "seed-password-hash",
                    ))
                    .await?;
                user.bio = Some(bio.to_string());
                db.users().update(&user).await?
            }
        };
        owners.push(user);
    }

    Ok(owners)
}

/// Endless sequence of unique titles with their category names.
///
/// Walks every family and base title, then repeats with the next variant
/// suffix, then with a numbered batch suffix.
fn titles() -> impl Iterator<Item = (&'static [&'static str], String)> {
    let bases: Vec<(&'static [&'static str], &'static str)> = FAMILIES
        .iter()
        .flat_map(|(categories, names)| names.iter().map(move |name| (*categories, *name)))
        .collect();

    (0usize..).flat_map(move |round| {
        let variant = VARIANTS[round % VARIANTS.len()];
        let batch = round / VARIANTS.len();

        bases
            .clone()
            .into_iter()
            .map(move |(categories, name)| {
                let title = if batch == 0 {
                    format!("{} {}", name, variant)
                } else {
                    format!("{} {} No. {}", name, variant, batch + 1)
                };
                (categories, title)
            })
    })
}

/// Logs to stderr; `RUST_LOG` overrides the default filter.
fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,catalog_db=info,sqlx=warn"));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}
