//! # Seed Data Generator
//!
//! Populates a database with a development catalog.
//!
//! ## Usage
//! ```bash
//! # Generate 200 products (default), database from tally.toml / TALLY_DB_PATH
//! cargo run -p tally-db --bin seed
//!
//! # Generate custom amount
//! cargo run -p tally-db --bin seed -- --count 50
//!
//! # Specify database path
//! cargo run -p tally-db --bin seed -- --db ./data/tally.db
//! ```
//!
//! ## Generated Catalog
//! ```text
//! categories       Beverages, Snacks, Dairy, Grocery
//! sub_categories   two per category
//! products         <name> <size>, SKU generated (PRD00001...),
//!                  price 1.99 - 9.99 + size addon, opening stock 0 - 100
//! ```
//!
//! Stock is only set as opening stock. Every later change has to go through
//! a posted transaction.

use std::env;
use std::path::PathBuf;
use std::time::Instant;

use tally_core::NewProduct;
use tally_db::{Database, DbError, ErrorKind, TallyConfig};
use tracing::{debug, error, info, warn};
use tracing_subscriber::EnvFilter;

const DEFAULT_COUNT: usize = 200;

/// Category → sub-category → product names.
const CATALOG: &[(&str, &[(&str, &[&str])])] = &[
    (
        "Beverages",
        &[
            (
                "Soft Drinks",
                &["Cola", "Lemon Soda", "Orange Fizz", "Ginger Ale", "Tonic Water"],
            ),
            (
                "Juices",
                &["Mango Juice", "Apple Juice", "Orange Juice", "Guava Nectar", "Lemonade"],
            ),
        ],
    ),
    (
        "Snacks",
        &[
            (
                "Chips",
                &["Salted Chips", "Masala Chips", "Tortilla Chips", "Nimko Mix", "Popcorn"],
            ),
            (
                "Biscuits",
                &["Butter Cookies", "Cream Crackers", "Digestive", "Chocolate Chip", "Rusk"],
            ),
        ],
    ),
    (
        "Dairy",
        &[
            ("Milk", &["Full Cream Milk", "Skim Milk", "Flavoured Milk", "Lassi"]),
            ("Cheese", &["Cheddar", "Mozzarella", "Cream Cheese", "Processed Slices"]),
        ],
    ),
    (
        "Grocery",
        &[
            ("Rice", &["Basmati Rice", "Sella Rice", "Broken Rice", "Brown Rice"]),
            ("Pulses", &["Red Lentils", "Chickpeas", "Mung Beans", "Black Gram"]),
        ],
    ),
];

/// Size variants and their price addon in cents.
const SIZES: &[(&str, &str, i64)] = &[
    ("Small", "pcs", 0),
    ("Medium", "pcs", 100),
    ("Large", "pcs", 200),
    ("1kg", "kg", 150),
    ("5kg", "bag", 600),
    ("500ml", "bottle", 50),
    ("1.5L", "bottle", 150),
    ("6-Pack", "pack", 300),
];

struct Args {
    count: usize,
    db_path: Option<PathBuf>,
    config_path: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let Some(args) = parse_args() else {
        return Ok(());
    };

    init_tracing();

    let mut config = TallyConfig::load(args.config_path)?;
    if let Some(path) = args.db_path {
        config.database.path = path;
    }

    info!(
        database = %config.database.path.display(),
        count = args.count,
        "Tally seed data generator"
    );

    let db = Database::new(config.db_config()).await?;

    let existing = db.products().count().await?;
    if existing > 0 {
        warn!(
            existing,
            "Database already has products, skipping seed to avoid duplicates"
        );
        return Ok(());
    }

    seed_categories(&db).await?;

    let start = Instant::now();
    let generated = seed_products(&db, args.count).await;
    let elapsed = start.elapsed();

    info!(
        generated,
        elapsed_ms = elapsed.as_millis() as u64,
        rate_per_sec = generated as f64 / elapsed.as_secs_f64().max(f64::EPSILON),
        "Products generated"
    );

    let low = db.products().low_stock(5).await?;
    info!(low_stock = low.len(), "Seed complete");

    db.close().await;
    Ok(())
}

/// Parses `--count`, `--db` and `--config`. Returns `None` after printing help.
fn parse_args() -> Option<Args> {
    let argv: Vec<String> = env::args().collect();

    let mut args = Args {
        count: DEFAULT_COUNT,
        db_path: None,
        config_path: None,
    };

    let mut i = 1;
    while i < argv.len() {
        match argv[i].as_str() {
            "--count" | "-c" => {
                if i + 1 < argv.len() {
                    args.count = argv[i + 1].parse().unwrap_or(DEFAULT_COUNT);
                    i += 1;
                }
            }
            "--db" | "-d" => {
                if i + 1 < argv.len() {
                    args.db_path = Some(PathBuf::from(&argv[i + 1]));
                    i += 1;
                }
            }
            "--config" => {
                if i + 1 < argv.len() {
                    args.config_path = Some(PathBuf::from(&argv[i + 1]));
                    i += 1;
                }
            }
            "--help" | "-h" => {
                println!("Tally Seed Data Generator");
                println!();
                println!("Usage: seed [OPTIONS]");
                println!();
                println!("Options:");
                println!(
                    "  -c, --count <N>      Number of products to generate (default: {DEFAULT_COUNT})"
                );
                println!("  -d, --db <PATH>      Database file path (overrides tally.toml)");
                println!("      --config <PATH>  Config file path");
                println!("  -h, --help           Show this help message");
                println!();
                println!("Logging is controlled by RUST_LOG (default: info,tally=debug,sqlx=warn)");
                return None;
            }
            _ => {}
        }
        i += 1;
    }

    Some(args)
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,tally=debug,sqlx=warn"));

    tracing_subscriber::fmt().with_env_filter(filter).init();
}

/// Creates the lookup tables. Labels left over from an earlier run are kept.
async fn seed_categories(db: &Database) -> Result<(), DbError> {
    let categories = db.categories();

    for (category, sub_categories) in CATALOG {
        skip_conflict(categories.create_category(category).await)?;
        for (sub_category, _) in sub_categories.iter() {
            skip_conflict(categories.create_sub_category(category, sub_category).await)?;
        }
    }

    info!(categories = CATALOG.len(), "Categories created");
    Ok(())
}

fn skip_conflict<T>(result: Result<T, DbError>) -> Result<(), DbError> {
    match result {
        Ok(_) => Ok(()),
        Err(e) if e.kind() == ErrorKind::Conflict => {
            debug!(error = %e, "Label already present");
            Ok(())
        }
        Err(e) => Err(e),
    }
}

/// Creates up to `count` products. Individual failures are logged and skipped.
async fn seed_products(db: &Database, count: usize) -> usize {
    let products = db.products();
    let mut generated = 0;
    let mut seed = 0usize;

    'outer: for (category, sub_categories) in CATALOG {
        for (sub_category, names) in sub_categories.iter() {
            for name in names.iter() {
                for (size, unit, price_addon) in SIZES {
                    if generated >= count {
                        break 'outer;
                    }

                    let product = generate_product(
                        category,
                        sub_category,
                        name,
                        size,
                        unit,
                        *price_addon,
                        seed,
                    );
                    seed += 1;

                    match products.create(product).await {
                        Ok(_) => generated += 1,
                        Err(e) => {
                            error!(
                                name = %name,
                                size = %size,
                                error = %e,
                                "Failed to create product"
                            );
                            continue;
                        }
                    }

                    if generated % 100 == 0 {
                        info!(generated, "Generating products...");
                    }
                }
            }
        }
    }

    generated
}

/// Builds one product with deterministic pseudo-random values.
fn generate_product(
    category: &str,
    sub_category: &str,
    name: &str,
    size: &str,
    unit: &str,
    price_addon: i64,
    seed: usize,
) -> NewProduct {
    // EAN-13 shaped, checksum not valid
    let barcode = Some(format!("590{:010}", seed));

    // 1.99 - 9.99 plus the size addon
    let price_cents = 199 + ((seed * 17) % 800) as i64 + price_addon;

    NewProduct {
        sku: None,
        barcode,
        name: format!("{name} {size}"),
        secondary_name: None,
        // Filled from the sub-category
        category: String::new(),
        sub_category: sub_category.to_string(),
        brand: format!("{category} Co"),
        unit: unit.to_string(),
        supplier: "Seed Wholesale".to_string(),
        stock: (seed % 101) as i64,
        price_cents,
        ..NewProduct::default()
    }
}
