//! # Seed Data Generator
//!
//! Populates the database with test products for development.
//!
//! ## Usage
//! ```bash
//! # Generate 200 products (default)
//! cargo run -p orderflow-db --bin seed
//!
//! # Generate custom amount
//! cargo run -p orderflow-db --bin seed -- --count 1000
//!
//! # Specify database path
//! cargo run -p orderflow-db --bin seed -- --db ./data/orderflow.db
//! ```
//!
//! ## Generated Products
//! Each product has:
//! - Realistic name drawn from a category list
//! - Price: $0.99 - $49.99
//! - Discount: 0%, 10%, 20% or 25%
//! - Stock: 0 - 100

use chrono::Utc;
use std::env;
use tracing::info;
use uuid::Uuid;

use orderflow_core::Product;
use orderflow_db::{Database, DbConfig};

/// Product name stems for realistic test data
const NAMES: &[&str] = &[
    "Wireless Mouse",
    "Mechanical Keyboard",
    "USB-C Hub",
    "Laptop Stand",
    "Noise-Cancelling Headphones",
    "Webcam",
    "Desk Lamp",
    "Monitor Arm",
    "External SSD",
    "Phone Charger",
    "Bluetooth Speaker",
    "Fitness Tracker",
    "Travel Mug",
    "Backpack",
    "Notebook",
    "Water Bottle",
    "Desk Mat",
    "Cable Organizer",
    "Power Bank",
    "Smart Bulb",
];

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let args: Vec<String> = env::args().collect();
    let count = arg_value(&args, "--count")
        .and_then(|v| v.parse::<usize>().ok())
        .unwrap_or(200);
    let db_path = arg_value(&args, "--db").unwrap_or_else(|| "./orderflow.db".to_string());

    info!(count, db_path = %db_path, "Seeding products");

    let db = match Database::new(DbConfig::new(&db_path)).await {
        Ok(db) => db,
        Err(e) => {
            eprintln!("Failed to open database {db_path}: {e}");
            std::process::exit(1);
        }
    };

    let now = Utc::now();
    let mut inserted = 0usize;

    for i in 0..count {
        let name = NAMES[i % NAMES.len()];
        // Deterministic pseudo-variety without pulling in a rand dependency
        let price_cents = 99 + ((i as i64 * 1037) % 4900);
        let discount_bps = match i % 4 {
            0 => 0,
            1 => 1000,
            2 => 2000,
            _ => 2500,
        };
        let stock = (i as i64 * 13) % 101;

        let product = Product {
            id: Uuid::new_v4().to_string(),
            name: format!("{name} #{}", i + 1),
            description: format!("Seeded test product: {name}"),
            price_cents,
            discount_bps,
            stock,
            created_at: now,
            updated_at: now,
        };

        if let Err(e) = db.products().insert(&product).await {
            eprintln!("Failed to insert product {}: {e}", product.name);
            std::process::exit(1);
        }
        inserted += 1;
    }

    info!(inserted, "Seed complete");
}

/// Returns the value following a `--flag` argument, if present.
fn arg_value(args: &[String], flag: &str) -> Option<String> {
    args.iter()
        .position(|a| a == flag)
        .and_then(|i| args.get(i + 1))
        .cloned()
}
