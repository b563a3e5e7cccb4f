//! # Seed Data Generator
//!
//! Writes the demo catalog and four sample bills into a database file.
//!
//! ## Usage
//! ```bash
//! # Seed ./pharmacy_dev.db (default)
//! cargo run -p pharma-db --bin seed
//!
//! # Specify database path
//! cargo run -p pharma-db --bin seed -- --db ./data/pharmacy.db
//!
//! # Replace whatever is there
//! cargo run -p pharma-db --bin seed -- --force
//! ```

use chrono::Utc;
use std::env;

use pharma_core::seed::{demo_bills, demo_medicines};
use pharma_core::Settings;
use pharma_db::{Database, DbConfig};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args: Vec<String> = env::args().collect();

    let mut db_path = String::from("./pharmacy_dev.db");
    let mut force = false;

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--db" | "-d" => {
                if i + 1 < args.len() {
                    db_path = args[i + 1].clone();
                    i += 1;
                }
            }
            "--force" | "-f" => force = true,
            "--help" | "-h" => {
                println!("Pharmacy POS Seed Data Generator");
                println!();
                println!("Usage: seed [OPTIONS]");
                println!();
                println!("Options:");
                println!("  -d, --db <PATH>    Database file path (default: ./pharmacy_dev.db)");
                println!("  -f, --force        Overwrite existing medicines and bills");
                println!("  -h, --help         Show this help message");
                return Ok(());
            }
            _ => {}
        }
        i += 1;
    }

    println!("Pharmacy POS Seed Data Generator");
    println!("================================");
    println!("Database: {}", db_path);
    println!();

    let db = Database::new(DbConfig::new(&db_path)).await?;
    let cache = db.cache();

    println!("✓ Connected to database");
    println!("✓ Migrations applied");

    let existing = cache.medicines().await.len();
    if existing > 0 && !force {
        println!("⚠ Database already has {} medicines", existing);
        println!("  Skipping seed to avoid duplicates.");
        println!("  Pass --force to overwrite.");
        return Ok(());
    }

    let now = Utc::now();
    let medicines = demo_medicines(now);
    let bills = demo_bills(&medicines, now);

    cache.set_medicines(&medicines).await?;
    cache.set_bills(&bills).await?;
    if cache.read_raw(pharma_db::keys::SETTINGS).await?.is_none() {
        cache.set_settings(&Settings::default()).await?;
    }

    println!();
    println!("✓ Wrote {} medicines", medicines.len());
    println!("✓ Wrote {} bills", bills.len());

    db.close().await;
    Ok(())
}
