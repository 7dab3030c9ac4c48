//! # Seed Data Loader
//!
//! Loads the demo catalog: four variants across two products, and the
//! `WELCOME10` / `SAVE20` coupons.
//!
//! ## Usage
//! ```bash
//! cargo run -p storefront-db --bin seed
//!
//! # Specify database path
//! cargo run -p storefront-db --bin seed -- --db ./data/storefront.db
//! ```
//!
//! ## Demo Catalog
//! ```text
//! ┌──────────────────────┬──────────────────────────────────────┬─────────┬───────┐
//! │ SKU                  │ Name                                 │ Price   │ Stock │
//! ├──────────────────────┼──────────────────────────────────────┼─────────┼───────┤
//! │ IPHONE15PRO-128-NT   │ iPhone 15 Pro - 128GB - Nat. Titan.  │  999.99 │    50 │
//! │ IPHONE15PRO-256-NT   │ iPhone 15 Pro - 256GB - Nat. Titan.  │ 1199.99 │    30 │
//! │ TSHIRT001-M-BLUE     │ Cotton T-Shirt - Size M - Blue       │   29.99 │   100 │
//! │ TSHIRT001-L-BLUE     │ Cotton T-Shirt - Size L - Blue       │   29.99 │    75 │
//! └──────────────────────┴──────────────────────────────────────┴─────────┴───────┘
//!
//! WELCOME10  10% off, min $50.00, 1000 uses
//! SAVE20     $20.00 off, min $100.00, 500 uses
//! ```

use chrono::{Duration, Utc};
use std::env;
use storefront_core::{Coupon, CouponKind, Money, Variant};
use storefront_db::{Database, DbConfig};
use uuid::Uuid;

/// (product, sku, name, price, stock)
const VARIANTS: &[(&str, &str, &str, Money, i64)] = &[
    (
        "IPHONE15PRO",
        "IPHONE15PRO-128-NT",
        "iPhone 15 Pro - 128GB - Natural Titanium",
        Money::from_major_minor(999, 99),
        50,
    ),
    (
        "IPHONE15PRO",
        "IPHONE15PRO-256-NT",
        "iPhone 15 Pro - 256GB - Natural Titanium",
        Money::from_major_minor(1199, 99),
        30,
    ),
    (
        "TSHIRT001",
        "TSHIRT001-M-BLUE",
        "Cotton T-Shirt - Size M - Blue",
        Money::from_major_minor(29, 99),
        100,
    ),
    (
        "TSHIRT001",
        "TSHIRT001-L-BLUE",
        "Cotton T-Shirt - Size L - Blue",
        Money::from_major_minor(29, 99),
        75,
    ),
];

/// (code, kind, value, min amount, max uses)
const COUPONS: &[(&str, CouponKind, i64, Money, i64)] = &[
    (
        "WELCOME10",
        CouponKind::Percentage,
        1_000,
        Money::from_major_minor(50, 0),
        1_000,
    ),
    (
        "SAVE20",
        CouponKind::FixedAmount,
        2_000,
        Money::from_major_minor(100, 0),
        500,
    ),
];

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args: Vec<String> = env::args().collect();

    let mut db_path = String::from("./storefront.db");

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--db" | "-d" => {
                if i + 1 < args.len() {
                    db_path = args[i + 1].clone();
                    i += 1;
                }
            }
            "--help" | "-h" => {
                println!("Storefront Seed Data Loader");
                println!();
                println!("Usage: seed [OPTIONS]");
                println!();
                println!("Options:");
                println!("  -d, --db <PATH>    Database file path (default: ./storefront.db)");
                println!("  -h, --help         Show this help message");
                return Ok(());
            }
            _ => {}
        }
        i += 1;
    }

    println!("🌱 Storefront Seed Data Loader");
    println!("==============================");
    println!("Database: {}", db_path);
    println!();

    let db = Database::new(DbConfig::new(&db_path)).await?;

    println!("✓ Connected to database");
    println!("✓ Migrations applied");

    let existing = db.variants().count().await?;
    if existing > 0 {
        println!("⚠ Database already has {} variants", existing);
        println!("  Skipping seed to avoid duplicates.");
        println!("  Delete the database file to regenerate.");
        return Ok(());
    }

    let now = Utc::now();
    let product_ids: Vec<(&str, String)> = ["IPHONE15PRO", "TSHIRT001"]
        .iter()
        .map(|p| (*p, Uuid::new_v4().to_string()))
        .collect();

    for (product, sku, name, price, stock) in VARIANTS {
        let product_id = product_ids
            .iter()
            .find(|(p, _)| p == product)
            .map(|(_, id)| id.clone())
            .unwrap_or_else(|| Uuid::new_v4().to_string());

        let variant = Variant {
            id: Uuid::new_v4().to_string(),
            product_id,
            sku: sku.to_string(),
            name: name.to_string(),
            price_cents: price.cents(),
            available_qty: *stock,
            created_at: now,
            updated_at: now,
        };

        db.variants().insert(&variant).await?;
        println!("  + {:<20} {:>10}  stock {}", variant.sku, price, stock);
    }

    for (code, kind, value, min_amount, max_uses) in COUPONS {
        let coupon = Coupon {
            id: Uuid::new_v4().to_string(),
            code: code.to_string(),
            kind: *kind,
            value: *value,
            min_amount_cents: Some(min_amount.cents()),
            max_uses: Some(*max_uses),
            used_count: 0,
            expires_at: Some(now + Duration::days(365)),
            is_active: true,
            created_at: now,
            updated_at: now,
        };

        db.coupons().insert(&coupon).await?;
        println!("  + coupon {:<10} ({})", coupon.code, kind.as_str());
    }

    println!();
    println!("✓ Seed complete!");

    Ok(())
}
