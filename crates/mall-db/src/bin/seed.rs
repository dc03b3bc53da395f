//! # Seed Data Generator
//!
//! Populates the database with a demo catalog for development.
//!
//! ## Usage
//! ```bash
//! # Seed the default database
//! cargo run -p mall-db --bin seed
//!
//! # Specify database path
//! cargo run -p mall-db --bin seed -- --db ./data/mall.db
//! ```
//!
//! ## Generated Data
//! - A small product catalog (drinks, snacks) with priced configs
//! - Regular stock for every config
//! - One open seckill round with deep discount and tight allotment
//! - Coupon templates (percentage + full-reduction) granted to `user-demo`
//! - One stored-value voucher for `user-demo`
//! - One shipping address for `user-demo`

use chrono::{Duration, Utc};
use std::env;
use uuid::Uuid;

use mall_core::{
    Address, CouponKind, Product, ProductConfig, SeckillRound, UserVoucher, VoucherStatus,
};
use mall_db::{Database, DbConfig};

const DEMO_USER: &str = "user-demo";

/// (product name, configs as (config name, price cents, shelf stock))
const CATALOG: &[(&str, &[(&str, i64, i64)])] = &[
    (
        "Jasmine Green Tea",
        &[("500ml", 450, 200), ("1L", 800, 120)],
    ),
    (
        "Cold Brew Coffee",
        &[("Regular", 1500, 80), ("Large", 1900, 60)],
    ),
    ("Sea Salt Chips", &[("Single", 600, 300), ("Family Pack", 1600, 100)]),
    ("Dark Chocolate Bar", &[("70%", 1200, 150), ("85%", 1300, 90)]),
];

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    // Parse command line arguments
    let args: Vec<String> = env::args().collect();

    let mut db_path = String::from("./mall_dev.db");

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
                println!("Mall Order Core Seed Data Generator");
                println!();
                println!("Usage: seed [OPTIONS]");
                println!();
                println!("Options:");
                println!("  -d, --db <PATH>    Database file path (default: ./mall_dev.db)");
                println!("  -h, --help         Show this help message");
                return Ok(());
            }
            _ => {}
        }
        i += 1;
    }

    println!("🌱 Mall Order Core Seed Data Generator");
    println!("======================================");
    println!("Database: {}", db_path);
    println!();

    // Connect to database
    let config = DbConfig::new(&db_path);
    let db = Database::new(config).await?;

    println!("✓ Connected to database");
    println!("✓ Migrations applied");

    let now = Utc::now();
    let mut first_config_id = None;

    // Catalog + stock
    println!();
    println!("Seeding catalog...");
    for (product_name, configs) in CATALOG {
        let product = Product {
            id: Uuid::new_v4().to_string(),
            name: product_name.to_string(),
            on_shelf: true,
            created_at: now,
            updated_at: now,
        };
        db.catalog().create_product(&product).await?;

        for (config_name, price_cents, shelf) in configs.iter() {
            let config = ProductConfig {
                id: Uuid::new_v4().to_string(),
                product_id: product.id.clone(),
                name: config_name.to_string(),
                sale_price_cents: *price_cents,
                on_shelf: true,
            };
            db.catalog().create_config(&config).await?;
            db.stock().create_stock(&config.id, *shelf).await?;

            if first_config_id.is_none() {
                first_config_id = Some(config.id.clone());
            }
        }
        println!("  {} ({} configs)", product_name, configs.len());
    }

    // Seckill round on the first config: steep price, 10 units, open now
    let round_config = first_config_id.expect("catalog is non-empty");
    let round = SeckillRound {
        id: Uuid::new_v4().to_string(),
        config_id: round_config,
        seckill_price_cents: 100,
        shelf_num: 10,
        remain_num: 10,
        lock_num: 0,
        start_time: now - Duration::minutes(5),
        end_time: now + Duration::hours(2),
    };
    db.stock().create_seckill_round(&round).await?;
    println!("✓ Seckill round {} (10 units @ 1.00)", round.id);

    // Discount instruments for the demo user
    println!();
    println!("Seeding discounts for {}...", DEMO_USER);

    let percent_id = Uuid::new_v4().to_string();
    db.coupons()
        .create_template(
            &percent_id,
            "10% off storewide",
            CouponKind::Percentage,
            0,
            9000, // pay 90%
            0,
            false,
            now - Duration::days(1),
            now + Duration::days(30),
        )
        .await?;
    db.coupons()
        .grant(&Uuid::new_v4().to_string(), DEMO_USER, &percent_id)
        .await?;

    let full_id = Uuid::new_v4().to_string();
    db.coupons()
        .create_template(
            &full_id,
            "5 off over 30",
            CouponKind::FullReduction,
            500,
            0,
            3000,
            true,
            now - Duration::days(1),
            now + Duration::days(30),
        )
        .await?;
    db.coupons()
        .grant(&Uuid::new_v4().to_string(), DEMO_USER, &full_id)
        .await?;
    println!("✓ 2 coupon templates granted");

    let voucher = UserVoucher {
        id: Uuid::new_v4().to_string(),
        user_id: DEMO_USER.to_string(),
        name: "Mall Credit 50".to_string(),
        remain_amount_cents: 5000,
        status: VoucherStatus::Active,
        valid_from: now - Duration::days(1),
        valid_until: now + Duration::days(90),
        created_at: now,
        updated_at: now,
    };
    db.vouchers().issue(&voucher).await?;
    println!("✓ Voucher {} (balance 50.00)", voucher.id);

    let address = Address {
        id: Uuid::new_v4().to_string(),
        user_id: DEMO_USER.to_string(),
        receiver_name: "Demo User".to_string(),
        receiver_phone: "13800000000".to_string(),
        province: "Hubei".to_string(),
        city: "Wuhan".to_string(),
        detail: "1 Example Road".to_string(),
        created_at: now,
    };
    db.catalog().create_address(&address).await?;
    println!("✓ Address {}", address.id);

    println!();
    println!("✓ Seed complete!");

    Ok(())
}
