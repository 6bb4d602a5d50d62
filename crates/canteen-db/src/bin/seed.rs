//! # Seed Data Generator
//!
//! Populates a database with one outlet's worth of development data.
//!
//! ## Usage
//! ```bash
//! # Seed ./canteen_dev.db (default)
//! cargo run -p canteen-db --bin seed
//!
//! # Specify database path
//! cargo run -p canteen-db --bin seed -- ./data/canteen.db
//! cargo run -p canteen-db --bin seed -- --db ./data/canteen.db
//! ```
//!
//! ## Generated Data
//! - One active outlet
//! - A staff member assigned to it and a superadmin
//! - A customer with a ₹500 wallet
//! - A menu mixing company-paid meals and regular items, each stocked
//! - Two coupons: `WELCOME10` (10 %) and `FLAT50` (₹50 off ₹200+)

use std::env;

use anyhow::Context;
use chrono::{Duration, Utc};
use tracing::info;

use canteen_core::coupon::CouponReward;
use canteen_core::{Category, Money, Role};
use canteen_db::repository::coupon::NewCoupon;
use canteen_db::repository::product::NewProduct;
use canteen_db::repository::{
    CouponRepository, InventoryRepository, OutletRepository, ProductRepository, UserRepository, WalletRepository,
};
use canteen_db::{Database, DbConfig};

/// (name, price in paise, category, veg, company paid, opening stock)
const MENU: &[(&str, i64, Category, bool, bool, i64)] = &[
    ("Veg Thali", 6000, Category::Meals, true, true, 120),
    ("Chicken Biryani", 12000, Category::Meals, false, true, 80),
    ("Curd Rice", 4000, Category::Meals, true, true, 60),
    ("Paneer Tikka", 9000, Category::Starters, true, false, 40),
    ("Veg Spring Roll", 6000, Category::Starters, true, false, 40),
    ("Gulab Jamun", 3000, Category::Desserts, true, false, 50),
    ("Masala Chai", 1500, Category::Beverages, true, false, 200),
    ("Fresh Lime Soda", 3000, Category::Beverages, true, false, 100),
    ("Friday Special Pulao", 10000, Category::SpecialFoods, true, false, 30),
];

const DEFAULT_DB_PATH: &str = "./canteen_dev.db";

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let args: Vec<String> = env::args().collect();
    let mut db_path = String::from(DEFAULT_DB_PATH);

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
                println!("Canteen Seed Data Generator");
                println!();
                println!("Usage: seed [DB_PATH] [OPTIONS]");
                println!();
                println!("Options:");
                println!("  -d, --db <PATH>    Database file path (default: {DEFAULT_DB_PATH})");
                println!("  -h, --help         Show this help message");
                return Ok(());
            }
            path if !path.starts_with('-') => db_path = path.to_string(),
            _ => {}
        }
        i += 1;
    }

    println!("Canteen Seed Data Generator");
    println!("===========================");
    println!("Database: {db_path}");
    println!();

    let db = Database::new(DbConfig::new(&db_path))
        .await
        .with_context(|| format!("opening {db_path}"))?;
    println!("✓ Connected to database");
    println!("✓ Migrations applied");

    let mut tx = db.begin().await?;

    let existing: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM outlets")
        .fetch_one(&mut *tx)
        .await?;
    if existing > 0 {
        println!("⚠ Database already has {existing} outlet(s)");
        println!("  Skipping seed to avoid duplicates.");
        println!("  Delete the database file to regenerate.");
        return Ok(());
    }

    // Outlet and people
    let outlet = OutletRepository::new(&mut tx)
        .insert("Main Canteen", Some("Ground floor, Block A"))
        .await
        .context("creating outlet")?;

    let mut users = UserRepository::new(&mut tx);
    let staff = users
        .insert("counter@canteen.dev", "Counter Staff", Role::Staff, Some(outlet.id))
        .await?;
    let admin = users
        .insert("admin@canteen.dev", "Super Admin", Role::Superadmin, None)
        .await?;
    let customer_user = users
        .insert("asha@canteen.dev", "Asha Verma", Role::Customer, None)
        .await?;
    let customer = users.insert_customer(customer_user.id).await?;

    let wallet = WalletRepository::new(&mut tx)
        .create(customer.id, Money::from_paise(50_000))
        .await?;

    // Menu
    for &(name, price, category, is_veg, company_paid, stock) in MENU {
        let product = ProductRepository::new(&mut tx)
            .insert(&NewProduct {
                name,
                description: None,
                price: Money::from_paise(price),
                outlet_id: outlet.id,
                category,
                is_veg,
                company_paid,
            })
            .await
            .with_context(|| format!("creating product {name}"))?;
        InventoryRepository::new(&mut tx)
            .insert(product.id, outlet.id, stock, 10)
            .await?;
        info!(product_id = product.id, name, stock, "Product seeded");
    }

    // Coupons
    let now = Utc::now();
    let mut coupons = CouponRepository::new(&mut tx);
    for (code, description, reward, min_order) in [
        (
            "WELCOME10",
            "10% off your order",
            CouponReward::Percentage { bps: 1000 },
            Money::zero(),
        ),
        (
            "FLAT50",
            "₹50 off orders of ₹200 or more",
            CouponReward::Fixed(Money::from_paise(5_000)),
            Money::from_paise(20_000),
        ),
    ] {
        coupons
            .insert(&NewCoupon {
                code,
                description: Some(description),
                reward,
                min_order_value: min_order,
                valid_from: now - Duration::days(1),
                valid_until: now + Duration::days(90),
                usage_limit: 500,
                outlet_id: None,
            })
            .await
            .with_context(|| format!("creating coupon {code}"))?;
    }

    tx.commit().await?;

    println!();
    println!("✓ Outlet:    #{} {}", outlet.id, outlet.name);
    println!("✓ Staff:     user #{} ({})", staff.id, staff.email);
    println!("✓ Admin:     user #{} ({})", admin.id, admin.email);
    println!(
        "✓ Customer:  user #{} ({}), wallet {}",
        customer_user.id,
        customer_user.email,
        wallet.balance()
    );
    println!("✓ Products:  {}", MENU.len());
    println!("✓ Coupons:   WELCOME10, FLAT50");
    println!();
    println!("✓ Seed complete!");

    db.close().await;
    Ok(())
}
