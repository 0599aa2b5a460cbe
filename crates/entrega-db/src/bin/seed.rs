//! # Seed Data Generator
//!
//! Populates a database with demo zones, establishment defaults, orders and
//! an open cash register session for local development.
//!
//! ## Usage
//! ```bash
//! # Default: ./entrega_dev.db with 20 orders
//! cargo run -p entrega-db --bin seed
//!
//! # Custom amount and path
//! cargo run -p entrega-db --bin seed -- --orders 100 --db ./data/entrega.db
//! ```

use std::env;

use entrega_core::cash::NewCashTransaction;
use entrega_core::delivery::{calculate_fee, DeliveryFeeRule};
use entrega_core::money::Money;
use entrega_core::order::change_due;
use entrega_core::{
    Coordinates, EstablishmentDefaults, NewOrder, NewOrderItem, NewZone, OrderTotals, OrderType,
    PaymentMethod, TransactionKind,
};
use entrega_db::{CreateOrder, Database, DbConfig};

/// (name, flat fee, minimum order override, eta min, eta max)
const ZONES: &[(&str, Option<i64>, Option<i64>, Option<i64>, Option<i64>)] = &[
    ("Centro", Some(500), None, Some(25), Some(40)),
    ("Pinheiros", None, None, None, None),
    ("Vila Madalena", Some(800), Some(3000), Some(35), Some(55)),
    ("Moema", None, Some(4000), None, Some(70)),
];

/// (product id, name, price in centavos)
const MENU: &[(&str, &str, i64)] = &[
    ("pizza-margherita", "Pizza Margherita", 4990),
    ("pizza-calabresa", "Pizza Calabresa", 5290),
    ("pizza-portuguesa", "Pizza Portuguesa", 5690),
    ("esfiha-carne", "Esfiha de Carne", 690),
    ("guarana-2l", "Guaraná 2L", 1290),
    ("suco-laranja", "Suco de Laranja 500ml", 990),
];

const CUSTOMERS: &[&str] = &[
    "Ana Paula", "Bruno Lima", "Camila Rocha", "Diego Alves", "Eduarda Reis", "Felipe Costa",
];

/// Establishment at Rua dos Pinheiros, São Paulo.
const ORIGIN: Coordinates = Coordinates {
    lat: -23.5660,
    lng: -46.6850,
};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args: Vec<String> = env::args().collect();

    let mut orders: usize = 20;
    let mut db_path = String::from("./entrega_dev.db");

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--orders" | "-o" => {
                if i + 1 < args.len() {
                    orders = args[i + 1].parse().unwrap_or(20);
                    i += 1;
                }
            }
            "--db" | "-d" => {
                if i + 1 < args.len() {
                    db_path = args[i + 1].clone();
                    i += 1;
                }
            }
            "--help" | "-h" => {
                println!("Entrega Seed Data Generator");
                println!();
                println!("Usage: seed [OPTIONS]");
                println!();
                println!("Options:");
                println!("  -o, --orders <N>   Number of demo orders (default: 20)");
                println!("  -d, --db <PATH>    Database file path (default: ./entrega_dev.db)");
                println!("  -h, --help         Show this help message");
                return Ok(());
            }
            _ => {}
        }
        i += 1;
    }

    println!("🌱 Entrega Seed Data Generator");
    println!("==============================");
    println!("Database: {}", db_path);
    println!("Orders:   {}", orders);
    println!();

    let db = Database::new(DbConfig::new(&db_path)).await?;
    println!("✓ Connected to database");
    println!("✓ Migrations applied");

    if !db.zones().list(true).await?.is_empty() {
        println!("⚠ Database already has zones");
        println!("  Skipping seed to avoid duplicates.");
        println!("  Delete the database file to regenerate.");
        return Ok(());
    }

    // Establishment defaults
    let defaults = EstablishmentDefaults {
        fee_rule: DeliveryFeeRule::new(Money::from_cents(500), 3.0, Money::from_cents(150))
            .with_max_distance_km(12.0)
            .with_free_above(Money::from_cents(15000)),
        minimum_order: Money::from_cents(2500),
        eta_min_minutes: 30,
        eta_max_minutes: 50,
    };
    db.zones().save_defaults(&defaults).await?;
    println!("✓ Establishment defaults saved");

    // Zones
    let mut zone_ids = Vec::new();
    for (name, fee, minimum, eta_min, eta_max) in ZONES {
        let zone = db
            .zones()
            .create(NewZone {
                name: name.to_string(),
                fee_override: fee.map(Money::from_cents),
                minimum_order_override: minimum.map(Money::from_cents),
                eta_min_override: *eta_min,
                eta_max_override: *eta_max,
            })
            .await?;
        zone_ids.push(zone.id);
    }
    println!("✓ Created {} zones", zone_ids.len());

    // Cash register
    let session = db
        .cash_register()
        .open_session("caixa-01", Money::from_cents(20000))
        .await?;
    println!("✓ Opened cash register session {}", session.id);

    // Orders
    let start = std::time::Instant::now();
    let mut created = 0;
    for seed in 0..orders {
        let new = generate_order(seed, &zone_ids);
        let fee = if new.order_type == OrderType::Delivery {
            new.coordinates
                .map(|c| calculate_fee(&defaults.fee_rule, ORIGIN.distance_to(&c)))
                .unwrap_or_default()
        } else {
            Money::zero()
        };
        let totals = match OrderTotals::compute(&new.items, fee, new.discount) {
            Ok(totals) => totals,
            Err(e) => {
                eprintln!("Skipping order {}: {}", seed, e);
                continue;
            }
        };
        let change = match change_due(totals.total, new.change_for) {
            Ok(change) => change,
            Err(e) => {
                eprintln!("Skipping order {}: {}", seed, e);
                continue;
            }
        };

        let order = match db
            .orders()
            .create(CreateOrder {
                order: &new,
                totals,
                change_due: change,
                eta_min_minutes: Some(defaults.eta_min_minutes),
                eta_max_minutes: Some(defaults.eta_max_minutes),
            })
            .await
        {
            Ok(order) => order,
            Err(e) => {
                eprintln!("Failed to insert order {}: {}", seed, e);
                continue;
            }
        };

        // Walk some orders forward so every panel column has something
        for _ in 0..(seed % 5) {
            db.orders().advance(&order.id).await?;
        }

        db.cash_register()
            .record_transaction(
                &session.id,
                &NewCashTransaction {
                    kind: TransactionKind::Sale,
                    payment_method: order.payment_method,
                    amount: order.total,
                    order_id: Some(order.id.clone()),
                    description: None,
                },
            )
            .await?;

        created += 1;
    }

    println!();
    println!("✓ Generated {} orders in {:?}", created, start.elapsed());

    let (_, summary) = db.cash_register().summary(&session.id).await?;
    println!("  Sales total:   {}", summary.total_sales);
    println!("  Expected cash: {}", summary.expected_cash);
    println!("  Active orders: {}", db.orders().list_active().await?.len());

    println!();
    println!("✓ Seed complete!");

    Ok(())
}

/// Builds a deterministic demo order.
fn generate_order(seed: usize, zone_ids: &[String]) -> NewOrder {
    let order_type = match seed % 4 {
        0 | 1 => OrderType::Delivery,
        2 => OrderType::Pickup,
        _ => OrderType::Counter,
    };
    let payment_method = PaymentMethod::ALL[seed % PaymentMethod::ALL.len()];

    let items: Vec<NewOrderItem> = (0..=(seed % 3))
        .map(|k| {
            let (product_id, name, price) = MENU[(seed + k * 2) % MENU.len()];
            NewOrderItem {
                product_id: product_id.to_string(),
                name: name.to_string(),
                quantity: 1 + ((seed + k) % 3) as i64,
                unit_price: Money::from_cents(price),
                notes: None,
            }
        })
        .collect();

    let is_delivery = order_type == OrderType::Delivery;
    // Spread customers up to ~5 km around the establishment
    let offset = (seed % 10) as f64 * 0.004;

    NewOrder {
        customer_name: CUSTOMERS[seed % CUSTOMERS.len()].to_string(),
        customer_phone: Some(format!("(11) 9{:04}-{:04}", 1000 + seed, 2000 + seed)),
        order_type,
        address: is_delivery.then(|| format!("Rua Teodoro Sampaio, {}", 100 + seed * 7)),
        coordinates: is_delivery.then(|| Coordinates {
            lat: ORIGIN.lat - offset,
            lng: ORIGIN.lng + offset,
        }),
        table_number: None,
        zone_id: (is_delivery && !zone_ids.is_empty())
            .then(|| zone_ids[seed % zone_ids.len()].clone()),
        items,
        payment_method,
        // Cash customers pay with a R$ 200,00 note
        change_for: (payment_method == PaymentMethod::Cash).then(|| Money::from_cents(20000)),
        discount: Money::zero(),
        notes: None,
    }
}
