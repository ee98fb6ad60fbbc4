//! # Booking Day Simulation
//!
//! Walks an in-memory store through a typical day: a player books a
//! floodlight slot, the first visitor to the admin area claims ownership,
//! a second visitor is turned away, owners are managed, and the owner set is
//! recovered with the emergency reset code.
//!
//! ## Usage
//! ```bash
//! cargo run -p turf-client --bin turf-simulate
//!
//! # Simulate a specific date
//! cargo run -p turf-client --bin turf-simulate -- --date 2024-06-08
//!
//! # Use a config file
//! cargo run -p turf-client --bin turf-simulate -- --config ./client.toml
//!
//! # More detail
//! RUST_LOG=turf_client=debug cargo run -p turf-client --bin turf-simulate
//! ```

use std::env;
use std::path::PathBuf;
use std::sync::Arc;

use tracing_subscriber::EnvFilter;

use turf_client::{AccessGate, ClientConfig, LocalIdentity, MemoryStore, TurfClient, ViewScope};
use turf_core::availability::{PriceQuote, SlotStatus};
use turf_core::{format_hour, DateKey, Principal, UserProfile};

const RESET_SECRET: &str = "turf-reset-2024";

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args: Vec<String> = env::args().collect();

    let mut config_path: Option<PathBuf> = None;
    let mut date: Option<DateKey> = None;

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--config" | "-c" => {
                if i + 1 < args.len() {
                    config_path = Some(PathBuf::from(&args[i + 1]));
                    i += 1;
                }
            }
            "--date" | "-d" => {
                if i + 1 < args.len() {
                    date = Some(args[i + 1].parse()?);
                    i += 1;
                }
            }
            "--help" | "-h" => {
                println!("Turf Booking Simulation");
                println!();
                println!("Usage: turf-simulate [OPTIONS]");
                println!();
                println!("Options:");
                println!("  -c, --config <PATH>  Client config file (default: platform config dir)");
                println!("  -d, --date <DATE>    Date to simulate, YYYY-MM-DD (default: today)");
                println!("  -h, --help           Show this help message");
                return Ok(());
            }
            _ => {}
        }
        i += 1;
    }

    let mut config = ClientConfig::load_or_default(config_path);
    config.booking.allow_past_dates = true;

    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&config.logging.filter))?;
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let date = date.unwrap_or_else(|| DateKey::from_date(chrono::Local::now().date_naive()));

    println!("⚽ Turf Booking Simulation");
    println!("==========================");
    println!("Date: {} ({})", date, if date.is_weekend() { "weekend" } else { "weekday" });
    println!();

    let store = MemoryStore::builder()
        .reset_secret(RESET_SECRET)
        .profile(
            "alice",
            UserProfile {
                name: "Alice".to_string(),
                phone_number: "9876543210".to_string(),
            },
        )
        .profile(
            "bob",
            UserProfile {
                name: "Bob".to_string(),
                phone_number: "9123456780".to_string(),
            },
        )
        .build();

    // -------------------------------------------------------------------------
    // A player books a floodlight slot
    // -------------------------------------------------------------------------

    let player = Arc::new(LocalIdentity::signed_in(Principal::new("asha")));
    let client = TurfClient::new(config.clone(), player, Arc::new(store.clone()));

    let settings = client.slot_settings().await?;
    println!(
        "Open {} to {}, {} minute slots",
        format_hour(settings.opening_time),
        format_hour(settings.closing_time),
        settings.slot_duration_minutes
    );

    let slots = client.priced_slots(date).await?;
    println!("{} free slots:", slots.len());
    for slot in &slots {
        let price = match slot.price {
            PriceQuote::Known(amount) => amount.to_string(),
            PriceQuote::Unknown => "-".to_string(),
        };
        println!("  {:>8}  {}", format_hour(slot.hour), price);
    }

    let scope = ViewScope::new();
    let id = client
        .book(&scope, date, 19, "Asha", "98765 43210", "Football")
        .await?;
    let booking = client.booking(&id).await?;
    println!();
    println!(
        "✓ Booked {} for {} at {}",
        format_hour(booking.time_slot.start_hour),
        booking.customer_name,
        booking.price
    );

    let hours = client.check_availability(date).await?;
    println!("✓ {} is no longer offered ({} slots left)", format_hour(19), hours.len());

    match client
        .book(&scope, date, 19, "Ravi", "9988776655", "Cricket")
        .await
    {
        Ok(_) => println!("⚠ Double booking was accepted"),
        Err(e) => println!("✓ Second booking refused: {}", e),
    }

    // -------------------------------------------------------------------------
    // First visitor claims the admin area
    // -------------------------------------------------------------------------

    println!();
    let alice = gate_for(&config, &store, "alice");
    let bob = gate_for(&config, &store, "bob");

    println!("alice: {}", alice.resolve().await?);
    println!("bob:   {}", bob.resolve().await?);

    println!("alice claims: {}", alice.claim(&scope).await?);
    match bob.claim(&scope).await {
        Ok(state) => println!("⚠ bob also claimed: {}", state),
        Err(e) => println!("bob claims:   {} (now {})", e, bob.state()),
    }

    let earnings = alice.client().daily_earnings(date).await?;
    println!(
        "Earnings {}: {} bookings, {}",
        date, earnings.booking_count, earnings.total_revenue
    );

    let board = alice.client().slot_board(date).await?;
    let taken: Vec<_> = board
        .iter()
        .filter(|slot| slot.status != SlotStatus::Free)
        .collect();
    println!("Admin calendar (occupied hours):");
    println!("{}", serde_json::to_string_pretty(&taken)?);

    // -------------------------------------------------------------------------
    // Owner management
    // -------------------------------------------------------------------------

    println!();
    println!("alice adds bob: {}", alice.add_owner(&scope, "bob").await?);
    println!("bob re-checks:  {}", bob.resolve().await?);
    if let Err(e) = alice.add_owner(&scope, "carol").await {
        println!("alice adds carol: {}", e);
    }
    println!("alice steps down: {}", alice.remove_owner(&scope, "alice").await?);
    if let Err(e) = bob.remove_owner(&scope, "bob").await {
        println!("bob steps down: {}", e);
    }

    // -------------------------------------------------------------------------
    // Emergency recovery
    // -------------------------------------------------------------------------

    println!();
    if let Err(e) = alice.emergency_reset(&scope, "guess").await {
        println!("alice resets with a guess: {}", e);
    }
    println!(
        "alice resets and claims: {}",
        alice.reset_and_claim(&scope, RESET_SECRET).await?
    );
    println!("bob re-checks: {}", bob.resolve().await?);
    println!("owners: {:?}", store.owners().await);

    println!();
    println!("✓ Simulation complete");
    Ok(())
}

fn gate_for(config: &ClientConfig, store: &MemoryStore, name: &str) -> AccessGate {
    let identity = Arc::new(LocalIdentity::signed_in(Principal::new(name)));
    let client = TurfClient::new(config.clone(), identity, Arc::new(store.clone()));
    AccessGate::new(Arc::new(client))
}
