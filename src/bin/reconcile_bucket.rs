// Ops utility: re-run the unique-tier promotion for one CARRIER_B day.
//
// Usage:
//   cargo run --bin reconcile_bucket -- <YYYY-MM-DD> [db_path]
//
// Safe to run repeatedly; already promoted orders and manual fees are left alone.
// Set PHARMA_LOG_FORMAT=json for JSON log lines.

use anyhow::{anyhow, Context};
use chrono::NaiveDate;
use pharma_delivery::config::ConfigManager;
use pharma_delivery::db::{default_db_path, init_schema, open_sqlite_connection};
use pharma_delivery::domain::types::CarrierName;
use pharma_delivery::engine::PricingEngine;
use pharma_delivery::logging;
use pharma_delivery::repository::{ActionLogRepository, DeliveryOrderRepository};
use std::sync::{Arc, Mutex};

const LOG_FORMAT_ENV: &str = "PHARMA_LOG_FORMAT";

fn main() -> anyhow::Result<()> {
    match std::env::var(LOG_FORMAT_ENV).as_deref() {
        Ok("json") => logging::init_json(),
        _ => logging::init(),
    }

    let mut args = std::env::args().skip(1);
    let date_arg = args
        .next()
        .ok_or_else(|| anyhow!("usage: reconcile_bucket <YYYY-MM-DD> [db_path]"))?;
    let date = NaiveDate::parse_from_str(date_arg.trim(), "%Y-%m-%d")
        .with_context(|| format!("invalid date: {}", date_arg))?;

    let db_path = match args.next().filter(|s| !s.trim().is_empty()) {
        Some(p) => p,
        None => {
            let path = default_db_path();
            if let Some(parent) = path.parent() {
                std::fs::create_dir_all(parent)?;
            }
            path.to_string_lossy().to_string()
        }
    };

    let conn = open_sqlite_connection(&db_path)?;
    init_schema(&conn)?;
    let conn = Arc::new(Mutex::new(conn));

    let tables = ConfigManager::from_connection(conn.clone())?.get_pricing_tables()?;
    let store = Arc::new(DeliveryOrderRepository::from_connection(conn.clone()));
    let audit = Arc::new(ActionLogRepository::new(conn.clone()));
    let engine = PricingEngine::new(tables, store)?.with_event_publisher(audit);

    let result = engine.reconcile_bucket(CarrierName::CarrierB, date);

    println!("db={}", db_path);
    println!("date={}", date);
    println!("verified={}", result.verified);
    println!("promoted={}", result.promoted_order_ids.join(","));
    println!("skipped_manual={}", result.skipped_manual_order_ids.join(","));
    Ok(())
}
