//! VPIN estimation example.
//!
//! This example runs the full pipeline on a short single-day tape:
//! 1. Validates parameters and trades
//! 2. Builds one-minute time bars
//! 3. Assigns bar volume to equal-volume buckets
//! 4. Classifies buy and sell volume and computes the rolling VPIN
//!
//! Run with: `cargo run --example scenario`

use chrono::{TimeDelta, TimeZone, Utc};
use vpin_rs::prelude::*;

fn main() {
    println!("=== VPIN Estimation Example ===\n");

    let start = Utc.with_ymd_and_hms(2024, 3, 1, 9, 30, 0).unwrap();
    let prices = [
        100.0, 100.1, 100.05, 100.15, 100.2, 100.1, 100.25, 100.3, 100.2, 100.35, 100.4,
    ];
    let volumes = [
        1000.0, 1500.0, 1200.0, 1800.0, 1600.0, 1400.0, 1700.0, 1900.0, 1300.0, 2000.0, 1100.0,
    ];
    let trades: Vec<TradeRecord> = prices
        .iter()
        .zip(volumes.iter())
        .enumerate()
        .map(|(i, (&p, &v))| TradeRecord::new(start + TimeDelta::minutes(i as i64), p, v))
        .collect();

    println!("Trades: {}", trades.len());
    println!("Total volume: {}", volumes.iter().sum::<f64>());
    println!();

    // timebarsize 60s, 5 buckets per day, 3-bucket window
    let config = VpinConfig::new(60, 5, 3).unwrap();
    let estimate = VpinEstimator::new(config).estimate(&trades).unwrap();

    println!("{estimate}");

    println!("Buckets:");
    for bucket in &estimate.buckets {
        let vpin = bucket
            .vpin
            .map_or_else(|| "-".to_string(), |v| format!("{v:.4}"));
        println!(
            "  #{} {} -> {}  buy {:>8.2}  sell {:>8.2}  vpin {}",
            bucket.bucket_index,
            bucket.start_time.format("%H:%M"),
            bucket.end_time.format("%H:%M"),
            bucket.buy_volume,
            bucket.sell_volume,
            vpin
        );
    }
    println!();

    if let Some(level) = estimate.toxicity_level() {
        println!("Latest toxicity: {level}");
    }
}
