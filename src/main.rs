//! glucowatch command line
//!
//! Usage:
//!   glucowatch import <entries.json>  - Store Nightscout-style entries
//!   glucowatch status                 - Current reading, trend and notifications
//!   glucowatch patterns [days]        - Time-of-day statistics and pattern zones
//!   glucowatch path                   - Show data file locations
//!   GLUCOWATCH_DBG=1 glucowatch status - Enable debug output

use std::env;
use std::fs;

use chrono::Utc;
use log::{info, warn};
use serde_json::json;

use glucowatch::config::{
    config_file_path, default_database_path, ensure_data_dir, get_data_dir, state_file_path, Config,
};
use glucowatch::error::GlucoError;
use glucowatch::metrics::{hba1c_over_days, is_outdated, TrendAnalysis};
use glucowatch::notify::{EngineState, NotificationEngine};
use glucowatch::sample::parse_entries;
use glucowatch::stats::{aggregate, TimeInRange};
use glucowatch::storage::Storage;
use glucowatch::zones::{detect_zones, Zone};

fn main() -> Result<(), GlucoError> {
    let args: Vec<String> = env::args().collect();

    let debug_mode = env::var("GLUCOWATCH_DBG").is_ok();
    if debug_mode {
        env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
            .format_timestamp(None)
            .init();
    }

    if let Err(e) = ensure_data_dir() {
        eprintln!("Warning: Could not create data directory: {}", e);
    }

    let cfg_path = config_file_path();
    if !cfg_path.exists() {
        if let Err(e) = Config::create_default(&cfg_path) {
            warn!("Could not create default config: {}", e);
        }
    }

    let config = load_config()?;

    let db_path = config
        .database_path
        .clone()
        .unwrap_or_else(|| default_database_path().to_string_lossy().to_string());

    match args.get(1).map(|s| s.as_str()) {
        Some("import") => match args.get(2) {
            Some(file) => cmd_import(&db_path, file)?,
            None => {
                eprintln!("import needs a JSON file");
                print_help();
            }
        },
        Some("status") => cmd_status(&config, &db_path)?,
        Some("patterns") => {
            let days = args
                .get(2)
                .and_then(|s| s.parse::<i64>().ok())
                .filter(|d| *d > 0)
                .unwrap_or(config.pattern_days);
            cmd_patterns(&config, &db_path, days)?;
        }
        Some("path") | Some("paths") => cmd_show_paths(&db_path),
        Some("--version") | Some("-V") => println!("glucowatch {}", env!("CARGO_PKG_VERSION")),
        _ => print_help(),
    }

    Ok(())
}

/// Data directory config first, then the working directory, then defaults.
/// Out-of-order thresholds are reported instead of silently replaced.
fn load_config() -> Result<Config, GlucoError> {
    match Config::load(config_file_path()).or_else(|e| match e {
        GlucoError::Io(_) => Config::load("config.txt"),
        other => Err(other),
    }) {
        Ok(config) => Ok(config),
        Err(GlucoError::Io(e)) => {
            warn!("Could not load config: {}. Using defaults.", e);
            Ok(Config::default())
        }
        Err(e) => Err(e),
    }
}

fn cmd_show_paths(db_path: &str) {
    println!("glucowatch data paths:");
    println!("  Data directory:  {}", get_data_dir().display());
    println!("  Database:        {}", db_path);
    println!("  Config file:     {}", config_file_path().display());
    println!("  Engine state:    {}", state_file_path().display());
}

fn cmd_import(db_path: &str, file: &str) -> Result<(), GlucoError> {
    let text = fs::read_to_string(file)?;
    let samples = parse_entries(&text)?;

    let mut storage = Storage::new(db_path)?;
    let new_count = storage.import_samples(&samples)?;
    let total_count = storage.count()?;

    info!("Imported {} new samples ({} in file, {} total)", new_count, samples.len(), total_count);

    eprintln!("Read {} samples from {}", samples.len(), file);
    eprintln!("  New entries:     {}", new_count);
    eprintln!("  Duplicates:      {} (skipped)", samples.len() - new_count);
    eprintln!("  Total in DB:     {}", total_count);
    Ok(())
}

fn cmd_status(config: &Config, db_path: &str) -> Result<(), GlucoError> {
    let storage = Storage::new(db_path)?;
    let history = storage.load_history()?;
    let current = history.latest().ok_or(GlucoError::NoData)?;
    let now = Utc::now();
    let unit = config.unit;

    let state = EngineState::load(state_file_path(), now);
    let engine = NotificationEngine::new(&config.thresholds, &config.notifications, unit);
    let (notification, next_state) = engine.evaluate(current, now, state);
    let prediction = engine.predict(history.newest_first());
    if let Err(e) = next_state.save(state_file_path()) {
        warn!("Could not save engine state: {}", e);
    }

    let analysis = TrendAnalysis::from_samples(history.newest_first(), unit);
    let recent = history.last_days(now, config.hba1c_days);
    let values: Vec<f64> = recent.iter().map(|s| s.value).collect();
    let tir = TimeInRange::from_values(&values, &config.thresholds);

    let report = json!({
        "time": current.timestamp,
        "value": unit.format(current.value),
        "trend": current.trend.symbol(),
        "band": config.thresholds.classify(current.value).label(),
        "outdated": is_outdated(current, now),
        "normal_range": config.thresholds.format_range(unit),
        "trend_analysis": analysis,
        "hba1c": hba1c_over_days(&history, now, config.hba1c_days),
        "time_in_range": {
            "too_low": tir.too_low_percent(),
            "low": tir.low_percent(),
            "in_range": tir.in_range_percent(),
            "high": tir.high_percent(),
            "too_high": tir.too_high_percent(),
        },
        "notification": notification,
        "prediction": prediction,
    });
    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}

fn cmd_patterns(config: &Config, db_path: &str, days: i64) -> Result<(), GlucoError> {
    let storage = Storage::new(db_path)?;
    let history = storage.load_history()?;
    if history.is_empty() {
        return Err(GlucoError::NoData);
    }

    let samples = history.last_days(Utc::now(), days);
    let buckets = aggregate(samples);
    let zones = detect_zones(&buckets, config.zone_thresholds());

    let report = json!({
        "days": days,
        "samples": samples.len(),
        "buckets": buckets,
        "low_zones": zone_report(&zones.low),
        "high_zones": zone_report(&zones.high),
    });
    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}

fn zone_report(zones: &[Zone]) -> Vec<serde_json::Value> {
    zones
        .iter()
        .map(|z| json!({ "label": z.label_key(), "range": z.range_text(), "zone": z }))
        .collect()
}

fn print_help() {
    eprintln!("glucowatch v{}", env!("CARGO_PKG_VERSION"));
    eprintln!();
    eprintln!("USAGE:");
    eprintln!("  glucowatch import <file>     Store samples from a Nightscout entries JSON file");
    eprintln!("  glucowatch status            Current reading, trend metrics and notifications");
    eprintln!("  glucowatch patterns [days]   Time-of-day statistics and pattern zones");
    eprintln!("  glucowatch path              Show data file locations");
    eprintln!("  glucowatch help              Show this help");
    eprintln!();
    eprintln!("ENVIRONMENT:");
    eprintln!("  GLUCOWATCH_DBG=1             Enable debug output");
    eprintln!();
    eprintln!("DATA LOCATIONS:");
    eprintln!("  Database:  {}", default_database_path().display());
    eprintln!("  Config:    {}", config_file_path().display());
}
