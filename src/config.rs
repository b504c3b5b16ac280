//! Configuration file parsing and data paths
//!
//! `config.txt` holds one `key value` pair per line; `#` starts a comment.
//! Thresholds are always given in mg/dL, intervals in minutes and flags as
//! `1`/`0`.

use std::fs;
use std::path::{Path, PathBuf};

use chrono::Duration;
use log::warn;

use crate::error::GlucoError;
use crate::metrics::HBA1C_DAYS;
use crate::notify::NotificationSettings;
use crate::units::{GlucoseUnit, ThresholdProfile};
use crate::zones::ZoneThresholds;

const APP_DIR: &str = "glucowatch";

const DEFAULT_CONFIG: &str = "\
# glucowatch settings
# Thresholds in mg/dL
unit mg/dL
min_critical 55
min_acceptable 65
min_normal 70
max_normal 140
max_acceptable 180
max_critical 350
soon_too_high 250

# Notifications (1 = on, 0 = off)
show_acceptable_low_notification 1
show_low_notification 1
show_acceptable_high_notification 1
show_high_notification 1
play_sound_for_too_low_notification 1
play_sound_for_low_notification 0
play_sound_for_acceptable_low_notification 0
play_sound_for_acceptable_high_notification 0
play_sound_for_high_notification 0
play_sound_for_too_high_notification 1

# Minutes between repeated critical notifications
critical_min_notification_interval 10
critical_max_notification_interval 10

# Analysis windows in days
hba1c_days 30
pattern_days 30
";

/// Settings snapshot loaded from config.txt
#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    pub unit: GlucoseUnit,
    pub thresholds: ThresholdProfile,
    pub notifications: NotificationSettings,
    pub hba1c_days: i64,
    pub pattern_days: i64,
    pub database_path: Option<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            unit: GlucoseUnit::default(),
            thresholds: ThresholdProfile::default(),
            notifications: NotificationSettings::default(),
            hba1c_days: HBA1C_DAYS,
            pattern_days: 30,
            database_path: None,
        }
    }
}

impl Config {
    /// Load configuration from a file
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, GlucoError> {
        let text = fs::read_to_string(path)?;
        Self::parse(&text)
    }

    /// Parse configuration text and validate the threshold ordering
    pub fn parse(text: &str) -> Result<Self, GlucoError> {
        let mut config = Config::default();

        for line in text.lines() {
            // Skip empty lines and comments
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }

            if let Some((key, rest)) = Self::parse_line(line) {
                let value = rest.split('#').next().unwrap_or("").trim();
                config.apply(key, value)?;
            }
        }

        config.thresholds.validate()?;
        if config.notifications.soon_too_high >= config.thresholds.max_critical {
            return Err(GlucoError::Config(format!(
                "soon_too_high ({}) must be below max_critical ({})",
                config.notifications.soon_too_high, config.thresholds.max_critical
            )));
        }
        Ok(config)
    }

    /// Write the default configuration file
    pub fn create_default<P: AsRef<Path>>(path: P) -> Result<(), GlucoError> {
        fs::write(path, DEFAULT_CONFIG)?;
        Ok(())
    }

    /// Median thresholds used for pattern zones
    pub fn zone_thresholds(&self) -> ZoneThresholds {
        ZoneThresholds { low: self.thresholds.min_normal, high: self.thresholds.max_acceptable }
    }

    /// Parse a single config line, returning (key, value)
    fn parse_line(line: &str) -> Option<(&str, &str)> {
        let mut parts = line.splitn(2, |c: char| c.is_whitespace());
        let key = parts.next()?.trim();
        let value = parts.next()?.trim();

        if key.is_empty() || value.is_empty() {
            return None;
        }

        Some((key, value))
    }

    fn apply(&mut self, key: &str, value: &str) -> Result<(), GlucoError> {
        let t = &mut self.thresholds;
        let n = &mut self.notifications;
        match key {
            "unit" => {
                self.unit = GlucoseUnit::from_text(value)
                    .ok_or_else(|| GlucoError::Config(format!("unknown unit '{}'", value)))?;
            }
            "min_critical" => t.min_critical = parse_number(key, value)?,
            "min_acceptable" => t.min_acceptable = parse_number(key, value)?,
            "min_normal" => t.min_normal = parse_number(key, value)?,
            "max_normal" => t.max_normal = parse_number(key, value)?,
            "max_acceptable" => t.max_acceptable = parse_number(key, value)?,
            "max_critical" => t.max_critical = parse_number(key, value)?,
            "soon_too_high" => n.soon_too_high = parse_number(key, value)?,
            "show_acceptable_low_notification" => n.show_acceptable_low = parse_flag(key, value)?,
            "show_low_notification" => n.show_low = parse_flag(key, value)?,
            "show_acceptable_high_notification" => n.show_acceptable_high = parse_flag(key, value)?,
            "show_high_notification" => n.show_high = parse_flag(key, value)?,
            "play_sound_for_too_low_notification" => n.sound_too_low = parse_flag(key, value)?,
            "play_sound_for_low_notification" => n.sound_low = parse_flag(key, value)?,
            "play_sound_for_acceptable_low_notification" => n.sound_acceptable_low = parse_flag(key, value)?,
            "play_sound_for_acceptable_high_notification" => n.sound_acceptable_high = parse_flag(key, value)?,
            "play_sound_for_high_notification" => n.sound_high = parse_flag(key, value)?,
            "play_sound_for_too_high_notification" => n.sound_too_high = parse_flag(key, value)?,
            "critical_min_notification_interval" => n.critical_min_interval = parse_minutes(key, value)?,
            "critical_max_notification_interval" => n.critical_max_interval = parse_minutes(key, value)?,
            "hba1c_days" => self.hba1c_days = parse_days(key, value)?,
            "pattern_days" => self.pattern_days = parse_days(key, value)?,
            "database_path" => self.database_path = Some(value.to_string()),
            _ => warn!("Ignoring unknown config key '{}'", key),
        }
        Ok(())
    }
}

fn parse_number(key: &str, value: &str) -> Result<f64, GlucoError> {
    value
        .parse::<f64>()
        .ok()
        .filter(|v| v.is_finite())
        .ok_or_else(|| GlucoError::Config(format!("{} expects a number, got '{}'", key, value)))
}

fn parse_flag(key: &str, value: &str) -> Result<bool, GlucoError> {
    match value {
        "1" | "true" => Ok(true),
        "0" | "false" => Ok(false),
        _ => Err(GlucoError::Config(format!("{} expects 1 or 0, got '{}'", key, value))),
    }
}

fn parse_minutes(key: &str, value: &str) -> Result<Duration, GlucoError> {
    let minutes = parse_number(key, value)?;
    if minutes < 0.0 {
        return Err(GlucoError::Config(format!("{} must not be negative", key)));
    }
    // saturating cast; try_seconds rejects anything chrono cannot hold
    Duration::try_seconds((minutes * 60.0).round() as i64)
        .ok_or_else(|| GlucoError::Config(format!("{} is out of range, got '{}'", key, value)))
}

fn parse_days(key: &str, value: &str) -> Result<i64, GlucoError> {
    value
        .parse::<i64>()
        .ok()
        .filter(|d| *d > 0)
        .ok_or_else(|| GlucoError::Config(format!("{} expects a positive number of days, got '{}'", key, value)))
}

// ============= Data Paths =============

/// OS-specific data directory, falling back to the working directory
pub fn get_data_dir() -> PathBuf {
    dirs::data_dir()
        .map(|d| d.join(APP_DIR))
        .unwrap_or_else(|| PathBuf::from("."))
}

pub fn ensure_data_dir() -> std::io::Result<()> {
    fs::create_dir_all(get_data_dir())
}

pub fn config_file_path() -> PathBuf {
    get_data_dir().join("config.txt")
}

pub fn default_database_path() -> PathBuf {
    get_data_dir().join("glucowatch.db")
}

/// Where the CLI keeps the notification engine state between runs
pub fn state_file_path() -> PathBuf {
    get_data_dir().join("state.json")
}
