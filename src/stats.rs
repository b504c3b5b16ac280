//! Time-of-day statistics for glucose samples
//!
//! Samples from any number of days are folded onto a single day of 144
//! ten-minute markers. Each populated marker carries the spread of values
//! seen at that time of day, which is what the pattern chart draws and what
//! the zone detector reads.

use std::collections::BTreeMap;
use std::fmt;

use chrono::{Local, TimeZone, Timelike};
use log::debug;
use serde::{Serialize, Serializer};

use crate::sample::Sample;
use crate::units::{Band, ThresholdProfile};

/// Minute markers within each hour
pub const MINUTE_MARKERS: [u8; 6] = [0, 10, 20, 30, 40, 50];

/// A time of day (hour, ten-minute marker)
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct BucketKey {
    pub hour: u8,
    pub minute: u8,
}

impl BucketKey {
    /// Returns `None` unless `hour < 24` and `minute` is a ten-minute marker
    pub fn new(hour: u8, minute: u8) -> Option<Self> {
        if hour < 24 && MINUTE_MARKERS.contains(&minute) {
            Some(Self { hour, minute })
        } else {
            None
        }
    }

    pub fn seconds_of_day(self) -> u32 {
        self.hour as u32 * 3600 + self.minute as u32 * 60
    }
}

impl fmt::Display for BucketKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:02}:{:02}", self.hour, self.minute)
    }
}

// Serialized as "HH:MM" so bucket maps become plain JSON objects
impl Serialize for BucketKey {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_string())
    }
}

/// Summary of the values falling into one bucket
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct DataPoint {
    pub min: f64,
    pub max: f64,
    /// Midrange `min + (max - min) / 2`, not the arithmetic mean
    pub avg: f64,
    pub p10: f64,
    pub p25: f64,
    pub p75: f64,
    pub p90: f64,
    pub median: f64,
}

impl DataPoint {
    /// Summarise a set of values; `None` when empty
    pub fn from_values(values: &[f64]) -> Option<Self> {
        if values.is_empty() {
            return None;
        }

        let mut sorted = values.to_vec();
        sorted.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));

        let min = sorted[0];
        let max = sorted[sorted.len() - 1];

        Some(Self {
            min,
            max,
            avg: min + (max - min) / 2.0,
            p10: percentile(&sorted, 10.0),
            p25: percentile(&sorted, 25.0),
            p75: percentile(&sorted, 75.0),
            p90: percentile(&sorted, 90.0),
            median: median(&sorted),
        })
    }
}

/// Fold samples into per-time-of-day data points, using the system time zone
pub fn aggregate(samples: &[Sample]) -> BTreeMap<BucketKey, DataPoint> {
    aggregate_in(samples, &Local)
}

/// Fold samples into per-time-of-day data points in the given time zone.
///
/// A bucket `(h, m)` holds every sample whose local hour is `h` and whose
/// local minute is `<= m`, so the buckets of one hour are cumulative: 10:20
/// also contains everything from 10:00 and 10:10. Empty buckets are left
/// out of the map.
pub fn aggregate_in<Tz: TimeZone>(samples: &[Sample], tz: &Tz) -> BTreeMap<BucketKey, DataPoint> {
    let mut by_hour: Vec<Vec<(u32, f64)>> = vec![Vec::new(); 24];
    for sample in samples {
        let local = sample.timestamp.with_timezone(tz);
        by_hour[local.hour() as usize].push((local.minute(), sample.value));
    }

    let mut buckets = BTreeMap::new();
    for (hour, entries) in by_hour.iter().enumerate() {
        if entries.is_empty() {
            continue;
        }
        for &marker in MINUTE_MARKERS.iter() {
            let values: Vec<f64> = entries
                .iter()
                .filter(|(minute, _)| *minute <= marker as u32)
                .map(|&(_, value)| value)
                .collect();

            if let Some(point) = DataPoint::from_values(&values) {
                buckets.insert(BucketKey { hour: hour as u8, minute: marker }, point);
            }
        }
    }

    debug!("Aggregated {} samples into {} buckets", samples.len(), buckets.len());
    buckets
}

/// Share of samples per band group (standard diabetes metric)
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct TimeInRange {
    pub total: usize,
    pub too_low: usize,
    /// Low and acceptable-low
    pub low: usize,
    pub normal: usize,
    /// Acceptable-high and high
    pub high: usize,
    pub too_high: usize,
}

impl TimeInRange {
    pub fn from_values(values: &[f64], thresholds: &ThresholdProfile) -> Self {
        let mut tir = Self { total: values.len(), ..Self::default() };

        for &v in values {
            match thresholds.classify(v) {
                Band::TooLow => tir.too_low += 1,
                Band::Low | Band::AcceptableLow => tir.low += 1,
                Band::Normal => tir.normal += 1,
                Band::AcceptableHigh | Band::High => tir.high += 1,
                Band::TooHigh => tir.too_high += 1,
            }
        }

        tir
    }

    fn percent(&self, count: usize) -> f64 {
        if self.total == 0 {
            0.0
        } else {
            (count as f64 / self.total as f64) * 100.0
        }
    }

    pub fn too_low_percent(&self) -> f64 {
        self.percent(self.too_low)
    }

    pub fn low_percent(&self) -> f64 {
        self.percent(self.low)
    }

    pub fn in_range_percent(&self) -> f64 {
        self.percent(self.normal)
    }

    pub fn high_percent(&self) -> f64 {
        self.percent(self.high)
    }

    pub fn too_high_percent(&self) -> f64 {
        self.percent(self.too_high)
    }
}

// ============= Helper Functions =============

/// Nearest-rank percentile with ceiling rounding over ascending values.
///
/// `index = clamp(ceil(pct / 100 * n), 0, n - 1)`; no interpolation.
pub fn percentile(sorted_values: &[f64], pct: f64) -> f64 {
    if sorted_values.is_empty() {
        return 0.0;
    }
    let n = sorted_values.len();
    let rank = (pct / 100.0 * n as f64).ceil();
    let idx = if rank <= 0.0 { 0 } else { (rank as usize).min(n - 1) };
    sorted_values[idx]
}

/// Median of ascending values: mean of the two central elements for even counts
pub fn median(sorted_values: &[f64]) -> f64 {
    let n = sorted_values.len();
    if n == 0 {
        return 0.0;
    }
    if n % 2 == 0 {
        (sorted_values[n / 2 - 1] + sorted_values[n / 2]) / 2.0
    } else {
        sorted_values[n / 2]
    }
}

/// Arithmetic mean
pub fn mean(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        None
    } else {
        Some(values.iter().sum::<f64>() / values.len() as f64)
    }
}
