//! Pattern zones: recurring times of day where the median is out of range

use std::collections::BTreeMap;

use log::debug;
use serde::Serialize;

use crate::stats::{BucketKey, DataPoint};

/// Qualifying buckets further apart than this start a new zone
pub const MAX_GAP_SECONDS: u32 = 600;
/// Zones shorter than this are dropped
pub const MIN_ZONE_SECONDS: u32 = 1800;
/// More zones than this collapse into one catch-all entry
pub const MAX_ZONES: usize = 12;

/// Median thresholds for zone detection, in mg/dL
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ZoneThresholds {
    pub low: f64,
    pub high: f64,
}

impl Default for ZoneThresholds {
    fn default() -> Self {
        Self { low: 70.0, high: 180.0 }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ZoneKind {
    Low,
    High,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ZoneLabel {
    Morning,
    Lunchtime,
    Afternoon,
    Night,
    Day,
    Evening,
    /// Start and end fall into no known pair of day segments
    Unlabeled,
    /// Replaces the individual zones when there are too many of them
    General,
}

/// A merged time-of-day range
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Zone {
    pub kind: ZoneKind,
    pub label: ZoneLabel,
    pub start: BucketKey,
    pub end: BucketKey,
}

impl Zone {
    pub fn duration_seconds(&self) -> u32 {
        self.end.seconds_of_day().saturating_sub(self.start.seconds_of_day())
    }

    /// Opaque lookup key for the presentation layer; empty when unlabeled
    pub fn label_key(&self) -> &'static str {
        match (self.kind, self.label) {
            (_, ZoneLabel::Unlabeled) => "",
            (ZoneKind::Low, ZoneLabel::General) => "generally_too_low",
            (ZoneKind::High, ZoneLabel::General) => "generally_too_high",
            (ZoneKind::Low, ZoneLabel::Morning) => "low_zone_morning",
            (ZoneKind::Low, ZoneLabel::Lunchtime) => "low_zone_lunchtime",
            (ZoneKind::Low, ZoneLabel::Afternoon) => "low_zone_afternoon",
            (ZoneKind::Low, ZoneLabel::Night) => "low_zone_night",
            (ZoneKind::Low, ZoneLabel::Day) => "low_zone_day",
            (ZoneKind::Low, ZoneLabel::Evening) => "low_zone_evening",
            (ZoneKind::High, ZoneLabel::Morning) => "high_zone_morning",
            (ZoneKind::High, ZoneLabel::Lunchtime) => "high_zone_lunchtime",
            (ZoneKind::High, ZoneLabel::Afternoon) => "high_zone_afternoon",
            (ZoneKind::High, ZoneLabel::Night) => "high_zone_night",
            (ZoneKind::High, ZoneLabel::Day) => "high_zone_day",
            (ZoneKind::High, ZoneLabel::Evening) => "high_zone_evening",
        }
    }

    /// "HH:MM - HH:MM"
    pub fn range_text(&self) -> String {
        format!("{} - {}", self.start, self.end)
    }

    fn general(kind: ZoneKind) -> Self {
        Self {
            kind,
            label: ZoneLabel::General,
            start: BucketKey { hour: 0, minute: 0 },
            end: BucketKey { hour: 23, minute: 50 },
        }
    }
}

/// Low and high zones, each in ascending time of day
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct PatternZones {
    pub low: Vec<Zone>,
    pub high: Vec<Zone>,
}

/// Find the time ranges whose bucket medians are below `low` or above `high`
pub fn detect_zones(buckets: &BTreeMap<BucketKey, DataPoint>, thresholds: ZoneThresholds) -> PatternZones {
    let mut low_times = Vec::new();
    let mut high_times = Vec::new();

    // BTreeMap iterates in ascending time of day
    for (key, point) in buckets {
        if point.median < thresholds.low {
            low_times.push(*key);
        } else if point.median > thresholds.high {
            high_times.push(*key);
        }
    }

    let zones = PatternZones {
        low: build_zones(ZoneKind::Low, &low_times),
        high: build_zones(ZoneKind::High, &high_times),
    };
    debug!(
        "Detected {} low and {} high zones from {} buckets",
        zones.low.len(),
        zones.high.len(),
        buckets.len()
    );
    zones
}

fn build_zones(kind: ZoneKind, times: &[BucketKey]) -> Vec<Zone> {
    let Some(&first) = times.first() else {
        return Vec::new();
    };

    let mut zones = Vec::new();
    let mut start = first;
    for pair in times.windows(2) {
        let (current, next) = (pair[0], pair[1]);
        if next.seconds_of_day() - current.seconds_of_day() > MAX_GAP_SECONDS {
            push_zone(&mut zones, kind, start, current);
            start = next;
        }
    }
    if let Some(&last) = times.last() {
        push_zone(&mut zones, kind, start, last);
    }

    if zones.len() > MAX_ZONES {
        debug!("{} {:?} zones, collapsing into one", zones.len(), kind);
        return vec![Zone::general(kind)];
    }
    zones
}

fn push_zone(zones: &mut Vec<Zone>, kind: ZoneKind, start: BucketKey, end: BucketKey) {
    if end.seconds_of_day() - start.seconds_of_day() >= MIN_ZONE_SECONDS {
        zones.push(Zone { kind, label: zone_label(start.hour, end.hour), start, end });
    }
}

fn is_night(hour: u8) -> bool {
    hour >= 20 || hour < 6
}

fn is_day(hour: u8) -> bool {
    (6..=20).contains(&hour)
}

fn is_morning(hour: u8) -> bool {
    hour > 5 && hour < 11
}

fn is_lunchtime(hour: u8) -> bool {
    (11..=14).contains(&hour)
}

fn is_afternoon(hour: u8) -> bool {
    (14..=18).contains(&hour)
}

/// Name a zone from the day segments of its start and end hour.
/// The first matching rule wins.
fn zone_label(start_hour: u8, end_hour: u8) -> ZoneLabel {
    let (s, e) = (start_hour, end_hour);
    if is_morning(s) && is_morning(e) {
        ZoneLabel::Morning
    } else if is_lunchtime(s) && is_lunchtime(e) {
        ZoneLabel::Lunchtime
    } else if is_afternoon(s) && is_afternoon(e) {
        ZoneLabel::Afternoon
    } else if is_night(s) && is_night(e) {
        ZoneLabel::Night
    } else if is_night(s) && is_day(e) {
        ZoneLabel::Morning
    } else if is_day(s) && is_day(e) {
        ZoneLabel::Day
    } else if is_day(s) && is_night(e) {
        ZoneLabel::Evening
    } else {
        ZoneLabel::Unlabeled
    }
}
