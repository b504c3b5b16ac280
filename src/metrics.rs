//! Derived metrics: recent deltas, slow drift detection and HbA1c estimate

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::history::History;
use crate::sample::Sample;
use crate::stats::mean;
use crate::units::GlucoseUnit;

/// Samples needed for a full delta list
pub const DELTA_WINDOW: usize = 13;
/// Upper bound (exclusive) of a "slow" change between two samples, mg/dL
pub const SLOW_DELTA_MGDL: f64 = 3.0;
/// Deltas inspected for slow drift
const SLOW_DELTA_COUNT: usize = 4;
/// A current sample older than this is stale
pub const OUTDATED_AFTER_SECONDS: i64 = 480;
/// Default HbA1c window
pub const HBA1C_DAYS: i64 = 30;

/// Differences between consecutive samples, oldest first, in mg/dL.
///
/// Uses the 13 most recent samples of a newest-first slice, giving 12
/// deltas where the last entry is `newest - second newest`. Fewer than 13
/// samples yield an empty list.
pub fn deltas(newest_first: &[Sample]) -> Vec<f64> {
    if newest_first.len() < DELTA_WINDOW {
        return Vec::new();
    }
    (1..DELTA_WINDOW)
        .rev()
        .map(|i| newest_first[i - 1].value - newest_first[i].value)
        .collect()
}

/// True when each of the four most recent deltas lies in `(0, limit)`.
/// `deltas` and the result are in `unit`; the limit is converted, not the data.
pub fn slowly_rising(deltas: &[f64], unit: GlucoseUnit) -> bool {
    let limit = unit.to_display(SLOW_DELTA_MGDL);
    most_recent(deltas).is_some_and(|recent| recent.iter().all(|&d| d > 0.0 && d < limit))
}

/// True when each of the four most recent deltas lies in `(-limit, 0)`
pub fn slowly_falling(deltas: &[f64], unit: GlucoseUnit) -> bool {
    let limit = unit.to_display(SLOW_DELTA_MGDL);
    most_recent(deltas).is_some_and(|recent| recent.iter().all(|&d| d < 0.0 && d > -limit))
}

fn most_recent(deltas: &[f64]) -> Option<&[f64]> {
    if deltas.len() < SLOW_DELTA_COUNT {
        None
    } else {
        Some(&deltas[deltas.len() - SLOW_DELTA_COUNT..])
    }
}

/// Short-term movement of the most recent samples
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct TrendAnalysis {
    /// Oldest first, in the display unit
    pub deltas: Vec<f64>,
    pub delta_min: Option<f64>,
    pub delta_max: Option<f64>,
    pub slowly_rising: bool,
    pub slowly_falling: bool,
}

impl TrendAnalysis {
    pub fn from_samples(newest_first: &[Sample], unit: GlucoseUnit) -> Self {
        let deltas: Vec<f64> = deltas(newest_first)
            .into_iter()
            .map(|d| unit.to_display(d))
            .collect();

        Self {
            delta_min: deltas.iter().copied().reduce(f64::min),
            delta_max: deltas.iter().copied().reduce(f64::max),
            slowly_rising: slowly_rising(&deltas, unit),
            slowly_falling: slowly_falling(&deltas, unit),
            deltas,
        }
    }
}

/// HbA1c estimate in percent from the arithmetic mean of the given samples
pub fn estimate_hba1c(samples: &[Sample]) -> Option<f64> {
    let values: Vec<f64> = samples.iter().map(|s| s.value).collect();
    mean(&values).map(|avg| (avg + 100.0) / 36.66666)
}

/// HbA1c estimate over the last `days` days before `now`
pub fn hba1c_over_days(history: &History, now: DateTime<Utc>, days: i64) -> Option<f64> {
    estimate_hba1c(history.last_days(now, days))
}

/// Whether the sample is too old to be shown as current
pub fn is_outdated(sample: &Sample, now: DateTime<Utc>) -> bool {
    (now - sample.timestamp).num_seconds() > OUTDATED_AFTER_SECONDS
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::trend::Trend;
    use chrono::{Duration, TimeZone};

    fn base() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap()
    }

    /// Newest-first samples, five minutes apart, from oldest-first values
    fn history_of(oldest_first: &[f64]) -> Vec<Sample> {
        let n = oldest_first.len() as i64;
        let mut samples: Vec<Sample> = oldest_first
            .iter()
            .enumerate()
            .map(|(i, &v)| {
                let ts = base() - Duration::minutes(5 * (n - 1 - i as i64));
                Sample::new(v, ts, Trend::Flat).unwrap()
            })
            .collect();
        samples.reverse();
        samples
    }

    #[test]
    fn test_deltas_need_thirteen_samples() {
        let samples = history_of(&[100.0; 12]);
        assert!(deltas(&samples).is_empty());
        assert!(!slowly_rising(&deltas(&samples), GlucoseUnit::MgDl));
        assert!(!slowly_falling(&deltas(&samples), GlucoseUnit::MgDl));
    }

    #[test]
    fn test_deltas_order() {
        let values: Vec<f64> = (0..13).map(|i| 100.0 + (i * i) as f64).collect();
        let d = deltas(&history_of(&values));
        assert_eq!(d.len(), 12);
        // oldest delta first: 1 - 0, newest last: 144 - 121
        assert_eq!(d[0], 1.0);
        assert_eq!(d[11], 23.0);
    }

    #[test]
    fn test_slowly_rising() {
        let d = vec![10.0, -4.0, 7.0, 0.0, 5.0, 5.0, 5.0, 5.0, 1.0, 2.0, 1.0, 2.0];
        assert!(slowly_rising(&d, GlucoseUnit::MgDl));
        assert!(!slowly_falling(&d, GlucoseUnit::MgDl));

        let mut d2 = d.clone();
        d2[10] = 3.0;
        assert!(!slowly_rising(&d2, GlucoseUnit::MgDl));

        let mut d3 = d.clone();
        d3[9] = 0.0;
        assert!(!slowly_rising(&d3, GlucoseUnit::MgDl));
    }

    #[test]
    fn test_slowly_falling_in_mmol() {
        // 0.1 mmol/L steps are below 3 mg/dL (0.1665 mmol/L)
        let d = vec![0.0; 8].into_iter().chain([-0.1, -0.1, -0.1, -0.1]).collect::<Vec<_>>();
        assert!(slowly_falling(&d, GlucoseUnit::MmolL));
        assert!(slowly_falling(&d, GlucoseUnit::MgDl));

        let steep = vec![0.0; 8].into_iter().chain([-0.2, -0.1, -0.1, -0.1]).collect::<Vec<_>>();
        assert!(!slowly_falling(&steep, GlucoseUnit::MmolL));
    }

    #[test]
    fn test_trend_analysis() {
        let values: Vec<f64> = (0..13).map(|i| 100.0 + 2.0 * i as f64).collect();
        let analysis = TrendAnalysis::from_samples(&history_of(&values), GlucoseUnit::MgDl);
        assert_eq!(analysis.deltas, vec![2.0; 12]);
        assert_eq!(analysis.delta_min, Some(2.0));
        assert!(analysis.slowly_rising);

        let empty = TrendAnalysis::from_samples(&[], GlucoseUnit::MgDl);
        assert_eq!(empty, TrendAnalysis::default());
    }

    #[test]
    fn test_hba1c() {
        let samples = history_of(&[100.0, 150.0, 200.0]);
        let hba1c = estimate_hba1c(&samples).unwrap();
        assert!((hba1c - 250.0 / 36.66666).abs() < 1e-9);
        assert_eq!(estimate_hba1c(&[]), None);
    }

    #[test]
    fn test_hba1c_window() {
        let old = Sample::new(400.0, base() - Duration::days(40), Trend::Flat).unwrap();
        let recent = Sample::new(120.0, base() - Duration::days(2), Trend::Flat).unwrap();
        let history = History::new(vec![old, recent]);

        let hba1c = hba1c_over_days(&history, base(), HBA1C_DAYS).unwrap();
        assert!((hba1c - 220.0 / 36.66666).abs() < 1e-9);
    }

    #[test]
    fn test_outdated() {
        let sample = Sample::new(100.0, base(), Trend::Flat).unwrap();
        assert!(!is_outdated(&sample, base() + Duration::seconds(480)));
        assert!(is_outdated(&sample, base() + Duration::seconds(481)));
    }
}
