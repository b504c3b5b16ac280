//! Threshold notifications and short-horizon predictions
//!
//! The engine never reads the clock and keeps no state of its own: the
//! caller passes `now` and the previous [`EngineState`] in and stores the
//! returned state for the next poll.

use std::fs;
use std::io::ErrorKind;
use std::path::Path;

use chrono::{DateTime, Duration, Utc};
use log::{debug, info, warn};
use serde::{Deserialize, Serialize};

use crate::error::GlucoError;
use crate::sample::Sample;
use crate::trend::Trend;
use crate::units::{Band, GlucoseUnit, ThresholdProfile};

/// Message identifiers handed to the presentation layer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum MessageKey {
    TooHigh,
    SoonTooHigh,
    High,
    SoonHigh,
    ABitHigh,
    ABitLow,
    SoonLow,
    Low,
    SoonTooLow,
    TooLow,
    PredictionTooLow,
    PredictionTooHigh,
}

impl MessageKey {
    /// Lookup key for localization
    pub fn key(self) -> &'static str {
        match self {
            MessageKey::TooHigh => "notification_glucose_too_high",
            MessageKey::SoonTooHigh => "notification_glucose_soon_too_high",
            MessageKey::High => "notification_glucose_high",
            MessageKey::SoonHigh => "notification_glucose_soon_high",
            MessageKey::ABitHigh => "notification_glucose_a_bit_high",
            MessageKey::ABitLow => "notification_glucose_a_bit_low",
            MessageKey::SoonLow => "notification_glucose_soon_low",
            MessageKey::Low => "notification_glucose_low",
            MessageKey::SoonTooLow => "notification_glucose_soon_too_low",
            MessageKey::TooLow => "notification_glucose_too_low",
            MessageKey::PredictionTooLow => "prediction_too_low",
            MessageKey::PredictionTooHigh => "prediction_too_high",
        }
    }

    /// Default English text
    pub fn text(self) -> &'static str {
        match self {
            MessageKey::TooHigh => "Glucose too high",
            MessageKey::SoonTooHigh => "Glucose will be too high soon",
            MessageKey::High => "Glucose high",
            MessageKey::SoonHigh => "Glucose will be high soon",
            MessageKey::ABitHigh => "Glucose a bit high",
            MessageKey::ABitLow => "Glucose a bit low",
            MessageKey::SoonLow => "Glucose will be low soon",
            MessageKey::Low => "Glucose low",
            MessageKey::SoonTooLow => "Glucose will be too low soon",
            MessageKey::TooLow => "Glucose too low",
            MessageKey::PredictionTooLow => "Glucose is falling fast and will be too low soon",
            MessageKey::PredictionTooHigh => "Glucose is rising fast and will be too high soon",
        }
    }
}

/// What the alert dispatcher should show
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NotificationDecision {
    pub message_key: MessageKey,
    pub body: String,
    pub play_sound: bool,
}

/// Output of the prediction pass; same shape as a notification
pub type PredictionAdvisory = NotificationDecision;

/// State carried from one evaluation to the next
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct EngineState {
    /// Last time a too-low or too-high notification fired
    pub last_notification_time: DateTime<Utc>,
}

impl EngineState {
    /// Fresh state; critical repeats are throttled relative to `now`
    pub fn starting_at(now: DateTime<Utc>) -> Self {
        Self { last_notification_time: now }
    }

    /// Read a state saved by [`EngineState::save`]. A missing file starts
    /// fresh; an unreadable or corrupt one is logged and also starts fresh.
    pub fn load<P: AsRef<Path>>(path: P, now: DateTime<Utc>) -> Self {
        let path = path.as_ref();
        let text = match fs::read_to_string(path) {
            Ok(text) => text,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                debug!("No engine state at {}, starting fresh", path.display());
                return Self::starting_at(now);
            }
            Err(e) => {
                warn!("Could not read engine state {}: {}", path.display(), e);
                return Self::starting_at(now);
            }
        };
        match serde_json::from_str(&text) {
            Ok(state) => state,
            Err(e) => {
                warn!("Discarding corrupt engine state {}: {}", path.display(), e);
                Self::starting_at(now)
            }
        }
    }

    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<(), GlucoError> {
        fs::write(path, serde_json::to_string(self)?)?;
        Ok(())
    }
}

/// Per-band switches and throttle intervals from the settings store
#[derive(Debug, Clone, PartialEq)]
pub struct NotificationSettings {
    pub show_acceptable_low: bool,
    pub show_low: bool,
    pub show_acceptable_high: bool,
    pub show_high: bool,
    pub sound_too_low: bool,
    pub sound_low: bool,
    pub sound_acceptable_low: bool,
    pub sound_acceptable_high: bool,
    pub sound_high: bool,
    pub sound_too_high: bool,
    /// Minimum gap between repeated too-low notifications
    pub critical_min_interval: Duration,
    /// Minimum gap between repeated too-high notifications
    pub critical_max_interval: Duration,
    /// Lower bound of the "soon too high" prediction range, mg/dL
    pub soon_too_high: f64,
}

impl Default for NotificationSettings {
    fn default() -> Self {
        Self {
            show_acceptable_low: true,
            show_low: true,
            show_acceptable_high: true,
            show_high: true,
            sound_too_low: true,
            sound_low: false,
            sound_acceptable_low: false,
            sound_acceptable_high: false,
            sound_high: false,
            sound_too_high: true,
            critical_min_interval: Duration::minutes(10),
            critical_max_interval: Duration::minutes(10),
            soon_too_high: 250.0,
        }
    }
}

/// Decides whether the current reading warrants a notification
#[derive(Debug, Clone, Copy)]
pub struct NotificationEngine<'a> {
    thresholds: &'a ThresholdProfile,
    settings: &'a NotificationSettings,
    unit: GlucoseUnit,
}

impl<'a> NotificationEngine<'a> {
    pub fn new(thresholds: &'a ThresholdProfile, settings: &'a NotificationSettings, unit: GlucoseUnit) -> Self {
        debug_assert!(thresholds.is_ordered(), "threshold profile out of order");
        Self { thresholds, settings, unit }
    }

    /// Evaluate the current sample.
    ///
    /// Returns at most one decision and the state to use next time. Only
    /// too-low and too-high notifications move `last_notification_time`.
    pub fn evaluate(
        &self,
        sample: &Sample,
        now: DateTime<Utc>,
        state: EngineState,
    ) -> (Option<NotificationDecision>, EngineState) {
        let s = self.settings;
        let trend = sample.trend;
        let band = self.thresholds.classify(sample.value);
        let elapsed = now - state.last_notification_time;

        let selected = match band {
            Band::TooHigh => {
                if trend.is_falling() {
                    debug!("Too high but falling, no notification");
                    None
                } else if matches!(trend, Trend::Flat | Trend::FortyFiveDown)
                    && elapsed <= s.critical_max_interval
                {
                    debug!("Too high notification throttled ({}s since last)", elapsed.num_seconds());
                    None
                } else {
                    Some((MessageKey::TooHigh, s.sound_too_high, true))
                }
            }
            Band::High if s.show_high => {
                let key = if trend.is_rising() { MessageKey::SoonTooHigh } else { MessageKey::High };
                Some((key, s.sound_high, false))
            }
            Band::AcceptableHigh if s.show_acceptable_high => {
                let key = if trend.is_rising() { MessageKey::SoonHigh } else { MessageKey::ABitHigh };
                Some((key, s.sound_acceptable_high, false))
            }
            Band::AcceptableLow if s.show_acceptable_low => {
                let key = if trend.is_falling() { MessageKey::SoonLow } else { MessageKey::ABitLow };
                Some((key, s.sound_acceptable_low, false))
            }
            Band::Low if s.show_low => {
                let key = if trend.is_falling() { MessageKey::SoonTooLow } else { MessageKey::Low };
                Some((key, s.sound_low, false))
            }
            Band::TooLow => {
                if trend.is_rising() {
                    debug!("Too low but rising, no notification");
                    None
                } else if matches!(trend, Trend::Flat | Trend::FortyFiveUp)
                    && elapsed <= s.critical_min_interval
                {
                    debug!("Too low notification throttled ({}s since last)", elapsed.num_seconds());
                    None
                } else {
                    Some((MessageKey::TooLow, s.sound_too_low, true))
                }
            }
            Band::Normal | Band::High | Band::AcceptableHigh | Band::AcceptableLow | Band::Low => None,
        };

        let Some((message_key, play_sound, critical)) = selected else {
            return (None, state);
        };

        let decision = self.decision(message_key, sample, play_sound);
        info!("Notification: {}", decision.body);

        let next = if critical { EngineState { last_notification_time: now } } else { state };
        (Some(decision), next)
    }

    /// Warn early when the last three samples all move fast in one direction.
    ///
    /// Not rate limited; independent of [`NotificationEngine::evaluate`].
    pub fn predict(&self, newest_first: &[Sample]) -> Option<PredictionAdvisory> {
        if newest_first.len() < 3 {
            return None;
        }
        let last3 = &newest_first[..3];
        let current = &last3[0];
        let value = current.value;
        let t = self.thresholds;

        if last3.iter().all(|s| s.trend.is_falling()) {
            if value > t.min_critical && value < t.min_acceptable {
                let advisory = self.decision(MessageKey::PredictionTooLow, current, self.settings.sound_too_low);
                info!("Prediction: {}", advisory.body);
                return Some(advisory);
            }
        } else if last3.iter().all(|s| s.trend.is_rising())
            && value > self.settings.soon_too_high
            && value < t.max_critical
        {
            let advisory = self.decision(MessageKey::PredictionTooHigh, current, self.settings.sound_too_high);
            info!("Prediction: {}", advisory.body);
            return Some(advisory);
        }
        None
    }

    fn decision(&self, message_key: MessageKey, sample: &Sample, play_sound: bool) -> NotificationDecision {
        let body = format!(
            "{} ({} {})",
            message_key.text(),
            self.unit.format_value(sample.value),
            sample.trend.symbol()
        );
        NotificationDecision { message_key, body, play_sound }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 6, 1, 8, 0, 0).unwrap()
    }

    fn reading(value: f64, trend: Trend) -> Sample {
        Sample::new(value, now(), trend).unwrap()
    }

    fn thresholds() -> ThresholdProfile {
        ThresholdProfile {
            min_critical: 55.0,
            min_acceptable: 65.0,
            min_normal: 70.0,
            max_normal: 140.0,
            max_acceptable: 180.0,
            max_critical: 350.0,
        }
    }

    fn settings() -> NotificationSettings {
        NotificationSettings {
            critical_max_interval: Duration::minutes(5),
            critical_min_interval: Duration::minutes(5),
            ..NotificationSettings::default()
        }
    }

    #[test]
    fn test_too_high_flat_is_throttled() {
        let (t, s) = (thresholds(), settings());
        let engine = NotificationEngine::new(&t, &s, GlucoseUnit::MgDl);
        let state = EngineState { last_notification_time: now() - Duration::minutes(4) };

        let (decision, next) = engine.evaluate(&reading(350.5, Trend::Flat), now(), state);
        assert!(decision.is_none());
        assert_eq!(next, state);
    }

    #[test]
    fn test_too_high_flat_fires_after_interval() {
        let (t, s) = (thresholds(), settings());
        let engine = NotificationEngine::new(&t, &s, GlucoseUnit::MgDl);
        let state = EngineState { last_notification_time: now() - Duration::minutes(6) };

        let (decision, next) = engine.evaluate(&reading(350.5, Trend::Flat), now(), state);
        let decision = decision.unwrap();
        assert_eq!(decision.message_key, MessageKey::TooHigh);
        assert!(decision.body.starts_with("Glucose too high ("));
        assert!(decision.play_sound);
        assert_eq!(next.last_notification_time, now());
    }

    #[test]
    fn test_too_high_rising_is_unconditional() {
        let (t, s) = (thresholds(), settings());
        let engine = NotificationEngine::new(&t, &s, GlucoseUnit::MgDl);
        let state = EngineState::starting_at(now());

        let (decision, next) = engine.evaluate(&reading(400.0, Trend::SingleUp), now(), state);
        let decision = decision.unwrap();
        assert_eq!(decision.message_key, MessageKey::TooHigh);
        assert_eq!(decision.body, "Glucose too high (400 \u{2191})");
        assert_eq!(next.last_notification_time, now());
    }

    #[test]
    fn test_too_high_falling_is_suppressed() {
        let (t, s) = (thresholds(), settings());
        let engine = NotificationEngine::new(&t, &s, GlucoseUnit::MgDl);
        let state = EngineState { last_notification_time: now() - Duration::hours(1) };

        let (decision, next) = engine.evaluate(&reading(400.0, Trend::DoubleDown), now(), state);
        assert!(decision.is_none());
        assert_eq!(next, state);
    }

    #[test]
    fn test_too_low_rising_is_suppressed() {
        let (t, s) = (thresholds(), settings());
        let engine = NotificationEngine::new(&t, &s, GlucoseUnit::MgDl);
        let state = EngineState { last_notification_time: now() - Duration::hours(1) };

        let (decision, next) = engine.evaluate(&reading(50.0, Trend::SingleUp), now(), state);
        assert!(decision.is_none());
        assert_eq!(next.last_notification_time, state.last_notification_time);
    }

    #[test]
    fn test_too_low_forty_five_up_is_throttled() {
        let (t, s) = (thresholds(), settings());
        let engine = NotificationEngine::new(&t, &s, GlucoseUnit::MgDl);
        let recent = EngineState { last_notification_time: now() - Duration::minutes(2) };
        let (decision, _) = engine.evaluate(&reading(50.0, Trend::FortyFiveUp), now(), recent);
        assert!(decision.is_none());

        // falling too low ignores the throttle
        let (decision, next) = engine.evaluate(&reading(50.0, Trend::SingleDown), now(), recent);
        assert_eq!(decision.unwrap().message_key, MessageKey::TooLow);
        assert_eq!(next.last_notification_time, now());
    }

    #[test]
    fn test_high_band_variants() {
        let (t, s) = (thresholds(), settings());
        let engine = NotificationEngine::new(&t, &s, GlucoseUnit::MgDl);
        let state = EngineState { last_notification_time: now() - Duration::minutes(1) };

        let (d, next) = engine.evaluate(&reading(200.0, Trend::DoubleUp), now(), state);
        assert_eq!(d.unwrap().message_key, MessageKey::SoonTooHigh);
        assert_eq!(next, state);

        let (d, _) = engine.evaluate(&reading(200.0, Trend::Flat), now(), state);
        assert_eq!(d.unwrap().message_key, MessageKey::High);

        let (d, _) = engine.evaluate(&reading(150.0, Trend::SingleUp), now(), state);
        assert_eq!(d.unwrap().message_key, MessageKey::SoonHigh);

        let (d, _) = engine.evaluate(&reading(150.0, Trend::FortyFiveUp), now(), state);
        assert_eq!(d.unwrap().message_key, MessageKey::ABitHigh);
    }

    #[test]
    fn test_low_band_variants() {
        let (t, s) = (thresholds(), settings());
        let engine = NotificationEngine::new(&t, &s, GlucoseUnit::MgDl);
        let state = EngineState::starting_at(now());

        let (d, next) = engine.evaluate(&reading(68.0, Trend::SingleDown), now(), state);
        assert_eq!(d.unwrap().message_key, MessageKey::SoonLow);
        assert_eq!(next, state);

        let (d, _) = engine.evaluate(&reading(68.0, Trend::Flat), now(), state);
        assert_eq!(d.unwrap().message_key, MessageKey::ABitLow);

        let (d, _) = engine.evaluate(&reading(60.0, Trend::DoubleDown), now(), state);
        assert_eq!(d.unwrap().message_key, MessageKey::SoonTooLow);

        let (d, _) = engine.evaluate(&reading(60.0, Trend::FortyFiveUp), now(), state);
        assert_eq!(d.unwrap().message_key, MessageKey::Low);
    }

    #[test]
    fn test_disabled_band_and_normal_emit_nothing() {
        let t = thresholds();
        let s = NotificationSettings { show_high: false, show_acceptable_low: false, ..settings() };
        let engine = NotificationEngine::new(&t, &s, GlucoseUnit::MgDl);
        let state = EngineState::starting_at(now());

        assert!(engine.evaluate(&reading(200.0, Trend::Flat), now(), state).0.is_none());
        assert!(engine.evaluate(&reading(68.0, Trend::Flat), now(), state).0.is_none());
        assert!(engine.evaluate(&reading(100.0, Trend::DoubleUp), now(), state).0.is_none());
    }

    #[test]
    fn test_sound_flag_follows_band() {
        let t = thresholds();
        let s = NotificationSettings { sound_acceptable_high: true, ..settings() };
        let engine = NotificationEngine::new(&t, &s, GlucoseUnit::MgDl);
        let state = EngineState::starting_at(now());

        assert!(engine.evaluate(&reading(150.0, Trend::Flat), now(), state).0.unwrap().play_sound);
        assert!(!engine.evaluate(&reading(200.0, Trend::Flat), now(), state).0.unwrap().play_sound);
    }

    #[test]
    fn test_body_uses_display_unit() {
        let (t, s) = (thresholds(), settings());
        let engine = NotificationEngine::new(&t, &s, GlucoseUnit::MmolL);
        let state = EngineState::starting_at(now());

        let (d, _) = engine.evaluate(&reading(200.0, Trend::Flat), now(), state);
        assert_eq!(d.unwrap().body, "Glucose high (11.1 \u{2192})");
    }

    fn last_three(values: [f64; 3], trends: [Trend; 3]) -> Vec<Sample> {
        values
            .iter()
            .zip(trends.iter())
            .enumerate()
            .map(|(i, (&v, &tr))| Sample::new(v, now() - Duration::minutes(5 * i as i64), tr).unwrap())
            .collect()
    }

    #[test]
    fn test_prediction_soon_too_low() {
        let (t, s) = (thresholds(), settings());
        let engine = NotificationEngine::new(&t, &s, GlucoseUnit::MgDl);
        let trends = [Trend::SingleDown, Trend::SingleDown, Trend::DoubleDown];

        let advisory = engine.predict(&last_three([60.0, 70.0, 80.0], trends)).unwrap();
        assert_eq!(advisory.message_key, MessageKey::PredictionTooLow);
        assert!(advisory.play_sound);

        // above min_acceptable
        assert!(engine.predict(&last_three([68.0, 75.0, 85.0], trends)).is_none());
        assert!(engine.predict(&last_three([90.0, 95.0, 100.0], trends)).is_none());
        // not all three falling
        let mixed = [Trend::SingleDown, Trend::FortyFiveDown, Trend::DoubleDown];
        assert!(engine.predict(&last_three([60.0, 70.0, 80.0], mixed)).is_none());
    }

    #[test]
    fn test_prediction_soon_too_high() {
        let (t, s) = (thresholds(), settings());
        let engine = NotificationEngine::new(&t, &s, GlucoseUnit::MgDl);
        let rising = [Trend::SingleUp, Trend::DoubleUp, Trend::SingleUp];

        let advisory = engine.predict(&last_three([300.0, 280.0, 260.0], rising)).unwrap();
        assert_eq!(advisory.message_key, MessageKey::PredictionTooHigh);

        assert!(engine.predict(&last_three([200.0, 190.0, 180.0], rising)).is_none());
        assert!(engine.predict(&last_three([360.0, 340.0, 320.0], rising)).is_none());
    }

    #[test]
    fn test_prediction_needs_three_samples() {
        let (t, s) = (thresholds(), settings());
        let engine = NotificationEngine::new(&t, &s, GlucoseUnit::MgDl);
        assert!(engine.predict(&[reading(60.0, Trend::DoubleDown)]).is_none());
    }

    #[test]
    fn test_engine_state_file() {
        let dir = std::env::temp_dir().join(format!("glucowatch-state-{}", std::process::id()));
        fs::create_dir_all(&dir).unwrap();
        let path = dir.join("state.json");
        let later = now() + Duration::hours(1);

        // missing file
        assert_eq!(EngineState::load(&path, later), EngineState::starting_at(later));

        EngineState::starting_at(now()).save(&path).unwrap();
        assert_eq!(EngineState::load(&path, later).last_notification_time, now());

        fs::write(&path, "{ not json").unwrap();
        assert_eq!(EngineState::load(&path, later), EngineState::starting_at(later));

        fs::remove_dir_all(&dir).unwrap();
    }
}
