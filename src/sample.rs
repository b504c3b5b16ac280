//! Glucose samples and Nightscout entry ingestion

use chrono::{DateTime, TimeZone, Utc};
use log::{debug, warn};
use serde::{Deserialize, Serialize};

use crate::error::GlucoError;
use crate::trend::Trend;

/// A single glucose reading, value in mg/dL
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Sample {
    #[serde(rename = "mg/dL")]
    pub value: f64,
    pub timestamp: DateTime<Utc>,
    pub trend: Trend,
}

impl Sample {
    /// Create a validated sample
    pub fn new(value: f64, timestamp: DateTime<Utc>, trend: Trend) -> Result<Self, GlucoError> {
        if !value.is_finite() || value < 0.0 {
            return Err(GlucoError::InvalidSample(format!(
                "value {} at {} is not a non-negative number",
                value, timestamp
            )));
        }
        Ok(Self { value, timestamp, trend })
    }

    pub fn epoch(&self) -> i64 {
        self.timestamp.timestamp()
    }
}

/// One element of a Nightscout `entries.json` array
#[derive(Debug, Deserialize)]
struct EntryDto {
    sgv: Option<f64>,
    /// Epoch milliseconds
    date: Option<i64>,
    trend: Option<serde_json::Value>,
    direction: Option<String>,
}

impl EntryDto {
    fn resolve_trend(&self) -> Trend {
        let trend = match &self.trend {
            Some(serde_json::Value::Number(n)) => Trend::from_text(&n.to_string()),
            Some(serde_json::Value::String(s)) => Trend::from_text(s),
            _ => Trend::None,
        };
        let direction = self.direction.as_deref().map(Trend::from_text).unwrap_or(Trend::None);

        // A usable direction overrides a disagreeing numeric trend
        if direction != Trend::None && direction != trend {
            direction
        } else {
            trend
        }
    }

    fn into_sample(self) -> Result<Sample, GlucoError> {
        let value = self
            .sgv
            .ok_or_else(|| GlucoError::InvalidSample("entry has no sgv".to_string()))?;
        let millis = self
            .date
            .ok_or_else(|| GlucoError::InvalidSample("entry has no date".to_string()))?;
        let timestamp = Utc
            .timestamp_millis_opt(millis)
            .single()
            .ok_or_else(|| GlucoError::InvalidSample(format!("date {} out of range", millis)))?;
        let trend = self.resolve_trend();
        Sample::new(value, timestamp, trend)
    }
}

/// Parse a Nightscout entries JSON array into samples.
///
/// Entries that cannot be turned into a valid sample are skipped with a
/// warning; a malformed document is an error.
pub fn parse_entries(json: &str) -> Result<Vec<Sample>, GlucoError> {
    let dtos: Vec<EntryDto> = serde_json::from_str(json)?;
    let total = dtos.len();

    let samples: Vec<Sample> = dtos
        .into_iter()
        .filter_map(|dto| match dto.into_sample() {
            Ok(sample) => Some(sample),
            Err(e) => {
                warn!("Skipping entry: {}", e);
                None
            }
        })
        .collect();

    debug!("Parsed {} of {} entries", samples.len(), total);
    Ok(samples)
}
