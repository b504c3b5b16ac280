//! Glucose monitoring analysis.
//!
//! Turns a history of continuous glucose samples into time-of-day
//! statistics, recurring pattern zones, short-term trend metrics and
//! threshold notifications. All values are handled in mg/dL and converted
//! to the display unit only when formatted.

pub mod config;
pub mod error;
pub mod history;
pub mod metrics;
pub mod notify;
pub mod sample;
pub mod stats;
pub mod storage;
pub mod trend;
pub mod units;
pub mod zones;

pub use error::GlucoError;
pub use history::{History, SharedHistory};
pub use sample::Sample;
pub use trend::Trend;
pub use units::{Band, GlucoseUnit, ThresholdProfile};
