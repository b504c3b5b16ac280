//! Glucose units, threshold profile and band classification
//!
//! All values inside the crate are carried in mg/dL. mmol/L only exists at
//! the display boundary: `GlucoseUnit::to_display` converts a canonical
//! value for output, `GlucoseUnit::from_display` converts user input back.
//! Stored thresholds are never rewritten in the alternate unit.

use serde::{Deserialize, Serialize};

use crate::error::GlucoError;

/// 1 mg/dL expressed in mmol/L
pub const MMOL_PER_MGDL: f64 = 0.0555;

/// Glucose value in mg/dL (milligrams per deciliter)
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Serialize, Deserialize)]
pub struct MgDl(pub f64);

/// Glucose value in mmol/L (millimoles per liter)
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Serialize, Deserialize)]
pub struct MmolL(pub f64);

impl MgDl {
    /// Format the value with unit suffix
    pub fn format(self) -> String {
        format!("{:.0} mg/dL", self.0)
    }

    /// Format just the value without unit suffix
    pub fn format_value(self) -> String {
        format!("{:.0}", self.0)
    }

    pub fn unit_label() -> &'static str {
        "mg/dL"
    }
}

impl MmolL {
    /// Format the value with unit suffix
    pub fn format(self) -> String {
        format!("{:.1} mmol/L", self.0)
    }

    /// Format just the value without unit suffix
    pub fn format_value(self) -> String {
        format!("{:.1}", self.0)
    }

    pub fn unit_label() -> &'static str {
        "mmol/L"
    }
}

impl From<MgDl> for MmolL {
    fn from(value: MgDl) -> Self {
        MmolL(value.0 * MMOL_PER_MGDL)
    }
}

impl From<MmolL> for MgDl {
    fn from(value: MmolL) -> Self {
        MgDl(value.0 / MMOL_PER_MGDL)
    }
}

/// User's preferred display unit
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum GlucoseUnit {
    #[serde(rename = "mg/dL")]
    #[default]
    MgDl,
    #[serde(rename = "mmol/L")]
    MmolL,
}

impl GlucoseUnit {
    /// Convert a canonical mg/dL value into this unit
    pub fn to_display(self, mg_dl: f64) -> f64 {
        match self {
            GlucoseUnit::MgDl => mg_dl,
            GlucoseUnit::MmolL => MmolL::from(MgDl(mg_dl)).0,
        }
    }

    /// Convert a value given in this unit back to canonical mg/dL
    pub fn from_display(self, value: f64) -> f64 {
        match self {
            GlucoseUnit::MgDl => value,
            GlucoseUnit::MmolL => MgDl::from(MmolL(value)).0,
        }
    }

    /// Format a canonical value in this unit, with unit suffix
    pub fn format(self, mg_dl: f64) -> String {
        match self {
            GlucoseUnit::MgDl => MgDl(mg_dl).format(),
            GlucoseUnit::MmolL => MmolL::from(MgDl(mg_dl)).format(),
        }
    }

    /// Format a canonical value in this unit, without unit suffix
    pub fn format_value(self, mg_dl: f64) -> String {
        match self {
            GlucoseUnit::MgDl => MgDl(mg_dl).format_value(),
            GlucoseUnit::MmolL => MmolL::from(MgDl(mg_dl)).format_value(),
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            GlucoseUnit::MgDl => MgDl::unit_label(),
            GlucoseUnit::MmolL => MmolL::unit_label(),
        }
    }

    /// Parse the unit names used in the config file
    pub fn from_text(text: &str) -> Option<Self> {
        match text.trim().to_ascii_lowercase().as_str() {
            "mg/dl" | "mgdl" | "mg" => Some(GlucoseUnit::MgDl),
            "mmol/l" | "mmol" => Some(GlucoseUnit::MmolL),
            _ => None,
        }
    }
}

/// The six band boundaries, in mg/dL.
///
/// Must satisfy `min_critical < min_acceptable < min_normal < max_normal
/// < max_acceptable < max_critical`; see [`ThresholdProfile::validate`].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ThresholdProfile {
    pub min_critical: f64,
    pub min_acceptable: f64,
    pub min_normal: f64,
    pub max_normal: f64,
    pub max_acceptable: f64,
    pub max_critical: f64,
}

impl Default for ThresholdProfile {
    fn default() -> Self {
        Self {
            min_critical: 55.0,
            min_acceptable: 65.0,
            min_normal: 70.0,
            max_normal: 140.0,
            max_acceptable: 180.0,
            max_critical: 350.0,
        }
    }
}

impl ThresholdProfile {
    pub fn is_ordered(&self) -> bool {
        let bounds = [
            self.min_critical,
            self.min_acceptable,
            self.min_normal,
            self.max_normal,
            self.max_acceptable,
            self.max_critical,
        ];
        bounds.iter().all(|b| b.is_finite()) && bounds.windows(2).all(|w| w[0] < w[1])
    }

    /// Check the ordering invariant, reporting the whole profile on failure
    pub fn validate(&self) -> Result<(), GlucoError> {
        if self.is_ordered() {
            Ok(())
        } else {
            Err(GlucoError::InvalidThresholds {
                min_critical: self.min_critical,
                min_acceptable: self.min_acceptable,
                min_normal: self.min_normal,
                max_normal: self.max_normal,
                max_acceptable: self.max_acceptable,
                max_critical: self.max_critical,
            })
        }
    }

    /// Classify a canonical mg/dL value into one of the seven bands
    pub fn classify(&self, mg_dl: f64) -> Band {
        if mg_dl > self.max_critical {
            Band::TooHigh
        } else if mg_dl > self.max_acceptable {
            Band::High
        } else if mg_dl > self.max_normal {
            Band::AcceptableHigh
        } else if mg_dl > self.min_normal {
            Band::Normal
        } else if mg_dl > self.min_acceptable {
            Band::AcceptableLow
        } else if mg_dl > self.min_critical {
            Band::Low
        } else {
            Band::TooLow
        }
    }

    /// Get threshold display string for the user's unit
    pub fn format_range(&self, unit: GlucoseUnit) -> String {
        format!(
            "{}-{} {}",
            unit.format_value(self.min_normal),
            unit.format_value(self.max_normal),
            unit.label()
        )
    }
}

/// Classification of a glucose value against a [`ThresholdProfile`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Band {
    TooLow,
    Low,
    AcceptableLow,
    Normal,
    AcceptableHigh,
    High,
    TooHigh,
}

impl Band {
    pub fn label(self) -> &'static str {
        match self {
            Band::TooLow => "Too Low",
            Band::Low => "Low",
            Band::AcceptableLow => "Acceptable Low",
            Band::Normal => "Normal",
            Band::AcceptableHigh => "Acceptable High",
            Band::High => "High",
            Band::TooHigh => "Too High",
        }
    }

    /// Get a short status text
    pub fn status(self) -> &'static str {
        match self {
            Band::TooLow => "TOO LOW",
            Band::Low => "LOW",
            Band::AcceptableLow => "A BIT LOW",
            Band::Normal => "OK",
            Band::AcceptableHigh => "A BIT HIGH",
            Band::High => "HIGH",
            Band::TooHigh => "TOO HIGH",
        }
    }

    /// Traffic-light colour name for the presentation layer
    pub fn color(self) -> &'static str {
        match self {
            Band::TooLow | Band::TooHigh => "red",
            Band::Low | Band::High => "orange",
            Band::AcceptableLow | Band::AcceptableHigh => "yellow",
            Band::Normal => "green",
        }
    }
}
