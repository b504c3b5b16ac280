//! Device-reported glucose trend

use serde::{Deserialize, Serialize};

/// Short-term direction of the glucose value as reported by the sensor
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Trend {
    Flat,
    SingleUp,
    DoubleUp,
    DoubleDown,
    SingleDown,
    FortyFiveDown,
    FortyFiveUp,
    #[default]
    None,
}

impl Trend {
    const ALL: [Trend; 8] = [
        Trend::Flat,
        Trend::SingleUp,
        Trend::DoubleUp,
        Trend::DoubleDown,
        Trend::SingleDown,
        Trend::FortyFiveDown,
        Trend::FortyFiveUp,
        Trend::None,
    ];

    /// Textual key used by Nightscout's `direction` field
    pub fn text_key(self) -> &'static str {
        match self {
            Trend::Flat => "Flat",
            Trend::SingleUp => "SingleUp",
            Trend::DoubleUp => "DoubleUp",
            Trend::DoubleDown => "DoubleDown",
            Trend::SingleDown => "SingleDown",
            Trend::FortyFiveDown => "FortyFiveDown",
            Trend::FortyFiveUp => "FortyFiveUp",
            Trend::None => "",
        }
    }

    /// Numeric key used by the `trend` field
    pub fn key(self) -> u8 {
        match self {
            Trend::Flat => 0,
            Trend::SingleUp => 1,
            Trend::DoubleUp => 2,
            Trend::DoubleDown => 3,
            Trend::SingleDown => 4,
            Trend::FortyFiveDown => 5,
            Trend::FortyFiveUp => 6,
            Trend::None => 7,
        }
    }

    pub fn symbol(self) -> &'static str {
        match self {
            Trend::Flat => "\u{2192}",
            Trend::SingleUp => "\u{2191}",
            Trend::DoubleUp => "\u{2191}\u{2191}",
            Trend::DoubleDown => "\u{2193}\u{2193}",
            Trend::SingleDown => "\u{2193}",
            Trend::FortyFiveDown => "\u{2198}",
            Trend::FortyFiveUp => "\u{2197}",
            Trend::None => "",
        }
    }

    /// SingleUp or DoubleUp
    pub fn is_rising(self) -> bool {
        matches!(self, Trend::SingleUp | Trend::DoubleUp)
    }

    /// SingleDown or DoubleDown
    pub fn is_falling(self) -> bool {
        matches!(self, Trend::SingleDown | Trend::DoubleDown)
    }

    /// Parse either the textual key (case-insensitive) or the numeric key.
    /// Anything unrecognised maps to `Trend::None`.
    pub fn from_text(text: &str) -> Trend {
        let text = text.trim();
        if text.is_empty() {
            return Trend::None;
        }
        Self::ALL
            .iter()
            .copied()
            .find(|t| t.text_key().eq_ignore_ascii_case(text))
            .or_else(|| Self::ALL.iter().copied().find(|t| t.key().to_string() == text))
            .unwrap_or(Trend::None)
    }
}
