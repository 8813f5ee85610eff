// src/patterns/mod.rs
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::types::{Candle, PatternDirection, Zone};

mod combo;
mod engulfing;
mod pin_bar;

pub use combo::{detect_pin_engulf_combo, ComboKind, ComboResult};
pub use engulfing::{detect_engulfing, detect_engulfing_at, EngulfingRecognizer, EngulfingSignal};
pub use pin_bar::{detect_pin_bar, detect_pin_bar_at, PinBarQuality, PinBarRecognizer, PinBarSignal};

// Trait for pattern recognizers. Each looks at the last candle of the slice.
pub trait PatternRecognizer {
    fn min_candles(&self) -> usize;
    fn detect(&self, candles: &[Candle]) -> Option<PatternResult>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PatternKind {
    BullishEngulfing,
    BearishEngulfing,
    BullishPinBar,
    BearishPinBar,
    Hammer,
    ShootingStar,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PatternStrength {
    Weak,
    Moderate,
    Strong,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PatternResult {
    pub pattern_id: PatternKind,
    #[serde(rename = "type")]
    pub direction: PatternDirection,
    pub score: i32,
    pub strength: PatternStrength,
    pub entry_price: f64,
    pub stop_loss: f64,
    pub detected_at: DateTime<Utc>,
}

/// Patterns on the latest candle that agree with the zone's bias.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConfirmationScan {
    pub patterns: Vec<PatternResult>,
    pub total_score: i32,
}

impl ConfirmationScan {
    pub fn is_empty(&self) -> bool {
        self.patterns.is_empty()
    }
}

pub fn scan_confirmation(zone: &Zone, candles: &[Candle]) -> ConfirmationScan {
    let bias = zone.zone_type.expected_bias();
    let recognizers: [&dyn PatternRecognizer; 2] = [&EngulfingRecognizer, &PinBarRecognizer];

    let patterns: Vec<PatternResult> = recognizers
        .iter()
        .filter(|r| candles.len() >= r.min_candles())
        .filter_map(|r| r.detect(candles))
        .filter(|p| p.direction == bias)
        .collect();
    let total_score = patterns.iter().map(|p| p.score).sum();

    ConfirmationScan { patterns, total_score }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::test_support::*;

    #[test]
    fn test_scan_sums_matching_patterns() {
        let zone = demand_zone(100.0, 95.0);
        // Bearish candle followed by a bullish engulfing candle with a long lower wick
        let candles = vec![
            candle_at(0, 101.0, 101.2, 100.4, 100.5),
            candle_at(1, 100.4, 101.3, 96.0, 101.2),
        ];

        let scan = scan_confirmation(&zone, &candles);
        assert!(scan.patterns.iter().any(|p| p.pattern_id == PatternKind::BullishEngulfing));
        assert_eq!(scan.total_score, scan.patterns.iter().map(|p| p.score).sum::<i32>());
        assert!(scan.total_score >= 4);
    }

    #[test]
    fn test_scan_skips_recognizers_without_enough_candles() {
        let zone = demand_zone(100.0, 95.0);
        let single = vec![candle_at(0, 99.8, 100.0, 90.0, 99.9)];

        let scan = scan_confirmation(&zone, &single);
        let kinds: Vec<PatternKind> = scan.patterns.iter().map(|p| p.pattern_id).collect();
        assert_eq!(kinds, vec![PatternKind::BullishPinBar]);
        assert_eq!(scan.total_score, 3);

        assert!(scan_confirmation(&zone, &[]).is_empty());
    }

    #[test]
    fn test_scan_ignores_opposite_bias() {
        let zone = supply_zone(100.0, 105.0);
        let candles = vec![
            candle_at(0, 110.0, 110.5, 107.5, 108.0),
            candle_at(1, 108.0, 112.5, 107.8, 112.0),
        ];
        assert!(scan_confirmation(&zone, &candles).is_empty());
    }
}
