// src/context/inducement.rs
// Liquidity sweeps: price runs the stops beyond a recent swing, then snaps back toward the zone.

use serde::{Deserialize, Serialize};

use crate::types::{Candle, Zone, ZoneType};

const WINDOW: usize = 20;
const SWEEP_LOOKBACK: usize = 5;
const MIN_CANDLES: usize = SWEEP_LOOKBACK + 1;
/// Two reference extremes within this share of zone width count as equal
const EQUAL_LEVEL_TOLERANCE: f64 = 0.1;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum InducementType {
    SwingLow,
    SwingHigh,
    EqualLows,
    EqualHighs,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InducementQuality {
    Strong,
    Moderate,
    Weak,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InducementResult {
    pub has_inducement: bool,
    pub inducement_type: Option<InducementType>,
    pub quality: Option<InducementQuality>,
    pub reversal_confirmed: bool,
    pub swept_level: Option<f64>,
}

impl InducementResult {
    fn none() -> Self {
        Self {
            has_inducement: false,
            inducement_type: None,
            quality: None,
            reversal_confirmed: false,
            swept_level: None,
        }
    }
}

pub trait InducementDetector: Send + Sync {
    /// `None` when there are too few candles to judge.
    fn detect_inducement(&self, zone: &Zone, candles: &[Candle]) -> Option<InducementResult>;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SweepInducementDetector;

impl InducementDetector for SweepInducementDetector {
    fn detect_inducement(&self, zone: &Zone, candles: &[Candle]) -> Option<InducementResult> {
        let window = &candles[candles.len().saturating_sub(WINDOW)..];
        if window.len() < MIN_CANDLES {
            return None;
        }

        let (reference, recent) = window.split_at(window.len() - SWEEP_LOOKBACK);
        let is_demand = zone.zone_type == ZoneType::Demand;

        let extreme = |c: &Candle| if is_demand { c.low } else { c.high };
        let level = if is_demand {
            reference.iter().map(extreme).fold(f64::MAX, f64::min)
        } else {
            reference.iter().map(extreme).fold(f64::MIN, f64::max)
        };

        // The swept liquidity has to sit between price and the zone
        let outside_zone = if is_demand { level > zone.zone_high() } else { level < zone.zone_low() };
        if !outside_zone {
            return Some(InducementResult::none());
        }

        let sweep = recent.iter().position(|c| {
            if is_demand {
                c.low < level && c.close > level
            } else {
                c.high > level && c.close < level
            }
        });
        let Some(sweep_idx) = sweep else {
            return Some(InducementResult::none());
        };
        let sweep_candle = &recent[sweep_idx];

        let tolerance = zone.width() * EQUAL_LEVEL_TOLERANCE;
        let equal_levels = reference.iter().filter(|c| (extreme(c) - level).abs() <= tolerance).count() >= 2;

        let reversal_confirmed = recent[sweep_idx + 1..].iter().any(|c| {
            if is_demand {
                c.close > sweep_candle.high
            } else {
                c.close < sweep_candle.low
            }
        });

        let inducement_type = match (is_demand, equal_levels) {
            (true, true) => InducementType::EqualLows,
            (true, false) => InducementType::SwingLow,
            (false, true) => InducementType::EqualHighs,
            (false, false) => InducementType::SwingHigh,
        };
        let quality = match (reversal_confirmed, equal_levels) {
            (true, true) => InducementQuality::Strong,
            (true, false) | (false, true) => InducementQuality::Moderate,
            (false, false) => InducementQuality::Weak,
        };

        Some(InducementResult {
            has_inducement: true,
            inducement_type: Some(inducement_type),
            quality: Some(quality),
            reversal_confirmed,
            swept_level: Some(level),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::test_support::*;

    fn base_window() -> Vec<Candle> {
        vec![
            candle_at(0, 105.0, 106.0, 104.0, 105.5),
            candle_at(1, 105.5, 106.5, 103.0, 104.0),
            candle_at(2, 104.0, 105.0, 103.05, 104.5),
            candle_at(3, 104.5, 106.0, 104.0, 105.0),
            candle_at(4, 105.0, 105.5, 104.2, 104.8),
        ]
    }

    #[test]
    fn test_equal_lows_sweep_with_reversal_is_strong() {
        let zone = demand_zone(100.0, 98.0);
        let mut candles = base_window();
        candles.push(candle_at(5, 104.8, 105.0, 102.5, 103.6)); // sweeps 103.0
        candles.push(candle_at(6, 103.6, 105.5, 103.5, 105.2)); // closes above sweep high
        candles.extend((7..10).map(|i| candle_at(i, 105.0, 105.4, 104.6, 105.1)));

        let result = SweepInducementDetector.detect_inducement(&zone, &candles).unwrap();
        assert!(result.has_inducement);
        assert_eq!(result.inducement_type, Some(InducementType::EqualLows));
        assert!(result.reversal_confirmed);
        assert_eq!(result.quality, Some(InducementQuality::Strong));
        assert_eq!(result.swept_level, Some(103.0));
    }

    #[test]
    fn test_sweep_without_reversal_is_weak_swing() {
        let zone = demand_zone(100.0, 98.0);
        let mut candles = base_window();
        candles[2] = candle_at(2, 104.0, 105.0, 103.8, 104.5);
        candles.push(candle_at(5, 104.8, 105.0, 102.5, 103.6));
        candles.extend((6..10).map(|i| candle_at(i, 103.6, 104.0, 103.2, 103.5)));

        let result = SweepInducementDetector.detect_inducement(&zone, &candles).unwrap();
        assert_eq!(result.inducement_type, Some(InducementType::SwingLow));
        assert!(!result.reversal_confirmed);
        assert_eq!(result.quality, Some(InducementQuality::Weak));
    }

    fn supply_window() -> Vec<Candle> {
        vec![
            candle_at(0, 105.0, 106.0, 104.0, 105.5),
            candle_at(1, 105.5, 107.0, 105.0, 106.0),
            candle_at(2, 106.0, 106.95, 105.5, 106.2),
            candle_at(3, 106.2, 106.5, 105.8, 106.0),
            candle_at(4, 106.0, 106.4, 105.6, 105.9),
            candle_at(5, 105.9, 107.5, 105.8, 106.4), // runs the highs at 107.0
            candle_at(6, 106.4, 106.5, 105.2, 105.5), // closes under the sweep low
            candle_at(7, 105.5, 105.8, 105.2, 105.6),
            candle_at(8, 105.6, 105.8, 105.2, 105.4),
            candle_at(9, 105.4, 105.7, 105.1, 105.3),
        ]
    }

    #[test]
    fn test_equal_highs_sweep_below_supply_is_strong() {
        let zone = supply_zone(110.0, 112.0);
        let result = SweepInducementDetector.detect_inducement(&zone, &supply_window()).unwrap();

        assert!(result.has_inducement);
        assert_eq!(result.inducement_type, Some(InducementType::EqualHighs));
        assert!(result.reversal_confirmed);
        assert_eq!(result.quality, Some(InducementQuality::Strong));
        assert_eq!(result.swept_level, Some(107.0));
    }

    #[test]
    fn test_single_swing_high_with_reversal_is_moderate() {
        let zone = supply_zone(110.0, 112.0);
        let mut candles = supply_window();
        candles[2] = candle_at(2, 106.0, 106.6, 105.5, 106.2);

        let result = SweepInducementDetector.detect_inducement(&zone, &candles).unwrap();
        assert_eq!(result.inducement_type, Some(InducementType::SwingHigh));
        assert!(result.reversal_confirmed);
        assert_eq!(result.quality, Some(InducementQuality::Moderate));
    }

    #[test]
    fn test_level_inside_zone_is_not_inducement() {
        let zone = demand_zone(104.0, 100.0);
        let mut candles = base_window();
        candles.extend((5..10).map(|i| candle_at(i, 104.0, 104.5, 102.0, 103.5)));

        let result = SweepInducementDetector.detect_inducement(&zone, &candles).unwrap();
        assert!(!result.has_inducement);
    }

    #[test]
    fn test_too_few_candles() {
        let zone = demand_zone(100.0, 98.0);
        assert!(SweepInducementDetector.detect_inducement(&zone, &base_window()).is_none());
    }
}
