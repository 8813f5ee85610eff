// src/patterns/combo.rs
// Pin bar + engulfing on the same or adjacent candles.

use log::debug;
use serde::{Deserialize, Serialize};

use crate::patterns::{detect_engulfing_at, detect_pin_bar_at, PatternResult};
use crate::types::{Candle, PatternDirection, Zone};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ComboKind {
    /// Pin on N-1, engulfing on N
    PinThenEngulf,
    /// Candle N is both
    SameCandle,
    /// Pin on N-2, engulfing on N-1, N continues
    PinEngulfContinuation,
}

impl ComboKind {
    pub fn bonus(self) -> i32 {
        match self {
            ComboKind::PinThenEngulf => 2,
            ComboKind::SameCandle => 3,
            ComboKind::PinEngulfContinuation => 1,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ComboResult {
    pub kind: ComboKind,
    pub direction: PatternDirection,
    pub pin: PatternResult,
    pub engulf: PatternResult,
    pub combo_bonus: i32,
    /// pin.score + engulf.score + combo_bonus
    pub score: i32,
    pub entry_price: f64,
    pub stop_loss: f64,
}

impl ComboResult {
    fn new(kind: ComboKind, pin: PatternResult, engulf: PatternResult, entry_price: f64) -> Self {
        let combo_bonus = kind.bonus();
        let stop_loss = match pin.direction {
            PatternDirection::Bullish => pin.stop_loss.min(engulf.stop_loss),
            _ => pin.stop_loss.max(engulf.stop_loss),
        };
        Self {
            kind,
            direction: pin.direction,
            score: pin.score + engulf.score + combo_bonus,
            combo_bonus,
            pin,
            engulf,
            entry_price,
            stop_loss,
        }
    }
}

/// First matching scenario in order: pin-then-engulf, same candle, continuation.
/// Only returned when the combo points the zone's way.
pub fn detect_pin_engulf_combo(zone: &Zone, candles: &[Candle]) -> Option<ComboResult> {
    let n = candles.len().checked_sub(1)?;
    let bias = zone.zone_type.expected_bias();

    let combo = pin_then_engulf(candles, n)
        .or_else(|| same_candle(candles, n))
        .or_else(|| continuation(candles, n))?;

    if combo.direction != bias {
        debug!("[COMBO] {:?} combo is {:?}, zone {} wants {:?}", combo.kind, combo.direction, zone.id, bias);
        return None;
    }
    Some(combo)
}

fn pin_then_engulf(candles: &[Candle], n: usize) -> Option<ComboResult> {
    let pin = detect_pin_bar_at(candles, n.checked_sub(1)?)?;
    let engulf = detect_engulfing_at(candles, n)?;
    (pin.result.direction == engulf.result.direction)
        .then(|| ComboResult::new(ComboKind::PinThenEngulf, pin.result, engulf.result, candles[n].close))
}

fn same_candle(candles: &[Candle], n: usize) -> Option<ComboResult> {
    let pin = detect_pin_bar_at(candles, n)?;
    let engulf = detect_engulfing_at(candles, n)?;
    (pin.result.direction == engulf.result.direction)
        .then(|| ComboResult::new(ComboKind::SameCandle, pin.result, engulf.result, candles[n].close))
}

fn continuation(candles: &[Candle], n: usize) -> Option<ComboResult> {
    let pin = detect_pin_bar_at(candles, n.checked_sub(2)?)?;
    let engulf = detect_engulfing_at(candles, n - 1)?;
    if pin.result.direction != engulf.result.direction {
        return None;
    }
    let last = &candles[n];
    let previous_close = candles[n - 1].close;
    let continued = match pin.result.direction {
        PatternDirection::Bullish => last.close > previous_close,
        _ => last.close < previous_close,
    };
    continued.then(|| ComboResult::new(ComboKind::PinEngulfContinuation, pin.result, engulf.result, last.close))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::test_support::*;

    fn bearish_pin_candle(minute: i64) -> Candle {
        // small bullish body, long upper wick
        candle_at(minute, 100.0, 104.0, 99.9, 100.2)
    }

    #[test]
    fn test_pin_then_engulf_scores_with_bonus_two() {
        let zone = demand_zone(100.0, 95.0);
        let candles = vec![
            // bullish pin with a small bearish body
            candle_at(0, 100.2, 100.3, 96.0, 100.0),
            // bullish engulfing of that body
            candle_at(1, 99.9, 101.5, 99.8, 101.4),
        ];

        let combo = detect_pin_engulf_combo(&zone, &candles).unwrap();
        assert_eq!(combo.kind, ComboKind::PinThenEngulf);
        assert_eq!(combo.combo_bonus, 2);
        assert_eq!(combo.score, combo.pin.score + combo.engulf.score + combo.combo_bonus);
        assert_eq!(combo.stop_loss, 96.0);
    }

    #[test]
    fn test_same_candle_combo_bonus_three() {
        let zone = demand_zone(100.0, 95.0);
        let candles = vec![
            candle_at(0, 101.0, 101.2, 100.4, 100.5),
            candle_at(1, 100.4, 101.3, 96.0, 101.2),
        ];

        let combo = detect_pin_engulf_combo(&zone, &candles).unwrap();
        assert_eq!(combo.kind, ComboKind::SameCandle);
        assert_eq!(combo.combo_bonus, 3);
        assert_eq!(combo.score, combo.pin.score + combo.engulf.score + 3);
    }

    #[test]
    fn test_continuation_combo_for_supply() {
        let zone = supply_zone(100.0, 105.0);
        let candles = vec![
            candle_at(0, 99.5, 99.8, 99.0, 99.7),
            bearish_pin_candle(1),
            // bearish engulfing of the pin's body, not itself a pin
            candle_at(2, 100.3, 100.5, 98.4, 98.5),
            // continues lower
            candle_at(3, 98.5, 98.7, 97.5, 97.8),
        ];

        let combo = detect_pin_engulf_combo(&zone, &candles).unwrap();
        assert_eq!(combo.kind, ComboKind::PinEngulfContinuation);
        assert_eq!(combo.direction, PatternDirection::Bearish);
        assert_eq!(combo.combo_bonus, 1);
        assert_eq!(combo.score, combo.pin.score + combo.engulf.score + 1);
        assert_eq!(combo.stop_loss, 104.0);
    }

    #[test]
    fn test_combo_against_zone_bias_is_dropped() {
        let zone = supply_zone(100.0, 105.0);
        let candles = vec![
            candle_at(0, 101.0, 101.2, 100.4, 100.5),
            candle_at(1, 100.4, 101.3, 96.0, 101.2),
        ];
        assert!(detect_pin_engulf_combo(&zone, &candles).is_none());
    }

    #[test]
    fn test_single_candle_yields_nothing() {
        let zone = demand_zone(100.0, 95.0);
        assert!(detect_pin_engulf_combo(&zone, &[candle_at(0, 100.2, 100.3, 96.0, 100.0)]).is_none());
    }
}
