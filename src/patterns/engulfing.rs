// src/patterns/engulfing.rs
use serde::{Deserialize, Serialize};

use crate::patterns::{PatternKind, PatternRecognizer, PatternResult, PatternStrength};
use crate::types::{Candle, PatternDirection};

const MIN_ENGULF_RATIO: f64 = 100.0;
const STRONG_RATIO: f64 = 150.0;
const MODERATE_RATIO: f64 = 120.0;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EngulfingSignal {
    pub result: PatternResult,
    /// Current body as a percent of the previous body
    pub engulf_ratio: f64,
}

pub struct EngulfingRecognizer;

impl PatternRecognizer for EngulfingRecognizer {
    fn min_candles(&self) -> usize {
        2
    }

    fn detect(&self, candles: &[Candle]) -> Option<PatternResult> {
        detect_engulfing(candles).map(|s| s.result)
    }
}

/// Engulfing on the last candle of the slice.
pub fn detect_engulfing(candles: &[Candle]) -> Option<EngulfingSignal> {
    detect_engulfing_at(candles, candles.len().checked_sub(1)?)
}

/// Engulfing on `candles[index]` against `candles[index - 1]`.
pub fn detect_engulfing_at(candles: &[Candle], index: usize) -> Option<EngulfingSignal> {
    if index == 0 {
        return None;
    }
    let prev = candles.get(index - 1)?;
    let curr = candles.get(index)?;

    let direction = if prev.is_bearish() && curr.is_bullish() {
        PatternDirection::Bullish
    } else if prev.is_bullish() && curr.is_bearish() {
        PatternDirection::Bearish
    } else {
        return None;
    };

    let contains = curr.body_low() <= prev.body_low() && curr.body_high() >= prev.body_high();
    if !contains {
        return None;
    }

    let engulf_ratio = curr.body() / prev.body() * 100.0;
    if engulf_ratio < MIN_ENGULF_RATIO {
        return None;
    }

    let (strength, score) = if engulf_ratio >= STRONG_RATIO {
        (PatternStrength::Strong, 4)
    } else if engulf_ratio >= MODERATE_RATIO {
        (PatternStrength::Moderate, 3)
    } else {
        (PatternStrength::Weak, 2)
    };

    let (pattern_id, stop_loss) = match direction {
        PatternDirection::Bullish => (PatternKind::BullishEngulfing, prev.low.min(curr.low)),
        _ => (PatternKind::BearishEngulfing, prev.high.max(curr.high)),
    };

    Some(EngulfingSignal {
        result: PatternResult {
            pattern_id,
            direction,
            score,
            strength,
            entry_price: curr.close,
            stop_loss,
            detected_at: curr.timestamp,
        },
        engulf_ratio,
    })
}
