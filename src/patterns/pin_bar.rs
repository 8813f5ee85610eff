// src/patterns/pin_bar.rs
use serde::{Deserialize, Serialize};

use crate::patterns::{PatternKind, PatternRecognizer, PatternResult, PatternStrength};
use crate::types::{Candle, PatternDirection};

const MAX_BODY_RATIO: f64 = 0.35;
const MIN_WICK_TO_BODY: f64 = 2.0;
const MAX_OPPOSITE_WICK_RATIO: f64 = 0.25;
const EXCELLENT_WICK_RATIO: f64 = 3.0;
const GOOD_WICK_RATIO: f64 = 2.5;
const TREND_CONTEXT_CANDLES: usize = 3;
const TREND_CONTEXT_BONUS: i32 = 1;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PinBarQuality {
    Excellent,
    Good,
    Moderate,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PinBarSignal {
    pub result: PatternResult,
    pub quality: PinBarQuality,
    /// Rejection wick divided by body; infinite for a zero body
    pub wick_to_body: f64,
    pub body_percent: f64,
    /// Hammer or shooting star: prior trend ran against the pin
    pub has_trend_context: bool,
}

pub struct PinBarRecognizer;

impl PatternRecognizer for PinBarRecognizer {
    fn min_candles(&self) -> usize {
        1
    }

    fn detect(&self, candles: &[Candle]) -> Option<PatternResult> {
        detect_pin_bar(candles).map(|s| s.result)
    }
}

pub fn detect_pin_bar(candles: &[Candle]) -> Option<PinBarSignal> {
    detect_pin_bar_at(candles, candles.len().checked_sub(1)?)
}

/// Pin bar on `candles[index]`; the three candles before it decide hammer/shooting star.
pub fn detect_pin_bar_at(candles: &[Candle], index: usize) -> Option<PinBarSignal> {
    let candle = candles.get(index)?;
    let range = candle.range();
    if range <= 0.0 {
        return None;
    }

    let body = candle.body();
    if body > range * MAX_BODY_RATIO {
        return None;
    }

    let lower = candle.lower_wick();
    let upper = candle.upper_wick();
    let max_opposite = range * MAX_OPPOSITE_WICK_RATIO;

    let (direction, rejection_wick) = if lower >= MIN_WICK_TO_BODY * body && upper <= max_opposite {
        (PatternDirection::Bullish, lower)
    } else if upper >= MIN_WICK_TO_BODY * body && lower <= max_opposite {
        (PatternDirection::Bearish, upper)
    } else {
        return None;
    };

    let wick_to_body = if body > 0.0 { rejection_wick / body } else { f64::INFINITY };
    let (quality, strength, base_score) = if wick_to_body >= EXCELLENT_WICK_RATIO {
        (PinBarQuality::Excellent, PatternStrength::Strong, 3)
    } else if wick_to_body >= GOOD_WICK_RATIO {
        (PinBarQuality::Good, PatternStrength::Moderate, 2)
    } else {
        (PinBarQuality::Moderate, PatternStrength::Weak, 1)
    };

    let has_trend_context = index >= TREND_CONTEXT_CANDLES
        && candles[index - TREND_CONTEXT_CANDLES..index].iter().all(|c| match direction {
            PatternDirection::Bullish => c.is_bearish(),
            _ => c.is_bullish(),
        });

    let pattern_id = match (direction, has_trend_context) {
        (PatternDirection::Bullish, true) => PatternKind::Hammer,
        (PatternDirection::Bullish, false) => PatternKind::BullishPinBar,
        (_, true) => PatternKind::ShootingStar,
        (_, false) => PatternKind::BearishPinBar,
    };
    let score = base_score + if has_trend_context { TREND_CONTEXT_BONUS } else { 0 };

    let stop_loss = match direction {
        PatternDirection::Bullish => candle.low,
        _ => candle.high,
    };

    Some(PinBarSignal {
        result: PatternResult {
            pattern_id,
            direction,
            score,
            strength,
            entry_price: candle.close,
            stop_loss,
            detected_at: candle.timestamp,
        },
        quality,
        wick_to_body,
        body_percent: body / range * 100.0,
        has_trend_context,
    })
}
