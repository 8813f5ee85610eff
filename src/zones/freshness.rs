// src/zones/freshness.rs
// First-Time-Back tracking: how often a zone has been revisited and how good the current price is.

use log::debug;
use serde::{Deserialize, Serialize};

use crate::types::{Candle, Zone, ZoneType};
use crate::zones::validator::ZoneValidator;

const EXCELLENT_DISTANCE_PERCENT: f64 = 0.5;
const GOOD_DISTANCE_PERCENT: f64 = 1.0;

/// Win-rate multipliers for test counts 0, 1, 2 and 3+
pub const WIN_RATE_MODIFIERS: [f64; 4] = [1.0, 0.9, 0.75, 0.5];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FtbQuality {
    Perfect,
    Excellent,
    Good,
    Tested,
    None,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FtbStatus {
    pub is_ftb: bool,
    pub in_zone: bool,
    pub distance_percent: f64,
    pub quality: FtbQuality,
    pub stars: u8,
    pub win_rate_modifier: f64,
}

pub fn check_ftb_status(zone: &Zone, current_price: f64, test_count: u32) -> FtbStatus {
    let in_zone = zone.contains(current_price);
    let distance_percent = if current_price > 0.0 {
        zone.distance_to(current_price) / current_price * 100.0
    } else {
        f64::INFINITY
    };

    let quality = match (test_count, in_zone) {
        (0, true) => FtbQuality::Perfect,
        (0, false) if distance_percent < EXCELLENT_DISTANCE_PERCENT => FtbQuality::Excellent,
        (0, false) if distance_percent < GOOD_DISTANCE_PERCENT => FtbQuality::Good,
        (n, true) if n > 0 => FtbQuality::Tested,
        _ => FtbQuality::None,
    };

    FtbStatus {
        is_ftb: test_count == 0,
        in_zone,
        distance_percent,
        quality,
        stars: stars_for(test_count),
        win_rate_modifier: win_rate_modifier(test_count),
    }
}

pub fn stars_for(test_count: u32) -> u8 {
    match test_count {
        0 => 5,
        1 => 4,
        2 => 3,
        _ => 2,
    }
}

pub fn win_rate_modifier(test_count: u32) -> f64 {
    WIN_RATE_MODIFIERS[(test_count as usize).min(WIN_RATE_MODIFIERS.len() - 1)]
}

/// Counts touch events: runs of consecutive candles reaching the proximal line count once.
/// Stops once the zone breaks under the default validator rules.
pub fn count_touch_events(zone: &Zone, candles: &[Candle]) -> u32 {
    touch_events(zone, candles, &ZoneValidator::default()).0
}

/// Returns (events, whether the last event is still running on the final candle). Counting ends
/// on the candle that completes the break.
fn touch_events(zone: &Zone, candles: &[Candle], validator: &ZoneValidator) -> (u32, bool) {
    let proximal = zone.proximal_line();
    let mut touches = 0u32;
    let mut closes_beyond = 0u32;
    let mut was_touching = false;

    for candle in candles {
        if validator.closed_beyond(zone, candle) {
            closes_beyond += 1;
            if closes_beyond >= validator.min_closes_beyond {
                return (touches, false);
            }
        }

        let touching = match zone.zone_type {
            ZoneType::Supply => candle.high >= proximal,
            ZoneType::Demand => candle.low <= proximal,
        };
        if touching && !was_touching {
            touches += 1;
            debug!("[FTB] Zone {} touch #{} at {}", zone.id, touches, candle.timestamp);
        }
        was_touching = touching;
    }

    (touches, was_touching)
}

/// New zone version whose test count never goes backwards. A visit still in progress on the
/// latest candle is the current "first time back" and is not counted yet.
pub fn refresh_test_count(zone: &Zone, candles_after_formation: &[Candle]) -> Zone {
    refresh_test_count_with(zone, candles_after_formation, &ZoneValidator::default())
}

/// `refresh_test_count` with the break rules of a configured validator.
pub fn refresh_test_count_with(zone: &Zone, candles_after_formation: &[Candle], validator: &ZoneValidator) -> Zone {
    let (events, ongoing) = touch_events(zone, candles_after_formation, validator);
    let completed = if ongoing { events - 1 } else { events };
    let mut refreshed = zone.clone();
    refreshed.test_count = zone.test_count.max(completed);
    refreshed
}
