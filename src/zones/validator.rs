// src/zones/validator.rs
// Look-right validation: has price already broken through the zone since it formed?

use log::debug;
use serde::{Deserialize, Serialize};

use crate::config::{DEFAULT_MIN_CLOSES_BEYOND, DEFAULT_TOLERANCE_PERCENT};
use crate::errors::Result;
use crate::types::{Candle, Zone, ZoneType};

const CONFIDENCE_PER_CLOSE: f64 = 0.3;
const CONFIDENCE_PER_EXTRA_WICK: f64 = 0.1;
const FREE_WICKS: u32 = 2;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ZoneStatus {
    Fresh,
    Tested,
    Broken,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidationResult {
    pub is_valid: bool,
    pub status: ZoneStatus,
    pub confidence: f64,
    pub closes_beyond_zone: u32,
    pub wicks_beyond_zone: u32,
    /// Deepest wick beyond the invalidation edge, as a percent of zone width
    pub max_penetration_percent: f64,
}

impl ValidationResult {
    fn already_broken() -> Self {
        Self {
            is_valid: false,
            status: ZoneStatus::Broken,
            confidence: 0.0,
            closes_beyond_zone: 0,
            wicks_beyond_zone: 0,
            max_penetration_percent: 0.0,
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct ZoneValidator {
    pub tolerance_percent: f64,
    pub min_closes_beyond: u32,
}

impl Default for ZoneValidator {
    fn default() -> Self {
        Self {
            tolerance_percent: DEFAULT_TOLERANCE_PERCENT,
            min_closes_beyond: DEFAULT_MIN_CLOSES_BEYOND,
        }
    }
}

impl ZoneValidator {
    pub fn new(tolerance_percent: f64, min_closes_beyond: u32) -> Self {
        Self { tolerance_percent, min_closes_beyond }
    }

    /// Close past the invalidation edge by more than the tolerance band.
    pub fn closed_beyond(&self, zone: &Zone, candle: &Candle) -> bool {
        let tolerance = zone.width() * self.tolerance_percent / 100.0;
        match zone.zone_type {
            ZoneType::Supply => candle.close > zone.zone_high() + tolerance,
            ZoneType::Demand => candle.close < zone.zone_low() - tolerance,
        }
    }

    /// Re-derives the zone status from the candles formed after it. Stateless: a zone that
    /// validated BROKEN once must be kept broken by the caller (`Zone::is_broken`).
    pub fn validate(&self, zone: &Zone, candles_after_zone: &[Candle]) -> Result<ValidationResult> {
        if zone.is_broken {
            return Ok(ValidationResult::already_broken());
        }

        let zone_high = zone.zone_high();
        let zone_low = zone.zone_low();
        let width = zone.width();

        let mut closes_beyond_zone = 0u32;
        let mut wicks_beyond_zone = 0u32;
        let mut max_penetration = 0.0f64;

        for candle in candles_after_zone {
            candle.validate()?;

            let penetration = match zone.zone_type {
                ZoneType::Supply => candle.high - zone_high,
                ZoneType::Demand => zone_low - candle.low,
            };

            if self.closed_beyond(zone, candle) {
                closes_beyond_zone += 1;
            }
            if penetration > 0.0 {
                wicks_beyond_zone += 1;
                max_penetration = max_penetration.max(penetration);
            }
        }

        let is_valid = closes_beyond_zone < self.min_closes_beyond;
        let confidence = (1.0
            - CONFIDENCE_PER_CLOSE * closes_beyond_zone as f64
            - CONFIDENCE_PER_EXTRA_WICK * wicks_beyond_zone.saturating_sub(FREE_WICKS) as f64)
            .max(0.0);

        let status = if !is_valid {
            ZoneStatus::Broken
        } else if wicks_beyond_zone > 0 {
            ZoneStatus::Tested
        } else {
            ZoneStatus::Fresh
        };

        let max_penetration_percent = if width > 0.0 {
            max_penetration / width * 100.0
        } else {
            0.0
        };

        debug!(
            "[VALIDATE] Zone {} {:?}: closes_beyond={}, wicks_beyond={}, confidence={:.2}",
            zone.id, status, closes_beyond_zone, wicks_beyond_zone, confidence
        );

        Ok(ValidationResult {
            is_valid,
            status,
            confidence,
            closes_beyond_zone,
            wicks_beyond_zone,
            max_penetration_percent,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::test_support::*;

    #[test]
    fn test_supply_zone_stays_fresh_within_tolerance() {
        let zone = supply_zone(100.0, 105.0);
        let candles = vec![
            candle_at(0, 101.0, 104.0, 100.5, 103.0),
            candle_at(1, 103.0, 104.5, 102.0, 104.0),
            candle_at(2, 104.0, 105.0, 103.5, 105.0),
        ];

        let result = ZoneValidator::default().validate(&zone, &candles).unwrap();
        assert!(result.is_valid);
        assert_eq!(result.status, ZoneStatus::Fresh);
        assert_eq!(result.closes_beyond_zone, 0);
        assert_eq!(result.confidence, 1.0);
    }

    #[test]
    fn test_close_inside_tolerance_is_tested_not_broken() {
        let zone = supply_zone(100.0, 105.0);
        let candles = vec![candle_at(0, 104.0, 105.02, 103.5, 105.02)];

        let result = ZoneValidator::default().validate(&zone, &candles).unwrap();
        assert!(result.is_valid);
        assert_eq!(result.closes_beyond_zone, 0);
        assert_eq!(result.status, ZoneStatus::Tested);
        assert_eq!(result.wicks_beyond_zone, 1);
        assert!((result.max_penetration_percent - 0.4).abs() < 1e-9);
    }

    #[test]
    fn test_two_closes_beyond_break_supply_zone() {
        let zone = supply_zone(100.0, 105.0);
        let candles = vec![
            candle_at(0, 104.0, 106.5, 103.5, 106.0),
            candle_at(1, 106.0, 107.0, 105.5, 106.0),
        ];

        let result = ZoneValidator::default().validate(&zone, &candles).unwrap();
        assert!(!result.is_valid);
        assert_eq!(result.status, ZoneStatus::Broken);
        assert_eq!(result.closes_beyond_zone, 2);
        assert!((result.confidence - 0.4).abs() < 1e-9);
        assert!((result.max_penetration_percent - 40.0).abs() < 1e-9);
    }

    #[test]
    fn test_wick_only_marks_tested() {
        let zone = demand_zone(100.0, 95.0);
        let candles = vec![candle_at(0, 99.0, 99.5, 94.0, 98.0)];

        let result = ZoneValidator::default().validate(&zone, &candles).unwrap();
        assert!(result.is_valid);
        assert_eq!(result.status, ZoneStatus::Tested);
        assert_eq!(result.wicks_beyond_zone, 1);
        assert_eq!(result.confidence, 1.0);
    }

    #[test]
    fn test_confidence_drops_after_two_wicks() {
        let zone = demand_zone(100.0, 95.0);
        let candles: Vec<Candle> = (0..4).map(|i| candle_at(i, 99.0, 99.5, 94.0, 98.0)).collect();

        let result = ZoneValidator::default().validate(&zone, &candles).unwrap();
        assert!((result.confidence - 0.8).abs() < 1e-9);
    }

    #[test]
    fn test_broken_is_terminal_regardless_of_later_candles() {
        let zone = supply_zone(100.0, 105.0);
        let mut candles = vec![
            candle_at(0, 104.0, 106.5, 103.5, 106.0),
            candle_at(1, 106.0, 107.0, 105.5, 106.0),
        ];
        candles.extend((2..10).map(|i| candle_at(i, 101.0, 102.0, 100.0, 101.0)));

        let result = ZoneValidator::default().validate(&zone, &candles).unwrap();
        assert!(!result.is_valid);
    }

    #[test]
    fn test_validation_is_idempotent() {
        let zone = supply_zone(100.0, 105.0);
        let candles = vec![
            candle_at(0, 104.0, 105.8, 103.5, 104.2),
            candle_at(1, 104.2, 106.0, 103.0, 105.5),
        ];
        let validator = ZoneValidator::default();
        assert_eq!(
            validator.validate(&zone, &candles).unwrap(),
            validator.validate(&zone, &candles).unwrap()
        );
    }

    #[test]
    fn test_flagged_zone_never_revalidates() {
        let mut zone = supply_zone(100.0, 105.0);
        zone.is_broken = true;
        let result = ZoneValidator::default().validate(&zone, &[]).unwrap();
        assert_eq!(result.status, ZoneStatus::Broken);
        assert!(!result.is_valid);
    }

    #[test]
    fn test_invalid_candle_aborts() {
        let zone = supply_zone(100.0, 105.0);
        let bad = Candle { open: 101.0, high: 100.0, low: 102.0, close: 101.0, timestamp: ts(0) };
        assert!(ZoneValidator::default().validate(&zone, &[bad]).is_err());
    }
}
