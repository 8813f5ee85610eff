// src/zones/mpl.rs
// Most Penetrated Level: the sub-level of a zone that wicks pierce most often before closing back.

use log::debug;
use serde::{Deserialize, Serialize};

use crate::config::{DEFAULT_MPL_MIN_TOUCHES, DEFAULT_MPL_PRECISION};
use crate::types::{Candle, Zone, ZoneType};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MplQuality {
    Strong,
    Moderate,
    Weak,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MplResult {
    pub level: f64,
    pub level_index: usize,
    pub penetration_count: u32,
    pub touch_count: u32,
    pub average_penetrations: f64,
    pub ratio_to_average: f64,
    pub in_expected_half: bool,
    pub quality_score: f64,
    pub quality: MplQuality,
}

#[derive(Debug, Clone, Copy)]
pub struct MplCalculator {
    pub precision: usize,
    pub min_touches: usize,
}

impl Default for MplCalculator {
    fn default() -> Self {
        Self {
            precision: DEFAULT_MPL_PRECISION,
            min_touches: DEFAULT_MPL_MIN_TOUCHES,
        }
    }
}

struct LevelStats {
    level: f64,
    touches: u32,
    penetrations: u32,
}

impl MplCalculator {
    pub fn new(precision: usize, min_touches: usize) -> Self {
        Self { precision, min_touches }
    }

    pub fn calculate(&self, zone: &Zone, candles: &[Candle]) -> Option<MplResult> {
        let width = zone.width();
        if width <= 0.0 || self.precision < 2 {
            return None;
        }

        let zone_low = zone.zone_low();
        let step = width / (self.precision - 1) as f64;

        let stats: Vec<LevelStats> = (0..self.precision)
            .map(|i| {
                let level = zone_low + step * i as f64;
                let mut touches = 0u32;
                let mut penetrations = 0u32;
                for candle in candles.iter().filter(|c| c.overlaps(zone_low, zone.zone_high())) {
                    if candle.low <= level && level <= candle.high {
                        touches += 1;
                    }
                    let penetrated = match zone.zone_type {
                        ZoneType::Supply => candle.high > level && candle.close < level,
                        ZoneType::Demand => candle.low < level && candle.close > level,
                    };
                    if penetrated {
                        penetrations += 1;
                    }
                }
                LevelStats { level, touches, penetrations }
            })
            .collect();

        // Ties resolve to the lowest index
        let (best_index, best) = stats
            .iter()
            .enumerate()
            .fold(None::<(usize, &LevelStats)>, |acc, (i, s)| match acc {
                Some((_, b)) if b.penetrations >= s.penetrations => acc,
                _ => Some((i, s)),
            })?;

        if best.penetrations == 0 || (best.touches as usize) < self.min_touches {
            debug!(
                "[MPL] Zone {}: no qualifying level (best penetrations={}, touches={})",
                zone.id, best.penetrations, best.touches
            );
            return None;
        }

        let total: u32 = stats.iter().map(|s| s.penetrations).sum();
        let average_penetrations = total as f64 / stats.len() as f64;
        let ratio_to_average = best.penetrations as f64 / average_penetrations;

        let midpoint = zone.midpoint();
        let in_expected_half = match zone.zone_type {
            ZoneType::Supply => best.level >= midpoint,
            ZoneType::Demand => best.level <= midpoint,
        };

        let quality_score = (best.penetrations.min(5) as f64 / 5.0) * 40.0
            + (ratio_to_average.min(3.0) / 3.0) * 30.0
            + if in_expected_half { 30.0 } else { 0.0 };

        let quality = if quality_score >= 75.0 {
            MplQuality::Strong
        } else if quality_score >= 50.0 {
            MplQuality::Moderate
        } else {
            MplQuality::Weak
        };

        Some(MplResult {
            level: best.level,
            level_index: best_index,
            penetration_count: best.penetrations,
            touch_count: best.touches,
            average_penetrations,
            ratio_to_average,
            in_expected_half,
            quality_score,
            quality,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::test_support::*;

    #[test]
    fn test_zero_width_zone_has_no_mpl() {
        let zone = supply_zone(100.0, 100.0);
        let candles = vec![candle_at(0, 99.0, 101.0, 98.0, 99.5)];
        assert!(MplCalculator::default().calculate(&zone, &candles).is_none());
    }

    #[test]
    fn test_supply_mpl_in_upper_half() {
        // Zone 100..109, levels every 1.0
        let zone = supply_zone(100.0, 109.0);
        let candles = vec![
            candle_at(0, 101.0, 107.5, 100.5, 102.0),
            candle_at(1, 102.0, 107.2, 101.0, 103.0),
            candle_at(2, 103.0, 107.8, 102.0, 104.0),
        ];

        let mpl = MplCalculator::default().calculate(&zone, &candles).unwrap();
        // Levels 105..107 are each pierced three times; the lowest wins the tie
        assert!((mpl.level - 105.0).abs() < 1e-9);
        assert_eq!(mpl.penetration_count, 3);
        assert!(mpl.in_expected_half);
        assert!(mpl.touch_count >= 2);
        // 12 penetrations over 10 levels: ratio 3 / 1.2 = 2.5
        assert!((mpl.ratio_to_average - 2.5).abs() < 1e-9);
        // 3/5 * 40 + 2.5/3 * 30 + 30
        assert!((mpl.quality_score - 79.0).abs() < 1e-9);
        assert_eq!(mpl.quality, MplQuality::Strong);
    }

    #[test]
    fn test_mpl_outside_expected_half_is_moderate() {
        // Supply 100..109: wicks only reach the lower half
        let zone = supply_zone(100.0, 109.0);
        let candles: Vec<Candle> = (0..3).map(|i| candle_at(i, 101.0, 102.5, 100.2, 100.5)).collect();

        let mpl = MplCalculator::default().calculate(&zone, &candles).unwrap();
        assert!((mpl.level - 101.0).abs() < 1e-9);
        assert!(!mpl.in_expected_half);
        // 3/5 * 40 + capped ratio 30
        assert!((mpl.quality_score - 54.0).abs() < 1e-9);
        assert_eq!(mpl.quality, MplQuality::Moderate);
    }

    #[test]
    fn test_single_penetration_is_weak() {
        let zone = supply_zone(100.0, 109.0);
        let candles = vec![candle_at(0, 101.0, 102.5, 100.2, 100.5)];

        let mpl = MplCalculator::new(10, 1).calculate(&zone, &candles).unwrap();
        assert_eq!(mpl.penetration_count, 1);
        // 1/5 * 40 + 30
        assert!((mpl.quality_score - 38.0).abs() < 1e-9);
        assert_eq!(mpl.quality, MplQuality::Weak);
    }

    #[test]
    fn test_demand_mpl_prefers_deep_wicks() {
        // Zone 90..99, levels every 1.0
        let zone = demand_zone(99.0, 90.0);
        let candles = vec![
            candle_at(0, 98.0, 98.5, 91.5, 97.0),
            candle_at(1, 97.0, 97.5, 91.2, 96.5),
            candle_at(2, 96.0, 96.8, 91.8, 95.5),
        ];

        let mpl = MplCalculator::default().calculate(&zone, &candles).unwrap();
        assert_eq!(mpl.level_index, 2);
        assert!((mpl.level - 92.0).abs() < 1e-9);
        assert_eq!(mpl.penetration_count, 3);
        assert!(mpl.in_expected_half);
    }

    #[test]
    fn test_min_touches_enforced() {
        let zone = demand_zone(99.0, 90.0);
        let candles = vec![candle_at(0, 98.0, 98.5, 91.5, 97.0)];
        assert!(MplCalculator::default().calculate(&zone, &candles).is_none());
        assert!(MplCalculator::new(10, 1).calculate(&zone, &candles).is_some());
    }
}
