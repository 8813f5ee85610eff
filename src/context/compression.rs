// src/context/compression.rs
// Contracting price action (triangles and wedges) running into a zone.

use log::debug;
use serde::{Deserialize, Serialize};

use crate::config::DEFAULT_COMPRESSION_WINDOW;
use crate::types::{Candle, Zone, ZoneType};

const CHUNK_SIZE: usize = 3;
const MIN_CHUNKS: usize = 2;
const MAX_COMPRESSION_RATIO: f64 = 0.5;
const TREND_MAJORITY: f64 = 0.6;
/// Steps smaller than this share of the first chunk's range count as flat
const FLAT_STEP_RATIO: f64 = 0.01;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CompressionType {
    DescendingTriangle,
    AscendingTriangle,
    DescendingWedge,
    AscendingWedge,
    Symmetrical,
    Undefined,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CompressionQuality {
    Excellent,
    Good,
    Moderate,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Trend {
    Ascending,
    Descending,
    Flat,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompressionResult {
    pub compression_type: CompressionType,
    /// Last chunk range over first chunk range
    pub compression_ratio: f64,
    pub waves: usize,
    pub highs_trend: Trend,
    pub lows_trend: Trend,
    pub chunk_ranges: Vec<f64>,
    pub quality: CompressionQuality,
    pub quality_score: f64,
}

#[derive(Debug, Clone, Copy)]
pub struct CompressionDetector {
    pub window: usize,
}

impl Default for CompressionDetector {
    fn default() -> Self {
        Self { window: DEFAULT_COMPRESSION_WINDOW }
    }
}

struct Chunk {
    high: f64,
    low: f64,
}

impl Chunk {
    fn range(&self) -> f64 {
        self.high - self.low
    }
}

impl CompressionDetector {
    pub fn new(window: usize) -> Self {
        Self { window }
    }

    pub fn detect(&self, zone: &Zone, candles: &[Candle]) -> Option<CompressionResult> {
        let recent = &candles[candles.len().saturating_sub(self.window)..];
        let chunk_count = recent.len() / CHUNK_SIZE;
        if chunk_count < MIN_CHUNKS {
            return None;
        }

        // Align chunks to the newest candle; the oldest remainder is dropped
        let aligned = &recent[recent.len() - chunk_count * CHUNK_SIZE..];
        let chunks: Vec<Chunk> = aligned
            .chunks_exact(CHUNK_SIZE)
            .map(|c| Chunk {
                high: c.iter().map(|k| k.high).fold(f64::MIN, f64::max),
                low: c.iter().map(|k| k.low).fold(f64::MAX, f64::min),
            })
            .collect();

        let first_range = chunks[0].range();
        let last_range = chunks[chunks.len() - 1].range();
        if first_range <= 0.0 {
            return None;
        }

        let compression_ratio = last_range / first_range;
        if compression_ratio > MAX_COMPRESSION_RATIO {
            debug!("[COMPRESSION] Zone {}: ratio {:.2} too wide", zone.id, compression_ratio);
            return None;
        }

        let first_close = aligned[0].close;
        let last_close = aligned[aligned.len() - 1].close;
        let converging = match zone.zone_type {
            ZoneType::Demand => last_close < first_close,
            ZoneType::Supply => last_close > first_close,
        };
        if !converging {
            debug!("[COMPRESSION] Zone {}: closes drifting away from zone, discarded", zone.id);
            return None;
        }

        let flat_step = first_range * FLAT_STEP_RATIO;
        let highs: Vec<f64> = chunks.iter().map(|c| c.high).collect();
        let lows: Vec<f64> = chunks.iter().map(|c| c.low).collect();
        let highs_trend = trend_of(&highs, flat_step);
        let lows_trend = trend_of(&lows, flat_step);
        let compression_type = classify(highs_trend, lows_trend);

        let waves = chunks.len();
        let quality = if compression_ratio <= 0.3 && waves >= 5 {
            CompressionQuality::Excellent
        } else if compression_ratio <= 0.4 && waves >= 4 {
            CompressionQuality::Good
        } else {
            CompressionQuality::Moderate
        };
        let quality_score = (1.0 - compression_ratio) * 70.0 + (waves.min(6) as f64 / 6.0) * 30.0;

        Some(CompressionResult {
            compression_type,
            compression_ratio,
            waves,
            highs_trend,
            lows_trend,
            chunk_ranges: chunks.iter().map(Chunk::range).collect(),
            quality,
            quality_score,
        })
    }
}

fn trend_of(values: &[f64], flat_step: f64) -> Trend {
    let steps = values.len().saturating_sub(1);
    if steps == 0 {
        return Trend::Flat;
    }
    let (mut up, mut down) = (0usize, 0usize);
    for pair in values.windows(2) {
        let delta = pair[1] - pair[0];
        if delta > flat_step {
            up += 1;
        } else if delta < -flat_step {
            down += 1;
        }
    }
    let majority = steps as f64 * TREND_MAJORITY;
    if up as f64 > majority {
        Trend::Ascending
    } else if down as f64 > majority {
        Trend::Descending
    } else {
        Trend::Flat
    }
}

fn classify(highs: Trend, lows: Trend) -> CompressionType {
    match (highs, lows) {
        (Trend::Descending, Trend::Flat) => CompressionType::DescendingTriangle,
        (Trend::Flat, Trend::Ascending) => CompressionType::AscendingTriangle,
        (Trend::Descending, Trend::Ascending) => CompressionType::Symmetrical,
        (Trend::Descending, Trend::Descending) => CompressionType::DescendingWedge,
        (Trend::Ascending, Trend::Ascending) => CompressionType::AscendingWedge,
        _ => CompressionType::Undefined,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::test_support::*;

    /// Three candles spanning [low, high], closing just under `close`.
    fn chunk(start: i64, high: f64, low: f64, close: f64) -> Vec<Candle> {
        (0..3)
            .map(|i| {
                let c = close - 0.01 * i as f64;
                candle_at(start + i, c, if i == 0 { high } else { c }, if i == 1 { low } else { c }, c)
            })
            .collect()
    }

    fn descending_triangle() -> Vec<Candle> {
        let specs = [(110.0, 108.0), (110.0, 107.0), (106.0, 104.0), (104.0, 102.0), (103.0, 101.0)];
        specs
            .iter()
            .enumerate()
            .flat_map(|(i, &(high, close))| chunk(i as i64 * 3, high, 100.0, close))
            .collect()
    }

    #[test]
    fn test_descending_triangle_into_demand_is_excellent() {
        let zone = demand_zone(99.0, 95.0);
        let result = CompressionDetector::default().detect(&zone, &descending_triangle()).unwrap();

        assert_eq!(result.chunk_ranges, vec![10.0, 10.0, 6.0, 4.0, 3.0]);
        assert_eq!(result.highs_trend, Trend::Descending);
        assert_eq!(result.lows_trend, Trend::Flat);
        assert_eq!(result.compression_type, CompressionType::DescendingTriangle);
        assert!((result.compression_ratio - 0.3).abs() < 1e-12);
        assert_eq!(result.waves, 5);
        assert_eq!(result.quality, CompressionQuality::Excellent);
        // (1 - 0.3) * 70 + 5/6 * 30
        assert!((result.quality_score - 74.0).abs() < 1e-9);
    }

    fn steps(specs: &[(f64, f64)]) -> Vec<Candle> {
        specs
            .iter()
            .enumerate()
            .flat_map(|(i, &(high, close))| chunk(i as i64 * 3, high, 100.0, close))
            .collect()
    }

    #[test]
    fn test_four_waves_at_forty_percent_is_good() {
        let zone = demand_zone(99.0, 95.0);
        let candles = steps(&[(110.0, 108.0), (108.0, 106.0), (106.0, 104.0), (104.0, 102.0)]);

        let result = CompressionDetector::default().detect(&zone, &candles).unwrap();
        assert_eq!(result.waves, 4);
        assert!((result.compression_ratio - 0.4).abs() < 1e-12);
        assert_eq!(result.quality, CompressionQuality::Good);
        // (1 - 0.4) * 70 + 4/6 * 30
        assert!((result.quality_score - 62.0).abs() < 1e-9);
    }

    #[test]
    fn test_two_waves_is_moderate() {
        let zone = demand_zone(99.0, 95.0);
        let candles = steps(&[(110.0, 108.0), (104.0, 102.0)]);

        let result = CompressionDetector::default().detect(&zone, &candles).unwrap();
        assert_eq!(result.waves, 2);
        assert_eq!(result.quality, CompressionQuality::Moderate);
        // (1 - 0.4) * 70 + 2/6 * 30
        assert!((result.quality_score - 52.0).abs() < 1e-9);
    }

    #[test]
    fn test_supply_zone_discards_falling_closes() {
        let zone = supply_zone(115.0, 118.0);
        assert!(CompressionDetector::default().detect(&zone, &descending_triangle()).is_none());
    }

    #[test]
    fn test_no_contraction_no_result() {
        let zone = demand_zone(99.0, 95.0);
        let candles: Vec<Candle> = (0..5).flat_map(|i| chunk(i * 3, 110.0, 100.0, 108.0 - i as f64)).collect();
        assert!(CompressionDetector::default().detect(&zone, &candles).is_none());
    }

    #[test]
    fn test_too_few_candles() {
        let zone = demand_zone(99.0, 95.0);
        let candles = chunk(0, 110.0, 100.0, 105.0);
        assert!(CompressionDetector::default().detect(&zone, &candles).is_none());
    }

    #[test]
    fn test_classification_table() {
        assert_eq!(classify(Trend::Flat, Trend::Ascending), CompressionType::AscendingTriangle);
        assert_eq!(classify(Trend::Descending, Trend::Ascending), CompressionType::Symmetrical);
        assert_eq!(classify(Trend::Descending, Trend::Descending), CompressionType::DescendingWedge);
        assert_eq!(classify(Trend::Ascending, Trend::Ascending), CompressionType::AscendingWedge);
        assert_eq!(classify(Trend::Ascending, Trend::Descending), CompressionType::Undefined);
    }
}
