// src/types.rs
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::errors::{AnalysisError, Result};

// --- Candles ---

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Candle {
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub timestamp: DateTime<Utc>,
}

impl Candle {
    pub fn new(open: f64, high: f64, low: f64, close: f64, timestamp: DateTime<Utc>) -> Result<Self> {
        let candle = Self { open, high, low, close, timestamp };
        candle.validate()?;
        Ok(candle)
    }

    /// Checks the OHLC invariants. A failure here aborts whatever computation hit it.
    pub fn validate(&self) -> Result<()> {
        let prices = [self.open, self.high, self.low, self.close];
        if prices.iter().any(|p| !p.is_finite() || *p <= 0.0) {
            return Err(self.invalid("prices must be positive and finite"));
        }
        if self.high < self.low {
            return Err(self.invalid(&format!("high {} below low {}", self.high, self.low)));
        }
        if self.high < self.open.max(self.close) {
            return Err(self.invalid("high below body"));
        }
        if self.low > self.open.min(self.close) {
            return Err(self.invalid("low above body"));
        }
        Ok(())
    }

    fn invalid(&self, reason: &str) -> AnalysisError {
        AnalysisError::InvalidCandle {
            timestamp: self.timestamp.to_rfc3339(),
            reason: reason.to_string(),
        }
    }

    pub fn body(&self) -> f64 {
        (self.close - self.open).abs()
    }

    pub fn range(&self) -> f64 {
        self.high - self.low
    }

    pub fn body_high(&self) -> f64 {
        self.open.max(self.close)
    }

    pub fn body_low(&self) -> f64 {
        self.open.min(self.close)
    }

    pub fn upper_wick(&self) -> f64 {
        self.high - self.body_high()
    }

    pub fn lower_wick(&self) -> f64 {
        self.body_low() - self.low
    }

    pub fn is_bullish(&self) -> bool {
        self.close > self.open
    }

    pub fn is_bearish(&self) -> bool {
        self.close < self.open
    }

    /// True when the candle's range overlaps [low, high]
    pub fn overlaps(&self, low: f64, high: f64) -> bool {
        self.low <= high && self.high >= low
    }
}

/// Validates every candle in a window, failing on the first broken one.
pub fn validate_candles(candles: &[Candle]) -> Result<()> {
    candles.iter().try_for_each(Candle::validate)
}

// --- Zones ---

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ZoneType {
    Demand,
    Supply,
}

impl ZoneType {
    /// Direction a confirmation pattern must point for this zone
    pub fn expected_bias(self) -> PatternDirection {
        match self {
            ZoneType::Demand => PatternDirection::Bullish,
            ZoneType::Supply => PatternDirection::Bearish,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            ZoneType::Demand => "demand",
            ZoneType::Supply => "supply",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PatternDirection {
    Bullish,
    Bearish,
    Neutral,
}

pub const MIN_HIERARCHY_LEVEL: u8 = 1;
pub const MAX_HIERARCHY_LEVEL: u8 = 4;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Zone {
    pub id: String,
    pub symbol: String,
    pub entry_price: f64,
    pub stop_price: f64,
    pub zone_type: ZoneType,
    #[serde(default)]
    pub test_count: u32,
    #[serde(default)]
    pub is_broken: bool,
    pub formation_timestamp: DateTime<Utc>,
    pub hierarchy_level: u8,
    #[serde(default)]
    pub is_extended: bool,
    #[serde(default)]
    pub original_stop_price: Option<f64>,
    #[serde(default)]
    pub extension_count: u32,
}

impl Zone {
    /// A fresh, unextended zone
    pub fn new(
        id: impl Into<String>,
        symbol: impl Into<String>,
        zone_type: ZoneType,
        entry_price: f64,
        stop_price: f64,
        formation_timestamp: DateTime<Utc>,
        hierarchy_level: u8,
    ) -> Self {
        Self {
            id: id.into(),
            symbol: symbol.into(),
            entry_price,
            stop_price,
            zone_type,
            test_count: 0,
            is_broken: false,
            formation_timestamp,
            hierarchy_level,
            is_extended: false,
            original_stop_price: None,
            extension_count: 0,
        }
    }

    pub fn validate(&self) -> Result<()> {
        let invalid = |reason: String| AnalysisError::InvalidZone {
            zone_id: self.id.clone(),
            reason,
        };
        for (name, price) in [("entry_price", self.entry_price), ("stop_price", self.stop_price)] {
            if !price.is_finite() || price <= 0.0 {
                return Err(invalid(format!("{} must be positive and finite, got {}", name, price)));
            }
        }
        if !(MIN_HIERARCHY_LEVEL..=MAX_HIERARCHY_LEVEL).contains(&self.hierarchy_level) {
            return Err(invalid(format!("hierarchy level {} outside 1..4", self.hierarchy_level)));
        }
        Ok(())
    }

    pub fn zone_high(&self) -> f64 {
        self.entry_price.max(self.stop_price)
    }

    pub fn zone_low(&self) -> f64 {
        self.entry_price.min(self.stop_price)
    }

    pub fn width(&self) -> f64 {
        self.zone_high() - self.zone_low()
    }

    pub fn midpoint(&self) -> f64 {
        (self.zone_high() + self.zone_low()) / 2.0
    }

    pub fn is_supply(&self) -> bool {
        self.zone_type == ZoneType::Supply
    }

    /// Entry side: supply is approached from below, demand from above
    pub fn proximal_line(&self) -> f64 {
        match self.zone_type {
            ZoneType::Supply => self.zone_low(),
            ZoneType::Demand => self.zone_high(),
        }
    }

    /// Invalidation side
    pub fn distal_line(&self) -> f64 {
        match self.zone_type {
            ZoneType::Supply => self.zone_high(),
            ZoneType::Demand => self.zone_low(),
        }
    }

    pub fn contains(&self, price: f64) -> bool {
        price >= self.zone_low() && price <= self.zone_high()
    }

    /// Distance to the nearest edge; zero inside the zone
    pub fn distance_to(&self, price: f64) -> f64 {
        if self.contains(price) {
            0.0
        } else if price > self.zone_high() {
            price - self.zone_high()
        } else {
            self.zone_low() - price
        }
    }

    pub fn reference(&self) -> ZoneRef {
        ZoneRef {
            zone_id: self.id.clone(),
            symbol: self.symbol.clone(),
            zone_type: self.zone_type,
            entry_price: self.entry_price,
            stop_price: self.stop_price,
        }
    }
}

/// Lightweight pointer to a zone carried by alerts
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ZoneRef {
    pub zone_id: String,
    pub symbol: String,
    pub zone_type: ZoneType,
    pub entry_price: f64,
    pub stop_price: f64,
}

/// Candles strictly after the zone formed
pub fn candles_after<'a>(zone: &Zone, candles: &'a [Candle]) -> &'a [Candle] {
    let start = candles.partition_point(|c| c.timestamp <= zone.formation_timestamp);
    &candles[start..]
}
