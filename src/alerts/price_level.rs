// src/alerts/price_level.rs
use log::debug;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::alerts::types::{AlertEvent, AlertType};

pub const DEFAULT_TOUCH_TOLERANCE_PERCENT: f64 = 0.1;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PriceCondition {
    /// Crossed up through the target
    Above,
    /// Crossed down through the target
    Below,
    /// Crossed in either direction
    Cross,
    /// Within the touch tolerance of the target
    Touch,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PriceLevelAlert {
    pub id: String,
    pub symbol: String,
    pub target_price: f64,
    pub condition: PriceCondition,
    #[serde(default = "default_touch_tolerance")]
    pub touch_tolerance_percent: f64,
    #[serde(default = "default_enabled")]
    pub enabled: bool,
}

fn default_touch_tolerance() -> f64 {
    DEFAULT_TOUCH_TOLERANCE_PERCENT
}

fn default_enabled() -> bool {
    true
}

impl PriceLevelAlert {
    pub fn new(symbol: impl Into<String>, target_price: f64, condition: PriceCondition) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            symbol: symbol.into(),
            target_price,
            condition,
            touch_tolerance_percent: DEFAULT_TOUCH_TOLERANCE_PERCENT,
            enabled: true,
        }
    }
}

/// Crossing conditions need a previous price; without one only `Touch` can fire.
pub fn check_price_level_alert(
    config: &PriceLevelAlert,
    current_price: f64,
    previous_price: Option<f64>,
) -> Option<AlertEvent> {
    if !config.enabled {
        return None;
    }

    let target = config.target_price;
    let crossed_up = previous_price.map_or(false, |prev| prev < target && current_price >= target);
    let crossed_down = previous_price.map_or(false, |prev| prev > target && current_price <= target);

    let (fired, description) = match config.condition {
        PriceCondition::Above => (crossed_up, "crossed above"),
        PriceCondition::Below => (crossed_down, "crossed below"),
        PriceCondition::Cross => (
            crossed_up || crossed_down,
            if crossed_up { "crossed above" } else { "crossed below" },
        ),
        PriceCondition::Touch => {
            let tolerance = target.abs() * config.touch_tolerance_percent / 100.0;
            ((current_price - target).abs() <= tolerance, "touched")
        }
    };

    if !fired {
        return None;
    }

    debug!("[PRICE] {} {} {:.5} at {:.5}", config.symbol, description, target, current_price);
    Some(AlertEvent::new(
        AlertType::PriceLevel,
        &config.symbol,
        format!("{} {} {:.5} (now {:.5})", config.symbol, description, target, current_price),
        None,
    )
    .with_source(config.id.clone()))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn level(condition: PriceCondition) -> PriceLevelAlert {
        PriceLevelAlert::new("EURUSD", 1.1000, condition)
    }

    #[test]
    fn test_above_needs_upward_cross() {
        let cfg = level(PriceCondition::Above);
        assert!(check_price_level_alert(&cfg, 1.1005, Some(1.0995)).is_some());
        assert!(check_price_level_alert(&cfg, 1.1010, Some(1.1005)).is_none());
        assert!(check_price_level_alert(&cfg, 1.0990, Some(1.1005)).is_none());
        assert!(check_price_level_alert(&cfg, 1.1005, None).is_none());
    }

    #[test]
    fn test_below_and_cross() {
        let below = level(PriceCondition::Below);
        assert!(check_price_level_alert(&below, 1.0990, Some(1.1005)).is_some());
        assert!(check_price_level_alert(&below, 1.1005, Some(1.0990)).is_none());

        let cross = level(PriceCondition::Cross);
        let up = check_price_level_alert(&cross, 1.1005, Some(1.0995)).unwrap();
        assert!(up.message.contains("crossed above"));
        let down = check_price_level_alert(&cross, 1.0995, Some(1.1005)).unwrap();
        assert!(down.message.contains("crossed below"));
    }

    #[test]
    fn test_touch_uses_tolerance() {
        let cfg = level(PriceCondition::Touch);
        // 0.1% of 1.1 is 0.0011
        let alert = check_price_level_alert(&cfg, 1.1008, None).unwrap();
        assert_eq!(alert.alert_type, AlertType::PriceLevel);
        assert_eq!(alert.priority, 2);
        assert!(alert.zone_ref.is_none());
        assert_eq!(alert.source_id.as_deref(), Some(cfg.id.as_str()));
        assert!(check_price_level_alert(&cfg, 1.1020, None).is_none());
    }

    #[test]
    fn test_disabled_never_fires() {
        let mut cfg = level(PriceCondition::Touch);
        cfg.enabled = false;
        assert!(check_price_level_alert(&cfg, 1.1000, Some(1.0)).is_none());
    }
}
