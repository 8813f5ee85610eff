// src/config.rs
// Engine tuning loaded from the environment (.env supported), with the documented defaults.

use dotenv::dotenv;
use log::{info, warn};
use std::env;
use std::str::FromStr;

pub const DEFAULT_TOLERANCE_PERCENT: f64 = 0.5;
pub const DEFAULT_MIN_CLOSES_BEYOND: u32 = 2;
pub const DEFAULT_MPL_PRECISION: usize = 10;
pub const DEFAULT_MPL_MIN_TOUCHES: usize = 2;
pub const DEFAULT_COMPRESSION_WINDOW: usize = 20;
pub const DEFAULT_ALERT_COOLDOWN_MINUTES: i64 = 30;
pub const DEFAULT_BASE_WIN_RATE: f64 = 0.6;

#[derive(Debug, Clone, PartialEq)]
pub struct EngineConfig {
    /// Close tolerance beyond the zone edge, as a percent of zone width
    pub tolerance_percent: f64,
    /// Closes beyond the zone needed to call it broken
    pub min_closes_beyond: u32,
    pub mpl_precision: usize,
    pub mpl_min_touches: usize,
    pub compression_window: usize,
    /// Minimum time between two alerts of the same type for the same zone
    pub alert_cooldown_minutes: i64,
    /// Win rate of a fresh zone, degraded by the freshness modifier
    pub base_win_rate: f64,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            tolerance_percent: DEFAULT_TOLERANCE_PERCENT,
            min_closes_beyond: DEFAULT_MIN_CLOSES_BEYOND,
            mpl_precision: DEFAULT_MPL_PRECISION,
            mpl_min_touches: DEFAULT_MPL_MIN_TOUCHES,
            compression_window: DEFAULT_COMPRESSION_WINDOW,
            alert_cooldown_minutes: DEFAULT_ALERT_COOLDOWN_MINUTES,
            base_win_rate: DEFAULT_BASE_WIN_RATE,
        }
    }
}

impl EngineConfig {
    pub fn from_env() -> Self {
        dotenv().ok();

        let config = Self {
            tolerance_percent: env_or("ZONE_TOLERANCE_PERCENT", DEFAULT_TOLERANCE_PERCENT),
            min_closes_beyond: env_or("ZONE_MIN_CLOSES_BEYOND", DEFAULT_MIN_CLOSES_BEYOND),
            mpl_precision: env_or("MPL_PRECISION", DEFAULT_MPL_PRECISION),
            mpl_min_touches: env_or("MPL_MIN_TOUCHES", DEFAULT_MPL_MIN_TOUCHES),
            compression_window: env_or("COMPRESSION_WINDOW", DEFAULT_COMPRESSION_WINDOW),
            alert_cooldown_minutes: env_or("ALERT_COOLDOWN_MINUTES", DEFAULT_ALERT_COOLDOWN_MINUTES),
            base_win_rate: env_or("BASE_WIN_RATE", DEFAULT_BASE_WIN_RATE),
        };

        info!(
            "⚙️ Engine config: tolerance={:.2}%, min_closes={}, mpl_precision={}, cooldown={}min",
            config.tolerance_percent, config.min_closes_beyond, config.mpl_precision, config.alert_cooldown_minutes
        );
        config
    }
}

fn env_or<T: FromStr + Copy + std::fmt::Display>(key: &str, default: T) -> T {
    match env::var(key) {
        Ok(raw) => match raw.trim().parse::<T>() {
            Ok(value) => value,
            Err(_) => {
                warn!("[CONFIG] Could not parse {}='{}', using default {}", key, raw, default);
                default
            }
        },
        Err(_) => default,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_match_documented_constants() {
        let config = EngineConfig::default();
        assert_eq!(config.tolerance_percent, 0.5);
        assert_eq!(config.min_closes_beyond, 2);
        assert_eq!(config.mpl_precision, 10);
        assert_eq!(config.compression_window, 20);
    }

    #[test]
    fn test_env_or_falls_back_on_garbage() {
        env::set_var("ZONE_SCANNER_TEST_GARBAGE", "not-a-number");
        assert_eq!(env_or("ZONE_SCANNER_TEST_GARBAGE", 7usize), 7);
        env::set_var("ZONE_SCANNER_TEST_GOOD", " 12 ");
        assert_eq!(env_or("ZONE_SCANNER_TEST_GOOD", 7usize), 12);
    }
}
