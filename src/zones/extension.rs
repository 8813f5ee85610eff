// src/zones/extension.rs
// Widens a zone's stop when wicks push past it without breaking the zone.

use log::{debug, info};
use serde::{Deserialize, Serialize};

use crate::types::{Candle, Zone, ZoneType};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExtensionResult {
    pub should_extend: bool,
    /// The zone after extension; equal to the input when `should_extend` is false
    pub zone: Zone,
    pub previous_stop: f64,
    pub new_stop: f64,
    /// Width growth relative to the width before the first extension
    pub extension_percent: f64,
}

/// Returns `None` for zero-width or broken zones.
pub fn check_extension(zone: &Zone, candles_after_formation: &[Candle]) -> Option<ExtensionResult> {
    if zone.is_broken || zone.width() <= 0.0 {
        return None;
    }

    let candidate = match zone.zone_type {
        ZoneType::Supply => candles_after_formation
            .iter()
            .map(|c| c.high)
            .fold(zone.stop_price, f64::max),
        ZoneType::Demand => candles_after_formation
            .iter()
            .map(|c| c.low)
            .fold(zone.stop_price, f64::min),
    };

    let widens = match zone.zone_type {
        ZoneType::Supply => candidate > zone.stop_price,
        ZoneType::Demand => candidate < zone.stop_price,
    };

    let original_stop = zone.original_stop_price.unwrap_or(zone.stop_price);
    let original_width = (zone.entry_price - original_stop).abs();

    if !widens {
        return Some(ExtensionResult {
            should_extend: false,
            zone: zone.clone(),
            previous_stop: zone.stop_price,
            new_stop: zone.stop_price,
            extension_percent: extension_percent(original_width, (zone.entry_price - zone.stop_price).abs()),
        });
    }

    let mut extended = zone.clone();
    extended.stop_price = candidate;
    extended.is_extended = true;
    extended.original_stop_price = Some(original_stop);
    extended.extension_count = zone.extension_count + 1;

    let new_width = (extended.entry_price - candidate).abs();
    let percent = extension_percent(original_width, new_width);

    info!(
        "[EXTEND] Zone {} stop {:.5} -> {:.5} ({:.1}% wider than original, extension #{})",
        zone.id, zone.stop_price, candidate, percent, extended.extension_count
    );

    Some(ExtensionResult {
        should_extend: true,
        zone: extended,
        previous_stop: zone.stop_price,
        new_stop: candidate,
        extension_percent: percent,
    })
}

fn extension_percent(original_width: f64, new_width: f64) -> f64 {
    if original_width > 0.0 {
        (new_width - original_width) / original_width * 100.0
    } else {
        0.0
    }
}

/// Append-only record of a zone's versions, oldest first.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ZoneHistory {
    versions: Vec<Zone>,
}

impl ZoneHistory {
    pub fn new(initial: Zone) -> Self {
        Self { versions: vec![initial] }
    }

    pub fn current(&self) -> Option<&Zone> {
        self.versions.last()
    }

    pub fn versions(&self) -> &[Zone] {
        &self.versions
    }

    /// Records the extended version when the result actually changed the zone.
    pub fn record(&mut self, result: &ExtensionResult) -> bool {
        if !result.should_extend {
            return false;
        }
        debug!("[EXTEND] Recording version {} of zone {}", self.versions.len() + 1, result.zone.id);
        self.versions.push(result.zone.clone());
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::test_support::*;

    #[test]
    fn test_supply_extends_to_new_high() {
        let zone = supply_zone(100.0, 105.0);
        let candles = vec![
            candle_at(0, 103.0, 105.5, 102.0, 104.0),
            candle_at(1, 104.0, 106.0, 103.0, 104.5),
        ];

        let result = check_extension(&zone, &candles).unwrap();
        assert!(result.should_extend);
        assert_eq!(result.new_stop, 106.0);
        assert_eq!(result.zone.stop_price, 106.0);
        assert_eq!(result.zone.original_stop_price, Some(105.0));
        assert_eq!(result.zone.extension_count, 1);
        assert!(result.zone.is_extended);
        assert!((result.extension_percent - 20.0).abs() < 1e-9);
    }

    #[test]
    fn test_demand_extends_downward_only() {
        let zone = demand_zone(100.0, 95.0);
        let candles = vec![candle_at(0, 97.0, 99.0, 94.0, 98.0)];

        let result = check_extension(&zone, &candles).unwrap();
        assert!(result.should_extend);
        assert_eq!(result.zone.stop_price, 94.0);

        let inside = vec![candle_at(0, 97.0, 99.0, 96.0, 98.0)];
        let result = check_extension(&zone, &inside).unwrap();
        assert!(!result.should_extend);
        assert_eq!(result.zone, zone);
    }

    #[test]
    fn test_second_application_is_noop() {
        let zone = supply_zone(100.0, 105.0);
        let candles = vec![candle_at(0, 103.0, 106.0, 102.0, 104.0)];

        let first = check_extension(&zone, &candles).unwrap();
        let second = check_extension(&first.zone, &candles).unwrap();
        assert!(!second.should_extend);
        assert_eq!(second.zone, first.zone);
    }

    #[test]
    fn test_original_stop_survives_repeated_extension() {
        let zone = supply_zone(100.0, 105.0);
        let first = check_extension(&zone, &[candle_at(0, 103.0, 106.0, 102.0, 104.0)]).unwrap();
        let second = check_extension(&first.zone, &[candle_at(1, 103.0, 107.5, 102.0, 104.0)]).unwrap();

        assert_eq!(second.zone.original_stop_price, Some(105.0));
        assert_eq!(second.zone.extension_count, 2);
        assert!((second.extension_percent - 50.0).abs() < 1e-9);
    }

    #[test]
    fn test_zero_width_zone_short_circuits() {
        let zone = supply_zone(100.0, 100.0);
        assert!(check_extension(&zone, &[candle_at(0, 99.0, 101.0, 98.0, 99.5)]).is_none());
    }

    #[test]
    fn test_history_only_records_changes() {
        let zone = supply_zone(100.0, 105.0);
        let mut history = ZoneHistory::new(zone.clone());
        let candles = vec![candle_at(0, 103.0, 106.0, 102.0, 104.0)];

        let first = check_extension(&zone, &candles).unwrap();
        assert!(history.record(&first));
        let second = check_extension(&first.zone, &candles).unwrap();
        assert!(!history.record(&second));

        assert_eq!(history.versions().len(), 2);
        assert_eq!(history.current().unwrap().stop_price, 106.0);
    }
}
