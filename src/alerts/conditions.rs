// src/alerts/conditions.rs
// Turns an analyzed zone into priority-ordered alert events.

use log::{debug, warn};

use crate::alerts::types::{
    AlertEvent, AlertPreferences, AlertType, CONFIRMATION_ACTION_SCORE, CONFIRMATION_ALERT_MIN_SCORE,
};
use crate::analysis::{ZoneAnalysis, ZoneAnalyzer};
use crate::errors::Result;
use crate::types::{Candle, Zone, ZoneType};

fn trade_side(zone: &Zone) -> &'static str {
    match zone.zone_type {
        ZoneType::Demand => "BUY",
        ZoneType::Supply => "SELL",
    }
}

fn entry_suggestion(zone: &Zone) -> String {
    format!("{} near {:.5}, stop beyond {:.5}", trade_side(zone), zone.entry_price, zone.stop_price)
}

/// Alerts for a zone that has already been through the pipeline. Conditions are evaluated
/// independently and the result is sorted by priority (stable).
pub fn alerts_for_analysis(analysis: &ZoneAnalysis, current_price: f64, prefs: &AlertPreferences) -> Vec<AlertEvent> {
    if !prefs.alerts_enabled {
        return Vec::new();
    }

    let zone = &analysis.zone;
    let ftb = &analysis.ftb;
    let zone_ref = Some(zone.reference());
    let broken = !analysis.validation.is_valid;
    let within_approach = !ftb.in_zone && ftb.distance_percent <= prefs.approach_distance_percent;
    let near = ftb.in_zone || within_approach;
    let kind = zone.zone_type.as_str();
    let mut alerts = Vec::new();

    if !broken && prefs.ftb_alerts && ftb.is_ftb {
        if ftb.in_zone {
            alerts.push(
                AlertEvent::new(
                    AlertType::FtbInZone,
                    &zone.symbol,
                    format!(
                        "Price {:.5} is back in {} zone {:.5}-{:.5} for the first time ({}★)",
                        current_price, kind, zone.zone_low(), zone.zone_high(), ftb.stars
                    ),
                    zone_ref.clone(),
                )
                .requiring_action(entry_suggestion(zone)),
            );
        } else if within_approach {
            alerts.push(AlertEvent::new(
                AlertType::FtbApproaching,
                &zone.symbol,
                format!(
                    "Price {:.5} is {:.2}% from untested {} zone {:.5}-{:.5}",
                    current_price, ftb.distance_percent, kind, zone.zone_low(), zone.zone_high()
                ),
                zone_ref.clone(),
            ));
        }
    }

    if !broken && prefs.zone_approach_alerts && within_approach {
        alerts.push(AlertEvent::new(
            AlertType::ZoneApproach,
            &zone.symbol,
            format!(
                "Price {:.5} approaching {} zone {:.5}-{:.5} ({:.2}% away, tested {}x)",
                current_price, kind, zone.zone_low(), zone.zone_high(), ftb.distance_percent, zone.test_count
            ),
            zone_ref.clone(),
        ));
    }

    let confirmation = &analysis.confirmation;
    if !broken && prefs.confirmation_alerts && near && confirmation.total_score >= CONFIRMATION_ALERT_MIN_SCORE {
        let names: Vec<String> = confirmation.patterns.iter().map(|p| format!("{:?}", p.pattern_id)).collect();
        let mut alert = AlertEvent::new(
            AlertType::ConfirmationPattern,
            &zone.symbol,
            format!(
                "{} confirmation at {} zone (score {})",
                names.join(" + "),
                kind,
                confirmation.total_score
            ),
            zone_ref.clone(),
        );
        if confirmation.total_score >= CONFIRMATION_ACTION_SCORE {
            alert = alert.requiring_action(entry_suggestion(zone));
        }
        alerts.push(alert);
    }

    if let Some(combo) = analysis.combo.as_ref().filter(|_| !broken && prefs.confirmation_alerts && near) {
        alerts.push(
            AlertEvent::new(
                AlertType::PinEngulfCombo,
                &zone.symbol,
                format!(
                    "{:?} pin + engulf combo at {} zone (score {} incl. +{} bonus)",
                    combo.kind, kind, combo.score, combo.combo_bonus
                ),
                zone_ref.clone(),
            )
            .requiring_action(format!(
                "{} at {:.5}, stop {:.5}",
                trade_side(zone),
                combo.entry_price,
                combo.stop_loss
            )),
        );
    }

    if prefs.zone_broken_alerts && analysis.newly_broken {
        alerts.push(AlertEvent::new(
            AlertType::ZoneBroken,
            &zone.symbol,
            format!(
                "{} zone {:.5}-{:.5} broken: {} closes beyond the zone",
                kind,
                zone.zone_low(),
                zone.zone_high(),
                analysis.validation.closes_beyond_zone
            ),
            zone_ref.clone(),
        ));
    }

    if !broken && prefs.high_score_alerts && analysis.odds.total_score >= prefs.min_odds_score {
        alerts.push(AlertEvent::new(
            AlertType::HighScore,
            &zone.symbol,
            format!(
                "{} zone scored {:.1}/10 (grade {})",
                kind, analysis.odds.total_score, analysis.odds.grade
            ),
            zone_ref,
        ));
    }

    alerts.sort_by_key(|a| a.priority);
    alerts
}

/// Runs the pipeline for one zone and derives its alerts.
pub fn check_alert_conditions(
    analyzer: &ZoneAnalyzer,
    zone: &Zone,
    current_price: f64,
    recent_candles: &[Candle],
    prefs: &AlertPreferences,
) -> Result<Vec<AlertEvent>> {
    let analysis = analyzer.analyze_zone(zone, recent_candles, current_price)?;
    Ok(alerts_for_analysis(&analysis, current_price, prefs))
}

/// Alerts for every zone of `symbol`. Approach alerts are dropped unless price moved toward the
/// zone since `previous_price`. A zone that fails is logged and skipped.
pub fn check_alerts_for_symbol(
    analyzer: &ZoneAnalyzer,
    symbol: &str,
    current_price: f64,
    previous_price: Option<f64>,
    zones: &[Zone],
    candles: &[Candle],
    prefs: &AlertPreferences,
) -> Vec<AlertEvent> {
    let mut alerts = Vec::new();

    for zone in zones.iter().filter(|z| z.symbol == symbol) {
        let zone_alerts = match check_alert_conditions(analyzer, zone, current_price, candles, prefs) {
            Ok(a) => a,
            Err(e) => {
                warn!("[ALERTS] Skipping zone {} on {}: {}", zone.id, symbol, e);
                continue;
            }
        };

        let approaching = previous_price.map_or(true, |prev| zone.distance_to(current_price) < zone.distance_to(prev));
        alerts.extend(zone_alerts.into_iter().filter(|a| {
            let keep = approaching || !a.alert_type.is_approach();
            if !keep {
                debug!("[ALERTS] Price not moving toward zone {}, suppressing {:?}", zone.id, a.alert_type);
            }
            keep
        }));
    }

    alerts.sort_by_key(|a| a.priority);
    alerts
}
