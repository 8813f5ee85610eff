// src/alerts/types.rs
use chrono::{DateTime, NaiveTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::errors::{AnalysisError, Result};
use crate::types::ZoneRef;

pub const DEFAULT_APPROACH_DISTANCE_PERCENT: f64 = 1.0;
pub const DEFAULT_MIN_ODDS_SCORE: f64 = 8.0;
pub const CONFIRMATION_ALERT_MIN_SCORE: i32 = 3;
pub const CONFIRMATION_ACTION_SCORE: i32 = 5;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AlertType {
    FtbInZone,
    FtbApproaching,
    ZoneApproach,
    ConfirmationPattern,
    PinEngulfCombo,
    ZoneBroken,
    HighScore,
    PriceLevel,
}

impl AlertType {
    /// 1 is the most urgent
    pub fn priority(self) -> u8 {
        match self {
            AlertType::FtbInZone | AlertType::PinEngulfCombo => 1,
            AlertType::FtbApproaching
            | AlertType::ZoneApproach
            | AlertType::ZoneBroken
            | AlertType::HighScore
            | AlertType::PriceLevel => 2,
            AlertType::ConfirmationPattern => 3,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            AlertType::FtbInZone => "First Time Back",
            AlertType::FtbApproaching => "FTB Approaching",
            AlertType::ZoneApproach => "Zone Approach",
            AlertType::ConfirmationPattern => "Confirmation Pattern",
            AlertType::PinEngulfCombo => "Pin + Engulf Combo",
            AlertType::ZoneBroken => "Zone Broken",
            AlertType::HighScore => "High Score Zone",
            AlertType::PriceLevel => "Price Level",
        }
    }

    /// Alerts that only make sense while price is heading toward the zone
    pub fn is_approach(self) -> bool {
        matches!(self, AlertType::FtbApproaching | AlertType::ZoneApproach)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AlertEvent {
    pub id: String,
    #[serde(rename = "type")]
    pub alert_type: AlertType,
    pub priority: u8,
    pub title: String,
    pub message: String,
    pub zone_ref: Option<ZoneRef>,
    /// Id of the price-level config that raised the alert
    #[serde(default)]
    pub source_id: Option<String>,
    pub action_required: bool,
    pub suggested_action: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl AlertEvent {
    pub fn new(alert_type: AlertType, symbol: &str, message: String, zone_ref: Option<ZoneRef>) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            alert_type,
            priority: alert_type.priority(),
            title: format!("{} - {}", alert_type.label(), symbol),
            message,
            zone_ref,
            source_id: None,
            action_required: false,
            suggested_action: None,
            created_at: Utc::now(),
        }
    }

    pub fn requiring_action(mut self, suggested_action: impl Into<String>) -> Self {
        self.action_required = true;
        self.suggested_action = Some(suggested_action.into());
        self
    }

    pub fn with_source(mut self, source_id: impl Into<String>) -> Self {
        self.source_id = Some(source_id.into());
        self
    }

    /// Alerts sharing a key are duplicates of each other for cooldown purposes
    pub fn dedup_key(&self) -> String {
        match (&self.zone_ref, &self.source_id) {
            (Some(zone), _) => format!("{}:{:?}", zone.zone_id, self.alert_type),
            (None, Some(source)) => format!("{}:{:?}", source, self.alert_type),
            (None, None) => format!("{}:{:?}", self.title, self.alert_type),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct AlertPreferences {
    pub alerts_enabled: bool,
    /// "HH:MM", local to the session clock
    pub quiet_hours_start: Option<String>,
    pub quiet_hours_end: Option<String>,
    pub ftb_alerts: bool,
    pub zone_approach_alerts: bool,
    pub confirmation_alerts: bool,
    pub zone_broken_alerts: bool,
    pub high_score_alerts: bool,
    pub approach_distance_percent: f64,
    pub min_odds_score: f64,
}

impl Default for AlertPreferences {
    fn default() -> Self {
        Self {
            alerts_enabled: true,
            quiet_hours_start: None,
            quiet_hours_end: None,
            ftb_alerts: true,
            zone_approach_alerts: true,
            confirmation_alerts: true,
            zone_broken_alerts: true,
            high_score_alerts: true,
            approach_distance_percent: DEFAULT_APPROACH_DISTANCE_PERCENT,
            min_odds_score: DEFAULT_MIN_ODDS_SCORE,
        }
    }
}

impl AlertPreferences {
    /// `None` unless both ends are set.
    pub fn quiet_hours(&self) -> Result<Option<QuietHours>> {
        match (&self.quiet_hours_start, &self.quiet_hours_end) {
            (Some(start), Some(end)) => Ok(Some(QuietHours {
                start: parse_hh_mm("quietHoursStart", start)?,
                end: parse_hh_mm("quietHoursEnd", end)?,
            })),
            _ => Ok(None),
        }
    }
}

fn parse_hh_mm(name: &str, raw: &str) -> Result<NaiveTime> {
    NaiveTime::parse_from_str(raw.trim(), "%H:%M").map_err(|e| AnalysisError::InvalidPreference {
        name: name.to_string(),
        reason: format!("'{}' is not HH:MM ({})", raw, e),
    })
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QuietHours {
    pub start: NaiveTime,
    pub end: NaiveTime,
}

impl QuietHours {
    /// Start inclusive, end exclusive; a window whose end is before its start wraps midnight.
    pub fn contains(&self, time: NaiveTime) -> bool {
        if self.start <= self.end {
            time >= self.start && time < self.end
        } else {
            time >= self.start || time < self.end
        }
    }
}
