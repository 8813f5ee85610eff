// src/analysis.rs
// Per-zone pipeline and the batch entry point that ranks a symbol's zones.

use futures::future::join_all;
use log::{debug, info, warn};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::sync::Arc;
use std::time::Instant;

use crate::alerts::{alerts_for_analysis, AlertEvent, AlertPreferences};
use crate::config::EngineConfig;
use crate::context::{
    CompressionDetector, CompressionResult, InducementDetector, InducementResult, SweepInducementDetector,
};
use crate::errors::{AnalysisError, Result};
use crate::odds::{Grade, OddsCalculator, OddsFactors, OddsScore, WeightedOddsCalculator};
use crate::patterns::{detect_pin_engulf_combo, scan_confirmation, ComboResult, ConfirmationScan};
use crate::types::{candles_after, validate_candles, Candle, Zone};
use crate::zones::{
    check_extension, check_ftb_status, refresh_test_count_with, ExtensionResult, FtbStatus, MplCalculator, MplResult,
    ValidationResult, ZoneStatus, ZoneValidator,
};

/// Zones below this grade never make the tradeable list
pub const MIN_TRADEABLE_GRADE: Grade = Grade::B;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ZoneAnalysis {
    /// The zone after this pass: broken flag, extension and test count applied
    pub zone: Zone,
    pub validation: ValidationResult,
    /// Validation flipped the zone to broken during this pass
    pub newly_broken: bool,
    pub extension: Option<ExtensionResult>,
    pub ftb: FtbStatus,
    pub confirmation: ConfirmationScan,
    pub combo: Option<ComboResult>,
    pub compression: Option<CompressionResult>,
    pub inducement: Option<InducementResult>,
    pub mpl: Option<MplResult>,
    pub odds: OddsScore,
    pub estimated_win_rate: f64,
    pub is_tradeable: bool,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisRequest {
    pub symbol: String,
    pub timeframe: String,
    pub candles: Vec<Candle>,
    pub zones: Vec<Zone>,
    pub current_price: f64,
    #[serde(default)]
    pub user_preferences: Option<AlertPreferences>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ZoneFailure {
    pub zone_id: String,
    pub error: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisStats {
    pub total_zones: usize,
    pub analyzed_zones: usize,
    pub failed_zones: usize,
    pub valid_zones: usize,
    pub broken_zones: usize,
    pub fresh_zones: usize,
    pub ftb_zones: usize,
    pub combo_zones: usize,
    pub tradeable_zones: usize,
    pub average_score: f64,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisReport {
    pub symbol: String,
    pub timeframe: String,
    pub all_zones: Vec<ZoneAnalysis>,
    pub tradeable_zones: Vec<ZoneAnalysis>,
    pub best_zone: Option<ZoneAnalysis>,
    pub failures: Vec<ZoneFailure>,
    /// Evaluated only when the request carried preferences
    pub alerts: Vec<AlertEvent>,
    pub stats: AnalysisStats,
    pub execution_time_ms: f64,
}

#[derive(Clone)]
pub struct ZoneAnalyzer {
    config: EngineConfig,
    validator: ZoneValidator,
    mpl: MplCalculator,
    compression: CompressionDetector,
    odds: Arc<dyn OddsCalculator>,
    inducement: Arc<dyn InducementDetector>,
}

impl Default for ZoneAnalyzer {
    fn default() -> Self {
        Self::new(EngineConfig::default())
    }
}

impl ZoneAnalyzer {
    pub fn new(config: EngineConfig) -> Self {
        Self::with_collaborators(config, Arc::new(WeightedOddsCalculator), Arc::new(SweepInducementDetector))
    }

    pub fn with_collaborators(
        config: EngineConfig,
        odds: Arc<dyn OddsCalculator>,
        inducement: Arc<dyn InducementDetector>,
    ) -> Self {
        Self {
            validator: ZoneValidator::new(config.tolerance_percent, config.min_closes_beyond),
            mpl: MplCalculator::new(config.mpl_precision, config.mpl_min_touches),
            compression: CompressionDetector::new(config.compression_window),
            config,
            odds,
            inducement,
        }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Runs the full pipeline for one zone. `candles` is the symbol's whole window; only the
    /// candles after the zone formed are considered.
    pub fn analyze_zone(&self, zone: &Zone, candles: &[Candle], current_price: f64) -> Result<ZoneAnalysis> {
        zone.validate()?;
        let after = candles_after(zone, candles);

        let validation = self.validator.validate(zone, after)?;
        let newly_broken = !zone.is_broken && !validation.is_valid;

        let mut current = zone.clone();
        let mut extension = None;
        if validation.is_valid {
            if let Some(result) = check_extension(&current, after) {
                if result.should_extend {
                    current = result.zone.clone();
                }
                extension = Some(result);
            }
        } else {
            current.is_broken = true;
        }
        if newly_broken {
            info!("💥 [ANALYZE] Zone {} ({}) broken: {} closes beyond", zone.id, zone.symbol, validation.closes_beyond_zone);
        }

        let current = refresh_test_count_with(&current, after, &self.validator);
        let ftb = check_ftb_status(&current, current_price, current.test_count);
        let confirmation = scan_confirmation(&current, after);
        let combo = detect_pin_engulf_combo(&current, after);
        let compression = self.compression.detect(&current, after);
        let inducement = self.inducement.detect_inducement(&current, after);
        let mpl = self.mpl.calculate(&current, after);

        let odds = self.odds.calculate_odds_enhancers(&OddsFactors {
            test_count: current.test_count,
            hierarchy_level: current.hierarchy_level,
            validation: &validation,
            confirmation_score: confirmation.total_score,
            has_combo: combo.is_some(),
            compression: compression.as_ref(),
            inducement: inducement.as_ref(),
            mpl: mpl.as_ref(),
        });

        let is_tradeable = validation.is_valid && odds.grade >= MIN_TRADEABLE_GRADE;
        let estimated_win_rate = self.config.base_win_rate * ftb.win_rate_modifier;

        debug!(
            "[ANALYZE] Zone {} {:?}: tests={}, confirmation={}, combo={}, score={:.2} ({})",
            current.id,
            validation.status,
            current.test_count,
            confirmation.total_score,
            combo.is_some(),
            odds.total_score,
            odds.grade
        );

        Ok(ZoneAnalysis {
            zone: current,
            validation,
            newly_broken,
            extension,
            ftb,
            confirmation,
            combo,
            compression,
            inducement,
            mpl,
            odds,
            estimated_win_rate,
            is_tradeable,
        })
    }

    pub fn run_complete_analysis(&self, request: &AnalysisRequest) -> Result<AnalysisReport> {
        let started = Instant::now();

        if request.candles.is_empty() {
            return Err(AnalysisError::InsufficientData { required: 1, got: 0 });
        }
        validate_candles(&request.candles)?;
        if let Some(pair) = request.candles.windows(2).find(|w| w[1].timestamp < w[0].timestamp) {
            return Err(AnalysisError::InvalidCandle {
                timestamp: pair[1].timestamp.to_rfc3339(),
                reason: "candles out of chronological order".to_string(),
            });
        }

        let mut all_zones = Vec::with_capacity(request.zones.len());
        let mut failures = Vec::new();
        for zone in &request.zones {
            match self.analyze_zone(zone, &request.candles, request.current_price) {
                Ok(analysis) => all_zones.push(analysis),
                Err(e) => {
                    warn!("[ANALYZE] Zone {} on {} failed: {}", zone.id, request.symbol, e);
                    failures.push(ZoneFailure { zone_id: zone.id.clone(), error: e.to_string() });
                }
            }
        }

        let mut tradeable_zones: Vec<ZoneAnalysis> = all_zones.iter().filter(|z| z.is_tradeable).cloned().collect();
        tradeable_zones.sort_by(compare_tradeable);
        let best_zone = tradeable_zones.first().cloned();

        let alerts = match &request.user_preferences {
            Some(prefs) => {
                let mut alerts: Vec<AlertEvent> = all_zones
                    .iter()
                    .flat_map(|a| alerts_for_analysis(a, request.current_price, prefs))
                    .collect();
                alerts.sort_by_key(|a| a.priority);
                alerts
            }
            None => Vec::new(),
        };

        let stats = build_stats(request.zones.len(), &all_zones, failures.len(), tradeable_zones.len());
        let execution_time_ms = started.elapsed().as_secs_f64() * 1000.0;

        info!(
            "📊 [ANALYZE] {} {}: {} zones, {} tradeable, {} failed in {:.2}ms",
            request.symbol, request.timeframe, stats.total_zones, stats.tradeable_zones, stats.failed_zones, execution_time_ms
        );

        Ok(AnalysisReport {
            symbol: request.symbol.clone(),
            timeframe: request.timeframe.clone(),
            all_zones,
            tradeable_zones,
            best_zone,
            failures,
            alerts,
            stats,
            execution_time_ms,
        })
    }
}

/// Hierarchy ascending, score descending, FTB first, confirmation descending.
pub fn compare_tradeable(a: &ZoneAnalysis, b: &ZoneAnalysis) -> Ordering {
    a.zone
        .hierarchy_level
        .cmp(&b.zone.hierarchy_level)
        .then_with(|| b.odds.total_score.partial_cmp(&a.odds.total_score).unwrap_or(Ordering::Equal))
        .then_with(|| b.ftb.is_ftb.cmp(&a.ftb.is_ftb))
        .then_with(|| b.confirmation.total_score.cmp(&a.confirmation.total_score))
}

fn build_stats(total: usize, analyses: &[ZoneAnalysis], failed: usize, tradeable: usize) -> AnalysisStats {
    let average_score = if analyses.is_empty() {
        0.0
    } else {
        analyses.iter().map(|a| a.odds.total_score).sum::<f64>() / analyses.len() as f64
    };
    AnalysisStats {
        total_zones: total,
        analyzed_zones: analyses.len(),
        failed_zones: failed,
        valid_zones: analyses.iter().filter(|a| a.validation.is_valid).count(),
        broken_zones: analyses.iter().filter(|a| a.validation.status == ZoneStatus::Broken).count(),
        fresh_zones: analyses.iter().filter(|a| a.validation.status == ZoneStatus::Fresh).count(),
        ftb_zones: analyses.iter().filter(|a| a.validation.is_valid && a.ftb.is_ftb).count(),
        combo_zones: analyses.iter().filter(|a| a.combo.is_some()).count(),
        tradeable_zones: tradeable,
        average_score,
    }
}

/// Runs one independent analysis per symbol on the blocking pool and collects them all.
pub async fn scan_all_symbols(
    analyzer: Arc<ZoneAnalyzer>,
    requests: Vec<AnalysisRequest>,
) -> Vec<(String, Result<AnalysisReport>)> {
    info!("🔎 [SCAN] Scanning {} symbols", requests.len());

    let tasks = requests.into_iter().map(|request| {
        let analyzer = Arc::clone(&analyzer);
        let symbol = request.symbol.clone();
        async move {
            let outcome = tokio::task::spawn_blocking(move || analyzer.run_complete_analysis(&request))
                .await
                .unwrap_or_else(|e| Err(AnalysisError::Task(e.to_string())));
            if let Err(e) = &outcome {
                warn!("[SCAN] {} failed: {}", symbol, e);
            }
            (symbol, outcome)
        }
    });

    join_all(tasks).await
}
