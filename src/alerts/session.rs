// src/alerts/session.rs
// Per-user alert state: active alerts, price-level configs, preferences and trigger history.
// All mutation goes through one async mutex per user; users never contend with each other.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use chrono::{DateTime, Duration, Local, NaiveTime, Utc};
use dashmap::DashMap;
use log::{debug, error, info, warn};
use tokio::sync::Mutex;

use crate::alerts::conditions::check_alerts_for_symbol;
use crate::alerts::price_level::{check_price_level_alert, PriceLevelAlert};
use crate::alerts::store::{AlertStore, DeliveryStatus, HistoryEntry, UserAlertData, MAX_HISTORY_ENTRIES};
use crate::alerts::types::{AlertEvent, AlertPreferences, AlertType};
use crate::analysis::ZoneAnalyzer;
use crate::errors::{AnalysisError, Result};
use crate::notifications::AlertDispatcher;
use crate::types::{Candle, Zone};

/// Clock used to evaluate cooldowns and quiet hours for one trigger.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TriggerContext {
    pub now: DateTime<Utc>,
    /// Wall-clock time the quiet hours are compared against
    pub local_time: NaiveTime,
}

impl TriggerContext {
    pub fn now() -> Self {
        Self { now: Utc::now(), local_time: Local::now().time() }
    }

    pub fn at(now: DateTime<Utc>, local_time: NaiveTime) -> Self {
        Self { now, local_time }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct TriggerOutcome {
    /// Dispatched, or recorded for later during quiet hours
    pub success: bool,
    /// Dropped as a duplicate without being recorded
    pub skipped: bool,
    pub history_entry: Option<HistoryEntry>,
}

impl TriggerOutcome {
    fn skipped() -> Self {
        Self { success: false, skipped: true, history_entry: None }
    }
}

#[derive(Default)]
struct SessionState {
    preferences: AlertPreferences,
    active_alerts: Vec<AlertEvent>,
    price_alerts: Vec<PriceLevelAlert>,
    history: Vec<HistoryEntry>,
    last_sent: HashMap<String, DateTime<Utc>>,
    broken_zones: HashSet<String>,
}

impl SessionState {
    fn from_stored(data: UserAlertData) -> Self {
        let mut last_sent: HashMap<String, DateTime<Utc>> = HashMap::new();
        for entry in data.history.iter().filter(|e| e.status == DeliveryStatus::Sent) {
            let slot = last_sent.entry(entry.alert.dedup_key()).or_insert(entry.triggered_at);
            if entry.triggered_at > *slot {
                *slot = entry.triggered_at;
            }
        }

        let mut broken_zones: HashSet<String> = data.broken_zones.into_iter().collect();
        broken_zones.extend(
            data.history
                .iter()
                .filter(|e| e.status == DeliveryStatus::Sent && e.alert.alert_type == AlertType::ZoneBroken)
                .filter_map(|e| e.alert.zone_ref.as_ref().map(|z| z.zone_id.clone())),
        );

        Self {
            preferences: data.preferences.unwrap_or_default(),
            active_alerts: data.active_alerts,
            price_alerts: data.price_alerts,
            history: data.history,
            last_sent,
            broken_zones,
        }
    }

    fn record(&mut self, entry: HistoryEntry) {
        self.history.push(entry);
        if self.history.len() > MAX_HISTORY_ENTRIES {
            let excess = self.history.len() - MAX_HISTORY_ENTRIES;
            self.history.drain(..excess);
        }
    }

    /// Keeps one pending alert per dedup key, the newest.
    fn keep_active(&mut self, alert: AlertEvent) {
        let key = alert.dedup_key();
        self.active_alerts.retain(|a| a.dedup_key() != key);
        self.active_alerts.push(alert);
    }
}

pub struct AlertSession {
    user_id: String,
    state: Mutex<SessionState>,
    store: Arc<dyn AlertStore>,
    dispatcher: Arc<dyn AlertDispatcher>,
    cooldown: Duration,
}

impl AlertSession {
    pub fn new(
        user_id: impl Into<String>,
        store: Arc<dyn AlertStore>,
        dispatcher: Arc<dyn AlertDispatcher>,
        cooldown_minutes: i64,
    ) -> Self {
        Self {
            user_id: user_id.into(),
            state: Mutex::new(SessionState::default()),
            store,
            dispatcher,
            cooldown: Duration::minutes(cooldown_minutes),
        }
    }

    pub fn user_id(&self) -> &str {
        &self.user_id
    }

    /// Loads persisted state. On a store failure the session keeps whatever it already has cached.
    pub async fn init(&self) {
        let mut state = self.state.lock().await;
        match self.store.load(&self.user_id).await {
            Ok(data) => {
                *state = SessionState::from_stored(data);
                info!(
                    "🔔 Alert session for {} loaded: {} active, {} price alerts, {} history",
                    self.user_id,
                    state.active_alerts.len(),
                    state.price_alerts.len(),
                    state.history.len()
                );
            }
            Err(e) => warn!("[SESSION] Could not load alerts for {}, using cached state: {}", self.user_id, e),
        }
    }

    /// Flushes the cached state to the store.
    pub async fn dispose(&self) {
        let state = self.state.lock().await;
        if let Err(e) = self.store.save_preferences(&self.user_id, &state.preferences).await {
            warn!("[SESSION] Failed to persist preferences for {}: {}", self.user_id, e);
        }
        self.persist_active(&state).await;
        self.persist_price_alerts(&state).await;
        info!("🔔 Alert session for {} disposed", self.user_id);
    }

    pub async fn preferences(&self) -> AlertPreferences {
        self.state.lock().await.preferences.clone()
    }

    /// Rejects malformed quiet hours; a store failure is logged and the new preferences stay cached.
    pub async fn update_preferences(&self, preferences: AlertPreferences) -> Result<()> {
        preferences.quiet_hours()?;
        let mut state = self.state.lock().await;
        state.preferences = preferences;
        if let Err(e) = self.store.save_preferences(&self.user_id, &state.preferences).await {
            warn!("[SESSION] Failed to persist preferences for {}: {}", self.user_id, e);
        }
        Ok(())
    }

    pub async fn active_alerts(&self) -> Vec<AlertEvent> {
        self.state.lock().await.active_alerts.clone()
    }

    pub async fn price_alerts(&self) -> Vec<PriceLevelAlert> {
        self.state.lock().await.price_alerts.clone()
    }

    pub async fn history(&self) -> Vec<HistoryEntry> {
        self.state.lock().await.history.clone()
    }

    /// Ids of zones whose break has been delivered, sorted.
    pub async fn broken_zones(&self) -> Vec<String> {
        let mut ids: Vec<String> = self.state.lock().await.broken_zones.iter().cloned().collect();
        ids.sort();
        ids
    }

    pub async fn create_price_alert(&self, config: PriceLevelAlert) -> Result<PriceLevelAlert> {
        if !config.target_price.is_finite() || config.target_price <= 0.0 {
            return Err(AnalysisError::InvalidPreference {
                name: "targetPrice".to_string(),
                reason: format!("{} is not a positive price", config.target_price),
            });
        }
        if config.touch_tolerance_percent.is_nan() || config.touch_tolerance_percent < 0.0 {
            return Err(AnalysisError::InvalidPreference {
                name: "touchTolerancePercent".to_string(),
                reason: format!("{} is not a valid tolerance", config.touch_tolerance_percent),
            });
        }

        let mut state = self.state.lock().await;
        state.price_alerts.push(config.clone());
        self.persist_price_alerts(&state).await;
        info!(
            "🎯 Price alert {} created: {} {:?} {:.5}",
            config.id, config.symbol, config.condition, config.target_price
        );
        Ok(config)
    }

    /// Removes a price-level config or a pending alert by id.
    pub async fn delete_alert(&self, alert_id: &str) -> Result<()> {
        let mut state = self.state.lock().await;

        let before = state.price_alerts.len();
        state.price_alerts.retain(|a| a.id != alert_id);
        if state.price_alerts.len() != before {
            self.persist_price_alerts(&state).await;
            return Ok(());
        }

        let before = state.active_alerts.len();
        state.active_alerts.retain(|a| a.id != alert_id);
        if state.active_alerts.len() != before {
            self.persist_active(&state).await;
            return Ok(());
        }

        Err(AnalysisError::AlertNotFound(alert_id.to_string()))
    }

    /// Flips a price-level config on or off and returns the new state.
    pub async fn toggle_alert(&self, alert_id: &str) -> Result<bool> {
        let mut state = self.state.lock().await;
        let enabled = match state.price_alerts.iter_mut().find(|a| a.id == alert_id) {
            Some(config) => {
                config.enabled = !config.enabled;
                config.enabled
            }
            None => return Err(AnalysisError::AlertNotFound(alert_id.to_string())),
        };
        self.persist_price_alerts(&state).await;
        debug!("[SESSION] Price alert {} enabled={}", alert_id, enabled);
        Ok(enabled)
    }

    /// Dedups against the cooldown, holds alerts during quiet hours, otherwise dispatches.
    /// A failed dispatch leaves the alert pending.
    pub async fn trigger_alert(&self, alert: AlertEvent, ctx: &TriggerContext) -> TriggerOutcome {
        let mut state = self.state.lock().await;

        if !state.preferences.alerts_enabled {
            debug!("[SESSION] Alerts disabled for {}, dropping {}", self.user_id, alert.id);
            return TriggerOutcome::skipped();
        }

        let key = alert.dedup_key();
        if let Some(last) = state.last_sent.get(&key) {
            if ctx.now - *last < self.cooldown {
                debug!("[SESSION] {} sent {} ago, within cooldown", key, ctx.now - *last);
                return TriggerOutcome::skipped();
            }
        }

        let quiet = match state.preferences.quiet_hours() {
            Ok(q) => q.map_or(false, |q| q.contains(ctx.local_time)),
            Err(e) => {
                warn!("[SESSION] Ignoring quiet hours for {}: {}", self.user_id, e);
                false
            }
        };

        let (entry, success) = if quiet {
            if state.active_alerts.iter().any(|a| a.dedup_key() == key) {
                return TriggerOutcome::skipped();
            }
            info!("🌙 Quiet hours for {}, holding {}", self.user_id, alert.title);
            state.keep_active(alert.clone());
            (HistoryEntry::new(alert, DeliveryStatus::QuietHours, None, ctx.now), true)
        } else {
            match self.dispatcher.dispatch(&self.user_id, &alert).await {
                Ok(()) => {
                    state.active_alerts.retain(|a| a.dedup_key() != key);
                    state.last_sent.insert(key, ctx.now);
                    if alert.alert_type == AlertType::ZoneBroken {
                        if let Some(zone) = &alert.zone_ref {
                            state.broken_zones.insert(zone.zone_id.clone());
                            self.persist_broken_zones(&state).await;
                        }
                    }
                    (HistoryEntry::new(alert, DeliveryStatus::Sent, None, ctx.now), true)
                }
                Err(e) => {
                    error!("❌ Dispatch failed for {} alert {}: {}", self.user_id, alert.id, e);
                    state.keep_active(alert.clone());
                    (HistoryEntry::new(alert, DeliveryStatus::Failed, Some(e.to_string()), ctx.now), false)
                }
            }
        };

        state.record(entry.clone());
        if let Err(e) = self.store.append_history(&self.user_id, &entry).await {
            warn!("[SESSION] Failed to persist history for {}: {}", self.user_id, e);
        }
        self.persist_active(&state).await;

        TriggerOutcome { success, skipped: false, history_entry: Some(entry) }
    }

    /// Evaluates zone and price-level alerts for one symbol and triggers them in priority order.
    /// Zones whose break was already delivered are evaluated as broken.
    #[allow(clippy::too_many_arguments)]
    pub async fn process_alerts(
        &self,
        analyzer: &ZoneAnalyzer,
        symbol: &str,
        current_price: f64,
        previous_price: Option<f64>,
        zones: &[Zone],
        candles: &[Candle],
        ctx: &TriggerContext,
    ) -> Vec<TriggerOutcome> {
        let (preferences, price_alerts, zones) = {
            let state = self.state.lock().await;
            let zones: Vec<Zone> = zones
                .iter()
                .map(|z| {
                    let mut zone = z.clone();
                    zone.is_broken |= state.broken_zones.contains(&zone.id);
                    zone
                })
                .collect();
            (state.preferences.clone(), state.price_alerts.clone(), zones)
        };

        let mut alerts =
            check_alerts_for_symbol(analyzer, symbol, current_price, previous_price, &zones, candles, &preferences);
        alerts.extend(
            price_alerts
                .iter()
                .filter(|p| p.symbol == symbol)
                .filter_map(|p| check_price_level_alert(p, current_price, previous_price)),
        );
        alerts.sort_by_key(|a| a.priority);

        let mut outcomes = Vec::with_capacity(alerts.len());
        for alert in alerts {
            outcomes.push(self.trigger_alert(alert, ctx).await);
        }
        outcomes
    }

    async fn persist_active(&self, state: &SessionState) {
        if let Err(e) = self.store.save_active_alerts(&self.user_id, &state.active_alerts).await {
            warn!("[SESSION] Failed to persist active alerts for {}: {}", self.user_id, e);
        }
    }

    async fn persist_broken_zones(&self, state: &SessionState) {
        let ids: Vec<String> = state.broken_zones.iter().cloned().collect();
        if let Err(e) = self.store.save_broken_zones(&self.user_id, &ids).await {
            warn!("[SESSION] Failed to persist broken zones for {}: {}", self.user_id, e);
        }
    }

    async fn persist_price_alerts(&self, state: &SessionState) {
        if let Err(e) = self.store.save_price_alerts(&self.user_id, &state.price_alerts).await {
            warn!("[SESSION] Failed to persist price alerts for {}: {}", self.user_id, e);
        }
    }
}

/// One initialized session per user id.
pub struct SessionRegistry {
    sessions: DashMap<String, Arc<AlertSession>>,
    store: Arc<dyn AlertStore>,
    dispatcher: Arc<dyn AlertDispatcher>,
    cooldown_minutes: i64,
}

impl SessionRegistry {
    pub fn new(store: Arc<dyn AlertStore>, dispatcher: Arc<dyn AlertDispatcher>, cooldown_minutes: i64) -> Self {
        Self { sessions: DashMap::new(), store, dispatcher, cooldown_minutes }
    }

    pub async fn session(&self, user_id: &str) -> Arc<AlertSession> {
        if let Some(existing) = self.sessions.get(user_id) {
            return existing.value().clone();
        }

        let session = Arc::new(AlertSession::new(
            user_id,
            self.store.clone(),
            self.dispatcher.clone(),
            self.cooldown_minutes,
        ));
        session.init().await;

        // Another caller may have registered the user while we were loading
        let registered = self.sessions.entry(user_id.to_string()).or_insert(session).value().clone();
        registered
    }

    /// Disposes and forgets a user's session.
    pub async fn remove(&self, user_id: &str) -> bool {
        match self.sessions.remove(user_id) {
            Some((_, session)) => {
                session.dispose().await;
                true
            }
            None => false,
        }
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }
}
