// src/alerts/store.rs
// Persistence seam for per-user alert state, with an in-memory and a JSON file implementation.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use log::debug;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::alerts::price_level::PriceLevelAlert;
use crate::alerts::types::{AlertEvent, AlertPreferences};
use crate::errors::{AnalysisError, Result};

/// History is trimmed to the newest entries past this size
pub const MAX_HISTORY_ENTRIES: usize = 500;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeliveryStatus {
    Sent,
    /// Recorded during quiet hours, not dispatched
    QuietHours,
    Failed,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoryEntry {
    pub id: String,
    pub alert: AlertEvent,
    pub status: DeliveryStatus,
    pub error: Option<String>,
    pub triggered_at: DateTime<Utc>,
}

impl HistoryEntry {
    pub fn new(alert: AlertEvent, status: DeliveryStatus, error: Option<String>, triggered_at: DateTime<Utc>) -> Self {
        Self { id: Uuid::new_v4().to_string(), alert, status, error, triggered_at }
    }
}

/// Everything persisted for one user.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct UserAlertData {
    pub preferences: Option<AlertPreferences>,
    pub active_alerts: Vec<AlertEvent>,
    pub price_alerts: Vec<PriceLevelAlert>,
    pub history: Vec<HistoryEntry>,
    /// Zones whose break has been delivered; they stay broken
    pub broken_zones: Vec<String>,
}

impl UserAlertData {
    fn push_history(&mut self, entry: HistoryEntry) {
        self.history.push(entry);
        if self.history.len() > MAX_HISTORY_ENTRIES {
            let excess = self.history.len() - MAX_HISTORY_ENTRIES;
            self.history.drain(..excess);
        }
    }
}

#[async_trait]
pub trait AlertStore: Send + Sync {
    async fn load(&self, user_id: &str) -> Result<UserAlertData>;
    async fn save_preferences(&self, user_id: &str, preferences: &AlertPreferences) -> Result<()>;
    async fn save_active_alerts(&self, user_id: &str, alerts: &[AlertEvent]) -> Result<()>;
    async fn save_price_alerts(&self, user_id: &str, alerts: &[PriceLevelAlert]) -> Result<()>;
    async fn append_history(&self, user_id: &str, entry: &HistoryEntry) -> Result<()>;
    async fn save_broken_zones(&self, user_id: &str, zone_ids: &[String]) -> Result<()>;
}

#[derive(Default)]
pub struct InMemoryAlertStore {
    users: Mutex<HashMap<String, UserAlertData>>,
    failing: AtomicBool,
}

impl InMemoryAlertStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes every call fail until switched back; used to exercise fallback paths.
    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    pub fn snapshot(&self, user_id: &str) -> UserAlertData {
        self.users.lock().get(user_id).cloned().unwrap_or_default()
    }

    fn update<F: FnOnce(&mut UserAlertData)>(&self, user_id: &str, f: F) -> Result<()> {
        self.check()?;
        f(self.users.lock().entry(user_id.to_string()).or_default());
        Ok(())
    }

    fn check(&self) -> Result<()> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(AnalysisError::Store("in-memory store unavailable".to_string()));
        }
        Ok(())
    }
}

#[async_trait]
impl AlertStore for InMemoryAlertStore {
    async fn load(&self, user_id: &str) -> Result<UserAlertData> {
        self.check()?;
        Ok(self.snapshot(user_id))
    }

    async fn save_preferences(&self, user_id: &str, preferences: &AlertPreferences) -> Result<()> {
        self.update(user_id, |d| d.preferences = Some(preferences.clone()))
    }

    async fn save_active_alerts(&self, user_id: &str, alerts: &[AlertEvent]) -> Result<()> {
        self.update(user_id, |d| d.active_alerts = alerts.to_vec())
    }

    async fn save_price_alerts(&self, user_id: &str, alerts: &[PriceLevelAlert]) -> Result<()> {
        self.update(user_id, |d| d.price_alerts = alerts.to_vec())
    }

    async fn append_history(&self, user_id: &str, entry: &HistoryEntry) -> Result<()> {
        self.update(user_id, |d| d.push_history(entry.clone()))
    }

    async fn save_broken_zones(&self, user_id: &str, zone_ids: &[String]) -> Result<()> {
        self.update(user_id, |d| d.broken_zones = zone_ids.to_vec())
    }
}

/// One pretty-printed JSON file per user under `dir`.
pub struct JsonFileAlertStore {
    dir: PathBuf,
    write_lock: tokio::sync::Mutex<()>,
}

impl JsonFileAlertStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into(), write_lock: tokio::sync::Mutex::new(()) }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path_for(&self, user_id: &str) -> Result<PathBuf> {
        let valid = !user_id.is_empty()
            && user_id.chars().all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_');
        if !valid {
            return Err(AnalysisError::Store(format!("invalid user id '{}'", user_id)));
        }
        Ok(self.dir.join(format!("{}.json", user_id)))
    }

    async fn read(&self, path: &Path) -> Result<UserAlertData> {
        match tokio::fs::read(path).await {
            Ok(bytes) => Ok(serde_json::from_slice(&bytes)?),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(UserAlertData::default()),
            Err(e) => Err(e.into()),
        }
    }

    async fn modify<F: FnOnce(&mut UserAlertData) + Send>(&self, user_id: &str, f: F) -> Result<()> {
        let path = self.path_for(user_id)?;
        let _guard = self.write_lock.lock().await;

        let mut data = self.read(&path).await?;
        f(&mut data);

        tokio::fs::create_dir_all(&self.dir).await?;
        let tmp = path.with_extension("json.tmp");
        tokio::fs::write(&tmp, serde_json::to_vec_pretty(&data)?).await?;
        tokio::fs::rename(&tmp, &path).await?;
        debug!("[STORE] Wrote alert data for {} to {}", user_id, path.display());
        Ok(())
    }
}

#[async_trait]
impl AlertStore for JsonFileAlertStore {
    async fn load(&self, user_id: &str) -> Result<UserAlertData> {
        let path = self.path_for(user_id)?;
        self.read(&path).await
    }

    async fn save_preferences(&self, user_id: &str, preferences: &AlertPreferences) -> Result<()> {
        let preferences = preferences.clone();
        self.modify(user_id, move |d| d.preferences = Some(preferences)).await
    }

    async fn save_active_alerts(&self, user_id: &str, alerts: &[AlertEvent]) -> Result<()> {
        let alerts = alerts.to_vec();
        self.modify(user_id, move |d| d.active_alerts = alerts).await
    }

    async fn save_price_alerts(&self, user_id: &str, alerts: &[PriceLevelAlert]) -> Result<()> {
        let alerts = alerts.to_vec();
        self.modify(user_id, move |d| d.price_alerts = alerts).await
    }

    async fn append_history(&self, user_id: &str, entry: &HistoryEntry) -> Result<()> {
        let entry = entry.clone();
        self.modify(user_id, move |d| d.push_history(entry)).await
    }

    async fn save_broken_zones(&self, user_id: &str, zone_ids: &[String]) -> Result<()> {
        let zone_ids = zone_ids.to_vec();
        self.modify(user_id, move |d| d.broken_zones = zone_ids).await
    }
}
