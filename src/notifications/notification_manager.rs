// src/notifications/notification_manager.rs
use std::sync::Arc;

use async_trait::async_trait;
use futures::future::join_all;
use log::{error, info, warn};

use crate::alerts::AlertEvent;
use crate::errors::{AnalysisError, Result};

/// Hands an alert to whatever delivers it to the user.
#[async_trait]
pub trait AlertDispatcher: Send + Sync {
    async fn dispatch(&self, user_id: &str, alert: &AlertEvent) -> Result<()>;
}

/// One delivery channel.
#[async_trait]
pub trait Notifier: Send + Sync {
    fn name(&self) -> &'static str;
    async fn notify(&self, user_id: &str, alert: &AlertEvent) -> Result<()>;
}

pub struct NotificationManager {
    notifiers: Vec<Arc<dyn Notifier>>,
}

impl NotificationManager {
    pub fn new(notifiers: Vec<Arc<dyn Notifier>>) -> Self {
        if notifiers.is_empty() {
            warn!("📢 Notification manager has no channels configured");
        } else {
            let names: Vec<&str> = notifiers.iter().map(|n| n.name()).collect();
            info!("📢 Notification manager initialized with channels: {}", names.join(", "));
        }
        Self { notifiers }
    }

    pub fn channel_count(&self) -> usize {
        self.notifiers.len()
    }
}

#[async_trait]
impl AlertDispatcher for NotificationManager {
    /// Fans out to every channel concurrently. Channel errors are logged; the dispatch only
    /// fails when no channel delivered.
    async fn dispatch(&self, user_id: &str, alert: &AlertEvent) -> Result<()> {
        if self.notifiers.is_empty() {
            return Err(AnalysisError::Dispatch("no notification channels configured".to_string()));
        }

        info!("📢 Sending {:?} alert {} to {} channel(s)", alert.alert_type, alert.id, self.notifiers.len());

        let results = join_all(self.notifiers.iter().map(|n| n.notify(user_id, alert))).await;

        let mut delivered = 0;
        for (notifier, result) in self.notifiers.iter().zip(results) {
            match result {
                Ok(()) => delivered += 1,
                Err(e) => error!("📢 {} notification failed for alert {}: {}", notifier.name(), alert.id, e),
            }
        }

        if delivered == 0 {
            return Err(AnalysisError::Dispatch(format!("all channels failed for alert {}", alert.id)));
        }
        Ok(())
    }
}
