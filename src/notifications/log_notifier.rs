// src/notifications/log_notifier.rs
use async_trait::async_trait;
use log::{info, warn};

use crate::alerts::AlertEvent;
use crate::errors::Result;
use crate::notifications::Notifier;

/// Writes alerts to the log. Action-required alerts go out at warn level.
pub struct LogNotifier;

impl LogNotifier {
    pub fn new() -> Self {
        Self
    }
}

impl Default for LogNotifier {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Notifier for LogNotifier {
    fn name(&self) -> &'static str {
        "log"
    }

    async fn notify(&self, user_id: &str, alert: &AlertEvent) -> Result<()> {
        let emoji = match alert.priority {
            1 => "🚨",
            2 => "🔔",
            _ => "📢",
        };

        if alert.action_required {
            warn!(
                "{} [{}] {} | {} | action: {}",
                emoji,
                user_id,
                alert.title,
                alert.message,
                alert.suggested_action.as_deref().unwrap_or("-")
            );
        } else {
            info!("{} [{}] {} | {}", emoji, user_id, alert.title, alert.message);
        }
        Ok(())
    }
}
