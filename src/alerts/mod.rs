// src/alerts/mod.rs
pub mod conditions;
pub mod price_level;
pub mod session;
pub mod store;
pub mod types;

pub use conditions::{alerts_for_analysis, check_alert_conditions, check_alerts_for_symbol};
pub use price_level::{check_price_level_alert, PriceCondition, PriceLevelAlert};
pub use session::{AlertSession, SessionRegistry, TriggerContext, TriggerOutcome};
pub use store::{AlertStore, DeliveryStatus, HistoryEntry, InMemoryAlertStore, JsonFileAlertStore, UserAlertData};
pub use types::{AlertEvent, AlertPreferences, AlertType, QuietHours};
