// src/notifications/mod.rs
pub mod log_notifier;
pub mod notification_manager;

pub use log_notifier::LogNotifier;
pub use notification_manager::{AlertDispatcher, NotificationManager, Notifier};
