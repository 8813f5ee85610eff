// src/zones/mod.rs
pub mod extension;
pub mod freshness;
pub mod mpl;
pub mod validator;

pub use extension::{check_extension, ExtensionResult, ZoneHistory};
pub use freshness::{check_ftb_status, count_touch_events, refresh_test_count, refresh_test_count_with, FtbQuality, FtbStatus};
pub use mpl::{MplCalculator, MplQuality, MplResult};
pub use validator::{ValidationResult, ZoneStatus, ZoneValidator};
