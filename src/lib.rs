// src/lib.rs
pub mod alerts;
pub mod analysis;
pub mod config;
pub mod context;
pub mod errors;
pub mod loader;
pub mod notifications;
pub mod odds;
pub mod patterns;
pub mod types;
pub mod zones;

pub use analysis::{scan_all_symbols, AnalysisReport, AnalysisRequest, ZoneAnalysis, ZoneAnalyzer};
pub use config::EngineConfig;
pub use errors::{AnalysisError, Result};
pub use types::{Candle, Zone, ZoneType};
